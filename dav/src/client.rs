// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! WebDAV client for collection and item operations.

use std::collections::HashSet;
use std::sync::Arc;

use reqwest::{Method, StatusCode};
use url::Url;

use crate::config::DavConfig;
use crate::error::DavError;
use crate::http::{HttpClient, RawResponse, method};
use crate::request::{
    MultiGetRequest, Prop, PropFindRequest, PropPatchRequest, SyncCollectionRequest,
};
use crate::response::{MultiStatus, Response};
use crate::types::{
    CollectionKind, CollectionState, ETag, FetchedResource, Href, MultiGetResult, PutCondition,
    ResourceEntry, SyncDelta,
};

const XML_CONTENT_TYPE: &str = "application/xml; charset=utf-8";

/// `Depth` header values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Depth {
    /// The resource itself.
    Zero,
    /// The resource and its members.
    One,
}

impl Depth {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Zero => "0",
            Self::One => "1",
        }
    }
}

/// Client for one DAV account.
///
/// # Example
///
/// ```ignore
/// use davsync_dav::{AuthMethod, DavClient, DavConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = DavConfig::new(
///     "https://dav.example.com/",
///     AuthMethod::Basic {
///         username: "user".to_string(),
///         password: "pass".to_string(),
///     },
/// );
///
/// let client = DavClient::new(config)?;
/// let found = client.discover().await?;
/// for collection in &found.collections {
///     let entries = client.list_items(&collection.url).await?;
///     println!("{}: {} items", collection.url, entries.len());
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct DavClient {
    pub(crate) http: Arc<HttpClient>,
    base: Url,
}

impl DavClient {
    /// Creates a new client.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is invalid or HTTP client
    /// initialization fails.
    pub fn new(config: DavConfig) -> Result<Self, DavError> {
        let mut base = Url::parse(&config.base_url)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let http = HttpClient::new(config)?;
        Ok(Self {
            http: Arc::new(http),
            base,
        })
    }

    /// The configuration this client was built from.
    #[must_use]
    pub fn config(&self) -> &DavConfig {
        self.http.config()
    }

    /// Base URL, always ending with `/`.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base
    }

    /// Resolves an href against the base URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the href cannot be joined.
    pub fn resolve(&self, href: &str) -> Result<Url, DavError> {
        Ok(self.base.join(href)?)
    }

    /// Sends a PROPFIND and parses the multistatus.
    ///
    /// # Errors
    ///
    /// Returns an error for any status other than 207 or an invalid body.
    pub async fn propfind(
        &self,
        url: &Url,
        depth: Depth,
        request: &PropFindRequest,
    ) -> Result<MultiStatus, DavError> {
        let resp = self.send_propfind(url, depth, request, false).await?;
        if !resp.is_multistatus() {
            return Err(resp.into_error());
        }
        MultiStatus::from_xml(&resp.body)
    }

    /// Sends a PROPFIND and returns the raw response; `probe` disables
    /// redirect following.
    pub(crate) async fn send_propfind(
        &self,
        url: &Url,
        depth: Depth,
        request: &PropFindRequest,
        probe: bool,
    ) -> Result<RawResponse, DavError> {
        let builder = if probe {
            self.http.build_probe(method("PROPFIND")?, url)
        } else {
            self.http.build_request(method("PROPFIND")?, url)
        };
        let req = builder
            .header("Depth", depth.as_str())
            .header("Content-Type", XML_CONTENT_TYPE)
            .body(request.build()?);
        self.http.send(req).await
    }

    /// Fetches the collection's `getctag` and `sync-token`.
    ///
    /// # Errors
    ///
    /// Returns an error if the PROPFIND fails.
    pub async fn collection_state(&self, url: &Url) -> Result<CollectionState, DavError> {
        let request = PropFindRequest::with(&[Prop::GetCTag, Prop::SyncToken]);
        let ms = self.propfind(url, Depth::Zero, &request).await?;
        let props = ms
            .find(url.path())
            .or_else(|| ms.responses.first())
            .map(Response::props)
            .unwrap_or_default();
        Ok(CollectionState {
            ctag: props.ctag,
            sync_token: props.sync_token,
        })
    }

    /// Lists every member of a collection with its etag (PROPFIND depth 1).
    ///
    /// The collection itself and nested collections are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if the PROPFIND fails.
    pub async fn list_items(&self, url: &Url) -> Result<Vec<ResourceEntry>, DavError> {
        let request = PropFindRequest::with(&[Prop::ResourceType, Prop::GetETag]);
        let ms = self.propfind(url, Depth::One, &request).await?;
        let own = url.path().trim_end_matches('/');

        let mut entries: Vec<_> = ms
            .responses
            .iter()
            .filter(|r| r.href.trim_end_matches('/') != own)
            .filter_map(|r| {
                let props = r.props();
                if props.is_collection() {
                    return None;
                }
                let Some(etag) = props.etag else {
                    tracing::warn!(href = %r.href, "member without etag skipped");
                    return None;
                };
                Some(ResourceEntry {
                    href: r.href.clone(),
                    etag,
                })
            })
            .collect();
        entries.sort_by(|a, b| a.href.cmp(&b.href));
        Ok(entries)
    }

    /// Sends a `sync-collection` REPORT.
    ///
    /// # Errors
    ///
    /// Returns [`DavError::InvalidSyncToken`] if the server rejects the token,
    /// or another error if the REPORT fails.
    pub async fn sync_collection(
        &self,
        url: &Url,
        sync_token: Option<&str>,
    ) -> Result<SyncDelta, DavError> {
        let request = SyncCollectionRequest::new(sync_token.map(str::to_string));
        let req = self
            .http
            .build_request(method("REPORT")?, url)
            .header("Depth", Depth::Zero.as_str())
            .header("Content-Type", XML_CONTENT_TYPE)
            .body(request.build()?);
        let resp = self.http.send(req).await?;

        if matches!(resp.status, StatusCode::FORBIDDEN | StatusCode::CONFLICT)
            && resp.body.contains("valid-sync-token")
        {
            return Err(DavError::InvalidSyncToken);
        }
        if !resp.is_multistatus() {
            return Err(resp.into_error());
        }

        let ms = MultiStatus::from_xml(&resp.body)?;
        let own = url.path().trim_end_matches('/');
        let mut delta = SyncDelta {
            sync_token: ms.sync_token.clone(),
            ..SyncDelta::default()
        };
        for r in ms.responses {
            if r.href.trim_end_matches('/') == own {
                continue;
            }
            if r.is_not_found() {
                delta.removed.push(r.href);
                continue;
            }
            let props = r.props();
            if props.is_collection() {
                continue;
            }
            match props.etag {
                Some(etag) => delta.changed.push(ResourceEntry { href: r.href, etag }),
                None => tracing::warn!(href = %r.href, "changed member without etag skipped"),
            }
        }
        delta.changed.sort_by(|a, b| a.href.cmp(&b.href));
        delta.removed.sort();
        Ok(delta)
    }

    /// Fetches member bodies with a multiget REPORT, falling back to single
    /// GETs for hrefs the REPORT did not return.
    ///
    /// # Errors
    ///
    /// Returns an error if the REPORT fails for a reason other than the
    /// server not supporting it, or if a fallback GET hits a connection or
    /// authentication failure. Other per-member failures are collected in
    /// [`MultiGetResult::failed`].
    pub async fn multiget(
        &self,
        url: &Url,
        kind: CollectionKind,
        hrefs: &[Href],
    ) -> Result<MultiGetResult, DavError> {
        let mut result = MultiGetResult::default();
        if hrefs.is_empty() {
            return Ok(result);
        }

        let mut request = MultiGetRequest::new(kind);
        for href in hrefs {
            request.add_href(href.clone());
        }
        let req = self
            .http
            .build_request(method("REPORT")?, url)
            .header("Depth", Depth::One.as_str())
            .header("Content-Type", XML_CONTENT_TYPE)
            .body(request.build()?);
        let resp = self.http.send(req).await?;

        let mut seen = HashSet::new();
        if resp.is_multistatus() {
            let ms = MultiStatus::from_xml(&resp.body)?;
            for r in ms.responses {
                if r.is_not_found() {
                    seen.insert(r.href.clone());
                    result.missing.push(r.href);
                    continue;
                }
                let props = r.props();
                if let (Some(etag), Some(body)) = (props.etag.clone(), props.data()) {
                    seen.insert(r.href.clone());
                    result.found.push(FetchedResource {
                        href: r.href,
                        etag,
                        body: body.to_string(),
                    });
                }
            }
        } else if matches!(
            resp.status,
            StatusCode::BAD_REQUEST
                | StatusCode::NOT_FOUND
                | StatusCode::METHOD_NOT_ALLOWED
                | StatusCode::UNSUPPORTED_MEDIA_TYPE
                | StatusCode::NOT_IMPLEMENTED
        ) {
            tracing::debug!(status = resp.status.as_u16(), "multiget unsupported, using GET");
        } else {
            return Err(resp.into_error());
        }

        for href in hrefs.iter().filter(|h| !seen.contains(*h)) {
            match self.get(href).await {
                Ok(fetched) => result.found.push(fetched),
                Err(DavError::NotFound { .. }) => result.missing.push(href.clone()),
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    tracing::warn!(%href, error = %e, "failed to fetch member");
                    result.failed.push((href.clone(), e));
                }
            }
        }
        result.found.sort_by(|a, b| a.href.cmp(&b.href));
        Ok(result)
    }

    /// Fetches one member body.
    ///
    /// # Errors
    ///
    /// Returns [`DavError::NotFound`] if it does not exist, or another error
    /// if the request fails or carries no `ETag`.
    pub async fn get(&self, href: &Href) -> Result<FetchedResource, DavError> {
        let url = self.resolve(href)?;
        let resp = self.http.send(self.http.build_request(Method::GET, &url)).await?;
        if resp.status != StatusCode::OK {
            return Err(resp.into_error());
        }
        let etag = match resp.etag() {
            Some(etag) => etag,
            None => self.fetch_etag(&url).await?,
        };
        Ok(FetchedResource {
            href: href.clone(),
            etag,
            body: resp.body,
        })
    }

    /// Uploads a member body with a conditional header and returns the new
    /// etag.
    ///
    /// # Errors
    ///
    /// Returns [`DavError::PreconditionFailed`] when the condition fails, or
    /// another error if the upload is rejected.
    pub async fn put(
        &self,
        href: &Href,
        body: String,
        content_type: &str,
        condition: &PutCondition,
    ) -> Result<ETag, DavError> {
        let url = self.resolve(href)?;
        let req = self
            .http
            .build_request(Method::PUT, &url)
            .header("Content-Type", content_type)
            .body(body);
        let req = match condition {
            PutCondition::Create => HttpClient::if_none_match_any(req),
            PutCondition::Update(etag) => HttpClient::if_match(req, etag),
        };
        let resp = self.http.send(req).await?;

        match resp.status {
            StatusCode::OK | StatusCode::CREATED | StatusCode::NO_CONTENT => {}
            _ => return Err(resp.into_error()),
        }
        match resp.etag() {
            Some(etag) => Ok(etag),
            None => self.fetch_etag(&url).await,
        }
    }

    /// Deletes a member if its etag still matches.
    ///
    /// # Errors
    ///
    /// Returns [`DavError::PreconditionFailed`] if the member changed, or
    /// [`DavError::NotFound`] if it is already gone.
    pub async fn delete(&self, href: &Href, etag: Option<&ETag>) -> Result<(), DavError> {
        let url = self.resolve(href)?;
        let mut req = self.http.build_request(Method::DELETE, &url);
        if let Some(etag) = etag {
            req = HttpClient::if_match(req, etag);
        }
        let resp = self.http.send(req).await?;
        match resp.status {
            StatusCode::OK | StatusCode::ACCEPTED | StatusCode::NO_CONTENT => Ok(()),
            _ => Err(resp.into_error()),
        }
    }

    /// Renames a collection with PROPPATCH.
    ///
    /// # Errors
    ///
    /// Returns an error if the server rejects the change.
    pub async fn rename(&self, url: &Url, display_name: &str) -> Result<(), DavError> {
        let body = PropPatchRequest::display_name(display_name).build()?;
        let req = self
            .http
            .build_request(method("PROPPATCH")?, url)
            .header("Content-Type", XML_CONTENT_TYPE)
            .body(body);
        let resp = self.http.send(req).await?;
        match resp.status {
            StatusCode::OK | StatusCode::NO_CONTENT => Ok(()),
            StatusCode::MULTI_STATUS => {
                let ms = MultiStatus::from_xml(&resp.body)?;
                let failed = ms
                    .responses
                    .iter()
                    .flat_map(|r| &r.propstats)
                    .find(|ps| !(200..300).contains(&ps.status));
                match failed {
                    Some(ps) => Err(DavError::UnexpectedStatus {
                        status: ps.status,
                        url: url.to_string(),
                    }),
                    None => Ok(()),
                }
            }
            _ => Err(resp.into_error()),
        }
    }

    /// Reads `getetag` when a response carried no `ETag` header.
    async fn fetch_etag(&self, url: &Url) -> Result<ETag, DavError> {
        let ms = self
            .propfind(url, Depth::Zero, &PropFindRequest::with(&[Prop::GetETag]))
            .await?;
        ms.responses
            .iter()
            .find_map(|r| r.props().etag)
            .ok_or_else(|| DavError::InvalidMultistatus(format!("no getetag for {url}")))
    }
}
