// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! HTTP client wrapper with authentication and `ETag` handling.

use std::time::Duration;

use reqwest::header::HeaderMap;
use reqwest::redirect::Policy;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use url::Url;

use crate::config::{AuthMethod, DavConfig};
use crate::error::DavError;
use crate::tls::pinned_client_config;
use crate::types::ETag;

/// A response read to completion.
#[derive(Debug, Clone)]
pub struct RawResponse {
    /// Final URL.
    pub url: Url,
    /// Status code.
    pub status: StatusCode,
    /// Response headers.
    pub headers: HeaderMap,
    /// Body text.
    pub body: String,
}

impl RawResponse {
    /// The `ETag` header.
    #[must_use]
    pub fn etag(&self) -> Option<ETag> {
        self.header("ETag").map(|s| ETag::new(s.to_string()))
    }

    /// The `Location` header.
    #[must_use]
    pub fn location(&self) -> Option<&str> {
        self.header("Location")
    }

    /// A header value as text.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Whether the status is 207 Multi-Status.
    #[must_use]
    pub fn is_multistatus(&self) -> bool {
        self.status == StatusCode::MULTI_STATUS
    }

    /// Whether the status is a redirect carrying a location.
    #[must_use]
    pub fn is_redirect(&self) -> bool {
        self.status.is_redirection() && self.location().is_some()
    }

    /// Maps a status the caller did not expect to an error.
    #[must_use]
    pub fn into_error(self) -> DavError {
        status_error(self.status, &self.url)
    }
}

/// Maps a failed status to the error taxonomy.
#[must_use]
pub fn status_error(status: StatusCode, url: &Url) -> DavError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => DavError::Authentication {
            status: status.as_u16(),
        },
        StatusCode::NOT_FOUND | StatusCode::GONE => DavError::NotFound {
            href: url.path().to_string(),
        },
        StatusCode::PRECONDITION_FAILED => DavError::PreconditionFailed {
            href: url.path().to_string(),
        },
        status => DavError::UnexpectedStatus {
            status: status.as_u16(),
            url: url.to_string(),
        },
    }
}

/// Builds a WebDAV extension method such as `PROPFIND`.
///
/// # Errors
///
/// Returns an error if the name is not a valid method token.
pub fn method(name: &str) -> Result<Method, DavError> {
    Method::from_bytes(name.as_bytes())
        .map_err(|e| DavError::Config(format!("invalid method {name}: {e}")))
}

/// HTTP client for DAV operations.
#[derive(Debug)]
pub struct HttpClient {
    client: Client,
    /// Same settings, but never follows redirects; used by discovery.
    probe: Client,
    config: DavConfig,
}

impl HttpClient {
    /// Creates a new HTTP client.
    ///
    /// # Errors
    ///
    /// Returns an error if HTTP client creation fails.
    pub fn new(config: DavConfig) -> Result<Self, DavError> {
        let tls = config
            .pinned_fingerprint
            .as_deref()
            .map(pinned_client_config)
            .transpose()?;
        let builder = || {
            let builder = Client::builder()
                .timeout(Duration::from_secs(config.timeout_secs))
                .user_agent(&config.user_agent);
            match &tls {
                Some(tls) => builder.use_preconfigured_tls(tls.clone()),
                None => builder,
            }
        };
        let client = builder().build()?;
        let probe = builder().redirect(Policy::none()).build()?;
        Ok(Self {
            client,
            probe,
            config,
        })
    }

    /// The configuration this client was built from.
    #[must_use]
    pub const fn config(&self) -> &DavConfig {
        &self.config
    }

    /// Builds a request with authentication headers.
    pub fn build_request(&self, method: Method, url: &Url) -> RequestBuilder {
        self.authorize(self.client.request(method, url.clone()))
    }

    /// Builds a request that does not follow redirects.
    pub fn build_probe(&self, method: Method, url: &Url) -> RequestBuilder {
        self.authorize(self.probe.request(method, url.clone()))
    }

    fn authorize(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.config.auth {
            AuthMethod::Basic { username, password } => req.basic_auth(username, Some(password)),
            AuthMethod::Bearer { token } => req.bearer_auth(token),
            AuthMethod::None => req,
        }
    }

    /// Sends a request and reads the body, whatever the status.
    ///
    /// # Errors
    ///
    /// Returns a network error if the request fails, or a TLS error if the
    /// handshake fails, a pinned certificate mismatch included.
    pub async fn send(&self, req: RequestBuilder) -> Result<RawResponse, DavError> {
        let resp = req.send().await?;

        let url = resp.url().clone();
        let status = resp.status();
        let headers = resp.headers().clone();
        let body = resp.text().await?;
        tracing::debug!(%url, status = status.as_u16(), "received response");
        Ok(RawResponse {
            url,
            status,
            headers,
            body,
        })
    }

    /// Adds If-Match header for conditional updates.
    pub fn if_match(req: RequestBuilder, etag: &ETag) -> RequestBuilder {
        req.header("If-Match", etag.as_str())
    }

    /// Adds `If-None-Match: *` for creation that must not overwrite.
    pub fn if_none_match_any(req: RequestBuilder) -> RequestBuilder {
        req.header("If-None-Match", "*")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        let url = Url::parse("https://dav.example.com/cal/1.ics").unwrap();
        assert!(status_error(StatusCode::UNAUTHORIZED, &url).is_auth());
        assert_eq!(
            status_error(StatusCode::PRECONDITION_FAILED, &url),
            DavError::PreconditionFailed {
                href: "/cal/1.ics".to_string()
            }
        );
        assert!(matches!(
            status_error(StatusCode::METHOD_NOT_ALLOWED, &url),
            DavError::UnexpectedStatus { status: 405, .. }
        ));
    }
}
