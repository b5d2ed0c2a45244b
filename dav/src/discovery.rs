// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! CalDAV/CardDAV service discovery (RFC 6764 with fallbacks).
//!
//! For each service the candidates are tried in order: the well-known path
//! (following redirects), the base URL, then a fixed list of server layouts
//! ordered from most to least specific. A 207 carrying a home set is
//! authoritative; a 401 marks an endpoint that gates PROPFIND behind
//! authentication and is accepted as a fallback root. 403, 405 and 207
//! bodies that are not DAV multistatus exclude the candidate.

use reqwest::StatusCode;
use url::Url;

use crate::client::{DavClient, Depth};
use crate::error::DavError;
use crate::request::{Prop, PropFindRequest};
use crate::response::{MultiStatus, Properties};
use crate::types::{ChangeDetection, CollectionKind, DiscoveryResult, RemoteCollection};

const MAX_REDIRECTS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Service {
    CalDav,
    CardDav,
}

impl Service {
    const fn name(self) -> &'static str {
        match self {
            Self::CalDav => "caldav",
            Self::CardDav => "carddav",
        }
    }

    const fn well_known(self) -> &'static str {
        match self {
            Self::CalDav => "/.well-known/caldav",
            Self::CardDav => "/.well-known/carddav",
        }
    }

    /// Fallback layouts, relative to the base URL, most specific first.
    const fn probe_paths(self) -> &'static [&'static str] {
        match self {
            Self::CalDav => &[
                "remote.php/dav/",
                "remote.php/caldav/",
                "caldav.php/",
                "dav.php/",
                "dav/",
            ],
            Self::CardDav => &[
                "remote.php/dav/",
                "remote.php/carddav/",
                "carddav.php/",
                "dav.php/",
                "dav/",
            ],
        }
    }

    const fn home_set(self) -> Prop {
        match self {
            Self::CalDav => Prop::CalendarHomeSet,
            Self::CardDav => Prop::AddressBookHomeSet,
        }
    }

    fn home_hrefs(self, props: &Properties) -> Option<&str> {
        let set = match self {
            Self::CalDav => &props.calendar_home_set,
            Self::CardDav => &props.addressbook_home_set,
        };
        set.first().map(|h| h.as_str())
    }
}

/// Outcome of probing one candidate URL.
#[derive(Debug)]
enum Probe {
    /// 207 with a valid multistatus body.
    Dav { url: Url, ms: MultiStatus },
    /// 401 challenge.
    AuthRequired(Url),
    /// Anything else.
    Rejected(u16),
}

/// A located service root.
#[derive(Debug, Clone)]
struct Located {
    root: Url,
    principal: Option<Url>,
    auth_gated: bool,
}

impl DavClient {
    /// Locates the CalDAV and CardDAV roots and enumerates their collections.
    ///
    /// # Errors
    ///
    /// Returns [`DavError::NoServicesFound`] if neither service could be
    /// located, or a network error if the server is unreachable.
    #[tracing::instrument(skip(self), fields(base = %self.base_url()))]
    pub async fn discover(&self) -> Result<DiscoveryResult, DavError> {
        let caldav = self.locate(Service::CalDav).await?;
        let carddav = self.locate(Service::CardDav).await?;
        if caldav.is_none() && carddav.is_none() {
            tracing::warn!("no DAV service found");
            return Err(DavError::NoServicesFound);
        }

        let mut result = DiscoveryResult {
            principal: caldav
                .as_ref()
                .and_then(|l| l.principal.clone())
                .or_else(|| carddav.as_ref().and_then(|l| l.principal.clone())),
            calendar_root: caldav.as_ref().map(|l| l.root.clone()),
            addressbook_root: carddav.as_ref().map(|l| l.root.clone()),
            collections: Vec::new(),
        };

        for (service, located) in [(Service::CalDav, caldav), (Service::CardDav, carddav)] {
            let Some(located) = located else { continue };
            for collection in self.enumerate(service, &located).await? {
                if !result.collections.iter().any(|c| c.url == collection.url) {
                    result.collections.push(collection);
                }
            }
        }
        result.collections.sort_by(|a, b| a.url.as_str().cmp(b.url.as_str()));

        tracing::info!(
            calendar_root = ?result.calendar_root.as_ref().map(Url::as_str),
            addressbook_root = ?result.addressbook_root.as_ref().map(Url::as_str),
            collections = result.collections.len(),
            "discovery finished"
        );
        Ok(result)
    }

    async fn locate(&self, service: Service) -> Result<Option<Located>, DavError> {
        let well_known = self.base_url().join(service.well_known())?;
        match self.probe(&well_known, service).await? {
            Probe::Dav { url, ms } => {
                if let Some(found) = self.authoritative(&url, &ms, service).await {
                    return Ok(Some(found));
                }
            }
            Probe::AuthRequired(url) if url != well_known => {
                tracing::warn!(service = service.name(), %url, "accepting 401 redirect target as root");
                return Ok(Some(Located {
                    root: url,
                    principal: None,
                    auth_gated: true,
                }));
            }
            Probe::AuthRequired(_) | Probe::Rejected(_) => {
                tracing::debug!(service = service.name(), "well-known path not usable");
            }
        }

        let mut weak = None;
        match self.probe(self.base_url(), service).await? {
            Probe::Dav { url, ms } => match self.authoritative(&url, &ms, service).await {
                Some(found) => return Ok(Some(found)),
                None => weak = Some(url),
            },
            Probe::AuthRequired(url) => {
                tracing::warn!(service = service.name(), %url, "accepting 401 endpoint as root");
                return Ok(Some(Located {
                    root: url,
                    principal: None,
                    auth_gated: true,
                }));
            }
            Probe::Rejected(status) => {
                tracing::debug!(service = service.name(), status, "base URL is not a DAV endpoint");
            }
        }

        for path in service.probe_paths() {
            let candidate = self.base_url().join(path)?;
            match self.probe(&candidate, service).await? {
                Probe::Dav { url, ms } => {
                    let found = self.authoritative(&url, &ms, service).await;
                    return Ok(Some(found.unwrap_or(Located {
                        root: url,
                        principal: None,
                        auth_gated: false,
                    })));
                }
                Probe::AuthRequired(url) => {
                    tracing::warn!(service = service.name(), %url, "accepting 401 endpoint as root");
                    return Ok(Some(Located {
                        root: url,
                        principal: None,
                        auth_gated: true,
                    }));
                }
                Probe::Rejected(status) => {
                    tracing::debug!(service = service.name(), %candidate, status, "probe rejected");
                }
            }
        }

        Ok(weak.map(|root| Located {
            root,
            principal: None,
            auth_gated: false,
        }))
    }

    /// PROPFIND depth 0, following redirects by hand so the method survives.
    async fn probe(&self, url: &Url, service: Service) -> Result<Probe, DavError> {
        let request = PropFindRequest::with(&[
            Prop::CurrentUserPrincipal,
            service.home_set(),
            Prop::ResourceType,
        ]);

        let mut current = url.clone();
        for _ in 0..=MAX_REDIRECTS {
            let resp = self
                .send_propfind(&current, Depth::Zero, &request, true)
                .await?;
            if resp.is_redirect() {
                let location = resp.location().unwrap_or_default();
                current = current.join(location)?;
                tracing::debug!(target_url = %current, "following redirect");
                continue;
            }
            return Ok(match resp.status {
                StatusCode::MULTI_STATUS => match MultiStatus::from_xml(&resp.body) {
                    Ok(ms) => Probe::Dav { url: current, ms },
                    Err(e) => {
                        tracing::debug!(url = %current, error = %e, "207 without multistatus");
                        Probe::Rejected(207)
                    }
                },
                StatusCode::UNAUTHORIZED => Probe::AuthRequired(current),
                status => Probe::Rejected(status.as_u16()),
            });
        }
        Ok(Probe::Rejected(StatusCode::LOOP_DETECTED.as_u16()))
    }

    /// Resolves a home set from a probe, via the principal when needed.
    async fn authoritative(&self, url: &Url, ms: &MultiStatus, service: Service) -> Option<Located> {
        let props = ms
            .find(url.path())
            .or_else(|| ms.responses.first())
            .map(crate::response::Response::props)?;

        if let Some(home) = service.home_hrefs(&props) {
            return Some(Located {
                root: url.join(home).ok()?,
                principal: None,
                auth_gated: false,
            });
        }

        let principal = url.join(props.current_user_principal.as_deref()?).ok()?;
        let request = PropFindRequest::with(&[service.home_set()]);
        let principal_ms = match self.propfind(&principal, Depth::Zero, &request).await {
            Ok(ms) => ms,
            Err(e) => {
                tracing::debug!(%principal, error = %e, "principal lookup failed");
                return None;
            }
        };
        let home = principal_ms
            .responses
            .iter()
            .find_map(|r| service.home_hrefs(&r.props()).map(str::to_string))?;
        Some(Located {
            root: principal.join(&home).ok()?,
            principal: Some(principal),
            auth_gated: false,
        })
    }

    async fn enumerate(
        &self,
        service: Service,
        located: &Located,
    ) -> Result<Vec<RemoteCollection>, DavError> {
        let mut props = vec![
            Prop::ResourceType,
            Prop::DisplayName,
            Prop::GetCTag,
            Prop::SyncToken,
            Prop::CurrentUserPrivilegeSet,
            Prop::SupportedReportSet,
        ];
        if service == Service::CalDav {
            props.push(Prop::SupportedCalendarComponentSet);
        }
        let request = PropFindRequest::with(&props);

        let ms = match self.propfind(&located.root, Depth::One, &request).await {
            Ok(ms) => ms,
            Err(e) if located.auth_gated && e.is_auth() => {
                tracing::warn!(root = %located.root, "collections hidden behind authentication");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e),
        };

        let mut collections = Vec::new();
        for response in &ms.responses {
            let props = response.props();
            let Some(kind) = collection_kind(service, &props) else {
                continue;
            };
            let url = located.root.join(&response.href)?;
            tracing::debug!(%url, %kind, "found collection");
            collections.push(RemoteCollection {
                url,
                kind,
                display_name: props.display_name.clone(),
                ctag: props.ctag.clone(),
                sync_token: props.sync_token.clone(),
                writable: is_writable(&props),
                components: props.supported_components.clone().unwrap_or_default(),
                change_detection: change_detection(&props),
            });
        }
        Ok(collections)
    }
}

fn collection_kind(service: Service, props: &Properties) -> Option<CollectionKind> {
    match service {
        Service::CalDav if props.has_type("calendar") => {
            let Some(components) = &props.supported_components else {
                return Some(CollectionKind::Calendar);
            };
            if components.iter().any(|c| c == "VEVENT") {
                Some(CollectionKind::Calendar)
            } else if components.iter().any(|c| c == "VTODO") {
                Some(CollectionKind::TaskList)
            } else {
                None
            }
        }
        Service::CardDav if props.has_type("addressbook") => Some(CollectionKind::AddressBook),
        _ => None,
    }
}

fn is_writable(props: &Properties) -> bool {
    props.privileges.as_ref().is_none_or(|privileges| {
        privileges
            .iter()
            .any(|p| matches!(p.as_str(), "all" | "write" | "write-content"))
    })
}

fn change_detection(props: &Properties) -> ChangeDetection {
    if props.supported_reports.iter().any(|r| r == "sync-collection") || props.sync_token.is_some() {
        ChangeDetection::SyncCollection
    } else if props.ctag.is_some() {
        ChangeDetection::CTag
    } else {
        ChangeDetection::ETagScan
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn props(types: &[&str], components: Option<&[&str]>) -> Properties {
        Properties {
            resource_types: types.iter().map(ToString::to_string).collect(),
            supported_components: components
                .map(|c| c.iter().map(ToString::to_string).collect()),
            ..Properties::default()
        }
    }

    #[test]
    fn task_only_calendar_is_a_task_list() {
        let p = props(&["collection", "calendar"], Some(&["VTODO"]));
        assert_eq!(collection_kind(Service::CalDav, &p), Some(CollectionKind::TaskList));
        let p = props(&["collection", "calendar"], Some(&["VEVENT", "VTODO"]));
        assert_eq!(collection_kind(Service::CalDav, &p), Some(CollectionKind::Calendar));
        let p = props(&["collection", "calendar"], Some(&["VJOURNAL"]));
        assert_eq!(collection_kind(Service::CalDav, &p), None);
    }

    #[test]
    fn address_books_only_for_carddav() {
        let p = props(&["collection", "addressbook"], None);
        assert_eq!(collection_kind(Service::CardDav, &p), Some(CollectionKind::AddressBook));
        assert_eq!(collection_kind(Service::CalDav, &p), None);
    }

    #[test]
    fn privileges_decide_writability() {
        let mut p = Properties::default();
        assert!(is_writable(&p));
        p.privileges = Some(vec!["read".to_string()]);
        assert!(!is_writable(&p));
        p.privileges = Some(vec!["read".to_string(), "write-content".to_string()]);
        assert!(is_writable(&p));
    }

    #[test]
    fn capability_probe_prefers_sync_collection() {
        let mut p = Properties {
            ctag: Some("c".to_string()),
            ..Properties::default()
        };
        assert_eq!(change_detection(&p), ChangeDetection::CTag);
        p.supported_reports.push("sync-collection".to_string());
        assert_eq!(change_detection(&p), ChangeDetection::SyncCollection);
        assert_eq!(change_detection(&Properties::default()), ChangeDetection::ETagScan);
    }
}
