// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Multistatus (RFC 4918 §13) response parsing.

use url::Url;

use crate::error::DavError;
use crate::types::{ETag, Href};
use crate::xml::{Element, parse_document};

/// A parsed `multistatus` document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultiStatus {
    /// One entry per `response` element.
    pub responses: Vec<Response>,
    /// Top-level `sync-token` of a `sync-collection` REPORT.
    pub sync_token: Option<String>,
}

/// One `response` element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Target href.
    pub href: Href,
    /// Response-level status, present when there are no propstats.
    pub status: Option<u16>,
    /// Property groups with their statuses.
    pub propstats: Vec<PropStat>,
}

/// Properties sharing one status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropStat {
    /// HTTP status of these properties.
    pub status: u16,
    /// The properties.
    pub props: Properties,
}

/// Properties this crate understands; everything else is skipped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Properties {
    /// `displayname`.
    pub display_name: Option<String>,
    /// Local names inside `resourcetype` (`collection`, `calendar`, ...).
    pub resource_types: Vec<String>,
    /// `getetag`.
    pub etag: Option<ETag>,
    /// `getcontenttype`.
    pub content_type: Option<String>,
    /// `getctag`.
    pub ctag: Option<String>,
    /// `sync-token`.
    pub sync_token: Option<String>,
    /// `current-user-principal`.
    pub current_user_principal: Option<Href>,
    /// `calendar-home-set`.
    pub calendar_home_set: Vec<Href>,
    /// `addressbook-home-set`.
    pub addressbook_home_set: Vec<Href>,
    /// Local names in `current-user-privilege-set`; `None` when not reported.
    pub privileges: Option<Vec<String>>,
    /// Reports in `supported-report-set`.
    pub supported_reports: Vec<String>,
    /// `comp` names in `supported-calendar-component-set`; `None` when not reported.
    pub supported_components: Option<Vec<String>>,
    /// `calendar-data`.
    pub calendar_data: Option<String>,
    /// `address-data`.
    pub address_data: Option<String>,
}

impl Properties {
    fn merge(&mut self, other: Self) {
        macro_rules! take {
            ($($field:ident),*) => {
                $(if other.$field.is_some() { self.$field = other.$field; })*
            };
        }
        take!(
            display_name,
            etag,
            content_type,
            ctag,
            sync_token,
            current_user_principal,
            privileges,
            supported_components,
            calendar_data,
            address_data
        );
        self.resource_types.extend(other.resource_types);
        self.calendar_home_set.extend(other.calendar_home_set);
        self.addressbook_home_set.extend(other.addressbook_home_set);
        self.supported_reports.extend(other.supported_reports);
    }

    /// Whether `resourcetype` contains `name`.
    #[must_use]
    pub fn has_type(&self, name: &str) -> bool {
        self.resource_types.iter().any(|t| t == name)
    }

    /// Whether this is a collection of any kind.
    #[must_use]
    pub fn is_collection(&self) -> bool {
        self.has_type("collection")
    }

    /// Calendar data or address data, whichever is present.
    #[must_use]
    pub fn data(&self) -> Option<&str> {
        self.calendar_data.as_deref().or(self.address_data.as_deref())
    }
}

impl Response {
    /// Merged properties of every 2xx propstat.
    #[must_use]
    pub fn props(&self) -> Properties {
        let mut merged = Properties::default();
        for ps in self.propstats.iter().filter(|ps| is_success(ps.status)) {
            merged.merge(ps.props.clone());
        }
        merged
    }

    /// Whether the response reports the resource as gone.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self.status, Some(404 | 410))
    }
}

impl MultiStatus {
    /// Parses a multistatus body.
    ///
    /// Absolute hrefs are reduced to their path.
    ///
    /// # Errors
    ///
    /// Returns [`DavError::InvalidMultistatus`] if the body is not XML or its
    /// root element is not `multistatus`.
    pub fn from_xml(xml: &str) -> Result<Self, DavError> {
        let root = parse_document(xml).map_err(|e| DavError::InvalidMultistatus(e.to_string()))?;
        if root.name != "multistatus" {
            return Err(DavError::InvalidMultistatus(format!(
                "root element is <{}>",
                root.name
            )));
        }

        let responses = root
            .children_named("response")
            .map(parse_response)
            .collect::<Vec<_>>();
        let sync_token = root
            .child("sync-token")
            .map(|t| t.text().to_string())
            .filter(|t| !t.is_empty());

        Ok(Self {
            responses,
            sync_token,
        })
    }

    /// The response for `href`, ignoring a trailing slash.
    #[must_use]
    pub fn find(&self, href: &str) -> Option<&Response> {
        let wanted = href.trim_end_matches('/');
        self.responses
            .iter()
            .find(|r| r.href.trim_end_matches('/') == wanted)
    }
}

fn parse_response(el: &Element) -> Response {
    let href = el.hrefs().next().map(normalize_href).unwrap_or_default();
    let status = el.child("status").and_then(|s| parse_status(s.text()));
    let propstats = el
        .children_named("propstat")
        .map(|ps| PropStat {
            status: ps
                .child("status")
                .and_then(|s| parse_status(s.text()))
                .unwrap_or(200),
            props: ps.child("prop").map(parse_props).unwrap_or_default(),
        })
        .collect();
    Response {
        href: Href::new(href),
        status,
        propstats,
    }
}

fn parse_props(prop: &Element) -> Properties {
    let mut props = Properties::default();
    for el in &prop.children {
        let text = || Some(el.text().to_string()).filter(|t| !t.is_empty());
        let hrefs = || el.hrefs().map(|h| Href::new(normalize_href(h))).collect();
        match el.name.as_str() {
            "displayname" => props.display_name = text(),
            "resourcetype" => {
                props.resource_types = el.children.iter().map(|c| c.name.clone()).collect();
            }
            "getetag" => props.etag = text().map(ETag::new),
            "getcontenttype" => props.content_type = text(),
            "getctag" => props.ctag = text(),
            "sync-token" => props.sync_token = text(),
            "current-user-principal" => {
                props.current_user_principal =
                    el.hrefs().next().map(|h| Href::new(normalize_href(h)));
            }
            "calendar-home-set" => props.calendar_home_set = hrefs(),
            "addressbook-home-set" => props.addressbook_home_set = hrefs(),
            "current-user-privilege-set" => {
                props.privileges = Some(
                    el.children_named("privilege")
                        .flat_map(|p| p.children.iter().map(|c| c.name.clone()))
                        .collect(),
                );
            }
            "supported-report-set" => {
                props.supported_reports = el
                    .children_named("supported-report")
                    .filter_map(|sr| sr.child("report"))
                    .flat_map(|r| r.children.iter().map(|c| c.name.clone()))
                    .collect();
            }
            "supported-calendar-component-set" => {
                props.supported_components = Some(
                    el.children_named("comp")
                        .filter_map(|c| c.attr("name"))
                        .map(str::to_ascii_uppercase)
                        .collect(),
                );
            }
            "calendar-data" => props.calendar_data = text(),
            "address-data" => props.address_data = text(),
            _ => {}
        }
    }
    props
}

/// Parses `HTTP/1.1 200 OK` into `200`.
fn parse_status(line: &str) -> Option<u16> {
    line.split_whitespace().nth(1)?.parse().ok()
}

fn is_success(status: u16) -> bool {
    (200..300).contains(&status)
}

/// Reduces an absolute URL to its path; paths are returned unchanged.
#[must_use]
pub fn normalize_href(href: &str) -> String {
    match Url::parse(href) {
        Ok(url) if url.has_host() => url.path().to_string(),
        _ => href.to_string(),
    }
}
