// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use std::fmt;
use std::ops::Deref;

use davsync_codec::{CodecError, Document, ItemKind};
use url::Url;

use crate::error::DavError;

/// Resource href (path) as reported by the server.
///
/// Absolute URLs in responses are reduced to their path, so hrefs from one
/// server compare as plain strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Href(String);

impl Href {
    /// Creates a new `Href` from a string.
    #[must_use]
    pub const fn new(href: String) -> Self {
        Self(href)
    }

    /// Returns the inner string value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Deref for Href {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<str> for Href {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Href {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for Href {
    fn from(href: String) -> Self {
        Self(href)
    }
}

impl From<&str> for Href {
    fn from(href: &str) -> Self {
        Self(href.to_string())
    }
}

impl From<&Url> for Href {
    fn from(url: &Url) -> Self {
        Self(url.path().to_string())
    }
}

/// Entity tag, opaque and compared verbatim (quotes included).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ETag(String);

impl ETag {
    /// Creates a new `ETag` from a string.
    #[must_use]
    pub const fn new(etag: String) -> Self {
        Self(etag)
    }

    /// Returns the inner string value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Deref for ETag {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<str> for ETag {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ETag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for ETag {
    fn from(etag: String) -> Self {
        Self(etag)
    }
}

impl From<&str> for ETag {
    fn from(etag: &str) -> Self {
        Self(etag.to_string())
    }
}

/// Kind of a synchronizable collection.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
    serde::Deserialize,
    serde::Serialize,
)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum CollectionKind {
    /// CalDAV collection holding events (possibly tasks as well).
    Calendar,
    /// CardDAV address book.
    AddressBook,
    /// CalDAV collection holding tasks only.
    TaskList,
}

impl CollectionKind {
    /// Whether items are vCards.
    #[must_use]
    pub const fn is_address_book(self) -> bool {
        matches!(self, Self::AddressBook)
    }

    /// Whether a collection of this kind may hold items of `kind`.
    #[must_use]
    pub const fn holds(self, kind: ItemKind) -> bool {
        match self {
            Self::AddressBook => matches!(kind, ItemKind::Contact),
            Self::Calendar => !matches!(kind, ItemKind::Contact),
            Self::TaskList => matches!(kind, ItemKind::Task),
        }
    }
}

/// How changes in a collection are detected, probed once at discovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeDetection {
    /// RFC 6578 `sync-collection` REPORT, with a full listing fallback.
    SyncCollection,
    /// `getctag` comparison followed by a full listing.
    CTag,
    /// No collection token; every sync lists and compares etags.
    ETagScan,
}

/// A collection as reported by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteCollection {
    /// Absolute URL.
    pub url: Url,
    /// Collection kind.
    pub kind: CollectionKind,
    /// `displayname`.
    pub display_name: Option<String>,
    /// `getctag`.
    pub ctag: Option<String>,
    /// `sync-token`.
    pub sync_token: Option<String>,
    /// Whether the current user may write items.
    pub writable: bool,
    /// `supported-calendar-component-set`, upper-cased.
    pub components: Vec<String>,
    /// Change detection capability.
    pub change_detection: ChangeDetection,
}

/// Collection-level change tokens, from a depth-0 PROPFIND.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectionState {
    /// `getctag`.
    pub ctag: Option<String>,
    /// `sync-token`.
    pub sync_token: Option<String>,
}

impl CollectionState {
    /// The token used for the cheap "unchanged" check: ctag, else sync token.
    #[must_use]
    pub fn change_token(&self) -> Option<&str> {
        self.ctag.as_deref().or(self.sync_token.as_deref())
    }
}

/// A member of a collection with its current etag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceEntry {
    /// Member href.
    pub href: Href,
    /// Current etag.
    pub etag: ETag,
}

/// Result of a `sync-collection` REPORT.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncDelta {
    /// Members created or changed since the token.
    pub changed: Vec<ResourceEntry>,
    /// Members removed since the token.
    pub removed: Vec<Href>,
    /// New token.
    pub sync_token: Option<String>,
}

/// A fetched member body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedResource {
    /// Member href.
    pub href: Href,
    /// Etag of this body.
    pub etag: ETag,
    /// Raw iCalendar or vCard text.
    pub body: String,
}

impl FetchedResource {
    /// Parses the body.
    ///
    /// # Errors
    ///
    /// Returns the codec error if the body is not a valid item.
    pub fn parse(&self) -> Result<Document, CodecError> {
        Document::parse(&self.body)
    }
}

/// Result of fetching a batch of members.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultiGetResult {
    /// Bodies retrieved.
    pub found: Vec<FetchedResource>,
    /// Hrefs the server no longer has.
    pub missing: Vec<Href>,
    /// Hrefs whose individual fetch failed, with the error.
    pub failed: Vec<(Href, DavError)>,
}

/// Condition attached to a PUT.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PutCondition {
    /// `If-None-Match: *`; fails if the resource exists.
    Create,
    /// `If-Match: <etag>`; fails if the resource changed.
    Update(ETag),
}

/// Services located by discovery.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveryResult {
    /// Principal URL, when reported.
    pub principal: Option<Url>,
    /// CalDAV root (calendar home set or fallback).
    pub calendar_root: Option<Url>,
    /// CardDAV root (address book home set or fallback).
    pub addressbook_root: Option<Url>,
    /// Collections below the roots.
    pub collections: Vec<RemoteCollection>,
}
