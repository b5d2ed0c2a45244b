// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Account, collection and item records owned by the local store.

use std::fmt;

use davsync_codec::{Document, ItemKind};
use davsync_dav::{ChangeDetection, CollectionKind, DavConfig, ETag, Href, RemoteCollection};
use url::Url;
use uuid::Uuid;

use crate::config::AccountConfig;

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(Uuid);

        impl $name {
            /// Generates a fresh random id.
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// The underlying UUID.
            #[must_use]
            pub const fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

id_type!(
    /// Identifier of an [`Account`].
    AccountId
);
id_type!(
    /// Identifier of a [`Collection`].
    CollectionId
);
id_type!(
    /// Identifier of a pending conflict.
    ConflictId
);

/// A server account and the collection kinds synced from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    /// Store identity.
    pub id: AccountId,
    /// Human-readable name.
    pub name: String,
    /// Server URL, credentials and transport options.
    pub dav: DavConfig,
    /// Collection kinds enabled for this account.
    pub kinds: Vec<CollectionKind>,
}

impl Account {
    /// Creates an account with a fresh id.
    #[must_use]
    pub fn new(name: impl Into<String>, dav: DavConfig, kinds: Vec<CollectionKind>) -> Self {
        Self {
            id: AccountId::new(),
            name: name.into(),
            dav,
            kinds,
        }
    }

    /// Whether collections of `kind` are synced.
    #[must_use]
    pub fn is_enabled(&self, kind: CollectionKind) -> bool {
        self.kinds.contains(&kind)
    }
}

impl From<AccountConfig> for Account {
    fn from(config: AccountConfig) -> Self {
        Self::new(config.name, config.dav, config.kinds)
    }
}

/// A synchronizable calendar, task list or address book.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collection {
    /// Store identity.
    pub id: CollectionId,
    /// Owning account.
    pub account: AccountId,
    /// Remote URL, unique across all accounts.
    pub url: Url,
    /// Collection kind.
    pub kind: CollectionKind,
    /// Display name.
    pub display_name: Option<String>,
    /// Token compared during detection: `getctag`, else `sync-token`.
    pub change_token: Option<String>,
    /// Last `sync-token`, used as the start of the next REPORT.
    pub sync_token: Option<String>,
    /// Change detection capability probed at discovery.
    pub change_detection: ChangeDetection,
    /// Whether the scheduler syncs this collection.
    pub enabled: bool,
    /// Whether the collection is shown to the user.
    pub visible: bool,
    /// Whether the user may write items.
    pub writable: bool,
}

impl Collection {
    /// Creates a never-synced record from a discovered collection.
    #[must_use]
    pub fn from_remote(account: AccountId, remote: &RemoteCollection) -> Self {
        Self {
            id: CollectionId::new(),
            account,
            url: remote.url.clone(),
            kind: remote.kind,
            display_name: remote.display_name.clone(),
            change_token: None,
            sync_token: None,
            change_detection: remote.change_detection,
            enabled: true,
            visible: true,
            writable: remote.writable,
        }
    }

    /// Refreshes server-reported attributes, keeping tokens and flags.
    pub fn update_from_remote(&mut self, remote: &RemoteCollection) {
        self.kind = remote.kind;
        self.display_name.clone_from(&remote.display_name);
        self.change_detection = remote.change_detection;
        self.writable = remote.writable;
    }

    /// Href for a new member with the given UID.
    ///
    /// Characters outside `[A-Za-z0-9._-]` are replaced so the UID is safe
    /// as a path segment.
    #[must_use]
    pub fn member_href(&self, uid: &str, extension: &str) -> Href {
        let name: String = uid
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                    c
                } else {
                    '-'
                }
            })
            .collect();
        let base = self.url.path().trim_end_matches('/');
        Href::new(format!("{base}/{name}.{extension}"))
    }
}

/// A calendar event, task or contact mirrored from a collection.
///
/// Items are keyed by UID within their collection; the href may change when
/// the server renames a resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    /// Owning collection.
    pub collection: CollectionId,
    /// Protocol-level identity.
    pub uid: String,
    /// Remote path, `None` until the first successful push.
    pub href: Option<Href>,
    /// Server version stamp, `None` until synced.
    pub etag: Option<ETag>,
    /// Local edit pending push.
    pub dirty: bool,
    /// Local deletion pending push.
    pub deleted: bool,
    /// Parsed body.
    pub content: Document,
    /// UID of the parent task once it exists in the same collection.
    pub parent: Option<String>,
}

impl Item {
    /// A locally created item, pending its first push.
    #[must_use]
    pub fn new_local(collection: CollectionId, content: Document) -> Self {
        Self {
            collection,
            uid: content.uid().to_string(),
            href: None,
            etag: None,
            dirty: true,
            deleted: false,
            content,
            parent: None,
        }
    }

    /// An item materialized from the server.
    #[must_use]
    pub fn from_remote(collection: CollectionId, href: Href, etag: ETag, content: Document) -> Self {
        Self {
            collection,
            uid: content.uid().to_string(),
            href: Some(href),
            etag: Some(etag),
            dirty: false,
            deleted: false,
            content,
            parent: None,
        }
    }

    /// Item kind.
    #[must_use]
    pub fn kind(&self) -> ItemKind {
        self.content.kind()
    }

    /// Replaces the content with a local edit.
    pub fn edit(&mut self, content: Document) {
        self.content = content;
        self.dirty = true;
    }

    /// Whether the item has local changes to push.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        self.dirty || self.deleted
    }

    /// Whether the item never reached the server.
    #[must_use]
    pub const fn is_local_only(&self) -> bool {
        self.href.is_none()
    }
}
