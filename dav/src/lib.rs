// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! WebDAV client for `CalDAV` (RFC 4791) and `CardDAV` (RFC 6352) collections.
//!
//! Covers service discovery (RFC 6764), collection listing, incremental
//! `sync-collection` reports (RFC 6578), multiget fetches and conditional
//! writes keyed by entity tags.

#![warn(
    trivial_casts,
    trivial_numeric_casts,
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs,
    unsafe_code,
    unstable_features,
    unused_import_braces,
    unused_qualifications,
    clippy::dbg_macro,
    clippy::pedantic
)]
// Allow certain clippy lints that are too restrictive for this crate
#![allow(
    clippy::module_name_repetitions,
    clippy::similar_names,
    clippy::single_match_else,
    clippy::missing_errors_doc
)]

mod client;
mod config;
mod discovery;
mod error;
mod http;
mod request;
mod response;
mod tls;
mod types;
mod xml;

pub use crate::client::{DavClient, Depth};
pub use crate::config::{AuthMethod, DavConfig};
pub use crate::error::DavError;
pub use crate::request::{
    MultiGetRequest, Prop, PropFindRequest, PropPatchRequest, SyncCollectionRequest,
};
pub use crate::response::{MultiStatus, PropStat, Properties, Response, normalize_href};
pub use crate::tls::{PinnedCertVerifier, pinned_client_config};
pub use crate::types::{
    ChangeDetection, CollectionKind, CollectionState, DiscoveryResult, ETag, FetchedResource,
    Href, MultiGetResult, PutCondition, RemoteCollection, ResourceEntry, SyncDelta,
};
pub use crate::xml::{Element, ns, parse_document};
