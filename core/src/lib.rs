// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Incremental two-way sync of CalDAV calendars, task lists and CardDAV
//! address books against a local store.
//!
//! [`SyncEngine`] syncs one collection at a time: it compares change tokens,
//! lists what changed, downloads it, reconciles it with pending local edits
//! under a conflict [`Strategy`], pushes local changes with conditional
//! requests and commits the outcome atomically. [`SyncScheduler`] runs the
//! collections of an account on a bounded worker pool with retries.

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
    clippy::indexing_slicing,
    clippy::pedantic
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::similar_names,
    clippy::single_match_else
)]

mod cancel;
mod config;
mod conflict;
mod engine;
mod error;
mod memory;
mod model;
mod scheduler;
mod store;

pub use crate::cancel::{CancelToken, Phase};
pub use crate::config::{
    APP_NAME, AccountConfig, CONFIG_ENV, Config, ConfigError, SyncConfig, default_path,
};
pub use crate::conflict::{Outcome, PendingConflict, Resolution, Strategy, resolve};
pub use crate::engine::{SyncEngine, SyncSummary};
pub use crate::error::SyncError;
pub use crate::memory::MemoryStore;
pub use crate::model::{Account, AccountId, Collection, CollectionId, ConflictId, Item};
pub use crate::scheduler::{AccountReport, CollectionOutcome, SyncScheduler};
pub use crate::store::{ChangeSet, LocalStore, StoreError};
