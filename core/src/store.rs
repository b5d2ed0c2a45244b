// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Contract of the local store the engine reads from and commits to.

use async_trait::async_trait;
use url::Url;

use crate::conflict::PendingConflict;
use crate::model::{Account, AccountId, Collection, CollectionId, ConflictId, Item};

/// Errors surfaced by a [`LocalStore`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// Another collection already uses this remote URL.
    #[error("collection URL already in use: {0}")]
    DuplicateUrl(Url),

    /// The referenced record does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Backend-specific failure.
    #[error("store backend error: {0}")]
    Backend(String),
}

/// Writes of one collection sync, applied all-or-nothing.
///
/// The collection record (with its new tokens) and every item change land
/// together, so no reader sees an etag without its content.
#[derive(Debug, Clone, Default)]
pub struct ChangeSet {
    /// Updated collection record, if tokens or metadata changed.
    pub collection: Option<Collection>,
    /// Items to insert or replace, keyed by their collection and UID.
    pub upserts: Vec<Item>,
    /// Items to remove, as `(collection, uid)`.
    pub purges: Vec<(CollectionId, String)>,
    /// Conflicts to record; replaces any pending conflict for the same item.
    pub conflicts: Vec<PendingConflict>,
    /// Conflicts that were resolved.
    pub resolved: Vec<ConflictId>,
}

impl ChangeSet {
    /// Whether the change set writes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.collection.is_none()
            && self.upserts.is_empty()
            && self.purges.is_empty()
            && self.conflicts.is_empty()
            && self.resolved.is_empty()
    }
}

/// Persistent home of accounts, collections, items and pending conflicts.
///
/// Implementations must apply [`LocalStore::commit`] atomically and keep
/// collection URLs unique across all accounts. Removing an account removes
/// its collections, and removing a collection removes its items and
/// conflicts.
#[async_trait]
pub trait LocalStore: Send + Sync {
    /// Looks up an account.
    async fn account(&self, id: AccountId) -> Result<Option<Account>, StoreError>;

    /// Every account.
    async fn accounts(&self) -> Result<Vec<Account>, StoreError>;

    /// Inserts or replaces an account.
    async fn upsert_account(&self, account: Account) -> Result<(), StoreError>;

    /// Removes an account with its collections and items.
    async fn remove_account(&self, id: AccountId) -> Result<(), StoreError>;

    /// Looks up a collection.
    async fn collection(&self, id: CollectionId) -> Result<Option<Collection>, StoreError>;

    /// Collections of an account, ordered by URL.
    async fn collections(&self, account: AccountId) -> Result<Vec<Collection>, StoreError>;

    /// Inserts or replaces a collection.
    ///
    /// Fails with [`StoreError::DuplicateUrl`] if another collection owns
    /// the URL.
    async fn upsert_collection(&self, collection: Collection) -> Result<(), StoreError>;

    /// Removes a collection with its items and conflicts.
    async fn remove_collection(&self, id: CollectionId) -> Result<(), StoreError>;

    /// Looks up an item by UID.
    async fn item(&self, collection: CollectionId, uid: &str) -> Result<Option<Item>, StoreError>;

    /// Every item of a collection, including soft-deleted ones.
    async fn items(&self, collection: CollectionId) -> Result<Vec<Item>, StoreError>;

    /// Inserts or replaces an item.
    async fn put_item(&self, item: Item) -> Result<(), StoreError>;

    /// Marks an item deleted pending push; items that never reached the
    /// server are removed immediately.
    async fn soft_delete_item(&self, collection: CollectionId, uid: &str)
    -> Result<(), StoreError>;

    /// Removes an item.
    async fn hard_delete_item(&self, collection: CollectionId, uid: &str)
    -> Result<(), StoreError>;

    /// Items with a local edit pending push.
    async fn dirty_items(&self, collection: CollectionId) -> Result<Vec<Item>, StoreError>;

    /// Items with a local deletion pending push.
    async fn deleted_items(&self, collection: CollectionId) -> Result<Vec<Item>, StoreError>;

    /// Looks up a pending conflict.
    async fn conflict(&self, id: ConflictId) -> Result<Option<PendingConflict>, StoreError>;

    /// Pending conflicts of a collection.
    async fn conflicts(&self, collection: CollectionId)
    -> Result<Vec<PendingConflict>, StoreError>;

    /// Applies a change set atomically.
    async fn commit(&self, changes: ChangeSet) -> Result<(), StoreError>;
}
