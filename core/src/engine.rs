// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Incremental sync of one collection.
//!
//! A sync runs detect, enumerate, fetch and reconcile against a working copy
//! of the collection's items, pushes pending local changes, and commits the
//! result in one [`ChangeSet`]. Nothing reaches the store before the commit,
//! so a failure or cancellation before pushing leaves the previous tokens
//! and etags untouched and the next attempt starts over from detection.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError};

use davsync_codec::Document;
use davsync_dav::{
    ChangeDetection, DavClient, DavError, ETag, FetchedResource, Href, PutCondition,
    ResourceEntry,
};
use jiff::Timestamp;
use uuid::Uuid;

use crate::cancel::{CancelToken, Phase};
use crate::config::SyncConfig;
use crate::conflict::{self, Outcome, PendingConflict, Resolution};
use crate::error::SyncError;
use crate::model::{Account, AccountId, Collection, CollectionId, ConflictId, Item};
use crate::store::{ChangeSet, LocalStore, StoreError};

/// Result of one collection sync.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncSummary {
    /// Items changed locally or remotely: pulled, pushed and purged.
    pub items_synced: usize,
    /// Remote items inserted or overwritten locally.
    pub pulled: usize,
    /// Local creations, updates and deletions accepted by the server.
    pub pushed: usize,
    /// Local items removed because the server deleted them.
    pub purged: usize,
    /// Items where both sides changed.
    pub conflicts: usize,
    /// Items that failed to fetch, parse or push; retried next sync.
    pub failures: usize,
    /// Local changes left unpushed because the collection is read-only.
    pub pending: usize,
    /// Change token stored after this sync.
    pub new_change_token: Option<String>,
    /// Tasks whose parent UID is not present in the collection.
    pub unresolved_parents: usize,
}

/// Drives collection syncs against a [`LocalStore`].
///
/// At most one sync per collection runs at a time; a second call for the
/// same collection fails with [`SyncError::AlreadySyncing`].
#[derive(Debug)]
pub struct SyncEngine<S: ?Sized> {
    config: SyncConfig,
    running: Mutex<HashSet<CollectionId>>,
    clients: Mutex<HashMap<AccountId, DavClient>>,
    store: Arc<S>,
}

/// Marks a collection busy until dropped.
struct Running<'a> {
    set: &'a Mutex<HashSet<CollectionId>>,
    id: CollectionId,
}

impl Drop for Running<'_> {
    fn drop(&mut self) {
        self.set
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.id);
    }
}

impl<S: LocalStore + ?Sized> SyncEngine<S> {
    /// Creates an engine over `store`.
    pub fn new(store: Arc<S>, config: SyncConfig) -> Self {
        Self {
            config,
            running: Mutex::new(HashSet::new()),
            clients: Mutex::new(HashMap::new()),
            store,
        }
    }

    /// The store this engine commits to.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Engine configuration.
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Syncs one collection in both directions.
    ///
    /// # Errors
    ///
    /// Returns an error if the collection is unknown or already syncing,
    /// if the server cannot be reached or rejects the credentials, if the
    /// collection listing is not understood, or if `cancel` fires before
    /// pushing starts. Per-item failures are counted in the summary instead.
    #[tracing::instrument(skip(self, cancel), fields(collection = %id))]
    pub async fn sync(
        &self,
        id: CollectionId,
        cancel: &CancelToken,
    ) -> Result<SyncSummary, SyncError> {
        let _running = self.begin(id)?;

        let collection = self
            .store
            .collection(id)
            .await?
            .ok_or(SyncError::CollectionNotFound(id))?;
        let account = self.account(collection.account).await?;
        let client = self.client_for(&account)?;
        let items = self.store.items(id).await?;
        let suspended = self
            .store
            .conflicts(id)
            .await?
            .into_iter()
            .map(|c| c.uid)
            .collect();

        let mut run = CollectionSync::new(&client, &self.config, collection, items, suspended);
        run.pull(cancel).await?;

        // from here on the run completes so pushed changes get committed
        let push_error = run.push().await;
        let (changes, summary) = run.finish();
        if !changes.is_empty() {
            self.store.commit(changes).await?;
        }

        if let Some(e) = push_error {
            tracing::warn!(error = %e, "push aborted");
            return Err(e);
        }
        tracing::info!(
            synced = summary.items_synced,
            pulled = summary.pulled,
            pushed = summary.pushed,
            purged = summary.purged,
            conflicts = summary.conflicts,
            failures = summary.failures,
            "collection synced"
        );
        Ok(summary)
    }

    /// Runs discovery for an account and reconciles its collection records.
    ///
    /// Known URLs keep their ids, tokens and flags; collections the server
    /// no longer lists are removed with their items; kinds the account does
    /// not enable are ignored. A discovery failure records nothing.
    ///
    /// # Errors
    ///
    /// Returns an error if the account is unknown, discovery fails, or the
    /// store rejects a write.
    #[tracing::instrument(skip(self), fields(account = %account_id))]
    pub async fn refresh_collections(
        &self,
        account_id: AccountId,
    ) -> Result<Vec<Collection>, SyncError> {
        let account = self.account(account_id).await?;
        let client = self.client_for(&account)?;
        let discovered = client.discover().await?;

        let existing = self.store.collections(account_id).await?;
        let mut kept = Vec::new();
        for remote in discovered
            .collections
            .iter()
            .filter(|c| account.is_enabled(c.kind))
        {
            let collection = match existing.iter().find(|c| c.url == remote.url) {
                Some(known) => {
                    let mut known = known.clone();
                    known.update_from_remote(remote);
                    known
                }
                None => Collection::from_remote(account_id, remote),
            };
            match self.store.upsert_collection(collection.clone()).await {
                Ok(()) => kept.push(collection),
                Err(StoreError::DuplicateUrl(url)) => {
                    tracing::warn!(%url, "collection belongs to another account, skipped");
                }
                Err(e) => return Err(e.into()),
            }
        }

        for stale in existing
            .iter()
            .filter(|c| !kept.iter().any(|k| k.id == c.id))
        {
            tracing::info!(url = %stale.url, "collection no longer listed, removing");
            self.store.remove_collection(stale.id).await?;
        }

        kept.sort_by(|a, b| a.url.as_str().cmp(b.url.as_str()));
        Ok(kept)
    }

    /// Renames a collection on the server, then locally.
    ///
    /// # Errors
    ///
    /// Returns an error if the collection is unknown or the server rejects
    /// the change.
    pub async fn rename_collection(
        &self,
        id: CollectionId,
        display_name: &str,
    ) -> Result<(), SyncError> {
        let mut collection = self
            .store
            .collection(id)
            .await?
            .ok_or(SyncError::CollectionNotFound(id))?;
        let account = self.account(collection.account).await?;
        self.client_for(&account)?
            .rename(&collection.url, display_name)
            .await?;

        collection.display_name = Some(display_name.to_string());
        self.store.upsert_collection(collection).await?;
        Ok(())
    }

    /// Applies a user decision to a recorded conflict.
    ///
    /// No request is sent; a kept local copy is pushed by the next sync.
    ///
    /// # Errors
    ///
    /// Returns an error if the conflict is unknown, its collection is
    /// syncing, or the store fails.
    pub async fn resolve_conflict(
        &self,
        id: ConflictId,
        resolution: Resolution,
    ) -> Result<(), SyncError> {
        let conflict = self
            .store
            .conflict(id)
            .await?
            .ok_or(SyncError::ConflictNotFound(id))?;
        let _running = self.begin(conflict.collection)?;
        let current = self.store.item(conflict.collection, &conflict.uid).await?;

        let mut changes = ChangeSet {
            resolved: vec![id],
            ..ChangeSet::default()
        };
        match (resolution, &conflict.remote) {
            (Resolution::KeepLocal, None) if conflict.local_deleted => {
                changes.purges.push((conflict.collection, conflict.uid.clone()));
            }
            (Resolution::KeepLocal, remote) => {
                let mut item = current.unwrap_or_else(|| {
                    Item::new_local(conflict.collection, conflict.local.clone())
                });
                item.deleted = conflict.local_deleted;
                item.dirty = !item.deleted;
                match remote {
                    Some(remote) => {
                        if !item.deleted {
                            item.content.merge_unknown_from(remote);
                        }
                        item.href.clone_from(&conflict.remote_href);
                        item.etag.clone_from(&conflict.remote_etag);
                    }
                    None => {
                        item.href = None;
                        item.etag = None;
                    }
                }
                changes.upserts.push(item);
            }
            (Resolution::KeepRemote, Some(remote)) => {
                let parent = current.and_then(|i| i.parent);
                changes.upserts.push(Item {
                    collection: conflict.collection,
                    uid: conflict.uid.clone(),
                    href: conflict.remote_href.clone(),
                    etag: conflict.remote_etag.clone(),
                    dirty: false,
                    deleted: false,
                    content: remote.clone(),
                    parent,
                });
            }
            (Resolution::KeepRemote, None) => {
                changes.purges.push((conflict.collection, conflict.uid.clone()));
            }
        }

        tracing::info!(conflict = %id, uid = %conflict.uid, %resolution, "conflict resolved");
        self.store.commit(changes).await?;
        Ok(())
    }

    fn begin(&self, id: CollectionId) -> Result<Running<'_>, SyncError> {
        let mut running = self.running.lock().unwrap_or_else(PoisonError::into_inner);
        if !running.insert(id) {
            return Err(SyncError::AlreadySyncing(id));
        }
        Ok(Running {
            set: &self.running,
            id,
        })
    }

    async fn account(&self, id: AccountId) -> Result<Account, SyncError> {
        self.store
            .account(id)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("account {id}")).into())
    }

    /// Cached client for an account, rebuilt when its settings change.
    fn client_for(&self, account: &Account) -> Result<DavClient, SyncError> {
        let mut clients = self.clients.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(client) = clients
            .get(&account.id)
            .filter(|c| c.config() == &account.dav)
        {
            return Ok(client.clone());
        }
        let client = DavClient::new(account.dav.clone())?;
        clients.insert(account.id, client.clone());
        Ok(client)
    }
}

/// A fetched and parsed server item.
#[derive(Debug)]
struct RemoteItem {
    href: Href,
    etag: ETag,
    content: Document,
}

#[derive(Debug)]
enum RemoteChange {
    Updated(RemoteItem),
    Removed(Href),
}

impl RemoteChange {
    fn href(&self) -> &Href {
        match self {
            Self::Updated(remote) => &remote.href,
            Self::Removed(href) => href,
        }
    }
}

/// Members that differ from the local copy.
#[derive(Debug, Default)]
struct Listing {
    changed: Vec<ResourceEntry>,
    removed: Vec<Href>,
}

#[derive(Debug)]
enum Pushed {
    Stored { href: Href, etag: ETag },
    Deleted,
}

/// Working state of one collection sync.
struct CollectionSync<'a> {
    client: &'a DavClient,
    config: &'a SyncConfig,
    original: Collection,
    collection: Collection,
    items: BTreeMap<String, Item>,
    hrefs: HashMap<Href, String>,
    touched: BTreeSet<String>,
    purged: BTreeSet<String>,
    conflicts: Vec<PendingConflict>,
    suspended: HashSet<String>,
    new_change_token: Option<String>,
    new_sync_token: Option<String>,
    advance: bool,
    summary: SyncSummary,
}

impl<'a> CollectionSync<'a> {
    fn new(
        client: &'a DavClient,
        config: &'a SyncConfig,
        collection: Collection,
        items: Vec<Item>,
        suspended: HashSet<String>,
    ) -> Self {
        let hrefs = items
            .iter()
            .filter_map(|i| Some((i.href.clone()?, i.uid.clone())))
            .collect();
        Self {
            client,
            config,
            original: collection.clone(),
            collection,
            items: items.into_iter().map(|i| (i.uid.clone(), i)).collect(),
            hrefs,
            touched: BTreeSet::new(),
            purged: BTreeSet::new(),
            conflicts: Vec::new(),
            suspended,
            new_change_token: None,
            new_sync_token: None,
            advance: false,
            summary: SyncSummary::default(),
        }
    }

    /// Detect, enumerate, fetch and reconcile.
    async fn pull(&mut self, cancel: &CancelToken) -> Result<(), SyncError> {
        cancel.check(Phase::Detecting)?;
        let state = self.client.collection_state(&self.collection.url).await?;
        self.new_change_token = state.change_token().map(str::to_string);
        self.new_sync_token = state.sync_token;
        if self.new_change_token.is_some() && self.new_change_token == self.collection.change_token
        {
            tracing::debug!("change token unchanged, nothing to pull");
            return Ok(());
        }

        cancel.check(Phase::Enumerating)?;
        let listing = self.enumerate().await?;
        tracing::debug!(
            changed = listing.changed.len(),
            removed = listing.removed.len(),
            "collection enumerated"
        );

        cancel.check(Phase::Fetching)?;
        let (fetched, missing) = self.fetch(&listing.changed).await?;

        cancel.check(Phase::Reconciling)?;
        let mut changes: Vec<_> = fetched.into_iter().map(RemoteChange::Updated).collect();
        changes.extend(
            listing
                .removed
                .into_iter()
                .chain(missing)
                .map(RemoteChange::Removed),
        );
        self.reconcile(changes);

        self.advance = self.summary.failures == 0;
        if !self.advance {
            tracing::warn!(
                failures = self.summary.failures,
                "items failed, change token not advanced"
            );
        }
        Ok(())
    }

    async fn enumerate(&mut self) -> Result<Listing, SyncError> {
        if self.collection.change_detection == ChangeDetection::SyncCollection {
            if let Some(token) = self.collection.sync_token.clone() {
                match self
                    .client
                    .sync_collection(&self.collection.url, Some(&token))
                    .await
                {
                    Ok(delta) => {
                        if delta.sync_token.is_some() {
                            self.new_sync_token = delta.sync_token;
                        }
                        let changed = delta
                            .changed
                            .into_iter()
                            .filter(|e| !self.is_current(e))
                            .collect();
                        return Ok(Listing {
                            changed,
                            removed: delta.removed,
                        });
                    }
                    Err(DavError::InvalidSyncToken) => {
                        tracing::warn!("sync token rejected, falling back to a full listing");
                    }
                    Err(e) => return Err(e.into()),
                }
            }
        }

        let entries = self.client.list_items(&self.collection.url).await?;
        let listed: HashSet<&Href> = entries.iter().map(|e| &e.href).collect();
        let mut removed: Vec<Href> = self
            .hrefs
            .keys()
            .filter(|h| !listed.contains(h))
            .cloned()
            .collect();
        removed.sort();
        let changed = entries
            .iter()
            .filter(|e| !self.is_current(e))
            .cloned()
            .collect();
        Ok(Listing { changed, removed })
    }

    /// Whether the local item at this href already has this etag.
    fn is_current(&self, entry: &ResourceEntry) -> bool {
        self.hrefs
            .get(&entry.href)
            .and_then(|uid| self.items.get(uid))
            .is_some_and(|item| item.etag.as_ref() == Some(&entry.etag))
    }

    /// Downloads changed members in batches; returns parsed items and hrefs
    /// that vanished in between. Members that fail on their own count as
    /// failures and are retried on the next sync.
    async fn fetch(
        &mut self,
        changed: &[ResourceEntry],
    ) -> Result<(Vec<RemoteItem>, Vec<Href>), SyncError> {
        let hrefs: Vec<Href> = changed.iter().map(|e| e.href.clone()).collect();
        let mut fetched = Vec::new();
        let mut missing = Vec::new();
        for batch in hrefs.chunks(self.config.batch_size()) {
            let result = self
                .client
                .multiget(&self.collection.url, self.collection.kind, batch)
                .await?;
            missing.extend(result.missing);
            for (href, e) in result.failed {
                tracing::warn!(%href, error = %e, "item could not be fetched");
                self.summary.failures += 1;
            }
            for resource in result.found {
                if let Some(remote) = self.parse(resource) {
                    fetched.push(remote);
                }
            }
        }
        Ok((fetched, missing))
    }

    fn parse(&mut self, resource: FetchedResource) -> Option<RemoteItem> {
        let content = match resource.parse() {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!(href = %resource.href, error = %e, "unparseable item skipped");
                self.summary.failures += 1;
                return None;
            }
        };
        if content.uid().is_empty() {
            tracing::warn!(href = %resource.href, "item without UID skipped");
            self.summary.failures += 1;
            return None;
        }
        if !self.collection.kind.holds(content.kind()) {
            tracing::debug!(href = %resource.href, kind = %content.kind(), "foreign item kind ignored");
            return None;
        }
        Some(RemoteItem {
            href: resource.href,
            etag: resource.etag,
            content,
        })
    }

    /// Applies remote changes in href order, keyed by UID.
    fn reconcile(&mut self, mut changes: Vec<RemoteChange>) {
        changes.sort_by(|a, b| a.href().cmp(b.href()));
        // a UID arriving at a new href is a rename, not a deletion
        let incoming: HashSet<String> = changes
            .iter()
            .filter_map(|c| match c {
                RemoteChange::Updated(remote) => Some(remote.content.uid().to_string()),
                RemoteChange::Removed(_) => None,
            })
            .collect();

        for change in changes {
            match change {
                RemoteChange::Updated(remote) => self.apply_remote(remote),
                RemoteChange::Removed(href) => {
                    let Some(uid) = self.hrefs.get(&href).cloned() else {
                        continue;
                    };
                    if !incoming.contains(&uid) {
                        self.apply_removal(&uid);
                    }
                }
            }
        }
    }

    fn apply_remote(&mut self, remote: RemoteItem) {
        let uid = remote.content.uid().to_string();
        if let Some(previous) = self.hrefs.get(&remote.href).filter(|u| **u != uid).cloned() {
            tracing::debug!(href = %remote.href, %previous, "resource replaced by another UID");
            self.apply_removal(&previous);
        }

        let Some(local) = self.items.get(&uid).cloned() else {
            tracing::debug!(href = %remote.href, %uid, "new remote item");
            self.upsert(Item::from_remote(
                self.collection.id,
                remote.href,
                remote.etag,
                remote.content,
            ));
            self.summary.pulled += 1;
            return;
        };

        if local.etag.as_ref() == Some(&remote.etag) {
            if local.href.as_ref() != Some(&remote.href) {
                let mut moved = local;
                moved.href = Some(remote.href);
                self.upsert(moved);
            }
            return;
        }

        if !local.is_pending() {
            tracing::debug!(href = %remote.href, %uid, "remote update");
            self.take_remote(&local, remote);
            return;
        }

        tracing::info!(%uid, strategy = %self.config.strategy, "both sides changed");
        let outcome = conflict::resolve(&local, Some(&remote.content), self.config.strategy);
        self.apply_outcome(local, Some(remote), outcome);
    }

    fn apply_removal(&mut self, uid: &str) {
        let Some(local) = self.items.get(uid).cloned() else {
            return;
        };
        if !local.dirty || local.deleted {
            tracing::debug!(uid, "removed on server");
            self.purge(uid);
            self.summary.purged += 1;
            return;
        }

        tracing::info!(uid, strategy = %self.config.strategy, "edited locally, deleted on server");
        let outcome = conflict::resolve(&local, None, self.config.strategy);
        self.apply_outcome(local, None, outcome);
    }

    fn apply_outcome(&mut self, local: Item, remote: Option<RemoteItem>, outcome: Outcome) {
        self.summary.conflicts += 1;
        match outcome {
            Outcome::KeepRemote => match remote {
                Some(remote) => self.take_remote(&local, remote),
                None => {
                    self.purge(&local.uid);
                    self.summary.purged += 1;
                }
            },
            Outcome::KeepLocal => self.keep_local(local, remote, None),
            Outcome::Merged(content) => self.keep_local(local, remote, Some(content)),
            Outcome::AskUser(id) => {
                tracing::info!(uid = %local.uid, conflict = %id, "conflict deferred to user");
                self.suspended.insert(local.uid.clone());
                self.conflicts.push(PendingConflict {
                    id,
                    collection: self.collection.id,
                    uid: local.uid,
                    local: local.content,
                    local_deleted: local.deleted,
                    remote_href: remote.as_ref().map(|r| r.href.clone()),
                    remote_etag: remote.as_ref().map(|r| r.etag.clone()),
                    remote: remote.map(|r| r.content),
                    detected_at: Timestamp::now(),
                });
            }
        }
    }

    fn take_remote(&mut self, local: &Item, remote: RemoteItem) {
        let mut item = Item::from_remote(
            self.collection.id,
            remote.href,
            remote.etag,
            remote.content,
        );
        item.parent.clone_from(&local.parent);
        self.upsert(item);
        self.summary.pulled += 1;
    }

    /// Keeps the local copy pending, rebased on the server's etag, or
    /// revived as a new resource when the server deleted it.
    fn keep_local(&mut self, mut local: Item, remote: Option<RemoteItem>, merged: Option<Document>) {
        match remote {
            Some(remote) => {
                local.href = Some(remote.href);
                local.etag = Some(remote.etag);
            }
            None => {
                local.href = None;
                local.etag = None;
            }
        }
        if let Some(content) = merged {
            local.content = content;
        }
        local.dirty = !local.deleted;
        self.upsert(local);
    }

    /// Uploads pending local changes; returns the error that stopped it.
    async fn push(&mut self) -> Option<SyncError> {
        let mut pending: Vec<Item> = self
            .items
            .values()
            .filter(|i| i.is_pending() && !self.suspended.contains(&i.uid))
            .cloned()
            .collect();
        if pending.is_empty() {
            return None;
        }
        if !self.collection.writable {
            tracing::warn!(count = pending.len(), "read-only collection, local changes kept");
            self.summary.pending = pending.len();
            return None;
        }

        // existing resources first in href order, then creations by UID
        pending.sort_by(|a, b| {
            (a.href.is_none(), &a.href, &a.uid).cmp(&(b.href.is_none(), &b.href, &b.uid))
        });
        for item in pending {
            if let Err(e) = self.push_item(item).await {
                return Some(e);
            }
        }
        None
    }

    /// Pushes one item; a 412 or vanished resource re-reconciles it once.
    ///
    /// Only connection and authentication failures are returned; anything
    /// else is counted and the item stays pending.
    async fn push_item(&mut self, mut item: Item) -> Result<(), SyncError> {
        let mut retried = false;
        loop {
            match self.send(&item).await {
                Ok(pushed) => {
                    self.record_push(item, pushed);
                    return Ok(());
                }
                Err(DavError::PreconditionFailed { .. } | DavError::NotFound { .. })
                    if !retried =>
                {
                    retried = true;
                    tracing::info!(uid = %item.uid, "server changed during push, reconciling");
                    match self.rereconcile(item).await? {
                        Some(next) => item = next,
                        None => return Ok(()),
                    }
                }
                Err(e) if is_fatal(&e) => return Err(e.into()),
                Err(e) => {
                    tracing::warn!(uid = %item.uid, error = %e, "push failed");
                    self.summary.failures += 1;
                    return Ok(());
                }
            }
        }
    }

    async fn send(&self, item: &Item) -> Result<Pushed, DavError> {
        if item.deleted {
            let Some(href) = &item.href else {
                return Ok(Pushed::Deleted);
            };
            return match self.client.delete(href, item.etag.as_ref()).await {
                Ok(()) | Err(DavError::NotFound { .. }) => Ok(Pushed::Deleted),
                Err(e) => Err(e),
            };
        }

        let (href, condition) = match (&item.href, &item.etag) {
            (Some(href), Some(etag)) => (href.clone(), PutCondition::Update(etag.clone())),
            (Some(href), None) => (href.clone(), PutCondition::Create),
            (None, _) => (
                self.collection
                    .member_href(&item.uid, item.content.file_extension()),
                PutCondition::Create,
            ),
        };
        let etag = self
            .client
            .put(
                &href,
                item.content.to_wire(),
                item.content.content_type(),
                &condition,
            )
            .await?;
        Ok(Pushed::Stored { href, etag })
    }

    fn record_push(&mut self, mut item: Item, pushed: Pushed) {
        match pushed {
            Pushed::Deleted => {
                tracing::debug!(uid = %item.uid, "deletion pushed");
                self.purge(&item.uid);
            }
            Pushed::Stored { href, etag } => {
                tracing::debug!(uid = %item.uid, %href, %etag, "item pushed");
                item.href = Some(href);
                item.etag = Some(etag);
                item.dirty = false;
                self.upsert(item);
            }
        }
        self.summary.pushed += 1;
    }

    /// Fetches the server copy after a failed conditional request and runs
    /// the conflict strategy; returns the item to push again, if any.
    async fn rereconcile(&mut self, item: Item) -> Result<Option<Item>, SyncError> {
        let target = item.href.clone().unwrap_or_else(|| {
            self.collection
                .member_href(&item.uid, item.content.file_extension())
        });
        let remote = match self.client.get(&target).await {
            Ok(resource) => match resource.parse() {
                Ok(content) => Some(RemoteItem {
                    href: resource.href,
                    etag: resource.etag,
                    content,
                }),
                Err(e) => {
                    tracing::warn!(href = %target, error = %e, "server copy unparseable");
                    self.summary.failures += 1;
                    return Ok(None);
                }
            },
            Err(DavError::NotFound { .. }) => None,
            Err(e) if is_fatal(&e) => return Err(e.into()),
            Err(e) => {
                tracing::warn!(href = %target, error = %e, "server copy unavailable");
                self.summary.failures += 1;
                return Ok(None);
            }
        };

        if item.href.is_none() {
            match &remote {
                Some(remote) if remote.content.uid() != item.uid => {
                    // another resource owns the generated name
                    let mut item = item;
                    let name = format!("{}-{}", item.uid, Uuid::new_v4().simple());
                    item.href = Some(
                        self.collection
                            .member_href(&name, item.content.file_extension()),
                    );
                    return Ok(Some(item));
                }
                None => return Ok(Some(item)),
                Some(_) => {}
            }
        }

        if item.deleted && remote.is_none() {
            self.purge(&item.uid);
            self.summary.purged += 1;
            return Ok(None);
        }

        let uid = item.uid.clone();
        let outcome = conflict::resolve(
            &item,
            remote.as_ref().map(|r| &r.content),
            self.config.strategy,
        );
        self.apply_outcome(item, remote, outcome);
        Ok(self
            .items
            .get(&uid)
            .filter(|i| i.is_pending() && !self.suspended.contains(&i.uid))
            .cloned())
    }

    /// Links tasks to parents present in the collection.
    fn link_parents(&mut self) {
        let mut relinked = Vec::new();
        let mut unresolved = 0;
        for item in self.items.values() {
            let wanted = item.content.parent_uid();
            let linked = wanted
                .filter(|p| *p != item.uid && self.items.contains_key(*p))
                .map(str::to_string);
            if wanted.is_some() && linked.is_none() {
                unresolved += 1;
            }
            if item.parent != linked {
                let mut item = item.clone();
                item.parent = linked;
                relinked.push(item);
            }
        }
        if unresolved > 0 {
            tracing::debug!(unresolved, "tasks with missing parents");
        }
        for item in relinked {
            self.upsert(item);
        }
        self.summary.unresolved_parents = unresolved;
    }

    fn upsert(&mut self, item: Item) {
        if let Some(old) = self.items.get(&item.uid).and_then(|i| i.href.clone()) {
            if item.href.as_ref() != Some(&old) && self.hrefs.get(&old) == Some(&item.uid) {
                self.hrefs.remove(&old);
            }
        }
        if let Some(href) = &item.href {
            self.hrefs.insert(href.clone(), item.uid.clone());
        }
        self.purged.remove(&item.uid);
        self.touched.insert(item.uid.clone());
        self.items.insert(item.uid.clone(), item);
    }

    fn purge(&mut self, uid: &str) {
        if let Some(item) = self.items.remove(uid) {
            if let Some(href) = &item.href {
                if self.hrefs.get(href).is_some_and(|u| u == uid) {
                    self.hrefs.remove(href);
                }
            }
        }
        self.touched.remove(uid);
        self.purged.insert(uid.to_string());
    }

    /// Builds the change set and summary.
    fn finish(mut self) -> (ChangeSet, SyncSummary) {
        self.link_parents();

        if self.advance {
            self.collection.change_token = self.new_change_token.take();
            self.collection.sync_token = self.new_sync_token.take();
        }
        let mut summary = self.summary;
        summary.new_change_token.clone_from(&self.collection.change_token);
        summary.items_synced = summary.pulled + summary.pushed + summary.purged;

        let id = self.collection.id;
        let changes = ChangeSet {
            collection: (self.collection != self.original).then_some(self.collection),
            upserts: self
                .touched
                .iter()
                .filter_map(|uid| self.items.remove(uid))
                .collect(),
            purges: self.purged.into_iter().map(|uid| (id, uid)).collect(),
            conflicts: self.conflicts,
            resolved: Vec::new(),
        };
        (changes, summary)
    }
}

/// Errors that stop the push phase instead of failing one item.
fn is_fatal(e: &DavError) -> bool {
    matches!(
        e,
        DavError::Network(_) | DavError::Tls(_) | DavError::Authentication { .. }
    )
}
