// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::conflict::PendingConflict;
use crate::model::{Account, AccountId, Collection, CollectionId, ConflictId, Item};
use crate::store::{ChangeSet, LocalStore, StoreError};

/// In-memory [`LocalStore`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

#[derive(Debug, Default)]
struct State {
    accounts: BTreeMap<AccountId, Account>,
    collections: BTreeMap<CollectionId, Collection>,
    items: BTreeMap<(CollectionId, String), Item>,
    conflicts: BTreeMap<ConflictId, PendingConflict>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl State {
    fn check_url(&self, collection: &Collection) -> Result<(), StoreError> {
        let taken = self
            .collections
            .values()
            .any(|c| c.id != collection.id && c.url == collection.url);
        if taken {
            return Err(StoreError::DuplicateUrl(collection.url.clone()));
        }
        if !self.accounts.contains_key(&collection.account) {
            return Err(StoreError::NotFound(format!("account {}", collection.account)));
        }
        Ok(())
    }

    fn check_item(&self, item: &Item) -> Result<(), StoreError> {
        if self.collections.contains_key(&item.collection) {
            Ok(())
        } else {
            Err(StoreError::NotFound(format!("collection {}", item.collection)))
        }
    }

    fn remove_collection(&mut self, id: CollectionId) {
        self.collections.remove(&id);
        self.items.retain(|(c, _), _| *c != id);
        self.conflicts.retain(|_, conflict| conflict.collection != id);
    }

    fn record_conflict(&mut self, conflict: PendingConflict) {
        self.conflicts
            .retain(|_, c| !(c.collection == conflict.collection && c.uid == conflict.uid));
        self.conflicts.insert(conflict.id, conflict);
    }

    fn filter_items(&self, collection: CollectionId, pred: impl Fn(&Item) -> bool) -> Vec<Item> {
        self.items
            .range((collection, String::new())..)
            .take_while(|((c, _), _)| *c == collection)
            .map(|(_, item)| item)
            .filter(|item| pred(item))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl LocalStore for MemoryStore {
    async fn account(&self, id: AccountId) -> Result<Option<Account>, StoreError> {
        Ok(self.state.read().await.accounts.get(&id).cloned())
    }

    async fn accounts(&self) -> Result<Vec<Account>, StoreError> {
        Ok(self.state.read().await.accounts.values().cloned().collect())
    }

    async fn upsert_account(&self, account: Account) -> Result<(), StoreError> {
        self.state.write().await.accounts.insert(account.id, account);
        Ok(())
    }

    async fn remove_account(&self, id: AccountId) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        if state.accounts.remove(&id).is_none() {
            return Err(StoreError::NotFound(format!("account {id}")));
        }
        let owned: Vec<_> = state
            .collections
            .values()
            .filter(|c| c.account == id)
            .map(|c| c.id)
            .collect();
        for collection in owned {
            state.remove_collection(collection);
        }
        Ok(())
    }

    async fn collection(&self, id: CollectionId) -> Result<Option<Collection>, StoreError> {
        Ok(self.state.read().await.collections.get(&id).cloned())
    }

    async fn collections(&self, account: AccountId) -> Result<Vec<Collection>, StoreError> {
        let state = self.state.read().await;
        let mut found: Vec<_> = state
            .collections
            .values()
            .filter(|c| c.account == account)
            .cloned()
            .collect();
        found.sort_by(|a, b| a.url.as_str().cmp(b.url.as_str()));
        Ok(found)
    }

    async fn upsert_collection(&self, collection: Collection) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        state.check_url(&collection)?;
        state.collections.insert(collection.id, collection);
        Ok(())
    }

    async fn remove_collection(&self, id: CollectionId) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        if !state.collections.contains_key(&id) {
            return Err(StoreError::NotFound(format!("collection {id}")));
        }
        state.remove_collection(id);
        Ok(())
    }

    async fn item(&self, collection: CollectionId, uid: &str) -> Result<Option<Item>, StoreError> {
        let state = self.state.read().await;
        Ok(state.items.get(&(collection, uid.to_string())).cloned())
    }

    async fn items(&self, collection: CollectionId) -> Result<Vec<Item>, StoreError> {
        Ok(self.state.read().await.filter_items(collection, |_| true))
    }

    async fn put_item(&self, item: Item) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        state.check_item(&item)?;
        state.items.insert((item.collection, item.uid.clone()), item);
        Ok(())
    }

    async fn soft_delete_item(
        &self,
        collection: CollectionId,
        uid: &str,
    ) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        let key = (collection, uid.to_string());
        let Some(item) = state.items.get_mut(&key) else {
            return Err(StoreError::NotFound(format!("item {uid}")));
        };
        if item.is_local_only() {
            state.items.remove(&key);
        } else {
            item.deleted = true;
        }
        Ok(())
    }

    async fn hard_delete_item(
        &self,
        collection: CollectionId,
        uid: &str,
    ) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        match state.items.remove(&(collection, uid.to_string())) {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound(format!("item {uid}"))),
        }
    }

    async fn dirty_items(&self, collection: CollectionId) -> Result<Vec<Item>, StoreError> {
        Ok(self
            .state
            .read()
            .await
            .filter_items(collection, |i| i.dirty && !i.deleted))
    }

    async fn deleted_items(&self, collection: CollectionId) -> Result<Vec<Item>, StoreError> {
        Ok(self.state.read().await.filter_items(collection, |i| i.deleted))
    }

    async fn conflict(&self, id: ConflictId) -> Result<Option<PendingConflict>, StoreError> {
        Ok(self.state.read().await.conflicts.get(&id).cloned())
    }

    async fn conflicts(
        &self,
        collection: CollectionId,
    ) -> Result<Vec<PendingConflict>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .conflicts
            .values()
            .filter(|c| c.collection == collection)
            .cloned()
            .collect())
    }

    async fn commit(&self, changes: ChangeSet) -> Result<(), StoreError> {
        let mut state = self.state.write().await;

        // validate everything before the first write
        if let Some(collection) = &changes.collection {
            if !state.collections.contains_key(&collection.id) {
                return Err(StoreError::NotFound(format!("collection {}", collection.id)));
            }
            state.check_url(collection)?;
        }
        for item in &changes.upserts {
            state.check_item(item)?;
        }

        if let Some(collection) = changes.collection {
            state.collections.insert(collection.id, collection);
        }
        for item in changes.upserts {
            state.items.insert((item.collection, item.uid.clone()), item);
        }
        for key in changes.purges {
            state.items.remove(&key);
        }
        for id in changes.resolved {
            state.conflicts.remove(&id);
        }
        for conflict in changes.conflicts {
            state.record_conflict(conflict);
        }
        Ok(())
    }
}
