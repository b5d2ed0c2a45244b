// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Item bodies and store fixtures.

use std::sync::Arc;

use davsync_codec::Document;
use davsync_core::{
    Account, Collection, CollectionId, Item, LocalStore as _, MemoryStore, Strategy, SyncConfig,
    SyncEngine,
};
use davsync_dav::{AuthMethod, ChangeDetection, CollectionKind, DavConfig, ETag, Href};
use url::Url;
use wiremock::MockServer;

/// Path of the collection every test syncs.
pub const COLLECTION_PATH: &str = "/cal/work/";

/// An event body with a summary and optional `LAST-MODIFIED`.
pub fn event_body(uid: &str, summary: &str, modified: Option<&str>) -> String {
    let modified = modified
        .map(|m| format!("LAST-MODIFIED:{m}\r\n"))
        .unwrap_or_default();
    format!(
        "BEGIN:VCALENDAR\r\nVERSION:2.0\r\nPRODID:-//test//EN\r\nBEGIN:VEVENT\r\n\
         UID:{uid}\r\n{modified}SUMMARY:{summary}\r\nEND:VEVENT\r\nEND:VCALENDAR\r\n"
    )
}

/// Parsed form of [`event_body`].
pub fn event(uid: &str, summary: &str, modified: Option<&str>) -> Document {
    Document::parse(&event_body(uid, summary, modified)).expect("fixture should parse")
}

/// Href of a member of the test collection.
pub fn member(name: &str) -> Href {
    Href::new(format!("{COLLECTION_PATH}{name}"))
}

/// A synced item that has not changed since.
pub fn synced_item(collection: CollectionId, name: &str, etag: &str, content: Document) -> Item {
    Item::from_remote(collection, member(name), ETag::from(etag), content)
}

/// A synced item edited locally.
pub fn edited_item(collection: CollectionId, name: &str, etag: &str, content: Document) -> Item {
    let mut item = synced_item(collection, name, etag, content);
    item.dirty = true;
    item
}

/// Whether a document carries the given summary.
pub fn has_summary(doc: &Document, summary: &str) -> bool {
    doc.to_wire().contains(&format!("SUMMARY:{summary}\r\n"))
}

/// A mock server, a store holding one account with one calendar, and an
/// engine over both.
pub struct Harness {
    pub server: MockServer,
    pub store: Arc<MemoryStore>,
    pub engine: SyncEngine<MemoryStore>,
    pub account: Account,
    pub collection: Collection,
}

impl Harness {
    /// A writable CTag calendar whose stored change token is `c1`.
    pub async fn new(strategy: Strategy) -> Self {
        Self::with(strategy, |_| {}).await
    }

    /// Like [`Harness::new`], with the collection adjusted before storing.
    pub async fn with(strategy: Strategy, adjust: impl FnOnce(&mut Collection)) -> Self {
        let server = MockServer::start().await;
        let store = Arc::new(MemoryStore::new());

        let dav = DavConfig::new(format!("{}/", server.uri()), AuthMethod::None);
        let account = Account::new(
            "test",
            dav,
            vec![
                CollectionKind::Calendar,
                CollectionKind::TaskList,
                CollectionKind::AddressBook,
            ],
        );
        store.upsert_account(account.clone()).await.unwrap();

        let mut collection = Collection {
            id: CollectionId::new(),
            account: account.id,
            url: Url::parse(&format!("{}{COLLECTION_PATH}", server.uri())).unwrap(),
            kind: CollectionKind::Calendar,
            display_name: Some("Work".to_string()),
            change_token: Some("c1".to_string()),
            sync_token: None,
            change_detection: ChangeDetection::CTag,
            enabled: true,
            visible: true,
            writable: true,
        };
        adjust(&mut collection);
        store.upsert_collection(collection.clone()).await.unwrap();

        let config = SyncConfig {
            strategy,
            retry_backoff_ms: 1,
            retry_backoff_max_ms: 5,
            ..SyncConfig::default()
        };
        let engine = SyncEngine::new(Arc::clone(&store), config);
        Self {
            server,
            store,
            engine,
            account,
            collection,
        }
    }

    /// Stores an item in the test collection.
    pub async fn put(&self, item: Item) {
        self.store.put_item(item).await.unwrap();
    }

    /// The stored item with this UID.
    pub async fn item(&self, uid: &str) -> Option<Item> {
        self.store.item(self.collection.id, uid).await.unwrap()
    }

    /// The stored collection record.
    pub async fn stored_collection(&self) -> Collection {
        self.store
            .collection(self.collection.id)
            .await
            .unwrap()
            .expect("collection should exist")
    }
}
