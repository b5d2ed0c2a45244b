// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Collection sync scenarios against a mock server.

mod common;

use std::time::Duration;

use davsync_core::{
    CancelToken, ConflictId, Item, LocalStore as _, Phase, Resolution, Strategy, SyncError,
};
use davsync_dav::{ChangeDetection, ETag};
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, ResponseTemplate};

use common::{
    Harness, edited_item, event, event_body, forbid_put, has_summary, listing, member,
    mount_multiget, mount_state, multistatus, response, synced_item,
};

#[tokio::test]
async fn sync_pulls_new_items_then_skips_unchanged_collection() {
    let h = Harness::new(Strategy::ServerWins).await;
    mount_state(&h.server, "c2", None).await;
    listing(&[("a.ics", "e1")]).expect(1).mount(&h.server).await;
    mount_multiget(&h.server, &[("a.ics", "e1", &event_body("a", "Standup", None))]).await;

    let summary = h
        .engine
        .sync(h.collection.id, &CancelToken::new())
        .await
        .unwrap();
    assert_eq!(summary.pulled, 1);
    assert_eq!(summary.items_synced, 1);
    assert_eq!(summary.new_change_token.as_deref(), Some("c2"));

    let item = h.item("a").await.expect("item should be stored");
    assert_eq!(item.href, Some(member("a.ics")));
    assert_eq!(item.etag, Some(ETag::from("e1")));
    assert!(!item.dirty);
    assert!(has_summary(&item.content, "Standup"));
    assert_eq!(h.stored_collection().await.change_token.as_deref(), Some("c2"));

    let again = h
        .engine
        .sync(h.collection.id, &CancelToken::new())
        .await
        .unwrap();
    assert_eq!(again.items_synced, 0);
}

#[tokio::test]
async fn sync_pushes_local_creation() {
    let h = Harness::new(Strategy::ServerWins).await;
    mount_state(&h.server, "c1", None).await;
    h.put(Item::new_local(h.collection.id, event("new-1", "Lunch", None)))
        .await;
    Mock::given(method("PUT"))
        .and(path("/cal/work/new-1.ics"))
        .and(header("If-None-Match", "*"))
        .and(body_string_contains("SUMMARY:Lunch"))
        .respond_with(ResponseTemplate::new(201).insert_header("ETag", "e9"))
        .expect(1)
        .mount(&h.server)
        .await;

    let summary = h
        .engine
        .sync(h.collection.id, &CancelToken::new())
        .await
        .unwrap();
    assert_eq!(summary.pushed, 1);

    let item = h.item("new-1").await.unwrap();
    assert_eq!(item.href, Some(member("new-1.ics")));
    assert_eq!(item.etag, Some(ETag::from("e9")));
    assert!(!item.dirty);
}

#[tokio::test]
async fn sync_pushes_local_deletion() {
    let h = Harness::new(Strategy::ServerWins).await;
    mount_state(&h.server, "c1", None).await;
    h.put(synced_item(h.collection.id, "a.ics", "e1", event("a", "Old", None)))
        .await;
    h.store.soft_delete_item(h.collection.id, "a").await.unwrap();
    Mock::given(method("DELETE"))
        .and(path("/cal/work/a.ics"))
        .and(header("If-Match", "e1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&h.server)
        .await;

    let summary = h
        .engine
        .sync(h.collection.id, &CancelToken::new())
        .await
        .unwrap();
    assert_eq!(summary.pushed, 1);
    assert!(h.item("a").await.is_none());
}

async fn both_sides_edited(strategy: Strategy) -> Harness {
    let h = Harness::new(strategy).await;
    h.put(edited_item(h.collection.id, "a.ics", "e1", event("a", "local", None)))
        .await;
    mount_state(&h.server, "c2", None).await;
    listing(&[("a.ics", "e2")]).mount(&h.server).await;
    mount_multiget(&h.server, &[("a.ics", "e2", &event_body("a", "remote", None))]).await;
    h
}

#[tokio::test]
async fn local_wins_pushes_over_remote_change() {
    let h = both_sides_edited(Strategy::LocalWins).await;
    Mock::given(method("PUT"))
        .and(path("/cal/work/a.ics"))
        .and(header("If-Match", "e2"))
        .and(body_string_contains("SUMMARY:local"))
        .respond_with(ResponseTemplate::new(204).insert_header("ETag", "e3"))
        .expect(1)
        .mount(&h.server)
        .await;

    let summary = h
        .engine
        .sync(h.collection.id, &CancelToken::new())
        .await
        .unwrap();
    assert_eq!(summary.conflicts, 1);
    assert_eq!(summary.pushed, 1);
    assert_eq!(summary.pulled, 0);

    let item = h.item("a").await.unwrap();
    assert_eq!(item.etag, Some(ETag::from("e3")));
    assert!(has_summary(&item.content, "local"));
    assert!(!item.dirty);
}

#[tokio::test]
async fn server_wins_discards_local_edit() {
    let h = both_sides_edited(Strategy::ServerWins).await;
    forbid_put(&h.server).await;

    let summary = h
        .engine
        .sync(h.collection.id, &CancelToken::new())
        .await
        .unwrap();
    assert_eq!(summary.conflicts, 1);
    assert_eq!(summary.pulled, 1);

    let item = h.item("a").await.unwrap();
    assert_eq!(item.etag, Some(ETag::from("e2")));
    assert!(has_summary(&item.content, "remote"));
    assert!(!item.dirty);
}

#[tokio::test]
async fn most_recent_wins_compares_modification_times() {
    let h = Harness::new(Strategy::MostRecentWins).await;
    let id = h.collection.id;
    h.put(edited_item(id, "a.ics", "e1", event("a", "newer local", Some("20250602T100000Z"))))
        .await;
    h.put(edited_item(id, "b.ics", "e1", event("b", "older local", Some("20250601T100000Z"))))
        .await;
    mount_state(&h.server, "c2", None).await;
    listing(&[("a.ics", "e2"), ("b.ics", "e2")])
        .mount(&h.server)
        .await;
    mount_multiget(
        &h.server,
        &[
            ("a.ics", "e2", &event_body("a", "older remote", Some("20250601T100000Z"))),
            ("b.ics", "e2", &event_body("b", "newer remote", Some("20250602T100000Z"))),
        ],
    )
    .await;
    Mock::given(method("PUT"))
        .and(path("/cal/work/a.ics"))
        .and(header("If-Match", "e2"))
        .respond_with(ResponseTemplate::new(204).insert_header("ETag", "e3"))
        .expect(1)
        .mount(&h.server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/cal/work/b.ics"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&h.server)
        .await;

    let summary = h.engine.sync(id, &CancelToken::new()).await.unwrap();
    assert_eq!(summary.conflicts, 2);

    let a = h.item("a").await.unwrap();
    assert!(has_summary(&a.content, "newer local"));
    assert_eq!(a.etag, Some(ETag::from("e3")));
    let b = h.item("b").await.unwrap();
    assert!(has_summary(&b.content, "newer remote"));
    assert!(!b.dirty);
}

#[tokio::test]
async fn ask_user_suspends_item_until_resolved() {
    let h = both_sides_edited(Strategy::AskUser).await;
    forbid_put(&h.server).await;

    let summary = h
        .engine
        .sync(h.collection.id, &CancelToken::new())
        .await
        .unwrap();
    assert_eq!(summary.conflicts, 1);
    assert_eq!(summary.new_change_token.as_deref(), Some("c2"));

    let item = h.item("a").await.unwrap();
    assert!(item.dirty);
    assert_eq!(item.etag, Some(ETag::from("e1")));
    assert!(has_summary(&item.content, "local"));

    let conflicts = h.store.conflicts(h.collection.id).await.unwrap();
    assert_eq!(conflicts.len(), 1);
    let conflict = &conflicts[0];
    assert_eq!(conflict.uid, "a");
    assert_eq!(conflict.remote_etag, Some(ETag::from("e2")));
    assert!(has_summary(conflict.remote.as_ref().unwrap(), "remote"));

    h.engine
        .resolve_conflict(conflict.id, Resolution::KeepRemote)
        .await
        .unwrap();
    let item = h.item("a").await.unwrap();
    assert!(!item.dirty);
    assert_eq!(item.etag, Some(ETag::from("e2")));
    assert!(has_summary(&item.content, "remote"));
    assert!(h.store.conflicts(h.collection.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn keeping_local_side_pushes_on_next_sync() {
    let h = both_sides_edited(Strategy::AskUser).await;
    Mock::given(method("PUT"))
        .and(path("/cal/work/a.ics"))
        .and(header("If-Match", "e2"))
        .and(body_string_contains("SUMMARY:local"))
        .respond_with(ResponseTemplate::new(204).insert_header("ETag", "e3"))
        .expect(1)
        .mount(&h.server)
        .await;

    h.engine
        .sync(h.collection.id, &CancelToken::new())
        .await
        .unwrap();
    let conflict = h.store.conflicts(h.collection.id).await.unwrap().remove(0);
    h.engine
        .resolve_conflict(conflict.id, Resolution::KeepLocal)
        .await
        .unwrap();

    let item = h.item("a").await.unwrap();
    assert!(item.dirty);
    assert_eq!(item.etag, Some(ETag::from("e2")));

    let summary = h
        .engine
        .sync(h.collection.id, &CancelToken::new())
        .await
        .unwrap();
    assert_eq!(summary.pushed, 1);
    assert_eq!(h.item("a").await.unwrap().etag, Some(ETag::from("e3")));
}

#[tokio::test]
async fn resolving_unknown_conflict_fails() {
    let h = Harness::new(Strategy::AskUser).await;
    let id = ConflictId::new();
    assert_eq!(
        h.engine.resolve_conflict(id, Resolution::KeepLocal).await,
        Err(SyncError::ConflictNotFound(id))
    );
}

#[tokio::test]
async fn remote_deletion_purges_clean_item() {
    let h = Harness::new(Strategy::ServerWins).await;
    h.put(synced_item(h.collection.id, "a.ics", "e1", event("a", "Gone", None)))
        .await;
    h.put(synced_item(h.collection.id, "b.ics", "e1", event("b", "Kept", None)))
        .await;
    mount_state(&h.server, "c2", None).await;
    listing(&[("b.ics", "e1")]).mount(&h.server).await;

    let summary = h
        .engine
        .sync(h.collection.id, &CancelToken::new())
        .await
        .unwrap();
    assert_eq!(summary.purged, 1);
    assert!(h.item("a").await.is_none());
    assert!(h.item("b").await.is_some());
}

#[tokio::test]
async fn local_edit_survives_remote_deletion() {
    let h = Harness::new(Strategy::LocalWins).await;
    h.put(edited_item(h.collection.id, "a.ics", "e1", event("a", "edited", None)))
        .await;
    mount_state(&h.server, "c2", None).await;
    listing(&[]).mount(&h.server).await;
    Mock::given(method("PUT"))
        .and(path("/cal/work/a.ics"))
        .and(header("If-None-Match", "*"))
        .respond_with(ResponseTemplate::new(201).insert_header("ETag", "e5"))
        .expect(1)
        .mount(&h.server)
        .await;

    let summary = h
        .engine
        .sync(h.collection.id, &CancelToken::new())
        .await
        .unwrap();
    assert_eq!(summary.conflicts, 1);
    assert_eq!(summary.pushed, 1);

    let item = h.item("a").await.unwrap();
    assert_eq!(item.etag, Some(ETag::from("e5")));
    assert!(has_summary(&item.content, "edited"));
}

#[tokio::test]
async fn precondition_failure_reconciles_and_retries_once() {
    let h = Harness::new(Strategy::LocalWins).await;
    h.put(edited_item(h.collection.id, "a.ics", "e1", event("a", "local", None)))
        .await;
    mount_state(&h.server, "c1", None).await;
    Mock::given(method("PUT"))
        .and(path("/cal/work/a.ics"))
        .and(header("If-Match", "e1"))
        .respond_with(ResponseTemplate::new(412))
        .expect(1)
        .mount(&h.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/cal/work/a.ics"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("ETag", "e2")
                .set_body_string(event_body("a", "remote", None)),
        )
        .expect(1)
        .mount(&h.server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/cal/work/a.ics"))
        .and(header("If-Match", "e2"))
        .respond_with(ResponseTemplate::new(204).insert_header("ETag", "e3"))
        .expect(1)
        .mount(&h.server)
        .await;

    let summary = h
        .engine
        .sync(h.collection.id, &CancelToken::new())
        .await
        .unwrap();
    assert_eq!(summary.pushed, 1);
    assert_eq!(summary.conflicts, 1);
    assert_eq!(summary.failures, 0);

    let item = h.item("a").await.unwrap();
    assert_eq!(item.etag, Some(ETag::from("e3")));
    assert!(has_summary(&item.content, "local"));
}

#[tokio::test]
async fn sync_collection_applies_delta() {
    let h = Harness::with(Strategy::ServerWins, |c| {
        c.change_detection = ChangeDetection::SyncCollection;
        c.sync_token = Some("s1".to_string());
    })
    .await;
    h.put(synced_item(h.collection.id, "b.ics", "e1", event("b", "Old", None)))
        .await;
    mount_state(&h.server, "c2", Some("s2")).await;
    Mock::given(method("REPORT"))
        .and(path("/cal/work/"))
        .and(body_string_contains("sync-collection"))
        .and(body_string_contains("s1"))
        .respond_with(multistatus(&format!(
            "{}<D:response><D:href>/cal/work/b.ics</D:href>\
             <D:status>HTTP/1.1 404 Not Found</D:status></D:response>\
             <D:sync-token>s3</D:sync-token>",
            response("/cal/work/a.ics", "<D:getetag>e1</D:getetag>"),
        )))
        .mount(&h.server)
        .await;
    listing(&[]).expect(0).mount(&h.server).await;
    mount_multiget(&h.server, &[("a.ics", "e1", &event_body("a", "New", None))]).await;

    let summary = h
        .engine
        .sync(h.collection.id, &CancelToken::new())
        .await
        .unwrap();
    assert_eq!(summary.pulled, 1);
    assert_eq!(summary.purged, 1);

    let stored = h.stored_collection().await;
    assert_eq!(stored.sync_token.as_deref(), Some("s3"));
    assert_eq!(stored.change_token.as_deref(), Some("c2"));
    assert!(h.item("b").await.is_none());
}

#[tokio::test]
async fn invalid_sync_token_falls_back_to_full_listing() {
    let h = Harness::with(Strategy::ServerWins, |c| {
        c.change_detection = ChangeDetection::SyncCollection;
        c.sync_token = Some("s1".to_string());
    })
    .await;
    mount_state(&h.server, "c2", Some("s2")).await;
    Mock::given(method("REPORT"))
        .and(path("/cal/work/"))
        .and(body_string_contains("sync-collection"))
        .respond_with(ResponseTemplate::new(403).set_body_string(
            "<?xml version=\"1.0\"?><D:error xmlns:D=\"DAV:\"><D:valid-sync-token/></D:error>",
        ))
        .expect(1)
        .mount(&h.server)
        .await;
    listing(&[("a.ics", "e1")]).expect(1).mount(&h.server).await;
    mount_multiget(&h.server, &[("a.ics", "e1", &event_body("a", "Listed", None))]).await;

    let summary = h
        .engine
        .sync(h.collection.id, &CancelToken::new())
        .await
        .unwrap();
    assert_eq!(summary.pulled, 1);
    assert_eq!(h.stored_collection().await.sync_token.as_deref(), Some("s2"));
}

#[tokio::test]
async fn unparseable_item_keeps_change_token() {
    let h = Harness::new(Strategy::ServerWins).await;
    mount_state(&h.server, "c2", None).await;
    listing(&[("a.ics", "e1"), ("b.ics", "e1")])
        .mount(&h.server)
        .await;
    mount_multiget(
        &h.server,
        &[
            ("a.ics", "e1", &event_body("a", "Fine", None)),
            ("b.ics", "e1", "BEGIN:VCALENDAR\r\nBEGIN:VEVENT\r\nUID:b\r\n"),
        ],
    )
    .await;

    let summary = h
        .engine
        .sync(h.collection.id, &CancelToken::new())
        .await
        .unwrap();
    assert_eq!(summary.pulled, 1);
    assert_eq!(summary.failures, 1);
    assert_eq!(summary.new_change_token.as_deref(), Some("c1"));
    assert!(h.item("a").await.is_some());
    assert_eq!(h.stored_collection().await.change_token.as_deref(), Some("c1"));
}

#[tokio::test]
async fn failed_member_fetch_keeps_siblings_and_change_token() {
    let h = Harness::new(Strategy::ServerWins).await;
    mount_state(&h.server, "c2", None).await;
    listing(&[("a.ics", "e1"), ("b.ics", "e1")])
        .mount(&h.server)
        .await;
    mount_multiget(&h.server, &[("a.ics", "e1", &event_body("a", "Fine", None))]).await;
    Mock::given(method("GET"))
        .and(path("/cal/work/b.ics"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&h.server)
        .await;

    let summary = h
        .engine
        .sync(h.collection.id, &CancelToken::new())
        .await
        .unwrap();
    assert_eq!(summary.pulled, 1);
    assert_eq!(summary.failures, 1);
    assert!(h.item("a").await.is_some());
    assert!(h.item("b").await.is_none());
    assert_eq!(h.stored_collection().await.change_token.as_deref(), Some("c1"));
}

#[tokio::test]
async fn read_only_collection_keeps_local_changes() {
    let h = Harness::with(Strategy::LocalWins, |c| c.writable = false).await;
    h.put(edited_item(h.collection.id, "a.ics", "e1", event("a", "local", None)))
        .await;
    mount_state(&h.server, "c1", None).await;
    forbid_put(&h.server).await;

    let summary = h
        .engine
        .sync(h.collection.id, &CancelToken::new())
        .await
        .unwrap();
    assert_eq!(summary.pending, 1);
    assert_eq!(summary.pushed, 0);
    assert!(h.item("a").await.unwrap().dirty);
}

#[tokio::test]
async fn cancelled_sync_sends_nothing() {
    let h = Harness::new(Strategy::ServerWins).await;
    Mock::given(method("PROPFIND"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&h.server)
        .await;

    let cancel = CancelToken::new();
    cancel.cancel();
    assert_eq!(
        h.engine.sync(h.collection.id, &cancel).await,
        Err(SyncError::Cancelled {
            phase: Phase::Detecting
        })
    );
    assert_eq!(h.stored_collection().await, h.collection);
}

#[tokio::test]
async fn concurrent_sync_of_same_collection_is_rejected() {
    let h = Harness::new(Strategy::ServerWins).await;
    Mock::given(method("PROPFIND"))
        .and(path("/cal/work/"))
        .respond_with(
            multistatus(&response("/cal/work/", "<CS:getctag>c1</CS:getctag>"))
                .set_delay(Duration::from_millis(200)),
        )
        .mount(&h.server)
        .await;

    let cancel = CancelToken::new();
    let (first, second) = tokio::join!(
        h.engine.sync(h.collection.id, &cancel),
        h.engine.sync(h.collection.id, &cancel),
    );
    assert!(first.is_ok());
    assert_eq!(second, Err(SyncError::AlreadySyncing(h.collection.id)));
}

#[tokio::test]
async fn subtasks_link_to_parents_in_collection() {
    let h = Harness::new(Strategy::ServerWins).await;
    let task = |uid: &str, related: &str| {
        format!(
            "BEGIN:VCALENDAR\r\nVERSION:2.0\r\nBEGIN:VTODO\r\nUID:{uid}\r\n{related}\
             SUMMARY:{uid}\r\nEND:VTODO\r\nEND:VCALENDAR\r\n"
        )
    };
    mount_state(&h.server, "c2", None).await;
    listing(&[("child.ics", "e1"), ("orphan.ics", "e1"), ("parent.ics", "e1")])
        .mount(&h.server)
        .await;
    mount_multiget(
        &h.server,
        &[
            ("child.ics", "e1", &task("child", "RELATED-TO:parent\r\n")),
            ("orphan.ics", "e1", &task("orphan", "RELATED-TO:missing\r\n")),
            ("parent.ics", "e1", &task("parent", "")),
        ],
    )
    .await;

    let summary = h
        .engine
        .sync(h.collection.id, &CancelToken::new())
        .await
        .unwrap();
    assert_eq!(summary.pulled, 3);
    assert_eq!(summary.unresolved_parents, 1);
    assert_eq!(h.item("child").await.unwrap().parent.as_deref(), Some("parent"));
    assert_eq!(h.item("orphan").await.unwrap().parent, None);
}
