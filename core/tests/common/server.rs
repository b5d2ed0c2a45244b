// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Mock responses for the collection under test.

use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::fixtures::COLLECTION_PATH;

/// Wraps responses in a DAV multistatus document.
pub fn multistatus(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(207).set_body_raw(
        format!(
            "<?xml version=\"1.0\" encoding=\"utf-8\" ?>\n\
             <D:multistatus xmlns:D=\"DAV:\" xmlns:C=\"urn:ietf:params:xml:ns:caldav\" \
             xmlns:CS=\"http://calendarserver.org/ns/\">{body}</D:multistatus>"
        ),
        "application/xml",
    )
}

/// One `<D:response>` with a 200 propstat.
pub fn response(href: &str, props: &str) -> String {
    format!(
        "<D:response><D:href>{href}</D:href><D:propstat><D:prop>{props}</D:prop>\
         <D:status>HTTP/1.1 200 OK</D:status></D:propstat></D:response>"
    )
}

/// Serves the collection's `getctag` (and optional `sync-token`).
pub async fn mount_state(server: &MockServer, ctag: &str, sync_token: Option<&str>) {
    let token = sync_token
        .map(|t| format!("<D:sync-token>{t}</D:sync-token>"))
        .unwrap_or_default();
    Mock::given(method("PROPFIND"))
        .and(path(COLLECTION_PATH))
        .and(header("Depth", "0"))
        .and(body_string_contains("getctag"))
        .respond_with(multistatus(&response(
            COLLECTION_PATH,
            &format!("<CS:getctag>{ctag}</CS:getctag>{token}"),
        )))
        .mount(server)
        .await;
}

/// Serves a depth-1 listing of `(name, etag)` members; returns the mock so
/// callers can set expectations.
pub fn listing(members: &[(&str, &str)]) -> Mock {
    let mut body = response(
        COLLECTION_PATH,
        "<D:resourcetype><D:collection/><C:calendar/></D:resourcetype>",
    );
    for (name, etag) in members {
        body.push_str(&response(
            &format!("{COLLECTION_PATH}{name}"),
            &format!("<D:resourcetype/><D:getetag>{etag}</D:getetag>"),
        ));
    }
    Mock::given(method("PROPFIND"))
        .and(path(COLLECTION_PATH))
        .and(header("Depth", "1"))
        .respond_with(multistatus(&body))
}

/// Serves a calendar-multiget with `(name, etag, body)` members.
pub async fn mount_multiget(server: &MockServer, members: &[(&str, &str, &str)]) {
    let mut body = String::new();
    for (name, etag, data) in members {
        body.push_str(&response(
            &format!("{COLLECTION_PATH}{name}"),
            &format!("<D:getetag>{etag}</D:getetag><C:calendar-data>{data}</C:calendar-data>"),
        ));
    }
    Mock::given(method("REPORT"))
        .and(path(COLLECTION_PATH))
        .and(body_string_contains("calendar-multiget"))
        .respond_with(multistatus(&body))
        .mount(server)
        .await;
}

/// Expects no PUT at all.
pub async fn forbid_put(server: &MockServer) {
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(server)
        .await;
}
