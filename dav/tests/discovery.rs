// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Service discovery tests with wiremock.

use davsync_dav::{AuthMethod, ChangeDetection, CollectionKind, DavClient, DavConfig, DavError};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> DavClient {
    let config = DavConfig::new(format!("{}/", server.uri()), AuthMethod::None);
    DavClient::new(config).expect("Failed to create client")
}

fn multistatus(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(207).set_body_raw(
        format!(
            "<?xml version=\"1.0\" encoding=\"utf-8\" ?>\n\
             <D:multistatus xmlns:D=\"DAV:\" xmlns:C=\"urn:ietf:params:xml:ns:caldav\" \
             xmlns:CR=\"urn:ietf:params:xml:ns:carddav\" \
             xmlns:CS=\"http://calendarserver.org/ns/\">{body}</D:multistatus>"
        ),
        "application/xml",
    )
}

fn response(href: &str, props: &str) -> String {
    format!(
        "<D:response><D:href>{href}</D:href><D:propstat><D:prop>{props}</D:prop>\
         <D:status>HTTP/1.1 200 OK</D:status></D:propstat></D:response>"
    )
}

#[tokio::test]
async fn discovery_follows_well_known_redirect_and_principal() {
    let server = MockServer::start().await;
    Mock::given(method("PROPFIND"))
        .and(path("/.well-known/caldav"))
        .respond_with(ResponseTemplate::new(301).insert_header("Location", "/srv/caldav/"))
        .mount(&server)
        .await;
    Mock::given(method("PROPFIND"))
        .and(path("/srv/caldav/"))
        .respond_with(multistatus(&response(
            "/srv/caldav/",
            "<D:current-user-principal><D:href>/principals/alice/</D:href>\
             </D:current-user-principal>",
        )))
        .mount(&server)
        .await;
    Mock::given(method("PROPFIND"))
        .and(path("/principals/alice/"))
        .respond_with(multistatus(&response(
            "/principals/alice/",
            "<C:calendar-home-set><D:href>/calendars/alice/</D:href></C:calendar-home-set>",
        )))
        .mount(&server)
        .await;

    let home = response(
        "/calendars/alice/",
        "<D:resourcetype><D:collection/></D:resourcetype>",
    );
    let work = response(
        "/calendars/alice/work/",
        "<D:resourcetype><D:collection/><C:calendar/></D:resourcetype>\
         <D:displayname>Work</D:displayname>\
         <D:sync-token>sync-1</D:sync-token>\
         <C:supported-calendar-component-set><C:comp name=\"VEVENT\"/><C:comp name=\"VTODO\"/>\
         </C:supported-calendar-component-set>\
         <D:supported-report-set><D:supported-report><D:report><D:sync-collection/></D:report>\
         </D:supported-report></D:supported-report-set>",
    );
    let chores = response(
        "/calendars/alice/chores/",
        "<D:resourcetype><D:collection/><C:calendar/></D:resourcetype>\
         <CS:getctag>ctag-1</CS:getctag>\
         <C:supported-calendar-component-set><C:comp name=\"VTODO\"/>\
         </C:supported-calendar-component-set>\
         <D:current-user-privilege-set><D:privilege><D:read/></D:privilege>\
         </D:current-user-privilege-set>",
    );
    Mock::given(method("PROPFIND"))
        .and(path("/calendars/alice/"))
        .and(header("Depth", "1"))
        .respond_with(multistatus(&format!("{home}{work}{chores}")))
        .mount(&server)
        .await;

    let result = client(&server).discover().await.expect("discovery succeeds");

    let base = server.uri();
    assert_eq!(
        result.principal.as_ref().map(url::Url::as_str),
        Some(format!("{base}/principals/alice/").as_str())
    );
    assert_eq!(
        result.calendar_root.as_ref().map(url::Url::as_str),
        Some(format!("{base}/calendars/alice/").as_str())
    );
    assert_eq!(result.addressbook_root, None);

    assert_eq!(result.collections.len(), 2);
    let chores = &result.collections[0];
    assert_eq!(chores.url.path(), "/calendars/alice/chores/");
    assert_eq!(chores.kind, CollectionKind::TaskList);
    assert!(!chores.writable);
    assert_eq!(chores.change_detection, ChangeDetection::CTag);

    let work = &result.collections[1];
    assert_eq!(work.kind, CollectionKind::Calendar);
    assert_eq!(work.display_name.as_deref(), Some("Work"));
    assert!(work.writable);
    assert_eq!(work.change_detection, ChangeDetection::SyncCollection);
}

#[tokio::test]
async fn discovery_probes_known_layouts_in_order() {
    let server = MockServer::start().await;
    Mock::given(method("PROPFIND"))
        .and(path("/remote.php/dav/"))
        .and(header("Depth", "0"))
        .respond_with(multistatus(&response(
            "/remote.php/dav/",
            "<C:calendar-home-set><D:href>/remote.php/dav/calendars/alice/</D:href>\
             </C:calendar-home-set>\
             <CR:addressbook-home-set><D:href>/remote.php/dav/addressbooks/alice/</D:href>\
             </CR:addressbook-home-set>",
        )))
        .mount(&server)
        .await;
    Mock::given(method("PROPFIND"))
        .and(path("/dav/"))
        .respond_with(multistatus(&response("/dav/", "")))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("PROPFIND"))
        .and(path("/remote.php/dav/calendars/alice/"))
        .and(header("Depth", "1"))
        .respond_with(multistatus(&response(
            "/remote.php/dav/calendars/alice/personal/",
            "<D:resourcetype><D:collection/><C:calendar/></D:resourcetype>",
        )))
        .mount(&server)
        .await;
    Mock::given(method("PROPFIND"))
        .and(path("/remote.php/dav/addressbooks/alice/"))
        .and(header("Depth", "1"))
        .respond_with(multistatus(&response(
            "/remote.php/dav/addressbooks/alice/contacts/",
            "<D:resourcetype><D:collection/><CR:addressbook/></D:resourcetype>",
        )))
        .mount(&server)
        .await;

    let result = client(&server).discover().await.expect("discovery succeeds");

    assert_eq!(
        result.calendar_root.as_ref().map(url::Url::path),
        Some("/remote.php/dav/calendars/alice/")
    );
    assert_eq!(
        result.addressbook_root.as_ref().map(url::Url::path),
        Some("/remote.php/dav/addressbooks/alice/")
    );
    let kinds: Vec<_> = result.collections.iter().map(|c| c.kind).collect();
    assert_eq!(kinds, vec![CollectionKind::AddressBook, CollectionKind::Calendar]);
    assert_eq!(result.collections[1].change_detection, ChangeDetection::ETagScan);
    assert!(result.collections[1].writable);
}

#[tokio::test]
async fn discovery_accepts_auth_gated_root() {
    let server = MockServer::start().await;
    Mock::given(method("PROPFIND"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let result = client(&server).discover().await.expect("discovery succeeds");

    assert_eq!(result.calendar_root.as_ref().map(url::Url::path), Some("/"));
    assert_eq!(result.addressbook_root.as_ref().map(url::Url::path), Some("/"));
    assert!(result.collections.is_empty());
}

#[tokio::test]
async fn discovery_accepts_auth_gated_well_known_target() {
    let server = MockServer::start().await;
    Mock::given(method("PROPFIND"))
        .and(path("/.well-known/caldav"))
        .respond_with(ResponseTemplate::new(301).insert_header("Location", "/srv/dav/"))
        .mount(&server)
        .await;
    Mock::given(method("PROPFIND"))
        .and(path("/srv/dav/"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let result = client(&server).discover().await.expect("discovery succeeds");

    assert_eq!(
        result.calendar_root.as_ref().map(url::Url::path),
        Some("/srv/dav/")
    );
    assert!(result.addressbook_root.is_none());
    assert!(result.collections.is_empty());
}

#[tokio::test]
async fn discovery_skips_non_dav_bodies() {
    let server = MockServer::start().await;
    Mock::given(method("PROPFIND"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(207).set_body_raw("<html>login</html>", "text/html"),
        )
        .mount(&server)
        .await;

    let err = client(&server).discover().await.unwrap_err();

    assert_eq!(err, DavError::NoServicesFound);
}

#[tokio::test]
async fn discovery_fails_when_everything_is_forbidden() {
    let server = MockServer::start().await;
    Mock::given(method("PROPFIND"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let err = client(&server).discover().await.unwrap_err();

    assert_eq!(err, DavError::NoServicesFound);
}
