// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Certificate pinning against a self-signed TLS server.

use std::sync::Arc;

use davsync_dav::{AuthMethod, DavClient, DavConfig, DavError, Href};
use rcgen::{CertificateParams, KeyPair};
use sha2::{Digest, Sha256};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_rustls::TlsAcceptor;
use tokio_rustls::rustls::ServerConfig;
use tokio_rustls::rustls::pki_types::{PrivateKeyDer, PrivatePkcs8KeyDer};

struct TlsServer {
    url: String,
    fingerprint: String,
    /// Resolves to the request head, or `None` if the handshake failed.
    request: JoinHandle<Option<String>>,
}

/// Serves a single HTTPS request with a freshly generated certificate.
async fn serve_once() -> TlsServer {
    let key_pair = KeyPair::generate().unwrap();
    let cert = CertificateParams::new(vec!["localhost".to_string()])
        .unwrap()
        .self_signed(&key_pair)
        .unwrap();
    let der = cert.der().clone();
    let fingerprint = hex::encode(Sha256::digest(der.as_ref()));
    let key = PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(key_pair.serialize_der()));

    let provider = Arc::new(tokio_rustls::rustls::crypto::ring::default_provider());
    let config = ServerConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .unwrap()
        .with_no_client_auth()
        .with_single_cert(vec![der], key)
        .unwrap();
    let acceptor = TlsAcceptor::from(Arc::new(config));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let request = tokio::spawn(async move {
        let (tcp, _) = listener.accept().await.ok()?;
        let mut stream = acceptor.accept(tcp).await.ok()?;

        let mut head = Vec::new();
        let mut buf = [0u8; 4096];
        while !head.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = stream.read(&mut buf).await.ok()?;
            if n == 0 {
                break;
            }
            head.extend_from_slice(&buf[..n]);
        }

        let body = "BEGIN:VCARD\r\nVERSION:3.0\r\nUID:c\r\nFN:Carol\r\nEND:VCARD\r\n";
        let response = format!(
            "HTTP/1.1 200 OK\r\nETag: \"c1\"\r\nContent-Length: {}\r\n\
             Connection: close\r\n\r\n{body}",
            body.len()
        );
        stream.write_all(response.as_bytes()).await.ok()?;
        let _ = stream.shutdown().await;
        Some(String::from_utf8_lossy(&head).into_owned())
    });

    TlsServer {
        url: format!("https://{addr}/"),
        fingerprint,
        request,
    }
}

fn pinned_client(server: &TlsServer, fingerprint: &str) -> DavClient {
    let mut config = DavConfig::new(
        server.url.clone(),
        AuthMethod::Bearer {
            token: "secret-token".to_string(),
        },
    );
    config.pinned_fingerprint = Some(fingerprint.to_string());
    DavClient::new(config).expect("Failed to create client")
}

#[tokio::test]
async fn pinned_certificate_is_accepted() {
    let server = serve_once().await;
    let client = pinned_client(&server, &server.fingerprint.to_uppercase());

    let fetched = client.get(&Href::from("/book/c.vcf")).await.unwrap();
    assert_eq!(fetched.etag.as_str(), "\"c1\"");

    let head = server.request.await.unwrap().expect("handshake succeeds");
    assert!(
        head.to_ascii_lowercase()
            .contains("authorization: bearer secret-token")
    );
}

#[tokio::test]
async fn mismatched_certificate_never_sees_credentials() {
    let server = serve_once().await;
    let client = pinned_client(&server, &"00".repeat(32));

    let err = client.get(&Href::from("/book/c.vcf")).await.unwrap_err();
    assert!(matches!(err, DavError::Tls(_)), "unexpected error: {err:?}");
    assert!(err.is_fatal());

    assert_eq!(server.request.await.unwrap(), None);
}

#[test]
fn malformed_pin_is_a_config_error() {
    let mut config = DavConfig::new("https://dav.example.com/", AuthMethod::None);
    config.pinned_fingerprint = Some("not-hex".to_string());
    assert!(matches!(DavClient::new(config), Err(DavError::Config(_))));
}
