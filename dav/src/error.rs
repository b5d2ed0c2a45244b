// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

/// Errors raised by the WebDAV client and service discovery.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DavError {
    /// Timeout, DNS or connection failure.
    #[error("network error: {0}")]
    Network(String),

    /// TLS failure, including a certificate fingerprint mismatch.
    #[error("TLS error: {0}")]
    Tls(String),

    /// The server rejected the credentials (401/403).
    #[error("authentication failed with status {status}")]
    Authentication {
        /// HTTP status code.
        status: u16,
    },

    /// A conditional request failed (412).
    #[error("precondition failed for {href}")]
    PreconditionFailed {
        /// Target of the request.
        href: String,
    },

    /// The resource does not exist (404 or 410).
    #[error("resource not found: {href}")]
    NotFound {
        /// Target of the request.
        href: String,
    },

    /// Any other status the operation does not expect.
    #[error("unexpected status {status} from {url}")]
    UnexpectedStatus {
        /// HTTP status code.
        status: u16,
        /// Requested URL.
        url: String,
    },

    /// The body is not a DAV multistatus document.
    #[error("invalid multistatus response: {0}")]
    InvalidMultistatus(String),

    /// The server no longer accepts the stored sync token.
    #[error("sync token is no longer valid")]
    InvalidSyncToken,

    /// XML could not be written or read.
    #[error("XML error: {0}")]
    Xml(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Discovery found neither a CalDAV nor a CardDAV service.
    #[error("no CalDAV or CardDAV service found")]
    NoServicesFound,
}

impl DavError {
    /// Whether retrying the request may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Network(_))
    }

    /// Whether the error asks for new credentials.
    #[must_use]
    pub const fn is_auth(&self) -> bool {
        matches!(self, Self::Authentication { .. })
    }

    /// Whether the error concerns the connection rather than one resource,
    /// so further requests to the same server would fail as well.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Network(_) | Self::Tls(_) | Self::Authentication { .. } | Self::Config(_)
        )
    }
}

impl From<reqwest::Error> for DavError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_builder() {
            Self::Config(e.to_string())
        } else if let Some(tls) = tls_cause(&e) {
            Self::Tls(tls.to_string())
        } else {
            Self::Network(e.to_string())
        }
    }
}

/// The rustls error behind a failed request, if the handshake failed.
fn tls_cause(e: &reqwest::Error) -> Option<&rustls::Error> {
    let mut source = std::error::Error::source(e);
    while let Some(err) = source {
        if let Some(tls) = err.downcast_ref::<rustls::Error>() {
            return Some(tls);
        }
        // io::Error hides its payload from source()
        if let Some(tls) = err
            .downcast_ref::<std::io::Error>()
            .and_then(std::io::Error::get_ref)
            .and_then(|inner| inner.downcast_ref::<rustls::Error>())
        {
            return Some(tls);
        }
        source = err.source();
    }
    None
}

impl From<quick_xml::Error> for DavError {
    fn from(e: quick_xml::Error) -> Self {
        Self::Xml(e.to_string())
    }
}

impl From<std::io::Error> for DavError {
    fn from(e: std::io::Error) -> Self {
        Self::Xml(format!("IO error: {e}"))
    }
}

impl From<url::ParseError> for DavError {
    fn from(e: url::ParseError) -> Self {
        Self::Config(format!("invalid URL: {e}"))
    }
}
