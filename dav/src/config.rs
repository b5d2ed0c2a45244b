// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

/// Authentication method.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Deserialize)]
#[serde(tag = "type")]
pub enum AuthMethod {
    /// No authentication.
    #[serde(rename = "none")]
    #[default]
    None,
    /// Basic authentication (username/password).
    #[serde(rename = "basic")]
    Basic {
        /// Username for authentication.
        username: String,
        /// Password for authentication.
        password: String,
    },
    /// Bearer token authentication (OAuth).
    #[serde(rename = "bearer")]
    Bearer {
        /// Bearer token.
        token: String,
    },
}

impl AuthMethod {
    /// Username, for basic authentication.
    #[must_use]
    pub fn username(&self) -> Option<&str> {
        match self {
            Self::Basic { username, .. } => Some(username),
            Self::None | Self::Bearer { .. } => None,
        }
    }
}

/// Server configuration of one account.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
pub struct DavConfig {
    /// Base URL the user entered, e.g. `https://cloud.example.com/`.
    pub base_url: String,
    /// Authentication method.
    #[serde(default)]
    pub auth: AuthMethod,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// User agent string.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// SHA-256 fingerprint of a self-signed server certificate, hex encoded.
    ///
    /// When set, certificate chain validation is replaced by comparing the
    /// peer certificate against this value.
    #[serde(default)]
    pub pinned_fingerprint: Option<String>,
}

const fn default_timeout() -> u64 {
    30
}

fn default_user_agent() -> String {
    concat!("davsync-dav/", env!("CARGO_PKG_VERSION")).to_string()
}

impl DavConfig {
    /// Creates a configuration with defaults for everything but the URL and
    /// credentials.
    #[must_use]
    pub fn new(base_url: impl Into<String>, auth: AuthMethod) -> Self {
        Self {
            base_url: base_url.into(),
            auth,
            ..Self::default()
        }
    }
}

impl Default for DavConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            auth: AuthMethod::default(),
            timeout_secs: default_timeout(),
            user_agent: default_user_agent(),
            pinned_fingerprint: None,
        }
    }
}
