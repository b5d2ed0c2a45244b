// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use davsync_dav::{CollectionKind, DavConfig};
use tokio::fs;

use crate::conflict::Strategy;

/// The name of the application, used for the config directory.
pub const APP_NAME: &str = "davsync";

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "DAVSYNC_CONFIG";

/// Errors raised while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// No path was given and no default location exists.
    #[error("no config found at {0}")]
    NotFound(PathBuf),

    /// The file could not be read.
    #[error("failed to read config file at {path}: {source}")]
    Io {
        /// File that failed.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The file is not valid TOML for [`Config`].
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Engine and scheduler tuning.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Conflict strategy.
    pub strategy: Strategy,
    /// Concurrent collection syncs per CPU.
    pub workers_per_cpu: usize,
    /// Upper bound on concurrent collection syncs.
    pub max_workers: Option<usize>,
    /// Retries of a collection after a network error.
    pub max_retries: u32,
    /// First retry delay in milliseconds; doubles per attempt.
    pub retry_backoff_ms: u64,
    /// Cap on the retry delay in milliseconds.
    pub retry_backoff_max_ms: u64,
    /// Hrefs per multiget REPORT.
    pub multiget_batch_size: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::default(),
            workers_per_cpu: 2,
            max_workers: None,
            max_retries: 3,
            retry_backoff_ms: 500,
            retry_backoff_max_ms: 30_000,
            multiget_batch_size: 50,
        }
    }
}

impl SyncConfig {
    /// Worker pool size: `workers_per_cpu × available_parallelism`, capped
    /// by `max_workers`, at least one.
    #[must_use]
    pub fn worker_count(&self) -> usize {
        let cpus = std::thread::available_parallelism().map_or(1, NonZeroUsize::get);
        let workers = self.workers_per_cpu.saturating_mul(cpus);
        self.max_workers
            .map_or(workers, |cap| workers.min(cap))
            .max(1)
    }

    /// Delay before retry number `attempt` (zero-based).
    #[must_use]
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
        let ms = self
            .retry_backoff_ms
            .saturating_mul(factor)
            .min(self.retry_backoff_max_ms);
        Duration::from_millis(ms)
    }

    /// Multiget batch size, at least one.
    #[must_use]
    pub fn batch_size(&self) -> usize {
        self.multiget_batch_size.max(1)
    }
}

/// One `[[accounts]]` entry.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
pub struct AccountConfig {
    /// Account name.
    pub name: String,
    /// Server connection.
    pub dav: DavConfig,
    /// Enabled collection kinds; all kinds when omitted.
    #[serde(default = "all_kinds")]
    pub kinds: Vec<CollectionKind>,
}

fn all_kinds() -> Vec<CollectionKind> {
    vec![
        CollectionKind::Calendar,
        CollectionKind::TaskList,
        CollectionKind::AddressBook,
    ]
}

/// Top-level configuration file.
///
/// ```toml
/// [sync]
/// strategy = "most-recent-wins"
///
/// [[accounts]]
/// name = "home"
/// kinds = ["calendar", "task-list"]
///
/// [accounts.dav]
/// base_url = "https://cloud.example.com/"
/// auth = { type = "basic", username = "alice", password = "secret" }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Deserialize)]
pub struct Config {
    /// Engine and scheduler tuning.
    #[serde(default)]
    pub sync: SyncConfig,
    /// Accounts to sync.
    #[serde(default)]
    pub accounts: Vec<AccountConfig>,
}

impl Config {
    /// Loads the config from `path`, from `$DAVSYNC_CONFIG`, or from
    /// `<config dir>/davsync/config.toml`, in that order.
    ///
    /// # Errors
    ///
    /// Returns an error if no file is found, it cannot be read, or it does
    /// not parse.
    #[tracing::instrument]
    pub async fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => match std::env::var_os(CONFIG_ENV) {
                Some(env_path) => PathBuf::from(env_path),
                None => {
                    let path = default_path()
                        .ok_or_else(|| ConfigError::NotFound(PathBuf::from("<config dir>")))?;
                    if !fs::try_exists(&path).await.unwrap_or(false) {
                        return Err(ConfigError::NotFound(path));
                    }
                    path
                }
            },
        };

        let content = fs::read_to_string(&path)
            .await
            .map_err(|source| ConfigError::Io {
                path: path.clone(),
                source,
            })?;
        let config: Self = content.parse()?;
        tracing::debug!(path = %path.display(), accounts = config.accounts.len(), "config loaded");
        Ok(config)
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(toml::from_str(s)?)
    }
}

/// `<config dir>/davsync/config.toml`.
#[must_use]
pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_NAME).join("config.toml"))
}

#[cfg(test)]
mod tests {
    use davsync_dav::AuthMethod;

    use super::*;

    #[test]
    fn parses_full_config() {
        let config: Config = r#"
[sync]
strategy = "local-wins"
workers_per_cpu = 4
max_workers = 3
multiget_batch_size = 10

[[accounts]]
name = "home"
kinds = ["calendar", "address-book"]

[accounts.dav]
base_url = "https://cloud.example.com/"
auth = { type = "basic", username = "alice", password = "secret" }
pinned_fingerprint = "AB:CD"
"#
        .parse()
        .unwrap();

        assert_eq!(config.sync.strategy, Strategy::LocalWins);
        assert_eq!(config.sync.max_retries, 3);
        assert_eq!(config.sync.worker_count(), 3);
        assert_eq!(config.sync.batch_size(), 10);

        let account = &config.accounts[0];
        assert_eq!(account.kinds, vec![CollectionKind::Calendar, CollectionKind::AddressBook]);
        assert_eq!(account.dav.auth.username(), Some("alice"));
        assert_eq!(account.dav.timeout_secs, 30);
        assert_eq!(account.dav.pinned_fingerprint.as_deref(), Some("AB:CD"));
    }

    #[test]
    fn defaults_apply_to_empty_file() {
        let config: Config = "".parse().unwrap();
        assert_eq!(config.sync, SyncConfig::default());
        assert!(config.accounts.is_empty());
    }

    #[test]
    fn kinds_default_to_everything() {
        let config: Config = r#"
[[accounts]]
name = "work"
dav = { base_url = "https://dav.example.com/", auth = { type = "bearer", token = "t" } }
"#
        .parse()
        .unwrap();
        let account = &config.accounts[0];
        assert_eq!(account.kinds.len(), 3);
        assert_eq!(
            account.dav.auth,
            AuthMethod::Bearer {
                token: "t".to_string()
            }
        );
    }

    #[test]
    fn unknown_strategy_is_rejected() {
        let err = "[sync]\nstrategy = \"coin-flip\"\n".parse::<Config>().unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let config = SyncConfig {
            retry_backoff_ms: 100,
            retry_backoff_max_ms: 1_000,
            ..SyncConfig::default()
        };
        assert_eq!(config.backoff(0), Duration::from_millis(100));
        assert_eq!(config.backoff(2), Duration::from_millis(400));
        assert_eq!(config.backoff(10), Duration::from_millis(1_000));
        assert_eq!(config.backoff(100), Duration::from_millis(1_000));
    }

    #[tokio::test]
    async fn load_reads_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        tokio::fs::write(&path, "[sync]\nmax_retries = 7\n").await.unwrap();

        let config = Config::load(Some(&path)).await.unwrap();
        assert_eq!(config.sync.max_retries, 7);

        let missing = dir.path().join("missing.toml");
        let err = Config::load(Some(&missing)).await.unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
