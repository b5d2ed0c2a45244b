// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Sync validation tool.
//!
//! Runs discovery and a full two-way sync against a real server into an
//! in-memory store, printing what was found and what changed. Useful for
//! checking server compatibility before wiring the engine into an app.

use std::error::Error;
use std::io::Write as _;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use colored::Colorize as _;
use davsync_core::{
    Account, AccountConfig, AccountReport, CancelToken, Config, LocalStore as _, MemoryStore,
    Strategy, SyncConfig, SyncEngine, SyncError, SyncScheduler,
};
use davsync_dav::{AuthMethod, DavClient, DavConfig};
use tracing_subscriber::EnvFilter;

/// Sync validation tool.
#[derive(Parser)]
#[command(name = "davsync_cli")]
#[command(about = "CalDAV/CardDAV sync validation tool", long_about = None)]
#[command(version)]
struct Cli {
    /// Config file; the first account is used unless --server is given
    #[arg(long)]
    config: Option<PathBuf>,
    /// Server base URL
    #[arg(long)]
    server: Option<String>,
    /// Username for basic auth
    #[arg(long)]
    username: Option<String>,
    /// Password for basic auth
    #[arg(long)]
    password: Option<String>,
    /// Bearer token for OAuth
    #[arg(long)]
    token: Option<String>,
    /// Request timeout in seconds
    #[arg(long, default_value = "30")]
    timeout: u64,
    /// Conflict strategy: server-wins, local-wins, most-recent-wins, ask-user
    #[arg(long)]
    strategy: Option<Strategy>,
    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
    /// Discover services and collections
    Discover,
    /// Discover, then sync every collection once
    Sync,
}

impl Cli {
    fn dav_config(&self) -> Option<DavConfig> {
        let server = self
            .server
            .clone()
            .or_else(|| std::env::var("DAVSYNC_SERVER").ok())?;
        let username = self
            .username
            .clone()
            .or_else(|| std::env::var("DAVSYNC_USERNAME").ok());
        let password = self
            .password
            .clone()
            .or_else(|| std::env::var("DAVSYNC_PASSWORD").ok());
        let token = self
            .token
            .clone()
            .or_else(|| std::env::var("DAVSYNC_TOKEN").ok());

        let auth = if let Some(token) = token {
            AuthMethod::Bearer { token }
        } else if let (Some(username), Some(password)) = (username, password) {
            AuthMethod::Basic { username, password }
        } else {
            AuthMethod::None
        };

        Some(DavConfig {
            timeout_secs: self.timeout,
            user_agent: "davsync-cli/0.1.0".to_string(),
            ..DavConfig::new(server, auth)
        })
    }

    async fn resolve(&self) -> Result<(AccountConfig, SyncConfig), Box<dyn Error>> {
        let (account, mut sync) = match self.dav_config() {
            Some(dav) => (
                AccountConfig {
                    name: "cli".to_string(),
                    dav,
                    kinds: Vec::new(),
                },
                SyncConfig::default(),
            ),
            None => {
                let config = Config::load(self.config.as_deref()).await?;
                let account = config.accounts.into_iter().next().ok_or(
                    "no account configured; pass --server or add [[accounts]] to the config",
                )?;
                (account, config.sync)
            }
        };
        if let Some(strategy) = self.strategy {
            sync.strategy = strategy;
        }
        Ok((account, sync))
    }
}

async fn cmd_discover(dav: DavConfig) -> Result<(), Box<dyn Error>> {
    let client = DavClient::new(dav)?;
    let result = client.discover().await?;

    match &result.calendar_root {
        Some(root) => println!("{} {root}", "✓ CalDAV:".green()),
        None => println!("{}", "⚠ No CalDAV service".yellow()),
    }
    match &result.addressbook_root {
        Some(root) => println!("{} {root}", "✓ CardDAV:".green()),
        None => println!("{}", "⚠ No CardDAV service".yellow()),
    }
    if let Some(principal) = &result.principal {
        println!("Principal: {principal}");
    }

    if result.collections.is_empty() {
        println!("No collections found");
        return Ok(());
    }

    println!("{:-<110}", "");
    println!(
        "{:<60} {:<12} {:<20} {:<9} {}",
        "URL", "Kind", "Name", "Writable", "Changes"
    );
    println!("{:-<110}", "");
    for c in &result.collections {
        println!(
            "{:<60} {:<12} {:<20} {:<9} {:?}",
            c.url.as_str(),
            c.kind.as_ref(),
            c.display_name.as_deref().unwrap_or("Unnamed"),
            c.writable,
            c.change_detection
        );
    }
    Ok(())
}

async fn cmd_sync(account: AccountConfig, config: SyncConfig) -> Result<(), Box<dyn Error>> {
    let store = Arc::new(MemoryStore::new());
    let mut account = Account::from(account);
    if account.kinds.is_empty() {
        account.kinds = vec![
            davsync_dav::CollectionKind::Calendar,
            davsync_dav::CollectionKind::TaskList,
            davsync_dav::CollectionKind::AddressBook,
        ];
    }
    let account_id = account.id;
    store.upsert_account(account).await?;

    let engine = Arc::new(SyncEngine::new(Arc::clone(&store), config));
    let collections = engine.refresh_collections(account_id).await?;
    println!(
        "{} {} collection(s)",
        "✓ Discovered".green(),
        collections.len()
    );

    let cancel = CancelToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });

    let report = SyncScheduler::new(engine)
        .sync_account(account_id, &cancel)
        .await?;
    print_report(&report);
    if report.is_success() {
        Ok(())
    } else {
        Err("some collections failed to sync".into())
    }
}

fn print_report(report: &AccountReport) {
    println!("{:-<110}", "");
    println!(
        "{:<60} {:>7} {:>7} {:>7} {:>9} {:>8}",
        "URL", "Pulled", "Pushed", "Purged", "Conflicts", "Failures"
    );
    println!("{:-<110}", "");
    for outcome in &report.outcomes {
        match &outcome.result {
            Ok(s) => println!(
                "{:<60} {:>7} {:>7} {:>7} {:>9} {:>8}",
                outcome.url.as_str(),
                s.pulled,
                s.pushed,
                s.purged,
                s.conflicts,
                s.failures
            ),
            Err(e) => println!("{:<60} {}", outcome.url.as_str(), format_sync_error(e)),
        }
    }
    println!("Items synced: {}", report.items_synced());
}

fn format_sync_error(err: &SyncError) -> String {
    let label = "Error:".red().bold();
    match err {
        SyncError::Authentication { status } => {
            format!("{label} Authentication failed ({status})")
        }
        SyncError::Network(_) => {
            format!("{label} Network error - check server URL and connection")
        }
        SyncError::NoServicesFound => {
            format!("{label} Server doesn't offer CalDAV or CardDAV")
        }
        SyncError::Cancelled { phase } => format!("{label} Cancelled while {phase}"),
        e => format!("{label} {e}"),
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    // .env.local overrides .env
    dotenvy::dotenv().ok();
    dotenvy::from_filename(".env.local").ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let runtime = tokio::runtime::Runtime::new()?;

    let result = runtime.block_on(async {
        let (account, config) = cli.resolve().await?;
        match cli.command {
            Commands::Discover => cmd_discover(account.dav).await,
            Commands::Sync => cmd_sync(account, config).await,
        }
    });

    if let Err(e) = result {
        std::io::stdout().flush().ok();
        match e.downcast_ref::<SyncError>() {
            Some(sync) => eprintln!("{}", format_sync_error(sync)),
            None => eprintln!("{} {e}", "Error:".red().bold()),
        }
        std::process::exit(1);
    }

    Ok(())
}
