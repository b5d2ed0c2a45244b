// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Parallel sync of an account's collections.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use url::Url;

use crate::cancel::CancelToken;
use crate::engine::{SyncEngine, SyncSummary};
use crate::error::SyncError;
use crate::model::{AccountId, CollectionId};
use crate::store::LocalStore;

/// Result of syncing one collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionOutcome {
    /// Collection id.
    pub collection: CollectionId,
    /// Collection URL.
    pub url: Url,
    /// Summary, or the error of the last attempt.
    pub result: Result<SyncSummary, SyncError>,
}

/// Per-collection results of an account sync, ordered by URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountReport {
    /// Synced account.
    pub account: AccountId,
    /// One entry per enabled collection.
    pub outcomes: Vec<CollectionOutcome>,
}

impl AccountReport {
    /// Whether every collection synced.
    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(|o| o.result.is_ok())
    }

    /// Items synced across all collections.
    pub fn items_synced(&self) -> usize {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().ok())
            .map(|s| s.items_synced)
            .sum()
    }
}

/// Runs collection syncs on a bounded worker pool, retrying transient
/// failures with exponential backoff.
#[derive(Debug)]
pub struct SyncScheduler<S: ?Sized> {
    engine: Arc<SyncEngine<S>>,
}

impl<S: ?Sized> Clone for SyncScheduler<S> {
    fn clone(&self) -> Self {
        Self {
            engine: Arc::clone(&self.engine),
        }
    }
}

impl<S: LocalStore + ?Sized + 'static> SyncScheduler<S> {
    /// Creates a scheduler over a shared engine.
    pub fn new(engine: Arc<SyncEngine<S>>) -> Self {
        Self { engine }
    }

    /// The engine syncs run on.
    pub fn engine(&self) -> &Arc<SyncEngine<S>> {
        &self.engine
    }

    /// Syncs every enabled collection of an account.
    ///
    /// Collections run independently; one failing does not stop the rest.
    ///
    /// # Errors
    ///
    /// Returns an error only if the collection list cannot be read.
    #[tracing::instrument(skip(self, cancel), fields(account = %account))]
    pub async fn sync_account(
        &self,
        account: AccountId,
        cancel: &CancelToken,
    ) -> Result<AccountReport, SyncError> {
        let collections = self.engine.store().collections(account).await?;
        let workers = self.engine.config().worker_count();
        let permits = Arc::new(Semaphore::new(workers));
        tracing::debug!(collections = collections.len(), workers, "starting account sync");

        let mut tasks = JoinSet::new();
        let mut targets = HashMap::new();
        for collection in collections.into_iter().filter(|c| c.enabled) {
            let engine = Arc::clone(&self.engine);
            let permits = Arc::clone(&permits);
            let cancel = cancel.clone();
            let id = collection.id;
            let handle = tasks.spawn(async move {
                let _permit = permits
                    .acquire_owned()
                    .await
                    .map_err(|e| SyncError::Protocol(e.to_string()))?;
                sync_with_retry(&engine, id, &cancel).await
            });
            targets.insert(handle.id(), (id, collection.url));
        }

        let mut outcomes = Vec::new();
        while let Some(joined) = tasks.join_next_with_id().await {
            let (task, result) = match joined {
                Ok((task, result)) => (task, result),
                Err(e) => {
                    tracing::error!(error = %e, "sync task failed");
                    (e.id(), Err(SyncError::Protocol(format!("sync task failed: {e}"))))
                }
            };
            if let Some((collection, url)) = targets.remove(&task) {
                if let Err(e) = &result {
                    tracing::error!(%url, error = %e, "collection sync failed");
                }
                outcomes.push(CollectionOutcome {
                    collection,
                    url,
                    result,
                });
            }
        }

        outcomes.sort_by(|a, b| a.url.as_str().cmp(b.url.as_str()));
        let report = AccountReport { account, outcomes };
        tracing::info!(
            collections = report.outcomes.len(),
            synced = report.items_synced(),
            success = report.is_success(),
            "account sync finished"
        );
        Ok(report)
    }
}

async fn sync_with_retry<S: LocalStore + ?Sized>(
    engine: &SyncEngine<S>,
    id: CollectionId,
    cancel: &CancelToken,
) -> Result<SyncSummary, SyncError> {
    let max_retries = engine.config().max_retries;
    let mut attempt = 0;
    loop {
        match engine.sync(id, cancel).await {
            Err(e) if e.is_retryable() && attempt < max_retries => {
                let delay = engine.config().backoff(attempt);
                attempt += 1;
                tracing::warn!(collection = %id, attempt, ?delay, error = %e, "sync failed, retrying");
                tokio::select! {
                    () = tokio::time::sleep(delay) => {}
                    () = cancel.cancelled() => return Err(e),
                }
            }
            result => return result,
        }
    }
}
