// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;

use tokio::sync::watch;

use crate::error::SyncError;

/// Phases of one collection sync, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum Phase {
    /// Comparing the stored change token with the server's.
    Detecting,
    /// Listing changed and removed members.
    Enumerating,
    /// Downloading changed bodies.
    Fetching,
    /// Applying remote changes to local items.
    Reconciling,
    /// Uploading local changes.
    Pushing,
    /// Writing the result to the store.
    Committing,
}

impl Phase {
    /// Whether cancellation is still honoured in this phase.
    #[must_use]
    pub const fn is_cancellable(self) -> bool {
        !matches!(self, Self::Pushing | Self::Committing)
    }
}

/// Cooperative cancellation shared between a caller and running syncs.
///
/// Checked between phases; once pushing has started the sync runs to commit.
#[derive(Debug, Clone)]
pub struct CancelToken {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelToken {
    /// Creates a token that is not cancelled.
    #[must_use]
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    /// Whether cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Fails with [`SyncError::Cancelled`] if cancelled and `phase` still
    /// honours it.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Cancelled`] when cancellation applies.
    pub fn check(&self, phase: Phase) -> Result<(), SyncError> {
        if phase.is_cancellable() && self.is_cancelled() {
            tracing::info!(%phase, "sync cancelled");
            return Err(SyncError::Cancelled { phase });
        }
        Ok(())
    }

    /// Resolves once cancellation is requested.
    pub async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        // the sender lives as long as self, so this only returns on cancel
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancellation_is_ignored_once_pushing() {
        let token = CancelToken::new();
        assert!(token.check(Phase::Detecting).is_ok());

        token.clone().cancel();
        assert!(token.is_cancelled());
        assert_eq!(
            token.check(Phase::Fetching),
            Err(SyncError::Cancelled {
                phase: Phase::Fetching
            })
        );
        assert!(token.check(Phase::Pushing).is_ok());
        assert!(token.check(Phase::Committing).is_ok());
    }

    #[tokio::test]
    async fn cancelled_resolves_after_cancel() {
        let token = CancelToken::new();
        let waiter = {
            let token = token.clone();
            tokio::spawn(async move { token.cancelled().await })
        };
        token.cancel();
        waiter.await.unwrap();
    }
}
