// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use davsync_codec::CodecError;
use davsync_dav::DavError;

use crate::cancel::Phase;
use crate::model::{CollectionId, ConflictId};
use crate::store::StoreError;

/// Errors raised by the sync engine and scheduler.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyncError {
    /// Timeout, DNS, connection or TLS failure; retryable.
    #[error("network error: {0}")]
    Network(String),

    /// Credentials were rejected; never retried automatically.
    #[error("authentication failed with status {status}")]
    Authentication {
        /// HTTP status code.
        status: u16,
    },

    /// Malformed response or unexpected status.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Discovery found neither a CalDAV nor a CardDAV service.
    #[error("no CalDAV or CardDAV service found")]
    NoServicesFound,

    /// The local store failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Cancelled before the push phase started.
    #[error("sync cancelled during {phase}")]
    Cancelled {
        /// Phase that observed the cancellation.
        phase: Phase,
    },

    /// Another sync of the same collection is in flight.
    #[error("collection {0} is already syncing")]
    AlreadySyncing(CollectionId),

    /// No such collection in the store.
    #[error("collection {0} not found")]
    CollectionNotFound(CollectionId),

    /// No such pending conflict.
    #[error("conflict {0} not found")]
    ConflictNotFound(ConflictId),
}

impl SyncError {
    /// Whether retrying the whole collection may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Network(_))
    }
}

impl From<DavError> for SyncError {
    fn from(e: DavError) -> Self {
        match e {
            DavError::Network(msg) | DavError::Tls(msg) => Self::Network(msg),
            DavError::Authentication { status } => Self::Authentication { status },
            DavError::NoServicesFound => Self::NoServicesFound,
            other => Self::Protocol(other.to_string()),
        }
    }
}

impl From<CodecError> for SyncError {
    fn from(e: CodecError) -> Self {
        Self::Protocol(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dav_errors_map_to_taxonomy() {
        let e = SyncError::from(DavError::Tls("bad pin".to_string()));
        assert!(e.is_retryable());

        let e = SyncError::from(DavError::Authentication { status: 401 });
        assert_eq!(e, SyncError::Authentication { status: 401 });
        assert!(!e.is_retryable());

        let e = SyncError::from(DavError::InvalidMultistatus("html".to_string()));
        assert!(matches!(e, SyncError::Protocol(_)));
    }
}
