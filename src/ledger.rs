//! The external ledger-service boundary.
//!
//! The pipeline never owns a connection; callers hand in any
//! [`LedgerService`] implementation (an RPC client in production, an
//! in-memory map in tests) together with the schema. Nothing in this crate
//! holds process-wide state.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use solana_pubkey::Pubkey;

use crate::error::Error;
use crate::types::{SignatureRecord, TransactionRecord};

/// Append-only ledger lookup surface consumed by the pipeline.
#[async_trait::async_trait]
pub trait LedgerService: Send + Sync {
    /// Most recent signatures referencing `address`, newest first, starting
    /// strictly before the `before` cursor when one is given. An empty page
    /// means the history is exhausted.
    async fn signatures_for_address(
        &self,
        address: &Pubkey,
        before: Option<&str>,
    ) -> Result<Vec<SignatureRecord>, Error>;

    /// Batched transaction lookup, order-preserving and same length as the
    /// input. `None` for a signature means the record expired or was pruned.
    async fn transactions(
        &self,
        signatures: &[String],
    ) -> Result<Vec<Option<TransactionRecord>>, Error>;
}

/// Cooperative cancellation flag for long scans.
///
/// Cloned freely; the cursor checks it between page requests, so cancelling
/// keeps everything gathered so far usable.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}
