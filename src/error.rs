#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// A ledger-service call failed outright (transport, provider, or
    /// malformed response). Raised by [`crate::ledger::LedgerService`]
    /// implementations.
    #[error("ledger error: {reason}")]
    Ledger { reason: String },

    /// A signature-page request failed during a scan. Terminal for the whole
    /// scan; record-level failures never take this path.
    #[error("cursor fetch failed on page {page}: {reason}")]
    CursorFetch { page: usize, reason: String },

    /// Pipeline configuration rejected up front (zero chunk size, zero
    /// discriminator width, and the like).
    #[error("invalid configuration: {reason}")]
    Config { reason: String },
}
