//! The activity pipeline: signature cursor → batched fetch → instruction
//! extraction → schema decode → aggregation.
//!
//! Only the cursor can fail the whole operation. Every record-level problem
//! (a failed chunk, a pruned transaction, an unknown or malformed payload)
//! is isolated, recorded as a [`Diagnostic`], and never stops the stages
//! downstream of it.

pub mod aggregate;
pub mod cursor;
pub mod extract;
pub mod fetch;

use std::time::Duration;

use solana_pubkey::Pubkey;
use tracing::debug;

use crate::decode::decode_instruction;
use crate::error::Error;
use crate::ledger::{CancelToken, LedgerService};
use crate::schema::InstructionSchema;
use crate::types::{
    AggregateBucket, DecodeOutcome, DecodedInstruction, Diagnostic, ResolvedTransaction,
};

pub use aggregate::{ActivitySummary, SortOrder, aggregate};
pub use cursor::{SignatureScan, scan_signatures};
pub use extract::extract_instructions;
pub use fetch::resolve_transactions;

/// Tunables for one scan.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Signatures per batched transaction lookup. The ledger service caps
    /// batch sizes per request; 100 is the common limit.
    pub chunk_size: usize,
    /// Batched lookups allowed in flight at once.
    pub chunk_concurrency: usize,
    /// Retries per failed chunk before it is marked unavailable.
    pub chunk_retries: u32,
    /// Pause between chunk retries. Zero by default so tests run dry.
    pub retry_backoff: Duration,
    /// Hard cap on signature pages scanned; `None` scans to the oldest entry.
    pub max_pages: Option<usize>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            chunk_size: 100,
            chunk_concurrency: 4,
            chunk_retries: 2,
            retry_backoff: Duration::ZERO,
            max_pages: None,
        }
    }
}

impl PipelineConfig {
    fn validate(&self) -> Result<(), Error> {
        if self.chunk_size == 0 {
            return Err(Error::Config {
                reason: "chunk_size must be at least 1".to_string(),
            });
        }
        if self.chunk_concurrency == 0 {
            return Err(Error::Config {
                reason: "chunk_concurrency must be at least 1".to_string(),
            });
        }
        if self.max_pages == Some(0) {
            return Err(Error::Config {
                reason: "max_pages of 0 would scan nothing".to_string(),
            });
        }
        Ok(())
    }
}

/// Everything one scan produced, ready for the presentation layer.
#[derive(Debug)]
pub struct ActivityReport {
    /// Decoded instructions in the requested chronological order.
    pub instructions: Vec<DecodedInstruction>,
    /// Per-variant counts, first-occurrence ordered.
    pub counts: Vec<AggregateBucket>,
    /// Record-level failures gathered across all stages.
    pub diagnostics: Vec<Diagnostic>,
    /// Signatures the cursor produced (including ones that later failed to
    /// resolve or decode).
    pub signatures_scanned: usize,
    /// False when the scan was cancelled, page-capped, or lost a chunk; the
    /// report is then explicitly partial rather than silently short.
    pub complete: bool,
}

/// One address's decoded activity against one program schema.
///
/// Holds only borrowed collaborators; nothing here is process-global.
pub struct ActivityScanner<'a, L: LedgerService + ?Sized> {
    ledger: &'a L,
    schema: &'a InstructionSchema,
    config: PipelineConfig,
}

impl<'a, L: LedgerService + ?Sized> ActivityScanner<'a, L> {
    pub fn new(ledger: &'a L, schema: &'a InstructionSchema) -> Self {
        Self {
            ledger,
            schema,
            config: PipelineConfig::default(),
        }
    }

    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// Reconstruct the complete decoded activity log of `address` against
    /// `program`, in the requested order.
    ///
    /// `address` is the account whose history is scanned; `program` is the
    /// target the schema describes. They are often the same (scanning a
    /// program's own activity) but a user wallet against a program works the
    /// same way.
    pub async fn scan(
        &self,
        address: &Pubkey,
        program: &Pubkey,
        order: SortOrder,
        cancel: &CancelToken,
    ) -> Result<ActivityReport, Error> {
        self.config.validate()?;

        let scan = scan_signatures(self.ledger, address, cancel, self.config.max_pages).await?;
        let signatures: Vec<String> = scan.records.iter().map(|r| r.signature.clone()).collect();
        debug!(
            %address,
            signatures = signatures.len(),
            complete = scan.complete,
            "signature scan finished"
        );

        let resolved = resolve_transactions(
            self.ledger,
            &signatures,
            self.config.chunk_size,
            self.config.chunk_concurrency,
            self.config.chunk_retries,
            self.config.retry_backoff,
        )
        .await;

        let mut outcomes: Vec<DecodeOutcome> = Vec::new();
        let mut fetch_diagnostics: Vec<Diagnostic> = Vec::new();
        // (chunk index, signatures, reason) of the failed chunk being folded.
        let mut failed_chunk: Option<(usize, Vec<String>, String)> = None;
        let mut any_chunk_failed = false;

        for (position, (signature, result)) in resolved.into_iter().enumerate() {
            let chunk_index = position / self.config.chunk_size;
            // Failures fold into one diagnostic per chunk.
            let flush = match &failed_chunk {
                Some((folding, _, _)) => {
                    *folding != chunk_index
                        || !matches!(result, ResolvedTransaction::ChunkFailed { .. })
                }
                None => false,
            };
            if flush && let Some((_, signatures, reason)) = failed_chunk.take() {
                fetch_diagnostics.push(Diagnostic::ChunkUnavailable { signatures, reason });
            }

            match result {
                ResolvedTransaction::Fetched(tx) => {
                    for extracted in extract_instructions(program, &tx) {
                        outcomes.push(decode_instruction(self.schema, &extracted));
                    }
                }
                ResolvedTransaction::Missing => {
                    fetch_diagnostics.push(Diagnostic::MissingTransaction { signature });
                }
                ResolvedTransaction::ChunkFailed { reason } => {
                    any_chunk_failed = true;
                    match &mut failed_chunk {
                        Some((_, signatures, _)) => signatures.push(signature),
                        None => failed_chunk = Some((chunk_index, vec![signature], reason)),
                    }
                }
            }
        }
        if let Some((_, signatures, reason)) = failed_chunk.take() {
            fetch_diagnostics.push(Diagnostic::ChunkUnavailable { signatures, reason });
        }

        let summary = aggregate(outcomes, order);
        let mut diagnostics = fetch_diagnostics;
        diagnostics.extend(summary.diagnostics);

        Ok(ActivityReport {
            instructions: summary.ordered,
            counts: summary.counts,
            diagnostics,
            signatures_scanned: signatures.len(),
            complete: scan.complete && !any_chunk_failed,
        })
    }
}
