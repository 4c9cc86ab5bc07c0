use std::time::Duration;

use futures::stream::{self, StreamExt};
use tracing::{debug, warn};

use crate::ledger::LedgerService;
use crate::types::ResolvedTransaction;

/// Resolve `signatures` into transaction records in bounded batches.
///
/// The input is split into chunks of `chunk_size`; each chunk is one batched
/// ledger call, so N signatures cost exactly `ceil(N / chunk_size)` calls.
/// Chunks run with up to `concurrency` calls in flight; `buffered` rejoins
/// them in chunk order, so the output always lines up with the input,
/// position by position.
///
/// Failure isolation: a chunk whose batched call errors (after `retries`
/// further attempts, `backoff` apart) marks every signature in that chunk
/// [`ResolvedTransaction::ChunkFailed`] and the remaining chunks proceed. An
/// absent record inside a successful chunk is [`ResolvedTransaction::Missing`].
pub async fn resolve_transactions<L: LedgerService + ?Sized>(
    ledger: &L,
    signatures: &[String],
    chunk_size: usize,
    concurrency: usize,
    retries: u32,
    backoff: Duration,
) -> Vec<(String, ResolvedTransaction)> {
    if signatures.is_empty() {
        return Vec::new();
    }
    let chunk_size = chunk_size.max(1);
    debug!(
        signatures = signatures.len(),
        chunk_size,
        chunks = signatures.len().div_ceil(chunk_size),
        "resolving transactions"
    );

    let chunk_results: Vec<Vec<(String, ResolvedTransaction)>> =
        stream::iter(signatures.chunks(chunk_size).enumerate())
            .map(|(chunk_index, chunk)| async move {
                resolve_chunk(ledger, chunk_index, chunk, retries, backoff).await
            })
            .buffered(concurrency.max(1))
            .collect()
            .await;

    // Per-chunk buffers merged at the join point, in original order.
    chunk_results.into_iter().flatten().collect()
}

async fn resolve_chunk<L: LedgerService + ?Sized>(
    ledger: &L,
    chunk_index: usize,
    chunk: &[String],
    retries: u32,
    backoff: Duration,
) -> Vec<(String, ResolvedTransaction)> {
    let mut attempt = 0u32;
    let records = loop {
        match ledger.transactions(chunk).await {
            Ok(records) => break Ok(records),
            Err(e) if attempt < retries => {
                attempt += 1;
                warn!(chunk_index, attempt, error = %e, "chunk fetch failed, retrying");
                if !backoff.is_zero() {
                    tokio::time::sleep(backoff).await;
                }
            }
            Err(e) => break Err(e),
        }
    };

    match records {
        Ok(mut records) => {
            // An order-preserving provider returns one slot per signature;
            // pad short responses so positions stay aligned.
            if records.len() < chunk.len() {
                warn!(
                    chunk_index,
                    expected = chunk.len(),
                    got = records.len(),
                    "short batch response, padding with missing"
                );
                records.resize_with(chunk.len(), || None);
            }
            chunk
                .iter()
                .zip(records)
                .map(|(signature, record)| {
                    let resolved = match record {
                        Some(tx) => ResolvedTransaction::Fetched(tx),
                        None => ResolvedTransaction::Missing,
                    };
                    (signature.clone(), resolved)
                })
                .collect()
        }
        Err(e) => {
            warn!(chunk_index, error = %e, "chunk unavailable");
            chunk
                .iter()
                .map(|signature| {
                    (
                        signature.clone(),
                        ResolvedTransaction::ChunkFailed {
                            reason: e.to_string(),
                        },
                    )
                })
                .collect()
        }
    }
}
