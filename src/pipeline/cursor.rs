use std::collections::HashSet;

use solana_pubkey::Pubkey;
use tracing::{debug, warn};

use crate::error::Error;
use crate::ledger::{CancelToken, LedgerService};
use crate::types::SignatureRecord;

/// Everything the cursor gathered, newest first.
#[derive(Debug)]
pub struct SignatureScan {
    pub records: Vec<SignatureRecord>,
    /// Number of page requests issued.
    pub pages: usize,
    /// False when the scan stopped early (cancelled or page-capped); the
    /// gathered records are still valid, just not a complete cover.
    pub complete: bool,
}

/// Walk the ledger's signature index for `address` from the live head back
/// to the oldest entry.
///
/// Each page request passes `before = oldest signature of the prior page`,
/// so pages strictly precede one another and the scan terminates on the
/// first empty page. A page-fetch failure is terminal for the whole scan;
/// there is no partial-page recovery at this layer.
///
/// Duplicates from a provider that violates the `before` contract are
/// filtered so the output stays a set.
pub async fn scan_signatures<L: LedgerService + ?Sized>(
    ledger: &L,
    address: &Pubkey,
    cancel: &CancelToken,
    max_pages: Option<usize>,
) -> Result<SignatureScan, Error> {
    let mut records: Vec<SignatureRecord> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    let mut before: Option<String> = None;
    let mut pages = 0usize;

    loop {
        if cancel.is_cancelled() {
            debug!(%address, pages, gathered = records.len(), "scan cancelled");
            return Ok(SignatureScan {
                records,
                pages,
                complete: false,
            });
        }
        if let Some(cap) = max_pages
            && pages >= cap
        {
            warn!(%address, cap, gathered = records.len(), "scan hit page cap");
            return Ok(SignatureScan {
                records,
                pages,
                complete: false,
            });
        }

        let page = ledger
            .signatures_for_address(address, before.as_deref())
            .await
            .map_err(|e| Error::CursorFetch {
                page: pages,
                reason: e.to_string(),
            })?;
        pages += 1;

        if page.is_empty() {
            debug!(%address, pages, gathered = records.len(), "scan complete");
            return Ok(SignatureScan {
                records,
                pages,
                complete: true,
            });
        }

        before = page.last().map(|r| r.signature.clone());
        for record in page {
            if seen.insert(record.signature.clone()) {
                records.push(record);
            } else {
                warn!(signature = %record.signature, "duplicate signature from provider, skipped");
            }
        }
    }
}
