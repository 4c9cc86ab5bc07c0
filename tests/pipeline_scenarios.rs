#![expect(
    clippy::unwrap_used,
    clippy::panic,
    reason = "test code uses unwrap/panic for concise assertions"
)]

use std::collections::{HashMap, HashSet};

use program_activity_decoder::{
    ActivityScanner, CancelToken, DecodeOutcome, Diagnostic, Error, Field, FieldKind,
    InstructionSchema, InstructionVariant, LedgerService, PipelineConfig, RawInstruction,
    SignatureRecord, SortOrder, TransactionMeta, TransactionRecord, Value, decode_instruction,
    encode_fields, format_decoded, format_diagnostic,
};
use solana_pubkey::Pubkey;

const PAGE_SIZE: usize = 100;

const CREATE_DISC: [u8; 8] = [0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88];
const CLOSE_DISC: [u8; 8] = [0x99, 0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF, 0x00];

fn entry_schema() -> InstructionSchema {
    InstructionSchema::new(8)
        .unwrap()
        .with_variant(
            CREATE_DISC.to_vec(),
            InstructionVariant {
                name: "CreateEntry".to_string(),
                fields: vec![
                    Field::new("id", FieldKind::u64_le()),
                    Field::new("payload", FieldKind::bytes_u32()),
                ],
                account_roles: vec!["authority".to_string(), "entry".to_string()],
            },
        )
        .unwrap()
        .with_variant(
            CLOSE_DISC.to_vec(),
            InstructionVariant {
                name: "CloseEntry".to_string(),
                fields: vec![Field::new("id", FieldKind::u64_le())],
                account_roles: vec!["authority".to_string(), "entry".to_string()],
            },
        )
        .unwrap()
}

/// In-memory ledger with real `before`-cursor pagination and per-signature
/// batch failure injection.
struct MockLedger {
    /// Newest first, as the live index would serve them.
    index: Vec<SignatureRecord>,
    transactions: HashMap<String, TransactionRecord>,
    /// Any batch containing one of these signatures fails outright.
    poison: HashSet<String>,
}

impl MockLedger {
    fn new() -> Self {
        Self {
            index: vec![],
            transactions: HashMap::new(),
            poison: HashSet::new(),
        }
    }
}

#[async_trait::async_trait]
impl LedgerService for MockLedger {
    async fn signatures_for_address(
        &self,
        _address: &Pubkey,
        before: Option<&str>,
    ) -> Result<Vec<SignatureRecord>, Error> {
        let start = match before {
            None => 0,
            Some(cursor) => {
                let at = self
                    .index
                    .iter()
                    .position(|r| r.signature == cursor)
                    .ok_or_else(|| Error::Ledger {
                        reason: format!("unknown cursor {cursor}"),
                    })?;
                at + 1
            }
        };
        Ok(self
            .index
            .iter()
            .skip(start)
            .take(PAGE_SIZE)
            .cloned()
            .collect())
    }

    async fn transactions(
        &self,
        signatures: &[String],
    ) -> Result<Vec<Option<TransactionRecord>>, Error> {
        if signatures.iter().any(|s| self.poison.contains(s)) {
            return Err(Error::Ledger {
                reason: "batch lookup failed".to_string(),
            });
        }
        Ok(signatures
            .iter()
            .map(|s| self.transactions.get(s).cloned())
            .collect())
    }
}

struct Fixture {
    ledger: MockLedger,
    program: Pubkey,
    authority: Pubkey,
    entry: Pubkey,
}

impl Fixture {
    fn new() -> Self {
        Self {
            ledger: MockLedger::new(),
            program: Pubkey::new_unique(),
            authority: Pubkey::new_unique(),
            entry: Pubkey::new_unique(),
        }
    }

    fn create_payload(&self, id: u64) -> Vec<u8> {
        let fields = vec![
            Field::new("id", FieldKind::u64_le()),
            Field::new("payload", FieldKind::bytes_u32()),
        ];
        let values = vec![
            ("id".to_string(), Value::Unsigned(id)),
            ("payload".to_string(), Value::Bytes(vec![id as u8; 4])),
        ];
        let mut data = CREATE_DISC.to_vec();
        data.extend(encode_fields(&fields, &values).unwrap());
        data
    }

    /// Push a transaction holding one target-program instruction, plus an
    /// unrelated instruction to exercise extraction. Signatures are indexed
    /// newest-first as `n` descends.
    fn push_tx(&mut self, n: u64, data: Vec<u8>, block_time: Option<i64>) {
        let signature = format!("sig-{n:04}");
        let noise_program = Pubkey::new_unique();
        let tx = TransactionRecord {
            signatures: vec![signature.clone()],
            account_keys: vec![self.program, self.authority, self.entry, noise_program],
            instructions: vec![
                RawInstruction {
                    program_ref: noise_program,
                    accounts: vec![self.authority],
                    data: vec![0xEE],
                },
                RawInstruction {
                    program_ref: self.program,
                    accounts: vec![self.authority, self.entry],
                    data,
                },
            ],
            meta: TransactionMeta::default(),
            block_time,
        };
        self.ledger.index.push(SignatureRecord {
            signature: signature.clone(),
            slot: n,
            block_time,
            err: None,
        });
        self.ledger.transactions.insert(signature, tx);
    }
}

#[tokio::test]
async fn end_to_end_failing_middle_chunk_is_isolated() {
    let mut fixture = Fixture::new();
    // 250 signatures, newest first: sig-0249 down to sig-0000.
    for n in (0..250u64).rev() {
        let data = fixture.create_payload(n);
        fixture.push_tx(n, data, Some(1_000 + n as i64));
    }
    // Poison the second chunk of 100 (positions 100..200 of the scan order).
    for n in (50..150u64).rev() {
        fixture.ledger.poison.insert(format!("sig-{n:04}"));
    }

    let schema = entry_schema();
    let scanner = ActivityScanner::new(&fixture.ledger, &schema).with_config(PipelineConfig {
        chunk_retries: 0,
        ..Default::default()
    });
    let report = scanner
        .scan(
            &fixture.program,
            &fixture.program,
            SortOrder::Ascending,
            &CancelToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(report.signatures_scanned, 250);
    assert_eq!(report.instructions.len(), 150);
    assert!(!report.complete);

    let unresolved: Vec<_> = report
        .diagnostics
        .iter()
        .filter_map(|d| match d {
            Diagnostic::ChunkUnavailable { signatures, .. } => Some(signatures.len()),
            _ => None,
        })
        .collect();
    assert_eq!(unresolved, vec![100]);

    // Ascending by block time, and only from the surviving chunks.
    let times: Vec<_> = report
        .instructions
        .iter()
        .map(|ix| ix.block_time.unwrap())
        .collect();
    let mut sorted = times.clone();
    sorted.sort_unstable();
    assert_eq!(times, sorted);

    let ids: HashSet<u64> = report
        .instructions
        .iter()
        .map(|ix| ix.field("id").unwrap().as_unsigned().unwrap())
        .collect();
    assert!((50..150).all(|n| !ids.contains(&n)));
    assert!((150..250).chain(0..50).all(|n| ids.contains(&n)));

    let total: u64 = report.counts.iter().map(|b| b.count).sum();
    assert_eq!(total, 150);
    assert_eq!(report.counts[0].name, "CreateEntry");
}

#[tokio::test]
async fn unknown_and_malformed_payloads_do_not_disturb_siblings() {
    let mut fixture = Fixture::new();
    let good = fixture.create_payload(1);
    fixture.push_tx(3, good, Some(30));
    // Registered discriminator, truncated body.
    fixture.push_tx(2, CREATE_DISC.to_vec(), Some(20));
    // Discriminator no schema knows.
    fixture.push_tx(1, vec![0xFE; 12], Some(10));

    let schema = entry_schema();
    let scanner = ActivityScanner::new(&fixture.ledger, &schema);
    let report = scanner
        .scan(
            &fixture.program,
            &fixture.program,
            SortOrder::Descending,
            &CancelToken::new(),
        )
        .await
        .unwrap();

    assert!(report.complete);
    assert_eq!(report.instructions.len(), 1);
    assert_eq!(report.instructions[0].name, "CreateEntry");

    let mut unrecognized = 0;
    let mut malformed = 0;
    for diagnostic in &report.diagnostics {
        match diagnostic {
            Diagnostic::UnrecognizedInstruction { .. } => unrecognized += 1,
            Diagnostic::MalformedInstruction { .. } => malformed += 1,
            other => panic!("unexpected diagnostic {other:?}"),
        }
        // Every diagnostic renders for the UI without panicking.
        assert!(!format_diagnostic(diagnostic).is_empty());
    }
    assert_eq!(unrecognized, 1);
    assert_eq!(malformed, 1);
}

#[tokio::test]
async fn pruned_transactions_are_recorded_and_skipped() {
    let mut fixture = Fixture::new();
    let data = fixture.create_payload(2);
    fixture.push_tx(2, data, Some(20));
    let data = fixture.create_payload(1);
    fixture.push_tx(1, data, Some(10));
    // The ledger knows the signature but no longer serves the record.
    fixture.ledger.transactions.remove("sig-0001");

    let schema = entry_schema();
    let scanner = ActivityScanner::new(&fixture.ledger, &schema);
    let report = scanner
        .scan(
            &fixture.program,
            &fixture.program,
            SortOrder::Ascending,
            &CancelToken::new(),
        )
        .await
        .unwrap();

    assert!(report.complete); // missing records do not make a scan partial
    assert_eq!(report.instructions.len(), 1);
    assert!(matches!(
        report.diagnostics.as_slice(),
        [Diagnostic::MissingTransaction { signature }] if signature == "sig-0001"
    ));
}

#[tokio::test]
async fn cancelled_scan_keeps_partial_results() {
    let mut fixture = Fixture::new();
    for n in (0..10u64).rev() {
        let data = fixture.create_payload(n);
        fixture.push_tx(n, data, Some(n as i64));
    }
    let cancel = CancelToken::new();
    cancel.cancel();

    let schema = entry_schema();
    let scanner = ActivityScanner::new(&fixture.ledger, &schema);
    let report = scanner
        .scan(
            &fixture.program,
            &fixture.program,
            SortOrder::Ascending,
            &cancel,
        )
        .await
        .unwrap();

    assert!(!report.complete);
    assert_eq!(report.signatures_scanned, 0);
    assert!(report.instructions.is_empty());
}

#[tokio::test]
async fn page_cap_flags_the_report_partial() {
    let mut fixture = Fixture::new();
    for n in (0..250u64).rev() {
        let data = fixture.create_payload(n);
        fixture.push_tx(n, data, Some(n as i64));
    }

    let schema = entry_schema();
    let scanner = ActivityScanner::new(&fixture.ledger, &schema).with_config(PipelineConfig {
        max_pages: Some(1),
        ..Default::default()
    });
    let report = scanner
        .scan(
            &fixture.program,
            &fixture.program,
            SortOrder::Ascending,
            &CancelToken::new(),
        )
        .await
        .unwrap();

    assert!(!report.complete);
    assert_eq!(report.signatures_scanned, 100);
    assert_eq!(report.instructions.len(), 100);
}

#[tokio::test]
async fn mixed_variants_count_in_first_occurrence_order() {
    let mut fixture = Fixture::new();
    let mut close = CLOSE_DISC.to_vec();
    close.extend(
        encode_fields(
            &[Field::new("id", FieldKind::u64_le())],
            &[("id".to_string(), Value::Unsigned(7))],
        )
        .unwrap(),
    );
    // Newest first: a close, then two creates.
    fixture.push_tx(3, close, Some(30));
    let data = fixture.create_payload(2);
    fixture.push_tx(2, data, Some(20));
    let data = fixture.create_payload(1);
    fixture.push_tx(1, data, Some(10));

    let schema = entry_schema();
    let scanner = ActivityScanner::new(&fixture.ledger, &schema);
    let report = scanner
        .scan(
            &fixture.program,
            &fixture.program,
            SortOrder::Ascending,
            &CancelToken::new(),
        )
        .await
        .unwrap();

    // First occurrence in stream order (newest first): CloseEntry, CreateEntry.
    let names: Vec<_> = report.counts.iter().map(|b| b.name.clone()).collect();
    assert_eq!(names, vec!["CloseEntry", "CreateEntry"]);
    assert_eq!(report.counts[1].count, 2);

    // But the ordered list is chronological ascending.
    assert_eq!(report.instructions[0].name, "CreateEntry");
    assert_eq!(report.instructions[2].name, "CloseEntry");

    // Display records carry the named roles.
    let display = format_decoded(&report.instructions[0]);
    assert_eq!(display.accounts[0].0, "authority");
    assert_eq!(display.accounts[1].0, "entry");
    assert_eq!(display.status, "ok");
}

#[test]
fn decode_outcome_covers_every_extracted_instruction() {
    // Directly exercise the decoder contract the pipeline relies on: one
    // outcome per input, whatever the payload looks like.
    let schema = entry_schema();
    let context = program_activity_decoder::InstructionContext {
        signature: "sig".to_string(),
        block_time: None,
        tx_err: None,
    };
    let payloads: Vec<Vec<u8>> = vec![
        vec![],
        vec![0x00],
        CREATE_DISC.to_vec(),
        vec![0xAB; 64],
    ];
    for data in payloads {
        let extracted = program_activity_decoder::ExtractedInstruction {
            instruction: RawInstruction {
                program_ref: Pubkey::new_unique(),
                accounts: vec![],
                data,
            },
            context: context.clone(),
        };
        let outcome = decode_instruction(&schema, &extracted);
        assert!(matches!(
            outcome,
            DecodeOutcome::Decoded(_)
                | DecodeOutcome::Unrecognized { .. }
                | DecodeOutcome::Malformed { .. }
        ));
    }
}
