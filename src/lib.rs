#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::dbg_macro,
        clippy::print_stdout,
        clippy::print_stderr,
        clippy::panic,
    )
)]

pub mod decode;
pub mod error;
pub mod format;
pub mod ledger;
pub mod pipeline;
pub mod schema;
pub mod types;

pub use decode::{EncodeError, decode_instruction, encode_fields};
pub use error::Error;
pub use format::{DisplayRecord, format_decoded, format_diagnostic, format_value};
pub use ledger::{CancelToken, LedgerService};
pub use pipeline::{
    ActivityReport, ActivityScanner, ActivitySummary, PipelineConfig, SignatureScan, SortOrder,
    aggregate, extract_instructions, resolve_transactions, scan_signatures,
};
pub use schema::{
    Endianness, Field, FieldKind, InstructionSchema, InstructionVariant, IntWidth, Value,
};
pub use types::{
    AggregateBucket, DecodeOutcome, DecodedInstruction, Diagnostic, ExtractedInstruction,
    InstructionContext, RawInstruction, ResolvedTransaction, SignatureRecord, TransactionMeta,
    TransactionRecord,
};
