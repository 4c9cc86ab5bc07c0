use solana_pubkey::Pubkey;

use crate::schema::Value;

/// One entry of the ledger's signature index for an address, newest first.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SignatureRecord {
    /// Transaction signature (base58).
    pub signature: String,
    /// Slot in which the transaction landed.
    pub slot: u64,
    /// Unix timestamp of the containing block, if the ledger recorded one.
    pub block_time: Option<i64>,
    /// Opaque transaction error, `None` for successful transactions.
    pub err: Option<serde_json::Value>,
}

/// Execution metadata attached to a confirmed transaction.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct TransactionMeta {
    /// Opaque transaction error, `None` for successful transactions.
    pub err: Option<serde_json::Value>,
    /// Program log lines emitted during execution.
    #[serde(default)]
    pub logs: Vec<String>,
}

/// A full confirmed transaction record as returned by the ledger.
///
/// A known signature may still resolve to no record when the ledger has
/// pruned it; that case is `None` at the fetch boundary, never an error.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TransactionRecord {
    /// All signatures on the transaction; the first one identifies it.
    pub signatures: Vec<String>,
    /// Every account referenced by the transaction, in message order.
    pub account_keys: Vec<Pubkey>,
    /// Top-level instructions in execution order.
    pub instructions: Vec<RawInstruction>,
    #[serde(default)]
    pub meta: TransactionMeta,
    /// Unix timestamp of the containing block, if recorded.
    pub block_time: Option<i64>,
}

impl TransactionRecord {
    /// The identifying (first) signature, if the record carries any.
    pub fn primary_signature(&self) -> Option<&str> {
        self.signatures.first().map(String::as_str)
    }
}

/// One instruction as it appears on the wire: a target program, an ordered
/// account list, and an opaque payload whose prefix is the discriminator.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RawInstruction {
    /// Program the instruction is addressed to.
    pub program_ref: Pubkey,
    /// Accounts passed to the program, in declared order.
    pub accounts: Vec<Pubkey>,
    /// Opaque payload; decoding it is [`crate::decode`]'s job.
    pub data: Vec<u8>,
}

/// Transaction-level context carried alongside every extracted instruction.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct InstructionContext {
    /// Primary signature of the containing transaction.
    pub signature: String,
    /// Block time of the containing transaction.
    pub block_time: Option<i64>,
    /// Error of the containing transaction, if it failed.
    pub tx_err: Option<serde_json::Value>,
}

/// A raw instruction isolated from its transaction, tagged with context.
#[derive(Debug, Clone)]
pub struct ExtractedInstruction {
    pub instruction: RawInstruction,
    pub context: InstructionContext,
}

/// A fully decoded instruction, ready for display and aggregation.
///
/// `fields` and `account_roles` are insertion-ordered pair lists: declared
/// field order and positional role order are part of the contract.
#[derive(Debug, Clone, serde::Serialize)]
pub struct DecodedInstruction {
    /// Variant name from the schema (e.g. `"MintTo"`).
    pub name: String,
    /// Decoded payload fields in declared order.
    pub fields: Vec<(String, Value)>,
    /// Accounts zipped with the schema's role names, by position.
    pub account_roles: Vec<(String, Pubkey)>,
    /// Accounts beyond the declared roles (remaining-accounts convention).
    pub extra_accounts: Vec<Pubkey>,
    /// Primary signature of the containing transaction.
    pub signature: String,
    /// Block time of the containing transaction.
    pub block_time: Option<i64>,
    /// Error of the containing transaction, if it failed.
    pub tx_err: Option<serde_json::Value>,
}

impl DecodedInstruction {
    /// Look up a decoded field by name.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(field_name, _)| field_name == name)
            .map(|(_, value)| value)
    }

    /// Look up an account by its schema role name.
    pub fn account(&self, role: &str) -> Option<&Pubkey> {
        self.account_roles
            .iter()
            .find(|(role_name, _)| role_name == role)
            .map(|(_, pubkey)| pubkey)
    }
}

/// Result of decoding one extracted instruction. Every extracted instruction
/// produces exactly one outcome; none are dropped and none abort the batch.
#[derive(Debug, Clone)]
pub enum DecodeOutcome {
    /// Discriminator matched and every field decoded cleanly.
    Decoded(DecodedInstruction),
    /// Discriminator has no schema entry. Expected and common: the schema
    /// evolves and upgrades add variants.
    Unrecognized {
        discriminator: Vec<u8>,
        context: InstructionContext,
    },
    /// Discriminator matched but field decoding ran past the buffer or left
    /// unread trailing bytes.
    Malformed {
        offset: usize,
        reason: String,
        context: InstructionContext,
    },
}

/// Per-signature result of a batched transaction lookup.
#[derive(Debug, Clone)]
pub enum ResolvedTransaction {
    /// The ledger returned a full record.
    Fetched(TransactionRecord),
    /// Known signature, but the record expired or was pruned.
    Missing,
    /// The whole batched call for this signature's chunk failed.
    ChunkFailed { reason: String },
}

/// A record-level failure surfaced to the caller instead of being logged.
///
/// Diagnostics never escalate; they ride alongside the decoded output so the
/// UI can show an accurate "N entries could not be decoded" count.
#[derive(Debug, Clone, serde::Serialize)]
pub enum Diagnostic {
    /// A known signature resolved to no transaction record.
    MissingTransaction { signature: String },
    /// A batched lookup failed; every listed signature went unresolved.
    ChunkUnavailable {
        signatures: Vec<String>,
        reason: String,
    },
    /// Payload discriminator had no schema entry.
    UnrecognizedInstruction {
        signature: String,
        discriminator: Vec<u8>,
    },
    /// Discriminator matched but the payload did not decode.
    MalformedInstruction {
        signature: String,
        offset: usize,
        reason: String,
    },
}

/// Per-variant tally, insertion-ordered by first occurrence in the stream.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct AggregateBucket {
    pub name: String,
    pub count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decoded(name: &str) -> DecodedInstruction {
        DecodedInstruction {
            name: name.to_string(),
            fields: vec![
                ("amount".to_string(), Value::Unsigned(7)),
                ("memo".to_string(), Value::Bytes(vec![1, 2])),
            ],
            account_roles: vec![("authority".to_string(), Pubkey::new_unique())],
            extra_accounts: vec![],
            signature: "sig".to_string(),
            block_time: Some(10),
            tx_err: None,
        }
    }

    #[test]
    fn field_lookup_by_name() {
        let ix = decoded("Transfer");
        assert_eq!(ix.field("amount"), Some(&Value::Unsigned(7)));
        assert_eq!(ix.field("missing"), None);
    }

    #[test]
    fn account_lookup_by_role() {
        let ix = decoded("Transfer");
        assert!(ix.account("authority").is_some());
        assert!(ix.account("payer").is_none());
    }

    #[test]
    fn primary_signature_is_first() {
        let tx = TransactionRecord {
            signatures: vec!["a".to_string(), "b".to_string()],
            account_keys: vec![],
            instructions: vec![],
            meta: TransactionMeta::default(),
            block_time: None,
        };
        assert_eq!(tx.primary_signature(), Some("a"));

        let unsigned = TransactionRecord {
            signatures: vec![],
            account_keys: vec![],
            instructions: vec![],
            meta: TransactionMeta::default(),
            block_time: None,
        };
        assert_eq!(unsigned.primary_signature(), None);
    }
}
