//! Display rendering for decoded instructions and diagnostics.
//!
//! Everything here is total: unknown or partial data renders with an
//! explicit placeholder instead of failing.

use crate::schema::Value;
use crate::types::{DecodedInstruction, Diagnostic};

/// Longest byte-string prefix shown before truncating to `…`.
const BYTES_PREVIEW: usize = 8;

/// Flat, stringly-typed rendering of one decoded instruction for tabular
/// display. Field and account order match the schema declaration.
#[derive(Debug, Clone, serde::Serialize)]
pub struct DisplayRecord {
    pub name: String,
    pub signature: String,
    /// Rendered block time, `"?"` when the ledger recorded none.
    pub block_time: String,
    /// `"ok"` for successful transactions, `"failed"` otherwise.
    pub status: String,
    pub fields: Vec<(String, String)>,
    pub accounts: Vec<(String, String)>,
}

/// Render a decoded instruction for display.
///
/// Named roles come first, in schema order; accounts beyond the declared
/// roles follow under `extra[i]` keys rather than being dropped.
pub fn format_decoded(ix: &DecodedInstruction) -> DisplayRecord {
    let mut accounts: Vec<(String, String)> = ix
        .account_roles
        .iter()
        .map(|(role, pubkey)| (role.clone(), pubkey.to_string()))
        .collect();
    for (i, extra) in ix.extra_accounts.iter().enumerate() {
        accounts.push((format!("extra[{i}]"), extra.to_string()));
    }

    DisplayRecord {
        name: ix.name.clone(),
        signature: ix.signature.clone(),
        block_time: ix
            .block_time
            .map_or_else(|| "?".to_string(), |t| t.to_string()),
        status: if ix.tx_err.is_some() {
            "failed".to_string()
        } else {
            "ok".to_string()
        },
        fields: ix
            .fields
            .iter()
            .map(|(name, value)| (name.clone(), format_value(value)))
            .collect(),
        accounts,
    }
}

/// Type-appropriate rendering of a decoded value.
pub fn format_value(value: &Value) -> String {
    match value {
        Value::Unsigned(v) => v.to_string(),
        Value::Signed(v) => v.to_string(),
        Value::Address(pk) => pk.to_string(),
        Value::Bytes(bytes) => format_bytes(bytes),
        Value::Struct(fields) => {
            let inner: Vec<String> = fields
                .iter()
                .map(|(name, value)| format!("{name}: {}", format_value(value)))
                .collect();
            format!("{{ {} }}", inner.join(", "))
        }
        Value::Array(values) => {
            let inner: Vec<String> = values.iter().map(format_value).collect();
            format!("[{}]", inner.join(", "))
        }
        Value::Optional(None) => "none".to_string(),
        Value::Optional(Some(value)) => format_value(value),
    }
}

fn format_bytes(bytes: &[u8]) -> String {
    let preview: String = bytes
        .iter()
        .take(BYTES_PREVIEW)
        .map(|b| format!("{b:02x}"))
        .collect();
    if bytes.len() > BYTES_PREVIEW {
        format!("{} bytes (0x{preview}…)", bytes.len())
    } else if bytes.is_empty() {
        "0 bytes".to_string()
    } else {
        format!("{} bytes (0x{preview})", bytes.len())
    }
}

fn shorten_signature(signature: &str) -> String {
    if signature.len() > 12 {
        format!("{}…{}", &signature[..5], &signature[signature.len() - 4..])
    } else {
        signature.to_string()
    }
}

/// One-line rendering of a record-level failure for error surfacing.
pub fn format_diagnostic(diagnostic: &Diagnostic) -> String {
    match diagnostic {
        Diagnostic::MissingTransaction { signature } => {
            format!("{}: transaction record unavailable", shorten_signature(signature))
        }
        Diagnostic::ChunkUnavailable { signatures, reason } => {
            format!("{} signatures unresolved: {reason}", signatures.len())
        }
        Diagnostic::UnrecognizedInstruction {
            signature,
            discriminator,
        } => {
            let hex: String = discriminator.iter().map(|b| format!("{b:02x}")).collect();
            format!(
                "{}: unrecognized instruction 0x{hex}",
                shorten_signature(signature)
            )
        }
        Diagnostic::MalformedInstruction {
            signature,
            offset,
            reason,
        } => format!(
            "{}: malformed at offset {offset}: {reason}",
            shorten_signature(signature)
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_pubkey::Pubkey;

    fn decoded_fixture() -> DecodedInstruction {
        DecodedInstruction {
            name: "Transfer".to_string(),
            fields: vec![
                ("amount".to_string(), Value::Unsigned(1500)),
                ("delta".to_string(), Value::Signed(-3)),
                ("memo".to_string(), Value::Bytes(vec![0xAB; 20])),
                (
                    "limits".to_string(),
                    Value::Struct(vec![
                        ("min".to_string(), Value::Unsigned(1)),
                        (
                            "max".to_string(),
                            Value::Optional(Some(Box::new(Value::Unsigned(9)))),
                        ),
                    ]),
                ),
                ("flags".to_string(), Value::Optional(None)),
            ],
            account_roles: vec![("source".to_string(), Pubkey::new_unique())],
            extra_accounts: vec![Pubkey::new_unique(), Pubkey::new_unique()],
            signature: "5VERYLONGSIGNATURExxxxxxxxxxxxxxxxxx".to_string(),
            block_time: None,
            tx_err: None,
        }
    }

    #[test]
    fn renders_fields_in_declared_order_with_placeholders() {
        let record = format_decoded(&decoded_fixture());
        assert_eq!(record.block_time, "?");
        assert_eq!(record.status, "ok");

        let names: Vec<_> = record.fields.iter().map(|(n, _)| n.clone()).collect();
        assert_eq!(names, vec!["amount", "delta", "memo", "limits", "flags"]);
        assert_eq!(record.fields[0].1, "1500");
        assert_eq!(record.fields[1].1, "-3");
        assert_eq!(record.fields[2].1, "20 bytes (0xabababababababab…)");
        assert_eq!(record.fields[3].1, "{ min: 1, max: 9 }");
        assert_eq!(record.fields[4].1, "none");
    }

    #[test]
    fn extra_accounts_keep_generic_keys() {
        let record = format_decoded(&decoded_fixture());
        assert_eq!(record.accounts.len(), 3);
        assert_eq!(record.accounts[0].0, "source");
        assert_eq!(record.accounts[1].0, "extra[0]");
        assert_eq!(record.accounts[2].0, "extra[1]");
    }

    #[test]
    fn failed_transactions_render_failed_status() {
        let mut ix = decoded_fixture();
        ix.tx_err = Some(serde_json::json!("AccountInUse"));
        ix.block_time = Some(1_700_000_000);
        let record = format_decoded(&ix);
        assert_eq!(record.status, "failed");
        assert_eq!(record.block_time, "1700000000");
    }

    #[test]
    fn short_and_empty_byte_strings_render_whole() {
        assert_eq!(format_value(&Value::Bytes(vec![])), "0 bytes");
        assert_eq!(format_value(&Value::Bytes(vec![0x01, 0xFF])), "2 bytes (0x01ff)");
    }

    #[test]
    fn array_values_render_recursively() {
        let value = Value::Array(vec![Value::Unsigned(1), Value::Unsigned(2)]);
        assert_eq!(format_value(&value), "[1, 2]");
    }

    #[test]
    fn diagnostics_render_one_line_each() {
        let missing = Diagnostic::MissingTransaction {
            signature: "5VERYLONGSIGNATURExxxxxxxxxxxxxxxxxx".to_string(),
        };
        assert_eq!(
            format_diagnostic(&missing),
            "5VERY…xxxx: transaction record unavailable"
        );

        let chunk = Diagnostic::ChunkUnavailable {
            signatures: vec!["a".to_string(); 100],
            reason: "provider down".to_string(),
        };
        assert_eq!(format_diagnostic(&chunk), "100 signatures unresolved: provider down");

        let unrecognized = Diagnostic::UnrecognizedInstruction {
            signature: "short".to_string(),
            discriminator: vec![0xDE, 0xAD],
        };
        assert_eq!(
            format_diagnostic(&unrecognized),
            "short: unrecognized instruction 0xdead"
        );

        let malformed = Diagnostic::MalformedInstruction {
            signature: "short".to_string(),
            offset: 12,
            reason: "truncated".to_string(),
        };
        assert_eq!(
            format_diagnostic(&malformed),
            "short: malformed at offset 12: truncated"
        );
    }
}
