//! Schema-driven decoding of opaque instruction payloads.
//!
//! Every failure mode here is a value: unknown discriminators become
//! [`DecodeOutcome::Unrecognized`], truncated or over-long payloads become
//! [`DecodeOutcome::Malformed`]. Nothing in this module panics or escalates,
//! so one bad payload can never take down the surrounding batch.

use solana_pubkey::Pubkey;

use crate::schema::{Endianness, Field, FieldKind, InstructionSchema, IntWidth, Value};
use crate::types::{DecodeOutcome, DecodedInstruction, ExtractedInstruction};

/// Why a payload failed to decode, with the offset the cursor had reached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedPayload {
    pub offset: usize,
    pub reason: String,
}

/// Why a value tree could not be encoded back to bytes.
#[derive(thiserror::Error, Debug)]
pub enum EncodeError {
    #[error("field `{field}`: value shape does not match descriptor")]
    ShapeMismatch { field: String },

    #[error("field `{field}`: {reason}")]
    Unrepresentable { field: String, reason: String },
}

/// Sequential reader over an instruction payload.
struct ByteCursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn take(&mut self, n: usize, what: &str) -> Result<&'a [u8], MalformedPayload> {
        let end = self.pos.checked_add(n).ok_or_else(|| MalformedPayload {
            offset: self.pos,
            reason: format!("length overflow reading {what}"),
        })?;
        if end > self.buf.len() {
            return Err(MalformedPayload {
                offset: self.pos,
                reason: format!(
                    "truncated: {what} needs {n} bytes, {} remain",
                    self.buf.len() - self.pos
                ),
            });
        }
        let slice = &self.buf[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }
}

/// Decode one extracted instruction against the schema.
///
/// Exactly one [`DecodeOutcome`] comes back for every input; the three
/// variants cover full success, an unknown discriminator, and a payload that
/// matched a variant but did not parse cleanly.
pub fn decode_instruction(
    schema: &InstructionSchema,
    extracted: &ExtractedInstruction,
) -> DecodeOutcome {
    let raw = &extracted.instruction.data;
    let context = extracted.context.clone();

    let mut cursor = ByteCursor::new(raw);
    let discriminator = match cursor.take(schema.discriminator_len(), "discriminator") {
        Ok(bytes) => bytes,
        Err(fail) => {
            return DecodeOutcome::Malformed {
                offset: fail.offset,
                reason: fail.reason,
                context,
            };
        }
    };

    let Some(variant) = schema.lookup(discriminator) else {
        return DecodeOutcome::Unrecognized {
            discriminator: discriminator.to_vec(),
            context,
        };
    };

    let fields = match decode_field_list(&mut cursor, &variant.fields) {
        Ok(fields) => fields,
        Err(fail) => {
            return DecodeOutcome::Malformed {
                offset: fail.offset,
                reason: fail.reason,
                context,
            };
        }
    };

    if cursor.remaining() != 0 {
        return DecodeOutcome::Malformed {
            offset: cursor.pos,
            reason: format!("{} trailing bytes after last field", cursor.remaining()),
            context,
        };
    }

    let accounts = &extracted.instruction.accounts;
    let account_roles = variant
        .account_roles
        .iter()
        .zip(accounts.iter())
        .map(|(role, pubkey)| (role.clone(), *pubkey))
        .collect();
    let extra_accounts = accounts
        .get(variant.account_roles.len()..)
        .unwrap_or_default()
        .to_vec();

    DecodeOutcome::Decoded(DecodedInstruction {
        name: variant.name.clone(),
        fields,
        account_roles,
        extra_accounts,
        signature: context.signature,
        block_time: context.block_time,
        tx_err: context.tx_err,
    })
}

fn decode_field_list(
    cursor: &mut ByteCursor<'_>,
    fields: &[Field],
) -> Result<Vec<(String, Value)>, MalformedPayload> {
    let mut decoded = Vec::with_capacity(fields.len());
    for field in fields {
        let value = decode_kind(cursor, &field.kind, &field.name)?;
        decoded.push((field.name.clone(), value));
    }
    Ok(decoded)
}

fn decode_kind(
    cursor: &mut ByteCursor<'_>,
    kind: &FieldKind,
    name: &str,
) -> Result<Value, MalformedPayload> {
    match kind {
        FieldKind::Integer {
            width,
            signed,
            endianness,
        } => {
            let bytes = cursor.take(width.bytes(), name)?;
            Ok(decode_integer(bytes, *signed, *endianness))
        }
        FieldKind::Address => {
            let bytes = cursor.take(32, name)?;
            let mut key = [0u8; 32];
            key.copy_from_slice(bytes);
            Ok(Value::Address(Pubkey::new_from_array(key)))
        }
        FieldKind::Bytes { len_width } => {
            let prefix = cursor.take(len_width.bytes(), name)?;
            let len = read_le_unsigned(prefix) as usize;
            let bytes = cursor.take(len, name)?;
            Ok(Value::Bytes(bytes.to_vec()))
        }
        FieldKind::Struct { fields } => Ok(Value::Struct(decode_field_list(cursor, fields)?)),
        FieldKind::FixedArray { len, element } => {
            let mut values = Vec::with_capacity(*len);
            for _ in 0..*len {
                values.push(decode_kind(cursor, element, name)?);
            }
            Ok(Value::Array(values))
        }
        FieldKind::Optional { inner } => {
            let flag = cursor.take(1, name)?[0];
            match flag {
                0 => Ok(Value::Optional(None)),
                1 => {
                    let value = decode_kind(cursor, inner, name)?;
                    Ok(Value::Optional(Some(Box::new(value))))
                }
                other => Err(MalformedPayload {
                    offset: cursor.pos - 1,
                    reason: format!("invalid presence flag {other} for `{name}`"),
                }),
            }
        }
    }
}

/// Interpret exactly the declared bytes; no implicit widening beyond the
/// `u64`/`i64` carrier lanes.
fn decode_integer(bytes: &[u8], signed: bool, endianness: Endianness) -> Value {
    let mut unsigned: u64 = 0;
    match endianness {
        Endianness::Le => {
            for &b in bytes.iter().rev() {
                unsigned = (unsigned << 8) | u64::from(b);
            }
        }
        Endianness::Be => {
            for &b in bytes {
                unsigned = (unsigned << 8) | u64::from(b);
            }
        }
    }

    if signed {
        // Sign-extend from the declared width.
        let bits = bytes.len() * 8;
        let value = if bits < 64 {
            let sign_bit = 1u64 << (bits - 1);
            if unsigned & sign_bit != 0 {
                (unsigned | !((1u64 << bits) - 1)) as i64
            } else {
                unsigned as i64
            }
        } else {
            unsigned as i64
        };
        Value::Signed(value)
    } else {
        Value::Unsigned(unsigned)
    }
}

fn read_le_unsigned(bytes: &[u8]) -> u64 {
    let mut value: u64 = 0;
    for &b in bytes.iter().rev() {
        value = (value << 8) | u64::from(b);
    }
    value
}

/// Encode a value list back to payload bytes (without discriminator).
///
/// The exact inverse of field decoding; used to build synthetic payloads and
/// to state the round-trip property in tests.
pub fn encode_fields(fields: &[Field], values: &[(String, Value)]) -> Result<Vec<u8>, EncodeError> {
    if fields.len() != values.len() {
        return Err(EncodeError::ShapeMismatch {
            field: format!("expected {} values, got {}", fields.len(), values.len()),
        });
    }
    let mut out = Vec::new();
    for (field, (name, value)) in fields.iter().zip(values) {
        if &field.name != name {
            return Err(EncodeError::ShapeMismatch {
                field: field.name.clone(),
            });
        }
        encode_kind(&mut out, &field.kind, value, &field.name)?;
    }
    Ok(out)
}

fn encode_kind(
    out: &mut Vec<u8>,
    kind: &FieldKind,
    value: &Value,
    name: &str,
) -> Result<(), EncodeError> {
    match (kind, value) {
        (
            FieldKind::Integer {
                width,
                signed: false,
                endianness,
            },
            Value::Unsigned(v),
        ) => {
            let bits = width.bytes() * 8;
            if bits < 64 && *v >> bits != 0 {
                return Err(EncodeError::Unrepresentable {
                    field: name.to_string(),
                    reason: format!("{v} does not fit in {bits} unsigned bits"),
                });
            }
            encode_integer(out, *v, *width, *endianness);
            Ok(())
        }
        (
            FieldKind::Integer {
                width,
                signed: true,
                endianness,
            },
            Value::Signed(v),
        ) => {
            let bits = width.bytes() * 8;
            if bits < 64 {
                let min = -(1i64 << (bits - 1));
                let max = (1i64 << (bits - 1)) - 1;
                if *v < min || *v > max {
                    return Err(EncodeError::Unrepresentable {
                        field: name.to_string(),
                        reason: format!("{v} does not fit in {bits} signed bits"),
                    });
                }
            }
            // In-range negatives sign-extend through the u64 cast, so
            // truncating to the declared width is exact two's complement.
            encode_integer(out, *v as u64, *width, *endianness);
            Ok(())
        }
        (FieldKind::Address, Value::Address(pk)) => {
            out.extend_from_slice(pk.as_ref());
            Ok(())
        }
        (FieldKind::Bytes { len_width }, Value::Bytes(bytes)) => {
            let bits = len_width.bytes() * 8;
            if bits < 64 && (bytes.len() as u64) >> bits != 0 {
                return Err(EncodeError::Unrepresentable {
                    field: name.to_string(),
                    reason: format!("{} bytes overflow the length prefix", bytes.len()),
                });
            }
            encode_integer(out, bytes.len() as u64, *len_width, Endianness::Le);
            out.extend_from_slice(bytes);
            Ok(())
        }
        (FieldKind::Struct { fields }, Value::Struct(values)) => {
            let encoded = encode_fields(fields, values)?;
            out.extend_from_slice(&encoded);
            Ok(())
        }
        (FieldKind::FixedArray { len, element }, Value::Array(values)) => {
            if values.len() != *len {
                return Err(EncodeError::Unrepresentable {
                    field: name.to_string(),
                    reason: format!("array has {} elements, descriptor wants {len}", values.len()),
                });
            }
            for value in values {
                encode_kind(out, element, value, name)?;
            }
            Ok(())
        }
        (FieldKind::Optional { inner }, Value::Optional(opt)) => match opt {
            None => {
                out.push(0);
                Ok(())
            }
            Some(value) => {
                out.push(1);
                encode_kind(out, inner, value, name)
            }
        },
        _ => Err(EncodeError::ShapeMismatch {
            field: name.to_string(),
        }),
    }
}

/// Write the low `width` bytes of `value`; range checks belong to callers.
fn encode_integer(out: &mut Vec<u8>, value: u64, width: IntWidth, endianness: Endianness) {
    let n = width.bytes();
    let le = value.to_le_bytes();
    match endianness {
        Endianness::Le => out.extend_from_slice(&le[..n]),
        Endianness::Be => out.extend(le[..n].iter().rev()),
    }
}

#[cfg(test)]
#[expect(
    clippy::unwrap_used,
    clippy::panic,
    reason = "test code uses unwrap/panic for concise assertions"
)]
mod tests {
    use super::*;
    use crate::schema::InstructionVariant;
    use crate::types::{InstructionContext, RawInstruction};

    fn context() -> InstructionContext {
        InstructionContext {
            signature: "sig".to_string(),
            block_time: Some(42),
            tx_err: None,
        }
    }

    fn extracted(data: Vec<u8>, accounts: Vec<Pubkey>) -> ExtractedInstruction {
        ExtractedInstruction {
            instruction: RawInstruction {
                program_ref: Pubkey::new_unique(),
                accounts,
                data,
            },
            context: context(),
        }
    }

    fn schema_with(
        discriminator: Vec<u8>,
        fields: Vec<Field>,
        account_roles: Vec<&str>,
    ) -> InstructionSchema {
        InstructionSchema::new(discriminator.len())
            .unwrap()
            .with_variant(
                discriminator,
                InstructionVariant {
                    name: "TestVariant".to_string(),
                    fields,
                    account_roles: account_roles.iter().map(|r| (*r).to_string()).collect(),
                },
            )
            .unwrap()
    }

    #[test]
    fn unknown_discriminator_is_unrecognized_not_an_error() {
        let schema = schema_with(vec![1, 2], vec![], vec![]);
        let outcome = decode_instruction(&schema, &extracted(vec![9, 9], vec![]));
        let DecodeOutcome::Unrecognized { discriminator, .. } = outcome else {
            panic!("expected Unrecognized, got {outcome:?}");
        };
        assert_eq!(discriminator, vec![9, 9]);
    }

    #[test]
    fn short_payload_is_malformed_at_discriminator() {
        let schema = schema_with(vec![1, 2, 3, 4], vec![], vec![]);
        let outcome = decode_instruction(&schema, &extracted(vec![1], vec![]));
        assert!(matches!(outcome, DecodeOutcome::Malformed { offset: 0, .. }));
    }

    #[test]
    fn trailing_bytes_are_malformed() {
        let schema = schema_with(vec![7], vec![Field::new("amount", FieldKind::u64_le())], vec![]);
        let mut data = vec![7];
        data.extend_from_slice(&500u64.to_le_bytes());
        data.push(0xFF);
        let outcome = decode_instruction(&schema, &extracted(data, vec![]));
        let DecodeOutcome::Malformed { offset, reason, .. } = outcome else {
            panic!("expected Malformed");
        };
        assert_eq!(offset, 9);
        assert!(reason.contains("trailing"), "unexpected reason: {reason}");
    }

    #[test]
    fn truncated_length_prefixed_bytes_are_malformed() {
        let schema = schema_with(vec![7], vec![Field::new("memo", FieldKind::bytes_u32())], vec![]);
        // Declares 100 bytes but only carries 2.
        let mut data = vec![7];
        data.extend_from_slice(&100u32.to_le_bytes());
        data.extend_from_slice(&[1, 2]);
        let outcome = decode_instruction(&schema, &extracted(data, vec![]));
        let DecodeOutcome::Malformed { reason, .. } = outcome else {
            panic!("expected Malformed");
        };
        assert!(reason.contains("truncated"), "unexpected reason: {reason}");
    }

    #[test]
    fn invalid_presence_flag_is_malformed() {
        let schema = schema_with(
            vec![7],
            vec![Field::new(
                "maybe",
                FieldKind::Optional {
                    inner: Box::new(FieldKind::u64_le()),
                },
            )],
            vec![],
        );
        let outcome = decode_instruction(&schema, &extracted(vec![7, 2], vec![]));
        let DecodeOutcome::Malformed { reason, .. } = outcome else {
            panic!("expected Malformed");
        };
        assert!(reason.contains("presence flag"), "unexpected reason: {reason}");
    }

    #[test]
    fn signed_integers_sign_extend_from_declared_width() {
        let schema = schema_with(
            vec![7],
            vec![Field::new(
                "delta",
                FieldKind::Integer {
                    width: IntWidth::Two,
                    signed: true,
                    endianness: Endianness::Le,
                },
            )],
            vec![],
        );
        let mut data = vec![7];
        data.extend_from_slice(&(-5i16).to_le_bytes());
        let DecodeOutcome::Decoded(ix) = decode_instruction(&schema, &extracted(data, vec![]))
        else {
            panic!("expected Decoded");
        };
        assert_eq!(ix.field("delta"), Some(&Value::Signed(-5)));
    }

    #[test]
    fn big_endian_integers_decode_per_descriptor() {
        let schema = schema_with(
            vec![7],
            vec![Field::new(
                "count",
                FieldKind::Integer {
                    width: IntWidth::Four,
                    signed: false,
                    endianness: Endianness::Be,
                },
            )],
            vec![],
        );
        let mut data = vec![7];
        data.extend_from_slice(&0x0102_0304u32.to_be_bytes());
        let DecodeOutcome::Decoded(ix) = decode_instruction(&schema, &extracted(data, vec![]))
        else {
            panic!("expected Decoded");
        };
        assert_eq!(ix.field("count"), Some(&Value::Unsigned(0x0102_0304)));
    }

    #[test]
    fn accounts_zip_into_roles_with_extras_preserved() {
        let schema = schema_with(vec![7], vec![], vec!["payer", "mint"]);
        let payer = Pubkey::new_unique();
        let mint = Pubkey::new_unique();
        let extra = Pubkey::new_unique();
        let DecodeOutcome::Decoded(ix) =
            decode_instruction(&schema, &extracted(vec![7], vec![payer, mint, extra]))
        else {
            panic!("expected Decoded");
        };
        assert_eq!(ix.account("payer"), Some(&payer));
        assert_eq!(ix.account("mint"), Some(&mint));
        assert_eq!(ix.extra_accounts, vec![extra]);
    }

    #[test]
    fn fewer_accounts_than_roles_zips_short() {
        let schema = schema_with(vec![7], vec![], vec!["payer", "mint", "authority"]);
        let payer = Pubkey::new_unique();
        let DecodeOutcome::Decoded(ix) =
            decode_instruction(&schema, &extracted(vec![7], vec![payer]))
        else {
            panic!("expected Decoded");
        };
        assert_eq!(ix.account_roles.len(), 1);
        assert!(ix.extra_accounts.is_empty());
    }

    fn roundtrip(fields: Vec<Field>, values: Vec<(String, Value)>) {
        let discriminator = vec![0xAB];
        let schema = InstructionSchema::new(1)
            .unwrap()
            .with_variant(
                discriminator.clone(),
                InstructionVariant {
                    name: "Roundtrip".to_string(),
                    fields: fields.clone(),
                    account_roles: vec![],
                },
            )
            .unwrap();

        let mut data = discriminator;
        data.extend(encode_fields(&fields, &values).unwrap());
        let DecodeOutcome::Decoded(ix) = decode_instruction(&schema, &extracted(data, vec![]))
        else {
            panic!("roundtrip did not decode");
        };
        assert_eq!(ix.fields, values);
    }

    #[test]
    fn roundtrip_integers_all_widths() {
        for (width, max) in [
            (IntWidth::One, 0xFFu64),
            (IntWidth::Two, 0xFFFF),
            (IntWidth::Four, 0xFFFF_FFFF),
            (IntWidth::Eight, u64::MAX),
        ] {
            for endianness in [Endianness::Le, Endianness::Be] {
                roundtrip(
                    vec![Field::new(
                        "v",
                        FieldKind::Integer {
                            width,
                            signed: false,
                            endianness,
                        },
                    )],
                    vec![("v".to_string(), Value::Unsigned(max))],
                );
            }
        }
    }

    #[test]
    fn roundtrip_signed_negative() {
        roundtrip(
            vec![Field::new(
                "v",
                FieldKind::Integer {
                    width: IntWidth::Four,
                    signed: true,
                    endianness: Endianness::Be,
                },
            )],
            vec![("v".to_string(), Value::Signed(-123_456))],
        );
    }

    #[test]
    fn roundtrip_address() {
        let pk = Pubkey::new_unique();
        roundtrip(
            vec![Field::new("who", FieldKind::Address)],
            vec![("who".to_string(), Value::Address(pk))],
        );
    }

    #[test]
    fn roundtrip_bytes_empty_and_nonempty() {
        roundtrip(
            vec![Field::new("memo", FieldKind::bytes_u32())],
            vec![("memo".to_string(), Value::Bytes(vec![]))],
        );
        roundtrip(
            vec![Field::new("memo", FieldKind::bytes_u32())],
            vec![("memo".to_string(), Value::Bytes(vec![9; 300]))],
        );
    }

    #[test]
    fn roundtrip_nested_struct() {
        roundtrip(
            vec![Field::new(
                "pair",
                FieldKind::Struct {
                    fields: vec![
                        Field::new("a", FieldKind::u64_le()),
                        Field::new("b", FieldKind::i64_le()),
                    ],
                },
            )],
            vec![(
                "pair".to_string(),
                Value::Struct(vec![
                    ("a".to_string(), Value::Unsigned(1)),
                    ("b".to_string(), Value::Signed(-2)),
                ]),
            )],
        );
    }

    #[test]
    fn roundtrip_optional_present_and_absent() {
        let kind = FieldKind::Optional {
            inner: Box::new(FieldKind::u64_le()),
        };
        roundtrip(
            vec![Field::new("maybe", kind.clone())],
            vec![("maybe".to_string(), Value::Optional(None))],
        );
        roundtrip(
            vec![Field::new("maybe", kind)],
            vec![(
                "maybe".to_string(),
                Value::Optional(Some(Box::new(Value::Unsigned(5)))),
            )],
        );
    }

    #[test]
    fn roundtrip_fixed_array() {
        roundtrip(
            vec![Field::new(
                "trio",
                FieldKind::FixedArray {
                    len: 3,
                    element: Box::new(FieldKind::Integer {
                        width: IntWidth::Two,
                        signed: false,
                        endianness: Endianness::Le,
                    }),
                },
            )],
            vec![(
                "trio".to_string(),
                Value::Array(vec![
                    Value::Unsigned(1),
                    Value::Unsigned(2),
                    Value::Unsigned(3),
                ]),
            )],
        );
    }

    #[test]
    fn encode_rejects_shape_mismatch() {
        let fields = vec![Field::new("v", FieldKind::u64_le())];
        let values = vec![("v".to_string(), Value::Bytes(vec![1]))];
        assert!(matches!(
            encode_fields(&fields, &values),
            Err(EncodeError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn encode_rejects_out_of_range_signed() {
        let fields = vec![Field::new(
            "v",
            FieldKind::Integer {
                width: IntWidth::One,
                signed: true,
                endianness: Endianness::Le,
            },
        )];
        let values = vec![("v".to_string(), Value::Signed(200))];
        assert!(matches!(
            encode_fields(&fields, &values),
            Err(EncodeError::Unrepresentable { .. })
        ));
    }
}
