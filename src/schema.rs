use std::collections::HashMap;

use solana_pubkey::Pubkey;

use crate::error::Error;

/// Byte width of a fixed-width integer or length prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum IntWidth {
    One,
    Two,
    Four,
    Eight,
}

impl IntWidth {
    pub fn bytes(self) -> usize {
        match self {
            Self::One => 1,
            Self::Two => 2,
            Self::Four => 4,
            Self::Eight => 8,
        }
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    serde::Serialize,
    strum_macros::Display,
    strum_macros::EnumString,
)]
#[strum(serialize_all = "lowercase")]
pub enum Endianness {
    Le,
    Be,
}

/// The shape of one schema field. Exhaustive: the decoder matches every
/// variant, so adding one here forces the decode and encode paths to follow.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub enum FieldKind {
    /// Fixed-width integer with declared width, signedness, and endianness.
    Integer {
        width: IntWidth,
        signed: bool,
        endianness: Endianness,
    },
    /// 32 raw bytes, read verbatim.
    Address,
    /// Little-endian unsigned length prefix of `len_width` bytes, then that
    /// many raw bytes.
    Bytes { len_width: IntWidth },
    /// Nested field list, decoded recursively.
    Struct { fields: Vec<Field> },
    /// Exactly `len` elements of `element`, back to back, no prefix.
    FixedArray { len: usize, element: Box<FieldKind> },
    /// 1-byte presence flag (0 or 1), then the wrapped kind when present.
    Optional { inner: Box<FieldKind> },
}

impl FieldKind {
    /// Shorthand for the ubiquitous unsigned little-endian 64-bit field.
    pub fn u64_le() -> Self {
        Self::Integer {
            width: IntWidth::Eight,
            signed: false,
            endianness: Endianness::Le,
        }
    }

    /// Shorthand for a signed little-endian 64-bit field.
    pub fn i64_le() -> Self {
        Self::Integer {
            width: IntWidth::Eight,
            signed: true,
            endianness: Endianness::Le,
        }
    }

    /// Shorthand for a `u32`-length-prefixed byte string.
    pub fn bytes_u32() -> Self {
        Self::Bytes {
            len_width: IntWidth::Four,
        }
    }
}

/// A named schema field.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Field {
    pub name: String,
    pub kind: FieldKind,
}

impl Field {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// One instruction shape: a name, its ordered payload fields, and the role
/// names of its positional accounts.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct InstructionVariant {
    pub name: String,
    pub fields: Vec<Field>,
    pub account_roles: Vec<String>,
}

/// Discriminator-indexed table of instruction variants for one program.
///
/// Built from the program's published interface definition and treated as
/// read-only by the pipeline. The discriminator width is schema-global;
/// every key must match it.
#[derive(Debug, Clone)]
pub struct InstructionSchema {
    discriminator_len: usize,
    variants: HashMap<Vec<u8>, InstructionVariant>,
}

impl InstructionSchema {
    /// Create an empty schema with the given discriminator width.
    pub fn new(discriminator_len: usize) -> Result<Self, Error> {
        if discriminator_len == 0 {
            return Err(Error::Config {
                reason: "discriminator width must be at least 1 byte".to_string(),
            });
        }
        Ok(Self {
            discriminator_len,
            variants: HashMap::new(),
        })
    }

    pub fn discriminator_len(&self) -> usize {
        self.discriminator_len
    }

    /// Register a variant under its discriminator. Rejects keys whose length
    /// does not match the schema-global width, and duplicate keys.
    pub fn insert(
        &mut self,
        discriminator: impl Into<Vec<u8>>,
        variant: InstructionVariant,
    ) -> Result<(), Error> {
        let discriminator = discriminator.into();
        if discriminator.len() != self.discriminator_len {
            return Err(Error::Config {
                reason: format!(
                    "discriminator for `{}` is {} bytes, schema expects {}",
                    variant.name,
                    discriminator.len(),
                    self.discriminator_len
                ),
            });
        }
        if self.variants.contains_key(&discriminator) {
            return Err(Error::Config {
                reason: format!("duplicate discriminator for `{}`", variant.name),
            });
        }
        self.variants.insert(discriminator, variant);
        Ok(())
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with_variant(
        mut self,
        discriminator: impl Into<Vec<u8>>,
        variant: InstructionVariant,
    ) -> Result<Self, Error> {
        self.insert(discriminator, variant)?;
        Ok(self)
    }

    pub fn lookup(&self, discriminator: &[u8]) -> Option<&InstructionVariant> {
        self.variants.get(discriminator)
    }

    pub fn len(&self) -> usize {
        self.variants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }
}

/// A decoded field value. Mirrors [`FieldKind`], shape for shape.
///
/// Integers are carried in the widest lane of their signedness; the original
/// declared width lives in the schema, not the value.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub enum Value {
    Unsigned(u64),
    Signed(i64),
    Address(Pubkey),
    Bytes(Vec<u8>),
    Struct(Vec<(String, Value)>),
    Array(Vec<Value>),
    Optional(Option<Box<Value>>),
}

impl Value {
    pub fn as_unsigned(&self) -> Option<u64> {
        match self {
            Self::Unsigned(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_signed(&self) -> Option<i64> {
        match self {
            Self::Signed(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_address(&self) -> Option<&Pubkey> {
        match self {
            Self::Address(pk) => Some(pk),
            _ => None,
        }
    }
}
