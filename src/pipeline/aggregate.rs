use crate::types::{AggregateBucket, DecodeOutcome, DecodedInstruction, Diagnostic};

/// Direction for the chronological ordering of decoded instructions.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    strum_macros::Display,
    strum_macros::EnumString,
    strum_macros::AsRefStr,
)]
#[strum(serialize_all = "lowercase")]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// Sorted instructions, per-variant counts, and the failures that did not
/// make it into either.
#[derive(Debug)]
pub struct ActivitySummary {
    /// Insertion-ordered by first occurrence of each variant name.
    pub counts: Vec<AggregateBucket>,
    /// Stable-sorted by `block_time`; ties and missing times keep their
    /// relative order from the input stream.
    pub ordered: Vec<DecodedInstruction>,
    /// `Unrecognized` and `Malformed` outcomes, never merged into counts.
    pub diagnostics: Vec<Diagnostic>,
}

/// Fold a stream of decode outcomes into the two UI-facing views.
///
/// Only `Decoded` outcomes participate in `counts` and `ordered`; the other
/// outcomes become diagnostics. The sort key is `Option<i64>`, so
/// instructions without a block time group before every timestamped one in
/// ascending order (and after them in descending order).
pub fn aggregate(outcomes: Vec<DecodeOutcome>, order: SortOrder) -> ActivitySummary {
    let mut counts: Vec<AggregateBucket> = Vec::new();
    let mut decoded: Vec<DecodedInstruction> = Vec::new();
    let mut diagnostics: Vec<Diagnostic> = Vec::new();

    for outcome in outcomes {
        match outcome {
            DecodeOutcome::Decoded(ix) => {
                match counts.iter_mut().find(|b| b.name == ix.name) {
                    Some(bucket) => bucket.count += 1,
                    None => counts.push(AggregateBucket {
                        name: ix.name.clone(),
                        count: 1,
                    }),
                }
                decoded.push(ix);
            }
            DecodeOutcome::Unrecognized {
                discriminator,
                context,
            } => diagnostics.push(Diagnostic::UnrecognizedInstruction {
                signature: context.signature,
                discriminator,
            }),
            DecodeOutcome::Malformed {
                offset,
                reason,
                context,
            } => diagnostics.push(Diagnostic::MalformedInstruction {
                signature: context.signature,
                offset,
                reason,
            }),
        }
    }

    match order {
        SortOrder::Ascending => decoded.sort_by_key(|ix| ix.block_time),
        SortOrder::Descending => {
            decoded.sort_by(|a, b| b.block_time.cmp(&a.block_time));
        }
    }

    ActivitySummary {
        counts,
        ordered: decoded,
        diagnostics,
    }
}
