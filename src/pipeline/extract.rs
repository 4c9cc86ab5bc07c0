use solana_pubkey::Pubkey;

use crate::types::{ExtractedInstruction, InstructionContext, TransactionRecord};

/// Isolate the instructions addressed to `target` from one transaction.
///
/// A transaction is atomic and routinely touches several unrelated programs;
/// only the instructions whose `program_ref` equals `target` are kept, in
/// their intra-transaction order. When `target` is not in `account_keys` the
/// program cannot have been invoked, so the whole record is skipped without
/// walking its instructions.
///
/// A record with no signature at all is malformed input and contributes
/// nothing; the caller accounts for it as a missing transaction.
pub fn extract_instructions(
    target: &Pubkey,
    tx: &TransactionRecord,
) -> Vec<ExtractedInstruction> {
    let Some(signature) = tx.primary_signature() else {
        return Vec::new();
    };
    if !tx.account_keys.contains(target) {
        return Vec::new();
    }

    tx.instructions
        .iter()
        .filter(|ix| ix.program_ref == *target)
        .map(|ix| ExtractedInstruction {
            instruction: ix.clone(),
            context: InstructionContext {
                signature: signature.to_string(),
                block_time: tx.block_time,
                tx_err: tx.meta.err.clone(),
            },
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{RawInstruction, TransactionMeta};

    fn ix(program: Pubkey, byte: u8) -> RawInstruction {
        RawInstruction {
            program_ref: program,
            accounts: vec![],
            data: vec![byte],
        }
    }

    fn record(
        account_keys: Vec<Pubkey>,
        instructions: Vec<RawInstruction>,
    ) -> TransactionRecord {
        TransactionRecord {
            signatures: vec!["primary".to_string(), "cosigner".to_string()],
            account_keys,
            instructions,
            meta: TransactionMeta {
                err: Some(serde_json::json!({"InstructionError": [0, "Custom"]})),
                logs: vec![],
            },
            block_time: Some(99),
        }
    }

    #[test]
    fn keeps_only_target_instructions_in_order() {
        let target = Pubkey::new_unique();
        let other = Pubkey::new_unique();
        let tx = record(
            vec![target, other],
            vec![ix(other, 0), ix(target, 1), ix(other, 2), ix(target, 3)],
        );

        let extracted = extract_instructions(&target, &tx);
        let bytes: Vec<u8> = extracted
            .iter()
            .map(|e| e.instruction.data[0])
            .collect();
        assert_eq!(bytes, vec![1, 3]);
    }

    #[test]
    fn tags_context_from_the_transaction() {
        let target = Pubkey::new_unique();
        let tx = record(vec![target], vec![ix(target, 0)]);

        let extracted = extract_instructions(&target, &tx);
        let ctx = &extracted[0].context;
        assert_eq!(ctx.signature, "primary");
        assert_eq!(ctx.block_time, Some(99));
        assert!(ctx.tx_err.is_some());
    }

    #[test]
    fn short_circuits_when_target_not_referenced() {
        let target = Pubkey::new_unique();
        let other = Pubkey::new_unique();
        // program_ref matches but the key list does not mention the target;
        // membership wins, the record contributes nothing.
        let tx = record(vec![other], vec![ix(target, 0)]);
        assert!(extract_instructions(&target, &tx).is_empty());
    }

    #[test]
    fn unsigned_record_contributes_nothing() {
        let target = Pubkey::new_unique();
        let mut tx = record(vec![target], vec![ix(target, 0)]);
        tx.signatures.clear();
        assert!(extract_instructions(&target, &tx).is_empty());
    }
}
