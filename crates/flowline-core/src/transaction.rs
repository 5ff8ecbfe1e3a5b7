//! Transaction-level data: status metadata, raw updates, and the extraction
//! step that turns a transaction into the flat instruction list consumed by
//! the nested-instruction builder.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::identifiers::{Hash, Pubkey, Signature};
use crate::instruction::{CompiledInstruction, InstructionMetadata, InstructionWithMetadata};

/// A pre/post balance pair for one token account, as reported by the
/// runtime.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenBalance {
    pub account_index: usize,
    pub mint: Pubkey,
    pub owner: Option<Pubkey>,
    pub pre_amount: u64,
    pub post_amount: u64,
}

/// One group of inner instructions invoked by a top-level instruction, as
/// reported at a given position.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct InnerInstructions {
    /// Index of the top-level instruction that produced this group.
    pub index: usize,
    pub instructions: Vec<InnerInstruction>,
}

/// A single inner instruction, carrying the stack height reported by the
/// runtime when available.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct InnerInstruction {
    pub instruction: CompiledInstruction,
    pub stack_height: Option<usize>,
}

/// Execution result and side effects of a transaction, independent of its
/// instructions.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TransactionStatusMeta {
    pub error: Option<String>,
    pub fee: u64,
    pub pre_balances: Vec<u64>,
    pub post_balances: Vec<u64>,
    pub pre_token_balances: Vec<TokenBalance>,
    pub post_token_balances: Vec<TokenBalance>,
    pub inner_instructions: Vec<InnerInstructions>,
    pub log_messages: Vec<String>,
    pub compute_units_consumed: Option<u64>,
}

/// The raw payload handed to the pipeline for the `TRANSACTION` update
/// family, before any extraction has happened.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub signature: Signature,
    pub slot: u64,
    pub is_vote: bool,
    pub account_keys: Vec<Pubkey>,
    pub instructions: Vec<CompiledInstruction>,
    pub status_meta: TransactionStatusMeta,
}

/// Lightweight, cloneable identity for a transaction, carried by every
/// instruction and nested-instruction derived from it. Wraps the heavier
/// status metadata and log messages in an [`Arc`] so extraction doesn't
/// clone them per instruction.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TransactionMetadata {
    pub signature: Signature,
    pub slot: u64,
    pub fee_payer: Pubkey,
    pub account_keys: Arc<Vec<Pubkey>>,
    pub status_meta: Arc<TransactionStatusMeta>,
    pub index_in_block: Option<usize>,
    pub block_time: Option<i64>,
    pub block_hash: Option<Hash>,
}

impl Default for TransactionMetadata {
    fn default() -> Self {
        Self {
            signature: Signature::default(),
            slot: 0,
            fee_payer: Pubkey::default(),
            account_keys: Arc::new(Vec::new()),
            status_meta: Arc::new(TransactionStatusMeta::default()),
            index_in_block: None,
            block_time: None,
            block_hash: None,
        }
    }
}

impl PartialEq for TransactionMetadata {
    fn eq(&self, other: &Self) -> bool {
        self.signature == other.signature
    }
}
impl Eq for TransactionMetadata {}

/// Extracts the transaction's identity metadata, ready to be attached to
/// every instruction derived from it.
pub fn extract_transaction_metadata(record: &TransactionRecord) -> TransactionMetadata {
    TransactionMetadata {
        signature: record.signature,
        slot: record.slot,
        fee_payer: record.account_keys.first().copied().unwrap_or_default(),
        account_keys: Arc::new(record.account_keys.clone()),
        status_meta: Arc::new(record.status_meta.clone()),
        index_in_block: None,
        block_time: None,
        block_hash: None,
    }
}

/// Flattens a transaction's top-level and inner instructions into the
/// pre-order list consumed by [`crate::instruction::nest_instructions`].
///
/// Top-level instructions get stack-height 1, `index_in_level = position +
/// 1`, and `absolute_path = [position]`. Each inner-instruction group's
/// entries get the stack-height reported on the entry (defaulting to 2),
/// `index_in_level = position_in_group + 1`, and `absolute_path =
/// [group_index, position_in_group]`.
pub fn extract_instructions_with_metadata(record: &TransactionRecord) -> Vec<InstructionWithMetadata> {
    let tx_meta = extract_transaction_metadata(record);
    let mut flat = Vec::new();

    for (position, instruction) in record.instructions.iter().enumerate() {
        flat.push(InstructionWithMetadata {
            metadata: InstructionMetadata {
                transaction: tx_meta.clone(),
                stack_height: 1,
                index_in_level: position + 1,
                absolute_path: vec![position],
            },
            instruction: instruction.clone(),
        });
    }

    for group in &record.status_meta.inner_instructions {
        for (position_in_group, inner) in group.instructions.iter().enumerate() {
            flat.push(InstructionWithMetadata {
                metadata: InstructionMetadata {
                    transaction: tx_meta.clone(),
                    stack_height: inner.stack_height.unwrap_or(2),
                    index_in_level: position_in_group + 1,
                    absolute_path: vec![group.index, position_in_group],
                },
                instruction: inner.instruction.clone(),
            });
        }
    }

    flat
}
