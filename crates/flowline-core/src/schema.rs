//! Transaction schema matcher: tree-pattern matching over a transaction's
//! decoded instruction forest.

use std::sync::Arc;

use crate::identifiers::Pubkey;
use crate::instruction::{CompiledInstruction, NestedInstruction};

/// Decodes a closed set of instruction variants for one schema, and reports
/// back the variant's discriminant so the matcher can compare it against a
/// schema node's expected type without needing `T: PartialEq` boilerplate
/// per payload.
///
/// `account_keys` is the owning transaction's account-key table; a
/// `CompiledInstruction` only carries indices into it (§3), so identifying
/// which program an instruction actually invokes means resolving
/// `instruction.program_id_index` (or the account indices) against it.
pub trait InstructionDecoderCollection: Clone + Send + Sync + 'static {
    type InstructionType: Copy + PartialEq + Send + Sync + 'static;

    fn parse_instruction(instruction: &CompiledInstruction, account_keys: &[Pubkey]) -> Option<Self>;

    fn instruction_type(&self) -> Self::InstructionType;
}

/// One node of a [`TransactionSchema`].
pub enum SchemaNode<T: InstructionDecoderCollection> {
    /// Matches a decoded instruction of the given type, optionally gated by
    /// a predicate over the decoded payload, and recurses into `children`.
    Instruction {
        name: &'static str,
        instruction_type: T::InstructionType,
        predicate: Option<Arc<dyn Fn(&T) -> bool + Send + Sync>>,
        children: TransactionSchema<T>,
    },
    /// Wildcard: the next instruction-node may skip zero or more
    /// instructions before matching.
    Any,
}

/// An ordered list of [`SchemaNode`]s matched against a sibling instruction
/// list.
pub struct TransactionSchema<T: InstructionDecoderCollection>(pub Vec<SchemaNode<T>>);

impl<T: InstructionDecoderCollection> TransactionSchema<T> {
    pub fn new(nodes: Vec<SchemaNode<T>>) -> Self {
        Self(nodes)
    }
}

/// A user-supplied override for [`matches`], taking the same arguments.
pub type MatchFn<T> = Arc<dyn Fn(&TransactionSchema<T>, &[NestedInstruction]) -> bool + Send + Sync>;

/// Matches `schema` against the sibling list `instructions`, per the
/// greedy-with-wildcard-backtrack algorithm: an `Any` node enables wildcard
/// mode, in which the next instruction-node's search skips non-matching
/// siblings instead of failing on the first miss. The schema succeeds only
/// when every node has been consumed by a matching advance.
pub fn matches<T: InstructionDecoderCollection>(
    schema: &TransactionSchema<T>,
    instructions: &[NestedInstruction],
) -> bool {
    let mut cursor = 0usize;
    let mut wildcard = false;

    for node in &schema.0 {
        match node {
            SchemaNode::Any => {
                wildcard = true;
            }
            SchemaNode::Instruction { instruction_type, predicate, children, .. } => {
                let found = loop {
                    let Some(candidate) = instructions.get(cursor) else {
                        break None;
                    };
                    cursor += 1;

                    let decoded = T::parse_instruction(&candidate.instruction, &candidate.metadata.transaction.account_keys);
                    let node_matches = decoded.as_ref().is_some_and(|decoded| {
                        decoded.instruction_type() == *instruction_type
                            && predicate.as_ref().map_or(true, |p| p(decoded))
                    });

                    if node_matches {
                        if children.0.is_empty() || matches(children, &candidate.children) {
                            break Some(());
                        } else if wildcard {
                            continue;
                        } else {
                            break None;
                        }
                    } else if wildcard {
                        continue;
                    } else {
                        break None;
                    }
                };

                if found.is_none() {
                    return false;
                }
                wildcard = false;
            }
        }
    }

    true
}
