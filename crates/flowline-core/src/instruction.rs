//! Compiled instructions, the nested-instruction builder, and the
//! instruction decoder/pipe contracts.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::filter::Filters;
use crate::identifiers::Pubkey;
use crate::transaction::TransactionMetadata;
use crate::update::Carrier;

/// Maximum instruction nesting depth the builder will reconstruct.
pub const MAX_DEPTH: usize = 5;

/// A single compiled instruction as it appears on the wire: an index into
/// the transaction's account-key table identifying the program, the indices
/// of the accounts it touches, and opaque data. Indices are resolved against
/// [`crate::transaction::TransactionRecord::account_keys`] (or, once
/// attached to a node, [`TransactionMetadata::account_keys`]) via
/// [`CompiledInstruction::resolve_program_id`]/[`resolve_accounts`](CompiledInstruction::resolve_accounts).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompiledInstruction {
    pub program_id_index: u8,
    pub accounts: Vec<u8>,
    pub data: Vec<u8>,
}

impl CompiledInstruction {
    /// Resolves `program_id_index` against `account_keys`. `None` if the
    /// index is out of range for the table it's paired with.
    pub fn resolve_program_id(&self, account_keys: &[Pubkey]) -> Option<Pubkey> {
        account_keys.get(self.program_id_index as usize).copied()
    }

    /// Resolves every account index against `account_keys`, in order.
    /// Indices out of range for the table are dropped.
    pub fn resolve_accounts(&self, account_keys: &[Pubkey]) -> Vec<Pubkey> {
        self.accounts.iter().filter_map(|&index| account_keys.get(index as usize).copied()).collect()
    }
}

/// Where an instruction sits relative to its transaction: stack depth,
/// position among its siblings, and the absolute path used to correlate it
/// with log output (see [`crate::log_extractor`]).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstructionMetadata {
    pub transaction: TransactionMetadata,
    pub stack_height: usize,
    pub index_in_level: usize,
    pub absolute_path: Vec<usize>,
}

/// An instruction-with-metadata prior to nesting, i.e. one row of the flat
/// pre-order list fed to [`nest_instructions`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InstructionWithMetadata {
    pub metadata: InstructionMetadata,
    pub instruction: CompiledInstruction,
}

/// A node in the reconstructed instruction forest. Immutable once built.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NestedInstruction {
    pub metadata: InstructionMetadata,
    pub instruction: CompiledInstruction,
    pub children: Vec<NestedInstruction>,
}

/// Reconstructs the instruction forest from a flat pre-order list using the
/// `parent[1..MAX_DEPTH]` pointer algorithm: each entry attaches to the most
/// recently seen entry one depth shallower, and every pointer at or below
/// the current depth is invalidated once a new attachment happens.
pub fn nest_instructions(flat: Vec<InstructionWithMetadata>) -> Vec<NestedInstruction> {
    let mut roots: Vec<NestedInstruction> = Vec::new();
    // parent[d] holds the path (indices from `roots`, drilling into
    // `.children`) of the most recent node at depth d+1 (1-indexed depths,
    // 0-indexed storage).
    let mut parent_path: [Option<Vec<usize>>; MAX_DEPTH + 1] = Default::default();

    for entry in flat {
        let d = entry.metadata.stack_height;
        if d == 0 || d > MAX_DEPTH {
            continue;
        }

        let node = NestedInstruction {
            metadata: entry.metadata,
            instruction: entry.instruction,
            children: Vec::new(),
        };

        let new_path = if d == 1 {
            roots.push(node);
            vec![roots.len() - 1]
        } else if let Some(parent) = &parent_path[d - 1] {
            let Some(parent_node) = node_at_path_mut(&mut roots, parent) else {
                continue;
            };
            parent_node.children.push(node);
            let mut path = parent.clone();
            path.push(parent_node.children.len() - 1);
            path
        } else {
            continue;
        };

        parent_path[d] = Some(new_path);
        for slot in parent_path.iter_mut().skip(d + 1) {
            *slot = None;
        }
    }

    roots
}

fn node_at_path_mut<'a>(
    roots: &'a mut [NestedInstruction],
    path: &[usize],
) -> Option<&'a mut NestedInstruction> {
    let mut iter = path.iter();
    let mut node = roots.get_mut(*iter.next()?)?;
    for &idx in iter {
        node = node.children.get_mut(idx)?;
    }
    Some(node)
}

/// Decodes a single [`CompiledInstruction`] into a typed payload `T`.
pub trait InstructionDecoder: Send + Sync + 'static {
    type Output: Send + Sync + 'static;

    fn decode_instruction(&self, instruction: &CompiledInstruction) -> Option<Self::Output>;
}

/// A decoded instruction, still attached to its position in the tree.
#[derive(Clone, Debug)]
pub struct DecodedInstruction<T> {
    pub metadata: InstructionMetadata,
    pub data: T,
    pub raw: CompiledInstruction,
}

#[async_trait]
pub trait InstructionProcessor: Send + Sync + 'static {
    type Input: Send + Sync + 'static;

    async fn process(&self, instruction: DecodedInstruction<Self::Input>) -> crate::error::PipelineResult<()>;
}

pub struct InstructionPipe<D, P> {
    pub filters: Filters,
    pub decoder: D,
    pub processor: P,
}

impl<D, P> InstructionPipe<D, P> {
    /// Builds a pipe that accepts every update (no filters).
    pub fn new(decoder: D, processor: P) -> Self {
        Self::with_filters(Filters::default(), decoder, processor)
    }

    pub fn with_filters(filters: Filters, decoder: D, processor: P) -> Self {
        Self { filters, decoder, processor }
    }
}

#[async_trait]
pub trait InstructionPipes: Send + Sync {
    async fn run(&self, carrier: &Carrier, node: &NestedInstruction) -> crate::error::PipelineResult<()>;
}

#[async_trait]
impl<D, P> InstructionPipes for InstructionPipe<D, P>
where
    D: InstructionDecoder<Output = P::Input>,
    P: InstructionProcessor,
{
    async fn run(&self, carrier: &Carrier, node: &NestedInstruction) -> crate::error::PipelineResult<()> {
        if !self.filters.accept_all(carrier).await {
            return Ok(());
        }
        let Some(decoded) = self.decoder.decode_instruction(&node.instruction) else {
            return Ok(());
        };
        self.processor
            .process(DecodedInstruction {
                metadata: node.metadata.clone(),
                data: decoded,
                raw: node.instruction.clone(),
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(stack_height: usize, index_in_level: usize, path: Vec<usize>) -> InstructionMetadata {
        InstructionMetadata {
            transaction: TransactionMetadata::default(),
            stack_height,
            index_in_level,
            absolute_path: path,
        }
    }

    fn ix(program_id_index: u8) -> CompiledInstruction {
        CompiledInstruction { program_id_index, accounts: vec![], data: vec![] }
    }

    fn row(depth: usize, index: usize, path: Vec<usize>, program: u8) -> InstructionWithMetadata {
        InstructionWithMetadata { metadata: meta(depth, index, path), instruction: ix(program) }
    }

    #[test]
    fn stack_heights_1_1_2_2_1_yield_three_roots() {
        let flat = vec![
            row(1, 1, vec![0], 1),
            row(1, 2, vec![1], 2),
            row(2, 1, vec![1, 0], 3),
            row(2, 2, vec![1, 1], 4),
            row(1, 3, vec![2], 5),
        ];
        let forest = nest_instructions(flat);
        assert_eq!(forest.len(), 3);
        assert_eq!(forest[0].children.len(), 0);
        assert_eq!(forest[1].children.len(), 2);
        assert_eq!(forest[2].children.len(), 0);
        assert_eq!(forest[1].children[0].instruction.program_id_index, 3);
        assert_eq!(forest[1].children[1].instruction.program_id_index, 4);
    }

    #[test]
    fn orphaned_deep_entry_is_discarded() {
        // depth 3 with no depth-2 parent ever recorded.
        let flat = vec![row(1, 1, vec![0], 1), row(3, 1, vec![0, 0, 0], 2)];
        let forest = nest_instructions(flat);
        assert_eq!(forest.len(), 1);
        assert_eq!(forest[0].children.len(), 0);
    }

    #[test]
    fn out_of_range_depth_is_discarded() {
        let flat = vec![row(0, 1, vec![], 1), row(MAX_DEPTH + 1, 1, vec![], 2)];
        assert!(nest_instructions(flat).is_empty());
    }

    #[test]
    fn sibling_subtrees_do_not_leak_parent_pointers() {
        // Two depth-1 roots each with one depth-2 child; the second root's
        // child must not accidentally attach under the first root.
        let flat = vec![
            row(1, 1, vec![0], 1),
            row(2, 1, vec![0, 0], 2),
            row(1, 2, vec![1], 3),
            row(2, 1, vec![1, 0], 4),
        ];
        let forest = nest_instructions(flat);
        assert_eq!(forest.len(), 2);
        assert_eq!(forest[0].children.len(), 1);
        assert_eq!(forest[1].children.len(), 1);
        assert_eq!(forest[1].children[0].instruction.program_id_index, 4);
    }

    #[test]
    fn resolves_program_id_and_accounts_against_the_account_key_table() {
        let account_keys = vec![Pubkey::new([1u8; 32]), Pubkey::new([2u8; 32]), Pubkey::new([3u8; 32])];
        let instruction = CompiledInstruction { program_id_index: 1, accounts: vec![0, 2, 9], data: vec![] };

        assert_eq!(instruction.resolve_program_id(&account_keys), Some(Pubkey::new([2u8; 32])));
        assert_eq!(instruction.resolve_accounts(&account_keys), vec![Pubkey::new([1u8; 32]), Pubkey::new([3u8; 32])]);
    }
}
