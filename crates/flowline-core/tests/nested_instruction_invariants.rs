//! Property-based invariants for the nested-instruction builder.

use proptest::prelude::*;

use flowline_core::instruction::{nest_instructions, CompiledInstruction, InstructionMetadata, InstructionWithMetadata, MAX_DEPTH};
use flowline_core::transaction::TransactionMetadata;

/// Generates a flat pre-order list with a valid stack-height sequence: each
/// depth is either 1 or at most one deeper than the previous entry's depth
/// (matching "attaches to the most recently seen entry with depth d-1").
fn valid_stack_height_sequence(len: usize) -> impl Strategy<Value = Vec<usize>> {
    (0..len).fold(Just(Vec::<usize>::new()).boxed(), |acc, _| {
        acc.prop_flat_map(|mut seq: Vec<usize>| {
            let previous = *seq.last().unwrap_or(&0);
            let max_next = (previous + 1).min(MAX_DEPTH);
            (1..=max_next.max(1)).prop_map(move |next| {
                let mut seq = seq.clone();
                seq.push(next);
                seq
            })
        })
        .boxed()
    })
}

fn row(depth: usize, tag: u8) -> InstructionWithMetadata {
    InstructionWithMetadata {
        metadata: InstructionMetadata {
            transaction: TransactionMetadata::default(),
            stack_height: depth,
            index_in_level: 1,
            absolute_path: vec![],
        },
        instruction: CompiledInstruction { program_id_index: tag, accounts: vec![], data: vec![] },
    }
}

fn flatten_pre_order(forest: &[flowline_core::instruction::NestedInstruction]) -> Vec<u8> {
    let mut out = Vec::new();
    fn walk(node: &flowline_core::instruction::NestedInstruction, out: &mut Vec<u8>) {
        out.push(node.instruction.program_id_index);
        for child in &node.children {
            walk(child, out);
        }
    }
    for node in forest {
        walk(node, &mut out);
    }
    out
}

proptest! {
    #[test]
    fn pre_order_flattening_of_a_valid_sequence_equals_the_input(depths in valid_stack_height_sequence(20)) {
        let tags: Vec<u8> = (0..depths.len()).map(|i| i as u8).collect();
        let flat: Vec<InstructionWithMetadata> = depths.iter().zip(&tags).map(|(&d, &t)| row(d, t)).collect();
        let forest = nest_instructions(flat);
        prop_assert_eq!(flatten_pre_order(&forest), tags);
    }

    #[test]
    fn every_child_is_exactly_one_level_deeper_than_its_parent(depths in valid_stack_height_sequence(20)) {
        let tags: Vec<u8> = (0..depths.len()).map(|i| i as u8).collect();
        let flat: Vec<InstructionWithMetadata> = depths.iter().zip(&tags).map(|(&d, &t)| row(d, t)).collect();
        let forest = nest_instructions(flat);

        fn check(node: &flowline_core::instruction::NestedInstruction) -> Result<(), TestCaseError> {
            for child in &node.children {
                prop_assert_eq!(child.metadata.stack_height, node.metadata.stack_height + 1);
                check(child)?;
            }
            Ok(())
        }
        for node in &forest {
            prop_assert_eq!(node.metadata.stack_height, 1);
            check(node)?;
        }
    }
}
