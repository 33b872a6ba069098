use super::*;

pub fn get_pruning_test_definition() -> ForkChoiceTestDefinition {
    let find_head = |justified: Checkpoint, expected_head: u64| Operation::FindHead {
        justified_checkpoint: justified,
        finalized_checkpoint: justified,
        justified_state_balances: vec![1],
        expected_head: get_root(expected_head),
    };

    let block = |slot: u64, root: u64, parent: u64| Operation::ProcessBlock {
        slot: Slot::new(slot),
        root: get_root(root),
        parent_root: get_root(parent),
        justified_epoch: Epoch::new(0),
        finalized_epoch: Epoch::new(0),
    };

    let finalized_at_2 = Checkpoint {
        epoch: Epoch::new(0),
        root: get_root(2),
    };

    let operations = vec![
        // Build the following tree.
        //
        //          0
        //         / \
        //        1   4
        //       / \
        //      2   5
        //      |
        //      3 <- +vote
        block(1, 1, 0),
        block(2, 2, 1),
        block(3, 3, 2),
        block(2, 4, 0),
        block(3, 5, 1),
        Operation::ProcessAttestation {
            validator_index: 0,
            block_root: get_root(3),
            target_epoch: Epoch::new(1),
        },
        find_head(get_checkpoint(0), 3),
        // Block 2 is at index 2, below the threshold.
        Operation::Prune {
            finalized_root: get_root(2),
            prune_threshold: 10,
            expected_len: 6,
        },
        // Blocks 0 and 1 are below the finalized block. Blocks 4 and 5 lose their parents but
        // are kept.
        //
        //      2   4   5
        //      |
        //      3
        Operation::Prune {
            finalized_root: get_root(2),
            prune_threshold: 1,
            expected_len: 4,
        },
        find_head(finalized_at_2, 3),
        Operation::AssertWeight {
            block_root: get_root(2),
            weight: 1,
        },
        // Pruned blocks can no longer be built upon.
        Operation::ProcessBlockUnknownParent {
            slot: Slot::new(4),
            root: get_root(6),
            parent_root: get_root(1),
        },
        // Add block 6.
        //
        //      2   4   5
        //      |
        //      3
        //      |
        //      6
        block(4, 6, 3),
        find_head(finalized_at_2, 6),
        // Pruning at the current anchor changes nothing.
        Operation::Prune {
            finalized_root: get_root(2),
            prune_threshold: 0,
            expected_len: 5,
        },
        find_head(finalized_at_2, 6),
    ];

    ForkChoiceTestDefinition {
        finalized_block_slot: Slot::new(0),
        justified_checkpoint: get_checkpoint(0),
        finalized_checkpoint: get_checkpoint(0),
        operations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test() {
        let test = get_pruning_test_definition();
        test.run();
    }
}
