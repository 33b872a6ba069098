use super::*;

pub fn get_ffg_case_01_test_definition() -> ForkChoiceTestDefinition {
    let block = |slot: u64, root: u64, parent: u64, justified_epoch: u64, finalized_epoch: u64| {
        Operation::ProcessBlock {
            slot: Slot::new(slot),
            root: get_root(root),
            parent_root: get_root(parent),
            justified_epoch: Epoch::new(justified_epoch),
            finalized_epoch: Epoch::new(finalized_epoch),
        }
    };

    let find_head = |justified: Checkpoint, finalized: Checkpoint, expected_head: u64| {
        Operation::FindHead {
            justified_checkpoint: justified,
            finalized_checkpoint: finalized,
            justified_state_balances: vec![1],
            expected_head: get_root(expected_head),
        }
    };

    // Checkpoints are named by the block they point at, not by their epoch.
    let checkpoint = |epoch: u64, root: u64| Checkpoint {
        epoch: Epoch::new(epoch),
        root: get_root(root),
    };

    // Build the following tree, with one block per epoch.
    //
    //            0 <- just: 0, fin: 0
    //            |
    //            1 <- just: 0, fin: 0
    //            |
    //            2 <- just: 1, fin: 0
    //            |
    //            3 <- just: 2, fin: 1
    let operations = vec![
        block(8, 1, 0, 0, 0),
        block(16, 2, 1, 1, 0),
        block(24, 3, 2, 2, 1),
        // While the store is at the anchor epochs, every block is viable.
        find_head(checkpoint(0, 0), checkpoint(0, 0), 3),
        // Block 3 is justified at a different epoch to the store.
        find_head(checkpoint(1, 1), checkpoint(0, 0), 2),
        find_head(checkpoint(2, 2), checkpoint(1, 1), 3),
        // No descendant of block 1 matches the store, so block 1 itself is the head.
        find_head(checkpoint(1, 1), checkpoint(1, 1), 1),
        find_head(checkpoint(2, 2), checkpoint(1, 1), 3),
    ];

    ForkChoiceTestDefinition {
        finalized_block_slot: Slot::new(0),
        justified_checkpoint: get_checkpoint(0),
        finalized_checkpoint: get_checkpoint(0),
        operations,
    }
}

pub fn get_ffg_case_02_test_definition() -> ForkChoiceTestDefinition {
    let block = |slot: u64, root: u64, parent: u64, justified_epoch: u64| Operation::ProcessBlock {
        slot: Slot::new(slot),
        root: get_root(root),
        parent_root: get_root(parent),
        justified_epoch: Epoch::new(justified_epoch),
        finalized_epoch: Epoch::new(0),
    };

    let find_head = |justified: Checkpoint, expected_head: u64| Operation::FindHead {
        justified_checkpoint: justified,
        finalized_checkpoint: get_checkpoint(0),
        justified_state_balances: vec![10],
        expected_head: get_root(expected_head),
    };

    let justified_at_1 = Checkpoint {
        epoch: Epoch::new(1),
        root: get_root(1),
    };

    // Build the following tree.
    //
    //            0
    //            |
    //            1
    //           / \
    //  just: 1 2   4 <- just: 0, +vote
    //          |
    //          3 <- just: 1
    let operations = vec![
        block(8, 1, 0, 0),
        block(16, 2, 1, 1),
        block(24, 3, 2, 1),
        block(17, 4, 1, 0),
        Operation::ProcessAttestation {
            validator_index: 0,
            block_root: get_root(4),
            target_epoch: Epoch::new(2),
        },
        // The vote wins while every block is viable.
        find_head(get_checkpoint(0), 4),
        Operation::AssertWeight {
            block_root: get_root(1),
            weight: 10,
        },
        // Block 4 is filtered out, despite having all the weight.
        find_head(justified_at_1, 3),
        Operation::AssertWeight {
            block_root: get_root(4),
            weight: 10,
        },
        find_head(get_checkpoint(0), 4),
    ];

    ForkChoiceTestDefinition {
        finalized_block_slot: Slot::new(0),
        justified_checkpoint: get_checkpoint(0),
        finalized_checkpoint: get_checkpoint(0),
        operations,
    }
}
