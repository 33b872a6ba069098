use super::*;

pub fn get_no_votes_test_definition() -> ForkChoiceTestDefinition {
    let balances = vec![0; 16];

    let find_head = |justified_checkpoint: Checkpoint, expected_head: Hash256| {
        Operation::FindHead {
            justified_checkpoint,
            finalized_checkpoint: get_checkpoint(0),
            justified_state_balances: balances.clone(),
            expected_head,
        }
    };

    let block = |slot: u64, root: u64, parent: u64, justified_epoch: u64| Operation::ProcessBlock {
        slot: Slot::new(slot),
        root: get_root(root),
        parent_root: get_root(parent),
        justified_epoch: Epoch::new(justified_epoch),
        finalized_epoch: Epoch::new(0),
    };

    let operations = vec![
        // Check that the head is the finalized block.
        find_head(get_checkpoint(0), get_root(0)),
        // Add block 2
        //
        //         0
        //        /
        //        2
        block(1, 2, 0, 0),
        find_head(get_checkpoint(0), get_root(2)),
        // Add block 1
        //
        //         0
        //        / \
        //        2  1
        block(1, 1, 0, 0),
        // Ensure the head is still 2, since it has the greater root.
        find_head(get_checkpoint(0), get_root(2)),
        // Add block 3
        //
        //         0
        //        / \
        //        2  1
        //           |
        //           3
        block(2, 3, 1, 0),
        // A longer chain does not win by itself.
        find_head(get_checkpoint(0), get_root(2)),
        // Add block 4
        //
        //         0
        //        / \
        //        2  1
        //        |  |
        //        4  3
        block(2, 4, 2, 0),
        find_head(get_checkpoint(0), get_root(4)),
        // Add blocks 5 and 6, both justified at epoch 1.
        //
        //         0
        //        / \
        //        2  1
        //        |  |
        //        4  3
        //        |
        //        5 <- justified epoch = 1
        //        |
        //        6 <- justified epoch = 1
        block(8, 5, 4, 1),
        block(9, 6, 5, 1),
        // The justified epoch of the store is still the anchor epoch, so every block is viable.
        find_head(get_checkpoint(0), get_root(6)),
        // Add block 7, which is justified at epoch 0.
        //
        //         0
        //        / \
        //        2  1
        //        |  |
        //        4  3
        //       / \
        //      5   7 <- justified epoch = 0
        //      |
        //      6
        block(9, 7, 4, 0),
        // Block 7 has the greater root.
        find_head(get_checkpoint(0), get_root(7)),
        // Once the store is justified at epoch 1, block 7 is filtered out.
        find_head(
            Checkpoint {
                epoch: Epoch::new(1),
                root: get_root(0),
            },
            get_root(6),
        ),
        // Block 7 becomes viable again.
        find_head(get_checkpoint(0), get_root(7)),
        // A block with an unknown parent is rejected.
        Operation::ProcessBlockUnknownParent {
            slot: Slot::new(10),
            root: get_root(9),
            parent_root: get_root(8),
        },
        find_head(get_checkpoint(0), get_root(7)),
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
        let test = get_no_votes_test_definition();
        test.run();
    }
}
