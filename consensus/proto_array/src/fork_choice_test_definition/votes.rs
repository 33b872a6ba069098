use super::*;

pub fn get_votes_test_definition() -> ForkChoiceTestDefinition {
    let find_head = |justified_state_balances: Vec<u64>, expected_head: u64| Operation::FindHead {
        justified_checkpoint: get_checkpoint(0),
        finalized_checkpoint: get_checkpoint(0),
        justified_state_balances,
        expected_head: get_root(expected_head),
    };

    let block = |slot: u64, root: u64, parent: u64| Operation::ProcessBlock {
        slot: Slot::new(slot),
        root: get_root(root),
        parent_root: get_root(parent),
        justified_epoch: Epoch::new(0),
        finalized_epoch: Epoch::new(0),
    };

    let attestation = |validator_index: usize, root: u64, target_epoch: u64| {
        Operation::ProcessAttestation {
            validator_index,
            block_root: get_root(root),
            target_epoch: Epoch::new(target_epoch),
        }
    };

    let weight = |root: u64, weight: u64| Operation::AssertWeight {
        block_root: get_root(root),
        weight,
    };

    let operations = vec![
        // Ensure that the head starts at the finalized block.
        find_head(vec![1, 1], 0),
        // Add a block with a hash of 2.
        //
        //          0
        //         /
        //        2
        block(1, 2, 0),
        find_head(vec![1, 1], 2),
        // Add a block with a hash of 1 that comes off the genesis block (this is a fork compared
        // to the previous block).
        //
        //          0
        //         / \
        //        2   1
        block(1, 1, 0),
        // Ensure that the head is still 2, since the roots break the tie.
        find_head(vec![1, 1], 2),
        // Add a vote to block 1
        //
        //          0
        //         / \
        //        2   1 <- +vote
        attestation(0, 1, 2),
        find_head(vec![1, 1], 1),
        // Add a vote to block 2
        //
        //           0
        //          / \
        // +vote-> 2   1
        attestation(1, 2, 2),
        find_head(vec![1, 1], 2),
        // Add block 3.
        //
        //          0
        //         / \
        //        2   1
        //            |
        //            3
        block(2, 3, 1),
        find_head(vec![1, 1], 2),
        // Move validator #0 vote from 1 to 3
        //
        //          0
        //         / \
        //        2   1 <- -vote
        //            |
        //            3 <- +vote
        attestation(0, 3, 3),
        // The subtree weights are still tied.
        find_head(vec![1, 1], 2),
        // Move validator #1 vote from 2 to 1
        //
        //           0
        //          / \
        // -vote-> 2   1 <- +vote
        //             |
        //             3
        attestation(1, 1, 3),
        find_head(vec![1, 1], 3),
        // A vote with an older target epoch is ignored.
        attestation(1, 2, 2),
        find_head(vec![1, 1], 3),
        weight(0, 2),
        weight(1, 2),
        weight(2, 0),
        weight(3, 1),
        // Validator #1 gains balance, which is credited to block 1 and its ancestors.
        find_head(vec![1, 5], 3),
        weight(1, 6),
        weight(3, 1),
        // A new validator appears and votes for block 2.
        attestation(2, 2, 3),
        find_head(vec![1, 5, 10], 2),
        weight(2, 10),
        // The validator drops out of the justified balances.
        find_head(vec![1, 5], 3),
        weight(2, 0),
        // Validator #0 votes for a block that has not been imported yet. The vote stays with
        // block 3 until it has.
        attestation(0, 9, 4),
        find_head(vec![1, 5], 3),
        weight(3, 1),
        // Import block 9.
        //
        //          0
        //         / \
        //        2   1
        //        |   |
        //        9   3
        block(3, 9, 2),
        find_head(vec![1, 5], 3),
        weight(9, 1),
        weight(3, 0),
        weight(1, 5),
        weight(0, 6),
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
        let test = get_votes_test_definition();
        test.run();
    }
}
