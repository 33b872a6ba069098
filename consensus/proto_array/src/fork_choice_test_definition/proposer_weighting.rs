use super::*;

pub fn get_proposer_weighting_test_definition() -> ForkChoiceTestDefinition {
    let balances = vec![10];

    let find_head = |expected_head: u64| Operation::FindHead {
        justified_checkpoint: get_checkpoint(0),
        finalized_checkpoint: get_checkpoint(0),
        justified_state_balances: balances.clone(),
        expected_head: get_root(expected_head),
    };

    let find_head_removing = |root: u64, weight: u64, expected_head: u64| {
        Operation::ProposerWeightingFindHead {
            justified_checkpoint: get_checkpoint(0),
            finalized_checkpoint: get_checkpoint(0),
            justified_state_balances: balances.clone(),
            removed_proposer_weightings: vec![ProposerWeighting::new(get_root(root), weight)],
            expected_head: get_root(expected_head),
        }
    };

    let block = |slot: u64, root: u64, parent: u64| Operation::ProcessBlock {
        slot: Slot::new(slot),
        root: get_root(root),
        parent_root: get_root(parent),
        justified_epoch: Epoch::new(0),
        finalized_epoch: Epoch::new(0),
    };

    let weight = |root: u64, weight: u64| Operation::AssertWeight {
        block_root: get_root(root),
        weight,
    };

    let operations = vec![
        // Build the following tree, with a single vote for block 1.
        //
        //          0
        //         / \
        //        1   2
        block(1, 1, 0),
        block(1, 2, 0),
        Operation::ProcessAttestation {
            validator_index: 0,
            block_root: get_root(1),
            target_epoch: Epoch::new(1),
        },
        find_head(1),
        // A weighting greater than the vote moves the head to block 2.
        Operation::ApplyProposerWeighting {
            root: get_root(2),
            weight: 15,
        },
        weight(2, 15),
        weight(0, 25),
        find_head(2),
        // Removing the weighting during the next head update restores the vote's head.
        find_head_removing(2, 15, 1),
        weight(2, 0),
        weight(0, 10),
        // Applying and then reversing a weighting leaves every weight untouched.
        Operation::ApplyProposerWeighting {
            root: get_root(1),
            weight: 5,
        },
        weight(1, 15),
        Operation::ReverseProposerWeighting {
            root: get_root(1),
            weight: 5,
        },
        weight(1, 10),
        weight(0, 10),
        // A weighting for an unknown block is ignored.
        Operation::ApplyProposerWeighting {
            root: get_root(42),
            weight: 100,
        },
        weight(0, 10),
        find_head(1),
        // The weighting is carried by every ancestor of the target.
        //
        //          0
        //         / \
        //        1   2
        //            |
        //            3 <- +weighting
        block(2, 3, 2),
        Operation::ApplyProposerWeighting {
            root: get_root(3),
            weight: 20,
        },
        weight(3, 20),
        weight(2, 20),
        weight(1, 10),
        weight(0, 30),
        find_head(3),
        find_head_removing(3, 20, 1),
        weight(0, 10),
    ];

    ForkChoiceTestDefinition {
        finalized_block_slot: Slot::new(0),
        justified_checkpoint: get_checkpoint(0),
        finalized_checkpoint: get_checkpoint(0),
        operations,
    }
}
