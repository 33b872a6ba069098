mod ffg_updates;
mod no_votes;
mod proposer_weighting;
mod pruning;
mod votes;

use crate::config::ForkChoiceConfig;
use crate::proto_array::ProposerWeighting;
use crate::proto_array_fork_choice::ProtoArrayForkChoice;
use crate::Error;
use serde_derive::{Deserialize, Serialize};
use slog::{o, Discard, Logger};
use types::{Checkpoint, Epoch, Hash256, Slot};

pub use ffg_updates::*;
pub use no_votes::*;
pub use proposer_weighting::*;
pub use pruning::*;
pub use votes::*;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Operation {
    FindHead {
        justified_checkpoint: Checkpoint,
        finalized_checkpoint: Checkpoint,
        justified_state_balances: Vec<u64>,
        expected_head: Hash256,
    },
    ProposerWeightingFindHead {
        justified_checkpoint: Checkpoint,
        finalized_checkpoint: Checkpoint,
        justified_state_balances: Vec<u64>,
        removed_proposer_weightings: Vec<ProposerWeighting>,
        expected_head: Hash256,
    },
    ProcessBlock {
        slot: Slot,
        root: Hash256,
        parent_root: Hash256,
        justified_epoch: Epoch,
        finalized_epoch: Epoch,
    },
    ProcessBlockUnknownParent {
        slot: Slot,
        root: Hash256,
        parent_root: Hash256,
    },
    ProcessAttestation {
        validator_index: usize,
        block_root: Hash256,
        target_epoch: Epoch,
    },
    ApplyProposerWeighting {
        root: Hash256,
        weight: u64,
    },
    ReverseProposerWeighting {
        root: Hash256,
        weight: u64,
    },
    Prune {
        finalized_root: Hash256,
        prune_threshold: usize,
        expected_len: usize,
    },
    AssertWeight {
        block_root: Hash256,
        weight: u64,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForkChoiceTestDefinition {
    pub finalized_block_slot: Slot,
    pub justified_checkpoint: Checkpoint,
    pub finalized_checkpoint: Checkpoint,
    pub operations: Vec<Operation>,
}

impl ForkChoiceTestDefinition {
    pub fn run(self) {
        let fork_choice = ProtoArrayForkChoice::new(
            ForkChoiceConfig::minimal(),
            self.finalized_block_slot,
            Hash256::zero(),
            self.justified_checkpoint,
            self.finalized_checkpoint,
            Logger::root(Discard, o!()),
        )
        .expect("should create fork choice struct");

        for (op_index, op) in self.operations.into_iter().enumerate() {
            match op.clone() {
                Operation::FindHead {
                    justified_checkpoint,
                    finalized_checkpoint,
                    justified_state_balances,
                    expected_head,
                } => {
                    let head = fork_choice
                        .find_head(
                            justified_checkpoint,
                            finalized_checkpoint,
                            &justified_state_balances,
                            &[],
                        )
                        .unwrap_or_else(|e| {
                            panic!("find_head op at index {} returned error {:?}", op_index, e)
                        });

                    assert_eq!(
                        head, expected_head,
                        "Operation at index {} failed head check. Operation: {:?}",
                        op_index, op
                    );
                }
                Operation::ProposerWeightingFindHead {
                    justified_checkpoint,
                    finalized_checkpoint,
                    justified_state_balances,
                    removed_proposer_weightings,
                    expected_head,
                } => {
                    let head = fork_choice
                        .find_head(
                            justified_checkpoint,
                            finalized_checkpoint,
                            &justified_state_balances,
                            &removed_proposer_weightings,
                        )
                        .unwrap_or_else(|e| {
                            panic!("find_head op at index {} returned error {:?}", op_index, e)
                        });

                    assert_eq!(
                        head, expected_head,
                        "Operation at index {} failed head check. Operation: {:?}",
                        op_index, op
                    );
                }
                Operation::ProcessBlock {
                    slot,
                    root,
                    parent_root,
                    justified_epoch,
                    finalized_epoch,
                } => {
                    fork_choice
                        .process_block(
                            slot,
                            root,
                            parent_root,
                            Hash256::zero(),
                            justified_epoch,
                            finalized_epoch,
                        )
                        .unwrap_or_else(|e| {
                            panic!(
                                "process_block op at index {} returned error: {:?}",
                                op_index, e
                            )
                        });
                }
                Operation::ProcessBlockUnknownParent {
                    slot,
                    root,
                    parent_root,
                } => {
                    let len = fork_choice.len();
                    let result = fork_choice.process_block(
                        slot,
                        root,
                        parent_root,
                        Hash256::zero(),
                        Epoch::new(0),
                        Epoch::new(0),
                    );

                    assert_eq!(
                        result,
                        Err(Error::UnknownParent {
                            block_root: root,
                            parent_root,
                        }),
                        "Operation at index {} should fail. Operation: {:?}",
                        op_index,
                        op
                    );
                    assert_eq!(fork_choice.len(), len, "no block should be added");
                }
                Operation::ProcessAttestation {
                    validator_index,
                    block_root,
                    target_epoch,
                } => {
                    fork_choice.process_attestation(validator_index, block_root, target_epoch);
                }
                Operation::ApplyProposerWeighting { root, weight } => {
                    fork_choice
                        .apply_proposer_weighting(ProposerWeighting::new(root, weight))
                        .unwrap_or_else(|e| {
                            panic!(
                                "apply_proposer_weighting op at index {} returned error: {:?}",
                                op_index, e
                            )
                        });
                }
                Operation::ReverseProposerWeighting { root, weight } => {
                    fork_choice
                        .reverse_proposer_weighting(ProposerWeighting::new(root, weight))
                        .unwrap_or_else(|e| {
                            panic!(
                                "reverse_proposer_weighting op at index {} returned error: {:?}",
                                op_index, e
                            )
                        });
                }
                Operation::Prune {
                    finalized_root,
                    prune_threshold,
                    expected_len,
                } => {
                    fork_choice.set_prune_threshold(prune_threshold);
                    fork_choice
                        .maybe_prune(finalized_root)
                        .unwrap_or_else(|e| {
                            panic!("prune op at index {} returned error: {:?}", op_index, e)
                        });

                    assert_eq!(
                        fork_choice.len(),
                        expected_len,
                        "Prune op at index {} failed with {} instead of {}",
                        op_index,
                        fork_choice.len(),
                        expected_len
                    );
                }
                Operation::AssertWeight { block_root, weight } => assert_eq!(
                    fork_choice.get_weight(&block_root),
                    Some(weight),
                    "block weight at op index {}",
                    op_index
                ),
            }
        }
    }
}

/// Gives a root that is not the zero hash (unless i is `usize::max_value)`.
fn get_root(i: u64) -> Hash256 {
    Hash256::from_low_u64_be(i + 1)
}

/// Gives a checkpoint with a root that is not the zero hash (unless i is `usize::max_value)`.
/// `Epoch` will always equal `i`.
fn get_checkpoint(i: u64) -> Checkpoint {
    Checkpoint {
        epoch: Epoch::new(i),
        root: get_root(i),
    }
}
