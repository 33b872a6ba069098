mod config;
mod error;
pub mod fork_choice_test_definition;
mod metrics;
mod proto_array;
mod proto_array_fork_choice;
mod vote_tracker;

pub use crate::config::{
    ForkChoiceConfig, DEFAULT_PROPOSER_SCORE_BOOST, DEFAULT_PRUNE_THRESHOLD,
    VALIDATOR_REGISTRY_LIMIT,
};
pub use crate::proto_array::{calculate_proposer_boost, ProposerWeighting};
pub use crate::proto_array_fork_choice::ProtoArrayForkChoice;
pub use error::Error;

pub mod core {
    pub use super::proto_array::{Iter, ProtoArray, ProtoNode};
    pub use super::vote_tracker::{ElasticList, VoteTracker};
}
