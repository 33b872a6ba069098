use serde_derive::{Deserialize, Serialize};
use types::{Epoch, Hash256};

/// The latest message of a single validator.
///
/// `current_root` is the root whose subtree currently carries the validator's balance and
/// `next_root` is the root the validator most recently voted for. The two differ until the next
/// call to `compute_deltas` moves the balance.
#[derive(Default, PartialEq, Eq, Clone, Debug, Serialize, Deserialize)]
pub struct VoteTracker {
    pub(crate) current_root: Hash256,
    pub(crate) next_root: Hash256,
    pub(crate) next_epoch: Epoch,
}

/// A Vec-wrapper which will grow to match any request.
///
/// E.g., a `get` or `insert` to an out-of-bounds element will cause the Vec to grow (using
/// Default) to the smallest size required to fulfill the request.
#[derive(Default, Clone, Debug, PartialEq)]
pub struct ElasticList<T>(pub Vec<T>);

impl<T> ElasticList<T>
where
    T: Default,
{
    fn ensure(&mut self, i: usize) {
        if self.0.len() <= i {
            self.0.resize_with(i + 1, Default::default);
        }
    }

    pub fn get_mut(&mut self, i: usize) -> &mut T {
        self.ensure(i);
        &mut self.0[i]
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.0.iter_mut()
    }
}

impl ElasticList<VoteTracker> {
    /// Record a vote from `validator_index` for `block_root`.
    ///
    /// The vote replaces the previous one only if it has a later target epoch, or if the validator
    /// has never voted.
    ///
    /// The list grows to `validator_index + 1` entries, so the index must already be bounded by
    /// the validator registry.
    pub fn set_vote(&mut self, validator_index: usize, block_root: Hash256, target_epoch: Epoch) {
        let vote = self.get_mut(validator_index);

        if target_epoch > vote.next_epoch || *vote == VoteTracker::default() {
            vote.next_root = block_root;
            vote.next_epoch = target_epoch;
        }
    }

    /// Returns the `(root, target_epoch)` of the latest vote from `validator_index`, if any.
    pub fn latest_message(&self, validator_index: usize) -> Option<(Hash256, Epoch)> {
        self.0
            .get(validator_index)
            .filter(|vote| **vote != VoteTracker::default())
            .map(|vote| (vote.next_root, vote.next_epoch))
    }

    /// The largest validator index that has ever been observed, sizing the balances required by
    /// `compute_deltas`.
    pub fn highest_voted_validator_index(&self) -> Option<usize> {
        self.0.len().checked_sub(1)
    }
}
