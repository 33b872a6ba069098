use crate::config::{ForkChoiceConfig, VALIDATOR_REGISTRY_LIMIT};
use crate::error::Error;
use crate::metrics;
use crate::proto_array::{calculate_proposer_boost, ProposerWeighting, ProtoArray, ProtoNode};
use crate::vote_tracker::{ElasticList, VoteTracker};
use parking_lot::{MappedRwLockReadGuard, RwLock, RwLockReadGuard};
use slog::{debug, warn, Logger};
use types::{Checkpoint, Epoch, Hash256, Slot};

/// Everything that must be mutated under a single exclusive lock.
#[derive(Clone, Debug, PartialEq)]
struct ForkChoiceState {
    proto_array: ProtoArray,
    votes: ElasticList<VoteTracker>,
    balances: Vec<u64>,
}

/// A thread-safe LMD-GHOST fork choice built around a `ProtoArray`.
///
/// All mutations (blocks, votes, proposer weightings, pruning) are serialized through one
/// `RwLock`, since scoring and best-descendant maintenance touch the whole tree.
pub struct ProtoArrayForkChoice {
    state: RwLock<ForkChoiceState>,
    config: ForkChoiceConfig,
    log: Logger,
}

impl ProtoArrayForkChoice {
    /// Instantiate fork choice, using the finalized block as the anchor of the tree.
    pub fn new(
        config: ForkChoiceConfig,
        finalized_block_slot: Slot,
        finalized_block_state_root: Hash256,
        justified_checkpoint: Checkpoint,
        finalized_checkpoint: Checkpoint,
        log: Logger,
    ) -> Result<Self, Error> {
        config.validate().map_err(Error::InvalidConfig)?;

        let mut proto_array = ProtoArray::new(
            &config,
            justified_checkpoint.epoch,
            finalized_checkpoint.epoch,
            finalized_checkpoint.epoch,
        );

        proto_array.on_block(
            finalized_block_slot,
            finalized_checkpoint.root,
            Hash256::zero(),
            finalized_block_state_root,
            justified_checkpoint.epoch,
            finalized_checkpoint.epoch,
        )?;

        debug!(
            log,
            "Initialized fork choice";
            "anchor_root" => ?finalized_checkpoint.root,
            "anchor_slot" => %finalized_block_slot,
            "justified_epoch" => %justified_checkpoint.epoch,
            "finalized_epoch" => %finalized_checkpoint.epoch,
        );

        Ok(Self {
            state: RwLock::new(ForkChoiceState {
                proto_array,
                votes: ElasticList::default(),
                balances: vec![],
            }),
            config,
            log,
        })
    }

    pub fn config(&self) -> &ForkChoiceConfig {
        &self.config
    }

    /// Record the latest vote of `validator_index`.
    ///
    /// The vote list grows to fit `validator_index`, so callers must only pass indices from a
    /// verified attestation. Indices at or beyond `VALIDATOR_REGISTRY_LIMIT` are ignored.
    pub fn process_attestation(
        &self,
        validator_index: usize,
        block_root: Hash256,
        target_epoch: Epoch,
    ) {
        if validator_index as u64 >= VALIDATOR_REGISTRY_LIMIT {
            debug!(
                self.log,
                "Ignoring vote from unknown validator";
                "validator_index" => validator_index,
                "block_root" => ?block_root,
            );
            return;
        }

        self.state
            .write()
            .votes
            .set_vote(validator_index, block_root, target_epoch);
    }

    pub fn process_block(
        &self,
        slot: Slot,
        block_root: Hash256,
        parent_root: Hash256,
        state_root: Hash256,
        justified_epoch: Epoch,
        finalized_epoch: Epoch,
    ) -> Result<(), Error> {
        let mut state = self.state.write();

        state.proto_array.on_block(
            slot,
            block_root,
            parent_root,
            state_root,
            justified_epoch,
            finalized_epoch,
        )?;

        metrics::scrape_for_metrics(&state.proto_array, &state.votes);

        Ok(())
    }

    /// Build the proposer weighting for `block_root` from the justified balances, using the
    /// configured boost percentage.
    ///
    /// Returns `None` if boosting is disabled or no weighting can be computed from `balances`.
    pub fn proposer_weighting(
        &self,
        block_root: Hash256,
        balances: &[u64],
    ) -> Option<ProposerWeighting> {
        let proposer_score_boost = self.config.proposer_score_boost?;
        calculate_proposer_boost(balances, self.config.slots_per_epoch, proposer_score_boost)
            .map(|weight| ProposerWeighting::new(block_root, weight))
    }

    /// Apply `weighting` to its target and all ancestors. A weighting for an unknown block is
    /// ignored.
    pub fn apply_proposer_weighting(&self, weighting: ProposerWeighting) -> Result<(), Error> {
        let result = self
            .state
            .write()
            .proto_array
            .apply_proposer_weighting(&weighting);
        self.ignore_unknown_root(result, &weighting)
    }

    /// Reverse a weighting previously given to `Self::apply_proposer_weighting`. A weighting for
    /// an unknown block is ignored.
    pub fn reverse_proposer_weighting(&self, weighting: ProposerWeighting) -> Result<(), Error> {
        let result = self
            .state
            .write()
            .proto_array
            .reverse_proposer_weighting(&weighting);
        self.ignore_unknown_root(result, &weighting)
    }

    fn ignore_unknown_root(
        &self,
        result: Result<(), Error>,
        weighting: &ProposerWeighting,
    ) -> Result<(), Error> {
        match result {
            Err(Error::UnknownBlockRoot(block_root)) => {
                debug!(
                    self.log,
                    "Ignoring proposer weighting for unknown block";
                    "block_root" => ?block_root,
                    "weight" => weighting.weight,
                );
                Ok(())
            }
            other => other,
        }
    }

    /// Apply all pending votes and balance changes, then return the head block root.
    ///
    /// Each of the `removed_proposer_weightings` is subtracted from its target as part of the same
    /// score update.
    pub fn find_head(
        &self,
        justified_checkpoint: Checkpoint,
        finalized_checkpoint: Checkpoint,
        justified_state_balances: &[u64],
        removed_proposer_weightings: &[ProposerWeighting],
    ) -> Result<Hash256, Error> {
        let _timer = metrics::start_timer(&metrics::PROTO_ARRAY_FIND_HEAD_TIMES);

        let mut guard = self.state.write();
        let state = &mut *guard;

        let new_balances = justified_state_balances;

        // Votes are only committed once the score changes have been applied, so a failure leaves
        // them free to be counted again.
        let mut votes = state.votes.clone();
        let deltas = compute_deltas(
            &mut votes,
            state.proto_array.nodes.len(),
            |root| state.proto_array.get_index(root),
            &state.balances,
            new_balances,
            removed_proposer_weightings,
        )?;

        state.proto_array.apply_score_changes(
            deltas,
            justified_checkpoint.epoch,
            finalized_checkpoint.epoch,
        )?;

        state.votes = votes;
        state.balances = new_balances.to_vec();

        let head = state.proto_array.find_head(
            &justified_checkpoint.root,
            justified_checkpoint.epoch,
            finalized_checkpoint.epoch,
        )?;

        metrics::scrape_for_metrics(&state.proto_array, &state.votes);

        debug!(
            self.log,
            "Fork choice found head";
            "head_root" => ?head,
            "justified_root" => ?justified_checkpoint.root,
            "justified_epoch" => %justified_checkpoint.epoch,
            "finalized_epoch" => %finalized_checkpoint.epoch,
        );

        Ok(head)
    }

    pub fn maybe_prune(&self, finalized_root: Hash256) -> Result<(), Error> {
        let mut state = self.state.write();

        let len_before = state.proto_array.nodes.len();
        if let Err(e) = state.proto_array.maybe_prune(finalized_root) {
            warn!(
                self.log,
                "Unable to prune fork choice";
                "finalized_root" => ?finalized_root,
                "error" => ?e,
            );
            return Err(e);
        }
        let pruned = len_before.saturating_sub(state.proto_array.nodes.len());

        if pruned > 0 {
            metrics::inc_counter_by(&metrics::PROTO_ARRAY_PRUNED_NODES_TOTAL, pruned as u64);
            debug!(
                self.log,
                "Pruned fork choice";
                "finalized_root" => ?finalized_root,
                "pruned_nodes" => pruned,
                "remaining_nodes" => state.proto_array.nodes.len(),
            );
        }

        metrics::scrape_for_metrics(&state.proto_array, &state.votes);

        Ok(())
    }

    pub fn set_prune_threshold(&self, prune_threshold: usize) {
        self.state.write().proto_array.prune_threshold = prune_threshold;
    }

    pub fn len(&self) -> usize {
        self.state.read().proto_array.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains_block(&self, block_root: &Hash256) -> bool {
        self.state.read().proto_array.indices.contains_key(block_root)
    }

    pub fn get_node(&self, block_root: &Hash256) -> Option<ProtoNode> {
        self.state.read().proto_array.get_node(block_root).cloned()
    }

    pub fn get_weight(&self, block_root: &Hash256) -> Option<u64> {
        self.state.read().proto_array.get_weight(block_root)
    }

    pub fn block_slot(&self, block_root: &Hash256) -> Option<Slot> {
        self.state
            .read()
            .proto_array
            .get_node(block_root)
            .map(|node| node.slot)
    }

    pub fn block_slot_and_state_root(&self, block_root: &Hash256) -> Option<(Slot, Hash256)> {
        self.state
            .read()
            .proto_array
            .get_node(block_root)
            .map(|node| (node.slot, node.state_root))
    }

    pub fn latest_message(&self, validator_index: usize) -> Option<(Hash256, Epoch)> {
        self.state.read().votes.latest_message(validator_index)
    }

    pub fn highest_voted_validator_index(&self) -> Option<usize> {
        self.state.read().votes.highest_voted_validator_index()
    }

    /// Returns a read-lock to core `ProtoArray` struct.
    ///
    /// Should only be used for diagnostics.
    pub fn core_proto_array(&self) -> MappedRwLockReadGuard<'_, ProtoArray> {
        RwLockReadGuard::map(self.state.read(), |state| &state.proto_array)
    }
}

/// Returns a list of `deltas`, where there is one delta for each of the `node_count` indices.
///
/// The deltas are formed by a change between `old_balances` and `new_balances`, and/or a change of
/// vote in `votes`. The weight of each of the `removed_proposer_weightings` is subtracted from its
/// target, if the target is known.
///
/// A vote for a root that `index_of` cannot resolve is left pending: its `current_root` is not
/// updated, so the move is retried by the next call. Any balance change of that validator is
/// applied to the `current_root` in the meantime.
///
/// ## Errors
///
/// - If `index_of` returns an index greater to or equal to `node_count`.
/// - If a delta overflows an `i64`.
pub(crate) fn compute_deltas<F>(
    votes: &mut ElasticList<VoteTracker>,
    node_count: usize,
    index_of: F,
    old_balances: &[u64],
    new_balances: &[u64],
    removed_proposer_weightings: &[ProposerWeighting],
) -> Result<Vec<i64>, Error>
where
    F: Fn(&Hash256) -> Option<usize>,
{
    let mut deltas = vec![0_i64; node_count];

    // The zero hash is the "no vote" sentinel and never refers to a block.
    let vote_index = |root: &Hash256| {
        if root.is_zero() {
            None
        } else {
            index_of(root)
        }
    };

    for (val_index, vote) in votes.iter_mut().enumerate() {
        // There is no need to create a score change if the validator has never voted.
        if vote.current_root.is_zero() && vote.next_root.is_zero() {
            continue;
        }

        // If the validator was not included in the _old_ balances (i.e., it did not exist yet)
        // then say its balance was zero.
        let old_balance = old_balances.get(val_index).copied().unwrap_or(0);

        // If the validators vote is not known in the _new_ balances, then use a balance of zero.
        //
        // It is possible that there is a vote for an unknown validator if we change our justified
        // state to a new state with a higher epoch that is on a different fork because that fork
        // may have on-boarded less validators than the prior fork.
        let new_balance = new_balances.get(val_index).copied().unwrap_or(0);

        if vote.current_root == vote.next_root && old_balance == new_balance {
            continue;
        }

        let current_index = vote_index(&vote.current_root);
        let next_index = vote_index(&vote.next_root);

        if next_index.is_none() && !vote.next_root.is_zero() {
            // The voted-for block has not been imported yet. Keep the balance at the current root
            // up to date and retry the move next time.
            if let Some(current_index) = current_index {
                add_delta(&mut deltas, current_index, -as_delta(old_balance, current_index)?)?;
                add_delta(&mut deltas, current_index, as_delta(new_balance, current_index)?)?;
            }
            continue;
        }

        // A `current_root` that is no longer known is assumed to be pre-finalization and
        // therefore not interesting.
        if let Some(current_index) = current_index {
            add_delta(&mut deltas, current_index, -as_delta(old_balance, current_index)?)?;
        }

        if let Some(next_index) = next_index {
            add_delta(&mut deltas, next_index, as_delta(new_balance, next_index)?)?;
        }

        vote.current_root = vote.next_root;
    }

    for weighting in removed_proposer_weightings {
        if let Some(index) = index_of(&weighting.root) {
            add_delta(&mut deltas, index, -as_delta(weighting.weight, index)?)?;
        }
    }

    Ok(deltas)
}

fn as_delta(amount: u64, index: usize) -> Result<i64, Error> {
    i64::try_from(amount).map_err(|_| Error::DeltaOverflow(index))
}

fn add_delta(deltas: &mut [i64], index: usize, delta: i64) -> Result<(), Error> {
    let current = deltas
        .get_mut(index)
        .ok_or(Error::InvalidNodeDelta(index))?;
    *current = current
        .checked_add(delta)
        .ok_or(Error::DeltaOverflow(index))?;
    Ok(())
}
