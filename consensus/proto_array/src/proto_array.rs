use crate::config::ForkChoiceConfig;
use crate::error::Error;
use serde_derive::{Deserialize, Serialize};
use std::collections::HashMap;
use types::{Epoch, Hash256, Slot};

#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct ProtoNode {
    /// Used to exempt blocks from the genesis epoch from the viability filter. Also exists so
    /// external components can easily query the block slot.
    pub slot: Slot,
    /// The `state_root` is not necessary for `ProtoArray`, it just exists for upstream components
    /// (namely attestation verification).
    pub state_root: Hash256,
    pub root: Hash256,
    pub parent: Option<usize>,
    pub justified_epoch: Epoch,
    pub finalized_epoch: Epoch,
    pub weight: u64,
    pub best_child: Option<usize>,
    pub best_descendant: Option<usize>,
}

/// A temporary weighting granted to a timely block proposal.
///
/// Applying and then reversing the same value restores every touched node to its exact prior
/// weight.
#[derive(PartialEq, Eq, Debug, Serialize, Deserialize, Copy, Clone)]
pub struct ProposerWeighting {
    pub root: Hash256,
    pub weight: u64,
}

impl ProposerWeighting {
    pub fn new(root: Hash256, weight: u64) -> Self {
        Self { root, weight }
    }
}

#[derive(PartialEq, Debug, Serialize, Deserialize, Clone)]
pub struct ProtoArray {
    /// Do not attempt to prune the tree unless it would remove at least this many nodes. Small
    /// prunes simply waste time.
    pub prune_threshold: usize,
    pub slots_per_epoch: u64,
    pub justified_epoch: Epoch,
    pub finalized_epoch: Epoch,
    /// The epoch of the anchor block. A store checkpoint still at this epoch matches any node.
    pub initial_epoch: Epoch,
    pub nodes: Vec<ProtoNode>,
    pub indices: HashMap<Hash256, usize>,
}

impl ProtoArray {
    /// The `config` must pass `ForkChoiceConfig::validate`.
    pub fn new(
        config: &ForkChoiceConfig,
        justified_epoch: Epoch,
        finalized_epoch: Epoch,
        initial_epoch: Epoch,
    ) -> Self {
        Self {
            prune_threshold: config.prune_threshold,
            slots_per_epoch: config.slots_per_epoch,
            justified_epoch,
            finalized_epoch,
            initial_epoch,
            nodes: Vec::with_capacity(1),
            indices: HashMap::with_capacity(1),
        }
    }

    /// Iterate backwards through the array, touching all nodes and their parents and potentially
    /// the best-child of each parent.
    ///
    /// The structure of the `self.nodes` array ensures that the child of each node is always
    /// touched before its parent.
    ///
    /// For each node, the following is done:
    ///
    /// - Compute the node's new weight from the corresponding delta.
    /// - Back-propagate each node's delta to its parents delta.
    ///
    /// The new weights are only written once every node has been computed without error, so a
    /// failure leaves `self` untouched. Once all weights are settled, each parent's best-child and
    /// best-descendant is recomputed.
    pub fn apply_score_changes(
        &mut self,
        mut deltas: Vec<i64>,
        justified_epoch: Epoch,
        finalized_epoch: Epoch,
    ) -> Result<(), Error> {
        if deltas.len() != self.indices.len() {
            return Err(Error::InvalidDeltaLen {
                deltas: deltas.len(),
                indices: self.indices.len(),
            });
        }

        let mut new_weights = vec![0; self.nodes.len()];

        for node_index in (0..self.nodes.len()).rev() {
            let node = self
                .nodes
                .get(node_index)
                .ok_or(Error::InvalidNodeIndex(node_index))?;

            let node_delta = deltas
                .get(node_index)
                .copied()
                .ok_or(Error::InvalidNodeDelta(node_index))?;

            *new_weights
                .get_mut(node_index)
                .ok_or(Error::InvalidNodeIndex(node_index))? =
                apply_delta(node.weight, node_delta, node_index)?;

            if let Some(parent_index) = node.parent {
                let parent_delta = deltas
                    .get_mut(parent_index)
                    .ok_or(Error::InvalidParentDelta(parent_index))?;

                // Back-propagate the nodes delta to its parent.
                *parent_delta = parent_delta
                    .checked_add(node_delta)
                    .ok_or(Error::DeltaOverflow(parent_index))?;
            }
        }

        for (node, weight) in self.nodes.iter_mut().zip(new_weights) {
            node.weight = weight;
        }

        self.justified_epoch = justified_epoch;
        self.finalized_epoch = finalized_epoch;

        // We _must_ perform this separately from the weight-updating loop above to ensure that we
        // have a fully coherent set of weights before updating parent best-child/descendant.
        self.update_best_child_and_descendants()
    }

    /// Register a block with the fork choice.
    ///
    /// The first block registered is the anchor and its `parent_root` is ignored. Every later
    /// block must have a known parent. Registering a known block is a no-op.
    pub fn on_block(
        &mut self,
        slot: Slot,
        root: Hash256,
        parent_root: Hash256,
        state_root: Hash256,
        justified_epoch: Epoch,
        finalized_epoch: Epoch,
    ) -> Result<(), Error> {
        if self.indices.contains_key(&root) {
            return Ok(());
        }

        let parent = if self.nodes.is_empty() {
            None
        } else {
            let parent_index = self
                .indices
                .get(&parent_root)
                .copied()
                .ok_or(Error::UnknownParent {
                    block_root: root,
                    parent_root,
                })?;
            Some(parent_index)
        };

        let node_index = self.nodes.len();

        self.indices.insert(root, node_index);
        self.nodes.push(ProtoNode {
            slot,
            state_root,
            root,
            parent,
            justified_epoch,
            finalized_epoch,
            weight: 0,
            best_child: None,
            best_descendant: None,
        });

        // Walk up the chain so every ancestor learns about its (potential) new best-descendant.
        let mut child_index = node_index;
        loop {
            let parent = self
                .nodes
                .get(child_index)
                .ok_or(Error::InvalidNodeIndex(child_index))?
                .parent;

            let Some(parent_index) = parent else {
                return Ok(());
            };

            self.maybe_update_best_child_and_descendant(parent_index, child_index)?;
            child_index = parent_index;
        }
    }

    /// Add `weighting.weight` to the target block and each of its ancestors.
    ///
    /// Returns `Error::UnknownBlockRoot` without modifying `self` if the target is unknown.
    pub fn apply_proposer_weighting(&mut self, weighting: &ProposerWeighting) -> Result<(), Error> {
        self.adjust_chain_weight(&weighting.root, |weight| {
            weight.checked_add(weighting.weight)
        })
    }

    /// Undo a previous `Self::apply_proposer_weighting` with the same `weighting`.
    ///
    /// Returns `Error::UnknownBlockRoot` without modifying `self` if the target is unknown.
    pub fn reverse_proposer_weighting(
        &mut self,
        weighting: &ProposerWeighting,
    ) -> Result<(), Error> {
        self.adjust_chain_weight(&weighting.root, |weight| {
            weight.checked_sub(weighting.weight)
        })
    }

    /// Compute the new weight of `root` and all its ancestors using `adjust`, then write them all
    /// at once. Nothing is written if any adjustment fails.
    fn adjust_chain_weight<F>(&mut self, root: &Hash256, adjust: F) -> Result<(), Error>
    where
        F: Fn(u64) -> Option<u64>,
    {
        let mut next_index = Some(
            self.indices
                .get(root)
                .copied()
                .ok_or(Error::UnknownBlockRoot(*root))?,
        );

        let mut new_weights = vec![];
        while let Some(index) = next_index {
            let node = self
                .nodes
                .get(index)
                .ok_or(Error::InvalidNodeIndex(index))?;
            let weight = adjust(node.weight).ok_or(Error::DeltaOverflow(index))?;
            new_weights.push((index, weight));
            next_index = node.parent;
        }

        for (index, weight) in new_weights {
            self.nodes
                .get_mut(index)
                .ok_or(Error::InvalidNodeIndex(index))?
                .weight = weight;
        }

        self.update_best_child_and_descendants()
    }

    /// Follows the best-child links from the justified node, returning the deepest node on that
    /// path which is viable for the head.
    ///
    /// The justified node itself is always considered viable, so the result is never empty.
    pub fn find_head(
        &self,
        justified_root: &Hash256,
        justified_epoch: Epoch,
        finalized_epoch: Epoch,
    ) -> Result<Hash256, Error> {
        let justified_index = self
            .indices
            .get(justified_root)
            .copied()
            .ok_or(Error::JustifiedNodeUnknown(*justified_root))?;

        let mut node = self
            .nodes
            .get(justified_index)
            .ok_or(Error::InvalidJustifiedIndex(justified_index))?;
        let mut head = node;

        // Terminates since a child always has a higher index than its parent.
        while let Some(best_child_index) = node.best_child {
            node = self
                .nodes
                .get(best_child_index)
                .ok_or(Error::InvalidBestChild(best_child_index))?;

            if self.node_is_viable_for_head(node, justified_epoch, finalized_epoch) {
                head = node;
            }
        }

        Ok(head.root)
    }

    /// Update the tree with new finalization information. The tree is only actually pruned if the
    /// number of nodes prior to `finalized_root` is at least `self.prune_threshold`.
    ///
    /// Pruning removes every node prior to the finalized node and shifts the remaining indices down
    /// by the same amount. A surviving node whose parent was removed no longer has a parent. The new
    /// nodes and indices are built in full before replacing the existing ones, so an error leaves
    /// `self` untouched.
    ///
    /// # Errors
    ///
    /// Returns errors if:
    ///
    /// - The `finalized_root` is unknown.
    /// - There is some internal error relating to invalid indices inside `self`.
    pub fn maybe_prune(&mut self, finalized_root: Hash256) -> Result<(), Error> {
        let finalized_index = self
            .indices
            .get(&finalized_root)
            .copied()
            .ok_or(Error::PruneTargetNotFound(finalized_root))?;

        if finalized_index < self.prune_threshold {
            // Pruning at small numbers incurs more cost than benefit.
            return Ok(());
        }

        let shift = |index: usize, field: &'static str| -> Result<usize, Error> {
            index
                .checked_sub(finalized_index)
                .ok_or(Error::IndexOverflow(field))
        };

        let mut nodes = Vec::with_capacity(self.nodes.len().saturating_sub(finalized_index));
        let mut indices = HashMap::with_capacity(nodes.capacity());
        for (index, node) in self.nodes.iter().enumerate().skip(finalized_index) {
            let mut node = node.clone();

            // A parent prior to the finalized node is dropped along with it.
            node.parent = node
                .parent
                .and_then(|parent| parent.checked_sub(finalized_index));
            node.best_child = node
                .best_child
                .map(|i| shift(i, "best_child"))
                .transpose()?;
            node.best_descendant = node
                .best_descendant
                .map(|i| shift(i, "best_descendant"))
                .transpose()?;

            indices.insert(node.root, shift(index, "indices")?);
            nodes.push(node);
        }

        self.nodes = nodes;
        self.indices = indices;

        Ok(())
    }

    /// Iterate backwards through all nodes, re-evaluating each parent's best-child and
    /// best-descendant against the current weights.
    fn update_best_child_and_descendants(&mut self) -> Result<(), Error> {
        for node_index in (0..self.nodes.len()).rev() {
            let parent = self
                .nodes
                .get(node_index)
                .ok_or(Error::InvalidNodeIndex(node_index))?
                .parent;

            if let Some(parent_index) = parent {
                self.maybe_update_best_child_and_descendant(parent_index, node_index)?;
            }
        }

        Ok(())
    }

    /// Observe the parent at `parent_index` with respect to the child at `child_index` and
    /// potentially modify the `parent.best_child` and `parent.best_descendant` values.
    ///
    /// ## Detail
    ///
    /// There are four outcomes:
    ///
    /// - The child is already the best child but it's now invalid due to a FFG change and should be removed.
    /// - The child is already the best child and the parent is updated with the new
    ///     best-descendant.
    /// - The child is not the best child but becomes the best child.
    /// - The child is not the best child and does not become the best child.
    fn maybe_update_best_child_and_descendant(
        &mut self,
        parent_index: usize,
        child_index: usize,
    ) -> Result<(), Error> {
        let child = self
            .nodes
            .get(child_index)
            .ok_or(Error::InvalidNodeIndex(child_index))?;

        let parent = self
            .nodes
            .get(parent_index)
            .ok_or(Error::InvalidNodeIndex(parent_index))?;

        let child_leads_to_viable_head = self.node_leads_to_viable_head(child)?;

        // These three variables are aliases to the three options that we may set the
        // `parent.best_child` and `parent.best_descendant` to.
        let change_to_none = (None, None);
        let change_to_child = (
            Some(child_index),
            child.best_descendant.or(Some(child_index)),
        );
        let no_change = (parent.best_child, parent.best_descendant);

        let (new_best_child, new_best_descendant) =
            if let Some(best_child_index) = parent.best_child {
                if best_child_index == child_index && !child_leads_to_viable_head {
                    // If the child is already the best-child of the parent but it's not viable for
                    // the head, remove it.
                    change_to_none
                } else if best_child_index == child_index {
                    // If the child is the best-child already, set it again to ensure that the
                    // best-descendant of the parent is updated.
                    change_to_child
                } else {
                    let best_child = self
                        .nodes
                        .get(best_child_index)
                        .ok_or(Error::InvalidBestChild(best_child_index))?;

                    let best_child_leads_to_viable_head =
                        self.node_leads_to_viable_head(best_child)?;

                    if child_leads_to_viable_head && !best_child_leads_to_viable_head {
                        // The child leads to a viable head, but the current best-child doesn't.
                        change_to_child
                    } else if !child_leads_to_viable_head && best_child_leads_to_viable_head {
                        // The best child leads to a viable head, but the child doesn't.
                        no_change
                    } else if (child.weight, child.root) > (best_child.weight, best_child.root) {
                        // Choose the winner by weight, breaking ties with the greater root.
                        change_to_child
                    } else {
                        no_change
                    }
                }
            } else if child_leads_to_viable_head {
                // There is no current best-child and the child is viable.
                change_to_child
            } else {
                // There is no current best-child but the child is not viable.
                no_change
            };

        let parent = self
            .nodes
            .get_mut(parent_index)
            .ok_or(Error::InvalidNodeIndex(parent_index))?;

        parent.best_child = new_best_child;
        parent.best_descendant = new_best_descendant;

        Ok(())
    }

    /// Indicates if the node itself is viable for the head, or if it's best descendant is viable
    /// for the head.
    fn node_leads_to_viable_head(&self, node: &ProtoNode) -> Result<bool, Error> {
        let best_descendant_is_viable_for_head =
            if let Some(best_descendant_index) = node.best_descendant {
                let best_descendant = self
                    .nodes
                    .get(best_descendant_index)
                    .ok_or(Error::InvalidBestDescendant(best_descendant_index))?;

                self.node_is_viable_for_head(
                    best_descendant,
                    self.justified_epoch,
                    self.finalized_epoch,
                )
            } else {
                false
            };

        Ok(best_descendant_is_viable_for_head
            || self.node_is_viable_for_head(node, self.justified_epoch, self.finalized_epoch))
    }

    /// This is the equivalent to the `filter_block_tree` function of the consensus fork choice:
    ///
    /// https://github.com/ethereum/eth2.0-specs/blob/v0.10.0/specs/phase0/fork-choice.md#filter_block_tree
    ///
    /// Any node that has a different finalized or justified epoch should not be viable for the
    /// head, unless it was produced during the genesis epoch.
    fn node_is_viable_for_head(
        &self,
        node: &ProtoNode,
        justified_epoch: Epoch,
        finalized_epoch: Epoch,
    ) -> bool {
        if node.slot.epoch(self.slots_per_epoch) == Epoch::new(0) {
            return true;
        }

        (node.justified_epoch == justified_epoch || justified_epoch == self.initial_epoch)
            && (node.finalized_epoch == finalized_epoch || finalized_epoch == self.initial_epoch)
    }

    pub fn get_index(&self, root: &Hash256) -> Option<usize> {
        self.indices.get(root).copied()
    }

    pub fn get_node(&self, root: &Hash256) -> Option<&ProtoNode> {
        self.nodes.get(self.get_index(root)?)
    }

    pub fn get_weight(&self, root: &Hash256) -> Option<u64> {
        self.get_node(root).map(|node| node.weight)
    }

    /// Returns the roots of all nodes without children, in index order.
    pub fn heads(&self) -> Vec<Hash256> {
        let mut has_child = vec![false; self.nodes.len()];
        for parent in self.nodes.iter().filter_map(|node| node.parent) {
            if let Some(flag) = has_child.get_mut(parent) {
                *flag = true;
            }
        }

        self.nodes
            .iter()
            .zip(has_child)
            .filter(|(_, has_child)| !has_child)
            .map(|(node, _)| node.root)
            .collect()
    }

    /// Return a reverse iterator over the nodes which comprise the chain ending at `block_root`.
    pub fn iter_nodes<'a>(&'a self, block_root: &Hash256) -> Iter<'a> {
        Iter {
            next_node_index: self.get_index(block_root),
            proto_array: self,
        }
    }

    /// Return a reverse iterator over the block roots of the chain ending at `block_root`.
    ///
    /// Note that unlike many other iterators, this one WILL NOT yield anything at skipped slots.
    pub fn iter_block_roots<'a>(
        &'a self,
        block_root: &Hash256,
    ) -> impl Iterator<Item = (Hash256, Slot)> + 'a {
        self.iter_nodes(block_root)
            .map(|node| (node.root, node.slot))
    }

    /// Returns `true` if the `descendant_root` has an ancestor with `ancestor_root`. Always
    /// returns `false` if either input root is unknown.
    ///
    /// ## Notes
    ///
    /// Still returns `true` if `ancestor_root` is known and `ancestor_root == descendant_root`.
    pub fn is_descendant(&self, ancestor_root: Hash256, descendant_root: Hash256) -> bool {
        self.get_node(&ancestor_root)
            .map(|ancestor| {
                self.iter_block_roots(&descendant_root)
                    .take_while(|(_root, slot)| *slot >= ancestor.slot)
                    .any(|(root, _slot)| root == ancestor_root)
            })
            .unwrap_or(false)
    }
}

fn apply_delta(weight: u64, delta: i64, index: usize) -> Result<u64, Error> {
    if delta < 0 {
        weight.checked_sub(delta.unsigned_abs())
    } else {
        weight.checked_add(delta as u64)
    }
    .ok_or(Error::DeltaOverflow(index))
}

/// A helper method to calculate the proposer boost based on the given `validator_balances`.
/// This does *not* do any verification about whether a boost should or should not be applied.
/// The `validator_balances` array used here is assumed to hold *effective* balances, with inactive
/// balances defaulted to zero.
///
/// Returns `None` if there is an overflow or underflow when calculating the score, or if there
/// are no active validators.
///
/// https://github.com/ethereum/consensus-specs/blob/dev/specs/phase0/fork-choice.md#get_latest_attesting_balance
pub fn calculate_proposer_boost(
    validator_balances: &[u64],
    slots_per_epoch: u64,
    proposer_score_boost: u64,
) -> Option<u64> {
    let mut total_balance: u64 = 0;
    let mut num_validators: u64 = 0;
    for &balance in validator_balances {
        // We need to filter zero balances here to get an accurate active validator count.
        if balance != 0 {
            total_balance = total_balance.checked_add(balance)?;
            num_validators = num_validators.checked_add(1)?;
        }
    }
    let average_balance = total_balance.checked_div(num_validators)?;
    let committee_size = num_validators.checked_div(slots_per_epoch)?;
    let committee_weight = committee_size.checked_mul(average_balance)?;
    committee_weight
        .checked_mul(proposer_score_boost)?
        .checked_div(100)
}

/// Reverse iterator over one path through a `ProtoArray`.
pub struct Iter<'a> {
    next_node_index: Option<usize>,
    proto_array: &'a ProtoArray,
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a ProtoNode;

    fn next(&mut self) -> Option<Self::Item> {
        let next_node_index = self.next_node_index?;
        let node = self.proto_array.nodes.get(next_node_index)?;
        self.next_node_index = node.parent;
        Some(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn root(i: u64) -> Hash256 {
        Hash256::from_low_u64_be(i + 1)
    }

    fn epoch(i: u64) -> Epoch {
        Epoch::new(i)
    }

    /// A `ProtoArray` holding only an anchor block, `root(0)`, at slot 0.
    fn anchored() -> ProtoArray {
        let mut proto_array =
            ProtoArray::new(&ForkChoiceConfig::minimal(), epoch(0), epoch(0), epoch(0));
        proto_array
            .on_block(
                Slot::new(0),
                root(0),
                Hash256::zero(),
                Hash256::zero(),
                epoch(0),
                epoch(0),
            )
            .expect("should add anchor");
        proto_array
    }

    fn add_block(proto_array: &mut ProtoArray, slot: u64, block: u64, parent: u64) {
        add_justified_block(proto_array, slot, block, parent, 0);
    }

    fn add_justified_block(
        proto_array: &mut ProtoArray,
        slot: u64,
        block: u64,
        parent: u64,
        justified_epoch: u64,
    ) {
        proto_array
            .on_block(
                Slot::new(slot),
                root(block),
                root(parent),
                Hash256::zero(),
                epoch(justified_epoch),
                epoch(0),
            )
            .expect("should add block");
    }

    fn deltas(proto_array: &ProtoArray, changes: &[(u64, i64)]) -> Vec<i64> {
        let mut deltas = vec![0; proto_array.nodes.len()];
        for (block, delta) in changes {
            let index = proto_array.get_index(&root(*block)).expect("block is known");
            deltas[index] += delta;
        }
        deltas
    }

    fn head(proto_array: &ProtoArray) -> Hash256 {
        proto_array
            .find_head(&root(0), epoch(0), epoch(0))
            .expect("should find head")
    }

    /// Builds a tree of `count` blocks where each block extends a random earlier block.
    fn random_tree(rng: &mut StdRng, count: u64) -> ProtoArray {
        let mut proto_array = anchored();
        for block in 1..count {
            let parent = rng.gen_range(0..block);
            let parent_slot = proto_array
                .get_node(&root(parent))
                .expect("parent is known")
                .slot;
            add_block(&mut proto_array, parent_slot.as_u64() + 1, block, parent);
        }
        proto_array
    }

    #[test]
    fn heavier_branch_wins() {
        let mut proto_array = anchored();
        add_block(&mut proto_array, 1, 1, 0);
        add_block(&mut proto_array, 1, 2, 0);

        let changes = deltas(&proto_array, &[(1, 500)]);
        proto_array
            .apply_score_changes(changes, epoch(0), epoch(0))
            .expect("should apply changes");

        assert_eq!(head(&proto_array), root(1));
        assert_eq!(proto_array.get_weight(&root(0)), Some(500));
        assert_eq!(proto_array.get_weight(&root(2)), Some(0));
    }

    #[test]
    fn equal_weights_prefer_the_greater_root() {
        let mut proto_array = anchored();
        add_block(&mut proto_array, 1, 2, 0);
        add_block(&mut proto_array, 1, 1, 0);

        assert_eq!(head(&proto_array), root(2));

        let changes = deltas(&proto_array, &[(1, 3), (2, 3)]);
        proto_array
            .apply_score_changes(changes, epoch(0), epoch(0))
            .expect("should apply changes");

        assert_eq!(head(&proto_array), root(2));
    }

    #[test]
    fn proposer_weighting_moves_and_restores_head() {
        let mut proto_array = anchored();
        add_block(&mut proto_array, 1, 1, 0);
        add_block(&mut proto_array, 1, 2, 0);

        let changes = deltas(&proto_array, &[(1, 80)]);
        proto_array
            .apply_score_changes(changes, epoch(0), epoch(0))
            .expect("should apply changes");
        assert_eq!(head(&proto_array), root(1));

        let weighting = ProposerWeighting::new(root(2), 500);
        proto_array
            .apply_proposer_weighting(&weighting)
            .expect("should apply weighting");

        assert_eq!(head(&proto_array), root(2));
        assert_eq!(proto_array.get_weight(&root(2)), Some(500));
        assert_eq!(proto_array.get_weight(&root(0)), Some(580));

        proto_array
            .reverse_proposer_weighting(&weighting)
            .expect("should reverse weighting");

        assert_eq!(head(&proto_array), root(1));
        assert_eq!(proto_array.get_weight(&root(2)), Some(0));
        assert_eq!(proto_array.get_weight(&root(0)), Some(80));
    }

    #[test]
    fn unknown_proposer_weighting_is_rejected() {
        let mut proto_array = anchored();
        add_block(&mut proto_array, 1, 1, 0);
        let before = proto_array.clone();

        let weighting = ProposerWeighting::new(root(9), 10);

        assert_eq!(
            proto_array.apply_proposer_weighting(&weighting),
            Err(Error::UnknownBlockRoot(root(9)))
        );
        assert_eq!(
            proto_array.reverse_proposer_weighting(&weighting),
            Err(Error::UnknownBlockRoot(root(9)))
        );
        assert_eq!(proto_array, before);
    }

    #[test]
    fn reverse_proposer_weighting_underflow_changes_nothing() {
        let mut proto_array = anchored();
        add_block(&mut proto_array, 1, 1, 0);
        let changes = deltas(&proto_array, &[(1, 5)]);
        proto_array
            .apply_score_changes(changes, epoch(0), epoch(0))
            .expect("should apply changes");
        let before = proto_array.clone();

        let result = proto_array.reverse_proposer_weighting(&ProposerWeighting::new(root(1), 10));

        assert_eq!(result, Err(Error::DeltaOverflow(1)));
        assert_eq!(proto_array, before);
    }

    #[test]
    fn justified_node_is_always_viable() {
        let mut proto_array = anchored();
        add_block(&mut proto_array, 8, 1, 0);
        add_block(&mut proto_array, 9, 2, 1);

        // Neither block matches a store justified at epoch 1.
        proto_array
            .apply_score_changes(vec![0; 3], epoch(1), epoch(0))
            .expect("should apply changes");

        assert_eq!(
            proto_array.find_head(&root(1), epoch(1), epoch(0)),
            Ok(root(1))
        );
    }

    #[test]
    fn head_is_deepest_viable_node_on_best_path() {
        let mut proto_array = anchored();
        add_block(&mut proto_array, 8, 1, 0);
        add_block(&mut proto_array, 9, 2, 1);

        // The best-child links were set while every block was viable.
        assert_eq!(head(&proto_array), root(2));
        assert_eq!(
            proto_array.find_head(&root(0), epoch(1), epoch(0)),
            Ok(root(0))
        );
    }

    #[test]
    fn genesis_epoch_blocks_are_always_viable() {
        let mut proto_array = anchored();
        add_justified_block(&mut proto_array, 3, 1, 0, 5);
        add_justified_block(&mut proto_array, 8, 2, 0, 5);

        proto_array
            .apply_score_changes(vec![0; 3], epoch(1), epoch(0))
            .expect("should apply changes");

        // Block 2 has the greater root but is outside the genesis epoch.
        assert_eq!(
            proto_array.find_head(&root(0), epoch(1), epoch(0)),
            Ok(root(1))
        );
    }

    #[test]
    fn unknown_justified_root() {
        let proto_array = anchored();

        assert_eq!(
            proto_array.find_head(&root(7), epoch(0), epoch(0)),
            Err(Error::JustifiedNodeUnknown(root(7)))
        );
    }

    #[test]
    fn unknown_parent_leaves_array_unchanged() {
        let mut proto_array = anchored();
        add_block(&mut proto_array, 1, 1, 0);
        let before = proto_array.clone();

        let result = proto_array.on_block(
            Slot::new(2),
            root(3),
            root(2),
            Hash256::zero(),
            epoch(0),
            epoch(0),
        );

        assert_eq!(
            result,
            Err(Error::UnknownParent {
                block_root: root(3),
                parent_root: root(2),
            })
        );
        assert_eq!(proto_array, before);
    }

    #[test]
    fn duplicate_block_is_ignored() {
        let mut proto_array = anchored();
        add_block(&mut proto_array, 1, 1, 0);
        add_block(&mut proto_array, 5, 1, 0);

        assert_eq!(proto_array.nodes.len(), 2);
        assert_eq!(
            proto_array.get_node(&root(1)).map(|node| node.slot),
            Some(Slot::new(1))
        );
    }

    #[test]
    fn invalid_delta_len() {
        let mut proto_array = anchored();
        add_block(&mut proto_array, 1, 1, 0);

        assert_eq!(
            proto_array.apply_score_changes(vec![0; 3], epoch(0), epoch(0)),
            Err(Error::InvalidDeltaLen {
                deltas: 3,
                indices: 2,
            })
        );
    }

    #[test]
    fn negative_weight_is_rejected() {
        let mut proto_array = anchored();

        assert_eq!(
            proto_array.apply_score_changes(vec![-1], epoch(0), epoch(0)),
            Err(Error::DeltaOverflow(0))
        );
    }

    #[test]
    fn failed_score_change_changes_nothing() {
        let mut proto_array = anchored();
        add_block(&mut proto_array, 1, 1, 0);
        add_block(&mut proto_array, 1, 2, 0);
        let before = proto_array.clone();

        // Block 2 is visited first and would succeed, block 1 underflows.
        let changes = deltas(&proto_array, &[(1, -5), (2, 10)]);

        assert_eq!(
            proto_array.apply_score_changes(changes, epoch(1), epoch(1)),
            Err(Error::DeltaOverflow(1))
        );
        assert_eq!(proto_array, before);
    }

    #[test]
    fn parents_precede_children() {
        let mut rng = StdRng::seed_from_u64(42);
        let proto_array = random_tree(&mut rng, 256);

        for (index, node) in proto_array.nodes.iter().enumerate() {
            if let Some(parent) = node.parent {
                assert!(parent < index, "parent of node {} is at {}", index, parent);
            }
            assert_eq!(proto_array.get_index(&node.root), Some(index));
        }
    }

    #[test]
    fn weights_are_subtree_sums_and_head_is_greedy() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut proto_array = random_tree(&mut rng, 128);
        let len = proto_array.nodes.len();

        let votes: Vec<u64> = (0..len).map(|_| rng.gen_range(0..1_000)).collect();
        proto_array
            .apply_score_changes(
                votes.iter().map(|vote| *vote as i64).collect(),
                epoch(0),
                epoch(0),
            )
            .expect("should apply changes");

        let mut expected = votes.clone();
        for index in (0..len).rev() {
            if let Some(parent) = proto_array.nodes[index].parent {
                expected[parent] += expected[index];
            }
        }
        for (node, weight) in proto_array.nodes.iter().zip(expected) {
            assert_eq!(node.weight, weight);
        }

        // Descend through the heaviest child, breaking ties by root.
        let mut expected_head = 0;
        loop {
            let best_child = proto_array
                .nodes
                .iter()
                .enumerate()
                .filter(|(_, node)| node.parent == Some(expected_head))
                .max_by_key(|(_, node)| (node.weight, node.root));
            match best_child {
                Some((index, _)) => expected_head = index,
                None => break,
            }
        }

        assert_eq!(head(&proto_array), proto_array.nodes[expected_head].root);
    }

    #[test]
    fn proposer_weighting_round_trip_is_exact() {
        let mut rng = StdRng::seed_from_u64(1337);
        let mut proto_array = random_tree(&mut rng, 64);
        let len = proto_array.nodes.len();

        let changes = (0..len).map(|_| rng.gen_range(0..100)).collect();
        proto_array
            .apply_score_changes(changes, epoch(0), epoch(0))
            .expect("should apply changes");

        for _ in 0..16 {
            let before = proto_array.clone();
            let target = root(rng.gen_range(0..len as u64));
            let weighting = ProposerWeighting::new(target, rng.gen_range(1..10_000));

            proto_array
                .apply_proposer_weighting(&weighting)
                .expect("should apply weighting");
            proto_array
                .reverse_proposer_weighting(&weighting)
                .expect("should reverse weighting");

            assert_eq!(proto_array, before);
        }
    }

    #[test]
    fn prune_rewrites_indices() {
        // 0 -> 1 -> 2 -> 3, with a fork 0 -> 4.
        let mut proto_array = anchored();
        add_block(&mut proto_array, 1, 1, 0);
        add_block(&mut proto_array, 2, 2, 1);
        add_block(&mut proto_array, 3, 3, 2);
        add_block(&mut proto_array, 1, 4, 0);

        let changes = deltas(&proto_array, &[(3, 7), (4, 2)]);
        proto_array
            .apply_score_changes(changes, epoch(0), epoch(0))
            .expect("should apply changes");

        proto_array.prune_threshold = 1;
        proto_array.maybe_prune(root(2)).expect("should prune");

        assert_eq!(proto_array.nodes.len(), 3);
        assert_eq!(proto_array.indices.len(), 3);
        assert_eq!(proto_array.get_index(&root(0)), None);
        assert_eq!(proto_array.get_index(&root(1)), None);
        assert_eq!(proto_array.get_index(&root(2)), Some(0));
        assert_eq!(proto_array.get_index(&root(3)), Some(1));
        assert_eq!(proto_array.get_index(&root(4)), Some(2));

        let finalized = &proto_array.nodes[0];
        assert_eq!(finalized.parent, None);
        assert_eq!(finalized.best_child, Some(1));
        assert_eq!(finalized.best_descendant, Some(1));
        assert_eq!(finalized.weight, 7);
        assert_eq!(proto_array.nodes[1].parent, Some(0));

        // The fork survives without its pruned parent.
        let fork = &proto_array.nodes[2];
        assert_eq!(fork.parent, None);
        assert_eq!(fork.weight, 2);

        assert_eq!(
            proto_array.find_head(&root(2), epoch(0), epoch(0)),
            Ok(root(3))
        );

        // Blocks may still be built on the fork.
        add_block(&mut proto_array, 2, 5, 4);
        assert_eq!(proto_array.get_index(&root(5)), Some(3));
        assert_eq!(proto_array.nodes[3].parent, Some(2));
        assert_eq!(
            proto_array.find_head(&root(2), epoch(0), epoch(0)),
            Ok(root(3))
        );
    }

    #[test]
    fn prune_unknown_root_changes_nothing() {
        let mut proto_array = anchored();
        add_block(&mut proto_array, 1, 1, 0);
        proto_array.prune_threshold = 0;
        let before = proto_array.clone();

        assert_eq!(
            proto_array.maybe_prune(root(5)),
            Err(Error::PruneTargetNotFound(root(5)))
        );
        assert_eq!(proto_array, before);
    }

    #[test]
    fn prune_below_threshold_is_noop() {
        let mut proto_array = anchored();
        add_block(&mut proto_array, 1, 1, 0);
        add_block(&mut proto_array, 2, 2, 1);
        let before = proto_array.clone();

        proto_array.maybe_prune(root(2)).expect("should not error");

        assert_eq!(proto_array, before);
    }

    #[test]
    fn descendants_and_heads() {
        let mut proto_array = anchored();
        add_block(&mut proto_array, 1, 1, 0);
        add_block(&mut proto_array, 2, 2, 1);
        add_block(&mut proto_array, 3, 3, 2);
        add_block(&mut proto_array, 1, 4, 0);

        assert!(proto_array.is_descendant(root(0), root(3)));
        assert!(proto_array.is_descendant(root(3), root(3)));
        assert!(!proto_array.is_descendant(root(3), root(0)));
        assert!(!proto_array.is_descendant(root(1), root(4)));
        assert!(!proto_array.is_descendant(root(9), root(3)));

        assert_eq!(proto_array.heads(), vec![root(3), root(4)]);
        assert_eq!(
            proto_array
                .iter_block_roots(&root(3))
                .map(|(root, _)| root)
                .collect::<Vec<_>>(),
            vec![root(3), root(2), root(1), root(0)]
        );
    }

    #[test]
    fn proposer_boost_calculation() {
        let balances = vec![32; 64];
        assert_eq!(calculate_proposer_boost(&balances, 8, 40), Some(102));

        // Zero balances are inactive validators.
        let mut with_inactive = balances.clone();
        with_inactive.extend([0; 64]);
        assert_eq!(calculate_proposer_boost(&with_inactive, 8, 40), Some(102));

        assert_eq!(calculate_proposer_boost(&[], 8, 40), None);
        assert_eq!(calculate_proposer_boost(&balances, 0, 40), None);
    }

    #[test]
    fn score_changes_are_additive() {
        let mut rng = StdRng::seed_from_u64(99);
        let mut split = random_tree(&mut rng, 64);
        let len = split.nodes.len();

        let first: Vec<i64> = (0..len).map(|_| rng.gen_range(0..50)).collect();
        let second: Vec<i64> = first
            .iter()
            .map(|delta| rng.gen_range(0..10) - delta / 2)
            .collect();
        let summed = first.iter().zip(&second).map(|(a, b)| a + b).collect();

        let mut combined = split.clone();
        combined
            .apply_score_changes(summed, epoch(0), epoch(0))
            .expect("should apply summed changes");

        split
            .apply_score_changes(first, epoch(0), epoch(0))
            .expect("should apply first changes");
        split
            .apply_score_changes(second, epoch(0), epoch(0))
            .expect("should apply second changes");

        assert_eq!(split, combined);
    }

    #[test]
    fn larger_proposer_weighting_takes_the_head() {
        let mut proto_array = anchored();
        add_block(&mut proto_array, 1, 1, 0);
        add_block(&mut proto_array, 1, 2, 0);

        proto_array
            .apply_proposer_weighting(&ProposerWeighting::new(root(1), 80))
            .expect("should apply weighting");
        assert_eq!(head(&proto_array), root(1));

        proto_array
            .apply_proposer_weighting(&ProposerWeighting::new(root(2), 500))
            .expect("should apply weighting");
        assert_eq!(head(&proto_array), root(2));
        assert_eq!(proto_array.get_weight(&root(0)), Some(580));
    }

    #[test]
    fn head_descends_from_justified_root() {
        let mut rng = StdRng::seed_from_u64(2024);
        let mut proto_array = random_tree(&mut rng, 128);
        let len = proto_array.nodes.len();

        let changes = (0..len).map(|_| rng.gen_range(0..100)).collect();
        proto_array
            .apply_score_changes(changes, epoch(0), epoch(0))
            .expect("should apply changes");

        for _ in 0..32 {
            let justified_root = root(rng.gen_range(0..len as u64));
            let head = proto_array
                .find_head(&justified_root, epoch(0), epoch(0))
                .expect("should find head");

            assert!(proto_array.is_descendant(justified_root, head));
            assert_eq!(
                proto_array.get_node(&head).and_then(|node| node.best_child),
                None,
                "the head should be a leaf when every block is viable"
            );
        }
    }
}
