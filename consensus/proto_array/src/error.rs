use types::Hash256;

#[derive(Clone, PartialEq, Debug)]
pub enum Error {
    /// A block was imported whose parent is not known to fork choice.
    ///
    /// The caller should defer the block until the parent has been imported.
    UnknownParent {
        block_root: Hash256,
        parent_root: Hash256,
    },
    /// A lookup was made against a root that is not known to fork choice. Never fatal.
    UnknownBlockRoot(Hash256),
    /// A prune was requested against a finalized root that is not known to fork choice. No
    /// changes were made.
    PruneTargetNotFound(Hash256),
    JustifiedNodeUnknown(Hash256),
    /// The `ForkChoiceConfig` given at construction is unusable.
    InvalidConfig(String),
    InvalidNodeIndex(usize),
    InvalidJustifiedIndex(usize),
    InvalidBestChild(usize),
    InvalidBestDescendant(usize),
    InvalidParentDelta(usize),
    InvalidNodeDelta(usize),
    DeltaOverflow(usize),
    IndexOverflow(&'static str),
    InvalidDeltaLen {
        deltas: usize,
        indices: usize,
    },
}
