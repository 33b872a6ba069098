//! The `Slot` and `Epoch` types are defined as new types over u64 to enforce type-safety between
//! the two types.
//!
//! `Slot` and `Epoch` have implementations which permit conversion, comparison and math operations
//! between each and `u64`, however specifically not between each other.
//!
//! All math operations on `Slot` and `Epoch` are saturating, they never wrap.
use serde_derive::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, AddAssign, Sub, SubAssign};

#[derive(Eq, Debug, Clone, Copy, Default, Hash, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Slot(u64);

#[derive(Eq, Debug, Clone, Copy, Default, Hash, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Epoch(u64);

impl_from_into_u64!(Slot);
impl_math_between!(Slot, Slot);
impl_math_between!(Slot, u64);
impl_display!(Slot);

impl_from_into_u64!(Epoch);
impl_math_between!(Epoch, Epoch);
impl_math_between!(Epoch, u64);
impl_display!(Epoch);

impl Slot {
    /// Returns the epoch containing this slot.
    ///
    /// `slots_per_epoch` must not be zero.
    pub fn epoch(self, slots_per_epoch: u64) -> Epoch {
        Epoch::from(self.0 / slots_per_epoch)
    }
}
