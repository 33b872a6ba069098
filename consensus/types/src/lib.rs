//! Primitive types shared by the fork choice crates.

#[macro_use]
mod slot_epoch_macros;
mod checkpoint;
mod slot_epoch;

pub use crate::checkpoint::Checkpoint;
pub use crate::slot_epoch::{Epoch, Slot};

pub type Hash256 = ethereum_types::H256;
