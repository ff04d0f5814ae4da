//! Ten-slot clipboard store

mod store;

pub use store::{SlotOutcome, SlotStore};
