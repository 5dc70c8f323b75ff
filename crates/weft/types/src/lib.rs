//! weft-types: shared vocabulary of the weft capability system
//!
//! Defines the dynamic [`Value`] representation, the identifier types
//! for containers, slots, traits, and items, and the error taxonomy.
//! Everything here is container-independent; the engine crate builds the
//! registries, the resolver, and the dispatch layer on top.

#![deny(unsafe_code)]

mod errors;
mod identity;
mod value;

pub use errors::{WeftError, WeftResult};
pub use identity::{ContainerId, ItemId, Slot, SlotId, TraitId};
pub use value::{NativeFn, Value, ValueKind};
