//! weft-engine: the capability resolution engine
//!
//! Values dynamically acquire named behaviors (slots) through composable
//! capability implementations (traits), without modifying the value's
//! own definition. A [`Container`] issues slots, validates and registers
//! traits against an acyclic dependency graph, searches trait
//! compositions breadth-first when a slot is invoked, and dispatches
//! through a per-item [`Facade`] that otherwise behaves like the
//! underlying value.
//!
//! ```
//! use weft_engine::{Container, TraitSpec};
//! use weft_types::{Value, ValueKind};
//!
//! let container = Container::new();
//! let greet = container.add_slot_with_description("greet");
//!
//! container
//!     .define_trait(
//!         TraitSpec::new()
//!             .when(|v| v.kind() == ValueKind::Str)
//!             .provide(&greet, |facade| facade.to_upper()),
//!     )
//!     .unwrap();
//!
//! assert_eq!(
//!     container.invoke(&greet, "hello").unwrap(),
//!     Value::from("HELLO")
//! );
//! ```

#![deny(unsafe_code)]

mod container;
mod dispatch;
mod items;
mod resolver;
mod slots;
mod traits;

pub use container::Container;
pub use dispatch::{Facade, NativeOp, SlotFn};
pub use resolver::Path;
pub use traits::{Predicate, Requirement, TraitRef, TraitSpec};

pub use weft_types::{
    ContainerId, ItemId, NativeFn, Slot, SlotId, TraitId, Value, ValueKind, WeftError, WeftResult,
};
