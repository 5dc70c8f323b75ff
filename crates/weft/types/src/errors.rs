//! Error taxonomy
//!
//! Three failure classes cover the whole system: rejecting a malformed
//! trait declaration, rejecting a registration that would close a
//! dependency cycle, and failing a slot invocation that nothing
//! satisfies. All are synchronous and propagate immediately; nothing is
//! retried or swallowed.

use thiserror::Error;

use crate::value::ValueKind;

pub type WeftResult<T> = Result<T, WeftError>;

#[derive(Debug, Error)]
pub enum WeftError {
    /// A slot referenced in a trait declaration was not issued by the
    /// registering container.
    #[error("invalid slot: \"{slot}\" was not issued by this container")]
    InvalidSlot { slot: String },

    /// Committing a trait's requirement edges would create a cycle in
    /// the dependency graph. Nothing was registered.
    #[error("circular dependency: trait requirements form a cycle")]
    CircularDependency,

    /// A slot invocation found no applicable implementation.
    #[error("slot \"{slot}\" not implemented for value: {value}")]
    SlotNotImplemented {
        slot: String,
        value: String,
        /// Labels of the slots currently resolved on the item.
        available: Vec<String>,
        /// Whether any predicate trait matched the value at all. False
        /// means no traits matched; true means traits matched but never
        /// reached this slot.
        traits_matched: bool,
    },

    /// A native operation was forwarded to a value whose kind does not
    /// support it.
    #[error("operation \"{op}\" not supported for {kind} value")]
    UnsupportedOperation { op: String, kind: ValueKind },
}

impl WeftError {
    /// Multi-line diagnostic context, kept out of the one-line message.
    pub fn detail(&self) -> String {
        match self {
            WeftError::InvalidSlot { .. } => {
                "  A slot must be created with add_slot() or add_slot_with_description()"
                    .to_string()
            }
            WeftError::SlotNotImplemented {
                available,
                traits_matched,
                ..
            } => {
                let listed = if available.is_empty() {
                    "none".to_string()
                } else {
                    available.join(", ")
                };
                let resolution = if *traits_matched {
                    "traits matched but did not provide the slot"
                } else {
                    "no traits matched"
                };
                format!(
                    "  Available slots on this item: [{listed}]\n  Trait resolution: {resolution}"
                )
            }
            _ => String::new(),
        }
    }
}
