//! Capability identifiers
//!
//! Slots, traits, and items are addressed by small per-container handles
//! issued by monotonic allocators. Containers themselves carry a random
//! id so that a handle from one container is never mistaken for a handle
//! from another.

use std::fmt;
use std::rc::Rc;

use uuid::Uuid;

/// Identity of a single container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContainerId(Uuid);

impl ContainerId {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "container:{}", self.0.simple())
    }
}

/// Per-container handle of a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotId(u64);

impl SlotId {
    pub fn new(index: u64) -> Self {
        Self(index)
    }

    pub fn index(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "slot#{}", self.0)
    }
}

/// Per-container handle of a registered trait.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TraitId(u64);

impl TraitId {
    pub fn new(index: u64) -> Self {
        Self(index)
    }

    pub fn index(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TraitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "trait#{}", self.0)
    }
}

/// Handle of a wrapped value inside one container's item store.
///
/// Carries the owning container's id so a facade handed to a different
/// container is detected instead of silently aliasing an unrelated item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ItemId {
    container: ContainerId,
    index: u32,
}

impl ItemId {
    pub fn new(container: ContainerId, index: u32) -> Self {
        Self { container, index }
    }

    pub fn container(&self) -> ContainerId {
        self.container
    }

    pub fn index(&self) -> u32 {
        self.index
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "item#{}", self.index)
    }
}

/// An opaque capability identifier issued by a container's registry.
///
/// Equality is identity: the issuing container plus the allocated handle.
/// The description is a diagnostic label and never participates in
/// equality or lookup.
#[derive(Debug, Clone)]
pub struct Slot {
    id: SlotId,
    container: ContainerId,
    description: Option<Rc<str>>,
}

impl Slot {
    /// Build a slot record. Not part of the public API: only a
    /// container's registry issues slots.
    #[doc(hidden)]
    pub fn issued(container: ContainerId, id: SlotId, description: Option<&str>) -> Self {
        Self {
            id,
            container,
            description: description.map(Rc::from),
        }
    }

    pub fn id(&self) -> SlotId {
        self.id
    }

    pub fn container(&self) -> ContainerId {
        self.container
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Diagnostic label: the description when present, the raw handle
    /// otherwise.
    pub fn label(&self) -> String {
        match &self.description {
            Some(d) => d.to_string(),
            None => self.id.to_string(),
        }
    }
}

impl PartialEq for Slot {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.container == other.container
    }
}

impl Eq for Slot {}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}
