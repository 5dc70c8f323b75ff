//! Capability registry: slot allocation
//!
//! Issues opaque slot handles scoped to one container. Allocation is a
//! monotonic counter; descriptions are diagnostic labels only and are
//! never unique or used for lookup.

use weft_types::{ContainerId, Slot, SlotId};

pub(crate) struct SlotRegistry {
    container: ContainerId,
    issued: Vec<Slot>,
}

impl SlotRegistry {
    pub(crate) fn new(container: ContainerId) -> Self {
        Self {
            container,
            issued: Vec::new(),
        }
    }

    pub(crate) fn issue(&mut self, description: Option<&str>) -> Slot {
        let id = SlotId::new(self.issued.len() as u64);
        let slot = Slot::issued(self.container, id, description);
        self.issued.push(slot.clone());
        slot
    }

    /// All slots issued by this registry, in allocation order.
    pub(crate) fn all(&self) -> &[Slot] {
        &self.issued
    }

    /// True iff this exact slot was issued here.
    pub(crate) fn owns(&self, slot: &Slot) -> bool {
        slot.container() == self.container && (slot.id().index() as usize) < self.issued.len()
    }

    /// Diagnostic label for a slot id, `"?"` when unknown.
    pub(crate) fn label_of(&self, id: SlotId) -> String {
        self.issued
            .get(id.index() as usize)
            .map(|s| s.label())
            .unwrap_or_else(|| "?".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issued_slots_are_unique() {
        let mut registry = SlotRegistry::new(ContainerId::new());
        let a = registry.issue(None);
        let b = registry.issue(None);
        assert_ne!(a, b);
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_descriptions_do_not_collide() {
        let mut registry = SlotRegistry::new(ContainerId::new());
        let a = registry.issue(Some("draw"));
        let b = registry.issue(Some("draw"));
        assert_ne!(a, b);
        assert_eq!(a.description(), Some("draw"));
        assert_eq!(b.description(), Some("draw"));
    }

    #[test]
    fn test_owns_rejects_foreign_slots() {
        let mut ours = SlotRegistry::new(ContainerId::new());
        let mut theirs = SlotRegistry::new(ContainerId::new());
        let local = ours.issue(None);
        let foreign = theirs.issue(None);
        assert!(ours.owns(&local));
        assert!(!ours.owns(&foreign));
    }

    #[test]
    fn test_all_preserves_allocation_order() {
        let mut registry = SlotRegistry::new(ContainerId::new());
        let a = registry.issue(Some("a"));
        let b = registry.issue(Some("b"));
        assert_eq!(registry.all(), &[a, b]);
    }
}
