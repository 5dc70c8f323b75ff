//! Trait store: declaration, normalization, and validation
//!
//! A trait bundles slot implementations behind a gate: either a value
//! predicate, a set of required slots, or no gate at all (explicit
//! application only). Declarations are validated against the issuing
//! container's registry before they ever reach the dependency graph.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use weft_types::{ContainerId, Slot, SlotId, TraitId, Value, WeftError, WeftResult};

use crate::dispatch::{Facade, SlotFn};
use crate::slots::SlotRegistry;

/// A value predicate gating a trait.
pub type Predicate = Rc<dyn Fn(&Value) -> bool>;

/// What a trait demands before it applies.
#[derive(Clone)]
pub enum Requirement {
    /// No gate: the resolver never auto-matches this trait; it can only
    /// be applied explicitly.
    None,
    /// Gated by a direct test on the raw value.
    Predicate(Predicate),
    /// Gated by other slots already being resolved on the item.
    Slots(Vec<Slot>),
}

impl fmt::Debug for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Requirement::None => f.write_str("None"),
            Requirement::Predicate(_) => f.write_str("Predicate(..)"),
            Requirement::Slots(slots) => f.debug_tuple("Slots").field(slots).finish(),
        }
    }
}

/// Builder for a trait declaration, consumed by
/// [`Container::define_trait`](crate::Container::define_trait).
#[derive(Default)]
pub struct TraitSpec {
    description: Option<String>,
    requirement: Option<Requirement>,
    provides: Vec<(Slot, SlotFn)>,
}

impl TraitSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Diagnostic label for the trait.
    pub fn describe(mut self, text: impl Into<String>) -> Self {
        self.description = Some(text.into());
        self
    }

    /// Gate the trait on a value predicate.
    ///
    /// A trait carries exactly one gate; setting a gate replaces any
    /// gate set earlier on this builder.
    pub fn when(mut self, predicate: impl Fn(&Value) -> bool + 'static) -> Self {
        self.requirement = Some(Requirement::Predicate(Rc::new(predicate)));
        self
    }

    /// Gate the trait on other slots being resolved first.
    ///
    /// A trait carries exactly one gate; setting a gate replaces any
    /// gate set earlier on this builder.
    pub fn requires(mut self, slots: &[Slot]) -> Self {
        self.requirement = Some(Requirement::Slots(slots.to_vec()));
        self
    }

    /// Add a provided slot with its implementation. Order is preserved.
    pub fn provide(
        mut self,
        slot: &Slot,
        implementation: impl Fn(&Facade) -> WeftResult<Value> + 'static,
    ) -> Self {
        self.provides.push((slot.clone(), Rc::new(implementation)));
        self
    }

    /// Validate against the registry and build the trait record.
    pub(crate) fn build(
        self,
        registry: &SlotRegistry,
        container: ContainerId,
        id: TraitId,
    ) -> WeftResult<TraitRef> {
        let requirement = self.requirement.unwrap_or(Requirement::None);

        if let Requirement::Slots(required) = &requirement {
            for slot in required {
                if !registry.owns(slot) {
                    return Err(WeftError::InvalidSlot { slot: slot.label() });
                }
            }
        }

        let mut provides = Vec::with_capacity(self.provides.len());
        let mut impls = HashMap::with_capacity(self.provides.len());
        for (slot, implementation) in self.provides {
            if !registry.owns(&slot) {
                return Err(WeftError::InvalidSlot { slot: slot.label() });
            }
            impls.insert(slot.id(), implementation);
            provides.push(slot);
        }

        Ok(TraitRef(Rc::new(TraitInner {
            id,
            container,
            description: self.description.map(|d| Rc::from(d.as_str())),
            requirement,
            provides,
            impls,
        })))
    }
}

pub(crate) struct TraitInner {
    id: TraitId,
    container: ContainerId,
    description: Option<Rc<str>>,
    requirement: Requirement,
    provides: Vec<Slot>,
    impls: HashMap<SlotId, SlotFn>,
}

/// Cheap-clone handle of a registered trait. Equality is identity.
#[derive(Clone)]
pub struct TraitRef(Rc<TraitInner>);

impl TraitRef {
    pub fn id(&self) -> TraitId {
        self.0.id
    }

    pub fn container(&self) -> ContainerId {
        self.0.container
    }

    pub fn description(&self) -> Option<&str> {
        self.0.description.as_deref()
    }

    /// Slots this trait provides, in declaration order.
    pub fn provides(&self) -> &[Slot] {
        &self.0.provides
    }

    pub fn requires(&self) -> &Requirement {
        &self.0.requirement
    }

    pub fn is_predicate(&self) -> bool {
        matches!(self.0.requirement, Requirement::Predicate(_))
    }

    pub fn is_slot_based(&self) -> bool {
        matches!(self.0.requirement, Requirement::Slots(_))
    }

    /// True iff this is a predicate trait whose predicate accepts the
    /// raw value. Slot-based and ungated traits never auto-match.
    pub(crate) fn matches(&self, value: &Value) -> bool {
        match &self.0.requirement {
            Requirement::Predicate(predicate) => predicate(value),
            _ => false,
        }
    }

    pub(crate) fn impls(&self) -> &HashMap<SlotId, SlotFn> {
        &self.0.impls
    }
}

impl PartialEq for TraitRef {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for TraitRef {}

impl fmt::Debug for TraitRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TraitRef")
            .field("id", &self.0.id)
            .field("description", &self.0.description)
            .field("requirement", &self.0.requirement)
            .field(
                "provides",
                &self.0.provides.iter().map(|s| s.label()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weft_types::ValueKind;

    fn registry() -> (SlotRegistry, ContainerId) {
        let id = ContainerId::new();
        (SlotRegistry::new(id), id)
    }

    #[test]
    fn test_build_predicate_trait() {
        let (mut registry, container) = registry();
        let slot = registry.issue(Some("draw"));

        let spec = TraitSpec::new()
            .when(|v| v.kind() == ValueKind::List)
            .provide(&slot, |_| Ok(Value::from("drawn")));
        let built = spec.build(&registry, container, TraitId::new(0)).unwrap();

        assert!(built.is_predicate());
        assert_eq!(built.provides(), &[slot]);
        assert!(built.matches(&Value::list(vec![])));
        assert!(!built.matches(&Value::from(1)));
    }

    #[test]
    fn test_foreign_provided_slot_is_rejected() {
        let (mut ours, container) = registry();
        let (mut theirs, _) = registry();
        let _ = ours.issue(None);
        let foreign = theirs.issue(Some("draw"));

        let spec = TraitSpec::new().provide(&foreign, |_| Ok(Value::Null));
        let err = spec.build(&ours, container, TraitId::new(0)).unwrap_err();
        assert!(matches!(err, WeftError::InvalidSlot { .. }));
        assert!(err.detail().contains("add_slot"));
    }

    #[test]
    fn test_foreign_required_slot_is_rejected() {
        let (mut ours, container) = registry();
        let (mut theirs, _) = registry();
        let local = ours.issue(None);
        let foreign = theirs.issue(None);

        let spec = TraitSpec::new()
            .requires(std::slice::from_ref(&foreign))
            .provide(&local, |_| Ok(Value::Null));
        let err = spec.build(&ours, container, TraitId::new(0)).unwrap_err();
        assert!(matches!(err, WeftError::InvalidSlot { .. }));
    }

    #[test]
    fn test_later_gate_replaces_earlier() {
        let (mut registry, container) = registry();
        let base = registry.issue(Some("base"));
        let slot = registry.issue(None);

        let spec = TraitSpec::new()
            .when(|v| v.kind() == ValueKind::Int)
            .requires(std::slice::from_ref(&base))
            .provide(&slot, |_| Ok(Value::Null));
        let built = spec.build(&registry, container, TraitId::new(0)).unwrap();

        assert!(built.is_slot_based());
        assert!(!built.matches(&Value::from(1)));
    }

    #[test]
    fn test_ungated_trait_never_matches() {
        let (mut registry, container) = registry();
        let slot = registry.issue(None);

        let spec = TraitSpec::new().provide(&slot, |_| Ok(Value::Null));
        let built = spec.build(&registry, container, TraitId::new(0)).unwrap();

        assert!(matches!(built.requires(), Requirement::None));
        assert!(!built.matches(&Value::from(1)));
        assert!(!built.matches(&Value::Null));
    }
}
