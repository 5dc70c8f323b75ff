//! Container: the composition root
//!
//! A container owns one slot registry, one trait store and resolver, one
//! item store, and one default trait. Operations hold the interior
//! borrow only while touching container state and always release it
//! before invoking user closures (predicates, slot implementations), so
//! re-entrant container use from inside an implementation is supported.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use tracing::debug;
use weft_types::{ContainerId, ItemId, Slot, SlotId, Value, WeftError, WeftResult};

use crate::dispatch::{Facade, SlotFn};
use crate::items::{ItemKind, ItemStore};
use crate::resolver::{self, Path, Resolver};
use crate::slots::SlotRegistry;
use crate::traits::{TraitRef, TraitSpec};

struct ContainerInner {
    registry: SlotRegistry,
    resolver: Resolver,
    items: ItemStore,
    default_trait: HashMap<SlotId, SlotFn>,
}

/// Cheap-clone handle of one capability container.
#[derive(Clone)]
pub struct Container {
    id: ContainerId,
    inner: Rc<RefCell<ContainerInner>>,
}

impl Container {
    pub fn new() -> Self {
        let id = ContainerId::new();
        Self {
            id,
            inner: Rc::new(RefCell::new(ContainerInner {
                registry: SlotRegistry::new(id),
                resolver: Resolver::new(),
                items: ItemStore::new(id),
                default_trait: HashMap::new(),
            })),
        }
    }

    pub fn id(&self) -> ContainerId {
        self.id
    }

    /// Allocate a fresh anonymous slot.
    pub fn add_slot(&self) -> Slot {
        self.inner.borrow_mut().registry.issue(None)
    }

    /// Allocate a fresh slot with a diagnostic label. Labels are not
    /// unique and never participate in equality.
    pub fn add_slot_with_description(&self, description: &str) -> Slot {
        self.inner.borrow_mut().registry.issue(Some(description))
    }

    /// All slots issued by this container, in allocation order.
    pub fn slots(&self) -> Vec<Slot> {
        self.inner.borrow().registry.all().to_vec()
    }

    /// Validate, build, and register a trait. All-or-nothing: a slot
    /// from another container or a requirement cycle leaves the
    /// container unchanged.
    pub fn define_trait(&self, spec: TraitSpec) -> WeftResult<TraitRef> {
        let mut inner = self.inner.borrow_mut();
        let id = inner.resolver.allocate_id();
        let built = spec.build(&inner.registry, self.id, id)?;
        inner.resolver.register(built.clone())?;
        Ok(built)
    }

    /// Registered traits in registration order.
    pub fn traits(&self) -> Vec<TraitRef> {
        self.inner.borrow().resolver.traits().to_vec()
    }

    /// True iff some registered trait provides this slot, regardless of
    /// whether any value currently satisfies it.
    pub fn has_slot(&self, slot: &Slot) -> bool {
        slot.container() == self.id && self.inner.borrow().resolver.provides_slot(slot.id())
    }

    /// Add or replace a slot implementation in the default trait, the
    /// per-container last-resort mapping consulted when an item has no
    /// resolved implementation of its own.
    pub fn provide_default(
        &self,
        slot: &Slot,
        implementation: impl Fn(&Facade) -> WeftResult<Value> + 'static,
    ) -> WeftResult<()> {
        let mut inner = self.inner.borrow_mut();
        if !inner.registry.owns(slot) {
            return Err(WeftError::InvalidSlot { slot: slot.label() });
        }
        inner
            .default_trait
            .insert(slot.id(), Rc::new(implementation));
        Ok(())
    }

    /// Wrap a raw value in its dispatch facade, creating the item on
    /// first presentation.
    pub fn wrap(&self, value: impl Into<Value>) -> Facade {
        let id = self.inner.borrow_mut().items.ensure(value.into());
        Facade::new(self.clone(), id)
    }

    /// Invoke a slot on a value: ensure the item, lazily resolve and
    /// apply the first satisfying trait composition, then dispatch.
    pub fn invoke(&self, slot: &Slot, value: impl Into<Value>) -> WeftResult<Value> {
        let facade = self.wrap(value);
        let item = facade.id();

        // slot identity is (container, id); a foreign slot never
        // dispatches here even when its bare id collides with a local one
        if slot.container() != self.id {
            return Err(self.slot_not_implemented(slot, item, false));
        }

        let already_resolved = {
            let inner = self.inner.borrow();
            inner
                .items
                .get(item)
                .is_some_and(|i| i.custom_slots.contains_key(&slot.id()))
        };

        let mut traits_matched = false;
        if !already_resolved {
            // snapshot so user predicates run without a borrow held
            let traits = self.inner.borrow().resolver.traits().to_vec();
            let raw = facade.raw();
            let search = resolver::resolve_for(&traits, &raw, slot.id());
            traits_matched = search.matched;

            if let Some(first) = search.paths.into_iter().next() {
                debug!(
                    slot = %slot.label(),
                    item = %item,
                    traits = first.len(),
                    "applying resolved path"
                );
                self.apply_path(item, &first);
            }
        }

        match self.slot_impl(item, slot.id()) {
            Some(implementation) => implementation(&facade),
            None => Err(self.slot_not_implemented(slot, item, traits_matched)),
        }
    }

    /// Explicitly apply a trait to a value, overwriting any previously
    /// resolved implementations for the slots it provides.
    pub fn apply(&self, trait_ref: &TraitRef, value: impl Into<Value>) -> WeftResult<Value> {
        {
            let inner = self.inner.borrow();
            for slot in trait_ref.provides() {
                if !inner.registry.owns(slot) {
                    return Err(WeftError::InvalidSlot { slot: slot.label() });
                }
            }
        }

        let facade = self.wrap(value);
        let mut inner = self.inner.borrow_mut();
        if let Some(item) = inner.items.get_mut(facade.id()) {
            for (slot_id, implementation) in trait_ref.impls() {
                item.custom_slots.insert(*slot_id, implementation.clone());
            }
        }
        Ok(facade.to_value())
    }

    /// All trait compositions that would satisfy `slot` for this value,
    /// in breadth-first discovery order. Diagnostic surface; does not
    /// create an item or apply anything.
    pub fn resolve_paths(&self, slot: &Slot, value: &Value) -> Vec<Path> {
        if slot.container() != self.id {
            return Vec::new();
        }
        let traits = self.inner.borrow().resolver.traits().to_vec();
        resolver::resolve_for(&traits, value, slot.id()).paths
    }

    /// Unwrap a facade value back to its raw value; any other value
    /// passes through unchanged.
    pub fn unwrap_value(&self, value: &Value) -> Value {
        match value {
            Value::Item(id) if id.container() == self.id => self.raw_of(*id),
            other => other.clone(),
        }
    }

    fn apply_path(&self, item: ItemId, path: &[TraitRef]) {
        let mut inner = self.inner.borrow_mut();
        let Some(entry) = inner.items.get_mut(item) else {
            return;
        };
        for trait_ref in path {
            for (slot_id, implementation) in trait_ref.impls() {
                // first trait in the path wins per slot; explicit
                // applications done earlier are not overwritten either
                entry
                    .custom_slots
                    .entry(*slot_id)
                    .or_insert_with(|| implementation.clone());
            }
        }
    }

    fn slot_not_implemented(&self, slot: &Slot, item: ItemId, traits_matched: bool) -> WeftError {
        let inner = self.inner.borrow();
        let (value, available) = match inner.items.get(item) {
            Some(entry) => {
                let mut labels: Vec<String> = entry
                    .custom_slots
                    .keys()
                    .map(|id| inner.registry.label_of(*id))
                    .collect();
                labels.sort();
                (entry.value.to_string(), labels)
            }
            None => ("<unknown>".to_string(), Vec::new()),
        };
        WeftError::SlotNotImplemented {
            slot: slot.label(),
            value,
            available,
            traits_matched,
        }
    }

    pub(crate) fn raw_of(&self, item: ItemId) -> Value {
        self.inner
            .borrow()
            .items
            .get(item)
            .map(|entry| entry.value.clone())
            .unwrap_or(Value::Null)
    }

    pub(crate) fn kind_of(&self, item: ItemId) -> ItemKind {
        self.inner
            .borrow()
            .items
            .get(item)
            .map(|entry| entry.kind)
            .unwrap_or(ItemKind::Primitive)
    }

    pub(crate) fn slot_impl(&self, item: ItemId, slot: SlotId) -> Option<SlotFn> {
        let inner = self.inner.borrow();
        inner
            .items
            .get(item)
            .and_then(|entry| entry.custom_slots.get(&slot))
            .or_else(|| inner.default_trait.get(&slot))
            .cloned()
    }
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use weft_types::ValueKind;

    #[test]
    fn test_invoke_without_traits_fails() {
        let c = Container::new();
        let draw = c.add_slot_with_description("draw");
        let err = c.invoke(&draw, Value::from(42)).unwrap_err();
        match err {
            WeftError::SlotNotImplemented { traits_matched, .. } => assert!(!traits_matched),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_invoke_through_predicate_trait() {
        let c = Container::new();
        let draw = c.add_slot();
        c.define_trait(
            TraitSpec::new()
                .when(|v| v.kind() == ValueKind::Int)
                .provide(&draw, |facade| {
                    Ok(Value::from(format!("int {}", facade.raw())))
                }),
        )
        .unwrap();

        assert_eq!(c.invoke(&draw, 42).unwrap(), Value::from("int 42"));
    }

    #[test]
    fn test_matched_but_unreached_slot_reports_it() {
        let c = Container::new();
        let foo = c.add_slot();
        let bar = c.add_slot_with_description("bar");
        c.define_trait(
            TraitSpec::new()
                .when(|v| v.kind() == ValueKind::Int)
                .provide(&foo, |_| Ok(Value::from("number"))),
        )
        .unwrap();

        let err = c.invoke(&bar, 42).unwrap_err();
        match err {
            WeftError::SlotNotImplemented { traits_matched, .. } => assert!(traits_matched),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_resolution_happens_once_per_item() {
        let c = Container::new();
        let draw = c.add_slot();
        let calls = Rc::new(Cell::new(0));
        let seen = calls.clone();
        c.define_trait(
            TraitSpec::new()
                .when(move |v| {
                    seen.set(seen.get() + 1);
                    v.kind() == ValueKind::List
                })
                .provide(&draw, |_| Ok(Value::from("drawn"))),
        )
        .unwrap();

        let list = Value::list(vec![Value::from(1)]);
        c.invoke(&draw, list.clone()).unwrap();
        let after_first = calls.get();
        c.invoke(&draw, list).unwrap();
        // same item, slot already resolved: the predicate is not re-run
        assert_eq!(calls.get(), after_first);
    }

    #[test]
    fn test_default_trait_is_last_resort() {
        let c = Container::new();
        let draw = c.add_slot();
        c.provide_default(&draw, |_| Ok(Value::from("default")))
            .unwrap();
        c.define_trait(
            TraitSpec::new()
                .when(|v| v.kind() == ValueKind::Int)
                .provide(&draw, |_| Ok(Value::from("resolved"))),
        )
        .unwrap();

        // resolved trait wins for matching values
        assert_eq!(c.invoke(&draw, 1).unwrap(), Value::from("resolved"));
        // default applies when nothing matches
        assert_eq!(c.invoke(&draw, "x").unwrap(), Value::from("default"));
    }

    #[test]
    fn test_default_trait_dispatch_on_kind() {
        let c = Container::new();
        let kind_of = c.add_slot();
        c.provide_default(&kind_of, |facade| {
            Ok(match facade.kind() {
                ValueKind::List => Value::from("array"),
                ValueKind::Str => Value::from("string"),
                _ => Value::from("other"),
            })
        })
        .unwrap();

        assert_eq!(c.invoke(&kind_of, Value::list(vec![])).unwrap(), Value::from("array"));
        assert_eq!(c.invoke(&kind_of, "hello").unwrap(), Value::from("string"));
        assert_eq!(c.invoke(&kind_of, 3).unwrap(), Value::from("other"));
    }

    #[test]
    fn test_explicit_apply_last_wins() {
        let c = Container::new();
        let draw = c.add_slot();
        let v1 = c
            .define_trait(TraitSpec::new().provide(&draw, |_| Ok(Value::from("v1"))))
            .unwrap();
        let v2 = c
            .define_trait(TraitSpec::new().provide(&draw, |_| Ok(Value::from("v2"))))
            .unwrap();

        let obj = Value::list(vec![]);
        let facade = c.apply(&v1, obj).unwrap();
        let facade = c.apply(&v2, facade).unwrap();
        assert_eq!(c.invoke(&draw, facade).unwrap(), Value::from("v2"));
    }

    #[test]
    fn test_apply_composes_independent_traits() {
        let c = Container::new();
        let draw = c.add_slot();
        let click = c.add_slot();
        let drawable = c
            .define_trait(TraitSpec::new().provide(&draw, |_| Ok(Value::from("drawing"))))
            .unwrap();
        let clickable = c
            .define_trait(TraitSpec::new().provide(&click, |_| Ok(Value::from("clicking"))))
            .unwrap();

        let obj = Value::list(vec![]);
        let facade = c.apply(&drawable, obj).unwrap();
        let facade = c.apply(&clickable, facade).unwrap();

        assert_eq!(c.invoke(&draw, facade.clone()).unwrap(), Value::from("drawing"));
        assert_eq!(c.invoke(&click, facade).unwrap(), Value::from("clicking"));
    }

    #[test]
    fn test_explicit_apply_beats_resolved_path() {
        let c = Container::new();
        let draw = c.add_slot();
        c.define_trait(
            TraitSpec::new()
                .when(|v| v.kind() == ValueKind::List)
                .provide(&draw, |_| Ok(Value::from("auto"))),
        )
        .unwrap();
        let custom = c
            .define_trait(TraitSpec::new().provide(&draw, |_| Ok(Value::from("custom"))))
            .unwrap();

        let list = Value::list(vec![]);
        let facade = c.apply(&custom, list).unwrap();
        assert_eq!(c.invoke(&draw, facade).unwrap(), Value::from("custom"));
    }

    #[test]
    fn test_has_slot() {
        let c = Container::new();
        let other = Container::new();
        let foo = c.add_slot();
        assert!(!c.has_slot(&foo));

        c.define_trait(
            TraitSpec::new()
                .when(|v| v.kind() == ValueKind::List)
                .provide(&foo, |_| Ok(Value::Null)),
        )
        .unwrap();
        assert!(c.has_slot(&foo));
        assert!(!other.has_slot(&foo));
    }

    #[test]
    fn test_primitive_delegation_through_facade() {
        let c = Container::new();
        let upper = c.add_slot();
        c.provide_default(&upper, |facade| facade.to_upper()).unwrap();
        assert_eq!(c.invoke(&upper, "hello").unwrap(), Value::from("HELLO"));
    }

    #[test]
    fn test_length_delegates_for_strings_and_lists() {
        let c = Container::new();
        let length = c.add_slot();
        c.provide_default(&length, |facade| facade.len()).unwrap();
        assert_eq!(c.invoke(&length, "hello").unwrap(), Value::from(5));
        let list = Value::list(vec![Value::from(1), Value::from(2), Value::from(3)]);
        assert_eq!(c.invoke(&length, list).unwrap(), Value::from(3));
    }

    #[test]
    fn test_numeric_coercion_through_facade() {
        let c = Container::new();
        let add_ten = c.add_slot();
        c.provide_default(&add_ten, |facade| {
            Ok(Value::Int(facade.as_int().unwrap_or(0) + 10))
        })
        .unwrap();
        assert_eq!(c.invoke(&add_ten, 5).unwrap(), Value::from(15));
    }

    #[test]
    fn test_facade_iteration_sees_original_structure() {
        let c = Container::new();
        let identity = c.add_slot();
        c.define_trait(
            TraitSpec::new()
                .when(|v| v.kind() == ValueKind::List)
                .provide(&identity, |facade| Ok(facade.to_value())),
        )
        .unwrap();

        let list = Value::list(vec![Value::from(1), Value::from(2), Value::from(3)]);
        let wrapped = c.invoke(&identity, list.clone()).unwrap();
        let elements = c.wrap(wrapped).elements().unwrap();
        assert_eq!(elements, list);
    }

    #[test]
    fn test_unwrap_value_round_trip() {
        let c = Container::new();
        let list = Value::list(vec![Value::from(1)]);
        let facade = c.wrap(list.clone());
        let unwrapped = c.unwrap_value(&facade.to_value());
        assert!(unwrapped.same(&list));
    }

    #[test]
    fn test_foreign_slot_never_resolves() {
        let c = Container::new();
        let other = Container::new();
        let foreign = other.add_slot_with_description("foreign");
        let err = c.invoke(&foreign, 1).unwrap_err();
        assert!(matches!(err, WeftError::SlotNotImplemented { .. }));
    }

    #[test]
    fn test_foreign_slot_with_colliding_id_never_dispatches() {
        let c = Container::new();
        let other = Container::new();
        // both are slot#0 in their own container
        let local = c.add_slot();
        let foreign = other.add_slot();
        assert_eq!(local.id(), foreign.id());
        assert_ne!(local, foreign);

        c.provide_default(&local, |_| Ok(Value::from("local default")))
            .unwrap();
        assert!(c.invoke(&foreign, 42).is_err());

        c.define_trait(
            TraitSpec::new()
                .when(|v| v.kind() == ValueKind::List)
                .provide(&local, |_| Ok(Value::from("local resolved"))),
        )
        .unwrap();
        let list = Value::list(vec![]);
        c.invoke(&local, list.clone()).unwrap();
        // the item now carries slot#0, but only under this container's identity
        assert!(c.invoke(&foreign, list.clone()).is_err());
        assert_eq!(c.wrap(list).slot_value(&foreign).unwrap(), None);
    }

    #[test]
    fn test_resolve_paths_surface() {
        let c = Container::new();
        let a = c.add_slot();
        let b = c.add_slot();
        c.define_trait(
            TraitSpec::new()
                .when(|v| v.kind() == ValueKind::Str)
                .provide(&a, |_| Ok(Value::Null)),
        )
        .unwrap();
        c.define_trait(
            TraitSpec::new()
                .requires(std::slice::from_ref(&a))
                .provide(&b, |_| Ok(Value::Null)),
        )
        .unwrap();

        let paths = c.resolve_paths(&b, &Value::from("hello"));
        assert_eq!(paths.len(), 1);
        assert_eq!(paths[0].len(), 2);
        assert!(c.resolve_paths(&b, &Value::from(1)).is_empty());
    }
}
