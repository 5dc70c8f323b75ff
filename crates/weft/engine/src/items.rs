//! Item store
//!
//! One item per distinct raw value per container. Structured values are
//! interned by pointer identity; primitives get a fresh surrogate
//! identity every time they are presented, unless the value is already a
//! facade from this store. A facade minted by a different container is
//! treated as an ordinary structured value and interned by its handle.

use std::collections::HashMap;
use std::rc::Rc;

use weft_types::{ContainerId, ItemId, SlotId, Value};

use crate::dispatch::SlotFn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ItemKind {
    /// No mutable identity of its own; native operations rebind to a
    /// copy of the raw primitive.
    Primitive,
    /// Stable reference identity; native operations forward to the
    /// shared underlying structure.
    Structured,
}

pub(crate) struct Item {
    pub value: Value,
    pub kind: ItemKind,
    pub custom_slots: HashMap<SlotId, SlotFn>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum IdentityKey {
    List(usize),
    Map(usize),
    Fn(usize),
    Foreign(ItemId),
}

pub(crate) struct ItemStore {
    container: ContainerId,
    entries: Vec<Item>,
    interned: HashMap<IdentityKey, u32>,
}

impl ItemStore {
    pub(crate) fn new(container: ContainerId) -> Self {
        Self {
            container,
            entries: Vec::new(),
            interned: HashMap::new(),
        }
    }

    /// Wrap a raw value, reusing the existing item for values with
    /// stable identity. A facade from this store passes through
    /// unchanged.
    pub(crate) fn ensure(&mut self, value: Value) -> ItemId {
        match &value {
            Value::Item(id) if id.container() == self.container => *id,
            Value::Item(foreign) => {
                self.intern(IdentityKey::Foreign(*foreign), value.clone(), ItemKind::Structured)
            }
            Value::List(rc) => self.intern(
                IdentityKey::List(Rc::as_ptr(rc) as usize),
                value.clone(),
                ItemKind::Structured,
            ),
            Value::Map(rc) => self.intern(
                IdentityKey::Map(Rc::as_ptr(rc) as usize),
                value.clone(),
                ItemKind::Structured,
            ),
            Value::Fn(rc) => self.intern(
                IdentityKey::Fn(Rc::as_ptr(rc) as *const () as usize),
                value.clone(),
                ItemKind::Structured,
            ),
            _ => self.allocate(value, ItemKind::Primitive),
        }
    }

    fn intern(&mut self, key: IdentityKey, value: Value, kind: ItemKind) -> ItemId {
        if let Some(&index) = self.interned.get(&key) {
            return ItemId::new(self.container, index);
        }
        let id = self.allocate(value, kind);
        self.interned.insert(key, id.index());
        id
    }

    fn allocate(&mut self, value: Value, kind: ItemKind) -> ItemId {
        let index = self.entries.len() as u32;
        self.entries.push(Item {
            value,
            kind,
            custom_slots: HashMap::new(),
        });
        ItemId::new(self.container, index)
    }

    pub(crate) fn get(&self, id: ItemId) -> Option<&Item> {
        if id.container() != self.container {
            return None;
        }
        self.entries.get(id.index() as usize)
    }

    pub(crate) fn get_mut(&mut self, id: ItemId) -> Option<&mut Item> {
        if id.container() != self.container {
            return None;
        }
        self.entries.get_mut(id.index() as usize)
    }
}
