//! Dispatch layer
//!
//! The [`Facade`] is the wrapper a slot implementation receives. Access
//! against it follows a fixed order: reserved introspection (unwrap to
//! the raw value), coercion to host forms (display, numeric
//! extraction), slot lookup (the item's resolved slots, then the
//! container's default trait), and finally the underlying value's own
//! native operations. Anything falling through is absent, and the
//! invocation path turns absence into a terminal failure.
//!
//! Native operations come in two variants selected by the item's kind:
//! primitive-backed items rebind the receiver to a copy of the raw
//! primitive, structured items forward to the shared underlying
//! structure so native container semantics observe the original value.

use std::fmt;
use std::rc::Rc;

use weft_types::{ItemId, Slot, Value, ValueKind, WeftError, WeftResult};

use crate::container::Container;
use crate::items::ItemKind;

/// A stored slot implementation. Invoked with the facade of the item it
/// was resolved onto.
pub type SlotFn = Rc<dyn Fn(&Facade) -> WeftResult<Value>>;

/// Operations every value kind may natively support.
#[derive(Debug, Clone)]
pub enum NativeOp {
    Len,
    UpperCase,
    LowerCase,
    /// Current elements: characters of a string, elements of a list,
    /// `[key, value]` pairs of a map.
    Elements,
    /// Index into a list or string, or look up a map key. Absent
    /// entries yield `Null`.
    Get(Value),
    Contains(Value),
}

impl NativeOp {
    fn name(&self) -> &'static str {
        match self {
            NativeOp::Len => "len",
            NativeOp::UpperCase => "upper_case",
            NativeOp::LowerCase => "lower_case",
            NativeOp::Elements => "elements",
            NativeOp::Get(_) => "get",
            NativeOp::Contains(_) => "contains",
        }
    }

    fn unsupported(&self, kind: ValueKind) -> WeftError {
        WeftError::UnsupportedOperation {
            op: self.name().to_string(),
            kind,
        }
    }
}

/// Capability-dispatch contract shared by the two item variants.
pub(crate) trait Dispatch {
    /// The raw value behind the facade.
    fn unwrap(&self) -> Value;
    /// Forward a native operation to the underlying value.
    fn native(&self, op: &NativeOp) -> WeftResult<Value>;
}

/// Receiver rebinding: operations run against a copy of the raw
/// primitive, since primitives cannot hold their own methods.
pub(crate) struct PrimitiveDispatch {
    value: Value,
}

impl PrimitiveDispatch {
    pub(crate) fn new(value: Value) -> Self {
        Self { value }
    }
}

impl Dispatch for PrimitiveDispatch {
    fn unwrap(&self) -> Value {
        self.value.clone()
    }

    fn native(&self, op: &NativeOp) -> WeftResult<Value> {
        let Value::Str(s) = &self.value else {
            return Err(op.unsupported(self.value.kind()));
        };
        match op {
            NativeOp::Len => Ok(Value::Int(s.chars().count() as i64)),
            NativeOp::UpperCase => Ok(Value::from(s.to_uppercase())),
            NativeOp::LowerCase => Ok(Value::from(s.to_lowercase())),
            NativeOp::Elements => Ok(Value::list(
                s.chars().map(|c| Value::from(c.to_string())).collect(),
            )),
            NativeOp::Get(index) => {
                let Some(i) = index.as_int() else {
                    return Err(op.unsupported(ValueKind::Str));
                };
                Ok(s.chars()
                    .nth(i.max(0) as usize)
                    .map(|c| Value::from(c.to_string()))
                    .unwrap_or(Value::Null))
            }
            NativeOp::Contains(needle) => {
                let Some(sub) = needle.as_str() else {
                    return Err(op.unsupported(ValueKind::Str));
                };
                Ok(Value::Bool(s.contains(sub)))
            }
        }
    }
}

/// Transparent forwarding: operations run against the shared underlying
/// structure, so mutation through the original value is observed.
pub(crate) struct StructuredDispatch {
    value: Value,
}

impl StructuredDispatch {
    pub(crate) fn new(value: Value) -> Self {
        Self { value }
    }
}

impl Dispatch for StructuredDispatch {
    fn unwrap(&self) -> Value {
        self.value.clone()
    }

    fn native(&self, op: &NativeOp) -> WeftResult<Value> {
        match &self.value {
            Value::List(elements) => {
                let elements = elements.borrow();
                match op {
                    NativeOp::Len => Ok(Value::Int(elements.len() as i64)),
                    NativeOp::Elements => Ok(Value::list(elements.clone())),
                    NativeOp::Get(index) => {
                        let Some(i) = index.as_int() else {
                            return Err(op.unsupported(ValueKind::List));
                        };
                        Ok(usize::try_from(i)
                            .ok()
                            .and_then(|i| elements.get(i).cloned())
                            .unwrap_or(Value::Null))
                    }
                    NativeOp::Contains(needle) => {
                        Ok(Value::Bool(elements.iter().any(|e| e == needle)))
                    }
                    _ => Err(op.unsupported(ValueKind::List)),
                }
            }
            Value::Map(entries) => {
                let entries = entries.borrow();
                match op {
                    NativeOp::Len => Ok(Value::Int(entries.len() as i64)),
                    NativeOp::Elements => Ok(Value::list(
                        entries
                            .iter()
                            .map(|(k, v)| {
                                Value::list(vec![Value::from(k.as_str()), v.clone()])
                            })
                            .collect(),
                    )),
                    NativeOp::Get(key) => {
                        let Some(k) = key.as_str() else {
                            return Err(op.unsupported(ValueKind::Map));
                        };
                        Ok(entries.get(k).cloned().unwrap_or(Value::Null))
                    }
                    NativeOp::Contains(key) => {
                        let Some(k) = key.as_str() else {
                            return Err(op.unsupported(ValueKind::Map));
                        };
                        Ok(Value::Bool(entries.contains_key(k)))
                    }
                    _ => Err(op.unsupported(ValueKind::Map)),
                }
            }
            other => Err(op.unsupported(other.kind())),
        }
    }
}

/// The dispatched-through wrapper around one item.
#[derive(Clone)]
pub struct Facade {
    container: Container,
    item: ItemId,
}

impl Facade {
    pub(crate) fn new(container: Container, item: ItemId) -> Self {
        Self { container, item }
    }

    pub fn id(&self) -> ItemId {
        self.item
    }

    pub fn container(&self) -> &Container {
        &self.container
    }

    /// Reserved introspection: unwrap to the underlying raw value.
    pub fn raw(&self) -> Value {
        self.container.raw_of(self.item)
    }

    /// The facade as a first-class value, suitable for returning from a
    /// slot implementation or presenting to the container again.
    pub fn to_value(&self) -> Value {
        Value::Item(self.item)
    }

    pub fn kind(&self) -> ValueKind {
        self.raw().kind()
    }

    /// Coercion: numeric value extraction, delegating to the raw value.
    pub fn as_f64(&self) -> Option<f64> {
        self.raw().as_f64()
    }

    pub fn as_int(&self) -> Option<i64> {
        self.raw().as_int()
    }

    pub fn as_str_value(&self) -> Option<String> {
        self.raw().as_str().map(str::to_string)
    }

    /// Slot lookup and invocation: the item's resolved slots first, then
    /// the container's default trait. `Ok(None)` means neither has an
    /// implementation.
    pub fn slot_value(&self, slot: &Slot) -> WeftResult<Option<Value>> {
        if slot.container() != self.container.id() {
            return Ok(None);
        }
        match self.container.slot_impl(self.item, slot.id()) {
            Some(implementation) => implementation(self).map(Some),
            None => Ok(None),
        }
    }

    fn dispatcher(&self) -> Box<dyn Dispatch> {
        let raw = self.raw();
        match self.container.kind_of(self.item) {
            ItemKind::Primitive => Box::new(PrimitiveDispatch::new(raw)),
            ItemKind::Structured => Box::new(StructuredDispatch::new(raw)),
        }
    }

    /// Forward a native operation to the underlying value.
    pub fn native(&self, op: NativeOp) -> WeftResult<Value> {
        self.dispatcher().native(&op)
    }

    pub fn len(&self) -> WeftResult<Value> {
        self.native(NativeOp::Len)
    }

    pub fn is_empty(&self) -> WeftResult<bool> {
        Ok(self.len()?.as_int() == Some(0))
    }

    pub fn to_upper(&self) -> WeftResult<Value> {
        self.native(NativeOp::UpperCase)
    }

    pub fn to_lower(&self) -> WeftResult<Value> {
        self.native(NativeOp::LowerCase)
    }

    pub fn elements(&self) -> WeftResult<Value> {
        self.native(NativeOp::Elements)
    }

    pub fn get(&self, key: impl Into<Value>) -> WeftResult<Value> {
        self.native(NativeOp::Get(key.into()))
    }

    pub fn contains(&self, needle: impl Into<Value>) -> WeftResult<Value> {
        self.native(NativeOp::Contains(needle.into()))
    }
}

/// Coercion: stringize delegates to the underlying raw value.
impl fmt::Display for Facade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw())
    }
}

impl From<&Facade> for Value {
    fn from(facade: &Facade) -> Self {
        facade.to_value()
    }
}
