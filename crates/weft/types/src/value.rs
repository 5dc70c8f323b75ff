//! Dynamic value representation
//!
//! Every value presented to a container is carried as a [`Value`].
//! Primitives (`Null`, `Bool`, `Int`, `Float`, `Str`) have no stable
//! identity of their own; structured values (`List`, `Map`, `Fn`) are
//! shared behind `Rc` and keep pointer identity; `Item` is a facade
//! reference produced by some container's item store.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::errors::{WeftError, WeftResult};
use crate::identity::ItemId;

/// A callable value. Receives its arguments positionally, like the
/// underlying host function it stands in for.
pub type NativeFn = Rc<dyn Fn(&[Value]) -> WeftResult<Value>>;

/// A dynamically typed runtime value.
#[derive(Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Rc<str>),
    List(Rc<RefCell<Vec<Value>>>),
    Map(Rc<RefCell<BTreeMap<String, Value>>>),
    Fn(NativeFn),
    Item(ItemId),
}

/// Classification of a [`Value`], usable from value predicates without
/// matching on the enum itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Null,
    Bool,
    Int,
    Float,
    Str,
    List,
    Map,
    Fn,
    Item,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::Null => "null",
            ValueKind::Bool => "bool",
            ValueKind::Int => "int",
            ValueKind::Float => "float",
            ValueKind::Str => "str",
            ValueKind::List => "list",
            ValueKind::Map => "map",
            ValueKind::Fn => "fn",
            ValueKind::Item => "item",
        };
        f.write_str(name)
    }
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Null => ValueKind::Null,
            Value::Bool(_) => ValueKind::Bool,
            Value::Int(_) => ValueKind::Int,
            Value::Float(_) => ValueKind::Float,
            Value::Str(_) => ValueKind::Str,
            Value::List(_) => ValueKind::List,
            Value::Map(_) => ValueKind::Map,
            Value::Fn(_) => ValueKind::Fn,
            Value::Item(_) => ValueKind::Item,
        }
    }

    /// Primitives have no identity of their own and are re-wrapped each
    /// time they are presented to a container.
    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            Value::Null | Value::Bool(_) | Value::Int(_) | Value::Float(_) | Value::Str(_)
        )
    }

    pub fn list(elements: Vec<Value>) -> Self {
        Value::List(Rc::new(RefCell::new(elements)))
    }

    pub fn map(entries: BTreeMap<String, Value>) -> Self {
        Value::Map(Rc::new(RefCell::new(entries)))
    }

    pub fn function(f: impl Fn(&[Value]) -> WeftResult<Value> + 'static) -> Self {
        Value::Fn(Rc::new(f))
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(*n as f64),
            Value::Float(x) => Some(*x),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_item(&self) -> Option<ItemId> {
        match self {
            Value::Item(id) => Some(*id),
            _ => None,
        }
    }

    /// Snapshot of a list's current elements.
    pub fn to_vec(&self) -> Option<Vec<Value>> {
        match self {
            Value::List(elements) => Some(elements.borrow().clone()),
            _ => None,
        }
    }

    /// Invoke a callable value. Fails for anything that is not `Fn`.
    pub fn call(&self, args: &[Value]) -> WeftResult<Value> {
        match self {
            Value::Fn(f) => f(args),
            other => Err(WeftError::UnsupportedOperation {
                op: "call".to_string(),
                kind: other.kind(),
            }),
        }
    }

    /// Reference identity: primitives compare by value, structured
    /// values by pointer, items by handle. This is the equality used for
    /// item interning.
    pub fn same(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::List(a), Value::List(b)) => Rc::ptr_eq(a, b),
            (Value::Map(a), Value::Map(b)) => Rc::ptr_eq(a, b),
            (Value::Fn(a), Value::Fn(b)) => {
                std::ptr::eq(Rc::as_ptr(a) as *const (), Rc::as_ptr(b) as *const ())
            }
            (a, b) if a.is_primitive() || b.is_primitive() => a == b,
            (Value::Item(a), Value::Item(b)) => a == b,
            _ => false,
        }
    }

    /// Best-effort JSON rendering for diagnostics. Functions and facades
    /// render as placeholders; reference cycles render as `"<cycle>"`.
    pub fn to_json(&self) -> serde_json::Value {
        let mut seen = Vec::new();
        self.to_json_guarded(&mut seen)
    }

    fn to_json_guarded(&self, seen: &mut Vec<usize>) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(n) => serde_json::Value::from(*n),
            Value::Float(x) => serde_json::Number::from_f64(*x)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Str(s) => serde_json::Value::from(s.as_ref()),
            Value::List(elements) => {
                let addr = Rc::as_ptr(elements) as usize;
                if seen.contains(&addr) {
                    return serde_json::Value::from("<cycle>");
                }
                seen.push(addr);
                let rendered = elements
                    .borrow()
                    .iter()
                    .map(|e| e.to_json_guarded(seen))
                    .collect();
                seen.pop();
                serde_json::Value::Array(rendered)
            }
            Value::Map(entries) => {
                let addr = Rc::as_ptr(entries) as usize;
                if seen.contains(&addr) {
                    return serde_json::Value::from("<cycle>");
                }
                seen.push(addr);
                let rendered = entries
                    .borrow()
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json_guarded(seen)))
                    .collect();
                seen.pop();
                serde_json::Value::Object(rendered)
            }
            Value::Fn(_) => serde_json::Value::from("<fn>"),
            Value::Item(id) => serde_json::Value::from(format!("<{id}>")),
        }
    }
}

/// Structural equality; numbers compare numerically across `Int` and
/// `Float`, functions and facades compare by identity.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => {
                *a as f64 == *b
            }
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => {
                Rc::ptr_eq(a, b) || *a.borrow() == *b.borrow()
            }
            (Value::Map(a), Value::Map(b)) => Rc::ptr_eq(a, b) || *a.borrow() == *b.borrow(),
            (Value::Fn(a), Value::Fn(b)) => {
                std::ptr::eq(Rc::as_ptr(a) as *const (), Rc::as_ptr(b) as *const ())
            }
            (Value::Item(a), Value::Item(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Value({})", self.to_json())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(n as i64)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(Rc::from(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(Rc::from(s.as_str()))
    }
}

impl From<Vec<Value>> for Value {
    fn from(elements: Vec<Value>) -> Self {
        Value::list(elements)
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(entries: BTreeMap<String, Value>) -> Self {
        Value::map(entries)
    }
}

impl From<ItemId> for Value {
    fn from(id: ItemId) -> Self {
        Value::Item(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classification() {
        assert_eq!(Value::from("hello").kind(), ValueKind::Str);
        assert_eq!(Value::from(42).kind(), ValueKind::Int);
        assert_eq!(Value::from(true).kind(), ValueKind::Bool);
        assert_eq!(Value::list(vec![]).kind(), ValueKind::List);
        assert_eq!(Value::Null.kind(), ValueKind::Null);
    }

    #[test]
    fn test_primitives_compare_by_value() {
        assert_eq!(Value::from("hello"), Value::from("hello"));
        assert_ne!(Value::from("hello"), Value::from("world"));
        assert_eq!(Value::from(42), Value::from(42.0));
    }

    #[test]
    fn test_same_is_reference_identity_for_lists() {
        let a = Value::list(vec![Value::from(1)]);
        let b = Value::list(vec![Value::from(1)]);
        assert!(a.same(&a.clone()));
        assert!(!a.same(&b));
        // structural equality still holds
        assert_eq!(a, b);
    }

    #[test]
    fn test_display_renders_json() {
        assert_eq!(Value::from(42).to_string(), "42");
        assert_eq!(Value::from("hi").to_string(), "\"hi\"");
        let l = Value::list(vec![Value::from(1), Value::from(2)]);
        assert_eq!(l.to_string(), "[1,2]");
    }

    #[test]
    fn test_display_breaks_cycles() {
        let inner = Rc::new(RefCell::new(Vec::new()));
        let l = Value::List(inner.clone());
        inner.borrow_mut().push(l.clone());
        assert_eq!(l.to_string(), "[\"<cycle>\"]");
    }

    #[test]
    fn test_call_on_non_function_fails() {
        let err = Value::from(1).call(&[]).unwrap_err();
        assert!(matches!(err, WeftError::UnsupportedOperation { .. }));
    }

    #[test]
    fn test_call_invokes_function() {
        let double = Value::function(|args| {
            Ok(Value::Int(args[0].as_int().unwrap_or(0) * 2))
        });
        assert_eq!(double.call(&[Value::from(21)]).unwrap(), Value::from(42));
    }
}
