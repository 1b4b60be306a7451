//! Dynamic values flowing through bound operations.

use super::state::State;
use crate::binder::Capability;
use crate::error::{EngineError, Result};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Signature of a callable value.
pub type CallFn = dyn Fn(&[Value]) -> Result<Value> + Send + Sync;

/// A first-class function value, e.g. the continuation handed to a composed
/// operation.
#[derive(Clone)]
pub struct Callable {
    label: Arc<str>,
    func: Arc<CallFn>,
}

impl Callable {
    pub fn new<F>(label: impl Into<Arc<str>>, func: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value> + Send + Sync + 'static,
    {
        Self {
            label: label.into(),
            func: Arc::new(func),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn call(&self, args: &[Value]) -> Result<Value> {
        (self.func)(args)
    }
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Callable({})", self.label)
    }
}

/// Any value an operation can receive or return.
#[derive(Clone)]
pub enum Value {
    /// No meaningful result (side-effect-only operations).
    Unit,
    /// Plain data.
    Data(serde_json::Value),
    /// A bare state record, e.g. what a continuation yields for a mutator.
    State(State),
    /// A bound capability object, e.g. what a mutator yields to its caller.
    Capability(Capability),
    Function(Callable),
    /// A host value the engine forwards without looking inside, such as a
    /// pending future.
    Opaque(Arc<dyn Any + Send + Sync>),
}

impl Value {
    /// Wraps an arbitrary host value.
    pub fn opaque<T: Any + Send + Sync>(value: T) -> Self {
        Self::Opaque(Arc::new(value))
    }

    /// Short shape name used in error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Unit => "unit",
            Self::Data(serde_json::Value::Null) => "null",
            Self::Data(serde_json::Value::Bool(_)) => "boolean",
            Self::Data(serde_json::Value::Number(_)) => "number",
            Self::Data(serde_json::Value::String(_)) => "string",
            Self::Data(serde_json::Value::Array(_)) => "list",
            Self::Data(serde_json::Value::Object(_)) => "record",
            Self::State(_) => "state",
            Self::Capability(_) => "capability",
            Self::Function(_) => "function",
            Self::Opaque(_) => "opaque value",
        }
    }

    pub fn is_unit(&self) -> bool {
        matches!(self, Self::Unit)
    }

    /// Whether the binder accepts this value as a subject.
    pub fn is_record(&self) -> bool {
        matches!(
            self,
            Self::State(_) | Self::Capability(_) | Self::Data(serde_json::Value::Object(_))
        )
    }

    pub fn as_data(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Data(data) => Some(data),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        self.as_data().and_then(serde_json::Value::as_i64)
    }

    pub fn as_f64(&self) -> Option<f64> {
        self.as_data().and_then(serde_json::Value::as_f64)
    }

    pub fn as_bool(&self) -> Option<bool> {
        self.as_data().and_then(serde_json::Value::as_bool)
    }

    pub fn as_str(&self) -> Option<&str> {
        self.as_data().and_then(serde_json::Value::as_str)
    }

    pub fn as_state(&self) -> Option<&State> {
        match self {
            Self::State(state) => Some(state),
            _ => None,
        }
    }

    pub fn as_capability(&self) -> Option<&Capability> {
        match self {
            Self::Capability(capability) => Some(capability),
            _ => None,
        }
    }

    pub fn as_callable(&self) -> Option<&Callable> {
        match self {
            Self::Function(callable) => Some(callable),
            _ => None,
        }
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        match self {
            Self::Opaque(value) => value.downcast_ref::<T>(),
            _ => None,
        }
    }

    /// The state this value carries: itself, or the state a capability was
    /// bound from.
    pub fn carried_state(&self) -> Option<&State> {
        match self {
            Self::State(state) => Some(state),
            Self::Capability(capability) => capability.state(),
            _ => None,
        }
    }

    /// Reads a field of the carried state or of a record.
    pub fn field(&self, key: &str) -> Option<&serde_json::Value> {
        match self {
            Self::Data(serde_json::Value::Object(record)) => record.get(key),
            other => other.carried_state().and_then(|state| state.get(key)),
        }
    }

    /// Converts a record-shaped value into a state. Capabilities are not
    /// states and are rejected.
    pub(crate) fn into_state(self) -> std::result::Result<State, Value> {
        match self {
            Self::State(state) => Ok(state),
            Self::Data(serde_json::Value::Object(fields)) => Ok(State::new(fields)),
            other => Err(other),
        }
    }
}

/// Reads the integer argument at `index`.
pub fn int_arg(args: &[Value], index: usize) -> Result<i64> {
    args.get(index).and_then(Value::as_i64).ok_or_else(|| {
        EngineError::raised(format!(
            "argument {} must be an integer, got {}",
            index,
            args.get(index).map_or("nothing", Value::kind_name)
        ))
    })
}

/// Reads the string argument at `index`.
pub fn str_arg(args: &[Value], index: usize) -> Result<&str> {
    args.get(index).and_then(Value::as_str).ok_or_else(|| {
        EngineError::raised(format!(
            "argument {} must be a string, got {}",
            index,
            args.get(index).map_or("nothing", Value::kind_name)
        ))
    })
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Unit, Self::Unit) => true,
            (Self::Data(a), Self::Data(b)) => a == b,
            (Self::State(a), Self::State(b)) => a == b,
            (Self::Capability(a), Self::Capability(b)) => a.id() == b.id(),
            (Self::Function(a), Self::Function(b)) => Arc::ptr_eq(&a.func, &b.func),
            (Self::Opaque(a), Self::Opaque(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unit => write!(f, "Unit"),
            Self::Data(data) => write!(f, "Data({})", data),
            Self::State(state) => write!(f, "{:?}", state),
            Self::Capability(capability) => write!(f, "{:?}", capability),
            Self::Function(callable) => write!(f, "{:?}", callable),
            Self::Opaque(_) => write!(f, "Opaque"),
        }
    }
}

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Self::Unit
    }
}

impl From<serde_json::Value> for Value {
    fn from(data: serde_json::Value) -> Self {
        Self::Data(data)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Data(n.into())
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Self::Data(n.into())
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Data(n.into())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Data(b.into())
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Data(s.into())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Data(s.into())
    }
}

impl From<State> for Value {
    fn from(state: State) -> Self {
        Self::State(state)
    }
}

impl From<Capability> for Value {
    fn from(capability: Capability) -> Self {
        Self::Capability(capability)
    }
}

impl From<Callable> for Value {
    fn from(callable: Callable) -> Self {
        Self::Function(callable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_kind_names() {
        assert_eq!(Value::Unit.kind_name(), "unit");
        assert_eq!(Value::from(3).kind_name(), "number");
        assert_eq!(Value::from("x").kind_name(), "string");
        assert_eq!(Value::from(json!({ "a": 1 })).kind_name(), "record");
        assert_eq!(Value::opaque(5u8).kind_name(), "opaque value");
    }

    #[test]
    fn test_records() {
        assert!(Value::from(json!({})).is_record());
        assert!(Value::from(State::new(Default::default())).is_record());
        assert!(!Value::from(json!([1])).is_record());
        assert!(!Value::Unit.is_record());
    }

    #[test]
    fn test_into_state() {
        let state = Value::from(json!({ "v": 10 })).into_state().unwrap();
        assert_eq!(state.get_i64("v"), Some(10));

        let rejected = Value::from(10).into_state().unwrap_err();
        assert_eq!(rejected, Value::from(10));
    }

    #[test]
    fn test_field_reads_records_and_states() {
        let record = Value::from(json!({ "v": 1 }));
        assert_eq!(record.field("v"), Some(&json!(1)));

        let state = Value::from(State::from_json(json!({ "v": 2 })).unwrap());
        assert_eq!(state.field("v"), Some(&json!(2)));
        assert_eq!(state.field("missing"), None);
    }

    #[test]
    fn test_callable_invokes_function() {
        let double = Callable::new("double", |args| Ok(Value::from(int_arg(args, 0)? * 2)));
        assert_eq!(double.label(), "double");
        assert_eq!(double.call(&[Value::from(21)]).unwrap(), Value::from(42));
    }

    #[test]
    fn test_int_arg_reports_shape() {
        let err = int_arg(&[Value::from("nope")], 0).unwrap_err();
        assert_eq!(err.message(), "argument 0 must be an integer, got string");

        let err = int_arg(&[], 1).unwrap_err();
        assert_eq!(err.message(), "argument 1 must be an integer, got nothing");
    }

    #[test]
    fn test_opaque_downcast() {
        let value = Value::opaque(String::from("pending"));
        assert_eq!(value.downcast_ref::<String>().map(String::as_str), Some("pending"));
        assert!(value.downcast_ref::<u32>().is_none());
    }
}
