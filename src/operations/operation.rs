//! Single operations and their descriptors.

use crate::error::Result;
use crate::types::Value;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Signature every operation implements: the subject first, then the
/// caller's arguments.
pub type OperationFn = dyn Fn(&Value, &[Value]) -> Result<Value> + Send + Sync;

/// A possibly-named function of `(subject, args)`.
///
/// Whether it reads or replaces the state is decided by the table it lives
/// in, never by the function itself.
#[derive(Clone)]
pub struct Operation {
    name: Option<Arc<str>>,
    arity: Option<usize>,
    func: Arc<OperationFn>,
}

impl Operation {
    /// An anonymous operation. Only usable in the map form of an
    /// operation source, where the key supplies the name.
    pub fn new<F>(func: F) -> Self
    where
        F: Fn(&Value, &[Value]) -> Result<Value> + Send + Sync + 'static,
    {
        Self {
            name: None,
            arity: None,
            func: Arc::new(func),
        }
    }

    pub fn named<F>(name: impl Into<Arc<str>>, func: F) -> Self
    where
        F: Fn(&Value, &[Value]) -> Result<Value> + Send + Sync + 'static,
    {
        Self {
            name: Some(name.into()),
            arity: None,
            func: Arc::new(func),
        }
    }

    /// Declares how many caller arguments the operation takes. Calls with a
    /// different count fail before the operation runs.
    pub fn with_arity(mut self, arity: usize) -> Self {
        self.arity = Some(arity);
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn arity(&self) -> Option<usize> {
        self.arity
    }

    pub fn invoke(&self, subject: &Value, args: &[Value]) -> Result<Value> {
        (self.func)(subject, args)
    }

    pub(crate) fn renamed(&self, name: &str) -> Self {
        Self {
            name: Some(Arc::from(name)),
            arity: self.arity,
            func: Arc::clone(&self.func),
        }
    }

    pub(crate) fn with_declared_arity(mut self, arity: Option<usize>) -> Self {
        self.arity = arity;
        self
    }
}

impl fmt::Debug for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operation")
            .field("name", &self.name())
            .field("arity", &self.arity)
            .finish()
    }
}

/// Whether an operation's result is handed back or replaces the state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Reader,
    Mutator,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reader => write!(f, "reader"),
            Self::Mutator => write!(f, "mutator"),
        }
    }
}

/// Explicit description of one callable entry of a capability object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperationDescriptor {
    pub name: String,
    pub kind: OperationKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arity: Option<usize>,
    /// Wraps an earlier operation of the same name.
    pub composed: bool,
    /// 0 for the base table, then one per accepted layer.
    pub layer: usize,
}

impl fmt::Display for OperationDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}", self.name, self.kind)?;
        if let Some(arity) = self.arity {
            write!(f, ", arity {}", arity)?;
        }
        if self.composed {
            write!(f, ", composed")?;
        }
        write!(f, ", layer {}]", self.layer)
    }
}
