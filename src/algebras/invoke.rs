//! The invocation algebra: anything that exposes named operations over a
//! hidden subject.

use crate::binder::Capability;
use crate::error::{EngineError, Result};
use crate::operations::{OperationDescriptor, OperationKind};
use crate::types::Value;

/// Invocation capability.
///
/// # Laws
///
/// All implementations must satisfy these laws:
///
/// - **L1 (Reader Determinism)**: Invoking a reader twice with the same
///   arguments yields equal results.
///   ```text
///   invoke(reader, args) == invoke(reader, args)
///   ```
///
/// - **L2 (Mutator Isolation)**: Invoking a mutator never changes what the
///   receiver's readers return.
///   ```text
///   before = invoke(reader, [])
///   invoke(mutator, args)
///   invoke(reader, []) == before
///   ```
///
/// - **L3 (Name Closure)**: A name is invocable iff it is listed, and
///   `descriptors()` lists exactly `operation_names()`.
///   ```text
///   name ∉ operation_names()  =>  invoke(name, _) fails with UnknownOperation
///   ```
///
/// This trait is **object-safe** and can be used as `dyn Invoke`.
pub trait Invoke: Send + Sync {
    /// Invoke a named operation with the subject supplied implicitly.
    fn invoke(&self, name: &str, args: &[Value]) -> Result<Value>;

    /// Every invocable name, sorted.
    fn operation_names(&self) -> Vec<String>;

    /// One descriptor per invocable name, in the same order.
    fn descriptors(&self) -> Vec<OperationDescriptor>;
}

impl Invoke for Capability {
    fn invoke(&self, name: &str, args: &[Value]) -> Result<Value> {
        self.call(name, args)
    }

    fn operation_names(&self) -> Vec<String> {
        self.names().map(str::to_string).collect()
    }

    fn descriptors(&self) -> Vec<OperationDescriptor> {
        Capability::descriptors(self)
    }
}

// ==============================================================================
// Extension Trait for Invoke
// ==============================================================================

/// Extension trait with typed convenience methods for [`Invoke`].
///
/// Blanket-implemented for every `Invoke` type, trait objects included.
pub trait InvokeExt: Invoke {
    fn call0(&self, name: &str) -> Result<Value> {
        self.invoke(name, &[])
    }

    /// Invoke a mutator and return the capability object it produced.
    fn chain(&self, name: &str, args: &[Value]) -> Result<Capability> {
        match self.invoke(name, args)? {
            Value::Capability(next) => Ok(next),
            other => Err(EngineError::unexpected_result(
                name,
                "capability",
                other.kind_name(),
            )),
        }
    }

    /// Invoke a reader expected to return an integer.
    fn read_i64(&self, name: &str, args: &[Value]) -> Result<i64> {
        let value = self.invoke(name, args)?;
        value
            .as_i64()
            .ok_or_else(|| EngineError::unexpected_result(name, "integer", value.kind_name()))
    }

    fn supports(&self, name: &str) -> bool {
        self.operation_names().iter().any(|known| known == name)
    }

    /// Names of every mutator.
    fn mutators(&self) -> Vec<String> {
        self.descriptors()
            .into_iter()
            .filter(|descriptor| descriptor.kind == OperationKind::Mutator)
            .map(|descriptor| descriptor.name)
            .collect()
    }
}

impl<T: Invoke + ?Sized> InvokeExt for T {}
