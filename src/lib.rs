// src/lib.rs
//! capbind — bind operation tables to immutable state and get back
//! capability objects.
//!
//! A capability object exposes named operations with their subject supplied
//! implicitly. Reader operations return values; mutator operations return a
//! brand-new capability object on the state they produce, so calls chain
//! and nothing is ever modified in place. Layers stack extra operations
//! over a base object; composable layers wrap the operations below them
//! instead of replacing them.
//!
//! # Public API
//!
//! The library exposes types organized by concern:
//! - **Error handling** — `EngineError`, `ErrorKind`, `Primitive`
//! - **Configuration** — `EngineConfig`, `ShapePolicy`
//! - **Values** — `Value`, `State`, `Callable`
//! - **Operations** — `OperationTable`, `normalize`, `mutating`, `composable`
//! - **Binding** — `Binder`, `Capability`, `bind`
//! - **Layering** — `layer`, `Accumulator`, `Layer`, `continuation`

mod algebras;
mod binder;
mod config;
mod constants;
mod error;
mod layering;
mod operations;
mod types;

// --- Error Handling ---
pub use crate::error::{EngineError, ErrorCategory, ErrorKind, Primitive, Result};

// --- Configuration ---
pub use crate::config::{CommandLineInput, DemoConfig, EngineConfig, ShapePolicy, Step};
pub use crate::constants::{
    CACHE_CAPACITY_ENV, DEFAULT_CACHE_CAPACITY, LOG_FILE_NAME, SHAPE_POLICY_ENV,
};

// --- Values ---
pub use crate::types::{
    int_arg, str_arg, CallFn, Callable, CapabilityId, Id, Record, RecipeId, State, StateId,
    TableId, Value,
};

// --- Operations ---
pub use crate::operations::{
    composable, mutating, normalize, Member, Operation, OperationDescriptor, OperationFn,
    OperationKind, OperationSource, OperationTable, OperationTableBuilder, TableTags,
};

// --- Binding ---
pub use crate::binder::{bind, Binder, CacheStats, Capability};

// --- Layering ---
pub use crate::layering::{
    bare, continuation, layer, resolve, split_continuation, Accumulator, Layer, ReflectFn,
};

// --- Algebras (Capability Traits) ---
pub use crate::algebras::{Invoke, InvokeExt};
