//! Operations, operation tables, and the tags that change how they bind.
//!
//! Operation inputs arrive in several shapes (a list of named operations, a
//! name → operation map, or an existing table). The [`normalize`] function
//! turns any of them into an [`OperationTable`]: ordered, validated, and
//! immutable. Tables carry two independent tags:
//!
//! - [`mutating`] — every operation returns a new state, and invoking it
//!   yields a freshly bound capability object;
//! - [`composable`] — when layered, each operation receives the previous
//!   same-named operation as a trailing continuation.

pub mod normalizer;
pub mod operation;
pub mod table;

pub use normalizer::{normalize, Member, OperationSource};
pub use operation::{Operation, OperationDescriptor, OperationFn, OperationKind};
pub use table::{composable, mutating, OperationTable, OperationTableBuilder, TableTags};

pub(crate) use table::TableEntry;
