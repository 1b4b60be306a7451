//! Capability algebras for capbind.
//!
//! This module defines algebraic traits that represent **capabilities**,
//! not implementations. Each trait is:
//!
//! - **Object-safe** — can be used as `dyn Trait`
//! - **Documented with laws** — properties that all implementations must satisfy
//!
//! # Capability Traits
//!
//! - [`Invoke`] — Named operations over a hidden subject
//!
//! # Extension Traits
//!
//! Base traits stay object-safe. Extension traits provide higher-level
//! convenience methods built from the base trait operations.
//!
//! # Laws
//!
//! Each trait documents algebraic laws that all implementations must satisfy.
//! These are verified via law tests in each module's test suite.

pub mod invoke;

// Re-exports for convenience
pub use invoke::{Invoke, InvokeExt};
