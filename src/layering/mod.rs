//! Layered construction of capability objects.
//!
//! [`layer`] binds a base table to a state and returns an [`Accumulator`].
//! Every accepted layer is bound over the object built so far; its
//! operations shadow (or, for composable tables, wrap) the ones below. The
//! accumulator remembers how the object was built, so a mutator anywhere in
//! the stack rebuilds every layer on the new state.

pub mod builder;
pub mod compose;
pub(crate) mod recipe;

pub use builder::{layer, Accumulator, Layer, ReflectFn};
pub use compose::{bare, continuation, resolve, split_continuation};
