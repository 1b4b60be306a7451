// src/error.rs
//! Engine error types with structured error handling.
//!
//! Every failure is reported as a single [`EngineError`] carrying the
//! primitive that detected it, a typed [`ErrorKind`], a human-readable
//! message naming the offending operation or layer, and an optional cause.
//! Kinds are grouped into [`ErrorCategory`] so callers can react to a class
//! of failure without matching every variant.

use std::fmt;
use thiserror::Error;

/// The engine primitive that raised an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    Normalizer,
    Binder,
    LayeredBuilder,
    CompositionResolver,
    Config,
    /// A user-supplied operation raised the error itself.
    Operation,
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Normalizer => write!(f, "normalizer"),
            Self::Binder => write!(f, "binder"),
            Self::LayeredBuilder => write!(f, "layered-builder"),
            Self::CompositionResolver => write!(f, "composition-resolver"),
            Self::Config => write!(f, "config"),
            Self::Operation => write!(f, "operation"),
        }
    }
}

/// Coarse classification of failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Bad table, state, configuration or call shape. Never recoverable.
    InputValidation,
    /// A mutator broke its contract; only detectable when it runs.
    ContractViolation,
    /// Nothing to compose with, or a composed call was malformed.
    Composition,
    /// A reflective layer did not produce a usable table.
    LayerProtocol,
    /// Raised by user code inside an operation.
    Operation,
}

/// What went wrong, as a typed vocabulary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The array form of an operation source had no elements.
    EmptyInput,
    /// An operation source entry was a plain value.
    NotAFunction { entry: String },
    /// An array-form operation carried no name.
    AnonymousFunction { index: usize },
    /// Two entries share a name.
    DuplicateName { name: String },
    /// The subject handed to the binder is not record-shaped.
    InvalidState { found: &'static str },
    /// The capability object has no operation with this name.
    UnknownOperation { name: String },
    /// An operation declared an arity and was called with a different count.
    ArityMismatch {
        name: String,
        expected: usize,
        found: usize,
    },
    /// A call produced a value of the wrong shape for the caller.
    UnexpectedResult {
        name: String,
        expected: &'static str,
        found: &'static str,
    },
    /// An environment or CLI setting could not be parsed.
    InvalidConfiguration { key: String },
    /// A mutator failed or returned something other than a record.
    InvalidMutatorResult { name: String },
    /// A mutator dropped fields of the state it replaced.
    ShapeNarrowed { name: String, missing: Vec<String> },
    /// A composed operation invoked a continuation with nothing behind it.
    NoPreviousOperation { name: String },
    /// A composed operation was called without its trailing continuation.
    MissingContinuation,
    /// A reflective layer failed or returned an invalid table.
    InvalidLayerReturn { layer: usize },
    /// User code raised an error.
    Raised,
}

impl ErrorKind {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::EmptyInput
            | Self::NotAFunction { .. }
            | Self::AnonymousFunction { .. }
            | Self::DuplicateName { .. }
            | Self::InvalidState { .. }
            | Self::UnknownOperation { .. }
            | Self::ArityMismatch { .. }
            | Self::UnexpectedResult { .. }
            | Self::InvalidConfiguration { .. } => ErrorCategory::InputValidation,
            Self::InvalidMutatorResult { .. } | Self::ShapeNarrowed { .. } => {
                ErrorCategory::ContractViolation
            }
            Self::NoPreviousOperation { .. } | Self::MissingContinuation => {
                ErrorCategory::Composition
            }
            Self::InvalidLayerReturn { .. } => ErrorCategory::LayerProtocol,
            Self::Raised => ErrorCategory::Operation,
        }
    }
}

/// The single error type surfaced by every engine primitive.
#[derive(Error, Debug)]
#[error("{context}: {message}")]
pub struct EngineError {
    context: Primitive,
    kind: ErrorKind,
    message: String,
    #[source]
    cause: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl EngineError {
    pub fn new(context: Primitive, kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            context,
            kind,
            message: message.into(),
            cause: None,
        }
    }

    /// Raised from inside a user operation.
    pub fn raised(message: impl Into<String>) -> Self {
        Self::new(Primitive::Operation, ErrorKind::Raised, message)
    }

    /// Wraps a foreign error raised from inside a user operation.
    pub fn from_source(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::raised(source.to_string()).caused_by(source)
    }

    /// Attaches the underlying failure.
    pub fn caused_by(mut self, cause: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        self.cause = Some(cause.into());
        self
    }

    pub fn context(&self) -> Primitive {
        self.context
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    pub fn category(&self) -> ErrorCategory {
        self.kind.category()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn cause(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        self.cause.as_deref()
    }

    /// The kind of the innermost `EngineError` in the cause chain.
    pub fn root_kind(&self) -> &ErrorKind {
        let mut current = self;
        while let Some(next) = current
            .cause
            .as_deref()
            .and_then(|cause| cause.downcast_ref::<EngineError>())
        {
            current = next;
        }
        &current.kind
    }

    // --- Normalizer ---

    pub(crate) fn empty_input() -> Self {
        Self::new(
            Primitive::Normalizer,
            ErrorKind::EmptyInput,
            "no operations were supplied",
        )
    }

    pub(crate) fn not_a_function(entry: impl Into<String>, found: &'static str) -> Self {
        let entry = entry.into();
        Self::new(
            Primitive::Normalizer,
            ErrorKind::NotAFunction {
                entry: entry.clone(),
            },
            format!("entry '{}' is a {}, not an operation", entry, found),
        )
    }

    pub(crate) fn anonymous_function(index: usize) -> Self {
        Self::new(
            Primitive::Normalizer,
            ErrorKind::AnonymousFunction { index },
            format!(
                "operation at position {} has no name; the array form needs named operations",
                index
            ),
        )
    }

    pub(crate) fn duplicate_name(name: impl Into<String>) -> Self {
        let name = name.into();
        Self::new(
            Primitive::Normalizer,
            ErrorKind::DuplicateName { name: name.clone() },
            format!("operation '{}' is defined more than once", name),
        )
    }

    // --- Binder ---

    pub(crate) fn invalid_state(found: &'static str) -> Self {
        Self::new(
            Primitive::Binder,
            ErrorKind::InvalidState { found },
            format!("cannot bind operations to a {}; a record is required", found),
        )
    }

    pub(crate) fn unknown_operation(name: impl Into<String>) -> Self {
        let name = name.into();
        Self::new(
            Primitive::Binder,
            ErrorKind::UnknownOperation { name: name.clone() },
            format!("no operation named '{}'", name),
        )
    }

    pub(crate) fn arity_mismatch(name: impl Into<String>, expected: usize, found: usize) -> Self {
        let name = name.into();
        Self::new(
            Primitive::Binder,
            ErrorKind::ArityMismatch {
                name: name.clone(),
                expected,
                found,
            },
            format!(
                "operation '{}' takes {} argument(s), got {}",
                name, expected, found
            ),
        )
    }

    pub(crate) fn unexpected_result(
        name: impl Into<String>,
        expected: &'static str,
        found: &'static str,
    ) -> Self {
        let name = name.into();
        Self::new(
            Primitive::Binder,
            ErrorKind::UnexpectedResult {
                name: name.clone(),
                expected,
                found,
            },
            format!("operation '{}' returned a {}, expected a {}", name, found, expected),
        )
    }

    pub(crate) fn invalid_mutator_result(name: impl Into<String>, found: &'static str) -> Self {
        let name = name.into();
        Self::new(
            Primitive::Binder,
            ErrorKind::InvalidMutatorResult { name: name.clone() },
            format!("mutator '{}' returned a {}, expected a record", name, found),
        )
    }

    pub(crate) fn mutator_failed(name: impl Into<String>, cause: EngineError) -> Self {
        let name = name.into();
        Self::new(
            Primitive::Binder,
            ErrorKind::InvalidMutatorResult { name: name.clone() },
            format!("mutator '{}' failed: {}", name, cause),
        )
        .caused_by(cause)
    }

    pub(crate) fn shape_narrowed(name: impl Into<String>, missing: Vec<String>) -> Self {
        let name = name.into();
        let message = format!(
            "mutator '{}' dropped state field(s): {}",
            name,
            missing.join(", ")
        );
        Self::new(
            Primitive::Binder,
            ErrorKind::ShapeNarrowed { name, missing },
            message,
        )
    }

    // --- Layering and composition ---

    pub(crate) fn invalid_layer_return(layer: usize, cause: EngineError) -> Self {
        Self::new(
            Primitive::LayeredBuilder,
            ErrorKind::InvalidLayerReturn { layer },
            format!(
                "reflective layer {} did not produce a valid operation table: {}",
                layer, cause
            ),
        )
        .caused_by(cause)
    }

    pub(crate) fn no_previous_operation(name: impl Into<String>) -> Self {
        let name = name.into();
        Self::new(
            Primitive::CompositionResolver,
            ErrorKind::NoPreviousOperation { name: name.clone() },
            format!("no previous operation '{}' to compose with", name),
        )
    }

    pub(crate) fn missing_continuation() -> Self {
        Self::new(
            Primitive::CompositionResolver,
            ErrorKind::MissingContinuation,
            "composed operation was called without a continuation",
        )
    }

    // --- Configuration ---

    pub(crate) fn invalid_configuration(key: impl Into<String>, reason: impl fmt::Display) -> Self {
        let key = key.into();
        Self::new(
            Primitive::Config,
            ErrorKind::InvalidConfiguration { key: key.clone() },
            format!("invalid value for {}: {}", key, reason),
        )
    }
}

/// Result type alias for convenience
pub type Result<T, E = EngineError> = std::result::Result<T, E>;
