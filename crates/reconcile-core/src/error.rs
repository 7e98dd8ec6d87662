/// Error types for difference construction, requirement construction, and
/// validation.
///
/// A non-empty difference collection is never reported through these types;
/// it is the ordinary outcome of validating data that does not satisfy its
/// requirement. Errors here signal that the inputs themselves are malformed or
/// that user-supplied code failed.
use thiserror::Error;

/// A difference was constructed from arguments of the wrong shape.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DifferenceError {
    /// The deviation amount is not an integer or float.
    #[error("deviation must be numeric, got {found}")]
    NonNumericDelta {
        /// Rendered offending value.
        found: String,
    },

    /// The reference value is neither numeric nor null.
    #[error("deviation reference must be numeric or null, got {found}")]
    NonNumericReference {
        /// Rendered offending value.
        found: String,
    },

    /// The reference value is `NaN`.
    #[error("deviation reference must not be NaN")]
    NanReference,

    /// A zero delta against a numeric reference is not a deviation.
    #[error("numeric deviation must be positive or negative, got {delta}")]
    ZeroDelta {
        /// Rendered delta.
        delta: String,
    },
}

/// A requirement or allowance was constructed with invalid parameters.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RequirementError {
    /// The regular expression did not compile.
    #[error("invalid regex {pattern:?}: {detail}")]
    Regex {
        /// The pattern as given.
        pattern: String,
        /// Error reported by the regex engine.
        detail: String,
    },

    /// A similarity threshold outside `[0, 1]`.
    #[error("similarity threshold must be within [0, 1], got {0}")]
    Threshold(f64),

    /// A negative tolerance, or a range whose lower bound exceeds the upper.
    #[error("invalid tolerance range [{lower}, {upper}]")]
    Tolerance {
        /// Lower bound as given.
        lower: f64,
        /// Upper bound as given.
        upper: f64,
    },
}

/// An error raised by a user-supplied predicate.
///
/// Returning this from a fallible predicate aborts the whole validation call;
/// the differences gathered so far are discarded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct PredicateError {
    /// Human-readable description of the failure.
    pub message: String,
}

impl PredicateError {
    /// Constructs a [`PredicateError`] from a message string.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// An error raised by a [`DataQuery`][crate::DataQuery] implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("query failed: {message}")]
pub struct QueryError {
    /// Human-readable description of the failure.
    pub message: String,
}

impl QueryError {
    /// Constructs a [`QueryError`] from a message string.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// A validation call could not run to completion.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidateError {
    /// A predicate returned an error while evaluating an element.
    #[error("predicate {name:?} failed: {source}")]
    Predicate {
        /// Name given to the predicate.
        name: String,
        /// The error the predicate returned.
        #[source]
        source: PredicateError,
    },

    /// The data does not have the shape the requirement needs.
    #[error("data of type {found} cannot be checked against a {expected} requirement")]
    Shape {
        /// Kind of requirement being applied.
        expected: &'static str,
        /// Type name of the offending data.
        found: &'static str,
    },

    /// A two-argument predicate received something other than a pair.
    #[error("predicate {name:?} expects (actual, expected) pairs, got {found}")]
    Arity {
        /// Name given to the predicate.
        name: String,
        /// Rendered offending element.
        found: String,
    },

    /// Executing a data query failed.
    #[error(transparent)]
    Query(#[from] QueryError),
}
