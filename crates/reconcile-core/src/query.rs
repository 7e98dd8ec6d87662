//! Data query trait for validating against an external producer.
//!
//! The engine performs no I/O. Callers that load data from files, databases,
//! or services implement [`DataQuery`] and hand it to
//! [`validate_query`][crate::validate_query], which executes the query eagerly
//! and validates the resulting [`Value`].

use crate::error::QueryError;
use crate::value::Value;

/// An opaque producer of a [`Value`].
///
/// The trait is object-safe; [`validate_query`][crate::validate_query] takes
/// `&dyn DataQuery`. Implementations may cache, but each call to
/// [`execute`][DataQuery::execute] must return the data as of that call.
pub trait DataQuery {
    /// Runs the query and returns its result.
    fn execute(&self) -> Result<Value, QueryError>;
}

/// A literal value is a query that returns itself.
impl DataQuery for Value {
    fn execute(&self) -> Result<Value, QueryError> {
        Ok(self.clone())
    }
}
