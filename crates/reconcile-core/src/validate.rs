/// Validation entry points and configuration.
///
/// [`validate`] takes an already-built [`Requirement`], runs the comparator,
/// and returns the raw differences. Allowances are applied by
/// [`AllowanceStack::validate`][crate::AllowanceStack::validate], which wraps
/// these functions.
use serde::Deserialize;
use tracing::debug;

use crate::compare::Comparator;
use crate::differences::Differences;
use crate::error::ValidateError;
use crate::query::DataQuery;
use crate::requirement::Requirement;
use crate::value::Value;

/// Options that change how leaf mismatches are reported.
///
/// # Default
///
/// ```
/// # use reconcile_core::ValidationConfig;
/// let cfg = ValidationConfig::default();
/// assert!(cfg.numeric_deviation);
/// assert!(cfg.show_expected);
/// ```
///
/// Deserializes from any serde format; missing fields take their defaults:
///
/// ```
/// # use reconcile_core::ValidationConfig;
/// let cfg: ValidationConfig = serde_json::from_str(r#"{"show_expected": false}"#).unwrap();
/// assert!(cfg.numeric_deviation);
/// assert!(!cfg.show_expected);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ValidationConfig {
    /// Report numeric mismatches as `Deviation` rather than `Invalid`.
    /// Default `true`.
    pub numeric_deviation: bool,
    /// Include the expected value in `Invalid` differences produced while
    /// checking the elements of a collection against a single value.
    /// Default `true`.
    pub show_expected: bool,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            numeric_deviation: true,
            show_expected: true,
        }
    }
}

/// Validates `data` against `requirement` with the default configuration.
///
/// Returns the differences found; an empty collection means the data
/// satisfies the requirement.
pub fn validate(
    data: &Value,
    requirement: &Requirement,
) -> Result<Differences, ValidateError> {
    validate_with_config(data, requirement, &ValidationConfig::default())
}

/// Like [`validate`], with explicit configuration.
pub fn validate_with_config(
    data: &Value,
    requirement: &Requirement,
    config: &ValidationConfig,
) -> Result<Differences, ValidateError> {
    debug!(
        requirement = %requirement.kind(),
        data = data.type_name(),
        "validating"
    );
    let diffs = Comparator::new(config).compare(data, requirement)?;
    debug!(differences = diffs.len(), "comparison finished");
    Ok(diffs)
}

/// Returns `true` when `data` satisfies `requirement`.
pub fn is_valid(data: &Value, requirement: &Requirement) -> Result<bool, ValidateError> {
    validate(data, requirement).map(|d| d.is_empty())
}

/// Executes both queries and validates the data result against the
/// requirement result, which is classified like any literal value.
///
/// The requirement query runs only after the data query succeeds.
pub fn validate_query(
    data: &dyn DataQuery,
    requirement: &dyn DataQuery,
    config: &ValidationConfig,
) -> Result<Differences, ValidateError> {
    let data = data.execute()?;
    let requirement = Requirement::from(requirement.execute()?);
    validate_with_config(&data, &requirement, config)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used)]

    use super::*;
    use crate::difference::Difference;
    use crate::error::QueryError;

    struct Broken;

    impl DataQuery for Broken {
        fn execute(&self) -> Result<Value, QueryError> {
            Err(QueryError::new("connection refused"))
        }
    }

    #[test]
    fn default_config() {
        let cfg = ValidationConfig::default();
        assert!(cfg.numeric_deviation);
        assert!(cfg.show_expected);
    }

    #[test]
    fn config_deserializes_with_defaults() {
        let cfg: ValidationConfig =
            serde_json::from_str(r#"{"numeric_deviation": false}"#).expect("valid config");
        assert!(!cfg.numeric_deviation);
        assert!(cfg.show_expected);

        let unknown = serde_json::from_str::<ValidationConfig>(r#"{"strict": true}"#);
        assert!(unknown.is_err());
    }

    #[test]
    fn is_valid_reflects_emptiness() {
        let req = Requirement::value(Value::set(["a", "b"]));
        assert!(is_valid(&Value::array(["a", "b"]), &req).expect("ok"));
        assert!(!is_valid(&Value::array(["a"]), &req).expect("ok"));
    }

    #[test]
    fn validate_query_compares_results() {
        let data = Value::array(["a", "b", "x"]);
        let req = Value::set(["a", "b"]);
        let diffs =
            validate_query(&data, &req, &ValidationConfig::default()).expect("queries succeed");
        assert_eq!(diffs.unkeyed(), [Difference::extra("x")]);
    }

    #[test]
    fn validate_query_surfaces_query_errors() {
        let err = validate_query(&Broken, &Value::Null, &ValidationConfig::default())
            .expect_err("query fails");
        assert_eq!(err, ValidateError::Query(QueryError::new("connection refused")));
    }
}
