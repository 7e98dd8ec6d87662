#![deny(clippy::print_stdout, clippy::print_stderr)]

pub mod allowance;
pub mod compare;
pub mod difference;
pub mod differences;
pub mod error;
pub mod fuzzy;
pub mod query;
pub mod requirement;
pub mod validate;
pub mod value;

pub use allowance::{
    Allowance, AllowanceExt, AllowanceScope, AllowanceStack, AllowedArgs, AllowedDeviation,
    AllowedKey, AllowedKind, AllowedLimit, AllowedSpecific, And, Granularity, Or, WithMessage,
    allowed_args, allowed_deviation, allowed_deviation_range, allowed_extra, allowed_fuzzy,
    allowed_invalid, allowed_key, allowed_limit, allowed_missing, allowed_percent_deviation,
    allowed_percent_deviation_range, allowed_specific, allowed_specific_keyed,
};
pub use difference::{Deviation, Difference, DifferenceKind};
pub use differences::{Differences, Key, KeyPart};
pub use error::{DifferenceError, PredicateError, QueryError, RequirementError, ValidateError};
pub use fuzzy::{is_similar, levenshtein, similarity};
pub use query::DataQuery;
pub use requirement::{Predicate, Requirement, RequirementKind, Verdict};
pub use validate::{ValidationConfig, is_valid, validate, validate_query, validate_with_config};
pub use value::{Value, ValueMap};

/// Returns the current version of the reconcile-core library.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used)]

    use super::*;

    #[test]
    fn version_is_semver() {
        let v = version();
        let parts: Vec<&str> = v.split('.').collect();
        assert_eq!(parts.len(), 3, "version should have 3 parts: {v}");
        for part in parts {
            part.parse::<u32>().expect("each part should be a number");
        }
    }
}
