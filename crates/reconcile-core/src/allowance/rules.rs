//! Built-in allowance rules.
//!
//! Each rule is a small struct implementing [`Allowance`], built through a
//! lowercase factory function (`allowed_missing()`, `allowed_limit(3)`, ...).
//! Factories that take numeric bounds validate them and return a
//! [`RequirementError`] for ranges that could never match anything sensibly.

use indexmap::IndexMap;

use super::{Allowance, Granularity};
use crate::difference::{Difference, DifferenceKind};
use crate::differences::Key;
use crate::error::RequirementError;
use crate::fuzzy;
use crate::value::Value;

// ---------------------------------------------------------------------------
// Element rules
// ---------------------------------------------------------------------------

/// Allows every difference of one kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllowedKind {
    kind: DifferenceKind,
}

/// Allows every [`Difference::Missing`].
pub fn allowed_missing() -> AllowedKind {
    AllowedKind {
        kind: DifferenceKind::Missing,
    }
}

/// Allows every [`Difference::Extra`].
pub fn allowed_extra() -> AllowedKind {
    AllowedKind {
        kind: DifferenceKind::Extra,
    }
}

/// Allows every [`Difference::Invalid`].
pub fn allowed_invalid() -> AllowedKind {
    AllowedKind {
        kind: DifferenceKind::Invalid,
    }
}

impl Allowance for AllowedKind {
    fn name(&self) -> &str {
        match self.kind {
            DifferenceKind::Missing => "allowed_missing",
            DifferenceKind::Extra => "allowed_extra",
            DifferenceKind::Invalid => "allowed_invalid",
            DifferenceKind::Deviation => "allowed_deviation",
        }
    }

    fn allows(&mut self, _key: Option<&Key>, difference: &Difference) -> bool {
        difference.kind() == self.kind
    }
}

/// Allows differences whose [`args`][Difference::args] satisfy a predicate.
pub struct AllowedArgs<F> {
    predicate: F,
}

/// Allows a difference when `predicate(difference.args())` returns `true`.
///
/// `Missing(5)` and `Extra(5)` both present `[5]`; `Invalid("x", "y")`
/// presents `["x", "y"]`; a deviation presents `[delta, reference]`.
pub fn allowed_args<F>(predicate: F) -> AllowedArgs<F>
where
    F: FnMut(&[Value]) -> bool,
{
    AllowedArgs { predicate }
}

impl<F> Allowance for AllowedArgs<F>
where
    F: FnMut(&[Value]) -> bool,
{
    fn name(&self) -> &str {
        "allowed_args"
    }

    fn allows(&mut self, _key: Option<&Key>, difference: &Difference) -> bool {
        (self.predicate)(&difference.args())
    }
}

/// Allows `Invalid(actual, expected)` differences between strings at least
/// `threshold` similar.
pub fn allowed_fuzzy(
    threshold: f64,
) -> Result<AllowedArgs<impl FnMut(&[Value]) -> bool>, RequirementError> {
    fuzzy::check_threshold(threshold)?;
    Ok(allowed_args(move |args: &[Value]| match args {
        [actual, expected] => match (actual.as_str(), expected.as_str()) {
            (Some(a), Some(e)) => fuzzy::similarity(a, e) >= threshold,
            (Some(_) | None, Some(_) | None) => false,
        },
        _ => false,
    }))
}

/// Allows differences filed under keys that satisfy a predicate.
pub struct AllowedKey<F> {
    predicate: F,
}

/// Allows a difference when `predicate(key)` returns `true`. Unkeyed
/// differences present `None`.
pub fn allowed_key<F>(predicate: F) -> AllowedKey<F>
where
    F: FnMut(Option<&Key>) -> bool,
{
    AllowedKey { predicate }
}

impl<F> Allowance for AllowedKey<F>
where
    F: FnMut(Option<&Key>) -> bool,
{
    fn name(&self) -> &str {
        "allowed_key"
    }

    fn allows(&mut self, key: Option<&Key>, _difference: &Difference) -> bool {
        (self.predicate)(key)
    }
}

/// Allows deviations within a closed range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AllowedDeviation {
    lower: f64,
    upper: f64,
    percent: bool,
}

fn tolerance_range(tolerance: f64) -> Result<(f64, f64), RequirementError> {
    if tolerance >= 0.0 {
        Ok((-tolerance, tolerance))
    } else {
        Err(RequirementError::Tolerance {
            lower: -tolerance,
            upper: tolerance,
        })
    }
}

fn checked_range(
    lower: f64,
    upper: f64,
    percent: bool,
) -> Result<AllowedDeviation, RequirementError> {
    if lower <= upper {
        Ok(AllowedDeviation {
            lower,
            upper,
            percent,
        })
    } else {
        Err(RequirementError::Tolerance { lower, upper })
    }
}

/// Allows deviations with `|delta| <= tolerance`.
pub fn allowed_deviation(tolerance: f64) -> Result<AllowedDeviation, RequirementError> {
    let (lower, upper) = tolerance_range(tolerance)?;
    checked_range(lower, upper, false)
}

/// Allows deviations with `lower <= delta <= upper`.
pub fn allowed_deviation_range(
    lower: f64,
    upper: f64,
) -> Result<AllowedDeviation, RequirementError> {
    checked_range(lower, upper, false)
}

/// Allows deviations with `|delta / reference| <= tolerance`.
///
/// A deviation with no reference, or a zero reference, counts as 0 percent.
pub fn allowed_percent_deviation(tolerance: f64) -> Result<AllowedDeviation, RequirementError> {
    let (lower, upper) = tolerance_range(tolerance)?;
    checked_range(lower, upper, true)
}

/// Allows deviations with `lower <= delta / reference <= upper`.
pub fn allowed_percent_deviation_range(
    lower: f64,
    upper: f64,
) -> Result<AllowedDeviation, RequirementError> {
    checked_range(lower, upper, true)
}

impl Allowance for AllowedDeviation {
    fn name(&self) -> &str {
        if self.percent {
            "allowed_percent_deviation"
        } else {
            "allowed_deviation"
        }
    }

    fn allows(&mut self, _key: Option<&Key>, difference: &Difference) -> bool {
        let Some(deviation) = difference.as_deviation() else {
            return false;
        };
        let amount = if self.percent {
            deviation.percent().unwrap_or(0.0)
        } else {
            deviation.delta().as_f64().unwrap_or(f64::NAN)
        };
        // NaN fails both comparisons.
        self.lower <= amount && amount <= self.upper
    }
}

// ---------------------------------------------------------------------------
// Group rules
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
enum Specific {
    Everywhere(Vec<Difference>),
    ByKey(IndexMap<Key, Vec<Difference>>),
}

/// Allows each listed difference once per group.
///
/// A listed difference is used up as soon as this rule allows it, even if a
/// rule evaluated later (such as an exhausted [`allowed_limit`]) then keeps
/// the difference. A second equal difference in the same group is not
/// allowed in that case.
#[derive(Debug, Clone)]
pub struct AllowedSpecific {
    source: Specific,
    remaining: Vec<Difference>,
}

/// Allows each of `differences` once in every group.
///
/// Listing a difference twice allows two equal differences in the same group.
pub fn allowed_specific<I>(differences: I) -> AllowedSpecific
where
    I: IntoIterator<Item = Difference>,
{
    AllowedSpecific {
        source: Specific::Everywhere(differences.into_iter().collect()),
        remaining: Vec::new(),
    }
}

/// Allows the listed differences once each, only under their own key.
///
/// Unkeyed differences are never allowed by this rule.
pub fn allowed_specific_keyed<I>(differences: I) -> AllowedSpecific
where
    I: IntoIterator<Item = (Key, Vec<Difference>)>,
{
    AllowedSpecific {
        source: Specific::ByKey(differences.into_iter().collect()),
        remaining: Vec::new(),
    }
}

impl Allowance for AllowedSpecific {
    fn name(&self) -> &str {
        "allowed_specific"
    }

    fn granularity(&self) -> Granularity {
        Granularity::Group
    }

    fn start_group(&mut self, key: Option<&Key>) {
        self.remaining = match &self.source {
            Specific::Everywhere(list) => list.clone(),
            Specific::ByKey(map) => key
                .and_then(|k| map.get(k))
                .cloned()
                .unwrap_or_default(),
        };
    }

    fn allows(&mut self, _key: Option<&Key>, difference: &Difference) -> bool {
        match self.remaining.iter().position(|d| d == difference) {
            Some(i) => {
                self.remaining.swap_remove(i);
                true
            }
            None => false,
        }
    }

    fn end_group(&mut self, _key: Option<&Key>) {
        self.remaining.clear();
    }
}

// ---------------------------------------------------------------------------
// Collection rules
// ---------------------------------------------------------------------------

/// Allows at most a fixed number of differences across the whole result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllowedLimit {
    limit: usize,
    seen: usize,
}

/// Allows the first `limit` differences it is asked about.
///
/// Combined with cheaper rules via [`and`][super::AllowanceExt::and], only
/// differences those rules allow are counted.
pub fn allowed_limit(limit: usize) -> AllowedLimit {
    AllowedLimit { limit, seen: 0 }
}

impl Allowance for AllowedLimit {
    fn name(&self) -> &str {
        "allowed_limit"
    }

    fn granularity(&self) -> Granularity {
        Granularity::Collection
    }

    fn start_collection(&mut self) {
        self.seen = 0;
    }

    fn allows(&mut self, _key: Option<&Key>, _difference: &Difference) -> bool {
        self.seen += 1;
        self.seen <= self.limit
    }
}
