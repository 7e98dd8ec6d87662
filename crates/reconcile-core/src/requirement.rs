//! Requirement classification and predicates.
//!
//! A [`Requirement`] is the tagged form of "what the data should look like".
//! Literal values are classified by shape via `Requirement::from(Value)`;
//! callables only enter through [`Predicate`], so the comparator dispatches
//! over a closed set of strategies instead of probing types at every element.

use std::collections::BTreeSet;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use regex::Regex;

use crate::difference::Difference;
use crate::error::{PredicateError, RequirementError, ValidateError};
use crate::fuzzy;
use crate::value::Value;

/// Outcome of applying a predicate to one element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// The element satisfies the predicate.
    Pass,
    /// The element fails; the comparator reports `Invalid(element)`.
    Fail,
    /// The element fails and the predicate supplies its own difference,
    /// which is reported verbatim.
    Override(Difference),
}

impl From<bool> for Verdict {
    fn from(ok: bool) -> Self {
        if ok { Self::Pass } else { Self::Fail }
    }
}

impl From<Difference> for Verdict {
    fn from(d: Difference) -> Self {
        Self::Override(d)
    }
}

impl From<Option<Difference>> for Verdict {
    fn from(d: Option<Difference>) -> Self {
        d.map_or(Self::Pass, Self::Override)
    }
}

type UnaryFn = dyn Fn(&Value) -> Result<Verdict, PredicateError>;
type BinaryFn = dyn Fn(&Value, &Value) -> Result<Verdict, PredicateError>;

#[derive(Clone)]
enum PredicateFn {
    Unary(Rc<UnaryFn>),
    Binary(Rc<BinaryFn>),
    Regex(Regex),
}

/// A named test applied to data elements.
///
/// Unary predicates see each element. Pair predicates see `(actual, expected)`
/// and expect each element to be a two-element array. Errors returned by a
/// fallible predicate abort the validation call.
#[derive(Clone)]
pub struct Predicate {
    name: String,
    func: PredicateFn,
}

impl Predicate {
    /// Wraps an infallible unary function returning `bool`, a [`Difference`],
    /// `Option<Difference>`, or a [`Verdict`].
    pub fn new<F, V>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&Value) -> V + 'static,
        V: Into<Verdict>,
    {
        Self {
            name: name.into(),
            func: PredicateFn::Unary(Rc::new(move |v| Ok(f(v).into()))),
        }
    }

    /// Wraps a fallible unary function.
    pub fn try_new<F, V>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&Value) -> Result<V, PredicateError> + 'static,
        V: Into<Verdict>,
    {
        Self {
            name: name.into(),
            func: PredicateFn::Unary(Rc::new(move |v| f(v).map(Into::into))),
        }
    }

    /// Wraps an infallible function of `(actual, expected)`.
    pub fn pair<F, V>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&Value, &Value) -> V + 'static,
        V: Into<Verdict>,
    {
        Self {
            name: name.into(),
            func: PredicateFn::Binary(Rc::new(move |a, b| Ok(f(a, b).into()))),
        }
    }

    /// Wraps a fallible function of `(actual, expected)`.
    pub fn try_pair<F, V>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&Value, &Value) -> Result<V, PredicateError> + 'static,
        V: Into<Verdict>,
    {
        Self {
            name: name.into(),
            func: PredicateFn::Binary(Rc::new(move |a, b| f(a, b).map(Into::into))),
        }
    }

    /// Passes strings containing a match for `pattern`; everything else fails.
    pub fn regex(pattern: &str) -> Result<Self, RequirementError> {
        let regex = Regex::new(pattern).map_err(|e| RequirementError::Regex {
            pattern: pattern.to_owned(),
            detail: e.to_string(),
        })?;
        Ok(Self {
            name: pattern.to_owned(),
            func: PredicateFn::Regex(regex),
        })
    }

    /// Passes strings whose similarity to `expected` is at least `threshold`.
    ///
    /// Failing elements are reported as `Invalid(actual, expected)`.
    pub fn fuzzy(expected: impl Into<String>, threshold: f64) -> Result<Self, RequirementError> {
        fuzzy::check_threshold(threshold)?;
        let expected = expected.into();
        let name = format!("fuzzy({expected:?}, {threshold})");
        Ok(Self::new(name, move |v: &Value| match v.as_str() {
            Some(s) if fuzzy::similarity(s, &expected) >= threshold => Verdict::Pass,
            Some(_) | None => {
                Verdict::Override(Difference::invalid_expected(v.clone(), expected.as_str()))
            }
        }))
    }

    /// The name given at construction (the pattern, for regex predicates).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of arguments the predicate takes.
    pub fn arity(&self) -> usize {
        match self.func {
            PredicateFn::Binary(_) => 2,
            PredicateFn::Unary(_) | PredicateFn::Regex(_) => 1,
        }
    }

    /// Applies the predicate to one element.
    pub fn evaluate(&self, element: &Value) -> Result<Verdict, ValidateError> {
        let result = match &self.func {
            PredicateFn::Unary(f) => f(element),
            PredicateFn::Regex(re) => Ok(element.as_str().is_some_and(|s| re.is_match(s)).into()),
            PredicateFn::Binary(f) => match element.as_array().map(Vec::as_slice) {
                Some([actual, expected]) => f(actual, expected),
                Some(_) | None => {
                    return Err(ValidateError::Arity {
                        name: self.name.clone(),
                        found: element.to_string(),
                    });
                }
            },
        };
        result.map_err(|source| ValidateError::Predicate {
            name: self.name.clone(),
            source,
        })
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Predicate")
            .field("name", &self.name)
            .field("arity", &self.arity())
            .finish()
    }
}

/// What data is validated against, classified by shape.
#[derive(Debug, Clone)]
pub enum Requirement {
    /// Each element must satisfy a predicate.
    Predicate(Predicate),
    /// Each element must equal this value.
    Single(Value),
    /// The data's elements must be exactly this set.
    Set(BTreeSet<Value>),
    /// Member-by-member requirements for mapping data.
    Mapping(IndexMap<String, Requirement>),
    /// Position-by-position requirements for sequence data.
    Sequence(Vec<Requirement>),
}

/// Tag identifying the shape of a [`Requirement`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequirementKind {
    /// [`Requirement::Predicate`].
    Predicate,
    /// [`Requirement::Single`].
    Single,
    /// [`Requirement::Set`].
    Set,
    /// [`Requirement::Mapping`].
    Mapping,
    /// [`Requirement::Sequence`].
    Sequence,
}

impl RequirementKind {
    /// Lowercase name used in messages and logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Predicate => "predicate",
            Self::Single => "single-value",
            Self::Set => "set",
            Self::Mapping => "mapping",
            Self::Sequence => "sequence",
        }
    }
}

impl fmt::Display for RequirementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Requirement {
    /// Classifies a literal value; same as `Requirement::from(value.into())`.
    pub fn value(value: impl Into<Value>) -> Self {
        Self::from(value.into())
    }

    /// Builds a set requirement.
    pub fn set<I, T>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Value>,
    {
        Self::Set(items.into_iter().map(Into::into).collect())
    }

    /// Builds a mapping requirement from `(key, requirement)` pairs.
    pub fn mapping<I, K, R>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, R)>,
        K: Into<String>,
        R: Into<Requirement>,
    {
        Self::Mapping(
            entries
                .into_iter()
                .map(|(k, r)| (k.into(), r.into()))
                .collect(),
        )
    }

    /// Builds a sequence requirement.
    pub fn sequence<I, R>(items: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<Requirement>,
    {
        Self::Sequence(items.into_iter().map(Into::into).collect())
    }

    /// The shape tag.
    pub fn kind(&self) -> RequirementKind {
        match self {
            Self::Predicate(_) => RequirementKind::Predicate,
            Self::Single(_) => RequirementKind::Single,
            Self::Set(_) => RequirementKind::Set,
            Self::Mapping(_) => RequirementKind::Mapping,
            Self::Sequence(_) => RequirementKind::Sequence,
        }
    }

    /// Converts back to a literal value; `None` if any part is a predicate.
    pub fn to_value(&self) -> Option<Value> {
        match self {
            Self::Predicate(_) => None,
            Self::Single(v) => Some(v.clone()),
            Self::Set(s) => Some(Value::Set(s.clone())),
            Self::Mapping(m) => m
                .iter()
                .map(|(k, r)| Some((k.clone(), r.to_value()?)))
                .collect::<Option<IndexMap<_, _>>>()
                .map(Value::Object),
            Self::Sequence(items) => items
                .iter()
                .map(Requirement::to_value)
                .collect::<Option<Vec<_>>>()
                .map(Value::Array),
        }
    }
}

/// Classifies a literal: object → mapping, set → set, array → sequence,
/// anything else → single value. Nested members are classified recursively.
impl From<Value> for Requirement {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(members) => Self::Mapping(
                members
                    .into_iter()
                    .map(|(k, v)| (k, Requirement::from(v)))
                    .collect(),
            ),
            Value::Set(items) => Self::Set(items),
            Value::Array(items) => {
                Self::Sequence(items.into_iter().map(Requirement::from).collect())
            }
            scalar @ (Value::Null
            | Value::Bool(_)
            | Value::Integer(_)
            | Value::Float(_)
            | Value::String(_)) => Self::Single(scalar),
        }
    }
}

impl From<Predicate> for Requirement {
    fn from(p: Predicate) -> Self {
        Self::Predicate(p)
    }
}

impl From<&str> for Requirement {
    fn from(v: &str) -> Self {
        Self::Single(Value::from(v))
    }
}

impl From<i64> for Requirement {
    fn from(v: i64) -> Self {
        Self::Single(Value::Integer(v))
    }
}

impl From<i32> for Requirement {
    fn from(v: i32) -> Self {
        Self::Single(Value::from(v))
    }
}

impl From<f64> for Requirement {
    fn from(v: f64) -> Self {
        Self::Single(Value::Float(v))
    }
}

impl From<bool> for Requirement {
    fn from(v: bool) -> Self {
        Self::Single(Value::Bool(v))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used)]

    use super::*;

    #[test]
    fn classification_follows_value_shape() {
        assert_eq!(
            Requirement::value(Value::object([("a", 1)])).kind(),
            RequirementKind::Mapping
        );
        assert_eq!(
            Requirement::value(Value::set(["a"])).kind(),
            RequirementKind::Set
        );
        assert_eq!(
            Requirement::value(Value::array([1, 2])).kind(),
            RequirementKind::Sequence
        );
        assert_eq!(Requirement::value("x").kind(), RequirementKind::Single);
        assert_eq!(Requirement::value(Value::Null).kind(), RequirementKind::Single);
        let p = Predicate::new("any", |_: &Value| true);
        assert_eq!(Requirement::from(p).kind(), RequirementKind::Predicate);
    }

    #[test]
    fn nested_members_are_classified() {
        let req = Requirement::value(Value::object([("tags", Value::set(["x"]))]));
        let Requirement::Mapping(members) = &req else {
            panic!("expected mapping, got {req:?}");
        };
        assert_eq!(
            members.get("tags").map(Requirement::kind),
            Some(RequirementKind::Set)
        );
    }

    #[test]
    fn to_value_round_trips_literals_only() {
        let literal = Value::object([("a", Value::array([1, 2]))]);
        assert_eq!(
            Requirement::value(literal.clone()).to_value(),
            Some(literal)
        );
        let with_predicate = Requirement::mapping([(
            "a",
            Requirement::from(Predicate::new("any", |_: &Value| true)),
        )]);
        assert_eq!(with_predicate.to_value(), None);
    }

    #[test]
    fn verdict_conversions() {
        assert_eq!(Verdict::from(true), Verdict::Pass);
        assert_eq!(Verdict::from(false), Verdict::Fail);
        assert_eq!(
            Verdict::from(Difference::extra(1)),
            Verdict::Override(Difference::extra(1))
        );
        assert_eq!(Verdict::from(None::<Difference>), Verdict::Pass);
    }

    #[test]
    fn unary_predicate_maps_return_values() {
        let positive = Predicate::new("positive", |v: &Value| {
            v.as_f64().is_some_and(|n| n > 0.0)
        });
        assert_eq!(positive.arity(), 1);
        assert_eq!(
            positive.evaluate(&Value::Integer(3)).expect("ok"),
            Verdict::Pass
        );
        assert_eq!(
            positive.evaluate(&Value::Integer(-3)).expect("ok"),
            Verdict::Fail
        );
    }

    #[test]
    fn fallible_predicate_error_names_predicate() {
        let p = Predicate::try_new("strict", |v: &Value| {
            if v.is_null() {
                Err(PredicateError::new("null not supported"))
            } else {
                Ok(true)
            }
        });
        let err = p.evaluate(&Value::Null).expect_err("should fail");
        assert_eq!(
            err,
            ValidateError::Predicate {
                name: "strict".to_owned(),
                source: PredicateError::new("null not supported"),
            }
        );
    }

    #[test]
    fn pair_predicate_unpacks_two_element_arrays() {
        let p = Predicate::pair("ge", |a: &Value, b: &Value| a >= b);
        assert_eq!(p.arity(), 2);
        assert_eq!(
            p.evaluate(&Value::array([5, 3])).expect("ok"),
            Verdict::Pass
        );
        assert_eq!(
            p.evaluate(&Value::array([1, 3])).expect("ok"),
            Verdict::Fail
        );
        let err = p.evaluate(&Value::Integer(5)).expect_err("not a pair");
        assert!(matches!(err, ValidateError::Arity { .. }));
    }

    #[test]
    fn regex_predicate_matches_strings_only() {
        let p = Predicate::regex("^[A-Z]{2}$").expect("valid regex");
        assert_eq!(p.name(), "^[A-Z]{2}$");
        assert_eq!(p.evaluate(&Value::from("DE")).expect("ok"), Verdict::Pass);
        assert_eq!(p.evaluate(&Value::from("DEU")).expect("ok"), Verdict::Fail);
        assert_eq!(p.evaluate(&Value::Integer(12)).expect("ok"), Verdict::Fail);
    }

    #[test]
    fn invalid_regex_is_a_construction_error() {
        let err = Predicate::regex("(").expect_err("unbalanced");
        assert!(matches!(err, RequirementError::Regex { .. }));
    }

    #[test]
    fn fuzzy_predicate_reports_expected_value() {
        let p = Predicate::fuzzy("kitten", 0.5).expect("valid threshold");
        assert_eq!(
            p.evaluate(&Value::from("sitting")).expect("ok"),
            Verdict::Pass
        );
        assert_eq!(
            p.evaluate(&Value::from("xyz")).expect("ok"),
            Verdict::Override(Difference::invalid_expected("xyz", "kitten"))
        );
        assert!(Predicate::fuzzy("kitten", 1.5).is_err());
    }
}
