/// Recursive comparison of data against a classified [`Requirement`].
///
/// The comparator walks the requirement and the data together and returns the
/// raw [`Differences`], before any allowance is applied. Dispatch is on the
/// requirement kind first and the data shape second:
///
/// - mapping requirements need object data; keys are compared in requirement
///   order, then data-only keys are reported as `Extra`;
/// - sequence requirements need array data and compare positionally;
/// - a top-level shape mismatch is an error, but a nested member of the wrong
///   shape is reported as `Invalid` under its key;
/// - set requirements compare membership of the data's elements;
/// - predicate and single-value requirements are applied to each element of
///   array or set data, to each member of object data, or to scalar data
///   directly.
use std::collections::BTreeSet;

use indexmap::IndexMap;

use crate::difference::Difference;
use crate::differences::{Differences, Key};
use crate::error::ValidateError;
use crate::requirement::{Predicate, Requirement, Verdict};
use crate::validate::ValidationConfig;
use crate::value::{Value, ValueMap};

/// Compares data against requirements under one [`ValidationConfig`].
pub(crate) struct Comparator<'a> {
    config: &'a ValidationConfig,
}

impl<'a> Comparator<'a> {
    pub(crate) fn new(config: &'a ValidationConfig) -> Self {
        Self { config }
    }

    /// Compares `data` against `requirement`, failing fast on predicate and
    /// shape errors.
    pub(crate) fn compare(
        &self,
        data: &Value,
        requirement: &Requirement,
    ) -> Result<Differences, ValidateError> {
        match requirement {
            Requirement::Mapping(required) => match data {
                Value::Object(members) => self.compare_mapping(members, required),
                Value::Null
                | Value::Bool(_)
                | Value::Integer(_)
                | Value::Float(_)
                | Value::String(_)
                | Value::Array(_)
                | Value::Set(_) => Err(shape_error(requirement, data)),
            },
            Requirement::Sequence(required) => match data {
                Value::Array(items) => self.compare_sequence(items, required),
                Value::Null
                | Value::Bool(_)
                | Value::Integer(_)
                | Value::Float(_)
                | Value::String(_)
                | Value::Set(_)
                | Value::Object(_) => Err(shape_error(requirement, data)),
            },
            Requirement::Set(required) => match data {
                Value::Object(members) => self.compare_members(members, requirement),
                Value::Array(items) => Ok(compare_set(items.iter(), required)),
                Value::Set(items) => Ok(compare_set(items.iter(), required)),
                Value::Null
                | Value::Bool(_)
                | Value::Integer(_)
                | Value::Float(_)
                | Value::String(_) => Ok(compare_set(std::iter::once(data), required)),
            },
            Requirement::Predicate(p) => self.compare_leaf(data, requirement, Leaf::Predicate(p)),
            Requirement::Single(v) => self.compare_leaf(data, requirement, Leaf::Single(v)),
        }
    }

    fn compare_leaf(
        &self,
        data: &Value,
        requirement: &Requirement,
        leaf: Leaf<'_>,
    ) -> Result<Differences, ValidateError> {
        let mut out = Differences::new();
        match data {
            Value::Object(members) => return self.compare_members(members, requirement),
            Value::Array(items) => {
                for (i, item) in items.iter().enumerate() {
                    if let Some(diff) = self.check(item, leaf, self.config.show_expected)? {
                        out.push(Some(Key::from(i)), diff);
                    }
                }
            }
            Value::Set(items) => {
                for item in items {
                    if let Some(diff) = self.check(item, leaf, self.config.show_expected)? {
                        out.push(None, diff);
                    }
                }
            }
            Value::Null
            | Value::Bool(_)
            | Value::Integer(_)
            | Value::Float(_)
            | Value::String(_) => {
                if let Some(diff) = self.check(data, leaf, true)? {
                    out.push(None, diff);
                }
            }
        }
        Ok(out)
    }

    fn compare_mapping(
        &self,
        members: &ValueMap,
        required: &IndexMap<String, Requirement>,
    ) -> Result<Differences, ValidateError> {
        let mut out = Differences::new();
        for (name, sub) in required {
            let key = Key::from(name.as_str());
            match members.get(name) {
                Some(value) => out.absorb(Some(&key), self.compare_nested(value, sub)?),
                None => {
                    for diff in missing_for(sub) {
                        out.push(Some(key.clone()), diff);
                    }
                }
            }
        }
        for (name, value) in members {
            if !required.contains_key(name) {
                out.push(Some(Key::from(name.as_str())), Difference::Extra(value.clone()));
            }
        }
        Ok(out)
    }

    fn compare_sequence(
        &self,
        items: &[Value],
        required: &[Requirement],
    ) -> Result<Differences, ValidateError> {
        let mut out = Differences::new();
        for i in 0..items.len().max(required.len()) {
            let key = Key::from(i);
            match (items.get(i), required.get(i)) {
                (Some(item), Some(sub)) => {
                    out.absorb(Some(&key), self.compare_nested(item, sub)?);
                }
                (None, Some(sub)) => {
                    for diff in missing_for(sub) {
                        out.push(Some(key.clone()), diff);
                    }
                }
                (Some(item), None) => out.push(Some(key), Difference::Extra(item.clone())),
                (None, None) => {}
            }
        }
        Ok(out)
    }

    /// Compares a member of a mapping or sequence. A member whose shape cannot
    /// hold its sub-requirement is one `Invalid` difference, not an error.
    fn compare_nested(
        &self,
        data: &Value,
        requirement: &Requirement,
    ) -> Result<Differences, ValidateError> {
        let mismatched = match requirement {
            Requirement::Mapping(_) => !matches!(data, Value::Object(_)),
            Requirement::Sequence(_) => !matches!(data, Value::Array(_)),
            Requirement::Set(_) | Requirement::Predicate(_) | Requirement::Single(_) => false,
        };
        if !mismatched {
            return self.compare(data, requirement);
        }
        let diff = match requirement.to_value() {
            Some(expected) => Difference::invalid_expected(data.clone(), expected),
            None => Difference::invalid(data.clone()),
        };
        let mut out = Differences::new();
        out.push(None, diff);
        Ok(out)
    }

    /// Applies a non-mapping requirement to every member of object data.
    fn compare_members(
        &self,
        members: &ValueMap,
        requirement: &Requirement,
    ) -> Result<Differences, ValidateError> {
        let mut out = Differences::new();
        for (name, value) in members {
            let key = Key::from(name.as_str());
            out.absorb(Some(&key), self.compare(value, requirement)?);
        }
        Ok(out)
    }

    fn check(
        &self,
        element: &Value,
        leaf: Leaf<'_>,
        show_expected: bool,
    ) -> Result<Option<Difference>, ValidateError> {
        match leaf {
            Leaf::Predicate(p) => apply_predicate(p, element),
            Leaf::Single(expected) => Ok(self.make_difference(element, expected, show_expected)),
        }
    }

    /// Builds the difference between a leaf value and its expected value, or
    /// `None` when they are equal.
    fn make_difference(
        &self,
        actual: &Value,
        expected: &Value,
        show_expected: bool,
    ) -> Option<Difference> {
        if actual == expected {
            return None;
        }
        if self.config.numeric_deviation {
            if let Some(deviation) = numeric_deviation(actual, expected) {
                return Some(deviation);
            }
        }
        Some(if show_expected {
            Difference::invalid_expected(actual.clone(), expected.clone())
        } else {
            Difference::invalid(actual.clone())
        })
    }
}

/// A requirement applied element by element.
#[derive(Clone, Copy)]
enum Leaf<'r> {
    Predicate(&'r Predicate),
    Single(&'r Value),
}

fn shape_error(requirement: &Requirement, data: &Value) -> ValidateError {
    ValidateError::Shape {
        expected: requirement.kind().as_str(),
        found: data.type_name(),
    }
}

fn apply_predicate(
    predicate: &Predicate,
    element: &Value,
) -> Result<Option<Difference>, ValidateError> {
    Ok(match predicate.evaluate(element)? {
        Verdict::Pass => None,
        Verdict::Fail => Some(Difference::invalid(element.clone())),
        Verdict::Override(diff) => Some(diff),
    })
}

/// `Deviation(actual - expected, expected)` for two numbers, with null on
/// either side standing in for "no counterpart". `None` when the pair does not
/// form a valid deviation.
fn numeric_deviation(actual: &Value, expected: &Value) -> Option<Difference> {
    if actual.is_number() && expected.is_number() {
        let delta = actual.numeric_sub(expected)?;
        return Difference::deviation(delta, expected.clone()).ok();
    }
    if actual.is_number() && expected.is_null() {
        return Difference::deviation(actual.clone(), Value::Null).ok();
    }
    if actual.is_null() && expected.is_number() {
        let delta = expected.numeric_neg()?;
        return Difference::deviation(delta, expected.clone()).ok();
    }
    None
}

/// The differences reported when a required key or position is absent.
fn missing_for(requirement: &Requirement) -> Vec<Difference> {
    match requirement {
        Requirement::Predicate(_) => vec![Difference::invalid(Value::Null)],
        Requirement::Single(v) => vec![Difference::Missing(v.clone())],
        Requirement::Set(items) => items.iter().cloned().map(Difference::Missing).collect(),
        Requirement::Mapping(_) | Requirement::Sequence(_) => match requirement.to_value() {
            Some(v) => vec![Difference::Missing(v)],
            None => vec![Difference::invalid(Value::Null)],
        },
    }
}

/// Membership comparison: `Missing` for each required element absent from the
/// data (in sorted order), then `Extra` for each distinct data element the
/// requirement lacks (in data order).
fn compare_set<'v>(
    elements: impl Iterator<Item = &'v Value> + Clone,
    required: &BTreeSet<Value>,
) -> Differences {
    let present: BTreeSet<&Value> = elements.clone().collect();
    let mut out = Differences::new();
    for r in required {
        if !present.contains(r) {
            out.push(None, Difference::Missing(r.clone()));
        }
    }
    let mut seen = BTreeSet::new();
    for e in elements {
        if !required.contains(e) && seen.insert(e) {
            out.push(None, Difference::Extra(e.clone()));
        }
    }
    out
}
