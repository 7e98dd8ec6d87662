/// Difference value types produced by the comparator.
///
/// A [`Difference`] records one way an element of the data failed to satisfy
/// its requirement. Differences are plain values: equality is structural, and
/// [`Difference::args`] returns the values each one was built from so that
/// allowance predicates can re-inspect them.
use std::fmt;

use serde::Serialize;

use crate::error::DifferenceError;
use crate::value::Value;

/// A single discrepancy between data and requirement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "args", rename_all = "snake_case")]
pub enum Difference {
    /// A required element that is absent from the data.
    Missing(Value),
    /// An element of the data that the requirement does not contain.
    Extra(Value),
    /// An element that is present but fails a predicate or equality test.
    Invalid {
        /// The offending value from the data.
        actual: Value,
        /// The value it was compared against, when there is one.
        expected: Option<Value>,
    },
    /// A numeric value that differs from a numeric reference.
    Deviation(Deviation),
}

/// Tag identifying the variant of a [`Difference`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DifferenceKind {
    /// [`Difference::Missing`].
    Missing,
    /// [`Difference::Extra`].
    Extra,
    /// [`Difference::Invalid`].
    Invalid,
    /// [`Difference::Deviation`].
    Deviation,
}

impl fmt::Display for DifferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing => f.write_str("Missing"),
            Self::Extra => f.write_str("Extra"),
            Self::Invalid => f.write_str("Invalid"),
            Self::Deviation => f.write_str("Deviation"),
        }
    }
}

impl Difference {
    /// Constructs a [`Difference::Missing`].
    pub fn missing(value: impl Into<Value>) -> Self {
        Self::Missing(value.into())
    }

    /// Constructs a [`Difference::Extra`].
    pub fn extra(value: impl Into<Value>) -> Self {
        Self::Extra(value.into())
    }

    /// Constructs a [`Difference::Invalid`] with no expected value.
    pub fn invalid(actual: impl Into<Value>) -> Self {
        Self::Invalid {
            actual: actual.into(),
            expected: None,
        }
    }

    /// Constructs a [`Difference::Invalid`] carrying the expected value.
    pub fn invalid_expected(actual: impl Into<Value>, expected: impl Into<Value>) -> Self {
        Self::Invalid {
            actual: actual.into(),
            expected: Some(expected.into()),
        }
    }

    /// Constructs a [`Difference::Deviation`]; see [`Deviation::new`].
    pub fn deviation(
        delta: impl Into<Value>,
        reference: impl Into<Value>,
    ) -> Result<Self, DifferenceError> {
        Deviation::new(delta, reference).map(Self::Deviation)
    }

    /// Returns the variant tag.
    pub fn kind(&self) -> DifferenceKind {
        match self {
            Self::Missing(_) => DifferenceKind::Missing,
            Self::Extra(_) => DifferenceKind::Extra,
            Self::Invalid { .. } => DifferenceKind::Invalid,
            Self::Deviation(_) => DifferenceKind::Deviation,
        }
    }

    /// The values this difference was constructed from.
    ///
    /// `[value]` for `Missing` and `Extra`; `[actual]` or `[actual, expected]`
    /// for `Invalid`; `[delta, reference]` for `Deviation` (with `Null` when
    /// there is no reference).
    pub fn args(&self) -> Vec<Value> {
        match self {
            Self::Missing(v) | Self::Extra(v) => vec![v.clone()],
            Self::Invalid {
                actual,
                expected: None,
            } => vec![actual.clone()],
            Self::Invalid {
                actual,
                expected: Some(expected),
            } => vec![actual.clone(), expected.clone()],
            Self::Deviation(d) => vec![d.delta.clone(), d.reference.clone()],
        }
    }

    /// Returns the inner [`Deviation`] if this is one.
    pub fn as_deviation(&self) -> Option<&Deviation> {
        match self {
            Self::Deviation(d) => Some(d),
            Self::Missing(_) | Self::Extra(_) | Self::Invalid { .. } => None,
        }
    }
}

/// The signed amount by which a numeric value differs from its reference.
///
/// Fields are private so every instance has passed the shape checks in
/// [`Deviation::new`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Deviation {
    delta: Value,
    reference: Value,
}

impl Deviation {
    /// Builds a deviation of `delta` (actual − reference) from `reference`.
    ///
    /// `reference` may be `Null` when the data had no counterpart. Fails when
    /// `delta` is not numeric, when `reference` is neither numeric nor null,
    /// when `reference` is `NaN`, or when `delta` is zero against a numeric
    /// reference.
    pub fn new(
        delta: impl Into<Value>,
        reference: impl Into<Value>,
    ) -> Result<Self, DifferenceError> {
        let delta = delta.into();
        let reference = reference.into();

        if !delta.is_numeric() {
            return Err(DifferenceError::NonNumericDelta {
                found: delta.to_string(),
            });
        }
        if !reference.is_null() {
            if !reference.is_numeric() {
                return Err(DifferenceError::NonNumericReference {
                    found: reference.to_string(),
                });
            }
            if reference.is_nan() {
                return Err(DifferenceError::NanReference);
            }
            if delta.is_zero() {
                return Err(DifferenceError::ZeroDelta {
                    delta: delta.to_string(),
                });
            }
        }
        Ok(Self { delta, reference })
    }

    /// The signed deviation, `actual − reference`.
    pub fn delta(&self) -> &Value {
        &self.delta
    }

    /// The reference value, or `None` when the data had no counterpart.
    pub fn reference(&self) -> Option<&Value> {
        if self.reference.is_null() {
            None
        } else {
            Some(&self.reference)
        }
    }

    /// `delta / reference`, or `None` when the reference is absent or zero.
    pub fn percent(&self) -> Option<f64> {
        let reference = self.reference()?.as_f64()?;
        if reference == 0.0 {
            return None;
        }
        Some(self.delta.as_f64()? / reference)
    }
}

fn write_signed(f: &mut fmt::Formatter<'_>, value: &Value) -> fmt::Result {
    match value {
        Value::Integer(n) => write!(f, "{n:+}"),
        Value::Float(x) if x.is_sign_negative() || x.is_nan() => write!(f, "{x:?}"),
        Value::Float(x) => write!(f, "+{x:?}"),
        Value::Null
        | Value::Bool(_)
        | Value::String(_)
        | Value::Array(_)
        | Value::Set(_)
        | Value::Object(_) => write!(f, "{value}"),
    }
}

impl fmt::Display for Deviation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Deviation(")?;
        write_signed(f, &self.delta)?;
        write!(f, ", {})", self.reference)
    }
}

/// Renders a difference as `Kind(args)`, e.g. `Invalid("x", expected="y")`.
impl fmt::Display for Difference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing(v) => write!(f, "Missing({v})"),
            Self::Extra(v) => write!(f, "Extra({v})"),
            Self::Invalid {
                actual,
                expected: None,
            } => write!(f, "Invalid({actual})"),
            Self::Invalid {
                actual,
                expected: Some(expected),
            } => write!(f, "Invalid({actual}, expected={expected})"),
            Self::Deviation(d) => write!(f, "{d}"),
        }
    }
}
