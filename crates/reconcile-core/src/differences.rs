/// Element addresses and the ordered collection of differences.
///
/// Differences found inside a mapping or sequence are filed under a [`Key`]
/// naming the element; differences found while checking a bare value or a set
/// are unkeyed. [`Differences`] keeps groups in the order the comparator
/// produced them.
use std::fmt;

use indexmap::IndexMap;
use serde::Serialize;

use crate::difference::Difference;

/// One step of a [`Key`] path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(untagged)]
pub enum KeyPart {
    /// A mapping member name.
    Name(String),
    /// A zero-based sequence position.
    Index(usize),
}

impl fmt::Display for KeyPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(name) => write!(f, "{name:?}"),
            Self::Index(i) => write!(f, "{i}"),
        }
    }
}

/// The address of an element inside nested mappings and sequences.
///
/// A key is a non-empty path. Top-level keys have a single part, so
/// `Key::from("a")` and `Key::from(3)` address `data["a"]` and `data[3]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Key(Vec<KeyPart>);

impl Key {
    /// Builds a key from a non-empty path; `None` when `parts` is empty.
    pub fn from_parts(parts: Vec<KeyPart>) -> Option<Self> {
        if parts.is_empty() {
            None
        } else {
            Some(Self(parts))
        }
    }

    /// The parts of this key, outermost first.
    pub fn parts(&self) -> &[KeyPart] {
        &self.0
    }

    /// Returns `self` extended by `part`.
    pub fn child(&self, part: KeyPart) -> Self {
        let mut parts = self.0.clone();
        parts.push(part);
        Self(parts)
    }

    /// Prefixes `inner` (if any) with `outer` (if any).
    pub(crate) fn join(outer: Option<&Key>, inner: Option<Key>) -> Option<Key> {
        match (outer, inner) {
            (None, inner) => inner,
            (Some(outer), None) => Some(outer.clone()),
            (Some(outer), Some(inner)) => {
                let mut parts = outer.0.clone();
                parts.extend(inner.0);
                Some(Self(parts))
            }
        }
    }
}

impl From<&str> for Key {
    fn from(name: &str) -> Self {
        Self(vec![KeyPart::Name(name.to_owned())])
    }
}

impl From<String> for Key {
    fn from(name: String) -> Self {
        Self(vec![KeyPart::Name(name)])
    }
}

impl From<usize> for Key {
    fn from(index: usize) -> Self {
        Self(vec![KeyPart::Index(index)])
    }
}

impl From<KeyPart> for Key {
    fn from(part: KeyPart) -> Self {
        Self(vec![part])
    }
}

/// Renders `"a"`, `3`, or nested paths as `"a"[3]["b"]`.
impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (head, rest) = self.0.split_first().ok_or(fmt::Error)?;
        write!(f, "{head}")?;
        for part in rest {
            write!(f, "[{part}]")?;
        }
        Ok(())
    }
}

/// Ordered mapping from key (or no key) to the differences found there.
///
/// An empty collection means the data satisfied the requirement. Groups keep
/// insertion order; differences inside a group keep the order they were
/// pushed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Differences {
    groups: IndexMap<Option<Key>, Vec<Difference>>,
    notes: Vec<String>,
}

impl Differences {
    /// Creates an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `difference` to the group for `key`.
    pub fn push(&mut self, key: Option<Key>, difference: Difference) {
        self.groups.entry(key).or_default().push(difference);
    }

    /// Appends every difference from `other`, prefixing its keys with `outer`.
    pub(crate) fn absorb(&mut self, outer: Option<&Key>, other: Differences) {
        for (key, diffs) in other.groups {
            let joined = Key::join(outer, key);
            self.groups.entry(joined).or_default().extend(diffs);
        }
    }

    /// Total number of differences across all groups.
    pub fn len(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }

    /// Returns `true` when there are no differences.
    pub fn is_empty(&self) -> bool {
        self.groups.values().all(Vec::is_empty)
    }

    /// Returns `true` when every difference is unkeyed.
    pub fn is_unkeyed(&self) -> bool {
        self.groups.keys().all(Option::is_none)
    }

    /// Differences filed under `key`.
    pub fn get(&self, key: &Key) -> &[Difference] {
        self.groups
            .get(&Some(key.clone()))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Differences found outside any mapping or sequence.
    pub fn unkeyed(&self) -> &[Difference] {
        self.groups
            .get(&None)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Iterates over groups in order.
    pub fn groups(&self) -> impl Iterator<Item = (Option<&Key>, &[Difference])> {
        self.groups
            .iter()
            .map(|(k, v)| (k.as_ref(), v.as_slice()))
    }

    /// Iterates over every difference with its key, in order.
    pub fn iter(&self) -> impl Iterator<Item = (Option<&Key>, &Difference)> {
        self.groups
            .iter()
            .flat_map(|(k, v)| v.iter().map(move |d| (k.as_ref(), d)))
    }

    /// Keys that have at least one difference, in order.
    pub fn keys(&self) -> impl Iterator<Item = &Key> {
        self.groups.keys().flatten()
    }

    /// Messages of the allowances that filtered this collection, outermost
    /// first.
    pub fn notes(&self) -> &[String] {
        &self.notes
    }

    pub(crate) fn set_notes(&mut self, notes: Vec<String>) {
        self.notes = notes;
    }

    pub(crate) fn into_groups(self) -> IndexMap<Option<Key>, Vec<Difference>> {
        self.groups
    }

    pub(crate) fn from_groups(groups: IndexMap<Option<Key>, Vec<Difference>>) -> Self {
        let groups = groups.into_iter().filter(|(_, v)| !v.is_empty()).collect();
        Self {
            groups,
            notes: Vec::new(),
        }
    }
}

impl FromIterator<(Option<Key>, Difference)> for Differences {
    fn from_iter<I: IntoIterator<Item = (Option<Key>, Difference)>>(iter: I) -> Self {
        let mut out = Self::new();
        for (key, diff) in iter {
            out.push(key, diff);
        }
        out
    }
}

/// Multi-line report: a summary line followed by one line per group.
///
/// Allowance messages, when present, prefix the summary.
impl fmt::Display for Differences {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for note in &self.notes {
            write!(f, "{note}: ")?;
        }
        let count = self.len();
        let plural = if count == 1 { "" } else { "s" };
        write!(f, "{count} difference{plural}")?;
        for (key, diffs) in self.groups() {
            f.write_str("\n    ")?;
            if let Some(key) = key {
                write!(f, "{key}: ")?;
            }
            match diffs {
                [single] => write!(f, "{single}")?,
                many => {
                    f.write_str("[")?;
                    for (i, d) in many.iter().enumerate() {
                        if i > 0 {
                            f.write_str(", ")?;
                        }
                        write!(f, "{d}")?;
                    }
                    f.write_str("]")?;
                }
            }
        }
        Ok(())
    }
}
