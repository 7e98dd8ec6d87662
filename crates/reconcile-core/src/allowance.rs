/// Scoped filters that suppress acceptable differences.
///
/// An [`Allowance`] decides, difference by difference, whether a discrepancy
/// is acceptable. Allowances are pushed onto an [`AllowanceStack`] with
/// [`AllowanceStack::enter`], which returns an [`AllowanceScope`] guard; the
/// rule is active until the guard is dropped.
///
/// # Composition
///
/// Every active rule must allow a difference for it to be suppressed, so
/// nested scopes narrow what is allowed rather than widening it. Within one
/// rule, [`AllowanceExt::and`] and [`AllowanceExt::or`] combine two rules into
/// one.
///
/// # Granularity
///
/// Rules declare a [`Granularity`]. Element rules judge each difference in
/// isolation; group rules keep state per key (see [`allowed_specific`]);
/// collection rules keep state across the whole result (see
/// [`allowed_limit`]). Cheaper granularities are evaluated first and
/// evaluation short-circuits, so a stateful rule only counts differences that
/// every cheaper rule already allows.
pub mod rules;

use std::cmp::Reverse;
use std::ops::{Deref, DerefMut};

use indexmap::IndexMap;
use tracing::{debug, trace};

use crate::difference::Difference;
use crate::differences::{Differences, Key};
use crate::error::ValidateError;
use crate::requirement::Requirement;
use crate::validate::{ValidationConfig, validate_with_config};
use crate::value::Value;

pub use rules::{
    AllowedArgs, AllowedDeviation, AllowedKey, AllowedKind, AllowedLimit, AllowedSpecific,
    allowed_args, allowed_deviation, allowed_deviation_range, allowed_extra, allowed_fuzzy,
    allowed_invalid, allowed_key, allowed_limit, allowed_missing, allowed_percent_deviation,
    allowed_percent_deviation_range, allowed_specific, allowed_specific_keyed,
};

#[cfg(test)]
mod tests;

/// The scope over which an allowance keeps state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Granularity {
    /// Each difference is judged on its own.
    Element,
    /// State is reset at the start of every key group.
    Group,
    /// State spans the whole difference collection.
    Collection,
}

/// A rule that may suppress differences.
///
/// Only [`allows`][Allowance::allows] and [`name`][Allowance::name] are
/// required. The lifecycle hooks are called by [`AllowanceStack::filter`] in
/// this order: `start_collection`, then for each group `start_group`, `allows`
/// for each difference, `end_group`, and finally `end_collection`.
pub trait Allowance {
    /// Short identifier used in logs and composed messages.
    fn name(&self) -> &str;

    /// Returns `true` when `difference`, filed under `key`, is acceptable.
    fn allows(&mut self, key: Option<&Key>, difference: &Difference) -> bool;

    /// The scope over which this rule keeps state.
    fn granularity(&self) -> Granularity {
        Granularity::Element
    }

    /// Message prefixed to the report when differences survive this rule.
    fn message(&self) -> Option<String> {
        None
    }

    /// Called once before any group is processed.
    fn start_collection(&mut self) {}

    /// Called before the differences of each group are checked.
    fn start_group(&mut self, _key: Option<&Key>) {}

    /// Called after the differences of each group are checked.
    fn end_group(&mut self, _key: Option<&Key>) {}

    /// Called once after every group is processed.
    fn end_collection(&mut self) {}
}

impl<A: Allowance + ?Sized> Allowance for Box<A> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn allows(&mut self, key: Option<&Key>, difference: &Difference) -> bool {
        (**self).allows(key, difference)
    }

    fn granularity(&self) -> Granularity {
        (**self).granularity()
    }

    fn message(&self) -> Option<String> {
        (**self).message()
    }

    fn start_collection(&mut self) {
        (**self).start_collection();
    }

    fn start_group(&mut self, key: Option<&Key>) {
        (**self).start_group(key);
    }

    fn end_group(&mut self, key: Option<&Key>) {
        (**self).end_group(key);
    }

    fn end_collection(&mut self) {
        (**self).end_collection();
    }
}

/// Combinators available on every [`Allowance`].
pub trait AllowanceExt: Allowance + Sized {
    /// Allows a difference only when both rules allow it.
    fn and<B: Allowance>(self, other: B) -> And<Self, B> {
        And {
            pair: Pair::new(self, other),
        }
    }

    /// Allows a difference when either rule allows it.
    fn or<B: Allowance>(self, other: B) -> Or<Self, B> {
        Or {
            pair: Pair::new(self, other),
        }
    }

    /// Attaches a message reported alongside surviving differences.
    fn with_message(self, message: impl Into<String>) -> WithMessage<Self> {
        WithMessage {
            inner: self,
            message: message.into(),
        }
    }
}

impl<A: Allowance> AllowanceExt for A {}

/// Two rules evaluated cheaper-granularity first.
#[derive(Debug)]
struct Pair<A, B> {
    a: A,
    b: B,
    a_first: bool,
}

impl<A: Allowance, B: Allowance> Pair<A, B> {
    fn new(a: A, b: B) -> Self {
        let a_first = a.granularity() <= b.granularity();
        Self { a, b, a_first }
    }

    fn granularity(&self) -> Granularity {
        self.a.granularity().max(self.b.granularity())
    }

    fn label(&self, op: &str) -> String {
        let a = self.a.message().unwrap_or_else(|| self.a.name().to_owned());
        let b = self.b.message().unwrap_or_else(|| self.b.name().to_owned());
        format!("({a} <{op}> {b})")
    }

    fn start_collection(&mut self) {
        self.a.start_collection();
        self.b.start_collection();
    }

    fn start_group(&mut self, key: Option<&Key>) {
        self.a.start_group(key);
        self.b.start_group(key);
    }

    fn end_group(&mut self, key: Option<&Key>) {
        self.a.end_group(key);
        self.b.end_group(key);
    }

    fn end_collection(&mut self) {
        self.a.end_collection();
        self.b.end_collection();
    }
}

/// Conjunction of two rules; see [`AllowanceExt::and`].
#[derive(Debug)]
pub struct And<A, B> {
    pair: Pair<A, B>,
}

impl<A: Allowance, B: Allowance> Allowance for And<A, B> {
    fn name(&self) -> &str {
        "and"
    }

    fn allows(&mut self, key: Option<&Key>, difference: &Difference) -> bool {
        let p = &mut self.pair;
        if p.a_first {
            p.a.allows(key, difference) && p.b.allows(key, difference)
        } else {
            p.b.allows(key, difference) && p.a.allows(key, difference)
        }
    }

    fn granularity(&self) -> Granularity {
        self.pair.granularity()
    }

    fn message(&self) -> Option<String> {
        Some(self.pair.label("and"))
    }

    fn start_collection(&mut self) {
        self.pair.start_collection();
    }

    fn start_group(&mut self, key: Option<&Key>) {
        self.pair.start_group(key);
    }

    fn end_group(&mut self, key: Option<&Key>) {
        self.pair.end_group(key);
    }

    fn end_collection(&mut self) {
        self.pair.end_collection();
    }
}

/// Disjunction of two rules; see [`AllowanceExt::or`].
#[derive(Debug)]
pub struct Or<A, B> {
    pair: Pair<A, B>,
}

impl<A: Allowance, B: Allowance> Allowance for Or<A, B> {
    fn name(&self) -> &str {
        "or"
    }

    fn allows(&mut self, key: Option<&Key>, difference: &Difference) -> bool {
        let p = &mut self.pair;
        if p.a_first {
            p.a.allows(key, difference) || p.b.allows(key, difference)
        } else {
            p.b.allows(key, difference) || p.a.allows(key, difference)
        }
    }

    fn granularity(&self) -> Granularity {
        self.pair.granularity()
    }

    fn message(&self) -> Option<String> {
        Some(self.pair.label("or"))
    }

    fn start_collection(&mut self) {
        self.pair.start_collection();
    }

    fn start_group(&mut self, key: Option<&Key>) {
        self.pair.start_group(key);
    }

    fn end_group(&mut self, key: Option<&Key>) {
        self.pair.end_group(key);
    }

    fn end_collection(&mut self) {
        self.pair.end_collection();
    }
}

/// A rule with an explicit message; see [`AllowanceExt::with_message`].
#[derive(Debug)]
pub struct WithMessage<A> {
    inner: A,
    message: String,
}

impl<A: Allowance> Allowance for WithMessage<A> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn allows(&mut self, key: Option<&Key>, difference: &Difference) -> bool {
        self.inner.allows(key, difference)
    }

    fn granularity(&self) -> Granularity {
        self.inner.granularity()
    }

    fn message(&self) -> Option<String> {
        Some(self.message.clone())
    }

    fn start_collection(&mut self) {
        self.inner.start_collection();
    }

    fn start_group(&mut self, key: Option<&Key>) {
        self.inner.start_group(key);
    }

    fn end_group(&mut self, key: Option<&Key>) {
        self.inner.end_group(key);
    }

    fn end_collection(&mut self) {
        self.inner.end_collection();
    }
}

/// The set of active allowance rules for one validation context.
///
/// The stack is an ordinary owned value: create one per test or call site,
/// enter scopes on it, and validate through it. Nothing is global.
#[derive(Default)]
pub struct AllowanceStack {
    rules: Vec<Box<dyn Allowance>>,
    config: ValidationConfig,
}

impl AllowanceStack {
    /// Creates an empty stack with the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty stack that validates with `config`.
    pub fn with_config(config: ValidationConfig) -> Self {
        Self {
            rules: Vec::new(),
            config,
        }
    }

    /// The configuration used by [`validate`][Self::validate].
    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    /// Number of active rules.
    pub fn depth(&self) -> usize {
        self.rules.len()
    }

    /// Activates `rule` until the returned guard is dropped.
    ///
    /// The guard dereferences to the stack, so further scopes can be entered
    /// through it.
    pub fn enter<A: Allowance + 'static>(&mut self, rule: A) -> AllowanceScope<'_> {
        let depth = self.rules.len();
        trace!(depth, rule = rule.name(), "entering allowance scope");
        self.rules.push(Box::new(rule));
        AllowanceScope { stack: self, depth }
    }

    /// Runs `f` with `rule` active.
    pub fn scoped<A, R, F>(&mut self, rule: A, f: F) -> R
    where
        A: Allowance + 'static,
        F: FnOnce(&mut AllowanceStack) -> R,
    {
        let mut scope = self.enter(rule);
        f(&mut *scope)
    }

    /// Validates `data` against `requirement` and filters the result through
    /// the active rules.
    pub fn validate(
        &mut self,
        data: &Value,
        requirement: &Requirement,
    ) -> Result<Differences, ValidateError> {
        let raw = validate_with_config(data, requirement, &self.config)?;
        Ok(self.filter(raw))
    }

    /// Removes every difference that all active rules allow.
    ///
    /// Returns `differences` unchanged when no rule is active. Otherwise each
    /// group is filtered in key order; a group left empty is dropped. The
    /// messages of the active rules, outermost first, become the notes of a
    /// non-empty result.
    pub fn filter(&mut self, differences: Differences) -> Differences {
        if self.rules.is_empty() {
            return differences;
        }
        let before = differences.len();

        // Innermost first within a granularity.
        let mut order: Vec<usize> = (0..self.rules.len()).collect();
        order.sort_by_key(|&i| (self.rules[i].granularity(), Reverse(i)));

        for rule in &mut self.rules {
            rule.start_collection();
        }
        let mut kept: IndexMap<Option<Key>, Vec<Difference>> = IndexMap::new();
        for (key, group) in differences.into_groups() {
            for rule in &mut self.rules {
                rule.start_group(key.as_ref());
            }
            let mut survivors = Vec::new();
            for diff in group {
                if !self.all_allow(&order, key.as_ref(), &diff) {
                    survivors.push(diff);
                }
            }
            for rule in &mut self.rules {
                rule.end_group(key.as_ref());
            }
            kept.insert(key, survivors);
        }
        for rule in &mut self.rules {
            rule.end_collection();
        }

        let mut out = Differences::from_groups(kept);
        if !out.is_empty() {
            out.set_notes(self.rules.iter().filter_map(|r| r.message()).collect());
        }
        debug!(
            rules = self.rules.len(),
            before,
            after = out.len(),
            "applied allowances"
        );
        out
    }

    fn all_allow(&mut self, order: &[usize], key: Option<&Key>, diff: &Difference) -> bool {
        order.iter().all(|&i| self.rules[i].allows(key, diff))
    }
}

impl std::fmt::Debug for AllowanceStack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.rules.iter().map(|r| r.name()).collect();
        f.debug_struct("AllowanceStack")
            .field("rules", &names)
            .field("config", &self.config)
            .finish()
    }
}

/// Guard returned by [`AllowanceStack::enter`].
///
/// Dropping the guard removes its rule and any rule entered after it, so the
/// stack is restored on early return and during unwinding.
#[derive(Debug)]
pub struct AllowanceScope<'s> {
    stack: &'s mut AllowanceStack,
    depth: usize,
}

impl Deref for AllowanceScope<'_> {
    type Target = AllowanceStack;

    fn deref(&self) -> &AllowanceStack {
        self.stack
    }
}

impl DerefMut for AllowanceScope<'_> {
    fn deref_mut(&mut self) -> &mut AllowanceStack {
        self.stack
    }
}

impl Drop for AllowanceScope<'_> {
    fn drop(&mut self) {
        self.stack.rules.truncate(self.depth);
        trace!(depth = self.depth, "left allowance scope");
    }
}
