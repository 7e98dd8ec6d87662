#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::panic::{AssertUnwindSafe, catch_unwind};

use super::*;
use crate::differences::KeyPart;
use crate::error::RequirementError;

fn dev(delta: impl Into<Value>, reference: impl Into<Value>) -> Difference {
    Difference::deviation(delta, reference).expect("valid deviation")
}

fn unkeyed(diffs: impl IntoIterator<Item = Difference>) -> Differences {
    diffs.into_iter().map(|d| (None, d)).collect()
}

fn missing_a_extra_b() -> Differences {
    unkeyed([Difference::missing("a"), Difference::extra("b")])
}

// ---------------------------------------------------------------------------
// Kind rules
// ---------------------------------------------------------------------------

#[test]
fn no_rules_leaves_differences_unchanged() {
    let mut stack = AllowanceStack::new();
    assert_eq!(stack.filter(missing_a_extra_b()), missing_a_extra_b());
}

#[test]
fn allowed_missing_keeps_extra() {
    let mut stack = AllowanceStack::new();
    let mut scope = stack.enter(allowed_missing());
    let out = scope.filter(missing_a_extra_b());
    assert_eq!(out.unkeyed(), [Difference::extra("b")]);
}

#[test]
fn allowed_extra_keeps_missing() {
    let mut stack = AllowanceStack::new();
    let mut scope = stack.enter(allowed_extra());
    let out = scope.filter(missing_a_extra_b());
    assert_eq!(out.unkeyed(), [Difference::missing("a")]);
}

#[test]
fn allowed_invalid_keeps_other_kinds() {
    let mut stack = AllowanceStack::new();
    let mut scope = stack.enter(allowed_invalid());
    let out = scope.filter(unkeyed([
        Difference::invalid("x"),
        Difference::invalid_expected("y", "z"),
        Difference::missing(1),
    ]));
    assert_eq!(out.unkeyed(), [Difference::missing(1)]);
}

#[test]
fn allowed_missing_over_superset_requirement_is_valid() {
    let mut stack = AllowanceStack::new();
    let mut scope = stack.enter(allowed_missing());
    let out = scope
        .validate(
            &Value::set(["a", "b"]),
            &Requirement::value(Value::set(["a", "b", "c", "d"])),
        )
        .expect("validation runs");
    assert!(out.is_empty());
}

// ---------------------------------------------------------------------------
// Scoping
// ---------------------------------------------------------------------------

#[test]
fn nested_rules_compose_by_conjunction() {
    let data = Value::array([5, 6]);
    let req = Requirement::value(Value::set(Vec::<i64>::new()));

    let mut stack = AllowanceStack::new();
    let mut outer = stack.enter(allowed_args(|args: &[Value]| args == [Value::Integer(5)]));
    let mut inner = outer.enter(allowed_extra());
    let out = inner.validate(&data, &req).expect("validation runs");
    assert_eq!(out.unkeyed(), [Difference::extra(6)]);
}

#[test]
fn dropping_a_scope_removes_its_rule() {
    let mut stack = AllowanceStack::new();
    {
        let mut outer = stack.enter(allowed_missing());
        assert_eq!(outer.depth(), 1);
        {
            let inner = outer.enter(allowed_extra());
            assert_eq!(inner.depth(), 2);
        }
        assert_eq!(outer.depth(), 1);
        assert_eq!(
            outer.filter(missing_a_extra_b()).unkeyed(),
            [Difference::extra("b")]
        );
    }
    assert_eq!(stack.depth(), 0);
    assert_eq!(stack.filter(missing_a_extra_b()).len(), 2);
}

#[test]
fn scope_is_removed_on_early_return() {
    fn check(stack: &mut AllowanceStack, bail: bool) -> Option<usize> {
        let scope = stack.enter(allowed_missing());
        if bail {
            return None;
        }
        Some(scope.depth())
    }

    let mut stack = AllowanceStack::new();
    assert_eq!(check(&mut stack, true), None);
    assert_eq!(stack.depth(), 0);
    assert_eq!(check(&mut stack, false), Some(1));
    assert_eq!(stack.depth(), 0);
}

#[test]
fn scope_is_removed_during_unwinding() {
    let mut stack = AllowanceStack::new();
    let result = catch_unwind(AssertUnwindSafe(|| {
        let _scope = stack.enter(allowed_missing());
        panic!("validation blew up");
    }));
    assert!(result.is_err());
    assert_eq!(stack.depth(), 0);
}

#[test]
fn scoped_runs_closure_with_rule_active() {
    let mut stack = AllowanceStack::new();
    let out = stack.scoped(allowed_extra(), |s| {
        assert_eq!(s.depth(), 1);
        s.filter(missing_a_extra_b())
    });
    assert_eq!(out.unkeyed(), [Difference::missing("a")]);
    assert_eq!(stack.depth(), 0);
}

// ---------------------------------------------------------------------------
// Predicate rules
// ---------------------------------------------------------------------------

#[test]
fn allowed_key_filters_by_key() {
    let mut diffs = Differences::new();
    diffs.push(Some(Key::from("keep")), Difference::extra(1));
    diffs.push(Some(Key::from("skip")), Difference::extra(2));
    diffs.push(None, Difference::extra(3));

    let mut stack = AllowanceStack::new();
    let mut scope = stack.enter(allowed_key(|key: Option<&Key>| {
        key.is_some_and(|k| k.parts() == [KeyPart::Name("skip".to_owned())])
    }));
    let out = scope.filter(diffs);
    assert_eq!(out.len(), 2);
    assert_eq!(out.get(&Key::from("keep")), [Difference::extra(1)]);
    assert_eq!(out.unkeyed(), [Difference::extra(3)]);
}

#[test]
fn allowed_fuzzy_accepts_near_misses() {
    let mut stack = AllowanceStack::new();
    let mut scope = stack.enter(allowed_fuzzy(0.6).expect("valid threshold"));
    let out = scope.filter(unkeyed([
        Difference::invalid_expected("colour", "color"),
        Difference::invalid_expected("red", "blue"),
        Difference::invalid("colour"),
    ]));
    assert_eq!(
        out.unkeyed(),
        [
            Difference::invalid_expected("red", "blue"),
            Difference::invalid("colour"),
        ]
    );
    assert!(allowed_fuzzy(2.0).is_err());
}

// ---------------------------------------------------------------------------
// Deviation rules
// ---------------------------------------------------------------------------

#[test]
fn allowed_deviation_is_symmetric_and_inclusive() {
    let mut stack = AllowanceStack::new();
    let mut scope = stack.enter(allowed_deviation(2.0).expect("valid tolerance"));
    let out = scope.filter(unkeyed([
        dev(2, 10),
        dev(-2, 10),
        dev(3, 10),
        Difference::invalid(1),
    ]));
    assert_eq!(out.unkeyed(), [dev(3, 10), Difference::invalid(1)]);
}

#[test]
fn allowed_deviation_range_is_asymmetric() {
    let mut stack = AllowanceStack::new();
    let mut scope = stack.enter(allowed_deviation_range(-1.0, 5.0).expect("valid range"));
    let out = scope.filter(unkeyed([dev(-2, 10), dev(4.5, 10), dev(6, 10)]));
    assert_eq!(out.unkeyed(), [dev(-2, 10), dev(6, 10)]);
}

#[test]
fn nan_deviation_is_never_allowed() {
    let mut stack = AllowanceStack::new();
    let mut scope = stack.enter(allowed_deviation(1e9).expect("valid tolerance"));
    let out = scope.filter(unkeyed([dev(f64::NAN, Value::Null)]));
    assert_eq!(out.len(), 1);
}

#[test]
fn allowed_percent_deviation_uses_ratio() {
    let mut stack = AllowanceStack::new();
    let mut scope = stack.enter(allowed_percent_deviation(0.1).expect("valid tolerance"));
    let out = scope.filter(unkeyed([
        dev(5, 100),
        dev(-20, 100),
        dev(7, Value::Null),
    ]));
    // Without a reference the percentage counts as zero.
    assert_eq!(out.unkeyed(), [dev(-20, 100)]);
}

#[test]
fn deviation_bounds_are_validated() {
    assert!(matches!(
        allowed_deviation(-1.0),
        Err(RequirementError::Tolerance { .. })
    ));
    assert!(allowed_deviation(f64::NAN).is_err());
    assert!(allowed_deviation_range(3.0, 1.0).is_err());
    assert!(allowed_percent_deviation_range(0.0, 0.0).is_ok());
}

// ---------------------------------------------------------------------------
// Stateful rules
// ---------------------------------------------------------------------------

#[test]
fn allowed_specific_applies_once_per_group() {
    let mut diffs = Differences::new();
    diffs.push(Some(Key::from("a")), Difference::extra("x"));
    diffs.push(Some(Key::from("a")), Difference::extra("x"));
    diffs.push(Some(Key::from("b")), Difference::extra("x"));

    let mut stack = AllowanceStack::new();
    let mut scope = stack.enter(allowed_specific([Difference::extra("x")]));
    let out = scope.filter(diffs);
    assert_eq!(out.len(), 1);
    assert_eq!(out.get(&Key::from("a")), [Difference::extra("x")]);
}

#[test]
fn allowed_specific_uses_up_an_entry_even_when_a_later_rule_keeps_it() {
    let key = Key::from("a");
    let mut specific = allowed_specific([Difference::extra("x")]);
    let mut limit = allowed_limit(0);
    limit.start_collection();
    specific.start_group(Some(&key));

    let first = specific.allows(Some(&key), &Difference::extra("x"))
        && limit.allows(Some(&key), &Difference::extra("x"));
    assert!(!first);
    // The entry was consumed by the first check.
    assert!(!specific.allows(Some(&key), &Difference::extra("x")));

    specific.end_group(Some(&key));
    specific.start_group(Some(&key));
    assert!(specific.allows(Some(&key), &Difference::extra("x")));
}

#[test]
fn allowed_specific_keyed_only_matches_its_key() {
    let mut diffs = Differences::new();
    diffs.push(Some(Key::from("a")), Difference::missing(1));
    diffs.push(Some(Key::from("b")), Difference::missing(1));
    diffs.push(None, Difference::missing(1));

    let mut stack = AllowanceStack::new();
    let mut scope = stack.enter(allowed_specific_keyed([(
        Key::from("a"),
        vec![Difference::missing(1)],
    )]));
    let out = scope.filter(diffs);
    assert_eq!(out.len(), 2);
    assert!(out.get(&Key::from("a")).is_empty());
}

#[test]
fn allowed_limit_counts_across_groups() {
    let mut diffs = Differences::new();
    diffs.push(Some(Key::from(0)), Difference::extra(1));
    diffs.push(Some(Key::from(1)), Difference::extra(2));
    diffs.push(Some(Key::from(2)), Difference::extra(3));

    let mut stack = AllowanceStack::new();
    let mut scope = stack.enter(allowed_limit(2));
    let out = scope.filter(diffs.clone());
    assert_eq!(out.len(), 1);
    assert_eq!(out.get(&Key::from(2)), [Difference::extra(3)]);

    // The count restarts for every filtered collection.
    assert_eq!(scope.filter(diffs).len(), 1);
}

#[test]
fn limit_only_counts_what_cheaper_rules_allow() {
    let diffs = unkeyed([
        Difference::invalid(0),
        Difference::missing(1),
        Difference::invalid(2),
        Difference::missing(3),
    ]);

    let mut stack = AllowanceStack::new();
    let mut scope = stack.enter(allowed_limit(1).and(allowed_missing()));
    let out = scope.filter(diffs.clone());
    assert_eq!(
        out.unkeyed(),
        [
            Difference::invalid(0),
            Difference::invalid(2),
            Difference::missing(3),
        ]
    );
    drop(scope);

    // Across separate scopes the same ordering holds.
    let mut outer = stack.enter(allowed_limit(1));
    let mut inner = outer.enter(allowed_missing());
    assert_eq!(inner.filter(diffs).len(), 3);
}

#[test]
fn or_allows_either() {
    let mut stack = AllowanceStack::new();
    let mut scope = stack.enter(allowed_missing().or(allowed_extra()));
    assert!(scope.filter(missing_a_extra_b()).is_empty());
}

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

#[test]
fn messages_become_notes_outermost_first() {
    let mut stack = AllowanceStack::new();
    let mut outer = stack.enter(allowed_extra().with_message("known extras"));
    let mut inner = outer.enter(allowed_key(|_: Option<&Key>| true).with_message("any key"));
    let out = inner.filter(missing_a_extra_b());
    assert_eq!(out.notes(), ["known extras", "any key"]);
    assert_eq!(
        out.to_string(),
        "known extras: any key: 1 difference\n    Missing(\"a\")"
    );
}

#[test]
fn composed_rules_describe_themselves() {
    let rule = allowed_missing().and(allowed_extra().with_message("extras ok"));
    assert_eq!(
        rule.message().as_deref(),
        Some("(allowed_missing <and> extras ok)")
    );
    let rule = allowed_missing().or(allowed_limit(3));
    assert_eq!(
        rule.message().as_deref(),
        Some("(allowed_missing <or> allowed_limit)")
    );
    assert_eq!(rule.granularity(), Granularity::Collection);
}

#[test]
fn no_notes_when_everything_is_allowed() {
    let mut stack = AllowanceStack::new();
    let mut scope = stack.enter(allowed_missing().with_message("ignored"));
    let out = scope.filter(unkeyed([Difference::missing(1)]));
    assert!(out.is_empty());
    assert!(out.notes().is_empty());
}
