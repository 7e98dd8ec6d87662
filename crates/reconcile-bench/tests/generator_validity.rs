//! Tests that generated datasets produce exactly the injected differences.
#![allow(clippy::expect_used)]

use proptest::prelude::*;
use reconcile_bench::{Dataset, GeneratorConfig, SizeTier, generate_dataset, generate_words};
use reconcile_core::{
    AllowanceStack, Difference, DifferenceKind, Requirement, allowed_extra, allowed_missing,
    validate,
};

fn count_kind(dataset: &Dataset, kind: DifferenceKind) -> usize {
    let requirement = Requirement::from(dataset.requirement.clone());
    let diffs = validate(&dataset.data, &requirement).expect("validation runs");
    diffs.iter().filter(|(_, d)| d.kind() == kind).count()
}

fn assert_counts(dataset: &Dataset, label: &str) {
    let requirement = Requirement::from(dataset.requirement.clone());
    let diffs = validate(&dataset.data, &requirement).expect("validation runs");
    assert_eq!(
        diffs.len(),
        dataset.expected_differences(),
        "{label}: unexpected difference count"
    );
    assert_eq!(count_kind(dataset, DifferenceKind::Deviation), dataset.deviations, "{label}");
    assert_eq!(count_kind(dataset, DifferenceKind::Invalid), dataset.typos, "{label}");
    assert_eq!(count_kind(dataset, DifferenceKind::Missing), dataset.missing, "{label}");
    assert_eq!(count_kind(dataset, DifferenceKind::Extra), dataset.extra, "{label}");
}

#[test]
fn generated_small_matches_injected_counts() {
    for seed in [42, 123, 999, 7777, 54321] {
        let dataset = generate_dataset(&SizeTier::Small.config(seed));
        assert_counts(&dataset, &format!("Small/seed={seed}"));
    }
}

#[test]
fn generated_medium_matches_injected_counts() {
    let dataset = generate_dataset(&SizeTier::Medium.config(42));
    assert_counts(&dataset, "Medium/seed=42");
}

#[test]
fn generation_is_deterministic() {
    let a = generate_dataset(&SizeTier::Small.config(5));
    let b = generate_dataset(&SizeTier::Small.config(5));
    assert_eq!(a.data, b.data);
    assert_eq!(a.requirement, b.requirement);
    assert_eq!(generate_words(3, 10), generate_words(3, 10));
}

#[test]
fn requirement_validates_against_itself() {
    let dataset = generate_dataset(&SizeTier::Small.config(8));
    let requirement = Requirement::from(dataset.requirement.clone());
    let diffs = validate(&dataset.requirement, &requirement).expect("validation runs");
    assert!(diffs.is_empty());
}

#[test]
fn kind_allowances_leave_only_value_differences() {
    let dataset = generate_dataset(&SizeTier::Small.config(77));
    let requirement = Requirement::from(dataset.requirement.clone());

    let mut stack = AllowanceStack::new();
    let mut outer = stack.enter(allowed_missing());
    let diffs = outer
        .validate(&dataset.data, &requirement)
        .expect("validation runs");
    assert!(diffs.iter().all(|(_, d)| !matches!(d, Difference::Missing(_))));
    assert_eq!(diffs.len(), dataset.expected_differences() - dataset.missing);

    // Conjunction: only differences both rules allow are removed, and no
    // difference is both missing and extra.
    let mut inner = outer.enter(allowed_extra());
    let diffs = inner
        .validate(&dataset.data, &requirement)
        .expect("validation runs");
    assert_eq!(diffs.len(), dataset.expected_differences());
}

#[test]
fn parsed_json_reports_the_same_differences() {
    // Sets serialize as arrays; an array checked against a set requirement is
    // compared by membership, so the report is unchanged.
    let dataset = generate_dataset(&SizeTier::Small.config(1));
    let json = dataset.data_json().expect("serializes");
    let parsed: reconcile_core::Value = serde_json::from_str(&json).expect("parses");
    let requirement = Requirement::from(dataset.requirement.clone());
    let diffs = validate(&parsed, &requirement).expect("validation runs");
    assert_eq!(diffs.len(), dataset.expected_differences());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(20))]

    #[test]
    fn any_seed_matches_injected_counts(
        seed in any::<u64>(),
        num_records in 0usize..60,
        num_missing in 0usize..5,
        num_extra in 0usize..5,
    ) {
        let config = GeneratorConfig {
            seed,
            num_records,
            max_tags: 3,
            deviation_rate: 0.2,
            typo_rate: 0.2,
            num_missing,
            num_extra,
        };
        let dataset = generate_dataset(&config);
        let requirement = Requirement::from(dataset.requirement.clone());
        let diffs = validate(&dataset.data, &requirement).expect("validation runs");
        prop_assert_eq!(diffs.len(), dataset.expected_differences());
        prop_assert_eq!(dataset.missing, num_missing.min(num_records));
    }
}
