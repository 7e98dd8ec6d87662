//! Record builders and discrepancy injection.

use rand::Rng;
use rand::rngs::StdRng;
use reconcile_core::{Value, ValueMap};

use super::{Dataset, GeneratorConfig};

const REGIONS: &[&str] = &["north", "south", "east", "west", "central"];

const TAGS: &[&str] = &[
    "bulk",
    "fragile",
    "hazmat",
    "perishable",
    "priority",
    "refrigerated",
    "returnable",
    "oversize",
];

/// Record id for position `i`; zero-padded so ids sort like positions.
pub fn record_id(i: usize) -> String {
    format!("rec-{i:06}")
}

/// Builds one record with an `id`, `region`, `units`, `price`, and `tags`.
pub fn gen_record(i: usize, config: &GeneratorConfig, rng: &mut StdRng) -> Value {
    let region = REGIONS[rng.gen_range(0..REGIONS.len())];
    let units: i64 = rng.gen_range(0..1_000);
    let cents: i64 = rng.gen_range(100..10_000);
    let num_tags = rng.gen_range(0..=config.max_tags.min(TAGS.len()));
    let tags = Value::set((0..num_tags).map(|_| TAGS[rng.gen_range(0..TAGS.len())]));

    Value::object([
        ("id", Value::Integer(i as i64)),
        ("region", Value::from(region)),
        ("units", Value::Integer(units)),
        ("price", Value::Float(cents as f64 / 100.0)),
        ("tags", tags),
    ])
}

/// Builds the requirement, then derives the data by dropping, perturbing, and
/// adding records.
pub fn build_dataset(config: &GeneratorConfig, rng: &mut StdRng) -> Dataset {
    let requirement: ValueMap = (0..config.num_records)
        .map(|i| (record_id(i), gen_record(i, config, rng)))
        .collect();

    let mut data = requirement.clone();

    let mut missing = 0;
    for i in 0..config.num_missing.min(config.num_records) {
        if data.shift_remove(&record_id(i)).is_some() {
            missing += 1;
        }
    }

    let mut deviations = 0;
    let mut typos = 0;
    for record in data.values_mut() {
        let Value::Object(fields) = record else {
            continue;
        };
        if rng.gen_bool(config.deviation_rate) {
            if let Some(Value::Integer(units)) = fields.get_mut("units") {
                *units += rng.gen_range(1..50);
                deviations += 1;
            }
        }
        if rng.gen_bool(config.typo_rate) {
            if let Some(Value::String(region)) = fields.get_mut("region") {
                region.push('x');
                typos += 1;
            }
        }
    }

    for j in 0..config.num_extra {
        let i = config.num_records + j;
        data.insert(record_id(i), gen_record(i, config, rng));
    }

    Dataset {
        data: Value::Object(data),
        requirement: Value::Object(requirement),
        deviations,
        typos,
        missing,
        extra: config.num_extra,
    }
}
