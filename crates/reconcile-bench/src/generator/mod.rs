//! Record set generator.
//!
//! Produces a requirement and a copy of it with deliberate discrepancies, so
//! that validating one against the other yields a predictable difference
//! count.

pub mod records;
pub mod words;

use rand::SeedableRng;
use rand::rngs::StdRng;
use reconcile_core::Value;

pub use words::generate_words;

/// Configuration for the record set generator.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Seed for the random number generator (deterministic).
    pub seed: u64,
    /// Number of records in the requirement.
    pub num_records: usize,
    /// Number of tags drawn per record (0 to this value).
    pub max_tags: usize,
    /// Fraction of records whose `units` field is perturbed (0.0-1.0).
    pub deviation_rate: f64,
    /// Fraction of records whose `region` is misspelled (0.0-1.0).
    pub typo_rate: f64,
    /// Number of requirement records dropped from the data.
    pub num_missing: usize,
    /// Number of records added to the data that the requirement lacks.
    pub num_extra: usize,
}

/// Predefined size tiers for benchmarking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeTier {
    /// 100 records.
    Small,
    /// 2,000 records.
    Medium,
    /// 20,000 records.
    Large,
}

impl SizeTier {
    /// Returns the default `GeneratorConfig` for this size tier.
    pub fn config(self, seed: u64) -> GeneratorConfig {
        match self {
            SizeTier::Small => GeneratorConfig {
                seed,
                num_records: 100,
                max_tags: 3,
                deviation_rate: 0.1,
                typo_rate: 0.05,
                num_missing: 2,
                num_extra: 2,
            },
            SizeTier::Medium => GeneratorConfig {
                seed,
                num_records: 2_000,
                max_tags: 4,
                deviation_rate: 0.1,
                typo_rate: 0.05,
                num_missing: 20,
                num_extra: 20,
            },
            SizeTier::Large => GeneratorConfig {
                seed,
                num_records: 20_000,
                max_tags: 4,
                deviation_rate: 0.05,
                typo_rate: 0.02,
                num_missing: 100,
                num_extra: 100,
            },
        }
    }
}

/// A generated requirement, the data checked against it, and the number of
/// discrepancies of each kind that were injected.
#[derive(Debug, Clone)]
pub struct Dataset {
    /// Object of records keyed by record id.
    pub data: Value,
    /// The unperturbed records.
    pub requirement: Value,
    /// Records whose `units` differ from the requirement.
    pub deviations: usize,
    /// Records whose `region` is misspelled.
    pub typos: usize,
    /// Requirement records absent from the data.
    pub missing: usize,
    /// Data records absent from the requirement.
    pub extra: usize,
}

impl Dataset {
    /// Total number of differences validation should report.
    pub fn expected_differences(&self) -> usize {
        self.deviations + self.typos + self.missing + self.extra
    }

    /// The data serialized as JSON, for parse-then-validate benchmarks.
    pub fn data_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.data)
    }
}

/// Generates a dataset from the given configuration.
///
/// All randomness is deterministic, seeded from `config.seed`.
pub fn generate_dataset(config: &GeneratorConfig) -> Dataset {
    let mut rng = StdRng::seed_from_u64(config.seed);
    records::build_dataset(config, &mut rng)
}
