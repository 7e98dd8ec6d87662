//! Random lowercase words for string similarity benchmarks.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const LETTERS: &[u8] = b"abcdefghijklmnopqrstuvwxyz";

/// Generates `count` words of 4 to 12 lowercase ASCII letters.
pub fn generate_words(seed: u64, count: usize) -> Vec<String> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|_| {
            let len = rng.gen_range(4..=12);
            (0..len)
                .map(|_| LETTERS[rng.gen_range(0..LETTERS.len())] as char)
                .collect()
        })
        .collect()
}
