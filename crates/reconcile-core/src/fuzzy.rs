/// Approximate string matching.
///
/// Similarity is `1 - distance / max_len` over Unicode scalar values, where
/// `distance` is the Levenshtein edit distance. Two empty strings are
/// identical.
use crate::error::RequirementError;

/// Levenshtein edit distance between `a` and `b`, counted in `char`s.
pub fn levenshtein(a: &str, b: &str) -> usize {
    // Only the shorter string is materialized; the row spans it.
    let (long, short) = if a.chars().count() >= b.chars().count() {
        (a, b)
    } else {
        (b, a)
    };
    let short: Vec<char> = short.chars().collect();
    if short.is_empty() {
        return long.chars().count();
    }

    let mut row: Vec<usize> = (0..=short.len()).collect();
    for (i, lc) in long.chars().enumerate() {
        let mut diag = row[0];
        row[0] = i + 1;
        for (j, &sc) in short.iter().enumerate() {
            let above = row[j + 1];
            let cost = usize::from(lc != sc);
            row[j + 1] = (diag + cost).min(above + 1).min(row[j] + 1);
            diag = above;
        }
    }
    row[short.len()]
}

/// Similarity ratio in `[0, 1]`; `1.0` means identical.
pub fn similarity(a: &str, b: &str) -> f64 {
    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return 1.0;
    }
    1.0 - levenshtein(a, b) as f64 / max_len as f64
}

/// Returns `true` when `similarity(a, b) >= threshold`.
pub fn is_similar(a: &str, b: &str, threshold: f64) -> Result<bool, RequirementError> {
    check_threshold(threshold)?;
    Ok(similarity(a, b) >= threshold)
}

pub(crate) fn check_threshold(threshold: f64) -> Result<(), RequirementError> {
    if (0.0..=1.0).contains(&threshold) {
        Ok(())
    } else {
        Err(RequirementError::Threshold(threshold))
    }
}
