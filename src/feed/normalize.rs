//! Title normalization for duplicate detection.

/// Canonicalize a title for comparison.
///
/// Lowercases, drops everything that is not a letter, digit or whitespace
/// (Unicode-aware), collapses whitespace runs to a single space and trims.
pub fn normalize_title(title: &str) -> String {
    let kept: String = title
        .chars()
        .flat_map(char::to_lowercase)
        .filter(|c| c.is_alphabetic() || c.is_numeric() || c.is_whitespace())
        .collect();

    kept.split_whitespace().collect::<Vec<_>>().join(" ")
}
