//! Lossy text canonicalization used by every comparison in the matcher.

const FUNCTION_WORDS: [&str; 4] = ["the", "a", "an", "of"];

/// Normalize text for comparison
///
/// Lower-cases, drops every character that is neither alphanumeric nor
/// whitespace, and trims. Inner whitespace is kept as-is.
pub fn normalize(input: &str) -> String {
    input
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect::<String>()
        .trim()
        .to_string()
}

/// [`normalize`], then remove "the", "a", "an" and "of" and rejoin with single spaces
pub fn strip_function_words(input: &str) -> String {
    normalize(input)
        .split_whitespace()
        .filter(|word| !FUNCTION_WORDS.contains(word))
        .collect::<Vec<_>>()
        .join(" ")
}
