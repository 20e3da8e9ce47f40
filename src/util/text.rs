//! Free-text canonicalization for comparison. Pure functions, no state.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("whitespace regex"));
static NON_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s.,!?-]").expect("non-word regex"));

const STOPWORDS: [&str; 15] = [
    "the", "a", "an", "and", "or", "but", "is", "are", "was", "were", "in", "on", "at", "to", "for",
];

/// Street-suffix abbreviations folded during location normalization.
const LOCATION_ABBREVIATIONS: [(&str, &str); 4] = [
    ("street", "st"),
    ("avenue", "ave"),
    ("road", "rd"),
    ("boulevard", "blvd"),
];

/// Lowercase, collapse whitespace, and strip characters outside the
/// word/basic-punctuation set.
pub fn normalize(text: &str) -> String {
    let lowered = text.to_lowercase();
    let collapsed = WHITESPACE.replace_all(&lowered, " ");
    let stripped = NON_WORD.replace_all(&collapsed, "");
    stripped.trim().to_string()
}

/// Normalize a location string: lowercase, collapse whitespace, fold common
/// street-suffix abbreviations.
pub fn normalize_location(location: &str) -> String {
    let lowered = location.to_lowercase();
    let mut normalized = WHITESPACE.replace_all(lowered.trim(), " ").into_owned();
    for (full, abbrev) in LOCATION_ABBREVIATIONS {
        normalized = normalized.replace(full, abbrev);
    }
    normalized
}

/// Jaccard similarity over normalized, whitespace-tokenized word sets.
/// Returns 0.0 when either side has no tokens.
pub fn token_similarity(a: &str, b: &str) -> f64 {
    let normalized_a = normalize(a);
    let normalized_b = normalize(b);
    let tokens_a: HashSet<&str> = normalized_a.split_whitespace().collect();
    let tokens_b: HashSet<&str> = normalized_b.split_whitespace().collect();

    if tokens_a.is_empty() || tokens_b.is_empty() {
        return 0.0;
    }

    let intersection = tokens_a.intersection(&tokens_b).count();
    let union = tokens_a.union(&tokens_b).count();
    intersection as f64 / union as f64
}

pub fn remove_stopwords(text: &str) -> String {
    text.split_whitespace()
        .filter(|word| !STOPWORDS.contains(&word.to_lowercase().as_str()))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Stopword-filtered tokens longer than three characters, deduplicated in
/// first-seen order and truncated to `max_keywords`. Diagnostic aid only,
/// never a dedup signal by itself.
pub fn extract_keywords(text: &str, max_keywords: usize) -> Vec<String> {
    let normalized = normalize(text);
    let mut seen = HashSet::new();
    normalized
        .split_whitespace()
        .filter(|word| word.len() > 3 && !STOPWORDS.contains(word))
        .filter(|word| seen.insert(word.to_string()))
        .take(max_keywords)
        .map(str::to_string)
        .collect()
}

/// Truncate to at most `max_chars` characters, respecting char boundaries.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_lowercases_and_collapses() {
        assert_eq!(
            normalize("  Broken   STREETLIGHT on Main St!  "),
            "broken streetlight on main st!"
        );
    }

    #[test]
    fn normalize_strips_special_characters() {
        assert_eq!(normalize("pipe burst @ 5th & Elm #urgent"), "pipe burst 5th elm urgent");
    }

    #[test]
    fn normalize_location_folds_abbreviations() {
        assert_eq!(normalize_location("123  Oak Street"), "123 oak st");
        assert_eq!(normalize_location("Sunset Boulevard"), "sunset blvd");
        assert_eq!(normalize_location("River Road"), "river rd");
        assert_eq!(normalize_location("Fifth Avenue"), "fifth ave");
    }

    #[test]
    fn token_similarity_bounds() {
        assert_eq!(token_similarity("pothole on main st", "Pothole on Main St"), 1.0);
        assert_eq!(token_similarity("graffiti downtown", "water leak uptown"), 0.0);
        assert_eq!(token_similarity("", "anything"), 0.0);
        assert_eq!(token_similarity("anything", "   "), 0.0);
    }

    #[test]
    fn token_similarity_partial_overlap() {
        // {pothole, main, st} vs {pothole, elm, st}: 2 shared of 4 distinct.
        let sim = token_similarity("pothole main st", "pothole elm st");
        assert!((sim - 0.5).abs() < 1e-9);
    }

    #[test]
    fn remove_stopwords_filters_fixed_set() {
        assert_eq!(
            remove_stopwords("the light at the corner is broken"),
            "light corner broken"
        );
    }

    #[test]
    fn extract_keywords_filters_and_truncates() {
        let keywords = extract_keywords("The broken broken streetlight near the old park", 2);
        assert_eq!(keywords, vec!["broken".to_string(), "streetlight".to_string()]);
    }

    #[test]
    fn extract_keywords_drops_short_and_stopword_tokens() {
        let keywords = extract_keywords("a big pipe was bad", 10);
        assert_eq!(keywords, vec!["pipe".to_string()]);
    }

    #[test]
    fn truncate_chars_respects_multibyte_boundaries() {
        assert_eq!(truncate_chars("héllo wörld", 6), "héllo ");
        assert_eq!(truncate_chars("short", 100), "short");
    }
}
