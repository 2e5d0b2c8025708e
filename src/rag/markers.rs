//! Inline citation marker extraction
use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

use crate::citations::looks_like_key;

fn group_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[(\[]([^()\[\]]*)[)\]]").expect("valid marker group pattern"))
}

/// Every token inside `(...)` or `[...]` that is a known key or has key
/// shape, in order of appearance
pub fn extract_markers(text: &str, known: &[&str]) -> Vec<String> {
    let mut markers = Vec::new();
    for group in group_pattern().captures_iter(text) {
        let inner = &group[1];
        for token in inner.split(|c| c == ';' || c == ',').flat_map(str::split_whitespace) {
            let token = token.trim_matches(|c: char| !c.is_alphanumeric());
            if known.contains(&token) || looks_like_key(token) {
                markers.push(token.to_string());
            }
        }
    }
    markers
}

/// Markers with repeats removed, first appearance kept
pub fn distinct_markers(text: &str, known: &[&str]) -> Vec<String> {
    let mut seen = HashSet::new();
    extract_markers(text, known)
        .into_iter()
        .filter(|m| seen.insert(m.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_and_grouped_markers() {
        let text = "Early work (Smith2021) was extended [Lee2022a; Kim2023] and (Anonnd, Park2020b).";
        assert_eq!(
            extract_markers(text, &[]),
            vec!["Smith2021", "Lee2022a", "Kim2023", "Anonnd", "Park2020b"]
        );
    }

    #[test]
    fn test_prose_in_parentheses_is_ignored() {
        let text = "Tests (see Smith2021, p. 4) and asides (like this one, from 2021) matter.";
        assert_eq!(extract_markers(text, &[]), vec!["Smith2021"]);
    }

    #[test]
    fn test_unbracketed_keys_are_not_markers() {
        assert!(extract_markers("Smith2021 argued otherwise.", &[]).is_empty());
    }

    #[test]
    fn test_distinct_keeps_first_appearance() {
        let text = "(Kim2023) then (Lee2022) then (Kim2023; Lee2022)";
        assert_eq!(distinct_markers(text, &[]), vec!["Kim2023", "Lee2022"]);
    }

    #[test]
    fn test_known_keys_without_key_shape() {
        let text = "Networks evolved (3GPP2021; Lee2022).";
        assert_eq!(extract_markers(text, &[]), vec!["Lee2022"]);
        assert_eq!(extract_markers(text, &["3GPP2021"]), vec!["3GPP2021", "Lee2022"]);
    }
}
