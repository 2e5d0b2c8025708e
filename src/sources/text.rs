//! Abstract cleanup shared by the source adapters and the indexer
//!
//! Crossref abstracts arrive as JATS XML, Scopus and Web of Science as
//! HTML-escaped text. Everything is reduced to single-spaced plain text.

use regex::Regex;
use std::sync::OnceLock;

fn tag_pattern() -> &'static Regex {
    static TAGS: OnceLock<Regex> = OnceLock::new();
    TAGS.get_or_init(|| Regex::new(r"</?([A-Za-z][\w:.-]*)[^<>]*>").expect("valid tag pattern"))
}

fn entity_pattern() -> &'static Regex {
    static ENTITIES: OnceLock<Regex> = OnceLock::new();
    ENTITIES.get_or_init(|| {
        Regex::new(r"&(#[0-9]+|#[xX][0-9a-fA-F]+|[a-zA-Z]+);").expect("valid entity pattern")
    })
}

/// Collapse runs of whitespace to single spaces and trim
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Decode the HTML entities sources actually emit
pub fn unescape_html(text: &str) -> String {
    entity_pattern()
        .replace_all(text, |caps: &regex::Captures| {
            let entity = &caps[1];
            let decoded = if let Some(hex) = entity.strip_prefix("#x").or_else(|| entity.strip_prefix("#X")) {
                u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
            } else if let Some(dec) = entity.strip_prefix('#') {
                dec.parse::<u32>().ok().and_then(char::from_u32)
            } else {
                match entity {
                    "amp" => Some('&'),
                    "lt" => Some('<'),
                    "gt" => Some('>'),
                    "quot" => Some('"'),
                    "apos" => Some('\''),
                    "nbsp" => Some(' '),
                    "ndash" => Some('–'),
                    "mdash" => Some('—'),
                    _ => None,
                }
            };
            decoded
                .map(String::from)
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

/// Formatting tags that sit inside a word run
const INLINE_TAGS: [&str; 12] = ["a", "b", "i", "u", "em", "strong", "sup", "sub", "sc", "span", "italic", "bold"];

/// Block tags become a space, inline tags vanish
fn strip_tags(text: &str) -> String {
    tag_pattern()
        .replace_all(text, |caps: &regex::Captures| {
            let name = caps[1].to_lowercase();
            let local = name.rsplit(':').next().unwrap_or_default();
            if INLINE_TAGS.contains(&local) {
                ""
            } else {
                " "
            }
        })
        .into_owned()
}

/// Strip markup, decode entities and collapse whitespace. Tags are stripped
/// again after decoding since escaped markup only becomes a tag then.
pub fn clean_abstract(raw: &str) -> String {
    let decoded = unescape_html(&strip_tags(raw));
    let text = collapse_whitespace(&strip_tags(&decoded));

    // JATS abstracts usually open with a literal "Abstract" heading
    match text.strip_prefix("Abstract ") {
        Some(rest) if !rest.trim().is_empty() => rest.trim().to_string(),
        _ => text,
    }
}

/// Keep at most `max_words` words
pub fn truncate_words(text: &str, max_words: usize) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.len() <= max_words {
        return words.join(" ");
    }
    words[..max_words].join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_jats_abstract() {
        let raw = "<jats:title>Abstract</jats:title><jats:p>Large language models &amp; \n  assessment.</jats:p>";
        assert_eq!(clean_abstract(raw), "Large language models & assessment.");

        let raw = "<jats:p>CO<jats:sub>2</jats:sub> uptake.</jats:p><jats:p>Second.</jats:p>";
        assert_eq!(clean_abstract(raw), "CO2 uptake. Second.");
    }

    #[test]
    fn test_clean_escaped_markup() {
        assert_eq!(clean_abstract("We study &lt;b&gt;scoring&lt;/b&gt;."), "We study scoring.");
        assert_eq!(
            clean_abstract("&lt;p&gt;Effects were small (p &lt; 0.05).&lt;/p&gt;"),
            "Effects were small (p < 0.05)."
        );
    }

    #[test]
    fn test_unescape_numeric_entities() {
        assert_eq!(unescape_html("caf&#233; &#x41;&unknown;"), "café A&unknown;");
    }

    #[test]
    fn test_clean_keeps_plain_text() {
        assert_eq!(clean_abstract("  Plain   text  "), "Plain text");
        assert_eq!(clean_abstract("Abstract"), "Abstract");
    }

    #[test]
    fn test_truncate_words() {
        assert_eq!(truncate_words("one two three four", 2), "one two");
        assert_eq!(truncate_words("one  two", 5), "one two");
    }
}
