//! Citation key generation
//!
//! Keys are `<FirstAuthorSurname><Year>`, with `a`, `b`, … appended to every
//! member of a group that would otherwise share a key. Assignment runs once
//! over the whole merged record set, so the same input order always yields
//! the same keys.

use std::collections::HashMap;

use crate::types::{CitedPaper, PaperRecord};

/// Surname used when a paper has no usable author
pub const ANONYMOUS: &str = "Anon";

/// Year token used when a paper has no year
pub const NO_YEAR: &str = "nd";

/// Key before collision suffixes
pub fn base_key(paper: &PaperRecord) -> String {
    let surname: String = paper
        .first_author()
        .map(|a| a.family.chars().filter(|c| c.is_alphanumeric()).collect())
        .unwrap_or_default();
    let surname = if surname.is_empty() {
        ANONYMOUS.to_string()
    } else {
        surname
    };

    match paper.year {
        Some(year) => format!("{}{}", surname, year),
        None => format!("{}{}", surname, NO_YEAR),
    }
}

/// Bijective base-26 suffix: 0 → "a", 25 → "z", 26 → "aa"
pub fn suffix(mut index: usize) -> String {
    let mut out = Vec::new();
    loop {
        out.push(b'a' + (index % 26) as u8);
        if index < 26 {
            break;
        }
        index = index / 26 - 1;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

/// Assign one distinct key per paper, in input order
pub fn assign_keys(papers: &[PaperRecord]) -> Vec<String> {
    let bases: Vec<String> = papers.iter().map(base_key).collect();

    let mut group_sizes: HashMap<&str, usize> = HashMap::new();
    for base in &bases {
        *group_sizes.entry(base.as_str()).or_insert(0) += 1;
    }

    let mut seen: HashMap<&str, usize> = HashMap::new();
    bases
        .iter()
        .map(|base| {
            if group_sizes[base.as_str()] == 1 {
                return base.clone();
            }
            let position = seen.entry(base.as_str()).or_insert(0);
            let key = format!("{}{}", base, suffix(*position));
            *position += 1;
            key
        })
        .collect()
}

/// Pair each paper with its key and merged-order position
pub fn cite_all(papers: Vec<PaperRecord>) -> Vec<CitedPaper> {
    let keys = assign_keys(&papers);
    papers
        .into_iter()
        .zip(keys)
        .enumerate()
        .map(|(ordinal, (paper, key))| CitedPaper {
            key,
            ordinal,
            paper,
        })
        .collect()
}

/// Longest suffix [`looks_like_key`] accepts
const MAX_SUFFIX_LEN: usize = 2;

/// Whether a token has the shape of a generated key
pub fn looks_like_key(token: &str) -> bool {
    let chars: Vec<char> = token.chars().collect();
    if !chars.first().map_or(false, |c| c.is_alphabetic()) {
        return false;
    }
    if !chars.iter().all(|c| c.is_alphanumeric()) {
        return false;
    }

    (0..=MAX_SUFFIX_LEN).any(|len| {
        if chars.len() <= len {
            return false;
        }
        let (head, tail) = chars.split_at(chars.len() - len);
        tail.iter().all(|c| c.is_ascii_lowercase()) && ends_with_year(head)
    })
}

fn ends_with_year(head: &[char]) -> bool {
    let n = head.len();
    let dated = n >= 5 && head[n - 4..].iter().all(|c| c.is_ascii_digit());
    let undated = n >= 3 && head[n - 2..] == ['n', 'd'];
    dated || undated
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Author, RawRecord, SourceKind};

    fn paper(family: Option<&str>, year: Option<i32>, title: &str) -> PaperRecord {
        PaperRecord::from_raw(
            RawRecord {
                title: Some(title.to_string()),
                authors: family
                    .map(|f| vec![Author::new(f, Some("A.".to_string()))])
                    .unwrap_or_default(),
                year,
                ..Default::default()
            },
            SourceKind::Crossref,
        )
        .unwrap()
    }

    #[test]
    fn test_base_key() {
        assert_eq!(base_key(&paper(Some("O'Neil"), Some(2021), "t")), "ONeil2021");
        assert_eq!(base_key(&paper(None, Some(2020), "t")), "Anon2020");
        assert_eq!(base_key(&paper(Some("Müller"), None, "t")), "Müllernd");
    }

    #[test]
    fn test_suffix_sequence() {
        assert_eq!(suffix(0), "a");
        assert_eq!(suffix(1), "b");
        assert_eq!(suffix(25), "z");
        assert_eq!(suffix(26), "aa");
        assert_eq!(suffix(27), "ab");
        assert_eq!(suffix(701), "zz");
        assert_eq!(suffix(702), "aaa");
    }

    #[test]
    fn test_collisions_get_suffixes() {
        let papers = vec![
            paper(Some("Smith"), Some(2020), "one"),
            paper(Some("Lee"), Some(2022), "two"),
            paper(Some("Smith"), Some(2020), "three"),
        ];
        assert_eq!(assign_keys(&papers), vec!["Smith2020a", "Lee2022", "Smith2020b"]);
    }

    #[test]
    fn test_cite_all_tracks_order() {
        let cited = cite_all(vec![
            paper(Some("Kim"), Some(2023), "x"),
            paper(Some("Lee"), Some(2022), "y"),
        ]);
        assert_eq!(cited[0].key, "Kim2023");
        assert_eq!(cited[1].ordinal, 1);
    }

    #[test]
    fn test_key_shape() {
        assert!(looks_like_key("Smith2020"));
        assert!(looks_like_key("Smith2020b"));
        assert!(looks_like_key("Anonnd"));
        assert!(looks_like_key("Müllernda"));
        assert!(!looks_like_key("2020"));
        assert!(!looks_like_key("see"));
        assert!(!looks_like_key("e.g."));
        assert!(!looks_like_key("Smith 2020"));
        assert!(!looks_like_key("Andrew"));
    }
}
