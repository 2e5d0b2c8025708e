//! Reference rendering for RAW, BibTeX and APA 7
//!
//! Every renderer omits a segment when its field is absent. No renderer ever
//! writes a placeholder for missing data.

use crate::types::{Author, CitationStyle, PaperRecord};

/// APA 7 lists up to this many authors before eliding
const APA_MAX_AUTHORS: usize = 20;

/// Rendered text plus anything that had to be dropped or repaired
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    pub text: String,
    pub issues: Vec<String>,
}

/// Render one paper under `key` in the given style
pub fn render(paper: &PaperRecord, key: &str, style: CitationStyle) -> Rendered {
    match style {
        CitationStyle::Raw => render_raw(paper, key),
        CitationStyle::Bibtex => render_bibtex(paper, key),
        CitationStyle::Apa7 => render_apa7(paper, key),
    }
}

fn render_raw(paper: &PaperRecord, key: &str) -> Rendered {
    let text = match (&paper.doi, &paper.title) {
        (Some(doi), _) => format!("{} — {}", key, doi),
        (None, Some(title)) => format!("{} — {}", key, title),
        (None, None) => key.to_string(),
    };
    Rendered {
        text,
        issues: Vec::new(),
    }
}

fn render_bibtex(paper: &PaperRecord, key: &str) -> Rendered {
    let mut issues = Vec::new();
    let entry_type = if paper.venue.is_some() { "article" } else { "misc" };

    let mut fields: Vec<(&str, String)> = Vec::new();
    if !paper.authors.is_empty() {
        let authors = paper
            .authors
            .iter()
            .map(|a| match &a.given {
                Some(given) => format!("{}, {}", a.family, given),
                None => format!("{{{}}}", a.family),
            })
            .collect::<Vec<_>>()
            .join(" and ");
        fields.push(("author", authors));
    }
    if let Some(title) = &paper.title {
        fields.push(("title", title.clone()));
    }
    if let Some(venue) = &paper.venue {
        fields.push(("journal", venue.clone()));
    }
    if let Some(year) = paper.year {
        fields.push(("year", year.to_string()));
    }
    if let Some(doi) = &paper.doi {
        fields.push(("doi", doi.clone()));
    }

    let body = fields
        .into_iter()
        .map(|(name, value)| {
            let balanced = balance_braces(&value);
            if balanced != value {
                issues.push(format!("{}: unbalanced braces removed from {}", key, name));
            }
            format!("  {} = {{{}}}", name, balanced)
        })
        .collect::<Vec<_>>()
        .join(",\n");

    let text = if body.is_empty() {
        format!("@{}{{{}\n}}", entry_type, key)
    } else {
        format!("@{}{{{},\n{}\n}}", entry_type, key, body)
    };

    Rendered { text, issues }
}

fn render_apa7(paper: &PaperRecord, key: &str) -> Rendered {
    let mut issues = Vec::new();
    let mut parts: Vec<String> = Vec::new();

    let year = match paper.year {
        Some(year) => format!("({}).", year),
        None => "(n.d.).".to_string(),
    };
    let title = paper.title.as_deref().map(sentence);

    if paper.authors.is_empty() {
        // APA moves the title into the author position
        if let Some(title) = &title {
            parts.push(title.clone());
        }
        parts.push(year);
    } else {
        parts.push(apa_author_list(&paper.authors));
        parts.push(year);
        if let Some(title) = &title {
            parts.push(title.clone());
        }
    }

    if title.is_none() {
        issues.push(format!("{}: rendered without a title", key));
    }
    if let Some(venue) = &paper.venue {
        parts.push(sentence(venue));
    }
    if let Some(doi) = &paper.doi {
        parts.push(format!("https://doi.org/{}", doi));
    }

    Rendered {
        text: parts.join(" "),
        issues,
    }
}

/// "Family, G. I., Family, G., & Family, G."
fn apa_author_list(authors: &[Author]) -> String {
    let names: Vec<String> = authors.iter().map(apa_name).collect();

    match names.len() {
        1 => names[0].clone(),
        2 => format!("{}, & {}", names[0], names[1]),
        n if n <= APA_MAX_AUTHORS => {
            format!("{}, & {}", names[..n - 1].join(", "), names[n - 1])
        }
        n => format!(
            "{}, . . . {}",
            names[..APA_MAX_AUTHORS - 1].join(", "),
            names[n - 1]
        ),
    }
}

fn apa_name(author: &Author) -> String {
    let initials = author
        .given
        .as_deref()
        .map(initials)
        .filter(|i| !i.is_empty());
    match initials {
        Some(initials) => format!("{}, {}", author.family, initials),
        None => author.family.clone(),
    }
}

/// "Jean-Paul Marie" → "J.-P. M."
fn initials(given: &str) -> String {
    given
        .split_whitespace()
        .filter_map(|word| {
            let parts: Vec<String> = word
                .split('-')
                .filter_map(|part| part.chars().find(|c| c.is_alphabetic()))
                .map(|c| format!("{}.", c.to_uppercase()))
                .collect();
            if parts.is_empty() {
                None
            } else {
                Some(parts.join("-"))
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Terminate with a period unless the text already ends a sentence
fn sentence(text: &str) -> String {
    let text = text.trim();
    if text.ends_with(['.', '?', '!']) {
        text.to_string()
    } else {
        format!("{}.", text)
    }
}

/// Drop braces that would leave a BibTeX value unbalanced
fn balance_braces(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    let mut keep = vec![true; chars.len()];
    let mut open: Vec<usize> = Vec::new();

    for (i, c) in chars.iter().enumerate() {
        match c {
            '{' => open.push(i),
            '}' => {
                if open.pop().is_none() {
                    keep[i] = false;
                }
            }
            _ => {}
        }
    }
    for i in open {
        keep[i] = false;
    }

    chars
        .into_iter()
        .zip(keep)
        .filter_map(|(c, k)| k.then_some(c))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{RawRecord, SourceKind};

    fn sample(doi: Option<&str>, venue: Option<&str>, year: Option<i32>) -> PaperRecord {
        PaperRecord::from_raw(
            RawRecord {
                doi: doi.map(str::to_string),
                title: Some("Generative AI and assessment".to_string()),
                authors: vec![
                    Author::new("Smith", Some("Jane Ann".to_string())),
                    Author::new("Lee", Some("Min-Jun".to_string())),
                ],
                year,
                venue: venue.map(str::to_string),
                ..Default::default()
            },
            SourceKind::Crossref,
        )
        .unwrap()
    }

    #[test]
    fn test_raw_prefers_doi() {
        let paper = sample(Some("10.1/abc"), None, Some(2023));
        assert_eq!(render(&paper, "Smith2023", CitationStyle::Raw).text, "Smith2023 — 10.1/abc");

        let paper = sample(None, None, Some(2023));
        assert_eq!(
            render(&paper, "Smith2023", CitationStyle::Raw).text,
            "Smith2023 — Generative AI and assessment"
        );
    }

    #[test]
    fn test_apa7_full() {
        let paper = sample(Some("10.1/abc"), Some("Computers & Education"), Some(2023));
        let rendered = render(&paper, "Smith2023", CitationStyle::Apa7);
        assert_eq!(
            rendered.text,
            "Smith, J. A., & Lee, M.-J. (2023). Generative AI and assessment. Computers & Education. https://doi.org/10.1/abc"
        );
        assert!(rendered.issues.is_empty());
    }

    #[test]
    fn test_apa7_omits_missing_fields() {
        let paper = sample(None, None, None);
        let text = render(&paper, "Smithnd", CitationStyle::Apa7).text;
        assert_eq!(text, "Smith, J. A., & Lee, M.-J. (n.d.). Generative AI and assessment.");
        assert!(!text.contains("None"));
        assert!(!text.contains("doi.org"));
    }

    #[test]
    fn test_apa7_without_authors_leads_with_title() {
        let mut paper = sample(Some("10.1/abc"), None, Some(2021));
        paper.authors.clear();
        let text = render(&paper, "Anon2021", CitationStyle::Apa7).text;
        assert!(text.starts_with("Generative AI and assessment. (2021)."));
    }

    #[test]
    fn test_apa7_elides_long_author_lists() {
        let mut paper = sample(None, None, Some(2020));
        paper.authors = (0..25)
            .map(|i| Author::new(format!("Author{}", i), Some("X".to_string())))
            .collect();
        let text = render(&paper, "Author02020", CitationStyle::Apa7).text;
        assert!(text.contains("Author18, X., . . . Author24, X."));
        assert!(!text.contains("Author19,"));
    }

    #[test]
    fn test_bibtex_article_and_misc() {
        let article = render(
            &sample(Some("10.1/abc"), Some("Journal"), Some(2023)),
            "Smith2023",
            CitationStyle::Bibtex,
        );
        assert!(article.text.starts_with("@article{Smith2023,"));
        assert!(article.text.contains("  author = {Smith, Jane Ann and Lee, Min-Jun}"));
        assert!(article.text.contains("  journal = {Journal}"));
        assert!(article.text.contains("  doi = {10.1/abc}"));

        let misc = render(&sample(None, None, None), "Smithnd", CitationStyle::Bibtex);
        assert!(misc.text.starts_with("@misc{Smithnd,"));
        assert!(!misc.text.contains("doi"));
        assert!(!misc.text.contains("year"));
        assert!(!misc.text.contains("{}"));
    }

    #[test]
    fn test_bibtex_repairs_braces() {
        let mut paper = sample(None, None, Some(2020));
        paper.title = Some("Broken {title".to_string());
        let rendered = render(&paper, "Smith2020", CitationStyle::Bibtex);
        assert!(rendered.text.contains("  title = {Broken title}"));
        assert_eq!(rendered.issues.len(), 1);
    }

    #[test]
    fn test_initials() {
        assert_eq!(initials("Jean-Paul Marie"), "J.-P. M.");
        assert_eq!(initials("j."), "J.");
        assert_eq!(initials(""), "");
    }
}
