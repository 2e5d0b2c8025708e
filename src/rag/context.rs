//! Grounded prompt assembly from selected context
use serde::{Deserialize, Serialize};

use crate::backends::Prompt;
use crate::types::{RankedContext, RankedPaper};

const SYSTEM_PROMPT: &str = "You are an academic writing assistant producing a literature review. \
Use only the papers supplied in the user message; do not draw on outside sources or prior knowledge. \
Every claim must be attributable to at least one supplied paper. \
Cite papers inline with their key in parentheses, for example (Smith2021) or (Lee2022a; Kim2023). \
Use only the keys listed; never invent a key. \
Do not write a reference list; it is added afterwards.";

/// Target length of the review body, in words
const TARGET_WORDS: (usize, usize) = (800, 1200);

/// Markdown layout requested from the model
const REVIEW_STRUCTURE: &str = "Structure the review in Markdown:\n\
1. A title for the review as a level-2 heading (## ...).\n\
2. ## Executive Summary: 150-250 words on the main findings.\n\
3. Thematic sections, each a level-2 heading derived from the material.\n\
4. ## Limitations and Knowledge Gaps: what the supplied papers leave open.";

/// Context block handed to the generator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssembledContext {
    pub text: String,
    pub document_count: usize,
    /// Keys in context order
    pub document_keys: Vec<String>,
}

/// Builds the single generation prompt for a review
#[derive(Debug, Clone, Default)]
pub struct ContextBuilder;

impl ContextBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Render every context paper as a keyed block
    pub fn build(&self, context: &RankedContext) -> AssembledContext {
        let parts: Vec<String> = context.entries.iter().map(format_entry).collect();

        AssembledContext {
            text: parts.join("\n\n"),
            document_count: parts.len(),
            document_keys: context.keys().into_iter().map(str::to_string).collect(),
        }
    }

    pub fn prompt(&self, topic: &str, language: &str, context: &RankedContext) -> Prompt {
        let assembled = self.build(context);
        let user = format!(
            "Topic: {topic}\n\
             Write a literature review on this topic in {language}, about {min}-{max} words.\n\
             {structure}\n\
             Available keys: {keys}\n\n\
             Papers ({count}):\n\n{papers}\n",
            topic = topic,
            language = language,
            min = TARGET_WORDS.0,
            max = TARGET_WORDS.1,
            structure = REVIEW_STRUCTURE,
            keys = assembled.document_keys.join(", "),
            count = assembled.document_count,
            papers = assembled.text,
        );

        Prompt {
            system: SYSTEM_PROMPT.to_string(),
            user,
        }
    }
}

fn format_entry(entry: &RankedPaper) -> String {
    let paper = &entry.cited.paper;
    let mut lines = vec![format!("[{}]", entry.cited.key)];

    if let Some(title) = &paper.title {
        lines.push(format!("Title: {}", title));
    }
    if let Some(year) = paper.year {
        lines.push(format!("Year: {}", year));
    }
    if !paper.authors.is_empty() {
        let names: Vec<String> = paper.authors.iter().map(|a| a.display_name()).collect();
        lines.push(format!("Authors: {}", names.join("; ")));
    }
    if let Some(venue) = &paper.venue {
        lines.push(format!("Venue: {}", venue));
    }
    if let Some(abstract_text) = &paper.abstract_text {
        lines.push(format!("Abstract: {}", abstract_text));
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Author, CitedPaper, PaperRecord, RawRecord, SourceKind};

    fn ranked(key: &str, year: Option<i32>, venue: Option<&str>) -> RankedPaper {
        let paper = PaperRecord::from_raw(
            RawRecord {
                title: Some(format!("Title of {}", key)),
                authors: vec![Author::new("Kim", Some("Ji-woo".to_string()))],
                year,
                venue: venue.map(str::to_string),
                abstract_text: Some(format!("Findings of {}.", key)),
                ..Default::default()
            },
            SourceKind::Crossref,
        )
        .unwrap();
        RankedPaper {
            cited: CitedPaper {
                key: key.to_string(),
                ordinal: 0,
                paper,
            },
            score: 0.5,
        }
    }

    #[test]
    fn test_build_empty_context() {
        let assembled = ContextBuilder::new().build(&RankedContext::default());
        assert_eq!(assembled.document_count, 0);
        assert!(assembled.text.is_empty());
    }

    #[test]
    fn test_entry_pairs_key_with_abstract() {
        let context = RankedContext {
            entries: vec![ranked("Kim2023", Some(2023), Some("Computers & Education"))],
        };
        let assembled = ContextBuilder::new().build(&context);

        assert_eq!(assembled.document_keys, vec!["Kim2023"]);
        assert!(assembled.text.starts_with("[Kim2023]\nTitle: Title of Kim2023"));
        assert!(assembled.text.contains("Authors: Ji-woo Kim"));
        assert!(assembled.text.contains("Venue: Computers & Education"));
        assert!(assembled.text.contains("Abstract: Findings of Kim2023."));
    }

    #[test]
    fn test_missing_fields_are_omitted() {
        let context = RankedContext {
            entries: vec![ranked("Kimnd", None, None)],
        };
        let text = ContextBuilder::new().build(&context).text;
        assert!(!text.contains("Year:"));
        assert!(!text.contains("Venue:"));
        assert!(!text.contains("None"));
    }

    #[test]
    fn test_prompt_carries_topic_language_and_rules() {
        let context = RankedContext {
            entries: vec![ranked("Kim2023", Some(2023), None), ranked("Lee2022a", Some(2022), None)],
        };
        let prompt = ContextBuilder::new().prompt("AI in assessment", "German", &context);

        assert!(prompt.user.contains("Topic: AI in assessment"));
        assert!(prompt.user.contains("in German, about 800-1200 words"));
        assert!(prompt.user.contains("title for the review"));
        assert!(prompt.user.contains("## Executive Summary"));
        assert!(prompt.user.contains("heading derived from the material"));
        assert!(prompt.user.contains("## Limitations and Knowledge Gaps"));
        assert!(prompt.user.contains("Available keys: Kim2023, Lee2022a"));
        assert!(prompt.system.contains("outside sources"));
        assert!(prompt.system.contains("(Smith2021)"));
    }
}
