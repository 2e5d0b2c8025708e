//! One-shot review generation with post-hoc marker validation
use std::time::Duration;
use tracing::{info, warn};

use crate::backends::Generator;
use crate::citations;
use crate::errors::{BackendError, PipelineError, Result};
use crate::rag::context::ContextBuilder;
use crate::rag::markers::distinct_markers;
use crate::types::{Citation, CitationStyle, RankedContext};

/// Generated text plus the references it actually uses
#[derive(Debug, Clone, PartialEq)]
pub struct Synthesis {
    /// Model output, unmodified
    pub text: String,
    /// Context papers cited in the text, in order of first appearance
    pub citations: Vec<Citation>,
    /// Markers that match no context key
    pub unknown_markers: Vec<String>,
    /// Render issues, prefixed with the citation key
    pub citation_issues: Vec<String>,
}

pub struct ReviewSynthesizer {
    builder: ContextBuilder,
    timeout: Duration,
}

impl ReviewSynthesizer {
    pub fn new(timeout: Duration) -> Self {
        Self {
            builder: ContextBuilder::new(),
            timeout,
        }
    }

    /// Exactly one generation call; failures propagate
    pub async fn synthesize(
        &self,
        generator: &dyn Generator,
        topic: &str,
        context: &RankedContext,
        language: &str,
        style: CitationStyle,
    ) -> Result<Synthesis> {
        let prompt = self.builder.prompt(topic, language, context);
        info!(model = %generator.model_id(), papers = context.len(), "generating review");

        let text = tokio::time::timeout(self.timeout, generator.generate(&prompt))
            .await
            .map_err(|_| PipelineError::GenerationFailure(BackendError::Timeout(self.timeout)))?
            .map_err(PipelineError::GenerationFailure)?;

        Ok(validate(text, context, style))
    }
}

/// Check markers against context keys and build the reference list
pub fn validate(text: String, context: &RankedContext, style: CitationStyle) -> Synthesis {
    let mut citations = Vec::new();
    let mut unknown_markers = Vec::new();
    let mut citation_issues = Vec::new();

    let known = context.keys();
    for marker in distinct_markers(&text, &known) {
        match context.find(&marker) {
            Some(cited) => {
                let (citation, issues) = citations::format(cited, style);
                citation_issues.extend(issues);
                citations.push(citation);
            }
            None => {
                warn!(marker = %marker, "marker matches no context paper");
                unknown_markers.push(marker);
            }
        }
    }

    Synthesis {
        text,
        citations,
        unknown_markers,
        citation_issues,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::Prompt;
    use crate::types::{Author, CitedPaper, PaperRecord, RankedPaper, RawRecord, SourceKind};
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct Scripted {
        reply: std::result::Result<String, ()>,
        prompts: Mutex<Vec<Prompt>>,
    }

    impl Scripted {
        fn replying(text: &str) -> Self {
            Self {
                reply: Ok(text.to_string()),
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Generator for Scripted {
        fn model_id(&self) -> String {
            "fake/scripted".to_string()
        }

        async fn generate(&self, prompt: &Prompt) -> std::result::Result<String, BackendError> {
            self.prompts.lock().unwrap().push(prompt.clone());
            self.reply
                .clone()
                .map_err(|_| BackendError::InvalidResponse("model unavailable".to_string()))
        }
    }

    fn context() -> RankedContext {
        let entry = |key: &str, ordinal: usize, doi: Option<&str>| RankedPaper {
            cited: CitedPaper {
                key: key.to_string(),
                ordinal,
                paper: PaperRecord::from_raw(
                    RawRecord {
                        doi: doi.map(str::to_string),
                        title: Some(format!("Study {}", ordinal)),
                        authors: vec![Author::new("Kim", Some("Ji".to_string()))],
                        year: Some(2023),
                        abstract_text: Some("An abstract.".to_string()),
                        ..Default::default()
                    },
                    SourceKind::Crossref,
                )
                .unwrap(),
            },
            score: 0.9,
        };
        RankedContext {
            entries: vec![
                entry("Kim2023a", 0, Some("10.1/a")),
                entry("Kim2023b", 1, None),
                entry("Kim2023c", 2, Some("10.1/c")),
            ],
        }
    }

    #[test]
    fn test_references_follow_first_appearance() {
        let text = "Second first (Kim2023b). Then (Kim2023a; Kim2023b).".to_string();
        let synthesis = validate(text.clone(), &context(), CitationStyle::Raw);

        let keys: Vec<_> = synthesis.citations.iter().map(|c| c.key.as_str()).collect();
        assert_eq!(keys, vec!["Kim2023b", "Kim2023a"]);
        assert_eq!(synthesis.text, text);
        assert!(synthesis.unknown_markers.is_empty());
    }

    #[test]
    fn test_unknown_markers_are_reported_not_removed() {
        let text = "Claim (Kim2023a; Doe2019).".to_string();
        let synthesis = validate(text, &context(), CitationStyle::Apa7);

        assert_eq!(synthesis.unknown_markers, vec!["Doe2019"]);
        assert_eq!(synthesis.citations.len(), 1);
        assert!(synthesis.text.contains("Doe2019"));
    }

    #[test]
    fn test_uncited_context_is_not_referenced() {
        let synthesis = validate("(Kim2023c)".to_string(), &context(), CitationStyle::Bibtex);
        assert_eq!(synthesis.citations.len(), 1);
        assert_eq!(synthesis.citations[0].paper_id, "doi:10.1/c");
    }

    #[test]
    fn test_digit_led_author_key_is_referenced() {
        let cited = crate::citations::cite_all(vec![PaperRecord::from_raw(
            RawRecord {
                title: Some("Release 17 overview".to_string()),
                authors: vec![Author::new("3GPP", None)],
                year: Some(2021),
                abstract_text: Some("Standards work.".to_string()),
                ..Default::default()
            },
            SourceKind::Crossref,
        )
        .unwrap()])
        .remove(0);
        assert_eq!(cited.key, "3GPP2021");
        let context = RankedContext {
            entries: vec![RankedPaper { cited, score: 0.8 }],
        };

        let synthesis = validate("Networks evolved (3GPP2021).".to_string(), &context, CitationStyle::Raw);
        assert_eq!(synthesis.citations.len(), 1);
        assert_eq!(synthesis.citations[0].key, "3GPP2021");
        assert!(synthesis.unknown_markers.is_empty());
    }

    #[tokio::test]
    async fn test_single_generation_call() {
        let generator = Scripted::replying("Assessment is changing (Kim2023a).");
        let synthesizer = ReviewSynthesizer::new(Duration::from_secs(5));

        let synthesis = synthesizer
            .synthesize(&generator, "assessment", &context(), "English", CitationStyle::Apa7)
            .await
            .unwrap();

        let prompts = generator.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].user.contains("[Kim2023c]"));
        assert_eq!(synthesis.citations.len(), 1);
    }

    #[tokio::test]
    async fn test_generation_failure_propagates() {
        let generator = Scripted {
            reply: Err(()),
            prompts: Mutex::new(Vec::new()),
        };
        let synthesizer = ReviewSynthesizer::new(Duration::from_secs(5));

        let err = synthesizer
            .synthesize(&generator, "assessment", &context(), "English", CitationStyle::Apa7)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "generation_failure");
    }
}
