//! Markdown rendering of a finished review
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use crate::types::{CitationStyle, ReviewResult};

/// Default output file for the CLI
pub const DEFAULT_OUTPUT: &str = "literature_review.md";

/// Review text followed by a `## References` section
pub fn render_markdown(result: &ReviewResult) -> String {
    let mut out = String::new();
    out.push_str(&format!("# Literature Review: {}\n\n", result.topic));
    out.push_str(result.text.trim());
    out.push_str("\n\n## References\n\n");

    if result.citations.is_empty() {
        out.push_str("No references were cited.\n");
        return out;
    }

    match result.citation_format {
        CitationStyle::Bibtex => {
            out.push_str("```bibtex\n");
            for citation in &result.citations {
                out.push_str(&citation.rendered);
                out.push_str("\n\n");
            }
            // one blank line between entries, none before the fence
            out.truncate(out.trim_end().len());
            out.push_str("\n```\n");
        }
        CitationStyle::Raw => {
            for citation in &result.citations {
                out.push_str(&format!("- {}\n", citation.rendered));
            }
        }
        CitationStyle::Apa7 => {
            let entries: Vec<&str> = result.citations.iter().map(|c| c.rendered.as_str()).collect();
            out.push_str(&entries.join("\n\n"));
            out.push('\n');
        }
    }

    out
}

/// Write the Markdown rendering, creating parent directories
pub fn write_markdown(result: &ReviewResult, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create output directory {}", parent.display()))?;
    }

    fs::write(path, render_markdown(result))
        .with_context(|| format!("Failed to write review to {}", path.display()))?;

    Ok(())
}
