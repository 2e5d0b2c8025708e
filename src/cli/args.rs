//! Command-line argument parsing for litbuddy
//!
//! Provides clap-based CLI with subcommands and verbosity control.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::Config;
use crate::errors::Result;
use crate::output::DEFAULT_OUTPUT;
use crate::types::{CitationStyle, ReviewRequest};

/// litbuddy - Grounded literature reviews from bibliographic search
#[derive(Parser, Debug)]
#[command(name = "litbuddy")]
#[command(author = "Jerome (Kubashen) Naidoo")]
#[command(version)]
#[command(about = "Write a cited literature review from Crossref, Scopus and Web of Science", long_about = None)]
pub struct Args {
    /// Review topic (prompted for when omitted)
    #[arg(value_name = "TOPIC")]
    pub topic: Option<String>,

    /// Citation style: raw, bibtex or apa7
    #[arg(short, long, value_parser = parse_style)]
    pub style: Option<CitationStyle>,

    /// Language of the review
    #[arg(long)]
    pub language: Option<String>,

    /// Markdown output file
    #[arg(short, long, default_value = DEFAULT_OUTPUT)]
    pub output: PathBuf,

    /// Print the result as JSON instead of writing Markdown
    #[arg(long)]
    pub json: bool,

    /// Papers used as generation context
    #[arg(short = 'k', long)]
    pub top_k: Option<usize>,

    /// Records requested from each source
    #[arg(short, long)]
    pub limit: Option<usize>,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Verbosity level: -q (quiet), default (normal), -v (verbose), -vv (very verbose)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (errors only)
    #[arg(short, long)]
    pub quiet: bool,

    /// Subcommand
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commands {
    /// Display the effective configuration
    Config,

    /// List registered sources in priority order
    Sources,
}

/// Verbosity level enum
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    Normal,
    Verbose,
    VeryVerbose,
}

fn parse_style(value: &str) -> std::result::Result<CitationStyle, String> {
    value.parse::<CitationStyle>().map_err(|e| e.to_string())
}

impl Args {
    /// Get verbosity level based on flags
    pub fn verbosity(&self) -> Verbosity {
        if self.quiet {
            Verbosity::Quiet
        } else {
            match self.verbose {
                0 => Verbosity::Normal,
                1 => Verbosity::Verbose,
                _ => Verbosity::VeryVerbose,
            }
        }
    }

    /// Topic not allowed with subcommands
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.command.is_some() && self.topic.is_some() {
            return Err("Cannot specify a topic with a subcommand.".to_string());
        }
        Ok(())
    }

    /// Apply command-line overrides on top of file configuration
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(top_k) = self.top_k {
            config.pipeline.top_k = top_k;
        }
        if let Some(limit) = self.limit {
            config.sources.per_source_limit = limit;
        }
    }

    /// Build the request, falling back to configured style and language
    pub fn build_request(&self, topic: &str, config: &Config) -> Result<ReviewRequest> {
        let style = self.style.unwrap_or(config.pipeline.default_style);
        let language = self
            .language
            .clone()
            .unwrap_or_else(|| config.pipeline.default_language.clone());
        Ok(ReviewRequest::new(topic, style)?.with_language(language))
    }
}

impl Verbosity {
    /// Default tracing filter when RUST_LOG is unset
    pub fn log_filter(&self) -> &'static str {
        match self {
            Verbosity::Quiet => "error",
            Verbosity::Normal => "warn",
            Verbosity::Verbose => "litbuddy=info",
            Verbosity::VeryVerbose => "litbuddy=debug",
        }
    }

    /// Check if should show progress spinner
    pub fn show_progress(&self) -> bool {
        !matches!(self, Verbosity::Quiet)
    }

    /// Check if should show run diagnostics
    pub fn show_diagnostics(&self) -> bool {
        matches!(self, Verbosity::Verbose | Verbosity::VeryVerbose)
    }
}
