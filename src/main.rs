//! litbuddy - CLI entry point

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::process::ExitCode;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use litbuddy::{
    backends::OllamaBackend,
    cli::{Args, Commands, Verbosity},
    config::{BackendProvider, Config},
    output,
    rag::{ReviewPipeline, StageTracker},
    sources::SourceRegistry,
    types::ReviewResult,
};

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    setup_logging(args.verbosity());

    match run(&args).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {:#}", "error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

fn setup_logging(verbosity: Verbosity) {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(verbosity.log_filter())))
        .init();
}

async fn run(args: &Args) -> Result<ExitCode> {
    if let Err(msg) = args.validate() {
        anyhow::bail!(msg);
    }

    let config = load_config(args)?;

    match args.command {
        Some(Commands::Config) => {
            show_config(args, &config)?;
            Ok(ExitCode::SUCCESS)
        }
        Some(Commands::Sources) => {
            list_sources(&config)?;
            Ok(ExitCode::SUCCESS)
        }
        None => {
            let topic = match &args.topic {
                Some(topic) => topic.clone(),
                None => read_topic()?,
            };
            run_review(args, &config, &topic).await
        }
    }
}

fn load_config(args: &Args) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    args.apply_overrides(&mut config);
    config.validate()?;
    Ok(config)
}

/// Prompt for a topic on the terminal
fn read_topic() -> Result<String> {
    let mut editor = DefaultEditor::new().context("Failed to open terminal prompt")?;

    match editor.readline("Review topic: ") {
        Ok(line) if !line.trim().is_empty() => Ok(line.trim().to_string()),
        Ok(_) => anyhow::bail!("No topic given"),
        Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => anyhow::bail!("Interrupted"),
        Err(err) => Err(anyhow::anyhow!("Readline error: {}", err)),
    }
}

async fn run_review(args: &Args, config: &Config, topic: &str) -> Result<ExitCode> {
    let verbosity = args.verbosity();
    let request = args.build_request(topic, config)?;
    let pipeline = ReviewPipeline::from_config(config)?;

    if config.backend.provider == BackendProvider::Ollama {
        let ollama = OllamaBackend::from_config(&config.backend)?;
        if !ollama.health_check().await {
            eprintln!(
                "{} Ollama is not reachable at {}. Start it with: ollama serve",
                "warning:".yellow().bold(),
                ollama.base_url()
            );
        }
    }

    let spinner = (verbosity.show_progress() && !args.json).then(|| {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(format!("Reviewing \"{}\"", request.topic()));
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        pb
    });

    let mut tracker = StageTracker::new();
    let outcome = pipeline.run_tracked(&request, &mut tracker).await;

    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }

    if verbosity.show_diagnostics() {
        let stages: Vec<&str> = tracker.history().iter().map(|s| s.display_name()).collect();
        eprintln!("{} {}", "stages:".dimmed(), stages.join(" → "));
    }

    let result = match outcome {
        Ok(result) => result,
        Err(e) => {
            if args.json {
                println!("{}", serde_json::to_string_pretty(&e.to_response())?);
            } else {
                eprintln!("{} {}", "error:".red().bold(), e);
            }
            return Ok(ExitCode::FAILURE);
        }
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(ExitCode::SUCCESS);
    }

    output::write_markdown(&result, &args.output)?;
    if verbosity != Verbosity::Quiet {
        print_summary(&result, verbosity);
        println!(
            "{} Review written to {}",
            "✓".green().bold(),
            args.output.display()
        );
    }

    Ok(ExitCode::SUCCESS)
}

fn print_summary(result: &ReviewResult, verbosity: Verbosity) {
    let diagnostics = &result.diagnostics;

    let per_source: Vec<String> = diagnostics
        .per_source
        .iter()
        .map(|(source, count)| format!("{}: {}", source, count))
        .collect();
    println!(
        "Retrieved {} record(s) ({}), {} duplicate(s) merged",
        diagnostics.total_retrieved(),
        per_source.join(", "),
        diagnostics.duplicates_merged
    );
    println!(
        "Context: {} paper(s); cited: {}",
        diagnostics.context.len(),
        result.citations.len()
    );

    for failure in &diagnostics.source_failures {
        println!("{} {} skipped: {}", "!".yellow(), failure.source, failure.reason);
    }
    if !diagnostics.unknown_markers.is_empty() {
        println!(
            "{} Unknown citation markers: {}",
            "!".yellow(),
            diagnostics.unknown_markers.join(", ")
        );
    }

    if verbosity.show_diagnostics() {
        println!("Papers without abstract: {}", diagnostics.missing_abstracts);
        println!("Records rejected: {}", diagnostics.rejected_records);
        for id in &diagnostics.embedding_failures {
            println!("{} embedding failed: {}", "!".yellow(), id);
        }
        for issue in &diagnostics.citation_issues {
            println!("{} {}", "·".dimmed(), issue);
        }
        for entry in &diagnostics.context {
            println!("  {:>6.3}  {}  {}", entry.score, entry.key, entry.paper_id.dimmed());
        }
    }
}

fn show_config(args: &Args, config: &Config) -> Result<()> {
    let mut shown = config.clone();
    for secret in [
        &mut shown.sources.scopus_api_key,
        &mut shown.sources.scopus_insttoken,
        &mut shown.sources.wos_api_key,
        &mut shown.backend.api_key,
    ] {
        if secret.is_some() {
            *secret = Some("********".to_string());
        }
    }

    let path = match &args.config {
        Some(path) => path.clone(),
        None => Config::config_path()?,
    };

    println!("{}", format!("# {}", path.display()).dimmed());
    println!("{}", toml::to_string_pretty(&shown).context("Failed to serialize config")?);
    Ok(())
}

fn list_sources(config: &Config) -> Result<()> {
    let registry = SourceRegistry::from_config(&config.sources)?;

    println!("Registered sources (priority order):");
    for (rank, kind) in registry.kinds().iter().enumerate() {
        println!("  {}. {}", rank + 1, kind);
    }

    if config.sources.scopus_api_key.is_none() {
        println!("{}", "  SCOPUS disabled (set sources.scopus_api_key)".dimmed());
    }
    if config.sources.wos_api_key.is_none() {
        println!("{}", "  WOS disabled (set sources.wos_api_key)".dimmed());
    }

    Ok(())
}
