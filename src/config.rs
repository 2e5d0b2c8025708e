//! Run configuration
//!
//! Credentials and backend identity are plain configuration values handed to
//! the adapters at construction time. Nothing in the pipeline reads the
//! process environment.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::errors::PipelineError;
use crate::types::{CitationStyle, DEFAULT_LANGUAGE};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub sources: SourcesConfig,
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

/// Bibliographic sources and their credentials
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    /// Contact address for the Crossref polite pool
    pub crossref_mailto: Option<String>,
    /// Enables Scopus when set
    pub scopus_api_key: Option<String>,
    pub scopus_insttoken: Option<String>,
    /// Enables Web of Science when set
    pub wos_api_key: Option<String>,
    /// Records requested from each source
    pub per_source_limit: usize,
    pub timeout_secs: u64,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            crossref_mailto: None,
            scopus_api_key: None,
            scopus_insttoken: None,
            wos_api_key: None,
            per_source_limit: 50,
            timeout_secs: 30,
        }
    }
}

/// Embedding/generation service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendProvider {
    Ollama,
    OpenAi,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub provider: BackendProvider,
    /// Provider default when unset
    pub base_url: Option<String>,
    /// Required for OpenAI
    pub api_key: Option<String>,
    pub embedding_model: String,
    pub generation_model: String,
    pub temperature: f32,
    pub embedding_timeout_secs: u64,
    pub generation_timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            provider: BackendProvider::Ollama,
            base_url: None,
            api_key: None,
            embedding_model: "nomic-embed-text".to_string(),
            generation_model: "qwen2.5:7b-instruct".to_string(),
            temperature: 0.2,
            embedding_timeout_secs: 60,
            generation_timeout_secs: 300,
        }
    }
}

impl BackendConfig {
    pub fn embedding_timeout(&self) -> Duration {
        Duration::from_secs(self.embedding_timeout_secs)
    }

    pub fn generation_timeout(&self) -> Duration {
        Duration::from_secs(self.generation_timeout_secs)
    }
}

/// Ranking, batching and output defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Papers selected as generation context
    pub top_k: usize,
    /// Texts per embedding call
    pub embed_batch_size: usize,
    /// Embedding calls in flight at once
    pub embed_concurrency: usize,
    /// Word budget per embedding input
    pub max_embedding_words: usize,
    pub default_language: String,
    pub default_style: CitationStyle,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            top_k: 8,
            embed_batch_size: 100,
            embed_concurrency: 4,
            max_embedding_words: 8192,
            default_language: DEFAULT_LANGUAGE.to_string(),
            default_style: CitationStyle::Apa7,
        }
    }
}

impl Config {
    /// Load configuration from the default path, creating it if it doesn't exist
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            let config = Config::default();
            config.save_to(&config_path)?;
            return Ok(config);
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from an explicit file
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        Ok(config)
    }

    /// Save configuration to a file
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let toml_string = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(path, toml_string).context("Failed to write config file")?;

        Ok(())
    }

    /// Get the configuration file path
    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Could not determine home directory")?;

        Ok(home.join(".litbuddy").join("config.toml"))
    }

    /// Reject values the pipeline cannot run with
    pub fn validate(&self) -> std::result::Result<(), PipelineError> {
        let invalid = |msg: &str| Err(PipelineError::Config(msg.to_string()));

        if self.pipeline.top_k == 0 {
            return invalid("pipeline.top_k must be at least 1");
        }
        if self.pipeline.embed_batch_size == 0 {
            return invalid("pipeline.embed_batch_size must be at least 1");
        }
        if self.pipeline.embed_concurrency == 0 {
            return invalid("pipeline.embed_concurrency must be at least 1");
        }
        if self.pipeline.max_embedding_words == 0 {
            return invalid("pipeline.max_embedding_words must be at least 1");
        }
        if self.sources.per_source_limit == 0 {
            return invalid("sources.per_source_limit must be at least 1");
        }
        if self.sources.timeout_secs == 0
            || self.backend.embedding_timeout_secs == 0
            || self.backend.generation_timeout_secs == 0
        {
            return invalid("timeouts must be at least one second");
        }
        if self.backend.embedding_model.trim().is_empty() {
            return invalid("backend.embedding_model must not be empty");
        }
        if self.backend.generation_model.trim().is_empty() {
            return invalid("backend.generation_model must not be empty");
        }
        if self.backend.provider == BackendProvider::OpenAi
            && self.backend.api_key.as_deref().map_or(true, |k| k.trim().is_empty())
        {
            return invalid("backend.api_key is required for the openai provider");
        }

        Ok(())
    }
}
