//! TOML configuration.
//!
//! Only `[db]` is required; every other section falls back to defaults.
//! [`load_config`] parses the file and rejects out-of-range values before
//! anything connects to a database or model server.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use courtside_core::orchestrator::{OrchestratorParams, MAX_ITERATIONS};
use courtside_core::retrieval::{
    RetrievalParams, DEFAULT_TOP_K, MAX_TOP_K, MIN_GAMES, SIMILARITY_THRESHOLD,
};
use courtside_core::specialists::DEFAULT_SQL_ATTEMPTS;

pub const DEFAULT_CONFIG_PATH: &str = "./config/courtside.toml";
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
pub const DEFAULT_CHAT_MODEL: &str = "qwen2.5:7b";

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f64,
    #[serde(default = "default_min_games")]
    pub min_games: i64,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            similarity_threshold: SIMILARITY_THRESHOLD,
            min_games: MIN_GAMES,
        }
    }
}

impl RetrievalConfig {
    pub fn params(&self) -> RetrievalParams {
        RetrievalParams {
            top_k: self.top_k,
            similarity_threshold: self.similarity_threshold,
            min_games: self.min_games,
        }
    }
}

fn default_top_k() -> usize {
    DEFAULT_TOP_K
}
fn default_similarity_threshold() -> f64 {
    SIMILARITY_THRESHOLD
}
fn default_min_games() -> i64 {
    MIN_GAMES
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
    /// Base URL for the Ollama provider.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_embedding_retries")]
    pub max_retries: u32,
    #[serde(default = "default_embedding_timeout")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            model: None,
            dims: None,
            url: None,
            max_retries: default_embedding_retries(),
            timeout_secs: default_embedding_timeout(),
        }
    }
}

impl EmbeddingConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

fn default_embedding_provider() -> String {
    "disabled".to_string()
}
fn default_embedding_retries() -> u32 {
    5
}
fn default_embedding_timeout() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    #[serde(default = "default_llm_provider")]
    pub provider: String,
    #[serde(default = "default_llm_model")]
    pub model: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_llm_retries")]
    pub max_retries: u32,
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_llm_provider(),
            model: default_llm_model(),
            url: None,
            max_retries: default_llm_retries(),
            timeout_secs: default_llm_timeout(),
        }
    }
}

fn default_llm_provider() -> String {
    "ollama".to_string()
}
fn default_llm_model() -> String {
    DEFAULT_CHAT_MODEL.to_string()
}
fn default_llm_retries() -> u32 {
    3
}
fn default_llm_timeout() -> u64 {
    120
}

#[derive(Debug, Deserialize, Clone)]
pub struct OrchestratorConfig {
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
    #[serde(default = "default_sql_attempts")]
    pub sql_attempts: u32,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_iterations: MAX_ITERATIONS,
            sql_attempts: DEFAULT_SQL_ATTEMPTS,
        }
    }
}

impl OrchestratorConfig {
    pub fn params(&self) -> OrchestratorParams {
        OrchestratorParams {
            max_iterations: self.max_iterations,
            sql_attempts: self.sql_attempts,
        }
    }
}

fn default_max_iterations() -> u32 {
    MAX_ITERATIONS
}
fn default_sql_attempts() -> u32 {
    DEFAULT_SQL_ATTEMPTS
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:7341".to_string()
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse_config(&content)
}

/// Parse and validate configuration text.
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;

    // Validate retrieval
    if config.retrieval.top_k < 1 {
        anyhow::bail!("retrieval.top_k must be >= 1");
    }

    if config.retrieval.top_k > MAX_TOP_K {
        anyhow::bail!("retrieval.top_k must be <= {}", MAX_TOP_K);
    }

    if !(0.0..=1.0).contains(&config.retrieval.similarity_threshold) {
        anyhow::bail!("retrieval.similarity_threshold must be in [0.0, 1.0]");
    }

    if config.retrieval.min_games < 0 {
        anyhow::bail!("retrieval.min_games must be >= 0");
    }

    // Validate embedding
    if config.embedding.is_enabled() && config.embedding.provider != "local" {
        if config.embedding.dims.is_none() || config.embedding.dims == Some(0) {
            anyhow::bail!(
                "embedding.dims must be > 0 when provider is '{}'",
                config.embedding.provider
            );
        }
        if config.embedding.model.is_none() {
            anyhow::bail!(
                "embedding.model must be specified when provider is '{}'",
                config.embedding.provider
            );
        }
    }

    match config.embedding.provider.as_str() {
        "disabled" | "ollama" | "openai" | "local" => {}
        other => anyhow::bail!(
            "Unknown embedding provider: '{}'. Must be disabled, ollama, openai, or local.",
            other
        ),
    }

    // Validate llm
    match config.llm.provider.as_str() {
        "ollama" | "openai" => {}
        other => anyhow::bail!(
            "Unknown llm provider: '{}'. Must be ollama or openai.",
            other
        ),
    }

    if config.llm.model.trim().is_empty() {
        anyhow::bail!("llm.model must not be empty");
    }

    // Validate orchestrator
    if config.orchestrator.max_iterations < 1 {
        anyhow::bail!("orchestrator.max_iterations must be >= 1");
    }

    if config.orchestrator.sql_attempts < 1 {
        anyhow::bail!("orchestrator.sql_attempts must be >= 1");
    }

    Ok(config)
}
