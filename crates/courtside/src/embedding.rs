//! Embedding providers.
//!
//! Concrete [`Embedder`] implementations, selected by `embedding.provider`:
//! - **[`DisabledEmbedder`]**: always errors; semantic retrieval is unavailable.
//! - **[`OllamaEmbedder`]**: `POST /api/embed` on a local Ollama instance.
//! - **[`OpenAIEmbedder`]**: `POST /v1/embeddings`, needs `OPENAI_API_KEY`.
//! - **`LocalEmbedder`**: in-process fastembed, behind the
//!   `local-embeddings-fastembed` feature.
//!
//! Query vectors must come from the same model that produced the stored
//! summary vectors, or similarities are meaningless.
//!
//! ```rust,no_run
//! # use courtside::config::EmbeddingConfig;
//! # use courtside::embedding::create_embedder;
//! # use courtside_core::embedding::Embedder;
//! let config = EmbeddingConfig::default(); // provider = "disabled"
//! let embedder = create_embedder(&config).unwrap();
//! assert_eq!(embedder.model_name(), "disabled");
//! ```

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

use courtside_core::embedding::Embedder;

use crate::config::{EmbeddingConfig, DEFAULT_OLLAMA_URL};
use crate::http;

const OPENAI_URL: &str = "https://api.openai.com";

// ============ Disabled ============

pub struct DisabledEmbedder;

#[async_trait]
impl Embedder for DisabledEmbedder {
    fn model_name(&self) -> &str {
        "disabled"
    }

    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        bail!("Embedding provider is disabled; set [embedding] provider in the config")
    }
}

// ============ Ollama ============

/// Embeds through a local Ollama instance (e.g. after `ollama pull all-minilm`).
pub struct OllamaEmbedder {
    model: String,
    dims: usize,
    url: String,
    max_retries: u32,
    client: reqwest::Client,
}

impl OllamaEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| anyhow!("embedding.model required for Ollama provider"))?;
        let dims = config
            .dims
            .ok_or_else(|| anyhow!("embedding.dims required for Ollama provider"))?;
        let url = config
            .url
            .clone()
            .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string());

        Ok(Self {
            model,
            dims,
            url,
            max_retries: config.max_retries,
            client: http::client(config.timeout_secs)?,
        })
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let body = serde_json::json!({
            "model": self.model,
            "input": [text],
        });
        let json = http::post_json(
            &self.client,
            &format!("{}/api/embed", self.url.trim_end_matches('/')),
            None,
            &body,
            self.max_retries,
            "Ollama",
        )
        .await?;

        let vector = parse_ollama_response(&json)?;
        check_dims(vector, self.dims)
    }
}

fn parse_ollama_response(json: &Value) -> Result<Vec<f32>> {
    let first = json
        .get("embeddings")
        .and_then(|e| e.as_array())
        .and_then(|e| e.first())
        .ok_or_else(|| anyhow!("Invalid Ollama response: missing embeddings array"))?;

    floats(first).ok_or_else(|| anyhow!("Invalid Ollama response: embedding is not an array"))
}

// ============ OpenAI ============

pub struct OpenAIEmbedder {
    model: String,
    dims: usize,
    url: String,
    api_key: String,
    max_retries: u32,
    client: reqwest::Client,
}

impl OpenAIEmbedder {
    /// # Errors
    ///
    /// Fails if `model` or `dims` is unset, or `OPENAI_API_KEY` is missing.
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| anyhow!("embedding.model required for OpenAI provider"))?;
        let dims = config
            .dims
            .ok_or_else(|| anyhow!("embedding.dims required for OpenAI provider"))?;
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| anyhow!("OPENAI_API_KEY environment variable not set"))?;

        Ok(Self {
            model,
            dims,
            url: config.url.clone().unwrap_or_else(|| OPENAI_URL.to_string()),
            api_key,
            max_retries: config.max_retries,
            client: http::client(config.timeout_secs)?,
        })
    }
}

#[async_trait]
impl Embedder for OpenAIEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let body = serde_json::json!({
            "model": self.model,
            "input": [text],
        });
        let json = http::post_json(
            &self.client,
            &format!("{}/v1/embeddings", self.url.trim_end_matches('/')),
            Some(&self.api_key),
            &body,
            self.max_retries,
            "OpenAI",
        )
        .await?;

        let vector = parse_openai_response(&json)?;
        check_dims(vector, self.dims)
    }
}

fn parse_openai_response(json: &Value) -> Result<Vec<f32>> {
    let first = json
        .get("data")
        .and_then(|d| d.as_array())
        .and_then(|d| d.first())
        .ok_or_else(|| anyhow!("Invalid OpenAI response: missing data array"))?;

    first
        .get("embedding")
        .and_then(floats)
        .ok_or_else(|| anyhow!("Invalid OpenAI response: missing embedding"))
}

// ============ Local (fastembed) ============

#[cfg(feature = "local-embeddings-fastembed")]
pub struct LocalEmbedder {
    model_name: String,
    model: Arc<std::sync::Mutex<fastembed::TextEmbedding>>,
}

#[cfg(feature = "local-embeddings-fastembed")]
impl LocalEmbedder {
    /// Load the model, downloading it from Hugging Face on first use.
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let model_name = config
            .model
            .clone()
            .unwrap_or_else(|| "all-minilm-l6-v2".to_string());
        let model = fastembed::TextEmbedding::try_new(
            fastembed::InitOptions::new(fastembed_model(&model_name)?)
                .with_show_download_progress(false),
        )
        .map_err(|e| anyhow!("Failed to initialize local embedding model: {}", e))?;

        Ok(Self {
            model_name,
            model: Arc::new(std::sync::Mutex::new(model)),
        })
    }
}

#[cfg(feature = "local-embeddings-fastembed")]
fn fastembed_model(name: &str) -> Result<fastembed::EmbeddingModel> {
    match name {
        "all-minilm-l6-v2" => Ok(fastembed::EmbeddingModel::AllMiniLML6V2),
        "bge-small-en-v1.5" => Ok(fastembed::EmbeddingModel::BGESmallENV15),
        "bge-base-en-v1.5" => Ok(fastembed::EmbeddingModel::BGEBaseENV15),
        other => bail!(
            "Unknown local embedding model: '{}'. Supported models: \
             all-minilm-l6-v2, bge-small-en-v1.5, bge-base-en-v1.5",
            other
        ),
    }
}

#[cfg(feature = "local-embeddings-fastembed")]
#[async_trait]
impl Embedder for LocalEmbedder {
    fn model_name(&self) -> &str {
        &self.model_name
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let model = self.model.clone();
        let texts = vec![text.to_string()];

        tokio::task::spawn_blocking(move || {
            let mut model = model
                .lock()
                .map_err(|_| anyhow!("local embedding model lock poisoned"))?;
            let embeddings = model
                .embed(texts, None)
                .map_err(|e| anyhow!("Local embedding failed: {}", e))?;
            embeddings
                .into_iter()
                .next()
                .ok_or_else(|| anyhow!("Empty embedding response"))
        })
        .await?
    }
}

// ============ Helpers ============

fn floats(value: &Value) -> Option<Vec<f32>> {
    value
        .as_array()
        .map(|a| a.iter().map(|v| v.as_f64().unwrap_or(0.0) as f32).collect())
}

fn check_dims(vector: Vec<f32>, dims: usize) -> Result<Vec<f32>> {
    if vector.len() != dims {
        bail!(
            "embedding has {} dimensions but embedding.dims is {}",
            vector.len(),
            dims
        );
    }
    Ok(vector)
}

/// Create the [`Embedder`] named by `config.provider`.
///
/// | Config Value | Provider |
/// |-------------|----------|
/// | `"disabled"` | [`DisabledEmbedder`] |
/// | `"ollama"` | [`OllamaEmbedder`] |
/// | `"openai"` | [`OpenAIEmbedder`] |
/// | `"local"` | `LocalEmbedder` (needs `local-embeddings-fastembed`) |
pub fn create_embedder(config: &EmbeddingConfig) -> Result<Arc<dyn Embedder>> {
    match config.provider.as_str() {
        "disabled" => Ok(Arc::new(DisabledEmbedder)),
        "ollama" => Ok(Arc::new(OllamaEmbedder::new(config)?)),
        "openai" => Ok(Arc::new(OpenAIEmbedder::new(config)?)),
        #[cfg(feature = "local-embeddings-fastembed")]
        "local" => Ok(Arc::new(LocalEmbedder::new(config)?)),
        #[cfg(not(feature = "local-embeddings-fastembed"))]
        "local" => bail!("Local embedding provider requires --features local-embeddings-fastembed"),
        other => bail!("Unknown embedding provider: {}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_ollama_response() {
        let json = json!({ "model": "all-minilm", "embeddings": [[0.5, -1.0, 2.0]] });
        assert_eq!(parse_ollama_response(&json).unwrap(), vec![0.5, -1.0, 2.0]);
        assert!(parse_ollama_response(&json!({ "embeddings": [] })).is_err());
    }

    #[test]
    fn test_parse_openai_response() {
        let json = json!({ "data": [{ "index": 0, "embedding": [0.25, 0.75] }] });
        assert_eq!(parse_openai_response(&json).unwrap(), vec![0.25, 0.75]);
        assert!(parse_openai_response(&json!({ "data": [{}] })).is_err());
    }

    #[test]
    fn test_check_dims_rejects_mismatch() {
        assert!(check_dims(vec![0.0; 3], 3).is_ok());
        let err = check_dims(vec![0.0; 3], 384).unwrap_err();
        assert!(err.to_string().contains("384"));
    }

    #[tokio::test]
    async fn test_disabled_embedder_errors() {
        let embedder = create_embedder(&EmbeddingConfig::default()).unwrap();
        assert_eq!(embedder.model_name(), "disabled");
        assert!(embedder.embed("anything").await.is_err());
    }

    #[test]
    fn test_unknown_provider() {
        let config = EmbeddingConfig {
            provider: "word2vec".into(),
            ..EmbeddingConfig::default()
        };
        assert!(create_embedder(&config).is_err());
    }
}
