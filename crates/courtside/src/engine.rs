//! Assembles the orchestration engine from configuration.
//!
//! The SQLite store, embedding provider, and chat provider are built once
//! per process; the embedding index is loaded when the [`Retriever`] is
//! constructed and shared from then on.

use anyhow::{bail, Result};
use std::sync::Arc;

use courtside_core::llm::Generator;
use courtside_core::orchestrator::Orchestrator;
use courtside_core::retrieval::Retriever;
use courtside_core::store::StatsStore;

use crate::config::Config;
use crate::embedding::create_embedder;
use crate::llm::create_generator;
use crate::sqlite_store::SqliteStore;

/// Open the configured database for reading.
///
/// Fails early with a pointer to `courtside init` if the file is missing.
pub fn open_store(config: &Config) -> Result<Arc<SqliteStore>> {
    if !config.db.path.exists() {
        bail!(
            "Database not found at {}. Run `courtside init` and load the season data first.",
            config.db.path.display()
        );
    }
    Ok(Arc::new(SqliteStore::new(&config.db.path)))
}

/// Build a retriever over the configured store and embedding provider.
pub async fn build_retriever(config: &Config, store: Arc<dyn StatsStore>) -> Result<Retriever> {
    let embedder = create_embedder(&config.embedding)?;
    Retriever::load(store, embedder, config.retrieval.params()).await
}

/// Build the orchestrator with an explicit generator.
pub async fn build_with_generator(
    config: &Config,
    store: Arc<dyn StatsStore>,
    generator: Arc<dyn Generator>,
) -> Result<Orchestrator> {
    let retriever = build_retriever(config, store.clone()).await?;
    tracing::debug!(
        index = retriever.index_len(),
        model = generator.model_name(),
        "engine ready"
    );
    Ok(Orchestrator::new(
        generator,
        store,
        retriever,
        config.orchestrator.params(),
    ))
}

/// Build the orchestrator from configuration alone.
pub async fn build_orchestrator(config: &Config) -> Result<Orchestrator> {
    let store = open_store(config)?;
    let generator = create_generator(&config.llm)?;
    build_with_generator(config, store, generator).await
}
