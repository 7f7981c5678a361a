//! Player search over the hybrid retrieval engine, without any chat model.
//!
//! Used by `courtside search`. Keyword questions ("best rebounders") are
//! answered from the stats table alone; anything else needs an embedding
//! provider. Without one, semantic matches are skipped with a warning.

use anyhow::{bail, Result};

use courtside_core::models::SemanticMatch;
use courtside_core::retrieval::{format_matches, RetrievalParams, MAX_TOP_K};

use crate::config::Config;
use crate::engine;

/// Run the retrieval engine for `query`.
pub async fn search_players(
    config: &Config,
    query: &str,
    top_k: Option<usize>,
) -> Result<Vec<SemanticMatch>> {
    if query.trim().is_empty() {
        return Ok(Vec::new());
    }
    match top_k {
        Some(0) => bail!("--top-k must be >= 1"),
        Some(k) if k > MAX_TOP_K => bail!("--top-k must be <= {}", MAX_TOP_K),
        _ => {}
    }

    let store = engine::open_store(config)?;
    let retriever = engine::build_retriever(config, store).await?;
    let retriever = match top_k {
        Some(top_k) => retriever.with_params(RetrievalParams {
            top_k,
            ..retriever.params()
        }),
        None => retriever,
    };

    Ok(retriever.retrieve(query).await)
}

/// CLI entry point for `courtside search`.
pub async fn run_search(config: &Config, query: &str, top_k: Option<usize>) -> Result<()> {
    let matches = search_players(config, query, top_k).await?;

    if matches.is_empty() {
        println!("No results.");
        return Ok(());
    }

    println!("{}", format_matches(&matches));
    Ok(())
}
