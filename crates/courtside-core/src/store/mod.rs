//! Storage abstraction for the tabular statistics store.
//!
//! The [`StatsStore`] trait defines every read the core needs: ad hoc
//! `SELECT` execution for the structured-query specialist, stat-leader
//! lookups and stats snapshots for the retrieval engine, and the one-time
//! load of the embedding index.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{PlayerStats, QueryRows, RankingMetric, SummaryRecord};

/// Read-only access to the season statistics.
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`execute`](StatsStore::execute) | Run an already-validated `SELECT` |
/// | [`top_by_metric`](StatsStore::top_by_metric) | Stat leaders for one metric |
/// | [`stats_for`](StatsStore::stats_for) | Stats snapshot for named players |
/// | [`load_index`](StatsStore::load_index) | Summaries joined with their vectors |
#[async_trait]
pub trait StatsStore: Send + Sync {
    /// Execute a statement and return its rows.
    ///
    /// Callers pass statements through [`crate::guard`] first; the store
    /// itself performs no validation.
    async fn execute(&self, sql: &str) -> Result<QueryRows>;

    /// Players with at least `min_games` games, ordered by `metric` descending.
    async fn top_by_metric(
        &self,
        metric: RankingMetric,
        min_games: i64,
        limit: usize,
    ) -> Result<Vec<PlayerStats>>;

    /// Stats rows for the given players. Unknown names are skipped.
    async fn stats_for(&self, names: &[String]) -> Result<Vec<PlayerStats>>;

    /// Every player summary that has an embedding.
    async fn load_index(&self) -> Result<Vec<SummaryRecord>>;
}
