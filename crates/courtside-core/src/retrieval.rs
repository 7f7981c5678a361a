//! Hybrid retrieval engine.
//!
//! Answers a free-text query with a ranked list of players, combining two
//! signals:
//!
//! 1. **Keyword-triggered stat leaders.** If the query mentions a concept
//!    with an obvious ranking column ("defenders", "rebounding",
//!    "three-point"), the store is asked for the top players by that
//!    column, restricted to players with at least `min_games` games.
//!    These enter the results with similarity `1.0`.
//! 2. **Semantic nearest neighbours.** The query is embedded and compared
//!    (cosine) against every player summary in the index. If the mean
//!    similarity of the top-K is below the threshold, two broadened
//!    rewrites of the query are tried and the best-scoring candidate list
//!    wins.
//!
//! Semantic hits fill whatever slots the stat leaders left open, skipping
//! players already present.
//!
//! The embedding index is loaded once, when the [`Retriever`] is built,
//! and shared read-only afterwards.

use anyhow::Result;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::embedding::{cosine_similarity, Embedder};
use crate::models::{RankingMetric, SemanticMatch, SummaryRecord};
use crate::store::StatsStore;

pub const DEFAULT_TOP_K: usize = 5;
pub const SIMILARITY_THRESHOLD: f64 = 0.15;
pub const MIN_GAMES: i64 = 50;
/// Largest accepted `top_k`.
pub const MAX_TOP_K: usize = 100;

/// Concept keywords and the column each one ranks by. First match wins.
const KEYWORD_METRICS: &[(&[&str], RankingMetric)] = &[
    (&["defend", "defensive", "defense"], RankingMetric::Stocks),
    (&["block"], RankingMetric::Blocks),
    (&["steal"], RankingMetric::Steals),
    (&["rebound"], RankingMetric::Rebounds),
    (
        &["playmak", "assist", "passer", "passing"],
        RankingMetric::Assists,
    ),
    (&["turnover"], RankingMetric::AssistToTurnover),
    (&["three", "3-point", "3pt"], RankingMetric::ThreePointersMade),
    (&["efficien", "shooting"], RankingMetric::TrueShooting),
    (&["scor", "points", "ppg"], RankingMetric::Points),
];

/// Tuning knobs for a [`Retriever`].
#[derive(Debug, Clone, Copy)]
pub struct RetrievalParams {
    pub top_k: usize,
    pub similarity_threshold: f64,
    pub min_games: i64,
}

impl Default for RetrievalParams {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            similarity_threshold: SIMILARITY_THRESHOLD,
            min_games: MIN_GAMES,
        }
    }
}

/// The ranking column implied by `query`, if any.
pub fn resolve_metric(query: &str) -> Option<RankingMetric> {
    let lowered = query.to_lowercase();
    KEYWORD_METRICS
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|k| lowered.contains(k)))
        .map(|(_, metric)| *metric)
}

/// Broadened phrasings tried when the original query scores poorly.
pub fn broadening_rewrites(query: &str) -> [String; 2] {
    [
        format!("{} basketball player season statistics", query),
        format!("player who {}", query),
    ]
}

/// Mean similarity of a candidate list; `0.0` when empty.
pub fn mean_similarity(matches: &[SemanticMatch]) -> f64 {
    if matches.is_empty() {
        return 0.0;
    }
    matches.iter().map(|m| m.similarity).sum::<f64>() / matches.len() as f64
}

/// Render matches as numbered blocks separated by blank lines.
///
/// Stats missing from a match print as `0.0`.
pub fn format_matches(matches: &[SemanticMatch]) -> String {
    matches
        .iter()
        .enumerate()
        .map(|(i, m)| {
            let (pts, reb, ast, stl, blk) = m
                .stats
                .as_ref()
                .map(|s| {
                    (
                        s.pts_per_game,
                        s.reb_per_game,
                        s.ast_per_game,
                        s.stl_per_game,
                        s.blk_per_game,
                    )
                })
                .unwrap_or_default();
            format!(
                "{}. {} (similarity: {:.3})\n   Summary: {}\n   Stats: {:.1} PPG, {:.1} RPG, {:.1} APG, {:.1} STL, {:.1} BLK",
                i + 1,
                m.player_name,
                m.similarity,
                m.summary,
                pts,
                reb,
                ast,
                stl,
                blk
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Hybrid retrieval service.
///
/// Cheap to clone; the index, store, and embedder are shared.
#[derive(Clone)]
pub struct Retriever {
    store: Arc<dyn StatsStore>,
    embedder: Arc<dyn Embedder>,
    index: Arc<Vec<SummaryRecord>>,
    summaries: Arc<HashMap<String, usize>>,
    params: RetrievalParams,
}

impl Retriever {
    /// Build a retriever, loading the embedding index from `store`.
    pub async fn load(
        store: Arc<dyn StatsStore>,
        embedder: Arc<dyn Embedder>,
        params: RetrievalParams,
    ) -> Result<Self> {
        let index = store.load_index().await?;
        tracing::debug!(entries = index.len(), "loaded embedding index");

        let summaries = index
            .iter()
            .enumerate()
            .map(|(i, r)| (r.player_name.clone(), i))
            .collect();

        Ok(Self {
            store,
            embedder,
            index: Arc::new(index),
            summaries: Arc::new(summaries),
            params,
        })
    }

    pub fn params(&self) -> RetrievalParams {
        self.params
    }

    /// Number of summaries in the loaded index.
    pub fn index_len(&self) -> usize {
        self.index.len()
    }

    /// Same index and collaborators, different tuning.
    pub fn with_params(&self, params: RetrievalParams) -> Self {
        Self {
            params,
            ..self.clone()
        }
    }

    /// Retrieve and format the top-K players for `query`.
    ///
    /// Returns an empty string when nothing matched.
    pub async fn search(&self, query: &str) -> String {
        format_matches(&self.retrieve(query).await)
    }

    /// Retrieve the top-K players for `query`, stat leaders first.
    ///
    /// Never fails: a store or embedding failure drops only the signal it
    /// affected, and whatever was already ranked is returned.
    pub async fn retrieve(&self, query: &str) -> Vec<SemanticMatch> {
        let k = self.params.top_k;
        let mut results = Vec::new();

        if let Some(metric) = resolve_metric(query) {
            match self
                .store
                .top_by_metric(metric, self.params.min_games, k)
                .await
            {
                Ok(leaders) => {
                    tracing::debug!(%metric, leaders = leaders.len(), "keyword matched");
                    for stats in leaders {
                        results.push(SemanticMatch {
                            summary: self.summary_of(&stats.player_name),
                            player_name: stats.player_name.clone(),
                            similarity: 1.0,
                            stats: Some(stats),
                        });
                    }
                }
                Err(e) => tracing::warn!(%metric, error = %e, "stat leader lookup failed"),
            }
        }

        if results.len() < k {
            match self.broadened_neighbours(query).await {
                Ok(neighbours) => {
                    let seen: HashSet<String> =
                        results.iter().map(|m| m.player_name.clone()).collect();
                    let open = k - results.len();
                    results.extend(
                        neighbours
                            .into_iter()
                            .filter(|m| !seen.contains(&m.player_name))
                            .take(open),
                    );
                }
                Err(e) => tracing::warn!(
                    error = %e,
                    kept = results.len(),
                    "semantic search failed, returning stat leaders only"
                ),
            }
        }

        self.attach_stats(&mut results).await;
        results
    }

    /// Semantic top-K for `query`, broadened when the mean similarity is
    /// below the threshold.
    pub async fn broadened_neighbours(&self, query: &str) -> Result<Vec<SemanticMatch>> {
        if self.index.is_empty() {
            return Ok(Vec::new());
        }

        let mut best = self.nearest(query).await?;
        let mut best_mean = mean_similarity(&best);
        if best_mean >= self.params.similarity_threshold {
            return Ok(best);
        }

        tracing::debug!(mean = best_mean, "low similarity, broadening query");
        for rewrite in broadening_rewrites(query) {
            let candidate = self.nearest(&rewrite).await?;
            let mean = mean_similarity(&candidate);
            tracing::debug!(%rewrite, mean, "broadened candidate");
            if mean > best_mean {
                best = candidate;
                best_mean = mean;
            }
        }
        Ok(best)
    }

    /// Plain semantic top-K, without broadening.
    pub async fn nearest(&self, text: &str) -> Result<Vec<SemanticMatch>> {
        let query_vec = self.embedder.embed(text).await?;

        let mut scored: Vec<(f64, &SummaryRecord)> = self
            .index
            .iter()
            .map(|r| (cosine_similarity(&query_vec, &r.embedding) as f64, r))
            .collect();
        scored.sort_by(|a, b| {
            b.0.partial_cmp(&a.0)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.1.player_name.cmp(&b.1.player_name))
        });
        scored.truncate(self.params.top_k);

        Ok(scored
            .into_iter()
            .map(|(similarity, r)| SemanticMatch {
                player_name: r.player_name.clone(),
                similarity,
                summary: r.summary.clone(),
                stats: None,
            })
            .collect())
    }

    fn summary_of(&self, player_name: &str) -> String {
        self.summaries
            .get(player_name)
            .and_then(|&i| self.index.get(i))
            .map(|r| r.summary.clone())
            .unwrap_or_default()
    }

    async fn attach_stats(&self, matches: &mut [SemanticMatch]) {
        let missing: Vec<String> = matches
            .iter()
            .filter(|m| m.stats.is_none())
            .map(|m| m.player_name.clone())
            .collect();
        if missing.is_empty() {
            return;
        }

        match self.store.stats_for(&missing).await {
            Ok(rows) => {
                let by_name: HashMap<_, _> =
                    rows.into_iter().map(|s| (s.player_name.clone(), s)).collect();
                for m in matches.iter_mut().filter(|m| m.stats.is_none()) {
                    m.stats = by_name.get(&m.player_name).cloned();
                }
            }
            Err(e) => tracing::warn!(error = %e, "stats lookup failed, printing zeros"),
        }
    }
}
