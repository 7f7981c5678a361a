//! In-memory [`StatsStore`] implementation for tests.
//!
//! Players and summaries live in plain `Vec`s. It cannot interpret SQL:
//! [`execute`](StatsStore::execute) replays scripted responses in order and
//! records every statement it was handed, so tests can assert on exactly
//! what reached the store.

use std::collections::VecDeque;
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use crate::models::{PlayerStats, QueryRows, RankingMetric, SummaryRecord};

use super::StatsStore;

/// In-memory store for tests.
#[derive(Default)]
pub struct InMemoryStore {
    players: Vec<PlayerStats>,
    summaries: Vec<SummaryRecord>,
    responses: Mutex<VecDeque<std::result::Result<QueryRows, String>>>,
    executed: Mutex<Vec<String>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_player(mut self, stats: PlayerStats) -> Self {
        self.players.push(stats);
        self
    }

    pub fn with_summary(mut self, player_name: &str, summary: &str, embedding: Vec<f32>) -> Self {
        self.summaries.push(SummaryRecord {
            player_name: player_name.to_string(),
            summary: summary.to_string(),
            embedding,
        });
        self
    }

    /// Queue the rows returned by the next [`execute`](StatsStore::execute).
    pub fn then_rows(self, rows: QueryRows) -> Self {
        self.push(Ok(rows))
    }

    /// Queue a backend failure for the next [`execute`](StatsStore::execute).
    pub fn then_error(self, message: &str) -> Self {
        self.push(Err(message.to_string()))
    }

    /// Statements passed to [`execute`](StatsStore::execute), in order.
    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().map(|e| e.clone()).unwrap_or_default()
    }

    fn push(self, response: std::result::Result<QueryRows, String>) -> Self {
        if let Ok(mut queue) = self.responses.lock() {
            queue.push_back(response);
        }
        self
    }
}

#[async_trait]
impl StatsStore for InMemoryStore {
    async fn execute(&self, sql: &str) -> Result<QueryRows> {
        if let Ok(mut executed) = self.executed.lock() {
            executed.push(sql.to_string());
        }
        let next = self
            .responses
            .lock()
            .map_err(|_| anyhow!("response queue poisoned"))?
            .pop_front();
        match next {
            Some(Ok(rows)) => Ok(rows),
            Some(Err(message)) => Err(anyhow!(message)),
            None => Err(anyhow!("in-memory store cannot execute SQL")),
        }
    }

    async fn top_by_metric(
        &self,
        metric: RankingMetric,
        min_games: i64,
        limit: usize,
    ) -> Result<Vec<PlayerStats>> {
        let mut eligible: Vec<PlayerStats> = self
            .players
            .iter()
            .filter(|p| p.games_played >= min_games)
            .cloned()
            .collect();
        eligible.sort_by(|a, b| {
            metric_value(b, metric)
                .partial_cmp(&metric_value(a, metric))
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.player_name.cmp(&b.player_name))
        });
        eligible.truncate(limit);
        Ok(eligible)
    }

    async fn stats_for(&self, names: &[String]) -> Result<Vec<PlayerStats>> {
        Ok(self
            .players
            .iter()
            .filter(|p| names.contains(&p.player_name))
            .cloned()
            .collect())
    }

    async fn load_index(&self) -> Result<Vec<SummaryRecord>> {
        Ok(self.summaries.clone())
    }
}

/// Value of `metric` for a stats row.
fn metric_value(stats: &PlayerStats, metric: RankingMetric) -> f64 {
    match metric {
        RankingMetric::Points => stats.pts_per_game,
        RankingMetric::Rebounds => stats.reb_per_game,
        RankingMetric::Assists => stats.ast_per_game,
        RankingMetric::Steals => stats.stl_per_game,
        RankingMetric::Blocks => stats.blk_per_game,
        RankingMetric::Stocks => stats.stocks_per_game,
        RankingMetric::TrueShooting => stats.true_shooting_pct,
        RankingMetric::ThreePointersMade => stats.three_pt_made_per_game,
        RankingMetric::AssistToTurnover => stats.ast_to_tov_ratio,
    }
}
