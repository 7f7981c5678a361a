//! SQLite-backed [`StatsStore`] implementation.
//!
//! Every call opens its own read-only connection and closes it before
//! returning. The store is never written through this type; schema setup
//! lives in [`crate::migrate`].

use anyhow::Result;
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnection, SqliteRow};
use sqlx::{Column, Connection, Row, TypeInfo, ValueRef};
use std::path::PathBuf;

use courtside_core::embedding::blob_to_vec;
use courtside_core::models::{Cell, PlayerStats, QueryRows, RankingMetric, SummaryRecord};
use courtside_core::store::StatsStore;

use crate::db;

const STATS_COLUMNS: &str = "player_name, games_played, pts_per_game, reb_per_game, ast_per_game, \
     stl_per_game, blk_per_game, true_shooting_pct, stocks_per_game, ast_to_tov_ratio, \
     three_pt_made_per_game";

/// SQLite implementation of the [`StatsStore`] trait.
pub struct SqliteStore {
    path: PathBuf,
}

impl SqliteStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    async fn open(&self) -> Result<SqliteConnection> {
        db::connect_ro(&self.path).await
    }
}

fn stats_from_row(row: &SqliteRow) -> Result<PlayerStats> {
    let float = |name: &str| -> Result<f64> {
        Ok(row.try_get::<Option<f64>, _>(name)?.unwrap_or(0.0))
    };
    Ok(PlayerStats {
        player_name: row.try_get("player_name")?,
        games_played: row.try_get::<Option<i64>, _>("games_played")?.unwrap_or(0),
        pts_per_game: float("pts_per_game")?,
        reb_per_game: float("reb_per_game")?,
        ast_per_game: float("ast_per_game")?,
        stl_per_game: float("stl_per_game")?,
        blk_per_game: float("blk_per_game")?,
        true_shooting_pct: float("true_shooting_pct")?,
        stocks_per_game: float("stocks_per_game")?,
        ast_to_tov_ratio: float("ast_to_tov_ratio")?,
        three_pt_made_per_game: float("three_pt_made_per_game")?,
    })
}

/// Decode one value by its runtime storage class.
fn cell_at(row: &SqliteRow, index: usize) -> Result<Cell> {
    let raw = row.try_get_raw(index)?;
    if raw.is_null() {
        return Ok(Cell::Null);
    }
    let type_name = raw.type_info().name().to_string();
    let cell = match type_name.as_str() {
        "INTEGER" | "BOOLEAN" => Cell::Int(row.try_get(index)?),
        "REAL" => Cell::Float(row.try_get(index)?),
        "BLOB" => Cell::Blob(row.try_get(index)?),
        _ => Cell::Text(row.try_get(index)?),
    };
    Ok(cell)
}

#[async_trait]
impl StatsStore for SqliteStore {
    async fn execute(&self, sql: &str) -> Result<QueryRows> {
        let mut conn = self.open().await?;
        let rows = sqlx::query(sql).fetch_all(&mut conn).await;
        conn.close().await?;
        let rows = rows?;

        let columns = rows
            .first()
            .map(|r| r.columns().iter().map(|c| c.name().to_string()).collect())
            .unwrap_or_default();

        let mut out = Vec::with_capacity(rows.len());
        for row in &rows {
            let cells = (0..row.len())
                .map(|i| cell_at(row, i))
                .collect::<Result<Vec<_>>>()?;
            out.push(cells);
        }

        Ok(QueryRows { columns, rows: out })
    }

    async fn top_by_metric(
        &self,
        metric: RankingMetric,
        min_games: i64,
        limit: usize,
    ) -> Result<Vec<PlayerStats>> {
        // `metric.column()` comes from a closed enum, never from user text.
        let sql = format!(
            "SELECT {} FROM player_season_features \
             WHERE games_played >= ? AND {col} IS NOT NULL \
             ORDER BY {col} DESC, player_name ASC LIMIT ?",
            STATS_COLUMNS,
            col = metric.column()
        );

        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        let mut conn = self.open().await?;
        let rows = sqlx::query(&sql)
            .bind(min_games)
            .bind(limit)
            .fetch_all(&mut conn)
            .await;
        conn.close().await?;

        rows?.iter().map(stats_from_row).collect()
    }

    async fn stats_for(&self, names: &[String]) -> Result<Vec<PlayerStats>> {
        if names.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; names.len()].join(", ");
        let sql = format!(
            "SELECT {} FROM player_season_features WHERE player_name IN ({})",
            STATS_COLUMNS, placeholders
        );

        let mut query = sqlx::query(&sql);
        for name in names {
            query = query.bind(name.as_str());
        }

        let mut conn = self.open().await?;
        let rows = query.fetch_all(&mut conn).await;
        conn.close().await?;

        rows?.iter().map(stats_from_row).collect()
    }

    async fn load_index(&self) -> Result<Vec<SummaryRecord>> {
        let mut conn = self.open().await?;
        let rows = sqlx::query(
            r#"
            SELECT s.player_name, s.summary, e.embedding
            FROM player_summaries s
            JOIN player_embeddings e ON e.player_name = s.player_name
            ORDER BY s.player_name
            "#,
        )
        .fetch_all(&mut conn)
        .await;
        conn.close().await?;

        rows?
            .iter()
            .map(|row| -> Result<SummaryRecord> {
                let blob: Vec<u8> = row.try_get("embedding")?;
                Ok(SummaryRecord {
                    player_name: row.try_get("player_name")?,
                    summary: row.try_get("summary")?,
                    embedding: blob_to_vec(&blob),
                })
            })
            .collect()
    }
}
