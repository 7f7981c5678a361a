//! Core data models shared by the store, retrieval engine, and agents.
//!
//! These types carry no I/O. Collaborators (SQLite, HTTP model servers)
//! translate to and from them at the crate boundary.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Per-game statistics for one player, as stored in `player_season_features`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerStats {
    pub player_name: String,
    pub games_played: i64,
    pub pts_per_game: f64,
    pub reb_per_game: f64,
    pub ast_per_game: f64,
    pub stl_per_game: f64,
    pub blk_per_game: f64,
    pub true_shooting_pct: f64,
    pub stocks_per_game: f64,
    pub ast_to_tov_ratio: f64,
    pub three_pt_made_per_game: f64,
}

/// One row of the embedding index: a player's summary and its vector.
#[derive(Debug, Clone)]
pub struct SummaryRecord {
    pub player_name: String,
    pub summary: String,
    pub embedding: Vec<f32>,
}

/// A ranked retrieval hit.
///
/// Keyword-matched stat leaders carry a similarity of exactly `1.0`;
/// semantic neighbours carry their cosine similarity.
#[derive(Debug, Clone, Serialize)]
pub struct SemanticMatch {
    pub player_name: String,
    pub similarity: f64,
    pub summary: String,
    /// Stats snapshot, when the store had a row for this player.
    pub stats: Option<PlayerStats>,
}

/// Columns a question can be ranked by.
///
/// This is the only path by which a column name reaches an `ORDER BY`
/// clause built by the store, so it stays a closed set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RankingMetric {
    Points,
    Rebounds,
    Assists,
    Steals,
    Blocks,
    Stocks,
    TrueShooting,
    ThreePointersMade,
    AssistToTurnover,
}

impl RankingMetric {
    /// Column name in `player_season_features`.
    pub fn column(self) -> &'static str {
        match self {
            RankingMetric::Points => "pts_per_game",
            RankingMetric::Rebounds => "reb_per_game",
            RankingMetric::Assists => "ast_per_game",
            RankingMetric::Steals => "stl_per_game",
            RankingMetric::Blocks => "blk_per_game",
            RankingMetric::Stocks => "stocks_per_game",
            RankingMetric::TrueShooting => "true_shooting_pct",
            RankingMetric::ThreePointersMade => "three_pt_made_per_game",
            RankingMetric::AssistToTurnover => "ast_to_tov_ratio",
        }
    }
}

impl fmt::Display for RankingMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

/// A single cell of an ad hoc query result.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Null,
    Int(i64),
    Float(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Null => f.write_str("NULL"),
            Cell::Int(v) => write!(f, "{}", v),
            Cell::Float(v) => write!(f, "{:.3}", v),
            Cell::Text(s) => f.write_str(s),
            Cell::Blob(b) => write!(f, "<{} bytes>", b.len()),
        }
    }
}

/// Result set of an arbitrary `SELECT` statement.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueryRows {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl QueryRows {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Render as a left-aligned text table, one header line plus one line per row.
    pub fn to_table(&self) -> String {
        let rendered: Vec<Vec<String>> = self
            .rows
            .iter()
            .map(|row| row.iter().map(|c| c.to_string()).collect())
            .collect();

        let mut widths: Vec<usize> = self.columns.iter().map(|c| c.chars().count()).collect();
        for row in &rendered {
            for (i, cell) in row.iter().enumerate() {
                let w = cell.chars().count();
                match widths.get_mut(i) {
                    Some(slot) => *slot = (*slot).max(w),
                    None => widths.push(w),
                }
            }
        }

        let format_line = |cells: &[String]| -> String {
            cells
                .iter()
                .enumerate()
                .map(|(i, c)| format!("{:<width$}", c, width = widths[i]))
                .collect::<Vec<_>>()
                .join("  ")
                .trim_end()
                .to_string()
        };

        let mut lines = Vec::with_capacity(rendered.len() + 1);
        lines.push(format_line(&self.columns));
        for row in &rendered {
            lines.push(format_line(row));
        }
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_aligns_columns() {
        let rows = QueryRows {
            columns: vec!["player_name".into(), "pts_per_game".into()],
            rows: vec![
                vec![Cell::Text("Russell Westbrook".into()), Cell::Float(31.58)],
                vec![Cell::Text("Ish Smith".into()), Cell::Null],
            ],
        };
        let table = rows.to_table();
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "player_name        pts_per_game");
        assert_eq!(lines[1], "Russell Westbrook  31.580");
        assert_eq!(lines[2], "Ish Smith          NULL");
    }

    #[test]
    fn test_metric_columns_are_distinct() {
        let all = [
            RankingMetric::Points,
            RankingMetric::Rebounds,
            RankingMetric::Assists,
            RankingMetric::Steals,
            RankingMetric::Blocks,
            RankingMetric::Stocks,
            RankingMetric::TrueShooting,
            RankingMetric::ThreePointersMade,
            RankingMetric::AssistToTurnover,
        ];
        let mut cols: Vec<&str> = all.iter().map(|m| m.column()).collect();
        cols.sort();
        cols.dedup();
        assert_eq!(cols.len(), all.len());
    }
}
