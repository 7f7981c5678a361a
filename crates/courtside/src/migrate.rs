use anyhow::Result;
use sqlx::Connection;
use std::path::Path;

use crate::db;

/// Create the read-path schema. Safe to run repeatedly.
///
/// The batch pipeline fills these tables; courtside only reads them.
pub async fn run_migrations(db_path: &Path) -> Result<()> {
    let mut conn = db::connect_rw(db_path).await?;

    // One row per player for the season
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS player_season_features (
            player_name TEXT PRIMARY KEY,
            games_played INTEGER NOT NULL,
            pts_per_game REAL,
            reb_per_game REAL,
            ast_per_game REAL,
            stl_per_game REAL,
            blk_per_game REAL,
            tov_per_game REAL,
            stocks_per_game REAL,
            true_shooting_pct REAL,
            ast_to_tov_ratio REAL,
            fg_pct REAL,
            ft_pct REAL,
            three_pt_pct REAL,
            three_pt_made_per_game REAL,
            three_pt_attempted_per_game REAL
        )
        "#,
    )
    .execute(&mut conn)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS player_summaries (
            player_name TEXT PRIMARY KEY,
            summary TEXT NOT NULL
        )
        "#,
    )
    .execute(&mut conn)
    .await?;

    // Little-endian f32 vectors
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS player_embeddings (
            player_name TEXT PRIMARY KEY,
            embedding BLOB NOT NULL
        )
        "#,
    )
    .execute(&mut conn)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_features_games_played ON player_season_features(games_played)",
    )
    .execute(&mut conn)
    .await?;

    conn.close().await?;
    Ok(())
}
