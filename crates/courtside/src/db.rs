use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqliteJournalMode};
use sqlx::ConnectOptions;
use std::path::Path;
use std::str::FromStr;

/// Open a read-write connection, creating the file and its parent
/// directory if needed. Used for schema setup only.
///
/// Uses a rollback journal: read-only connections cannot create the
/// shared-memory file a WAL database needs.
pub async fn connect_rw(db_path: &Path) -> Result<SqliteConnection> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", db_path.display()))?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Delete);

    options
        .connect()
        .await
        .with_context(|| format!("Failed to open database: {}", db_path.display()))
}

/// Open a read-only connection to an existing database.
pub async fn connect_ro(db_path: &Path) -> Result<SqliteConnection> {
    let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", db_path.display()))?
        .read_only(true);

    options
        .connect()
        .await
        .with_context(|| format!("Failed to open database: {}", db_path.display()))
}
