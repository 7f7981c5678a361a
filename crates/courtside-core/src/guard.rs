//! Query validator and executor.
//!
//! Every structured query passes through [`run_query`] before it reaches a
//! [`StatsStore`], whether a model proposed it or a user typed it. The guard
//! never returns an error: validation failures, backend failures, and empty
//! result sets all come back as text carrying one of the fixed status
//! markers below, which the specialists and the confidence gate match on.
//!
//! # Rules
//!
//! 1. Reject any statement containing a mutation keyword as a whole word.
//! 2. Reject anything that does not begin with `SELECT`.
//! 3. Append `LIMIT 50` unless the statement already ends in a `LIMIT n`
//!    clause. Trailing `--` comments are dropped first.
//! 4. Execute; backend errors become `SQL error: <message>`.
//! 5. Zero rows become `Query returned no results.`

use regex::Regex;
use std::sync::LazyLock;

use crate::store::StatsStore;

/// Prefix of every backend execution failure.
pub const SQL_ERROR_PREFIX: &str = "SQL error:";

/// Prefix of every validation or tool-usage failure.
pub const ERROR_PREFIX: &str = "Error:";

/// Returned when a statement ran fine and matched nothing.
pub const NO_RESULTS: &str = "Query returned no results.";

/// Row cap appended to statements that do not limit themselves.
pub const MAX_ROWS: usize = 50;

/// Returned for statements that are not `SELECT`s.
pub const NOT_SELECT: &str = "Error: only SELECT queries are allowed.";

static FORBIDDEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(insert|update|delete|drop|alter|create|truncate|replace|merge)\b")
        .unwrap_or_else(|e| panic!("invalid forbidden-keyword pattern: {e}"))
});

static LIMIT_CLAUSE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\blimit\s+\d+(\s*(,|\boffset\b)\s*\d+)?$")
        .unwrap_or_else(|e| panic!("invalid limit pattern: {e}"))
});

// A `--` comment running to end of line with no quote after it.
static LINE_COMMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)--[^'\n]*$").unwrap_or_else(|e| panic!("invalid comment pattern: {e}"))
});

/// True if `result` is an error or empty-result marker rather than data.
pub fn is_failure(result: &str) -> bool {
    result.starts_with(SQL_ERROR_PREFIX)
        || result.starts_with(ERROR_PREFIX)
        || result.starts_with(NO_RESULTS)
}

/// Validate a statement and apply the row cap.
///
/// Returns the statement to execute, or the exact error text to surface.
pub fn prepare(sql: &str) -> Result<String, String> {
    let trimmed = sql.trim();

    if let Some(found) = FORBIDDEN.find(trimmed) {
        return Err(format!(
            "Error: query contains forbidden keyword '{}'. Only read-only SELECT queries are allowed.",
            found.as_str().to_uppercase()
        ));
    }

    if !trimmed.to_uppercase().starts_with("SELECT") {
        return Err(NOT_SELECT.to_string());
    }

    let uncommented = LINE_COMMENT.replace_all(trimmed, "");
    let body = uncommented.trim_end_matches(|c: char| c == ';' || c.is_whitespace());

    if LIMIT_CLAUSE.is_match(body) {
        return Ok(body.to_string());
    }

    Ok(format!("{} LIMIT {}", body, MAX_ROWS))
}

/// Validate and execute `sql`, rendering the outcome as text.
pub async fn run_query(store: &dyn StatsStore, sql: &str) -> String {
    let statement = match prepare(sql) {
        Ok(statement) => statement,
        Err(rejection) => {
            tracing::debug!(%rejection, "query rejected before execution");
            return rejection;
        }
    };

    tracing::debug!(%statement, "executing query");
    match store.execute(&statement).await {
        Ok(rows) if rows.is_empty() => NO_RESULTS.to_string(),
        Ok(rows) => rows.to_table(),
        Err(e) => format!("{} {}", SQL_ERROR_PREFIX, e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Cell, QueryRows};
    use crate::store::memory::InMemoryStore;

    fn one_row() -> QueryRows {
        QueryRows {
            columns: vec!["player_name".into()],
            rows: vec![vec![Cell::Text("Test Player".into())]],
        }
    }

    #[test]
    fn test_rejects_each_mutation_keyword() {
        for sql in [
            "INSERT INTO player_season_features VALUES ('x')",
            "UPDATE player_season_features SET pts_per_game = 0",
            "DELETE FROM player_season_features",
            "DROP TABLE player_season_features",
            "ALTER TABLE player_season_features ADD COLUMN x INT",
            "CREATE TABLE hacked (id INT)",
            "TRUNCATE TABLE player_season_features",
            "REPLACE INTO player_season_features VALUES ('x')",
            "MERGE INTO player_season_features USING other ON 1 = 1",
        ] {
            let err = prepare(sql).unwrap_err();
            assert!(err.starts_with(ERROR_PREFIX), "not rejected: {}", sql);
            assert!(err.contains("forbidden keyword"), "wrong error for {}: {}", sql, err);
        }
    }

    #[test]
    fn test_keyword_match_is_case_insensitive_and_whole_word() {
        assert!(prepare("select * from t; drop table t").is_err());
        assert!(prepare("SELECT created_at, updated FROM t").is_ok());
    }

    #[test]
    fn test_rejects_mutation_after_statement_separator() {
        let err = prepare("SELECT * FROM player_season_features; DROP TABLE x").unwrap_err();
        assert!(err.contains("'DROP'"));
    }

    #[test]
    fn test_rejects_plain_text() {
        assert_eq!(prepare("hello world").unwrap_err(), NOT_SELECT);
    }

    #[test]
    fn test_appends_limit_when_missing() {
        let sql = prepare("SELECT player_name FROM player_season_features;").unwrap();
        assert_eq!(sql, "SELECT player_name FROM player_season_features LIMIT 50");
    }

    #[test]
    fn test_preserves_existing_limit() {
        let sql = prepare("select player_name from player_season_features limit 5").unwrap();
        assert_eq!(sql.to_uppercase().matches("LIMIT").count(), 1);
        assert!(sql.ends_with("limit 5"));

        let sql = prepare("SELECT player_name FROM player_season_features LIMIT 10 OFFSET 20;").unwrap();
        assert!(sql.ends_with("LIMIT 10 OFFSET 20"));
    }

    #[test]
    fn test_limit_word_inside_string_is_not_a_clause() {
        let sql = prepare("SELECT * FROM player_season_features WHERE player_name = 'No Limit'").unwrap();
        assert_eq!(
            sql,
            "SELECT * FROM player_season_features WHERE player_name = 'No Limit' LIMIT 50"
        );
    }

    #[test]
    fn test_trailing_comment_cannot_swallow_row_cap() {
        let sql = prepare("SELECT player_name FROM player_season_features -- limit").unwrap();
        assert_eq!(sql, "SELECT player_name FROM player_season_features LIMIT 50");

        let sql = prepare(
            "SELECT player_name\nFROM player_season_features -- top rows\nWHERE games_played > 50",
        )
        .unwrap();
        assert_eq!(
            sql,
            "SELECT player_name\nFROM player_season_features \nWHERE games_played > 50 LIMIT 50"
        );
    }

    #[test]
    fn test_limit_in_subquery_still_caps_outer_select() {
        let sql = prepare(
            "SELECT * FROM (SELECT player_name FROM player_season_features LIMIT 500) t",
        )
        .unwrap();
        assert!(sql.ends_with(") t LIMIT 50"));
    }

    #[test]
    fn test_is_failure_markers() {
        assert!(is_failure("SQL error: no such column: fake_col"));
        assert!(is_failure("Error: only SELECT queries are allowed."));
        assert!(is_failure(NO_RESULTS));
        assert!(!is_failure("player_name\nLeBron James"));
        assert!(!is_failure(""));
    }

    #[tokio::test]
    async fn test_drop_never_reaches_store() {
        let store = InMemoryStore::new();
        let result = run_query(&store, "DROP TABLE features").await;
        assert!(result.starts_with("Error: query contains forbidden keyword 'DROP'"));
        assert!(store.executed().is_empty());
    }

    #[tokio::test]
    async fn test_executes_with_row_cap() {
        let store = InMemoryStore::new().then_rows(one_row());
        let result = run_query(&store, "SELECT player_name FROM player_season_features").await;
        assert!(result.contains("Test Player"));
        assert_eq!(
            store.executed(),
            vec!["SELECT player_name FROM player_season_features LIMIT 50"]
        );
    }

    #[tokio::test]
    async fn test_backend_error_becomes_text() {
        let store = InMemoryStore::new().then_error("no such column: fake_col");
        let result = run_query(&store, "SELECT fake_col FROM player_season_features").await;
        assert!(result.starts_with("SQL error:"));
        assert!(result.contains("fake_col"));
    }

    #[tokio::test]
    async fn test_empty_result_message() {
        let store = InMemoryStore::new().then_rows(QueryRows::default());
        let result = run_query(
            &store,
            "SELECT * FROM player_season_features WHERE player_name = 'Nobody'",
        )
        .await;
        assert_eq!(result, NO_RESULTS);
    }
}
