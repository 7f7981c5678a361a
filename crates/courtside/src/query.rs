//! Ad hoc SQL through the read-only guard.
//!
//! `courtside query` runs exactly what the structured-query specialist
//! would run for the same statement, which makes it the quickest way to
//! check a query a model proposed.

use anyhow::Result;

use courtside_core::guard;

use crate::config::Config;
use crate::engine;

/// Validate and execute `sql`, returning the guard's textual result.
pub async fn query_stats(config: &Config, sql: &str) -> Result<String> {
    let store = engine::open_store(config)?;
    Ok(guard::run_query(store.as_ref(), sql).await)
}

/// CLI entry point for `courtside query`.
///
/// Rejections and SQL errors are printed to stderr and exit with status 1.
pub async fn run_query(config: &Config, sql: &str) -> Result<()> {
    let result = query_stats(config, sql).await?;

    if result.starts_with(guard::ERROR_PREFIX) || result.starts_with(guard::SQL_ERROR_PREFIX) {
        eprintln!("{}", result);
        std::process::exit(1);
    }

    println!("{}", result);
    Ok(())
}
