//! Question answering.
//!
//! Shared by `courtside ask` and `POST /ask`. Each run gets a v4 UUID and
//! executes inside a tracing span carrying it, so log lines from concurrent
//! server requests can be told apart.
//!
//! # Usage
//!
//! ```bash
//! courtside ask "Who were the best defenders?"
//! courtside ask -v "Compare Harden and Westbrook"
//! courtside ask --json "Describe Kawhi Leonard"
//! ```

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::Instrument;
use uuid::Uuid;

use courtside_core::orchestrator::{AskOptions, Orchestrator, RunOutcome};

use crate::config::Config;
use crate::engine;

const PREVIEW_CHARS: usize = 300;
const RULE_WIDTH: usize = 60;

/// A finished run, as printed by `--json` and returned by `POST /ask`.
#[derive(Debug, Serialize)]
pub struct AskResponse {
    pub run_id: String,
    pub answered_at: DateTime<Utc>,
    pub model: String,
    #[serde(flatten)]
    pub outcome: RunOutcome,
}

/// Answer one question.
pub async fn ask_question(
    orchestrator: &Orchestrator,
    model: &str,
    question: &str,
    max_iterations: Option<u32>,
) -> AskResponse {
    let run_id = Uuid::new_v4().to_string();
    let span = tracing::info_span!("ask", run_id = %run_id);

    let outcome = orchestrator
        .ask(question, AskOptions { max_iterations })
        .instrument(span)
        .await;

    AskResponse {
        run_id,
        answered_at: Utc::now(),
        model: model.to_string(),
        outcome,
    }
}

/// First `PREVIEW_CHARS` characters of `text`, with `...` if truncated.
pub fn preview(text: &str) -> String {
    if text.chars().count() > PREVIEW_CHARS {
        let head: String = text.chars().take(PREVIEW_CHARS).collect();
        format!("{}...", head)
    } else {
        text.to_string()
    }
}

/// Human-readable agent trace for `--verbose`.
pub fn render_trace(outcome: &RunOutcome) -> String {
    let rule = "=".repeat(RULE_WIDTH);
    let trace = &outcome.trace;

    let mut lines = vec![
        rule.clone(),
        "AGENT TRACE".to_string(),
        rule.clone(),
        format!("Route: {} | Iterations: {}", trace.route, trace.iterations),
    ];
    for step in &trace.steps {
        let mut ran = Vec::new();
        if step.ran_structured {
            ran.push("sql");
        }
        if step.ran_semantic {
            ran.push("semantic");
        }
        lines.push(format!(
            "  pass {}: route={} ran=[{}] gate={:?}",
            step.iteration,
            step.route,
            ran.join(", "),
            step.decision
        ));
    }
    if !trace.sql_result.is_empty() {
        lines.push(String::new());
        lines.push("[SQL Agent]".to_string());
        lines.push(preview(&trace.sql_result));
    }
    if !trace.rag_result.is_empty() {
        lines.push(String::new());
        lines.push("[RAG Agent]".to_string());
        lines.push(preview(&trace.rag_result));
    }
    lines.push(rule);
    lines.join("\n")
}

/// CLI entry point for `courtside ask`.
pub async fn run_ask(
    config: &Config,
    question: &str,
    max_iterations: Option<u32>,
    verbose: bool,
    json: bool,
) -> Result<()> {
    if question.trim().is_empty() {
        bail!("question must not be empty");
    }
    if max_iterations == Some(0) {
        bail!("--max-iterations must be >= 1");
    }

    let orchestrator = engine::build_orchestrator(config).await?;
    let response = ask_question(&orchestrator, &config.llm.model, question, max_iterations).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&response)?);
        return Ok(());
    }

    if verbose {
        println!("{}\n", render_trace(&response.outcome));
    }
    println!("{}", response.outcome.answer);
    Ok(())
}
