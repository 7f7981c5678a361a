//! Answer-quality evaluation.
//!
//! Runs a fixed set of leaderboard questions through the full agent
//! pipeline and checks that the players any fan would expect show up in
//! each answer. Needs a loaded database and a reachable chat model, so it
//! is a command rather than a test.
//!
//! # Usage
//!
//! ```bash
//! courtside eval
//! courtside eval --model llama3.3
//! ```
//!
//! A case passes when at least half of its expected names appear in the
//! answer (case-insensitive). The command exits with status 1 if any case
//! fails.

use anyhow::Result;
use std::time::{Duration, Instant};

use courtside_core::orchestrator::Orchestrator;

use crate::ask::{ask_question, preview};
use crate::config::Config;
use crate::engine;

/// Minimum fraction of expected names an answer must contain.
pub const PASS_THRESHOLD: f64 = 0.5;

const RULE_WIDTH: usize = 60;

/// A question and the names its answer must mention.
#[derive(Debug, Clone, Copy)]
pub struct EvalCase {
    pub question: &'static str,
    pub expected: &'static [&'static str],
}

/// The built-in evaluation set, one case per leaderboard.
pub const EVAL_CASES: &[EvalCase] = &[
    EvalCase {
        question: "Who were the best defenders in 2016?",
        expected: &["Anthony Davis", "Rudy Gobert", "Draymond Green"],
    },
    EvalCase {
        question: "Who were the top scorers?",
        expected: &["Westbrook", "Isaiah Thomas", "Harden"],
    },
    EvalCase {
        question: "Who were the best rebounders?",
        expected: &["Andre Drummond", "DeAndre Jordan", "Hassan Whiteside"],
    },
    EvalCase {
        question: "Who were the best playmakers?",
        expected: &["Ricky Rubio", "Chris Paul", "Jeff Teague"],
    },
    EvalCase {
        question: "Which players had the most blocks per game?",
        expected: &["Anthony Davis", "Gobert", "Whiteside"],
    },
];

/// Outcome of one case.
#[derive(Debug, Clone)]
pub struct CaseResult {
    pub question: String,
    pub answer: String,
    pub found: Vec<String>,
    pub missing: Vec<String>,
    pub elapsed: Duration,
}

impl CaseResult {
    pub fn hit_rate(&self) -> f64 {
        let total = self.found.len() + self.missing.len();
        if total == 0 {
            return 1.0;
        }
        self.found.len() as f64 / total as f64
    }

    pub fn passed(&self) -> bool {
        self.hit_rate() >= PASS_THRESHOLD
    }
}

/// Results of a whole evaluation run.
#[derive(Debug, Clone, Default)]
pub struct EvalReport {
    pub cases: Vec<CaseResult>,
}

impl EvalReport {
    pub fn passed(&self) -> usize {
        self.cases.iter().filter(|c| c.passed()).count()
    }

    pub fn all_passed(&self) -> bool {
        self.passed() == self.cases.len()
    }

    /// Summary block printed after the per-case output.
    pub fn summary(&self) -> String {
        let rule = "=".repeat(RULE_WIDTH);
        let total = self.cases.len();
        let pct = if total == 0 {
            0.0
        } else {
            100.0 * self.passed() as f64 / total as f64
        };

        let mut lines = vec![
            rule.clone(),
            format!(
                "EVALUATION SUMMARY: {}/{} passed ({:.0}%)",
                self.passed(),
                total,
                pct
            ),
            rule,
        ];
        for case in &self.cases {
            let status = if case.passed() { "PASS" } else { "FAIL" };
            lines.push(format!("  [{}] {}", status, case.question));
            if !case.missing.is_empty() {
                lines.push(format!("        missing: {}", case.missing.join(", ")));
            }
        }
        lines.join("\n")
    }
}

/// Split `expected` into names present in `answer` and names absent from it.
fn match_names(answer: &str, expected: &[&str]) -> (Vec<String>, Vec<String>) {
    let haystack = answer.to_lowercase();
    expected
        .iter()
        .map(|name| name.to_string())
        .partition(|name| haystack.contains(&name.to_lowercase()))
}

/// Run one case through the orchestrator.
pub async fn run_case(orchestrator: &Orchestrator, model: &str, case: &EvalCase) -> CaseResult {
    let start = Instant::now();
    let response = ask_question(orchestrator, model, case.question, None).await;
    let elapsed = start.elapsed();

    let (found, missing) = match_names(&response.outcome.answer, case.expected);
    tracing::info!(
        question = case.question,
        found = found.len(),
        missing = missing.len(),
        "eval case finished"
    );

    CaseResult {
        question: case.question.to_string(),
        answer: response.outcome.answer,
        found,
        missing,
        elapsed,
    }
}

fn render_case(case: &EvalCase, result: &CaseResult) -> String {
    let status = if result.passed() { "PASS" } else { "FAIL" };
    [
        "-".repeat(RULE_WIDTH),
        format!("Q: {}", case.question),
        format!("   Expected: {}", case.expected.join(", ")),
        format!("   Answer: {}", preview(&result.answer)),
        format!("   Found: {}", result.found.join(", ")),
        format!("   Missing: {}", result.missing.join(", ")),
        format!(
            "   Result: {} ({:.0}% hit rate, {:.1}s)",
            status,
            result.hit_rate() * 100.0,
            result.elapsed.as_secs_f64()
        ),
    ]
    .join("\n")
}

/// Run every case in order, printing each result as it completes.
pub async fn evaluate(orchestrator: &Orchestrator, model: &str, cases: &[EvalCase]) -> EvalReport {
    let mut report = EvalReport::default();
    for case in cases {
        let result = run_case(orchestrator, model, case).await;
        println!("{}\n", render_case(case, &result));
        report.cases.push(result);
    }
    report
}

/// CLI entry point for `courtside eval`.
///
/// Exits with status 1 when any case fails.
pub async fn run_eval(config: &Config) -> Result<()> {
    let orchestrator = engine::build_orchestrator(config).await?;
    let report = evaluate(&orchestrator, &config.llm.model, EVAL_CASES).await;

    println!("{}", report.summary());

    if !report.all_passed() {
        std::process::exit(1);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use courtside_core::embedding::StaticEmbedder;
    use courtside_core::llm::ScriptedGenerator;
    use courtside_core::models::{Cell, QueryRows};
    use courtside_core::orchestrator::OrchestratorParams;
    use courtside_core::retrieval::{RetrievalParams, Retriever};
    use courtside_core::store::memory::InMemoryStore;
    use courtside_core::store::StatsStore;
    use std::sync::Arc;

    const CASES: &[EvalCase] = &[
        EvalCase {
            question: "Who were the best rebounders?",
            expected: &["Andre Drummond", "DeAndre Jordan", "Hassan Whiteside"],
        },
        EvalCase {
            question: "Who were the best playmakers?",
            expected: &["Ricky Rubio", "Chris Paul", "Jeff Teague"],
        },
    ];

    fn names(rows: &[&str]) -> QueryRows {
        QueryRows {
            columns: vec!["player_name".into()],
            rows: rows.iter().map(|n| vec![Cell::Text(n.to_string())]).collect(),
        }
    }

    async fn orchestrator(generator: ScriptedGenerator, store: InMemoryStore) -> Orchestrator {
        let store: Arc<dyn StatsStore> = Arc::new(store);
        let retriever = Retriever::load(
            store.clone(),
            Arc::new(StaticEmbedder::new()),
            RetrievalParams::default(),
        )
        .await
        .unwrap();
        Orchestrator::new(
            Arc::new(generator),
            store,
            retriever,
            OrchestratorParams::default(),
        )
    }

    #[test]
    fn test_match_names_is_case_insensitive() {
        let (found, missing) = match_names(
            "DEANDRE JORDAN and andre drummond led the league.",
            &["Andre Drummond", "DeAndre Jordan", "Hassan Whiteside"],
        );
        assert_eq!(found, vec!["Andre Drummond", "DeAndre Jordan"]);
        assert_eq!(missing, vec!["Hassan Whiteside"]);
    }

    #[test]
    fn test_half_of_names_is_a_pass() {
        let result = |found: usize, missing: usize| CaseResult {
            question: "q".into(),
            answer: String::new(),
            found: vec!["x".into(); found],
            missing: vec!["y".into(); missing],
            elapsed: Duration::ZERO,
        };
        assert!(result(2, 1).passed());
        assert!(result(1, 1).passed());
        assert!(!result(1, 2).passed());
        assert!(!result(0, 3).passed());
    }

    #[test]
    fn test_builtin_cases_cover_each_leaderboard() {
        assert_eq!(EVAL_CASES.len(), 5);
        assert!(EVAL_CASES.iter().all(|c| c.expected.len() == 3));
        assert!(EVAL_CASES[0].question.contains("defenders"));
        assert!(EVAL_CASES[4].question.contains("blocks"));
    }

    #[tokio::test]
    async fn test_evaluate_scores_scripted_answers() {
        let generator = ScriptedGenerator::new()
            .then_text("sql")
            .then_query("SELECT player_name FROM player_season_features ORDER BY reb_per_game DESC")
            .then_text("Andre Drummond and DeAndre Jordan were the top rebounders.")
            .then_text("sql")
            .then_query("SELECT player_name FROM player_season_features ORDER BY ast_per_game DESC")
            .then_text("John Wall led the league in assists.");
        let store = InMemoryStore::new()
            .then_rows(names(&["Andre Drummond", "DeAndre Jordan"]))
            .then_rows(names(&["John Wall"]));
        let orchestrator = orchestrator(generator, store).await;

        let report = evaluate(&orchestrator, "scripted", CASES).await;

        assert_eq!(report.cases.len(), 2);
        assert!(report.cases[0].passed());
        assert!((report.cases[0].hit_rate() - 2.0 / 3.0).abs() < 1e-9);
        assert!(!report.cases[1].passed());
        assert_eq!(report.cases[1].missing.len(), 3);
        assert_eq!(report.passed(), 1);
        assert!(!report.all_passed());

        let summary = report.summary();
        assert!(summary.contains("EVALUATION SUMMARY: 1/2 passed (50%)"));
        assert!(summary.contains("[PASS] Who were the best rebounders?"));
        assert!(summary.contains("[FAIL] Who were the best playmakers?"));
        assert!(summary.contains("missing: Ricky Rubio, Chris Paul, Jeff Teague"));
    }

    #[tokio::test]
    async fn test_all_passing_report() {
        let generator = ScriptedGenerator::new()
            .then_text("sql")
            .then_query("SELECT player_name FROM player_season_features ORDER BY reb_per_game DESC")
            .then_text("Drummond? Andre Drummond, DeAndre Jordan and Hassan Whiteside.");
        let store = InMemoryStore::new().then_rows(names(&["Andre Drummond"]));
        let orchestrator = orchestrator(generator, store).await;

        let report = evaluate(&orchestrator, "scripted", &CASES[..1]).await;
        assert!(report.all_passed());
        assert_eq!(report.cases[0].hit_rate(), 1.0);
        assert!(report.summary().contains("1/1 passed (100%)"));
    }
}
