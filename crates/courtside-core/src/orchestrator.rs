//! Multi-agent orchestration.
//!
//! One question runs through a bounded loop:
//!
//! ```text
//!  ┌──────────▶ Supervisor ── route ──▶ dispatch
//!  │                                ├─ sql      ─▶ structured ─────┐
//!  │                                ├─ semantic ─▶ semantic ───────┤
//!  │                                └─ both     ─▶ both, joined ───┤
//!  │                                                               ▼
//!  └── retry ◀── confidence gate ◀────────────────────────── Synthesizer
//!                      │
//!                   finish ──▶ answer
//! ```
//!
//! The first pass asks the model to classify the question; every later
//! pass forces [`Route::Both`]. The gate finishes as soon as either slot
//! holds usable data, or when the iteration cap is reached.
//!
//! [`Orchestrator::ask`] never fails. Collaborator errors are absorbed into
//! the slots or the answer text and logged.

use futures::future::join;
use serde::Serialize;
use std::sync::Arc;

use crate::guard;
use crate::llm::{ChatMessage, Generator};
use crate::prompts;
use crate::retrieval::Retriever;
use crate::specialists::{SemanticSpecialist, StructuredSpecialist, DEFAULT_SQL_ATTEMPTS};
use crate::state::{ConversationState, Route};
use crate::store::StatsStore;

pub const MAX_ITERATIONS: u32 = 5;

/// Answer used when neither specialist produced anything.
pub const NO_DATA_ANSWER: &str = "I could not retrieve relevant data for this question.";

const SQL_BLOCK_HEADER: &str = "=== SQL Query Results ===";
const SEMANTIC_BLOCK_HEADER: &str = "=== Semantic Search Results ===";

/// Map a classification reply to a route.
///
/// The reply is lowercased and trimmed. It routes to `sql` or `semantic`
/// only when it mentions that label and no other; anything else,
/// including an empty reply, routes to `both`.
pub fn parse_route(text: &str) -> Route {
    let text = text.trim().to_lowercase();
    let sql = text.contains("sql");
    let semantic = text.contains("semantic");
    let both = text.contains("both");

    match (sql, semantic, both) {
        (true, false, false) => Route::Sql,
        (false, true, false) => Route::Semantic,
        _ => Route::Both,
    }
}

/// Specialists to run for one iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskSet {
    pub structured: bool,
    pub semantic: bool,
}

pub fn dispatch(route: Route) -> TaskSet {
    match route {
        Route::Both => TaskSet {
            structured: true,
            semantic: true,
        },
        Route::Sql => TaskSet {
            structured: true,
            semantic: false,
        },
        Route::Semantic => TaskSet {
            structured: false,
            semantic: true,
        },
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GateDecision {
    Finish,
    Retry,
}

/// Decide whether the gathered evidence is enough to stop.
pub fn confidence_gate(state: &ConversationState, max_iterations: u32) -> GateDecision {
    let sql = state.sql_result();
    let has_sql = !sql.is_empty() && !guard::is_failure(sql);
    let has_rag = !state.rag_result().trim().is_empty();

    if has_sql || has_rag || state.iteration() >= max_iterations {
        GateDecision::Finish
    } else {
        GateDecision::Retry
    }
}

/// Classifies questions into routes.
pub struct Supervisor {
    generator: Arc<dyn Generator>,
}

impl Supervisor {
    pub fn new(generator: Arc<dyn Generator>) -> Self {
        Self { generator }
    }

    /// Route for the current iteration.
    ///
    /// After the first pass this is always [`Route::Both`] and the model is
    /// not consulted. A failed classification call also yields `Both`.
    pub async fn decide(&self, state: &ConversationState) -> Route {
        if state.iteration() > 0 {
            return Route::Both;
        }

        let messages = [ChatMessage::user(state.question())];
        match self
            .generator
            .generate(prompts::SUPERVISOR, &messages, None)
            .await
        {
            Ok(reply) => parse_route(reply.text()),
            Err(e) => {
                tracing::warn!(error = %e, "route classification failed, using both");
                Route::Both
            }
        }
    }
}

/// Writes the final answer from whatever evidence the slots hold.
pub struct Synthesizer {
    generator: Arc<dyn Generator>,
}

impl Synthesizer {
    pub fn new(generator: Arc<dyn Generator>) -> Self {
        Self { generator }
    }

    /// Evidence blocks for the non-empty slots, SQL first.
    pub fn context(state: &ConversationState) -> Option<String> {
        let mut parts = Vec::with_capacity(2);
        if !state.sql_result().is_empty() {
            parts.push(format!("{}\n{}", SQL_BLOCK_HEADER, state.sql_result()));
        }
        if !state.rag_result().is_empty() {
            parts.push(format!("{}\n{}", SEMANTIC_BLOCK_HEADER, state.rag_result()));
        }
        if parts.is_empty() {
            None
        } else {
            Some(parts.join("\n\n"))
        }
    }

    /// Produce the answer text for this iteration.
    pub async fn synthesize(&self, state: &ConversationState) -> String {
        let Some(context) = Self::context(state) else {
            return NO_DATA_ANSWER.to_string();
        };

        let prompt = format!(
            "Question: {}\n\nAvailable Data:\n{}",
            state.question(),
            context
        );
        match self
            .generator
            .generate(prompts::SYNTHESIZER, &[ChatMessage::user(prompt)], None)
            .await
        {
            Ok(reply) => reply.text().to_string(),
            Err(e) => {
                tracing::warn!(error = %e, "answer synthesis failed");
                format!("I found data for this question but could not write an answer: {}", e)
            }
        }
    }
}

/// Loop limits.
#[derive(Debug, Clone, Copy)]
pub struct OrchestratorParams {
    pub max_iterations: u32,
    pub sql_attempts: u32,
}

impl Default for OrchestratorParams {
    fn default() -> Self {
        Self {
            max_iterations: MAX_ITERATIONS,
            sql_attempts: DEFAULT_SQL_ATTEMPTS,
        }
    }
}

/// Per-call overrides for [`Orchestrator::ask`].
#[derive(Debug, Clone, Copy, Default)]
pub struct AskOptions {
    pub max_iterations: Option<u32>,
}

/// What happened on one pass through the loop.
#[derive(Debug, Clone, Serialize)]
pub struct IterationTrace {
    pub iteration: u32,
    pub route: Route,
    pub ran_structured: bool,
    pub ran_semantic: bool,
    pub decision: GateDecision,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunTrace {
    /// Route of the final pass.
    pub route: Route,
    pub iterations: u32,
    pub sql_result: String,
    pub rag_result: String,
    pub steps: Vec<IterationTrace>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome {
    pub answer: String,
    pub trace: RunTrace,
}

pub struct Orchestrator {
    supervisor: Supervisor,
    structured: StructuredSpecialist,
    semantic: SemanticSpecialist,
    synthesizer: Synthesizer,
    max_iterations: u32,
}

impl Orchestrator {
    pub fn new(
        generator: Arc<dyn Generator>,
        store: Arc<dyn StatsStore>,
        retriever: Retriever,
        params: OrchestratorParams,
    ) -> Self {
        Self {
            supervisor: Supervisor::new(generator.clone()),
            structured: StructuredSpecialist::new(generator.clone(), store, params.sql_attempts),
            semantic: SemanticSpecialist::new(retriever),
            synthesizer: Synthesizer::new(generator),
            max_iterations: params.max_iterations.max(1),
        }
    }

    /// Answer `question`.
    pub async fn ask(&self, question: &str, options: AskOptions) -> RunOutcome {
        let max_iterations = options
            .max_iterations
            .unwrap_or(self.max_iterations)
            .max(1);
        tracing::info!(question, max_iterations, "run started");

        let mut state = ConversationState::new(question);
        let mut steps = Vec::new();

        loop {
            let route = self.supervisor.decide(&state).await;
            state.set_route(route);
            let tasks = dispatch(route);
            tracing::debug!(iteration = state.iteration(), %route, "dispatching");

            let snapshot = &state;
            let structured = async {
                if tasks.structured {
                    Some(self.structured.run(snapshot).await)
                } else {
                    None
                }
            };
            let semantic = async {
                if tasks.semantic {
                    Some(self.semantic.run(snapshot).await)
                } else {
                    None
                }
            };
            let (sql, rag) = join(structured, semantic).await;
            state.join(sql, rag);

            let answer = self.synthesizer.synthesize(&state).await;
            state.record_answer(answer);

            let decision = confidence_gate(&state, max_iterations);
            tracing::debug!(iteration = state.iteration(), ?decision, "confidence gate");
            steps.push(IterationTrace {
                iteration: state.iteration(),
                route,
                ran_structured: tasks.structured,
                ran_semantic: tasks.semantic,
                decision,
            });

            if decision == GateDecision::Finish {
                break;
            }
        }

        tracing::info!(iterations = state.iteration(), route = %state.route(), "run finished");
        RunOutcome {
            answer: state.answer().to_string(),
            trace: RunTrace {
                route: state.route(),
                iterations: state.iteration(),
                sql_result: state.sql_result().to_string(),
                rag_result: state.rag_result().to_string(),
                steps,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::StaticEmbedder;
    use crate::llm::ScriptedGenerator;
    use crate::models::{Cell, QueryRows};
    use crate::retrieval::RetrievalParams;
    use crate::specialists::{SemanticOutput, StructuredOutput};
    use crate::store::memory::InMemoryStore;

    fn state_with(sql: &str, rag: &str, iteration: u32) -> ConversationState {
        let mut state = ConversationState::new("q");
        state.join(
            Some(StructuredOutput::fixture(sql)),
            Some(SemanticOutput::fixture(rag)),
        );
        for _ in 0..iteration {
            state.record_answer(String::new());
        }
        state
    }

    fn leaders() -> QueryRows {
        QueryRows {
            columns: vec!["player_name".into(), "pts_per_game".into()],
            rows: vec![vec![Cell::Text("Russell Westbrook".into()), Cell::Float(31.6)]],
        }
    }

    async fn orchestrator(
        generator: Arc<ScriptedGenerator>,
        store: InMemoryStore,
        embedder: StaticEmbedder,
        max_iterations: u32,
    ) -> Orchestrator {
        let store: Arc<dyn StatsStore> = Arc::new(store);
        let retriever = Retriever::load(store.clone(), Arc::new(embedder), RetrievalParams::default())
            .await
            .unwrap();
        Orchestrator::new(
            generator,
            store,
            retriever,
            OrchestratorParams {
                max_iterations,
                ..OrchestratorParams::default()
            },
        )
    }

    #[test]
    fn test_parse_route_exact_labels() {
        assert_eq!(parse_route("sql"), Route::Sql);
        assert_eq!(parse_route("  SQL\n"), Route::Sql);
        assert_eq!(parse_route("Semantic"), Route::Semantic);
        assert_eq!(parse_route("both"), Route::Both);
    }

    #[test]
    fn test_parse_route_ambiguous_is_both() {
        assert_eq!(parse_route("not sure"), Route::Both);
        assert_eq!(parse_route(""), Route::Both);
        assert_eq!(parse_route("sql or semantic"), Route::Both);
        assert_eq!(parse_route("sql, maybe both"), Route::Both);
    }

    #[test]
    fn test_dispatch_task_sets() {
        let only_structured = TaskSet {
            structured: true,
            semantic: false,
        };
        let only_semantic = TaskSet {
            structured: false,
            semantic: true,
        };
        assert_eq!(dispatch(Route::Sql), only_structured);
        assert_eq!(dispatch(Route::Semantic), only_semantic);
        assert_eq!(
            dispatch(Route::Both),
            TaskSet {
                structured: true,
                semantic: true
            }
        );
        assert_eq!(dispatch(Route::from_label("knowledge_graph")), only_semantic);
    }

    #[test]
    fn test_gate_finishes_on_usable_data() {
        assert_eq!(
            confidence_gate(&state_with("player_name\nA", "", 1), 5),
            GateDecision::Finish
        );
        assert_eq!(
            confidence_gate(&state_with("", "1. A (similarity: 0.900)", 1), 5),
            GateDecision::Finish
        );
    }

    #[test]
    fn test_gate_retries_on_markers_and_blank_text() {
        for sql in [
            "",
            "SQL error: no such table",
            "Error: only SELECT queries are allowed.",
            "Query returned no results.",
        ] {
            assert_eq!(
                confidence_gate(&state_with(sql, " \n ", 1), 5),
                GateDecision::Retry,
                "sql_result = {:?}",
                sql
            );
        }
    }

    #[test]
    fn test_gate_finishes_at_iteration_cap() {
        let state = state_with("", "", MAX_ITERATIONS);
        assert_eq!(confidence_gate(&state, MAX_ITERATIONS), GateDecision::Finish);
    }

    #[tokio::test]
    async fn test_supervisor_forces_both_after_first_pass() {
        let generator = Arc::new(ScriptedGenerator::new());
        let supervisor = Supervisor::new(generator.clone());

        let route = supervisor.decide(&state_with("", "", 1)).await;
        assert_eq!(route, Route::Both);
        assert!(generator.requests().is_empty());
    }

    #[tokio::test]
    async fn test_supervisor_unsure_reply_is_both() {
        let generator = Arc::new(ScriptedGenerator::new().then_text("not sure"));
        let supervisor = Supervisor::new(generator.clone());

        let route = supervisor.decide(&ConversationState::new("q")).await;
        assert_eq!(route, Route::Both);
        assert_eq!(generator.requests()[0].system, prompts::SUPERVISOR);
    }

    #[tokio::test]
    async fn test_supervisor_failure_is_both() {
        let generator = Arc::new(ScriptedGenerator::new().then_fail("timeout"));
        let route = Supervisor::new(generator).decide(&ConversationState::new("q")).await;
        assert_eq!(route, Route::Both);
    }

    #[tokio::test]
    async fn test_synthesizer_apologizes_without_data() {
        let generator = Arc::new(ScriptedGenerator::new());
        let answer = Synthesizer::new(generator.clone())
            .synthesize(&ConversationState::new("q"))
            .await;
        assert_eq!(answer, NO_DATA_ANSWER);
        assert!(generator.requests().is_empty());
    }

    #[tokio::test]
    async fn test_synthesizer_failure_falls_back() {
        let generator = Arc::new(ScriptedGenerator::new().then_fail("model unloaded"));
        let answer = Synthesizer::new(generator)
            .synthesize(&state_with("player_name\nA", "", 0))
            .await;
        assert!(answer.contains("model unloaded"));
    }

    #[tokio::test]
    async fn test_sql_route_runs_structured_only() {
        let generator = Arc::new(
            ScriptedGenerator::new()
                .then_text("sql")
                .then_query("SELECT player_name, pts_per_game FROM player_season_features ORDER BY pts_per_game DESC")
                .then_text("Russell Westbrook led the league at 31.6 points per game."),
        );
        let store = InMemoryStore::new().then_rows(leaders());
        // A strict embedder fails if the semantic specialist ever runs.
        let o = orchestrator(generator.clone(), store, StaticEmbedder::new(), MAX_ITERATIONS).await;

        let outcome = o.ask("Who scored the most points per game?", AskOptions::default()).await;

        assert_eq!(outcome.answer, "Russell Westbrook led the league at 31.6 points per game.");
        assert_eq!(outcome.trace.route, Route::Sql);
        assert_eq!(outcome.trace.iterations, 1);
        assert_eq!(outcome.trace.rag_result, "");
        assert!(!outcome.trace.steps[0].ran_semantic);

        let synth = generator.requests().pop().unwrap();
        assert_eq!(synth.system, prompts::SYNTHESIZER);
        let expected = format!(
            "Question: Who scored the most points per game?\n\nAvailable Data:\n=== SQL Query Results ===\n{}",
            leaders().to_table()
        );
        assert_eq!(synth.messages[0].content, expected);
    }

    #[tokio::test]
    async fn test_both_route_joins_slots() {
        let generator = Arc::new(
            ScriptedGenerator::new()
                .then_text("both")
                .then_query("SELECT player_name, pts_per_game FROM player_season_features")
                .then_text("Westbrook, a relentless attacker, averaged 31.6."),
        );
        let store = InMemoryStore::new()
            .then_rows(leaders())
            .with_summary("Russell Westbrook", "Relentless downhill attacker.", vec![1.0, 0.0]);
        let embedder = StaticEmbedder::new().with_fallback(vec![1.0, 0.0]);
        let o = orchestrator(generator.clone(), store, embedder, MAX_ITERATIONS).await;

        let outcome = o
            .ask("Describe Westbrook's season", AskOptions::default())
            .await;

        assert_eq!(outcome.trace.iterations, 1);
        assert!(outcome.trace.sql_result.contains("Russell Westbrook"));
        assert!(outcome.trace.rag_result.starts_with("1. Russell Westbrook"));
        let synth = generator.requests().pop().unwrap();
        let context = &synth.messages[0].content;
        let sql_at = context.find("=== SQL Query Results ===").unwrap();
        let rag_at = context.find("=== Semantic Search Results ===").unwrap();
        assert!(sql_at < rag_at);
    }

    #[tokio::test]
    async fn test_retry_loop_stops_at_cap() {
        let generator = Arc::new(
            ScriptedGenerator::new()
                .then_text("semantic")
                .then_fail("model offline")
                .then_text("Sorry, the data was unavailable."),
        );
        // Empty index: the semantic pass finds nothing.
        let o = orchestrator(generator.clone(), InMemoryStore::new(), StaticEmbedder::new(), 5).await;

        let outcome = o
            .ask(
                "Describe a versatile forward",
                AskOptions {
                    max_iterations: Some(2),
                },
            )
            .await;

        assert_eq!(outcome.trace.iterations, 2);
        let routes: Vec<Route> = outcome.trace.steps.iter().map(|s| s.route).collect();
        assert_eq!(routes, vec![Route::Semantic, Route::Both]);
        let decisions: Vec<GateDecision> = outcome.trace.steps.iter().map(|s| s.decision).collect();
        assert_eq!(decisions, vec![GateDecision::Retry, GateDecision::Finish]);
        assert!(outcome.trace.sql_result.starts_with("Error: query generation failed"));
        assert_eq!(outcome.answer, "Sorry, the data was unavailable.");
        assert_eq!(generator.remaining(), 0);
    }

    #[tokio::test]
    async fn test_no_data_single_pass_apologizes() {
        let generator = Arc::new(ScriptedGenerator::new().then_text("semantic"));
        let o = orchestrator(generator, InMemoryStore::new(), StaticEmbedder::new(), 1).await;

        let outcome = o.ask("Describe a versatile forward", AskOptions::default()).await;
        assert_eq!(outcome.answer, NO_DATA_ANSWER);
        assert_eq!(outcome.trace.iterations, 1);
    }
}
