//! Structured-query specialist.
//!
//! Asks the model for a `query_db` tool call, runs the proposed statement
//! through the [guard](crate::guard), and feeds the textual result back as
//! a tool message. The first result that is not an error or empty marker
//! ends the loop; otherwise the model gets another attempt, up to the
//! configured limit.
//!
//! ```text
//!   Propose ──tool calls──▶ Execute ──success──▶ Done
//!      ▲                       │
//!      └───────failure─────────┘   (until attempts run out)
//! ```

use serde_json::json;
use std::sync::Arc;

use crate::guard;
use crate::llm::{ChatMessage, Generation, Generator, ToolCall, ToolSpec};
use crate::prompts;
use crate::state::ConversationState;
use crate::store::StatsStore;

pub const DEFAULT_SQL_ATTEMPTS: u32 = 3;

/// Name of the single tool offered to the model.
pub const QUERY_TOOL: &str = "query_db";

/// The `query_db` tool definition.
pub fn query_tool() -> ToolSpec {
    ToolSpec {
        name: QUERY_TOOL.to_string(),
        description: "Run a read-only SQL SELECT against the season statistics table and return the rows as text."
            .to_string(),
        parameters: json!({
            "type": "object",
            "properties": {
                "sql_query": {
                    "type": "string",
                    "description": "A single SQLite SELECT statement."
                }
            },
            "required": ["sql_query"]
        }),
    }
}

/// Raw text of the structured-query slot.
#[derive(Debug, Clone, PartialEq)]
pub struct StructuredOutput(String);

impl StructuredOutput {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub(crate) fn into_inner(self) -> String {
        self.0
    }

    #[cfg(test)]
    pub(crate) fn fixture(text: &str) -> Self {
        Self(text.to_string())
    }
}

enum Phase {
    Propose,
    Execute(Vec<ToolCall>),
    Done,
}

pub struct StructuredSpecialist {
    generator: Arc<dyn Generator>,
    store: Arc<dyn StatsStore>,
    max_attempts: u32,
}

impl StructuredSpecialist {
    pub fn new(generator: Arc<dyn Generator>, store: Arc<dyn StatsStore>, max_attempts: u32) -> Self {
        Self {
            generator,
            store,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Run the propose/execute loop for the state's question.
    ///
    /// Returns the first successful result, or the last failure observed.
    /// An empty output means the model never proposed a query.
    pub async fn run(&self, state: &ConversationState) -> StructuredOutput {
        let tool = query_tool();
        let mut transcript = vec![ChatMessage::user(state.question())];
        let mut last_result = String::new();
        let mut attempts = 0;
        let mut phase = Phase::Propose;

        loop {
            phase = match phase {
                Phase::Propose if attempts >= self.max_attempts => Phase::Done,
                Phase::Propose => {
                    attempts += 1;
                    tracing::debug!(attempt = attempts, "proposing query");
                    match self
                        .generator
                        .generate(prompts::SQL_AGENT, &transcript, Some(&tool))
                        .await
                    {
                        Ok(Generation::ToolCalls(calls)) if !calls.is_empty() => {
                            transcript.push(ChatMessage::assistant_calls(calls.clone()));
                            Phase::Execute(calls)
                        }
                        Ok(reply) => {
                            tracing::debug!("model replied without a tool call");
                            transcript.push(ChatMessage::assistant(reply.text()));
                            Phase::Done
                        }
                        Err(e) => {
                            tracing::warn!(error = %e, "query generation failed");
                            last_result = format!("Error: query generation failed: {}", e);
                            Phase::Done
                        }
                    }
                }
                Phase::Execute(calls) => {
                    let mut succeeded = false;
                    for call in calls {
                        let result = self.execute_call(&call).await;
                        transcript.push(ChatMessage::tool_result(call.id.as_str(), result.as_str()));
                        succeeded = !guard::is_failure(&result);
                        last_result = result;
                        if succeeded {
                            break;
                        }
                    }
                    if succeeded {
                        Phase::Done
                    } else {
                        Phase::Propose
                    }
                }
                Phase::Done => return StructuredOutput(last_result),
            };
        }
    }

    async fn execute_call(&self, call: &ToolCall) -> String {
        if call.name != QUERY_TOOL {
            return format!(
                "Error: unknown tool '{}'. Call {} with a SELECT statement.",
                call.name, QUERY_TOOL
            );
        }
        match call.arguments.get("sql_query").and_then(|v| v.as_str()) {
            Some(sql) => guard::run_query(self.store.as_ref(), sql).await,
            None => format!("Error: {} requires a 'sql_query' string argument.", QUERY_TOOL),
        }
    }
}
