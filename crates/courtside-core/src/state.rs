//! Per-question conversation state.
//!
//! A [`ConversationState`] is created for each question, mutated only by
//! appending, and dropped once the answer is returned. Each field has
//! exactly one writer:
//!
//! | Field | Writer |
//! |-------|--------|
//! | `route` | Supervisor |
//! | `sql_result` | Structured-query specialist, via [`StructuredOutput`] |
//! | `rag_result` | Semantic specialist, via [`SemanticOutput`] |
//! | `iteration` | Synthesizer |
//!
//! Specialists only see `&ConversationState`. Their outputs are folded in
//! by [`ConversationState::join`] after both have finished, so the two
//! slots can never be written concurrently.

use serde::Serialize;
use std::fmt;

use crate::llm::{ChatMessage, Role};
use crate::specialists::{SemanticOutput, StructuredOutput};

/// Which specialists a question needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Route {
    Sql,
    Semantic,
    Both,
}

impl Route {
    pub fn as_str(self) -> &'static str {
        match self {
            Route::Sql => "sql",
            Route::Semantic => "semantic",
            Route::Both => "both",
        }
    }

    /// Map a route label to a [`Route`].
    ///
    /// Unrecognized labels route to [`Route::Semantic`].
    pub fn from_label(label: &str) -> Route {
        match label.trim().to_lowercase().as_str() {
            "sql" => Route::Sql,
            "semantic" => Route::Semantic,
            "both" => Route::Both,
            other => {
                tracing::warn!(label = other, "unrecognized route label, using semantic");
                Route::Semantic
            }
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct ConversationState {
    question: String,
    messages: Vec<ChatMessage>,
    route: Route,
    sql_result: String,
    rag_result: String,
    iteration: u32,
}

impl ConversationState {
    /// Fresh state: the question is the first message, `route` starts at
    /// `Both`, both slots empty, iteration zero.
    pub fn new(question: impl Into<String>) -> Self {
        let question = question.into();
        Self {
            messages: vec![ChatMessage::user(question.clone())],
            question,
            route: Route::Both,
            sql_result: String::new(),
            rag_result: String::new(),
            iteration: 0,
        }
    }

    pub fn question(&self) -> &str {
        &self.question
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn route(&self) -> Route {
        self.route
    }

    pub fn sql_result(&self) -> &str {
        &self.sql_result
    }

    pub fn rag_result(&self) -> &str {
        &self.rag_result
    }

    pub fn iteration(&self) -> u32 {
        self.iteration
    }

    /// Content of the most recent assistant message, or `""`.
    pub fn answer(&self) -> &str {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == Role::Assistant)
            .map(|m| m.content.as_str())
            .unwrap_or("")
    }

    pub(crate) fn set_route(&mut self, route: Route) {
        self.route = route;
    }

    /// Fold specialist outputs into their slots.
    ///
    /// A slot whose specialist did not run this iteration keeps its value.
    pub(crate) fn join(&mut self, sql: Option<StructuredOutput>, rag: Option<SemanticOutput>) {
        if let Some(sql) = sql {
            self.sql_result = sql.into_inner();
        }
        if let Some(rag) = rag {
            self.rag_result = rag.into_inner();
        }
    }

    /// Append the synthesizer's reply and advance the iteration counter.
    pub(crate) fn record_answer(&mut self, content: String) {
        self.messages.push(ChatMessage::assistant(content));
        self.iteration += 1;
    }
}
