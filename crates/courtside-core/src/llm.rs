//! Generative model collaborator.
//!
//! The [`Generator`] trait is the single seam through which the supervisor,
//! the structured-query specialist, and the synthesizer talk to a chat
//! model. Providers (Ollama, OpenAI) live in the `courtside` app crate.
//!
//! [`ScriptedGenerator`] replays queued responses and records every request;
//! it is what the orchestrator tests run against.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// A function call proposed by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Provider-assigned call id, echoed back on the tool result message.
    pub id: String,
    pub name: String,
    /// Arguments as a JSON object.
    pub arguments: Value,
}

/// One entry of a conversation transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self::plain(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::plain(Role::Assistant, content)
    }

    /// An assistant turn that consisted of tool calls only.
    pub fn assistant_calls(calls: Vec<ToolCall>) -> Self {
        Self {
            role: Role::Assistant,
            content: String::new(),
            tool_calls: calls,
            tool_call_id: None,
        }
    }

    /// The observed result of a tool call.
    pub fn tool_result(call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: Some(call_id.into()),
        }
    }

    fn plain(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }
}

/// A function the model may call, in OpenAI function-calling shape.
#[derive(Debug, Clone, Serialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    /// JSON Schema object with `type`, `properties`, and `required`.
    pub parameters: Value,
}

/// What a generation call produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Generation {
    Text(String),
    ToolCalls(Vec<ToolCall>),
}

impl Generation {
    /// The text of a plain reply; empty for tool-call replies.
    pub fn text(&self) -> &str {
        match self {
            Generation::Text(t) => t,
            Generation::ToolCalls(_) => "",
        }
    }
}

/// A chat model.
///
/// When `tool` is `Some`, the provider must ask the model for tool-call-only
/// output (the structured-query specialist relies on this). Calls block
/// until the model replies; timeouts are the provider's concern.
#[async_trait]
pub trait Generator: Send + Sync {
    fn model_name(&self) -> &str;

    async fn generate(
        &self,
        system: &str,
        messages: &[ChatMessage],
        tool: Option<&ToolSpec>,
    ) -> Result<Generation>;
}

/// A request captured by [`ScriptedGenerator`].
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub system: String,
    pub messages: Vec<ChatMessage>,
    pub tool: Option<String>,
}

/// Generator that replays a queue of canned responses.
///
/// Each call pops the next response; an exhausted queue is an error.
/// Failures can be scripted with [`ScriptedGenerator::then_fail`].
#[derive(Default)]
pub struct ScriptedGenerator {
    responses: Mutex<VecDeque<std::result::Result<Generation, String>>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl ScriptedGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn then_text(self, text: &str) -> Self {
        self.push(Ok(Generation::Text(text.to_string())))
    }

    /// Queue a single `query_db` call proposing `sql`.
    pub fn then_query(self, sql: &str) -> Self {
        let n = self.lock_responses().len();
        self.push(Ok(Generation::ToolCalls(vec![ToolCall {
            id: format!("call_{}", n),
            name: "query_db".to_string(),
            arguments: serde_json::json!({ "sql_query": sql }),
        }])))
    }

    pub fn then_fail(self, message: &str) -> Self {
        self.push(Err(message.to_string()))
    }

    /// All requests seen so far, in call order.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    /// Number of scripted responses not yet consumed.
    pub fn remaining(&self) -> usize {
        self.lock_responses().len()
    }

    fn push(self, response: std::result::Result<Generation, String>) -> Self {
        self.lock_responses().push_back(response);
        self
    }

    fn lock_responses(
        &self,
    ) -> std::sync::MutexGuard<'_, VecDeque<std::result::Result<Generation, String>>> {
        self.responses
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl Generator for ScriptedGenerator {
    fn model_name(&self) -> &str {
        "scripted"
    }

    async fn generate(
        &self,
        system: &str,
        messages: &[ChatMessage],
        tool: Option<&ToolSpec>,
    ) -> Result<Generation> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(RecordedRequest {
                system: system.to_string(),
                messages: messages.to_vec(),
                tool: tool.map(|t| t.name.clone()),
            });
        }

        match self.lock_responses().pop_front() {
            Some(Ok(generation)) => Ok(generation),
            Some(Err(message)) => Err(anyhow!(message)),
            None => Err(anyhow!("scripted generator has no responses left")),
        }
    }
}
