//! Chat model providers.
//!
//! [`Generator`] implementations selected by `llm.provider`:
//! - **[`OllamaGenerator`]**: `POST /api/chat` with `stream: false`.
//! - **[`OpenAIGenerator`]**: `POST /v1/chat/completions`; when a tool is
//!   offered the request sets `tool_choice = "required"`.
//!
//! Ollama has no tool-choice switch, so tool-only output there relies on
//! the system prompt.

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

use courtside_core::llm::{ChatMessage, Generation, Generator, Role, ToolCall, ToolSpec};

use crate::config::{LlmConfig, DEFAULT_OLLAMA_URL};
use crate::http;

const OPENAI_URL: &str = "https://api.openai.com";

fn role_name(role: Role) -> &'static str {
    match role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::Tool => "tool",
    }
}

fn tool_json(tool: &ToolSpec) -> Value {
    json!({
        "type": "function",
        "function": {
            "name": tool.name,
            "description": tool.description,
            "parameters": tool.parameters,
        }
    })
}

// ============ Ollama ============

pub struct OllamaGenerator {
    model: String,
    url: String,
    max_retries: u32,
    client: reqwest::Client,
}

impl OllamaGenerator {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        Ok(Self {
            model: config.model.clone(),
            url: config
                .url
                .clone()
                .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string()),
            max_retries: config.max_retries,
            client: http::client(config.timeout_secs)?,
        })
    }
}

fn ollama_request(
    model: &str,
    system: &str,
    messages: &[ChatMessage],
    tool: Option<&ToolSpec>,
) -> Value {
    let mut wire = vec![json!({ "role": "system", "content": system })];
    for m in messages {
        let mut entry = json!({ "role": role_name(m.role), "content": m.content });
        if !m.tool_calls.is_empty() {
            entry["tool_calls"] = m
                .tool_calls
                .iter()
                .map(|c| json!({ "function": { "name": c.name, "arguments": c.arguments } }))
                .collect();
        }
        wire.push(entry);
    }

    let mut body = json!({
        "model": model,
        "messages": wire,
        "stream": false,
    });
    if let Some(tool) = tool {
        body["tools"] = json!([tool_json(tool)]);
    }
    body
}

fn parse_ollama_reply(json: &Value) -> Result<Generation> {
    let message = json
        .get("message")
        .ok_or_else(|| anyhow!("Invalid Ollama response: missing message"))?;

    if let Some(calls) = message.get("tool_calls").and_then(|c| c.as_array()) {
        let calls: Vec<ToolCall> = calls
            .iter()
            .enumerate()
            .filter_map(|(i, c)| {
                let function = c.get("function")?;
                Some(ToolCall {
                    id: format!("call_{}", i),
                    name: function.get("name")?.as_str()?.to_string(),
                    arguments: decode_arguments(function.get("arguments")),
                })
            })
            .collect();
        if !calls.is_empty() {
            return Ok(Generation::ToolCalls(calls));
        }
    }

    let content = message
        .get("content")
        .and_then(|c| c.as_str())
        .unwrap_or_default();
    Ok(Generation::Text(content.to_string()))
}

#[async_trait]
impl Generator for OllamaGenerator {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(
        &self,
        system: &str,
        messages: &[ChatMessage],
        tool: Option<&ToolSpec>,
    ) -> Result<Generation> {
        let body = ollama_request(&self.model, system, messages, tool);
        let json = http::post_json(
            &self.client,
            &format!("{}/api/chat", self.url.trim_end_matches('/')),
            None,
            &body,
            self.max_retries,
            "Ollama",
        )
        .await?;
        parse_ollama_reply(&json)
    }
}

// ============ OpenAI ============

pub struct OpenAIGenerator {
    model: String,
    url: String,
    api_key: String,
    max_retries: u32,
    client: reqwest::Client,
}

impl OpenAIGenerator {
    /// # Errors
    ///
    /// Fails if `OPENAI_API_KEY` is not set.
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| anyhow!("OPENAI_API_KEY environment variable not set"))?;

        Ok(Self {
            model: config.model.clone(),
            url: config.url.clone().unwrap_or_else(|| OPENAI_URL.to_string()),
            api_key,
            max_retries: config.max_retries,
            client: http::client(config.timeout_secs)?,
        })
    }
}

fn openai_request(
    model: &str,
    system: &str,
    messages: &[ChatMessage],
    tool: Option<&ToolSpec>,
) -> Value {
    let mut wire = vec![json!({ "role": "system", "content": system })];
    for m in messages {
        let mut entry = json!({ "role": role_name(m.role), "content": m.content });
        if !m.tool_calls.is_empty() {
            entry["tool_calls"] = m
                .tool_calls
                .iter()
                .map(|c| {
                    json!({
                        "id": c.id,
                        "type": "function",
                        "function": { "name": c.name, "arguments": c.arguments.to_string() }
                    })
                })
                .collect();
        }
        if let Some(id) = &m.tool_call_id {
            entry["tool_call_id"] = json!(id);
        }
        wire.push(entry);
    }

    let mut body = json!({
        "model": model,
        "messages": wire,
    });
    if let Some(tool) = tool {
        body["tools"] = json!([tool_json(tool)]);
        body["tool_choice"] = json!("required");
    }
    body
}

fn parse_openai_reply(json: &Value) -> Result<Generation> {
    let message = json
        .get("choices")
        .and_then(|c| c.as_array())
        .and_then(|c| c.first())
        .and_then(|c| c.get("message"))
        .ok_or_else(|| anyhow!("Invalid OpenAI response: missing choices[0].message"))?;

    if let Some(calls) = message.get("tool_calls").and_then(|c| c.as_array()) {
        let calls: Vec<ToolCall> = calls
            .iter()
            .enumerate()
            .filter_map(|(i, c)| {
                let function = c.get("function")?;
                Some(ToolCall {
                    id: c
                        .get("id")
                        .and_then(|id| id.as_str())
                        .map(str::to_string)
                        .unwrap_or_else(|| format!("call_{}", i)),
                    name: function.get("name")?.as_str()?.to_string(),
                    arguments: decode_arguments(function.get("arguments")),
                })
            })
            .collect();
        if !calls.is_empty() {
            return Ok(Generation::ToolCalls(calls));
        }
    }

    let content = message
        .get("content")
        .and_then(|c| c.as_str())
        .unwrap_or_default();
    Ok(Generation::Text(content.to_string()))
}

#[async_trait]
impl Generator for OpenAIGenerator {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(
        &self,
        system: &str,
        messages: &[ChatMessage],
        tool: Option<&ToolSpec>,
    ) -> Result<Generation> {
        let body = openai_request(&self.model, system, messages, tool);
        let json = http::post_json(
            &self.client,
            &format!("{}/v1/chat/completions", self.url.trim_end_matches('/')),
            Some(&self.api_key),
            &body,
            self.max_retries,
            "OpenAI",
        )
        .await?;
        parse_openai_reply(&json)
    }
}

/// Tool arguments arrive as an object (Ollama) or a JSON string (OpenAI).
fn decode_arguments(raw: Option<&Value>) -> Value {
    match raw {
        Some(Value::String(s)) => serde_json::from_str(s).unwrap_or_else(|_| Value::String(s.clone())),
        Some(v) => v.clone(),
        None => json!({}),
    }
}

/// Create the [`Generator`] named by `config.provider`.
pub fn create_generator(config: &LlmConfig) -> Result<Arc<dyn Generator>> {
    match config.provider.as_str() {
        "ollama" => Ok(Arc::new(OllamaGenerator::new(config)?)),
        "openai" => Ok(Arc::new(OpenAIGenerator::new(config)?)),
        other => bail!("Unknown llm provider: {}", other),
    }
}
