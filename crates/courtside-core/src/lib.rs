//! # Courtside Core
//!
//! Runtime-agnostic logic for Courtside: the orchestration loop, the hybrid
//! retrieval engine, the read-only query guard, and the collaborator traits
//! they are written against.
//!
//! This crate contains no tokio, sqlx, HTTP, or filesystem I/O. The
//! `courtside` app crate supplies the concrete collaborators:
//!
//! | Trait | Test double here | Production impl |
//! |-------|------------------|-----------------|
//! | [`store::StatsStore`] | [`store::memory::InMemoryStore`] | SQLite (sqlx) |
//! | [`embedding::Embedder`] | [`embedding::StaticEmbedder`] | Ollama, OpenAI, fastembed |
//! | [`llm::Generator`] | [`llm::ScriptedGenerator`] | Ollama, OpenAI |
//!
//! The entry point is [`orchestrator::Orchestrator::ask`].

pub mod embedding;
pub mod guard;
pub mod llm;
pub mod models;
pub mod orchestrator;
pub mod prompts;
pub mod retrieval;
pub mod specialists;
pub mod state;
pub mod store;
