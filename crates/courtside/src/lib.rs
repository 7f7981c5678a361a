//! # Courtside
//!
//! **Multi-agent question answering over NBA season statistics.**
//!
//! This crate provides the concrete collaborators and outer surfaces for
//! the orchestration engine in [`courtside_core`]: a SQLite stats store,
//! HTTP embedding and chat providers, configuration, the `courtside` CLI,
//! and an HTTP server.
//!
//! ## Architecture
//!
//! ```text
//!                ┌────────────┐
//!   question ──▶ │ Supervisor │ ── route ──┐
//!                └────────────┘            ▼
//!            ┌──────────────────┐   ┌──────────────────┐
//!            │ SQL specialist   │   │ Semantic         │
//!            │ (guarded SELECT) │   │ specialist       │
//!            └────────┬─────────┘   └────────┬─────────┘
//!                     └──────────┬───────────┘
//!                                ▼
//!                         ┌─────────────┐
//!                         │ Synthesizer │ ──▶ gate ──▶ answer
//!                         └─────────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing and validation |
//! | [`db`] | SQLite connections (read-write for init, read-only for queries) |
//! | [`migrate`] | Read-path schema creation (idempotent) |
//! | [`sqlite_store`] | [`courtside_core::store::StatsStore`] over SQLite |
//! | [`embedding`] | Embedding providers (disabled, Ollama, OpenAI, local) |
//! | [`llm`] | Chat providers (Ollama, OpenAI) |
//! | [`engine`] | Builds the orchestrator from configuration |
//! | [`ask`] | Question answering with run ids and trace rendering |
//! | [`search`] | Player retrieval without a chat model |
//! | [`query`] | Ad hoc guarded SQL |
//! | [`server`] | HTTP server (Axum) with CORS |
//! | [`eval`] | Answer-quality evaluation over fixed questions |
//!
//! ## Configuration
//!
//! Courtside is configured via a TOML file (default:
//! `config/courtside.toml`). See [`config::load_config`] for validation
//! rules.

pub mod ask;
pub mod config;
pub mod db;
pub mod embedding;
pub mod engine;
pub mod eval;
mod http;
pub mod llm;
pub mod migrate;
pub mod query;
pub mod search;
pub mod server;
pub mod sqlite_store;
