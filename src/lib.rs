//! # repo-chat
//!
//! Ask natural-language questions about a local source repository.
//!
//! A repository is walked for source and documentation files, each file is
//! embedded and stored in a persistent vector index, and questions are
//! answered by retrieving the closest files and handing them to a language
//! model as context.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────┐   ┌──────────────┐   ┌──────────┐
//! │ Collector │──▶│ Index (embed)│──▶│  SQLite   │
//! │  walkdir  │   │  + upsert    │   │ index.db  │
//! └───────────┘   └──────────────┘   └────┬─────┘
//!                                         │
//!        question ──▶ Retriever ◀─────────┘
//!                        │
//!                        ▼
//!              Prompt ──▶ Generator ──▶ Conversation
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`collector`] | Walk a directory and read indexable files |
//! | [`db`] | SQLite connection |
//! | [`migrate`] | Schema creation |
//! | [`sqlite_store`] | SQLite-backed vector store |
//! | [`index`] | Collection handles and per-collection locking |
//! | [`embedding`] | OpenAI, Ollama and local embedding providers |
//! | [`generate`] | Chat-completion answer generators |
//! | [`http`] | JSON POST helper with error classification |
//! | [`retry`] | Backoff policy for transient provider failures |
//! | [`retrieve`] | Top-k retrieval for a question |
//! | [`engine`] | Shared store, providers and lock table |
//! | [`ingest`] | Index build orchestration |
//! | [`session`] | Per-session state and registry |
//! | [`ask`] | Answer a question within a session |

pub mod ask;
pub mod collector;
pub mod config;
pub mod db;
pub mod embedding;
pub mod engine;
pub mod generate;
pub mod http;
pub mod index;
pub mod ingest;
pub mod migrate;
pub mod retrieve;
pub mod retry;
pub mod session;
pub mod sqlite_store;
