//! # repo-chat core
//!
//! Shared logic for repo-chat: data models, the embedding and answer
//! generator traits, the vector [`store::Store`] abstraction with an
//! in-memory backend, prompt assembly, and per-session conversation state.
//!
//! This crate contains no tokio, sqlx, filesystem I/O, or network code.
//! Concrete providers, the SQLite store and the indexing pipeline live in
//! the `repo-chat` crate.

pub mod conversation;
pub mod embedding;
pub mod error;
pub mod generator;
pub mod models;
pub mod prompt;
pub mod store;

pub use error::{Error, ProviderError, Result, StorageError};
