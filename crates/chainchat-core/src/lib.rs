//! # ChainChat Core
//!
//! Shared logic for ChainChat: data models, the read-only chunk store,
//! relevance ranking, prompt assembly, and vector similarity helpers.
//!
//! This crate contains no tokio, HTTP, or configuration dependencies.
//! Everything here is a pure function of its inputs; the calling
//! application is responsible for embedding queries, invoking the model,
//! and wiring configuration.

pub mod models;
pub mod prompt;
pub mod rank;
pub mod similarity;
pub mod store;
