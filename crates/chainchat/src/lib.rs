//! # ChainChat
//!
//! A retrieval-augmented chat assistant for supply-chain management
//! questions. Answers combine an OpenAI-compatible chat-completion call
//! with lexical or embedding retrieval over pre-processed textbook chunks.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌─────────────┐   ┌───────────┐   ┌──────────┐
//! │ Chunk Store │──▶│  Retriever   │──▶│  Prompt    │──▶│  Model    │
//! │ JSON, once  │   │ lex / embed │   │ Assembler │   │ Invoker  │
//! └─────────────┘   └─────────────┘   └───────────┘   └────┬─────┘
//!                                                          │
//!                                          ┌───────────────┤
//!                                          ▼               ▼
//!                                     ┌──────────┐   ┌──────────┐
//!                                     │   CLI    │   │   HTTP   │
//!                                     │  (ask)   │   │ (axum)   │
//!                                     └──────────┘   └──────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing and validation |
//! | [`retriever`] | Lazy single-flight chunk store + strategy dispatch |
//! | [`embedding`] | Query embedding via the OpenAI API |
//! | [`invoker`] | Chat completions, buffered and streamed |
//! | [`server`] | HTTP chat API |
//! | [`ask`] | One-shot CLI question |
//! | [`chunks_cmd`] | Chunk corpus inspection |

pub mod ask;
pub mod chunks_cmd;
pub mod config;
pub mod embedding;
pub mod invoker;
pub mod retriever;
pub mod server;
