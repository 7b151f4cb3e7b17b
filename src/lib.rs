//! # newsrag
//!
//! A retrieval-augmented question answering pipeline over a financial news
//! corpus.
//!
//! At session start the corpus is chunked, embedded, and written to a fresh
//! vector index. Each user message is embedded, matched against the index,
//! gated on similarity, and answered by a language model from the retrieved
//! chunks only.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐   ┌──────────────┐   ┌──────────────┐
//! │  Corpus    │──▶│ Chunk+Embed  │──▶│ Vector store │
//! │  (JSON)    │   │              │   │ SQLite / mem │
//! └────────────┘   └──────────────┘   └──────┬───────┘
//!                                            │
//!   question ─▶ embed ─▶ search ─▶ gate ─────┤
//!                                            ▼
//!                                     ┌──────────────┐
//!                                     │  LLM answer  │
//!                                     └──────────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration and validation |
//! | [`error`] | Stage-level error type |
//! | [`logging`] | Tracing subscriber setup |
//! | [`models`] | Core data types |
//! | [`corpus`] | News corpus loading |
//! | [`chunk`] | Overlapping text chunking |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`llm`] | Language model provider abstraction |
//! | [`store`] | Vector store trait and backends |
//! | [`index`] | Index building |
//! | [`retrieve`] | Top-k retrieval |
//! | [`gate`] | Relevance gate |
//! | [`compose`] | Prompt assembly and generation |
//! | [`session`] | Session entry points |

pub mod chunk;
pub mod compose;
pub mod config;
pub mod corpus;
pub mod embedding;
pub mod error;
pub mod gate;
pub mod index;
pub mod llm;
pub mod logging;
pub mod models;
pub mod retrieve;
pub mod session;
pub mod store;
