//! # subtext
//!
//! A Reddit user research CLI: fetch comment histories, synthesize LLM
//! personas, and answer free-text questions with retrieval-augmented
//! generation over a local vector store.
//!
//! Everything runs against locally hosted services (Ollama for generation
//! and embeddings, Qdrant for vector storage) plus the Reddit OAuth API.
//!
//! ## Pipeline
//!
//! ```text
//! ┌────────┐   ┌───────────┐   ┌──────────┐   ┌─────────┐
//! │ Reddit │──▶│ Markdown   │──▶│  Ollama  │──▶│ Qdrant  │
//! │  API   │   │ archives   │   │ gen+embed│   │ vectors │
//! └────────┘   └───────────┘   └──────────┘   └────┬────┘
//!                                                  │
//!                              search / ask ◀──────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! subtext fetch users.txt           # comment archives, one .md per user
//! subtext personas                  # LLM persona per archive
//! subtext embed                     # vectors into Qdrant
//! subtext search "home automation"  # semantic search over comments
//! subtext ask "who should beta test a CLI tool?"
//! subtext sentiment <thread-url>    # shortlist engaged users
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`reddit`] | Reddit OAuth API client |
//! | [`markdown`] | Comment archive and persona codecs |
//! | [`llm`] | LLM client trait + Ollama implementation |
//! | [`persona`] | Persona prompt and document assembly |
//! | [`sentiment`] | Batched sentiment protocol |
//! | [`store`] | Qdrant vector store adapter |
//! | [`users`] | Username list parsing |

pub mod ask;
pub mod config;
pub mod embed_cmd;
pub mod fetch;
pub mod llm;
pub mod markdown;
pub mod models;
pub mod persona;
pub mod personas_cmd;
pub mod reddit;
pub mod search;
pub mod sentiment;
pub mod sentiment_cmd;
pub mod store;
pub mod users;
