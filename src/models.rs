//! Core data types used throughout subtext.
//!
//! These types represent the comments, personas, and search results that flow
//! through the fetch → persona → embed → retrieval pipeline.

use serde::{Deserialize, Serialize};

/// Whether a comment replies directly to a post or to another comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParentType {
    Post,
    Comment,
}

/// A single Reddit comment as fetched from the API.
///
/// Immutable once fetched. Grouping by subreddit happens only at
/// serialization time in the markdown codec; it is not a separate entity.
#[derive(Debug, Clone, PartialEq)]
pub struct Comment {
    pub body: String,
    pub score: i64,
    pub subreddit: String,
    /// Unix timestamp. Lossy after a markdown round trip: the codec stores
    /// only the date, so re-parsed comments carry local midnight.
    pub created_utc: i64,
    pub permalink: String,
    /// Known only for freshly fetched comments. The markdown codec does not
    /// serialize it, so comments re-read from disk carry `None`.
    pub parent_type: Option<ParentType>,
}

/// A persona document plus the structured fields projected out of it.
///
/// `persona_text` is the source of truth. The other fields are best-effort
/// extractions from the LLM's markdown and may legitimately be empty when
/// the model deviates from the expected template.
#[derive(Debug, Clone, PartialEq)]
pub struct Persona {
    pub username: String,
    pub archetype: String,
    pub top_subreddits: Vec<String>,
    pub persona_text: String,
}

/// Post metadata for a Reddit submission.
#[derive(Debug, Clone)]
pub struct Submission {
    pub id: String,
    pub title: String,
    pub selftext: String,
    pub subreddit: String,
    pub score: i64,
    pub url: String,
}

/// A top-level comment on a submission, as consumed by sentiment analysis.
#[derive(Debug, Clone)]
pub struct ThreadComment {
    pub id: String,
    pub author: String,
    pub body: String,
    pub score: i64,
    pub created_utc: i64,
    pub permalink: String,
}

/// Sentiment of one comment toward the post it replies to.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SentimentResult {
    pub comment_id: String,
    pub username: String,
    /// -1.0 (negative/dismissive) to 1.0 (positive/enthusiastic).
    pub score: f64,
    pub rationale: String,
}

/// A nearest-neighbor hit returned from the vector store.
///
/// `similarity` is the cosine similarity reported by Qdrant; the payload may
/// carry its own `score` field (the Reddit comment score), which is a
/// different quantity and is preserved independently inside `payload`.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub id: String,
    pub similarity: f32,
    pub payload: serde_json::Value,
}
