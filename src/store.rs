//! Qdrant vector store adapter.
//!
//! Stores comment and persona embeddings in two collections over the plain
//! Qdrant REST API. Point IDs are derived deterministically from a natural
//! key (comment permalink, persona username) so that re-embedding the same
//! entity overwrites the previous point instead of duplicating it. That is
//! the one correctness property this layer must hold.
//!
//! Existence probes are best-effort and return `false` on any backend
//! error: a false negative only costs a redundant re-embed.

use anyhow::{bail, Result};
use chrono::{Local, TimeZone, Utc};
use serde::Deserialize;
use std::time::Duration;

use crate::config::Config;
use crate::llm::{embed_one, LlmClient};
use crate::models::{Comment, Persona, SearchHit};

/// Derive a stable UUID-shaped point ID from a natural key.
///
/// Pure function: identical keys yield identical IDs across processes and
/// runs, which is what makes upserts idempotent.
pub fn point_id(key: &str) -> String {
    uuid::Uuid::from_bytes(md5::compute(key).0).to_string()
}

pub struct VectorStore {
    http: reqwest::Client,
    base_url: String,
    comments_collection: String,
    personas_collection: String,
    vector_size: usize,
}

#[derive(Deserialize)]
struct ScrollResult {
    points: Vec<serde_json::Value>,
}

#[derive(Deserialize)]
struct ScrollResponse {
    result: ScrollResult,
}

#[derive(Deserialize)]
struct RetrieveResponse {
    result: Vec<serde_json::Value>,
}

#[derive(Deserialize)]
struct SearchEntry {
    id: serde_json::Value,
    score: f32,
    #[serde(default)]
    payload: serde_json::Value,
}

#[derive(Deserialize)]
struct SearchResponse {
    result: Vec<SearchEntry>,
}

impl VectorStore {
    pub fn new(config: &Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.qdrant.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: config.qdrant.url.trim_end_matches('/').to_string(),
            comments_collection: config.qdrant.comments_collection.clone(),
            personas_collection: config.qdrant.personas_collection.clone(),
            vector_size: config.qdrant.vector_size,
        })
    }

    fn collection_name(&self, collection: &str) -> Result<&str> {
        match collection {
            "comments" => Ok(&self.comments_collection),
            "personas" => Ok(&self.personas_collection),
            other => bail!("Unknown collection: {}. Use comments or personas.", other),
        }
    }

    /// Create both collections if they don't exist yet (cosine distance,
    /// fixed dimensionality). Must run before any write.
    pub async fn ensure_collections(&self) -> Result<()> {
        for name in [&self.comments_collection, &self.personas_collection] {
            let exists = self
                .http
                .get(format!("{}/collections/{}", self.base_url, name))
                .send()
                .await?;

            if exists.status().is_success() {
                continue;
            }
            if exists.status() != reqwest::StatusCode::NOT_FOUND {
                bail!(
                    "Qdrant collection check failed ({}): {}",
                    exists.status(),
                    exists.text().await.unwrap_or_default()
                );
            }

            let body = serde_json::json!({
                "vectors": {
                    "size": self.vector_size,
                    "distance": "Cosine",
                },
            });
            let created = self
                .http
                .put(format!("{}/collections/{}", self.base_url, name))
                .json(&body)
                .send()
                .await?;
            if !created.status().is_success() {
                bail!(
                    "Qdrant collection create failed ({}): {}",
                    created.status(),
                    created.text().await.unwrap_or_default()
                );
            }
        }
        Ok(())
    }

    async fn upsert_point(
        &self,
        collection: &str,
        id: &str,
        vector: Vec<f32>,
        payload: serde_json::Value,
    ) -> Result<()> {
        let body = serde_json::json!({
            "points": [{
                "id": id,
                "vector": vector,
                "payload": payload,
            }],
        });

        let response = self
            .http
            .put(format!(
                "{}/collections/{}/points?wait=true",
                self.base_url, collection
            ))
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            bail!(
                "Qdrant upsert failed ({}): {}",
                response.status(),
                response.text().await.unwrap_or_default()
            );
        }
        Ok(())
    }

    /// Embed and upsert one comment, keyed by its permalink.
    pub async fn store_comment(
        &self,
        llm: &dyn LlmClient,
        comment: &Comment,
        username: &str,
    ) -> Result<()> {
        let vector = embed_one(llm, &comment.body).await?;
        let id = point_id(&comment.permalink);

        let created_date = Local
            .timestamp_opt(comment.created_utc, 0)
            .earliest()
            .map(|dt| dt.format("%Y-%m-%d").to_string())
            .unwrap_or_default();

        let payload = serde_json::json!({
            "text": comment.body,
            "username": username,
            "subreddit": comment.subreddit,
            "score": comment.score,
            "permalink": comment.permalink,
            "created_date": created_date,
        });

        self.upsert_point(&self.comments_collection, &id, vector, payload)
            .await
    }

    /// Embed and upsert one persona, keyed by its username.
    pub async fn store_persona(
        &self,
        llm: &dyn LlmClient,
        persona: &Persona,
        comment_count: usize,
    ) -> Result<()> {
        let vector = embed_one(llm, &persona.persona_text).await?;
        let id = point_id(&persona.username);

        let payload = serde_json::json!({
            "username": persona.username,
            "persona_text": persona.persona_text,
            "archetype": persona.archetype,
            "top_subreddits": persona.top_subreddits,
            "comment_count": comment_count,
            "embedded_at": Utc::now().timestamp(),
        });

        self.upsert_point(&self.personas_collection, &id, vector, payload)
            .await
    }

    /// Whether any comment for `username` is already embedded. Best-effort:
    /// any backend failure reads as "not present".
    pub async fn user_has_comments(&self, username: &str) -> bool {
        let body = serde_json::json!({
            "filter": {
                "must": [{
                    "key": "username",
                    "match": { "value": username },
                }],
            },
            "limit": 1,
        });

        let response = self
            .http
            .post(format!(
                "{}/collections/{}/points/scroll",
                self.base_url, self.comments_collection
            ))
            .json(&body)
            .send()
            .await;

        match response {
            Ok(r) if r.status().is_success() => r
                .json::<ScrollResponse>()
                .await
                .map(|parsed| !parsed.result.points.is_empty())
                .unwrap_or(false),
            _ => false,
        }
    }

    /// Whether a persona for `username` is already embedded, via direct
    /// retrieval of its deterministic ID. Best-effort like
    /// [`user_has_comments`].
    pub async fn user_has_persona(&self, username: &str) -> bool {
        let body = serde_json::json!({ "ids": [point_id(username)] });

        let response = self
            .http
            .post(format!(
                "{}/collections/{}/points",
                self.base_url, self.personas_collection
            ))
            .json(&body)
            .send()
            .await;

        match response {
            Ok(r) if r.status().is_success() => r
                .json::<RetrieveResponse>()
                .await
                .map(|parsed| !parsed.result.is_empty())
                .unwrap_or(false),
            _ => false,
        }
    }

    /// Nearest-neighbor search over `collection` ("comments" or
    /// "personas"). The hit's `similarity` is Qdrant's cosine score; the
    /// payload rides along untouched, including any Reddit `score` field.
    pub async fn search_similar(
        &self,
        llm: &dyn LlmClient,
        query: &str,
        collection: &str,
        limit: usize,
    ) -> Result<Vec<SearchHit>> {
        let name = self.collection_name(collection)?;
        let vector = embed_one(llm, query).await?;

        let body = serde_json::json!({
            "vector": vector,
            "limit": limit,
            "with_payload": true,
        });

        let response = self
            .http
            .post(format!(
                "{}/collections/{}/points/search",
                self.base_url, name
            ))
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            bail!(
                "Qdrant search failed ({}): {}",
                response.status(),
                response.text().await.unwrap_or_default()
            );
        }

        let parsed: SearchResponse = response.json().await?;
        let hits = parsed
            .result
            .into_iter()
            .map(|entry| SearchHit {
                id: entry
                    .id
                    .as_str()
                    .map(ToString::to_string)
                    .unwrap_or_else(|| entry.id.to_string()),
                similarity: entry.score,
                payload: entry.payload,
            })
            .collect();

        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_id_deterministic() {
        let permalink = "https://reddit.com/r/rust/comments/abc/x/c1/";
        assert_eq!(point_id(permalink), point_id(permalink));
        assert_eq!(point_id("someuser"), point_id("someuser"));
    }

    #[test]
    fn test_point_id_distinct_keys_differ() {
        assert_ne!(
            point_id("https://reddit.com/r/rust/comments/abc/x/c1/"),
            point_id("https://reddit.com/r/rust/comments/abc/x/c2/")
        );
        assert_ne!(point_id("alice"), point_id("bob"));
    }

    #[test]
    fn test_point_id_known_digest() {
        // MD5("hello") = 5d41402abc4b2a76b9719d911017c592, formatted as a
        // UUID. Pins the derivation so stored points stay addressable
        // across releases.
        assert_eq!(point_id("hello"), "5d41402a-bc4b-2a76-b971-9d911017c592");
    }

    #[test]
    fn test_point_id_shape() {
        let id = point_id("anything");
        assert_eq!(id.len(), 36);
        assert_eq!(id.matches('-').count(), 4);
    }

    #[test]
    fn test_collection_name_rejects_unknown() {
        let store = VectorStore::new(&Config::default()).unwrap();
        assert!(store.collection_name("comments").is_ok());
        assert!(store.collection_name("personas").is_ok());
        assert!(store.collection_name("documents").is_err());
    }
}
