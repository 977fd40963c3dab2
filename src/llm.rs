//! LLM client abstraction and the Ollama implementation.
//!
//! Defines the [`LlmClient`] trait so everything that talks to the model
//! (persona generation, sentiment analysis, the vector store's embedding
//! calls) takes an explicitly constructed client handle. Tests substitute a
//! fake without touching the network.
//!
//! The concrete [`OllamaClient`] speaks the Ollama REST API:
//! - `POST /api/generate` for non-streaming text generation
//! - `POST /api/embed` for batch embeddings
//!
//! There is no retry or backoff: transient failures surface to the caller
//! and are reported at the call site.

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use crate::config::Config;

#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Generate a completion for `prompt` at the given sampling temperature.
    async fn generate(&self, prompt: &str, temperature: f64) -> Result<String>;

    /// Embed a batch of texts, one vector per input, in input order.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Embed a single text.
pub async fn embed_one(client: &dyn LlmClient, text: &str) -> Result<Vec<f32>> {
    let vectors = client.embed(&[text.to_string()]).await?;
    vectors
        .into_iter()
        .next()
        .ok_or_else(|| anyhow::anyhow!("Empty embedding response"))
}

pub struct OllamaClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
    embed_model: String,
    num_ctx: u64,
}

impl OllamaClient {
    pub fn new(config: &Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.ollama.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: config.ollama.base_url.trim_end_matches('/').to_string(),
            model: config.ollama.model.clone(),
            embed_model: config.embedding.model.clone(),
            num_ctx: config.ollama.num_ctx,
        })
    }
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[async_trait]
impl LlmClient for OllamaClient {
    async fn generate(&self, prompt: &str, temperature: f64) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false,
            "options": {
                "temperature": temperature,
                "top_p": 0.9,
                "num_ctx": self.num_ctx,
            },
        });

        let response = self
            .http
            .post(format!("{}/api/generate", self.base_url))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            bail!("Ollama generate error {}: {}", status, text);
        }

        let parsed: GenerateResponse = response.json().await?;
        Ok(parsed.response)
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let body = serde_json::json!({
            "model": self.embed_model,
            "input": texts,
        });

        let response = self
            .http
            .post(format!("{}/api/embed", self.base_url))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            bail!("Ollama embed error {}: {}", status, text);
        }

        let parsed: EmbedResponse = response.json().await?;
        if parsed.embeddings.len() != texts.len() {
            bail!(
                "Ollama embed returned {} vectors for {} inputs",
                parsed.embeddings.len(),
                texts.len()
            );
        }
        Ok(parsed.embeddings)
    }
}
