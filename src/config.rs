use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub reddit: RedditConfig,
    #[serde(default)]
    pub ollama: OllamaConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub qdrant: QdrantConfig,
    #[serde(default)]
    pub sentiment: SentimentConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RedditConfig {
    /// Minimum delay between successive Reddit API calls.
    #[serde(default = "default_rate_limit_secs")]
    pub rate_limit_secs: u64,
    #[serde(default = "default_max_comments")]
    pub max_comments_per_user: usize,
    #[serde(default = "default_reddit_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for RedditConfig {
    fn default() -> Self {
        Self {
            rate_limit_secs: default_rate_limit_secs(),
            max_comments_per_user: default_max_comments(),
            timeout_secs: default_reddit_timeout_secs(),
        }
    }
}

fn default_rate_limit_secs() -> u64 {
    5
}
fn default_max_comments() -> usize {
    100
}
fn default_reddit_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct OllamaConfig {
    #[serde(default = "default_ollama_base_url")]
    pub base_url: String,
    #[serde(default = "default_ollama_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    /// Context window for generation. Comment files can be large, so the
    /// default leaves room for ~100 comments plus the prompt scaffold.
    #[serde(default = "default_num_ctx")]
    pub num_ctx: u64,
    #[serde(default = "default_ollama_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: default_ollama_base_url(),
            model: default_ollama_model(),
            temperature: default_temperature(),
            num_ctx: default_num_ctx(),
            timeout_secs: default_ollama_timeout_secs(),
        }
    }
}

fn default_ollama_base_url() -> String {
    "http://localhost:11434".to_string()
}
fn default_ollama_model() -> String {
    "qwen3:8b".to_string()
}
fn default_temperature() -> f64 {
    0.3
}
fn default_num_ctx() -> u64 {
    32768
}
fn default_ollama_timeout_secs() -> u64 {
    600
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_model")]
    pub model: String,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: default_embedding_model(),
        }
    }
}

fn default_embedding_model() -> String {
    "nomic-embed-text".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct QdrantConfig {
    #[serde(default = "default_qdrant_url")]
    pub url: String,
    #[serde(default = "default_vector_size")]
    pub vector_size: usize,
    #[serde(default = "default_comments_collection")]
    pub comments_collection: String,
    #[serde(default = "default_personas_collection")]
    pub personas_collection: String,
    #[serde(default = "default_qdrant_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for QdrantConfig {
    fn default() -> Self {
        Self {
            url: default_qdrant_url(),
            vector_size: default_vector_size(),
            comments_collection: default_comments_collection(),
            personas_collection: default_personas_collection(),
            timeout_secs: default_qdrant_timeout_secs(),
        }
    }
}

fn default_qdrant_url() -> String {
    "http://localhost:6333".to_string()
}
fn default_vector_size() -> usize {
    768
}
fn default_comments_collection() -> String {
    "reddit_comments".to_string()
}
fn default_personas_collection() -> String {
    "user_personas".to_string()
}
fn default_qdrant_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct SentimentConfig {
    /// Comments per LLM call. Bounded: oversized batches risk blowing the
    /// model's context window, undersized batches waste round-trips.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default)]
    pub temperature: f64,
}

impl Default for SentimentConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            temperature: 0.0,
        }
    }
}

fn default_batch_size() -> usize {
    20
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

/// Load the config file if present, otherwise fall back to defaults.
/// Commands that only touch local files work without any config on disk.
pub fn load_config_or_default(path: &Path) -> Result<Config> {
    if path.exists() {
        load_config(path)
    } else {
        let config = Config::default();
        validate(&config)?;
        Ok(config)
    }
}

fn validate(config: &Config) -> Result<()> {
    if config.reddit.max_comments_per_user == 0 {
        anyhow::bail!("reddit.max_comments_per_user must be > 0");
    }

    if config.qdrant.vector_size == 0 {
        anyhow::bail!("qdrant.vector_size must be > 0");
    }

    if !(1..=100).contains(&config.sentiment.batch_size) {
        anyhow::bail!(
            "sentiment.batch_size must be between 1 and 100, got {}",
            config.sentiment.batch_size
        );
    }

    if !(0.0..=2.0).contains(&config.ollama.temperature) {
        anyhow::bail!("ollama.temperature must be in [0.0, 2.0]");
    }

    Ok(())
}
