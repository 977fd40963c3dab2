//! Batched sentiment analysis over an LLM.
//!
//! Classifies how each comment in a thread leans toward the original post,
//! one model call per batch of comments. The model is asked for a JSON
//! array of `{id, score, rationale}`; parsing tolerates the quirks of
//! locally hosted models (a `<think>...</think>` reasoning preamble, a
//! wrapping ```json code fence) but malformed JSON underneath is a hard
//! error carrying the raw response for diagnosis. There is no retry.
//!
//! Usernames are resolved from the request-time id → author mapping, never
//! from the model output.

use anyhow::{bail, Result};
use regex::Regex;

use crate::config::Config;
use crate::llm::LlmClient;
use crate::models::{SentimentResult, ThreadComment};

pub struct SentimentAnalyzer {
    batch_size: usize,
    temperature: f64,
}

impl SentimentAnalyzer {
    /// Batch size outside [1, 100] is a configuration error: oversized
    /// batches risk exceeding the model's context window, undersized ones
    /// waste round-trips.
    pub fn new(config: &Config) -> Result<Self> {
        let batch_size = config.sentiment.batch_size;
        if !(1..=100).contains(&batch_size) {
            bail!("batch_size must be between 1 and 100, got {}", batch_size);
        }
        Ok(Self {
            batch_size,
            temperature: config.sentiment.temperature,
        })
    }

    /// Analyze every comment, in consecutive batches of the configured
    /// size (the last batch may be shorter). One LLM call per batch,
    /// results concatenated in partition order.
    pub async fn analyze_all(
        &self,
        llm: &dyn LlmClient,
        comments: &[ThreadComment],
        post_title: &str,
        post_body: &str,
    ) -> Result<Vec<SentimentResult>> {
        let mut all_results = Vec::with_capacity(comments.len());

        for batch in comments.chunks(self.batch_size) {
            let results = self.analyze_batch(llm, batch, post_title, post_body).await?;
            all_results.extend(results);
        }

        Ok(all_results)
    }

    /// Analyze a single batch with one LLM call.
    pub async fn analyze_batch(
        &self,
        llm: &dyn LlmClient,
        comments: &[ThreadComment],
        post_title: &str,
        post_body: &str,
    ) -> Result<Vec<SentimentResult>> {
        let prompt = build_prompt(comments, post_title, post_body);
        let response = llm.generate(&prompt, self.temperature).await?;
        parse_response(&response, comments)
    }

    /// Analyze one comment in isolation (used by the evaluation harness).
    pub async fn analyze_single(
        &self,
        llm: &dyn LlmClient,
        comment: &str,
        post_title: &str,
        post_body: &str,
    ) -> Result<SentimentResult> {
        let batch = vec![ThreadComment {
            id: "eval".to_string(),
            author: "user".to_string(),
            body: comment.to_string(),
            score: 0,
            created_utc: 0,
            permalink: String::new(),
        }];

        let results = self.analyze_batch(llm, &batch, post_title, post_body).await?;
        Ok(results.into_iter().next().unwrap_or(SentimentResult {
            comment_id: "eval".to_string(),
            username: "user".to_string(),
            score: 0.0,
            rationale: "Analysis failed".to_string(),
        }))
    }
}

fn build_prompt(comments: &[ThreadComment], post_title: &str, post_body: &str) -> String {
    let comments_text = comments
        .iter()
        .map(|c| format!("[{}] u/{}: \"{}\"", c.id, c.author, c.body))
        .collect::<Vec<_>>()
        .join("\n");

    let body_preview = if post_body.is_empty() {
        "(no body text)".to_string()
    } else {
        post_body.chars().take(500).collect()
    };

    format!(
        r#"You are analyzing Reddit comments for sentiment toward the original post.

POST TITLE: {post_title}
POST BODY: {body_preview}

COMMENTS TO ANALYZE:
{comments_text}

For each comment, determine the sentiment toward the post/idea on a scale from -1 (negative/dismissive) to 1 (positive/enthusiastic).

Return a JSON array with:
- id: the comment ID (e.g., "c1")
- score: sentiment from -1 to 1
- rationale: brief explanation (10 words max)

Respond ONLY with valid JSON array. Example:
[
  {{"id": "c1", "score": 0.8, "rationale": "Enthusiastic endorsement"}},
  {{"id": "c2", "score": -0.4, "rationale": "Dismissive comparison"}}
]"#
    )
}

#[derive(serde::Deserialize)]
struct RawEntry {
    id: String,
    score: f64,
    #[serde(default)]
    rationale: String,
}

fn parse_response(response_text: &str, comments: &[ThreadComment]) -> Result<Vec<SentimentResult>> {
    // Reasoning models (e.g. Qwen) emit an internal monologue before the
    // answer; discard it before looking for JSON.
    let think_re = Regex::new(r"(?s)<think>.*?</think>").unwrap();
    let mut cleaned = think_re.replace_all(response_text.trim(), "").trim().to_string();

    if cleaned.starts_with("```") {
        cleaned = Regex::new(r"^```(?:json)?\n?")
            .unwrap()
            .replace(&cleaned, "")
            .to_string();
        cleaned = Regex::new(r"\n?```$")
            .unwrap()
            .replace(&cleaned, "")
            .to_string();
    }

    let entries: Vec<RawEntry> = match serde_json::from_str(&cleaned) {
        Ok(entries) => entries,
        Err(e) => bail!(
            "Failed to parse LLM response as JSON: {}\nResponse: {}",
            e,
            response_text
        ),
    };

    let results = entries
        .into_iter()
        .map(|entry| {
            let username = comments
                .iter()
                .find(|c| c.id == entry.id)
                .map(|c| c.author.clone())
                .unwrap_or_else(|| "unknown".to_string());
            SentimentResult {
                comment_id: entry.id,
                username,
                score: entry.score,
                rationale: entry.rationale,
            }
        })
        .collect();

    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn test_config(batch_size: usize) -> Config {
        let mut config = Config::default();
        config.sentiment.batch_size = batch_size;
        config
    }

    fn thread_comment(id: &str, author: &str, body: &str) -> ThreadComment {
        ThreadComment {
            id: id.to_string(),
            author: author.to_string(),
            body: body.to_string(),
            score: 0,
            created_utc: 0,
            permalink: String::new(),
        }
    }

    /// Echoes back a well-formed JSON verdict for every `[id] u/author:`
    /// line it finds in the prompt, and records each prompt it saw.
    struct EchoLlm {
        prompts: Mutex<Vec<String>>,
    }

    impl EchoLlm {
        fn new() -> Self {
            Self {
                prompts: Mutex::new(Vec::new()),
            }
        }

        fn call_count(&self) -> usize {
            self.prompts.lock().unwrap().len()
        }
    }

    #[async_trait::async_trait]
    impl LlmClient for EchoLlm {
        async fn generate(&self, prompt: &str, _temperature: f64) -> Result<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            let id_re = Regex::new(r"(?m)^\[([^\]]+)\] u/").unwrap();
            let entries: Vec<String> = id_re
                .captures_iter(prompt)
                .map(|c| format!(r#"{{"id": "{}", "score": 0.5, "rationale": "ok"}}"#, &c[1]))
                .collect();
            Ok(format!("[{}]", entries.join(", ")))
        }

        async fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
            bail!("not used")
        }
    }

    /// Returns a fixed canned response regardless of the prompt.
    struct CannedLlm {
        response: String,
    }

    #[async_trait::async_trait]
    impl LlmClient for CannedLlm {
        async fn generate(&self, _prompt: &str, _temperature: f64) -> Result<String> {
            Ok(self.response.clone())
        }

        async fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
            bail!("not used")
        }
    }

    #[test]
    fn test_batch_size_bounds() {
        assert!(SentimentAnalyzer::new(&test_config(0)).is_err());
        assert!(SentimentAnalyzer::new(&test_config(101)).is_err());
        assert!(SentimentAnalyzer::new(&test_config(1)).is_ok());
        assert!(SentimentAnalyzer::new(&test_config(100)).is_ok());
    }

    #[test]
    fn test_prompt_includes_post_context_and_comments() {
        let comments = vec![thread_comment("c1", "alice", "Love it")];
        let prompt = build_prompt(&comments, "My new app", "Here is the body");

        assert!(prompt.contains("POST TITLE: My new app"));
        assert!(prompt.contains("POST BODY: Here is the body"));
        assert!(prompt.contains("[c1] u/alice: \"Love it\""));
    }

    #[test]
    fn test_prompt_truncates_body_and_handles_empty() {
        let comments = vec![thread_comment("c1", "alice", "hi")];

        let long_body = "x".repeat(2000);
        let prompt = build_prompt(&comments, "title", &long_body);
        assert!(prompt.contains(&"x".repeat(500)));
        assert!(!prompt.contains(&"x".repeat(501)));

        let prompt = build_prompt(&comments, "title", "");
        assert!(prompt.contains("(no body text)"));
    }

    #[test]
    fn test_parse_plain_fenced_and_think_responses_agree() {
        let comments = vec![
            thread_comment("c1", "alice", "a"),
            thread_comment("c2", "bob", "b"),
        ];
        let payload = r#"[
  {"id": "c1", "score": 0.8, "rationale": "Enthusiastic endorsement"},
  {"id": "c2", "score": -0.4, "rationale": "Dismissive comparison"}
]"#;

        let plain = parse_response(payload, &comments).unwrap();
        let fenced = parse_response(&format!("```json\n{}\n```", payload), &comments).unwrap();
        let think = parse_response(
            &format!("<think>\nLet me weigh each comment...\n</think>\n{}", payload),
            &comments,
        )
        .unwrap();

        assert_eq!(plain, fenced);
        assert_eq!(plain, think);
        assert_eq!(plain.len(), 2);
        assert_eq!(plain[0].comment_id, "c1");
        assert_eq!(plain[0].username, "alice");
        assert!((plain[0].score - 0.8).abs() < 1e-9);
        assert_eq!(plain[1].username, "bob");
        assert!((plain[1].score + 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_parse_untagged_fence() {
        let comments = vec![thread_comment("c1", "alice", "a")];
        let raw = "```\n[{\"id\": \"c1\", \"score\": 1, \"rationale\": \"r\"}]\n```";
        let results = parse_response(raw, &comments).unwrap();
        assert_eq!(results.len(), 1);
        assert!((results[0].score - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_parse_integer_score_coerced() {
        let comments = vec![thread_comment("c1", "alice", "a")];
        let results = parse_response(r#"[{"id": "c1", "score": -1}]"#, &comments).unwrap();
        assert!((results[0].score + 1.0).abs() < 1e-9);
        assert_eq!(results[0].rationale, "");
    }

    #[test]
    fn test_parse_unknown_id_gets_sentinel_username() {
        let comments = vec![thread_comment("c1", "alice", "a")];
        let raw = r#"[{"id": "c99", "score": 0.1, "rationale": "who"}]"#;
        let results = parse_response(raw, &comments).unwrap();
        assert_eq!(results[0].username, "unknown");
    }

    #[test]
    fn test_parse_garbage_is_hard_error_with_raw_text() {
        let comments = vec![thread_comment("c1", "alice", "a")];
        let err = parse_response("I refuse to answer in JSON.", &comments).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("Failed to parse LLM response as JSON"));
        assert!(message.contains("I refuse to answer in JSON."));
    }

    #[tokio::test]
    async fn test_analyze_all_partitions_batches() {
        let analyzer = SentimentAnalyzer::new(&test_config(2)).unwrap();
        let llm = EchoLlm::new();
        let comments: Vec<ThreadComment> = (1..=5)
            .map(|i| thread_comment(&format!("c{}", i), &format!("user{}", i), "body"))
            .collect();

        let results = analyzer
            .analyze_all(&llm, &comments, "title", "")
            .await
            .unwrap();

        // B=2, N=5 → 3 calls of sizes 2, 2, 1; every input id comes back.
        assert_eq!(llm.call_count(), 3);
        assert_eq!(results.len(), 5);
        let ids: Vec<&str> = results.iter().map(|r| r.comment_id.as_str()).collect();
        assert_eq!(ids, vec!["c1", "c2", "c3", "c4", "c5"]);
        assert_eq!(results[4].username, "user5");
    }

    #[tokio::test]
    async fn test_analyze_all_single_batch_when_size_exceeds_input() {
        let analyzer = SentimentAnalyzer::new(&test_config(20)).unwrap();
        let llm = EchoLlm::new();
        let comments: Vec<ThreadComment> = (1..=5)
            .map(|i| thread_comment(&format!("c{}", i), "u", "body"))
            .collect();

        let results = analyzer
            .analyze_all(&llm, &comments, "title", "")
            .await
            .unwrap();

        assert_eq!(llm.call_count(), 1);
        assert_eq!(results.len(), 5);
    }

    #[tokio::test]
    async fn test_analyze_single_falls_back_on_empty_result() {
        let analyzer = SentimentAnalyzer::new(&test_config(20)).unwrap();
        let llm = CannedLlm {
            response: "[]".to_string(),
        };

        let result = analyzer
            .analyze_single(&llm, "some comment", "title", "")
            .await
            .unwrap();

        assert_eq!(result.score, 0.0);
        assert_eq!(result.rationale, "Analysis failed");
    }
}
