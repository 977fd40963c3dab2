//! The `subtext ask` command (retrieval-augmented generation).
//!
//! Retrieves the most relevant personas and comments for the question,
//! joins them into a context block, and asks the LLM to answer from that
//! context alone.

use anyhow::Result;

use crate::config::Config;
use crate::llm::{LlmClient, OllamaClient};
use crate::models::SearchHit;
use crate::store::VectorStore;

/// Personas retrieved alongside the comment hits.
const PERSONA_LIMIT: usize = 2;

pub async fn run_ask(config: &Config, question: &str, limit: usize) -> Result<()> {
    let store = VectorStore::new(config)?;
    let llm = OllamaClient::new(config)?;

    let comment_hits = store
        .search_similar(&llm, question, "comments", limit)
        .await?;
    let persona_hits = store
        .search_similar(&llm, question, "personas", PERSONA_LIMIT)
        .await?;

    if comment_hits.is_empty() && persona_hits.is_empty() {
        println!("No indexed context found. Run `subtext embed` first.");
        return Ok(());
    }

    let context = build_context(&persona_hits, &comment_hits);
    let prompt = build_prompt(question, &context);

    let answer = llm.generate(&prompt, config.ollama.temperature).await?;
    println!("{}", answer.trim());

    Ok(())
}

fn build_context(persona_hits: &[SearchHit], comment_hits: &[SearchHit]) -> String {
    let get = |hit: &SearchHit, key: &str| {
        hit.payload
            .get(key)
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string()
    };

    let mut lines = Vec::new();

    for hit in persona_hits {
        let archetype = get(hit, "archetype");
        let label = if archetype.is_empty() {
            format!("[persona] u/{}", get(hit, "username"))
        } else {
            format!("[persona] u/{} ({})", get(hit, "username"), archetype)
        };
        // Personas are long documents; a capped excerpt keeps the prompt
        // within the model's context alongside the comment hits.
        let text: String = get(hit, "persona_text").chars().take(1500).collect();
        lines.push(format!("{}\n{}", label, text.trim()));
    }

    for hit in comment_hits {
        lines.push(format!(
            "[comment] u/{} in r/{} ({}): \"{}\"",
            get(hit, "username"),
            get(hit, "subreddit"),
            get(hit, "created_date"),
            get(hit, "text"),
        ));
    }

    lines.join("\n\n")
}

fn build_prompt(question: &str, context: &str) -> String {
    format!(
        r#"You are answering a question about a group of Reddit users based on their comments and persona profiles.

CONTEXT:
{context}

QUESTION: {question}

Answer using only the context above. Cite usernames (u/name) where relevant. If the context does not contain the answer, say so."#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(payload: serde_json::Value) -> SearchHit {
        SearchHit {
            id: "x".to_string(),
            similarity: 0.9,
            payload,
        }
    }

    #[test]
    fn test_context_includes_personas_and_comments() {
        let personas = vec![hit(serde_json::json!({
            "username": "alice",
            "archetype": "The Sage",
            "persona_text": "Analytical and helpful.",
        }))];
        let comments = vec![hit(serde_json::json!({
            "username": "bob",
            "subreddit": "rust",
            "created_date": "2023-11-14",
            "text": "Great tip!",
        }))];

        let context = build_context(&personas, &comments);
        assert!(context.contains("[persona] u/alice (The Sage)"));
        assert!(context.contains("Analytical and helpful."));
        assert!(context.contains("[comment] u/bob in r/rust (2023-11-14): \"Great tip!\""));
    }

    #[test]
    fn test_prompt_embeds_question_and_context() {
        let prompt = build_prompt("Who likes Rust?", "[comment] u/bob: \"rust rocks\"");
        assert!(prompt.contains("QUESTION: Who likes Rust?"));
        assert!(prompt.contains("rust rocks"));
    }
}
