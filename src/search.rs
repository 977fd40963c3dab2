//! The `subtext search` command.
//!
//! Embeds the query and prints the nearest neighbors from the requested
//! collection. The bracketed number is cosine similarity; the Reddit score
//! shown for comments is a separate field from the payload.

use anyhow::Result;

use crate::config::Config;
use crate::llm::OllamaClient;
use crate::models::SearchHit;
use crate::store::VectorStore;

pub async fn run_search(
    config: &Config,
    query: &str,
    collection: &str,
    limit: usize,
) -> Result<()> {
    if query.trim().is_empty() {
        println!("No results.");
        return Ok(());
    }

    let store = VectorStore::new(config)?;
    let llm = OllamaClient::new(config)?;

    let hits = store.search_similar(&llm, query, collection, limit).await?;
    if hits.is_empty() {
        println!("No results.");
        return Ok(());
    }

    for (i, hit) in hits.iter().enumerate() {
        print_hit(i + 1, hit, collection);
    }

    Ok(())
}

fn print_hit(rank: usize, hit: &SearchHit, collection: &str) {
    let get = |key: &str| {
        hit.payload
            .get(key)
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string()
    };

    match collection {
        "personas" => {
            let archetype = get("archetype");
            let archetype_display = if archetype.is_empty() {
                String::new()
            } else {
                format!(" ({})", archetype)
            };
            println!("{}. [{:.2}] u/{}{}", rank, hit.similarity, get("username"), archetype_display);
            let text = get("persona_text");
            println!("    \"{}\"", excerpt(&text, 160));
        }
        _ => {
            println!(
                "{}. [{:.2}] u/{} in r/{}",
                rank,
                hit.similarity,
                get("username"),
                get("subreddit")
            );
            if let Some(score) = hit.payload.get("score").and_then(|v| v.as_i64()) {
                println!("    reddit score: {}  date: {}", score, get("created_date"));
            }
            let text = get("text");
            println!("    \"{}\"", excerpt(&text, 160));
            let permalink = get("permalink");
            if !permalink.is_empty() {
                println!("    link: {}", permalink);
            }
        }
    }
    println!();
}

fn excerpt(text: &str, max_chars: usize) -> String {
    let flat = text.replace('\n', " ");
    let flat = flat.trim();
    if flat.chars().count() <= max_chars {
        flat.to_string()
    } else {
        let truncated: String = flat.chars().take(max_chars).collect();
        format!("{}...", truncated.trim_end())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_excerpt_short_text_untouched() {
        assert_eq!(excerpt("hello world", 160), "hello world");
    }

    #[test]
    fn test_excerpt_flattens_newlines_and_truncates() {
        let text = "line one\nline two ".repeat(40);
        let result = excerpt(&text, 20);
        assert!(!result.contains('\n'));
        assert!(result.ends_with("..."));
        assert!(result.chars().count() <= 23);
    }
}
