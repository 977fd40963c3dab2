//! The `subtext sentiment` command.
//!
//! Scores every top-level comment of a Reddit thread for sentiment toward
//! the post and prints a shortlist of engaged users, most positive first.
//! With --output, the full results are also written as JSON.

use anyhow::{Context, Result};
use std::path::Path;

use crate::config::Config;
use crate::llm::OllamaClient;
use crate::reddit::RedditClient;
use crate::sentiment::SentimentAnalyzer;

pub async fn run_sentiment(config: &Config, url: &str, output: Option<&Path>) -> Result<()> {
    // Fail on a bad batch size or URL before touching the network.
    let analyzer = SentimentAnalyzer::new(config)?;

    let reddit = RedditClient::connect(config).await?;
    let submission = reddit.submission(url).await?;
    let comments = reddit.top_level_comments(url).await?;

    println!("r/{}: {}", submission.subreddit, submission.title);
    println!("{} top-level comments", comments.len());

    if comments.is_empty() {
        println!("Nothing to analyze.");
        return Ok(());
    }

    let llm = OllamaClient::new(config)?;
    let mut results = analyzer
        .analyze_all(&llm, &comments, &submission.title, &submission.selftext)
        .await?;

    results.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    println!();
    for result in &results {
        println!(
            "{:+.2}  u/{:<20}  {}",
            result.score, result.username, result.rationale
        );
    }

    let positive = results.iter().filter(|r| r.score > 0.2).count();
    let negative = results.iter().filter(|r| r.score < -0.1).count();
    println!();
    println!("sentiment");
    println!("  analyzed: {}", results.len());
    println!("  positive: {}", positive);
    println!("  negative: {}", negative);

    if let Some(path) = output {
        let json = serde_json::to_string_pretty(&results)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write results to {}", path.display()))?;
        println!("  written: {}", path.display());
    }
    println!("ok");

    Ok(())
}
