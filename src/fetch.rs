//! The `subtext fetch` command.
//!
//! Reads a username list, fetches each user's top comment history, and
//! writes one markdown archive per user. A single user's failure is
//! reported and the loop moves on.

use anyhow::{Context, Result};
use std::path::Path;

use crate::config::Config;
use crate::markdown;
use crate::reddit::RedditClient;
use crate::users;

pub async fn run_fetch(
    config: &Config,
    userfile: &Path,
    output_dir: &Path,
    force: bool,
) -> Result<()> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create output directory: {}", output_dir.display()))?;

    let usernames = users::read_usernames_file(userfile)?;
    if usernames.is_empty() {
        println!("No usernames found in {}", userfile.display());
        return Ok(());
    }

    // Skip users whose archive already exists unless --force.
    let mut to_process = Vec::new();
    let mut skipped = 0usize;
    for username in usernames {
        let path = output_dir.join(format!("{}.md", username));
        if !force && path.exists() {
            skipped += 1;
        } else {
            to_process.push(username);
        }
    }

    if skipped > 0 {
        println!("Skipping {} users with existing files", skipped);
    }
    if to_process.is_empty() {
        println!("No users to process.");
        return Ok(());
    }

    let reddit = RedditClient::connect(config).await?;

    let mut saved = 0usize;
    let mut failed = 0usize;

    for username in &to_process {
        match fetch_one(&reddit, username, output_dir).await {
            Ok(count) => {
                println!("u/{}: {} comments saved", username, count);
                saved += 1;
            }
            Err(e) => {
                eprintln!("u/{}: {:#}", username, e);
                failed += 1;
            }
        }
    }

    println!("fetch");
    println!("  users: {}", to_process.len() + skipped);
    println!("  saved: {}", saved);
    println!("  failed: {}", failed);
    println!("  skipped: {}", skipped);
    println!("  output: {}", output_dir.display());
    println!("ok");

    Ok(())
}

async fn fetch_one(reddit: &RedditClient, username: &str, output_dir: &Path) -> Result<usize> {
    let comments = reddit.user_comments(username).await?;
    let path = output_dir.join(format!("{}.md", username));
    markdown::write_comments_file(&path, &comments, username)?;
    Ok(comments.len())
}
