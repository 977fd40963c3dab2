//! The `subtext embed` command.
//!
//! Parses comment archives and persona documents back into structured
//! records and upserts them into the vector store. Point IDs are
//! deterministic, so re-running embed overwrites rather than duplicates;
//! users whose vectors already exist are skipped unless --force.

use anyhow::{bail, Result};
use std::path::Path;

use crate::config::Config;
use crate::llm::OllamaClient;
use crate::markdown;
use crate::personas_cmd::{comment_files, is_persona_file};
use crate::store::VectorStore;

pub async fn run_embed(
    config: &Config,
    input_dir: &Path,
    collection: &str,
    force: bool,
) -> Result<()> {
    match collection {
        "comments" | "personas" | "all" => {}
        other => bail!(
            "Unknown collection: {}. Use comments, personas, or all.",
            other
        ),
    }

    let store = VectorStore::new(config)?;
    let llm = OllamaClient::new(config)?;
    store.ensure_collections().await?;

    if collection == "comments" || collection == "all" {
        embed_comments(&store, &llm, input_dir, force).await?;
    }
    if collection == "personas" || collection == "all" {
        embed_personas(&store, &llm, input_dir, force).await?;
    }

    Ok(())
}

async fn embed_comments(
    store: &VectorStore,
    llm: &OllamaClient,
    input_dir: &Path,
    force: bool,
) -> Result<()> {
    let files = comment_files(input_dir)?;
    if files.is_empty() {
        println!("No comment files found in {}", input_dir.display());
        return Ok(());
    }

    let mut users_embedded = 0usize;
    let mut comments_embedded = 0usize;
    let mut skipped = 0usize;
    let mut failed = 0usize;

    for file in &files {
        let username = match file.file_stem().and_then(|s| s.to_str()) {
            Some(s) => s.to_string(),
            None => continue,
        };

        if !force && store.user_has_comments(&username).await {
            skipped += 1;
            continue;
        }

        let result = async {
            let comments = markdown::parse_comments_file(file)?;
            let mut count = 0usize;
            for comment in &comments {
                store.store_comment(llm, comment, &username).await?;
                count += 1;
            }
            Ok::<usize, anyhow::Error>(count)
        }
        .await;

        match result {
            Ok(count) => {
                println!("u/{}: {} comments embedded", username, count);
                users_embedded += 1;
                comments_embedded += count;
            }
            Err(e) => {
                eprintln!("u/{}: {:#}", username, e);
                failed += 1;
            }
        }
    }

    println!("embed comments");
    println!("  users embedded: {}", users_embedded);
    println!("  comments embedded: {}", comments_embedded);
    println!("  failed: {}", failed);
    println!("  skipped: {}", skipped);
    println!("ok");

    Ok(())
}

async fn embed_personas(
    store: &VectorStore,
    llm: &OllamaClient,
    input_dir: &Path,
    force: bool,
) -> Result<()> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(input_dir)? {
        let entry = entry?;
        let path = entry.path();
        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            if path.is_file() && is_persona_file(name) {
                files.push(path);
            }
        }
    }
    files.sort();

    if files.is_empty() {
        println!("No persona files found in {}", input_dir.display());
        return Ok(());
    }

    let mut embedded = 0usize;
    let mut skipped = 0usize;
    let mut failed = 0usize;

    for file in &files {
        let stem = match file.file_stem().and_then(|s| s.to_str()) {
            Some(s) => s.to_string(),
            None => continue,
        };
        // "<username>_persona" → "<username>", whatever the suffix casing.
        let from_filename = stem[..stem.len() - "_persona".len()].to_string();

        let result = async {
            let mut persona = markdown::parse_persona_file(file)?;
            if persona.username.is_empty() {
                persona.username = from_filename.clone();
            }

            if !force && store.user_has_persona(&persona.username).await {
                return Ok::<bool, anyhow::Error>(false);
            }

            // Comment count rides along in the payload when the archive is
            // present next to the persona.
            let archive = input_dir.join(format!("{}.md", persona.username));
            let comment_count = if archive.exists() {
                markdown::parse_comments_file(&archive)?.len()
            } else {
                0
            };

            store.store_persona(llm, &persona, comment_count).await?;
            Ok(true)
        }
        .await;

        match result {
            Ok(true) => {
                println!("u/{}: persona embedded", from_filename);
                embedded += 1;
            }
            Ok(false) => skipped += 1,
            Err(e) => {
                eprintln!("u/{}: {:#}", from_filename, e);
                failed += 1;
            }
        }
    }

    println!("embed personas");
    println!("  personas embedded: {}", embedded);
    println!("  failed: {}", failed);
    println!("  skipped: {}", skipped);
    println!("ok");

    Ok(())
}
