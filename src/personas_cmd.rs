//! The `subtext personas` command.
//!
//! Generates one persona document per comment archive found in the input
//! directory. Failures are reported per user without aborting the run.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::llm::OllamaClient;
use crate::persona::PersonaGenerator;

/// Suffix test for persona documents, case-insensitive so files written
/// under either historical casing (`_persona.md` / `_Persona.md`) match.
pub fn is_persona_file(file_name: &str) -> bool {
    file_name.to_lowercase().ends_with("_persona.md")
}

/// List comment archives (`<username>.md`) in `dir`, excluding persona
/// documents, sorted for deterministic processing order.
pub fn comment_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read input directory: {}", dir.display()))?;

    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        let name = match path.file_name().and_then(|n| n.to_str()) {
            Some(n) => n.to_string(),
            None => continue,
        };
        if path.is_file() && name.ends_with(".md") && !is_persona_file(&name) {
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}

pub async fn run_personas(config: &Config, input_dir: &Path, force: bool) -> Result<()> {
    let files = comment_files(input_dir)?;
    if files.is_empty() {
        println!("No comment files found in {}", input_dir.display());
        return Ok(());
    }
    println!("Found {} comment files", files.len());

    let mut to_analyze = Vec::new();
    let mut skipped = 0usize;
    for file in files {
        let username = match file.file_stem().and_then(|s| s.to_str()) {
            Some(s) => s.to_string(),
            None => continue,
        };
        let persona_path = input_dir.join(format!("{}_persona.md", username));
        if !force && persona_path.exists() {
            skipped += 1;
        } else {
            to_analyze.push((username, file, persona_path));
        }
    }

    if skipped > 0 {
        println!("Skipping {} users with existing personas", skipped);
    }
    if to_analyze.is_empty() {
        println!("All users already have personas.");
        return Ok(());
    }

    let llm = OllamaClient::new(config)?;
    let generator = PersonaGenerator::new(config);

    let mut generated = 0usize;
    let mut failed = 0usize;

    for (username, comment_file, persona_path) in &to_analyze {
        let result = async {
            let comments_content = std::fs::read_to_string(comment_file)
                .with_context(|| format!("Failed to read {}", comment_file.display()))?;
            let doc = generator.generate(&llm, username, &comments_content).await?;
            std::fs::write(persona_path, doc)
                .with_context(|| format!("Failed to write {}", persona_path.display()))?;
            Ok::<(), anyhow::Error>(())
        }
        .await;

        match result {
            Ok(()) => {
                println!("u/{}: persona generated", username);
                generated += 1;
            }
            Err(e) => {
                eprintln!("u/{}: {:#}", username, e);
                failed += 1;
            }
        }
    }

    println!("personas");
    println!("  generated: {}", generated);
    println!("  failed: {}", failed);
    println!("  skipped: {}", skipped);
    println!("ok");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_persona_file_both_casings() {
        assert!(is_persona_file("alice_persona.md"));
        assert!(is_persona_file("alice_Persona.md"));
        assert!(!is_persona_file("alice.md"));
        assert!(!is_persona_file("persona_notes.md"));
    }

    #[test]
    fn test_comment_files_excludes_personas() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("alice.md"), "x").unwrap();
        std::fs::write(dir.path().join("bob.md"), "x").unwrap();
        std::fs::write(dir.path().join("alice_persona.md"), "x").unwrap();
        std::fs::write(dir.path().join("bob_Persona.md"), "x").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "x").unwrap();

        let files = comment_files(dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["alice.md", "bob.md"]);
    }
}
