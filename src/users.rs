//! Username list file parsing.
//!
//! One username per line. Lines of the form `<index>→<username>` (a
//! numbered export format) keep only the part after the arrow. Blank lines
//! are skipped.

use anyhow::{Context, Result};
use std::path::Path;

pub fn parse_usernames(content: &str) -> Vec<String> {
    let mut usernames = Vec::new();

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some((_, name)) = line.split_once('→') {
            let name = name.trim();
            if !name.is_empty() {
                usernames.push(name.to_string());
            }
        } else {
            usernames.push(line.to_string());
        }
    }

    usernames
}

pub fn read_usernames_file(path: &Path) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read username file: {}", path.display()))?;
    Ok(parse_usernames(&content))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_usernames() {
        assert_eq!(parse_usernames("alice\nbob\n"), vec!["alice", "bob"]);
    }

    #[test]
    fn test_numbered_format() {
        assert_eq!(
            parse_usernames("1→alice\n2→bob\n"),
            vec!["alice", "bob"]
        );
    }

    #[test]
    fn test_mixed_with_blank_lines() {
        let content = "alice\n\n2→bob\n\n\ncarol\n";
        assert_eq!(parse_usernames(content), vec!["alice", "bob", "carol"]);
    }

    #[test]
    fn test_arrow_with_empty_name_skipped() {
        assert_eq!(parse_usernames("1→\nalice\n"), vec!["alice"]);
    }
}
