//! Markdown codecs for comment archives and persona documents.
//!
//! Comment files are both the human-readable output of `subtext fetch` and
//! the structured input for `subtext embed`, so the writer and parser here
//! must agree on the layout exactly:
//!
//! ```text
//! # Reddit Comments Analysis: u/<username>
//!
//! **Generated:** 2025-01-01 12:00:00
//! **Total Comments:** 2
//!
//! ## r/<subreddit> (<n> comments)
//!
//! ### Comment (Score: <score>)
//! **Date:** YYYY-MM-DD
//! **Link:** [View on Reddit](<permalink>)
//!
//! <body>
//!
//! ---
//! ```
//!
//! The round trip is lossy on time-of-day (only the date is stored; parsed
//! comments carry local midnight) and lossless on body, score, subreddit,
//! and permalink. Bodies are written raw; they may contain arbitrary
//! markdown, and a block is terminated by the next `---` line or EOF.
//!
//! Persona documents are free-form LLM output; parsing them is best-effort
//! pattern extraction and never fails (missing fields come back empty).

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate, TimeZone};
use regex::Regex;
use std::path::Path;

use crate::models::{Comment, Persona};

/// Render a comment archive for one user, grouped by subreddit in
/// first-seen order, comments in input order within each group.
pub fn render_comments(comments: &[Comment], username: &str) -> String {
    let mut out = String::new();
    out.push_str(&format!("# Reddit Comments Analysis: u/{}\n\n", username));
    out.push_str(&format!(
        "**Generated:** {}\n",
        Local::now().format("%Y-%m-%d %H:%M:%S")
    ));
    out.push_str(&format!("**Total Comments:** {}\n\n", comments.len()));

    // Group by subreddit, preserving first-seen order.
    let mut order: Vec<&str> = Vec::new();
    for comment in comments {
        if !order.contains(&comment.subreddit.as_str()) {
            order.push(&comment.subreddit);
        }
    }

    for subreddit in order {
        let group: Vec<&Comment> = comments
            .iter()
            .filter(|c| c.subreddit == subreddit)
            .collect();
        out.push_str(&format!("## r/{} ({} comments)\n\n", subreddit, group.len()));

        for comment in group {
            let date = Local
                .timestamp_opt(comment.created_utc, 0)
                .earliest()
                .map(|dt| dt.format("%Y-%m-%d").to_string())
                .unwrap_or_default();

            out.push_str(&format!("### Comment (Score: {})\n", comment.score));
            out.push_str(&format!("**Date:** {}\n", date));
            out.push_str(&format!("**Link:** [View on Reddit]({})\n\n", comment.permalink));
            out.push_str(&format!("{}\n\n", comment.body));
            out.push_str("---\n\n");
        }
    }

    out
}

pub fn write_comments_file(path: &Path, comments: &[Comment], username: &str) -> Result<()> {
    let content = render_comments(comments, username);
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write comments file: {}", path.display()))?;
    Ok(())
}

/// Parse a comment archive back into structured comments.
///
/// Blocks that do not match the grammar, and blocks with no preceding
/// subreddit header, are silently dropped. Never errors on content.
pub fn parse_comments(content: &str) -> Vec<Comment> {
    let header_re = Regex::new(r"^## r/(\w+)").unwrap();
    let block_re = Regex::new(
        r"(?s)### Comment \(Score: (-?\d+)\)\n\*\*Date:\*\* (\d{4}-\d{2}-\d{2})\n\*\*Link:\*\* \[View on Reddit\]\((https://[^)]+)\)\n\n(.*)",
    )
    .unwrap();

    let mut comments = Vec::new();
    let mut current_subreddit: Option<String> = None;
    let mut section = String::new();

    let flush = |subreddit: &Option<String>, section: &str, comments: &mut Vec<Comment>| {
        let subreddit = match subreddit {
            Some(s) => s,
            None => return,
        };
        // A comment block ends at the next `---` line or EOF.
        for piece in section.split("\n---") {
            if let Some(caps) = block_re.captures(piece) {
                let score: i64 = match caps[1].parse() {
                    Ok(s) => s,
                    Err(_) => continue,
                };
                let created_utc = match parse_local_midnight(&caps[2]) {
                    Some(ts) => ts,
                    None => continue,
                };
                comments.push(Comment {
                    body: caps[4].trim().to_string(),
                    score,
                    subreddit: subreddit.clone(),
                    created_utc,
                    permalink: caps[3].to_string(),
                    parent_type: None,
                });
            }
        }
    };

    for line in content.lines() {
        if let Some(caps) = header_re.captures(line) {
            flush(&current_subreddit, &section, &mut comments);
            current_subreddit = Some(caps[1].to_string());
            section.clear();
        } else {
            section.push_str(line);
            section.push('\n');
        }
    }
    flush(&current_subreddit, &section, &mut comments);

    comments
}

pub fn parse_comments_file(path: &Path) -> Result<Vec<Comment>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read comments file: {}", path.display()))?;
    Ok(parse_comments(&content))
}

/// Local midnight of a `YYYY-MM-DD` date as a unix timestamp.
fn parse_local_midnight(date: &str) -> Option<i64> {
    let naive = NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()?;
    let midnight = naive.and_hms_opt(0, 0, 0)?;
    Local
        .from_local_datetime(&midnight)
        .earliest()
        .map(|dt| dt.timestamp())
        .or_else(|| Some(midnight.and_utc().timestamp()))
}

/// Extract the structured summary from a persona document.
///
/// Every field is best-effort: the archetype pattern matches the first
/// bolded phrase followed by a dash (`**The Sage** – ...`), and the top
/// subreddits come from the line after the `**Most Active Communities:**`
/// label. Missing fields come back empty; the full text is always retained.
pub fn parse_persona(content: &str) -> Persona {
    let username = Regex::new(r"# User Persona: u/(\w+)")
        .unwrap()
        .captures(content)
        .map(|caps| caps[1].to_string())
        .unwrap_or_default();

    let archetype = Regex::new(r"\*\*([^*]+)\*\* [–-] ")
        .unwrap()
        .captures(content)
        .map(|caps| caps[1].to_string())
        .unwrap_or_default();

    let top_subreddits = Regex::new(r"\*\*Most Active Communities:\*\*\s*([^\n]+)")
        .unwrap()
        .captures(content)
        .map(|caps| {
            Regex::new(r"r/(\w+)")
                .unwrap()
                .captures_iter(&caps[1])
                .map(|c| c[1].to_string())
                .collect()
        })
        .unwrap_or_default();

    Persona {
        username,
        archetype,
        top_subreddits,
        persona_text: content.to_string(),
    }
}

pub fn parse_persona_file(path: &Path) -> Result<Persona> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read persona file: {}", path.display()))?;
    Ok(parse_persona(&content))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn comment(body: &str, score: i64, subreddit: &str, created_utc: i64, permalink: &str) -> Comment {
        Comment {
            body: body.to_string(),
            score,
            subreddit: subreddit.to_string(),
            created_utc,
            permalink: permalink.to_string(),
            parent_type: None,
        }
    }

    #[test]
    fn test_round_trip_single_comment() {
        let input = vec![comment(
            "Great tip!",
            24,
            "productivity",
            1700000000,
            "https://reddit.com/r/productivity/comments/abc/x/c1/",
        )];

        let rendered = render_comments(&input, "TestUser");
        let parsed = parse_comments(&rendered);

        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].body, "Great tip!");
        assert_eq!(parsed[0].score, 24);
        assert_eq!(parsed[0].subreddit, "productivity");
        assert_eq!(
            parsed[0].permalink,
            "https://reddit.com/r/productivity/comments/abc/x/c1/"
        );
    }

    #[test]
    fn test_round_trip_preserves_date() {
        let input = vec![comment(
            "body",
            1,
            "rust",
            1700000000,
            "https://reddit.com/r/rust/comments/abc/x/c1/",
        )];

        let rendered = render_comments(&input, "user");
        let parsed = parse_comments(&rendered);

        // Lossy on time-of-day, lossless on date: both timestamps must fall
        // on the same local calendar day.
        let original_date = Local.timestamp_opt(1700000000, 0).unwrap().date_naive();
        let parsed_date = Local
            .timestamp_opt(parsed[0].created_utc, 0)
            .unwrap()
            .date_naive();
        assert_eq!(original_date, parsed_date);
    }

    #[test]
    fn test_round_trip_multiple_subreddits() {
        let input = vec![
            comment("first", 10, "rust", 1700000000, "https://reddit.com/r/rust/comments/a/x/c1/"),
            comment("second", -3, "python", 1700001000, "https://reddit.com/r/python/comments/b/x/c2/"),
            comment("third", 7, "rust", 1700002000, "https://reddit.com/r/rust/comments/c/x/c3/"),
        ];

        let rendered = render_comments(&input, "user");

        // Groups appear in first-seen order.
        let rust_pos = rendered.find("## r/rust (2 comments)").unwrap();
        let python_pos = rendered.find("## r/python (1 comments)").unwrap();
        assert!(rust_pos < python_pos);

        let parsed = parse_comments(&rendered);
        assert_eq!(parsed.len(), 3);

        let rust: Vec<_> = parsed.iter().filter(|c| c.subreddit == "rust").collect();
        assert_eq!(rust.len(), 2);
        assert_eq!(rust[0].body, "first");
        assert_eq!(rust[1].body, "third");

        let python: Vec<_> = parsed.iter().filter(|c| c.subreddit == "python").collect();
        assert_eq!(python.len(), 1);
        assert_eq!(python[0].score, -3);
    }

    #[test]
    fn test_round_trip_multiline_body() {
        let body = "First line.\n\nSecond paragraph with `code`.\n> a quote";
        let input = vec![comment(
            body,
            5,
            "rust",
            1700000000,
            "https://reddit.com/r/rust/comments/a/x/c1/",
        )];

        let parsed = parse_comments(&render_comments(&input, "user"));
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].body, body);
    }

    #[test]
    fn test_parse_negative_score() {
        let doc = "\
## r/test (1 comments)

### Comment (Score: -42)
**Date:** 2023-11-14
**Link:** [View on Reddit](https://reddit.com/r/test/comments/a/x/c1/)

downvoted

---
";
        let parsed = parse_comments(doc);
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].score, -42);
    }

    #[test]
    fn test_malformed_block_dropped() {
        let doc = "\
## r/test (2 comments)

### Comment (Score: ten)
**Date:** 2023-11-14
**Link:** [View on Reddit](https://reddit.com/r/test/comments/a/x/c1/)

not a number

---

### Comment (Score: 3)
**Date:** 2023-11-14
**Link:** [View on Reddit](https://reddit.com/r/test/comments/a/x/c2/)

valid

---
";
        let parsed = parse_comments(doc);
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].body, "valid");
    }

    #[test]
    fn test_block_without_subreddit_header_dropped() {
        let doc = "\
### Comment (Score: 3)
**Date:** 2023-11-14
**Link:** [View on Reddit](https://reddit.com/r/test/comments/a/x/c1/)

orphan

---
";
        assert!(parse_comments(doc).is_empty());
    }

    #[test]
    fn test_parse_empty_and_garbage_content() {
        assert!(parse_comments("").is_empty());
        assert!(parse_comments("just some prose\n\nwith paragraphs").is_empty());
    }

    #[test]
    fn test_parse_persona_full() {
        let doc = "\
# User Persona: u/TestUser

**Generated:** 2025-01-01 12:00:00

## Jungian Archetype
**The Sage** – seeks truth through analysis and sharing knowledge.

## Subreddit Activity Analysis
- **Most Active Communities:** r/rust (daily), r/programming (weekly), r/cpp
- **Community Role:** contributor
";
        let persona = parse_persona(doc);
        assert_eq!(persona.username, "TestUser");
        assert_eq!(persona.archetype, "The Sage");
        assert_eq!(persona.top_subreddits, vec!["rust", "programming", "cpp"]);
        assert_eq!(persona.persona_text, doc);
    }

    #[test]
    fn test_parse_persona_hyphen_archetype() {
        let doc = "**The Creator** - driven to build things of enduring value.";
        assert_eq!(parse_persona(doc).archetype, "The Creator");
    }

    #[test]
    fn test_parse_persona_missing_fields() {
        let doc = "The model went off script and wrote plain prose here.";
        let persona = parse_persona(doc);
        assert_eq!(persona.username, "");
        assert_eq!(persona.archetype, "");
        assert!(persona.top_subreddits.is_empty());
        assert_eq!(persona.persona_text, doc);
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("TestUser.md");

        let input = vec![comment(
            "Great tip!",
            24,
            "productivity",
            1700000000,
            "https://reddit.com/r/productivity/comments/abc/x/c1/",
        )];

        write_comments_file(&path, &input, "TestUser").unwrap();
        let parsed = parse_comments_file(&path).unwrap();

        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].subreddit, "productivity");
        assert_eq!(parsed[0].score, 24);
    }
}
