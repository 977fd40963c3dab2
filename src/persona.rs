//! Persona synthesis from a user's comment history.
//!
//! Feeds the raw comment markdown to the LLM with a structured prompt and
//! wraps the cleaned response in a titled persona document. The prompt asks
//! for specific markdown sections (summary, communication style, Jungian
//! archetype, most active communities) that the persona codec later
//! extracts best-effort.

use anyhow::{Context, Result};
use chrono::Local;
use regex::Regex;

use crate::config::Config;
use crate::llm::LlmClient;

/// The 12 Jungian archetype labels the model must choose from.
pub const ARCHETYPES: [&str; 12] = [
    "The Innocent",
    "The Everyman",
    "The Hero",
    "The Caregiver",
    "The Explorer",
    "The Rebel",
    "The Lover",
    "The Creator",
    "The Jester",
    "The Sage",
    "The Magician",
    "The Ruler",
];

pub struct PersonaGenerator {
    temperature: f64,
}

impl PersonaGenerator {
    pub fn new(config: &Config) -> Self {
        Self {
            temperature: config.ollama.temperature,
        }
    }

    /// Generate a persona document for `username` from their comment
    /// markdown. Returns the full document including the title header and
    /// generation timestamp.
    pub async fn generate(
        &self,
        llm: &dyn LlmClient,
        username: &str,
        comments_markdown: &str,
    ) -> Result<String> {
        let prompt = build_prompt(username, comments_markdown);

        let raw = llm
            .generate(&prompt, self.temperature)
            .await
            .with_context(|| format!("Failed to generate persona for {}", username))?;

        let cleaned = clean_response(&raw);

        let mut doc = format!("# User Persona: u/{}\n\n", username);
        doc.push_str(&format!(
            "**Generated:** {}\n\n",
            Local::now().format("%Y-%m-%d %H:%M:%S")
        ));
        doc.push_str(&cleaned);
        Ok(doc)
    }
}

/// Strip reasoning-model `<think>` blocks and collapse runs of blank lines.
fn clean_response(response: &str) -> String {
    let without_think = Regex::new(r"(?s)<think>.*?</think>")
        .unwrap()
        .replace_all(response, "");
    Regex::new(r"\n\s*\n\s*\n")
        .unwrap()
        .replace_all(&without_think, "\n\n")
        .trim()
        .to_string()
}

fn build_prompt(username: &str, comments_content: &str) -> String {
    format!(
        r#"
Analyze the Reddit comments below for user u/{username} and create a comprehensive user persona.

REDDIT COMMENTS DATA:
{comments_content}

Please provide a structured analysis in the following format:

## User Persona Summary
Write 2-3 sentences describing this user's overall personality and online presence.

## Demographics & Background
- **Likely Age Range:** [age range with reasoning]
- **Possible Occupation/Field:** [based on language, interests, time patterns]
- **Technical Level:** [beginner/intermediate/advanced in tech topics]

## Communication Style
- **Tone:** [formal/casual/humorous/technical/etc.]
- **Language Patterns:** [specific phrases, technical jargon, emotional expressions]
- **Engagement Style:** [how they interact - helpful, argumentative, supportive, etc.]

## Interests & Topics
List the main topics this user discusses and seems passionate about.

## Jungian Archetype
Choose the most fitting archetype from: {archetypes}
Explain why this archetype fits and what it means for engagement.

## Subreddit Activity Analysis
- **Most Active Communities:** [list top subreddits with engagement patterns]
- **Community Role:** [lurker/contributor/expert/newcomer in each community]

## Engagement Recommendations
- **Content Types:** [what kind of posts would appeal - memes, tutorials, discussions, etc.]
- **Communication Approach:** [how to talk to them - technical depth, humor style, etc.]
- **Best Subreddits to Reach Similar Users:** [where to find people like them]

Base your analysis only on the provided comments. Be specific and actionable in recommendations.
"#,
        username = username,
        comments_content = comments_content,
        archetypes = ARCHETYPES.join(", "),
    )
}
