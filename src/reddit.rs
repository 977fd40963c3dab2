//! Reddit API client.
//!
//! Authenticates with the OAuth2 client-credentials flow (script app) using
//! `REDDIT_CLIENT_ID`, `REDDIT_CLIENT_SECRET`, and `REDDIT_USER_AGENT` from
//! the environment, then talks to `oauth.reddit.com`.
//!
//! All rate limiting in subtext lives here: a configured minimum delay is
//! enforced between successive API calls. Callers never sleep or retry.

use anyhow::{bail, Context, Result};
use regex::Regex;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use crate::config::Config;
use crate::models::{Comment, ParentType, Submission, ThreadComment};

const TOKEN_URL: &str = "https://www.reddit.com/api/v1/access_token";
const OAUTH_BASE: &str = "https://oauth.reddit.com";

/// Extract the base-36 submission ID from a Reddit URL.
///
/// Accepts standard `reddit.com/r/<sub>/comments/<id>/...` URLs (with or
/// without `www.`/`old.`, trailing slash, query string) and `redd.it/<id>`
/// short links. Anything else, including user-profile URLs, is a fatal
/// error: a wrong guess here would analyze the wrong thread.
pub fn parse_submission_id(url: &str) -> Result<String> {
    let full = Regex::new(r"reddit\.com/r/[^/]+/comments/([A-Za-z0-9]+)").unwrap();
    if let Some(caps) = full.captures(url) {
        return Ok(caps[1].to_string());
    }

    let short = Regex::new(r"redd\.it/([A-Za-z0-9]+)").unwrap();
    if let Some(caps) = short.captures(url) {
        return Ok(caps[1].to_string());
    }

    bail!("Could not parse submission ID from URL: {}", url)
}

pub struct RedditClient {
    http: reqwest::Client,
    token: String,
    user_agent: String,
    max_comments: usize,
    min_delay: Duration,
    last_call: Mutex<Option<Instant>>,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Deserialize)]
struct ListingData {
    #[serde(default)]
    after: Option<String>,
    #[serde(default)]
    children: Vec<Child>,
}

#[derive(Deserialize)]
struct Child {
    kind: String,
    data: serde_json::Value,
}

#[derive(Deserialize)]
struct ApiComment {
    #[serde(default)]
    id: String,
    body: String,
    score: i64,
    subreddit: String,
    created_utc: f64,
    permalink: String,
    #[serde(default)]
    parent_id: String,
    #[serde(default)]
    author: Option<String>,
}

#[derive(Deserialize)]
struct ApiSubmission {
    id: String,
    title: String,
    #[serde(default)]
    selftext: String,
    subreddit: String,
    score: i64,
}

impl RedditClient {
    /// Authenticate and build a client. Credentials come from the
    /// environment; a missing variable is a fatal configuration error.
    pub async fn connect(config: &Config) -> Result<Self> {
        let client_id = std::env::var("REDDIT_CLIENT_ID")
            .map_err(|_| anyhow::anyhow!("REDDIT_CLIENT_ID environment variable not set"))?;
        let client_secret = std::env::var("REDDIT_CLIENT_SECRET")
            .map_err(|_| anyhow::anyhow!("REDDIT_CLIENT_SECRET environment variable not set"))?;
        let user_agent = std::env::var("REDDIT_USER_AGENT")
            .unwrap_or_else(|_| format!("subtext/{}", env!("CARGO_PKG_VERSION")));

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.reddit.timeout_secs))
            .build()?;

        let response = http
            .post(TOKEN_URL)
            .basic_auth(&client_id, Some(&client_secret))
            .header(reqwest::header::USER_AGENT, &user_agent)
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .context("Reddit token request failed")?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            bail!("Reddit authentication failed ({}): {}", status, text);
        }

        let token: TokenResponse = response
            .json()
            .await
            .context("Reddit token response was not valid JSON")?;

        Ok(Self {
            http,
            token: token.access_token,
            user_agent,
            max_comments: config.reddit.max_comments_per_user,
            min_delay: Duration::from_secs(config.reddit.rate_limit_secs),
            last_call: Mutex::new(None),
        })
    }

    /// Enforce the minimum delay between API calls.
    async fn throttle(&self) {
        let mut last = self.last_call.lock().await;
        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < self.min_delay {
                tokio::time::sleep(self.min_delay - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        self.throttle().await;

        let response = self
            .http
            .get(url)
            .query(query)
            .bearer_auth(&self.token)
            .header(reqwest::header::USER_AGENT, &self.user_agent)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            bail!("Reddit API error {}: {}", status, text);
        }

        Ok(response.json().await?)
    }

    /// Fetch a user's top comments, bounded by
    /// `reddit.max_comments_per_user`, following the listing cursor.
    pub async fn user_comments(&self, username: &str) -> Result<Vec<Comment>> {
        let mut comments: Vec<Comment> = Vec::new();
        let mut after: Option<String> = None;

        while comments.len() < self.max_comments {
            let page_size = (self.max_comments - comments.len()).min(100);
            let mut query = vec![
                ("sort", "top".to_string()),
                ("t", "all".to_string()),
                ("limit", page_size.to_string()),
                ("raw_json", "1".to_string()),
            ];
            if let Some(cursor) = &after {
                query.push(("after", cursor.clone()));
            }

            let listing: Listing = self
                .get_json(
                    &format!("{}/user/{}/comments", OAUTH_BASE, username),
                    &query,
                )
                .await
                .with_context(|| format!("Failed to fetch comments for {}", username))?;

            for child in &listing.data.children {
                if child.kind != "t1" {
                    continue;
                }
                if let Ok(api) = serde_json::from_value::<ApiComment>(child.data.clone()) {
                    comments.push(Comment {
                        body: api.body,
                        score: api.score,
                        subreddit: api.subreddit,
                        created_utc: api.created_utc as i64,
                        permalink: format!("https://reddit.com{}", api.permalink),
                        parent_type: Some(if api.parent_id.starts_with("t3_") {
                            ParentType::Post
                        } else {
                            ParentType::Comment
                        }),
                    });
                }
            }

            after = listing.data.after;
            if after.is_none() {
                break;
            }
        }

        comments.truncate(self.max_comments);
        Ok(comments)
    }

    /// Fetch post metadata for a submission URL.
    pub async fn submission(&self, url: &str) -> Result<Submission> {
        let id = parse_submission_id(url)?;
        let listings: Vec<Listing> = self
            .get_json(
                &format!("{}/comments/{}", OAUTH_BASE, id),
                &[("limit", "1".to_string()), ("raw_json", "1".to_string())],
            )
            .await
            .with_context(|| format!("Failed to fetch submission {}", id))?;

        let post = listings
            .first()
            .and_then(|l| l.data.children.first())
            .filter(|child| child.kind == "t3")
            .ok_or_else(|| anyhow::anyhow!("Submission {} not found in response", id))?;

        let api: ApiSubmission = serde_json::from_value(post.data.clone())
            .context("Unexpected submission payload shape")?;

        Ok(Submission {
            id: api.id,
            title: api.title,
            selftext: api.selftext,
            subreddit: api.subreddit,
            score: api.score,
            url: url.to_string(),
        })
    }

    /// Fetch only the top-level comments of a submission. Nested replies
    /// and "load more" stubs are skipped; deleted authors surface as
    /// `[deleted]`.
    pub async fn top_level_comments(&self, url: &str) -> Result<Vec<ThreadComment>> {
        let id = parse_submission_id(url)?;
        let listings: Vec<Listing> = self
            .get_json(
                &format!("{}/comments/{}", OAUTH_BASE, id),
                &[
                    ("limit", "100".to_string()),
                    ("depth", "1".to_string()),
                    ("sort", "top".to_string()),
                    ("raw_json", "1".to_string()),
                ],
            )
            .await
            .with_context(|| format!("Failed to fetch comments for submission {}", id))?;

        let mut comments = Vec::new();
        if let Some(listing) = listings.get(1) {
            for child in &listing.data.children {
                if child.kind != "t1" {
                    continue;
                }
                if let Ok(api) = serde_json::from_value::<ApiComment>(child.data.clone()) {
                    comments.push(ThreadComment {
                        id: api.id,
                        author: api.author.unwrap_or_else(|| "[deleted]".to_string()),
                        body: api.body,
                        score: api.score,
                        created_utc: api.created_utc as i64,
                        permalink: format!("https://reddit.com{}", api.permalink),
                    });
                }
            }
        }

        Ok(comments)
    }
}
