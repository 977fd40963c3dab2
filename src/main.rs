//! # subtext CLI
//!
//! The `subtext` binary drives the whole pipeline: fetch Reddit comment
//! histories, generate LLM personas, embed everything into Qdrant, then
//! search, ask, and run thread sentiment analysis.
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `subtext fetch <userfile>` | Fetch comment archives for listed users |
//! | `subtext personas` | Generate a persona per comment archive |
//! | `subtext embed` | Embed comments and personas into the vector store |
//! | `subtext search "<query>"` | Semantic search over embedded content |
//! | `subtext ask "<question>"` | Answer a question via RAG |
//! | `subtext sentiment <url>` | Score a thread's comments toward the post |
//!
//! All commands accept `--config` pointing to a TOML file; missing files
//! fall back to defaults (local Ollama and Qdrant endpoints).

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use subtext::{ask, config, embed_cmd, fetch, personas_cmd, search, sentiment_cmd};

/// subtext: Reddit user research with local LLMs.
#[derive(Parser)]
#[command(
    name = "subtext",
    about = "Reddit user research: comment histories, LLM personas, and RAG over a local vector store",
    version
)]
struct Cli {
    /// Path to configuration file (TOML). Defaults apply if absent.
    #[arg(long, global = true, default_value = "./config/subtext.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch Reddit comments for every user in USERFILE.
    ///
    /// Writes one markdown archive per user to the output directory.
    /// Users with an existing archive are skipped unless --force.
    /// Requires REDDIT_CLIENT_ID / REDDIT_CLIENT_SECRET in the environment.
    Fetch {
        /// File with one username per line (or `<n>→<username>` lines).
        userfile: PathBuf,

        /// Directory for the generated `<username>.md` archives.
        #[arg(long, short = 'o', default_value = "data/output")]
        output_dir: PathBuf,

        /// Re-fetch users that already have an archive.
        #[arg(long)]
        force: bool,
    },

    /// Generate a persona document for each comment archive.
    ///
    /// Reads every `<username>.md` in the input directory, prompts the LLM,
    /// and writes `<username>_persona.md` beside it. Users with an existing
    /// persona are skipped unless --force.
    Personas {
        /// Directory containing comment archives.
        #[arg(long, short = 'i', default_value = "data/output")]
        input_dir: PathBuf,

        /// Regenerate personas that already exist.
        #[arg(long)]
        force: bool,
    },

    /// Embed comment archives and personas into the vector store.
    ///
    /// Parses the markdown back into structured records and upserts them
    /// into Qdrant with deterministic IDs, so re-running is idempotent.
    Embed {
        /// Directory containing comment archives and persona files.
        #[arg(long, short = 'i', default_value = "data/output")]
        input_dir: PathBuf,

        /// Which collection to populate: comments, personas, or all.
        #[arg(long, default_value = "all")]
        collection: String,

        /// Re-embed users whose vectors already exist.
        #[arg(long)]
        force: bool,
    },

    /// Semantic search over embedded comments or personas.
    Search {
        /// The search query.
        query: String,

        /// Collection to search: comments or personas.
        #[arg(long, default_value = "comments")]
        collection: String,

        /// Maximum number of results.
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },

    /// Answer a free-text question using retrieved comments and personas.
    Ask {
        /// The question to answer.
        question: String,

        /// Number of comment hits to retrieve as context.
        #[arg(long, default_value_t = 5)]
        limit: usize,
    },

    /// Analyze sentiment of a thread's top-level comments toward the post.
    ///
    /// Accepts any Reddit submission URL (including redd.it short links)
    /// and prints a shortlist sorted most-positive first.
    Sentiment {
        /// Reddit submission URL.
        url: String,

        /// Also write the full results as JSON to this path.
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config_or_default(&cli.config)?;

    match cli.command {
        Commands::Fetch {
            userfile,
            output_dir,
            force,
        } => {
            fetch::run_fetch(&cfg, &userfile, &output_dir, force).await?;
        }
        Commands::Personas { input_dir, force } => {
            personas_cmd::run_personas(&cfg, &input_dir, force).await?;
        }
        Commands::Embed {
            input_dir,
            collection,
            force,
        } => {
            embed_cmd::run_embed(&cfg, &input_dir, &collection, force).await?;
        }
        Commands::Search {
            query,
            collection,
            limit,
        } => {
            search::run_search(&cfg, &query, &collection, limit).await?;
        }
        Commands::Ask { question, limit } => {
            ask::run_ask(&cfg, &question, limit).await?;
        }
        Commands::Sentiment { url, output } => {
            sentiment_cmd::run_sentiment(&cfg, &url, output.as_deref()).await?;
        }
    }

    Ok(())
}
