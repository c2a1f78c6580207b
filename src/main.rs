//! # Book Scout CLI (`scout`)
//!
//! The `scout` binary drives the recommendation batch job and its
//! supporting inspection commands.
//!
//! ## Usage
//!
//! ```bash
//! scout --config ./config/scout.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `scout recommend [USERS]` | Run the full batch for up to USERS users (default 1) |
//! | `scout export` | Write the published-book catalog as NDJSON |
//! | `scout users` | List recently active users with their event counts |
//! | `scout history <USER_ID>` | Show a user's recent distinct books |
//!
//! ## Environment
//!
//! `OPENAI_API_KEY` authenticates against the assistant service,
//! `WAREHOUSE_URL` is the warehouse DSN, `OPENAI_MODEL` optionally
//! overrides the configured model, and `RUST_LOG` tunes diagnostics.
//! A `.env` file in the working directory is honored.

mod activity;
mod assistant;
mod catalog;
mod config;
mod db;
mod lifecycle;
mod models;
mod prompts;
mod recommend;
mod run;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Book Scout — warehouse-driven personalized book recommendations via a
/// hosted assistant API.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file; every setting has a default, so an empty file is valid.
#[derive(Parser)]
#[command(
    name = "scout",
    about = "Book Scout — warehouse-driven book recommendations via a hosted assistant API",
    version,
    long_about = "Book Scout exports the published-book catalog from the warehouse into a \
    vendor-hosted retrieval index, then builds reading-history prompts for recently active \
    users and drives assistant runs that analyze their interests and recommend catalog books."
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/scout.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Run the recommendation batch.
    ///
    /// Exports the catalog, provisions the assistant and its retrieval
    /// index, processes users busiest-first, and always tears the
    /// assistant down afterwards — also when a step fails.
    Recommend {
        /// Maximum number of users to process.
        #[arg(default_value_t = 1)]
        users: usize,

        /// Render and print the prompts without calling the assistant
        /// service.
        #[arg(long)]
        dry_run: bool,
    },

    /// Write the published-book catalog as newline-delimited JSON.
    ///
    /// One object per book with the keys `book_id`, `title`, and
    /// `description` — the exact document uploaded into the retrieval
    /// index by `recommend`.
    Export {
        /// Output file; stdout when omitted.
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// List recently active users, busiest first.
    Users {
        /// Trailing activity window in days.
        #[arg(long)]
        window_days: Option<i32>,

        /// Minimum reading sessions inside the window.
        #[arg(long)]
        min_events: Option<i64>,
    },

    /// Show a user's most recent distinct books.
    History {
        /// Warehouse user id.
        user_id: String,

        /// Maximum number of books to show.
        #[arg(long)]
        limit: Option<i64>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = if cli.config.exists() {
        config::load_config(&cli.config)?
    } else {
        config::Config::minimal()
    };

    match cli.command {
        Commands::Recommend { users, dry_run } => {
            recommend::run_recommend(&cfg, users, dry_run).await?;
        }
        Commands::Export { output } => {
            let pool = db::connect(&cfg).await?;
            catalog::run_export(&pool, output.as_deref()).await?;
            pool.close().await;
        }
        Commands::Users {
            window_days,
            min_events,
        } => {
            let pool = db::connect(&cfg).await?;
            let users = activity::list_active_users(
                &pool,
                window_days.unwrap_or(cfg.activity.window_days),
                min_events.unwrap_or(cfg.activity.min_events),
            )
            .await?;
            for user in &users {
                println!("{}\t{}", user.user_id, user.activity_count);
            }
            eprintln!("{} active users", users.len());
            pool.close().await;
        }
        Commands::History { user_id, limit } => {
            let pool = db::connect(&cfg).await?;
            let books = activity::recent_books(
                &pool,
                &user_id,
                limit.unwrap_or(cfg.activity.history_limit),
            )
            .await?;
            for book in &books {
                println!(
                    "{}\t{}\t{}",
                    book.event_time.to_rfc3339(),
                    book.book_id,
                    book.title
                );
            }
            eprintln!("{} books for user {}", books.len(), user_id);
            pool.close().await;
        }
    }

    Ok(())
}
