//! Batch orchestration for the recommendation job.
//!
//! Sequence: export catalog → provision assistant → per-user analysis and
//! search runs → teardown. Teardown runs exactly once, on the normal path
//! and on the error path, so the assistant never outlives the job.

use anyhow::Result;
use sqlx::PgPool;

use crate::activity;
use crate::assistant::AssistantClient;
use crate::catalog;
use crate::config::Config;
use crate::db;
use crate::lifecycle;
use crate::prompts::{self, HistoryEntry};
use crate::run;

/// Run the full batch for up to `max_users` users.
pub async fn run_recommend(config: &Config, max_users: usize, dry_run: bool) -> Result<()> {
    let pool = db::connect(config).await?;

    if dry_run {
        let result = render_prompts_only(config, &pool, max_users).await;
        pool.close().await;
        return result;
    }

    let catalog_file = catalog::export_catalog(&pool).await?;
    println!("Catalog document created at: {}", catalog_file.path().display());

    let client = AssistantClient::from_env(&config.assistant)?;
    let model = config.assistant.resolved_model();
    let assistant_id = lifecycle::provision(&client, &model, catalog_file.path()).await?;

    // The document is indexed vendor-side now; the local copy can go.
    drop(catalog_file);

    println!("Processing up to {} users...", max_users);
    let result = process_users(config, &pool, &client, &assistant_id, max_users).await;

    println!("\nCleaning up...");
    lifecycle::teardown(&client, &assistant_id).await;
    pool.close().await;

    result
}

async fn process_users(
    config: &Config,
    pool: &PgPool,
    client: &AssistantClient,
    assistant_id: &str,
    max_users: usize,
) -> Result<()> {
    let users = activity::list_active_users(
        pool,
        config.activity.window_days,
        config.activity.min_events,
    )
    .await?;

    for user in users.iter().take(max_users) {
        let reading_history = build_reading_history(config, pool, &user.user_id).await?;

        let summary =
            run::analyze_user_interest(client, &config.assistant, assistant_id, &reading_history)
                .await?;
        println!("{}", prompts::debug_output(&user.user_id, &summary));

        let recommendations =
            run::search_books_by_interest(client, &config.assistant, assistant_id, &reading_history)
                .await?;

        println!("User may like these books:");
        for book in &recommendations {
            println!(
                "- {}/{}\n  Title: {}\n  Reason: {}\n",
                config.output.library_url_base, book.book_id, book.title, book.reason
            );
        }
    }

    Ok(())
}

/// Fetch a user's recent books and render the prompt history block.
async fn build_reading_history(config: &Config, pool: &PgPool, user_id: &str) -> Result<String> {
    let books = activity::recent_books(pool, user_id, config.activity.history_limit).await?;
    println!("User {} has read {} books:", user_id, books.len());

    let mut entries = Vec::with_capacity(books.len());
    for book in books {
        let description = activity::book_description(pool, &book.book_id).await?;
        entries.push(HistoryEntry {
            event_time: book.event_time,
            title: book.title,
            description,
        });
    }

    Ok(prompts::render_reading_history(&entries))
}

/// `--dry-run`: render and print the prompts without touching the
/// assistant service.
async fn render_prompts_only(config: &Config, pool: &PgPool, max_users: usize) -> Result<()> {
    let users = activity::list_active_users(
        pool,
        config.activity.window_days,
        config.activity.min_events,
    )
    .await?;

    println!("recommend (dry-run)");
    println!("  active users: {}", users.len());

    for user in users.iter().take(max_users) {
        let reading_history = build_reading_history(config, pool, &user.user_id).await?;
        println!("--- analysis prompt for {} ---", user.user_id);
        println!("{}", prompts::interest_analysis_prompt(&reading_history));
        println!("--- recommendation prompt for {} ---", user.user_id);
        println!("{}", prompts::recommendation_prompt(&reading_history));
    }

    Ok(())
}
