//! Warehouse queries over user reading activity.
//!
//! Every function is one warehouse round-trip with no caching; errors
//! propagate to the caller and abort the batch. All parameters are bound,
//! never interpolated into the SQL text.

use anyhow::Result;
use sqlx::types::Json;
use sqlx::{PgPool, Row};

use crate::models::{ActiveUser, ReadingHistoryRecord};

/// Users with at least `min_events` reading sessions in the trailing
/// `window_days`, busiest first.
pub async fn list_active_users(
    pool: &PgPool,
    window_days: i32,
    min_events: i64,
) -> Result<Vec<ActiveUser>> {
    let rows = sqlx::query(
        "SELECT user_id, COUNT(*) AS activity_count \
         FROM reading_sessions \
         WHERE event_time >= NOW() - make_interval(days => $1) \
         GROUP BY user_id \
         HAVING COUNT(*) >= $2 \
         ORDER BY activity_count DESC",
    )
    .bind(window_days)
    .bind(min_events)
    .fetch_all(pool)
    .await?;

    let users = rows
        .iter()
        .map(|row| ActiveUser {
            user_id: row.get("user_id"),
            activity_count: row.get("activity_count"),
        })
        .collect();

    Ok(users)
}

/// The most recent distinct books a user interacted with, newest first.
///
/// One row per `book_id` — the latest session wins via the window rank —
/// capped at `limit`.
pub async fn recent_books(
    pool: &PgPool,
    user_id: &str,
    limit: i64,
) -> Result<Vec<ReadingHistoryRecord>> {
    let rows = sqlx::query(
        "WITH ranked AS ( \
             SELECT s.event_time, b.title, b.author, b.isbn, b.language_code, \
                    b.genre, b.publisher, b.word_count, b.categories, b.book_id, \
                    ROW_NUMBER() OVER (PARTITION BY b.book_id ORDER BY s.event_time DESC) AS rn \
             FROM reading_sessions s \
             JOIN books_list b ON s.book_id = b.book_id \
             WHERE s.user_id = $1 \
         ) \
         SELECT event_time, title, author, isbn, language_code, genre, \
                publisher, word_count, categories, book_id \
         FROM ranked WHERE rn = 1 \
         ORDER BY event_time DESC \
         LIMIT $2",
    )
    .bind(user_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    let books = rows
        .iter()
        .map(|row| {
            let categories: Option<Json<Vec<String>>> = row.get("categories");
            ReadingHistoryRecord {
                event_time: row.get("event_time"),
                title: row.get("title"),
                author: row.get("author"),
                isbn: row.get("isbn"),
                language_code: row.get("language_code"),
                genre: row.get("genre"),
                publisher: row.get("publisher"),
                word_count: row.get("word_count"),
                categories: categories.map(|c| c.0).unwrap_or_default(),
                book_id: row.get("book_id"),
            }
        })
        .collect();

    Ok(books)
}

/// Long-form description for one catalog entry, empty when not published.
pub async fn book_description(pool: &PgPool, book_id: &str) -> Result<String> {
    let row = sqlx::query("SELECT description FROM published_books WHERE book_id = $1")
        .bind(book_id)
        .fetch_optional(pool)
        .await?;

    Ok(row.map(|r| r.get("description")).unwrap_or_default())
}
