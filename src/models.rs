//! Core data models used throughout Book Scout.
//!
//! These types represent the warehouse rows and assistant results that flow
//! through the recommendation pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One row of a user's reading history, joined against the book catalog.
#[derive(Debug, Clone)]
pub struct ReadingHistoryRecord {
    pub event_time: DateTime<Utc>,
    pub title: String,
    pub author: Option<String>,
    pub isbn: Option<String>,
    pub language_code: Option<String>,
    pub genre: Option<String>,
    pub publisher: Option<String>,
    pub word_count: Option<i64>,
    pub categories: Vec<String>,
    pub book_id: String,
}

/// A published catalog entry as exported to the retrieval index.
#[derive(Debug, Clone, Serialize)]
pub struct CatalogBook {
    pub book_id: String,
    pub title: String,
    pub description: String,
}

/// A user that cleared the activity threshold, with their event count.
#[derive(Debug, Clone)]
pub struct ActiveUser {
    pub user_id: String,
    pub activity_count: i64,
}

/// One recommended book extracted from the assistant's tool call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Recommendation {
    #[serde(default)]
    pub book_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub reason: String,
}
