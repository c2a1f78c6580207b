//! Prompt and instruction templates for the recommendation assistant.
//!
//! Pure templating: render functions concatenate fixed fragments and
//! substitute placeholders. They are deterministic and carry no control
//! logic beyond iteration over the input.

use chrono::{DateTime, Utc};

/// System instructions attached to the assistant at creation time.
pub const ASSISTANT_INSTRUCTIONS: &str = r#"You are a book recommendation assistant for a children's digital library.

The library catalog is available to you through file search: one JSON object
per line with the fields book_id, title, and description. Treat it as the
only source of recommendable books.

When asked to analyze a reader's history, summarize their interests: favorite
topics, genres, reading level, and recurring themes. When asked to recommend
books, search the catalog for titles matching those interests and pick books
the reader has not already read.

Always deliver results by calling the recommend_books function. Keep
summaries short and concrete. Every recommended book must exist in the
catalog, with its book_id and title copied exactly."#;

/// Description of the `recommend_books` function in the tool schema.
pub const RECOMMEND_FUNCTION_DESCRIPTION: &str =
    "Deliver a reading-interest summary and, when recommending, an ordered \
     list of catalog books the reader is likely to enjoy.";

/// Description of the `recommendation_summary` schema field.
pub const SUMMARY_FIELD_DESCRIPTION: &str =
    "A short summary of the reader's interests: topics, genres, reading \
     level, and themes that stand out in their history.";

/// Description of the `recommended_books` schema field.
pub const BOOKS_FIELD_DESCRIPTION: &str =
    "Recommended books from the catalog, each with its book_id, title, and \
     the reason it fits this reader.";

/// One reading-history fragment, repeated per book.
const READING_HISTORY_RECORD: &str = "Reading time: {event_time}\n\
Book title: {title}\n\
Book description: {description}\n\n";

/// Prompt asking the assistant to analyze interests only.
const INTEREST_ANALYSIS_PROMPT: &str = "Here is a reader's recent reading history, newest first:\n\n\
{reading_history}\
Analyze this history and describe the reader's interests. Call the \
recommend_books function with only the recommendation_summary filled in; \
leave recommended_books empty.";

/// Prompt asking the assistant to search the catalog and recommend.
const RECOMMENDATION_PROMPT: &str = "Here is a reader's recent reading history, newest first:\n\n\
{reading_history}\
Search the library catalog for books that match this reader's interests \
and that do not appear in the history above. Call the recommend_books \
function with the recommendation_summary and the recommended_books list, \
best match first.";

/// Per-user console block printed after the analysis run.
pub const DEBUG_OUTPUT_TEMPLATE: &str = "User {user_id} interest summary:\n{summary}\n";

/// One book of rendered reading history.
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub event_time: DateTime<Utc>,
    pub title: String,
    pub description: String,
}

/// Concatenate one fragment per entry, preserving input order.
pub fn render_reading_history(entries: &[HistoryEntry]) -> String {
    let mut block = String::new();
    for entry in entries {
        block.push_str(
            &READING_HISTORY_RECORD
                .replace("{event_time}", &entry.event_time.to_rfc3339())
                .replace("{title}", &entry.title)
                .replace("{description}", &entry.description),
        );
    }
    block
}

pub fn interest_analysis_prompt(reading_history: &str) -> String {
    INTEREST_ANALYSIS_PROMPT.replace("{reading_history}", reading_history)
}

pub fn recommendation_prompt(reading_history: &str) -> String {
    RECOMMENDATION_PROMPT.replace("{reading_history}", reading_history)
}

pub fn debug_output(user_id: &str, summary: &str) -> String {
    DEBUG_OUTPUT_TEMPLATE
        .replace("{user_id}", user_id)
        .replace("{summary}", summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn entry(day: u32, title: &str) -> HistoryEntry {
        HistoryEntry {
            event_time: Utc.with_ymd_and_hms(2026, 3, day, 12, 0, 0).unwrap(),
            title: title.to_string(),
            description: format!("About {}.", title),
        }
    }

    #[test]
    fn three_entries_render_three_fragments() {
        let entries = vec![entry(10, "Space"), entry(8, "Dinosaurs"), entry(2, "Oceans")];
        let block = render_reading_history(&entries);
        assert_eq!(block.matches("Reading time:").count(), 3);
        assert_eq!(block.matches("Book title:").count(), 3);
    }

    #[test]
    fn fragments_preserve_input_order() {
        let entries = vec![entry(10, "Space"), entry(8, "Dinosaurs"), entry(2, "Oceans")];
        let block = render_reading_history(&entries);
        let space = block.find("Space").unwrap();
        let dinos = block.find("Dinosaurs").unwrap();
        let oceans = block.find("Oceans").unwrap();
        assert!(space < dinos && dinos < oceans);
    }

    #[test]
    fn empty_history_renders_empty_block() {
        assert_eq!(render_reading_history(&[]), "");
    }

    #[test]
    fn prompts_embed_the_history_block() {
        let block = render_reading_history(&[entry(10, "Space")]);
        let analysis = interest_analysis_prompt(&block);
        let search = recommendation_prompt(&block);
        assert!(analysis.contains("Book title: Space"));
        assert!(search.contains("Book title: Space"));
        assert!(!analysis.contains("{reading_history}"));
        assert!(!search.contains("{reading_history}"));
    }

    #[test]
    fn rendering_is_deterministic() {
        let entries = vec![entry(10, "Space"), entry(8, "Dinosaurs")];
        assert_eq!(
            render_reading_history(&entries),
            render_reading_history(&entries)
        );
    }

    #[test]
    fn debug_output_substitutes_both_fields() {
        let out = debug_output("u-77", "loves space");
        assert!(out.contains("u-77"));
        assert!(out.contains("loves space"));
    }
}
