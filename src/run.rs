//! Run driver: drives one assistant run to a terminal state.
//!
//! The service owns the run lifecycle; this module only observes it by
//! polling at a fixed interval and reacts to the one tool-call contract in
//! play. The model computes everything — the tool output is an echo of the
//! arguments the model already supplied.

use anyhow::{Context, Result};
use regex::Regex;
use serde::Deserialize;
use std::sync::OnceLock;
use std::time::Duration;

use crate::assistant::{AssistantClient, RunState, ToolOutput};
use crate::config::AssistantConfig;
use crate::models::Recommendation;
use crate::prompts;

const RECOMMEND_TOOL: &str = "recommend_books";

/// Which of the two per-user runs is being driven. Controls the tool-output
/// echo: an analysis run echoes only the summary, a search run echoes the
/// summary and the book list.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RunKind {
    Analysis,
    Search,
}

/// Arguments captured from the model's `recommend_books` call.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecommendArgs {
    #[serde(default)]
    pub recommendation_summary: String,
    #[serde(default)]
    pub recommended_books: Vec<Recommendation>,
}

/// Terminal result of a driven run.
#[derive(Debug)]
pub enum RunOutcome {
    /// The run completed; carries the last captured tool arguments.
    Completed(RecommendArgs),
    /// The run ended without completing (`failed`, `cancelled`, ...).
    Ended(String),
}

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    /// No terminal state was observed within the configured timeout.
    #[error("run did not reach a terminal state within {0:?}")]
    Timeout(Duration),
    #[error(transparent)]
    Api(#[from] anyhow::Error),
}

/// Poll a run until it reaches a terminal state, answering tool calls.
pub async fn drive_run(
    client: &AssistantClient,
    thread_id: &str,
    run_id: &str,
    kind: RunKind,
    poll_interval: Duration,
    timeout: Duration,
) -> Result<RunOutcome, RunError> {
    let deadline = tokio::time::Instant::now() + timeout;
    let mut captured = RecommendArgs::default();

    loop {
        if tokio::time::Instant::now() >= deadline {
            return Err(RunError::Timeout(timeout));
        }

        let state = client.run_state(thread_id, run_id).await?;

        match state {
            RunState::Completed => return Ok(RunOutcome::Completed(captured)),
            RunState::Ended { status } => return Ok(RunOutcome::Ended(status)),
            RunState::RequiresAction { tool_calls } => {
                let mut outputs = Vec::with_capacity(tool_calls.len());
                for call in tool_calls {
                    if call.name == RECOMMEND_TOOL {
                        captured = parse_tool_args(&call.arguments);
                        outputs.push(ToolOutput {
                            tool_call_id: call.id,
                            output: echo_output(kind, &captured),
                        });
                    } else {
                        tracing::debug!(name = %call.name, "answering unknown tool call");
                        outputs.push(ToolOutput {
                            tool_call_id: call.id,
                            output: "{}".to_string(),
                        });
                    }
                }
                if !outputs.is_empty() {
                    client.submit_tool_outputs(thread_id, run_id, outputs).await?;
                }
            }
            RunState::InProgress { status } => {
                tracing::debug!(%status, "run in progress");
            }
        }

        tokio::time::sleep(poll_interval).await;
    }
}

/// Parse the model-supplied tool arguments, tolerating missing fields.
fn parse_tool_args(arguments: &str) -> RecommendArgs {
    serde_json::from_str(arguments).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "malformed tool arguments, treating as empty");
        RecommendArgs::default()
    })
}

/// The no-op echo submitted back as the tool's output.
fn echo_output(kind: RunKind, args: &RecommendArgs) -> String {
    let value = match kind {
        RunKind::Analysis => serde_json::json!({
            "recommendation_summary": args.recommendation_summary,
        }),
        RunKind::Search => serde_json::json!({
            "recommendation_summary": args.recommendation_summary,
            "recommended_books": args.recommended_books,
        }),
    };
    value.to_string()
}

/// Run the interest-analysis conversation for one user.
///
/// Returns the captured summary, or empty text when the run ends without
/// completing or times out — non-completion is never an error here.
pub async fn analyze_user_interest(
    client: &AssistantClient,
    config: &AssistantConfig,
    assistant_id: &str,
    reading_history: &str,
) -> Result<String> {
    let prompt = prompts::interest_analysis_prompt(reading_history);
    let outcome = run_prompt(client, config, assistant_id, &prompt, RunKind::Analysis, None).await;

    match outcome {
        Ok(RunOutcome::Completed(args)) => Ok(args.recommendation_summary),
        Ok(RunOutcome::Ended(status)) => {
            tracing::warn!(%status, "interest analysis run did not complete");
            Ok(String::new())
        }
        Err(RunError::Timeout(waited)) => {
            tracing::warn!(?waited, "interest analysis run timed out");
            Ok(String::new())
        }
        Err(RunError::Api(e)) => Err(e),
    }
}

/// Run the catalog-search conversation for one user.
///
/// Returns the recommended books with citation markers stripped, or an
/// empty list when the run ends without completing or times out.
pub async fn search_books_by_interest(
    client: &AssistantClient,
    config: &AssistantConfig,
    assistant_id: &str,
    reading_history: &str,
) -> Result<Vec<Recommendation>> {
    let prompt = prompts::recommendation_prompt(reading_history);
    let tool_choice = Some(serde_json::json!({ "type": "file_search" }));
    let outcome =
        run_prompt(client, config, assistant_id, &prompt, RunKind::Search, tool_choice).await;

    match outcome {
        Ok(RunOutcome::Completed(args)) => Ok(args
            .recommended_books
            .into_iter()
            .map(|book| Recommendation {
                book_id: book.book_id,
                title: strip_citations(&book.title),
                reason: strip_citations(&book.reason),
            })
            .collect()),
        Ok(RunOutcome::Ended(status)) => {
            tracing::warn!(%status, "recommendation run did not complete");
            Ok(Vec::new())
        }
        Err(RunError::Timeout(waited)) => {
            tracing::warn!(?waited, "recommendation run timed out");
            Ok(Vec::new())
        }
        Err(RunError::Api(e)) => Err(e),
    }
}

/// Open a thread, submit the prompt, start a run, and drive it.
async fn run_prompt(
    client: &AssistantClient,
    config: &AssistantConfig,
    assistant_id: &str,
    prompt: &str,
    kind: RunKind,
    tool_choice: Option<serde_json::Value>,
) -> Result<RunOutcome, RunError> {
    let thread_id = client.create_thread().await.context("Failed to create thread")?;
    client
        .add_user_message(&thread_id, prompt)
        .await
        .context("Failed to submit prompt")?;
    let run_id = client
        .create_run(&thread_id, assistant_id, tool_choice)
        .await
        .context("Failed to start run")?;

    drive_run(
        client,
        &thread_id,
        &run_id,
        kind,
        Duration::from_secs(config.poll_interval_secs),
        Duration::from_secs(config.run_timeout_secs),
    )
    .await
}

/// Remove `【N:M†source】` citation markers injected by file search.
///
/// Idempotent: surrounding text is preserved, only the markers go.
pub fn strip_citations(text: &str) -> String {
    static CITATION: OnceLock<Regex> = OnceLock::new();
    let re = CITATION.get_or_init(|| Regex::new(r"【\d+:\d+†source】").unwrap());
    re.replace_all(text, "").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_removes_marker_and_keeps_surrounding_text() {
        assert_eq!(
            strip_citations("Great book 【3:1†source】 for kids"),
            "Great book  for kids"
        );
    }

    #[test]
    fn strip_is_idempotent() {
        let once = strip_citations("Great book 【3:1†source】 for kids");
        assert_eq!(strip_citations(&once), once);
    }

    #[test]
    fn strip_handles_multiple_markers() {
        assert_eq!(
            strip_citations("A【1:2†source】B【10:42†source】C"),
            "ABC"
        );
    }

    #[test]
    fn strip_leaves_plain_text_alone() {
        assert_eq!(strip_citations("No citations here"), "No citations here");
    }

    #[test]
    fn strip_trims_marker_only_text_to_empty() {
        assert_eq!(strip_citations("【3:1†source】"), "");
    }

    #[test]
    fn parse_tool_args_tolerates_missing_books() {
        let args = parse_tool_args(r#"{"recommendation_summary": "space"}"#);
        assert_eq!(args.recommendation_summary, "space");
        assert!(args.recommended_books.is_empty());
    }

    #[test]
    fn parse_tool_args_tolerates_garbage() {
        let args = parse_tool_args("not json");
        assert_eq!(args.recommendation_summary, "");
        assert!(args.recommended_books.is_empty());
    }

    #[test]
    fn analysis_echo_omits_books() {
        let args = RecommendArgs {
            recommendation_summary: "space".to_string(),
            recommended_books: vec![Recommendation {
                book_id: "bk-1".to_string(),
                title: "Stars".to_string(),
                reason: "space".to_string(),
            }],
        };
        let echo: serde_json::Value =
            serde_json::from_str(&echo_output(RunKind::Analysis, &args)).unwrap();
        assert_eq!(echo["recommendation_summary"], "space");
        assert!(echo.get("recommended_books").is_none());
    }

    #[test]
    fn search_echo_carries_summary_and_books() {
        let args = RecommendArgs {
            recommendation_summary: "space".to_string(),
            recommended_books: vec![Recommendation {
                book_id: "bk-1".to_string(),
                title: "Stars".to_string(),
                reason: "space".to_string(),
            }],
        };
        let echo: serde_json::Value =
            serde_json::from_str(&echo_output(RunKind::Search, &args)).unwrap();
        assert_eq!(echo["recommendation_summary"], "space");
        assert_eq!(echo["recommended_books"][0]["book_id"], "bk-1");
    }
}
