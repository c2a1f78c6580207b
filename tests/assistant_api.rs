//! Assistant API client and run-driver tests against a mock HTTP server.

use std::io::Write;
use std::time::Duration;

use book_scout::assistant::{AssistantClient, ToolOutput};
use book_scout::config::AssistantConfig;
use book_scout::lifecycle;
use book_scout::run::{self, RunError, RunKind, RunOutcome};

fn test_config(server: &mockito::Server) -> AssistantConfig {
    AssistantConfig {
        base_url: server.url(),
        max_retries: 1,
        timeout_secs: 5,
        poll_interval_secs: 1,
        run_timeout_secs: 2,
        ..Default::default()
    }
}

fn client_for(server: &mockito::Server) -> AssistantClient {
    AssistantClient::new("test-key".to_string(), &test_config(server)).unwrap()
}

#[tokio::test]
async fn create_vector_store_returns_id() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/vector_stores")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"id": "vs_1", "name": "Library Catalog"}"#)
        .create_async()
        .await;

    let client = client_for(&server);
    let id = client.create_vector_store("Library Catalog").await.unwrap();
    assert_eq!(id, "vs_1");
    mock.assert_async().await;
}

#[tokio::test]
async fn retries_on_server_error() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/threads")
        .with_status(500)
        .expect(2)
        .create_async()
        .await;

    let client = client_for(&server);
    let result = client.create_thread().await;
    assert!(result.is_err());
    mock.assert_async().await;
}

#[tokio::test]
async fn fails_fast_on_client_error() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/threads")
        .with_status(400)
        .with_body("Bad Request")
        .expect(1)
        .create_async()
        .await;

    let client = client_for(&server);
    let result = client.create_thread().await;
    assert!(result.is_err());
    assert!(result.unwrap_err().to_string().contains("400"));
    mock.assert_async().await;
}

#[tokio::test]
async fn drive_run_returns_completed_outcome() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/threads/thread_1/runs/run_1")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"id": "run_1", "status": "completed"}"#)
        .create_async()
        .await;

    let client = client_for(&server);
    let outcome = run::drive_run(
        &client,
        "thread_1",
        "run_1",
        RunKind::Analysis,
        Duration::from_millis(10),
        Duration::from_millis(500),
    )
    .await
    .unwrap();

    assert!(matches!(outcome, RunOutcome::Completed(_)));
}

#[tokio::test]
async fn drive_run_times_out_on_stuck_run() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/threads/thread_1/runs/run_1")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"id": "run_1", "status": "in_progress"}"#)
        .expect_at_least(1)
        .create_async()
        .await;

    let client = client_for(&server);
    let result = run::drive_run(
        &client,
        "thread_1",
        "run_1",
        RunKind::Search,
        Duration::from_millis(10),
        Duration::from_millis(100),
    )
    .await;

    assert!(matches!(result, Err(RunError::Timeout(_))));
}

async fn thread_flow_mocks(server: &mut mockito::Server, terminal_status: &str) -> mockito::Mock {
    server
        .mock("POST", "/threads")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"id": "thread_1"}"#)
        .create_async()
        .await;
    server
        .mock("POST", "/threads/thread_1/messages")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"id": "msg_1"}"#)
        .create_async()
        .await;
    server
        .mock("POST", "/threads/thread_1/runs")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"id": "run_1", "status": "queued"}"#)
        .create_async()
        .await;
    server
        .mock("GET", "/threads/thread_1/runs/run_1")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(format!(r#"{{"id": "run_1", "status": "{}"}}"#, terminal_status))
        .expect_at_least(1)
        .create_async()
        .await
}

#[tokio::test]
async fn failed_analysis_run_yields_empty_summary() {
    let mut server = mockito::Server::new_async().await;
    thread_flow_mocks(&mut server, "failed").await;

    let client = client_for(&server);
    let summary = run::analyze_user_interest(
        &client,
        &test_config(&server),
        "asst_1",
        "Reading time: 2026-03-10\nBook title: Space\n",
    )
    .await
    .unwrap();

    assert_eq!(summary, "");
}

#[tokio::test]
async fn cancelled_search_run_yields_empty_list() {
    let mut server = mockito::Server::new_async().await;
    thread_flow_mocks(&mut server, "cancelled").await;

    let client = client_for(&server);
    let books = run::search_books_by_interest(
        &client,
        &test_config(&server),
        "asst_1",
        "Reading time: 2026-03-10\nBook title: Space\n",
    )
    .await
    .unwrap();

    assert!(books.is_empty());
}

#[tokio::test]
async fn submit_tool_outputs_echoes_call_id_and_output() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/threads/thread_1/runs/run_1/submit_tool_outputs")
        .match_body(mockito::Matcher::PartialJson(serde_json::json!({
            "tool_outputs": [
                { "tool_call_id": "call_1", "output": "{}" }
            ]
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"id": "run_1", "status": "queued"}"#)
        .create_async()
        .await;

    let client = client_for(&server);
    client
        .submit_tool_outputs(
            "thread_1",
            "run_1",
            vec![ToolOutput {
                tool_call_id: "call_1".to_string(),
                output: "{}".to_string(),
            }],
        )
        .await
        .unwrap();

    mock.assert_async().await;
}

#[tokio::test]
async fn provision_builds_store_file_and_assistant() {
    let mut server = mockito::Server::new_async().await;
    let store_mock = server
        .mock("POST", "/vector_stores")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"id": "vs_1"}"#)
        .create_async()
        .await;
    let file_mock = server
        .mock("POST", "/files")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"id": "file_1"}"#)
        .create_async()
        .await;
    let attach_mock = server
        .mock("POST", "/vector_stores/vs_1/files")
        .match_body(mockito::Matcher::PartialJson(
            serde_json::json!({ "file_id": "file_1" }),
        ))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"id": "file_1"}"#)
        .create_async()
        .await;
    let assistant_mock = server
        .mock("POST", "/assistants")
        .match_body(mockito::Matcher::PartialJson(
            serde_json::json!({ "model": "test-model", "name": "Book Recommender" }),
        ))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"id": "asst_1"}"#)
        .create_async()
        .await;

    let mut catalog = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        catalog,
        r#"{{"book_id": "bk-1", "title": "Stars", "description": "About stars."}}"#
    )
    .unwrap();
    catalog.flush().unwrap();

    let client = client_for(&server);
    let assistant_id = lifecycle::provision(&client, "test-model", catalog.path())
        .await
        .unwrap();

    assert_eq!(assistant_id, "asst_1");
    store_mock.assert_async().await;
    file_mock.assert_async().await;
    attach_mock.assert_async().await;
    assistant_mock.assert_async().await;
}

#[tokio::test]
async fn teardown_continues_past_deletion_failures() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/assistants/asst_1")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"id": "asst_1", "tool_resources": {"file_search": {"vector_store_ids": ["vs_1"]}}}"#,
        )
        .create_async()
        .await;
    server
        .mock("GET", "/vector_stores/vs_1/files")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"data": [{"id": "file_1"}]}"#)
        .create_async()
        .await;
    // File deletion fails; the store and assistant must still be deleted.
    server
        .mock("DELETE", "/vector_stores/vs_1/files/file_1")
        .with_status(500)
        .create_async()
        .await;
    let store_delete = server
        .mock("DELETE", "/vector_stores/vs_1")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"id": "vs_1", "deleted": true}"#)
        .create_async()
        .await;
    let assistant_delete = server
        .mock("DELETE", "/assistants/asst_1")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"id": "asst_1", "deleted": true}"#)
        .create_async()
        .await;

    let config = AssistantConfig {
        max_retries: 0,
        ..test_config(&server)
    };
    let client = AssistantClient::new("test-key".to_string(), &config).unwrap();
    lifecycle::teardown(&client, "asst_1").await;

    store_delete.assert_async().await;
    assistant_delete.assert_async().await;
}
