//! HTTP client for the hosted assistant service (Assistants v2 wire format).
//!
//! Covers the vendor resources the job touches: vector stores, files,
//! assistants, threads, runs, and tool-output submission. Every identifier
//! is vendor-issued and opaque; nothing is persisted locally.
//!
//! # Retry Strategy
//!
//! JSON requests use exponential backoff for transient errors:
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately
//! - Network errors → retry
//! - Backoff: 1s, 2s, 4s, 8s, 16s, 32s (capped at 2^5)

use anyhow::{bail, Context, Result};
use reqwest::Method;
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;
use std::time::Duration;

use crate::config::AssistantConfig;

const BETA_HEADER: &str = "OpenAI-Beta";
const BETA_VALUE: &str = "assistants=v2";

/// Client for the hosted assistant service.
#[derive(Clone)]
pub struct AssistantClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    max_retries: u32,
}

impl std::fmt::Debug for AssistantClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssistantClient")
            .field("base_url", &self.base_url)
            .field("max_retries", &self.max_retries)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

impl AssistantClient {
    /// Create a client with an explicit API key.
    pub fn new(api_key: String, config: &AssistantConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            max_retries: config.max_retries,
        })
    }

    /// Create a client with the key from `OPENAI_API_KEY`.
    pub fn from_env(config: &AssistantConfig) -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .context("OPENAI_API_KEY environment variable not set")?;
        Self::new(api_key, config)
    }

    /// Send a JSON request with retry/backoff, returning the response body.
    async fn request_json(&self, method: Method, path: &str, body: Option<&Value>) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path);
        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                tracing::debug!(%url, attempt, "retrying assistant API request");
                tokio::time::sleep(delay).await;
            }

            let mut request = self
                .http
                .request(method.clone(), url.as_str())
                .header("Authorization", format!("Bearer {}", self.api_key))
                .header(BETA_HEADER, BETA_VALUE);
            if let Some(body) = body {
                request = request.json(body);
            }

            match request.send().await {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        return response
                            .json()
                            .await
                            .context("Failed to parse assistant API response");
                    }

                    // Rate limited or server error — retry
                    if status.as_u16() == 429 || status.is_server_error() {
                        let body_text = response.text().await.unwrap_or_default();
                        last_err = Some(anyhow::anyhow!(
                            "Assistant API error {}: {}",
                            status,
                            body_text
                        ));
                        continue;
                    }

                    // Client error (not 429) — don't retry
                    let body_text = response.text().await.unwrap_or_default();
                    bail!("Assistant API error {}: {}", status, body_text);
                }
                Err(e) => {
                    last_err = Some(e.into());
                    continue;
                }
            }
        }

        Err(last_err.unwrap_or_else(|| anyhow::anyhow!("Assistant API request failed after retries")))
    }

    async fn post(&self, path: &str, body: &Value) -> Result<Value> {
        self.request_json(Method::POST, path, Some(body)).await
    }

    async fn get(&self, path: &str) -> Result<Value> {
        self.request_json(Method::GET, path, None).await
    }

    async fn delete(&self, path: &str) -> Result<Value> {
        self.request_json(Method::DELETE, path, None).await
    }

    /// Create an empty vector store, returning its id.
    pub async fn create_vector_store(&self, name: &str) -> Result<String> {
        let response = self
            .post("/vector_stores", &serde_json::json!({ "name": name }))
            .await?;
        id_of(&response)
    }

    /// Upload a document with `purpose=assistants`, returning the file id.
    ///
    /// Multipart uploads are not retried.
    pub async fn upload_file(&self, path: &Path) -> Result<String> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read upload file: {}", path.display()))?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "catalog.json".to_string());

        let form = reqwest::multipart::Form::new()
            .text("purpose", "assistants")
            .part("file", reqwest::multipart::Part::bytes(bytes).file_name(file_name));

        let response = self
            .http
            .post(format!("{}/files", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header(BETA_HEADER, BETA_VALUE)
            .multipart(form)
            .send()
            .await
            .context("File upload request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            bail!("Assistant API error {}: {}", status, body_text);
        }

        id_of(&response.json().await?)
    }

    /// Attach an uploaded file to a vector store.
    pub async fn attach_file(&self, vector_store_id: &str, file_id: &str) -> Result<()> {
        self.post(
            &format!("/vector_stores/{}/files", vector_store_id),
            &serde_json::json!({ "file_id": file_id }),
        )
        .await?;
        Ok(())
    }

    /// Create an assistant from a prepared request body, returning its id.
    pub async fn create_assistant(&self, body: &Value) -> Result<String> {
        let response = self.post("/assistants", body).await?;
        id_of(&response)
    }

    /// Vector-store ids bound to an assistant's file-search tool.
    pub async fn assistant_vector_stores(&self, assistant_id: &str) -> Result<Vec<String>> {
        let response = self.get(&format!("/assistants/{}", assistant_id)).await?;
        let ids = response["tool_resources"]["file_search"]["vector_store_ids"]
            .as_array()
            .map(|arr| {
                arr.iter()
                    .filter_map(|v| v.as_str().map(String::from))
                    .collect()
            })
            .unwrap_or_default();
        Ok(ids)
    }

    pub async fn delete_assistant(&self, assistant_id: &str) -> Result<()> {
        self.delete(&format!("/assistants/{}", assistant_id)).await?;
        Ok(())
    }

    /// File ids currently attached to a vector store.
    pub async fn list_vector_store_files(&self, vector_store_id: &str) -> Result<Vec<String>> {
        let response = self
            .get(&format!("/vector_stores/{}/files", vector_store_id))
            .await?;
        let ids = response["data"]
            .as_array()
            .map(|arr| {
                arr.iter()
                    .filter_map(|v| v["id"].as_str().map(String::from))
                    .collect()
            })
            .unwrap_or_default();
        Ok(ids)
    }

    pub async fn delete_vector_store_file(
        &self,
        vector_store_id: &str,
        file_id: &str,
    ) -> Result<()> {
        self.delete(&format!("/vector_stores/{}/files/{}", vector_store_id, file_id))
            .await?;
        Ok(())
    }

    pub async fn delete_vector_store(&self, vector_store_id: &str) -> Result<()> {
        self.delete(&format!("/vector_stores/{}", vector_store_id))
            .await?;
        Ok(())
    }

    /// Open a new conversation thread, returning its id.
    pub async fn create_thread(&self) -> Result<String> {
        let response = self.post("/threads", &serde_json::json!({})).await?;
        id_of(&response)
    }

    /// Append a user message to a thread.
    pub async fn add_user_message(&self, thread_id: &str, content: &str) -> Result<()> {
        self.post(
            &format!("/threads/{}/messages", thread_id),
            &serde_json::json!({ "role": "user", "content": content }),
        )
        .await?;
        Ok(())
    }

    /// Start a run of the assistant against a thread, returning the run id.
    pub async fn create_run(
        &self,
        thread_id: &str,
        assistant_id: &str,
        tool_choice: Option<Value>,
    ) -> Result<String> {
        let mut body = serde_json::json!({ "assistant_id": assistant_id });
        if let Some(tool_choice) = tool_choice {
            body["tool_choice"] = tool_choice;
        }
        let response = self.post(&format!("/threads/{}/runs", thread_id), &body).await?;
        id_of(&response)
    }

    /// Observe the current state of a run.
    pub async fn run_state(&self, thread_id: &str, run_id: &str) -> Result<RunState> {
        let response = self
            .get(&format!("/threads/{}/runs/{}", thread_id, run_id))
            .await?;
        let run: RunObject =
            serde_json::from_value(response).context("Failed to parse run object")?;
        Ok(run.into_state())
    }

    /// Submit tool outputs so a paused run can resume.
    pub async fn submit_tool_outputs(
        &self,
        thread_id: &str,
        run_id: &str,
        outputs: Vec<ToolOutput>,
    ) -> Result<()> {
        let outputs: Vec<Value> = outputs
            .into_iter()
            .map(|o| serde_json::json!({ "tool_call_id": o.tool_call_id, "output": o.output }))
            .collect();
        self.post(
            &format!("/threads/{}/runs/{}/submit_tool_outputs", thread_id, run_id),
            &serde_json::json!({ "tool_outputs": outputs }),
        )
        .await?;
        Ok(())
    }
}

fn id_of(response: &Value) -> Result<String> {
    response["id"]
        .as_str()
        .map(String::from)
        .context("No id in assistant API response")
}

/// Output echoed back for one pending tool call.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub tool_call_id: String,
    pub output: String,
}

/// A tool call the service is waiting on, with the model-supplied arguments.
#[derive(Debug, Clone)]
pub struct PendingToolCall {
    pub id: String,
    pub name: String,
    /// Raw JSON arguments as written by the model.
    pub arguments: String,
}

/// Observed run state, tagged so callers never probe optional fields.
#[derive(Debug, Clone)]
pub enum RunState {
    /// `queued`, `in_progress`, `cancelling` — keep polling.
    InProgress { status: String },
    /// The run is paused on pending tool calls.
    RequiresAction { tool_calls: Vec<PendingToolCall> },
    Completed,
    /// `failed`, `cancelled`, `expired`, `incomplete` — terminal, no result.
    Ended { status: String },
}

#[derive(Debug, Deserialize)]
struct RunObject {
    status: String,
    #[serde(default)]
    required_action: Option<RequiredAction>,
}

#[derive(Debug, Deserialize)]
struct RequiredAction {
    #[serde(default)]
    submit_tool_outputs: Option<SubmitToolOutputs>,
}

#[derive(Debug, Deserialize)]
struct SubmitToolOutputs {
    #[serde(default)]
    tool_calls: Vec<ApiToolCall>,
}

#[derive(Debug, Deserialize)]
struct ApiToolCall {
    id: String,
    #[serde(default)]
    function: Option<ApiFunction>,
}

#[derive(Debug, Deserialize)]
struct ApiFunction {
    #[serde(default)]
    name: String,
    #[serde(default)]
    arguments: String,
}

impl RunObject {
    fn into_state(self) -> RunState {
        match self.status.as_str() {
            "completed" => RunState::Completed,
            "failed" | "cancelled" | "expired" | "incomplete" => RunState::Ended {
                status: self.status,
            },
            "requires_action" => {
                let tool_calls = self
                    .required_action
                    .and_then(|a| a.submit_tool_outputs)
                    .map(|s| s.tool_calls)
                    .unwrap_or_default()
                    .into_iter()
                    .filter_map(|call| {
                        call.function.map(|f| PendingToolCall {
                            id: call.id,
                            name: f.name,
                            arguments: f.arguments,
                        })
                    })
                    .collect();
                RunState::RequiresAction { tool_calls }
            }
            _ => RunState::InProgress {
                status: self.status,
            },
        }
    }
}
