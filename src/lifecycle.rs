//! Assistant provisioning and teardown.
//!
//! The assistant, its vector store, and the uploaded catalog file all live
//! for exactly one job run. `provision` builds the chain store → file →
//! assistant; `teardown` unwinds it best-effort, logging and skipping past
//! individual deletion failures so one stuck resource cannot leak the rest.

use anyhow::Result;
use serde_json::json;

use crate::assistant::AssistantClient;
use crate::prompts;

const ASSISTANT_NAME: &str = "Book Recommender";
const VECTOR_STORE_NAME: &str = "Library Catalog";

/// The `recommend_books` function schema the assistant is bound to.
pub fn recommend_books_schema() -> serde_json::Value {
    json!({
        "name": "recommend_books",
        "description": prompts::RECOMMEND_FUNCTION_DESCRIPTION,
        "parameters": {
            "type": "object",
            "properties": {
                "recommendation_summary": {
                    "type": "string",
                    "description": prompts::SUMMARY_FIELD_DESCRIPTION
                },
                "recommended_books": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "book_id": {
                                "type": "string",
                                "description": "book_id of a catalog entry"
                            },
                            "title": {
                                "type": "string",
                                "description": "title of the catalog entry"
                            },
                            "reason": {
                                "type": "string",
                                "description": "Reason for recommendation"
                            }
                        }
                    },
                    "description": prompts::BOOKS_FIELD_DESCRIPTION
                }
            },
            "required": ["recommendation_summary", "recommended_books"]
        }
    })
}

/// Provision the job's assistant: create a vector store, upload and attach
/// the catalog document, then create the assistant bound to both the store
/// and the `recommend_books` tool. Returns the assistant id.
pub async fn provision(
    client: &AssistantClient,
    model: &str,
    catalog_path: &std::path::Path,
) -> Result<String> {
    let vector_store_id = client.create_vector_store(VECTOR_STORE_NAME).await?;
    println!("Created vector store {}", vector_store_id);

    let file_id = client.upload_file(catalog_path).await?;
    client.attach_file(&vector_store_id, &file_id).await?;
    println!("Uploaded catalog file {} into {}", file_id, vector_store_id);

    let body = json!({
        "name": ASSISTANT_NAME,
        "instructions": prompts::ASSISTANT_INSTRUCTIONS,
        "model": model,
        "tools": [
            { "type": "file_search" },
            { "type": "function", "function": recommend_books_schema() }
        ],
        "tool_resources": {
            "file_search": { "vector_store_ids": [vector_store_id] }
        }
    });

    let assistant_id = client.create_assistant(&body).await?;
    println!("Created assistant {}", assistant_id);

    Ok(assistant_id)
}

/// Tear down the assistant and everything bound to it.
///
/// Best-effort: each failure is logged and cleanup continues with the
/// remaining resources. Never returns an error.
pub async fn teardown(client: &AssistantClient, assistant_id: &str) {
    let vector_store_ids = match client.assistant_vector_stores(assistant_id).await {
        Ok(ids) => ids,
        Err(e) => {
            tracing::warn!(assistant_id, error = %e, "could not look up bound vector stores");
            Vec::new()
        }
    };

    for vector_store_id in &vector_store_ids {
        match client.list_vector_store_files(vector_store_id).await {
            Ok(file_ids) => {
                for file_id in file_ids {
                    if let Err(e) = client.delete_vector_store_file(vector_store_id, &file_id).await
                    {
                        tracing::warn!(%vector_store_id, %file_id, error = %e, "failed to delete file");
                    }
                }
            }
            Err(e) => {
                tracing::warn!(%vector_store_id, error = %e, "failed to list vector store files");
            }
        }

        if let Err(e) = client.delete_vector_store(vector_store_id).await {
            tracing::warn!(%vector_store_id, error = %e, "failed to delete vector store");
        }
    }

    if let Err(e) = client.delete_assistant(assistant_id).await {
        tracing::warn!(assistant_id, error = %e, "failed to delete assistant");
    }

    println!("Cleaned up assistant {}", assistant_id);
}
