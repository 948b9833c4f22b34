//! control and cache_status tool implementations.
//!
//! `control` forwards a raw command envelope to the worker's control
//! channel; `cache_status` reports which generations exist.

use offgrid_client::{ControlMessage, ControlReply, Worker};
use offgrid_core::Error;
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the control tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ControlParams {
    /// Command envelope, e.g. `{"type": "CACHE_URLS", "urls": ["/api/today"]}`.
    pub message: serde_json::Value,
}

/// Output from the control tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ControlOutput {
    /// Absent for commands that have no reply.
    pub reply: Option<ControlReply>,
}

/// Implementation of the control tool.
pub async fn control_impl(worker: &Worker, params: ControlParams) -> Result<CallToolResult, McpError> {
    let message = ControlMessage::from_value(params.message);
    let output = ControlOutput { reply: worker.message(message).await };

    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

/// Output from the cache_status tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheStatusOutput {
    pub current: String,
    pub generations: Vec<GenerationStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GenerationStatus {
    pub name: String,
    pub entries: u64,
}

/// Implementation of the cache_status tool.
pub async fn status_impl(worker: &Worker) -> Result<CallToolResult, McpError> {
    let store = worker.generations().store();

    let mut generations = Vec::new();
    for name in store.keys().await? {
        let entries = store.entry_count(&name).await?;
        generations.push(GenerationStatus { name, entries });
    }

    let output = CacheStatusOutput { current: worker.generations().current().to_string(), generations };
    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}
