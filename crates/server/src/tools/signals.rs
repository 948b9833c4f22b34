//! push, notification_click and background_sync tool implementations.
//!
//! These deliver asynchronous signals to the worker. None of them fail:
//! problems are logged by the worker and the tool reports what happened.

use offgrid_client::{Event, EventOutcome, Notification, NotificationClick, Worker};
use offgrid_core::Error;
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the push tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct PushParams {
    /// Raw push payload. JSON object keys override the default notification.
    #[serde(default)]
    pub payload: Option<String>,
}

/// Output from the push tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PushOutput {
    /// The notification that was displayed.
    pub notification: Notification,
}

/// Parameters for the background_sync tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SyncParams {
    pub tag: String,
}

/// Output from the background_sync tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SyncOutput {
    /// False when the tag was not recognized or the sync failed.
    pub completed: bool,
}

fn to_result<T: Serialize>(output: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

fn unexpected(outcome: EventOutcome) -> McpError {
    Error::InvalidInput(format!("unexpected outcome: {outcome:?}")).into()
}

/// Implementation of the push tool.
pub async fn push_impl(worker: &Worker, params: PushParams) -> Result<CallToolResult, McpError> {
    match worker.dispatch(Event::Push(params.payload)).await? {
        EventOutcome::Notified(notification) => to_result(&PushOutput { notification }),
        other => Err(unexpected(other)),
    }
}

/// Implementation of the notification_click tool.
pub async fn click_impl(worker: &Worker, click: NotificationClick) -> Result<CallToolResult, McpError> {
    match worker.dispatch(Event::NotificationClick(click)).await? {
        EventOutcome::Handled => Ok(CallToolResult::success(vec![Content::text("handled")])),
        other => Err(unexpected(other)),
    }
}

/// Implementation of the background_sync tool.
pub async fn sync_impl(worker: &Worker, params: SyncParams) -> Result<CallToolResult, McpError> {
    match worker.dispatch(Event::Sync(params.tag)).await? {
        EventOutcome::Synced(completed) => to_result(&SyncOutput { completed }),
        other => Err(unexpected(other)),
    }
}
