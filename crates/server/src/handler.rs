//! MCP server handler implementation.
//!
//! Each tool maps onto one worker event; the router dispatches tool calls
//! to the matching implementation in [`crate::tools`].
use std::sync::Arc;

use crate::tools::{
    ControlParams, FetchParams, PushParams, SyncParams, click_impl, control_impl, fetch_impl, push_impl, status_impl,
    sync_impl,
};
use offgrid_client::{NotificationClick, Worker};

use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};

/// The MCP server handler for offgrid.
#[derive(Clone)]
pub struct OffgridServer {
    tool_router: ToolRouter<Self>,
    worker: Arc<Worker>,
}

#[tool_router]
impl OffgridServer {
    pub fn new(worker: Arc<Worker>) -> Self {
        Self { tool_router: Self::tool_router(), worker }
    }

    #[tool(
        description = "Fetch a URL network-first. Falls back to the cache, then the offline page (navigations), then a 503 JSON body."
    )]
    async fn fetch(&self, params: Parameters<FetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(&self.worker, params.0).await
    }

    #[tool(
        description = "Send a control message: SKIP_WAITING, GET_VERSION, CLEAR_CACHE or CACHE_URLS (with urls). Returns the reply, if any."
    )]
    async fn control(&self, params: Parameters<ControlParams>) -> Result<CallToolResult, McpError> {
        control_impl(&self.worker, params.0).await
    }

    #[tool(description = "List cache generations and their entry counts.")]
    async fn cache_status(&self) -> Result<CallToolResult, McpError> {
        status_impl(&self.worker).await
    }

    #[tool(description = "Deliver a push message. Payload keys override the default notification.")]
    async fn push(&self, params: Parameters<PushParams>) -> Result<CallToolResult, McpError> {
        push_impl(&self.worker, params.0).await
    }

    #[tool(description = "Report a notification click. Any action except 'dismiss' opens the app root.")]
    async fn notification_click(&self, params: Parameters<NotificationClick>) -> Result<CallToolResult, McpError> {
        click_impl(&self.worker, params.0).await
    }

    #[tool(description = "Run background sync for a tag and notify clients on completion.")]
    async fn background_sync(&self, params: Parameters<SyncParams>) -> Result<CallToolResult, McpError> {
        sync_impl(&self.worker, params.0).await
    }
}

impl ServerHandler for OffgridServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "offgrid".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            instructions: Some(format!("Offline cache engine, generation {}", self.worker.generations().current())),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}
