//! MCP server bridge using rmcp with the Terraform Cloud tools
//!
//! Every `tools/call` is first bound to a [`RequestSession`] taken from the
//! HTTP request parts rmcp attaches to the request context. Tool failures
//! are returned as error results so the client sees them, while malformed
//! calls become protocol errors.

use rmcp::{
    ErrorData as McpError,
    ServerHandler,
    model::*,
    service::{RequestContext, RoleServer},
};
use serde_json::Value;

use crate::session::{RequestSession, TokenResolver};
use crate::tfc::TfcClient;
use crate::tools::{MethodParseError, TfcMethod, TfcTools, ToolError};

const INSTRUCTIONS: &str = "Terraform Cloud MCP server. Call set_token once per session with \
your Terraform Cloud API token; later calls in the same session use it automatically. \
Use set_context to pick a default organization and workspace.";

fn parse_to_mcp_error(e: MethodParseError) -> McpError {
    McpError::invalid_params(e.to_string(), None)
}

fn render(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

/// MCP handler serving the Terraform Cloud tools
#[derive(Clone, Debug)]
pub struct TfcMcpBridge {
    tools: TfcTools,
}

impl TfcMcpBridge {
    pub fn new(resolver: TokenResolver, api: TfcClient) -> Self {
        Self {
            tools: TfcTools::new(resolver, api),
        }
    }

    pub fn tools(&self) -> &TfcTools {
        &self.tools
    }

    /// Run one tool call for `session`, producing the MCP result
    pub async fn dispatch(
        &self,
        name: &str,
        arguments: Option<JsonObject>,
        session: &RequestSession,
    ) -> Result<CallToolResult, McpError> {
        let store = self.tools.resolver().store();
        store.set_client_context(&session.session_id, session.client.clone());

        let method = TfcMethod::parse(name, arguments).map_err(parse_to_mcp_error)?;
        tracing::debug!(
            tool = method.name(),
            session_id = %session.session_id,
            "Calling tool"
        );

        match self.tools.call(method, session).await {
            Ok(value) => Ok(CallToolResult::success(vec![Content::text(render(&value))])),
            Err(e) => {
                match &e {
                    ToolError::Api(api) => tracing::warn!(
                        tool = name,
                        session_id = %session.session_id,
                        error = %api,
                        "Terraform Cloud request failed"
                    ),
                    ToolError::Credential(cred) => tracing::info!(
                        tool = name,
                        session_id = %session.session_id,
                        kind = cred.kind(),
                        "Tool call rejected"
                    ),
                }
                Ok(CallToolResult::error(vec![Content::text(render(&e.to_payload()))]))
            }
        }
    }
}

impl ServerHandler for TfcMcpBridge {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .enable_logging()
                .build(),
            server_info: Implementation {
                name: "tfc-mcp".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            instructions: Some(INSTRUCTIONS.into()),
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _ctx: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        let tools = TfcMethod::tools();
        tracing::debug!("Listing {} tools", tools.len());

        Ok(ListToolsResult {
            tools,
            next_cursor: None,
            meta: None,
        })
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        ctx: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        let session = RequestSession::from_parts(ctx.extensions.get::<http::request::Parts>());
        self.dispatch(&request.name, request.arguments, &session).await
    }
}
