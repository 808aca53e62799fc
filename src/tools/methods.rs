/// Method definitions for the Terraform Cloud MCP tools
///
/// Each variant carries its typed parameters, so a `tools/call` request is
/// parsed in one step from `{"method": name, "params": arguments}`.

use std::sync::Arc;

use rmcp::model::{JsonObject, Tool};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::params::{
    ClearSessionParams, ListWorkspacesParams, NoParams, SetContextParams, SetTokenParams,
    TokenOverride, WorkspaceDetailsParams,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "method", content = "params", rename_all = "snake_case")]
pub enum TfcMethod {
    SetToken(SetTokenParams),
    GetCurrentToken(NoParams),
    ClearSession(ClearSessionParams),
    SetContext(SetContextParams),
    GetContext(NoParams),
    GetSessionStatus(NoParams),
    GetClientContext(NoParams),
    GetClientPreferences(NoParams),
    GetAccountDetails(TokenOverride),
    ListOrganizations(TokenOverride),
    ListWorkspaces(ListWorkspacesParams),
    GetWorkspaceDetails(WorkspaceDetailsParams),
}

/// Why a tool call could not be turned into a [`TfcMethod`]
#[derive(Debug, thiserror::Error)]
pub enum MethodParseError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),
    #[error("Invalid arguments for {tool}: {reason}")]
    InvalidArguments { tool: String, reason: String },
}

impl TfcMethod {
    const NAMES: &'static [&'static str] = &[
        "set_token",
        "get_current_token",
        "clear_session",
        "set_context",
        "get_context",
        "get_session_status",
        "get_client_context",
        "get_client_preferences",
        "get_account_details",
        "list_organizations",
        "list_workspaces",
        "get_workspace_details",
    ];

    /// Get the method name as a string
    pub fn name(&self) -> &'static str {
        match self {
            TfcMethod::SetToken(_) => "set_token",
            TfcMethod::GetCurrentToken(_) => "get_current_token",
            TfcMethod::ClearSession(_) => "clear_session",
            TfcMethod::SetContext(_) => "set_context",
            TfcMethod::GetContext(_) => "get_context",
            TfcMethod::GetSessionStatus(_) => "get_session_status",
            TfcMethod::GetClientContext(_) => "get_client_context",
            TfcMethod::GetClientPreferences(_) => "get_client_preferences",
            TfcMethod::GetAccountDetails(_) => "get_account_details",
            TfcMethod::ListOrganizations(_) => "list_organizations",
            TfcMethod::ListWorkspaces(_) => "list_workspaces",
            TfcMethod::GetWorkspaceDetails(_) => "get_workspace_details",
        }
    }

    /// Get all available method names
    pub fn all_names() -> &'static [&'static str] {
        Self::NAMES
    }

    /// Get a human-readable description of a method
    pub fn description(method_name: &str) -> Option<&'static str> {
        match method_name {
            "set_token" => Some(
                "Set the Terraform Cloud API token for the current session. \
                 All subsequent tool calls in this session will use it.",
            ),
            "get_current_token" => Some(
                "Show whether a token is configured and where it comes from \
                 (session or server environment). Never returns the token itself.",
            ),
            "clear_session" => Some(
                "Clear the stored token and/or organization/workspace/project context \
                 for the current session.",
            ),
            "set_context" => Some(
                "Set the current organization, workspace or project so other tools \
                 can omit them.",
            ),
            "get_context" => Some("Get the current organization/workspace/project context."),
            "get_session_status" => Some(
                "Get the session id, transport, token status, context and client \
                 context of the current session.",
            ),
            "get_client_context" => Some(
                "Get the client metadata (region, agent name, timestamp, preferences) \
                 sent by the agent gateway for this session.",
            ),
            "get_client_preferences" => Some(
                "Get the preferences sent in the X-Client-Preferences header for this \
                 session. Returns an empty object when none were sent.",
            ),
            "get_account_details" => {
                Some("Get details of the Terraform Cloud account that owns the token.")
            }
            "list_organizations" => {
                Some("List the Terraform Cloud organizations the token can access.")
            }
            "list_workspaces" => Some(
                "List workspaces in an organization. Uses the session's organization \
                 when none is given.",
            ),
            "get_workspace_details" => Some(
                "Get details of a workspace. Uses the session's organization and \
                 workspace when not given.",
            ),
            _ => None,
        }
    }

    /// Input schema for a method's parameters
    pub fn params_schema(method_name: &str) -> Option<Arc<JsonObject>> {
        let schema = match method_name {
            "set_token" => schema_of::<SetTokenParams>(),
            "clear_session" => schema_of::<ClearSessionParams>(),
            "set_context" => schema_of::<SetContextParams>(),
            "get_current_token" | "get_context" | "get_session_status"
            | "get_client_context" | "get_client_preferences" => schema_of::<NoParams>(),
            "get_account_details" | "list_organizations" => schema_of::<TokenOverride>(),
            "list_workspaces" => schema_of::<ListWorkspacesParams>(),
            "get_workspace_details" => schema_of::<WorkspaceDetailsParams>(),
            _ => return None,
        };
        Some(Arc::new(schema))
    }

    /// All tools as advertised by `tools/list`
    pub fn tools() -> Vec<Tool> {
        Self::all_names()
            .iter()
            .filter_map(|name| {
                let description = Self::description(name)?;
                let schema = Self::params_schema(name)?;
                Some(Tool::new(*name, description, schema))
            })
            .collect()
    }

    /// Parse a tool call into a typed method
    pub fn parse(name: &str, arguments: Option<JsonObject>) -> Result<Self, MethodParseError> {
        if !Self::NAMES.contains(&name) {
            return Err(MethodParseError::UnknownTool(name.to_string()));
        }
        let params = arguments.map(Value::Object).unwrap_or_else(|| json!({}));
        serde_json::from_value(json!({ "method": name, "params": params })).map_err(|e| {
            MethodParseError::InvalidArguments {
                tool: name.to_string(),
                reason: e.to_string(),
            }
        })
    }
}

/// JSON schema for `T` with `"type": "object"` guaranteed at the root
fn schema_of<T: JsonSchema>() -> JsonObject {
    let schema = schemars::schema_for!(T);
    let mut obj = serde_json::to_value(schema)
        .ok()
        .and_then(|v| v.as_object().cloned())
        .unwrap_or_default();
    // MCP requires "type": "object" at schema root
    if !obj.contains_key("type") {
        obj.insert("type".to_string(), json!("object"));
    }
    obj
}
