/// Parameter types for every tool, with JSON schemas derived via schemars.
///
/// Optional `token` fields override the session/default credential for a single call.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::session::WorkspaceContext;

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct NoParams {}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SetTokenParams {
    /// Your Terraform Cloud API token. Generate one at
    /// https://app.terraform.io/app/settings/tokens
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ClearSessionParams {
    /// Whether to clear the stored token (default: true)
    #[serde(default = "default_true")]
    pub clear_token: bool,
    /// Whether to clear the organization/workspace/project context (default: true)
    #[serde(default = "default_true")]
    pub clear_context: bool,
}

impl Default for ClearSessionParams {
    fn default() -> Self {
        Self {
            clear_token: true,
            clear_context: true,
        }
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct SetContextParams {
    /// Organization name to use by default
    pub organization: Option<String>,
    /// Workspace name to use by default
    pub workspace: Option<String>,
    /// Project ID to use by default
    pub project: Option<String>,
}

impl SetContextParams {
    /// Context update with blank values dropped
    pub fn into_context(self) -> WorkspaceContext {
        fn clean(v: Option<String>) -> Option<String> {
            v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
        }
        WorkspaceContext {
            organization: clean(self.organization),
            workspace: clean(self.workspace),
            project: clean(self.project),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct TokenOverride {
    /// Terraform Cloud API token for this call only
    pub token: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct ListWorkspacesParams {
    /// Organization name (defaults to the session context)
    pub organization: Option<String>,
    /// Filter workspaces by name
    pub search: Option<String>,
    /// Page number, starting at 1
    pub page_number: Option<u32>,
    /// Results per page (1-100)
    pub page_size: Option<u32>,
    /// Terraform Cloud API token for this call only
    pub token: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct WorkspaceDetailsParams {
    /// Workspace name (defaults to the session context)
    pub workspace: Option<String>,
    /// Organization name (defaults to the session context)
    pub organization: Option<String>,
    /// Terraform Cloud API token for this call only
    pub token: Option<String>,
}
