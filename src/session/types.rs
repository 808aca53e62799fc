use std::collections::BTreeMap;
use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A Terraform Cloud API token.
///
/// `Debug` and `Display` print the masked preview only, so a `Secret` can sit
/// inside structs that get logged without leaking the raw value.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The raw token. Only the HTTP client should call this.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// First 8 and last 4 characters, or `***` for short tokens
    pub fn masked(&self) -> String {
        let chars: Vec<char> = self.0.chars().collect();
        if chars.len() > 12 {
            let head: String = chars[..8].iter().collect();
            let tail: String = chars[chars.len() - 4..].iter().collect();
            format!("{}...{}", head, tail)
        } else {
            "***".to_string()
        }
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Secret").field(&self.masked()).finish()
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.masked())
    }
}

/// Where a resolved token came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum TokenSource {
    /// Passed as a `token` argument on the tool call
    Explicit,
    /// Stored with `set_token` in the caller's session
    Session,
    /// Server-wide `TFC_TOKEN`
    Environment,
}

/// Current organization/workspace/project for a session
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct WorkspaceContext {
    pub organization: Option<String>,
    pub workspace: Option<String>,
    pub project: Option<String>,
}

impl WorkspaceContext {
    pub fn is_empty(&self) -> bool {
        self.organization.is_none() && self.workspace.is_none() && self.project.is_none()
    }

    /// Overwrite the fields that `update` provides, keep the rest
    pub fn merge(&mut self, update: WorkspaceContext) {
        if update.organization.is_some() {
            self.organization = update.organization;
        }
        if update.workspace.is_some() {
            self.workspace = update.workspace;
        }
        if update.project.is_some() {
            self.project = update.project;
        }
    }
}

/// Client metadata forwarded by the agent gateway as `X-Client-*` headers
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ClientContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_name: Option<String>,
    /// Unix epoch seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferences: Option<Map<String, Value>>,
    /// Header values exactly as received, for debugging
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub raw_headers: BTreeMap<String, String>,
}

impl ClientContext {
    pub fn is_empty(&self) -> bool {
        self.raw_headers.is_empty()
    }
}

/// Snapshot of one session, as reported by `get_session_status`
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub session_id: String,
    pub has_token: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_preview: Option<String>,
    pub context: WorkspaceContext,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_context: Option<ClientContext>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}
