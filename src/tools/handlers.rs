//! Tool implementations
//!
//! Every tool runs against the caller's [`RequestSession`]. Credential and
//! upstream failures come back as [`ToolError`] and are reported to the
//! client as tool error payloads; they never affect other sessions.

use serde_json::{json, Value};
use thiserror::Error;

use super::methods::TfcMethod;
use super::params::{
    ClearSessionParams, ListWorkspacesParams, SetContextParams, SetTokenParams, TokenOverride,
    WorkspaceDetailsParams,
};
use crate::session::{
    CredentialError, RequestSession, ResolvedToken, Secret, TokenResolver, TokenSource,
};
use crate::tfc::{ApiError, TfcClient, WorkspaceQuery};

#[derive(Debug, Error)]
pub enum ToolError {
    #[error(transparent)]
    Credential(#[from] CredentialError),

    #[error(transparent)]
    Api(#[from] ApiError),
}

impl ToolError {
    pub fn kind(&self) -> &'static str {
        match self {
            ToolError::Credential(e) => e.kind(),
            ToolError::Api(e) => e.kind(),
        }
    }

    /// JSON body returned to the client as the tool result
    pub fn to_payload(&self) -> Value {
        json!({
            "error": self.to_string(),
            "kind": self.kind(),
        })
    }
}

fn invalid(message: impl Into<String>) -> ToolError {
    ToolError::Credential(CredentialError::InvalidArgument(message.into()))
}

/// Session tools plus the Terraform Cloud API tools
#[derive(Clone, Debug)]
pub struct TfcTools {
    resolver: TokenResolver,
    api: TfcClient,
}

impl TfcTools {
    pub fn new(resolver: TokenResolver, api: TfcClient) -> Self {
        Self { resolver, api }
    }

    pub fn resolver(&self) -> &TokenResolver {
        &self.resolver
    }

    pub async fn call(&self, method: TfcMethod, session: &RequestSession) -> Result<Value, ToolError> {
        match method {
            TfcMethod::SetToken(p) => self.set_token(p, session),
            TfcMethod::GetCurrentToken(_) => Ok(self.get_current_token(session)),
            TfcMethod::ClearSession(p) => Ok(self.clear_session(p, session)),
            TfcMethod::SetContext(p) => self.set_context(p, session),
            TfcMethod::GetContext(_) => Ok(self.get_context(session)),
            TfcMethod::GetSessionStatus(_) => Ok(self.get_session_status(session)),
            TfcMethod::GetClientContext(_) => Ok(self.get_client_context(session)),
            TfcMethod::GetClientPreferences(_) => Ok(self.get_client_preferences(session)),
            TfcMethod::GetAccountDetails(p) => self.get_account_details(p, session).await,
            TfcMethod::ListOrganizations(p) => self.list_organizations(p, session).await,
            TfcMethod::ListWorkspaces(p) => self.list_workspaces(p, session).await,
            TfcMethod::GetWorkspaceDetails(p) => self.get_workspace_details(p, session).await,
        }
    }

    // === Session tools ===

    fn set_token(&self, params: SetTokenParams, session: &RequestSession) -> Result<Value, ToolError> {
        if params.token.trim().is_empty() {
            return Err(invalid(
                "Token cannot be empty. Please provide a valid Terraform Cloud API token.",
            ));
        }

        self.resolver.store().set(&session.session_id, &params.token)?;

        tracing::info!(
            session_id = %session.session_id,
            masked = %Secret::new(params.token.trim()).masked(),
            "Token configured via set_token"
        );

        Ok(json!({
            "status": "success",
            "message": "Token configured successfully. All subsequent tool calls will use this token.",
        }))
    }

    fn get_current_token(&self, session: &RequestSession) -> Value {
        match self.resolver.resolve_with_source(None, Some(&session.session_id)) {
            Some(ResolvedToken { token, source: TokenSource::Session }) => json!({
                "status": "configured",
                "source": TokenSource::Session,
                "has_token": true,
                "token_preview": token.masked(),
            }),
            Some(ResolvedToken { source, .. }) => json!({
                "status": "configured",
                "source": source,
                "has_token": true,
                "note": "Using TFC_TOKEN environment variable",
            }),
            None => json!({
                "status": "not_configured",
                "source": Value::Null,
                "has_token": false,
                "message": "No token configured. Use set_token to configure a token.",
            }),
        }
    }

    fn clear_session(&self, params: ClearSessionParams, session: &RequestSession) -> Value {
        let store = self.resolver.store();
        let mut cleared = Vec::new();

        if params.clear_token {
            store.clear(&session.session_id);
            cleared.push("token");
        }
        if params.clear_context {
            store.clear_context(&session.session_id);
            cleared.push("context");
        }

        if cleared.is_empty() {
            return json!({
                "status": "info",
                "message": "No items to clear (both flags set to false)",
            });
        }

        let items = cleared.join(" + ");
        tracing::info!(session_id = %session.session_id, cleared = %items, "Session cleared");
        json!({
            "status": "success",
            "message": format!("Session cleared ({}). Use set_token to configure a new token.", items),
        })
    }

    fn set_context(&self, params: SetContextParams, session: &RequestSession) -> Result<Value, ToolError> {
        let update = params.into_context();
        if update.is_empty() {
            return Err(invalid(
                "At least one context value (organization, workspace, or project) must be provided.",
            ));
        }

        let context = self
            .resolver
            .store()
            .set_context(&session.session_id, update)?;
        tracing::info!(
            session_id = %session.session_id,
            organization = ?context.organization,
            workspace = ?context.workspace,
            project = ?context.project,
            "Context updated"
        );

        Ok(json!({
            "status": "success",
            "message": "Context updated",
            "context": context,
        }))
    }

    fn get_context(&self, session: &RequestSession) -> Value {
        json!({
            "status": "success",
            "context": self.resolver.store().context(&session.session_id),
        })
    }

    fn get_session_status(&self, session: &RequestSession) -> Value {
        let store = self.resolver.store();
        let resolved = self.resolver.resolve_with_source(None, Some(&session.session_id));
        let snapshot = store.snapshot(&session.session_id);

        json!({
            "session_id": session.session_id,
            "transport": session.transport,
            "has_token": resolved.is_some(),
            "token_source": resolved.as_ref().map(|r| r.source),
            "context": snapshot.as_ref().map(|s| s.context.clone()).unwrap_or_default(),
            "client_context": snapshot.as_ref().and_then(|s| s.client_context.clone()),
            "created_at": snapshot.map(|s| s.created_at),
        })
    }

    fn get_client_context(&self, session: &RequestSession) -> Value {
        match self.resolver.store().client_context(&session.session_id) {
            Some(client) => json!({
                "status": "success",
                "client_context": client,
            }),
            None => json!({
                "status": "info",
                "message": "No client context available for this session. \
                            This is normal if the client doesn't send client context headers.",
            }),
        }
    }

    /// Preferences from `X-Client-Preferences`, or `{}` when none were sent
    fn get_client_preferences(&self, session: &RequestSession) -> Value {
        let preferences = self
            .resolver
            .store()
            .client_context(&session.session_id)
            .and_then(|c| c.preferences)
            .map(Value::Object)
            .unwrap_or_else(|| json!({}));
        json!({
            "status": "success",
            "preferences": preferences,
        })
    }

    // === Terraform Cloud tools ===

    fn credential(
        &self,
        tool: &str,
        explicit: Option<&str>,
        session: &RequestSession,
    ) -> Result<ResolvedToken, ToolError> {
        let resolved = self
            .resolver
            .require(explicit, Some(&session.session_id))
            .inspect_err(|_| {
                tracing::warn!(
                    tool,
                    session_id = %session.session_id,
                    "No Terraform Cloud credential available, refusing request"
                );
            })?;
        tracing::debug!(
            tool,
            session_id = %session.session_id,
            source = ?resolved.source,
            "Resolved Terraform Cloud credential"
        );
        Ok(resolved)
    }

    fn organization(&self, given: Option<String>, session: &RequestSession) -> Result<String, ToolError> {
        given
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .or_else(|| self.resolver.store().context(&session.session_id).organization)
            .ok_or_else(|| {
                invalid("organization is required. Pass it explicitly or call set_context first.")
            })
    }

    async fn get_account_details(&self, params: TokenOverride, session: &RequestSession) -> Result<Value, ToolError> {
        let resolved = self.credential("get_account_details", params.token.as_deref(), session)?;
        Ok(self.api.account_details(&resolved.token).await?)
    }

    async fn list_organizations(&self, params: TokenOverride, session: &RequestSession) -> Result<Value, ToolError> {
        let resolved = self.credential("list_organizations", params.token.as_deref(), session)?;
        Ok(self.api.list_organizations(&resolved.token).await?)
    }

    async fn list_workspaces(&self, params: ListWorkspacesParams, session: &RequestSession) -> Result<Value, ToolError> {
        let resolved = self.credential("list_workspaces", params.token.as_deref(), session)?;
        let organization = self.organization(params.organization, session)?;
        let query = WorkspaceQuery {
            search: params.search,
            page_number: params.page_number,
            page_size: params.page_size,
        };
        Ok(self
            .api
            .list_workspaces(&resolved.token, &organization, &query)
            .await?)
    }

    async fn get_workspace_details(
        &self,
        params: WorkspaceDetailsParams,
        session: &RequestSession,
    ) -> Result<Value, ToolError> {
        let resolved = self.credential("get_workspace_details", params.token.as_deref(), session)?;
        let organization = self.organization(params.organization, session)?;
        let workspace = params
            .workspace
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .or_else(|| self.resolver.store().context(&session.session_id).workspace)
            .ok_or_else(|| {
                invalid("workspace is required. Pass it explicitly or call set_context first.")
            })?;
        Ok(self
            .api
            .workspace_details(&resolved.token, &organization, &workspace)
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{SessionStore, Transport};
    use std::sync::Arc;

    fn tools(default: Option<&str>) -> TfcTools {
        let store = Arc::new(SessionStore::default());
        TfcTools::new(
            TokenResolver::new(store, default.map(String::from)),
            TfcClient::new("http://127.0.0.1:9").unwrap(),
        )
    }

    fn session(id: &str) -> RequestSession {
        RequestSession {
            session_id: id.to_string(),
            transport: Transport::StreamableHttp,
            client: Default::default(),
        }
    }

    async fn call(tools: &TfcTools, name: &str, args: Value, session: &RequestSession) -> Result<Value, ToolError> {
        let method = TfcMethod::parse(name, args.as_object().cloned()).unwrap();
        tools.call(method, session).await
    }

    #[tokio::test]
    async fn test_set_token_never_echoes_token() {
        let t = tools(None);
        let s = session("s1");
        let out = call(&t, "set_token", json!({"token": "  atlasv1.secret-value-1234 "}), &s)
            .await
            .unwrap();

        assert_eq!(out["status"], "success");
        assert!(!out.to_string().contains("secret-value"));
        assert_eq!(
            t.resolver().resolve(None, Some("s1")).as_deref(),
            Some("atlasv1.secret-value-1234")
        );
    }

    #[tokio::test]
    async fn test_set_token_rejects_blank() {
        let t = tools(None);
        let err = call(&t, "set_token", json!({"token": "   "}), &session("s1"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "invalid_argument");
        assert!(err.to_payload()["error"].as_str().unwrap().contains("cannot be empty"));
        assert!(t.resolver().store().is_empty());
    }

    #[tokio::test]
    async fn test_get_current_token_sources() {
        let t = tools(Some("env-default-token"));
        let s = session("s1");

        let out = call(&t, "get_current_token", json!({}), &s).await.unwrap();
        assert_eq!(out["source"], "environment");
        assert!(out.get("token_preview").is_none());

        call(&t, "set_token", json!({"token": "atlasv1.abcdefghijklmnop"}), &s)
            .await
            .unwrap();
        let out = call(&t, "get_current_token", json!({}), &s).await.unwrap();
        assert_eq!(out["source"], "session");
        assert_eq!(out["token_preview"], "atlasv1....mnop");

        let none = tools(None);
        let out = call(&none, "get_current_token", json!({}), &s).await.unwrap();
        assert_eq!(out["status"], "not_configured");
        assert_eq!(out["has_token"], false);
    }

    #[tokio::test]
    async fn test_clear_session_flags() {
        let t = tools(None);
        let s = session("s1");
        call(&t, "set_token", json!({"token": "tok"}), &s).await.unwrap();
        call(&t, "set_context", json!({"organization": "acme"}), &s).await.unwrap();

        let out = call(&t, "clear_session", json!({"clear_token": false, "clear_context": false}), &s)
            .await
            .unwrap();
        assert_eq!(out["status"], "info");

        let out = call(&t, "clear_session", json!({"clear_context": false}), &s).await.unwrap();
        assert!(out["message"].as_str().unwrap().contains("(token)"));
        assert!(t.resolver().resolve(None, Some("s1")).is_none());
        assert_eq!(t.resolver().store().context("s1").organization.as_deref(), Some("acme"));

        call(&t, "clear_session", json!({}), &s).await.unwrap();
        assert!(t.resolver().store().context("s1").is_empty());
    }

    #[tokio::test]
    async fn test_set_context_requires_a_value() {
        let t = tools(None);
        let err = call(&t, "set_context", json!({}), &session("s1")).await.unwrap_err();
        assert_eq!(err.kind(), "invalid_argument");
    }

    #[tokio::test]
    async fn test_context_is_per_session() {
        let t = tools(None);
        call(&t, "set_context", json!({"organization": "a"}), &session("s1")).await.unwrap();
        call(&t, "set_context", json!({"organization": "b", "workspace": "w"}), &session("s2"))
            .await
            .unwrap();

        let out = call(&t, "get_context", json!({}), &session("s1")).await.unwrap();
        assert_eq!(out["context"]["organization"], "a");
        assert!(out["context"]["workspace"].is_null());
    }

    #[tokio::test]
    async fn test_api_tool_without_credential() {
        let t = tools(None);
        let err = call(&t, "list_organizations", json!({}), &session("s1"))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::Credential(CredentialError::MissingCredential)));
        assert_eq!(err.to_payload()["kind"], "missing_credential");
    }

    #[tokio::test]
    async fn test_list_workspaces_needs_organization() {
        let t = tools(Some("env-token"));
        let err = call(&t, "list_workspaces", json!({}), &session("s1"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "invalid_argument");
    }

    #[tokio::test]
    async fn test_client_context_status() {
        let t = tools(None);
        let out = call(&t, "get_client_context", json!({}), &session("s1")).await.unwrap();
        assert_eq!(out["status"], "info");
    }

    #[tokio::test]
    async fn test_client_preferences() {
        let t = tools(None);
        let out = call(&t, "get_client_preferences", json!({}), &session("s1")).await.unwrap();
        assert_eq!(out["status"], "success");
        assert_eq!(out["preferences"], json!({}));

        let mut headers = http::HeaderMap::new();
        headers.insert("mcp-session-id", "s2".parse().unwrap());
        headers.insert(
            "x-client-preferences",
            r#"{"theme": "dark", "verbose": true}"#.parse().unwrap(),
        );
        let s2 = RequestSession::from_headers(&headers);
        t.resolver().store().set_client_context(&s2.session_id, s2.client.clone());

        let out = call(&t, "get_client_preferences", json!({}), &s2).await.unwrap();
        assert_eq!(out["preferences"]["theme"], "dark");
        assert_eq!(out["preferences"]["verbose"], true);

        let other = call(&t, "get_client_preferences", json!({}), &session("s1")).await.unwrap();
        assert_eq!(other["preferences"], json!({}));
    }

    #[tokio::test]
    async fn test_set_token_keeps_single_entry() {
        let t = tools(None);
        let s = session("s1");
        call(&t, "set_token", json!({"token": " atlasv1.first-token-value "}), &s)
            .await
            .unwrap();
        assert_eq!(
            t.resolver().resolve(None, Some("s1")).as_deref(),
            Some("atlasv1.first-token-value")
        );
        assert_eq!(t.resolver().store().len(), 1);
    }

    #[tokio::test]
    async fn test_session_status_reports_source_not_token() {
        let t = tools(None);
        let s = session("s1");
        call(&t, "set_token", json!({"token": "atlasv1.status-secret"}), &s).await.unwrap();

        let out = call(&t, "get_session_status", json!({}), &s).await.unwrap();
        assert_eq!(out["session_id"], "s1");
        assert_eq!(out["transport"], "streamable-http");
        assert_eq!(out["has_token"], true);
        assert_eq!(out["token_source"], "session");
        assert!(!out.to_string().contains("status-secret"));
    }
}
