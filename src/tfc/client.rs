//! HTTP client for the Terraform Cloud / Terraform Enterprise REST API.
//!
//! The client holds no credentials. Every call takes the token resolved for
//! that request, so one client (and its connection pool) serves all sessions.

use std::time::Duration;

use reqwest::{header, Client, Url};
use serde_json::Value;
use tracing::debug;

use super::ApiError;
use crate::session::Secret;

/// Terraform Cloud SaaS
pub const DEFAULT_TFC_ADDRESS: &str = "https://app.terraform.io";

/// JSON:API media type used by every v2 endpoint
const JSON_API_MEDIA_TYPE: &str = "application/vnd.api+json";

/// HTTP request timeout in seconds
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Largest page Terraform Cloud accepts
const MAX_PAGE_SIZE: u32 = 100;

/// Pagination and filtering for workspace listings
#[derive(Debug, Clone, Default)]
pub struct WorkspaceQuery {
    pub search: Option<String>,
    pub page_number: Option<u32>,
    pub page_size: Option<u32>,
}

impl WorkspaceQuery {
    fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(search) = self.search.as_deref().filter(|s| !s.is_empty()) {
            params.push(("search[name]", search.to_string()));
        }
        if let Some(page) = self.page_number {
            params.push(("page[number]", page.max(1).to_string()));
        }
        if let Some(size) = self.page_size {
            params.push(("page[size]", size.clamp(1, MAX_PAGE_SIZE).to_string()));
        }
        params
    }
}

/// Terraform Cloud API client.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone, Debug)]
pub struct TfcClient {
    client: Client,
    base_url: Url,
}

impl TfcClient {
    /// Create a client for `address` (e.g. `https://app.terraform.io`)
    pub fn new(address: &str) -> Result<Self, ApiError> {
        let base_url = Url::parse(address.trim_end_matches('/'))
            .map_err(|e| ApiError::InvalidAddress(format!("{}: {}", address, e)))?;
        if base_url.cannot_be_a_base() || !matches!(base_url.scheme(), "http" | "https") {
            return Err(ApiError::InvalidAddress(address.to_string()));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(concat!("tfc-mcp/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `{base}/api/v2/{segments...}` with each segment percent-encoded
    pub fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidAddress(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(["api", "v2"])
            .extend(segments);
        Ok(url)
    }

    /// GET a JSON:API document
    pub async fn get(
        &self,
        token: &Secret,
        segments: &[&str],
        query: &[(&str, String)],
    ) -> Result<Value, ApiError> {
        let url = self.endpoint(segments)?;
        debug!(url = %url, token = %token, "Terraform Cloud GET");

        let response = self
            .client
            .get(url)
            .bearer_auth(token.expose())
            .header(header::ACCEPT, JSON_API_MEDIA_TYPE)
            .header(header::CONTENT_TYPE, JSON_API_MEDIA_TYPE)
            .query(query)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::from_status(status, &body));
        }

        let text = response.text().await?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|e| ApiError::InvalidResponse(e.to_string()))
    }

    pub async fn account_details(&self, token: &Secret) -> Result<Value, ApiError> {
        self.get(token, &["account", "details"], &[]).await
    }

    pub async fn list_organizations(&self, token: &Secret) -> Result<Value, ApiError> {
        self.get(token, &["organizations"], &[]).await
    }

    pub async fn list_workspaces(
        &self,
        token: &Secret,
        organization: &str,
        query: &WorkspaceQuery,
    ) -> Result<Value, ApiError> {
        self.get(
            token,
            &["organizations", organization, "workspaces"],
            &query.to_params(),
        )
        .await
    }

    pub async fn workspace_details(
        &self,
        token: &Secret,
        organization: &str,
        workspace: &str,
    ) -> Result<Value, ApiError> {
        self.get(
            token,
            &["organizations", organization, "workspaces", workspace],
            &[],
        )
        .await
    }
}
