//! Per-request session identity
//!
//! The transport hands the server an HTTP request (streamable HTTP) or nothing
//! at all (stdio). This module turns that into the session id used as the
//! store key, plus any client metadata headers sent alongside.

use http::HeaderMap;
use serde::Serialize;
use serde_json::Value;

use super::types::ClientContext;

/// Session used when the transport carries no session header. The bundled
/// HTTP server runs rmcp in stateful mode, which rejects tool calls without
/// `Mcp-Session-Id`, so there this only applies to stdio. Embedders serving
/// the bridge through a stateless streamable HTTP config also land here.
pub const DEFAULT_SESSION_ID: &str = "default";

/// Session id headers, in order of preference. `x-session-id` is for
/// gateways that front the server and forward their own session id.
pub const SESSION_HEADERS: [&str; 2] = ["mcp-session-id", "x-session-id"];

pub const CLIENT_REGION_HEADER: &str = "x-client-region";
pub const CLIENT_AGENT_HEADER: &str = "x-client-agent";
pub const CLIENT_TIMESTAMP_HEADER: &str = "x-client-timestamp";
pub const CLIENT_PREFERENCES_HEADER: &str = "x-client-preferences";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Transport {
    StreamableHttp,
    Stdio,
}

/// Who is calling: resolved once per tool call
#[derive(Debug, Clone)]
pub struct RequestSession {
    pub session_id: String,
    pub transport: Transport,
    pub client: ClientContext,
}

impl RequestSession {
    /// Identity for a call that arrived without HTTP request parts
    pub fn stdio() -> Self {
        Self {
            session_id: DEFAULT_SESSION_ID.to_string(),
            transport: Transport::Stdio,
            client: ClientContext::default(),
        }
    }

    pub fn from_headers(headers: &HeaderMap) -> Self {
        let session_id = session_id_from_headers(headers).unwrap_or_else(|| {
            tracing::debug!("No session header on request, using default session");
            DEFAULT_SESSION_ID.to_string()
        });
        Self {
            session_id,
            transport: Transport::StreamableHttp,
            client: client_context_from_headers(headers),
        }
    }

    pub fn from_parts(parts: Option<&http::request::Parts>) -> Self {
        match parts {
            Some(parts) => Self::from_headers(&parts.headers),
            None => Self::stdio(),
        }
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

pub fn session_id_from_headers(headers: &HeaderMap) -> Option<String> {
    SESSION_HEADERS
        .iter()
        .find_map(|name| header_str(headers, name))
        .map(str::to_string)
}

/// Parse the `X-Client-*` headers. Values that fail to parse are dropped.
pub fn client_context_from_headers(headers: &HeaderMap) -> ClientContext {
    let mut client = ClientContext::default();

    if let Some(region) = header_str(headers, CLIENT_REGION_HEADER) {
        client.region = Some(region.to_string());
        client.raw_headers.insert("X-Client-Region".into(), region.to_string());
    }

    if let Some(agent) = header_str(headers, CLIENT_AGENT_HEADER) {
        client.agent_name = Some(agent.to_string());
        client.raw_headers.insert("X-Client-Agent".into(), agent.to_string());
    }

    if let Some(raw) = header_str(headers, CLIENT_TIMESTAMP_HEADER) {
        match raw.parse::<f64>() {
            Ok(ts) if ts.is_finite() => {
                client.timestamp = Some(ts);
                client.raw_headers.insert("X-Client-Timestamp".into(), raw.to_string());
            }
            _ => tracing::warn!(value = %raw, "Ignoring invalid X-Client-Timestamp"),
        }
    }

    if let Some(raw) = header_str(headers, CLIENT_PREFERENCES_HEADER) {
        match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(prefs)) => {
                client.preferences = Some(prefs);
                client.raw_headers.insert("X-Client-Preferences".into(), raw.to_string());
            }
            Ok(_) => tracing::warn!("Ignoring X-Client-Preferences: not a JSON object"),
            Err(e) => tracing::warn!(error = %e, "Ignoring X-Client-Preferences: invalid JSON"),
        }
    }

    client
}
