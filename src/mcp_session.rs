//! Streamable HTTP session manager that ties MCP sessions to stored credentials
//!
//! Session workers live in memory. When a client closes its MCP session
//! (`DELETE /mcp`), the token and context stored under that session id are
//! dropped with it. Sessions that simply go away are reclaimed by the store's
//! idle sweeper.

use std::{collections::HashMap, sync::Arc};

use futures::Stream;
use thiserror::Error;
use tokio::sync::RwLock;
use tokio_stream::wrappers::ReceiverStream;

use rmcp::{
    model::{ClientJsonRpcMessage, ServerJsonRpcMessage},
    transport::{
        WorkerTransport,
        common::server_side_http::{SessionId, ServerSseMessage, session_id},
        streamable_http_server::session::{
            SessionManager,
            local::{
                LocalSessionWorker, LocalSessionHandle, SessionConfig,
                SessionError, create_local_session, EventIdParseError,
            },
        },
    },
};

use crate::session::SessionStore;

#[derive(Debug, Error)]
pub enum CredentialSessionError {
    #[error("Session not found: {0}")]
    SessionNotFound(SessionId),
    #[error("Session error: {0}")]
    SessionError(#[from] SessionError),
    #[error("Invalid event id: {0}")]
    InvalidEventId(#[from] EventIdParseError),
}

/// In-memory MCP session manager that clears credentials on session close
pub struct CredentialSessionManager {
    sessions: RwLock<HashMap<SessionId, LocalSessionHandle>>,
    session_config: SessionConfig,
    store: Arc<SessionStore>,
}

impl CredentialSessionManager {
    pub fn new(store: Arc<SessionStore>) -> Self {
        Self::with_config(store, SessionConfig::default())
    }

    pub fn with_config(store: Arc<SessionStore>, session_config: SessionConfig) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            session_config,
            store,
        }
    }

    /// Number of live MCP sessions
    pub async fn active_sessions(&self) -> usize {
        self.sessions.read().await.len()
    }
}

impl SessionManager for CredentialSessionManager {
    type Error = CredentialSessionError;
    type Transport = WorkerTransport<LocalSessionWorker>;

    async fn create_session(&self) -> Result<(SessionId, Self::Transport), Self::Error> {
        let id = session_id();
        let (handle, worker) = create_local_session(id.clone(), self.session_config.clone());
        self.sessions.write().await.insert(id.clone(), handle);

        tracing::info!(session_id = %id, "Created MCP session");
        Ok((id, WorkerTransport::spawn(worker)))
    }

    async fn initialize_session(
        &self,
        id: &SessionId,
        message: ClientJsonRpcMessage,
    ) -> Result<ServerJsonRpcMessage, Self::Error> {
        let sessions = self.sessions.read().await;
        let handle = sessions
            .get(id)
            .ok_or_else(|| CredentialSessionError::SessionNotFound(id.clone()))?;
        Ok(handle.initialize(message).await?)
    }

    async fn has_session(&self, id: &SessionId) -> Result<bool, Self::Error> {
        Ok(self.sessions.read().await.contains_key(id))
    }

    async fn close_session(&self, id: &SessionId) -> Result<(), Self::Error> {
        let handle = self.sessions.write().await.remove(id);
        let had_credentials = self.store.remove_session(id.as_ref());
        tracing::info!(session_id = %id, had_credentials, "Closed MCP session");

        if let Some(handle) = handle {
            handle.close().await?;
        }
        Ok(())
    }

    async fn create_stream(
        &self,
        id: &SessionId,
        message: ClientJsonRpcMessage,
    ) -> Result<impl Stream<Item = ServerSseMessage> + Send + 'static, Self::Error> {
        let sessions = self.sessions.read().await;
        let handle = sessions
            .get(id)
            .ok_or_else(|| CredentialSessionError::SessionNotFound(id.clone()))?;

        let receiver = handle.establish_request_wise_channel().await?;
        handle
            .push_message(message, receiver.http_request_id)
            .await?;
        Ok(ReceiverStream::new(receiver.inner))
    }

    async fn create_standalone_stream(
        &self,
        id: &SessionId,
    ) -> Result<impl Stream<Item = ServerSseMessage> + Send + 'static, Self::Error> {
        let sessions = self.sessions.read().await;
        let handle = sessions
            .get(id)
            .ok_or_else(|| CredentialSessionError::SessionNotFound(id.clone()))?;

        let receiver = handle.establish_common_channel().await?;
        Ok(ReceiverStream::new(receiver.inner))
    }

    async fn resume(
        &self,
        id: &SessionId,
        last_event_id: String,
    ) -> Result<impl Stream<Item = ServerSseMessage> + Send + 'static, Self::Error> {
        let sessions = self.sessions.read().await;
        let handle = sessions
            .get(id)
            .ok_or_else(|| CredentialSessionError::SessionNotFound(id.clone()))?;

        let receiver = handle.resume(last_event_id.parse()?).await?;
        Ok(ReceiverStream::new(receiver.inner))
    }

    async fn accept_message(
        &self,
        id: &SessionId,
        message: ClientJsonRpcMessage,
    ) -> Result<(), Self::Error> {
        let sessions = self.sessions.read().await;
        let handle = sessions
            .get(id)
            .ok_or_else(|| CredentialSessionError::SessionNotFound(id.clone()))?;

        handle.push_message(message, None).await?;
        Ok(())
    }
}
