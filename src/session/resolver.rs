use std::sync::Arc;

use super::error::CredentialError;
use super::store::SessionStore;
use super::types::{Secret, TokenSource};

/// A token picked for one outbound API call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedToken {
    pub token: Secret,
    pub source: TokenSource,
}

/// Picks the credential for an API call.
///
/// Order: explicit argument, then the caller's session entry, then the
/// server-wide default. Resolution never writes credentials.
#[derive(Debug, Clone)]
pub struct TokenResolver {
    store: Arc<SessionStore>,
    default_token: Option<Secret>,
}

impl TokenResolver {
    pub fn new(store: Arc<SessionStore>, default_token: Option<String>) -> Self {
        let default_token = default_token
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .map(Secret::new);
        Self {
            store,
            default_token,
        }
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    pub fn has_default(&self) -> bool {
        self.default_token.is_some()
    }

    pub fn resolve(&self, explicit: Option<&str>, session_id: Option<&str>) -> Option<String> {
        self.resolve_with_source(explicit, session_id)
            .map(|resolved| resolved.token.expose().to_string())
    }

    pub fn resolve_with_source(
        &self,
        explicit: Option<&str>,
        session_id: Option<&str>,
    ) -> Option<ResolvedToken> {
        if let Some(token) = explicit.map(str::trim).filter(|t| !t.is_empty()) {
            return Some(ResolvedToken {
                token: Secret::new(token),
                source: TokenSource::Explicit,
            });
        }

        if let Some(token) = session_id.and_then(|id| self.store.get(id)) {
            return Some(ResolvedToken {
                token,
                source: TokenSource::Session,
            });
        }

        self.default_token.clone().map(|token| ResolvedToken {
            token,
            source: TokenSource::Environment,
        })
    }

    /// Like [`resolve_with_source`](Self::resolve_with_source), failing with
    /// `MissingCredential` instead of returning `None`
    pub fn require(
        &self,
        explicit: Option<&str>,
        session_id: Option<&str>,
    ) -> Result<ResolvedToken, CredentialError> {
        self.resolve_with_source(explicit, session_id)
            .ok_or(CredentialError::MissingCredential)
    }
}
