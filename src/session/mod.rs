//! Session-scoped Terraform Cloud credentials
//!
//! - [`store`] - concurrent per-session table of tokens and context
//! - [`resolver`] - explicit > session > server default precedence
//! - [`context`] - session id and client metadata from request headers
//! - [`types`] - masked secrets and context records

pub mod context;
pub mod error;
pub mod resolver;
pub mod store;
pub mod types;

pub use context::{RequestSession, Transport, DEFAULT_SESSION_ID};
pub use error::CredentialError;
pub use resolver::{ResolvedToken, TokenResolver};
pub use store::{SessionStore, SessionStoreConfig};
pub use types::{ClientContext, Secret, SessionSnapshot, TokenSource, WorkspaceContext};
