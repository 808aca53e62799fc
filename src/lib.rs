pub mod config;
pub mod mcp_bridge;
pub mod mcp_session;
pub mod server;
pub mod session;
pub mod tfc;
pub mod tools;

// Re-export commonly used items
pub use mcp_bridge::TfcMcpBridge;
pub use mcp_session::CredentialSessionManager;
pub use session::{RequestSession, SessionStore, SessionStoreConfig, TokenResolver};
pub use tfc::TfcClient;
