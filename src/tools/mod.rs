//! MCP tools: typed parameters, method parsing and the implementations

pub mod handlers;
pub mod methods;
pub mod params;

pub use handlers::{TfcTools, ToolError};
pub use methods::{MethodParseError, TfcMethod};
