//! Terraform Cloud API client
//!
//! Thin wrapper over the v2 REST API. Credentials are passed per call.

pub mod client;
pub mod error;

pub use client::{TfcClient, WorkspaceQuery, DEFAULT_TFC_ADDRESS};
pub use error::ApiError;
