use thiserror::Error;

/// Failures of the credential store and token resolution.
///
/// Both are local to the triggering call and never affect other sessions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CredentialError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error(
        "Terraform Cloud API token is required. Use the set_token tool to configure \
         your token, or start the server with TFC_TOKEN set."
    )]
    MissingCredential,
}

impl CredentialError {
    /// Stable machine-readable kind for tool error payloads
    pub fn kind(&self) -> &'static str {
        match self {
            CredentialError::InvalidArgument(_) => "invalid_argument",
            CredentialError::MissingCredential => "missing_credential",
        }
    }
}
