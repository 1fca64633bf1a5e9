//! Bearer token acquisition for the directory API.

mod client_credentials;

pub use client_credentials::ClientCredentialsTokenSource;

use async_trait::async_trait;

use crate::config::DirectoryCredentials;
use crate::error::ProvisioningError;

/// An access token presented on every directory call.
///
/// Short-lived and never persisted; `Debug` does not print the value.
#[derive(Clone, PartialEq, Eq)]
pub struct BearerToken(String);

impl BearerToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("BearerToken(<redacted>)")
    }
}

/// Source of bearer tokens.
///
/// Implementations perform exactly one exchange per call; there is no
/// caching or retry.
#[async_trait]
pub trait TokenSource: Send + Sync {
    /// Exchange service credentials for a bearer token.
    async fn acquire(
        &self,
        credentials: &DirectoryCredentials,
    ) -> Result<BearerToken, ProvisioningError>;
}
