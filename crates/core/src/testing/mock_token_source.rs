//! Mock token source for testing.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::config::DirectoryCredentials;
use crate::error::ProvisioningError;
use crate::token::{BearerToken, TokenSource};

/// Mock implementation of the TokenSource trait.
///
/// Hands out a fixed token and counts acquisitions; can be switched to fail.
#[derive(Debug)]
pub struct MockTokenSource {
    token: String,
    acquisitions: Arc<AtomicUsize>,
    failure: Arc<RwLock<Option<String>>>,
}

impl Default for MockTokenSource {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTokenSource {
    pub fn new() -> Self {
        Self {
            token: "mock-token".to_string(),
            acquisitions: Arc::new(AtomicUsize::new(0)),
            failure: Arc::new(RwLock::new(None)),
        }
    }

    /// Make every acquisition fail with `TokenAcquisitionFailed(message)`.
    pub async fn fail_with(&self, message: impl Into<String>) {
        *self.failure.write().await = Some(message.into());
    }

    /// Number of acquire calls so far.
    pub fn acquisitions(&self) -> usize {
        self.acquisitions.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenSource for MockTokenSource {
    async fn acquire(
        &self,
        _credentials: &DirectoryCredentials,
    ) -> Result<BearerToken, ProvisioningError> {
        self.acquisitions.fetch_add(1, Ordering::SeqCst);

        if let Some(message) = self.failure.read().await.clone() {
            return Err(ProvisioningError::TokenAcquisitionFailed(message));
        }

        Ok(BearerToken::new(self.token.clone()))
    }
}
