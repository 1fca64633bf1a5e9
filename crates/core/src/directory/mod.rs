//! Directory service integration.
//!
//! The [`Directory`] trait covers the four remote calls provisioning needs:
//! principal lookup, account creation, group search by mail and member
//! append. [`GraphDirectory`] talks to Microsoft Graph; tests use
//! `testing::MockDirectory`.

mod graph;
mod types;

pub use graph::GraphDirectory;
pub use types::*;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use thiserror::Error;

use crate::token::BearerToken;

/// Errors that can occur when talking to the directory.
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// HTTP request failed (connect, timeout, body read).
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// The directory answered with an unexpected status.
    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    /// Failed to parse response.
    #[error("Failed to parse response: {0}")]
    ParseError(String),
}

/// Remote directory operations used by provisioning.
///
/// Every method performs exactly one request.
#[async_trait]
pub trait Directory: Send + Sync {
    /// Look up an account by principal name.
    async fn lookup_principal(
        &self,
        token: &BearerToken,
        principal_name: &str,
    ) -> Result<PrincipalLookup, DirectoryError>;

    /// Create an account. Anything but 201 is an `ApiError` carrying the
    /// directory's error message.
    async fn create_account(
        &self,
        token: &BearerToken,
        account: &NewAccount,
    ) -> Result<DirectoryAccount, DirectoryError>;

    /// Find groups whose `mail` equals `mail` exactly.
    async fn find_groups_by_mail(
        &self,
        token: &BearerToken,
        mail: &str,
    ) -> Result<Vec<DirectoryGroup>, DirectoryError>;

    /// Append an account to a group's members. Returns the raw HTTP status;
    /// interpreting it is the caller's job.
    async fn add_group_member(
        &self,
        token: &BearerToken,
        group_id: &str,
        account_id: &str,
    ) -> Result<u16, DirectoryError>;
}

/// Build the HTTP client shared by the token source and directory client.
pub fn build_http_client(timeout_secs: u32) -> Result<Client, DirectoryError> {
    let client = Client::builder()
        .user_agent(concat!("Mailwright/", env!("CARGO_PKG_VERSION")))
        .timeout(Duration::from_secs(timeout_secs as u64))
        .build()?;
    Ok(client)
}
