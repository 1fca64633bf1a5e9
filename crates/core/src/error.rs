//! Provisioning error taxonomy.

use thiserror::Error;

use crate::records::RecordError;

/// Errors surfaced by token acquisition, address allocation, group linking
/// and the orchestrator.
#[derive(Debug, Error)]
pub enum ProvisioningError {
    /// One or more of tenant id, client id, client secret, domain is absent.
    #[error("directory credentials missing: {}", missing.join(", "))]
    CredentialsMissing { missing: Vec<String> },

    /// The token endpoint failed or answered without an access token.
    #[error("token acquisition failed: {0}")]
    TokenAcquisitionFailed(String),

    /// A lookup returned something other than present/absent.
    #[error("directory lookup failed: {0}")]
    DirectoryLookupError(String),

    /// Every suffixed candidate for this base is taken.
    #[error("no free address for {base} after exhausting numeric suffixes")]
    AddressExhausted { base: String },

    /// The directory rejected the create-account call.
    #[error("account creation failed: {0}")]
    AccountCreationFailed(String),

    /// Adding the member to the distribution list failed.
    #[error("membership link failed: {0}")]
    MembershipLinkFailed(String),

    /// No distribution list matched the unit's naming convention.
    #[error("distribution list not found (tried: {})", tried.join(" and "))]
    GroupNotFound { tried: Vec<String> },

    /// The local record cannot be provisioned as-is.
    #[error("invalid record: {0}")]
    InvalidRecord(String),

    #[error("record store error: {0}")]
    Store(#[from] RecordError),
}

impl ProvisioningError {
    /// True for failures an administrator fixes in configuration rather than
    /// remote or transient errors.
    pub fn is_configuration(&self) -> bool {
        matches!(self, ProvisioningError::CredentialsMissing { .. })
    }

    /// Short stable label used in metrics and audit records.
    pub fn kind(&self) -> &'static str {
        match self {
            ProvisioningError::CredentialsMissing { .. } => "credentials_missing",
            ProvisioningError::TokenAcquisitionFailed(_) => "token_acquisition_failed",
            ProvisioningError::DirectoryLookupError(_) => "directory_lookup_error",
            ProvisioningError::AddressExhausted { .. } => "address_exhausted",
            ProvisioningError::AccountCreationFailed(_) => "account_creation_failed",
            ProvisioningError::MembershipLinkFailed(_) => "membership_link_failed",
            ProvisioningError::GroupNotFound { .. } => "group_not_found",
            ProvisioningError::InvalidRecord(_) => "invalid_record",
            ProvisioningError::Store(_) => "store",
        }
    }
}
