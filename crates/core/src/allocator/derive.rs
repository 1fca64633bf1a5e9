//! Display name to mailbox address derivation.

use crate::error::ProvisioningError;

/// The `first.last` local part and domain every candidate address is built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailboxBase {
    local: String,
    domain: String,
}

impl MailboxBase {
    /// The un-suffixed local part, e.g. `lalith.kumar`.
    pub fn local(&self) -> &str {
        &self.local
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Candidate address for a probe attempt.
    ///
    /// `None` is the plain address; `Some(n)` appends the numeric suffix
    /// directly to the local part (`lalith.kumar2@...`).
    pub fn candidate(&self, suffix: Option<u32>) -> String {
        match suffix {
            None => format!("{}@{}", self.local, self.domain),
            Some(n) => format!("{}{}@{}", self.local, n, self.domain),
        }
    }
}

/// Derive the base address for a display name.
///
/// The name is split on whitespace; the first and last parts are lowercased
/// and joined with a dot. A single-part name is used twice. No
/// transliteration or punctuation stripping happens.
pub fn derive_mailbox_base(
    display_name: &str,
    domain: &str,
) -> Result<MailboxBase, ProvisioningError> {
    let parts: Vec<String> = display_name
        .split_whitespace()
        .map(str::to_lowercase)
        .collect();

    let first = parts.first().ok_or_else(|| {
        ProvisioningError::InvalidRecord("display name is empty".to_string())
    })?;
    let last = parts.last().unwrap_or(first);

    Ok(MailboxBase {
        local: format!("{}.{}", first, last),
        domain: domain.to_string(),
    })
}

/// The part of an address before the first `@`, used as the mail nickname.
pub fn local_part(address: &str) -> &str {
    address.split('@').next().unwrap_or(address)
}
