//! Mailbox address allocation.
//!
//! Derives `first.last@domain` from a display name, probes the directory
//! for a free principal name (`base`, `base2`, `base3`, ...), then creates
//! the account. Probing only narrows the odds of a collision; the
//! directory's own uniqueness check on create is authoritative, and a
//! create rejected by a concurrent allocation is reported, never retried.

mod derive;

pub use derive::{derive_mailbox_base, local_part, MailboxBase};

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::config::ProvisioningConfig;
use crate::directory::{Directory, DirectoryError, NewAccount, PasswordProfile, PrincipalLookup};
use crate::error::ProvisioningError;
use crate::metrics;
use crate::token::BearerToken;

/// An account the directory confirmed as created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisionedAccount {
    /// Resolved principal name / mailbox address.
    pub address: String,
    /// Directory object id of the new account.
    pub account_ref: String,
}

/// Resolves unique addresses and creates accounts.
pub struct AddressAllocator {
    directory: Arc<dyn Directory>,
    settings: ProvisioningConfig,
}

impl AddressAllocator {
    pub fn new(directory: Arc<dyn Directory>, settings: ProvisioningConfig) -> Self {
        Self {
            directory,
            settings,
        }
    }

    /// Find the first free candidate for `base`.
    ///
    /// Tries the plain address, then suffixes `2..=max_suffix` in order.
    /// A lookup answering anything but present/absent aborts with
    /// `DirectoryLookupError`; running out of suffixes yields
    /// `AddressExhausted`.
    pub async fn resolve_address(
        &self,
        token: &BearerToken,
        base: &MailboxBase,
    ) -> Result<String, ProvisioningError> {
        let mut suffix: Option<u32> = None;
        let mut probes: u32 = 0;

        loop {
            let candidate = base.candidate(suffix);
            probes += 1;

            let lookup = self
                .directory
                .lookup_principal(token, &candidate)
                .await
                .map_err(|e| {
                    error!("Error checking address {}: {}", candidate, e);
                    ProvisioningError::DirectoryLookupError(e.to_string())
                })?;

            match lookup {
                PrincipalLookup::Absent => {
                    info!("Address available: {}", candidate);
                    metrics::ADDRESS_PROBES.observe(probes as f64);
                    return Ok(candidate);
                }
                PrincipalLookup::Present => {
                    let next = suffix.map_or(2, |n| n + 1);
                    if next > self.settings.max_suffix {
                        error!(
                            "No free address for {}@{} after {} probes",
                            base.local(),
                            base.domain(),
                            probes
                        );
                        metrics::ADDRESS_PROBES.observe(probes as f64);
                        return Err(ProvisioningError::AddressExhausted {
                            base: base.candidate(None),
                        });
                    }
                    suffix = Some(next);
                    debug!("Address {} taken, trying suffix {}", candidate, next);
                }
                PrincipalLookup::Unexpected { status } => {
                    error!("Error checking address {}: HTTP {}", candidate, status);
                    return Err(ProvisioningError::DirectoryLookupError(format!(
                        "lookup of {} returned HTTP {}",
                        candidate, status
                    )));
                }
            }
        }
    }

    /// Build the create-account body for a resolved address.
    pub fn new_account(&self, display_name: &str, address: &str) -> NewAccount {
        NewAccount {
            account_enabled: true,
            display_name: display_name.to_string(),
            mail_nickname: local_part(address).to_string(),
            user_principal_name: address.to_string(),
            usage_location: self.settings.usage_location.clone(),
            password_profile: PasswordProfile {
                force_change_password_next_sign_in: true,
                password: self.settings.initial_password.clone(),
            },
        }
    }

    /// Create the account for a resolved address. One attempt, no re-probe.
    pub async fn create_account(
        &self,
        token: &BearerToken,
        display_name: &str,
        address: &str,
    ) -> Result<ProvisionedAccount, ProvisioningError> {
        let account = self.new_account(display_name, address);

        let created = self
            .directory
            .create_account(token, &account)
            .await
            .map_err(|e| {
                let message = match e {
                    DirectoryError::ApiError { message, .. } => message,
                    other => other.to_string(),
                };
                error!("Failed to create account {}: {}", address, message);
                ProvisioningError::AccountCreationFailed(message)
            })?;

        info!("Created account {} ({})", address, created.id);
        Ok(ProvisionedAccount {
            address: address.to_string(),
            account_ref: created.id,
        })
    }

    /// Derive, resolve and create in one step.
    pub async fn allocate(
        &self,
        token: &BearerToken,
        display_name: &str,
        domain: &str,
    ) -> Result<ProvisionedAccount, ProvisioningError> {
        let base = derive_mailbox_base(display_name, domain)?;
        info!("Processing: {} -> {}", display_name, base.candidate(None));

        let address = self.resolve_address(token, &base).await?;
        self.create_account(token, display_name, &address).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockDirectory;

    const DOMAIN: &str = "techcarrot.ae";

    fn allocator(directory: &Arc<MockDirectory>) -> AddressAllocator {
        AddressAllocator::new(
            Arc::clone(directory) as Arc<dyn Directory>,
            ProvisioningConfig::default(),
        )
    }

    fn token() -> BearerToken {
        BearerToken::new("t")
    }

    #[tokio::test]
    async fn test_no_conflict_uses_plain_address() {
        let directory = Arc::new(MockDirectory::new());

        let account = allocator(&directory)
            .allocate(&token(), "Lalith Kumar", DOMAIN)
            .await
            .unwrap();

        assert_eq!(account.address, "lalith.kumar@techcarrot.ae");
        assert_eq!(
            directory.lookup_calls().await,
            vec!["lalith.kumar@techcarrot.ae"]
        );
        assert_eq!(directory.created_accounts().await.len(), 1);
    }

    #[tokio::test]
    async fn test_one_conflict_uses_suffix_two() {
        let directory = Arc::new(MockDirectory::new());
        directory.add_principal("lalith.kumar@techcarrot.ae").await;

        let account = allocator(&directory)
            .allocate(&token(), "Lalith Kumar", DOMAIN)
            .await
            .unwrap();

        assert_eq!(account.address, "lalith.kumar2@techcarrot.ae");
        assert_eq!(
            directory.lookup_calls().await,
            vec!["lalith.kumar@techcarrot.ae", "lalith.kumar2@techcarrot.ae"]
        );
        assert_eq!(directory.created_accounts().await.len(), 1);
    }

    #[tokio::test]
    async fn test_n_conflicts_try_n_plus_one_candidates_in_order() {
        for n in [0u32, 1, 2, 5, 17] {
            let directory = Arc::new(MockDirectory::new());
            directory.add_conflicts("lalith.kumar", DOMAIN, n).await;

            let base = derive_mailbox_base("Lalith Kumar", DOMAIN).unwrap();
            let address = allocator(&directory)
                .resolve_address(&token(), &base)
                .await
                .unwrap();

            let lookups = directory.lookup_calls().await;
            assert_eq!(lookups.len() as u32, n + 1);
            assert_eq!(lookups[0], "lalith.kumar@techcarrot.ae");
            for (i, candidate) in lookups.iter().enumerate().skip(1) {
                assert_eq!(
                    candidate,
                    &format!("lalith.kumar{}@techcarrot.ae", i + 1)
                );
            }
            assert_eq!(&address, lookups.last().unwrap());
        }
    }

    #[tokio::test]
    async fn test_ninety_nine_conflicts_still_resolve() {
        let directory = Arc::new(MockDirectory::new());
        directory.add_conflicts("lalith.kumar", DOMAIN, 99).await;

        let account = allocator(&directory)
            .allocate(&token(), "Lalith Kumar", DOMAIN)
            .await
            .unwrap();

        assert_eq!(account.address, "lalith.kumar100@techcarrot.ae");
        assert_eq!(directory.lookup_calls().await.len(), 100);
    }

    #[tokio::test]
    async fn test_exhaustion_issues_no_create() {
        let directory = Arc::new(MockDirectory::new());
        directory.add_conflicts("lalith.kumar", DOMAIN, 100).await;

        let result = allocator(&directory)
            .allocate(&token(), "Lalith Kumar", DOMAIN)
            .await;

        match result {
            Err(ProvisioningError::AddressExhausted { base }) => {
                assert_eq!(base, "lalith.kumar@techcarrot.ae");
            }
            other => panic!("expected AddressExhausted, got {:?}", other),
        }
        assert_eq!(directory.lookup_calls().await.len(), 100);
        assert!(directory.created_accounts().await.is_empty());
    }

    #[tokio::test]
    async fn test_unexpected_lookup_status_aborts() {
        let directory = Arc::new(MockDirectory::new());
        directory.set_lookup_status(500).await;

        let result = allocator(&directory)
            .allocate(&token(), "Lalith Kumar", DOMAIN)
            .await;

        assert!(matches!(
            result,
            Err(ProvisioningError::DirectoryLookupError(_))
        ));
        assert_eq!(directory.lookup_calls().await.len(), 1);
        assert!(directory.created_accounts().await.is_empty());
    }

    #[tokio::test]
    async fn test_create_body_matches_directory_contract() {
        let directory = Arc::new(MockDirectory::new());
        directory.add_principal("lalith.kumar@techcarrot.ae").await;

        allocator(&directory)
            .allocate(&token(), "Lalith Kumar", DOMAIN)
            .await
            .unwrap();

        let created = directory.created_accounts().await;
        let body = &created[0];
        assert!(body.account_enabled);
        assert_eq!(body.display_name, "Lalith Kumar");
        assert_eq!(body.mail_nickname, "lalith.kumar2");
        assert_eq!(body.user_principal_name, "lalith.kumar2@techcarrot.ae");
        assert_eq!(body.usage_location, "AE");
        assert!(body.password_profile.force_change_password_next_sign_in);
        assert_eq!(body.password_profile.password, "Welcome@123");
    }

    #[tokio::test]
    async fn test_rejected_create_carries_directory_message() {
        let directory = Arc::new(MockDirectory::new());
        directory
            .fail_next_create(400, "Password does not meet complexity requirements.")
            .await;

        let result = allocator(&directory)
            .allocate(&token(), "Lalith Kumar", DOMAIN)
            .await;

        match result {
            Err(ProvisioningError::AccountCreationFailed(message)) => {
                assert_eq!(message, "Password does not meet complexity requirements.");
            }
            other => panic!("expected AccountCreationFailed, got {:?}", other),
        }
        assert_eq!(directory.created_accounts().await.len(), 1);
    }

    #[tokio::test]
    async fn test_empty_display_name_makes_no_calls() {
        let directory = Arc::new(MockDirectory::new());

        let result = allocator(&directory).allocate(&token(), "  ", DOMAIN).await;

        assert!(matches!(result, Err(ProvisioningError::InvalidRecord(_))));
        assert!(directory.calls().await.is_empty());
    }
}
