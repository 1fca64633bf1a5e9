//! Distribution list resolution and membership.

mod naming;

pub use naming::DistributionListNames;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::directory::{Directory, DirectoryError};
use crate::error::ProvisioningError;
use crate::metrics;
use crate::token::BearerToken;

/// A distribution list found in the directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedGroup {
    pub group_ref: String,
    pub address: String,
}

/// Result of a successful add-member call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MembershipOutcome {
    /// The account was newly added.
    Added,
    /// The directory refused a duplicate; the account was already a member.
    AlreadyMember,
}

/// Whether an add-member status means "already a member".
///
/// Graph answers a duplicate `members/$ref` append with 400 Bad Request.
/// This is the only place that assumption lives.
pub fn is_already_member_response(status: u16) -> bool {
    status == 400
}

/// Resolves a unit's distribution list and attaches members to it.
pub struct GroupLinker {
    directory: Arc<dyn Directory>,
    prefix: String,
}

impl GroupLinker {
    pub fn new(directory: Arc<dyn Directory>, prefix: impl Into<String>) -> Self {
        Self {
            directory,
            prefix: prefix.into(),
        }
    }

    /// Find the unit's distribution list by naming convention.
    ///
    /// Searches the name as written first and the lowercase form only when
    /// the first search finds nothing and the two forms differ. A search the
    /// directory answers with an error status counts as no match; a
    /// transport failure aborts with `DirectoryLookupError`.
    pub async fn resolve_group(
        &self,
        token: &BearerToken,
        unit_name: &str,
        domain: &str,
    ) -> Result<ResolvedGroup, ProvisioningError> {
        let names = DistributionListNames::for_unit(unit_name, &self.prefix, domain)
            .ok_or_else(|| {
                warn!("Unit name {:?} has no distribution list address", unit_name);
                metrics::GROUP_RESOLUTIONS
                    .with_label_values(&["not_found"])
                    .inc();
                ProvisioningError::GroupNotFound { tried: Vec::new() }
            })?;

        for (attempt, address) in names.search_order().into_iter().enumerate() {
            info!("Searching for distribution list: {}", address);

            let groups = match self.directory.find_groups_by_mail(token, address).await {
                Ok(groups) => groups,
                Err(DirectoryError::ApiError { status, message }) => {
                    warn!("Group search for {} returned {}: {}", address, status, message);
                    Vec::new()
                }
                Err(e) => {
                    error!("Group search for {} failed: {}", address, e);
                    return Err(ProvisioningError::DirectoryLookupError(e.to_string()));
                }
            };

            if let Some(group) = groups.into_iter().next() {
                let label = if attempt == 0 { "primary" } else { "lowercase" };
                metrics::GROUP_RESOLUTIONS.with_label_values(&[label]).inc();
                return Ok(ResolvedGroup {
                    address: group.mail.unwrap_or_else(|| address.to_string()),
                    group_ref: group.id,
                });
            }
        }

        warn!(
            "Distribution list not found: {} or {}",
            names.primary, names.lowercase
        );
        metrics::GROUP_RESOLUTIONS
            .with_label_values(&["not_found"])
            .inc();
        Err(ProvisioningError::GroupNotFound {
            tried: names
                .search_order()
                .into_iter()
                .map(str::to_string)
                .collect(),
        })
    }

    /// Add an account to a group.
    ///
    /// 204 means added, a duplicate rejection means already a member; any
    /// other status or transport failure is `MembershipLinkFailed`.
    pub async fn link_member(
        &self,
        token: &BearerToken,
        group_ref: &str,
        account_ref: &str,
    ) -> Result<MembershipOutcome, ProvisioningError> {
        let status = self
            .directory
            .add_group_member(token, group_ref, account_ref)
            .await
            .map_err(|e| {
                error!("Failed to add {} to {}: {}", account_ref, group_ref, e);
                metrics::MEMBERSHIP_LINKS.with_label_values(&["failed"]).inc();
                ProvisioningError::MembershipLinkFailed(e.to_string())
            })?;

        if status == 204 {
            info!("Added {} to {}", account_ref, group_ref);
            metrics::MEMBERSHIP_LINKS.with_label_values(&["added"]).inc();
            Ok(MembershipOutcome::Added)
        } else if is_already_member_response(status) {
            info!("{} already in {}", account_ref, group_ref);
            metrics::MEMBERSHIP_LINKS
                .with_label_values(&["already_member"])
                .inc();
            Ok(MembershipOutcome::AlreadyMember)
        } else {
            error!("Failed to add {} to {}: HTTP {}", account_ref, group_ref, status);
            metrics::MEMBERSHIP_LINKS.with_label_values(&["failed"]).inc();
            Err(ProvisioningError::MembershipLinkFailed(format!(
                "add member returned HTTP {}",
                status
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockDirectory;

    const DOMAIN: &str = "techcarrot.ae";

    fn linker(directory: &Arc<MockDirectory>) -> GroupLinker {
        GroupLinker::new(Arc::clone(directory) as Arc<dyn Directory>, "DL_")
    }

    fn token() -> BearerToken {
        BearerToken::new("t")
    }

    #[test]
    fn test_already_member_predicate() {
        assert!(is_already_member_response(400));
        assert!(!is_already_member_response(204));
        assert!(!is_already_member_response(404));
        assert!(!is_already_member_response(500));
    }

    #[tokio::test]
    async fn test_primary_form_hit_makes_one_search() {
        let directory = Arc::new(MockDirectory::new());
        directory.add_group("g-1", "DL_Sales_Team@techcarrot.ae").await;

        let group = linker(&directory)
            .resolve_group(&token(), "Sales Team", DOMAIN)
            .await
            .unwrap();

        assert_eq!(group.group_ref, "g-1");
        assert_eq!(group.address, "DL_Sales_Team@techcarrot.ae");
        assert_eq!(
            directory.group_searches().await,
            vec!["DL_Sales_Team@techcarrot.ae"]
        );
    }

    #[tokio::test]
    async fn test_lowercase_fallback_makes_two_searches() {
        let directory = Arc::new(MockDirectory::new());
        directory.add_group("g-2", "DL_sales_team@techcarrot.ae").await;

        let group = linker(&directory)
            .resolve_group(&token(), "Sales Team", DOMAIN)
            .await
            .unwrap();

        assert_eq!(group.group_ref, "g-2");
        assert_eq!(
            directory.group_searches().await,
            vec!["DL_Sales_Team@techcarrot.ae", "DL_sales_team@techcarrot.ae"]
        );
    }

    #[tokio::test]
    async fn test_identical_forms_search_once_on_hit_and_miss() {
        let directory = Arc::new(MockDirectory::new());
        let result = linker(&directory)
            .resolve_group(&token(), "finance", DOMAIN)
            .await;
        assert!(matches!(
            result,
            Err(ProvisioningError::GroupNotFound { .. })
        ));
        assert_eq!(directory.group_searches().await.len(), 1);

        let directory = Arc::new(MockDirectory::new());
        directory.add_group("g-3", "DL_finance@techcarrot.ae").await;
        linker(&directory)
            .resolve_group(&token(), "finance", DOMAIN)
            .await
            .unwrap();
        assert_eq!(directory.group_searches().await.len(), 1);
    }

    #[tokio::test]
    async fn test_not_found_lists_both_forms() {
        let directory = Arc::new(MockDirectory::new());

        match linker(&directory)
            .resolve_group(&token(), "R&D", DOMAIN)
            .await
        {
            Err(ProvisioningError::GroupNotFound { tried }) => {
                assert_eq!(
                    tried,
                    vec!["DL_RandD@techcarrot.ae", "DL_randd@techcarrot.ae"]
                );
            }
            other => panic!("expected GroupNotFound, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_search_error_status_counts_as_miss() {
        let directory = Arc::new(MockDirectory::new());
        directory.set_group_search_status(403).await;

        let result = linker(&directory)
            .resolve_group(&token(), "Sales Team", DOMAIN)
            .await;

        assert!(matches!(
            result,
            Err(ProvisioningError::GroupNotFound { .. })
        ));
        assert_eq!(directory.group_searches().await.len(), 2);
    }

    #[tokio::test]
    async fn test_blank_unit_name_searches_nothing() {
        let directory = Arc::new(MockDirectory::new());

        let result = linker(&directory).resolve_group(&token(), " ", DOMAIN).await;

        assert!(matches!(
            result,
            Err(ProvisioningError::GroupNotFound { .. })
        ));
        assert!(directory.calls().await.is_empty());
    }

    #[tokio::test]
    async fn test_link_member_is_idempotent() {
        let directory = Arc::new(MockDirectory::new());
        directory.add_group("g-1", "DL_Ops@techcarrot.ae").await;
        let linker = linker(&directory);

        let first = linker.link_member(&token(), "g-1", "user-1").await.unwrap();
        let second = linker.link_member(&token(), "g-1", "user-1").await.unwrap();

        assert_eq!(first, MembershipOutcome::Added);
        assert_eq!(second, MembershipOutcome::AlreadyMember);
        assert_eq!(directory.add_member_call_count().await, 2);
        assert!(directory.is_member("g-1", "user-1").await);
    }

    #[tokio::test]
    async fn test_link_member_other_status_fails() {
        let directory = Arc::new(MockDirectory::new());
        directory.set_add_member_status(403).await;

        let result = linker(&directory)
            .link_member(&token(), "g-1", "user-1")
            .await;

        match result {
            Err(ProvisioningError::MembershipLinkFailed(message)) => {
                assert!(message.contains("403"));
            }
            other => panic!("expected MembershipLinkFailed, got {:?}", other),
        }
    }
}
