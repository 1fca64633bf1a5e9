//! Mock directory for testing.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::directory::{
    Directory, DirectoryAccount, DirectoryError, DirectoryGroup, NewAccount, PrincipalLookup,
};
use crate::token::BearerToken;

/// A recorded directory call for test assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedDirectoryCall {
    LookupPrincipal { principal_name: String },
    CreateAccount { account: NewAccount },
    FindGroupsByMail { mail: String },
    AddGroupMember { group_id: String, account_id: String },
}

/// Mock implementation of the Directory trait.
///
/// Behaves like an in-memory directory:
/// - principal names are unique; lookups answer 200/404
/// - created accounts become visible to later lookups
/// - adding an existing member answers 400, a new one 204
///
/// Every call is recorded, and individual operations can be forced to
/// answer with a given status.
///
/// # Example
///
/// ```rust,ignore
/// let directory = MockDirectory::new();
/// directory.add_principal("lalith.kumar@techcarrot.ae").await;
/// directory.add_group("g-1", "DL_Finance@techcarrot.ae").await;
///
/// // ... run the allocator ...
///
/// assert_eq!(directory.lookup_calls().await.len(), 2);
/// ```
#[derive(Debug)]
pub struct MockDirectory {
    /// Existing principal names.
    principals: Arc<RwLock<HashSet<String>>>,
    /// Groups by id.
    groups: Arc<RwLock<HashMap<String, DirectoryGroup>>>,
    /// (group id, account id) memberships.
    memberships: Arc<RwLock<HashSet<(String, String)>>>,
    /// Recorded calls, in order.
    calls: Arc<RwLock<Vec<RecordedDirectoryCall>>>,
    /// If set, every lookup answers with this status.
    lookup_status: Arc<RwLock<Option<u16>>>,
    /// If set, every lookup waits this long before answering.
    lookup_delay: Arc<RwLock<Option<Duration>>>,
    /// If set, the next create fails with this (status, message).
    create_failure: Arc<RwLock<Option<(u16, String)>>>,
    /// If set, every add-member call answers with this status.
    add_member_status: Arc<RwLock<Option<u16>>>,
    /// If set, every group search answers with this status.
    group_search_status: Arc<RwLock<Option<u16>>>,
    /// Counter for generating account ids.
    account_counter: Arc<RwLock<u32>>,
}

impl Default for MockDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl MockDirectory {
    /// Create an empty mock directory.
    pub fn new() -> Self {
        Self {
            principals: Arc::new(RwLock::new(HashSet::new())),
            groups: Arc::new(RwLock::new(HashMap::new())),
            memberships: Arc::new(RwLock::new(HashSet::new())),
            calls: Arc::new(RwLock::new(Vec::new())),
            lookup_status: Arc::new(RwLock::new(None)),
            lookup_delay: Arc::new(RwLock::new(None)),
            create_failure: Arc::new(RwLock::new(None)),
            add_member_status: Arc::new(RwLock::new(None)),
            group_search_status: Arc::new(RwLock::new(None)),
            account_counter: Arc::new(RwLock::new(0)),
        }
    }

    // =========================================================================
    // Configuration
    // =========================================================================

    /// Register an existing principal name.
    pub async fn add_principal(&self, principal_name: impl Into<String>) {
        self.principals.write().await.insert(principal_name.into());
    }

    /// Register `base@domain` plus `base2@domain ..= base{n}@domain`,
    /// i.e. `n` taken addresses in probe order.
    pub async fn add_conflicts(&self, local: &str, domain: &str, n: u32) {
        let mut principals = self.principals.write().await;
        for i in 0..n {
            let address = if i == 0 {
                format!("{}@{}", local, domain)
            } else {
                format!("{}{}@{}", local, i + 1, domain)
            };
            principals.insert(address);
        }
    }

    /// Register a distribution group.
    pub async fn add_group(&self, id: impl Into<String>, mail: impl Into<String>) {
        let id = id.into();
        self.groups.write().await.insert(
            id.clone(),
            DirectoryGroup {
                id,
                mail: Some(mail.into()),
            },
        );
    }

    /// Register an existing membership.
    pub async fn add_membership(&self, group_id: impl Into<String>, account_id: impl Into<String>) {
        self.memberships
            .write()
            .await
            .insert((group_id.into(), account_id.into()));
    }

    /// Force every lookup to answer with `status`.
    pub async fn set_lookup_status(&self, status: u16) {
        *self.lookup_status.write().await = Some(status);
    }

    /// Make every lookup take `delay`.
    pub async fn set_lookup_delay(&self, delay: Duration) {
        *self.lookup_delay.write().await = Some(delay);
    }

    /// Make the next create-account call fail.
    pub async fn fail_next_create(&self, status: u16, message: impl Into<String>) {
        *self.create_failure.write().await = Some((status, message.into()));
    }

    /// Force every add-member call to answer with `status`.
    pub async fn set_add_member_status(&self, status: u16) {
        *self.add_member_status.write().await = Some(status);
    }

    /// Force every group search to answer with `status`.
    pub async fn set_group_search_status(&self, status: u16) {
        *self.group_search_status.write().await = Some(status);
    }

    // =========================================================================
    // Assertions
    // =========================================================================

    /// All recorded calls, in order.
    pub async fn calls(&self) -> Vec<RecordedDirectoryCall> {
        self.calls.read().await.clone()
    }

    /// Principal names looked up, in order.
    pub async fn lookup_calls(&self) -> Vec<String> {
        self.calls
            .read()
            .await
            .iter()
            .filter_map(|c| match c {
                RecordedDirectoryCall::LookupPrincipal { principal_name } => {
                    Some(principal_name.clone())
                }
                _ => None,
            })
            .collect()
    }

    /// Accounts submitted for creation, in order.
    pub async fn created_accounts(&self) -> Vec<NewAccount> {
        self.calls
            .read()
            .await
            .iter()
            .filter_map(|c| match c {
                RecordedDirectoryCall::CreateAccount { account } => Some(account.clone()),
                _ => None,
            })
            .collect()
    }

    /// Mail addresses searched for, in order.
    pub async fn group_searches(&self) -> Vec<String> {
        self.calls
            .read()
            .await
            .iter()
            .filter_map(|c| match c {
                RecordedDirectoryCall::FindGroupsByMail { mail } => Some(mail.clone()),
                _ => None,
            })
            .collect()
    }

    /// Number of add-member calls.
    pub async fn add_member_call_count(&self) -> usize {
        self.calls
            .read()
            .await
            .iter()
            .filter(|c| matches!(c, RecordedDirectoryCall::AddGroupMember { .. }))
            .count()
    }

    /// Whether the account is a member of the group.
    pub async fn is_member(&self, group_id: &str, account_id: &str) -> bool {
        self.memberships
            .read()
            .await
            .contains(&(group_id.to_string(), account_id.to_string()))
    }

    /// Clear recorded calls.
    pub async fn clear_recorded(&self) {
        self.calls.write().await.clear();
    }

    async fn record(&self, call: RecordedDirectoryCall) {
        self.calls.write().await.push(call);
    }
}

#[async_trait]
impl Directory for MockDirectory {
    async fn lookup_principal(
        &self,
        _token: &BearerToken,
        principal_name: &str,
    ) -> Result<PrincipalLookup, DirectoryError> {
        self.record(RecordedDirectoryCall::LookupPrincipal {
            principal_name: principal_name.to_string(),
        })
        .await;

        let delay = *self.lookup_delay.read().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(status) = *self.lookup_status.read().await {
            return Ok(PrincipalLookup::from_status(status));
        }

        if self.principals.read().await.contains(principal_name) {
            Ok(PrincipalLookup::Present)
        } else {
            Ok(PrincipalLookup::Absent)
        }
    }

    async fn create_account(
        &self,
        _token: &BearerToken,
        account: &NewAccount,
    ) -> Result<DirectoryAccount, DirectoryError> {
        self.record(RecordedDirectoryCall::CreateAccount {
            account: account.clone(),
        })
        .await;

        if let Some((status, message)) = self.create_failure.write().await.take() {
            return Err(DirectoryError::ApiError { status, message });
        }

        let mut principals = self.principals.write().await;
        if !principals.insert(account.user_principal_name.clone()) {
            return Err(DirectoryError::ApiError {
                status: 400,
                message: "Another object with the same value for property userPrincipalName already exists."
                    .to_string(),
            });
        }

        let mut counter = self.account_counter.write().await;
        *counter += 1;

        Ok(DirectoryAccount {
            id: format!("user-{}", *counter),
            user_principal_name: Some(account.user_principal_name.clone()),
            display_name: Some(account.display_name.clone()),
        })
    }

    async fn find_groups_by_mail(
        &self,
        _token: &BearerToken,
        mail: &str,
    ) -> Result<Vec<DirectoryGroup>, DirectoryError> {
        self.record(RecordedDirectoryCall::FindGroupsByMail {
            mail: mail.to_string(),
        })
        .await;

        if let Some(status) = *self.group_search_status.read().await {
            return Err(DirectoryError::ApiError {
                status,
                message: format!("HTTP {}", status),
            });
        }

        let mut groups: Vec<DirectoryGroup> = self
            .groups
            .read()
            .await
            .values()
            .filter(|g| g.mail.as_deref() == Some(mail))
            .cloned()
            .collect();
        groups.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(groups)
    }

    async fn add_group_member(
        &self,
        _token: &BearerToken,
        group_id: &str,
        account_id: &str,
    ) -> Result<u16, DirectoryError> {
        self.record(RecordedDirectoryCall::AddGroupMember {
            group_id: group_id.to_string(),
            account_id: account_id.to_string(),
        })
        .await;

        if let Some(status) = *self.add_member_status.read().await {
            return Ok(status);
        }

        if !self.groups.read().await.contains_key(group_id) {
            return Ok(404);
        }

        let inserted = self
            .memberships
            .write()
            .await
            .insert((group_id.to_string(), account_id.to_string()));
        Ok(if inserted { 204 } else { 400 })
    }
}
