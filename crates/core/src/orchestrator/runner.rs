//! Provisioning orchestrator implementation.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use tracing::{error, info, warn};

use crate::allocator::{derive_mailbox_base, AddressAllocator, ProvisionedAccount};
use crate::audit::{AuditEvent, AuditHandle};
use crate::config::{DirectoryConfig, ProvisioningConfig};
use crate::directory::Directory;
use crate::error::ProvisioningError;
use crate::group::{GroupLinker, MembershipOutcome};
use crate::metrics;
use crate::notification::Notification;
use crate::records::{PersonnelRecord, RecordStore};
use crate::token::{BearerToken, TokenSource};

use super::types::{
    LinkResult, ProvisioningReport, ProvisioningStage, ProvisioningTrigger, UnitGroupSync,
};

/// Drives personnel records through token, allocation, creation and linking.
pub struct ProvisioningOrchestrator {
    directory_config: DirectoryConfig,
    token_source: Arc<dyn TokenSource>,
    allocator: AddressAllocator,
    linker: GroupLinker,
    records: Arc<dyn RecordStore>,
    audit: Option<AuditHandle>,
    /// Record ids with a run in progress.
    in_flight: Mutex<HashSet<String>>,
}

/// Claim on a record id, released when dropped.
struct InFlight<'a> {
    set: &'a Mutex<HashSet<String>>,
    record_id: String,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.set
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.record_id);
    }
}

impl ProvisioningOrchestrator {
    pub fn new(
        directory_config: DirectoryConfig,
        provisioning: ProvisioningConfig,
        token_source: Arc<dyn TokenSource>,
        directory: Arc<dyn Directory>,
        records: Arc<dyn RecordStore>,
        audit: Option<AuditHandle>,
    ) -> Self {
        let linker = GroupLinker::new(Arc::clone(&directory), provisioning.group_prefix.clone());
        let allocator = AddressAllocator::new(directory, provisioning);

        Self {
            directory_config,
            token_source,
            allocator,
            linker,
            records,
            audit,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    /// Reserve `record_id` for one run. A concurrent trigger gets `InvalidRecord`.
    fn claim(&self, record_id: &str) -> Result<InFlight<'_>, ProvisioningError> {
        let mut set = self
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if !set.insert(record_id.to_string()) {
            return Err(ProvisioningError::InvalidRecord(format!(
                "personnel record {} is already being provisioned",
                record_id
            )));
        }
        Ok(InFlight {
            set: &self.in_flight,
            record_id: record_id.to_string(),
        })
    }

    /// Provision a directory account for a personnel record.
    ///
    /// Fails before any network call if another run for the record is in
    /// progress, credentials are missing, the record does not exist, is
    /// already provisioned, or has a blank name. Group
    /// linking failures do not fail the run; they show up in `report.link`.
    pub async fn provision(
        &self,
        record_id: &str,
        trigger: ProvisioningTrigger,
    ) -> Result<ProvisioningReport, ProvisioningError> {
        let started = Instant::now();
        info!("Provisioning record {} ({})", record_id, trigger.as_str());

        self.emit(AuditEvent::ProvisioningStarted {
            record_id: record_id.to_string(),
            trigger: trigger.as_str().to_string(),
        })
        .await;

        let mut stages = vec![ProvisioningStage::Start];
        let result = self.run(record_id, &mut stages).await;

        let label = match &result {
            Ok(_) => "provisioned",
            Err(e) => e.kind(),
        };
        metrics::PROVISIONING_RUNS.with_label_values(&[label]).inc();
        metrics::PROVISIONING_DURATION
            .with_label_values(&[label])
            .observe(started.elapsed().as_secs_f64());

        if let Err(ref e) = result {
            let last = stages
                .last()
                .copied()
                .unwrap_or(ProvisioningStage::Start);
            stages.push(ProvisioningStage::Aborted);

            if e.is_configuration() {
                warn!("Provisioning {} skipped: {}", record_id, e);
            } else {
                error!("Provisioning {} failed after {}: {}", record_id, last.as_str(), e);
            }

            self.emit(AuditEvent::ProvisioningFailed {
                record_id: record_id.to_string(),
                stage: last.as_str().to_string(),
                stages: stages.iter().map(|s| s.as_str().to_string()).collect(),
                error_kind: e.kind().to_string(),
                message: e.to_string(),
            })
            .await;
        }

        result
    }

    async fn run(
        &self,
        record_id: &str,
        stages: &mut Vec<ProvisioningStage>,
    ) -> Result<ProvisioningReport, ProvisioningError> {
        let _claim = self.claim(record_id)?;
        let credentials = self.directory_config.credentials()?;

        let record = self.records.get_personnel(record_id)?.ok_or_else(|| {
            ProvisioningError::InvalidRecord(format!("personnel record {} not found", record_id))
        })?;

        if record.is_provisioned() {
            return Err(ProvisioningError::InvalidRecord(format!(
                "personnel record {} is already provisioned",
                record_id
            )));
        }

        let base = derive_mailbox_base(&record.display_name, &credentials.domain)?;

        let token = self
            .token_source
            .acquire(&credentials)
            .await
            .inspect_err(|_| metrics::TOKEN_FAILURES.inc())?;
        stages.push(ProvisioningStage::TokenAcquired);

        let address = self.allocator.resolve_address(&token, &base).await?;
        stages.push(ProvisioningStage::AddressResolved);

        let account = self
            .allocator
            .create_account(&token, &record.display_name, &address)
            .await?;
        stages.push(ProvisioningStage::AccountCreated);

        self.records
            .mark_provisioned(&record.id, &account.account_ref, &account.address)
            .inspect_err(|e| {
                error!(
                    "Account {} created for {} but the record was not updated: {}",
                    account.account_ref, record.id, e
                )
            })?;

        self.emit(AuditEvent::AccountProvisioned {
            record_id: record.id.clone(),
            address: account.address.clone(),
            account_ref: account.account_ref.clone(),
        })
        .await;

        let link = self
            .link_unit(&token, &record, &account, &credentials.domain)
            .await;
        stages.push(if link.is_linked() {
            ProvisioningStage::GroupLinked
        } else {
            ProvisioningStage::LinkSkipped
        });
        stages.push(ProvisioningStage::Done);

        info!("Provisioned {} as {}", record.id, account.address);

        Ok(ProvisioningReport {
            record_id: record.id,
            stages: stages.clone(),
            address: account.address,
            account_ref: account.account_ref,
            link,
        })
    }

    /// Attach the new account to its unit's list. Never fails the run.
    async fn link_unit(
        &self,
        token: &BearerToken,
        record: &PersonnelRecord,
        account: &ProvisionedAccount,
        domain: &str,
    ) -> LinkResult {
        let result = self.try_link_unit(token, record, account, domain).await;

        match &result {
            LinkResult::Added { group_address } | LinkResult::AlreadyMember { group_address } => {
                let outcome = if matches!(result, LinkResult::Added { .. }) {
                    "added"
                } else {
                    "already_member"
                };
                self.emit(AuditEvent::MembershipLinked {
                    record_id: record.id.clone(),
                    group_address: group_address.clone(),
                    account_ref: account.account_ref.clone(),
                    outcome: outcome.to_string(),
                })
                .await;
            }
            LinkResult::Skipped { reason } => {
                info!("Group link skipped for {}: {}", record.id, reason);
                self.emit(AuditEvent::MembershipSkipped {
                    record_id: record.id.clone(),
                    reason: reason.clone(),
                })
                .await;
            }
            LinkResult::Failed { message } => {
                warn!("Group link failed for {}: {}", record.id, message);
                self.emit(AuditEvent::MembershipSkipped {
                    record_id: record.id.clone(),
                    reason: message.clone(),
                })
                .await;
            }
        }

        result
    }

    async fn try_link_unit(
        &self,
        token: &BearerToken,
        record: &PersonnelRecord,
        account: &ProvisionedAccount,
        domain: &str,
    ) -> LinkResult {
        let Some(unit_id) = record.unit_id.as_deref() else {
            return LinkResult::Skipped {
                reason: "record has no organizational unit".to_string(),
            };
        };

        let unit = match self.records.get_unit(unit_id) {
            Ok(Some(unit)) => unit,
            Ok(None) => {
                return LinkResult::Skipped {
                    reason: format!("organizational unit {} not found", unit_id),
                }
            }
            Err(e) => {
                return LinkResult::Failed {
                    message: e.to_string(),
                }
            }
        };

        let (group_address, group_ref) =
            match (unit.linked_group_address.clone(), unit.linked_group_ref.clone()) {
                (Some(address), Some(group_ref)) => (address, group_ref),
                _ => match self.linker.resolve_group(token, &unit.name, domain).await {
                    Ok(group) => {
                        self.record_unit_link(&unit.id, &group.address, &group.group_ref)
                            .await;
                        (group.address, group.group_ref)
                    }
                    Err(e @ ProvisioningError::GroupNotFound { .. }) => {
                        return LinkResult::Skipped {
                            reason: e.to_string(),
                        }
                    }
                    Err(e) => {
                        return LinkResult::Failed {
                            message: e.to_string(),
                        }
                    }
                },
            };

        match self
            .linker
            .link_member(token, &group_ref, &account.account_ref)
            .await
        {
            Ok(MembershipOutcome::Added) => LinkResult::Added { group_address },
            Ok(MembershipOutcome::AlreadyMember) => LinkResult::AlreadyMember { group_address },
            Err(e) => LinkResult::Failed {
                message: e.to_string(),
            },
        }
    }

    /// Persist a resolved list on the unit and audit it.
    async fn record_unit_link(&self, unit_id: &str, group_address: &str, group_ref: &str) {
        match self.records.link_group(unit_id, group_address, group_ref) {
            Ok(unit) => {
                info!(
                    "Unit {} linked to {}",
                    unit.id,
                    unit.linked_group_address.as_deref().unwrap_or(group_address)
                );
                self.emit(AuditEvent::GroupLinked {
                    unit_id: unit.id,
                    group_address: group_address.to_string(),
                    group_ref: group_ref.to_string(),
                })
                .await;
            }
            Err(e) => warn!("Failed to record group link on unit {}: {}", unit_id, e),
        }
    }

    /// Resolve a unit's distribution list and record it on the unit.
    ///
    /// An already-linked unit is returned unchanged without contacting the
    /// directory. Directory and credential failures come back as a
    /// notification rather than an error; only an unknown unit or a store
    /// failure is an `Err`.
    pub async fn sync_unit_group(&self, unit_id: &str) -> Result<UnitGroupSync, ProvisioningError> {
        let unit = self.records.get_unit(unit_id)?.ok_or_else(|| {
            ProvisioningError::InvalidRecord(format!("organizational unit {} not found", unit_id))
        })?;

        if let Some(address) = unit.linked_group_address.clone() {
            return Ok(UnitGroupSync {
                notification: Notification::info(format!("Already linked to {}", address)),
                unit,
            });
        }

        let resolved = match self.directory_config.credentials() {
            Ok(credentials) => match self.token_source.acquire(&credentials).await {
                Ok(token) => {
                    self.linker
                        .resolve_group(&token, &unit.name, &credentials.domain)
                        .await
                }
                Err(e) => {
                    metrics::TOKEN_FAILURES.inc();
                    Err(e)
                }
            },
            Err(e) => Err(e),
        };

        match resolved {
            Ok(group) => {
                let linked = self
                    .records
                    .link_group(&unit.id, &group.address, &group.group_ref)?;
                self.emit(AuditEvent::GroupLinked {
                    unit_id: linked.id.clone(),
                    group_address: group.address.clone(),
                    group_ref: group.group_ref,
                })
                .await;
                metrics::GROUP_SYNCS.with_label_values(&["linked"]).inc();
                info!("Unit {} linked to {}", linked.id, group.address);

                Ok(UnitGroupSync {
                    notification: Notification::success(format!("Linked to {}", group.address)),
                    unit: linked,
                })
            }
            Err(e) => {
                let label = match &e {
                    ProvisioningError::GroupNotFound { .. } => "not_found",
                    _ => "failed",
                };
                metrics::GROUP_SYNCS.with_label_values(&[label]).inc();
                warn!("Group sync for unit {} failed: {}", unit.id, e);

                self.emit(AuditEvent::UnitGroupSyncFailed {
                    unit_id: unit.id.clone(),
                    message: e.to_string(),
                })
                .await;

                Ok(UnitGroupSync {
                    notification: Notification::from(&e),
                    unit,
                })
            }
        }
    }

    async fn emit(&self, event: AuditEvent) {
        if let Some(ref audit) = self.audit {
            audit.emit(event).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::NotificationLevel;
    use crate::records::{CreatePersonnelRequest, SqliteRecordStore};
    use crate::testing::{fixtures, MockDirectory, MockTokenSource};

    struct Harness {
        directory: Arc<MockDirectory>,
        tokens: Arc<MockTokenSource>,
        records: Arc<SqliteRecordStore>,
        orchestrator: ProvisioningOrchestrator,
    }

    fn harness_with(directory_config: DirectoryConfig) -> Harness {
        let directory = Arc::new(MockDirectory::new());
        let tokens = Arc::new(MockTokenSource::new());
        let records = Arc::new(SqliteRecordStore::in_memory().unwrap());
        let orchestrator = ProvisioningOrchestrator::new(
            directory_config,
            ProvisioningConfig::default(),
            Arc::clone(&tokens) as Arc<dyn TokenSource>,
            Arc::clone(&directory) as Arc<dyn Directory>,
            Arc::clone(&records) as Arc<dyn RecordStore>,
            None,
        );
        Harness {
            directory,
            tokens,
            records,
            orchestrator,
        }
    }

    fn harness() -> Harness {
        harness_with(fixtures::directory_config())
    }

    fn person(h: &Harness, name: &str, unit_id: Option<&str>) -> String {
        h.records
            .create_personnel(CreatePersonnelRequest {
                display_name: name.to_string(),
                unit_id: unit_id.map(str::to_string),
            })
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn test_provision_without_unit() {
        let h = harness();
        let id = person(&h, "Lalith Kumar", None);

        let report = h
            .orchestrator
            .provision(&id, ProvisioningTrigger::Manual)
            .await
            .unwrap();

        assert_eq!(report.address, "lalith.kumar@techcarrot.ae");
        assert_eq!(report.account_ref, "user-1");
        assert!(matches!(report.link, LinkResult::Skipped { .. }));
        assert_eq!(
            report.stages,
            vec![
                ProvisioningStage::Start,
                ProvisioningStage::TokenAcquired,
                ProvisioningStage::AddressResolved,
                ProvisioningStage::AccountCreated,
                ProvisioningStage::LinkSkipped,
                ProvisioningStage::Done,
            ]
        );
        assert_eq!(h.tokens.acquisitions(), 1);

        let stored = h.records.get_personnel(&id).unwrap().unwrap();
        assert_eq!(stored.directory_user_ref.as_deref(), Some("user-1"));
        assert_eq!(
            stored.work_email.as_deref(),
            Some("lalith.kumar@techcarrot.ae")
        );
    }

    #[tokio::test]
    async fn test_missing_credentials_make_no_calls() {
        let h = harness_with(DirectoryConfig::default());
        let id = person(&h, "Lalith Kumar", None);

        let result = h.orchestrator.provision(&id, ProvisioningTrigger::Event).await;

        match result {
            Err(ProvisioningError::CredentialsMissing { missing }) => {
                assert_eq!(
                    missing,
                    vec!["tenant_id", "client_id", "client_secret", "domain"]
                );
            }
            other => panic!("expected CredentialsMissing, got {:?}", other),
        }
        assert_eq!(h.tokens.acquisitions(), 0);
        assert!(h.directory.calls().await.is_empty());
        assert!(!h.records.get_personnel(&id).unwrap().unwrap().is_provisioned());
    }

    #[tokio::test]
    async fn test_token_failure_aborts_before_directory() {
        let h = harness();
        h.tokens.fail_with("invalid_client").await;
        let id = person(&h, "Lalith Kumar", None);

        let result = h.orchestrator.provision(&id, ProvisioningTrigger::Event).await;

        assert!(matches!(
            result,
            Err(ProvisioningError::TokenAcquisitionFailed(_))
        ));
        assert!(h.directory.calls().await.is_empty());
    }

    #[tokio::test]
    async fn test_failed_create_leaves_record_untouched() {
        let h = harness();
        h.directory.fail_next_create(400, "Password too weak").await;
        let id = person(&h, "Lalith Kumar", None);

        let result = h.orchestrator.provision(&id, ProvisioningTrigger::Event).await;

        assert!(matches!(
            result,
            Err(ProvisioningError::AccountCreationFailed(_))
        ));
        let stored = h.records.get_personnel(&id).unwrap().unwrap();
        assert!(stored.directory_user_ref.is_none());
        assert!(stored.derived_mailbox.is_none());
    }

    #[tokio::test]
    async fn test_already_provisioned_is_rejected_without_calls() {
        let h = harness();
        let id = person(&h, "Lalith Kumar", None);
        h.orchestrator
            .provision(&id, ProvisioningTrigger::Event)
            .await
            .unwrap();
        h.directory.clear_recorded().await;

        let again = h.orchestrator.provision(&id, ProvisioningTrigger::Manual).await;

        assert!(matches!(again, Err(ProvisioningError::InvalidRecord(_))));
        assert!(h.directory.calls().await.is_empty());
        assert_eq!(h.tokens.acquisitions(), 1);
    }

    #[tokio::test]
    async fn test_unknown_record() {
        let h = harness();
        let result = h
            .orchestrator
            .provision("missing", ProvisioningTrigger::Manual)
            .await;
        assert!(matches!(result, Err(ProvisioningError::InvalidRecord(_))));
        assert_eq!(h.tokens.acquisitions(), 0);
    }

    #[tokio::test]
    async fn test_unit_group_resolved_linked_and_persisted() {
        let h = harness();
        h.directory.add_group("g-1", "DL_Sales_Team@techcarrot.ae").await;
        let unit = h.records.create_unit("Sales Team").unwrap();
        let id = person(&h, "Lalith Kumar", Some(&unit.id));

        let report = h
            .orchestrator
            .provision(&id, ProvisioningTrigger::Event)
            .await
            .unwrap();

        assert_eq!(
            report.link,
            LinkResult::Added {
                group_address: "DL_Sales_Team@techcarrot.ae".to_string()
            }
        );
        assert!(report.stages.contains(&ProvisioningStage::GroupLinked));
        assert!(h.directory.is_member("g-1", "user-1").await);

        let unit = h.records.get_unit(&unit.id).unwrap().unwrap();
        assert_eq!(unit.linked_group_ref.as_deref(), Some("g-1"));
    }

    #[tokio::test]
    async fn test_linked_unit_skips_group_search() {
        let h = harness();
        h.directory.add_group("g-7", "DL_Ops@techcarrot.ae").await;
        let unit = h.records.create_unit("Ops").unwrap();
        h.records
            .link_group(&unit.id, "DL_Ops@techcarrot.ae", "g-7")
            .unwrap();
        let id = person(&h, "Lalith Kumar", Some(&unit.id));

        let report = h
            .orchestrator
            .provision(&id, ProvisioningTrigger::Event)
            .await
            .unwrap();

        assert!(report.link.is_linked());
        assert!(h.directory.group_searches().await.is_empty());
    }

    #[tokio::test]
    async fn test_missing_group_does_not_fail_run() {
        let h = harness();
        let unit = h.records.create_unit("Sales Team").unwrap();
        let id = person(&h, "Lalith Kumar", Some(&unit.id));

        let report = h
            .orchestrator
            .provision(&id, ProvisioningTrigger::Event)
            .await
            .unwrap();

        match report.link {
            LinkResult::Skipped { reason } => assert!(reason.contains("DL_Sales_Team")),
            other => panic!("expected Skipped, got {:?}", other),
        }
        assert!(report.stages.contains(&ProvisioningStage::LinkSkipped));
        assert!(h.records.get_personnel(&id).unwrap().unwrap().is_provisioned());
    }

    #[tokio::test]
    async fn test_membership_failure_does_not_fail_run() {
        let h = harness();
        h.directory.add_group("g-1", "DL_Ops@techcarrot.ae").await;
        h.directory.set_add_member_status(403).await;
        let unit = h.records.create_unit("Ops").unwrap();
        let id = person(&h, "Lalith Kumar", Some(&unit.id));

        let report = h
            .orchestrator
            .provision(&id, ProvisioningTrigger::Event)
            .await
            .unwrap();

        assert!(matches!(report.link, LinkResult::Failed { .. }));
        assert_eq!(report.stages.last(), Some(&ProvisioningStage::Done));
    }

    #[tokio::test]
    async fn test_sync_unit_group_links_once() {
        let h = harness();
        h.directory.add_group("g-2", "DL_sales_team@techcarrot.ae").await;
        let unit = h.records.create_unit("Sales Team").unwrap();

        let first = h.orchestrator.sync_unit_group(&unit.id).await.unwrap();
        assert_eq!(first.notification.level, NotificationLevel::Success);
        assert_eq!(
            first.notification.message,
            "Linked to DL_sales_team@techcarrot.ae"
        );
        assert_eq!(first.unit.linked_group_ref.as_deref(), Some("g-2"));

        h.directory.clear_recorded().await;
        let second = h.orchestrator.sync_unit_group(&unit.id).await.unwrap();
        assert_eq!(second.notification.level, NotificationLevel::Info);
        assert!(h.directory.calls().await.is_empty());
    }

    #[tokio::test]
    async fn test_sync_unit_group_not_found_warns() {
        let h = harness();
        let unit = h.records.create_unit("Sales Team").unwrap();

        let sync = h.orchestrator.sync_unit_group(&unit.id).await.unwrap();

        assert_eq!(sync.notification.level, NotificationLevel::Warning);
        assert_eq!(
            sync.notification.message,
            "DL not found. Tried: DL_Sales_Team@techcarrot.ae and DL_sales_team@techcarrot.ae"
        );
        assert!(!sync.unit.is_linked());
    }

    #[tokio::test]
    async fn test_sync_unit_group_without_credentials() {
        let h = harness_with(DirectoryConfig::default());
        let unit = h.records.create_unit("Sales Team").unwrap();

        let sync = h.orchestrator.sync_unit_group(&unit.id).await.unwrap();

        assert_eq!(sync.notification.level, NotificationLevel::Danger);
        assert_eq!(
            sync.notification.message,
            "Directory credentials missing in configuration"
        );
        assert_eq!(h.tokens.acquisitions(), 0);
    }
}
