use std::sync::Arc;
use mailwright_core::{
    AuditHandle, AuditStore, Authenticator, Config, ProvisioningOrchestrator, RecordEventPublisher,
    RecordStore, SanitizedConfig,
};

/// Shared application state
pub struct AppState {
    config: Config,
    authenticator: Arc<dyn Authenticator>,
    audit: AuditHandle,
    audit_store: Arc<dyn AuditStore>,
    records: Arc<dyn RecordStore>,
    orchestrator: Arc<ProvisioningOrchestrator>,
    publisher: RecordEventPublisher,
}

impl AppState {
    pub fn new(
        config: Config,
        authenticator: Arc<dyn Authenticator>,
        audit: AuditHandle,
        audit_store: Arc<dyn AuditStore>,
        records: Arc<dyn RecordStore>,
        orchestrator: Arc<ProvisioningOrchestrator>,
        publisher: RecordEventPublisher,
    ) -> Self {
        Self {
            config,
            authenticator,
            audit,
            audit_store,
            records,
            orchestrator,
            publisher,
        }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn authenticator(&self) -> &dyn Authenticator {
        self.authenticator.as_ref()
    }

    pub fn audit(&self) -> &AuditHandle {
        &self.audit
    }

    pub fn audit_store(&self) -> &dyn AuditStore {
        self.audit_store.as_ref()
    }

    pub fn records(&self) -> &dyn RecordStore {
        self.records.as_ref()
    }

    pub fn orchestrator(&self) -> &ProvisioningOrchestrator {
        &self.orchestrator
    }

    /// Publisher feeding the record-created provisioning handler.
    pub fn publisher(&self) -> &RecordEventPublisher {
        &self.publisher
    }
}
