//! Record-created events and the handler that provisions on them.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{error, info, warn};

use super::runner::ProvisioningOrchestrator;
use super::types::ProvisioningTrigger;

/// Events raised by the record store's callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordEvent {
    PersonnelCreated { record_id: String },
}

/// Publishes record events to the provisioning handler.
///
/// Cloneable. Publishing never fails the caller: if the handler is gone
/// the event is logged and dropped, and the record can still be
/// provisioned by a manual re-trigger.
#[derive(Clone)]
pub struct RecordEventPublisher {
    tx: mpsc::Sender<RecordEvent>,
}

impl RecordEventPublisher {
    pub fn new(tx: mpsc::Sender<RecordEvent>) -> Self {
        Self { tx }
    }

    pub async fn publish(&self, event: RecordEvent) {
        if let Err(e) = self.tx.send(event).await {
            error!("Failed to publish record event: {:?}", e.0);
        }
    }
}

/// Consumes record events one at a time and provisions each new record.
pub struct ProvisioningHandler {
    rx: mpsc::Receiver<RecordEvent>,
    orchestrator: Arc<ProvisioningOrchestrator>,
}

impl ProvisioningHandler {
    pub fn new(rx: mpsc::Receiver<RecordEvent>, orchestrator: Arc<ProvisioningOrchestrator>) -> Self {
        Self { rx, orchestrator }
    }

    /// Run until every publisher is dropped.
    ///
    /// Spawn with `tokio::spawn(handler.run())`. Failed runs are logged
    /// and audited by the orchestrator; the handler moves on.
    pub async fn run(mut self) {
        info!("Provisioning handler started");

        while let Some(event) = self.rx.recv().await {
            match event {
                RecordEvent::PersonnelCreated { record_id } => {
                    match self
                        .orchestrator
                        .provision(&record_id, ProvisioningTrigger::Event)
                        .await
                    {
                        Ok(report) => {
                            info!("Record {} provisioned as {}", record_id, report.address)
                        }
                        Err(e) if e.is_configuration() => {
                            warn!("Record {} left unprovisioned: {}", record_id, e)
                        }
                        Err(e) => error!("Record {} not provisioned: {}", record_id, e),
                    }
                }
            }
        }

        info!("Provisioning handler shutting down");
    }
}

/// Create a publisher/handler pair around `orchestrator`.
pub fn create_provisioning_handler(
    orchestrator: Arc<ProvisioningOrchestrator>,
    buffer_size: usize,
) -> (RecordEventPublisher, ProvisioningHandler) {
    let (tx, rx) = mpsc::channel(buffer_size);
    (
        RecordEventPublisher::new(tx),
        ProvisioningHandler::new(rx, orchestrator),
    )
}
