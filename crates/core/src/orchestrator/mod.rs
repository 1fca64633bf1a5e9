//! Provisioning orchestration.
//!
//! A run takes a personnel record from "created" to "has a directory
//! account", in strict sequence:
//! - acquire one bearer token
//! - resolve a free mailbox address and create the account
//! - record the account on the personnel record
//! - attach the account to the unit's distribution list (best effort)
//!
//! Runs start from `RecordEvent::PersonnelCreated` via `ProvisioningHandler`,
//! or from an operator re-trigger.

mod events;
mod runner;
mod types;

pub use events::{create_provisioning_handler, ProvisioningHandler, RecordEvent, RecordEventPublisher};
pub use runner::ProvisioningOrchestrator;
pub use types::{
    LinkResult, ProvisioningReport, ProvisioningStage, ProvisioningTrigger, UnitGroupSync,
};
