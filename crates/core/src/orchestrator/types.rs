//! Types for the provisioning orchestrator.

use serde::{Deserialize, Serialize};

use crate::notification::Notification;
use crate::records::OrganizationalUnit;

/// Checkpoints of a provisioning run, in the order they are reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProvisioningStage {
    Start,
    TokenAcquired,
    AddressResolved,
    AccountCreated,
    GroupLinked,
    LinkSkipped,
    Done,
    /// The run stopped early; the preceding stage is the last one reached.
    Aborted,
}

impl ProvisioningStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProvisioningStage::Start => "start",
            ProvisioningStage::TokenAcquired => "token_acquired",
            ProvisioningStage::AddressResolved => "address_resolved",
            ProvisioningStage::AccountCreated => "account_created",
            ProvisioningStage::GroupLinked => "group_linked",
            ProvisioningStage::LinkSkipped => "link_skipped",
            ProvisioningStage::Done => "done",
            ProvisioningStage::Aborted => "aborted",
        }
    }
}

/// What happened when attaching the new account to its unit's list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum LinkResult {
    Added { group_address: String },
    AlreadyMember { group_address: String },
    /// Nothing to link to: no unit, or no list under the naming convention.
    Skipped { reason: String },
    /// The directory refused or could not be reached.
    Failed { message: String },
}

impl LinkResult {
    /// Whether the account ended up in the group.
    pub fn is_linked(&self) -> bool {
        matches!(
            self,
            LinkResult::Added { .. } | LinkResult::AlreadyMember { .. }
        )
    }
}

/// Why a run was started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisioningTrigger {
    /// The record-created event handler.
    Event,
    /// An operator re-trigger through the API.
    Manual,
}

impl ProvisioningTrigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProvisioningTrigger::Event => "event",
            ProvisioningTrigger::Manual => "manual",
        }
    }
}

/// Outcome of a successful provisioning run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisioningReport {
    pub record_id: String,
    pub stages: Vec<ProvisioningStage>,
    pub address: String,
    pub account_ref: String,
    pub link: LinkResult,
}

/// Outcome of syncing a unit with its distribution list.
#[derive(Debug, Clone, Serialize)]
pub struct UnitGroupSync {
    pub notification: Notification,
    pub unit: OrganizationalUnit,
}
