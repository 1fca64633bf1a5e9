use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Audit event types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuditEvent {
    // System events
    ServiceStarted {
        version: String,
        config_hash: String,
    },
    ServiceStopped {
        reason: String,
    },

    // Record lifecycle
    UnitCreated {
        unit_id: String,
        name: String,
        created_by: String,
    },
    PersonnelCreated {
        record_id: String,
        display_name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        unit_id: Option<String>,
        created_by: String,
    },

    // Provisioning
    /// A provisioning run began.
    ProvisioningStarted {
        record_id: String,
        /// "event" for the record-created handler, "manual" for an operator re-trigger.
        trigger: String,
    },
    /// The directory confirmed the account and the record was updated.
    AccountProvisioned {
        record_id: String,
        address: String,
        account_ref: String,
    },
    /// The run aborted before the account was recorded.
    ProvisioningFailed {
        record_id: String,
        /// Last stage reached before the failure.
        stage: String,
        /// Full stage trail, ending in "aborted".
        #[serde(default)]
        stages: Vec<String>,
        /// `ProvisioningError::kind()`.
        error_kind: String,
        message: String,
    },

    // Groups
    /// A unit was linked to its distribution list.
    GroupLinked {
        unit_id: String,
        group_address: String,
        group_ref: String,
    },
    /// The account was attached to the unit's list.
    MembershipLinked {
        record_id: String,
        group_address: String,
        account_ref: String,
        /// "added" or "already_member"
        outcome: String,
    },
    /// Group linking was skipped or failed; the run still succeeded.
    MembershipSkipped {
        record_id: String,
        reason: String,
    },
    UnitGroupSyncFailed {
        unit_id: String,
        message: String,
    },
}

impl AuditEvent {
    /// Returns the event type as a string for storage
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::ServiceStarted { .. } => "service_started",
            Self::ServiceStopped { .. } => "service_stopped",
            Self::UnitCreated { .. } => "unit_created",
            Self::PersonnelCreated { .. } => "personnel_created",
            Self::ProvisioningStarted { .. } => "provisioning_started",
            Self::AccountProvisioned { .. } => "account_provisioned",
            Self::ProvisioningFailed { .. } => "provisioning_failed",
            Self::GroupLinked { .. } => "group_linked",
            Self::MembershipLinked { .. } => "membership_linked",
            Self::MembershipSkipped { .. } => "membership_skipped",
            Self::UnitGroupSyncFailed { .. } => "unit_group_sync_failed",
        }
    }

    /// Extract the record (personnel or unit) this event concerns
    pub fn record_id(&self) -> Option<&str> {
        match self {
            Self::PersonnelCreated { record_id, .. }
            | Self::ProvisioningStarted { record_id, .. }
            | Self::AccountProvisioned { record_id, .. }
            | Self::ProvisioningFailed { record_id, .. }
            | Self::MembershipLinked { record_id, .. }
            | Self::MembershipSkipped { record_id, .. } => Some(record_id),
            Self::UnitCreated { unit_id, .. }
            | Self::GroupLinked { unit_id, .. }
            | Self::UnitGroupSyncFailed { unit_id, .. } => Some(unit_id),
            _ => None,
        }
    }

    /// Extract user_id if this event was triggered by an operator action
    pub fn user_id(&self) -> Option<&str> {
        match self {
            Self::UnitCreated { created_by, .. } | Self::PersonnelCreated { created_by, .. } => {
                Some(created_by)
            }
            _ => None,
        }
    }
}

/// A stored audit record with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    pub record_id: Option<String>,
    pub user_id: Option<String>,
    pub data: AuditEvent,
}
