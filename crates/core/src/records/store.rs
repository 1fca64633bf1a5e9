//! Record storage trait and types.

use thiserror::Error;

use super::{OrganizationalUnit, PersonnelRecord};

/// Error type for record operations.
#[derive(Debug, Error)]
pub enum RecordError {
    /// Record not found.
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// The personnel record already carries a directory account.
    #[error("Personnel record {0} is already provisioned")]
    AlreadyProvisioned(String),

    /// The request failed validation.
    #[error("Invalid record: {0}")]
    Invalid(String),

    /// Database error.
    #[error("Database error: {0}")]
    Database(String),
}

impl RecordError {
    pub(crate) fn personnel_not_found(id: &str) -> Self {
        RecordError::NotFound {
            kind: "Personnel record",
            id: id.to_string(),
        }
    }

    pub(crate) fn unit_not_found(id: &str) -> Self {
        RecordError::NotFound {
            kind: "Organizational unit",
            id: id.to_string(),
        }
    }
}

/// Request to create a personnel record.
#[derive(Debug, Clone)]
pub struct CreatePersonnelRequest {
    pub display_name: String,
    pub unit_id: Option<String>,
}

/// Trait for record storage backends.
pub trait RecordStore: Send + Sync {
    /// Create an organizational unit. The name must not be blank.
    fn create_unit(&self, name: &str) -> Result<OrganizationalUnit, RecordError>;

    /// Get a unit by ID.
    fn get_unit(&self, id: &str) -> Result<Option<OrganizationalUnit>, RecordError>;

    /// Record the unit's distribution list.
    ///
    /// Written at most once: if the unit is already linked the existing link
    /// is returned unchanged.
    fn link_group(
        &self,
        unit_id: &str,
        group_address: &str,
        group_ref: &str,
    ) -> Result<OrganizationalUnit, RecordError>;

    /// Create a personnel record. The display name must not be blank and
    /// the unit, if given, must exist.
    fn create_personnel(
        &self,
        request: CreatePersonnelRequest,
    ) -> Result<PersonnelRecord, RecordError>;

    /// Get a personnel record by ID.
    fn get_personnel(&self, id: &str) -> Result<Option<PersonnelRecord>, RecordError>;

    /// Write the directory account onto a record.
    ///
    /// Sets `directory_user_ref`, `derived_mailbox` and `work_email` in one
    /// statement. Fails with `AlreadyProvisioned` if the record has one.
    fn mark_provisioned(
        &self,
        id: &str,
        account_ref: &str,
        mailbox: &str,
    ) -> Result<PersonnelRecord, RecordError>;
}
