//! Record types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A person who may need a directory account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonnelRecord {
    pub id: String,
    pub display_name: String,
    /// Owning organizational unit, if any.
    pub unit_id: Option<String>,
    /// Directory object id, set once the account exists.
    pub directory_user_ref: Option<String>,
    /// Allocated mailbox address, set together with `directory_user_ref`.
    pub derived_mailbox: Option<String>,
    /// Work email shown to operators; the mailbox once provisioned.
    pub work_email: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PersonnelRecord {
    /// Whether a directory account has been recorded for this person.
    pub fn is_provisioned(&self) -> bool {
        self.directory_user_ref.is_some()
    }
}

/// A department or team, mapped to a distribution list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationalUnit {
    pub id: String,
    pub name: String,
    pub linked_group_address: Option<String>,
    pub linked_group_ref: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OrganizationalUnit {
    /// Whether a distribution list has been linked.
    pub fn is_linked(&self) -> bool {
        self.linked_group_ref.is_some()
    }
}
