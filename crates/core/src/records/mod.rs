//! Personnel and organizational unit records.

mod sqlite;
mod store;
mod types;

pub use sqlite::SqliteRecordStore;
pub use store::{CreatePersonnelRequest, RecordError, RecordStore};
pub use types::{OrganizationalUnit, PersonnelRecord};
