//! SQLite-backed record store implementation.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use super::{
    CreatePersonnelRequest, OrganizationalUnit, PersonnelRecord, RecordError, RecordStore,
};

const PERSONNEL_COLUMNS: &str = "id, display_name, unit_id, directory_user_ref, derived_mailbox, work_email, created_at, updated_at";
const UNIT_COLUMNS: &str =
    "id, name, linked_group_address, linked_group_ref, created_at, updated_at";

/// SQLite-backed record store.
pub struct SqliteRecordStore {
    conn: Mutex<Connection>,
}

impl SqliteRecordStore {
    /// Create a new SQLite record store, creating the database file and tables if needed.
    pub fn new(path: &Path) -> Result<Self, RecordError> {
        let conn = Connection::open(path).map_err(db_err)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite record store (useful for testing).
    pub fn in_memory() -> Result<Self, RecordError> {
        let conn = Connection::open_in_memory().map_err(db_err)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), RecordError> {
        conn.execute_batch(
            r#"
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS units (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                linked_group_address TEXT,
                linked_group_ref TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS personnel (
                id TEXT PRIMARY KEY,
                display_name TEXT NOT NULL,
                unit_id TEXT REFERENCES units(id),
                directory_user_ref TEXT,
                derived_mailbox TEXT,
                work_email TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                CHECK ((directory_user_ref IS NULL) = (derived_mailbox IS NULL))
            );

            CREATE INDEX IF NOT EXISTS idx_personnel_unit_id ON personnel(unit_id);
            "#,
        )
        .map_err(db_err)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, RecordError> {
        self.conn
            .lock()
            .map_err(|_| RecordError::Database("connection lock poisoned".to_string()))
    }

    fn row_to_personnel(row: &rusqlite::Row) -> rusqlite::Result<PersonnelRecord> {
        Ok(PersonnelRecord {
            id: row.get(0)?,
            display_name: row.get(1)?,
            unit_id: row.get(2)?,
            directory_user_ref: row.get(3)?,
            derived_mailbox: row.get(4)?,
            work_email: row.get(5)?,
            created_at: parse_timestamp(&row.get::<_, String>(6)?),
            updated_at: parse_timestamp(&row.get::<_, String>(7)?),
        })
    }

    fn row_to_unit(row: &rusqlite::Row) -> rusqlite::Result<OrganizationalUnit> {
        Ok(OrganizationalUnit {
            id: row.get(0)?,
            name: row.get(1)?,
            linked_group_address: row.get(2)?,
            linked_group_ref: row.get(3)?,
            created_at: parse_timestamp(&row.get::<_, String>(4)?),
            updated_at: parse_timestamp(&row.get::<_, String>(5)?),
        })
    }

    fn fetch_unit(conn: &Connection, id: &str) -> Result<Option<OrganizationalUnit>, RecordError> {
        conn.query_row(
            &format!("SELECT {} FROM units WHERE id = ?", UNIT_COLUMNS),
            params![id],
            Self::row_to_unit,
        )
        .optional()
        .map_err(db_err)
    }

    fn fetch_personnel(
        conn: &Connection,
        id: &str,
    ) -> Result<Option<PersonnelRecord>, RecordError> {
        conn.query_row(
            &format!("SELECT {} FROM personnel WHERE id = ?", PERSONNEL_COLUMNS),
            params![id],
            Self::row_to_personnel,
        )
        .optional()
        .map_err(db_err)
    }
}

impl RecordStore for SqliteRecordStore {
    fn create_unit(&self, name: &str) -> Result<OrganizationalUnit, RecordError> {
        if name.trim().is_empty() {
            return Err(RecordError::Invalid("unit name must not be blank".to_string()));
        }

        let conn = self.lock()?;
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now();

        conn.execute(
            "INSERT INTO units (id, name, created_at, updated_at) VALUES (?, ?, ?, ?)",
            params![id, name, now.to_rfc3339(), now.to_rfc3339()],
        )
        .map_err(db_err)?;

        Ok(OrganizationalUnit {
            id,
            name: name.to_string(),
            linked_group_address: None,
            linked_group_ref: None,
            created_at: now,
            updated_at: now,
        })
    }

    fn get_unit(&self, id: &str) -> Result<Option<OrganizationalUnit>, RecordError> {
        let conn = self.lock()?;
        Self::fetch_unit(&conn, id)
    }

    fn link_group(
        &self,
        unit_id: &str,
        group_address: &str,
        group_ref: &str,
    ) -> Result<OrganizationalUnit, RecordError> {
        let conn = self.lock()?;

        conn.execute(
            "UPDATE units SET linked_group_address = ?, linked_group_ref = ?, updated_at = ? WHERE id = ? AND linked_group_ref IS NULL",
            params![group_address, group_ref, Utc::now().to_rfc3339(), unit_id],
        )
        .map_err(db_err)?;

        Self::fetch_unit(&conn, unit_id)?.ok_or_else(|| RecordError::unit_not_found(unit_id))
    }

    fn create_personnel(
        &self,
        request: CreatePersonnelRequest,
    ) -> Result<PersonnelRecord, RecordError> {
        if request.display_name.trim().is_empty() {
            return Err(RecordError::Invalid(
                "display name must not be blank".to_string(),
            ));
        }

        let conn = self.lock()?;

        if let Some(ref unit_id) = request.unit_id {
            if Self::fetch_unit(&conn, unit_id)?.is_none() {
                return Err(RecordError::unit_not_found(unit_id));
            }
        }

        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now();

        conn.execute(
            "INSERT INTO personnel (id, display_name, unit_id, created_at, updated_at) VALUES (?, ?, ?, ?, ?)",
            params![
                id,
                request.display_name,
                request.unit_id,
                now.to_rfc3339(),
                now.to_rfc3339(),
            ],
        )
        .map_err(db_err)?;

        Ok(PersonnelRecord {
            id,
            display_name: request.display_name,
            unit_id: request.unit_id,
            directory_user_ref: None,
            derived_mailbox: None,
            work_email: None,
            created_at: now,
            updated_at: now,
        })
    }

    fn get_personnel(&self, id: &str) -> Result<Option<PersonnelRecord>, RecordError> {
        let conn = self.lock()?;
        Self::fetch_personnel(&conn, id)
    }

    fn mark_provisioned(
        &self,
        id: &str,
        account_ref: &str,
        mailbox: &str,
    ) -> Result<PersonnelRecord, RecordError> {
        let conn = self.lock()?;

        let changed = conn
            .execute(
                "UPDATE personnel SET directory_user_ref = ?, derived_mailbox = ?, work_email = ?, updated_at = ? WHERE id = ? AND directory_user_ref IS NULL",
                params![account_ref, mailbox, mailbox, Utc::now().to_rfc3339(), id],
            )
            .map_err(db_err)?;

        let record =
            Self::fetch_personnel(&conn, id)?.ok_or_else(|| RecordError::personnel_not_found(id))?;

        if changed == 0 {
            return Err(RecordError::AlreadyProvisioned(id.to_string()));
        }

        Ok(record)
    }
}

fn db_err(e: rusqlite::Error) -> RecordError {
    RecordError::Database(e.to_string())
}

fn parse_timestamp(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}
