//! SQLite persistence for the audit trail.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};

use super::{AuditError, AuditEvent, AuditFilter, AuditRecord, AuditStore};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS audit_events (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    timestamp TEXT NOT NULL,
    event_type TEXT NOT NULL,
    record_id TEXT,
    user_id TEXT,
    data TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_audit_events_timestamp ON audit_events(timestamp);
CREATE INDEX IF NOT EXISTS idx_audit_events_record_id ON audit_events(record_id);
CREATE INDEX IF NOT EXISTS idx_audit_events_event_type ON audit_events(event_type);
"#;

/// Audit store on a single SQLite connection.
pub struct SqliteAuditStore {
    conn: Mutex<Connection>,
}

impl SqliteAuditStore {
    /// Open (or create) the audit database at `path`
    pub fn new(path: &Path) -> Result<Self, AuditError> {
        Self::with_connection(Connection::open(path)?)
    }

    /// In-memory audit store for tests
    pub fn in_memory() -> Result<Self, AuditError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, AuditError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, AuditError> {
        self.conn
            .lock()
            .map_err(|_| AuditError::Database("connection lock poisoned".to_string()))
    }
}

/// `WHERE` clause and its bound values for a filter.
fn predicates(filter: &AuditFilter) -> (String, Vec<Value>) {
    let columns = [
        ("record_id = ?", filter.record_id.clone()),
        ("event_type = ?", filter.event_type.clone()),
        ("timestamp >= ?", filter.from.map(|t| t.to_rfc3339())),
        ("timestamp <= ?", filter.to.map(|t| t.to_rfc3339())),
    ];

    let (clauses, values): (Vec<&str>, Vec<Value>) = columns
        .into_iter()
        .filter_map(|(clause, value)| value.map(|v| (clause, Value::Text(v))))
        .unzip();

    if clauses.is_empty() {
        (String::new(), values)
    } else {
        (format!("WHERE {}", clauses.join(" AND ")), values)
    }
}

fn row_to_record(row: &Row) -> Result<AuditRecord, AuditError> {
    let timestamp: String = row.get(1)?;
    let data: String = row.get(5)?;

    Ok(AuditRecord {
        id: row.get(0)?,
        timestamp: DateTime::parse_from_rfc3339(&timestamp)
            .map_err(|e| AuditError::Database(format!("Invalid timestamp: {}", e)))?
            .with_timezone(&Utc),
        event_type: row.get(2)?,
        record_id: row.get(3)?,
        user_id: row.get(4)?,
        data: serde_json::from_str::<AuditEvent>(&data)?,
    })
}

impl AuditStore for SqliteAuditStore {
    fn insert(&self, record: &AuditRecord) -> Result<i64, AuditError> {
        let data = serde_json::to_string(&record.data)?;
        let conn = self.lock()?;

        conn.execute(
            "INSERT INTO audit_events (timestamp, event_type, record_id, user_id, data) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                record.timestamp.to_rfc3339(),
                record.event_type,
                record.record_id,
                record.user_id,
                data,
            ],
        )?;

        Ok(conn.last_insert_rowid())
    }

    fn query(&self, filter: &AuditFilter) -> Result<Vec<AuditRecord>, AuditError> {
        let (where_clause, mut values) = predicates(filter);
        values.push(Value::Integer(filter.limit));
        values.push(Value::Integer(filter.offset));

        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT id, timestamp, event_type, record_id, user_id, data FROM audit_events {} ORDER BY timestamp DESC, id DESC LIMIT ? OFFSET ?",
            where_clause
        ))?;
        let mut rows = stmt.query(params_from_iter(values))?;

        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            records.push(row_to_record(row)?);
        }
        Ok(records)
    }

    fn count(&self, filter: &AuditFilter) -> Result<i64, AuditError> {
        let (where_clause, values) = predicates(filter);
        let conn = self.lock()?;

        Ok(conn.query_row(
            &format!("SELECT COUNT(*) FROM audit_events {}", where_clause),
            params_from_iter(values),
            |row| row.get(0),
        )?)
    }
}
