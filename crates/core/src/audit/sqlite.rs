//! Activity log table in the service database.

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
        item_id TEXT,
        actor TEXT,
        data TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_audit_events_timestamp ON audit_events(timestamp);
    CREATE INDEX IF NOT EXISTS idx_audit_events_item_id ON audit_events(item_id);
"#;

fn db_error(e: rusqlite::Error) -> AuditError {
    AuditError::Database(e.to_string())
}

/// Activity log kept in SQLite. Each event is stored as JSON next to the
/// columns the filters match on.
pub struct SqliteAuditStore {
    conn: Mutex<Connection>,
}

impl SqliteAuditStore {
    pub fn new(path: &Path) -> Result<Self, AuditError> {
        Self::with_connection(Connection::open(path).map_err(db_error)?)
    }

    pub fn in_memory() -> Result<Self, AuditError> {
        Self::with_connection(Connection::open_in_memory().map_err(db_error)?)
    }

    fn with_connection(conn: Connection) -> Result<Self, AuditError> {
        conn.execute_batch(SCHEMA).map_err(db_error)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, AuditError> {
        self.conn
            .lock()
            .map_err(|_| AuditError::Database("audit connection lock poisoned".to_string()))
    }
}

/// `WHERE` clause and its bound values for everything but pagination.
fn selection(filter: &AuditFilter) -> (String, Vec<Value>) {
    let text = |column: &'static str, value: &Option<String>| {
        value.clone().map(|v| (column, Value::Text(v)))
    };
    let time = |column: &'static str, value: &Option<DateTime<Utc>>| {
        value.map(|t| (column, Value::Text(t.to_rfc3339())))
    };

    let (clauses, values): (Vec<&str>, Vec<Value>) = [
        text("item_id = ?", &filter.item_id),
        text("event_type = ?", &filter.event_type),
        text("actor = ?", &filter.actor),
        time("timestamp >= ?", &filter.from),
        time("timestamp <= ?", &filter.to),
    ]
    .into_iter()
    .flatten()
    .unzip();

    if clauses.is_empty() {
        (String::new(), values)
    } else {
        (format!("WHERE {}", clauses.join(" AND ")), values)
    }
}

/// Columns of one row, before the timestamp and event are parsed.
type RawRecord = (i64, String, String, Option<String>, Option<String>, String);

fn raw_record(row: &Row<'_>) -> rusqlite::Result<RawRecord> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
    ))
}

fn decode(raw: RawRecord) -> Result<AuditRecord, AuditError> {
    let (id, timestamp, event_type, item_id, actor, data) = raw;
    let timestamp = DateTime::parse_from_rfc3339(&timestamp)
        .map_err(|e| AuditError::Database(format!("bad timestamp on event {}: {}", id, e)))?
        .with_timezone(&Utc);
    let data: AuditEvent =
        serde_json::from_str(&data).map_err(|e| AuditError::Serialization(e.to_string()))?;

    Ok(AuditRecord {
        id,
        timestamp,
        event_type,
        item_id,
        actor,
        data,
    })
}

impl AuditStore for SqliteAuditStore {
    fn insert(&self, record: &AuditRecord) -> Result<i64, AuditError> {
        let data = serde_json::to_string(&record.data)
            .map_err(|e| AuditError::Serialization(e.to_string()))?;

        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO audit_events (timestamp, event_type, item_id, actor, data) VALUES (?, ?, ?, ?, ?)",
            params![
                record.timestamp.to_rfc3339(),
                record.event_type,
                record.item_id,
                record.actor,
                data,
            ],
        )
        .map_err(db_error)?;

        Ok(conn.last_insert_rowid())
    }

    fn query(&self, filter: &AuditFilter) -> Result<Vec<AuditRecord>, AuditError> {
        let (selection, mut values) = selection(filter);
        values.push(Value::Integer(filter.limit));
        values.push(Value::Integer(filter.offset));
        let sql = format!(
            "SELECT id, timestamp, event_type, item_id, actor, data FROM audit_events {} \
             ORDER BY timestamp DESC, id DESC LIMIT ? OFFSET ?",
            selection
        );

        let conn = self.conn()?;
        let mut stmt = conn.prepare(&sql).map_err(db_error)?;
        let rows = stmt
            .query_map(params_from_iter(values), raw_record)
            .map_err(db_error)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(db_error)?;

        rows.into_iter().map(decode).collect()
    }

    fn count(&self, filter: &AuditFilter) -> Result<i64, AuditError> {
        let (selection, values) = selection(filter);
        let sql = format!("SELECT COUNT(*) FROM audit_events {}", selection);

        self.conn()?
            .query_row(&sql, params_from_iter(values), |row| row.get(0))
            .map_err(db_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn create_test_store() -> SqliteAuditStore {
        SqliteAuditStore::in_memory().unwrap()
    }

    fn record_for(event: AuditEvent) -> AuditRecord {
        AuditRecord {
            id: 0,
            timestamp: Utc::now(),
            event_type: event.event_type().to_string(),
            item_id: event.item_id().map(String::from),
            actor: event.actor().map(String::from),
            data: event,
        }
    }

    fn service_started() -> AuditRecord {
        record_for(AuditEvent::ServiceStarted {
            version: "0.1.0".to_string(),
            config_hash: "abc123".to_string(),
        })
    }

    fn request_started(item_id: &str) -> AuditRecord {
        record_for(AuditEvent::RequestStarted {
            item_id: item_id.to_string(),
            item_name: format!("Site {}", item_id),
            domains: vec!["example.com".to_string()],
        })
    }

    fn item_saved(item_id: &str, actor: &str) -> AuditRecord {
        record_for(AuditEvent::ItemSaved {
            item_id: item_id.to_string(),
            name: "Example".to_string(),
            saved_by: actor.to_string(),
            created: true,
        })
    }

    #[test]
    fn test_insert_and_query() {
        let store = create_test_store();

        let id = store.insert(&service_started()).unwrap();
        assert!(id > 0);

        let results = store.query(&AuditFilter::new()).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, id);
        assert_eq!(results[0].event_type, "service_started");
    }

    #[test]
    fn test_query_by_event_type() {
        let store = create_test_store();

        store.insert(&service_started()).unwrap();
        store.insert(&request_started("item-1")).unwrap();
        store.insert(&request_started("item-2")).unwrap();

        let filter = AuditFilter::new().with_event_type("request_started");
        assert_eq!(store.query(&filter).unwrap().len(), 2);

        let filter = AuditFilter::new().with_event_type("service_started");
        assert_eq!(store.query(&filter).unwrap().len(), 1);
    }

    #[test]
    fn test_query_by_item_id() {
        let store = create_test_store();

        store.insert(&request_started("item-1")).unwrap();
        store.insert(&request_started("item-2")).unwrap();
        store.insert(&item_saved("item-1", "api")).unwrap();

        let filter = AuditFilter::new().with_item_id("item-1");
        let results = store.query(&filter).unwrap();
        assert_eq!(results.len(), 2);
        assert!(results
            .iter()
            .all(|r| r.item_id.as_deref() == Some("item-1")));
    }

    #[test]
    fn test_query_by_actor() {
        let store = create_test_store();

        store.insert(&item_saved("item-1", "api")).unwrap();
        store.insert(&item_saved("item-2", "api")).unwrap();
        store.insert(&item_saved("item-3", "import")).unwrap();

        let filter = AuditFilter::new().with_actor("api");
        assert_eq!(store.query(&filter).unwrap().len(), 2);
    }

    #[test]
    fn test_newest_first() {
        let store = create_test_store();

        store.insert(&request_started("item-1")).unwrap();
        store.insert(&request_started("item-2")).unwrap();

        let results = store.query(&AuditFilter::new()).unwrap();
        assert_eq!(results[0].item_id.as_deref(), Some("item-2"));
    }

    #[test]
    fn test_query_with_time_range() {
        let store = create_test_store();

        let now = Utc::now();
        let mut old_record = service_started();
        old_record.timestamp = now - Duration::hours(2);
        store.insert(&old_record).unwrap();

        let mut new_record = service_started();
        new_record.timestamp = now;
        store.insert(&new_record).unwrap();

        let filter = AuditFilter::new().with_time_range(Some(now - Duration::hours(1)), None);
        let results = store.query(&filter).unwrap();
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn test_pagination() {
        let store = create_test_store();

        for i in 0..5 {
            store.insert(&request_started(&format!("item-{}", i))).unwrap();
        }

        let filter = AuditFilter::new().with_limit(2).with_offset(0);
        assert_eq!(store.query(&filter).unwrap().len(), 2);

        let filter = AuditFilter::new().with_limit(2).with_offset(4);
        assert_eq!(store.query(&filter).unwrap().len(), 1);
    }

    #[test]
    fn test_count() {
        let store = create_test_store();

        store.insert(&service_started()).unwrap();
        store.insert(&request_started("item-1")).unwrap();
        store.insert(&request_started("item-2")).unwrap();

        assert_eq!(store.count(&AuditFilter::new()).unwrap(), 3);

        let filter = AuditFilter::new().with_event_type("request_started");
        assert_eq!(store.count(&filter).unwrap(), 2);
    }

    #[test]
    fn test_count_ignores_pagination() {
        let store = create_test_store();

        store.insert(&item_saved("item-1", "api")).unwrap();
        store.insert(&request_started("item-1")).unwrap();
        store.insert(&item_saved("item-2", "api")).unwrap();

        let filter = AuditFilter::new()
            .with_item_id("item-1")
            .with_actor("api")
            .with_limit(1)
            .with_offset(5);
        assert!(store.query(&filter).unwrap().is_empty());
        assert_eq!(store.count(&filter).unwrap(), 1);
    }

    #[test]
    fn test_file_based_store() {
        let temp_dir = tempfile::tempdir().unwrap();
        let db_path = temp_dir.path().join("audit.db");

        let store = SqliteAuditStore::new(&db_path).unwrap();
        store.insert(&service_started()).unwrap();

        assert!(db_path.exists());
        assert_eq!(store.query(&AuditFilter::new()).unwrap().len(), 1);
    }
}
