//! SQLite-backed managed item store.

use std::path::Path;
use std::sync::Mutex;

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};

use super::{ItemFilter, ItemStoreError, ManagedCertificateItem, ManagedItemStore};

/// SQLite-backed managed item store.
///
/// The full item is stored as JSON; the columns used for filtering are kept
/// alongside it.
pub struct SqliteItemStore {
    conn: Mutex<Connection>,
}

impl SqliteItemStore {
    /// Create a new store, creating the database file and tables if needed.
    pub fn new(path: &Path) -> Result<Self, ItemStoreError> {
        let conn = Connection::open(path).map_err(|e| ItemStoreError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory store (useful for testing).
    pub fn in_memory() -> Result<Self, ItemStoreError> {
        let conn =
            Connection::open_in_memory().map_err(|e| ItemStoreError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), ItemStoreError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS managed_items (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                item_type TEXT NOT NULL,
                include_in_auto_renew INTEGER NOT NULL,
                data TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_managed_items_auto_renew ON managed_items(include_in_auto_renew);
            "#,
        )
        .map_err(|e| ItemStoreError::Database(e.to_string()))?;

        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, ItemStoreError> {
        self.conn
            .lock()
            .map_err(|_| ItemStoreError::Database("connection lock poisoned".to_string()))
    }

    fn build_where_clause(filter: &ItemFilter) -> (String, Vec<Box<dyn rusqlite::ToSql>>) {
        let mut conditions = Vec::new();
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if filter.auto_renew_only {
            conditions.push("include_in_auto_renew = 1");
        }

        if let Some(item_type) = filter.item_type {
            conditions.push("item_type = ?");
            params.push(Box::new(item_type.as_str().to_string()));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        (where_clause, params)
    }

    fn decode(id: &str, data: &str) -> Result<ManagedCertificateItem, ItemStoreError> {
        serde_json::from_str(data).map_err(|e| ItemStoreError::Corrupt {
            item_id: id.to_string(),
            reason: e.to_string(),
        })
    }
}

impl ManagedItemStore for SqliteItemStore {
    fn save(&self, item: &ManagedCertificateItem) -> Result<(), ItemStoreError> {
        let data = serde_json::to_string(item).map_err(|e| ItemStoreError::Corrupt {
            item_id: item.id.clone(),
            reason: e.to_string(),
        })?;
        let now = Utc::now().to_rfc3339();

        let conn = self.lock()?;
        // Upsert keeps the original rowid, so iteration order stays stable.
        conn.execute(
            r#"
            INSERT INTO managed_items (id, name, item_type, include_in_auto_renew, data, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                item_type = excluded.item_type,
                include_in_auto_renew = excluded.include_in_auto_renew,
                data = excluded.data,
                updated_at = excluded.updated_at
            "#,
            params![
                item.id,
                item.name,
                item.item_type.as_str(),
                item.include_in_auto_renew,
                data,
                now,
            ],
        )
        .map_err(|e| ItemStoreError::Database(e.to_string()))?;

        Ok(())
    }

    fn get(&self, id: &str) -> Result<Option<ManagedCertificateItem>, ItemStoreError> {
        let conn = self.lock()?;
        let data: Option<String> = conn
            .query_row(
                "SELECT data FROM managed_items WHERE id = ?",
                params![id],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| ItemStoreError::Database(e.to_string()))?;

        data.map(|data| Self::decode(id, &data)).transpose()
    }

    fn list(&self, filter: &ItemFilter) -> Result<Vec<ManagedCertificateItem>, ItemStoreError> {
        let conn = self.lock()?;
        let (where_clause, params) = Self::build_where_clause(filter);

        // SQLite treats a negative LIMIT as unbounded.
        let limit = if filter.limit > 0 { filter.limit } else { -1 };
        let sql = format!(
            "SELECT id, data FROM managed_items {} ORDER BY rowid ASC LIMIT ? OFFSET ?",
            where_clause
        );

        let mut all_params = params;
        all_params.push(Box::new(limit));
        all_params.push(Box::new(filter.offset));
        let param_refs: Vec<&dyn rusqlite::ToSql> = all_params.iter().map(|p| p.as_ref()).collect();

        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| ItemStoreError::Database(e.to_string()))?;
        let rows = stmt
            .query_map(param_refs.as_slice(), |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })
            .map_err(|e| ItemStoreError::Database(e.to_string()))?;

        let mut items = Vec::new();
        for row in rows {
            let (id, data) = row.map_err(|e| ItemStoreError::Database(e.to_string()))?;
            items.push(Self::decode(&id, &data)?);
        }
        Ok(items)
    }

    fn count(&self, filter: &ItemFilter) -> Result<i64, ItemStoreError> {
        let conn = self.lock()?;
        let (where_clause, params) = Self::build_where_clause(filter);
        let sql = format!("SELECT COUNT(*) FROM managed_items {}", where_clause);
        let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

        conn.query_row(&sql, param_refs.as_slice(), |row| row.get(0))
            .map_err(|e| ItemStoreError::Database(e.to_string()))
    }

    fn delete(&self, id: &str) -> Result<ManagedCertificateItem, ItemStoreError> {
        let item = self
            .get(id)?
            .ok_or_else(|| ItemStoreError::NotFound(id.to_string()))?;

        let conn = self.lock()?;
        conn.execute("DELETE FROM managed_items WHERE id = ?", params![id])
            .map_err(|e| ItemStoreError::Database(e.to_string()))?;

        Ok(item)
    }
}
