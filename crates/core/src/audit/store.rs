use chrono::{DateTime, Utc};
use thiserror::Error;

use super::AuditRecord;

/// Page size when the caller does not pick one.
const DEFAULT_PAGE_SIZE: i64 = 100;

#[derive(Debug, Error)]
pub enum AuditError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Selects activity log entries. Unset criteria match everything.
#[derive(Debug, Clone)]
pub struct AuditFilter {
    pub item_id: Option<String>,
    pub event_type: Option<String>,
    /// Who started the work: "api", "schedule" or "trigger".
    pub actor: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub limit: i64,
    pub offset: i64,
}

impl Default for AuditFilter {
    fn default() -> Self {
        Self {
            item_id: None,
            event_type: None,
            actor: None,
            from: None,
            to: None,
            limit: DEFAULT_PAGE_SIZE,
            offset: 0,
        }
    }
}

impl AuditFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_item_id(self, item_id: impl Into<String>) -> Self {
        Self {
            item_id: Some(item_id.into()),
            ..self
        }
    }

    pub fn with_event_type(self, event_type: impl Into<String>) -> Self {
        Self {
            event_type: Some(event_type.into()),
            ..self
        }
    }

    pub fn with_actor(self, actor: impl Into<String>) -> Self {
        Self {
            actor: Some(actor.into()),
            ..self
        }
    }

    /// Both bounds are inclusive.
    pub fn with_time_range(self, from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) -> Self {
        Self { from, to, ..self }
    }

    pub fn with_limit(self, limit: i64) -> Self {
        Self { limit, ..self }
    }

    pub fn with_offset(self, offset: i64) -> Self {
        Self { offset, ..self }
    }
}

/// Persistence for the activity log.
pub trait AuditStore: Send + Sync {
    /// Append a record and return its row id.
    fn insert(&self, record: &AuditRecord) -> Result<i64, AuditError>;

    /// One page of matching records, newest first.
    fn query(&self, filter: &AuditFilter) -> Result<Vec<AuditRecord>, AuditError>;

    /// Number of matching records, ignoring pagination.
    fn count(&self, filter: &AuditFilter) -> Result<i64, AuditError>;
}
