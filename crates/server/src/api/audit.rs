//! Activity log API handlers.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use certward_core::{audit::AuditError, AuditFilter, AuditRecord};

use crate::state::AppState;

/// Maximum allowed limit for audit queries
const MAX_LIMIT: i64 = 1000;

/// Default limit for audit queries
const DEFAULT_LIMIT: i64 = 100;

/// Query parameters for the activity log
#[derive(Debug, Deserialize)]
pub struct AuditQueryParams {
    /// Only events about this managed item
    pub item_id: Option<String>,
    /// Filter by event type (e.g. "request_completed")
    pub event_type: Option<String>,
    /// Filter by initiator ("api", "schedule", "trigger")
    pub actor: Option<String>,
    /// Events at or after this timestamp (ISO 8601)
    pub from: Option<DateTime<Utc>>,
    /// Events at or before this timestamp (ISO 8601)
    pub to: Option<DateTime<Utc>>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl AuditQueryParams {
    /// Filter without pagination, shared by the query and the count.
    fn filter(&self) -> AuditFilter {
        let mut filter = AuditFilter::new();
        if let Some(ref item_id) = self.item_id {
            filter = filter.with_item_id(item_id);
        }
        if let Some(ref event_type) = self.event_type {
            filter = filter.with_event_type(event_type);
        }
        if let Some(ref actor) = self.actor {
            filter = filter.with_actor(actor);
        }
        if self.from.is_some() || self.to.is_some() {
            filter = filter.with_time_range(self.from, self.to);
        }
        filter
    }
}

/// Response for the activity log, newest first
#[derive(Debug, Serialize)]
pub struct AuditQueryResponse {
    pub events: Vec<AuditRecord>,
    /// Total number of matching events
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

/// Error response for audit queries
#[derive(Debug, Serialize)]
pub struct AuditErrorResponse {
    pub error: String,
}

type AuditApiError = (StatusCode, Json<AuditErrorResponse>);

fn store_error(action: &str, e: AuditError) -> AuditApiError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(AuditErrorResponse {
            error: format!("Failed to {} audit events: {}", action, e),
        }),
    )
}

/// Query the activity log
pub async fn query_audit(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AuditQueryParams>,
) -> Result<Json<AuditQueryResponse>, AuditApiError> {
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let offset = params.offset.unwrap_or(0).max(0);

    let base_filter = params.filter();
    let query_filter = base_filter.clone().with_limit(limit).with_offset(offset);

    let events = state
        .audit_store()
        .query(&query_filter)
        .map_err(|e| store_error("query", e))?;
    let total = state
        .audit_store()
        .count(&base_filter)
        .map_err(|e| store_error("count", e))?;

    Ok(Json(AuditQueryResponse {
        events,
        total,
        limit,
        offset,
    }))
}
