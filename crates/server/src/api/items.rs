//! Managed item API handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use certward_core::{
    AuditEvent, CertificateRequestResult, CreateItemRequest, ItemFilter, ItemStoreError,
    ManagedCertificateItem, ManagedItemType,
};

use crate::state::AppState;

/// Maximum allowed limit for item queries
const MAX_LIMIT: i64 = 1000;

/// Default limit for item queries
const DEFAULT_LIMIT: i64 = 100;

/// Actor recorded for changes made through the API
const API_ACTOR: &str = "api";

// ============================================================================
// Request/Response Types
// ============================================================================

/// Query parameters for listing items
#[derive(Debug, Deserialize)]
pub struct ListItemsParams {
    /// Only items included in auto renewal
    #[serde(default)]
    pub auto_renew_only: bool,
    /// Filter by item type
    pub item_type: Option<ManagedItemType>,
    /// Maximum number of items to return
    pub limit: Option<i64>,
    /// Pagination offset
    pub offset: Option<i64>,
}

/// Response for listing items
#[derive(Debug, Serialize)]
pub struct ListItemsResponse {
    pub items: Vec<ManagedCertificateItem>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ItemErrorResponse {
    pub error: String,
}

type ItemError = (StatusCode, Json<ItemErrorResponse>);

fn error_response(status: StatusCode, error: impl Into<String>) -> ItemError {
    (
        status,
        Json(ItemErrorResponse {
            error: error.into(),
        }),
    )
}

fn store_error(e: ItemStoreError) -> ItemError {
    match e {
        ItemStoreError::NotFound(id) => {
            error_response(StatusCode::NOT_FOUND, format!("Managed item not found: {}", id))
        }
        other => error_response(StatusCode::INTERNAL_SERVER_ERROR, other.to_string()),
    }
}

fn load_item(state: &AppState, id: &str) -> Result<ManagedCertificateItem, ItemError> {
    match state.items().get(id) {
        Ok(Some(item)) => Ok(item),
        Ok(None) => Err(store_error(ItemStoreError::NotFound(id.to_string()))),
        Err(e) => Err(store_error(e)),
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// Create a new managed item
pub async fn create_item(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateItemRequest>,
) -> Result<(StatusCode, Json<ManagedCertificateItem>), ItemError> {
    if body.name.trim().is_empty() {
        return Err(error_response(StatusCode::BAD_REQUEST, "name must not be empty"));
    }
    if let Err(e) = body.request_config.validate() {
        return Err(error_response(StatusCode::BAD_REQUEST, e));
    }

    let item = ManagedCertificateItem::new(body);
    if let Err(e) = state.items().save(&item) {
        return Err(store_error(e));
    }

    info!("Created managed item {} ({})", item.name, item.id);
    state.audit().try_emit(AuditEvent::ItemSaved {
        item_id: item.id.clone(),
        name: item.name.clone(),
        saved_by: API_ACTOR.to_string(),
        created: true,
    });

    Ok((StatusCode::CREATED, Json(item)))
}

/// Get a managed item by ID
pub async fn get_item(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ManagedCertificateItem>, ItemError> {
    load_item(&state, &id).map(Json)
}

/// List managed items with optional filters
pub async fn list_items(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListItemsParams>,
) -> Result<Json<ListItemsResponse>, ItemError> {
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let offset = params.offset.unwrap_or(0).max(0);

    let mut base_filter = ItemFilter::new();
    if params.auto_renew_only {
        base_filter = base_filter.auto_renew_only();
    }
    if let Some(item_type) = params.item_type {
        base_filter = base_filter.with_item_type(item_type);
    }

    let query_filter = base_filter.clone().with_limit(limit).with_offset(offset);

    let items = match state.items().list(&query_filter) {
        Ok(items) => items,
        Err(e) => return Err(store_error(e)),
    };

    let total = match state.items().count(&base_filter) {
        Ok(total) => total,
        Err(e) => return Err(store_error(e)),
    };

    Ok(Json(ListItemsResponse {
        items,
        total,
        limit,
        offset,
    }))
}

/// Delete a managed item
pub async fn delete_item(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ManagedCertificateItem>, ItemError> {
    let item = state.items().delete(&id).map_err(store_error)?;

    info!("Deleted managed item {} ({})", item.name, item.id);
    state.audit().try_emit(AuditEvent::ItemDeleted {
        item_id: item.id.clone(),
        name: item.name.clone(),
        deleted_by: API_ACTOR.to_string(),
    });

    Ok(Json(item))
}

/// Request (or renew) the certificate for one item now.
///
/// Waits for any request already holding the provider session. The response
/// is the request result whether it succeeded or not.
pub async fn request_certificate(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<CertificateRequestResult>, ItemError> {
    let item = load_item(&state, &id)?;
    let result = state.requester().request_certificate(&item, None).await;
    Ok(Json(result))
}
