//! Renewal API handlers.

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use std::sync::Arc;
use certward_core::{
    renewal::RenewalPolicyOverride, ProgressSinks, RenewalPassReport, RenewalServiceStatus,
};

use crate::state::AppState;

/// Error response
#[derive(Debug, Serialize)]
pub struct RenewalErrorResponse {
    pub error: String,
}

/// Run a renewal pass now with the configured policy.
///
/// The optional body overrides individual policy fields for this pass only.
/// Responds once the pass has finished.
pub async fn run_renewal(
    State(state): State<Arc<AppState>>,
    body: Option<Json<RenewalPolicyOverride>>,
) -> Result<Json<RenewalPassReport>, (StatusCode, Json<RenewalErrorResponse>)> {
    let changes = body.map(|Json(changes)| changes).unwrap_or_default();
    let policy = state.renewal().policy().apply(changes);

    match state
        .renewal()
        .run_now(&policy, &ProgressSinks::new(), "api")
        .await
    {
        Ok(report) => Ok(Json(report)),
        Err(e) => Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(RenewalErrorResponse {
                error: e.to_string(),
            }),
        )),
    }
}

/// Get renewal service status
pub async fn get_status(State(state): State<Arc<AppState>>) -> Json<RenewalServiceStatus> {
    Json(state.renewal().status().await)
}
