//! Learning analytics routes.

use axum::extract::{Query, State};

use crate::response::{ApiError, ApiResult, ok};
use crate::routes::auth::AdminKey;
use crate::services::analytics::{self, AnalyticsError};
use crate::state::AppState;

fn analytics_error_to_api(err: AnalyticsError) -> ApiError {
    match err {
        AnalyticsError::SyllabusNotFound(id) => ApiError::not_found(format!("syllabus not found: {id}")),
        AnalyticsError::Database(e) => {
            tracing::error!(error = %e, "analytics query failed");
            ApiError::internal("internal error")
        }
    }
}

/// `GET /api/admin/learning-analytics/syllabi` — participation overview.
pub async fn syllabi_overview(State(state): State<AppState>, _admin: AdminKey) -> ApiResult {
    let overview = analytics::syllabi_overview(&state.pool)
        .await
        .map_err(analytics_error_to_api)?;
    Ok(ok(overview))
}

#[derive(Debug, serde::Deserialize)]
pub struct AnalyticsQuery {
    pub syllabus_id: Option<String>,
}

/// `GET /api/admin/learning-analytics?syllabus_id=` — per-user breakdown
/// for one syllabus.
pub async fn syllabus_detail(
    State(state): State<AppState>,
    _admin: AdminKey,
    Query(query): Query<AnalyticsQuery>,
) -> ApiResult {
    let syllabus_id = query
        .syllabus_id
        .as_deref()
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("syllabus_id query parameter is required"))?;
    let detail = analytics::syllabus_analytics(&state.pool, syllabus_id)
        .await
        .map_err(analytics_error_to_api)?;
    Ok(ok(detail))
}
