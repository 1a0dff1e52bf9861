//! Progress routes — snapshots, sync merge, and the XP leaderboard.

use axum::extract::{Query, State};

use crate::response::{ApiError, ApiResult, ok, ok_message};
use crate::routes::auth::{AdminKey, AuthUser};
use crate::services::progress::{self, Progress, ProgressError};
use crate::state::AppState;

const XP_LEADERBOARD_LIMIT: i64 = 50;

pub(crate) fn progress_error_to_api(err: ProgressError) -> ApiError {
    match err {
        ProgressError::Database(e) => {
            tracing::error!(error = %e, "progress query failed");
            ApiError::internal("internal error")
        }
    }
}

/// `GET /api/progress` — stored snapshot or defaults.
pub async fn get_progress(State(state): State<AppState>, auth: AuthUser) -> ApiResult {
    let snapshot = progress::get_or_default(&state.pool, &auth.session.user_id)
        .await
        .map_err(progress_error_to_api)?;
    Ok(ok(snapshot))
}

/// `POST /api/progress` — store the posted snapshot.
pub async fn save_progress(
    State(state): State<AppState>,
    auth: AuthUser,
    axum::Json(snapshot): axum::Json<Progress>,
) -> ApiResult {
    progress::save_user_progress(&state.pool, &auth.session.user_id, &snapshot)
        .await
        .map_err(progress_error_to_api)?;
    Ok(ok_message("progress saved"))
}

/// `POST /api/progress/sync` — merge the client snapshot with the stored
/// one and return the merged result.
pub async fn sync_progress(
    State(state): State<AppState>,
    auth: AuthUser,
    axum::Json(client): axum::Json<Progress>,
) -> ApiResult {
    let server = progress::get_or_default(&state.pool, &auth.session.user_id)
        .await
        .map_err(progress_error_to_api)?;
    let merged = progress::merge_progress(&server, &client);
    progress::save_user_progress(&state.pool, &auth.session.user_id, &merged)
        .await
        .map_err(progress_error_to_api)?;
    Ok(ok(merged))
}

#[derive(Debug, serde::Deserialize)]
pub struct LeaderboardQuery {
    pub syllabus_id: Option<String>,
    pub limit: Option<i64>,
}

/// `GET /api/progress/leaderboard` — top learners by XP.
pub async fn xp_leaderboard(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<LeaderboardQuery>,
) -> ApiResult {
    let limit = query.limit.unwrap_or(XP_LEADERBOARD_LIMIT).clamp(1, 200);
    let leaderboard = progress::xp_leaderboard(
        &state.pool,
        query.syllabus_id.as_deref().filter(|id| !id.trim().is_empty()),
        limit,
        &auth.session.user_id,
    )
    .await
    .map_err(progress_error_to_api)?;
    Ok(ok(leaderboard))
}

/// `POST /api/admin/migrate/recalculate-xp` — rebuild `total_xp` from the
/// per-syllabus XP maps.
pub async fn recalculate_xp(State(state): State<AppState>, _admin: AdminKey) -> ApiResult {
    let changed = progress::recalculate_all_total_xp(&state.pool)
        .await
        .map_err(progress_error_to_api)?;
    Ok(ok(serde_json::json!({ "updated": changed })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leaderboard_query_defaults() {
        let q: LeaderboardQuery = serde_json::from_value(serde_json::json!({})).unwrap();
        assert!(q.syllabus_id.is_none());
        assert!(q.limit.is_none());
    }

    #[test]
    fn progress_errors_are_internal() {
        let err = progress_error_to_api(ProgressError::Database(sqlx::Error::PoolClosed));
        assert_eq!(err.status, axum::http::StatusCode::INTERNAL_SERVER_ERROR);
        // The raw database error never reaches the client.
        assert_eq!(err.message, "internal error");
    }
}
