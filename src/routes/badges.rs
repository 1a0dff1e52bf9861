//! Badge routes — a learner's earned course badges.

use axum::extract::{Path, State};

use crate::response::{ApiError, ApiResult, ok};
use crate::routes::auth::AuthUser;
use crate::services::badge::{self, BadgeError};
use crate::state::AppState;

fn badge_error_to_api(err: BadgeError) -> ApiError {
    match err {
        BadgeError::Database(e) => {
            tracing::error!(error = %e, "badge query failed");
            ApiError::internal("internal error")
        }
    }
}

/// `GET /api/badges` — the caller's badges.
pub async fn list_badges(State(state): State<AppState>, auth: AuthUser) -> ApiResult {
    let badges = badge::badges_for_user(&state.pool, &auth.session.user_id)
        .await
        .map_err(badge_error_to_api)?;
    Ok(ok(badges))
}

/// `GET /api/badges/{badge_id}` — one badge; only the owner may read it.
pub async fn get_badge(State(state): State<AppState>, auth: AuthUser, Path(badge_id): Path<String>) -> ApiResult {
    let found = badge::get_badge(&state.pool, &badge_id)
        .await
        .map_err(badge_error_to_api)?
        .ok_or_else(|| ApiError::not_found("badge not found"))?;
    if found.user_id != auth.session.user_id {
        return Err(ApiError::forbidden("badge belongs to another user"));
    }
    Ok(ok(found))
}
