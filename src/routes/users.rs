//! Admin user lookup routes — directory-first search with local fallback.

use axum::extract::{Query, State};

use crate::response::{ApiResult, ok};
use crate::routes::auth::AdminKey;
use crate::services::directory::DirectoryUser;
use crate::services::user::{self, User};
use crate::state::AppState;

const DEFAULT_SEARCH_LIMIT: i64 = 20;
const DEFAULT_LIST_LIMIT: i64 = 500;

fn local_to_basic(u: User) -> DirectoryUser {
    DirectoryUser {
        user_id: u.user_id,
        legacy_user_id: None,
        name: u.name,
        company: u.company,
        phone: u.phone,
    }
}

fn with_source(users: Vec<DirectoryUser>, source: &str) -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({ "success": true, "data": users, "source": source }))
}

#[derive(Debug, serde::Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
    pub limit: Option<i64>,
}

/// `GET /api/admin/users/search` — search the directory, then local users.
pub async fn search_users(
    State(state): State<AppState>,
    _admin: AdminKey,
    Query(query): Query<SearchQuery>,
) -> ApiResult {
    let term = query.q.trim();
    if term.is_empty() {
        return Ok(ok(Vec::<DirectoryUser>::new()));
    }
    let limit = query.limit.unwrap_or(DEFAULT_SEARCH_LIMIT).clamp(1, 500);

    if let Some(directory) = &state.directory {
        match directory.list_employees(Some(term), limit, 0).await {
            Ok(users) if !users.is_empty() => return Ok(with_source(users, "directory")),
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %e, "directory search failed, falling back to local"),
        }
    }

    let local = user::search_users(&state.pool, term, limit)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "local user search failed");
            crate::response::ApiError::internal("internal error")
        })?;
    Ok(with_source(local.into_iter().map(local_to_basic).collect(), "local"))
}

#[derive(Debug, serde::Deserialize)]
pub struct ListQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    #[serde(default)]
    pub search: String,
}

/// `GET /api/admin/users/all` — page through the directory or local users.
pub async fn list_users(
    State(state): State<AppState>,
    _admin: AdminKey,
    Query(query): Query<ListQuery>,
) -> ApiResult {
    let limit = query.limit.unwrap_or(DEFAULT_LIST_LIMIT).clamp(1, 1000);
    let offset = query.offset.unwrap_or(0).max(0);
    let term = query.search.trim();

    if let Some(directory) = &state.directory {
        let search = (!term.is_empty()).then_some(term);
        match directory.list_employees(search, limit, offset).await {
            Ok(users) if !users.is_empty() => return Ok(with_source(users, "directory")),
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %e, "directory listing failed, falling back to local"),
        }
    }

    let local = if term.is_empty() {
        user::list_users(&state.pool, limit, offset).await
    } else {
        user::search_users(&state.pool, term, limit).await
    }
    .map_err(|e| {
        tracing::error!(error = %e, "local user listing failed");
        crate::response::ApiError::internal("internal error")
    })?;
    Ok(with_source(local.into_iter().map(local_to_basic).collect(), "local"))
}
