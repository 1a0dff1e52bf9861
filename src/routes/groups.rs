//! User group routes — CRUD and membership management.

use axum::extract::{Path, State};

use crate::response::{ApiError, ApiResult, ok, ok_message};
use crate::routes::auth::AdminKey;
use crate::services::group::{self, GroupError};
use crate::state::AppState;

pub(crate) fn group_error_to_api(err: GroupError) -> ApiError {
    match err {
        GroupError::NotFound(id) => ApiError::not_found(format!("user group not found: {id}")),
        GroupError::Validation(msg) => ApiError::bad_request(msg),
        GroupError::Database(e) => {
            tracing::error!(error = %e, "group query failed");
            ApiError::internal("internal error")
        }
    }
}

/// `GET /api/admin/user-groups` — all groups.
pub async fn list_groups(State(state): State<AppState>, _admin: AdminKey) -> ApiResult {
    let groups = group::get_all_groups(&state.pool)
        .await
        .map_err(group_error_to_api)?;
    Ok(ok(groups))
}

#[derive(Debug, serde::Deserialize)]
pub struct GroupBody {
    pub name: Option<String>,
    pub description: Option<String>,
}

/// `POST /api/admin/user-groups` — create a group.
pub async fn create_group(
    State(state): State<AppState>,
    _admin: AdminKey,
    axum::Json(body): axum::Json<GroupBody>,
) -> ApiResult {
    let name = body.name.as_deref().unwrap_or_default();
    let created = group::create_group(&state.pool, name, body.description.as_deref().unwrap_or_default())
        .await
        .map_err(group_error_to_api)?;
    Ok(ok(created))
}

/// `GET /api/admin/user-groups/{id}` — one group.
pub async fn get_group(State(state): State<AppState>, _admin: AdminKey, Path(group_id): Path<String>) -> ApiResult {
    let found = group::get_group(&state.pool, &group_id)
        .await
        .map_err(group_error_to_api)?
        .ok_or_else(|| ApiError::not_found("user group not found"))?;
    Ok(ok(found))
}

/// `PUT /api/admin/user-groups/{id}` — rename or re-describe.
pub async fn update_group(
    State(state): State<AppState>,
    _admin: AdminKey,
    Path(group_id): Path<String>,
    axum::Json(body): axum::Json<GroupBody>,
) -> ApiResult {
    let updated = group::update_group(&state.pool, &group_id, body.name.as_deref(), body.description.as_deref())
        .await
        .map_err(group_error_to_api)?;
    Ok(ok(updated))
}

/// `DELETE /api/admin/user-groups/{id}` — delete a group.
pub async fn delete_group(State(state): State<AppState>, _admin: AdminKey, Path(group_id): Path<String>) -> ApiResult {
    group::delete_group(&state.pool, &group_id)
        .await
        .map_err(group_error_to_api)?;
    Ok(ok_message("user group deleted"))
}

#[derive(Debug, serde::Deserialize)]
pub struct AddMembersBody {
    pub user_id: Option<String>,
    #[serde(default)]
    pub user_ids: Vec<String>,
}

/// `POST /api/admin/user-groups/{id}/members` — add one or many members.
pub async fn add_members(
    State(state): State<AppState>,
    _admin: AdminKey,
    Path(group_id): Path<String>,
    axum::Json(body): axum::Json<AddMembersBody>,
) -> ApiResult {
    let user_ids = match &body.user_id {
        Some(single) if !single.trim().is_empty() => vec![single.trim().to_string()],
        _ => body.user_ids.clone(),
    };
    if user_ids.is_empty() {
        return Err(ApiError::bad_request("user id must not be empty"));
    }
    let updated = group::add_group_members(&state.pool, &group_id, &user_ids)
        .await
        .map_err(group_error_to_api)?;
    Ok(ok(updated))
}

/// `DELETE /api/admin/user-groups/{id}/members/{user_id}` — remove a member.
pub async fn remove_member(
    State(state): State<AppState>,
    _admin: AdminKey,
    Path((group_id, user_id)): Path<(String, String)>,
) -> ApiResult {
    let updated = group::remove_group_member(&state.pool, &group_id, &user_id)
        .await
        .map_err(group_error_to_api)?;
    Ok(ok(updated))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn group_errors_map_to_expected_statuses() {
        assert_eq!(
            group_error_to_api(GroupError::NotFound("grp-1".into())).status,
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            group_error_to_api(GroupError::Validation("group name must not be empty".into())).status,
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn add_members_body_accepts_single_or_batch() {
        let single: AddMembersBody = serde_json::from_value(serde_json::json!({"user_id": "u1"})).unwrap();
        assert_eq!(single.user_id.as_deref(), Some("u1"));
        assert!(single.user_ids.is_empty());

        let batch: AddMembersBody =
            serde_json::from_value(serde_json::json!({"user_ids": ["u1", "u2"]})).unwrap();
        assert_eq!(batch.user_ids.len(), 2);
    }
}
