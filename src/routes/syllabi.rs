//! Syllabus routes — admin management and the learner-facing catalog.

use axum::extract::{Path, State};

use crate::response::{ApiError, ApiResult, ok, ok_message};
use crate::routes::auth::{AdminKey, AuthUser, syllabus_error_to_api};
use crate::routes::courses::course_error_to_api;
use crate::services::course;
use crate::services::group;
use crate::services::syllabus::{self, AccessIdentity, InvitationRequest, SyllabusUpdate};
use crate::state::AppState;

async fn identity_for(state: &AppState, auth: &AuthUser) -> Result<AccessIdentity, ApiError> {
    let group_ids = group::group_ids_for_user(&state.pool, &auth.session.user_id)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "group lookup failed");
            ApiError::internal("internal error")
        })?;
    Ok(AccessIdentity {
        user_id: auth.session.user_id.clone(),
        user_type: auth.session.user_type,
        accessible_syllabi: auth.session.accessible_syllabi.clone(),
        group_ids,
    })
}

// =============================================================================
// LEARNER
// =============================================================================

/// `GET /api/syllabi` — syllabi the caller may open.
pub async fn list_accessible(State(state): State<AppState>, auth: AuthUser) -> ApiResult {
    let identity = identity_for(&state, &auth).await?;
    let syllabi = syllabus::accessible_syllabi(&state.pool, &identity)
        .await
        .map_err(syllabus_error_to_api)?;
    Ok(ok(syllabi))
}

/// `GET /api/syllabi/{id}` — one syllabus, access-checked.
pub async fn get_accessible(State(state): State<AppState>, auth: AuthUser, Path(syllabus_id): Path<String>) -> ApiResult {
    let found = syllabus::get_syllabus(&state.pool, &syllabus_id)
        .await
        .map_err(syllabus_error_to_api)?
        .ok_or_else(|| ApiError::not_found("syllabus not found"))?;

    let identity = identity_for(&state, &auth).await?;
    if !syllabus::can_access(&identity, &found, chrono::Utc::now()) {
        return Err(ApiError::forbidden("you do not have access to this syllabus"));
    }
    Ok(ok(found))
}

/// `GET /api/syllabi/{id}/courses` — the syllabus's courses in sequence
/// order, annotated with their position.
pub async fn get_syllabus_courses(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(syllabus_id): Path<String>,
) -> ApiResult {
    let found = syllabus::get_syllabus(&state.pool, &syllabus_id)
        .await
        .map_err(syllabus_error_to_api)?
        .ok_or_else(|| ApiError::not_found("syllabus not found"))?;

    let identity = identity_for(&state, &auth).await?;
    if !syllabus::can_access(&identity, &found, chrono::Utc::now()) {
        return Err(ApiError::forbidden("you do not have access to this syllabus"));
    }

    let mut courses = Vec::with_capacity(found.course_sequence.len());
    for item in &found.course_sequence {
        let Some(c) = course::get_course(&state.pool, &item.course_id)
            .await
            .map_err(course_error_to_api)?
        else {
            continue;
        };
        let mut value = serde_json::to_value(&c).unwrap_or_default();
        if let Some(map) = value.as_object_mut() {
            map.insert("order".into(), serde_json::json!(item.order));
            map.insert("is_optional".into(), serde_json::json!(item.is_optional));
        }
        courses.push(value);
    }
    Ok(ok(courses))
}

// =============================================================================
// ADMIN CRUD
// =============================================================================

/// `GET /api/admin/syllabi` — all syllabi including unpublished.
pub async fn admin_list(State(state): State<AppState>, _admin: AdminKey) -> ApiResult {
    let syllabi = syllabus::get_all_syllabi(&state.pool, true)
        .await
        .map_err(syllabus_error_to_api)?;
    Ok(ok(syllabi))
}

#[derive(Debug, serde::Deserialize)]
pub struct CreateSyllabusBody {
    pub name: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub cover_image_url: String,
}

/// `POST /api/admin/syllabi` — create.
pub async fn admin_create(
    State(state): State<AppState>,
    _admin: AdminKey,
    axum::Json(body): axum::Json<CreateSyllabusBody>,
) -> ApiResult {
    let name = body.name.as_deref().unwrap_or_default();
    let created = syllabus::create_syllabus(&state.pool, name, &body.description, &body.cover_image_url)
        .await
        .map_err(syllabus_error_to_api)?;
    Ok(ok(created))
}

/// `GET /api/admin/syllabi/{id}` — one syllabus.
pub async fn admin_get(State(state): State<AppState>, _admin: AdminKey, Path(syllabus_id): Path<String>) -> ApiResult {
    let found = syllabus::get_syllabus(&state.pool, &syllabus_id)
        .await
        .map_err(syllabus_error_to_api)?
        .ok_or_else(|| ApiError::not_found("syllabus not found"))?;
    Ok(ok(found))
}

/// `PUT /api/admin/syllabi/{id}` — partial update.
pub async fn admin_update(
    State(state): State<AppState>,
    _admin: AdminKey,
    Path(syllabus_id): Path<String>,
    axum::Json(update): axum::Json<SyllabusUpdate>,
) -> ApiResult {
    let updated = syllabus::update_syllabus(&state.pool, &syllabus_id, &update)
        .await
        .map_err(syllabus_error_to_api)?;
    Ok(ok(updated))
}

/// `DELETE /api/admin/syllabi/{id}` — delete.
pub async fn admin_delete(
    State(state): State<AppState>,
    _admin: AdminKey,
    Path(syllabus_id): Path<String>,
) -> ApiResult {
    syllabus::delete_syllabus(&state.pool, &syllabus_id)
        .await
        .map_err(syllabus_error_to_api)?;
    Ok(ok_message("syllabus deleted"))
}

/// `POST /api/admin/syllabi/{id}/publish`.
pub async fn admin_publish(
    State(state): State<AppState>,
    _admin: AdminKey,
    Path(syllabus_id): Path<String>,
) -> ApiResult {
    let updated = syllabus::set_published(&state.pool, &syllabus_id, true)
        .await
        .map_err(syllabus_error_to_api)?;
    Ok(ok(updated))
}

/// `POST /api/admin/syllabi/{id}/unpublish`.
pub async fn admin_unpublish(
    State(state): State<AppState>,
    _admin: AdminKey,
    Path(syllabus_id): Path<String>,
) -> ApiResult {
    let updated = syllabus::set_published(&state.pool, &syllabus_id, false)
        .await
        .map_err(syllabus_error_to_api)?;
    Ok(ok(updated))
}

// =============================================================================
// ADMIN COURSE SEQUENCE
// =============================================================================

#[derive(Debug, serde::Deserialize)]
pub struct AddCourseBody {
    pub course_id: Option<String>,
    #[serde(default)]
    pub is_optional: bool,
}

/// `POST /api/admin/syllabi/{id}/courses` — append a course.
pub async fn admin_add_course(
    State(state): State<AppState>,
    _admin: AdminKey,
    Path(syllabus_id): Path<String>,
    axum::Json(body): axum::Json<AddCourseBody>,
) -> ApiResult {
    let course_id = body
        .course_id
        .as_deref()
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("course id must not be empty"))?;
    let updated = syllabus::add_course(&state.pool, &syllabus_id, course_id, body.is_optional)
        .await
        .map_err(syllabus_error_to_api)?;
    Ok(ok(updated))
}

/// `DELETE /api/admin/syllabi/{id}/courses/{course_id}` — remove a course.
pub async fn admin_remove_course(
    State(state): State<AppState>,
    _admin: AdminKey,
    Path((syllabus_id, course_id)): Path<(String, String)>,
) -> ApiResult {
    let updated = syllabus::remove_course(&state.pool, &syllabus_id, &course_id)
        .await
        .map_err(syllabus_error_to_api)?;
    Ok(ok(updated))
}

#[derive(Debug, serde::Deserialize)]
pub struct ReorderCoursesBody {
    #[serde(default)]
    pub course_ids: Vec<String>,
}

/// `POST /api/admin/syllabi/{id}/courses/reorder` — reorder the sequence.
pub async fn admin_reorder_courses(
    State(state): State<AppState>,
    _admin: AdminKey,
    Path(syllabus_id): Path<String>,
    axum::Json(body): axum::Json<ReorderCoursesBody>,
) -> ApiResult {
    let updated = syllabus::reorder_courses(&state.pool, &syllabus_id, &body.course_ids)
        .await
        .map_err(syllabus_error_to_api)?;
    Ok(ok(updated))
}

// =============================================================================
// ADMIN INVITATION CODES
// =============================================================================

/// `POST /api/admin/syllabi/{id}/invitation-code` — create or replace.
pub async fn admin_create_invitation(
    State(state): State<AppState>,
    _admin: AdminKey,
    Path(syllabus_id): Path<String>,
    axum::Json(request): axum::Json<InvitationRequest>,
) -> ApiResult {
    let invitation = syllabus::generate_invitation(&state.pool, &syllabus_id, &request)
        .await
        .map_err(syllabus_error_to_api)?;
    Ok(ok(invitation))
}

/// `GET /api/admin/syllabi/{id}/invitation-code` — current code info.
pub async fn admin_get_invitation(
    State(state): State<AppState>,
    _admin: AdminKey,
    Path(syllabus_id): Path<String>,
) -> ApiResult {
    let info = syllabus::invitation_info(&state.pool, &syllabus_id)
        .await
        .map_err(syllabus_error_to_api)?
        .ok_or_else(|| ApiError::not_found("no invitation code configured"))?;
    Ok(ok(info))
}

/// `DELETE /api/admin/syllabi/{id}/invitation-code` — remove the code.
pub async fn admin_delete_invitation(
    State(state): State<AppState>,
    _admin: AdminKey,
    Path(syllabus_id): Path<String>,
) -> ApiResult {
    syllabus::delete_invitation(&state.pool, &syllabus_id)
        .await
        .map_err(syllabus_error_to_api)?;
    Ok(ok_message("invitation code removed"))
}

#[cfg(test)]
#[path = "syllabi_test.rs"]
mod tests;
