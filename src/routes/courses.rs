//! Course routes — admin CRUD with PDF upload, learner catalog + material.

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::response::{IntoResponse, Response};

use crate::response::{ApiError, ApiResult, ok, ok_message};
use crate::routes::auth::AdminKey;
use crate::services::course::{self, CourseError, CourseUpdate, NewCourse};
use crate::state::AppState;

pub(crate) fn course_error_to_api(err: CourseError) -> ApiError {
    match err {
        CourseError::NotFound(id) => ApiError::not_found(format!("course not found: {id}")),
        CourseError::Validation(msg) => ApiError::bad_request(msg),
        CourseError::Io(e) => {
            tracing::error!(error = %e, "course storage failed");
            ApiError::internal("course storage failed")
        }
        CourseError::Database(e) => {
            tracing::error!(error = %e, "course query failed");
            ApiError::internal("internal error")
        }
    }
}

// =============================================================================
// ADMIN
// =============================================================================

/// `GET /api/admin/courses` — all courses.
pub async fn admin_list_courses(State(state): State<AppState>, _admin: AdminKey) -> ApiResult {
    let courses = course::get_all_courses(&state.pool)
        .await
        .map_err(course_error_to_api)?;
    Ok(ok(courses))
}

/// Multipart form parsed into course fields + the uploaded PDF.
pub(crate) struct CourseUpload {
    pub input: NewCourse,
    pub pdf_bytes: Vec<u8>,
}

pub(crate) async fn read_course_upload(mut multipart: Multipart) -> Result<CourseUpload, ApiError> {
    let mut input = NewCourse { pass_score: 60, ..NewCourse::default() };
    let mut pdf_bytes = Vec::new();
    let mut pdf_filename = String::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("invalid multipart body: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "pdf" => {
                pdf_filename = field.file_name().unwrap_or_default().to_string();
                pdf_bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("upload read failed: {e}")))?
                    .to_vec();
            }
            "title" => input.title = read_text(field).await?,
            "description" => input.description = read_text(field).await?,
            "quiz_survey_id" => {
                let value = read_text(field).await?;
                input.quiz_survey_id = (!value.trim().is_empty()).then(|| value.trim().to_string());
            }
            "pass_score" => {
                let value = read_text(field).await?;
                input.pass_score = value.trim().parse().unwrap_or(60);
            }
            "icon" => {
                let value = read_text(field).await?;
                input.icon = (!value.trim().is_empty()).then(|| value.trim().to_string());
            }
            "tags" => {
                let value = read_text(field).await?;
                if !value.trim().is_empty() {
                    input.tags = serde_json::from_str(&value)
                        .map_err(|_| ApiError::bad_request("tags must be a JSON array of strings"))?;
                }
            }
            _ => {}
        }
    }

    if pdf_bytes.is_empty() {
        return Err(ApiError::bad_request("a PDF file is required"));
    }
    if !pdf_filename.to_lowercase().ends_with(".pdf") {
        return Err(ApiError::bad_request("file must be a PDF"));
    }

    Ok(CourseUpload { input, pdf_bytes })
}

async fn read_text(field: axum::extract::multipart::Field<'_>) -> Result<String, ApiError> {
    field
        .text()
        .await
        .map_err(|e| ApiError::bad_request(format!("invalid form field: {e}")))
}

/// `POST /api/admin/courses` — create a course from an uploaded PDF.
pub async fn admin_create_course(
    State(state): State<AppState>,
    _admin: AdminKey,
    multipart: Multipart,
) -> Result<(StatusCode, axum::Json<serde_json::Value>), ApiError> {
    let upload = read_course_upload(multipart).await?;
    let created = course::create_course(&state.pool, &state.config.courses_dir, &upload.input, &upload.pdf_bytes)
        .await
        .map_err(course_error_to_api)?;
    let axum::Json(body) = ok(created);
    Ok((StatusCode::CREATED, axum::Json(body)))
}

/// `GET /api/admin/courses/{id}` — one course.
pub async fn admin_get_course(
    State(state): State<AppState>,
    _admin: AdminKey,
    Path(course_id): Path<String>,
) -> ApiResult {
    let found = course::get_course(&state.pool, &course_id)
        .await
        .map_err(course_error_to_api)?
        .ok_or_else(|| ApiError::not_found("course not found"))?;
    Ok(ok(found))
}

/// `PUT /api/admin/courses/{id}` — partial update.
pub async fn admin_update_course(
    State(state): State<AppState>,
    _admin: AdminKey,
    Path(course_id): Path<String>,
    axum::Json(update): axum::Json<CourseUpdate>,
) -> ApiResult {
    let updated = course::update_course(&state.pool, &course_id, &update)
        .await
        .map_err(course_error_to_api)?;
    Ok(ok(updated))
}

/// `DELETE /api/admin/courses/{id}` — delete course + material.
pub async fn admin_delete_course(
    State(state): State<AppState>,
    _admin: AdminKey,
    Path(course_id): Path<String>,
) -> ApiResult {
    course::delete_course(&state.pool, &state.config.courses_dir, &course_id)
        .await
        .map_err(course_error_to_api)?;
    Ok(ok_message("course deleted"))
}

#[derive(Debug, serde::Deserialize)]
pub struct ReorderBody {
    #[serde(default)]
    pub course_ids: Vec<String>,
}

/// `POST /api/admin/courses/reorder` — rewrite display order.
pub async fn admin_reorder_courses(
    State(state): State<AppState>,
    _admin: AdminKey,
    axum::Json(body): axum::Json<ReorderBody>,
) -> ApiResult {
    course::reorder_courses(&state.pool, &body.course_ids)
        .await
        .map_err(course_error_to_api)?;
    Ok(ok_message("courses reordered"))
}

#[derive(Debug, serde::Deserialize)]
pub struct LinkQuizBody {
    pub survey_id: Option<String>,
    #[serde(default = "default_pass_score")]
    pub pass_score: i32,
}

fn default_pass_score() -> i32 {
    60
}

/// `POST /api/admin/courses/{id}/link-quiz` — attach a quiz.
pub async fn admin_link_quiz(
    State(state): State<AppState>,
    _admin: AdminKey,
    Path(course_id): Path<String>,
    axum::Json(body): axum::Json<LinkQuizBody>,
) -> ApiResult {
    let survey_id = body
        .survey_id
        .as_deref()
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("survey id must not be empty"))?;
    let updated = course::link_quiz(&state.pool, &course_id, survey_id, body.pass_score)
        .await
        .map_err(course_error_to_api)?;
    Ok(ok(updated))
}

// =============================================================================
// LEARNER
// =============================================================================

/// `GET /api/courses` — published courses.
pub async fn list_courses(State(state): State<AppState>) -> ApiResult {
    let courses = course::get_published_courses(&state.pool)
        .await
        .map_err(course_error_to_api)?;
    Ok(ok(courses))
}

/// `GET /api/courses/{id}` — one course.
pub async fn get_course(State(state): State<AppState>, Path(course_id): Path<String>) -> ApiResult {
    let found = course::get_course(&state.pool, &course_id)
        .await
        .map_err(course_error_to_api)?
        .ok_or_else(|| ApiError::not_found("course not found"))?;
    Ok(ok(found))
}

/// `GET /api/courses/{id}/content.pdf` — stream the stored material.
pub async fn serve_course_pdf(State(state): State<AppState>, Path(course_id): Path<String>) -> Response {
    let exists = match course::get_course(&state.pool, &course_id).await {
        Ok(found) => found.is_some(),
        Err(e) => {
            return course_error_to_api(e).into_response();
        }
    };
    if !exists {
        return ApiError::not_found("course not found").into_response();
    }

    let path = course::pdf_path(&state.config.courses_dir, &course_id);
    match tokio::fs::read(&path).await {
        Ok(bytes) => (
            StatusCode::OK,
            [
                (CONTENT_TYPE, "application/pdf".to_string()),
                (CONTENT_DISPOSITION, format!("inline; filename=\"{course_id}.pdf\"")),
            ],
            bytes,
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, %course_id, "course material missing on disk");
            ApiError::not_found("course material not found").into_response()
        }
    }
}

#[cfg(test)]
#[path = "courses_test.rs"]
mod tests;
