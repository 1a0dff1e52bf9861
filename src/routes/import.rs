//! Quiz import routes — workbook upload, confirmation, and the template.

use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::response::{IntoResponse, Response};

use crate::response::{ApiError, ApiResult, ok};
use crate::routes::auth::AdminKey;
use crate::routes::surveys::survey_error_to_api;
use crate::services::quiz_import::{self, ImportError};
use crate::services::survey::{self, QuestionInput};
use crate::state::AppState;

const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
const TEMPLATE_FILENAME: &str = "quiz_template.xlsx";

fn import_error_to_api(err: ImportError) -> ApiError {
    match err {
        ImportError::Archive(msg) => ApiError::bad_request(format!("could not read workbook: {msg}")),
        ImportError::NoWorksheet => ApiError::bad_request("workbook has no worksheet"),
    }
}

/// `POST /api/admin/import-quiz` — parse an uploaded workbook. Row-level
/// failures return 400 with the collected errors and summary.
pub async fn import_quiz(
    State(_state): State<AppState>,
    _admin: AdminKey,
    mut multipart: Multipart,
) -> Result<Response, ApiError> {
    let mut excel_bytes: Option<Vec<u8>> = None;
    let mut filename = String::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("invalid multipart body: {e}")))?
    {
        if field.name() == Some("excel") {
            filename = field.file_name().unwrap_or_default().to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ApiError::bad_request(format!("upload read failed: {e}")))?;
            excel_bytes = Some(bytes.to_vec());
        }
    }

    let bytes = excel_bytes.ok_or_else(|| ApiError::bad_request("an Excel file is required"))?;
    let lower = filename.to_lowercase();
    if !lower.ends_with(".xlsx") && !lower.ends_with(".xls") {
        return Err(ApiError::bad_request("file must be an Excel workbook (.xlsx)"));
    }

    let report = quiz_import::parse_workbook(&bytes).map_err(import_error_to_api)?;
    tracing::info!(
        questions = report.questions.len(),
        errors = report.errors.len(),
        "quiz workbook parsed"
    );

    if !report.is_clean() {
        let body = axum::Json(serde_json::json!({
            "success": false,
            "message": "workbook contains invalid rows",
            "errors": report.errors,
            "summary": report.summary,
        }));
        return Ok((StatusCode::BAD_REQUEST, body).into_response());
    }

    let body = axum::Json(serde_json::json!({
        "success": true,
        "data": { "questions": report.questions, "summary": report.summary },
    }));
    Ok(body.into_response())
}

#[derive(Debug, serde::Deserialize)]
pub struct ConfirmImportBody {
    pub survey_id: Option<String>,
    #[serde(default)]
    pub questions: Vec<QuestionInput>,
}

/// `POST /api/admin/import-quiz/confirm` — persist parsed questions.
pub async fn confirm_import(
    State(state): State<AppState>,
    _admin: AdminKey,
    axum::Json(body): axum::Json<ConfirmImportBody>,
) -> ApiResult {
    let survey_id = body
        .survey_id
        .as_deref()
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("survey id must not be empty"))?;
    if body.questions.is_empty() {
        return Err(ApiError::bad_request("question list must not be empty"));
    }

    let added = survey::add_questions(&state.pool, survey_id, &body.questions)
        .await
        .map_err(survey_error_to_api)?;
    Ok(ok(serde_json::json!({ "added_count": added, "survey_id": survey_id })))
}

/// `GET /api/admin/quiz-template` — download the import template.
pub async fn quiz_template(State(_state): State<AppState>, _admin: AdminKey) -> Result<Response, ApiError> {
    let bytes = quiz_import::generate_template().map_err(|e| {
        tracing::error!(error = %e, "template generation failed");
        ApiError::internal("template generation failed")
    })?;
    Ok((
        StatusCode::OK,
        [
            (CONTENT_TYPE, XLSX_MIME.to_string()),
            (CONTENT_DISPOSITION, format!("attachment; filename=\"{TEMPLATE_FILENAME}\"")),
        ],
        bytes,
    )
        .into_response())
}
