//! Certificate routes — admin issuance and learner-facing queries.

use axum::extract::{Path, State};

use crate::response::{ApiError, ApiResult, ok};
use crate::routes::auth::{AdminKey, AuthUser};
use crate::services::certificate::{self, CertificateError};
use crate::state::AppState;

pub(crate) fn certificate_error_to_api(err: CertificateError) -> ApiError {
    match err {
        CertificateError::SyllabusNotFound(id) => ApiError::not_found(format!("syllabus not found: {id}")),
        CertificateError::Validation(msg) => ApiError::bad_request(msg),
        CertificateError::Database(e) => {
            tracing::error!(error = %e, "certificate query failed");
            ApiError::internal("internal error")
        }
    }
}

/// `POST /api/admin/certificates/issue/{syllabus_id}` — recompute and
/// reissue the syllabus's certificates.
pub async fn admin_issue(
    State(state): State<AppState>,
    _admin: AdminKey,
    Path(syllabus_id): Path<String>,
) -> ApiResult {
    let report = certificate::issue_certificates(&state.pool, &syllabus_id, "admin")
        .await
        .map_err(certificate_error_to_api)?;
    Ok(ok(report))
}

/// `GET /api/admin/certificates/syllabus/{syllabus_id}` — issued
/// certificates for a syllabus.
pub async fn admin_list_for_syllabus(
    State(state): State<AppState>,
    _admin: AdminKey,
    Path(syllabus_id): Path<String>,
) -> ApiResult {
    let certificates = certificate::certificates_for_syllabus(&state.pool, &syllabus_id)
        .await
        .map_err(certificate_error_to_api)?;
    Ok(ok(certificates))
}

/// `GET /api/certificates` — the caller's certificates.
pub async fn list_mine(State(state): State<AppState>, auth: AuthUser) -> ApiResult {
    let certificates = certificate::certificates_for_user(&state.pool, &auth.session.user_id)
        .await
        .map_err(certificate_error_to_api)?;
    Ok(ok(certificates))
}

/// `GET /api/certificates/{certificate_id}` — one certificate; only the
/// owner may read it.
pub async fn get_mine(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(certificate_id): Path<String>,
) -> ApiResult {
    let found = certificate::get_certificate(&state.pool, &certificate_id)
        .await
        .map_err(certificate_error_to_api)?
        .ok_or_else(|| ApiError::not_found("certificate not found"))?;
    if found.user_id != auth.session.user_id {
        return Err(ApiError::forbidden("certificate belongs to another user"));
    }
    Ok(ok(found))
}
