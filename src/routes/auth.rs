//! Auth routes — unified login, invitation validation, session management.

use axum::extract::{FromRef, State};
use axum::http::StatusCode;
use axum::http::header::AUTHORIZATION;

use crate::response::{ApiError, ApiResult, ok, ok_message};
use crate::services::auth::{self, AuthError};
use crate::services::session::{self, SessionUser, UserType};
use crate::services::syllabus::{self, SyllabusError};
use crate::services::user;
use crate::state::AppState;

const API_KEY_HEADER: &str = "x-api-key";

// =============================================================================
// EXTRACTORS
// =============================================================================

/// Authenticated learner extracted from the bearer token.
/// Use as a handler parameter to require authentication.
pub struct AuthUser {
    pub session: SessionUser,
    pub token: String,
}

impl<S> axum::extract::FromRequestParts<S> for AuthUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut axum::http::request::Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .unwrap_or_default()
            .trim()
            .to_owned();
        if token.is_empty() {
            return Err(ApiError::unauthorized("authorization required"));
        }

        let app_state = AppState::from_ref(state);
        let session = session::validate_session(&app_state.pool, &token)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "session validation failed");
                ApiError::internal("session validation failed")
            })?
            .ok_or_else(|| ApiError::unauthorized("invalid or expired token"))?;

        Ok(Self { session, token })
    }
}

/// Optional variant: handlers that adapt to anonymous callers take
/// `Option<AuthUser>`. A missing header yields `None`; a token that is
/// present but invalid is still rejected.
impl<S> axum::extract::OptionalFromRequestParts<S> for AuthUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        let has_header = parts.headers.contains_key(AUTHORIZATION);
        if !has_header {
            return Ok(None);
        }
        <Self as axum::extract::FromRequestParts<S>>::from_request_parts(parts, state)
            .await
            .map(Some)
    }
}

/// Admin credential extracted from the `X-API-Key` header.
pub struct AdminKey;

impl<S> axum::extract::FromRequestParts<S> for AdminKey
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut axum::http::request::Parts, state: &S) -> Result<Self, Self::Rejection> {
        let supplied = parts
            .headers
            .get(API_KEY_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();

        let app_state = AppState::from_ref(state);
        if supplied.is_empty() || supplied != app_state.config.admin_api_key {
            return Err(ApiError::unauthorized("invalid or missing API key"));
        }
        Ok(Self)
    }
}

// =============================================================================
// ERROR MAPPING
// =============================================================================

pub(crate) fn auth_error_to_api(err: AuthError) -> ApiError {
    match err {
        AuthError::Validation(msg) => ApiError::bad_request(msg),
        AuthError::InvalidCredentials => ApiError::unauthorized("invalid username or password"),
        AuthError::DirectoryNotConfigured => {
            ApiError::new(StatusCode::SERVICE_UNAVAILABLE, "employee login is not available")
        }
        AuthError::DirectoryUnavailable(msg) => {
            tracing::error!(error = %msg, "directory service failure");
            ApiError::bad_gateway("directory service unavailable")
        }
        AuthError::Database(e) => {
            tracing::error!(error = %e, "login failed on database");
            ApiError::internal("login failed")
        }
    }
}

pub(crate) fn syllabus_error_to_api(err: SyllabusError) -> ApiError {
    match err {
        SyllabusError::NotFound(id) => ApiError::not_found(format!("syllabus not found: {id}")),
        SyllabusError::Validation(msg) => ApiError::bad_request(msg),
        SyllabusError::Database(e) => {
            tracing::error!(error = %e, "syllabus query failed");
            ApiError::internal("internal error")
        }
    }
}

// =============================================================================
// HANDLERS
// =============================================================================

#[derive(Debug, serde::Deserialize)]
pub struct LoginBody {
    #[serde(default = "default_login_type")]
    pub login_type: String,
    // Guest fields.
    pub name: Option<String>,
    pub company: Option<String>,
    pub phone: Option<String>,
    pub invitation_code: Option<String>,
    // Employee fields.
    pub username: Option<String>,
    pub password: Option<String>,
    #[serde(default)]
    pub remember_me: bool,
}

fn default_login_type() -> String {
    "guest".to_string()
}

/// `POST /api/auth/login` — guest or employee login.
pub async fn login(State(state): State<AppState>, axum::Json(body): axum::Json<LoginBody>) -> ApiResult {
    let identifier = match body.login_type.as_str() {
        "employee" => body.username.clone().unwrap_or_default(),
        _ => body.phone.clone().unwrap_or_default(),
    };
    if let Err(e) = state.login_limiter.check_and_record(&identifier) {
        return Err(ApiError::new(StatusCode::TOO_MANY_REQUESTS, e.to_string()));
    }

    if body.login_type == "employee" {
        let username = body.username.as_deref().unwrap_or_default();
        let password = body.password.as_deref().unwrap_or_default();
        let outcome = auth::employee_login(
            &state.pool,
            state.directory.as_deref(),
            username,
            password,
            body.remember_me,
            state.config.session_ttl_secs,
        )
        .await
        .map_err(auth_error_to_api)?;
        return Ok(ok(outcome));
    }

    let name = body.name.as_deref().unwrap_or_default();
    let company = body.company.as_deref().unwrap_or_default();
    let phone = body.phone.as_deref().unwrap_or_default();

    let mut missing = Vec::new();
    if name.trim().is_empty() {
        missing.push("name");
    }
    if company.trim().is_empty() {
        missing.push("company");
    }
    if phone.trim().is_empty() {
        missing.push("phone");
    }
    if !missing.is_empty() {
        return Err(ApiError::bad_request(format!("missing required fields: {}", missing.join(", "))));
    }

    // Redeem an optional invitation code before opening the session.
    let mut accessible_syllabi = Vec::new();
    if let Some(code) = body.invitation_code.as_deref() {
        if !code.trim().is_empty() {
            let matched = syllabus::validate_invitation_code(&state.pool, code)
                .await
                .map_err(syllabus_error_to_api)?;
            syllabus::increment_invitation_usage(&state.pool, &matched.syllabus_id)
                .await
                .map_err(syllabus_error_to_api)?;
            accessible_syllabi.push(matched.syllabus_id);
        }
    }

    let outcome = auth::guest_login(
        &state.pool,
        name,
        company,
        phone,
        body.remember_me,
        accessible_syllabi,
        state.config.session_ttl_secs,
    )
    .await
    .map_err(auth_error_to_api)?;
    Ok(ok(outcome))
}

#[derive(Debug, serde::Deserialize)]
pub struct ValidateCodeBody {
    pub code: Option<String>,
}

/// `POST /api/auth/validate-invitation-code` — public code check.
pub async fn validate_invitation_code(
    State(state): State<AppState>,
    axum::Json(body): axum::Json<ValidateCodeBody>,
) -> ApiResult {
    let code = body.code.as_deref().unwrap_or_default();
    let matched = syllabus::validate_invitation_code(&state.pool, code)
        .await
        .map_err(syllabus_error_to_api)?;
    Ok(ok(matched))
}

/// `GET /api/auth/me` — current session's user.
pub async fn me(State(state): State<AppState>, auth: AuthUser) -> ApiResult {
    let record = user::get_user(&state.pool, &auth.session.user_id)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "user lookup failed");
            ApiError::internal("internal error")
        })?;

    Ok(ok(serde_json::json!({
        "user_id": auth.session.user_id,
        "user_type": auth.session.user_type,
        "accessible_syllabi": auth.session.accessible_syllabi,
        "name": record.as_ref().map(|u| u.name.clone()),
        "company": record.as_ref().map(|u| u.company.clone()),
        "phone": record.as_ref().filter(|_| auth.session.user_type == UserType::Guest).map(|u| u.phone.clone()),
    })))
}

/// `POST /api/auth/logout` — delete the session.
pub async fn logout(State(state): State<AppState>, auth: AuthUser) -> ApiResult {
    if let Err(e) = session::delete_session(&state.pool, &auth.token).await {
        tracing::warn!(error = %e, "session delete failed");
    }
    Ok(ok_message("logged out"))
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;
