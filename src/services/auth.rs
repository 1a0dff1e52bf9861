//! Login flows — guest find-or-create and employee directory verification.
//!
//! DESIGN
//! ======
//! Guests identify themselves with name/company/phone; the phone is the
//! stable key, so repeat logins reuse the existing user record. Employees
//! are verified against the external directory and get an `emp_`-prefixed
//! user id; their profile is mirrored into the local users table so names
//! resolve without further directory calls.

use sqlx::PgPool;

use crate::services::directory::{DirectoryApi, DirectoryError, EmployeeRecord};
use crate::services::progress::{self, Progress};
use crate::services::session::{self, UserType};
use crate::services::user;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("{0}")]
    Validation(String),
    #[error("invalid username or password")]
    InvalidCredentials,
    #[error("employee login is not available")]
    DirectoryNotConfigured,
    #[error("directory service unavailable: {0}")]
    DirectoryUnavailable(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<progress::ProgressError> for AuthError {
    fn from(err: progress::ProgressError) -> Self {
        match err {
            progress::ProgressError::Database(e) => Self::Database(e),
        }
    }
}

impl From<user::UserError> for AuthError {
    fn from(err: user::UserError) -> Self {
        match err {
            user::UserError::Database(e) => Self::Database(e),
        }
    }
}

/// Successful login payload, common to both login modes.
#[derive(Debug, serde::Serialize)]
pub struct LoginOutcome {
    pub user_id: String,
    pub name: String,
    pub company: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub user_type: UserType,
    pub token: String,
    pub remember_me: bool,
    pub progress: Progress,
    pub accessible_syllabi: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub employee_info: Option<EmployeeInfo>,
}

#[derive(Debug, serde::Serialize)]
pub struct EmployeeInfo {
    pub employee_id: String,
    pub username: String,
    pub email: Option<String>,
    pub phone: Option<String>,
}

// =============================================================================
// VALIDATORS
// =============================================================================

const MAX_NAME_LEN: usize = 50;
const MAX_COMPANY_LEN: usize = 100;
const MIN_PHONE_LEN: usize = 6;
const MAX_PHONE_LEN: usize = 20;

pub(crate) fn validate_name(name: &str) -> bool {
    let trimmed = name.trim();
    !trimmed.is_empty() && trimmed.chars().count() <= MAX_NAME_LEN
}

pub(crate) fn validate_company(company: &str) -> bool {
    let trimmed = company.trim();
    !trimmed.is_empty() && trimmed.chars().count() <= MAX_COMPANY_LEN
}

pub(crate) fn validate_phone(phone: &str) -> bool {
    let trimmed = phone.trim();
    let len = trimmed.chars().count();
    if !(MIN_PHONE_LEN..=MAX_PHONE_LEN).contains(&len) {
        return false;
    }
    trimmed
        .chars()
        .all(|c| c.is_ascii_digit() || c == '+' || c == '-' || c == ' ')
}

// =============================================================================
// GUEST LOGIN
// =============================================================================

/// Guest login: find the user by phone or create one, then open a session.
/// `accessible_syllabi` carries syllabus ids granted by a validated
/// invitation code.
pub async fn guest_login(
    pool: &PgPool,
    name: &str,
    company: &str,
    phone: &str,
    remember_me: bool,
    accessible_syllabi: Vec<String>,
    session_ttl_secs: u64,
) -> Result<LoginOutcome, AuthError> {
    if !validate_name(name) {
        return Err(AuthError::Validation("invalid name".into()));
    }
    if !validate_company(company) {
        return Err(AuthError::Validation("invalid company name".into()));
    }
    if !validate_phone(phone) {
        return Err(AuthError::Validation("invalid phone number".into()));
    }

    let name = name.trim();
    let company = company.trim();
    let phone = phone.trim();

    let user = match user::find_user_by_phone(pool, phone).await? {
        Some(existing) => existing,
        None => user::create_user(pool, name, company, phone).await?,
    };

    let token =
        session::create_session(pool, &user.user_id, UserType::Guest, &accessible_syllabi, session_ttl_secs).await?;
    let progress = progress::get_or_default(pool, &user.user_id).await?;

    tracing::info!(user_id = %user.user_id, grants = accessible_syllabi.len(), "guest login");

    Ok(LoginOutcome {
        user_id: user.user_id,
        name: user.name,
        company: user.company,
        phone: Some(user.phone),
        user_type: UserType::Guest,
        token,
        remember_me,
        progress,
        accessible_syllabi,
        employee_info: None,
    })
}

// =============================================================================
// EMPLOYEE LOGIN
// =============================================================================

/// Employee login via the external directory service.
pub async fn employee_login(
    pool: &PgPool,
    directory: Option<&dyn DirectoryApi>,
    username: &str,
    password: &str,
    remember_me: bool,
    session_ttl_secs: u64,
) -> Result<LoginOutcome, AuthError> {
    let username = username.trim();
    if username.is_empty() {
        return Err(AuthError::Validation("username must not be empty".into()));
    }
    if password.is_empty() {
        return Err(AuthError::Validation("password must not be empty".into()));
    }

    let Some(directory) = directory else {
        return Err(AuthError::DirectoryNotConfigured);
    };

    let employee = match directory.verify_employee(username, password).await {
        Ok(record) => record,
        Err(DirectoryError::InvalidCredentials) => return Err(AuthError::InvalidCredentials),
        Err(e) => return Err(AuthError::DirectoryUnavailable(e.to_string())),
    };

    let user_id = employee_user_id(&employee);
    user::upsert_employee_user(
        pool,
        &user_id,
        &employee.real_name,
        &employee.company,
        employee.phone.as_deref().unwrap_or(""),
    )
    .await?;

    let token = session::create_session(pool, &user_id, UserType::Employee, &[], session_ttl_secs).await?;
    let progress = progress::get_or_default(pool, &user_id).await?;

    tracing::info!(user_id = %user_id, "employee login");

    Ok(LoginOutcome {
        user_id,
        name: employee.real_name.clone(),
        company: employee.company.clone(),
        phone: None,
        user_type: UserType::Employee,
        token,
        remember_me,
        progress,
        accessible_syllabi: Vec::new(),
        employee_info: Some(EmployeeInfo {
            employee_id: employee.employee_id,
            username: employee.username,
            email: employee.email,
            phone: employee.phone,
        }),
    })
}

fn employee_user_id(employee: &EmployeeRecord) -> String {
    format!("emp_{}", employee.employee_id)
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;
