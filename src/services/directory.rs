//! Employee directory client — credential checks and staff lookups.
//!
//! ARCHITECTURE
//! ============
//! Employee identity lives in an external HR directory service. The client
//! is a trait object so handlers and tests can swap in mocks; when the
//! directory env vars are absent the whole feature is disabled and guest
//! login remains the only path.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub const DEFAULT_DIRECTORY_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("invalid username or password")]
    InvalidCredentials,
    #[error("directory request failed: {0}")]
    Request(String),
    #[error("unexpected directory response: {0}")]
    UnexpectedResponse(String),
}

/// Directory configuration loaded from environment.
#[derive(Debug, Clone)]
pub struct DirectoryConfig {
    pub base_url: String,
    pub api_key: String,
    pub timeout_secs: u64,
}

impl DirectoryConfig {
    /// Load from `DIRECTORY_API_URL` and `DIRECTORY_API_KEY`.
    /// Returns `None` if either is missing (employee features disabled).
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let base_url = std::env::var("DIRECTORY_API_URL").ok()?;
        let api_key = std::env::var("DIRECTORY_API_KEY").ok()?;
        let timeout_secs = std::env::var("DIRECTORY_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_DIRECTORY_TIMEOUT_SECS);
        Some(Self { base_url: base_url.trim_end_matches('/').to_string(), api_key, timeout_secs })
    }
}

/// Verified employee identity returned by the directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmployeeRecord {
    pub employee_id: String,
    pub username: String,
    pub real_name: String,
    pub company: String,
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// Basic user row used by admin user search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryUser {
    pub user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub legacy_user_id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub phone: String,
}

#[async_trait]
pub trait DirectoryApi: Send + Sync {
    /// Verify employee credentials, returning the employee profile.
    async fn verify_employee(&self, username: &str, password: &str) -> Result<EmployeeRecord, DirectoryError>;

    /// List employees, optionally filtered by a search term.
    async fn list_employees(
        &self,
        search: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<DirectoryUser>, DirectoryError>;
}

// =============================================================================
// HTTP CLIENT
// =============================================================================

pub struct HttpDirectory {
    config: DirectoryConfig,
    client: reqwest::Client,
}

impl HttpDirectory {
    /// Build the HTTP client from config.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying client cannot be constructed.
    pub fn new(config: DirectoryConfig) -> Result<Self, DirectoryError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| DirectoryError::Request(e.to_string()))?;
        Ok(Self { config, client })
    }
}

#[derive(Debug, Deserialize)]
struct VerifyResponse {
    success: bool,
    data: Option<VerifyData>,
}

#[derive(Debug, Deserialize)]
struct VerifyData {
    user: VerifyUser,
}

#[derive(Debug, Deserialize)]
struct VerifyUser {
    id: serde_json::Value,
    username: String,
    real_name: Option<String>,
    company_name: Option<String>,
    email: Option<String>,
    phone: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ListResponse {
    success: bool,
    message: Option<String>,
    #[serde(default)]
    data: Vec<ListEmployee>,
}

#[derive(Debug, Deserialize)]
struct ListEmployee {
    user_id: serde_json::Value,
    name: String,
    #[serde(default)]
    company: String,
    #[serde(default)]
    phone: String,
}

fn id_to_string(id: &serde_json::Value) -> String {
    match id {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[async_trait]
impl DirectoryApi for HttpDirectory {
    async fn verify_employee(&self, username: &str, password: &str) -> Result<EmployeeRecord, DirectoryError> {
        let url = format!("{}/api/v1/auth/login", self.config.base_url);
        let resp = self
            .client
            .post(&url)
            .json(&serde_json::json!({ "username": username, "password": password }))
            .send()
            .await
            .map_err(|e| DirectoryError::Request(e.to_string()))?;

        let body: VerifyResponse = resp
            .json()
            .await
            .map_err(|e| DirectoryError::UnexpectedResponse(e.to_string()))?;

        if !body.success {
            // The directory reports bad credentials through the envelope
            // rather than the status code.
            return Err(DirectoryError::InvalidCredentials);
        }

        let user = body
            .data
            .map(|d| d.user)
            .ok_or_else(|| DirectoryError::UnexpectedResponse("missing user payload".into()))?;

        Ok(EmployeeRecord {
            employee_id: id_to_string(&user.id),
            real_name: user.real_name.unwrap_or_else(|| user.username.clone()),
            username: user.username,
            company: user.company_name.unwrap_or_default(),
            email: user.email,
            phone: user.phone,
        })
    }

    async fn list_employees(
        &self,
        search: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<DirectoryUser>, DirectoryError> {
        let url = format!("{}/api/external/employees", self.config.base_url);
        let mut req = self
            .client
            .get(&url)
            .header("X-External-API-Key", &self.config.api_key)
            .query(&[("limit", limit), ("offset", offset)]);
        if let Some(term) = search {
            req = req.query(&[("search", term)]);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| DirectoryError::Request(e.to_string()))?;
        if !resp.status().is_success() {
            let status = resp.status();
            return Err(DirectoryError::Request(format!("directory returned {status}")));
        }

        let body: ListResponse = resp
            .json()
            .await
            .map_err(|e| DirectoryError::UnexpectedResponse(e.to_string()))?;
        if !body.success {
            return Err(DirectoryError::Request(body.message.unwrap_or_else(|| "directory error".into())));
        }

        Ok(body.data.into_iter().map(employee_to_user).collect())
    }
}

/// Map a raw directory row to the admin-facing shape. Directory ids get the
/// `emp_` prefix so they match employee login user ids; the raw id is kept
/// as `legacy_user_id`.
fn employee_to_user(emp: ListEmployee) -> DirectoryUser {
    let raw_id = id_to_string(&emp.user_id);
    DirectoryUser {
        user_id: format!("emp_{raw_id}"),
        legacy_user_id: Some(raw_id),
        name: emp.name,
        company: emp.company,
        phone: emp.phone,
    }
}

#[cfg(test)]
#[path = "directory_test.rs"]
mod tests;
