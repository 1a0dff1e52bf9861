//! Session management for learner bearer tokens.
//!
//! ARCHITECTURE
//! ============
//! Learner auth uses opaque random tokens stored server-side with an
//! expiry. The session row also carries the login's user type and any
//! syllabus ids granted through an invitation code, so access checks can
//! read the grants without re-validating the code.

use std::fmt::Write;

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use sqlx::{PgPool, Row};

pub(crate) fn bytes_to_hex(bytes: &[u8]) -> String {
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(s, "{b:02x}");
    }
    s
}

/// Generate a cryptographically random 32-byte hex token.
#[must_use]
pub fn generate_token() -> String {
    let bytes: [u8; 32] = rand::rng().random();
    bytes_to_hex(&bytes)
}

/// User type recorded at login.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserType {
    Guest,
    Employee,
}

impl UserType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Guest => "guest",
            Self::Employee => "employee",
        }
    }

    #[must_use]
    pub fn from_str(raw: &str) -> Self {
        match raw {
            "employee" => Self::Employee,
            _ => Self::Guest,
        }
    }
}

/// Session payload returned from token validation.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SessionUser {
    pub user_id: String,
    pub user_type: UserType,
    /// Syllabus ids granted through an invitation code at login.
    pub accessible_syllabi: Vec<String>,
}

/// Create a session for the given user, returning the token.
pub async fn create_session(
    pool: &PgPool,
    user_id: &str,
    user_type: UserType,
    accessible_syllabi: &[String],
    ttl_secs: u64,
) -> Result<String, sqlx::Error> {
    let token = generate_token();
    let ttl = i64::try_from(ttl_secs).unwrap_or(i64::from(i32::MAX));
    let expires_at: DateTime<Utc> = Utc::now() + Duration::seconds(ttl);
    sqlx::query(
        "INSERT INTO sessions (token, user_id, user_type, accessible_syllabi, expires_at)
         VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(&token)
    .bind(user_id)
    .bind(user_type.as_str())
    .bind(serde_json::json!(accessible_syllabi))
    .bind(expires_at)
    .execute(pool)
    .await?;
    Ok(token)
}

/// Validate a bearer token and return the associated session.
pub async fn validate_session(pool: &PgPool, token: &str) -> Result<Option<SessionUser>, sqlx::Error> {
    let row = sqlx::query(
        "SELECT user_id, user_type, accessible_syllabi
         FROM sessions
         WHERE token = $1 AND expires_at > now()",
    )
    .bind(token)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|r| SessionUser {
        user_id: r.get("user_id"),
        user_type: UserType::from_str(&r.get::<String, _>("user_type")),
        accessible_syllabi: parse_syllabi(&r.get::<serde_json::Value, _>("accessible_syllabi")),
    }))
}

/// Delete a session by token.
pub async fn delete_session(pool: &PgPool, token: &str) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM sessions WHERE token = $1")
        .bind(token)
        .execute(pool)
        .await?;
    Ok(())
}

/// Remove expired sessions. Returns the number of rows purged.
pub async fn purge_expired_sessions(pool: &PgPool) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= now()")
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

fn parse_syllabi(value: &serde_json::Value) -> Vec<String> {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str().map(String::from))
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
