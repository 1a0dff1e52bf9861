//! User records — guest find-or-create, employee upsert, admin search.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum UserError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, serde::Serialize, sqlx::FromRow)]
pub struct User {
    pub user_id: String,
    pub name: String,
    pub company: String,
    pub phone: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn guest_user_id() -> String {
    let hex = Uuid::new_v4().simple().to_string();
    format!("guest_{}", &hex[..8])
}

/// Create a guest user record.
pub async fn create_user(pool: &PgPool, name: &str, company: &str, phone: &str) -> Result<User, UserError> {
    let user_id = guest_user_id();
    let user = sqlx::query_as::<_, User>(
        "INSERT INTO users (user_id, name, company, phone)
         VALUES ($1, $2, $3, $4)
         RETURNING user_id, name, company, phone, created_at, updated_at",
    )
    .bind(&user_id)
    .bind(name)
    .bind(company)
    .bind(phone)
    .fetch_one(pool)
    .await?;
    Ok(user)
}

/// Find a guest user by phone number.
pub async fn find_user_by_phone(pool: &PgPool, phone: &str) -> Result<Option<User>, UserError> {
    let user = sqlx::query_as::<_, User>(
        "SELECT user_id, name, company, phone, created_at, updated_at
         FROM users WHERE phone = $1
         ORDER BY created_at ASC LIMIT 1",
    )
    .bind(phone)
    .fetch_optional(pool)
    .await?;
    Ok(user)
}

/// Fetch one user by id.
pub async fn get_user(pool: &PgPool, user_id: &str) -> Result<Option<User>, UserError> {
    let user = sqlx::query_as::<_, User>(
        "SELECT user_id, name, company, phone, created_at, updated_at
         FROM users WHERE user_id = $1",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;
    Ok(user)
}

/// Upsert a user row from a verified employee profile so that names and
/// companies resolve locally (leaderboards, certificates, search fallback).
pub async fn upsert_employee_user(
    pool: &PgPool,
    user_id: &str,
    name: &str,
    company: &str,
    phone: &str,
) -> Result<(), UserError> {
    sqlx::query(
        "INSERT INTO users (user_id, name, company, phone)
         VALUES ($1, $2, $3, $4)
         ON CONFLICT (user_id) DO UPDATE SET
             name = EXCLUDED.name,
             company = EXCLUDED.company,
             phone = EXCLUDED.phone,
             updated_at = now()",
    )
    .bind(user_id)
    .bind(name)
    .bind(company)
    .bind(phone)
    .execute(pool)
    .await?;
    Ok(())
}

/// Substring search over name, company, and phone.
pub async fn search_users(pool: &PgPool, query: &str, limit: i64) -> Result<Vec<User>, UserError> {
    let pattern = format!("%{}%", escape_like(query));
    let users = sqlx::query_as::<_, User>(
        "SELECT user_id, name, company, phone, created_at, updated_at
         FROM users
         WHERE name ILIKE $1 OR company ILIKE $1 OR phone ILIKE $1
         ORDER BY name ASC
         LIMIT $2",
    )
    .bind(&pattern)
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(users)
}

/// Page through all users.
pub async fn list_users(pool: &PgPool, limit: i64, offset: i64) -> Result<Vec<User>, UserError> {
    let users = sqlx::query_as::<_, User>(
        "SELECT user_id, name, company, phone, created_at, updated_at
         FROM users
         ORDER BY created_at ASC
         LIMIT $1 OFFSET $2",
    )
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;
    Ok(users)
}

/// Resolve `user_id -> display name` for a set of ids.
pub async fn name_map(pool: &PgPool, user_ids: &[String]) -> Result<std::collections::HashMap<String, User>, UserError> {
    if user_ids.is_empty() {
        return Ok(std::collections::HashMap::new());
    }
    let users = sqlx::query_as::<_, User>(
        "SELECT user_id, name, company, phone, created_at, updated_at
         FROM users WHERE user_id = ANY($1)",
    )
    .bind(user_ids)
    .fetch_all(pool)
    .await?;
    Ok(users.into_iter().map(|u| (u.user_id.clone(), u)).collect())
}

fn escape_like(raw: &str) -> String {
    raw.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}

#[cfg(test)]
#[path = "user_test.rs"]
mod tests;
