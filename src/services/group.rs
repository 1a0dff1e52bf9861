//! User groups — named member-id sets used for syllabus access targeting.

use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use crate::services::short_id;

#[derive(Debug, thiserror::Error)]
pub enum GroupError {
    #[error("user group not found: {0}")]
    NotFound(String),
    #[error("{0}")]
    Validation(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct UserGroup {
    pub id: String,
    pub name: String,
    pub description: String,
    pub member_ids: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn row_to_group(row: &PgRow) -> UserGroup {
    UserGroup {
        id: row.get("id"),
        name: row.get("name"),
        description: row.get("description"),
        member_ids: serde_json::from_value(row.get::<serde_json::Value, _>("member_ids")).unwrap_or_default(),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

/// Append members, skipping ids already present.
pub(crate) fn add_members(mut member_ids: Vec<String>, new_ids: &[String]) -> Vec<String> {
    for id in new_ids {
        if !member_ids.contains(id) {
            member_ids.push(id.clone());
        }
    }
    member_ids
}

// =============================================================================
// CRUD
// =============================================================================

/// Create a group.
pub async fn create_group(pool: &PgPool, name: &str, description: &str) -> Result<UserGroup, GroupError> {
    if name.trim().is_empty() {
        return Err(GroupError::Validation("group name must not be empty".into()));
    }
    let id = short_id("grp");
    let row = sqlx::query(
        "INSERT INTO user_groups (id, name, description) VALUES ($1, $2, $3) RETURNING *",
    )
    .bind(&id)
    .bind(name.trim())
    .bind(description.trim())
    .fetch_one(pool)
    .await?;
    Ok(row_to_group(&row))
}

/// All groups, oldest first.
pub async fn get_all_groups(pool: &PgPool) -> Result<Vec<UserGroup>, GroupError> {
    let rows = sqlx::query("SELECT * FROM user_groups ORDER BY created_at ASC")
        .fetch_all(pool)
        .await?;
    Ok(rows.iter().map(row_to_group).collect())
}

/// One group by id.
pub async fn get_group(pool: &PgPool, group_id: &str) -> Result<Option<UserGroup>, GroupError> {
    let row = sqlx::query("SELECT * FROM user_groups WHERE id = $1")
        .bind(group_id)
        .fetch_optional(pool)
        .await?;
    Ok(row.as_ref().map(row_to_group))
}

/// Update name/description.
pub async fn update_group(
    pool: &PgPool,
    group_id: &str,
    name: Option<&str>,
    description: Option<&str>,
) -> Result<UserGroup, GroupError> {
    if let Some(name) = name {
        if name.trim().is_empty() {
            return Err(GroupError::Validation("group name must not be empty".into()));
        }
    }
    let row = sqlx::query(
        "UPDATE user_groups
         SET name = COALESCE($2, name), description = COALESCE($3, description), updated_at = now()
         WHERE id = $1
         RETURNING *",
    )
    .bind(group_id)
    .bind(name.map(str::trim))
    .bind(description.map(str::trim))
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| GroupError::NotFound(group_id.to_string()))?;
    Ok(row_to_group(&row))
}

/// Delete a group.
pub async fn delete_group(pool: &PgPool, group_id: &str) -> Result<(), GroupError> {
    let result = sqlx::query("DELETE FROM user_groups WHERE id = $1")
        .bind(group_id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(GroupError::NotFound(group_id.to_string()));
    }
    Ok(())
}

// =============================================================================
// MEMBERSHIP
// =============================================================================

/// Add one or more members.
pub async fn add_group_members(pool: &PgPool, group_id: &str, user_ids: &[String]) -> Result<UserGroup, GroupError> {
    if user_ids.is_empty() {
        return Err(GroupError::Validation("at least one user id is required".into()));
    }
    let group = get_group(pool, group_id)
        .await?
        .ok_or_else(|| GroupError::NotFound(group_id.to_string()))?;
    let member_ids = add_members(group.member_ids, user_ids);
    write_members(pool, group_id, &member_ids).await
}

/// Remove a member.
pub async fn remove_group_member(pool: &PgPool, group_id: &str, user_id: &str) -> Result<UserGroup, GroupError> {
    let group = get_group(pool, group_id)
        .await?
        .ok_or_else(|| GroupError::NotFound(group_id.to_string()))?;
    let member_ids: Vec<String> = group
        .member_ids
        .into_iter()
        .filter(|id| id != user_id)
        .collect();
    write_members(pool, group_id, &member_ids).await
}

async fn write_members(pool: &PgPool, group_id: &str, member_ids: &[String]) -> Result<UserGroup, GroupError> {
    let row = sqlx::query(
        "UPDATE user_groups SET member_ids = $2, updated_at = now() WHERE id = $1 RETURNING *",
    )
    .bind(group_id)
    .bind(serde_json::json!(member_ids))
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| GroupError::NotFound(group_id.to_string()))?;
    Ok(row_to_group(&row))
}

/// Ids of groups the user belongs to.
pub async fn group_ids_for_user(pool: &PgPool, user_id: &str) -> Result<Vec<String>, GroupError> {
    let ids: Vec<String> = sqlx::query_scalar(
        "SELECT id FROM user_groups WHERE member_ids @> to_jsonb(ARRAY[$1::text])",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(ids)
}

#[cfg(test)]
#[path = "group_test.rs"]
mod tests;
