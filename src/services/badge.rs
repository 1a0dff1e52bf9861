//! Course badges — one per (user, course), tracking the best quiz result.

use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use crate::services::short_id;

#[derive(Debug, thiserror::Error)]
pub enum BadgeError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct CourseBadge {
    pub badge_id: String,
    pub user_id: String,
    pub user_name: String,
    pub course_id: String,
    pub course_title: String,
    pub survey_id: String,
    pub score: i32,
    pub max_score: i32,
    pub percentage: i32,
    pub attempt_count: i32,
    pub earned_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn row_to_badge(row: &PgRow) -> CourseBadge {
    CourseBadge {
        badge_id: row.get("badge_id"),
        user_id: row.get("user_id"),
        user_name: row.get("user_name"),
        course_id: row.get("course_id"),
        course_title: row.get("course_title"),
        survey_id: row.get("survey_id"),
        score: row.get("score"),
        max_score: row.get("max_score"),
        percentage: row.get("percentage"),
        attempt_count: row.get("attempt_count"),
        earned_at: row.get("earned_at"),
        updated_at: row.get("updated_at"),
    }
}

/// Issue a badge on first pass, or bump the attempt counter and keep the
/// best score on re-passes.
pub async fn issue_or_update_badge(
    pool: &PgPool,
    user_id: &str,
    user_name: &str,
    course_id: &str,
    course_title: &str,
    survey_id: &str,
    score: i32,
    max_score: i32,
    percentage: i32,
) -> Result<CourseBadge, BadgeError> {
    let badge_id = short_id("badge");
    let row = sqlx::query(
        "INSERT INTO course_badges (badge_id, user_id, user_name, course_id, course_title, survey_id,
                                    score, max_score, percentage, attempt_count)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, 1)
         ON CONFLICT (user_id, course_id) DO UPDATE SET
             attempt_count = course_badges.attempt_count + 1,
             score = GREATEST(course_badges.score, EXCLUDED.score),
             max_score = EXCLUDED.max_score,
             percentage = GREATEST(course_badges.percentage, EXCLUDED.percentage),
             user_name = EXCLUDED.user_name,
             course_title = EXCLUDED.course_title,
             updated_at = now()
         RETURNING *",
    )
    .bind(&badge_id)
    .bind(user_id)
    .bind(user_name)
    .bind(course_id)
    .bind(course_title)
    .bind(survey_id)
    .bind(score)
    .bind(max_score)
    .bind(percentage)
    .fetch_one(pool)
    .await?;
    Ok(row_to_badge(&row))
}

/// A user's badges, newest first.
pub async fn badges_for_user(pool: &PgPool, user_id: &str) -> Result<Vec<CourseBadge>, BadgeError> {
    let rows = sqlx::query("SELECT * FROM course_badges WHERE user_id = $1 ORDER BY earned_at DESC")
        .bind(user_id)
        .fetch_all(pool)
        .await?;
    Ok(rows.iter().map(row_to_badge).collect())
}

/// One badge by id.
pub async fn get_badge(pool: &PgPool, badge_id: &str) -> Result<Option<CourseBadge>, BadgeError> {
    let row = sqlx::query("SELECT * FROM course_badges WHERE badge_id = $1")
        .bind(badge_id)
        .fetch_optional(pool)
        .await?;
    Ok(row.as_ref().map(row_to_badge))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn badge_serializes_expected_fields() {
        let badge = CourseBadge {
            badge_id: "badge-0a1b2c3d".into(),
            user_id: "guest_aa11bb22".into(),
            user_name: "Li Na".into(),
            course_id: "course-1".into(),
            course_title: "Radio Basics".into(),
            survey_id: "s1".into(),
            score: 45,
            max_score: 50,
            percentage: 90,
            attempt_count: 2,
            earned_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let json = serde_json::to_value(&badge).unwrap();
        assert_eq!(json["badge_id"], "badge-0a1b2c3d");
        assert_eq!(json["percentage"], 90);
        assert_eq!(json["attempt_count"], 2);
    }
}
