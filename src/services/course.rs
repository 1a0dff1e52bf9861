//! Course catalog — CRUD, PDF material storage, ordering, quiz links.
//!
//! DESIGN
//! ======
//! Course metadata lives in Postgres; the uploaded PDF lives on disk under
//! `<courses_dir>/<course_id>/content.pdf` with its sha256 and size
//! recorded. Page count is read from the uploaded bytes and drives the
//! estimated reading duration (2 min/page, min 5).

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use std::path::{Path, PathBuf};

use crate::services::short_id;

pub const COURSE_PDF_FILENAME: &str = "content.pdf";
const MINUTES_PER_PAGE: i32 = 2;
const MIN_DURATION_MINUTES: i32 = 5;

#[derive(Debug, thiserror::Error)]
pub enum CourseError {
    #[error("course not found: {0}")]
    NotFound(String),
    #[error("{0}")]
    Validation(String),
    #[error("storage error: {0}")]
    Io(#[from] std::io::Error),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CourseQuiz {
    pub survey_id: String,
    pub pass_score: i32,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct Course {
    pub id: String,
    pub title: String,
    pub description: String,
    #[serde(rename = "type")]
    pub course_type: String,
    #[serde(rename = "mediaUrl")]
    pub media_url: String,
    #[serde(rename = "totalPages")]
    pub total_pages: i32,
    pub duration_minutes: i32,
    #[serde(rename = "order")]
    pub order_index: i32,
    pub tags: Vec<String>,
    pub prerequisites: Vec<String>,
    pub is_published: bool,
    pub icon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quiz: Option<CourseQuiz>,
    pub content_sha256: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn row_to_course(row: &PgRow) -> Course {
    let id: String = row.get("id");
    Course {
        media_url: format!("/api/courses/{id}/{COURSE_PDF_FILENAME}"),
        id,
        title: row.get("title"),
        description: row.get("description"),
        course_type: "pdf".to_string(),
        total_pages: row.get("total_pages"),
        duration_minutes: row.get("duration_minutes"),
        order_index: row.get("order_index"),
        tags: serde_json::from_value(row.get::<serde_json::Value, _>("tags")).unwrap_or_default(),
        prerequisites: serde_json::from_value(row.get::<serde_json::Value, _>("prerequisites")).unwrap_or_default(),
        is_published: row.get("is_published"),
        icon: row.get("icon"),
        quiz: row
            .get::<Option<serde_json::Value>, _>("quiz")
            .and_then(|v| serde_json::from_value(v).ok()),
        content_sha256: row.get("content_sha256"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

// =============================================================================
// PDF HELPERS
// =============================================================================

pub(crate) fn is_pdf(data: &[u8]) -> bool {
    data.starts_with(b"%PDF")
}

/// Count page objects in a raw PDF by scanning for `/Type /Page` entries
/// (`/Type /Pages` tree nodes excluded). Returns 0 when nothing matches.
#[must_use]
pub fn count_pdf_pages(data: &[u8]) -> i32 {
    let mut count: i32 = 0;
    let mut i = 0;
    while i < data.len() {
        if data[i..].starts_with(b"/Type") {
            let mut j = i + 5;
            while j < data.len() && matches!(data[j], b' ' | b'\t' | b'\r' | b'\n') {
                j += 1;
            }
            if data[j..].starts_with(b"/Page") && data.get(j + 5) != Some(&b's') {
                count += 1;
            }
            i = j.max(i + 1);
        } else {
            i += 1;
        }
    }
    count
}

pub(crate) fn estimate_duration_minutes(total_pages: i32) -> i32 {
    (total_pages * MINUTES_PER_PAGE).max(MIN_DURATION_MINUTES)
}

pub(crate) fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let digest = hasher.finalize();
    crate::services::session::bytes_to_hex(&digest)
}

/// Disk path of a course's PDF.
#[must_use]
pub fn pdf_path(courses_dir: &str, course_id: &str) -> PathBuf {
    Path::new(courses_dir).join(course_id).join(COURSE_PDF_FILENAME)
}

// =============================================================================
// CRUD
// =============================================================================

#[derive(Debug, Default)]
pub struct NewCourse {
    pub title: String,
    pub description: String,
    pub quiz_survey_id: Option<String>,
    pub pass_score: i32,
    pub icon: Option<String>,
    pub tags: Vec<String>,
}

pub(crate) fn validate_new_course(input: &NewCourse, pdf_bytes: &[u8]) -> Result<(), CourseError> {
    if input.title.trim().is_empty() {
        return Err(CourseError::Validation("course title must not be empty".into()));
    }
    if !is_pdf(pdf_bytes) {
        return Err(CourseError::Validation("uploaded file is not a PDF".into()));
    }
    Ok(())
}

/// Create a course from an uploaded PDF. Validation runs before any
/// storage write.
pub async fn create_course(
    pool: &PgPool,
    courses_dir: &str,
    input: &NewCourse,
    pdf_bytes: &[u8],
) -> Result<Course, CourseError> {
    validate_new_course(input, pdf_bytes)?;

    let course_id = short_id("course");
    let total_pages = count_pdf_pages(pdf_bytes);
    let duration_minutes = estimate_duration_minutes(total_pages);
    let checksum = sha256_hex(pdf_bytes);

    let path = pdf_path(courses_dir, &course_id);
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(&path, pdf_bytes).await?;

    let next_order: i32 = sqlx::query_scalar("SELECT COALESCE(MAX(order_index), 0) + 1 FROM courses")
        .fetch_one(pool)
        .await?;

    let quiz = input.quiz_survey_id.as_ref().map(|survey_id| CourseQuiz {
        survey_id: survey_id.clone(),
        pass_score: input.pass_score,
    });

    let row = sqlx::query(
        "INSERT INTO courses (id, title, description, icon, tags, order_index, total_pages,
                              duration_minutes, quiz, content_sha256, content_bytes)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
         RETURNING *",
    )
    .bind(&course_id)
    .bind(input.title.trim())
    .bind(&input.description)
    .bind(input.icon.as_deref())
    .bind(serde_json::json!(input.tags))
    .bind(next_order)
    .bind(total_pages)
    .bind(duration_minutes)
    .bind(quiz.as_ref().map(|q| serde_json::json!(q)))
    .bind(&checksum)
    .bind(i64::try_from(pdf_bytes.len()).unwrap_or(i64::MAX))
    .fetch_one(pool)
    .await?;

    tracing::info!(%course_id, total_pages, bytes = pdf_bytes.len(), "course created");
    Ok(row_to_course(&row))
}

/// All courses in display order.
pub async fn get_all_courses(pool: &PgPool) -> Result<Vec<Course>, CourseError> {
    let rows = sqlx::query("SELECT * FROM courses ORDER BY order_index ASC, created_at ASC")
        .fetch_all(pool)
        .await?;
    Ok(rows.iter().map(row_to_course).collect())
}

/// Published courses in display order.
pub async fn get_published_courses(pool: &PgPool) -> Result<Vec<Course>, CourseError> {
    let rows = sqlx::query("SELECT * FROM courses WHERE is_published ORDER BY order_index ASC, created_at ASC")
        .fetch_all(pool)
        .await?;
    Ok(rows.iter().map(row_to_course).collect())
}

/// One course by id.
pub async fn get_course(pool: &PgPool, course_id: &str) -> Result<Option<Course>, CourseError> {
    let row = sqlx::query("SELECT * FROM courses WHERE id = $1")
        .bind(course_id)
        .fetch_optional(pool)
        .await?;
    Ok(row.as_ref().map(row_to_course))
}

/// Mutable course fields. `quiz` and `icon` distinguish "absent" from
/// "set to null" so they can be cleared.
#[derive(Debug, Default, serde::Deserialize)]
pub struct CourseUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "order")]
    pub order_index: Option<i32>,
    pub tags: Option<Vec<String>>,
    pub prerequisites: Option<Vec<String>>,
    pub is_published: Option<bool>,
    #[serde(default, deserialize_with = "double_option")]
    pub quiz: Option<Option<CourseQuiz>>,
    #[serde(default, deserialize_with = "double_option")]
    pub icon: Option<Option<String>>,
}

fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: serde::Deserialize<'de>,
    D: serde::Deserializer<'de>,
{
    Ok(Some(<Option<T> as serde::Deserialize>::deserialize(deserializer)?))
}

/// Apply a partial update to a course.
pub async fn update_course(pool: &PgPool, course_id: &str, update: &CourseUpdate) -> Result<Course, CourseError> {
    let current = get_course(pool, course_id)
        .await?
        .ok_or_else(|| CourseError::NotFound(course_id.to_string()))?;

    if let Some(title) = &update.title {
        if title.trim().is_empty() {
            return Err(CourseError::Validation("course title must not be empty".into()));
        }
    }

    let title = update
        .title
        .as_deref()
        .map(str::trim)
        .unwrap_or(current.title.as_str());
    let description = update.description.as_deref().unwrap_or(current.description.as_str());
    let order_index = update.order_index.unwrap_or(current.order_index);
    let tags = update.tags.clone().unwrap_or(current.tags);
    let prerequisites = update.prerequisites.clone().unwrap_or(current.prerequisites);
    let is_published = update.is_published.unwrap_or(current.is_published);
    let quiz = match &update.quiz {
        Some(value) => value.clone(),
        None => current.quiz,
    };
    let icon = match &update.icon {
        Some(value) => value.clone(),
        None => current.icon,
    };

    let row = sqlx::query(
        "UPDATE courses
         SET title = $2, description = $3, order_index = $4, tags = $5, prerequisites = $6,
             is_published = $7, quiz = $8, icon = $9, updated_at = now()
         WHERE id = $1
         RETURNING *",
    )
    .bind(course_id)
    .bind(title)
    .bind(description)
    .bind(order_index)
    .bind(serde_json::json!(tags))
    .bind(serde_json::json!(prerequisites))
    .bind(is_published)
    .bind(quiz.as_ref().map(|q| serde_json::json!(q)))
    .bind(icon.as_deref())
    .fetch_one(pool)
    .await?;

    Ok(row_to_course(&row))
}

/// Delete a course and its stored material.
pub async fn delete_course(pool: &PgPool, courses_dir: &str, course_id: &str) -> Result<(), CourseError> {
    let result = sqlx::query("DELETE FROM courses WHERE id = $1")
        .bind(course_id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(CourseError::NotFound(course_id.to_string()));
    }

    let dir = Path::new(courses_dir).join(course_id);
    if tokio::fs::metadata(&dir).await.is_ok() {
        if let Err(e) = tokio::fs::remove_dir_all(&dir).await {
            tracing::warn!(error = %e, %course_id, "course material removal failed");
        }
    }
    Ok(())
}

/// Rewrite display order to match the given id sequence.
pub async fn reorder_courses(pool: &PgPool, course_ids: &[String]) -> Result<(), CourseError> {
    let mut tx = pool.begin().await?;
    for (idx, course_id) in course_ids.iter().enumerate() {
        sqlx::query("UPDATE courses SET order_index = $2, updated_at = now() WHERE id = $1")
            .bind(course_id)
            .bind(i32::try_from(idx).unwrap_or(i32::MAX - 1) + 1)
            .execute(tx.as_mut())
            .await?;
    }
    tx.commit().await?;
    Ok(())
}

/// Attach a quiz to a course.
pub async fn link_quiz(
    pool: &PgPool,
    course_id: &str,
    survey_id: &str,
    pass_score: i32,
) -> Result<Course, CourseError> {
    if survey_id.trim().is_empty() {
        return Err(CourseError::Validation("survey id must not be empty".into()));
    }
    let quiz = CourseQuiz { survey_id: survey_id.to_string(), pass_score };
    let row = sqlx::query("UPDATE courses SET quiz = $2, updated_at = now() WHERE id = $1 RETURNING *")
        .bind(course_id)
        .bind(serde_json::json!(quiz))
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| CourseError::NotFound(course_id.to_string()))?;
    Ok(row_to_course(&row))
}

#[cfg(test)]
#[path = "course_test.rs"]
mod tests;
