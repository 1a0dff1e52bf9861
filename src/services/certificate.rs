//! Certificate issuance — ranked completion records per syllabus.
//!
//! DESIGN
//! ======
//! Issuance is a recompute: participants are users with XP recorded for
//! the syllabus who passed every course-linked quiz, ranked by their
//! summed best quiz scores. Re-issuing replaces the syllabus's previous
//! certificates so ranks and totals stay consistent.

use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use crate::services::course::{self, CourseError};
use crate::services::progress::{self, Progress, ProgressError};
use crate::services::quiz::{self, QuizError, percentage_of};
use crate::services::syllabus::{self, Syllabus, SyllabusError};
use crate::services::{short_id, user};

#[derive(Debug, thiserror::Error)]
pub enum CertificateError {
    #[error("syllabus not found: {0}")]
    SyllabusNotFound(String),
    #[error("{0}")]
    Validation(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<SyllabusError> for CertificateError {
    fn from(err: SyllabusError) -> Self {
        match err {
            SyllabusError::NotFound(id) => Self::SyllabusNotFound(id),
            SyllabusError::Validation(msg) => Self::Validation(msg),
            SyllabusError::Database(e) => Self::Database(e),
        }
    }
}

impl From<CourseError> for CertificateError {
    fn from(err: CourseError) -> Self {
        match err {
            CourseError::NotFound(id) => Self::Validation(format!("course not found: {id}")),
            CourseError::Validation(msg) => Self::Validation(msg),
            CourseError::Io(e) => Self::Validation(format!("storage error: {e}")),
            CourseError::Database(e) => Self::Database(e),
        }
    }
}

impl From<QuizError> for CertificateError {
    fn from(err: QuizError) -> Self {
        match err {
            QuizError::Database(e) => Self::Database(e),
            other => Self::Validation(other.to_string()),
        }
    }
}

impl From<ProgressError> for CertificateError {
    fn from(err: ProgressError) -> Self {
        match err {
            ProgressError::Database(e) => Self::Database(e),
        }
    }
}

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, Clone, serde::Serialize)]
pub struct Certificate {
    pub certificate_id: String,
    pub user_id: String,
    pub user_name: String,
    pub user_company: String,
    pub syllabus_id: String,
    pub syllabus_name: String,
    pub score: i32,
    pub max_score: i32,
    pub percentage: i32,
    pub xp_earned: i32,
    pub rank: i32,
    pub total_participants: i32,
    pub course_scores: serde_json::Value,
    pub issued_at: DateTime<Utc>,
    pub issued_by: String,
}

fn row_to_certificate(row: &PgRow) -> Certificate {
    Certificate {
        certificate_id: row.get("certificate_id"),
        user_id: row.get("user_id"),
        user_name: row.get("user_name"),
        user_company: row.get("user_company"),
        syllabus_id: row.get("syllabus_id"),
        syllabus_name: row.get("syllabus_name"),
        score: row.get("score"),
        max_score: row.get("max_score"),
        percentage: row.get("percentage"),
        xp_earned: row.get("xp_earned"),
        rank: row.get("rank"),
        total_participants: row.get("total_participants"),
        course_scores: row.get("course_scores"),
        issued_at: row.get("issued_at"),
        issued_by: row.get("issued_by"),
    }
}

/// One course-linked quiz inside a syllabus.
#[derive(Debug, Clone)]
pub(crate) struct CourseQuizRef {
    pub course_id: String,
    pub course_title: String,
    pub survey_id: String,
    pub pass_score: i32,
}

/// A user who cleared every quiz, before ranking.
#[derive(Debug, Clone)]
pub(crate) struct Candidate {
    pub user_id: String,
    pub score: i32,
    pub max_score: i32,
    pub xp_earned: i32,
    pub course_scores: serde_json::Value,
}

/// Sort by score (ties broken by user id for determinism) and assign ranks.
pub(crate) fn rank_candidates(mut candidates: Vec<Candidate>) -> Vec<(i32, Candidate)> {
    candidates.sort_by(|a, b| b.score.cmp(&a.score).then(a.user_id.cmp(&b.user_id)));
    candidates
        .into_iter()
        .enumerate()
        .map(|(idx, candidate)| (i32::try_from(idx).unwrap_or(i32::MAX - 1) + 1, candidate))
        .collect()
}

pub(crate) fn rounded_percentage(score: i32, max_score: i32) -> i32 {
    if max_score <= 0 {
        return 0;
    }
    let pct = f64::from(score) / f64::from(max_score) * 100.0;
    let rounded = pct.round();
    if rounded >= f64::from(i32::MAX) { i32::MAX } else { rounded as i32 }
}

// =============================================================================
// ISSUANCE
// =============================================================================

#[derive(Debug, serde::Serialize)]
pub struct IssueReport {
    pub certificates_issued: usize,
    pub total_participants: usize,
    pub deleted_old: u64,
    pub not_passed: usize,
    pub certificates: Vec<Certificate>,
}

pub(crate) async fn syllabus_course_quizzes(
    pool: &PgPool,
    syllabus: &Syllabus,
) -> Result<Vec<CourseQuizRef>, CertificateError> {
    let mut quizzes = Vec::new();
    for item in &syllabus.course_sequence {
        let Some(found) = course::get_course(pool, &item.course_id).await? else {
            continue;
        };
        if let Some(quiz) = found.quiz {
            quizzes.push(CourseQuizRef {
                course_id: found.id,
                course_title: found.title,
                survey_id: quiz.survey_id,
                pass_score: quiz.pass_score,
            });
        }
    }
    Ok(quizzes)
}

/// Best scores per quiz; `None` when any quiz is missing or failed.
async fn collect_passing_scores(
    pool: &PgPool,
    user_id: &str,
    quizzes: &[CourseQuizRef],
) -> Result<Option<(i32, i32, serde_json::Value)>, CertificateError> {
    let mut total = 0;
    let mut max_total = 0;
    let mut per_course = serde_json::Map::new();

    for quiz_ref in quizzes {
        let Some((best, max)) = quiz::best_score(pool, user_id, &quiz_ref.survey_id).await? else {
            return Ok(None);
        };
        let pct = percentage_of(best, max);
        if pct < f64::from(quiz_ref.pass_score) {
            return Ok(None);
        }
        total += best;
        max_total += max;
        per_course.insert(
            quiz_ref.course_id.clone(),
            serde_json::json!({
                "title": quiz_ref.course_title,
                "score": best,
                "max_score": max,
                "percentage": rounded_percentage(best, max),
            }),
        );
    }

    Ok(Some((total, max_total, serde_json::Value::Object(per_course))))
}

/// Recompute and reissue certificates for a syllabus.
pub async fn issue_certificates(
    pool: &PgPool,
    syllabus_id: &str,
    issued_by: &str,
) -> Result<IssueReport, CertificateError> {
    let syllabus = syllabus::get_syllabus(pool, syllabus_id)
        .await?
        .ok_or_else(|| CertificateError::SyllabusNotFound(syllabus_id.to_string()))?;

    let quizzes = syllabus_course_quizzes(pool, &syllabus).await?;
    if quizzes.is_empty() {
        return Err(CertificateError::Validation("syllabus has no course-linked quizzes".into()));
    }

    let all_progress = progress::list_all_progress(pool).await?;
    let mut candidates = Vec::new();
    let mut not_passed = 0usize;

    for (user_id, snapshot) in &all_progress {
        let xp_earned = syllabus_xp(snapshot, syllabus_id);
        if xp_earned <= 0 {
            continue;
        }
        match collect_passing_scores(pool, user_id, &quizzes).await? {
            Some((score, max_score, course_scores)) => candidates.push(Candidate {
                user_id: user_id.clone(),
                score,
                max_score,
                xp_earned,
                course_scores,
            }),
            None => not_passed += 1,
        }
    }

    if candidates.is_empty() {
        return Err(CertificateError::Validation("no participant has passed every quiz".into()));
    }

    let user_ids: Vec<String> = candidates.iter().map(|c| c.user_id.clone()).collect();
    let users = user::name_map(pool, &user_ids)
        .await
        .map_err(|e| match e {
            user::UserError::Database(db) => CertificateError::Database(db),
        })?;

    let ranked = rank_candidates(candidates);
    let total_participants = ranked.len();

    let deleted_old = sqlx::query("DELETE FROM certificates WHERE syllabus_id = $1")
        .bind(syllabus_id)
        .execute(pool)
        .await?
        .rows_affected();

    let mut certificates = Vec::with_capacity(total_participants);
    let mut tx = pool.begin().await?;
    for (rank, candidate) in ranked {
        let (user_name, user_company) = users
            .get(&candidate.user_id)
            .map(|u| (u.name.clone(), u.company.clone()))
            .unwrap_or_else(|| (candidate.user_id.clone(), String::new()));

        let certificate_id = short_id("cert");
        let percentage = rounded_percentage(candidate.score, candidate.max_score);

        let row = sqlx::query(
            "INSERT INTO certificates (certificate_id, user_id, user_name, user_company, syllabus_id,
                                       syllabus_name, score, max_score, percentage, xp_earned, rank,
                                       total_participants, course_scores, issued_by)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
             RETURNING *",
        )
        .bind(&certificate_id)
        .bind(&candidate.user_id)
        .bind(&user_name)
        .bind(&user_company)
        .bind(syllabus_id)
        .bind(&syllabus.name)
        .bind(candidate.score)
        .bind(candidate.max_score)
        .bind(percentage)
        .bind(candidate.xp_earned)
        .bind(rank)
        .bind(i32::try_from(total_participants).unwrap_or(i32::MAX))
        .bind(&candidate.course_scores)
        .bind(issued_by)
        .fetch_one(tx.as_mut())
        .await?;
        certificates.push(row_to_certificate(&row));
    }
    tx.commit().await?;

    tracing::info!(%syllabus_id, issued = certificates.len(), not_passed, "certificates issued");

    Ok(IssueReport {
        certificates_issued: certificates.len(),
        total_participants,
        deleted_old,
        not_passed,
        certificates,
    })
}

pub(crate) fn syllabus_xp(snapshot: &Progress, syllabus_id: &str) -> i32 {
    snapshot
        .xp_by_syllabus
        .get(syllabus_id)
        .copied()
        .and_then(|xp| i32::try_from(xp).ok())
        .unwrap_or(0)
}

// =============================================================================
// QUERIES
// =============================================================================

/// Certificates issued for a syllabus, by rank.
pub async fn certificates_for_syllabus(pool: &PgPool, syllabus_id: &str) -> Result<Vec<Certificate>, CertificateError> {
    let rows = sqlx::query("SELECT * FROM certificates WHERE syllabus_id = $1 ORDER BY rank ASC")
        .bind(syllabus_id)
        .fetch_all(pool)
        .await?;
    Ok(rows.iter().map(row_to_certificate).collect())
}

/// A user's certificates, newest first.
pub async fn certificates_for_user(pool: &PgPool, user_id: &str) -> Result<Vec<Certificate>, CertificateError> {
    let rows = sqlx::query("SELECT * FROM certificates WHERE user_id = $1 ORDER BY issued_at DESC")
        .bind(user_id)
        .fetch_all(pool)
        .await?;
    Ok(rows.iter().map(row_to_certificate).collect())
}

/// One certificate by id.
pub async fn get_certificate(pool: &PgPool, certificate_id: &str) -> Result<Option<Certificate>, CertificateError> {
    let row = sqlx::query("SELECT * FROM certificates WHERE certificate_id = $1")
        .bind(certificate_id)
        .fetch_optional(pool)
        .await?;
    Ok(row.as_ref().map(row_to_certificate))
}

#[cfg(test)]
#[path = "certificate_test.rs"]
mod tests;
