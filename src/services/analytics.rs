//! Learning analytics — per-syllabus participation and completion rollups.
//!
//! DESIGN
//! ======
//! Participation mirrors certificate issuance: a user participates in a
//! syllabus when their progress carries XP for it. Completion is measured
//! against the syllabus's course list and its course-linked quizzes.

use sqlx::PgPool;

use crate::services::certificate::{self, CertificateError};
use crate::services::progress::{self, Progress};
use crate::services::quiz::{self, percentage_of};
use crate::services::syllabus::{self, Syllabus};
use crate::services::user;

#[derive(Debug, thiserror::Error)]
pub enum AnalyticsError {
    #[error("syllabus not found: {0}")]
    SyllabusNotFound(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<CertificateError> for AnalyticsError {
    fn from(err: CertificateError) -> Self {
        match err {
            CertificateError::Database(e) => Self::Database(e),
            CertificateError::SyllabusNotFound(id) => Self::SyllabusNotFound(id),
            other => Self::SyllabusNotFound(other.to_string()),
        }
    }
}

impl From<progress::ProgressError> for AnalyticsError {
    fn from(err: progress::ProgressError) -> Self {
        match err {
            progress::ProgressError::Database(e) => Self::Database(e),
        }
    }
}

impl From<syllabus::SyllabusError> for AnalyticsError {
    fn from(err: syllabus::SyllabusError) -> Self {
        match err {
            syllabus::SyllabusError::NotFound(id) => Self::SyllabusNotFound(id),
            syllabus::SyllabusError::Validation(msg) => Self::SyllabusNotFound(msg),
            syllabus::SyllabusError::Database(e) => Self::Database(e),
        }
    }
}

// =============================================================================
// OVERVIEW
// =============================================================================

#[derive(Debug, serde::Serialize)]
pub struct SyllabusOverview {
    pub syllabus_id: String,
    pub name: String,
    pub is_published: bool,
    pub course_count: usize,
    pub quiz_count: usize,
    pub participant_count: usize,
}

pub(crate) fn count_participants(all_progress: &[(String, Progress)], syllabus_id: &str) -> usize {
    all_progress
        .iter()
        .filter(|(_, p)| certificate::syllabus_xp(p, syllabus_id) > 0)
        .count()
}

/// Participation overview across every syllabus.
pub async fn syllabi_overview(pool: &PgPool) -> Result<Vec<SyllabusOverview>, AnalyticsError> {
    let syllabi = syllabus::get_all_syllabi(pool, true).await?;
    let all_progress = progress::list_all_progress(pool).await?;

    let mut overview = Vec::with_capacity(syllabi.len());
    for s in syllabi {
        let quiz_count = certificate::syllabus_course_quizzes(pool, &s).await?.len();
        overview.push(SyllabusOverview {
            participant_count: count_participants(&all_progress, &s.id),
            course_count: s.course_sequence.len(),
            quiz_count,
            syllabus_id: s.id,
            name: s.name,
            is_published: s.is_published,
        });
    }
    Ok(overview)
}

// =============================================================================
// PER-SYLLABUS DETAIL
// =============================================================================

#[derive(Debug, Clone, serde::Serialize)]
pub struct UserAnalytics {
    pub user_id: String,
    pub name: String,
    pub company: String,
    pub xp_earned: i32,
    pub courses_completed: usize,
    pub total_courses: usize,
    pub quizzes_passed: usize,
    pub total_quizzes: usize,
    pub average_score_percentage: f64,
    pub completed_all: bool,
}

#[derive(Debug, serde::Serialize)]
pub struct AnalyticsSummary {
    pub participants: usize,
    pub completed_all: usize,
    pub average_xp: f64,
    pub average_score_percentage: f64,
}

#[derive(Debug, serde::Serialize)]
pub struct SyllabusAnalytics {
    pub syllabus_id: String,
    pub syllabus_name: String,
    pub summary: AnalyticsSummary,
    pub users: Vec<UserAnalytics>,
}

pub(crate) fn courses_completed_in(snapshot: &Progress, syllabus: &Syllabus) -> usize {
    syllabus
        .course_sequence
        .iter()
        .filter(|item| snapshot.courses_completed.contains(&item.course_id))
        .count()
}

#[allow(clippy::cast_precision_loss)]
pub(crate) fn summarize(users: &[UserAnalytics]) -> AnalyticsSummary {
    if users.is_empty() {
        return AnalyticsSummary {
            participants: 0,
            completed_all: 0,
            average_xp: 0.0,
            average_score_percentage: 0.0,
        };
    }
    let participants = users.len();
    let completed_all = users.iter().filter(|u| u.completed_all).count();
    let total_xp: i64 = users.iter().map(|u| i64::from(u.xp_earned)).sum();
    let total_pct: f64 = users.iter().map(|u| u.average_score_percentage).sum();
    let n = participants as f64;
    AnalyticsSummary {
        participants,
        completed_all,
        average_xp: (total_xp as f64 / n * 100.0).round() / 100.0,
        average_score_percentage: (total_pct / n * 100.0).round() / 100.0,
    }
}

/// Per-user breakdown for one syllabus.
pub async fn syllabus_analytics(pool: &PgPool, syllabus_id: &str) -> Result<SyllabusAnalytics, AnalyticsError> {
    let syllabus = syllabus::get_syllabus(pool, syllabus_id)
        .await?
        .ok_or_else(|| AnalyticsError::SyllabusNotFound(syllabus_id.to_string()))?;
    let quizzes = certificate::syllabus_course_quizzes(pool, &syllabus).await?;
    let all_progress = progress::list_all_progress(pool).await?;

    let participants: Vec<&(String, Progress)> = all_progress
        .iter()
        .filter(|(_, p)| certificate::syllabus_xp(p, syllabus_id) > 0)
        .collect();

    let participant_ids: Vec<String> = participants.iter().map(|(id, _)| id.clone()).collect();
    let names = user::name_map(pool, &participant_ids)
        .await
        .map_err(|e| match e {
            user::UserError::Database(db) => AnalyticsError::Database(db),
        })?;

    let mut users = Vec::with_capacity(participants.len());
    for (user_id, snapshot) in participants {
        let mut passed = 0usize;
        let mut pct_sum = 0.0f64;
        let mut pct_count = 0usize;
        for quiz_ref in &quizzes {
            if let Some((best, max)) = quiz::best_score(pool, user_id, &quiz_ref.survey_id)
                .await
                .map_err(|e| match e {
                    quiz::QuizError::Database(db) => AnalyticsError::Database(db),
                    other => AnalyticsError::SyllabusNotFound(other.to_string()),
                })?
            {
                let pct = percentage_of(best, max);
                pct_sum += pct;
                pct_count += 1;
                if pct >= f64::from(quiz_ref.pass_score) {
                    passed += 1;
                }
            }
        }

        let courses_completed = courses_completed_in(snapshot, &syllabus);
        let total_courses = syllabus.course_sequence.len();
        let (name, company) = names
            .get(user_id)
            .map(|u| (u.name.clone(), u.company.clone()))
            .unwrap_or_else(|| (user_id.clone(), String::new()));

        #[allow(clippy::cast_precision_loss)]
        let average_score_percentage: f64 = if pct_count == 0 {
            0.0
        } else {
            (pct_sum / pct_count as f64 * 100.0).round() / 100.0
        };

        users.push(UserAnalytics {
            user_id: user_id.clone(),
            name,
            company,
            xp_earned: certificate::syllabus_xp(snapshot, syllabus_id),
            courses_completed,
            total_courses,
            quizzes_passed: passed,
            total_quizzes: quizzes.len(),
            average_score_percentage,
            completed_all: !quizzes.is_empty() && passed == quizzes.len(),
        });
    }

    users.sort_by(|a, b| b.xp_earned.cmp(&a.xp_earned).then(a.user_id.cmp(&b.user_id)));

    Ok(SyllabusAnalytics {
        summary: summarize(&users),
        syllabus_id: syllabus.id,
        syllabus_name: syllabus.name,
        users,
    })
}

#[cfg(test)]
#[path = "analytics_test.rs"]
mod tests;
