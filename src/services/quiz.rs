//! Quiz grading — answer checks, per-question responses, attempt scores.
//!
//! DESIGN
//! ======
//! Two flows share the same checker: the authenticated per-question flow
//! (submit-answer records a response row, finish folds an attempt into a
//! score row) and the unauthenticated whole-paper flow (`grade_paper`,
//! which grades without persisting). Stored answers are letters; submitted
//! answers may be letters, option text, lists, or comma strings, so the
//! comparison normalizes both sides to sets.

use std::collections::HashSet;

use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::services::survey::{self, Question, SurveyError, parse_correct_answer};

#[derive(Debug, thiserror::Error)]
pub enum QuizError {
    #[error("question not found: {0}")]
    QuestionNotFound(String),
    #[error("survey not found: {0}")]
    SurveyNotFound(String),
    #[error("{0}")]
    Validation(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<SurveyError> for QuizError {
    fn from(err: SurveyError) -> Self {
        match err {
            SurveyError::NotFound(id) => Self::SurveyNotFound(id),
            SurveyError::Validation(msg) => Self::Validation(msg),
            SurveyError::Database(e) => Self::Database(e),
        }
    }
}

// =============================================================================
// ANSWER CHECKING
// =============================================================================

/// Check a submitted answer against the stored correct answer.
///
/// `correct` is the stored form (letters or `|`-separated fill answers);
/// `submitted` is whatever the client sent (string, list, or comma string).
#[must_use]
pub fn check_answer(submitted: &serde_json::Value, correct: &serde_json::Value, question_type: &str) -> bool {
    match question_type {
        "single_choice" => {
            let submitted = value_to_string(submitted);
            let correct = value_to_string(correct);
            !submitted.is_empty() && submitted.trim().to_uppercase() == correct.trim().to_uppercase()
        }
        "multiple_choice" => {
            let submitted = value_to_set(submitted);
            let correct = value_to_set(correct);
            !correct.is_empty() && submitted == correct
        }
        "fill_blank" => {
            let submitted = value_to_string(submitted).trim().to_lowercase();
            if submitted.is_empty() {
                return false;
            }
            match correct {
                serde_json::Value::Array(items) => items
                    .iter()
                    .any(|v| value_to_string(v).trim().to_lowercase() == submitted),
                other => value_to_string(other)
                    .split('|')
                    .any(|accepted| accepted.trim().to_lowercase() == submitted),
            }
        }
        _ => false,
    }
}

fn value_to_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Normalize a list or comma string into an uppercase set.
fn value_to_set(value: &serde_json::Value) -> HashSet<String> {
    match value {
        serde_json::Value::Array(items) => items
            .iter()
            .map(|v| value_to_string(v).trim().to_uppercase())
            .filter(|s| !s.is_empty())
            .collect(),
        other => value_to_string(other)
            .replace('，', ",")
            .split(',')
            .map(|s| s.trim().to_uppercase())
            .filter(|s| !s.is_empty())
            .collect(),
    }
}

// =============================================================================
// WHOLE-PAPER GRADING
// =============================================================================

#[derive(Debug, Clone, serde::Deserialize)]
pub struct SubmittedAnswer {
    pub question_id: String,
    pub answer: serde_json::Value,
}

#[derive(Debug, serde::Serialize)]
pub struct QuestionResult {
    pub question_id: String,
    pub is_correct: bool,
    pub score: i32,
    pub correct_answer: serde_json::Value,
}

#[derive(Debug, serde::Serialize)]
pub struct PaperResult {
    pub total_score: i32,
    pub max_score: i32,
    pub percentage: f64,
    pub passed: bool,
    pub results: Vec<QuestionResult>,
}

/// Grade a full answer sheet against a question set. Correct answers are
/// translated to option text first, matching what learners were shown.
#[must_use]
pub fn grade_paper(questions: &[Question], answers: &[SubmittedAnswer], pass_score: i32) -> PaperResult {
    let max_score: i32 = questions.iter().map(|q| q.score).sum();
    let mut total_score = 0;
    let mut results = Vec::with_capacity(answers.len());

    for answer in answers {
        let Some(question) = questions.iter().find(|q| q.question_id == answer.question_id) else {
            continue;
        };
        let correct = parse_correct_answer(&question.correct_answer, &question.options);
        let is_correct = check_answer(&answer.answer, &correct, &question.question_type);
        if is_correct {
            total_score += question.score;
        }
        results.push(QuestionResult {
            question_id: question.question_id.clone(),
            is_correct,
            score: if is_correct { question.score } else { 0 },
            correct_answer: correct,
        });
    }

    let percentage = percentage_of(total_score, max_score);
    PaperResult {
        total_score,
        max_score,
        percentage,
        passed: percentage >= f64::from(pass_score),
        results,
    }
}

pub(crate) fn percentage_of(score: i32, max_score: i32) -> f64 {
    if max_score <= 0 {
        return 0.0;
    }
    (f64::from(score) / f64::from(max_score) * 10_000.0).round() / 100.0
}

// =============================================================================
// PER-QUESTION FLOW
// =============================================================================

#[derive(Debug, serde::Serialize)]
pub struct AnswerOutcome {
    pub response_id: String,
    pub is_correct: bool,
    pub score_earned: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correct_answer: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

/// Grade and record one submitted answer. Wrong submissions get the
/// correct answer and explanation echoed back for review.
pub async fn submit_answer(
    pool: &PgPool,
    user_id: &str,
    question_id: &str,
    submitted: &serde_json::Value,
    time_spent_seconds: i32,
    attempt: i32,
    survey_id: Option<&str>,
) -> Result<AnswerOutcome, QuizError> {
    let question = survey::get_question(pool, question_id, survey_id)
        .await?
        .ok_or_else(|| QuizError::QuestionNotFound(question_id.to_string()))?;

    let correct = parse_correct_answer(&question.correct_answer, &question.options);
    let is_correct = check_answer(submitted, &correct, &question.question_type);
    let score_earned = if is_correct { question.score } else { 0 };

    let response_id = Uuid::new_v4().to_string();
    sqlx::query(
        "INSERT INTO responses (response_id, user_id, survey_id, question_id, user_answer, is_correct,
                                score_earned, attempt, time_spent_seconds)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
    )
    .bind(&response_id)
    .bind(user_id)
    .bind(&question.survey_id)
    .bind(question_id)
    .bind(serde_json::to_string(submitted).unwrap_or_default())
    .bind(is_correct)
    .bind(score_earned)
    .bind(attempt)
    .bind(time_spent_seconds)
    .execute(pool)
    .await?;

    Ok(AnswerOutcome {
        response_id,
        is_correct,
        score_earned,
        correct_answer: (!is_correct).then_some(correct),
        explanation: (!is_correct).then(|| question.explanation.clone()),
    })
}

/// Number of completed attempts a user has on a survey.
pub async fn user_attempts(pool: &PgPool, user_id: &str, survey_id: &str) -> Result<i64, QuizError> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM scores WHERE user_id = $1 AND survey_id = $2")
        .bind(user_id)
        .bind(survey_id)
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// Check the attempt cap. Returns `(allowed, remaining)`.
pub async fn check_attempt_limit(pool: &PgPool, user_id: &str, survey_id: &str) -> Result<(bool, i64), QuizError> {
    let survey = survey::get_survey(pool, survey_id)
        .await?
        .ok_or_else(|| QuizError::SurveyNotFound(survey_id.to_string()))?;
    let max_attempts = i64::from(survey.max_attempts);
    let current = user_attempts(pool, user_id, survey_id).await?;
    if current < max_attempts {
        Ok((true, max_attempts - current))
    } else {
        Ok((false, 0))
    }
}

#[derive(Debug, serde::Serialize)]
pub struct AttemptScore {
    pub score_id: String,
    pub total_score: i32,
    pub max_score: i32,
    pub correct_count: i32,
    pub wrong_count: i32,
    pub percentage: f64,
    pub duration_seconds: i32,
}

/// Fold one attempt's response rows into a score row.
pub async fn finalize_attempt(
    pool: &PgPool,
    user_id: &str,
    survey_id: &str,
    attempt_number: i32,
) -> Result<AttemptScore, QuizError> {
    let rows = sqlx::query(
        "SELECT is_correct, score_earned, time_spent_seconds
         FROM responses
         WHERE user_id = $1 AND survey_id = $2 AND attempt = $3",
    )
    .bind(user_id)
    .bind(survey_id)
    .bind(attempt_number)
    .fetch_all(pool)
    .await?;

    let total_score: i32 = rows.iter().map(|r| r.get::<i32, _>("score_earned")).sum();
    let correct_count = i32::try_from(rows.iter().filter(|r| r.get::<bool, _>("is_correct")).count()).unwrap_or(0);
    let wrong_count = i32::try_from(rows.len()).unwrap_or(0) - correct_count;
    let duration_seconds: i32 = rows
        .iter()
        .map(|r| r.get::<i32, _>("time_spent_seconds"))
        .sum();

    let questions = survey::get_questions(pool, survey_id).await?;
    let max_score: i32 = questions.iter().map(|q| q.score).sum();

    let score_id = Uuid::new_v4().to_string();
    sqlx::query(
        "INSERT INTO scores (score_id, user_id, survey_id, attempt_number, total_score, max_score,
                             correct_count, wrong_count, duration_seconds)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
    )
    .bind(&score_id)
    .bind(user_id)
    .bind(survey_id)
    .bind(attempt_number)
    .bind(total_score)
    .bind(max_score)
    .bind(correct_count)
    .bind(wrong_count)
    .bind(duration_seconds)
    .execute(pool)
    .await?;

    Ok(AttemptScore {
        score_id,
        total_score,
        max_score,
        correct_count,
        wrong_count,
        percentage: percentage_of(total_score, max_score),
        duration_seconds,
    })
}

/// Question ids the user has ever answered incorrectly on a survey.
pub async fn wrong_question_ids(pool: &PgPool, user_id: &str, survey_id: &str) -> Result<Vec<String>, QuizError> {
    let ids: Vec<String> = sqlx::query_scalar(
        "SELECT DISTINCT question_id
         FROM responses
         WHERE user_id = $1 AND survey_id = $2 AND NOT is_correct",
    )
    .bind(user_id)
    .bind(survey_id)
    .fetch_all(pool)
    .await?;
    Ok(ids)
}

/// The user's wrongly-answered questions, stripped of correct answers.
pub async fn wrong_questions(
    pool: &PgPool,
    user_id: &str,
    survey_id: &str,
) -> Result<Vec<serde_json::Value>, QuizError> {
    let ids = wrong_question_ids(pool, user_id, survey_id).await?;
    let questions = survey::get_questions(pool, survey_id).await?;
    Ok(questions
        .into_iter()
        .filter(|q| ids.contains(&q.question_id))
        .map(|q| {
            serde_json::json!({
                "question_id": q.question_id,
                "question_type": q.question_type,
                "question_text": q.question_text,
                "options": q.options,
                "score": q.score,
            })
        })
        .collect())
}

// =============================================================================
// SURVEY LEADERBOARD
// =============================================================================

#[derive(Debug, serde::Serialize)]
pub struct SurveyLeaderboardEntry {
    pub rank: i64,
    pub user_id: String,
    pub name: String,
    pub total_score: i32,
    pub max_score: i32,
    pub duration_seconds: i32,
    pub completed_at: chrono::DateTime<chrono::Utc>,
}

/// Best score per user for a survey, ranked by score then speed.
pub async fn survey_leaderboard(
    pool: &PgPool,
    survey_id: &str,
    limit: i64,
) -> Result<Vec<SurveyLeaderboardEntry>, QuizError> {
    let rows = sqlx::query(
        "SELECT DISTINCT ON (s.user_id)
                s.user_id, s.total_score, s.max_score, s.duration_seconds, s.completed_at, u.name
         FROM scores s
         LEFT JOIN users u ON u.user_id = s.user_id
         WHERE s.survey_id = $1
         ORDER BY s.user_id, s.total_score DESC, s.duration_seconds ASC",
    )
    .bind(survey_id)
    .fetch_all(pool)
    .await?;

    let mut entries: Vec<SurveyLeaderboardEntry> = rows
        .iter()
        .map(|r| SurveyLeaderboardEntry {
            rank: 0,
            user_id: r.get("user_id"),
            name: r
                .get::<Option<String>, _>("name")
                .unwrap_or_else(|| r.get("user_id")),
            total_score: r.get("total_score"),
            max_score: r.get("max_score"),
            duration_seconds: r.get("duration_seconds"),
            completed_at: r.get("completed_at"),
        })
        .collect();

    entries.sort_by(|a, b| {
        b.total_score
            .cmp(&a.total_score)
            .then(a.duration_seconds.cmp(&b.duration_seconds))
    });
    entries.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
    for (idx, entry) in entries.iter_mut().enumerate() {
        entry.rank = i64::try_from(idx).unwrap_or(0) + 1;
    }
    Ok(entries)
}

/// Best (highest) score row a user has for a survey.
pub async fn best_score(pool: &PgPool, user_id: &str, survey_id: &str) -> Result<Option<(i32, i32)>, QuizError> {
    let row = sqlx::query_as::<_, (i32, i32)>(
        "SELECT total_score, max_score
         FROM scores
         WHERE user_id = $1 AND survey_id = $2
         ORDER BY total_score DESC
         LIMIT 1",
    )
    .bind(user_id)
    .bind(survey_id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

#[cfg(test)]
#[path = "quiz_test.rs"]
mod tests;
