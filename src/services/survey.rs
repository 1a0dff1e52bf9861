//! Survey catalog — CRUD, question banks, windows, and sampling.
//!
//! DESIGN
//! ======
//! Surveys carry an optional open/close window and an attempt cap; the
//! question bank stores correct answers as option letters (`A`, `A,B,D`)
//! or `|`-separated accepted strings for fill-in questions. Learner-facing
//! endpoints translate letters to option text before they leave the
//! service so clients never re-derive the mapping.

use chrono::{DateTime, Utc};
use rand::Rng;
use rand::seq::SliceRandom;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

/// Number of questions handed to a learner per quiz run.
pub const QUESTIONS_PER_QUIZ: usize = 10;

#[derive(Debug, thiserror::Error)]
pub enum SurveyError {
    #[error("survey not found: {0}")]
    NotFound(String),
    #[error("{0}")]
    Validation(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, serde::Serialize, sqlx::FromRow)]
pub struct Survey {
    pub survey_id: String,
    pub title: String,
    pub description: String,
    pub study_content_html: String,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration_minutes: i32,
    pub total_questions: i32,
    pub pass_score: i32,
    pub max_attempts: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct Question {
    pub question_id: String,
    pub survey_id: String,
    pub question_type: String,
    pub question_text: String,
    pub options: Vec<String>,
    pub correct_answer: String,
    pub score: i32,
    pub explanation: String,
    pub order_index: i32,
}

/// Survey fields accepted on create/update.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct SurveyInput {
    pub title: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub study_content_html: String,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration_minutes: Option<i32>,
    pub total_questions: Option<i32>,
    pub pass_score: Option<i32>,
    pub max_attempts: Option<i32>,
}

/// Question fields accepted on import/append.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct QuestionInput {
    pub question_type: String,
    pub question_text: String,
    #[serde(default)]
    pub options: Vec<String>,
    pub correct_answer: String,
    #[serde(default = "default_question_score")]
    pub score: i32,
    #[serde(default)]
    pub explanation: String,
}

fn default_question_score() -> i32 {
    5
}

pub(crate) fn validate_question_type(question_type: &str) -> bool {
    matches!(question_type, "single_choice" | "multiple_choice" | "fill_blank")
}

fn validate_survey_input(input: &SurveyInput) -> Result<(), SurveyError> {
    let title_ok = input
        .title
        .as_deref()
        .is_some_and(|t| !t.trim().is_empty());
    if !title_ok {
        return Err(SurveyError::Validation("title must not be empty".into()));
    }
    if let (Some(start), Some(end)) = (input.start_time, input.end_time) {
        if start >= end {
            return Err(SurveyError::Validation("start time must be before end time".into()));
        }
    }
    Ok(())
}

// =============================================================================
// CRUD
// =============================================================================

/// Create a survey, returning its id.
pub async fn create_survey(pool: &PgPool, input: &SurveyInput) -> Result<String, SurveyError> {
    validate_survey_input(input)?;
    let survey_id = Uuid::new_v4().to_string();
    sqlx::query(
        "INSERT INTO surveys (survey_id, title, description, study_content_html, start_time, end_time,
                              duration_minutes, total_questions, pass_score, max_attempts)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
    )
    .bind(&survey_id)
    .bind(input.title.as_deref().map(str::trim))
    .bind(&input.description)
    .bind(&input.study_content_html)
    .bind(input.start_time)
    .bind(input.end_time)
    .bind(input.duration_minutes.unwrap_or(30))
    .bind(input.total_questions.unwrap_or(0))
    .bind(input.pass_score.unwrap_or(60))
    .bind(input.max_attempts.unwrap_or(3))
    .execute(pool)
    .await?;
    Ok(survey_id)
}

/// Update an existing survey.
pub async fn update_survey(pool: &PgPool, survey_id: &str, input: &SurveyInput) -> Result<(), SurveyError> {
    validate_survey_input(input)?;
    let result = sqlx::query(
        "UPDATE surveys SET title = $2, description = $3, study_content_html = $4, start_time = $5,
                            end_time = $6, duration_minutes = $7, total_questions = $8, pass_score = $9,
                            max_attempts = $10
         WHERE survey_id = $1",
    )
    .bind(survey_id)
    .bind(input.title.as_deref().map(str::trim))
    .bind(&input.description)
    .bind(&input.study_content_html)
    .bind(input.start_time)
    .bind(input.end_time)
    .bind(input.duration_minutes.unwrap_or(30))
    .bind(input.total_questions.unwrap_or(0))
    .bind(input.pass_score.unwrap_or(60))
    .bind(input.max_attempts.unwrap_or(3))
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(SurveyError::NotFound(survey_id.to_string()));
    }
    Ok(())
}

/// Delete a survey (questions cascade).
pub async fn delete_survey(pool: &PgPool, survey_id: &str) -> Result<(), SurveyError> {
    if survey_id.trim().is_empty() {
        return Err(SurveyError::Validation("survey id must not be empty".into()));
    }
    let result = sqlx::query("DELETE FROM surveys WHERE survey_id = $1")
        .bind(survey_id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(SurveyError::NotFound(survey_id.to_string()));
    }
    Ok(())
}

/// All surveys, newest first.
pub async fn get_all_surveys(pool: &PgPool) -> Result<Vec<Survey>, SurveyError> {
    let surveys = sqlx::query_as::<_, Survey>("SELECT * FROM surveys ORDER BY created_at DESC")
        .fetch_all(pool)
        .await?;
    Ok(surveys)
}

/// Active surveys, newest first.
pub async fn get_active_surveys(pool: &PgPool) -> Result<Vec<Survey>, SurveyError> {
    let surveys = sqlx::query_as::<_, Survey>("SELECT * FROM surveys WHERE is_active ORDER BY created_at DESC")
        .fetch_all(pool)
        .await?;
    Ok(surveys)
}

/// One survey by id.
pub async fn get_survey(pool: &PgPool, survey_id: &str) -> Result<Option<Survey>, SurveyError> {
    let survey = sqlx::query_as::<_, Survey>("SELECT * FROM surveys WHERE survey_id = $1")
        .bind(survey_id)
        .fetch_optional(pool)
        .await?;
    Ok(survey)
}

// =============================================================================
// QUESTIONS
// =============================================================================

fn row_to_question(row: &PgRow) -> Question {
    Question {
        question_id: row.get("question_id"),
        survey_id: row.get("survey_id"),
        question_type: row.get("question_type"),
        question_text: row.get("question_text"),
        options: serde_json::from_value(row.get::<serde_json::Value, _>("options")).unwrap_or_default(),
        correct_answer: row.get("correct_answer"),
        score: row.get("score"),
        explanation: row.get("explanation"),
        order_index: row.get("order_index"),
    }
}

pub(crate) fn validate_question(question: &QuestionInput) -> Result<(), SurveyError> {
    if question.question_text.trim().is_empty() {
        return Err(SurveyError::Validation("question text must not be empty".into()));
    }
    if !validate_question_type(&question.question_type) {
        return Err(SurveyError::Validation(format!(
            "invalid question type: {}",
            question.question_type
        )));
    }
    if question.question_type != "fill_blank" {
        if question.options.len() < 2 {
            return Err(SurveyError::Validation("at least 2 options are required".into()));
        }
        let letters = answer_letters(&question.correct_answer);
        if letters.is_empty() {
            return Err(SurveyError::Validation("correct answer must not be empty".into()));
        }
        for letter in letters {
            let index = (letter as usize).wrapping_sub('A' as usize);
            if index >= question.options.len() {
                return Err(SurveyError::Validation(format!("answer '{letter}' is outside the option range")));
            }
        }
    } else if question.correct_answer.trim().is_empty() {
        return Err(SurveyError::Validation("correct answer must not be empty".into()));
    }
    Ok(())
}

/// Uppercase answer letters from `A`, `A,B,D`, `ABD`, or full-width commas.
pub(crate) fn answer_letters(raw: &str) -> Vec<char> {
    raw.trim()
        .to_uppercase()
        .replace('，', ",")
        .chars()
        .filter(|c| c.is_ascii_uppercase())
        .collect()
}

/// Append a question batch to a survey and refresh its question count.
pub async fn add_questions(pool: &PgPool, survey_id: &str, questions: &[QuestionInput]) -> Result<usize, SurveyError> {
    if questions.is_empty() {
        return Err(SurveyError::Validation("at least one question is required".into()));
    }
    for question in questions {
        validate_question(question)?;
    }
    if get_survey(pool, survey_id).await?.is_none() {
        return Err(SurveyError::NotFound(survey_id.to_string()));
    }

    let next_index: i32 = sqlx::query_scalar(
        "SELECT COALESCE(MAX(order_index), 0) FROM questions WHERE survey_id = $1",
    )
    .bind(survey_id)
    .fetch_one(pool)
    .await?;

    let mut tx = pool.begin().await?;
    for (offset, question) in questions.iter().enumerate() {
        sqlx::query(
            "INSERT INTO questions (question_id, survey_id, question_type, question_text, options,
                                    correct_answer, score, explanation, order_index)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(survey_id)
        .bind(&question.question_type)
        .bind(question.question_text.trim())
        .bind(serde_json::json!(question.options))
        .bind(question.correct_answer.trim())
        .bind(question.score)
        .bind(&question.explanation)
        .bind(next_index + i32::try_from(offset).unwrap_or(i32::MAX - next_index) + 1)
        .execute(tx.as_mut())
        .await?;
    }
    sqlx::query(
        "UPDATE surveys SET total_questions = (SELECT COUNT(*) FROM questions WHERE survey_id = $1)
         WHERE survey_id = $1",
    )
    .bind(survey_id)
    .execute(tx.as_mut())
    .await?;
    tx.commit().await?;

    Ok(questions.len())
}

/// All questions of a survey in bank order.
pub async fn get_questions(pool: &PgPool, survey_id: &str) -> Result<Vec<Question>, SurveyError> {
    let rows = sqlx::query("SELECT * FROM questions WHERE survey_id = $1 ORDER BY order_index ASC")
        .bind(survey_id)
        .fetch_all(pool)
        .await?;
    Ok(rows.iter().map(row_to_question).collect())
}

/// One question by id, optionally pinned to a survey.
pub async fn get_question(
    pool: &PgPool,
    question_id: &str,
    survey_id: Option<&str>,
) -> Result<Option<Question>, SurveyError> {
    let row = if let Some(survey_id) = survey_id {
        sqlx::query("SELECT * FROM questions WHERE question_id = $1 AND survey_id = $2")
            .bind(question_id)
            .bind(survey_id)
            .fetch_optional(pool)
            .await?
    } else {
        sqlx::query("SELECT * FROM questions WHERE question_id = $1")
            .bind(question_id)
            .fetch_optional(pool)
            .await?
    };
    Ok(row.as_ref().map(row_to_question))
}

// =============================================================================
// WINDOW + SAMPLING
// =============================================================================

/// Check the survey's open/close window against `now`. Surveys without a
/// configured window are always open.
pub fn check_survey_window(survey: &Survey, now: DateTime<Utc>) -> Result<(), String> {
    let (Some(start), Some(end)) = (survey.start_time, survey.end_time) else {
        return Ok(());
    };
    if now < start {
        return Err("survey has not started yet".into());
    }
    if now > end {
        return Err("survey has ended".into());
    }
    Ok(())
}

/// Sample up to [`QUESTIONS_PER_QUIZ`] questions, previously-missed ones
/// first, the rest drawn randomly; the final order is shuffled.
pub fn select_questions_for_user<R: Rng + ?Sized>(
    mut all: Vec<Question>,
    wrong_ids: &[String],
    rng: &mut R,
) -> Vec<Question> {
    if all.len() <= QUESTIONS_PER_QUIZ {
        all.shuffle(rng);
        return all;
    }

    let (mut wrong, mut rest): (Vec<Question>, Vec<Question>) = all
        .into_iter()
        .partition(|q| wrong_ids.contains(&q.question_id));

    wrong.shuffle(rng);
    wrong.truncate(QUESTIONS_PER_QUIZ);

    let remaining = QUESTIONS_PER_QUIZ - wrong.len();
    rest.shuffle(rng);
    rest.truncate(remaining);

    let mut selected = wrong;
    selected.append(&mut rest);
    selected.shuffle(rng);
    selected
}

// =============================================================================
// ANSWER TRANSLATION
// =============================================================================

/// Translate a stored correct answer into option text: single letters map
/// to their option, letter lists (comma-separated, contiguous, or JSON
/// arrays) map to option lists, and anything else passes through.
pub fn parse_correct_answer(raw: &str, options: &[String]) -> serde_json::Value {
    let trimmed = raw.trim();

    if trimmed.starts_with('[') || trimmed.starts_with('{') {
        if let Ok(parsed) = serde_json::from_str::<serde_json::Value>(trimmed) {
            if let serde_json::Value::Array(items) = parsed {
                let letters: Vec<String> = items
                    .iter()
                    .map(|v| v.as_str().unwrap_or_default().to_string())
                    .collect();
                return serde_json::json!(convert_letters_to_options(&letters, options));
            }
            return parsed;
        }
    }

    if options.is_empty() {
        return serde_json::Value::String(trimmed.to_string());
    }

    let upper = trimmed.to_uppercase();
    if upper.len() == 1 && upper.chars().all(|c| c.is_ascii_uppercase()) {
        return serde_json::Value::String(letter_to_option(&upper, options));
    }

    let normalized = upper.replace('，', ",");
    if normalized.contains(',') {
        let letters: Vec<String> = normalized
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        return serde_json::json!(convert_letters_to_options(&letters, options));
    }

    if !upper.is_empty() && upper.chars().all(|c| c.is_ascii_uppercase()) {
        let letters: Vec<String> = upper.chars().map(String::from).collect();
        return serde_json::json!(convert_letters_to_options(&letters, options));
    }

    serde_json::Value::String(trimmed.to_string())
}

fn letter_to_option(letter: &str, options: &[String]) -> String {
    let Some(first) = letter.chars().next() else {
        return letter.to_string();
    };
    let index = (first as usize).wrapping_sub('A' as usize);
    options
        .get(index)
        .cloned()
        .unwrap_or_else(|| letter.to_string())
}

fn convert_letters_to_options(letters: &[String], options: &[String]) -> Vec<String> {
    letters
        .iter()
        .map(|letter| {
            let trimmed = letter.trim();
            if trimmed.len() == 1 && trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
                letter_to_option(&trimmed.to_uppercase(), options)
            } else {
                trimmed.to_string()
            }
        })
        .collect()
}

#[cfg(test)]
#[path = "survey_test.rs"]
mod tests;
