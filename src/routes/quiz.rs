//! Quiz routes — attempt flow, grading, and the survey leaderboard.

use axum::extract::{Path, State};
use chrono::Utc;

use crate::response::{ApiError, ApiResult, ok};
use crate::routes::auth::AuthUser;
use crate::routes::surveys::{quiz_error_to_api, survey_error_to_api};
use crate::services::badge;
use crate::services::quiz::{self, SubmittedAnswer};
use crate::services::survey;
use crate::services::user;
use crate::state::AppState;

const LEADERBOARD_LIMIT: i64 = 100;

// =============================================================================
// ATTEMPT FLOW
// =============================================================================

/// `POST /api/quiz/start/{survey_id}` — open an attempt.
pub async fn start_quiz(State(state): State<AppState>, auth: AuthUser, Path(survey_id): Path<String>) -> ApiResult {
    let survey = survey::get_survey(&state.pool, &survey_id)
        .await
        .map_err(survey_error_to_api)?
        .ok_or_else(|| ApiError::not_found("survey not found"))?;
    if let Err(reason) = survey::check_survey_window(&survey, Utc::now()) {
        return Err(ApiError::forbidden(reason));
    }

    let (allowed, remaining) = quiz::check_attempt_limit(&state.pool, &auth.session.user_id, &survey_id)
        .await
        .map_err(quiz_error_to_api)?;
    if !allowed {
        return Err(ApiError::forbidden("maximum attempts reached"));
    }

    let attempt_number = i64::from(survey.max_attempts) - remaining + 1;
    Ok(ok(serde_json::json!({
        "attempt_number": attempt_number,
        "remaining": remaining,
    })))
}

#[derive(Debug, serde::Deserialize)]
pub struct SubmitAnswerBody {
    pub question_id: String,
    pub user_answer: serde_json::Value,
    #[serde(default)]
    pub time_spent_seconds: i32,
    #[serde(default = "default_attempt")]
    pub attempt: i32,
    pub survey_id: Option<String>,
}

fn default_attempt() -> i32 {
    1
}

/// `POST /api/quiz/submit-answer` — grade and record one answer.
pub async fn submit_answer(
    State(state): State<AppState>,
    auth: AuthUser,
    axum::Json(body): axum::Json<SubmitAnswerBody>,
) -> ApiResult {
    let outcome = quiz::submit_answer(
        &state.pool,
        &auth.session.user_id,
        &body.question_id,
        &body.user_answer,
        body.time_spent_seconds,
        body.attempt,
        body.survey_id.as_deref(),
    )
    .await
    .map_err(quiz_error_to_api)?;
    Ok(ok(outcome))
}

#[derive(Debug, serde::Deserialize)]
pub struct FinishBody {
    pub survey_id: String,
    #[serde(default = "default_attempt")]
    pub attempt_number: i32,
}

/// `POST /api/quiz/finish` — fold the attempt into a score row. A passing
/// result on a course-linked quiz issues or refreshes the course badge.
pub async fn finish_quiz(
    State(state): State<AppState>,
    auth: AuthUser,
    axum::Json(body): axum::Json<FinishBody>,
) -> ApiResult {
    let score = quiz::finalize_attempt(&state.pool, &auth.session.user_id, &body.survey_id, body.attempt_number)
        .await
        .map_err(quiz_error_to_api)?;

    award_badge_if_passed(&state, &auth.session.user_id, &body.survey_id, &score).await;

    Ok(ok(score))
}

/// Best-effort badge issuance; never fails the finish call.
async fn award_badge_if_passed(state: &AppState, user_id: &str, survey_id: &str, score: &quiz::AttemptScore) {
    let linked_course = match linked_course_for_survey(state, survey_id).await {
        Ok(found) => found,
        Err(e) => {
            tracing::warn!(error = %e.message, "course lookup for badge failed");
            return;
        }
    };
    let Some((course_id, course_title, pass_score)) = linked_course else {
        return;
    };
    if score.percentage < f64::from(pass_score) {
        return;
    }

    let user_name = user::get_user(&state.pool, user_id)
        .await
        .ok()
        .flatten()
        .map(|u| u.name)
        .unwrap_or_else(|| user_id.to_string());

    #[allow(clippy::cast_possible_truncation)]
    let percentage = score.percentage.round() as i32;
    if let Err(e) = badge::issue_or_update_badge(
        &state.pool,
        user_id,
        &user_name,
        &course_id,
        &course_title,
        survey_id,
        score.total_score,
        score.max_score,
        percentage,
    )
    .await
    {
        tracing::warn!(error = %e, %course_id, "badge issuance failed");
    }
}

async fn linked_course_for_survey(
    state: &AppState,
    survey_id: &str,
) -> Result<Option<(String, String, i32)>, ApiError> {
    let courses = crate::services::course::get_all_courses(&state.pool)
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?;
    Ok(courses.into_iter().find_map(|c| {
        c.quiz
            .filter(|quiz| quiz.survey_id == survey_id)
            .map(|quiz| (c.id, c.title, quiz.pass_score))
    }))
}

/// `GET /api/quiz/wrong/{survey_id}` — the caller's missed questions.
pub async fn wrong_questions(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(survey_id): Path<String>,
) -> ApiResult {
    let questions = quiz::wrong_questions(&state.pool, &auth.session.user_id, &survey_id)
        .await
        .map_err(quiz_error_to_api)?;
    Ok(ok(questions))
}

// =============================================================================
// WHOLE-PAPER SUBMIT (kiosk flow, unauthenticated)
// =============================================================================

#[derive(Debug, serde::Deserialize)]
pub struct SubmitPaperBody {
    #[serde(default)]
    pub user_name: String,
    pub survey_id: Option<String>,
    #[serde(default)]
    pub answers: Vec<SubmittedAnswer>,
}

/// `POST /api/quiz/submit` — grade a whole paper without persisting.
pub async fn submit_paper(State(state): State<AppState>, axum::Json(body): axum::Json<SubmitPaperBody>) -> ApiResult {
    let survey_id = body
        .survey_id
        .as_deref()
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("survey id must not be empty"))?;

    let survey = survey::get_survey(&state.pool, survey_id)
        .await
        .map_err(survey_error_to_api)?
        .ok_or_else(|| ApiError::not_found("survey not found"))?;
    let questions = survey::get_questions(&state.pool, survey_id)
        .await
        .map_err(survey_error_to_api)?;
    if questions.is_empty() {
        return Err(ApiError::bad_request("survey has no questions"));
    }

    let result = quiz::grade_paper(&questions, &body.answers, survey.pass_score);
    tracing::info!(
        %survey_id,
        user_name = %body.user_name,
        score = result.total_score,
        passed = result.passed,
        "paper graded"
    );

    // Flattened envelope kept for the kiosk client.
    Ok(ok_paper(&result))
}

fn ok_paper(result: &quiz::PaperResult) -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "success": true,
        "total_score": result.total_score,
        "max_score": result.max_score,
        "percentage": result.percentage,
        "passed": result.passed,
        "results": result.results,
    }))
}

// =============================================================================
// LEADERBOARD
// =============================================================================

/// `GET /api/leaderboard/{survey_id}` — ranked best scores.
pub async fn survey_leaderboard(State(state): State<AppState>, Path(survey_id): Path<String>) -> ApiResult {
    let entries = quiz::survey_leaderboard(&state.pool, &survey_id, LEADERBOARD_LIMIT)
        .await
        .map_err(quiz_error_to_api)?;
    Ok(ok(entries))
}

#[cfg(test)]
#[path = "quiz_test.rs"]
mod tests;
