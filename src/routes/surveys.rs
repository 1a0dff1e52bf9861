//! Survey routes — admin CRUD and the learner-facing catalog.

use axum::extract::{Path, State};
use chrono::Utc;

use crate::response::{ApiError, ApiResult, ok, ok_message};
use crate::routes::auth::{AdminKey, AuthUser};
use crate::services::quiz;
use crate::services::survey::{self, QuestionInput, SurveyError, SurveyInput, parse_correct_answer};
use crate::state::AppState;

pub(crate) fn survey_error_to_api(err: SurveyError) -> ApiError {
    match err {
        SurveyError::NotFound(id) => ApiError::not_found(format!("survey not found: {id}")),
        SurveyError::Validation(msg) => ApiError::bad_request(msg),
        SurveyError::Database(e) => {
            tracing::error!(error = %e, "survey query failed");
            ApiError::internal("internal error")
        }
    }
}

pub(crate) fn quiz_error_to_api(err: quiz::QuizError) -> ApiError {
    match err {
        quiz::QuizError::QuestionNotFound(id) => ApiError::not_found(format!("question not found: {id}")),
        quiz::QuizError::SurveyNotFound(id) => ApiError::not_found(format!("survey not found: {id}")),
        quiz::QuizError::Validation(msg) => ApiError::bad_request(msg),
        quiz::QuizError::Database(e) => {
            tracing::error!(error = %e, "quiz query failed");
            ApiError::internal("internal error")
        }
    }
}

// =============================================================================
// ADMIN
// =============================================================================

/// `GET /api/admin/surveys` — all surveys.
pub async fn admin_list_surveys(State(state): State<AppState>, _admin: AdminKey) -> ApiResult {
    let surveys = survey::get_all_surveys(&state.pool)
        .await
        .map_err(survey_error_to_api)?;
    Ok(ok(surveys))
}

/// `POST /api/admin/surveys` — create a survey.
pub async fn admin_create_survey(
    State(state): State<AppState>,
    _admin: AdminKey,
    axum::Json(input): axum::Json<SurveyInput>,
) -> ApiResult {
    let survey_id = survey::create_survey(&state.pool, &input)
        .await
        .map_err(survey_error_to_api)?;
    Ok(ok(serde_json::json!({ "survey_id": survey_id })))
}

/// `PUT /api/admin/surveys/{id}` — update a survey.
pub async fn admin_update_survey(
    State(state): State<AppState>,
    _admin: AdminKey,
    Path(survey_id): Path<String>,
    axum::Json(input): axum::Json<SurveyInput>,
) -> ApiResult {
    survey::update_survey(&state.pool, &survey_id, &input)
        .await
        .map_err(survey_error_to_api)?;
    Ok(ok_message("survey updated"))
}

/// `DELETE /api/admin/surveys/{id}` — delete a survey and its questions.
pub async fn admin_delete_survey(
    State(state): State<AppState>,
    _admin: AdminKey,
    Path(survey_id): Path<String>,
) -> ApiResult {
    survey::delete_survey(&state.pool, &survey_id)
        .await
        .map_err(survey_error_to_api)?;
    Ok(ok_message("survey deleted"))
}

#[derive(Debug, serde::Deserialize)]
pub struct AddQuestionsBody {
    pub survey_id: Option<String>,
    #[serde(default)]
    pub questions: Vec<QuestionInput>,
}

/// `POST /api/admin/questions` — append questions to a survey.
pub async fn admin_add_questions(
    State(state): State<AppState>,
    _admin: AdminKey,
    axum::Json(body): axum::Json<AddQuestionsBody>,
) -> ApiResult {
    let survey_id = body
        .survey_id
        .as_deref()
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("survey id must not be empty"))?;
    let added = survey::add_questions(&state.pool, survey_id, &body.questions)
        .await
        .map_err(survey_error_to_api)?;
    Ok(ok(serde_json::json!({ "added_count": added })))
}

// =============================================================================
// LEARNER
// =============================================================================

/// `GET /api/surveys` — active surveys with the caller's attempt counts.
pub async fn list_surveys(State(state): State<AppState>, auth: AuthUser) -> ApiResult {
    let surveys = survey::get_active_surveys(&state.pool)
        .await
        .map_err(survey_error_to_api)?;

    let mut annotated = Vec::with_capacity(surveys.len());
    for s in surveys {
        let attempts = quiz::user_attempts(&state.pool, &auth.session.user_id, &s.survey_id)
            .await
            .map_err(quiz_error_to_api)?;
        let remaining = (i64::from(s.max_attempts) - attempts).max(0);
        let mut value = serde_json::to_value(&s).unwrap_or_default();
        if let Some(map) = value.as_object_mut() {
            map.insert("user_attempts".into(), serde_json::json!(attempts));
            map.insert("remaining_attempts".into(), serde_json::json!(remaining));
        }
        annotated.push(value);
    }
    Ok(ok(annotated))
}

/// `GET /api/surveys/{id}` — one survey.
pub async fn get_survey(State(state): State<AppState>, _auth: AuthUser, Path(survey_id): Path<String>) -> ApiResult {
    let survey = survey::get_survey(&state.pool, &survey_id)
        .await
        .map_err(survey_error_to_api)?
        .ok_or_else(|| ApiError::not_found("survey not found"))?;
    Ok(ok(survey))
}

/// `GET /api/surveys/{id}/questions` — sampled questions with correct
/// answers translated to option text. Closed windows return 403.
///
/// Authentication is optional: known users get wrong-first sampling.
pub async fn get_questions(
    State(state): State<AppState>,
    auth: Option<AuthUser>,
    Path(survey_id): Path<String>,
) -> ApiResult {
    let survey = survey::get_survey(&state.pool, &survey_id)
        .await
        .map_err(survey_error_to_api)?
        .ok_or_else(|| ApiError::not_found("survey not found"))?;
    if let Err(reason) = survey::check_survey_window(&survey, Utc::now()) {
        return Err(ApiError::forbidden(reason));
    }

    let all = survey::get_questions(&state.pool, &survey_id)
        .await
        .map_err(survey_error_to_api)?;

    let wrong_ids = match &auth {
        Some(auth) => quiz::wrong_question_ids(&state.pool, &auth.session.user_id, &survey_id)
            .await
            .map_err(quiz_error_to_api)?,
        None => Vec::new(),
    };

    let mut rng = rand::rng();
    let selected = survey::select_questions_for_user(all, &wrong_ids, &mut rng);

    let safe: Vec<serde_json::Value> = selected
        .iter()
        .map(|q| {
            serde_json::json!({
                "id": q.question_id,
                "question_id": q.question_id,
                "question_type": q.question_type,
                "question_text": q.question_text,
                "options": q.options,
                "score": q.score,
                "correct_answer": parse_correct_answer(&q.correct_answer, &q.options),
            })
        })
        .collect();
    Ok(ok(safe))
}

/// `GET /api/surveys/{id}/study-content` — study material for a survey.
pub async fn get_study_content(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(survey_id): Path<String>,
) -> ApiResult {
    let survey = survey::get_survey(&state.pool, &survey_id)
        .await
        .map_err(survey_error_to_api)?
        .ok_or_else(|| ApiError::not_found("survey not found"))?;
    Ok(ok(serde_json::json!({
        "title": survey.title,
        "description": survey.description,
        "content": survey.study_content_html,
    })))
}

/// `GET /api/surveys/{id}/attempts` — the caller's attempt budget.
pub async fn get_attempts(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(survey_id): Path<String>,
) -> ApiResult {
    let survey = survey::get_survey(&state.pool, &survey_id)
        .await
        .map_err(survey_error_to_api)?
        .ok_or_else(|| ApiError::not_found("survey not found"))?;
    let current = quiz::user_attempts(&state.pool, &auth.session.user_id, &survey_id)
        .await
        .map_err(quiz_error_to_api)?;
    let max = i64::from(survey.max_attempts);
    Ok(ok(serde_json::json!({
        "current": current,
        "max": max,
        "remaining": (max - current).max(0),
    })))
}

#[cfg(test)]
#[path = "surveys_test.rs"]
mod tests;
