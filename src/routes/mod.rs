//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! Two surfaces hang off one Axum router: the admin API (key-gated via the
//! `X-API-Key` header) and the learner API (bearer sessions). Handlers do
//! protocol translation only; domain logic lives in the service modules.

pub mod analytics;
pub mod auth;
pub mod badges;
pub mod certificates;
pub mod courses;
pub mod groups;
pub mod import;
pub mod progress;
pub mod quiz;
pub mod surveys;
pub mod syllabi;
pub mod users;

use axum::Router;
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::{delete, get, post, put};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the full application router.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Auth.
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/validate-invitation-code", post(auth::validate_invitation_code))
        .route("/api/auth/me", get(auth::me))
        .route("/api/auth/logout", post(auth::logout))
        // Admin surveys + question import.
        .route("/api/admin/surveys", get(surveys::admin_list_surveys).post(surveys::admin_create_survey))
        .route(
            "/api/admin/surveys/{id}",
            put(surveys::admin_update_survey).delete(surveys::admin_delete_survey),
        )
        .route("/api/admin/questions", post(surveys::admin_add_questions))
        .route("/api/admin/import-quiz", post(import::import_quiz))
        .route("/api/admin/import-quiz/confirm", post(import::confirm_import))
        .route("/api/admin/quiz-template", get(import::quiz_template))
        // Admin courses.
        .route("/api/admin/courses", get(courses::admin_list_courses).post(courses::admin_create_course))
        .route("/api/admin/courses/reorder", post(courses::admin_reorder_courses))
        .route(
            "/api/admin/courses/{id}",
            get(courses::admin_get_course)
                .put(courses::admin_update_course)
                .delete(courses::admin_delete_course),
        )
        .route("/api/admin/courses/{id}/link-quiz", post(courses::admin_link_quiz))
        // Admin syllabi.
        .route("/api/admin/syllabi", get(syllabi::admin_list).post(syllabi::admin_create))
        .route(
            "/api/admin/syllabi/{id}",
            get(syllabi::admin_get)
                .put(syllabi::admin_update)
                .delete(syllabi::admin_delete),
        )
        .route("/api/admin/syllabi/{id}/publish", post(syllabi::admin_publish))
        .route("/api/admin/syllabi/{id}/unpublish", post(syllabi::admin_unpublish))
        .route("/api/admin/syllabi/{id}/courses", post(syllabi::admin_add_course))
        .route("/api/admin/syllabi/{id}/courses/reorder", post(syllabi::admin_reorder_courses))
        .route(
            "/api/admin/syllabi/{id}/courses/{course_id}",
            delete(syllabi::admin_remove_course),
        )
        .route(
            "/api/admin/syllabi/{id}/invitation-code",
            get(syllabi::admin_get_invitation)
                .post(syllabi::admin_create_invitation)
                .delete(syllabi::admin_delete_invitation),
        )
        // Admin user groups + user lookup.
        .route("/api/admin/user-groups", get(groups::list_groups).post(groups::create_group))
        .route(
            "/api/admin/user-groups/{id}",
            get(groups::get_group)
                .put(groups::update_group)
                .delete(groups::delete_group),
        )
        .route("/api/admin/user-groups/{id}/members", post(groups::add_members))
        .route(
            "/api/admin/user-groups/{id}/members/{user_id}",
            delete(groups::remove_member),
        )
        .route("/api/admin/users/search", get(users::search_users))
        .route("/api/admin/users/all", get(users::list_users))
        // Admin certificates, analytics, maintenance.
        .route("/api/admin/certificates/issue/{syllabus_id}", post(certificates::admin_issue))
        .route(
            "/api/admin/certificates/syllabus/{syllabus_id}",
            get(certificates::admin_list_for_syllabus),
        )
        .route("/api/admin/learning-analytics", get(analytics::syllabus_detail))
        .route("/api/admin/learning-analytics/syllabi", get(analytics::syllabi_overview))
        .route("/api/admin/migrate/recalculate-xp", post(progress::recalculate_xp))
        // Learner courses.
        .route("/api/courses", get(courses::list_courses))
        .route("/api/courses/{id}", get(courses::get_course))
        .route("/api/courses/{id}/content.pdf", get(courses::serve_course_pdf))
        // Learner syllabi.
        .route("/api/syllabi", get(syllabi::list_accessible))
        .route("/api/syllabi/{id}", get(syllabi::get_accessible))
        .route("/api/syllabi/{id}/courses", get(syllabi::get_syllabus_courses))
        // Learner surveys + quiz flow.
        .route("/api/surveys", get(surveys::list_surveys))
        .route("/api/surveys/{id}", get(surveys::get_survey))
        .route("/api/surveys/{id}/questions", get(surveys::get_questions))
        .route("/api/surveys/{id}/study-content", get(surveys::get_study_content))
        .route("/api/surveys/{id}/attempts", get(surveys::get_attempts))
        .route("/api/quiz/submit", post(quiz::submit_paper))
        .route("/api/quiz/submit-answer", post(quiz::submit_answer))
        .route("/api/quiz/start/{survey_id}", post(quiz::start_quiz))
        .route("/api/quiz/wrong/{survey_id}", get(quiz::wrong_questions))
        .route("/api/quiz/finish", post(quiz::finish_quiz))
        .route("/api/leaderboard/{survey_id}", get(quiz::survey_leaderboard))
        // Learner progress, certificates, badges.
        .route("/api/progress", get(progress::get_progress).post(progress::save_progress))
        .route("/api/progress/sync", post(progress::sync_progress))
        .route("/api/progress/leaderboard", get(progress::xp_leaderboard))
        .route("/api/certificates", get(certificates::list_mine))
        .route("/api/certificates/{certificate_id}", get(certificates::get_mine))
        .route("/api/badges", get(badges::list_badges))
        .route("/api/badges/{badge_id}", get(badges::get_badge))
        // Health.
        .route("/healthz", get(healthz))
        .route("/api/health", get(health))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
