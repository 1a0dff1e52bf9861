use super::*;

#[test]
fn course_errors_map_to_expected_statuses() {
    assert_eq!(
        course_error_to_api(CourseError::NotFound("course-1".into())).status,
        StatusCode::NOT_FOUND
    );
    assert_eq!(
        course_error_to_api(CourseError::Validation("course title must not be empty".into())).status,
        StatusCode::BAD_REQUEST
    );
}

#[test]
fn reorder_body_defaults_to_empty() {
    let body: ReorderBody = serde_json::from_value(serde_json::json!({})).unwrap();
    assert!(body.course_ids.is_empty());
}

#[test]
fn link_quiz_body_defaults_pass_score() {
    let body: LinkQuizBody = serde_json::from_value(serde_json::json!({"survey_id": "s1"})).unwrap();
    assert_eq!(body.pass_score, 60);
    assert_eq!(body.survey_id.as_deref(), Some("s1"));
}

#[test]
fn link_quiz_body_accepts_custom_pass_score() {
    let body: LinkQuizBody =
        serde_json::from_value(serde_json::json!({"survey_id": "s1", "pass_score": 80})).unwrap();
    assert_eq!(body.pass_score, 80);
}
