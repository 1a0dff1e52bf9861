use super::*;

#[test]
fn create_body_defaults_optional_fields() {
    let body: CreateSyllabusBody = serde_json::from_value(serde_json::json!({"name": "Onboarding"})).unwrap();
    assert_eq!(body.name.as_deref(), Some("Onboarding"));
    assert_eq!(body.description, "");
    assert_eq!(body.cover_image_url, "");
}

#[test]
fn add_course_body_defaults_is_optional() {
    let body: AddCourseBody = serde_json::from_value(serde_json::json!({"course_id": "course-1"})).unwrap();
    assert!(!body.is_optional);
}

#[test]
fn update_body_accepts_nested_structures() {
    let update: SyllabusUpdate = serde_json::from_value(serde_json::json!({
        "access_type": "restricted",
        "access_rules": {
            "allow_guests": false,
            "allowed_user_groups": ["grp-1"]
        },
        "time_config": {"type": "scheduled", "start_date": "2026-08-01T00:00:00Z", "end_date": null},
        "course_sequence": [{"course_id": "course-1", "order": 1}]
    }))
    .unwrap();
    assert_eq!(update.access_type.as_deref(), Some("restricted"));
    let rules = update.access_rules.unwrap();
    assert!(!rules.allow_guests);
    assert!(rules.allow_employees);
    assert_eq!(rules.allowed_user_groups, vec!["grp-1"]);
    let config = update.time_config.unwrap();
    assert_eq!(config.kind, "scheduled");
    assert!(config.start_date.is_some());
    assert!(config.end_date.is_none());
    assert!(!update.course_sequence.unwrap()[0].is_optional);
}

#[test]
fn invitation_request_parses_optional_fields() {
    let request: InvitationRequest = serde_json::from_value(serde_json::json!({})).unwrap();
    assert!(request.custom_code.is_none());
    assert!(request.max_uses.is_none());
    assert!(request.expires_at.is_none());

    let request: InvitationRequest = serde_json::from_value(serde_json::json!({
        "custom_code": "welcome26",
        "max_uses": 50,
        "expires_at": "2026-12-31T23:59:59Z"
    }))
    .unwrap();
    assert_eq!(request.custom_code.as_deref(), Some("welcome26"));
    assert_eq!(request.max_uses, Some(50));
    assert!(request.expires_at.is_some());
}
