use super::*;

#[test]
fn login_body_defaults_to_guest() {
    let body: LoginBody = serde_json::from_value(serde_json::json!({
        "name": "Li Na",
        "company": "Acme",
        "phone": "13800000000"
    }))
    .unwrap();
    assert_eq!(body.login_type, "guest");
    assert!(!body.remember_me);
    assert!(body.invitation_code.is_none());
}

#[test]
fn login_body_parses_employee_mode() {
    let body: LoginBody = serde_json::from_value(serde_json::json!({
        "login_type": "employee",
        "username": "zwei",
        "password": "secret",
        "remember_me": true
    }))
    .unwrap();
    assert_eq!(body.login_type, "employee");
    assert_eq!(body.username.as_deref(), Some("zwei"));
    assert!(body.remember_me);
}

#[test]
fn auth_errors_map_to_expected_statuses() {
    assert_eq!(
        auth_error_to_api(AuthError::Validation("bad phone".into())).status,
        StatusCode::BAD_REQUEST
    );
    assert_eq!(
        auth_error_to_api(AuthError::InvalidCredentials).status,
        StatusCode::UNAUTHORIZED
    );
    assert_eq!(
        auth_error_to_api(AuthError::DirectoryNotConfigured).status,
        StatusCode::SERVICE_UNAVAILABLE
    );
    assert_eq!(
        auth_error_to_api(AuthError::DirectoryUnavailable("timeout".into())).status,
        StatusCode::BAD_GATEWAY
    );
}

#[test]
fn syllabus_errors_map_to_expected_statuses() {
    assert_eq!(
        syllabus_error_to_api(SyllabusError::NotFound("syl-1".into())).status,
        StatusCode::NOT_FOUND
    );
    assert_eq!(
        syllabus_error_to_api(SyllabusError::Validation("invitation code has expired".into())).status,
        StatusCode::BAD_REQUEST
    );
}

#[test]
fn validation_message_is_preserved_for_the_client() {
    let err = auth_error_to_api(AuthError::Validation("invalid phone number".into()));
    assert_eq!(err.message, "invalid phone number");
}
