use super::*;

#[test]
fn ok_wraps_payload_under_data() {
    let Json(body) = ok(json!({"id": "course-1234"}));
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["id"], "course-1234");
}

#[test]
fn ok_message_has_no_data_key() {
    let Json(body) = ok_message("deleted");
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "deleted");
    assert!(body.get("data").is_none());
}

#[test]
fn api_error_constructors_set_status() {
    assert_eq!(ApiError::bad_request("x").status, StatusCode::BAD_REQUEST);
    assert_eq!(ApiError::unauthorized("x").status, StatusCode::UNAUTHORIZED);
    assert_eq!(ApiError::forbidden("x").status, StatusCode::FORBIDDEN);
    assert_eq!(ApiError::not_found("x").status, StatusCode::NOT_FOUND);
    assert_eq!(ApiError::internal("x").status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(ApiError::bad_gateway("x").status, StatusCode::BAD_GATEWAY);
}

#[test]
fn api_error_renders_failure_envelope() {
    let resp = ApiError::not_found("course not found").into_response();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
