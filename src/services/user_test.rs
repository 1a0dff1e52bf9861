use super::*;

#[test]
fn guest_user_id_format() {
    let id = guest_user_id();
    let tail = id.strip_prefix("guest_").unwrap();
    assert_eq!(tail.len(), 8);
    assert!(tail.chars().all(|c| c.is_ascii_hexdigit()));
}

#[test]
fn guest_user_ids_differ() {
    assert_ne!(guest_user_id(), guest_user_id());
}

#[test]
fn escape_like_neutralizes_wildcards() {
    assert_eq!(escape_like("50%_off"), "50\\%\\_off");
    assert_eq!(escape_like("back\\slash"), "back\\\\slash");
    assert_eq!(escape_like("plain"), "plain");
}

#[test]
fn user_serializes_expected_fields() {
    let user = User {
        user_id: "guest_0a1b2c3d".into(),
        name: "Li Na".into(),
        company: "Acme".into(),
        phone: "13800000000".into(),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    };
    let json = serde_json::to_value(&user).unwrap();
    assert_eq!(json["user_id"], "guest_0a1b2c3d");
    assert_eq!(json["name"], "Li Na");
    assert_eq!(json["company"], "Acme");
    assert_eq!(json["phone"], "13800000000");
    assert!(json["created_at"].is_string());
}
