use super::*;

#[test]
fn add_members_deduplicates() {
    let merged = add_members(vec!["u1".into(), "u2".into()], &["u2".into(), "u3".into()]);
    assert_eq!(merged, vec!["u1", "u2", "u3"]);
}

#[test]
fn add_members_to_empty_group() {
    let merged = add_members(Vec::new(), &["u1".into()]);
    assert_eq!(merged, vec!["u1"]);
}

#[test]
fn add_members_keeps_existing_order() {
    let merged = add_members(vec!["b".into(), "a".into()], &["c".into()]);
    assert_eq!(merged, vec!["b", "a", "c"]);
}

#[test]
fn group_serializes_member_ids() {
    let group = UserGroup {
        id: "grp-0a1b2c3d".into(),
        name: "Sales".into(),
        description: String::new(),
        member_ids: vec!["emp_1".into(), "guest_aa11bb22".into()],
        created_at: Utc::now(),
        updated_at: Utc::now(),
    };
    let json = serde_json::to_value(&group).unwrap();
    assert_eq!(json["id"], "grp-0a1b2c3d");
    assert_eq!(json["member_ids"][1], "guest_aa11bb22");
}
