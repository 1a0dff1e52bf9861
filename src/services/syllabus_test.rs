use super::*;
use rand::SeedableRng;
use rand::rngs::StdRng;

fn syllabus(id: &str) -> Syllabus {
    Syllabus {
        id: id.into(),
        name: "Onboarding".into(),
        description: "New hire track".into(),
        cover_image_url: String::new(),
        course_sequence: Vec::new(),
        access_type: "public".into(),
        access_rules: AccessRules::default(),
        time_config: TimeConfig::default(),
        is_published: true,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

fn guest(user_id: &str) -> AccessIdentity {
    AccessIdentity {
        user_id: user_id.into(),
        user_type: UserType::Guest,
        accessible_syllabi: Vec::new(),
        group_ids: Vec::new(),
    }
}

fn employee(user_id: &str) -> AccessIdentity {
    AccessIdentity {
        user_id: user_id.into(),
        user_type: UserType::Employee,
        accessible_syllabi: Vec::new(),
        group_ids: Vec::new(),
    }
}

fn item(course_id: &str, order: i32) -> CourseSeqItem {
    CourseSeqItem { course_id: course_id.into(), order, is_optional: false }
}

// =============================================================================
// COURSE SEQUENCE
// =============================================================================

#[test]
fn seq_add_appends_with_next_order() {
    let seq = seq_add(vec![item("c1", 1)], "c2", true);
    assert_eq!(seq.len(), 2);
    assert_eq!(seq[1].course_id, "c2");
    assert_eq!(seq[1].order, 2);
    assert!(seq[1].is_optional);
}

#[test]
fn seq_add_is_idempotent() {
    let seq = seq_add(vec![item("c1", 1)], "c1", false);
    assert_eq!(seq.len(), 1);
}

#[test]
fn seq_remove_renumbers() {
    let seq = seq_remove(vec![item("c1", 1), item("c2", 2), item("c3", 3)], "c2");
    assert_eq!(seq.len(), 2);
    assert_eq!(seq[0].course_id, "c1");
    assert_eq!(seq[0].order, 1);
    assert_eq!(seq[1].course_id, "c3");
    assert_eq!(seq[1].order, 2);
}

#[test]
fn seq_remove_unknown_id_is_noop() {
    let seq = seq_remove(vec![item("c1", 1)], "ghost");
    assert_eq!(seq.len(), 1);
}

#[test]
fn seq_reorder_follows_given_order_and_drops_unknowns() {
    let seq = seq_reorder(
        vec![item("c1", 1), item("c2", 2), item("c3", 3)],
        &["c3".into(), "ghost".into(), "c1".into()],
    );
    assert_eq!(seq.len(), 2);
    assert_eq!(seq[0].course_id, "c3");
    assert_eq!(seq[0].order, 1);
    assert_eq!(seq[1].course_id, "c1");
    assert_eq!(seq[1].order, 2);
}

// =============================================================================
// TIME WINDOWS
// =============================================================================

#[test]
fn permanent_config_is_always_valid() {
    assert!(is_time_valid(&TimeConfig::default(), Utc::now()));
}

#[test]
fn scheduled_config_enforces_bounds() {
    let now = Utc::now();
    let config = TimeConfig {
        kind: "scheduled".into(),
        start_date: Some(now - chrono::Duration::days(1)),
        end_date: Some(now + chrono::Duration::days(1)),
    };
    assert!(is_time_valid(&config, now));
    assert!(!is_time_valid(&config, now - chrono::Duration::days(2)));
    assert!(!is_time_valid(&config, now + chrono::Duration::days(2)));
}

#[test]
fn scheduled_config_with_open_ends() {
    let now = Utc::now();
    let config = TimeConfig { kind: "scheduled".into(), start_date: None, end_date: None };
    assert!(is_time_valid(&config, now));
}

// =============================================================================
// ACCESS DECISIONS
// =============================================================================

#[test]
fn unpublished_syllabus_is_never_accessible() {
    let mut s = syllabus("syl-1");
    s.is_published = false;
    assert!(!can_access(&guest("u1"), &s, Utc::now()));
    assert!(!can_access(&employee("emp_1"), &s, Utc::now()));
}

#[test]
fn public_syllabus_admits_everyone() {
    let s = syllabus("syl-1");
    assert!(can_access(&guest("u1"), &s, Utc::now()));
    assert!(can_access(&employee("emp_1"), &s, Utc::now()));
}

#[test]
fn expired_window_blocks_even_public() {
    let mut s = syllabus("syl-1");
    s.time_config = TimeConfig {
        kind: "scheduled".into(),
        start_date: None,
        end_date: Some(Utc::now() - chrono::Duration::days(1)),
    };
    assert!(!can_access(&guest("u1"), &s, Utc::now()));
}

#[test]
fn restricted_guest_allowed_without_gate() {
    let mut s = syllabus("syl-1");
    s.access_type = "restricted".into();
    s.access_rules.allow_guests = true;
    assert!(can_access(&guest("u1"), &s, Utc::now()));
}

#[test]
fn invitation_gate_closes_blanket_guest_access() {
    let mut s = syllabus("syl-1");
    s.access_type = "restricted".into();
    s.access_rules.allow_guests = true;
    s.access_rules.guest_invitation = Some(GuestInvitation {
        enabled: true,
        code: "WELD2026".into(),
        ..GuestInvitation::default()
    });
    assert!(!can_access(&guest("u1"), &s, Utc::now()));

    // A session grant from the code opens it again.
    let mut invited = guest("u1");
    invited.accessible_syllabi = vec!["syl-1".into()];
    assert!(can_access(&invited, &s, Utc::now()));
}

#[test]
fn restricted_employee_access_via_flag() {
    let mut s = syllabus("syl-1");
    s.access_type = "restricted".into();
    s.access_rules.allow_guests = false;
    s.access_rules.allow_employees = true;
    assert!(can_access(&employee("emp_1"), &s, Utc::now()));
    assert!(!can_access(&guest("u1"), &s, Utc::now()));
}

#[test]
fn allowed_users_list_admits_specific_user() {
    let mut s = syllabus("syl-1");
    s.access_type = "restricted".into();
    s.access_rules.allow_guests = false;
    s.access_rules.allow_employees = false;
    s.access_rules.allowed_users = vec!["u42".into()];
    assert!(can_access(&guest("u42"), &s, Utc::now()));
    assert!(!can_access(&guest("u43"), &s, Utc::now()));
}

#[test]
fn group_membership_admits_user() {
    let mut s = syllabus("syl-1");
    s.access_type = "restricted".into();
    s.access_rules.allow_guests = false;
    s.access_rules.allow_employees = false;
    s.access_rules.allowed_user_groups = vec!["grp-sales".into()];

    let mut member = guest("u1");
    member.group_ids = vec!["grp-sales".into()];
    assert!(can_access(&member, &s, Utc::now()));
    assert!(!can_access(&guest("u2"), &s, Utc::now()));
}

// =============================================================================
// INVITATION CODES
// =============================================================================

#[test]
fn generated_code_shape() {
    let mut rng = StdRng::seed_from_u64(9);
    let code = generate_invitation_code(&mut rng);
    assert_eq!(code.len(), 8);
    assert!(code.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
}

#[test]
fn generated_codes_differ() {
    let mut rng = StdRng::seed_from_u64(9);
    assert_ne!(generate_invitation_code(&mut rng), generate_invitation_code(&mut rng));
}

fn invitation(code: &str) -> GuestInvitation {
    GuestInvitation { enabled: true, code: code.into(), ..GuestInvitation::default() }
}

#[test]
fn invitation_expiry_and_exhaustion_flags() {
    let now = Utc::now();
    let mut inv = invitation("CODE1234");
    assert!(!invitation_expired(&inv, now));
    assert!(!invitation_exhausted(&inv));

    inv.expires_at = Some(now - chrono::Duration::hours(1));
    assert!(invitation_expired(&inv, now));

    inv.max_uses = Some(3);
    inv.current_uses = 3;
    assert!(invitation_exhausted(&inv));
    inv.current_uses = 2;
    assert!(!invitation_exhausted(&inv));
}

#[test]
fn validate_invitation_matches_case_insensitively() {
    let mut s = syllabus("syl-1");
    s.access_rules.guest_invitation = Some(invitation("WELD2026"));
    assert!(validate_invitation_for(&s, "weld2026", Utc::now()).is_ok());
}

#[test]
fn validate_invitation_rejects_unpublished() {
    let mut s = syllabus("syl-1");
    s.is_published = false;
    s.access_rules.guest_invitation = Some(invitation("WELD2026"));
    assert!(validate_invitation_for(&s, "WELD2026", Utc::now()).is_err());
}

#[test]
fn validate_invitation_rejects_expired_with_reason() {
    let mut s = syllabus("syl-1");
    let mut inv = invitation("WELD2026");
    inv.expires_at = Some(Utc::now() - chrono::Duration::hours(1));
    s.access_rules.guest_invitation = Some(inv);
    let reason = validate_invitation_for(&s, "WELD2026", Utc::now()).unwrap_err();
    assert!(reason.contains("expired"));
}

#[test]
fn validate_invitation_rejects_exhausted_with_reason() {
    let mut s = syllabus("syl-1");
    let mut inv = invitation("WELD2026");
    inv.max_uses = Some(1);
    inv.current_uses = 1;
    s.access_rules.guest_invitation = Some(inv);
    let reason = validate_invitation_for(&s, "WELD2026", Utc::now()).unwrap_err();
    assert!(reason.contains("usage limit"));
}

#[test]
fn validate_invitation_rejects_disabled_code() {
    let mut s = syllabus("syl-1");
    let mut inv = invitation("WELD2026");
    inv.enabled = false;
    s.access_rules.guest_invitation = Some(inv);
    assert!(validate_invitation_for(&s, "WELD2026", Utc::now()).is_err());
}

#[test]
fn validate_invitation_rejects_closed_window() {
    let mut s = syllabus("syl-1");
    s.access_rules.guest_invitation = Some(invitation("WELD2026"));
    s.time_config = TimeConfig {
        kind: "scheduled".into(),
        start_date: Some(Utc::now() + chrono::Duration::days(1)),
        end_date: None,
    };
    let reason = validate_invitation_for(&s, "WELD2026", Utc::now()).unwrap_err();
    assert!(reason.contains("not open"));
}

// =============================================================================
// SERDE DEFAULTS
// =============================================================================

#[test]
fn access_rules_default_open_to_both_types() {
    let rules: AccessRules = serde_json::from_value(serde_json::json!({})).unwrap();
    assert!(rules.allow_guests);
    assert!(rules.allow_employees);
    assert!(rules.guest_invitation.is_none());
}

#[test]
fn time_config_serializes_type_field() {
    let json = serde_json::to_value(TimeConfig::default()).unwrap();
    assert_eq!(json["type"], "permanent");
}

#[test]
fn invitation_info_flattens_code_fields() {
    let info = InvitationInfo {
        invitation: invitation("WELD2026"),
        is_expired: false,
        is_exhausted: false,
    };
    let json = serde_json::to_value(&info).unwrap();
    assert_eq!(json["code"], "WELD2026");
    assert_eq!(json["is_expired"], false);
    assert_eq!(json["enabled"], true);
}
