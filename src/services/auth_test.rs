use super::*;

// =============================================================================
// VALIDATORS
// =============================================================================

#[test]
fn validate_name_rejects_blank_and_oversized() {
    assert!(validate_name("Li Na"));
    assert!(!validate_name("   "));
    assert!(!validate_name(""));
    assert!(!validate_name(&"x".repeat(51)));
    assert!(validate_name(&"x".repeat(50)));
}

#[test]
fn validate_company_bounds() {
    assert!(validate_company("Acme Industrial"));
    assert!(!validate_company(" "));
    assert!(!validate_company(&"c".repeat(101)));
}

#[test]
fn validate_phone_accepts_digits_plus_dash_space() {
    assert!(validate_phone("13800000000"));
    assert!(validate_phone("+86 138-0000-0000"));
    assert!(validate_phone("  13800000000  "));
}

#[test]
fn validate_phone_rejects_short_long_and_letters() {
    assert!(!validate_phone("12345"));
    assert!(!validate_phone(&"1".repeat(21)));
    assert!(!validate_phone("1380000000a"));
    assert!(!validate_phone(""));
}

// =============================================================================
// EMPLOYEE IDS
// =============================================================================

#[test]
fn employee_user_id_is_prefixed() {
    let record = EmployeeRecord {
        employee_id: "17".into(),
        username: "zwei".into(),
        real_name: "Zhang Wei".into(),
        company: "Acme".into(),
        email: None,
        phone: None,
    };
    assert_eq!(employee_user_id(&record), "emp_17");
}

// =============================================================================
// WIRE SHAPE
// =============================================================================

#[test]
fn guest_outcome_omits_employee_info() {
    let outcome = LoginOutcome {
        user_id: "guest_0a1b2c3d".into(),
        name: "Li Na".into(),
        company: "Acme".into(),
        phone: Some("13800000000".into()),
        user_type: UserType::Guest,
        token: "t".repeat(64),
        remember_me: false,
        progress: Progress::default(),
        accessible_syllabi: vec!["syl-12345678".into()],
        employee_info: None,
    };
    let json = serde_json::to_value(&outcome).unwrap();
    assert_eq!(json["user_type"], "guest");
    assert!(json.get("employee_info").is_none());
    assert_eq!(json["accessible_syllabi"][0], "syl-12345678");
    assert_eq!(json["progress"]["hearts"], 5);
}

#[test]
fn employee_outcome_carries_directory_profile() {
    let outcome = LoginOutcome {
        user_id: "emp_17".into(),
        name: "Zhang Wei".into(),
        company: "Acme".into(),
        phone: None,
        user_type: UserType::Employee,
        token: "t".repeat(64),
        remember_me: true,
        progress: Progress::default(),
        accessible_syllabi: Vec::new(),
        employee_info: Some(EmployeeInfo {
            employee_id: "17".into(),
            username: "zwei".into(),
            email: Some("z@acme.example".into()),
            phone: None,
        }),
    };
    let json = serde_json::to_value(&outcome).unwrap();
    assert_eq!(json["user_type"], "employee");
    assert_eq!(json["employee_info"]["employee_id"], "17");
    assert!(json.get("phone").is_none());
}
