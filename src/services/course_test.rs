use super::*;

// =============================================================================
// PDF HELPERS
// =============================================================================

fn synthetic_pdf(pages: usize) -> Vec<u8> {
    let mut data = b"%PDF-1.4\n".to_vec();
    data.extend_from_slice(b"1 0 obj << /Type /Pages /Kids [] >> endobj\n");
    for i in 0..pages {
        data.extend_from_slice(format!("{} 0 obj << /Type /Page /Parent 1 0 R >> endobj\n", i + 2).as_bytes());
    }
    data.extend_from_slice(b"%%EOF");
    data
}

#[test]
fn is_pdf_checks_magic_bytes() {
    assert!(is_pdf(b"%PDF-1.7 rest"));
    assert!(!is_pdf(b"PK\x03\x04"));
    assert!(!is_pdf(b""));
}

#[test]
fn count_pages_on_synthetic_document() {
    assert_eq!(count_pdf_pages(&synthetic_pdf(3)), 3);
    assert_eq!(count_pdf_pages(&synthetic_pdf(1)), 1);
}

#[test]
fn count_pages_excludes_pages_tree_nodes() {
    assert_eq!(count_pdf_pages(b"<< /Type /Pages >>"), 0);
}

#[test]
fn count_pages_handles_no_space_variant() {
    assert_eq!(count_pdf_pages(b"<< /Type/Page >> << /Type/Page >>"), 2);
}

#[test]
fn count_pages_of_garbage_is_zero() {
    assert_eq!(count_pdf_pages(b"not a pdf at all"), 0);
}

#[test]
fn duration_estimate_has_floor() {
    assert_eq!(estimate_duration_minutes(0), 5);
    assert_eq!(estimate_duration_minutes(1), 5);
    assert_eq!(estimate_duration_minutes(3), 6);
    assert_eq!(estimate_duration_minutes(20), 40);
}

#[test]
fn sha256_hex_is_stable() {
    // sha256("") is a fixed vector.
    assert_eq!(
        sha256_hex(b""),
        "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
    );
    assert_eq!(sha256_hex(b"abc").len(), 64);
}

#[test]
fn pdf_path_layout() {
    let path = pdf_path("/data/courses", "course-0a1b2c3d");
    assert_eq!(path, PathBuf::from("/data/courses/course-0a1b2c3d/content.pdf"));
}

// =============================================================================
// CREATE VALIDATION
// =============================================================================

#[test]
fn empty_title_is_rejected_before_any_write() {
    let input = NewCourse { title: "   ".into(), ..NewCourse::default() };
    let err = validate_new_course(&input, &synthetic_pdf(1)).unwrap_err();
    assert!(matches!(err, CourseError::Validation(_)));
}

#[test]
fn non_pdf_upload_is_rejected() {
    let input = NewCourse { title: "Radio Basics".into(), ..NewCourse::default() };
    let err = validate_new_course(&input, b"PK\x03\x04not a pdf").unwrap_err();
    assert!(matches!(err, CourseError::Validation(_)));
}

#[test]
fn valid_upload_passes_validation() {
    let input = NewCourse { title: "Radio Basics".into(), ..NewCourse::default() };
    assert!(validate_new_course(&input, &synthetic_pdf(2)).is_ok());
}

// =============================================================================
// WIRE SHAPE
// =============================================================================

#[test]
fn course_serializes_client_field_names() {
    let course = Course {
        id: "course-0a1b2c3d".into(),
        title: "Radio Basics".into(),
        description: String::new(),
        course_type: "pdf".into(),
        media_url: "/api/courses/course-0a1b2c3d/content.pdf".into(),
        total_pages: 12,
        duration_minutes: 24,
        order_index: 1,
        tags: vec!["radio".into()],
        prerequisites: Vec::new(),
        is_published: true,
        icon: None,
        quiz: Some(CourseQuiz { survey_id: "s1".into(), pass_score: 60 }),
        content_sha256: "deadbeef".into(),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    };
    let json = serde_json::to_value(&course).unwrap();
    assert_eq!(json["type"], "pdf");
    assert_eq!(json["mediaUrl"], "/api/courses/course-0a1b2c3d/content.pdf");
    assert_eq!(json["totalPages"], 12);
    assert_eq!(json["order"], 1);
    assert_eq!(json["quiz"]["survey_id"], "s1");
    assert!(json.get("order_index").is_none());
}

#[test]
fn course_without_quiz_omits_the_field() {
    let course = Course {
        id: "course-1".into(),
        title: "t".into(),
        description: String::new(),
        course_type: "pdf".into(),
        media_url: String::new(),
        total_pages: 0,
        duration_minutes: 5,
        order_index: 1,
        tags: Vec::new(),
        prerequisites: Vec::new(),
        is_published: true,
        icon: None,
        quiz: None,
        content_sha256: String::new(),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    };
    let json = serde_json::to_value(&course).unwrap();
    assert!(json.get("quiz").is_none());
}

// =============================================================================
// UPDATE PAYLOAD
// =============================================================================

#[test]
fn update_distinguishes_absent_from_null_quiz() {
    let absent: CourseUpdate = serde_json::from_value(serde_json::json!({"title": "New"})).unwrap();
    assert!(absent.quiz.is_none());

    let cleared: CourseUpdate = serde_json::from_value(serde_json::json!({"quiz": null})).unwrap();
    assert_eq!(cleared.quiz, Some(None));

    let set: CourseUpdate =
        serde_json::from_value(serde_json::json!({"quiz": {"survey_id": "s9", "pass_score": 70}})).unwrap();
    let quiz = set.quiz.unwrap().unwrap();
    assert_eq!(quiz.survey_id, "s9");
    assert_eq!(quiz.pass_score, 70);
}

#[test]
fn update_maps_order_field_name() {
    let update: CourseUpdate = serde_json::from_value(serde_json::json!({"order": 4})).unwrap();
    assert_eq!(update.order_index, Some(4));
}
