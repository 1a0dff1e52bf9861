use super::*;
use crate::services::syllabus::{AccessRules, CourseSeqItem, TimeConfig};
use chrono::Utc;
use std::collections::BTreeMap;

fn progress_with_xp(syllabus_id: &str, xp: i64) -> Progress {
    let mut p = Progress::default();
    p.xp_by_syllabus = BTreeMap::from([(syllabus_id.to_string(), xp)]);
    p
}

fn syllabus_with_courses(course_ids: &[&str]) -> Syllabus {
    Syllabus {
        id: "syl-1".into(),
        name: "Onboarding".into(),
        description: String::new(),
        cover_image_url: String::new(),
        course_sequence: course_ids
            .iter()
            .enumerate()
            .map(|(idx, id)| CourseSeqItem {
                course_id: (*id).to_string(),
                order: i32::try_from(idx).unwrap() + 1,
                is_optional: false,
            })
            .collect(),
        access_type: "public".into(),
        access_rules: AccessRules::default(),
        time_config: TimeConfig::default(),
        is_published: true,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

fn user_row(user_id: &str, xp: i32, completed_all: bool, pct: f64) -> UserAnalytics {
    UserAnalytics {
        user_id: user_id.into(),
        name: user_id.into(),
        company: String::new(),
        xp_earned: xp,
        courses_completed: 1,
        total_courses: 2,
        quizzes_passed: usize::from(completed_all),
        total_quizzes: 1,
        average_score_percentage: pct,
        completed_all,
    }
}

// =============================================================================
// PARTICIPANT COUNTING
// =============================================================================

#[test]
fn counts_only_users_with_xp_for_the_syllabus() {
    let all = vec![
        ("u1".to_string(), progress_with_xp("syl-1", 100)),
        ("u2".to_string(), progress_with_xp("syl-2", 100)),
        ("u3".to_string(), progress_with_xp("syl-1", 0)),
    ];
    assert_eq!(count_participants(&all, "syl-1"), 1);
    assert_eq!(count_participants(&all, "syl-2"), 1);
    assert_eq!(count_participants(&all, "syl-3"), 0);
}

// =============================================================================
// COURSE COMPLETION
// =============================================================================

#[test]
fn completion_intersects_progress_with_sequence() {
    let syllabus = syllabus_with_courses(&["course-a", "course-b", "course-c"]);
    let mut snapshot = Progress::default();
    snapshot.courses_completed = vec!["course-a".into(), "course-c".into(), "course-unrelated".into()];
    assert_eq!(courses_completed_in(&snapshot, &syllabus), 2);
}

#[test]
fn completion_of_empty_sequence_is_zero() {
    let syllabus = syllabus_with_courses(&[]);
    let snapshot = Progress::default();
    assert_eq!(courses_completed_in(&snapshot, &syllabus), 0);
}

// =============================================================================
// SUMMARY
// =============================================================================

#[test]
fn summary_of_empty_rows_is_zeroed() {
    let summary = summarize(&[]);
    assert_eq!(summary.participants, 0);
    assert_eq!(summary.completed_all, 0);
    assert!((summary.average_xp - 0.0).abs() < f64::EPSILON);
}

#[test]
fn summary_averages_round_to_two_decimals() {
    let rows = vec![
        user_row("u1", 100, true, 90.0),
        user_row("u2", 50, false, 70.0),
        user_row("u3", 25, true, 50.0),
    ];
    let summary = summarize(&rows);
    assert_eq!(summary.participants, 3);
    assert_eq!(summary.completed_all, 2);
    assert!((summary.average_xp - 58.33).abs() < 0.001);
    assert!((summary.average_score_percentage - 70.0).abs() < 0.001);
}
