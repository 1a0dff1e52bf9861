use super::*;
use std::collections::BTreeMap;

fn candidate(user_id: &str, score: i32) -> Candidate {
    Candidate {
        user_id: user_id.into(),
        score,
        max_score: 100,
        xp_earned: 50,
        course_scores: serde_json::json!({}),
    }
}

// =============================================================================
// RANKING
// =============================================================================

#[test]
fn ranking_is_descending_by_score() {
    let ranked = rank_candidates(vec![candidate("u1", 40), candidate("u2", 90), candidate("u3", 70)]);
    assert_eq!(ranked[0].0, 1);
    assert_eq!(ranked[0].1.user_id, "u2");
    assert_eq!(ranked[1].1.user_id, "u3");
    assert_eq!(ranked[2].0, 3);
    assert_eq!(ranked[2].1.user_id, "u1");
}

#[test]
fn ranking_breaks_ties_by_user_id() {
    let ranked = rank_candidates(vec![candidate("zeta", 80), candidate("alpha", 80)]);
    assert_eq!(ranked[0].1.user_id, "alpha");
    assert_eq!(ranked[1].1.user_id, "zeta");
}

#[test]
fn ranking_empty_input() {
    assert!(rank_candidates(Vec::new()).is_empty());
}

// =============================================================================
// PERCENTAGES
// =============================================================================

#[test]
fn rounded_percentage_rounds_half_up() {
    assert_eq!(rounded_percentage(85, 100), 85);
    assert_eq!(rounded_percentage(1, 3), 33);
    assert_eq!(rounded_percentage(2, 3), 67);
    assert_eq!(rounded_percentage(0, 0), 0);
}

// =============================================================================
// XP EXTRACTION
// =============================================================================

#[test]
fn syllabus_xp_reads_matching_key() {
    let mut snapshot = Progress::default();
    snapshot.xp_by_syllabus = BTreeMap::from([("syl-a".to_string(), 150i64)]);
    assert_eq!(syllabus_xp(&snapshot, "syl-a"), 150);
    assert_eq!(syllabus_xp(&snapshot, "syl-b"), 0);
}

// =============================================================================
// WIRE SHAPE
// =============================================================================

#[test]
fn certificate_serializes_course_breakdown() {
    let cert = Certificate {
        certificate_id: "cert-0a1b2c3d".into(),
        user_id: "emp_5".into(),
        user_name: "Zhang Wei".into(),
        user_company: "Acme".into(),
        syllabus_id: "syl-1".into(),
        syllabus_name: "Onboarding".into(),
        score: 85,
        max_score: 100,
        percentage: 85,
        xp_earned: 210,
        rank: 1,
        total_participants: 12,
        course_scores: serde_json::json!({
            "course-1": {"title": "Radio Basics", "score": 45, "max_score": 50, "percentage": 90}
        }),
        issued_at: Utc::now(),
        issued_by: "admin".into(),
    };
    let json = serde_json::to_value(&cert).unwrap();
    assert_eq!(json["certificate_id"], "cert-0a1b2c3d");
    assert_eq!(json["rank"], 1);
    assert_eq!(json["course_scores"]["course-1"]["percentage"], 90);
}
