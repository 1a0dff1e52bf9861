use super::*;

fn base() -> Progress {
    Progress::default()
}

// =============================================================================
// SERDE SHAPE
// =============================================================================

#[test]
fn progress_serializes_camel_case() {
    let json = serde_json::to_value(base()).unwrap();
    assert_eq!(json["totalXP"], 0);
    assert_eq!(json["maxHearts"], 5);
    assert_eq!(json["dailyGoalMinutes"], 10);
    assert_eq!(json["onboardingCompleted"], false);
    assert!(json["xpBySyllabus"].is_object());
    assert!(json.get("total_xp").is_none());
}

#[test]
fn progress_deserializes_partial_payload_with_defaults() {
    let progress: Progress = serde_json::from_value(serde_json::json!({
        "totalXP": 120,
        "hearts": 3
    }))
    .unwrap();
    assert_eq!(progress.total_xp, 120);
    assert_eq!(progress.hearts, 3);
    assert_eq!(progress.max_hearts, 5);
    assert_eq!(progress.current_chapter, 1);
    assert!(progress.courses_completed.is_empty());
}

#[test]
fn default_progress_matches_fresh_learner() {
    let p = base();
    assert_eq!(p.hearts, 5);
    assert_eq!(p.daily_goal_minutes, 10);
    assert_eq!(p.current_chapter, 1);
    assert_eq!(p.current_section, 0);
    assert!(!p.first_login_reward_claimed);
}

// =============================================================================
// MERGE
// =============================================================================

#[test]
fn merge_takes_max_of_cumulative_values() {
    let mut server = base();
    server.total_xp = 300;
    server.total_reading_time = 50;
    let mut client = base();
    client.total_xp = 250;
    client.total_reading_time = 80;

    let merged = merge_progress(&server, &client);
    assert_eq!(merged.total_xp, 300);
    assert_eq!(merged.total_reading_time, 80);
}

#[test]
fn merge_takes_client_for_live_state() {
    let mut server = base();
    server.hearts = 5;
    server.current_chapter = 2;
    server.streak = 9;
    let mut client = base();
    client.hearts = 2;
    client.current_chapter = 4;
    client.streak = 3;
    client.last_read_date = Some("2026-08-07".into());

    let merged = merge_progress(&server, &client);
    assert_eq!(merged.hearts, 2);
    assert_eq!(merged.current_chapter, 4);
    assert_eq!(merged.streak, 3);
    assert_eq!(merged.last_read_date.as_deref(), Some("2026-08-07"));
}

#[test]
fn merge_unions_collections_without_duplicates() {
    let mut server = base();
    server.achievements = vec!["first-quiz".into(), "streak-7".into()];
    server.courses_completed = vec!["course-aaaa".into()];
    let mut client = base();
    client.achievements = vec!["streak-7".into(), "night-owl".into()];
    client.courses_completed = vec!["course-aaaa".into(), "course-bbbb".into()];

    let merged = merge_progress(&server, &client);
    assert_eq!(merged.achievements, vec!["first-quiz", "streak-7", "night-owl"]);
    assert_eq!(merged.courses_completed, vec!["course-aaaa", "course-bbbb"]);
}

#[test]
fn merge_ors_booleans() {
    let mut server = base();
    server.onboarding_completed = true;
    let client = base();

    let merged = merge_progress(&server, &client);
    assert!(merged.onboarding_completed);
    assert!(!merged.first_login_reward_claimed);
}

#[test]
fn merge_wrong_questions_client_wins_per_id() {
    let mut server = base();
    server.wrong_questions = vec![
        serde_json::json!({"id": "q1", "misses": 1}),
        serde_json::json!({"id": "q2", "misses": 2}),
    ];
    let mut client = base();
    client.wrong_questions = vec![
        serde_json::json!({"id": "q2", "misses": 3}),
        serde_json::json!({"id": "q3", "misses": 1}),
    ];

    let merged = merge_progress(&server, &client);
    assert_eq!(merged.wrong_questions.len(), 3);
    let q2 = merged
        .wrong_questions
        .iter()
        .find(|q| q["id"] == "q2")
        .unwrap();
    assert_eq!(q2["misses"], 3);
}

#[test]
fn merge_wrong_questions_drops_records_without_id() {
    let mut server = base();
    server.wrong_questions = vec![serde_json::json!({"misses": 1})];
    let merged = merge_progress(&server, &base());
    assert!(merged.wrong_questions.is_empty());
}

#[test]
fn merge_xp_by_syllabus_takes_per_key_max() {
    let mut server = base();
    server.xp_by_syllabus = BTreeMap::from([("syl-a".to_string(), 150), ("syl-b".to_string(), 40)]);
    let mut client = base();
    client.xp_by_syllabus = BTreeMap::from([("syl-a".to_string(), 120), ("syl-c".to_string(), 60)]);

    let merged = merge_progress(&server, &client);
    assert_eq!(merged.xp_by_syllabus["syl-a"], 150);
    assert_eq!(merged.xp_by_syllabus["syl-b"], 40);
    assert_eq!(merged.xp_by_syllabus["syl-c"], 60);
}

// =============================================================================
// LEADERBOARD RANKING
// =============================================================================

#[test]
fn rank_entries_assigns_sequential_ranks() {
    let entries = rank_entries(vec![
        ("u1".into(), 300, Some("Ana".into()), Some("Acme".into())),
        ("u2".into(), 200, None, None),
    ]);
    assert_eq!(entries[0].rank, 1);
    assert_eq!(entries[0].name, "Ana");
    assert_eq!(entries[1].rank, 2);
    // Unknown users fall back to their id.
    assert_eq!(entries[1].name, "u2");
    assert_eq!(entries[1].company, "");
}

// =============================================================================
// ROW DECODING HELPERS
// =============================================================================

#[test]
fn json_vec_tolerates_malformed_column() {
    let ints: Vec<i32> = json_vec(serde_json::json!("not-an-array"));
    assert!(ints.is_empty());
    let strings: Vec<String> = json_vec(serde_json::json!(["a", "b"]));
    assert_eq!(strings, vec!["a", "b"]);
}
