use super::*;
use serde_json::json;

fn question(id: &str, question_type: &str, options: &[&str], answer: &str, score: i32) -> Question {
    Question {
        question_id: id.into(),
        survey_id: "s1".into(),
        question_type: question_type.into(),
        question_text: format!("question {id}"),
        options: options.iter().map(|s| (*s).to_string()).collect(),
        correct_answer: answer.into(),
        score,
        explanation: String::new(),
        order_index: 0,
    }
}

// =============================================================================
// check_answer — single choice
// =============================================================================

#[test]
fn single_choice_matches_case_insensitively() {
    assert!(check_answer(&json!("beta"), &json!("Beta"), "single_choice"));
    assert!(check_answer(&json!(" beta "), &json!("beta"), "single_choice"));
}

#[test]
fn single_choice_rejects_wrong_or_empty() {
    assert!(!check_answer(&json!("alpha"), &json!("beta"), "single_choice"));
    assert!(!check_answer(&json!(""), &json!("beta"), "single_choice"));
    assert!(!check_answer(&json!(null), &json!("beta"), "single_choice"));
}

// =============================================================================
// check_answer — multiple choice
// =============================================================================

#[test]
fn multiple_choice_compares_sets() {
    assert!(check_answer(&json!(["A", "B"]), &json!(["B", "A"]), "multiple_choice"));
    assert!(check_answer(&json!("A,B"), &json!(["B", "A"]), "multiple_choice"));
    assert!(check_answer(&json!("b, a"), &json!("A,B"), "multiple_choice"));
}

#[test]
fn multiple_choice_tolerates_full_width_comma() {
    assert!(check_answer(&json!("A，B"), &json!("A,B"), "multiple_choice"));
}

#[test]
fn multiple_choice_rejects_subset_and_superset() {
    assert!(!check_answer(&json!(["A"]), &json!(["A", "B"]), "multiple_choice"));
    assert!(!check_answer(&json!(["A", "B", "C"]), &json!(["A", "B"]), "multiple_choice"));
}

#[test]
fn multiple_choice_compares_option_text_sets() {
    assert!(check_answer(
        &json!(["beta", "alpha"]),
        &json!(["alpha", "beta"]),
        "multiple_choice"
    ));
}

// =============================================================================
// check_answer — fill blank
// =============================================================================

#[test]
fn fill_blank_accepts_any_listed_answer() {
    assert!(check_answer(&json!("rust"), &json!("oxide|rust"), "fill_blank"));
    assert!(check_answer(&json!("OXIDE"), &json!("oxide|rust"), "fill_blank"));
    assert!(!check_answer(&json!("iron"), &json!("oxide|rust"), "fill_blank"));
}

#[test]
fn fill_blank_accepts_array_form() {
    assert!(check_answer(&json!("rust"), &json!(["oxide", "rust"]), "fill_blank"));
}

#[test]
fn unknown_question_type_never_matches() {
    assert!(!check_answer(&json!("x"), &json!("x"), "essay"));
}

// =============================================================================
// grade_paper
// =============================================================================

fn paper() -> Vec<Question> {
    vec![
        question("q1", "single_choice", &["alpha", "beta"], "A", 5),
        question("q2", "multiple_choice", &["alpha", "beta", "gamma"], "A,C", 5),
        question("q3", "fill_blank", &[], "oxide|rust", 5),
    ]
}

#[test]
fn grade_paper_scores_and_passes() {
    let answers = vec![
        SubmittedAnswer { question_id: "q1".into(), answer: json!("alpha") },
        SubmittedAnswer { question_id: "q2".into(), answer: json!(["alpha", "gamma"]) },
        SubmittedAnswer { question_id: "q3".into(), answer: json!("rust") },
    ];
    let result = grade_paper(&paper(), &answers, 60);
    assert_eq!(result.total_score, 15);
    assert_eq!(result.max_score, 15);
    assert!((result.percentage - 100.0).abs() < f64::EPSILON);
    assert!(result.passed);
    assert!(result.results.iter().all(|r| r.is_correct));
}

#[test]
fn grade_paper_fails_under_pass_score() {
    let answers = vec![SubmittedAnswer { question_id: "q1".into(), answer: json!("alpha") }];
    let result = grade_paper(&paper(), &answers, 60);
    assert_eq!(result.total_score, 5);
    assert!((result.percentage - 33.33).abs() < 0.001);
    assert!(!result.passed);
}

#[test]
fn grade_paper_skips_unknown_question_ids() {
    let answers = vec![SubmittedAnswer { question_id: "ghost".into(), answer: json!("alpha") }];
    let result = grade_paper(&paper(), &answers, 60);
    assert!(result.results.is_empty());
    assert_eq!(result.total_score, 0);
}

#[test]
fn grade_paper_reports_correct_answer_as_option_text() {
    let answers = vec![SubmittedAnswer { question_id: "q1".into(), answer: json!("beta") }];
    let result = grade_paper(&paper(), &answers, 60);
    assert!(!result.results[0].is_correct);
    assert_eq!(result.results[0].correct_answer, json!("alpha"));
}

#[test]
fn grade_paper_empty_bank_yields_zero_percentage() {
    let result = grade_paper(&[], &[], 60);
    assert_eq!(result.max_score, 0);
    assert!((result.percentage - 0.0).abs() < f64::EPSILON);
    assert!(!result.passed);
}

// =============================================================================
// percentage rounding
// =============================================================================

#[test]
fn percentage_rounds_to_two_decimals() {
    assert!((percentage_of(1, 3) - 33.33).abs() < 0.001);
    assert!((percentage_of(2, 3) - 66.67).abs() < 0.001);
    assert!((percentage_of(0, 0) - 0.0).abs() < f64::EPSILON);
}
