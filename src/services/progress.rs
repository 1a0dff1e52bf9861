//! Learner progress — storage, sync merge, and XP leaderboards.
//!
//! DESIGN
//! ======
//! The client owns XP awarding and posts whole progress snapshots; the
//! server stores them and arbitrates conflicts on `/sync`. Merge strategy:
//! cumulative values take the max, positional/live values take the client,
//! collections union, booleans OR, and per-syllabus XP takes the per-key
//! max so a stale client can never shrink another device's earnings.

use std::collections::BTreeMap;

use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

#[derive(Debug, thiserror::Error)]
pub enum ProgressError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Full progress snapshot, camelCase on the wire.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Progress {
    pub streak: i32,
    pub last_read_date: Option<String>,
    #[serde(rename = "totalXP")]
    pub total_xp: i32,
    pub hearts: i32,
    pub max_hearts: i32,
    pub daily_goal_minutes: i32,
    pub current_chapter: i32,
    pub current_section: i32,
    pub chapters_completed: Vec<i32>,
    pub achievements: Vec<String>,
    pub words_learned: Vec<String>,
    pub total_reading_time: i32,
    pub onboarding_completed: bool,
    pub courses_completed: Vec<String>,
    pub quizzes_passed: i32,
    pub quiz_streak: i32,
    pub last_login_reward_date: Option<String>,
    pub first_passed_quizzes: Vec<String>,
    /// Opaque client-side wrong-question records; merged by their `id` key.
    pub wrong_questions: Vec<serde_json::Value>,
    #[serde(rename = "xpBySyllabus")]
    pub xp_by_syllabus: BTreeMap<String, i64>,
    pub first_login_reward_claimed: bool,
}

impl Default for Progress {
    fn default() -> Self {
        Self {
            streak: 0,
            last_read_date: None,
            total_xp: 0,
            hearts: 5,
            max_hearts: 5,
            daily_goal_minutes: 10,
            current_chapter: 1,
            current_section: 0,
            chapters_completed: Vec::new(),
            achievements: Vec::new(),
            words_learned: Vec::new(),
            total_reading_time: 0,
            onboarding_completed: false,
            courses_completed: Vec::new(),
            quizzes_passed: 0,
            quiz_streak: 0,
            last_login_reward_date: None,
            first_passed_quizzes: Vec::new(),
            wrong_questions: Vec::new(),
            xp_by_syllabus: BTreeMap::new(),
            first_login_reward_claimed: false,
        }
    }
}

// =============================================================================
// STORAGE
// =============================================================================

const PROGRESS_COLUMNS: &str = "user_id, streak, total_xp, hearts, max_hearts, daily_goal_minutes, \
     current_chapter, current_section, chapters_completed, achievements, words_learned, \
     total_reading_time, onboarding_completed, last_read_date, courses_completed, quizzes_passed, \
     quiz_streak, last_login_reward_date, first_passed_quizzes, wrong_questions, xp_by_syllabus, \
     first_login_reward_claimed";

fn row_to_progress(row: &PgRow) -> Progress {
    Progress {
        streak: row.get("streak"),
        last_read_date: row.get("last_read_date"),
        total_xp: row.get("total_xp"),
        hearts: row.get("hearts"),
        max_hearts: row.get("max_hearts"),
        daily_goal_minutes: row.get("daily_goal_minutes"),
        current_chapter: row.get("current_chapter"),
        current_section: row.get("current_section"),
        chapters_completed: json_vec(row.get("chapters_completed")),
        achievements: json_vec(row.get("achievements")),
        words_learned: json_vec(row.get("words_learned")),
        total_reading_time: row.get("total_reading_time"),
        onboarding_completed: row.get("onboarding_completed"),
        courses_completed: json_vec(row.get("courses_completed")),
        quizzes_passed: row.get("quizzes_passed"),
        quiz_streak: row.get("quiz_streak"),
        last_login_reward_date: row.get("last_login_reward_date"),
        first_passed_quizzes: json_vec(row.get("first_passed_quizzes")),
        wrong_questions: json_vec(row.get("wrong_questions")),
        xp_by_syllabus: serde_json::from_value(row.get::<serde_json::Value, _>("xp_by_syllabus")).unwrap_or_default(),
        first_login_reward_claimed: row.get("first_login_reward_claimed"),
    }
}

fn json_vec<T: serde::de::DeserializeOwned>(value: serde_json::Value) -> Vec<T> {
    serde_json::from_value(value).unwrap_or_default()
}

/// Fetch stored progress for a user.
pub async fn get_user_progress(pool: &PgPool, user_id: &str) -> Result<Option<Progress>, ProgressError> {
    let row = sqlx::query(&format!("SELECT {PROGRESS_COLUMNS} FROM user_progress WHERE user_id = $1"))
        .bind(user_id)
        .fetch_optional(pool)
        .await?;
    Ok(row.as_ref().map(row_to_progress))
}

/// Stored progress, or the default snapshot when none exists.
pub async fn get_or_default(pool: &PgPool, user_id: &str) -> Result<Progress, ProgressError> {
    Ok(get_user_progress(pool, user_id).await?.unwrap_or_default())
}

/// Upsert a user's progress snapshot.
pub async fn save_user_progress(pool: &PgPool, user_id: &str, progress: &Progress) -> Result<(), ProgressError> {
    sqlx::query(
        "INSERT INTO user_progress (
             user_id, streak, total_xp, hearts, max_hearts, daily_goal_minutes,
             current_chapter, current_section, chapters_completed, achievements, words_learned,
             total_reading_time, onboarding_completed, last_read_date, courses_completed,
             quizzes_passed, quiz_streak, last_login_reward_date, first_passed_quizzes,
             wrong_questions, xp_by_syllabus, first_login_reward_claimed, updated_at
         ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20, $21, $22, now())
         ON CONFLICT (user_id) DO UPDATE SET
             streak = EXCLUDED.streak,
             total_xp = EXCLUDED.total_xp,
             hearts = EXCLUDED.hearts,
             max_hearts = EXCLUDED.max_hearts,
             daily_goal_minutes = EXCLUDED.daily_goal_minutes,
             current_chapter = EXCLUDED.current_chapter,
             current_section = EXCLUDED.current_section,
             chapters_completed = EXCLUDED.chapters_completed,
             achievements = EXCLUDED.achievements,
             words_learned = EXCLUDED.words_learned,
             total_reading_time = EXCLUDED.total_reading_time,
             onboarding_completed = EXCLUDED.onboarding_completed,
             last_read_date = EXCLUDED.last_read_date,
             courses_completed = EXCLUDED.courses_completed,
             quizzes_passed = EXCLUDED.quizzes_passed,
             quiz_streak = EXCLUDED.quiz_streak,
             last_login_reward_date = EXCLUDED.last_login_reward_date,
             first_passed_quizzes = EXCLUDED.first_passed_quizzes,
             wrong_questions = EXCLUDED.wrong_questions,
             xp_by_syllabus = EXCLUDED.xp_by_syllabus,
             first_login_reward_claimed = EXCLUDED.first_login_reward_claimed,
             updated_at = now()",
    )
    .bind(user_id)
    .bind(progress.streak)
    .bind(progress.total_xp)
    .bind(progress.hearts)
    .bind(progress.max_hearts)
    .bind(progress.daily_goal_minutes)
    .bind(progress.current_chapter)
    .bind(progress.current_section)
    .bind(serde_json::json!(progress.chapters_completed))
    .bind(serde_json::json!(progress.achievements))
    .bind(serde_json::json!(progress.words_learned))
    .bind(progress.total_reading_time)
    .bind(progress.onboarding_completed)
    .bind(progress.last_read_date.as_deref())
    .bind(serde_json::json!(progress.courses_completed))
    .bind(progress.quizzes_passed)
    .bind(progress.quiz_streak)
    .bind(progress.last_login_reward_date.as_deref())
    .bind(serde_json::json!(progress.first_passed_quizzes))
    .bind(serde_json::json!(progress.wrong_questions))
    .bind(serde_json::json!(progress.xp_by_syllabus))
    .bind(progress.first_login_reward_claimed)
    .execute(pool)
    .await?;
    Ok(())
}

/// All stored progress rows with their user ids.
pub async fn list_all_progress(pool: &PgPool) -> Result<Vec<(String, Progress)>, ProgressError> {
    let rows = sqlx::query(&format!("SELECT {PROGRESS_COLUMNS} FROM user_progress"))
        .fetch_all(pool)
        .await?;
    Ok(rows
        .iter()
        .map(|row| (row.get::<String, _>("user_id"), row_to_progress(row)))
        .collect())
}

// =============================================================================
// SYNC MERGE
// =============================================================================

/// Merge server and client snapshots.
#[must_use]
pub fn merge_progress(server: &Progress, client: &Progress) -> Progress {
    Progress {
        // Cumulative values: take the larger side.
        total_xp: server.total_xp.max(client.total_xp),
        total_reading_time: server.total_reading_time.max(client.total_reading_time),
        quizzes_passed: server.quizzes_passed.max(client.quizzes_passed),

        // Live state and positions: the client is authoritative.
        hearts: client.hearts,
        max_hearts: client.max_hearts,
        current_chapter: client.current_chapter,
        current_section: client.current_section,
        daily_goal_minutes: client.daily_goal_minutes,
        streak: client.streak,
        quiz_streak: client.quiz_streak,
        last_read_date: client.last_read_date.clone(),
        last_login_reward_date: client.last_login_reward_date.clone(),

        // Collections: union, preserving server order then new client items.
        chapters_completed: union(&server.chapters_completed, &client.chapters_completed),
        achievements: union(&server.achievements, &client.achievements),
        words_learned: union(&server.words_learned, &client.words_learned),
        courses_completed: union(&server.courses_completed, &client.courses_completed),
        first_passed_quizzes: union(&server.first_passed_quizzes, &client.first_passed_quizzes),

        onboarding_completed: server.onboarding_completed || client.onboarding_completed,
        first_login_reward_claimed: server.first_login_reward_claimed || client.first_login_reward_claimed,

        wrong_questions: merge_wrong_questions(&server.wrong_questions, &client.wrong_questions),
        xp_by_syllabus: merge_xp_by_syllabus(&server.xp_by_syllabus, &client.xp_by_syllabus),
    }
}

fn union<T: Clone + PartialEq>(server: &[T], client: &[T]) -> Vec<T> {
    let mut merged: Vec<T> = server.to_vec();
    for item in client {
        if !merged.contains(item) {
            merged.push(item.clone());
        }
    }
    merged
}

/// Merge wrong-question records by their `id` key, client records winning.
fn merge_wrong_questions(server: &[serde_json::Value], client: &[serde_json::Value]) -> Vec<serde_json::Value> {
    let mut merged: Vec<serde_json::Value> = Vec::new();
    let mut seen: Vec<String> = Vec::new();

    let key_of = |q: &serde_json::Value| q.get("id").and_then(|v| v.as_str()).map(String::from);

    for q in server {
        if let Some(key) = key_of(q) {
            if let Some(newer) = client.iter().find(|c| key_of(c).as_deref() == Some(&key)) {
                merged.push((*newer).clone());
            } else {
                merged.push(q.clone());
            }
            seen.push(key);
        }
    }
    for q in client {
        if let Some(key) = key_of(q) {
            if !seen.contains(&key) {
                merged.push(q.clone());
                seen.push(key);
            }
        }
    }
    merged
}

fn merge_xp_by_syllabus(server: &BTreeMap<String, i64>, client: &BTreeMap<String, i64>) -> BTreeMap<String, i64> {
    let mut merged = server.clone();
    for (syllabus_id, xp) in client {
        let entry = merged.entry(syllabus_id.clone()).or_insert(0);
        *entry = (*entry).max(*xp);
    }
    merged
}

// =============================================================================
// LEADERBOARD
// =============================================================================

#[derive(Debug, Clone, serde::Serialize)]
pub struct LeaderboardEntry {
    pub rank: i64,
    pub user_id: String,
    pub name: String,
    pub company: String,
    pub xp: i64,
}

#[derive(Debug, serde::Serialize)]
pub struct Leaderboard {
    pub scope: String,
    pub entries: Vec<LeaderboardEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub my_rank: Option<i64>,
}

/// Top users by XP, globally or scoped to one syllabus.
pub async fn xp_leaderboard(
    pool: &PgPool,
    syllabus_id: Option<&str>,
    limit: i64,
    caller_user_id: &str,
) -> Result<Leaderboard, ProgressError> {
    let rows = if let Some(syllabus_id) = syllabus_id {
        sqlx::query_as::<_, (String, i64, Option<String>, Option<String>)>(
            "SELECT p.user_id,
                    COALESCE((p.xp_by_syllabus ->> $1)::bigint, 0) AS xp,
                    u.name, u.company
             FROM user_progress p
             LEFT JOIN users u ON u.user_id = p.user_id
             WHERE p.xp_by_syllabus ? $1
             ORDER BY xp DESC, p.user_id ASC
             LIMIT $2",
        )
        .bind(syllabus_id)
        .bind(limit)
        .fetch_all(pool)
        .await?
    } else {
        sqlx::query_as::<_, (String, i64, Option<String>, Option<String>)>(
            "SELECT p.user_id, p.total_xp::bigint AS xp, u.name, u.company
             FROM user_progress p
             LEFT JOIN users u ON u.user_id = p.user_id
             ORDER BY p.total_xp DESC, p.user_id ASC
             LIMIT $1",
        )
        .bind(limit)
        .fetch_all(pool)
        .await?
    };

    let entries = rank_entries(rows);
    let my_rank = entries
        .iter()
        .find(|e| e.user_id == caller_user_id)
        .map(|e| e.rank);

    Ok(Leaderboard {
        scope: syllabus_id.map_or_else(|| "global".to_string(), String::from),
        entries,
        my_rank,
    })
}

fn rank_entries(rows: Vec<(String, i64, Option<String>, Option<String>)>) -> Vec<LeaderboardEntry> {
    rows.into_iter()
        .enumerate()
        .map(|(idx, (user_id, xp, name, company))| LeaderboardEntry {
            rank: i64::try_from(idx).unwrap_or(i64::MAX - 1) + 1,
            name: name.unwrap_or_else(|| user_id.clone()),
            company: company.unwrap_or_default(),
            user_id,
            xp,
        })
        .collect()
}

// =============================================================================
// MAINTENANCE
// =============================================================================

/// Rewrite each row's `total_xp` to the sum of its per-syllabus XP map,
/// dropping XP from retired award sources. Returns the number of rows
/// that changed.
pub async fn recalculate_all_total_xp(pool: &PgPool) -> Result<u64, ProgressError> {
    let result = sqlx::query(
        "UPDATE user_progress p
         SET total_xp = calc.xp_sum, updated_at = now()
         FROM (
             SELECT user_id,
                    COALESCE((SELECT SUM(value::bigint) FROM jsonb_each_text(xp_by_syllabus)), 0)::int AS xp_sum
             FROM user_progress
         ) calc
         WHERE p.user_id = calc.user_id AND p.total_xp <> calc.xp_sum",
    )
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

#[cfg(test)]
#[path = "progress_test.rs"]
mod tests;
