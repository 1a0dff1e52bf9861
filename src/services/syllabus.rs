//! Syllabi — ordered course sequences with access rules and invitations.
//!
//! DESIGN
//! ======
//! A syllabus bundles courses in a fixed order behind a publish flag, a
//! time window, and access rules (guest/employee flags, user and group
//! allowlists, and an optional guest invitation code). Access decisions
//! are pure functions over the loaded syllabus so every branch is
//! testable without a database.
//!
//! EDGE CASES
//! ==========
//! When an invitation gate is enabled, guests no longer get in through the
//! blanket `allow_guests` flag; they must carry the grant the code issued
//! at login.

use chrono::{DateTime, Utc};
use rand::Rng;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use crate::services::session::UserType;
use crate::services::short_id;

const INVITATION_CODE_LEN: usize = 8;
const INVITATION_CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

#[derive(Debug, thiserror::Error)]
pub enum SyllabusError {
    #[error("syllabus not found: {0}")]
    NotFound(String),
    #[error("{0}")]
    Validation(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CourseSeqItem {
    pub course_id: String,
    pub order: i32,
    #[serde(default)]
    pub is_optional: bool,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct GuestInvitation {
    pub enabled: bool,
    pub code: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
    pub max_uses: Option<i32>,
    pub current_uses: i32,
}

impl Default for GuestInvitation {
    fn default() -> Self {
        Self {
            enabled: false,
            code: String::new(),
            expires_at: None,
            created_at: None,
            max_uses: None,
            current_uses: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct AccessRules {
    pub allow_guests: bool,
    pub allow_employees: bool,
    pub allowed_user_groups: Vec<String>,
    pub allowed_users: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guest_invitation: Option<GuestInvitation>,
}

impl Default for AccessRules {
    fn default() -> Self {
        Self {
            allow_guests: true,
            allow_employees: true,
            allowed_user_groups: Vec::new(),
            allowed_users: Vec::new(),
            guest_invitation: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct TimeConfig {
    #[serde(rename = "type")]
    pub kind: String,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

impl Default for TimeConfig {
    fn default() -> Self {
        Self { kind: "permanent".to_string(), start_date: None, end_date: None }
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct Syllabus {
    pub id: String,
    pub name: String,
    pub description: String,
    pub cover_image_url: String,
    pub course_sequence: Vec<CourseSeqItem>,
    pub access_type: String,
    pub access_rules: AccessRules,
    pub time_config: TimeConfig,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn row_to_syllabus(row: &PgRow) -> Syllabus {
    Syllabus {
        id: row.get("id"),
        name: row.get("name"),
        description: row.get("description"),
        cover_image_url: row.get("cover_image_url"),
        course_sequence: serde_json::from_value(row.get::<serde_json::Value, _>("course_sequence"))
            .unwrap_or_default(),
        access_type: row.get("access_type"),
        access_rules: serde_json::from_value(row.get::<serde_json::Value, _>("access_rules")).unwrap_or_default(),
        time_config: serde_json::from_value(row.get::<serde_json::Value, _>("time_config")).unwrap_or_default(),
        is_published: row.get("is_published"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

// =============================================================================
// CRUD
// =============================================================================

/// Create an unpublished syllabus with default access rules.
pub async fn create_syllabus(
    pool: &PgPool,
    name: &str,
    description: &str,
    cover_image_url: &str,
) -> Result<Syllabus, SyllabusError> {
    if name.trim().is_empty() {
        return Err(SyllabusError::Validation("syllabus name must not be empty".into()));
    }

    let id = short_id("syl");
    let row = sqlx::query(
        "INSERT INTO syllabi (id, name, description, cover_image_url, access_rules, time_config)
         VALUES ($1, $2, $3, $4, $5, $6)
         RETURNING *",
    )
    .bind(&id)
    .bind(name.trim())
    .bind(description)
    .bind(cover_image_url)
    .bind(serde_json::to_value(AccessRules::default()).unwrap_or_default())
    .bind(serde_json::to_value(TimeConfig::default()).unwrap_or_default())
    .fetch_one(pool)
    .await?;
    Ok(row_to_syllabus(&row))
}

/// All syllabi, optionally including unpublished ones, newest first.
pub async fn get_all_syllabi(pool: &PgPool, include_unpublished: bool) -> Result<Vec<Syllabus>, SyllabusError> {
    let rows = if include_unpublished {
        sqlx::query("SELECT * FROM syllabi ORDER BY created_at DESC")
            .fetch_all(pool)
            .await?
    } else {
        sqlx::query("SELECT * FROM syllabi WHERE is_published ORDER BY created_at DESC")
            .fetch_all(pool)
            .await?
    };
    Ok(rows.iter().map(row_to_syllabus).collect())
}

/// One syllabus by id.
pub async fn get_syllabus(pool: &PgPool, syllabus_id: &str) -> Result<Option<Syllabus>, SyllabusError> {
    let row = sqlx::query("SELECT * FROM syllabi WHERE id = $1")
        .bind(syllabus_id)
        .fetch_optional(pool)
        .await?;
    Ok(row.as_ref().map(row_to_syllabus))
}

/// Mutable syllabus fields.
#[derive(Debug, Default, serde::Deserialize)]
pub struct SyllabusUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub cover_image_url: Option<String>,
    pub course_sequence: Option<Vec<CourseSeqItem>>,
    pub access_type: Option<String>,
    pub access_rules: Option<AccessRules>,
    pub time_config: Option<TimeConfig>,
    pub is_published: Option<bool>,
}

/// Apply a partial update.
pub async fn update_syllabus(
    pool: &PgPool,
    syllabus_id: &str,
    update: &SyllabusUpdate,
) -> Result<Syllabus, SyllabusError> {
    let current = get_syllabus(pool, syllabus_id)
        .await?
        .ok_or_else(|| SyllabusError::NotFound(syllabus_id.to_string()))?;

    if let Some(name) = &update.name {
        if name.trim().is_empty() {
            return Err(SyllabusError::Validation("syllabus name must not be empty".into()));
        }
    }
    if let Some(access_type) = &update.access_type {
        if access_type != "public" && access_type != "restricted" {
            return Err(SyllabusError::Validation(format!("invalid access type: {access_type}")));
        }
    }

    let name = update.name.as_deref().map(str::trim).unwrap_or(current.name.as_str());
    let description = update
        .description
        .as_deref()
        .unwrap_or(current.description.as_str());
    let cover = update
        .cover_image_url
        .as_deref()
        .unwrap_or(current.cover_image_url.as_str());
    let sequence = update
        .course_sequence
        .clone()
        .unwrap_or(current.course_sequence);
    let access_type = update
        .access_type
        .as_deref()
        .unwrap_or(current.access_type.as_str());
    let access_rules = update.access_rules.clone().unwrap_or(current.access_rules);
    let time_config = update.time_config.clone().unwrap_or(current.time_config);
    let is_published = update.is_published.unwrap_or(current.is_published);

    let row = sqlx::query(
        "UPDATE syllabi
         SET name = $2, description = $3, cover_image_url = $4, course_sequence = $5, access_type = $6,
             access_rules = $7, time_config = $8, is_published = $9, updated_at = now()
         WHERE id = $1
         RETURNING *",
    )
    .bind(syllabus_id)
    .bind(name)
    .bind(description)
    .bind(cover)
    .bind(serde_json::to_value(sequence).unwrap_or_default())
    .bind(access_type)
    .bind(serde_json::to_value(access_rules).unwrap_or_default())
    .bind(serde_json::to_value(time_config).unwrap_or_default())
    .bind(is_published)
    .fetch_one(pool)
    .await?;
    Ok(row_to_syllabus(&row))
}

/// Delete a syllabus.
pub async fn delete_syllabus(pool: &PgPool, syllabus_id: &str) -> Result<(), SyllabusError> {
    let result = sqlx::query("DELETE FROM syllabi WHERE id = $1")
        .bind(syllabus_id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(SyllabusError::NotFound(syllabus_id.to_string()));
    }
    Ok(())
}

/// Flip the publish flag.
pub async fn set_published(pool: &PgPool, syllabus_id: &str, published: bool) -> Result<Syllabus, SyllabusError> {
    update_syllabus(
        pool,
        syllabus_id,
        &SyllabusUpdate { is_published: Some(published), ..SyllabusUpdate::default() },
    )
    .await
}

// =============================================================================
// COURSE SEQUENCE
// =============================================================================

/// Append a course (no-op when already present).
pub(crate) fn seq_add(mut sequence: Vec<CourseSeqItem>, course_id: &str, is_optional: bool) -> Vec<CourseSeqItem> {
    if sequence.iter().any(|item| item.course_id == course_id) {
        return sequence;
    }
    let order = i32::try_from(sequence.len()).unwrap_or(i32::MAX - 1) + 1;
    sequence.push(CourseSeqItem { course_id: course_id.to_string(), order, is_optional });
    sequence
}

/// Remove a course and renumber the remainder.
pub(crate) fn seq_remove(sequence: Vec<CourseSeqItem>, course_id: &str) -> Vec<CourseSeqItem> {
    sequence
        .into_iter()
        .filter(|item| item.course_id != course_id)
        .enumerate()
        .map(|(idx, mut item)| {
            item.order = i32::try_from(idx).unwrap_or(i32::MAX - 1) + 1;
            item
        })
        .collect()
}

/// Rebuild the sequence in the given order; unknown ids are dropped.
pub(crate) fn seq_reorder(sequence: Vec<CourseSeqItem>, course_ids: &[String]) -> Vec<CourseSeqItem> {
    let mut reordered = Vec::with_capacity(sequence.len());
    for course_id in course_ids {
        if let Some(mut item) = sequence.iter().find(|i| &i.course_id == course_id).cloned() {
            item.order = i32::try_from(reordered.len()).unwrap_or(i32::MAX - 1) + 1;
            reordered.push(item);
        }
    }
    reordered
}

/// Add a course to a syllabus.
pub async fn add_course(
    pool: &PgPool,
    syllabus_id: &str,
    course_id: &str,
    is_optional: bool,
) -> Result<Syllabus, SyllabusError> {
    let current = get_syllabus(pool, syllabus_id)
        .await?
        .ok_or_else(|| SyllabusError::NotFound(syllabus_id.to_string()))?;
    let sequence = seq_add(current.course_sequence, course_id, is_optional);
    update_syllabus(
        pool,
        syllabus_id,
        &SyllabusUpdate { course_sequence: Some(sequence), ..SyllabusUpdate::default() },
    )
    .await
}

/// Remove a course from a syllabus.
pub async fn remove_course(pool: &PgPool, syllabus_id: &str, course_id: &str) -> Result<Syllabus, SyllabusError> {
    let current = get_syllabus(pool, syllabus_id)
        .await?
        .ok_or_else(|| SyllabusError::NotFound(syllabus_id.to_string()))?;
    let sequence = seq_remove(current.course_sequence, course_id);
    update_syllabus(
        pool,
        syllabus_id,
        &SyllabusUpdate { course_sequence: Some(sequence), ..SyllabusUpdate::default() },
    )
    .await
}

/// Reorder a syllabus's courses.
pub async fn reorder_courses(
    pool: &PgPool,
    syllabus_id: &str,
    course_ids: &[String],
) -> Result<Syllabus, SyllabusError> {
    let current = get_syllabus(pool, syllabus_id)
        .await?
        .ok_or_else(|| SyllabusError::NotFound(syllabus_id.to_string()))?;
    let sequence = seq_reorder(current.course_sequence, course_ids);
    update_syllabus(
        pool,
        syllabus_id,
        &SyllabusUpdate { course_sequence: Some(sequence), ..SyllabusUpdate::default() },
    )
    .await
}

// =============================================================================
// ACCESS CONTROL
// =============================================================================

/// Who is asking: resolved from the session plus group membership.
#[derive(Debug, Clone)]
pub struct AccessIdentity {
    pub user_id: String,
    pub user_type: UserType,
    /// Syllabus ids granted through an invitation code at login.
    pub accessible_syllabi: Vec<String>,
    /// Ids of user groups the user belongs to.
    pub group_ids: Vec<String>,
}

/// Whether the time window admits `now`.
#[must_use]
pub fn is_time_valid(time_config: &TimeConfig, now: DateTime<Utc>) -> bool {
    if time_config.kind == "permanent" {
        return true;
    }
    if let Some(start) = time_config.start_date {
        if now < start {
            return false;
        }
    }
    if let Some(end) = time_config.end_date {
        if now > end {
            return false;
        }
    }
    true
}

/// Full access decision for one user against one syllabus.
#[must_use]
pub fn can_access(identity: &AccessIdentity, syllabus: &Syllabus, now: DateTime<Utc>) -> bool {
    if !syllabus.is_published {
        return false;
    }
    if !is_time_valid(&syllabus.time_config, now) {
        return false;
    }
    if syllabus.access_type == "public" {
        return true;
    }

    let rules = &syllabus.access_rules;

    // Invitation grants attached to the session always win.
    if identity.accessible_syllabi.contains(&syllabus.id) {
        return true;
    }

    if rules.allow_guests && identity.user_type == UserType::Guest {
        // An enabled invitation gate closes the blanket guest door.
        let gated = rules
            .guest_invitation
            .as_ref()
            .is_some_and(|invitation| invitation.enabled);
        if !gated {
            return true;
        }
    }

    if rules.allow_employees && identity.user_type == UserType::Employee {
        return true;
    }

    if rules.allowed_users.contains(&identity.user_id) {
        return true;
    }

    identity
        .group_ids
        .iter()
        .any(|group_id| rules.allowed_user_groups.contains(group_id))
}

/// Published syllabi the identity may open.
pub async fn accessible_syllabi(pool: &PgPool, identity: &AccessIdentity) -> Result<Vec<Syllabus>, SyllabusError> {
    let all = get_all_syllabi(pool, false).await?;
    let now = Utc::now();
    Ok(all
        .into_iter()
        .filter(|syllabus| can_access(identity, syllabus, now))
        .collect())
}

// =============================================================================
// INVITATION CODES
// =============================================================================

pub(crate) fn generate_invitation_code<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..INVITATION_CODE_LEN)
        .map(|_| {
            let idx = rng.random_range(0..INVITATION_CODE_ALPHABET.len());
            INVITATION_CODE_ALPHABET[idx] as char
        })
        .collect()
}

/// Whether another syllabus already holds this code (case-insensitive).
async fn is_code_in_use(pool: &PgPool, code: &str, exclude_syllabus_id: &str) -> Result<bool, SyllabusError> {
    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS(
            SELECT 1 FROM syllabi
            WHERE id <> $2
              AND UPPER(access_rules #>> '{guest_invitation,code}') = UPPER($1)
              AND (access_rules #>> '{guest_invitation,enabled}') = 'true'
        )",
    )
    .bind(code)
    .bind(exclude_syllabus_id)
    .fetch_one(pool)
    .await?;
    Ok(exists)
}

#[derive(Debug, Default, serde::Deserialize)]
pub struct InvitationRequest {
    pub expires_at: Option<DateTime<Utc>>,
    pub max_uses: Option<i32>,
    pub custom_code: Option<String>,
}

/// Create (or replace) a syllabus's invitation code.
pub async fn generate_invitation(
    pool: &PgPool,
    syllabus_id: &str,
    request: &InvitationRequest,
) -> Result<GuestInvitation, SyllabusError> {
    let syllabus = get_syllabus(pool, syllabus_id)
        .await?
        .ok_or_else(|| SyllabusError::NotFound(syllabus_id.to_string()))?;

    if !syllabus.access_rules.allow_guests {
        return Err(SyllabusError::Validation(
            "syllabus does not allow guests, invitation codes are unavailable".into(),
        ));
    }

    let code = match &request.custom_code {
        Some(custom) if !custom.trim().is_empty() => {
            let code = custom.trim().to_uppercase();
            if is_code_in_use(pool, &code, syllabus_id).await? {
                return Err(SyllabusError::Validation("invitation code is already used by another syllabus".into()));
            }
            code
        }
        _ => loop {
            // The thread-local rng must not live across the await below.
            let candidate = generate_invitation_code(&mut rand::rng());
            if !is_code_in_use(pool, &candidate, syllabus_id).await? {
                break candidate;
            }
        },
    };

    let invitation = GuestInvitation {
        enabled: true,
        code,
        expires_at: request.expires_at,
        created_at: Some(Utc::now()),
        max_uses: request.max_uses,
        current_uses: 0,
    };

    let mut access_rules = syllabus.access_rules;
    access_rules.guest_invitation = Some(invitation.clone());
    update_syllabus(
        pool,
        syllabus_id,
        &SyllabusUpdate { access_rules: Some(access_rules), ..SyllabusUpdate::default() },
    )
    .await?;

    Ok(invitation)
}

/// Drop a syllabus's invitation code.
pub async fn delete_invitation(pool: &PgPool, syllabus_id: &str) -> Result<(), SyllabusError> {
    let syllabus = get_syllabus(pool, syllabus_id)
        .await?
        .ok_or_else(|| SyllabusError::NotFound(syllabus_id.to_string()))?;
    let mut access_rules = syllabus.access_rules;
    if access_rules.guest_invitation.take().is_some() {
        update_syllabus(
            pool,
            syllabus_id,
            &SyllabusUpdate { access_rules: Some(access_rules), ..SyllabusUpdate::default() },
        )
        .await?;
    }
    Ok(())
}

#[must_use]
pub fn invitation_expired(invitation: &GuestInvitation, now: DateTime<Utc>) -> bool {
    invitation.expires_at.is_some_and(|expires| now > expires)
}

#[must_use]
pub fn invitation_exhausted(invitation: &GuestInvitation) -> bool {
    invitation
        .max_uses
        .is_some_and(|max| invitation.current_uses >= max)
}

/// Invitation code with computed status flags.
#[derive(Debug, serde::Serialize)]
pub struct InvitationInfo {
    #[serde(flatten)]
    pub invitation: GuestInvitation,
    pub is_expired: bool,
    pub is_exhausted: bool,
}

/// Current invitation code for a syllabus, if any.
pub async fn invitation_info(pool: &PgPool, syllabus_id: &str) -> Result<Option<InvitationInfo>, SyllabusError> {
    let syllabus = get_syllabus(pool, syllabus_id)
        .await?
        .ok_or_else(|| SyllabusError::NotFound(syllabus_id.to_string()))?;
    let now = Utc::now();
    Ok(syllabus
        .access_rules
        .guest_invitation
        .map(|invitation| InvitationInfo {
            is_expired: invitation_expired(&invitation, now),
            is_exhausted: invitation_exhausted(&invitation),
            invitation,
        }))
}

/// Outcome of validating a submitted invitation code.
#[derive(Debug, serde::Serialize)]
pub struct InvitationMatch {
    pub syllabus_id: String,
    pub syllabus_name: String,
    pub syllabus_description: String,
}

/// Pure validation of a code against one syllabus.
pub(crate) fn validate_invitation_for(
    syllabus: &Syllabus,
    code: &str,
    now: DateTime<Utc>,
) -> Result<(), &'static str> {
    let Some(invitation) = &syllabus.access_rules.guest_invitation else {
        return Err("invitation code is invalid");
    };
    if !invitation.enabled || !invitation.code.eq_ignore_ascii_case(code) {
        return Err("invitation code is invalid");
    }
    if !syllabus.is_published {
        return Err("invitation code is invalid");
    }
    if invitation_expired(invitation, now) {
        return Err("invitation code has expired");
    }
    if invitation_exhausted(invitation) {
        return Err("invitation code has reached its usage limit");
    }
    if !is_time_valid(&syllabus.time_config, now) {
        return Err("syllabus is not open at this time");
    }
    Ok(())
}

/// Validate a code across all syllabi. Returns the matched syllabus info
/// or a reason message.
pub async fn validate_invitation_code(pool: &PgPool, code: &str) -> Result<InvitationMatch, SyllabusError> {
    let code = code.trim();
    if code.is_empty() {
        return Err(SyllabusError::Validation("invitation code must not be empty".into()));
    }

    let all = get_all_syllabi(pool, true).await?;
    let now = Utc::now();
    let mut last_reason = "invitation code is invalid";

    for syllabus in &all {
        let has_code = syllabus
            .access_rules
            .guest_invitation
            .as_ref()
            .is_some_and(|inv| inv.code.eq_ignore_ascii_case(code));
        if !has_code {
            continue;
        }
        match validate_invitation_for(syllabus, code, now) {
            Ok(()) => {
                return Ok(InvitationMatch {
                    syllabus_id: syllabus.id.clone(),
                    syllabus_name: syllabus.name.clone(),
                    syllabus_description: syllabus.description.clone(),
                });
            }
            Err(reason) => last_reason = reason,
        }
    }

    Err(SyllabusError::Validation(last_reason.to_string()))
}

/// Bump a code's usage counter.
pub async fn increment_invitation_usage(pool: &PgPool, syllabus_id: &str) -> Result<(), SyllabusError> {
    let syllabus = get_syllabus(pool, syllabus_id)
        .await?
        .ok_or_else(|| SyllabusError::NotFound(syllabus_id.to_string()))?;
    let mut access_rules = syllabus.access_rules;
    let Some(invitation) = access_rules.guest_invitation.as_mut() else {
        return Ok(());
    };
    if !invitation.enabled {
        return Ok(());
    }
    invitation.current_uses += 1;
    update_syllabus(
        pool,
        syllabus_id,
        &SyllabusUpdate { access_rules: Some(access_rules), ..SyllabusUpdate::default() },
    )
    .await?;
    Ok(())
}

#[cfg(test)]
#[path = "syllabus_test.rs"]
mod tests;
