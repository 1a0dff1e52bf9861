//! Domain services used by the HTTP routes.
//!
//! ARCHITECTURE
//! ============
//! Service modules own business logic and persistence concerns so route
//! handlers can stay focused on protocol translation and auth plumbing.

pub mod analytics;
pub mod auth;
pub mod badge;
pub mod certificate;
pub mod course;
pub mod directory;
pub mod group;
pub mod progress;
pub mod quiz;
pub mod quiz_import;
pub mod session;
pub mod survey;
pub mod syllabus;
pub mod user;

use uuid::Uuid;

/// Prefixed short id in the catalog's id format, e.g. `course-1f3a9b2c`.
#[must_use]
pub(crate) fn short_id(prefix: &str) -> String {
    let hex = Uuid::new_v4().simple().to_string();
    format!("{prefix}-{}", &hex[..8])
}
