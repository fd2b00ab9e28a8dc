//! Task domain types and validation.
//!
//! Validation is pure: every rule is checked here before any storage call, so
//! the REST handlers stay thin adapters.

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Maximum title length after trimming.
pub const TITLE_MAX: usize = 100;
/// Maximum description length after trimming.
pub const DESCRIPTION_MAX: usize = 500;

/// Derived task state. Never stored — computed from `completed` when a row is
/// converted to its API representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Completed,
}

impl TaskStatus {
    pub fn from_completed(completed: bool) -> Self {
        if completed {
            Self::Completed
        } else {
            Self::Pending
        }
    }
}

/// API-facing task representation (camelCase JSON).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    pub description: String,
    pub completed: bool,
    pub created_at: String,
    pub updated_at: String,
    pub status: TaskStatus,
}

/// Aggregate counters returned by the stats endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStats {
    pub total_tasks: i64,
    pub completed_tasks: i64,
    pub pending_tasks: i64,
}

/// A validated, trimmed task ready for insertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    pub title: String,
    pub description: String,
    pub completed: bool,
}

/// A validated partial update. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub completed: Option<bool>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none() && self.completed.is_none()
    }
}

/// Validation failure for a create or update payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationFailure {
    /// Title missing on create, or explicitly empty on update.
    /// The message matches the operation ("required" vs "cannot be empty").
    MissingTitle(&'static str),
    /// One or more field-level limit violations.
    FieldErrors(Vec<String>),
}

pub const TITLE_REQUIRED: &str = "Task title is required";
pub const TITLE_EMPTY: &str = "Task title cannot be empty";
pub const TITLE_TOO_LONG: &str = "Title cannot be more than 100 characters";
pub const DESCRIPTION_TOO_LONG: &str = "Description cannot be more than 500 characters";

/// Validate a create payload. Trims title and description, defaults
/// `description` to `""` and `completed` to false.
pub fn validate_create(
    title: Option<&str>,
    description: Option<&str>,
    completed: Option<bool>,
) -> Result<NewTask, ValidationFailure> {
    let title = title.map(str::trim).unwrap_or_default();
    if title.is_empty() {
        return Err(ValidationFailure::MissingTitle(TITLE_REQUIRED));
    }

    let description = description.map(str::trim).unwrap_or_default();
    check_lengths(title, description)?;

    Ok(NewTask {
        title: title.to_string(),
        description: description.to_string(),
        completed: completed.unwrap_or(false),
    })
}

/// Validate a partial update payload. An explicit empty description clears
/// the field; an explicit empty title is rejected. This asymmetry is
/// intentional and mirrors the create-time "title required" rule.
pub fn validate_update(
    title: Option<&str>,
    description: Option<&str>,
    completed: Option<bool>,
) -> Result<TaskPatch, ValidationFailure> {
    let title = match title {
        Some(raw) => {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                return Err(ValidationFailure::MissingTitle(TITLE_EMPTY));
            }
            Some(trimmed)
        }
        None => None,
    };
    let description = description.map(str::trim);

    check_lengths(title.unwrap_or_default(), description.unwrap_or_default())?;

    Ok(TaskPatch {
        title: title.map(str::to_string),
        description: description.map(str::to_string),
        completed,
    })
}

fn check_lengths(title: &str, description: &str) -> Result<(), ValidationFailure> {
    let mut errors = Vec::new();
    if title.chars().count() > TITLE_MAX {
        errors.push(TITLE_TOO_LONG.to_string());
    }
    if description.chars().count() > DESCRIPTION_MAX {
        errors.push(DESCRIPTION_TOO_LONG.to_string());
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ValidationFailure::FieldErrors(errors))
    }
}

/// True if `id` matches the store's identifier format: exactly 24 hex chars.
/// Checked before any storage lookup so malformed ids never reach a query.
pub fn is_valid_task_id(id: &str) -> bool {
    id.len() == 24 && id.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Generate a new 24-hex-char task id: 4-byte big-endian unix seconds
/// followed by 8 random bytes. Ids created in the same second stay unique
/// through the random tail; the timestamp prefix keeps them roughly sortable.
pub fn generate_task_id() -> String {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as u32)
        .unwrap_or(0);
    let random = uuid::Uuid::new_v4();
    let mut bytes = [0u8; 12];
    bytes[..4].copy_from_slice(&secs.to_be_bytes());
    bytes[4..].copy_from_slice(&random.as_bytes()[..8]);
    hex::encode(bytes)
}
