// Data models for the task list

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::TaskError;

/// Identifier assigned to a task at creation time
pub type TaskId = u64;

/// A single to-do item
///
/// Field names serialize in camelCase so a stored snapshot reads
/// `id`, `text`, `completed`, `priority`, `createdAt`, `completedAt`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub text: String,
    pub completed: bool,
    pub priority: Priority,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Task {
    /// Build a fresh pending task with medium priority
    ///
    /// `text` must already be normalized with [`normalize_text`].
    pub fn new(id: TaskId, text: String, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            text,
            completed: false,
            priority: Priority::default(),
            created_at,
            completed_at: None,
        }
    }

    /// Flip completion, stamping or clearing `completed_at`
    pub fn toggle(&mut self, now: DateTime<Utc>) {
        self.completed = !self.completed;
        self.completed_at = if self.completed { Some(now) } else { None };
    }

    /// Check the invariants a stored task must satisfy
    pub fn validate(&self) -> Result<(), TaskError> {
        if self.text.trim().is_empty() {
            return Err(TaskError::Validation(format!("task {} has empty text", self.id)));
        }
        if self.completed != self.completed_at.is_some() {
            return Err(TaskError::Validation(format!(
                "task {} completion flag disagrees with completedAt",
                self.id
            )));
        }
        Ok(())
    }
}

/// Task priority
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = TaskError;

    /// Accepts exactly the stored names; anything else is a validation error
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            other => Err(TaskError::Validation(format!(
                "invalid priority '{}' (expected low, medium or high)",
                other
            ))),
        }
    }
}

/// Trim task text, rejecting input that is empty or whitespace-only
pub fn normalize_text(text: &str) -> Result<String, TaskError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(TaskError::Validation("task text cannot be empty".to_string()));
    }
    Ok(trimmed.to_string())
}
