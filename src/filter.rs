// Task filtering: status mode plus free-text search

use std::fmt;
use std::str::FromStr;

use crate::error::TaskError;
use crate::models::{Priority, Task};

/// Which tasks a projection keeps, by status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum FilterMode {
    #[default]
    All,
    Pending,
    Completed,
    /// High-priority tasks only
    Priority,
}

impl FilterMode {
    pub const ALL: [FilterMode; 4] = [
        FilterMode::All,
        FilterMode::Pending,
        FilterMode::Completed,
        FilterMode::Priority,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            FilterMode::All => "all",
            FilterMode::Pending => "pending",
            FilterMode::Completed => "completed",
            FilterMode::Priority => "priority",
        }
    }

    pub fn matches(self, task: &Task) -> bool {
        match self {
            FilterMode::All => true,
            FilterMode::Pending => !task.completed,
            FilterMode::Completed => task.completed,
            FilterMode::Priority => task.priority == Priority::High,
        }
    }
}

impl fmt::Display for FilterMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilterMode {
    type Err = TaskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FilterMode::ALL
            .into_iter()
            .find(|mode| mode.as_str() == s)
            .ok_or_else(|| {
                TaskError::Validation(format!(
                    "invalid filter '{}' (expected all, pending, completed or priority)",
                    s
                ))
            })
    }
}

/// Search and status filter applied together
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    /// Status mode
    pub mode: FilterMode,
    /// Lowercased search text; empty means no search
    query: String,
}

impl Filter {
    pub fn new(mode: FilterMode, query: &str) -> Self {
        Self {
            mode,
            query: query.to_lowercase(),
        }
    }

    /// The normalized search text
    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn is_searching(&self) -> bool {
        !self.query.is_empty()
    }

    /// Case-insensitive substring match on the task text
    pub fn matches_search(&self, task: &Task) -> bool {
        !self.is_searching() || task.text.to_lowercase().contains(&self.query)
    }

    /// Both predicates must hold
    pub fn matches(&self, task: &Task) -> bool {
        self.matches_search(task) && self.mode.matches(task)
    }
}
