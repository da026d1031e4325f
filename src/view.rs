// Derived views: projections, empty-state reasons and statistics
//
// Everything here is a pure function of the collection it is handed.

use crate::filter::{Filter, FilterMode};
use crate::models::Task;

/// Tasks matching both the search text and the filter mode, in input order
pub fn project<'a>(tasks: &'a [Task], mode: FilterMode, query: &str) -> Vec<&'a Task> {
    let filter = Filter::new(mode, query);
    tasks.iter().filter(|t| filter.matches(t)).collect()
}

/// Why a projection came back empty
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmptyReason {
    /// A search is active and nothing matched it
    NoMatch(String),
    NoTasks,
    NoPending,
    NoCompleted,
    NoHighPriority,
}

impl EmptyReason {
    pub fn message(&self) -> String {
        match self {
            EmptyReason::NoMatch(query) => format!("No tasks match \"{}\"", query),
            EmptyReason::NoTasks => "No tasks yet".to_string(),
            EmptyReason::NoPending => "No pending tasks".to_string(),
            EmptyReason::NoCompleted => "No completed tasks".to_string(),
            EmptyReason::NoHighPriority => "No high-priority tasks".to_string(),
        }
    }
}

/// Pick the empty-state message for a projection of `count` tasks
///
/// Returns `None` when there is something to show. An active search takes
/// precedence over the filter mode.
pub fn empty_reason(mode: FilterMode, query: &str, count: usize) -> Option<EmptyReason> {
    if count > 0 {
        return None;
    }
    if !query.is_empty() {
        return Some(EmptyReason::NoMatch(query.to_lowercase()));
    }

    Some(match mode {
        FilterMode::All => EmptyReason::NoTasks,
        FilterMode::Pending => EmptyReason::NoPending,
        FilterMode::Completed => EmptyReason::NoCompleted,
        FilterMode::Priority => EmptyReason::NoHighPriority,
    })
}

/// Aggregate counts over a whole collection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    pub total: usize,
    pub completed: usize,
    pub pending: usize,
    pub progress_percent: u8,
}

/// Counts over the full collection, independent of any filter or search
///
/// `progress_percent` rounds half up (12.5% → 13%), matching half-away-from-zero
/// for these non-negative values.
pub fn stats(tasks: &[Task]) -> Stats {
    let total = tasks.len();
    let completed = tasks.iter().filter(|t| t.completed).count();

    Stats {
        total,
        completed,
        pending: total - completed,
        progress_percent: progress_percent(completed, total),
    }
}

fn progress_percent(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    // round(100 * c / t) == floor((200 * c + t) / (2 * t))
    let rounded = (200 * completed + total) / (2 * total);
    u8::try_from(rounded.min(100)).unwrap_or(100)
}
