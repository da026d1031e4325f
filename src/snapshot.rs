// Snapshot encoding: the whole collection as one JSON array

use eyre::{Context, Result, eyre};
use std::collections::HashSet;

use crate::models::Task;

/// Serialize the collection in display order
pub fn encode(tasks: &[Task]) -> Result<String> {
    serde_json::to_string(tasks).context("Failed to serialize task snapshot")
}

/// Parse a stored snapshot
///
/// Anything that does not describe a valid collection is an error: bad
/// JSON, wrong shape, a task breaking its own invariants, or a repeated id.
pub fn decode(raw: &str) -> Result<Vec<Task>> {
    let tasks: Vec<Task> = serde_json::from_str(raw).context("Failed to parse task snapshot")?;

    let mut seen = HashSet::with_capacity(tasks.len());
    for task in &tasks {
        task.validate().map_err(|e| eyre!(e))?;
        if !seen.insert(task.id) {
            return Err(eyre!("Duplicate task id {} in snapshot", task.id));
        }
    }

    Ok(tasks)
}
