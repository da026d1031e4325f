//! Example 02: Views, search and stats
//!
//! Builds a small collection in memory and shows how filter modes and
//! search text combine, what the empty states say, and the progress stats.
//!
//! Run with: cargo run --example 02_filtering

use eyre::Result;
use tasklist::{FilterMode, MemoryBlobStore, Task, TaskStore, empty_reason, project, stats};

fn show(label: &str, tasks: &[Task], mode: FilterMode, query: &str) {
    let view = project(tasks, mode, query);
    println!("{} (filter={}, search={:?}): {} task(s)", label, mode, query, view.len());
    for task in &view {
        println!("   - {} [{}]", task.text, task.priority);
    }
    if let Some(reason) = empty_reason(mode, query, view.len()) {
        println!("   {}", reason.message());
    }
    println!();
}

fn main() -> Result<()> {
    println!("TaskList Filtering Example");
    println!("==========================\n");

    let mut store = TaskStore::load(MemoryBlobStore::new());

    let walk = store.add("Walk dog")?;
    let book = store.add("Read book")?;
    let milkman = store.add("Pay milkman")?;
    let mom = store.add("Call mom")?;
    store.add("Buy milk")?;

    store.set_priority(walk.id, "low")?;
    store.set_priority(book.id, "low")?;
    store.set_priority(milkman.id, "high")?;
    store.set_priority(mom.id, "high")?;
    store.toggle(milkman.id)?;
    store.toggle(book.id)?;

    let tasks = store.list();

    show("1. Everything", tasks, FilterMode::All, "");
    show("2. Pending only", tasks, FilterMode::Pending, "");
    show("3. Completed only", tasks, FilterMode::Completed, "");
    show("4. High priority", tasks, FilterMode::Priority, "");
    show("5. Search is case-insensitive", tasks, FilterMode::All, "MILK");
    show("6. Search combined with a mode", tasks, FilterMode::Pending, "milk");
    show("7. Nothing matches", tasks, FilterMode::All, "groceries");

    let summary = stats(tasks);
    println!("Stats:");
    println!("   total     = {}", summary.total);
    println!("   completed = {}", summary.completed);
    println!("   pending   = {}", summary.pending);
    println!("   progress  = {}%\n", summary.progress_percent);

    let removed = store.clear_completed()?;
    println!("Cleared {} completed task(s)", removed);
    show("8. After clearing completed", store.list(), FilterMode::Completed, "");

    println!("Example complete!");
    Ok(())
}
