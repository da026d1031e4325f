//! Example 01: Basic task operations
//!
//! Adds, toggles, edits, re-prioritizes and deletes tasks in a file-backed
//! store, then reopens the store to show everything survived.
//!
//! Run with: cargo run --example 01_basic_crud

use eyre::Result;
use tasklist::{FileBlobStore, TaskStore};

fn main() -> Result<()> {
    // Create a temporary directory for this example
    let temp_dir = tempfile::tempdir()?;
    let data_dir = temp_dir.path().to_path_buf();

    println!("TaskList Basic Operations Example");
    println!("=================================\n");
    println!("Data dir: {}\n", data_dir.display());

    let mut store = TaskStore::load(FileBlobStore::open(&data_dir)?);
    println!("Loaded {} tasks.\n", store.list().len());

    println!("1. ADD - Adding two tasks...");
    let milk = store.add("  Buy milk ")?;
    let mom = store.add("Call mom")?;
    for task in store.list() {
        println!("   - [{}] {} ({})", task.id, task.text, task.priority);
    }
    println!();

    println!("2. TOGGLE - Completing \"{}\"...", milk.text);
    let milk = store.toggle(milk.id)?;
    println!("   completed = {}, completed_at = {:?}\n", milk.completed, milk.completed_at);

    println!("3. EDIT - Rewording \"{}\"...", mom.text);
    let mom = store.edit(mom.id, "Call mom about Sunday")?;
    println!("   now reads: {}\n", mom.text);

    println!("4. PRIORITY - Raising it to high...");
    let mom = store.set_priority(mom.id, "high")?;
    println!("   priority = {}", mom.priority);
    match store.set_priority(mom.id, "urgent") {
        Ok(_) => println!("   unexpected: 'urgent' was accepted"),
        Err(e) => println!("   rejected 'urgent': {}", e),
    }
    println!();

    println!("5. RELOAD - Reopening the store from disk...");
    let store_path = data_dir.join("tasks.json");
    println!("   {} is {} bytes", store_path.display(), std::fs::metadata(&store_path)?.len());
    drop(store);
    let mut store = TaskStore::load(FileBlobStore::open(&data_dir)?);
    for task in store.list() {
        let mark = if task.completed { "x" } else { " " };
        println!("   - [{}] {} ({})", mark, task.text, task.priority);
    }
    println!();

    println!("6. DELETE - Removing the completed task...");
    let removed = store.delete(milk.id)?;
    println!("   removed = {}", removed);
    let removed_again = store.delete(milk.id)?;
    println!("   deleting again removed = {}", removed_again);
    println!("   {} task(s) left\n", store.list().len());

    println!("Example complete!");
    Ok(())
}
