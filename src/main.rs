use clap::{Parser, Subcommand};
use colored::Colorize;
use eyre::Result;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process;
use tasklist::{Config, FilterMode, Priority, Task, TaskError, TaskId, TaskStore, empty_reason, project, stats};
use tracing::Level;

/// Text longer than this gets a soft warning
const LENGTH_SOFT_LIMIT: usize = 60;
/// Text longer than this gets a strong warning
const LENGTH_HARD_LIMIT: usize = 80;

#[derive(Parser)]
#[command(name = "tasklist")]
#[command(about = "Task list manager - add, prioritize, complete and search tasks")]
#[command(version)]
struct Cli {
    /// Config file (default: <config dir>/tasklist/config.yml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding task data (overrides config)
    #[arg(short, long, global = true)]
    data_dir: Option<PathBuf>,

    /// Storage backend: file or sqlite (overrides config)
    #[arg(short, long, global = true)]
    backend: Option<String>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a new task
    Add {
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },

    /// Show tasks, optionally filtered and searched
    List {
        /// all, pending, completed or priority
        #[arg(short, long, default_value = "all")]
        filter: FilterMode,

        /// Case-insensitive text to search for
        #[arg(short, long, default_value = "")]
        search: String,
    },

    /// Mark a task done, or not done again
    Toggle { id: TaskId },

    /// Replace a task's text
    Edit {
        id: TaskId,
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },

    /// Set a task's priority (low, medium, high)
    Priority { id: TaskId, priority: String },

    /// Delete a task
    Delete {
        id: TaskId,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Delete all completed tasks
    ClearCompleted {
        #[arg(short, long)]
        yes: bool,
    },

    /// Delete every task
    ClearAll {
        #[arg(short, long)]
        yes: bool,
    },

    /// Show totals and progress
    Stats,
}

fn main() {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        process::exit(1);
    }
}

fn setup_logging(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(dir) = cli.data_dir {
        config.data_dir = Some(dir);
    }
    if let Some(backend) = cli.backend {
        config.backend = backend.parse()?;
    }

    let blob = config.open_blob_store()?;
    let mut store = TaskStore::load_with_key(blob, config.key());

    match cli.command {
        Commands::Add { text } => {
            let text = text.join(" ");
            warn_length(&text);
            let task = store.add(&text)?;
            success(&format!("Task added ({})", task.id));
        }
        Commands::List { filter, search } => {
            print_list(store.list(), filter, &search);
        }
        Commands::Toggle { id } => {
            let task = store.toggle(id)?;
            if task.completed {
                success(&format!("Task {} completed", id));
            } else {
                success(&format!("Task {} marked pending", id));
            }
        }
        Commands::Edit { id, text } => {
            let text = text.join(" ");
            warn_length(&text);
            store.edit(id, &text)?;
            success(&format!("Task {} updated", id));
        }
        Commands::Priority { id, priority } => {
            let task = store.set_priority(id, &priority)?;
            success(&format!("Task {} priority set to {}", id, task.priority));
        }
        Commands::Delete { id, yes } => {
            let Some(task) = store.get(id) else {
                return Err(TaskError::NotFound(id).into());
            };
            let prompt = format!("Delete task \"{}\"?", task.text);
            if yes || confirm(&prompt)? {
                store.delete(id)?;
                success(&format!("Task {} deleted", id));
            }
        }
        Commands::ClearCompleted { yes } => {
            if yes || confirm("Delete all completed tasks?")? {
                let removed = store.clear_completed()?;
                success(&format!("Removed {} completed task(s)", removed));
            }
        }
        Commands::ClearAll { yes } => {
            if yes || confirm("Delete ALL tasks?")? {
                let removed = store.clear_all()?;
                success(&format!("Removed {} task(s)", removed));
            }
        }
        Commands::Stats => {
            print_stats(store.list());
        }
    }

    Ok(())
}

fn success(message: &str) {
    println!("{} {}", "✔".green().bold(), message.green());
}

/// Advisory only; long text is still accepted
fn warn_length(text: &str) {
    let count = text.trim().chars().count();
    if count > LENGTH_HARD_LIMIT {
        eprintln!("{}", format!("Task text is {} characters long", count).red());
    } else if count > LENGTH_SOFT_LIMIT {
        eprintln!("{}", format!("Task text is {} characters long", count).yellow());
    }
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{} [y/N] ", prompt.yellow());
    io::stdout().flush()?;

    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;

    let confirmed = matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes");
    if !confirmed {
        println!("Cancelled");
    }
    Ok(confirmed)
}

fn print_list(tasks: &[Task], mode: FilterMode, search: &str) {
    let shown = project(tasks, mode, search);

    if let Some(reason) = empty_reason(mode, search, shown.len()) {
        println!("{}", reason.message().dimmed());
    }

    for task in &shown {
        println!("{}", render_task(task));
    }

    println!();
    print_stats(tasks);
}

fn render_task(task: &Task) -> String {
    let check = if task.completed { "[x]" } else { "[ ]" };
    let marker = match task.priority {
        Priority::High => "●".red(),
        Priority::Medium => "●".yellow(),
        Priority::Low => "●".green(),
    };
    let text = if task.completed {
        task.text.strikethrough().dimmed()
    } else {
        task.text.normal()
    };

    format!("{} {} {} {}", check, marker, task.id.to_string().dimmed(), text)
}

fn print_stats(tasks: &[Task]) {
    let s = stats(tasks);
    println!(
        "Total: {}  Completed: {}  Pending: {}  Progress: {}%",
        s.total.to_string().bold(),
        s.completed.to_string().green(),
        s.pending.to_string().yellow(),
        s.progress_percent.to_string().bold()
    );
}
