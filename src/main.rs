use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use colored::Colorize;
use eyre::Result;
use serde::Serialize;
use std::path::PathBuf;
use streakstore::{CancelOutcome, Config, ContinueOutcome, Streak, StreakState, StreakStore};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "streakstore")]
#[command(about = "Track daily habit streaks")]
#[command(version = env!("GIT_DESCRIBE"))]
struct Cli {
    /// Path to a YAML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Store directory (overrides the config file)
    #[arg(short, long)]
    store_path: Option<PathBuf>,

    /// Treat this day as today (YYYY-MM-DD)
    #[arg(long)]
    today: Option<NaiveDate>,

    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new streak
    Add { name: String },

    /// List streaks in display order
    List {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Mark a streak as done for today
    Continue { id: i64 },

    /// Undo today's continue
    Cancel { id: i64 },

    /// Rename a streak
    Rename { id: i64, name: String },

    /// Delete a streak
    Delete { id: i64 },

    /// Set the manual order: ids in the desired display order
    Reorder {
        #[arg(required = true)]
        ids: Vec<i64>,
    },

    /// Star or unstar a streak
    Star { id: i64 },

    /// Run the expiry sweep and report how many streaks lapsed
    Sweep,
}

/// A streak plus its state for the day, as printed by `list --json`
#[derive(Serialize)]
struct ListEntry<'a> {
    #[serde(flatten)]
    streak: &'a Streak,
    state: StreakState,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup tracing
    let default_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with_writer(std::io::stderr)
        .init();

    let config = Config::load(cli.config.as_deref())?;
    let store_dir = cli.store_path.clone().unwrap_or_else(|| config.store_dir.clone());
    let today = cli.today.unwrap_or_else(|| config.clock.today());

    // Open store and expire lapsed streaks
    let (mut store, expired) = StreakStore::init(&store_dir, config.sweep_cutoff(today)?)?;

    match cli.command {
        Commands::Add { name } => {
            let id = store.create(&name)?;
            println!("Created streak {}", id.to_string().bold());
            print_list(&store, today)?;
        }
        Commands::List { json } => {
            if json {
                print_json(&store, today)?;
            } else {
                print_list(&store, today)?;
            }
        }
        Commands::Continue { id } => {
            match store.continue_streak(id, today)? {
                ContinueOutcome::Continued { count } => {
                    println!("{} {} day(s)", "Continued:".green(), count);
                }
                ContinueOutcome::AlreadyDoneToday => {
                    println!("{}", "Already continued today".yellow());
                }
                ContinueOutcome::Dead => {
                    println!("{}", "This streak has lapsed; delete it and start again".red());
                }
                ContinueOutcome::NotFound => not_found(id),
            }
            print_list(&store, today)?;
        }
        Commands::Cancel { id } => {
            match store.cancel_today(id, today)? {
                CancelOutcome::Cancelled { count } => {
                    println!("{} back to {} day(s)", "Cancelled:".yellow(), count);
                }
                CancelOutcome::Unchanged => {
                    println!("{}", "Nothing to cancel today".dimmed());
                }
            }
            print_list(&store, today)?;
        }
        Commands::Rename { id, name } => {
            if !store.rename(id, &name)? {
                not_found(id);
            }
            print_list(&store, today)?;
        }
        Commands::Delete { id } => {
            if !store.delete(id)? {
                not_found(id);
            }
            print_list(&store, today)?;
        }
        Commands::Reorder { ids } => {
            let changed = store.reorder(&ids)?;
            if changed < ids.len() {
                println!("{}", format!("Skipped {} unknown id(s)", ids.len() - changed).dimmed());
            }
            print_list(&store, today)?;
        }
        Commands::Star { id } => {
            match store.toggle_star(id)? {
                Some(true) => println!("{}", "Starred".yellow()),
                Some(false) => println!("Unstarred"),
                None => not_found(id),
            }
            print_list(&store, today)?;
        }
        Commands::Sweep => {
            println!("{} streak(s) lapsed", expired);
            print_list(&store, today)?;
        }
    }

    Ok(())
}

fn not_found(id: i64) {
    println!("{}", format!("No streak with id {}", id).dimmed());
}

fn print_list(store: &StreakStore, today: NaiveDate) -> Result<()> {
    let streaks = store.list_all()?;
    if streaks.is_empty() {
        println!("{}", "No streaks yet".dimmed());
        return Ok(());
    }

    for streak in &streaks {
        let star = if streak.starred { "*".yellow().bold() } else { " ".normal() };
        let state = match streak.state(today) {
            StreakState::DoneToday => "done".green(),
            StreakState::Pending => "todo".cyan(),
            StreakState::NeverStarted => "new".normal(),
            StreakState::Dead => "dead".red(),
        };
        println!(
            "{} {:>4}  {:<5} {:>4}d  {}",
            star,
            streak.id,
            state,
            streak.count,
            if streak.alive {
                streak.name.normal()
            } else {
                streak.name.strikethrough()
            }
        );
    }
    Ok(())
}

fn print_json(store: &StreakStore, today: NaiveDate) -> Result<()> {
    let streaks = store.list_all()?;
    let entries: Vec<ListEntry> = streaks
        .iter()
        .map(|streak| ListEntry {
            streak,
            state: streak.state(today),
        })
        .collect();
    println!("{}", serde_json::to_string_pretty(&entries)?);
    Ok(())
}
