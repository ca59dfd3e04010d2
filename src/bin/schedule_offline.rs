//! Standalone schedule client working on a local JSON file.

use clap::{Parser, Subcommand};
use schedule_reminder::components::reminder::{
    notifier_from_config, start_scheduler, InMemoryNotifiedSet, Poller,
};
use schedule_reminder::config::Config;
use schedule_reminder::error::{validation_error, AppResult, Error};
use schedule_reminder::models::{EventInput, EventPatch, INVALID_FORMAT_MESSAGE};
use schedule_reminder::startup;
use schedule_reminder::store::{EventStore, JsonFileStore};
use schedule_reminder::utils::display::format_table;
use schedule_reminder::utils::time::{
    format_date, format_time, local_now, one_hour_after_clamped, parse_time,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "schedule-offline")]
#[command(about = "Keep schedules in a local JSON file")]
struct Cli {
    /// Schedule file (defaults to SCHEDULE_FILE or schedule_data.json)
    #[arg(long)]
    file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List schedules in time order, numbered from 1
    List,

    /// Add a schedule; date and times default to now and one hour from now
    Add {
        title: String,
        #[arg(long)]
        date: Option<String>,
        #[arg(long)]
        start: Option<String>,
        #[arg(long)]
        end: Option<String>,
        #[arg(long)]
        reminder: Option<String>,
    },

    /// Change fields of the schedule at a list position
    Edit {
        position: usize,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        date: Option<String>,
        #[arg(long)]
        start: Option<String>,
        #[arg(long)]
        end: Option<String>,
        #[arg(long, conflicts_with = "clear_reminder")]
        reminder: Option<String>,
        #[arg(long)]
        clear_reminder: bool,
    },

    /// Remove the schedules at the given list positions
    Remove {
        #[arg(required = true)]
        positions: Vec<usize>,
    },

    /// Show reminders for schedules in the file
    Watch,
}

/// Convert 1-based list positions to indices
fn to_indices(positions: &[usize]) -> AppResult<Vec<usize>> {
    positions
        .iter()
        .map(|&p| {
            p.checked_sub(1)
                .ok_or_else(|| validation_error("Positions start at 1"))
        })
        .collect()
}

#[tokio::main]
async fn main() -> miette::Result<()> {
    let cli = Cli::parse();
    let config = Config::load()?;
    let path = cli.file.unwrap_or_else(|| config.schedule_file.clone());
    let store = JsonFileStore::open(&path).await?;

    match cli.command {
        Command::List => {
            println!("{}", format_table(&store.list().await?, false));
        }
        Command::Add {
            title,
            date,
            start,
            end,
            reminder,
        } => {
            let now = local_now();
            let start = start.unwrap_or_else(|| format_time(&now.time()));
            let end = match end {
                Some(end) => end,
                None => {
                    let start_time = parse_time(&start)
                        .ok_or_else(|| validation_error(INVALID_FORMAT_MESSAGE))?;
                    format_time(&one_hour_after_clamped(start_time))
                }
            };
            let draft = EventInput {
                title,
                date: date.unwrap_or_else(|| format_date(&now.date())),
                start_time: start,
                end_time: end,
                reminder_time: reminder,
            }
            .validate()?;
            let event = store.create(&draft).await?;
            println!("Added \"{}\" on {}", event.title, format_date(&event.date));
        }
        Command::Edit {
            position,
            title,
            date,
            start,
            end,
            reminder,
            clear_reminder,
        } => {
            let index = to_indices(&[position])?[0];
            let events = store.list().await?;
            let current = events
                .get(index)
                .ok_or_else(|| validation_error(&format!("No schedule at position {}", position)))?;
            let patch = EventPatch {
                title,
                date,
                start_time: start,
                end_time: end,
                reminder_time: if clear_reminder { Some(None) } else { reminder.map(Some) },
            };
            let event = store.update_at(index, &patch.apply(current)?).await?;
            println!("Updated \"{}\"", event.title);
        }
        Command::Remove { positions } => {
            let removed = store.remove_at(&to_indices(&positions)?).await?;
            for event in removed {
                println!("Removed \"{}\"", event.title);
            }
        }
        Command::Watch => watch(config, store).await?,
    }

    Ok(())
}

/// Run the reminder poller over the file store until Ctrl+C
async fn watch(config: Config, store: JsonFileStore) -> AppResult<()> {
    startup::init_logging().map_err(|e| Error::Other(e.to_string()))?;

    let poller = Poller::new(
        Arc::new(store),
        notifier_from_config(&config),
        Arc::new(InMemoryNotifiedSet::new()),
        config.match_mode,
        &config.notification_title,
    );
    let task = start_scheduler(poller, Duration::from_secs(config.poll_interval_secs.max(1)));

    tokio::signal::ctrl_c().await?;
    task.abort();
    Ok(())
}
