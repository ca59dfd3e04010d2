//! Command-line client for the schedule HTTP API.

use clap::{Parser, Subcommand};
use schedule_reminder::components::reminder::{
    notifier_from_config, start_scheduler, InMemoryNotifiedSet, Poller,
};
use schedule_reminder::config::Config;
use schedule_reminder::error::{AppResult, Error};
use schedule_reminder::models::{EventInput, EventPatch};
use schedule_reminder::startup;
use schedule_reminder::store::{EventStore, RemoteStore};
use schedule_reminder::utils::display::format_table;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "schedule-cli")]
#[command(about = "Manage schedules on a schedule-reminder server")]
struct Cli {
    /// API base URL (defaults to API_URL or http://127.0.0.1:5000/api)
    #[arg(long)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List all schedules
    List,

    /// Show one schedule
    Get { id: i64 },

    /// Add a schedule
    Add {
        title: String,
        /// Date as YYYY-MM-DD
        #[arg(long)]
        date: String,
        /// Start time as HH:MM
        #[arg(long)]
        start: String,
        /// End time as HH:MM
        #[arg(long)]
        end: String,
        /// Reminder time as HH:MM
        #[arg(long)]
        reminder: Option<String>,
    },

    /// Change fields of a schedule
    Update {
        id: i64,
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
        /// Remove the reminder
        #[arg(long)]
        clear_reminder: bool,
    },

    /// Delete a schedule
    Delete { id: i64 },

    /// Ask the server to show a test notification
    Test,

    /// Poll the server and show reminders on this machine
    Watch,
}

#[tokio::main]
async fn main() -> miette::Result<()> {
    let cli = Cli::parse();
    let config = Config::load()?;
    let api_url = cli.api_url.unwrap_or_else(|| config.api_url.clone());
    let store = RemoteStore::new(&api_url);

    match cli.command {
        Command::List => {
            println!("{}", format_table(&store.list().await?, true));
        }
        Command::Get { id } => {
            let event = store.get(id).await?.ok_or(Error::NotFound(id))?;
            println!("{}", format_table(&[event], true));
        }
        Command::Add {
            title,
            date,
            start,
            end,
            reminder,
        } => {
            let draft = EventInput {
                title,
                date,
                start_time: start,
                end_time: end,
                reminder_time: reminder,
            }
            .validate()?;
            let event = store.create(&draft).await?;
            println!("Added schedule {}", event.id);
        }
        Command::Update {
            id,
            title,
            date,
            start,
            end,
            reminder,
            clear_reminder,
        } => {
            let current = store.get(id).await?.ok_or(Error::NotFound(id))?;
            let patch = EventPatch {
                title,
                date,
                start_time: start,
                end_time: end,
                reminder_time: if clear_reminder { Some(None) } else { reminder.map(Some) },
            };
            let event = store.update(id, &patch.apply(&current)?).await?;
            println!("{}", format_table(&[event], true));
        }
        Command::Delete { id } => {
            store.delete(id).await?;
            println!("Deleted schedule {}", id);
        }
        Command::Test => {
            let message = store.test_reminder().await?;
            println!("{}", message);
        }
        Command::Watch => watch(config, store).await?,
    }

    Ok(())
}

/// Run the reminder poller against the remote store until Ctrl+C
async fn watch(config: Config, store: RemoteStore) -> AppResult<()> {
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
