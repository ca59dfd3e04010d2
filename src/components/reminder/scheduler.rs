use chrono::NaiveDateTime;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration as TokioDuration};
use tracing::{debug, error, info};

use super::matcher::{due_with_mode, MatchMode, NotifiedSet, OccasionKey};
use super::notifications::{reminder_message, Notifier};
use crate::error::AppResult;
use crate::store::EventStore;
use crate::utils::time::{local_now, truncate_to_minute};

/// Outcome of one reminder check
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollReport {
    /// Due events found this cycle
    pub candidates: usize,
    /// Notifications handed to the notifier
    pub notified: usize,
    /// Notifications that failed and will be retried if still due
    pub failed: usize,
}

/// Drives the matcher against the store and dispatches notifications
#[derive(Clone)]
pub struct Poller {
    store: Arc<dyn EventStore>,
    notifier: Arc<dyn Notifier>,
    notified: Arc<dyn NotifiedSet>,
    mode: MatchMode,
    title: String,
}

impl Poller {
    pub fn new(
        store: Arc<dyn EventStore>,
        notifier: Arc<dyn Notifier>,
        notified: Arc<dyn NotifiedSet>,
        mode: MatchMode,
        title: &str,
    ) -> Self {
        Self {
            store,
            notifier,
            notified,
            mode,
            title: title.to_string(),
        }
    }

    /// The notified set shared with this poller
    pub fn notified(&self) -> Arc<dyn NotifiedSet> {
        Arc::clone(&self.notified)
    }

    /// Run one reminder check as of `now`
    ///
    /// A key is recorded only after its notification succeeds, so a failed
    /// notification is retried by a later cycle that still finds it due.
    pub async fn poll_once(&self, now: NaiveDateTime) -> AppResult<PollReport> {
        let now = truncate_to_minute(now);
        let pruned = self.notified.prune_before(now.date());
        if pruned > 0 {
            debug!("Forgot {} reminder keys from previous days", pruned);
        }

        let events = self.store.list().await?;
        let due = due_with_mode(now, &events, self.notified.as_ref(), self.mode);

        let mut report = PollReport {
            candidates: due.len(),
            ..PollReport::default()
        };

        for event in due {
            let Some(key) = OccasionKey::for_event(&event) else {
                continue;
            };
            let message = reminder_message(&event);

            match self.notifier.notify(&self.title, &message).await {
                Ok(()) => {
                    self.notified.insert(key);
                    report.notified += 1;
                    info!("Sent reminder for \"{}\" ({})", event.title, key);
                }
                Err(e) => {
                    report.failed += 1;
                    error!("Failed to send reminder for \"{}\": {}", event.title, e);
                }
            }
        }

        Ok(report)
    }
}

/// Start the reminder polling task
pub fn start_scheduler(poller: Poller, interval: TokioDuration) -> JoinHandle<()> {
    info!(
        "Starting reminder poller (every {}s)",
        interval.as_secs().max(1)
    );
    tokio::spawn(async move {
        run_scheduler_loop(poller, interval).await;
    })
}

/// Check, then sleep for the cadence; a failed cycle never ends the loop
async fn run_scheduler_loop(poller: Poller, interval: TokioDuration) {
    loop {
        let now = local_now();
        debug!("Checking reminders at {}", now.format("%Y-%m-%d %H:%M"));

        match poller.poll_once(now).await {
            Ok(report) if report.candidates > 0 => {
                info!(
                    "Reminder check: {} due, {} sent, {} failed",
                    report.candidates, report.notified, report.failed
                );
            }
            Ok(_) => {}
            Err(e) => {
                error!("Reminder check failed: {}", e);
            }
        }

        sleep(interval).await;
    }
}
