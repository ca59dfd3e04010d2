pub mod matcher;
pub mod notifications;
pub mod scheduler;

pub use matcher::{due, due_with_mode, InMemoryNotifiedSet, MatchMode, NotifiedSet, OccasionKey};
pub use notifications::{
    notifier_from_config, reminder_message, send_test_notification, DesktopNotifier, LogNotifier,
    Notifier, WebhookNotifier,
};
pub use scheduler::{start_scheduler, PollReport, Poller};

use crate::config::Config;
use crate::error::AppResult;
use crate::store::EventStore;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

/// Reminder poller component
pub struct ReminderPoller {
    notifier: Arc<dyn Notifier>,
    notified: Arc<dyn NotifiedSet>,
    task: RwLock<Option<JoinHandle<()>>>,
}

impl ReminderPoller {
    /// Create the component around a notifier and a notified set
    pub fn new(notifier: Arc<dyn Notifier>, notified: Arc<dyn NotifiedSet>) -> Self {
        Self {
            notifier,
            notified,
            task: RwLock::new(None),
        }
    }

    /// Whether the polling task is currently running
    pub async fn is_running(&self) -> bool {
        self.task
            .read()
            .await
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }
}

#[async_trait]
impl super::Component for ReminderPoller {
    fn name(&self) -> &'static str {
        "reminder_poller"
    }

    async fn init(&self, config: Arc<RwLock<Config>>, store: Arc<dyn EventStore>) -> AppResult<()> {
        let mut task = self.task.write().await;
        if task.is_some() {
            tracing::warn!("Reminder poller is already running, skipping initialization");
            return Ok(());
        }

        let (interval, mode, title) = {
            let config = config.read().await;
            (
                Duration::from_secs(config.poll_interval_secs.max(1)),
                config.match_mode,
                config.notification_title.clone(),
            )
        };

        let poller = Poller::new(
            store,
            Arc::clone(&self.notifier),
            Arc::clone(&self.notified),
            mode,
            &title,
        );
        *task = Some(start_scheduler(poller, interval));
        Ok(())
    }

    async fn shutdown(&self) -> AppResult<()> {
        if let Some(task) = self.task.write().await.take() {
            task.abort();
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}
