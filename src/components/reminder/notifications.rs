use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::sync::Arc;
use tokio::process::Command;
use tracing::{debug, info};

use crate::config::{Config, NotifierKind};
use crate::error::{notification_error, AppResult};
use crate::models::Event;

/// Body of the notification sent by the test endpoint
pub const TEST_MESSAGE: &str = "This is a test notification";

/// How long a desktop toast stays on screen
const TOAST_DURATION_MS: u32 = 30_000;

/// A fire-and-forget notification sink
#[async_trait]
pub trait Notifier: Send + Sync + 'static {
    /// Short name for logs
    fn name(&self) -> &'static str;

    /// Show a notification; success means it was handed to the platform
    async fn notify(&self, title: &str, body: &str) -> AppResult<()>;
}

/// Format the reminder text for an event
pub fn reminder_message(event: &Event) -> String {
    format!("Starting soon: {}\nTime: {}", event.title, event.time_span())
}

/// Send the fixed test notification
pub async fn send_test_notification(notifier: &dyn Notifier, title: &str) -> AppResult<()> {
    info!("Sending test notification via {}", notifier.name());
    notifier.notify(&format!("{} (test)", title), TEST_MESSAGE).await
}

/// Build the notifier selected in the configuration
pub fn notifier_from_config(config: &Config) -> Arc<dyn Notifier> {
    match &config.notifier {
        NotifierKind::Desktop => Arc::new(DesktopNotifier::new()),
        NotifierKind::Log => Arc::new(LogNotifier),
        NotifierKind::Webhook { url } => Arc::new(WebhookNotifier::new(url)),
    }
}

/// Native desktop toast through the platform's notification command
#[derive(Debug, Clone, Default)]
pub struct DesktopNotifier;

impl DesktopNotifier {
    pub fn new() -> Self {
        Self
    }

    #[cfg(target_os = "macos")]
    fn command(title: &str, body: &str) -> Command {
        let mut cmd = Command::new("osascript");
        cmd.args([
            "-e",
            "on run argv",
            "-e",
            "display notification (item 2 of argv) with title (item 1 of argv)",
            "-e",
            "end run",
            title,
            body,
        ]);
        cmd
    }

    #[cfg(windows)]
    fn command(title: &str, body: &str) -> Command {
        let script = format!(
            "Add-Type -AssemblyName System.Windows.Forms; \
             $n = New-Object System.Windows.Forms.NotifyIcon; \
             $n.Icon = [System.Drawing.SystemIcons]::Information; \
             $n.Visible = $true; \
             $n.ShowBalloonTip({}, $env:REMINDER_TITLE, $env:REMINDER_BODY, 'Info'); \
             Start-Sleep -Seconds 10; $n.Dispose()",
            TOAST_DURATION_MS
        );
        let mut cmd = Command::new("powershell");
        cmd.args(["-NoProfile", "-NonInteractive", "-Command", &script])
            .env("REMINDER_TITLE", title)
            .env("REMINDER_BODY", body);
        cmd
    }

    #[cfg(not(any(target_os = "macos", windows)))]
    fn command(title: &str, body: &str) -> Command {
        let mut cmd = Command::new("notify-send");
        cmd.arg("--app-name=schedule-reminder")
            .arg(format!("--expire-time={}", TOAST_DURATION_MS))
            .arg(title)
            .arg(body);
        cmd
    }
}

#[async_trait]
impl Notifier for DesktopNotifier {
    fn name(&self) -> &'static str {
        "desktop"
    }

    async fn notify(&self, title: &str, body: &str) -> AppResult<()> {
        let mut cmd = Self::command(title, body);

        // The balloon script keeps running while the toast is visible
        if cfg!(windows) {
            cmd.spawn()
                .map_err(|e| notification_error(&format!("Failed to start notifier: {}", e)))?;
            return Ok(());
        }

        let status = cmd
            .status()
            .await
            .map_err(|e| notification_error(&format!("Failed to start notifier: {}", e)))?;
        if !status.success() {
            return Err(notification_error(&format!(
                "Notifier exited with {}",
                status
            )));
        }
        debug!("Desktop notification shown: {}", title);
        Ok(())
    }
}

/// Writes notifications to the log, for headless machines
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn notify(&self, title: &str, body: &str) -> AppResult<()> {
        info!(title = %title, body = %body, "Reminder notification");
        Ok(())
    }
}

/// POSTs notifications as JSON to a URL
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: &str) -> Self {
        Self {
            client: Client::new(),
            url: url.to_string(),
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    fn name(&self) -> &'static str {
        "webhook"
    }

    async fn notify(&self, title: &str, body: &str) -> AppResult<()> {
        let response = self
            .client
            .post(&self.url)
            .json(&json!({ "title": title, "body": body }))
            .send()
            .await
            .map_err(|e| notification_error(&format!("Webhook request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(notification_error(&format!(
                "Webhook returned {}",
                response.status()
            )));
        }
        Ok(())
    }
}
