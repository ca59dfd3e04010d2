use crate::components::reminder::MatchMode;
use crate::error::{config_error, env_error, AppResult};
use dotenvy::dotenv;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;

/// Default title of reminder notifications
pub const DEFAULT_NOTIFICATION_TITLE: &str = "Schedule reminder";

/// Default API base URL used by the command-line client
pub const DEFAULT_API_URL: &str = "http://127.0.0.1:5000/api";

/// Where the event store lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Sqlite,
    Json,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sqlite" => Ok(Self::Sqlite),
            "json" => Ok(Self::Json),
            "memory" => Ok(Self::Memory),
            other => Err(config_error(&format!("Unknown store backend: {}", other))),
        }
    }
}

/// Which notification sink the poller uses
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotifierKind {
    Desktop,
    Log,
    Webhook { url: String },
}

/// Main configuration structure for the service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Event store backend
    pub store_backend: StoreBackend,
    /// SQLite database file
    pub database_path: PathBuf,
    /// JSON schedule file
    pub schedule_file: PathBuf,
    /// HTTP bind address
    pub bind_address: String,
    /// HTTP port
    pub port: u16,
    /// Seconds between reminder checks
    pub poll_interval_secs: u64,
    /// How reminder times are matched against the clock
    pub match_mode: MatchMode,
    /// Notification sink
    pub notifier: NotifierKind,
    /// Title used for reminder notifications
    pub notification_title: String,
    /// API base URL for remote clients
    pub api_url: String,
    /// Map of component names to their enabled status
    pub components: HashMap<String, bool>,
}

impl Default for Config {
    fn default() -> Self {
        let mut components = HashMap::new();
        components.insert("reminder_poller".to_string(), true);
        components.insert("web_server".to_string(), true);

        Self {
            store_backend: StoreBackend::Sqlite,
            database_path: PathBuf::from("schedules.db"),
            schedule_file: PathBuf::from("schedule_data.json"),
            bind_address: "127.0.0.1".to_string(),
            port: 5000,
            poll_interval_secs: 60,
            match_mode: MatchMode::ExactMinute,
            notifier: NotifierKind::Desktop,
            notification_title: DEFAULT_NOTIFICATION_TITLE.to_string(),
            api_url: DEFAULT_API_URL.to_string(),
            components,
        }
    }
}

impl Config {
    /// Load configuration from environment and config file
    pub fn load() -> AppResult<Self> {
        // Load .env file if it exists
        dotenv().ok();

        let mut config = Self::from_lookup(|key| env::var(key).ok())?;

        // Load components configuration from file if it exists
        if let Ok(content) = fs::read_to_string("config/components.toml") {
            config.merge_components(&content)?;
        }

        Ok(config)
    }

    /// Build a configuration from any key lookup, starting from defaults
    pub fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(backend) = get("STORE_BACKEND") {
            config.store_backend = backend.parse()?;
        }

        if let Some(path) = get("DATABASE_PATH") {
            config.database_path = PathBuf::from(path);
        } else if let Some(url) = get("DATABASE_URL") {
            let path = url
                .strip_prefix("sqlite:///")
                .or_else(|| url.strip_prefix("sqlite://"))
                .ok_or_else(|| config_error("DATABASE_URL must use the sqlite:// scheme"))?;
            config.database_path = PathBuf::from(path);
        }

        if let Some(path) = get("SCHEDULE_FILE") {
            config.schedule_file = PathBuf::from(path);
        }

        if let Some(address) = get("BIND_ADDRESS") {
            config.bind_address = address;
        }

        if let Some(port) = get("PORT") {
            config.port = port
                .trim()
                .parse::<u16>()
                .map_err(|_| config_error("Invalid PORT format"))?;
        }

        if let Some(interval) = get("POLL_INTERVAL_SECS") {
            config.poll_interval_secs = interval
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs >= 1)
                .ok_or_else(|| config_error("POLL_INTERVAL_SECS must be a positive integer"))?;
        }

        if let Some(mode) = get("REMINDER_MATCH_MODE") {
            config.match_mode = mode.parse()?;
        }

        if let Some(kind) = get("NOTIFIER") {
            config.notifier = match kind.trim().to_ascii_lowercase().as_str() {
                "desktop" => NotifierKind::Desktop,
                "log" => NotifierKind::Log,
                "webhook" => NotifierKind::Webhook {
                    url: get("WEBHOOK_URL").ok_or_else(|| env_error("WEBHOOK_URL"))?,
                },
                other => return Err(config_error(&format!("Unknown notifier: {}", other))),
            };
        }

        if let Some(title) = get("NOTIFICATION_TITLE") {
            config.notification_title = title;
        }

        if let Some(url) = get("API_URL") {
            config.api_url = url;
        }

        Ok(config)
    }

    /// Merge a components TOML document over the defaults
    pub fn merge_components(&mut self, content: &str) -> AppResult<()> {
        let file_components = toml::from_str::<HashMap<String, bool>>(content)?;
        for (key, value) in file_components {
            self.components.insert(key, value);
        }
        Ok(())
    }

    /// Check if a component is enabled
    pub fn is_component_enabled(&self, name: &str) -> bool {
        *self.components.get(name).unwrap_or(&false)
    }

    /// Address the HTTP server binds to
    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}
