use miette::Diagnostic;
use thiserror::Error;

/// Main error type for the application
#[derive(Debug, Error, Diagnostic)]
pub enum Error {
    #[error("{0}")]
    #[diagnostic(code(schedule_reminder::validation))]
    Validation(String),

    #[error("Schedule {0} not found")]
    #[diagnostic(code(schedule_reminder::not_found))]
    NotFound(i64),

    #[error("Storage error: {0}")]
    #[diagnostic(code(schedule_reminder::storage))]
    Storage(String),

    #[error("Notification error: {0}")]
    #[diagnostic(code(schedule_reminder::notification))]
    Notification(String),

    #[error("Environment error: {0}")]
    #[diagnostic(code(schedule_reminder::environment))]
    Environment(String),

    #[error("Configuration error: {0}")]
    #[diagnostic(code(schedule_reminder::config))]
    Config(String),

    #[error("Remote API error: {0}")]
    #[diagnostic(code(schedule_reminder::remote))]
    Remote(String),

    #[error(transparent)]
    #[diagnostic(code(schedule_reminder::io))]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    #[diagnostic(code(schedule_reminder::serialization))]
    Serialization(String),

    #[error("Other error: {0}")]
    #[diagnostic(code(schedule_reminder::other))]
    Other(String),
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Remote(err.to_string())
    }
}

impl From<askama::Error> for Error {
    fn from(err: askama::Error) -> Self {
        Error::Other(format!("Template rendering failed: {}", err))
    }
}

/// Type alias for Result with our Error type
pub type AppResult<T> = Result<T, Error>;

/// Helper to create environment errors
pub fn env_error(var: &str) -> Error {
    Error::Environment(format!("Missing environment variable: {}", var))
}

/// Helper to create configuration errors
pub fn config_error(message: &str) -> Error {
    Error::Config(message.to_string())
}

/// Helper to create validation errors
pub fn validation_error(message: &str) -> Error {
    Error::Validation(message.to_string())
}

/// Helper to create storage errors
pub fn storage_error(message: &str) -> Error {
    Error::Storage(message.to_string())
}

/// Helper to create notification errors
pub fn notification_error(message: &str) -> Error {
    Error::Notification(message.to_string())
}
