//! Typed failures surfaced by the notifier.
//!
//! Application code mostly works with `anyhow::Result`; these variants exist
//! for the failures callers want to tell apart (bad configuration, a calendar
//! that cannot be read, a heartbeat endpoint answering with an error status).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum NotifierError {
    /// Invalid or inconsistent configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Calendar API call failed
    #[error("Calendar error: {0}")]
    Calendar(String),

    /// Heartbeat endpoint answered with a non-success status
    #[error("Heartbeat to {url} failed with status {status}")]
    HeartbeatStatus { url: String, status: u16 },

    /// Heartbeat request could not be sent
    #[error("Heartbeat request failed: {0}")]
    HeartbeatRequest(#[from] reqwest::Error),

    /// Reminder could not be displayed
    #[error("Display error: {0}")]
    Display(String),
}

impl NotifierError {
    pub fn calendar(message: impl Into<String>) -> Self {
        NotifierError::Calendar(message.into())
    }

    pub fn display(message: impl Into<String>) -> Self {
        NotifierError::Display(message.into())
    }
}

pub type NotifierResult<T> = Result<T, NotifierError>;
