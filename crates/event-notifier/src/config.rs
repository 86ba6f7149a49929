use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::NotifierError;
use crate::notifier::NotifierSettings;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// How often to check the calendar when no event is close (seconds)
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// How long before an event starts the reminder is shown (seconds)
    #[serde(default = "default_alarm_offset")]
    pub alarm_offset_secs: u64,

    /// Number of upcoming events fetched per check
    #[serde(default = "default_lookahead")]
    pub lookahead: u32,

    /// Monitoring URL pinged to signal the process is alive
    #[serde(default)]
    pub heartbeat_url: Option<String>,

    /// How often to ping the heartbeat URL (seconds)
    #[serde(default = "default_heartbeat_period")]
    pub heartbeat_period_secs: u64,

    /// Directory for the rotating log file
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,

    #[serde(default)]
    pub calendar: CalendarConfig,

    #[serde(default)]
    pub display: DisplayConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarConfig {
    /// Path to Google OAuth client credentials JSON file
    #[serde(default = "default_credentials_path")]
    pub credentials_path: String,

    /// Path to store the OAuth token cache
    #[serde(default = "default_token_cache")]
    pub token_cache_path: String,

    /// Calendar to watch
    #[serde(default = "default_calendar_id")]
    pub calendar_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayMode {
    /// Critical desktop notification
    Desktop,
    /// Reminder written to the log only
    Log,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    #[serde(default = "default_display_mode")]
    pub mode: DisplayMode,

    /// How long the reminder stays on screen (seconds)
    #[serde(default = "default_hold_duration")]
    pub hold_duration_secs: u64,
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            credentials_path: default_credentials_path(),
            token_cache_path: default_token_cache(),
            calendar_id: default_calendar_id(),
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            mode: default_display_mode(),
            hold_duration_secs: default_hold_duration(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval(),
            alarm_offset_secs: default_alarm_offset(),
            lookahead: default_lookahead(),
            heartbeat_url: None,
            heartbeat_period_secs: default_heartbeat_period(),
            log_dir: default_log_dir(),
            calendar: CalendarConfig::default(),
            display: DisplayConfig::default(),
        }
    }
}

/// Upper bound for the poll interval and the alarm offset (one day)
const MAX_WAIT_SECS: u64 = 24 * 60 * 60;

/// Legacy heartbeat file: `{"heartbeat_url": "..."}`
#[derive(Debug, Deserialize)]
struct HeartbeatFile {
    heartbeat_url: String,
}

fn default_poll_interval() -> u64 {
    15 * 60
}

fn default_alarm_offset() -> u64 {
    3 * 60 + 5
}

fn default_lookahead() -> u32 {
    5
}

fn default_heartbeat_period() -> u64 {
    5 * 60
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

fn default_credentials_path() -> String {
    "credentials.json".to_string()
}

fn default_token_cache() -> String {
    "token.json".to_string()
}

fn default_calendar_id() -> String {
    "primary".to_string()
}

fn default_display_mode() -> DisplayMode {
    DisplayMode::Desktop
}

fn default_hold_duration() -> u64 {
    100
}

impl Config {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::parse(&content)
    }

    /// Like `load`, but a missing file means the built-in defaults.
    /// Returns whether the file was found.
    pub fn load_or_default(path: &Path) -> anyhow::Result<(Self, bool)> {
        if !path.exists() {
            return Ok((Self::default(), false));
        }
        Ok((Self::load(path)?, true))
    }

    pub fn parse(content: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content).context("Failed to parse config")?;
        config.validate()?;
        Ok(config)
    }

    /// Fill `heartbeat_url` from a legacy `heartbeat.json` if none is configured.
    pub fn apply_heartbeat_file(&mut self, path: &Path) -> anyhow::Result<()> {
        if self.heartbeat_url.is_some() || !path.exists() {
            return Ok(());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let file: HeartbeatFile = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;

        tracing::info!("Using heartbeat URL from {}", path.display());
        self.heartbeat_url = Some(file.heartbeat_url);
        Ok(())
    }

    pub fn validate(&self) -> Result<(), NotifierError> {
        if self.poll_interval_secs == 0 {
            return Err(NotifierError::Config(
                "poll_interval_secs must be greater than zero".to_string(),
            ));
        }
        if self.poll_interval_secs > MAX_WAIT_SECS {
            return Err(NotifierError::Config(format!(
                "poll_interval_secs must be at most {}",
                MAX_WAIT_SECS
            )));
        }
        if self.alarm_offset_secs > MAX_WAIT_SECS {
            return Err(NotifierError::Config(format!(
                "alarm_offset_secs must be at most {}",
                MAX_WAIT_SECS
            )));
        }
        if self.lookahead == 0 {
            return Err(NotifierError::Config(
                "lookahead must be at least 1".to_string(),
            ));
        }
        if self.heartbeat_url.is_some() && self.heartbeat_period_secs == 0 {
            return Err(NotifierError::Config(
                "heartbeat_period_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn notifier_settings(&self) -> NotifierSettings {
        NotifierSettings {
            poll_interval: Duration::from_secs(self.poll_interval_secs),
            alarm_offset: Duration::from_secs(self.alarm_offset_secs),
            lookahead: self.lookahead,
        }
    }

    pub fn heartbeat_period(&self) -> Duration {
        Duration::from_secs(self.heartbeat_period_secs)
    }

    pub fn hold_duration(&self) -> Duration {
        Duration::from_secs(self.display.hold_duration_secs)
    }

    pub fn example() -> Self {
        Config {
            heartbeat_url: Some("https://hc-ping.com/your-check-uuid".to_string()),
            ..Self::default()
        }
    }
}
