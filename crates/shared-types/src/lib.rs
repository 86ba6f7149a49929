use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Title shown for events that have no summary
pub const UNTITLED_EVENT: &str = "No Title";

/// Start or end of a calendar event, matching the Google Calendar wire shape.
///
/// Timed events carry `dateTime`; all-day events carry only `date`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDateTime {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_time: Option<DateTime<FixedOffset>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

impl EventDateTime {
    pub fn timed(at: DateTime<Utc>) -> Self {
        Self {
            date_time: Some(at.fixed_offset()),
            ..Default::default()
        }
    }

    pub fn all_day(date: NaiveDate) -> Self {
        Self {
            date: Some(date),
            ..Default::default()
        }
    }

    pub fn as_utc(&self) -> Option<DateTime<Utc>> {
        self.date_time.map(|dt| dt.with_timezone(&Utc))
    }
}

/// An upcoming calendar event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub summary: Option<String>,
    pub start: EventDateTime,
    #[serde(default)]
    pub end: Option<EventDateTime>,
    #[serde(default)]
    pub status: Option<String>, // "confirmed", "tentative", "cancelled"
    #[serde(default)]
    pub html_link: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
}

/// Identity of a single occurrence of an event.
///
/// A rescheduled event keeps its id but gets a new key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EventKey {
    pub id: String,
    pub start: DateTime<Utc>,
}

impl CalendarEvent {
    /// Timed start in UTC, `None` for all-day events
    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        self.start.as_utc()
    }

    pub fn is_all_day(&self) -> bool {
        self.start.date_time.is_none() && self.start.date.is_some()
    }

    pub fn is_cancelled(&self) -> bool {
        self.status.as_deref() == Some("cancelled")
    }

    pub fn key(&self) -> Option<EventKey> {
        self.start_time().map(|start| EventKey {
            id: self.id.clone(),
            start,
        })
    }

    pub fn display_title(&self) -> &str {
        match self.summary.as_deref() {
            Some(s) if !s.trim().is_empty() => s,
            _ => UNTITLED_EVENT,
        }
    }
}
