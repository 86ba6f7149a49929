//! Reminder presentation.

use anyhow::Result;
use chrono::{DateTime, Utc};
use notify_rust::{Notification, Timeout};
use shared_types::CalendarEvent;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::config::DisplayMode;
use crate::error::NotifierError;

pub const APP_NAME: &str = "Event Notifier";
pub const ALERT_TITLE: &str = "Upcoming Event!";

/// Something that can put a reminder in front of the user
#[allow(async_fn_in_trait)]
pub trait NotificationSink {
    async fn show(&self, event: &CalendarEvent) -> Result<()>;
}

/// "Starting in 3 minutes" / "Starting in 42 seconds" / "Starting now"
pub fn countdown_text(start: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let remaining = (start - now).num_seconds();
    if remaining <= 0 {
        return "Starting now".to_string();
    }

    let minutes = remaining / 60;
    match minutes {
        0 => format!("Starting in {} {}", remaining, plural(remaining, "second")),
        m => format!("Starting in {} {}", m, plural(m, "minute")),
    }
}

pub fn closing_text(hold: Duration) -> String {
    let secs = hold.as_secs() as i64;
    format!("Window closes in {} {}", secs, plural(secs, "second"))
}

fn plural(n: i64, unit: &str) -> String {
    if n == 1 {
        unit.to_string()
    } else {
        format!("{}s", unit)
    }
}

/// Body lines shown under the alert title
pub fn alert_body(event: &CalendarEvent, now: DateTime<Utc>, remaining: Duration) -> String {
    let mut lines = vec![event.display_title().to_string()];
    if let Some(start) = event.start_time() {
        lines.push(countdown_text(start, now));
    }
    if let Some(location) = event.location.as_deref().filter(|l| !l.is_empty()) {
        lines.push(location.to_string());
    }
    lines.push(closing_text(remaining));
    lines.join("\n")
}

/// Time the reminder still stays up, `None` once the hold is over
pub fn remaining_hold(hold: Duration, elapsed: Duration) -> Option<Duration> {
    hold.checked_sub(elapsed).filter(|remaining| !remaining.is_zero())
}

const FIRST_REPLACE_ID: u32 = 7100;

fn base_notification(event: &CalendarEvent, remaining: Duration) -> Notification {
    let body = alert_body(event, Utc::now(), remaining);
    let timeout_ms = u32::try_from(remaining.as_millis()).unwrap_or(u32::MAX);

    let mut notification = Notification::new();
    notification
        .appname(APP_NAME)
        .summary(ALERT_TITLE)
        .body(&body)
        .timeout(Timeout::Milliseconds(timeout_ms));
    notification
}

/// Critical desktop notification with a live countdown, closed after the
/// hold duration or when the user dismisses it.
#[derive(Debug, Clone)]
pub struct DesktopAlert {
    hold_duration: Duration,
    next_id: Arc<AtomicU32>,
}

impl DesktopAlert {
    pub fn new(hold_duration: Duration) -> Self {
        Self {
            hold_duration,
            next_id: Arc::new(AtomicU32::new(FIRST_REPLACE_ID)),
        }
    }
}

#[cfg(all(unix, not(target_os = "macos")))]
mod xdg {
    use super::*;
    use notify_rust::Urgency;
    use tokio::sync::oneshot;
    use tokio::time::{self, Instant};

    const REFRESH_INTERVAL: Duration = Duration::from_secs(1);

    /// Reminder notification shown under a fixed id so re-shows replace it
    fn reminder(event: &CalendarEvent, remaining: Duration, replace_id: u32) -> Notification {
        let mut notification = base_notification(event, remaining);
        notification
            .id(replace_id)
            .urgency(Urgency::Critical)
            .action("default", "Dismiss");
        notification
    }

    impl NotificationSink for DesktopAlert {
        async fn show(&self, event: &CalendarEvent) -> Result<()> {
            let replace_id = self.next_id.fetch_add(1, Ordering::Relaxed);
            let shown_at = Instant::now();

            let handle = reminder(event, self.hold_duration, replace_id)
                .show_async()
                .await
                .map_err(|e| NotifierError::display(e.to_string()))?;

            tracing::info!(
                "Displayed reminder for '{}' (id: {}, hold: {:?})",
                event.display_title(),
                replace_id,
                self.hold_duration
            );

            // Resolves when the user dismisses the reminder or the server closes it
            let (closed_tx, closed_rx) = oneshot::channel();
            tokio::task::spawn_blocking(move || {
                handle.wait_for_action(|action| {
                    tracing::debug!("Reminder {} closed ({})", replace_id, action);
                });
                let _ = closed_tx.send(());
            });

            tokio::spawn(run_countdown(
                event.clone(),
                replace_id,
                shown_at,
                self.hold_duration,
                closed_rx,
            ));
            Ok(())
        }
    }

    /// Refresh the countdown every second, then close once the hold is over.
    async fn run_countdown(
        event: CalendarEvent,
        replace_id: u32,
        shown_at: Instant,
        hold: Duration,
        mut closed: oneshot::Receiver<()>,
    ) {
        let mut ticker = time::interval_at(shown_at + REFRESH_INTERVAL, REFRESH_INTERVAL);

        loop {
            tokio::select! {
                _ = &mut closed => {
                    tracing::debug!("Reminder {} dismissed", replace_id);
                    return;
                }
                _ = ticker.tick() => {
                    let Some(remaining) = remaining_hold(hold, shown_at.elapsed()) else {
                        break;
                    };
                    if let Err(e) = reminder(&event, remaining, replace_id).show_async().await {
                        tracing::warn!("Failed to update reminder {}: {}", replace_id, e);
                        break;
                    }
                }
            }
        }

        close(replace_id).await;
    }

    /// Critical notifications never expire on their own; replace this one with
    /// a low-urgency notification that times out right away.
    async fn close(replace_id: u32) {
        tracing::debug!("Closing reminder {}", replace_id);
        let mut notification = Notification::new();
        let _ = notification
            .appname(APP_NAME)
            .summary(ALERT_TITLE)
            .body("")
            .id(replace_id)
            .urgency(Urgency::Low)
            .timeout(Timeout::Milliseconds(1))
            .show_async()
            .await;
    }
}

#[cfg(not(all(unix, not(target_os = "macos"))))]
impl NotificationSink for DesktopAlert {
    async fn show(&self, event: &CalendarEvent) -> Result<()> {
        // No replace ids here: show once and let the platform expire it
        let notification = base_notification(event, self.hold_duration);
        let replace_id = self.next_id.fetch_add(1, Ordering::Relaxed);

        tokio::task::spawn_blocking(move || {
            notification.show().map(|_| ()).map_err(|e| e.to_string())
        })
        .await
        .map_err(|e| NotifierError::display(format!("notification task failed: {}", e)))?
        .map_err(NotifierError::display)?;

        tracing::info!(
            "Displayed reminder for '{}' (id: {}, hold: {:?})",
            event.display_title(),
            replace_id,
            self.hold_duration
        );
        Ok(())
    }
}

/// Writes the reminder to the log, for headless machines
#[derive(Debug, Clone)]
pub struct LogAlert {
    hold_duration: Duration,
}

impl LogAlert {
    pub fn new(hold_duration: Duration) -> Self {
        Self { hold_duration }
    }
}

impl NotificationSink for LogAlert {
    async fn show(&self, event: &CalendarEvent) -> Result<()> {
        let body = alert_body(event, Utc::now(), self.hold_duration);
        tracing::warn!("{} {}", ALERT_TITLE, body.replace('\n', " | "));
        Ok(())
    }
}

/// Shows through `primary`, falling back to `fallback` when that fails
#[derive(Debug, Clone)]
pub struct WithFallback<P, F> {
    primary: P,
    fallback: F,
}

impl<P, F> WithFallback<P, F> {
    pub fn new(primary: P, fallback: F) -> Self {
        Self { primary, fallback }
    }
}

impl<P, F> NotificationSink for WithFallback<P, F>
where
    P: NotificationSink,
    F: NotificationSink,
{
    async fn show(&self, event: &CalendarEvent) -> Result<()> {
        match self.primary.show(event).await {
            Ok(()) => Ok(()),
            Err(e) => {
                tracing::warn!("Reminder display failed, using fallback: {}", e);
                self.fallback.show(event).await
            }
        }
    }
}

/// Sink selected by configuration.
///
/// Desktop reminders that fail to show are written to the log instead.
#[derive(Debug, Clone)]
pub enum Alert {
    Desktop(WithFallback<DesktopAlert, LogAlert>),
    Log(LogAlert),
}

impl Alert {
    pub fn new(mode: DisplayMode, hold_duration: Duration) -> Self {
        let log = LogAlert::new(hold_duration);
        match mode {
            DisplayMode::Desktop => {
                Alert::Desktop(WithFallback::new(DesktopAlert::new(hold_duration), log))
            }
            DisplayMode::Log => Alert::Log(log),
        }
    }
}

impl NotificationSink for Alert {
    async fn show(&self, event: &CalendarEvent) -> Result<()> {
        match self {
            Alert::Desktop(desktop) => desktop.show(event).await,
            Alert::Log(log) => log.show(event).await,
        }
    }
}
