//! Event notifier loop.
//!
//! Each cycle checks the calendar for the next event. If the reminder for it
//! is due within one poll interval, the loop sleeps until the reminder time,
//! confirms the event is still on the calendar and shows it. Otherwise it
//! sleeps a full poll interval and checks again.

use chrono::{DateTime, Utc};
use shared_types::{CalendarEvent, EventKey};
use std::collections::HashSet;
use std::time::Duration;

use crate::calendar_client::EventSource;
use crate::display::NotificationSink;
use crate::shutdown::Shutdown;

/// Source of the current time
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Clone)]
pub struct NotifierSettings {
    /// Sleep between checks while no reminder is due
    pub poll_interval: Duration,
    /// How long before the event start the reminder is shown
    pub alarm_offset: Duration,
    /// Events fetched per check
    pub lookahead: u32,
}

impl Default for NotifierSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(15 * 60),
            alarm_offset: Duration::from_secs(3 * 60 + 5),
            lookahead: 5,
        }
    }
}

/// What a single check cycle ended up doing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Calendar could not be read; slept a poll interval
    FetchFailed,
    /// Nothing left to remind about; slept a poll interval
    Idle,
    /// Next reminder is more than a poll interval away; slept a poll interval
    Waiting(EventKey),
    /// Reminder was handed to the sink
    Notified(EventKey),
    /// Event was cancelled or moved while waiting for its reminder
    Changed(EventKey),
}

pub struct Notifier<S, N, C = SystemClock> {
    source: S,
    sink: N,
    clock: C,
    settings: NotifierSettings,
    notified: HashSet<EventKey>,
}

impl<S, N, C> Notifier<S, N, C>
where
    S: EventSource,
    N: NotificationSink,
    C: Clock,
{
    pub fn new(source: S, sink: N, clock: C, settings: NotifierSettings) -> Self {
        Self {
            source,
            sink,
            clock,
            settings,
            notified: HashSet::new(),
        }
    }

    /// Run check cycles until `shutdown` fires.
    pub async fn run(&mut self, mut shutdown: Shutdown) {
        tracing::info!(
            "Starting notifier (poll interval: {:?}, alarm offset: {:?})",
            self.settings.poll_interval,
            self.settings.alarm_offset
        );

        while !shutdown.is_triggered() {
            tokio::select! {
                _ = shutdown.wait() => break,
                outcome = self.check_and_wait() => {
                    tracing::debug!("Cycle finished: {:?}", outcome);
                }
            }
        }

        tracing::info!("Notifier stopped");
    }

    /// One check of the calendar, including the sleep that follows it.
    pub async fn check_and_wait(&mut self) -> CycleOutcome {
        tracing::info!("Checking for next event");

        let events = match self.source.upcoming_events(self.settings.lookahead).await {
            Ok(events) => events,
            Err(e) => {
                tracing::error!("Failed to fetch events: {:?}", e);
                self.sleep(self.settings.poll_interval).await;
                return CycleOutcome::FetchFailed;
            }
        };

        let now = self.clock.now();
        self.notified.retain(|key| key.start > now);

        let Some((event, key)) = self.next_pending(events, now) else {
            tracing::info!(
                "No upcoming events. Waiting {:?} before checking again",
                self.settings.poll_interval
            );
            self.sleep(self.settings.poll_interval).await;
            return CycleOutcome::Idle;
        };

        let till_notify = self.time_till_notify(key.start, now);

        if till_notify < self.settings.poll_interval {
            tracing::info!(
                "Event '{}' soon. Waiting {:?} before sending notification",
                event.display_title(),
                till_notify
            );
            self.sleep(till_notify).await;
            self.confirm_and_notify(event, key).await
        } else {
            tracing::info!(
                "Event '{}' not soon. Waiting {:?} before checking again",
                event.display_title(),
                self.settings.poll_interval
            );
            self.sleep(self.settings.poll_interval).await;
            CycleOutcome::Waiting(key)
        }
    }

    /// First event that has not started yet and whose reminder has not been shown
    fn next_pending(
        &self,
        events: Vec<CalendarEvent>,
        now: DateTime<Utc>,
    ) -> Option<(CalendarEvent, EventKey)> {
        events.into_iter().find_map(|event| {
            let key = event.key()?;
            if key.start <= now || self.notified.contains(&key) {
                None
            } else {
                Some((event, key))
            }
        })
    }

    /// Delay until the reminder is due, zero if it already is
    fn time_till_notify(&self, start: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
        let notify_at = chrono::Duration::from_std(self.settings.alarm_offset)
            .ok()
            .and_then(|offset| start.checked_sub_signed(offset));

        match notify_at {
            Some(notify_at) => (notify_at - now).to_std().unwrap_or(Duration::ZERO),
            None => Duration::ZERO,
        }
    }

    /// Re-check the calendar right before showing, so a cancelled or moved
    /// event is not announced for its stale time. The event may have started
    /// by now; it only has to still be listed with the same start.
    async fn confirm_and_notify(&mut self, event: CalendarEvent, key: EventKey) -> CycleOutcome {
        let current = match self.source.upcoming_events(self.settings.lookahead).await {
            Ok(events) => events.into_iter().find(|e| e.key().as_ref() == Some(&key)),
            Err(e) => {
                tracing::warn!(
                    "Could not confirm event '{}' before notifying: {:?}",
                    event.display_title(),
                    e
                );
                Some(event)
            }
        };

        let Some(current) = current else {
            tracing::info!("Event {} changed or was removed, skipping notification", key.id);
            return CycleOutcome::Changed(key);
        };

        tracing::info!("Sending notification for '{}'", current.display_title());
        if let Err(e) = self.sink.show(&current).await {
            tracing::error!("Failed to send notification: {:?}", e);
        }

        self.notified.insert(key.clone());
        CycleOutcome::Notified(key)
    }

    async fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            tokio::time::sleep(duration).await;
        }
    }
}
