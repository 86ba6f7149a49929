use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use google_calendar3::api::{Event, EventDateTime as ApiEventDateTime};
use google_calendar3::hyper_rustls::HttpsConnector;
use google_calendar3::CalendarHub;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use shared_types::{CalendarEvent, EventDateTime};
use std::path::Path;

use crate::config::CalendarConfig;
use crate::error::NotifierError;

/// Read-only access to calendar events
pub const EVENTS_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/calendar.events.readonly";

/// Source of upcoming events, ordered by start time.
#[allow(async_fn_in_trait)]
pub trait EventSource {
    async fn upcoming_events(&self, max_results: u32) -> Result<Vec<CalendarEvent>>;
}

/// Client for reading upcoming events from Google Calendar
pub struct CalendarClient {
    hub: CalendarHub<HttpsConnector<HttpConnector>>,
    calendar_id: String,
}

impl CalendarClient {
    pub async fn new(config: &CalendarConfig) -> Result<Self> {
        let secret =
            google_calendar3::yup_oauth2::read_application_secret(&config.credentials_path)
                .await
                .context("Failed to read OAuth credentials")?;

        let auth = google_calendar3::yup_oauth2::InstalledFlowAuthenticator::builder(
            secret,
            google_calendar3::yup_oauth2::InstalledFlowReturnMethod::HTTPRedirect,
        )
        .persist_tokens_to_disk(Path::new(&config.token_cache_path))
        .build()
        .await
        .context("Failed to build authenticator")?;

        let connector = google_calendar3::hyper_rustls::HttpsConnectorBuilder::new()
            .with_native_roots()
            .context("Failed to load native TLS roots")?
            .https_or_http()
            .enable_http1()
            .build();

        let client = Client::builder(TokioExecutor::new()).build(connector);
        let hub = CalendarHub::new(client, auth);

        Ok(Self {
            hub,
            calendar_id: config.calendar_id.clone(),
        })
    }

    /// Fetch up to `max_results` raw events starting from `now`
    async fn list_events(&self, now: DateTime<Utc>, max_results: u32) -> Result<Vec<Event>> {
        let max_results = i32::try_from(max_results).unwrap_or(i32::MAX);

        let (_, events) = self
            .hub
            .events()
            .list(&self.calendar_id)
            .time_min(now)
            .max_results(max_results)
            .single_events(true)
            .order_by("startTime")
            .add_scope(EVENTS_READONLY_SCOPE)
            .doit()
            .await
            .map_err(|e| NotifierError::calendar(e.to_string()))
            .with_context(|| format!("Failed to list events for '{}'", self.calendar_id))?;

        Ok(events.items.unwrap_or_default())
    }
}

impl EventSource for CalendarClient {
    async fn upcoming_events(&self, max_results: u32) -> Result<Vec<CalendarEvent>> {
        let now = Utc::now();
        let raw = self.list_events(now, max_results).await?;
        let fetched = raw.len();

        let events = filter_upcoming(raw.into_iter().filter_map(convert_event), now);

        tracing::debug!(
            "Fetched {} events from '{}', {} upcoming",
            fetched,
            self.calendar_id,
            events.len()
        );
        Ok(events)
    }
}

fn convert_date_time(value: ApiEventDateTime) -> EventDateTime {
    EventDateTime {
        date_time: value.date_time.map(|dt| dt.fixed_offset()),
        date: value.date,
        time_zone: value.time_zone,
    }
}

fn convert_event(event: Event) -> Option<CalendarEvent> {
    let start = event.start.map(convert_date_time)?;

    Some(CalendarEvent {
        id: event.id.unwrap_or_default(),
        summary: event.summary,
        start,
        end: event.end.map(convert_date_time),
        status: event.status,
        html_link: event.html_link,
        location: event.location,
    })
}

/// Keep timed, non-cancelled events that have not finished by `now`, ordered
/// by start. Events already in progress stay listed so a reminder confirmed
/// after the start still finds its event; the notifier never picks them as
/// the next reminder.
pub fn filter_upcoming(
    events: impl IntoIterator<Item = CalendarEvent>,
    now: DateTime<Utc>,
) -> Vec<CalendarEvent> {
    let mut upcoming: Vec<CalendarEvent> = events
        .into_iter()
        .filter(|event| !event.is_cancelled())
        .filter(|event| match event.start_time() {
            Some(start) => {
                let end = event.end.as_ref().and_then(|end| end.as_utc()).unwrap_or(start);
                end.max(start) >= now
            }
            None => false,
        })
        .collect();

    upcoming.sort_by_key(|event| event.start_time());
    upcoming
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 8, 17, 12, 0, 0).unwrap()
    }

    fn timed(id: &str, start: DateTime<Utc>) -> CalendarEvent {
        CalendarEvent {
            id: id.to_string(),
            summary: Some(format!("Event {}", id)),
            start: EventDateTime::timed(start),
            end: Some(EventDateTime::timed(start + Duration::minutes(30))),
            status: Some("confirmed".to_string()),
            html_link: None,
            location: None,
        }
    }

    #[test]
    fn test_filter_drops_all_day_and_finished() {
        let mut all_day = timed("holiday", now());
        all_day.start = EventDateTime::all_day(NaiveDate::from_ymd_opt(2024, 8, 17).unwrap());

        let events = vec![
            all_day,
            timed("finished", now() - Duration::hours(1)),
            timed("soon", now() + Duration::minutes(10)),
        ];

        let upcoming = filter_upcoming(events, now());
        let ids: Vec<_> = upcoming.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["soon"]);
    }

    #[test]
    fn test_filter_keeps_in_progress() {
        let events = vec![
            timed("in-progress", now() - Duration::minutes(5)),
            timed("starting-now", now()),
        ];

        let upcoming = filter_upcoming(events, now());
        let ids: Vec<_> = upcoming.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["in-progress", "starting-now"]);
    }

    #[test]
    fn test_filter_without_end_uses_start() {
        let mut past = timed("no-end", now() - Duration::minutes(1));
        past.end = None;
        let mut next = timed("no-end-next", now() + Duration::minutes(1));
        next.end = None;

        let upcoming = filter_upcoming(vec![past, next], now());
        assert_eq!(upcoming.len(), 1);
        assert_eq!(upcoming[0].id, "no-end-next");
    }

    #[test]
    fn test_filter_drops_cancelled() {
        let mut cancelled = timed("cancelled", now() + Duration::minutes(5));
        cancelled.status = Some("cancelled".to_string());

        let upcoming = filter_upcoming(
            vec![cancelled, timed("kept", now() + Duration::minutes(20))],
            now(),
        );
        assert_eq!(upcoming.len(), 1);
        assert_eq!(upcoming[0].id, "kept");
    }

    #[test]
    fn test_filter_orders_by_start() {
        let upcoming = filter_upcoming(
            vec![
                timed("later", now() + Duration::hours(2)),
                timed("first", now() + Duration::minutes(1)),
            ],
            now(),
        );
        assert_eq!(upcoming[0].id, "first");
        assert_eq!(upcoming[1].id, "later");
    }

    #[test]
    fn test_convert_event() {
        let start = now() + Duration::hours(1);
        let api_event = Event {
            id: Some("evt1".to_string()),
            summary: Some("Design review".to_string()),
            start: Some(ApiEventDateTime {
                date_time: Some(start),
                time_zone: Some("UTC".to_string()),
                ..Default::default()
            }),
            html_link: Some("https://calendar.google.com/event?eid=evt1".to_string()),
            ..Default::default()
        };

        let event = convert_event(api_event).expect("event with a start converts");
        assert_eq!(event.id, "evt1");
        assert_eq!(event.display_title(), "Design review");
        assert_eq!(event.start_time(), Some(start));
        assert_eq!(event.start.time_zone.as_deref(), Some("UTC"));
        assert!(event.end.is_none());
    }

    #[test]
    fn test_convert_event_without_start_is_skipped() {
        let api_event = Event {
            id: Some("broken".to_string()),
            ..Default::default()
        };
        assert!(convert_event(api_event).is_none());
    }
}
