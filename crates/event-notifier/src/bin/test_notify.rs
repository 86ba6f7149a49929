use anyhow::Result;
use chrono::{Duration, Utc};
use clap::Parser;
use shared_types::{CalendarEvent, EventDateTime};

use event_notifier::config::DisplayMode;
use event_notifier::display::{Alert, NotificationSink};

#[derive(Parser)]
#[command(name = "test_notify")]
#[command(about = "Show a sample reminder to check the display setup")]
struct Cli {
    /// Seconds until the sample event starts
    #[arg(long, default_value_t = 185)]
    starts_in: i64,

    /// Seconds the reminder stays on screen
    #[arg(long, default_value_t = 100)]
    hold: u64,

    /// Only log the reminder
    #[arg(long)]
    log_only: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    let event = CalendarEvent {
        id: "test-event".to_string(),
        summary: Some("Test Event".to_string()),
        start: EventDateTime::timed(Utc::now() + Duration::seconds(cli.starts_in)),
        end: None,
        status: Some("confirmed".to_string()),
        html_link: None,
        location: None,
    };

    let mode = if cli.log_only {
        DisplayMode::Log
    } else {
        DisplayMode::Desktop
    };
    let alert = Alert::new(mode, std::time::Duration::from_secs(cli.hold));

    println!("Showing reminder for: {}", event.display_title());
    alert.show(&event).await?;
    println!("Notification test complete!");
    Ok(())
}
