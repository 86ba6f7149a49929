use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use event_notifier::calendar_client::{CalendarClient, EventSource};
use event_notifier::config::Config;
use event_notifier::display::countdown_text;

#[derive(Parser)]
#[command(name = "test_calendar")]
#[command(about = "List the next upcoming events the notifier would see")]
struct Cli {
    #[arg(short, long, default_value = "event-notifier.toml")]
    config: PathBuf,

    /// Number of events to fetch
    #[arg(short = 'n', long, default_value_t = 10)]
    max_results: u32,
}

#[tokio::main]
async fn main() -> Result<()> {
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install crypto provider");
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let (config, _) = Config::load_or_default(&cli.config)?;

    println!("Testing calendar: {}", config.calendar.calendar_id);
    println!("Credentials: {}", config.calendar.credentials_path);

    let client = CalendarClient::new(&config.calendar).await?;
    let events = client.upcoming_events(cli.max_results).await?;

    if events.is_empty() {
        println!("No upcoming events found.");
        return Ok(());
    }

    let now = chrono::Utc::now();
    for event in &events {
        let Some(start) = event.start_time() else {
            continue;
        };
        println!(
            "{}  {}  ({})",
            start.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M"),
            event.display_title(),
            countdown_text(start, now)
        );
    }

    println!("Calendar test complete!");
    Ok(())
}
