use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tokio::signal;

use event_notifier::calendar_client::CalendarClient;
use event_notifier::config::Config;
use event_notifier::display::Alert;
use event_notifier::heartbeat::Heartbeat;
use event_notifier::logging;
use event_notifier::notifier::{Notifier, SystemClock};
use event_notifier::shutdown::shutdown_channel;

#[derive(Parser)]
#[command(name = "event-notifier")]
#[command(about = "Shows a reminder shortly before your next calendar event")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(
        short,
        long,
        default_value = "event-notifier.toml",
        env = "EVENT_NOTIFIER_CONFIG"
    )]
    config: PathBuf,

    /// Legacy heartbeat file, used when the config has no heartbeat URL.
    #[arg(long, default_value = "heartbeat.json")]
    heartbeat_file: PathBuf,

    /// Heartbeat URL, overrides the config file.
    #[arg(long, env = "EVENT_NOTIFIER_HEARTBEAT_URL")]
    heartbeat_url: Option<String>,

    /// Print an example configuration and exit.
    #[arg(long)]
    print_example_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    if cli.print_example_config {
        let example = toml::to_string_pretty(&Config::example())
            .context("Failed to render example config")?;
        println!("{}", example);
        return Ok(());
    }

    let (mut config, found) = Config::load_or_default(&cli.config)?;
    if let Some(url) = cli.heartbeat_url {
        config.heartbeat_url = Some(url);
    }

    let _log_guard = logging::init(&config.log_dir)?;

    if found {
        tracing::info!("Loaded config from {}", cli.config.display());
    } else {
        tracing::info!(
            "No config file at {}, using defaults",
            cli.config.display()
        );
    }

    config.apply_heartbeat_file(&cli.heartbeat_file)?;
    config.validate()?;

    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("Failed to install crypto provider"))?;

    tracing::info!("Starting event notifier");

    let calendar = CalendarClient::new(&config.calendar)
        .await
        .context("Failed to create calendar client")?;
    let alert = Alert::new(config.display.mode, config.hold_duration());

    let (handle, shutdown) = shutdown_channel();

    let heartbeat_handle = match config.heartbeat_url.clone() {
        Some(url) => {
            let heartbeat = Heartbeat::new(url)?;
            let period = config.heartbeat_period();
            let heartbeat_shutdown = shutdown.clone();
            Some(tokio::spawn(async move {
                heartbeat.run(period, heartbeat_shutdown).await;
            }))
        }
        None => {
            tracing::warn!("No heartbeat URL configured, heartbeat disabled");
            None
        }
    };

    let mut notifier = Notifier::new(calendar, alert, SystemClock, config.notifier_settings());

    tracing::info!("Event notifier running. Press Ctrl+C to stop.");
    tokio::select! {
        _ = notifier.run(shutdown) => {}
        result = signal::ctrl_c() => {
            result.context("Failed to listen for shutdown signal")?;
            tracing::info!("Shutdown signal received, stopping...");
        }
    }

    handle.stop();
    if let Some(task) = heartbeat_handle {
        if let Err(e) = task.await {
            tracing::error!("Heartbeat task error: {:?}", e);
        }
    }

    tracing::info!("Event notifier stopped");
    Ok(())
}
