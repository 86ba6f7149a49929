//! Liveness ping to an external monitoring URL.

use std::time::Duration;
use tokio::time::{self, MissedTickBehavior};

use crate::error::{NotifierError, NotifierResult};
use crate::shutdown::Shutdown;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct Heartbeat {
    url: String,
    client: reqwest::Client,
}

impl Heartbeat {
    pub fn new(url: impl Into<String>) -> NotifierResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            url: url.into(),
            client,
        })
    }

    /// Send one ping; any non-success status counts as a failure.
    pub async fn ping(&self) -> NotifierResult<()> {
        let response = self.client.get(&self.url).send().await?;
        let status = response.status();

        if !status.is_success() {
            return Err(NotifierError::HeartbeatStatus {
                url: self.url.clone(),
                status: status.as_u16(),
            });
        }

        tracing::info!("Pinged {}", self.url);
        Ok(())
    }

    /// Ping right away, then once per `period`, until `shutdown` fires.
    pub async fn run(&self, period: Duration, mut shutdown: Shutdown) {
        let mut ticker = time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!("Heartbeat started (url: {}, period: {:?})", self.url, period);

        loop {
            tokio::select! {
                _ = shutdown.wait() => break,
                _ = ticker.tick() => {
                    if let Err(e) = self.ping().await {
                        tracing::error!("Failed to ping {}: {}", self.url, e);
                        // Keep pinging even on error
                    }
                }
            }
        }

        tracing::info!("Heartbeat stopped");
    }
}
