pub mod calendar_client;
pub mod config;
pub mod display;
pub mod error;
pub mod heartbeat;
pub mod logging;
pub mod notifier;
pub mod shutdown;
