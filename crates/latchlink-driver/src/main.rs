//! Latchlink CLI.
//!
//! # Usage
//!
//! ```bash
//! # Unlock channel 1 on board 1 via the default port
//! latchlink
//!
//! # Explicit addressing and port
//! latchlink --port /dev/ttyUSB1 --board 2 --channel 3
//! ```
//!
//! Runs one unlock cycle: unlock, confirm, poll until the lock
//! re-engages, then exit.

use std::time::Duration;

use clap::Parser;
use latchlink_core::{LinkConfig, config::DEFAULT_PORT_PATH};
use latchlink_driver::{LinkCommand, LinkDriver, LinkNotification, SerialTransport};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Latchlink lock-board controller
#[derive(Parser, Debug)]
#[command(name = "latchlink")]
#[command(about = "Drive an electronic lock board over a serial link")]
#[command(version)]
struct Args {
    /// Serial device path
    #[arg(short, long, default_value = DEFAULT_PORT_PATH)]
    port: String,

    /// Board address
    #[arg(short, long, default_value = "1")]
    board: u8,

    /// Channel address
    #[arg(short, long, default_value = "1")]
    channel: u8,

    /// Poll interval in milliseconds
    #[arg(long, default_value = "10000")]
    poll_interval_ms: u64,

    /// Reconnect backoff in milliseconds
    #[arg(long, default_value = "10000")]
    reconnect_backoff_ms: u64,

    /// Response timeout in milliseconds
    #[arg(long, default_value = "5000")]
    response_timeout_ms: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    let config = LinkConfig {
        port_path: args.port,
        reconnect_backoff: Duration::from_millis(args.reconnect_backoff_ms),
        poll_interval: Duration::from_millis(args.poll_interval_ms),
        response_timeout: Duration::from_millis(args.response_timeout_ms),
        ..LinkConfig::default()
    };

    tracing::info!(
        port = %config.port_path,
        board = args.board,
        channel = args.channel,
        "latchlink starting"
    );

    let transport = SerialTransport::new(&config.port_path, config.receive_chunk);
    let (driver, mut handle) = LinkDriver::new(config, transport);
    let driver_task = tokio::spawn(driver.run());

    handle.command(LinkCommand::SetBoard(args.board)).await;
    handle.command(LinkCommand::SetChannel(args.channel)).await;
    handle.command(LinkCommand::Unlock).await;

    while let Some(notification) = handle.notified().await {
        match notification {
            LinkNotification::LinkError => {
                tracing::warn!("link error; reconnecting automatically");
            }
            LinkNotification::Locked => {
                tracing::info!("lock engaged; cycle complete");
                break;
            }
        }
    }

    handle.command(LinkCommand::Shutdown).await;
    driver_task.await?;
    Ok(())
}
