//! ---
//! ml_section: "05-test-harness"
//! ml_subsection: "binary"
//! ml_type: "source"
//! ml_scope: "code"
//! ml_description: "Standalone fake motion controller."
//! ml_version: "v0.1.0"
//! ml_owner: "tbd"
//! ---
use std::net::SocketAddr;

use anyhow::Result;
use clap::Parser;
use motionlink_common::{init_tracing, LoggingConfig};
use motionlink_protocol::MotorConfig;
use motionlink_testharness::FakeDeviceBuilder;
use tracing::info;

#[derive(Debug, Parser)]
#[command(
    name = "motionlink-fake-device",
    version,
    about = "Serve a simulated motion controller on /ws"
)]
struct Cli {
    /// Address to listen on.
    #[arg(long, default_value = "127.0.0.1:8080")]
    listen: SocketAddr,
    /// Initial lower travel limit.
    #[arg(long, default_value_t = -5000, allow_hyphen_values = true)]
    min_limit: i64,
    /// Initial upper travel limit.
    #[arg(long, default_value_t = 5000, allow_hyphen_values = true)]
    max_limit: i64,
    /// Reject every configuration update.
    #[arg(long)]
    reject_config_updates: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing("motionlink-fake-device", &LoggingConfig::default())?;

    let config = MotorConfig {
        min_limit: cli.min_limit,
        max_limit: cli.max_limit,
        ..Default::default()
    };
    let handle = FakeDeviceBuilder::new(cli.listen)
        .with_config(config)
        .reject_config_updates(cli.reject_config_updates)
        .spawn()
        .await?;
    info!(address = %handle.local_addr(), "fake motion controller ready");
    println!("fake motion controller at {}", handle.url());

    tokio::signal::ctrl_c().await?;
    info!("shutting down fake motion controller");
    handle.shutdown().await
}
