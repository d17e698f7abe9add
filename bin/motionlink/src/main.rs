//! ---
//! ml_section: "06-operator-cli"
//! ml_subsection: "binary"
//! ml_type: "source"
//! ml_scope: "code"
//! ml_description: "Terminal client for the motion controller."
//! ml_version: "v0.1.0"
//! ml_owner: "tbd"
//! ---
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use motionlink_common::{init_tracing, AppConfig};
use motionlink_protocol::ProtocolMetrics;
use motionlink_session::{ReconnectPolicy, SessionManager, WebSocketConnector};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

mod console;
mod edit;
mod oneshot;
mod render;

use console::Flow;

#[derive(Debug, Parser)]
#[command(
    author,
    disable_version_flag = true,
    about = "Drive a motion controller over its WebSocket channel",
    long_about = None
)]
struct Cli {
    #[arg(
        short = 'V',
        long = "version",
        action = ArgAction::SetTrue,
        help = "Print version information and exit"
    )]
    version: bool,
    /// Configuration file; defaults to $MOTIONLINK_CONFIG or ./motionlink.toml.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Device WebSocket URL, overriding the configured host and path.
    #[arg(long, global = true)]
    url: Option<String>,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(about = "Interactive console (default)")]
    Console,
    #[command(about = "Print the device status and configuration once")]
    Status {
        /// Emit the session snapshot as JSON.
        #[arg(long)]
        json: bool,
        /// Seconds to wait for the device.
        #[arg(long, default_value_t = 10)]
        timeout: u64,
    },
    #[command(about = "Change device configuration, e.g. `configure maxSpeed=12000 min=-2000`")]
    Configure {
        /// Settings as key=value.
        #[arg(required = true)]
        settings: Vec<String>,
        /// Seconds to wait for the device.
        #[arg(long, default_value_t = 10)]
        timeout: u64,
    },
}

fn load_config(cli: &Cli) -> Result<AppConfig> {
    let mut config = match &cli.config {
        Some(path) => AppConfig::load(&[path])?,
        None => AppConfig::load_or_default(&["motionlink.toml"])?.config,
    };
    if let Some(url) = &cli.url {
        config.device.url = Some(url.clone());
    }
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    if cli.version {
        println!("motionlink {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let config = load_config(&cli)?;
    init_tracing("motionlink", &config.logging)?;

    let url = config.device.websocket_url()?;
    let metrics = ProtocolMetrics::register(prometheus::default_registry())
        .context("registering protocol metrics")?;
    let mut session = SessionManager::new(
        WebSocketConnector::new(url.clone()),
        ReconnectPolicy::from(&config.reconnect),
    )
    .with_metrics(metrics.clone());
    let policy = session.policy();
    info!(
        endpoint = %url,
        max_attempts = policy.max_attempts,
        delay_ms = policy.delay.as_millis() as u64,
        "session configured"
    );

    let mut stdout = std::io::stdout();
    let result = match cli.command.unwrap_or(Commands::Console) {
        Commands::Console => {
            println!("motionlink console for {}; type 'help' for commands", url);
            session.connect_after(config.reconnect.initial_delay);
            run_console(&mut session).await
        }
        Commands::Status { json, timeout } => {
            oneshot::status(&mut session, json, Duration::from_secs(timeout), &mut stdout).await
        }
        Commands::Configure { settings, timeout } => {
            let assignments = edit::parse_assignments(settings.iter().map(String::as_str))?;
            oneshot::configure(
                &mut session,
                &assignments,
                Duration::from_secs(timeout),
                &mut stdout,
            )
            .await
        }
    };

    let (sent, received, malformed, refused) = metrics.counts();
    info!(sent, received, malformed, refused, "session finished");
    result
}

async fn run_console(session: &mut SessionManager<WebSocketConnector>) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = std::io::stdout();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                match console::parse(&line) {
                    Ok(Some(command)) => {
                        if console::execute(session, command, &mut stdout)? == Flow::Quit {
                            break;
                        }
                    }
                    Ok(None) => {}
                    Err(err) => writeln!(stdout, "{}", err)?,
                }
            }
            event = session.next_event(), if !session.is_idle() => {
                if let Some(text) = event.as_ref().and_then(render::describe_event) {
                    writeln!(stdout, "{}", text)?;
                }
            }
            signal = tokio::signal::ctrl_c() => {
                if let Err(err) = signal {
                    warn!(error = %err, "failed to listen for ctrl-c");
                }
                break;
            }
        }
        stdout.flush()?;
    }
    session.disconnect();
    Ok(())
}
