//! ---
//! ml_section: "01-core-functionality"
//! ml_subsection: "module"
//! ml_type: "source"
//! ml_scope: "code"
//! ml_description: "Shared client configuration and logging primitives."
//! ml_version: "v0.1.0"
//! ml_owner: "tbd"
//! ---
use anyhow::Result;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::daily;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::{Layer, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::LoggingConfig;

const LOG_ENV: &str = "MOTIONLINK_LOG";
const DEFAULT_DIRECTIVE: &str = "info";

static GUARDS: OnceCell<(WorkerGuard, WorkerGuard)> = OnceCell::new();

/// Console log formats.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum LogFormat {
    /// One JSON object per event, for scripted runs.
    StructuredJson,
    /// Compact human-readable lines next to the interactive console.
    #[default]
    Pretty,
}

/// Filter directive chosen from `MOTIONLINK_LOG` and `RUST_LOG`, in that order.
#[derive(Debug, Clone, PartialEq, Eq)]
struct FilterChoice {
    directive: String,
    rejected: Option<String>,
}

fn choose_directive(motionlink_log: Option<&str>, rust_log: Option<&str>) -> FilterChoice {
    let mut rejected = None;
    for candidate in [motionlink_log, rust_log].into_iter().flatten() {
        if candidate.trim().is_empty() {
            continue;
        }
        match EnvFilter::try_new(candidate) {
            Ok(_) => {
                return FilterChoice {
                    directive: candidate.to_owned(),
                    rejected,
                }
            }
            Err(_) => {
                rejected.get_or_insert_with(|| candidate.to_owned());
            }
        }
    }
    FilterChoice {
        directive: DEFAULT_DIRECTIVE.to_owned(),
        rejected,
    }
}

fn console_layer<S>(format: LogFormat, writer: NonBlocking) -> Box<dyn Layer<S> + Send + Sync>
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    match format {
        LogFormat::StructuredJson => fmt::layer()
            .json()
            .with_timer(fmt::time::UtcTime::rfc_3339())
            .with_writer(writer)
            .boxed(),
        LogFormat::Pretty => fmt::layer()
            .compact()
            .without_time()
            .with_target(false)
            .with_writer(writer)
            .boxed(),
    }
}

/// Install the global subscriber: a stderr console layer in `config.format`
/// and a daily JSON file `<prefix>.log` under `config.directory`.
///
/// Only the first call installs; later calls still create the directory.
pub fn init_tracing(service_name: &str, config: &LoggingConfig) -> Result<()> {
    std::fs::create_dir_all(&config.directory)?;
    let prefix = config.file_prefix.as_deref().unwrap_or(service_name);

    let motionlink_log = std::env::var(LOG_ENV).ok();
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let choice = choose_directive(motionlink_log.as_deref(), rust_log.as_deref());

    let (file_writer, file_guard) =
        tracing_appender::non_blocking(daily(&config.directory, format!("{prefix}.log")));
    let (console_writer, console_guard) = tracing_appender::non_blocking(std::io::stderr());

    let file_layer = fmt::layer()
        .json()
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .with_writer(file_writer);

    let installed = tracing_subscriber::registry()
        .with(EnvFilter::new(&choice.directive))
        .with(console_layer(config.format, console_writer))
        .with(file_layer)
        .try_init()
        .is_ok();
    if !installed {
        return Ok(());
    }
    let _ = GUARDS.set((file_guard, console_guard));

    if let Some(bad) = &choice.rejected {
        warn!(directive = %bad, using = %choice.directive, "ignoring invalid log filter");
    }
    info!(
        service = service_name,
        log_dir = %config.directory.display(),
        filter = %choice.directive,
        "tracing initialised"
    );
    Ok(())
}
