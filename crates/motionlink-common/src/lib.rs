//! ---
//! ml_section: "01-core-functionality"
//! ml_subsection: "module"
//! ml_type: "source"
//! ml_scope: "code"
//! ml_description: "Shared client configuration and logging primitives."
//! ml_version: "v0.1.0"
//! ml_owner: "tbd"
//! ---
//! Shared primitives for the motionlink workspace: the client configuration
//! file and tracing initialisation.

pub mod config;
pub mod logging;

pub use config::{AppConfig, DeviceConfig, LoadedAppConfig, LoggingConfig, ReconnectConfig};
pub use logging::{init_tracing, LogFormat};
