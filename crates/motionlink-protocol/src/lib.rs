//! ---
//! ml_section: "02-messaging-protocol"
//! ml_subsection: "module"
//! ml_type: "source"
//! ml_scope: "code"
//! ml_description: "Wire protocol model and frame codecs."
//! ml_version: "v0.1.0"
//! ml_owner: "tbd"
//! ---
//! Wire protocol spoken between the client and the motion controller.
//!
//! Outbound frames are [`Command`]s discriminated by a `command` field,
//! inbound frames are [`Response`]s discriminated by a `type` field. Both are
//! plain JSON text frames on a single WebSocket.
#![warn(missing_docs)]

pub mod command;
pub mod logging;
pub mod response;
pub mod types;

/// Shared result type for protocol operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors raised while encoding or decoding frames.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Payload was not valid JSON or did not match any known frame shape.
    #[error("malformed frame: {0}")]
    Json(#[from] serde_json::Error),
}

pub use command::{Command, JogDirection};
pub use logging::{log_frame, FrameDirection, ProtocolMetrics};
pub use response::{ConfigUpdateStatus, Response};
pub use types::{ConfigPatch, LimitSwitches, MotorConfig, MotorStatus};
