//! ---
//! ml_section: "02-messaging-protocol"
//! ml_subsection: "module"
//! ml_type: "source"
//! ml_scope: "code"
//! ml_description: "Wire protocol model and frame codecs."
//! ml_version: "v0.1.0"
//! ml_owner: "tbd"
//! ---
use serde::{Deserialize, Serialize};

use crate::types::{MotorConfig, MotorStatus};
use crate::Result;

/// Outcome reported by a `configUpdated` frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigUpdateStatus {
    /// The device stored the new values.
    Success,
    /// The device rejected the write.
    Error,
}

/// Frame received from the device, discriminated by the `type` field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Response {
    /// Full motion state.
    Status(MotorStatus),
    /// High-frequency position-only update.
    Position {
        /// Current position in steps.
        position: i64,
    },
    /// Full configuration.
    Config(MotorConfig),
    /// Acknowledgement of a `setConfig`.
    ConfigUpdated {
        /// Whether the write succeeded.
        status: ConfigUpdateStatus,
        /// Optional detail from the device.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    /// Device-side error report.
    Error {
        /// Human-readable description.
        message: String,
    },
    /// Any discriminator this client does not know; ignored by consumers.
    #[serde(other)]
    Unrecognized,
}

impl Response {
    /// Parse a JSON text frame.
    pub fn decode(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Short label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Response::Status(_) => "status",
            Response::Position { .. } => "position",
            Response::Config(_) => "config",
            Response::ConfigUpdated { .. } => "configUpdated",
            Response::Error { .. } => "error",
            Response::Unrecognized => "unrecognized",
        }
    }
}
