//! ---
//! ml_section: "03-session-management"
//! ml_subsection: "module"
//! ml_type: "source"
//! ml_scope: "code"
//! ml_description: "Device session lifecycle, reconnection and dispatch."
//! ml_version: "v0.1.0"
//! ml_owner: "tbd"
//! ---
use std::fmt;
use std::time::Duration;

use motionlink_protocol::{MotorConfig, MotorStatus, Response};
use serde::Serialize;

/// Connection bookkeeping visible to consumers.
///
/// `is_connected` and `is_connecting` are never both true.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionState {
    /// Channel is open.
    pub is_connected: bool,
    /// Channel is being opened.
    pub is_connecting: bool,
    /// Automatic retries scheduled since the last successful connection.
    pub reconnect_attempts: u32,
    /// Most recent transport or device error.
    pub last_error: Option<String>,
}

/// Coarse connection phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionPhase {
    /// No channel.
    Disconnected,
    /// Channel opening.
    Connecting,
    /// Channel open.
    Connected,
}

impl ConnectionState {
    /// Phase derived from the two flags.
    pub fn phase(&self) -> ConnectionPhase {
        if self.is_connected {
            ConnectionPhase::Connected
        } else if self.is_connecting {
            ConnectionPhase::Connecting
        } else {
            ConnectionPhase::Disconnected
        }
    }
}

impl fmt::Display for ConnectionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ConnectionPhase::Disconnected => "disconnected",
            ConnectionPhase::Connecting => "connecting",
            ConnectionPhase::Connected => "connected",
        })
    }
}

/// Immutable copy of everything a consumer can observe.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    /// Connection bookkeeping.
    pub connection: ConnectionState,
    /// Last reported motion state.
    pub status: MotorStatus,
    /// Last reported configuration.
    pub config: MotorConfig,
}

impl SessionSnapshot {
    /// Channel is open.
    pub fn is_connected(&self) -> bool {
        self.connection.is_connected
    }

    /// Channel is being opened.
    pub fn is_connecting(&self) -> bool {
        self.connection.is_connecting
    }

    /// Limits coincide; motion controls should stay disabled.
    pub fn motion_disabled(&self) -> bool {
        self.config.motion_disabled()
    }
}

/// What a call to [`SessionManager::next_event`] did.
///
/// [`SessionManager::next_event`]: crate::SessionManager::next_event
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// A scheduled open started a new channel.
    Connecting {
        /// Retry count at the time of the attempt; 0 for a delayed first connect.
        attempt: u32,
    },
    /// The channel opened and the initial status/config requests went out.
    Connected,
    /// A frame was decoded and applied.
    Received(Response),
    /// A frame could not be decoded and was dropped.
    Malformed {
        /// Decoder message.
        error: String,
    },
    /// The transport reported an error.
    TransportError(String),
    /// The channel closed.
    Disconnected {
        /// Delay before the next automatic attempt, `None` once the budget is spent.
        retry_in: Option<Duration>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_follows_flags() {
        let mut state = ConnectionState::default();
        assert_eq!(state.phase(), ConnectionPhase::Disconnected);
        state.is_connecting = true;
        assert_eq!(state.phase(), ConnectionPhase::Connecting);
        state.is_connecting = false;
        state.is_connected = true;
        assert_eq!(state.phase().to_string(), "connected");
    }

    #[test]
    fn snapshot_serialises_camel_case() {
        let value = serde_json::to_value(SessionSnapshot::default()).unwrap();
        assert_eq!(value["connection"]["reconnectAttempts"], 0);
        assert_eq!(value["config"]["maxSpeed"], 8000);
        assert_eq!(value["status"]["limitSwitches"]["any"], false);
    }
}
