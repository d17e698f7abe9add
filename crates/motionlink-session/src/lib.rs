//! ---
//! ml_section: "03-session-management"
//! ml_subsection: "module"
//! ml_type: "source"
//! ml_scope: "code"
//! ml_description: "Device session lifecycle, reconnection and dispatch."
//! ml_version: "v0.1.0"
//! ml_owner: "tbd"
//! ---
//! Live control session with a single motion controller.
//!
//! [`SessionManager`] owns the channel to the device. It opens links through a
//! [`Connector`], retries bounded times after an unexpected closure, turns
//! inbound frames into [`MotorStatus`]/[`MotorConfig`] updates and publishes an
//! immutable [`SessionSnapshot`] after every change.
//!
//! [`MotorStatus`]: motionlink_protocol::MotorStatus
//! [`MotorConfig`]: motionlink_protocol::MotorConfig
#![warn(missing_docs)]

pub mod link;
pub mod loopback;
pub mod manager;
pub mod policy;
pub mod state;
pub mod websocket;

use motionlink_protocol::ProtocolError;

/// Shared result type for session operations.
pub type Result<T> = std::result::Result<T, SessionError>;

/// Errors surfaced by [`SessionManager::try_send`].
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// No open channel.
    #[error("not connected to the motion controller")]
    NotConnected,
    /// Transport task went away between the readiness check and the write.
    #[error("channel closed while sending")]
    ChannelClosed,
    /// Command could not be serialised.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

pub use link::{Connector, Link, LinkEvent, LinkPeer, LinkState};
pub use loopback::{LoopbackConnector, LoopbackDevice, LoopbackPeer};
pub use manager::SessionManager;
pub use policy::ReconnectPolicy;
pub use state::{ConnectionPhase, ConnectionState, SessionEvent, SessionSnapshot};
pub use websocket::WebSocketConnector;
