//! ---
//! ml_section: "02-messaging-protocol"
//! ml_subsection: "module"
//! ml_type: "source"
//! ml_scope: "code"
//! ml_description: "Wire protocol model and frame codecs."
//! ml_version: "v0.1.0"
//! ml_owner: "tbd"
//! ---
use prometheus::{IntCounter, Opts, Registry};
use tracing::debug;

/// Direction of a frame, used for consistent logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameDirection {
    /// Frame written to the device.
    Outbound,
    /// Frame received from the device.
    Inbound,
}

/// Emit a structured log entry for frame activity.
pub fn log_frame(direction: FrameDirection, kind: &str, payload: &str) {
    debug!(
        direction = ?direction,
        kind,
        bytes = payload.len(),
        payload,
        "frame"
    );
}

/// Prometheus counters for channel activity.
#[derive(Clone)]
pub struct ProtocolMetrics {
    sent: IntCounter,
    received: IntCounter,
    malformed: IntCounter,
    refused: IntCounter,
}

impl ProtocolMetrics {
    /// Register protocol counters with the provided registry.
    pub fn register(registry: &Registry) -> Result<Self, prometheus::Error> {
        let sent = IntCounter::with_opts(Opts::new(
            "motionlink_frames_sent_total",
            "Command frames written to the device channel",
        ))?;
        let received = IntCounter::with_opts(Opts::new(
            "motionlink_frames_received_total",
            "Frames received from the device channel",
        ))?;
        let malformed = IntCounter::with_opts(Opts::new(
            "motionlink_frames_malformed_total",
            "Inbound frames that could not be decoded",
        ))?;
        let refused = IntCounter::with_opts(Opts::new(
            "motionlink_commands_refused_total",
            "Commands dropped because the channel was not open",
        ))?;

        registry.register(Box::new(sent.clone()))?;
        registry.register(Box::new(received.clone()))?;
        registry.register(Box::new(malformed.clone()))?;
        registry.register(Box::new(refused.clone()))?;

        Ok(Self {
            sent,
            received,
            malformed,
            refused,
        })
    }

    /// Record a frame written to the channel.
    pub fn observe_sent(&self) {
        self.sent.inc();
    }

    /// Record a frame read from the channel.
    pub fn observe_received(&self) {
        self.received.inc();
    }

    /// Record an undecodable inbound frame.
    pub fn observe_malformed(&self) {
        self.malformed.inc();
    }

    /// Record a command refused while disconnected.
    pub fn observe_refused(&self) {
        self.refused.inc();
    }

    /// Current `(sent, received, malformed, refused)` counts.
    pub fn counts(&self) -> (u64, u64, u64, u64) {
        (
            self.sent.get(),
            self.received.get(),
            self.malformed.get(),
            self.refused.get(),
        )
    }
}
