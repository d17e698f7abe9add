//! ---
//! ml_section: "03-session-management"
//! ml_subsection: "module"
//! ml_type: "source"
//! ml_scope: "code"
//! ml_description: "Device session lifecycle, reconnection and dispatch."
//! ml_version: "v0.1.0"
//! ml_owner: "tbd"
//! ---
use std::time::Duration;

use motionlink_protocol::{
    log_frame, Command, ConfigPatch, ConfigUpdateStatus, FrameDirection, JogDirection,
    MotorConfig, MotorStatus, ProtocolMetrics, Response,
};
use tokio::sync::watch;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

use crate::link::{Connector, Link, LinkEvent};
use crate::policy::ReconnectPolicy;
use crate::state::{ConnectionState, SessionEvent, SessionSnapshot};
use crate::{Result, SessionError};

const RETRIES_EXHAUSTED: &str = "Connection lost; automatic reconnection gave up";

/// Owns the channel to one motion controller and everything learned from it.
///
/// The manager is driven by its owner: command helpers act immediately, while
/// [`SessionManager::next_event`] waits for transport activity or the retry
/// deadline and applies it. Dropping the manager tears the channel down.
pub struct SessionManager<C: Connector> {
    connector: C,
    policy: ReconnectPolicy,
    link: Option<Link>,
    retry_at: Option<Instant>,
    state: SessionSnapshot,
    snapshots: watch::Sender<SessionSnapshot>,
    metrics: Option<ProtocolMetrics>,
}

impl<C: Connector> SessionManager<C> {
    /// Create an idle manager. Nothing is opened until [`connect`](Self::connect).
    pub fn new(connector: C, policy: ReconnectPolicy) -> Self {
        let state = SessionSnapshot::default();
        let (snapshots, _) = watch::channel(state.clone());
        Self {
            connector,
            policy,
            link: None,
            retry_at: None,
            state,
            snapshots,
            metrics: None,
        }
    }

    /// Count frames in the given protocol metrics.
    pub fn with_metrics(mut self, metrics: ProtocolMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Reconnection policy in force.
    pub fn policy(&self) -> ReconnectPolicy {
        self.policy
    }

    // ---- lifecycle -------------------------------------------------------

    /// Open a channel unless one is already opening or open.
    pub fn connect(&mut self) {
        if self.link.as_ref().is_some_and(Link::is_active) {
            debug!("connect ignored; channel already active");
            return;
        }
        self.retry_at = None;
        info!(endpoint = %self.connector.describe(), "connecting to motion controller");
        self.link = Some(self.connector.open());
        self.state.connection.is_connected = false;
        self.state.connection.is_connecting = true;
        self.state.connection.last_error = None;
        self.publish();
    }

    /// Schedule the first connection after `delay` instead of opening at once.
    pub fn connect_after(&mut self, delay: Duration) {
        if self.link.is_some() {
            return;
        }
        self.retry_at = Some(Instant::now() + delay);
    }

    /// Cancel any pending retry, then close the channel. Safe to call repeatedly.
    pub fn disconnect(&mut self) {
        self.retry_at = None;
        if let Some(mut link) = self.link.take() {
            info!("closing channel to motion controller");
            link.close();
        }
        if self.state.connection.is_connected || self.state.connection.is_connecting {
            self.state.connection.is_connected = false;
            self.state.connection.is_connecting = false;
            self.publish();
        }
    }

    /// Tear down, forget the retry budget and any error, and connect again.
    pub fn manual_reconnect(&mut self) {
        info!("manual reconnect requested");
        self.disconnect();
        self.state.connection = ConnectionState::default();
        self.connect();
    }

    /// A retry or delayed connect is pending.
    pub fn retry_pending(&self) -> bool {
        self.retry_at.is_some()
    }

    /// No channel and nothing scheduled; [`next_event`](Self::next_event) would return `None`.
    pub fn is_idle(&self) -> bool {
        self.link.is_none() && self.retry_at.is_none()
    }

    /// Wait for the next channel event or retry deadline and apply it.
    ///
    /// Returns `None` straight away when there is neither a channel nor a
    /// pending retry.
    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        if let Some(link) = self.link.as_mut() {
            let event = link.recv().await;
            return Some(self.apply_link_event(event));
        }
        let deadline = self.retry_at?;
        sleep_until(deadline).await;
        self.retry_at = None;
        let attempt = self.state.connection.reconnect_attempts;
        self.connect();
        Some(SessionEvent::Connecting { attempt })
    }

    fn apply_link_event(&mut self, event: LinkEvent) -> SessionEvent {
        match event {
            LinkEvent::Opened => self.on_opened(),
            LinkEvent::Frame(text) => self.on_frame(&text),
            LinkEvent::Error(message) => {
                warn!(error = %message, "motion controller channel error");
                self.state.connection.last_error = Some(message.clone());
                self.publish();
                SessionEvent::TransportError(message)
            }
            LinkEvent::Closed => self.on_closed(),
        }
    }

    fn on_opened(&mut self) -> SessionEvent {
        info!(endpoint = %self.connector.describe(), "motion controller connected");
        self.state.connection = ConnectionState {
            is_connected: true,
            ..ConnectionState::default()
        };
        self.publish();
        self.refresh_status();
        self.request_config();
        SessionEvent::Connected
    }

    fn on_closed(&mut self) -> SessionEvent {
        self.link = None;
        let connection = &mut self.state.connection;
        connection.is_connected = false;
        connection.is_connecting = false;

        let retry_in = if self.policy.allows(connection.reconnect_attempts) {
            connection.reconnect_attempts += 1;
            self.retry_at = Some(Instant::now() + self.policy.delay);
            info!(
                attempt = connection.reconnect_attempts,
                max_attempts = self.policy.max_attempts,
                delay_ms = self.policy.delay.as_millis() as u64,
                "motion controller disconnected; retry scheduled"
            );
            Some(self.policy.delay)
        } else {
            if connection.last_error.is_none() {
                connection.last_error = Some(RETRIES_EXHAUSTED.to_owned());
            }
            warn!(
                attempts = connection.reconnect_attempts,
                "motion controller disconnected; not retrying"
            );
            None
        };
        self.publish();
        SessionEvent::Disconnected { retry_in }
    }

    fn on_frame(&mut self, text: &str) -> SessionEvent {
        if let Some(metrics) = &self.metrics {
            metrics.observe_received();
        }
        let response = match Response::decode(text) {
            Ok(response) => response,
            Err(err) => {
                warn!(error = %err, payload = text, "dropping malformed frame");
                if let Some(metrics) = &self.metrics {
                    metrics.observe_malformed();
                }
                return SessionEvent::Malformed {
                    error: err.to_string(),
                };
            }
        };
        log_frame(FrameDirection::Inbound, response.kind(), text);

        match &response {
            Response::Status(status) => {
                self.state.status = *status;
                self.publish();
            }
            Response::Position { position } => {
                self.state.status.position = *position;
                self.publish();
            }
            Response::Config(config) => {
                if config.motion_disabled() {
                    warn!(
                        limit = config.min_limit,
                        "device reports equal travel limits; motion disabled"
                    );
                }
                self.state.config = *config;
                self.publish();
            }
            Response::ConfigUpdated {
                status: ConfigUpdateStatus::Success,
                ..
            } => {
                debug!("configuration update acknowledged; refreshing");
                self.request_config();
            }
            Response::ConfigUpdated {
                status: ConfigUpdateStatus::Error,
                message,
            } => {
                warn!(message = ?message, "device rejected configuration update");
            }
            Response::Error { message } => {
                warn!(message = %message, "motion controller reported an error");
                self.state.connection.last_error = Some(message.clone());
                self.publish();
            }
            Response::Unrecognized => {
                debug!("ignoring unrecognised frame");
            }
        }
        SessionEvent::Received(response)
    }

    fn publish(&self) {
        self.snapshots.send_replace(self.state.clone());
    }

    // ---- commands --------------------------------------------------------

    /// Serialise and queue `command`, failing when the channel is not open.
    pub fn try_send(&self, command: &Command) -> Result<()> {
        let link = self
            .link
            .as_ref()
            .filter(|link| link.is_open())
            .ok_or(SessionError::NotConnected)?;
        let frame = command.encode()?;
        log_frame(FrameDirection::Outbound, command.name(), &frame);
        if !link.send(frame) {
            return Err(SessionError::ChannelClosed);
        }
        if let Some(metrics) = &self.metrics {
            metrics.observe_sent();
        }
        Ok(())
    }

    /// Queue `command`. Returns false, without raising, when it could not be sent.
    pub fn send_command(&self, command: &Command) -> bool {
        match self.try_send(command) {
            Ok(()) => true,
            Err(err) => {
                warn!(command = command.name(), error = %err, "command not sent");
                if let Some(metrics) = &self.metrics {
                    metrics.observe_refused();
                }
                false
            }
        }
    }

    /// Absolute move.
    pub fn move_to(&self, position: i64, speed: u32) -> bool {
        self.send_command(&Command::Move { position, speed })
    }

    /// Decelerating stop.
    pub fn stop(&self) -> bool {
        self.send_command(&Command::Stop)
    }

    /// Latch the emergency stop.
    pub fn emergency_stop(&self) -> bool {
        self.send_command(&Command::EmergencyStop)
    }

    /// Release the emergency stop latch.
    pub fn clear_emergency_stop(&self) -> bool {
        self.send_command(&Command::Reset)
    }

    /// Send the fields present in `patch`.
    pub fn update_config(&self, patch: ConfigPatch) -> bool {
        self.send_command(&Command::SetConfig(patch))
    }

    /// Ask for a full status frame.
    pub fn refresh_status(&self) -> bool {
        self.send_command(&Command::Status)
    }

    /// Ask for a config frame.
    pub fn request_config(&self) -> bool {
        self.send_command(&Command::GetConfig)
    }

    /// Start continuous motion.
    pub fn jog_start(&self, direction: JogDirection, speed: u32) -> bool {
        self.send_command(&Command::JogStart { direction, speed })
    }

    /// Stop continuous motion.
    pub fn jog_stop(&self) -> bool {
        self.send_command(&Command::JogStop)
    }

    // ---- read side -------------------------------------------------------

    /// Connection bookkeeping.
    pub fn connection_state(&self) -> &ConnectionState {
        &self.state.connection
    }

    /// Channel is open.
    pub fn is_connected(&self) -> bool {
        self.state.connection.is_connected
    }

    /// Channel is being opened.
    pub fn is_connecting(&self) -> bool {
        self.state.connection.is_connecting
    }

    /// Last reported motion state.
    pub fn motor_status(&self) -> &MotorStatus {
        &self.state.status
    }

    /// Last reported configuration.
    pub fn motor_config(&self) -> &MotorConfig {
        &self.state.config
    }

    /// Copy of the current state.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.state.clone()
    }

    /// Receiver that sees every published snapshot.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshots.subscribe()
    }
}

impl<C: Connector> Drop for SessionManager<C> {
    fn drop(&mut self) {
        self.disconnect();
    }
}
