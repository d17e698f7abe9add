//! ---
//! ml_section: "05-test-harness"
//! ml_subsection: "module"
//! ml_type: "source"
//! ml_scope: "code"
//! ml_description: "Fake motion controller for integration tests and demos."
//! ml_version: "v0.1.0"
//! ml_owner: "tbd"
//! ---
use motionlink_config::validate_config;
use motionlink_protocol::{
    Command, ConfigUpdateStatus, JogDirection, LimitSwitches, MotorConfig, MotorStatus, Response,
};
use tracing::{debug, warn};

/// Legacy untyped frame the firmware emits when a move hits a limit.
pub const LIMIT_TRIGGERED_FRAME: &str = r#"{"error":"limit switch triggered"}"#;

/// Motion state and configuration of the simulated controller.
///
/// Moves complete instantly; each command yields the frames the real
/// controller would broadcast for it.
#[derive(Debug, Clone, Default)]
pub struct DeviceModel {
    pub status: MotorStatus,
    pub config: MotorConfig,
    /// Answer `setConfig` with `configUpdated{status:"error"}`.
    pub reject_config_updates: bool,
}

impl DeviceModel {
    pub fn new(config: MotorConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    /// Force the limit switch readings.
    pub fn set_limit_switches(&mut self, min: bool, max: bool) {
        self.status.limit_switches = LimitSwitches {
            min,
            max,
            any: min || max,
        };
    }

    /// Apply `command` and return the frames to broadcast, in order.
    pub fn handle(&mut self, command: &Command) -> Vec<String> {
        debug!(command = command.name(), "fake device handling command");
        match command {
            Command::Move { position, .. } => {
                if self.status.limit_switches.any {
                    return vec![LIMIT_TRIGGERED_FRAME.to_owned()];
                }
                self.travel_to(*position)
            }
            Command::Stop | Command::JogStop => {
                self.status.is_moving = false;
                vec![self.status_frame()]
            }
            Command::EmergencyStop => {
                self.status.is_moving = false;
                self.status.emergency_stop = true;
                vec![self.status_frame()]
            }
            Command::Reset => {
                self.status.emergency_stop = false;
                vec![self.status_frame()]
            }
            Command::Status => vec![self.status_frame()],
            Command::GetConfig => vec![self.config_frame()],
            Command::JogStart { direction, .. } => {
                if self.status.limit_switches.any || self.status.emergency_stop {
                    return vec![encode(&Response::Error {
                        message: "Cannot jog: limit or emergency stop active".into(),
                    })];
                }
                let target = match direction {
                    JogDirection::Forward => self.config.max_limit,
                    JogDirection::Backward => self.config.min_limit,
                };
                self.travel_to(target)
            }
            Command::SetConfig(patch) => {
                if patch.is_empty() {
                    return vec![encode(&Response::Error {
                        message: "Invalid configuration parameters".into(),
                    })];
                }
                if self.reject_config_updates {
                    warn!("fake device rejecting configuration update");
                    return vec![encode(&Response::ConfigUpdated {
                        status: ConfigUpdateStatus::Error,
                        message: Some("Configuration rejected".into()),
                    })];
                }
                let candidate = self.config.with_patch(patch);
                let problems = validate_config(&candidate);
                if !problems.is_empty() {
                    let message = problems
                        .iter()
                        .map(|(field, err)| format!("{}: {}", field, err))
                        .collect::<Vec<_>>()
                        .join("; ");
                    warn!(%message, "fake device refusing invalid configuration");
                    return vec![encode(&Response::ConfigUpdated {
                        status: ConfigUpdateStatus::Error,
                        message: Some(message),
                    })];
                }
                self.config = candidate;
                vec![
                    encode(&Response::ConfigUpdated {
                        status: ConfigUpdateStatus::Success,
                        message: None,
                    }),
                    self.config_frame(),
                ]
            }
        }
    }

    fn travel_to(&mut self, target: i64) -> Vec<String> {
        self.status.is_moving = true;
        let started = self.status_frame();
        self.status.position = target;
        self.status.is_moving = false;
        vec![
            started,
            encode(&Response::Position { position: target }),
            self.status_frame(),
        ]
    }

    pub fn status_frame(&self) -> String {
        encode(&Response::Status(self.status))
    }

    pub fn config_frame(&self) -> String {
        encode(&Response::Config(self.config))
    }
}

fn encode(response: &Response) -> String {
    serde_json::to_string(response).unwrap_or_else(|err| {
        warn!(error = %err, "unable to encode fake device frame");
        String::new()
    })
}
