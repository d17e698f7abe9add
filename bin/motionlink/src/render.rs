//! ---
//! ml_section: "06-operator-cli"
//! ml_subsection: "binary"
//! ml_type: "source"
//! ml_scope: "code"
//! ml_description: "Terminal client for the motion controller."
//! ml_version: "v0.1.0"
//! ml_owner: "tbd"
//! ---
use motionlink_protocol::{ConfigUpdateStatus, MotorConfig, MotorStatus, Response};
use motionlink_session::{ConnectionState, SessionEvent};

pub const LIMIT_WARNING: &str =
    "warning: min and max limits are equal; motion is disabled until new limits are set";

pub fn connection_line(state: &ConnectionState) -> String {
    let mut line = format!("connection: {}", state.phase());
    if state.reconnect_attempts > 0 {
        line.push_str(&format!(" (retry {})", state.reconnect_attempts));
    }
    if let Some(error) = &state.last_error {
        line.push_str(&format!(" last error: {}", error));
    }
    line
}

pub fn status_line(status: &MotorStatus) -> String {
    let mut flags = Vec::new();
    if status.is_moving {
        flags.push("moving");
    }
    if status.emergency_stop {
        flags.push("EMERGENCY STOP");
    }
    if status.limit_switches.min {
        flags.push("min limit");
    }
    if status.limit_switches.max {
        flags.push("max limit");
    }
    if flags.is_empty() {
        flags.push("idle");
    }
    format!("position {} [{}]", status.position, flags.join(", "))
}

pub fn config_block(config: &MotorConfig) -> String {
    format!(
        "maxSpeed            {} steps/s\n\
         acceleration        {} steps/s²\n\
         minLimit            {}\n\
         maxLimit            {}\n\
         useStealthChop      {}\n\
         freewheelAfterMove  {}",
        config.max_speed,
        config.acceleration,
        config.min_limit,
        config.max_limit,
        config.use_stealth_chop,
        config.freewheel_after_move
    )
}

/// One line for the console per session event; `None` for noise.
pub fn describe_event(event: &SessionEvent) -> Option<String> {
    let line = match event {
        SessionEvent::Connecting { attempt: 0 } => "connecting".to_owned(),
        SessionEvent::Connecting { attempt } => format!("reconnecting (attempt {})", attempt),
        SessionEvent::Connected => "connected".to_owned(),
        SessionEvent::Received(response) => match response {
            Response::Status(status) => status_line(status),
            Response::Position { .. } | Response::Unrecognized => return None,
            Response::Config(config) => {
                let mut text = format!("configuration\n{}", config_block(config));
                if config.motion_disabled() {
                    text.push('\n');
                    text.push_str(LIMIT_WARNING);
                }
                text
            }
            Response::ConfigUpdated {
                status: ConfigUpdateStatus::Success,
                ..
            } => "configuration updated".to_owned(),
            Response::ConfigUpdated { message, .. } => format!(
                "configuration update failed: {}",
                message.as_deref().unwrap_or("no reason given")
            ),
            Response::Error { message } => format!("device error: {}", message),
        },
        SessionEvent::Malformed { error } => format!("ignored malformed frame: {}", error),
        SessionEvent::TransportError(error) => format!("transport error: {}", error),
        SessionEvent::Disconnected {
            retry_in: Some(delay),
        } => format!("disconnected; retrying in {:.1}s", delay.as_secs_f64()),
        SessionEvent::Disconnected { retry_in: None } => {
            "disconnected; type 'reconnect' to try again".to_owned()
        }
    };
    Some(line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use motionlink_protocol::LimitSwitches;
    use std::time::Duration;

    #[test]
    fn status_line_lists_active_flags() {
        let status = MotorStatus {
            position: 120,
            is_moving: true,
            emergency_stop: false,
            limit_switches: LimitSwitches {
                min: false,
                max: true,
                any: true,
            },
        };
        assert_eq!(status_line(&status), "position 120 [moving, max limit]");
        assert_eq!(status_line(&MotorStatus::default()), "position 0 [idle]");
    }

    #[test]
    fn connection_line_includes_retry_and_error() {
        let state = ConnectionState {
            is_connected: false,
            is_connecting: true,
            reconnect_attempts: 2,
            last_error: Some("Connection failed: refused".into()),
        };
        assert_eq!(
            connection_line(&state),
            "connection: connecting (retry 2) last error: Connection failed: refused"
        );
    }

    #[test]
    fn events_render_for_the_operator() {
        assert_eq!(
            describe_event(&SessionEvent::Disconnected {
                retry_in: Some(Duration::from_secs(2))
            })
            .as_deref(),
            Some("disconnected; retrying in 2.0s")
        );
        assert_eq!(
            describe_event(&SessionEvent::Received(Response::Position { position: 4 })),
            None
        );
        let equal = MotorConfig {
            min_limit: 10,
            max_limit: 10,
            ..Default::default()
        };
        let text = describe_event(&SessionEvent::Received(Response::Config(equal))).unwrap();
        assert!(text.ends_with(LIMIT_WARNING));
    }
}
