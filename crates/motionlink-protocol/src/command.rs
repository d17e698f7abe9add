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

use crate::types::ConfigPatch;
use crate::Result;

/// Jog direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JogDirection {
    /// Towards `max_limit`.
    Forward,
    /// Towards `min_limit`.
    Backward,
}

impl std::str::FromStr for JogDirection {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "forward" | "fwd" | "+" => Ok(JogDirection::Forward),
            "backward" | "back" | "bwd" | "-" => Ok(JogDirection::Backward),
            other => Err(format!("unknown jog direction: {}", other)),
        }
    }
}

/// Command sent to the device, discriminated by the `command` field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "camelCase")]
pub enum Command {
    /// Absolute move.
    Move {
        /// Target position in steps.
        position: i64,
        /// Speed in steps/sec.
        speed: u32,
    },
    /// Decelerate to a stop.
    Stop,
    /// Latch the emergency stop.
    EmergencyStop,
    /// Release the emergency stop latch.
    Reset,
    /// Ask for a full status frame.
    Status,
    /// Ask for a config frame.
    GetConfig,
    /// Write the fields present in the patch.
    SetConfig(ConfigPatch),
    /// Begin continuous motion.
    JogStart {
        /// Direction of travel.
        direction: JogDirection,
        /// Speed in steps/sec.
        speed: u32,
    },
    /// End continuous motion.
    JogStop,
}

impl Command {
    /// Discriminator value as it appears on the wire.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Move { .. } => "move",
            Command::Stop => "stop",
            Command::EmergencyStop => "emergencyStop",
            Command::Reset => "reset",
            Command::Status => "status",
            Command::GetConfig => "getConfig",
            Command::SetConfig(_) => "setConfig",
            Command::JogStart { .. } => "jogStart",
            Command::JogStop => "jogStop",
        }
    }

    /// Serialise into a JSON text frame.
    pub fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn wire(command: &Command) -> Value {
        serde_json::from_str(&command.encode().unwrap()).unwrap()
    }

    #[test]
    fn every_command_carries_its_discriminator() {
        let commands = [
            Command::Move {
                position: 1000,
                speed: 5000,
            },
            Command::Stop,
            Command::EmergencyStop,
            Command::Reset,
            Command::Status,
            Command::GetConfig,
            Command::SetConfig(ConfigPatch::default()),
            Command::JogStart {
                direction: JogDirection::Forward,
                speed: 3000,
            },
            Command::JogStop,
        ];
        for command in &commands {
            assert_eq!(wire(command)["command"], command.name());
        }
    }

    #[test]
    fn move_and_jog_shapes() {
        assert_eq!(
            wire(&Command::Move {
                position: -250,
                speed: 4000
            }),
            json!({"command": "move", "position": -250, "speed": 4000})
        );
        assert_eq!(
            wire(&Command::JogStart {
                direction: JogDirection::Backward,
                speed: 2400
            }),
            json!({"command": "jogStart", "direction": "backward", "speed": 2400})
        );
        assert_eq!(wire(&Command::JogStop), json!({"command": "jogStop"}));
    }

    #[test]
    fn set_config_flattens_patch_fields() {
        let command = Command::SetConfig(ConfigPatch {
            max_speed: Some(12000),
            acceleration: Some(25000),
            ..Default::default()
        });
        assert_eq!(
            wire(&command),
            json!({"command": "setConfig", "maxSpeed": 12000, "acceleration": 25000})
        );
    }

    #[test]
    fn jog_direction_parses_aliases() {
        assert_eq!("Forward".parse::<JogDirection>(), Ok(JogDirection::Forward));
        assert_eq!("back".parse::<JogDirection>(), Ok(JogDirection::Backward));
        assert!("sideways".parse::<JogDirection>().is_err());
    }
}
