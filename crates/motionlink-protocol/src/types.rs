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

/// Share of `max_speed` used for jogging and limit moves.
pub const JOG_SPEED_RATIO: f64 = 0.3;

/// State of the physical limit switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitSwitches {
    /// Minimum-side switch triggered.
    pub min: bool,
    /// Maximum-side switch triggered.
    pub max: bool,
    /// Either switch triggered.
    pub any: bool,
}

/// Latest motion state reported by the device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MotorStatus {
    /// Current position in steps.
    pub position: i64,
    /// Whether a move is in progress.
    pub is_moving: bool,
    /// Whether the emergency stop latch is engaged.
    pub emergency_stop: bool,
    /// Limit switch readings.
    pub limit_switches: LimitSwitches,
}

/// Motor configuration as held by the device.
///
/// The device is the single source of truth; the client replaces its copy
/// wholesale whenever a `config` frame arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MotorConfig {
    /// Maximum speed in steps/sec.
    pub max_speed: u32,
    /// Acceleration in steps/sec².
    pub acceleration: u32,
    /// Lower travel limit in steps.
    pub min_limit: i64,
    /// Upper travel limit in steps.
    pub max_limit: i64,
    /// Quiet StealthChop driver mode.
    pub use_stealth_chop: bool,
    /// De-energise the motor after each move.
    #[serde(default)]
    pub freewheel_after_move: bool,
}

impl Default for MotorConfig {
    fn default() -> Self {
        Self {
            max_speed: 8000,
            acceleration: 16000,
            min_limit: -5000,
            max_limit: 5000,
            use_stealth_chop: true,
            freewheel_after_move: false,
        }
    }
}

impl MotorConfig {
    /// Limits coincide, so there is no travel range and motion must stay disabled.
    pub fn motion_disabled(&self) -> bool {
        self.min_limit == self.max_limit
    }

    /// Speed used for jogging and moves to a limit.
    pub fn default_jog_speed(&self) -> u32 {
        (f64::from(self.max_speed) * JOG_SPEED_RATIO).round() as u32
    }

    /// Whether `position` lies inside the configured travel range.
    pub fn contains(&self, position: i64) -> bool {
        position >= self.min_limit && position <= self.max_limit
    }

    /// Clamp `position` into the configured travel range.
    pub fn clamp(&self, position: i64) -> i64 {
        position.max(self.min_limit).min(self.max_limit)
    }

    /// Return a copy with every `Some` field of `patch` applied.
    pub fn with_patch(&self, patch: &ConfigPatch) -> Self {
        Self {
            max_speed: patch.max_speed.unwrap_or(self.max_speed),
            acceleration: patch.acceleration.unwrap_or(self.acceleration),
            min_limit: patch.min_limit.unwrap_or(self.min_limit),
            max_limit: patch.max_limit.unwrap_or(self.max_limit),
            use_stealth_chop: patch.use_stealth_chop.unwrap_or(self.use_stealth_chop),
            freewheel_after_move: patch
                .freewheel_after_move
                .unwrap_or(self.freewheel_after_move),
        }
    }
}

/// Partial configuration carried by `setConfig`. Only `Some` fields go on the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigPatch {
    /// New maximum speed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_speed: Option<u32>,
    /// New acceleration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acceleration: Option<u32>,
    /// New lower limit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_limit: Option<i64>,
    /// New upper limit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_limit: Option<i64>,
    /// New StealthChop mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_stealth_chop: Option<bool>,
    /// New freewheel behaviour.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub freewheel_after_move: Option<bool>,
}

impl ConfigPatch {
    /// True when the patch carries no field at all.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
