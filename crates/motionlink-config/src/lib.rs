//! ---
//! ml_section: "04-configuration-reconciliation"
//! ml_subsection: "module"
//! ml_type: "source"
//! ml_scope: "code"
//! ml_description: "Motor configuration validation and draft reconciliation."
//! ml_version: "v0.1.0"
//! ml_owner: "tbd"
//! ---
//! Validation and reconciliation of locally edited motor configuration.
//!
//! A [`ConfigDraft`] captures the device's last-known [`MotorConfig`] as its
//! baseline, accepts raw field input, tracks per-field errors, and on commit
//! yields a [`ConfigPatch`] holding only the fields that actually changed.
//!
//! [`MotorConfig`]: motionlink_protocol::MotorConfig
//! [`ConfigPatch`]: motionlink_protocol::ConfigPatch
#![warn(missing_docs)]

pub mod draft;
pub mod validate;

pub use draft::{CommitOutcome, ConfigDraft};
pub use validate::{
    parse_numeric, validate_acceleration, validate_config, validate_limit, validate_limits,
    validate_max_speed, ACCELERATION_RANGE, LIMIT_RANGE, MAX_SPEED_RANGE,
};

/// Editable numeric fields of the motor configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ConfigField {
    /// `maxSpeed`.
    MaxSpeed,
    /// `acceleration`.
    Acceleration,
    /// `minLimit`.
    MinLimit,
    /// `maxLimit`.
    MaxLimit,
}

impl ConfigField {
    /// All numeric fields in display order.
    pub const ALL: [ConfigField; 4] = [
        ConfigField::MaxSpeed,
        ConfigField::Acceleration,
        ConfigField::MinLimit,
        ConfigField::MaxLimit,
    ];

    /// Wire name of the field.
    pub fn wire_name(&self) -> &'static str {
        match self {
            ConfigField::MaxSpeed => "maxSpeed",
            ConfigField::Acceleration => "acceleration",
            ConfigField::MinLimit => "minLimit",
            ConfigField::MaxLimit => "maxLimit",
        }
    }

    /// The other half of the limit pair, if this is a limit.
    pub fn counterpart(&self) -> Option<ConfigField> {
        match self {
            ConfigField::MinLimit => Some(ConfigField::MaxLimit),
            ConfigField::MaxLimit => Some(ConfigField::MinLimit),
            _ => None,
        }
    }
}

impl std::fmt::Display for ConfigField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.wire_name())
    }
}

impl std::str::FromStr for ConfigField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalised: String = s
            .chars()
            .filter(|c| !matches!(c, '_' | '-'))
            .collect::<String>()
            .to_lowercase();
        match normalised.as_str() {
            "maxspeed" | "speed" => Ok(ConfigField::MaxSpeed),
            "acceleration" | "accel" => Ok(ConfigField::Acceleration),
            "minlimit" | "min" => Ok(ConfigField::MinLimit),
            "maxlimit" | "max" => Ok(ConfigField::MaxLimit),
            _ => Err(format!("unknown config field: {}", s)),
        }
    }
}

/// Field-scoped validation failure. The display text is what an operator sees.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FieldError {
    /// Input was empty.
    #[error("Required")]
    Required,
    /// Input was not an integer.
    #[error("Invalid number")]
    InvalidNumber,
    /// `maxSpeed` outside its range.
    #[error("Speed must be between 100 and 100,000 steps/sec")]
    SpeedOutOfRange,
    /// `acceleration` outside its range.
    #[error("Acceleration must be between 100 and 500,000 steps/sec²")]
    AccelerationOutOfRange,
    /// A travel limit the controller cannot store.
    #[error("Limit must be between -2,147,483,648 and 2,147,483,647 steps")]
    LimitOutOfRange,
    /// `minLimit` is not below `maxLimit`.
    #[error("Min must be less than max")]
    MinNotBelowMax,
    /// `maxLimit` is not above `minLimit`.
    #[error("Max must be greater than min")]
    MaxNotAboveMin,
}

impl FieldError {
    /// Whether the error comes from the limit ordering rule.
    pub fn is_limit_order(&self) -> bool {
        matches!(self, FieldError::MinNotBelowMax | FieldError::MaxNotAboveMin)
    }

    /// The ordering error that belongs on `field`.
    pub fn limit_order_for(field: ConfigField) -> Option<FieldError> {
        match field {
            ConfigField::MinLimit => Some(FieldError::MinNotBelowMax),
            ConfigField::MaxLimit => Some(FieldError::MaxNotAboveMin),
            _ => None,
        }
    }
}
