//! ---
//! ml_section: "04-configuration-reconciliation"
//! ml_subsection: "module"
//! ml_type: "source"
//! ml_scope: "code"
//! ml_description: "Motor configuration validation and draft reconciliation."
//! ml_version: "v0.1.0"
//! ml_owner: "tbd"
//! ---
use std::num::IntErrorKind;
use std::ops::RangeInclusive;

use motionlink_protocol::MotorConfig;

use crate::{ConfigField, FieldError};

/// Accepted `maxSpeed` values in steps/sec.
pub const MAX_SPEED_RANGE: RangeInclusive<i64> = 100..=100_000;
/// Accepted `acceleration` values in steps/sec².
pub const ACCELERATION_RANGE: RangeInclusive<i64> = 100..=500_000;
/// Travel limits the controller can store (a 32-bit signed step count).
pub const LIMIT_RANGE: RangeInclusive<i64> = i32::MIN as i64..=i32::MAX as i64;

/// Parse raw operator input. Empty input is `Required`, anything else that is
/// not an integer is `InvalidNumber`. Integers beyond `i64` saturate so the
/// field's range rule reports them.
pub fn parse_numeric(raw: &str) -> Result<i64, FieldError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(FieldError::Required);
    }
    trimmed.parse::<i64>().or_else(|err| match err.kind() {
        IntErrorKind::PosOverflow => Ok(i64::MAX),
        IntErrorKind::NegOverflow => Ok(i64::MIN),
        _ => Err(FieldError::InvalidNumber),
    })
}

/// Check `maxSpeed` against [`MAX_SPEED_RANGE`].
pub fn validate_max_speed(value: i64) -> Result<u32, FieldError> {
    if MAX_SPEED_RANGE.contains(&value) {
        u32::try_from(value).map_err(|_| FieldError::SpeedOutOfRange)
    } else {
        Err(FieldError::SpeedOutOfRange)
    }
}

/// Check `acceleration` against [`ACCELERATION_RANGE`].
pub fn validate_acceleration(value: i64) -> Result<u32, FieldError> {
    if ACCELERATION_RANGE.contains(&value) {
        u32::try_from(value).map_err(|_| FieldError::AccelerationOutOfRange)
    } else {
        Err(FieldError::AccelerationOutOfRange)
    }
}

/// Check one travel limit against [`LIMIT_RANGE`].
pub fn validate_limit(value: i64) -> Result<i64, FieldError> {
    if LIMIT_RANGE.contains(&value) {
        Ok(value)
    } else {
        Err(FieldError::LimitOutOfRange)
    }
}

/// The limit pair is valid iff `min < max`. On failure returns the error for
/// each side, min first.
pub fn validate_limits(min: i64, max: i64) -> Result<(), (FieldError, FieldError)> {
    if min < max {
        Ok(())
    } else {
        Err((FieldError::MinNotBelowMax, FieldError::MaxNotAboveMin))
    }
}

/// Run every rule against a complete configuration.
pub fn validate_config(config: &MotorConfig) -> Vec<(ConfigField, FieldError)> {
    let mut errors = Vec::new();
    if let Err(err) = validate_max_speed(i64::from(config.max_speed)) {
        errors.push((ConfigField::MaxSpeed, err));
    }
    if let Err(err) = validate_acceleration(i64::from(config.acceleration)) {
        errors.push((ConfigField::Acceleration, err));
    }
    for (field, value) in [
        (ConfigField::MinLimit, config.min_limit),
        (ConfigField::MaxLimit, config.max_limit),
    ] {
        if let Err(err) = validate_limit(value) {
            errors.push((field, err));
        }
    }
    if let Err((min_err, max_err)) = validate_limits(config.min_limit, config.max_limit) {
        errors.push((ConfigField::MinLimit, min_err));
        errors.push((ConfigField::MaxLimit, max_err));
    }
    errors
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_parse_distinguishes_empty_from_garbage() {
        assert_eq!(parse_numeric(""), Err(FieldError::Required));
        assert_eq!(parse_numeric("   "), Err(FieldError::Required));
        assert_eq!(parse_numeric("12k"), Err(FieldError::InvalidNumber));
        assert_eq!(parse_numeric(" -42 "), Ok(-42));
    }

    #[test]
    fn oversized_integers_fall_to_range_rules() {
        assert_eq!(parse_numeric("99999999999999999999"), Ok(i64::MAX));
        assert_eq!(parse_numeric("-99999999999999999999"), Ok(i64::MIN));
        assert_eq!(
            parse_numeric("99999999999999999999").and_then(validate_max_speed),
            Err(FieldError::SpeedOutOfRange)
        );
        assert_eq!(validate_limit(3_000_000_000), Err(FieldError::LimitOutOfRange));
        assert_eq!(validate_limit(-2_147_483_648), Ok(-2_147_483_648));
    }

    #[test]
    fn speed_bounds_are_inclusive() {
        assert_eq!(validate_max_speed(50), Err(FieldError::SpeedOutOfRange));
        assert_eq!(validate_max_speed(100), Ok(100));
        assert_eq!(validate_max_speed(12000), Ok(12000));
        assert_eq!(validate_max_speed(100_000), Ok(100_000));
        assert_eq!(validate_max_speed(100_001), Err(FieldError::SpeedOutOfRange));
        assert_eq!(validate_max_speed(-1), Err(FieldError::SpeedOutOfRange));
    }

    #[test]
    fn acceleration_bounds_are_inclusive() {
        assert_eq!(
            validate_acceleration(99),
            Err(FieldError::AccelerationOutOfRange)
        );
        assert_eq!(validate_acceleration(500_000), Ok(500_000));
        assert_eq!(
            validate_acceleration(600_000),
            Err(FieldError::AccelerationOutOfRange)
        );
    }

    #[test]
    fn limits_require_strict_order() {
        assert!(validate_limits(-10, 10).is_ok());
        assert!(validate_limits(1000, 1000).is_err());
        assert!(validate_limits(6000, 5000).is_err());
    }

    #[test]
    fn whole_config_validation_reports_each_field() {
        assert!(validate_config(&MotorConfig::default()).is_empty());
        let bad = MotorConfig {
            max_speed: 50,
            min_limit: 10,
            max_limit: 10,
            ..Default::default()
        };
        let fields: Vec<_> = validate_config(&bad).into_iter().map(|(f, _)| f).collect();
        assert_eq!(
            fields,
            [
                ConfigField::MaxSpeed,
                ConfigField::MinLimit,
                ConfigField::MaxLimit
            ]
        );
    }
}
