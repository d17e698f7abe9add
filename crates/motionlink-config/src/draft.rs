//! ---
//! ml_section: "04-configuration-reconciliation"
//! ml_subsection: "module"
//! ml_type: "source"
//! ml_scope: "code"
//! ml_description: "Motor configuration validation and draft reconciliation."
//! ml_version: "v0.1.0"
//! ml_owner: "tbd"
//! ---
use std::collections::BTreeMap;

use motionlink_protocol::{ConfigPatch, MotorConfig};
use tracing::debug;

use crate::validate::{
    parse_numeric, validate_acceleration, validate_limit, validate_limits, validate_max_speed,
};
use crate::{ConfigField, FieldError};

#[derive(Debug, Clone, PartialEq, Eq)]
struct NumericInput {
    raw: String,
    value: Option<i64>,
}

impl NumericInput {
    fn from_value(value: i64) -> Self {
        Self {
            raw: value.to_string(),
            value: Some(value),
        }
    }
}

/// Result of closing an edit session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    /// At least one field changed and every field is valid; send this patch.
    Submitted(ConfigPatch),
    /// Draft equals the baseline; nothing to send.
    NoChanges,
    /// Draft still carries errors; nothing to send.
    Invalid(Vec<(ConfigField, FieldError)>),
}

impl CommitOutcome {
    /// The patch to transmit, if any.
    pub fn patch(&self) -> Option<&ConfigPatch> {
        match self {
            CommitOutcome::Submitted(patch) => Some(patch),
            _ => None,
        }
    }
}

/// A single configuration edit session.
///
/// The baseline is frozen when the session starts. Edits never fail; they
/// record a field-scoped error instead so the operator can keep typing.
#[derive(Debug, Clone)]
pub struct ConfigDraft {
    baseline: MotorConfig,
    max_speed: NumericInput,
    acceleration: NumericInput,
    min_limit: NumericInput,
    max_limit: NumericInput,
    use_stealth_chop: bool,
    freewheel_after_move: bool,
    errors: BTreeMap<ConfigField, FieldError>,
}

impl ConfigDraft {
    /// Start an edit session from the device's last-known configuration.
    pub fn new(baseline: MotorConfig) -> Self {
        Self {
            baseline,
            max_speed: NumericInput::from_value(i64::from(baseline.max_speed)),
            acceleration: NumericInput::from_value(i64::from(baseline.acceleration)),
            min_limit: NumericInput::from_value(baseline.min_limit),
            max_limit: NumericInput::from_value(baseline.max_limit),
            use_stealth_chop: baseline.use_stealth_chop,
            freewheel_after_move: baseline.freewheel_after_move,
            errors: BTreeMap::new(),
        }
    }

    /// Configuration captured when the session started.
    pub fn baseline(&self) -> &MotorConfig {
        &self.baseline
    }

    fn input(&self, field: ConfigField) -> &NumericInput {
        match field {
            ConfigField::MaxSpeed => &self.max_speed,
            ConfigField::Acceleration => &self.acceleration,
            ConfigField::MinLimit => &self.min_limit,
            ConfigField::MaxLimit => &self.max_limit,
        }
    }

    fn input_mut(&mut self, field: ConfigField) -> &mut NumericInput {
        match field {
            ConfigField::MaxSpeed => &mut self.max_speed,
            ConfigField::Acceleration => &mut self.acceleration,
            ConfigField::MinLimit => &mut self.min_limit,
            ConfigField::MaxLimit => &mut self.max_limit,
        }
    }

    fn baseline_value(&self, field: ConfigField) -> i64 {
        match field {
            ConfigField::MaxSpeed => i64::from(self.baseline.max_speed),
            ConfigField::Acceleration => i64::from(self.baseline.acceleration),
            ConfigField::MinLimit => self.baseline.min_limit,
            ConfigField::MaxLimit => self.baseline.max_limit,
        }
    }

    /// Raw text currently held for `field`.
    pub fn raw(&self, field: ConfigField) -> &str {
        &self.input(field).raw
    }

    /// Parsed value for `field`, `None` while the input does not parse.
    pub fn value(&self, field: ConfigField) -> Option<i64> {
        self.input(field).value
    }

    /// Current error for `field`.
    pub fn error(&self, field: ConfigField) -> Option<&FieldError> {
        self.errors.get(&field)
    }

    /// All current errors in field order.
    pub fn errors(&self) -> impl Iterator<Item = (ConfigField, &FieldError)> + '_ {
        self.errors.iter().map(|(field, err)| (*field, err))
    }

    /// Draft StealthChop flag.
    pub fn use_stealth_chop(&self) -> bool {
        self.use_stealth_chop
    }

    /// Draft freewheel flag.
    pub fn freewheel_after_move(&self) -> bool {
        self.freewheel_after_move
    }

    /// Replace the raw input of a numeric field and revalidate it.
    pub fn edit(&mut self, field: ConfigField, raw: &str) {
        let parsed = parse_numeric(raw);
        {
            let input = self.input_mut(field);
            input.raw = raw.to_owned();
            input.value = parsed.as_ref().ok().copied();
        }

        let verdict = match parsed {
            Err(err) => Err(err),
            Ok(value) => match field {
                ConfigField::MaxSpeed => validate_max_speed(value).map(|_| ()),
                ConfigField::Acceleration => validate_acceleration(value).map(|_| ()),
                ConfigField::MinLimit | ConfigField::MaxLimit => {
                    validate_limit(value).map(|_| ())
                }
            },
        };
        match verdict {
            Ok(()) => {
                self.errors.remove(&field);
            }
            Err(err) => {
                self.errors.insert(field, err);
            }
        }

        if field.counterpart().is_some() {
            self.check_limit_order(field);
        }
    }

    /// Toggle StealthChop.
    pub fn set_use_stealth_chop(&mut self, enabled: bool) {
        self.use_stealth_chop = enabled;
    }

    /// Toggle freewheel after move.
    pub fn set_freewheel_after_move(&mut self, enabled: bool) {
        self.freewheel_after_move = enabled;
    }

    // The edited limit receives its ordering error; its counterpart receives
    // the complementary one unless it already carries a parse error.
    fn check_limit_order(&mut self, edited: ConfigField) {
        let Some(other) = edited.counterpart() else {
            return;
        };
        for field in [edited, other] {
            if self.errors.get(&field).is_some_and(FieldError::is_limit_order) {
                self.errors.remove(&field);
            }
        }

        let (Some(min), Some(max)) = (
            self.value(ConfigField::MinLimit),
            self.value(ConfigField::MaxLimit),
        ) else {
            return;
        };
        if validate_limits(min, max).is_ok() {
            return;
        }
        for field in [edited, other] {
            if let Some(err) = FieldError::limit_order_for(field) {
                self.errors.entry(field).or_insert(err);
            }
        }
    }

    /// Every numeric field parses and no error is recorded.
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty() && ConfigField::ALL.iter().all(|f| self.value(*f).is_some())
    }

    /// Any field differs from the baseline. An unparsable field counts as a change.
    pub fn has_changes(&self) -> bool {
        ConfigField::ALL
            .iter()
            .any(|f| self.value(*f) != Some(self.baseline_value(*f)))
            || self.use_stealth_chop != self.baseline.use_stealth_chop
            || self.freewheel_after_move != self.baseline.freewheel_after_move
    }

    /// Minimal patch holding only fields whose parsed value differs from the baseline.
    pub fn diff(&self) -> ConfigPatch {
        let changed = |field: ConfigField| {
            self.value(field)
                .filter(|value| *value != self.baseline_value(field))
        };
        ConfigPatch {
            max_speed: changed(ConfigField::MaxSpeed).and_then(|v| u32::try_from(v).ok()),
            acceleration: changed(ConfigField::Acceleration).and_then(|v| u32::try_from(v).ok()),
            min_limit: changed(ConfigField::MinLimit),
            max_limit: changed(ConfigField::MaxLimit),
            use_stealth_chop: (self.use_stealth_chop != self.baseline.use_stealth_chop)
                .then_some(self.use_stealth_chop),
            freewheel_after_move: (self.freewheel_after_move
                != self.baseline.freewheel_after_move)
                .then_some(self.freewheel_after_move),
        }
    }

    /// Discard every edit and error, back to the baseline.
    pub fn revert(&mut self) {
        *self = Self::new(self.baseline);
    }

    /// Close the session. The draft is consumed whatever the outcome.
    pub fn commit(self) -> CommitOutcome {
        if !self.is_valid() {
            let errors: Vec<_> = self.errors.into_iter().collect();
            debug!(errors = errors.len(), "config draft closed with validation errors");
            return CommitOutcome::Invalid(errors);
        }
        let patch = self.diff();
        if patch.is_empty() {
            debug!("config draft closed without changes");
            CommitOutcome::NoChanges
        } else {
            debug!(?patch, "config draft committed");
            CommitOutcome::Submitted(patch)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn baseline() -> MotorConfig {
        MotorConfig {
            max_speed: 10000,
            acceleration: 20000,
            use_stealth_chop: true,
            ..Default::default()
        }
    }

    #[test]
    fn commit_emits_only_changed_fields() {
        let mut draft = ConfigDraft::new(baseline());
        draft.edit(ConfigField::MaxSpeed, "12000");
        draft.edit(ConfigField::Acceleration, "25000");
        assert!(draft.has_changes());
        assert_eq!(
            draft.commit(),
            CommitOutcome::Submitted(ConfigPatch {
                max_speed: Some(12000),
                acceleration: Some(25000),
                ..Default::default()
            })
        );
    }

    #[test]
    fn editing_back_to_baseline_is_no_change() {
        let mut draft = ConfigDraft::new(baseline());
        draft.edit(ConfigField::MaxSpeed, "12000");
        draft.edit(ConfigField::MaxSpeed, "10000");
        draft.set_use_stealth_chop(false);
        draft.set_use_stealth_chop(true);
        assert!(!draft.has_changes());
        assert_eq!(draft.commit(), CommitOutcome::NoChanges);
    }

    #[test]
    fn range_error_appears_and_clears() {
        let mut draft = ConfigDraft::new(baseline());
        draft.edit(ConfigField::MaxSpeed, "50");
        assert_eq!(
            draft.error(ConfigField::MaxSpeed),
            Some(&FieldError::SpeedOutOfRange)
        );
        draft.edit(ConfigField::MaxSpeed, "12000");
        assert_eq!(draft.error(ConfigField::MaxSpeed), None);
        assert!(draft.is_valid());
    }

    #[test]
    fn errors_on_one_field_do_not_block_another() {
        let mut draft = ConfigDraft::new(baseline());
        draft.edit(ConfigField::Acceleration, "600000");
        draft.edit(ConfigField::MaxSpeed, "15000");
        assert_eq!(draft.value(ConfigField::MaxSpeed), Some(15000));
        assert_eq!(draft.error(ConfigField::MaxSpeed), None);
        assert_eq!(
            draft.error(ConfigField::Acceleration),
            Some(&FieldError::AccelerationOutOfRange)
        );
        assert!(matches!(draft.commit(), CommitOutcome::Invalid(_)));
    }

    #[test]
    fn empty_and_garbage_input_are_distinct() {
        let mut draft = ConfigDraft::new(baseline());
        draft.edit(ConfigField::MaxSpeed, "");
        draft.edit(ConfigField::Acceleration, "fast");
        assert_eq!(
            draft.error(ConfigField::MaxSpeed),
            Some(&FieldError::Required)
        );
        assert_eq!(
            draft.error(ConfigField::Acceleration),
            Some(&FieldError::InvalidNumber)
        );
        assert_eq!(draft.raw(ConfigField::Acceleration), "fast");
        assert!(draft.has_changes());
        assert!(!draft.is_valid());
    }

    #[test]
    fn limit_order_marks_both_fields_and_clears_together() {
        let mut draft = ConfigDraft::new(MotorConfig::default());
        draft.edit(ConfigField::MinLimit, "6000");
        assert_eq!(
            draft.error(ConfigField::MinLimit),
            Some(&FieldError::MinNotBelowMax)
        );
        assert_eq!(
            draft.error(ConfigField::MaxLimit),
            Some(&FieldError::MaxNotAboveMin)
        );

        draft.edit(ConfigField::MaxLimit, "7000");
        assert_eq!(draft.error(ConfigField::MinLimit), None);
        assert_eq!(draft.error(ConfigField::MaxLimit), None);
        assert_eq!(
            draft.commit().patch().copied(),
            Some(ConfigPatch {
                min_limit: Some(6000),
                max_limit: Some(7000),
                ..Default::default()
            })
        );
    }

    #[test]
    fn equal_limits_are_rejected_in_the_draft() {
        let mut draft = ConfigDraft::new(MotorConfig::default());
        draft.edit(ConfigField::MaxLimit, "-5000");
        assert_eq!(
            draft.error(ConfigField::MaxLimit),
            Some(&FieldError::MaxNotAboveMin)
        );
        assert_eq!(
            draft.error(ConfigField::MinLimit),
            Some(&FieldError::MinNotBelowMax)
        );
    }

    #[test]
    fn unparsable_limit_drops_stale_order_error_on_counterpart() {
        let mut draft = ConfigDraft::new(MotorConfig::default());
        draft.edit(ConfigField::MinLimit, "9000");
        draft.edit(ConfigField::MinLimit, "");
        assert_eq!(
            draft.error(ConfigField::MinLimit),
            Some(&FieldError::Required)
        );
        assert_eq!(draft.error(ConfigField::MaxLimit), None);
    }

    #[test]
    fn revert_restores_values_and_errors() {
        let mut draft = ConfigDraft::new(baseline());
        draft.edit(ConfigField::MaxSpeed, "50");
        draft.edit(ConfigField::MinLimit, "abc");
        draft.set_freewheel_after_move(true);
        draft.revert();
        assert!(!draft.has_changes());
        assert_eq!(draft.errors().count(), 0);
        assert_eq!(draft.raw(ConfigField::MaxSpeed), "10000");
        assert!(!draft.freewheel_after_move());
    }

    #[test]
    fn toggles_are_diffed() {
        let mut draft = ConfigDraft::new(baseline());
        draft.set_use_stealth_chop(false);
        draft.set_freewheel_after_move(true);
        assert_eq!(
            draft.diff(),
            ConfigPatch {
                use_stealth_chop: Some(false),
                freewheel_after_move: Some(true),
                ..Default::default()
            }
        );
    }

    #[test]
    fn invalid_commit_lists_errors() {
        let mut draft = ConfigDraft::new(baseline());
        draft.edit(ConfigField::MaxSpeed, "");
        match draft.commit() {
            CommitOutcome::Invalid(errors) => {
                assert_eq!(errors, vec![(ConfigField::MaxSpeed, FieldError::Required)]);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn oversized_input_is_out_of_range_not_garbage() {
        let mut draft = ConfigDraft::new(baseline());
        draft.edit(ConfigField::MaxSpeed, "99999999999999999999");
        draft.edit(ConfigField::MaxLimit, "99999999999999999999");
        assert_eq!(
            draft.error(ConfigField::MaxSpeed),
            Some(&FieldError::SpeedOutOfRange)
        );
        assert_eq!(
            draft.error(ConfigField::MaxLimit),
            Some(&FieldError::LimitOutOfRange)
        );
        assert!(!draft.is_valid());
    }
}
