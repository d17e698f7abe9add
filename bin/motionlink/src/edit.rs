//! ---
//! ml_section: "06-operator-cli"
//! ml_subsection: "binary"
//! ml_type: "source"
//! ml_scope: "code"
//! ml_description: "Terminal client for the motion controller."
//! ml_version: "v0.1.0"
//! ml_owner: "tbd"
//! ---
use motionlink_config::{CommitOutcome, ConfigDraft, ConfigField};
use motionlink_protocol::MotorConfig;

/// Failure to understand operator input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InputError {
    #[error("unknown command '{0}'; type 'help'")]
    UnknownCommand(String),
    #[error("missing {0}")]
    Missing(&'static str),
    #[error("invalid {what}: '{value}'")]
    Invalid { what: &'static str, value: String },
    #[error("unknown setting '{0}'")]
    UnknownSetting(String),
    #[error("expected key=value, got '{0}'")]
    NotAnAssignment(String),
}

/// Split `key=value` words.
pub fn parse_assignments<'a, I>(words: I) -> Result<Vec<(String, String)>, InputError>
where
    I: IntoIterator<Item = &'a str>,
{
    words
        .into_iter()
        .map(|word| {
            word.split_once('=')
                .map(|(key, value)| (key.trim().to_owned(), value.trim().to_owned()))
                .filter(|(key, _)| !key.is_empty())
                .ok_or_else(|| InputError::NotAnAssignment(word.to_owned()))
        })
        .collect()
}

pub fn parse_flag(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "on" | "yes" | "1" => Some(true),
        "false" | "off" | "no" | "0" => Some(false),
        _ => None,
    }
}

/// Feed assignments into `draft`. Numeric values are passed through raw so the
/// draft records field errors; only unknown keys and bad flags fail here.
pub fn apply_assignments(
    draft: &mut ConfigDraft,
    assignments: &[(String, String)],
) -> Result<(), InputError> {
    for (key, value) in assignments {
        let normalised: String = key
            .chars()
            .filter(|c| !matches!(c, '_' | '-'))
            .collect::<String>()
            .to_lowercase();
        match normalised.as_str() {
            "stealthchop" | "usestealthchop" | "stealth" => {
                let flag = parse_flag(value).ok_or_else(|| InputError::Invalid {
                    what: "stealth chop flag",
                    value: value.clone(),
                })?;
                draft.set_use_stealth_chop(flag);
            }
            "freewheel" | "freewheelaftermove" => {
                let flag = parse_flag(value).ok_or_else(|| InputError::Invalid {
                    what: "freewheel flag",
                    value: value.clone(),
                })?;
                draft.set_freewheel_after_move(flag);
            }
            _ => {
                let field: ConfigField = key
                    .parse()
                    .map_err(|_| InputError::UnknownSetting(key.clone()))?;
                draft.edit(field, value);
            }
        }
    }
    Ok(())
}

/// One-shot edit session: baseline, assignments, commit.
pub fn edit_config(
    baseline: MotorConfig,
    assignments: &[(String, String)],
) -> Result<CommitOutcome, InputError> {
    let mut draft = ConfigDraft::new(baseline);
    apply_assignments(&mut draft, assignments)?;
    Ok(draft.commit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use motionlink_config::FieldError;
    use motionlink_protocol::ConfigPatch;

    fn pairs(words: &[&str]) -> Vec<(String, String)> {
        parse_assignments(words.iter().copied()).unwrap()
    }

    #[test]
    fn assignments_split_on_first_equals() {
        assert_eq!(
            pairs(&["speed=12000", "min = -50"]),
            vec![
                ("speed".to_owned(), "12000".to_owned()),
                ("min".to_owned(), "-50".to_owned())
            ]
        );
        assert_eq!(
            parse_assignments(["speed"]),
            Err(InputError::NotAnAssignment("speed".into()))
        );
        assert!(parse_assignments(["=5"]).is_err());
    }

    #[test]
    fn edit_commits_only_changes() {
        let outcome = edit_config(
            MotorConfig::default(),
            &pairs(&["maxSpeed=12000", "stealth=off", "acceleration=16000"]),
        )
        .unwrap();
        assert_eq!(
            outcome,
            CommitOutcome::Submitted(ConfigPatch {
                max_speed: Some(12000),
                use_stealth_chop: Some(false),
                ..Default::default()
            })
        );
    }

    #[test]
    fn invalid_values_surface_as_field_errors() {
        let outcome = edit_config(MotorConfig::default(), &pairs(&["speed=50"])).unwrap();
        assert_eq!(
            outcome,
            CommitOutcome::Invalid(vec![(ConfigField::MaxSpeed, FieldError::SpeedOutOfRange)])
        );
    }

    #[test]
    fn unknown_keys_and_flags_are_input_errors() {
        assert_eq!(
            edit_config(MotorConfig::default(), &pairs(&["torque=3"])),
            Err(InputError::UnknownSetting("torque".into()))
        );
        assert!(matches!(
            edit_config(MotorConfig::default(), &pairs(&["freewheel=maybe"])),
            Err(InputError::Invalid { .. })
        ));
    }
}
