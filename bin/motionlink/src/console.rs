//! ---
//! ml_section: "06-operator-cli"
//! ml_subsection: "binary"
//! ml_type: "source"
//! ml_scope: "code"
//! ml_description: "Terminal client for the motion controller."
//! ml_version: "v0.1.0"
//! ml_owner: "tbd"
//! ---
use std::io::Write;

use anyhow::Result;
use motionlink_config::CommitOutcome;
use motionlink_protocol::{JogDirection, MotorConfig};
use motionlink_session::{Connector, SessionManager};

use crate::edit::{edit_config, parse_assignments, InputError};
use crate::render;

/// Default share of `maxSpeed` for moves, in percent.
pub const DEFAULT_SPEED_PERCENT: u8 = 50;

pub const HELP: &str = "\
commands:
  move <position> [speed%]   move to an absolute position (speed 1-100% of maxSpeed)
  goto <percent>             move to a point between the limits (0 = min, 100 = max)
  min | max                  move to a travel limit at jog speed
  jog forward|backward [s]   start jogging (default speed 30% of maxSpeed)
  jog stop                   stop jogging
  stop                       decelerating stop
  estop                      emergency stop
  reset                      clear the emergency stop
  status | config            print the last known status or configuration
  set key=value ...          change configuration (speed, accel, min, max, stealth, freewheel)
  reconnect                  reconnect now with a fresh retry budget
  help | quit";

/// Which travel limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitSide {
    Min,
    Max,
}

/// One line of operator input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Move { position: i64, speed_percent: u8 },
    Goto { percent: u8 },
    Limit(LimitSide),
    JogStart { direction: JogDirection, speed: Option<u32> },
    JogStop,
    Stop,
    EmergencyStop,
    Reset,
    Status,
    Config,
    Set(Vec<(String, String)>),
    Reconnect,
    Help,
    Quit,
}

/// Whether the console keeps running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

fn number<T: std::str::FromStr>(word: Option<&str>, what: &'static str) -> Result<T, InputError> {
    let word = word.ok_or(InputError::Missing(what))?;
    word.parse().map_err(|_| InputError::Invalid {
        what,
        value: word.to_owned(),
    })
}

fn percent(word: &str, what: &'static str) -> Result<u8, InputError> {
    let value: u8 = word
        .trim_end_matches('%')
        .parse()
        .map_err(|_| InputError::Invalid {
            what,
            value: word.to_owned(),
        })?;
    Ok(value)
}

/// Parse one input line. Blank lines yield `None`.
pub fn parse(line: &str) -> Result<Option<ConsoleCommand>, InputError> {
    let mut words = line.split_whitespace();
    let Some(head) = words.next() else {
        return Ok(None);
    };
    let command = match head.to_ascii_lowercase().as_str() {
        "move" | "goto-position" => {
            let position = number(words.next(), "position")?;
            let speed_percent = match words.next() {
                Some(word) => percent(word, "speed percentage")?,
                None => DEFAULT_SPEED_PERCENT,
            };
            ConsoleCommand::Move {
                position,
                speed_percent,
            }
        }
        "goto" => {
            let word = words.next().ok_or(InputError::Missing("percentage"))?;
            let percent = percent(word, "percentage")?;
            if percent > 100 {
                return Err(InputError::Invalid {
                    what: "percentage",
                    value: word.to_owned(),
                });
            }
            ConsoleCommand::Goto { percent }
        }
        "min" => ConsoleCommand::Limit(LimitSide::Min),
        "max" => ConsoleCommand::Limit(LimitSide::Max),
        "jog" => {
            let word = words.next().ok_or(InputError::Missing("jog direction"))?;
            if word.eq_ignore_ascii_case("stop") {
                ConsoleCommand::JogStop
            } else {
                let direction = word.parse().map_err(|_| InputError::Invalid {
                    what: "jog direction",
                    value: word.to_owned(),
                })?;
                let speed = match words.next() {
                    Some(word) => Some(number(Some(word), "jog speed")?),
                    None => None,
                };
                ConsoleCommand::JogStart { direction, speed }
            }
        }
        "stop" => ConsoleCommand::Stop,
        "estop" | "emergency" | "e-stop" => ConsoleCommand::EmergencyStop,
        "reset" | "clear" => ConsoleCommand::Reset,
        "status" => ConsoleCommand::Status,
        "config" => ConsoleCommand::Config,
        "set" => {
            let assignments = parse_assignments(words.by_ref())?;
            if assignments.is_empty() {
                return Err(InputError::Missing("key=value"));
            }
            ConsoleCommand::Set(assignments)
        }
        "reconnect" => ConsoleCommand::Reconnect,
        "help" | "?" => ConsoleCommand::Help,
        "quit" | "exit" | "q" => ConsoleCommand::Quit,
        other => return Err(InputError::UnknownCommand(other.to_owned())),
    };
    Ok(Some(command))
}

/// Speed for `percent` of the configured maximum.
pub fn speed_for_percent(max_speed: u32, percent: u8) -> u32 {
    (f64::from(max_speed) * f64::from(percent) / 100.0).round() as u32
}

/// Point `percent` of the way from `min_limit` to `max_limit`, rounded half up.
/// Expects `min_limit <= max_limit`.
pub fn position_at_percent(config: &MotorConfig, percent: u8) -> i64 {
    let min = i128::from(config.min_limit);
    let range = i128::from(config.max_limit) - min;
    let offset = (range * i128::from(percent.min(100)) + 50) / 100;
    i64::try_from(min + offset).unwrap_or(config.max_limit)
}

// Reason motion commands are refused, if any.
fn motion_blocked<C: Connector>(session: &SessionManager<C>) -> Option<&'static str> {
    if !session.is_connected() {
        Some("not connected")
    } else if session.motor_config().motion_disabled() {
        Some("motion disabled: min and max limits are equal; set new limits first")
    } else if session.motor_config().min_limit > session.motor_config().max_limit {
        Some("motion disabled: min limit is above max limit; set new limits first")
    } else if session.motor_status().emergency_stop {
        Some("emergency stop active; 'reset' first")
    } else {
        None
    }
}

fn report_sent(out: &mut dyn Write, sent: bool, what: &str) -> Result<()> {
    if !sent {
        writeln!(out, "{} not sent: not connected", what)?;
    }
    Ok(())
}

/// Run one command against the session.
pub fn execute<C: Connector>(
    session: &mut SessionManager<C>,
    command: ConsoleCommand,
    out: &mut dyn Write,
) -> Result<Flow> {
    match command {
        ConsoleCommand::Move {
            position,
            speed_percent,
        } => {
            if let Some(reason) = motion_blocked(session) {
                writeln!(out, "{}", reason)?;
                return Ok(Flow::Continue);
            }
            if !(1..=100).contains(&speed_percent) {
                writeln!(out, "Speed must be between 1-100%")?;
                return Ok(Flow::Continue);
            }
            let config = *session.motor_config();
            if !config.contains(position) {
                writeln!(
                    out,
                    "position {} is outside the travel limits [{}, {}]; nearest allowed is {}",
                    position,
                    config.min_limit,
                    config.max_limit,
                    config.clamp(position)
                )?;
                return Ok(Flow::Continue);
            }
            let speed = speed_for_percent(config.max_speed, speed_percent);
            report_sent(out, session.move_to(position, speed), "move")?;
        }
        ConsoleCommand::Goto { percent } => {
            if let Some(reason) = motion_blocked(session) {
                writeln!(out, "{}", reason)?;
                return Ok(Flow::Continue);
            }
            let config = *session.motor_config();
            let position = position_at_percent(&config, percent);
            let speed = speed_for_percent(config.max_speed, DEFAULT_SPEED_PERCENT);
            report_sent(out, session.move_to(position, speed), "move")?;
        }
        ConsoleCommand::Limit(side) => {
            if let Some(reason) = motion_blocked(session) {
                writeln!(out, "{}", reason)?;
                return Ok(Flow::Continue);
            }
            let config = *session.motor_config();
            let position = match side {
                LimitSide::Min => config.min_limit,
                LimitSide::Max => config.max_limit,
            };
            report_sent(
                out,
                session.move_to(position, config.default_jog_speed()),
                "move",
            )?;
        }
        ConsoleCommand::JogStart { direction, speed } => {
            if let Some(reason) = motion_blocked(session) {
                writeln!(out, "{}", reason)?;
                return Ok(Flow::Continue);
            }
            let speed = speed.unwrap_or_else(|| session.motor_config().default_jog_speed());
            report_sent(out, session.jog_start(direction, speed), "jog")?;
        }
        ConsoleCommand::JogStop => report_sent(out, session.jog_stop(), "jog stop")?,
        ConsoleCommand::Stop => report_sent(out, session.stop(), "stop")?,
        ConsoleCommand::EmergencyStop => {
            report_sent(out, session.emergency_stop(), "emergency stop")?
        }
        ConsoleCommand::Reset => report_sent(out, session.clear_emergency_stop(), "reset")?,
        ConsoleCommand::Status => {
            writeln!(out, "{}", render::connection_line(session.connection_state()))?;
            writeln!(out, "{}", render::status_line(session.motor_status()))?;
        }
        ConsoleCommand::Config => {
            writeln!(out, "{}", render::config_block(session.motor_config()))?;
            if session.motor_config().motion_disabled() {
                writeln!(out, "{}", render::LIMIT_WARNING)?;
            }
        }
        ConsoleCommand::Set(assignments) => {
            if !session.is_connected() {
                writeln!(out, "not connected")?;
                return Ok(Flow::Continue);
            }
            match edit_config(*session.motor_config(), &assignments) {
                Ok(CommitOutcome::Submitted(patch)) => {
                    report_sent(out, session.update_config(patch), "configuration")?;
                }
                Ok(CommitOutcome::NoChanges) => writeln!(out, "no changes")?,
                Ok(CommitOutcome::Invalid(errors)) => {
                    for (field, error) in errors {
                        writeln!(out, "{}: {}", field, error)?;
                    }
                }
                Err(err) => writeln!(out, "{}", err)?,
            }
        }
        ConsoleCommand::Reconnect => {
            session.manual_reconnect();
            writeln!(out, "reconnecting")?;
        }
        ConsoleCommand::Help => writeln!(out, "{}", HELP)?,
        ConsoleCommand::Quit => return Ok(Flow::Quit),
    }
    Ok(Flow::Continue)
}

#[cfg(test)]
mod tests {
    use super::*;
    use motionlink_protocol::{Command, ConfigPatch, MotorStatus, Response};
    use motionlink_session::{
        LoopbackConnector, LoopbackDevice, LoopbackPeer, ReconnectPolicy, SessionEvent,
    };

    #[test]
    fn parses_motion_commands() {
        assert_eq!(
            parse("move -1200 75%").unwrap(),
            Some(ConsoleCommand::Move {
                position: -1200,
                speed_percent: 75
            })
        );
        assert_eq!(
            parse("move 10").unwrap(),
            Some(ConsoleCommand::Move {
                position: 10,
                speed_percent: DEFAULT_SPEED_PERCENT
            })
        );
        assert_eq!(
            parse("jog back").unwrap(),
            Some(ConsoleCommand::JogStart {
                direction: JogDirection::Backward,
                speed: None
            })
        );
        assert_eq!(parse("jog stop").unwrap(), Some(ConsoleCommand::JogStop));
        assert_eq!(parse("MAX").unwrap(), Some(ConsoleCommand::Limit(LimitSide::Max)));
        assert_eq!(parse("   ").unwrap(), None);
    }

    #[test]
    fn parse_errors_name_the_problem() {
        assert_eq!(parse("move"), Err(InputError::Missing("position")));
        assert!(matches!(parse("move far"), Err(InputError::Invalid { .. })));
        assert!(matches!(parse("goto 150"), Err(InputError::Invalid { .. })));
        assert!(matches!(parse("jog sideways"), Err(InputError::Invalid { .. })));
        assert_eq!(parse("set"), Err(InputError::Missing("key=value")));
        assert_eq!(
            parse("dance"),
            Err(InputError::UnknownCommand("dance".into()))
        );
    }

    #[test]
    fn speed_percentages_round() {
        assert_eq!(speed_for_percent(8000, 50), 4000);
        assert_eq!(speed_for_percent(10001, 1), 100);
        assert_eq!(speed_for_percent(8000, 100), 8000);
    }

    async fn connected() -> (SessionManager<LoopbackConnector>, LoopbackDevice, LoopbackPeer) {
        let (connector, mut device) = LoopbackConnector::pair();
        let mut session = SessionManager::new(connector, ReconnectPolicy::default());
        session.connect();
        let mut peer = device.try_accept().unwrap();
        peer.open();
        assert_eq!(session.next_event().await, Some(SessionEvent::Connected));
        peer.drain_commands();
        (session, device, peer)
    }

    fn run(session: &mut SessionManager<LoopbackConnector>, line: &str) -> String {
        let mut out = Vec::new();
        let command = parse(line).unwrap().unwrap();
        execute(session, command, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[tokio::test]
    async fn move_uses_percentage_of_max_speed() {
        let (mut session, _device, mut peer) = connected().await;
        run(&mut session, "move 1000 25");
        run(&mut session, "min");
        assert_eq!(
            peer.drain_commands(),
            vec![
                Command::Move {
                    position: 1000,
                    speed: 2000
                },
                Command::Move {
                    position: -5000,
                    speed: 2400
                }
            ]
        );
    }

    #[tokio::test]
    async fn out_of_range_move_is_refused_locally() {
        let (mut session, _device, mut peer) = connected().await;
        let text = run(&mut session, "move 9000");
        assert!(text.contains("nearest allowed is 5000"));
        assert!(run(&mut session, "move 0 0").contains("Speed must be between 1-100%"));
        assert!(peer.drain_commands().is_empty());
    }

    #[tokio::test]
    async fn equal_limits_block_motion_but_not_stop() {
        let (mut session, _device, mut peer) = connected().await;
        peer.send(&Response::Config(MotorConfig {
            min_limit: 0,
            max_limit: 0,
            ..Default::default()
        }));
        session.next_event().await;

        assert!(run(&mut session, "jog forward").contains("motion disabled"));
        assert!(run(&mut session, "goto 50").contains("motion disabled"));
        run(&mut session, "stop");
        assert!(run(&mut session, "config").contains("limits are equal"));
        assert_eq!(peer.drain_commands(), vec![Command::Stop]);
    }

    #[tokio::test]
    async fn emergency_stop_blocks_jog_until_reset() {
        let (mut session, _device, mut peer) = connected().await;
        peer.send(&Response::Status(MotorStatus {
            emergency_stop: true,
            ..Default::default()
        }));
        session.next_event().await;
        assert!(run(&mut session, "jog forward").contains("emergency stop active"));
        run(&mut session, "reset");
        assert_eq!(peer.drain_commands(), vec![Command::Reset]);
    }

    #[tokio::test]
    async fn set_sends_only_changed_fields() {
        let (mut session, _device, mut peer) = connected().await;
        run(&mut session, "set speed=12000 accel=16000");
        assert!(run(&mut session, "set speed=8000").contains("no changes"));
        assert!(run(&mut session, "set min=6000").contains("Min must be less than max"));
        assert_eq!(
            peer.drain_commands(),
            vec![Command::SetConfig(ConfigPatch {
                max_speed: Some(12000),
                ..Default::default()
            })]
        );
    }

    #[tokio::test]
    async fn commands_report_when_disconnected() {
        let (connector, _device) = LoopbackConnector::pair();
        let mut session = SessionManager::new(connector, ReconnectPolicy::default());
        assert!(run(&mut session, "stop").contains("not sent"));
        assert!(run(&mut session, "move 0").contains("not connected"));
        let mut out = Vec::new();
        assert_eq!(
            execute(&mut session, ConsoleCommand::Quit, &mut out).unwrap(),
            Flow::Quit
        );
    }

    #[test]
    fn goto_positions_span_extreme_limits() {
        let wide = MotorConfig {
            min_limit: i64::MIN,
            max_limit: i64::MAX,
            ..Default::default()
        };
        assert_eq!(position_at_percent(&wide, 0), i64::MIN);
        assert_eq!(position_at_percent(&wide, 100), i64::MAX);
        assert_eq!(position_at_percent(&wide, 50), 0);

        let narrow = MotorConfig {
            min_limit: -5,
            max_limit: 6,
            ..Default::default()
        };
        assert_eq!(position_at_percent(&narrow, 50), 1);
        assert_eq!(position_at_percent(&narrow, 100), 6);
    }

    #[tokio::test]
    async fn inverted_limits_block_motion() {
        let (mut session, _device, mut peer) = connected().await;
        peer.send(&Response::Config(MotorConfig {
            min_limit: 4000,
            max_limit: -4000,
            ..Default::default()
        }));
        session.next_event().await;

        for line in ["goto 50", "min", "max", "jog backward", "move 0"] {
            assert!(
                run(&mut session, line).contains("min limit is above max limit"),
                "{line} was not refused"
            );
        }
        run(&mut session, "estop");
        assert_eq!(peer.drain_commands(), vec![Command::EmergencyStop]);
    }
}
