//! ---
//! ml_section: "02-messaging-protocol"
//! ml_subsection: "module"
//! ml_type: "source"
//! ml_scope: "code"
//! ml_description: "Wire protocol model and frame codecs."
//! ml_version: "v0.1.0"
//! ml_owner: "tbd"
//! ---
use motionlink_protocol::{Command, ConfigPatch, ConfigUpdateStatus, JogDirection, Response};
use serde_json::{json, Value};

// Frames as the firmware serialises them, field order included.
const FIRMWARE_FRAMES: &[&str] = &[
    r#"{"type":"status","position":0,"isMoving":false,"emergencyStop":false,"limitSwitches":{"min":false,"max":false,"any":false}}"#,
    r#"{"type":"position","position":1532}"#,
    r#"{"type":"config","maxSpeed":8000,"acceleration":16000,"minLimit":-5000,"maxLimit":5000,"useStealthChop":true}"#,
    r#"{"type":"configUpdated","status":"success"}"#,
    r#"{"type":"error","message":"Cannot jog: limit or emergency stop active"}"#,
];

#[test]
fn firmware_frames_decode_to_known_variants() -> anyhow::Result<()> {
    let kinds = FIRMWARE_FRAMES
        .iter()
        .map(|frame| Response::decode(frame).map(|r| r.kind()))
        .collect::<Result<Vec<_>, _>>()?;
    assert_eq!(
        kinds,
        ["status", "position", "config", "configUpdated", "error"]
    );
    Ok(())
}

#[test]
fn config_updated_success_is_recognised() -> anyhow::Result<()> {
    let response = Response::decode(FIRMWARE_FRAMES[3])?;
    assert!(matches!(
        response,
        Response::ConfigUpdated {
            status: ConfigUpdateStatus::Success,
            ..
        }
    ));
    Ok(())
}

#[test]
fn high_frequency_position_burst_decodes_in_order() -> anyhow::Result<()> {
    let positions: Vec<i64> = (0..50)
        .map(|i| format!(r#"{{"type":"position","position":{}}}"#, i * 10))
        .map(|frame| match Response::decode(&frame) {
            Ok(Response::Position { position }) => Ok(position),
            Ok(other) => Err(anyhow::anyhow!("unexpected {}", other.kind())),
            Err(err) => Err(err.into()),
        })
        .collect::<anyhow::Result<_>>()?;
    assert_eq!(positions.first(), Some(&0));
    assert_eq!(positions.last(), Some(&490));
    assert!(positions.windows(2).all(|w| w[0] < w[1]));
    Ok(())
}

#[test]
fn outbound_commands_use_firmware_field_names() -> anyhow::Result<()> {
    let frames = [
        Command::Move {
            position: 1000,
            speed: 5000,
        },
        Command::JogStart {
            direction: JogDirection::Forward,
            speed: 3000,
        },
        Command::SetConfig(ConfigPatch {
            min_limit: Some(-200),
            max_limit: Some(800),
            freewheel_after_move: Some(true),
            ..Default::default()
        }),
    ]
    .iter()
    .map(|c| c.encode().map_err(anyhow::Error::from))
    .map(|text| text.and_then(|t| serde_json::from_str::<Value>(&t).map_err(Into::into)))
    .collect::<anyhow::Result<Vec<_>>>()?;

    assert_eq!(frames[0]["position"], json!(1000));
    assert_eq!(frames[1]["direction"], json!("forward"));
    assert_eq!(
        frames[2],
        json!({
            "command": "setConfig",
            "minLimit": -200,
            "maxLimit": 800,
            "freewheelAfterMove": true
        })
    );
    Ok(())
}
