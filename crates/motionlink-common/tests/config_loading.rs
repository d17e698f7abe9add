//! ---
//! ml_section: "01-core-functionality"
//! ml_subsection: "module"
//! ml_type: "source"
//! ml_scope: "code"
//! ml_description: "Shared client configuration and logging primitives."
//! ml_version: "v0.1.0"
//! ml_owner: "tbd"
//! ---
use std::io::Write;
use std::time::Duration;

use motionlink_common::AppConfig;

#[test]
fn first_existing_candidate_wins() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let missing = dir.path().join("missing.toml");
    let present = dir.path().join("motionlink.toml");
    let mut file = std::fs::File::create(&present)?;
    writeln!(
        file,
        "[device]\nurl = \"ws://10.0.0.7/ws\"\n\n[reconnect]\nmax_attempts = 5\ndelay_ms = 1000"
    )?;

    let loaded = AppConfig::load_or_default(&[&missing, &present])?;
    assert_eq!(loaded.source.as_deref(), Some(present.as_path()));
    assert_eq!(
        loaded.config.device.websocket_url()?.as_str(),
        "ws://10.0.0.7/ws"
    );
    assert_eq!(loaded.config.reconnect.max_attempts, 5);
    assert_eq!(loaded.config.reconnect.delay, Duration::from_secs(1));
    Ok(())
}

#[test]
fn no_candidates_falls_back_to_defaults() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let loaded = AppConfig::load_or_default(&[dir.path().join("absent.toml")])?;
    assert!(loaded.source.is_none());
    assert_eq!(loaded.config.reconnect.max_attempts, 3);
    assert!(AppConfig::load(&[dir.path().join("absent.toml")]).is_err());
    Ok(())
}

#[test]
fn invalid_file_is_reported_not_defaulted() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("broken.toml");
    std::fs::write(&path, "[device]\nurl = \"ftp://device\"\n")?;
    let err = AppConfig::load_or_default(&[&path]).unwrap_err();
    assert!(format!("{err:#}").contains("ws or wss"));
    Ok(())
}
