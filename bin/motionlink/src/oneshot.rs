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
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use motionlink_config::CommitOutcome;
use motionlink_protocol::{ConfigUpdateStatus, Response};
use motionlink_session::{Connector, SessionEvent, SessionManager};
use tokio::time::timeout;
use tracing::debug;

use crate::edit::edit_config;
use crate::render;

/// Pump events until `done` returns true for one of them.
async fn wait_for<C, F>(session: &mut SessionManager<C>, mut done: F) -> Result<()>
where
    C: Connector,
    F: FnMut(&SessionEvent) -> Result<bool>,
{
    loop {
        let Some(event) = session.next_event().await else {
            let reason = session
                .connection_state()
                .last_error
                .clone()
                .unwrap_or_else(|| "no connection".to_owned());
            bail!("motion controller unreachable: {}", reason);
        };
        debug!(?event, "session event");
        if done(&event)? {
            return Ok(());
        }
    }
}

async fn within<T>(limit: Duration, what: &str, fut: impl std::future::Future<Output = Result<T>>) -> Result<T> {
    timeout(limit, fut)
        .await
        .map_err(|_| anyhow!("timed out after {:?} waiting for {}", limit, what))?
}

/// Connect, wait for the first status and config frames, print them.
pub async fn status<C: Connector>(
    session: &mut SessionManager<C>,
    json: bool,
    limit: Duration,
    out: &mut dyn Write,
) -> Result<()> {
    session.connect();
    let (mut have_status, mut have_config) = (false, false);
    within(
        limit,
        "status and configuration",
        wait_for(session, |event| {
            match event {
                SessionEvent::Received(Response::Status(_)) => have_status = true,
                SessionEvent::Received(Response::Config(_)) => have_config = true,
                _ => {}
            }
            Ok(have_status && have_config)
        }),
    )
    .await?;

    let snapshot = session.snapshot();
    if json {
        writeln!(out, "{}", serde_json::to_string_pretty(&snapshot)?)?;
    } else {
        writeln!(out, "{}", render::connection_line(&snapshot.connection))?;
        writeln!(out, "{}", render::status_line(&snapshot.status))?;
        writeln!(out, "{}", render::config_block(&snapshot.config))?;
        if snapshot.motion_disabled() {
            writeln!(out, "{}", render::LIMIT_WARNING)?;
        }
    }
    session.disconnect();
    Ok(())
}

/// Connect, apply `assignments` to the device configuration and wait until the
/// device confirms and reports the new values.
pub async fn configure<C: Connector>(
    session: &mut SessionManager<C>,
    assignments: &[(String, String)],
    limit: Duration,
    out: &mut dyn Write,
) -> Result<()> {
    session.connect();
    within(
        limit,
        "configuration",
        wait_for(session, |event| {
            Ok(matches!(event, SessionEvent::Received(Response::Config(_))))
        }),
    )
    .await?;

    let patch = match edit_config(*session.motor_config(), assignments)? {
        CommitOutcome::Submitted(patch) => patch,
        CommitOutcome::NoChanges => {
            writeln!(out, "no changes")?;
            session.disconnect();
            return Ok(());
        }
        CommitOutcome::Invalid(errors) => {
            let detail = errors
                .iter()
                .map(|(field, error)| format!("{}: {}", field, error))
                .collect::<Vec<_>>()
                .join("; ");
            bail!("invalid configuration: {}", detail);
        }
    };
    if !session.update_config(patch) {
        bail!("connection dropped before the update could be sent");
    }

    let mut acknowledged = false;
    within(
        limit,
        "configuration acknowledgement",
        wait_for(session, |event| match event {
            SessionEvent::Received(Response::ConfigUpdated {
                status: ConfigUpdateStatus::Success,
                ..
            }) => {
                acknowledged = true;
                Ok(false)
            }
            SessionEvent::Received(Response::ConfigUpdated { message, .. }) => Err(anyhow!(
                "device rejected the update: {}",
                message.as_deref().unwrap_or("no reason given")
            )),
            SessionEvent::Received(Response::Error { message }) => {
                Err(anyhow!("device error: {}", message))
            }
            SessionEvent::Received(Response::Config(_)) => Ok(acknowledged),
            _ => Ok(false),
        }),
    )
    .await
    .context("configuration update failed")?;

    writeln!(out, "{}", render::config_block(session.motor_config()))?;
    session.disconnect();
    Ok(())
}
