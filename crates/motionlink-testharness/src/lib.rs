//! ---
//! ml_section: "05-test-harness"
//! ml_subsection: "module"
//! ml_type: "source"
//! ml_scope: "code"
//! ml_description: "Fake motion controller for integration tests and demos."
//! ml_version: "v0.1.0"
//! ml_owner: "tbd"
//! ---
//! A fake motion controller serving the device protocol on `/ws`.
//!
//! Integration tests spawn it on an ephemeral port and point a real
//! WebSocket session at it; the `motionlink-fake-device` binary runs it
//! standalone for trying the CLI without hardware.

pub mod model;
pub mod server;

pub use model::{DeviceModel, LIMIT_TRIGGERED_FRAME};
pub use server::{FakeDeviceBuilder, FakeDeviceHandle};
