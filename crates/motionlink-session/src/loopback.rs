//! ---
//! ml_section: "03-session-management"
//! ml_subsection: "module"
//! ml_type: "source"
//! ml_scope: "code"
//! ml_description: "Device session lifecycle, reconnection and dispatch."
//! ml_version: "v0.1.0"
//! ml_owner: "tbd"
//! ---
//! In-memory connector for driving a session without a network.
//!
//! [`LoopbackConnector`] hands each opened link's transport side to a
//! [`LoopbackDevice`], which plays the controller: it decides when a link
//! opens, pushes frames, injects errors and closes.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use motionlink_protocol::{Command, Response};
use tokio::sync::mpsc;
use tracing::debug;

use crate::link::{Connector, Link, LinkEvent, LinkPeer};

/// Connector whose links terminate in a [`LoopbackDevice`].
#[derive(Debug, Clone)]
pub struct LoopbackConnector {
    accepted: mpsc::UnboundedSender<LinkPeer>,
    opened: Arc<AtomicUsize>,
}

/// Device side of a [`LoopbackConnector`].
#[derive(Debug)]
pub struct LoopbackDevice {
    incoming: mpsc::UnboundedReceiver<LinkPeer>,
    opened: Arc<AtomicUsize>,
}

impl LoopbackConnector {
    /// Create a connector and the device that receives its links.
    pub fn pair() -> (LoopbackConnector, LoopbackDevice) {
        let (tx, rx) = mpsc::unbounded_channel();
        let opened = Arc::new(AtomicUsize::new(0));
        (
            LoopbackConnector {
                accepted: tx,
                opened: opened.clone(),
            },
            LoopbackDevice {
                incoming: rx,
                opened,
            },
        )
    }
}

impl Connector for LoopbackConnector {
    fn open(&self) -> Link {
        let (link, peer) = Link::pair();
        let count = self.opened.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(count, "loopback link requested");
        if let Err(mpsc::error::SendError(peer)) = self.accepted.send(peer) {
            peer.emit(LinkEvent::Error("Connection failed: device gone".into()));
            peer.emit(LinkEvent::Closed);
        }
        link
    }

    fn describe(&self) -> String {
        "loopback".to_owned()
    }
}

impl LoopbackDevice {
    /// Take the next link the session opened, if any.
    pub fn try_accept(&mut self) -> Option<LoopbackPeer> {
        self.incoming.try_recv().ok().map(LoopbackPeer)
    }

    /// Wait for the session to open a link.
    pub async fn accept(&mut self) -> Option<LoopbackPeer> {
        self.incoming.recv().await.map(LoopbackPeer)
    }

    /// Links opened through the connector so far.
    pub fn open_count(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }
}

/// One accepted link, seen from the device.
#[derive(Debug)]
pub struct LoopbackPeer(LinkPeer);

impl LoopbackPeer {
    /// Complete the handshake.
    pub fn open(&self) {
        self.0.emit(LinkEvent::Opened);
    }

    /// Push a typed response frame.
    pub fn send(&self, response: &Response) {
        match serde_json::to_string(response) {
            Ok(text) => self.send_raw(&text),
            Err(err) => debug!(error = %err, "unable to serialise loopback response"),
        }
    }

    /// Push an arbitrary text frame.
    pub fn send_raw(&self, text: &str) {
        self.0.emit(LinkEvent::Frame(text.to_owned()));
    }

    /// Report a transport error without closing.
    pub fn fail(&self, message: &str) {
        self.0.emit(LinkEvent::Error(message.to_owned()));
    }

    /// Close from the device side.
    pub fn close(self) {
        self.0.emit(LinkEvent::Closed);
    }

    /// Every frame the session has written so far, in order.
    pub fn drain_frames(&mut self) -> Vec<String> {
        let mut frames = Vec::new();
        while let Ok(frame) = self.0.outbound.try_recv() {
            frames.push(frame);
        }
        frames
    }

    /// Every command the session has written so far. Undecodable frames are skipped.
    pub fn drain_commands(&mut self) -> Vec<Command> {
        self.drain_frames()
            .iter()
            .filter_map(|frame| serde_json::from_str(frame).ok())
            .collect()
    }

    /// The session closed or dropped its end.
    pub fn is_closed_by_session(&mut self) -> bool {
        matches!(
            self.0.outbound.try_recv(),
            Err(mpsc::error::TryRecvError::Disconnected)
        )
    }
}
