//! ---
//! ml_section: "03-session-management"
//! ml_subsection: "module"
//! ml_type: "source"
//! ml_scope: "code"
//! ml_description: "Device session lifecycle, reconnection and dispatch."
//! ml_version: "v0.1.0"
//! ml_owner: "tbd"
//! ---
use tokio::sync::mpsc;

/// Something a transport reports about its channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    /// The channel is ready for writes.
    Opened,
    /// A text frame arrived.
    Frame(String),
    /// The transport hit an error. A closure may or may not follow.
    Error(String),
    /// The channel is gone.
    Closed,
}

/// Lifecycle of a single link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    /// Waiting for the transport to report `Opened`.
    Opening,
    /// Writes are accepted.
    Open,
    /// Closed by either side.
    Closed,
}

/// Opens channels to the device.
///
/// `open` returns immediately with a link in [`LinkState::Opening`]; the outcome
/// arrives later as [`LinkEvent`]s.
pub trait Connector {
    /// Start opening a new channel.
    fn open(&self) -> Link;

    /// Human-readable endpoint for logging.
    fn describe(&self) -> String;
}

/// Session side of a channel: outbound text frames in, [`LinkEvent`]s out.
#[derive(Debug)]
pub struct Link {
    outbound: Option<mpsc::UnboundedSender<String>>,
    events: mpsc::UnboundedReceiver<LinkEvent>,
    state: LinkState,
}

/// Transport side of a channel.
#[derive(Debug)]
pub struct LinkPeer {
    /// Frames written by the session. Yields `None` once the session closed the link.
    pub outbound: mpsc::UnboundedReceiver<String>,
    events: mpsc::UnboundedSender<LinkEvent>,
}

impl Link {
    /// Create a connected link/peer pair.
    pub fn pair() -> (Link, LinkPeer) {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        (
            Link {
                outbound: Some(outbound_tx),
                events: events_rx,
                state: LinkState::Opening,
            },
            LinkPeer {
                outbound: outbound_rx,
                events: events_tx,
            },
        )
    }

    /// Current lifecycle state.
    pub fn state(&self) -> LinkState {
        self.state
    }

    /// Opening or open.
    pub fn is_active(&self) -> bool {
        self.state != LinkState::Closed
    }

    /// Writes are accepted.
    pub fn is_open(&self) -> bool {
        self.state == LinkState::Open
    }

    /// Queue a frame. Returns false when the link is not open or the transport is gone.
    pub fn send(&self, frame: String) -> bool {
        match (&self.outbound, self.state) {
            (Some(tx), LinkState::Open) => tx.send(frame).is_ok(),
            _ => false,
        }
    }

    /// Wait for the next transport event. A vanished transport reads as `Closed`.
    pub async fn recv(&mut self) -> LinkEvent {
        if self.state == LinkState::Closed {
            return LinkEvent::Closed;
        }
        let event = self.events.recv().await.unwrap_or(LinkEvent::Closed);
        match event {
            LinkEvent::Opened => self.state = LinkState::Open,
            LinkEvent::Closed => self.state = LinkState::Closed,
            LinkEvent::Frame(_) | LinkEvent::Error(_) => {}
        }
        event
    }

    /// Close from the session side. The transport sees its outbound stream end.
    pub fn close(&mut self) {
        self.outbound = None;
        self.state = LinkState::Closed;
    }
}

impl LinkPeer {
    /// Report an event to the session. Returns false once the session dropped the link.
    pub fn emit(&self, event: LinkEvent) -> bool {
        self.events.send(event).is_ok()
    }
}
