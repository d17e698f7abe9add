//! ---
//! ml_section: "03-session-management"
//! ml_subsection: "module"
//! ml_type: "source"
//! ml_scope: "code"
//! ml_description: "Device session lifecycle, reconnection and dispatch."
//! ml_version: "v0.1.0"
//! ml_owner: "tbd"
//! ---
use futures_util::{SinkExt, StreamExt};
use tokio::runtime::Handle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::protocol::Message;
use tracing::{debug, info, warn};
use url::Url;

use crate::link::{Connector, Link, LinkEvent, LinkPeer};

/// Opens WebSocket channels to the device.
///
/// Each [`Connector::open`] spawns a pump task on the current tokio runtime.
/// Outside a runtime the returned link reports an error and closes.
#[derive(Debug, Clone)]
pub struct WebSocketConnector {
    url: Url,
}

impl WebSocketConnector {
    /// Connector for `url` (`ws://` or `wss://`).
    pub fn new(url: Url) -> Self {
        Self { url }
    }

    /// Endpoint this connector dials.
    pub fn url(&self) -> &Url {
        &self.url
    }
}

impl Connector for WebSocketConnector {
    fn open(&self) -> Link {
        let (link, peer) = Link::pair();
        match Handle::try_current() {
            Ok(handle) => {
                handle.spawn(pump(self.url.clone(), peer));
            }
            Err(err) => {
                warn!(error = %err, "no tokio runtime available for websocket connector");
                peer.emit(LinkEvent::Error(format!("Connection failed: {}", err)));
                peer.emit(LinkEvent::Closed);
            }
        }
        link
    }

    fn describe(&self) -> String {
        self.url.to_string()
    }
}

async fn pump(url: Url, mut peer: LinkPeer) {
    debug!(url = %url, "opening websocket");
    let connect = connect_async(url.as_str());
    let stream = tokio::select! {
        result = connect => match result {
            Ok((stream, _response)) => stream,
            Err(err) => {
                warn!(url = %url, error = %err, "websocket connection failed");
                peer.emit(LinkEvent::Error(format!("Connection failed: {}", err)));
                peer.emit(LinkEvent::Closed);
                return;
            }
        },
        None = peer.outbound.recv() => {
            debug!(url = %url, "connection abandoned before it opened");
            return;
        }
    };

    info!(url = %url, "websocket open");
    if !peer.emit(LinkEvent::Opened) {
        return;
    }
    let (mut sink, mut source) = stream.split();

    loop {
        tokio::select! {
            outbound = peer.outbound.recv() => match outbound {
                Some(text) => {
                    if let Err(err) = sink.send(Message::Text(text)).await {
                        warn!(error = %err, "websocket write failed");
                        peer.emit(LinkEvent::Error(err.to_string()));
                        peer.emit(LinkEvent::Closed);
                        return;
                    }
                }
                None => {
                    debug!(url = %url, "closing websocket on request");
                    let _ = sink.send(Message::Close(None)).await;
                    return;
                }
            },
            inbound = source.next() => match inbound {
                Some(Ok(Message::Text(text))) => {
                    if !peer.emit(LinkEvent::Frame(text)) {
                        return;
                    }
                }
                Some(Ok(Message::Close(frame))) => {
                    info!(url = %url, reason = ?frame, "websocket closed by device");
                    peer.emit(LinkEvent::Closed);
                    return;
                }
                Some(Ok(Message::Binary(_))) => {
                    debug!("ignoring binary websocket frame");
                }
                Some(Ok(_)) => {}
                Some(Err(err)) => {
                    warn!(error = %err, "websocket read failed");
                    peer.emit(LinkEvent::Error(err.to_string()));
                    peer.emit(LinkEvent::Closed);
                    return;
                }
                None => {
                    info!(url = %url, "websocket stream ended");
                    peer.emit(LinkEvent::Closed);
                    return;
                }
            },
        }
    }
}
