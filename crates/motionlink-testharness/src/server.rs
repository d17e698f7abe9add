//! ---
//! ml_section: "05-test-harness"
//! ml_subsection: "module"
//! ml_type: "source"
//! ml_scope: "code"
//! ml_description: "Fake motion controller for integration tests and demos."
//! ml_version: "v0.1.0"
//! ml_owner: "tbd"
//! ---
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::routing::get;
use axum::Router;
use motionlink_protocol::{Command, MotorConfig, MotorStatus, Response};
use parking_lot::Mutex;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::model::DeviceModel;

#[derive(Debug, Clone)]
enum Outbound {
    Frame(String),
    Disconnect,
}

struct DeviceState {
    model: Mutex<DeviceModel>,
    received: Mutex<Vec<Command>>,
    outbound: broadcast::Sender<Outbound>,
    accepted: AtomicUsize,
}

impl DeviceState {
    // Every frame goes to every client, like the controller's broadcast.
    fn broadcast(&self, frame: String) {
        let _ = self.outbound.send(Outbound::Frame(frame));
    }
}

/// Builder for the fake controller.
#[derive(Debug, Clone)]
pub struct FakeDeviceBuilder {
    listen: SocketAddr,
    model: DeviceModel,
}

impl FakeDeviceBuilder {
    /// Bind to `listen`; use port 0 for an ephemeral port.
    pub fn new(listen: SocketAddr) -> Self {
        Self {
            listen,
            model: DeviceModel::default(),
        }
    }

    /// Initial configuration.
    pub fn with_config(mut self, config: MotorConfig) -> Self {
        self.model.config = config;
        self
    }

    /// Initial motion state.
    pub fn with_status(mut self, status: MotorStatus) -> Self {
        self.model.status = status;
        self
    }

    /// Answer every `setConfig` with an error acknowledgement.
    pub fn reject_config_updates(mut self, reject: bool) -> Self {
        self.model.reject_config_updates = reject;
        self
    }

    /// Spawn the server and return its handle.
    pub async fn spawn(self) -> anyhow::Result<FakeDeviceHandle> {
        let listener = TcpListener::bind(self.listen).await?;
        let local_addr = listener.local_addr()?;
        info!(address = %local_addr, "fake motion controller listening");

        let (outbound, _) = broadcast::channel(256);
        let state = Arc::new(DeviceState {
            model: Mutex::new(self.model),
            received: Mutex::new(Vec::new()),
            outbound,
            accepted: AtomicUsize::new(0),
        });

        let app = Router::new()
            .route("/ws", get(upgrade_handler))
            .with_state(state.clone());

        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(async move {
            let server = axum::serve(listener, app).with_graceful_shutdown(async move {
                let _ = shutdown_rx.changed().await;
            });
            if let Err(err) = server.await {
                warn!(error = %err, "fake motion controller exited with error");
            }
        });

        Ok(FakeDeviceHandle {
            address: local_addr,
            state,
            shutdown: shutdown_tx,
            task,
        })
    }
}

/// Handle for a running fake controller.
pub struct FakeDeviceHandle {
    address: SocketAddr,
    state: Arc<DeviceState>,
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl FakeDeviceHandle {
    /// Bound listening address.
    pub fn local_addr(&self) -> SocketAddr {
        self.address
    }

    /// WebSocket endpoint clients should dial.
    pub fn url(&self) -> String {
        format!("ws://{}/ws", self.address)
    }

    /// Connections accepted so far.
    pub fn accepted_connections(&self) -> usize {
        self.state.accepted.load(Ordering::SeqCst)
    }

    /// Commands received so far, in arrival order.
    pub fn received_commands(&self) -> Vec<Command> {
        self.state.received.lock().clone()
    }

    /// Current simulated motion state.
    pub fn status(&self) -> MotorStatus {
        self.state.model.lock().status
    }

    /// Current simulated configuration.
    pub fn config(&self) -> MotorConfig {
        self.state.model.lock().config
    }

    /// Force the limit switch readings.
    pub fn set_limit_switches(&self, min: bool, max: bool) {
        self.state.model.lock().set_limit_switches(min, max);
    }

    /// Broadcast a typed frame to every client.
    pub fn push(&self, response: &Response) -> anyhow::Result<()> {
        self.state.broadcast(serde_json::to_string(response)?);
        Ok(())
    }

    /// Broadcast an arbitrary text frame to every client.
    pub fn push_raw(&self, text: &str) {
        self.state.broadcast(text.to_owned());
    }

    /// Close every client connection while keeping the listener up.
    pub fn disconnect_all(&self) {
        let _ = self.state.outbound.send(Outbound::Disconnect);
    }

    /// Trigger graceful shutdown and await completion.
    pub async fn shutdown(self) -> anyhow::Result<()> {
        self.disconnect_all();
        let _ = self.shutdown.send(true);
        match self.task.await {
            Ok(()) => Ok(()),
            Err(err) => Err(anyhow::anyhow!(err)),
        }
    }
}

async fn upgrade_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<DeviceState>>,
) -> axum::response::Response {
    ws.on_upgrade(|socket| client_loop(socket, state))
}

async fn client_loop(mut socket: WebSocket, state: Arc<DeviceState>) {
    let mut subscription = state.outbound.subscribe();
    let client = state.accepted.fetch_add(1, Ordering::SeqCst) + 1;
    info!(client, "fake motion controller client connected");

    loop {
        tokio::select! {
            outbound = subscription.recv() => {
                let frame = match outbound {
                    Ok(Outbound::Frame(frame)) => frame,
                    Ok(Outbound::Disconnect) => {
                        let _ = socket.send(Message::Close(None)).await;
                        break;
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "fake device client lagged behind; dropping frames");
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                };
                if socket.send(Message::Text(frame)).await.is_err() {
                    break;
                }
            }
            message = socket.recv() => {
                let Some(Ok(message)) = message else {
                    break;
                };

                match message {
                    Message::Text(text) => match serde_json::from_str::<Command>(&text) {
                        Ok(command) => {
                            state.received.lock().push(command.clone());
                            let frames = state.model.lock().handle(&command);
                            for frame in frames {
                                state.broadcast(frame);
                            }
                        }
                        Err(err) => {
                            warn!(error = %err, payload = %text, "fake device ignoring unknown command");
                        }
                    },
                    Message::Binary(_) => debug!("fake device ignoring binary frame"),
                    Message::Ping(payload) => {
                        if socket.send(Message::Pong(payload)).await.is_err() {
                            break;
                        }
                    }
                    Message::Pong(_) => {}
                    Message::Close(_) => break,
                }
            }
        }
    }
    info!(client, "fake motion controller client disconnected");
}
