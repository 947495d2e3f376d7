// Stream session - one WebSocket connection to the ground station
//
// The session task connects, pumps frames into the hub, and on any close or
// error waits a fixed delay before connecting again. Cancellation wins over
// every suspension point (connect, read, delay), so `close` takes effect even
// while a connection attempt is in flight.

use crate::config::{ClientConfig, DEFAULT_RECONNECT_DELAY};
use crate::hub::SnapshotHub;
use crate::types::{ConnectionStatus, Snapshot, TelemetryError, TelemetryResult};
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::net::TcpStream;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// How a single connection ended
enum PumpExit {
    /// Server closed or end of stream
    Closed,
    /// Transport or protocol error
    Failed(TelemetryError),
    /// The owner closed the session
    Cancelled,
}

/// Self-reconnecting telemetry stream feeding a [`SnapshotHub`]
pub struct StreamSession {
    url: String,
    hub: SnapshotHub,
    status: watch::Receiver<ConnectionStatus>,
    attempts: Arc<AtomicU64>,
    cancel_token: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl StreamSession {
    /// Start connecting to `url` immediately, retrying every `reconnect_delay`
    ///
    /// Must be called from within a Tokio runtime.
    pub fn connect(url: impl Into<String>, reconnect_delay: Duration, hub: SnapshotHub) -> Self {
        let url = url.into();
        let (status_tx, status) = watch::channel(ConnectionStatus::Connecting);
        let attempts = Arc::new(AtomicU64::new(0));
        let cancel_token = CancellationToken::new();

        let task = tokio::spawn(run_session(
            url.clone(),
            reconnect_delay,
            hub.clone(),
            status_tx,
            Arc::clone(&attempts),
            cancel_token.clone(),
        ));

        Self {
            url,
            hub,
            status,
            attempts,
            cancel_token,
            task: Mutex::new(Some(task)),
        }
    }

    /// Connect with the default reconnect delay
    pub fn connect_default(url: impl Into<String>, hub: SnapshotHub) -> Self {
        Self::connect(url, DEFAULT_RECONNECT_DELAY, hub)
    }

    /// Connect to the stream endpoint derived from `config`
    pub fn from_config(config: &ClientConfig, hub: SnapshotHub) -> TelemetryResult<Self> {
        let url = config
            .websocket_url()
            .map_err(|e| TelemetryError::InvalidConfig(e.to_string()))?;
        Ok(Self::connect(url, config.reconnect_delay, hub))
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn hub(&self) -> &SnapshotHub {
        &self.hub
    }

    /// Current connection status
    pub fn status(&self) -> ConnectionStatus {
        *self.status.borrow()
    }

    /// Receiver that wakes on every status transition
    pub fn watch_status(&self) -> watch::Receiver<ConnectionStatus> {
        self.status.clone()
    }

    /// Number of connection attempts started so far
    pub fn connect_attempts(&self) -> u64 {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.cancel_token.is_cancelled()
    }

    /// Close the connection and cancel any pending reconnect. Repeated calls are no-ops.
    pub fn close(&self) {
        if self.cancel_token.is_cancelled() {
            return;
        }

        info!("Closing telemetry stream: {}", self.url);
        self.cancel_token.cancel();
    }

    /// Close and wait for the session task to exit
    pub async fn shutdown(&self) {
        self.close();
        let task = self.task.lock().take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                warn!("Stream session task failed: {}", e);
            }
        }
    }
}

impl Drop for StreamSession {
    fn drop(&mut self) {
        self.cancel_token.cancel();
    }
}

async fn run_session(
    url: String,
    reconnect_delay: Duration,
    hub: SnapshotHub,
    status_tx: watch::Sender<ConnectionStatus>,
    attempts: Arc<AtomicU64>,
    cancel_token: CancellationToken,
) {
    loop {
        // A close that raced the end of the reconnect delay
        if cancel_token.is_cancelled() {
            break;
        }

        set_status(&status_tx, ConnectionStatus::Connecting);
        let attempt = attempts.fetch_add(1, Ordering::SeqCst) + 1;
        debug!("Connecting to telemetry stream: {} (attempt {})", url, attempt);

        let connected = tokio::select! {
            biased;

            _ = cancel_token.cancelled() => break,

            result = open(&url) => result,
        };

        match connected {
            Ok(ws_stream) => {
                info!("Telemetry stream connected: {}", url);
                set_status(&status_tx, ConnectionStatus::Connected);

                match pump(ws_stream, &hub, &cancel_token).await {
                    PumpExit::Cancelled => break,
                    PumpExit::Failed(e) => warn!("{}", e),
                    PumpExit::Closed => {}
                }
                info!("Telemetry stream disconnected, reconnecting in {:?}", reconnect_delay);
            }
            Err(e) => {
                warn!("Telemetry stream connection failed: {}", e);
            }
        }

        hub.mark_no_data();
        set_status(&status_tx, ConnectionStatus::Disconnected);

        tokio::select! {
            biased;

            _ = cancel_token.cancelled() => break,

            _ = tokio::time::sleep(reconnect_delay) => {}
        }
    }

    set_status(&status_tx, ConnectionStatus::Disconnected);
    debug!("Stream session task for {} exited", url);
}

/// Open the WebSocket; refused or failed handshakes become `Connection` errors
async fn open(url: &str) -> TelemetryResult<WsStream> {
    let (ws_stream, _) = connect_async(url)
        .await
        .map_err(|e| TelemetryError::Connection(format!("{}: {}", url, e)))?;
    Ok(ws_stream)
}

async fn pump(ws_stream: WsStream, hub: &SnapshotHub, cancel_token: &CancellationToken) -> PumpExit {
    let (mut write, mut read) = ws_stream.split();

    loop {
        let message = tokio::select! {
            biased;

            _ = cancel_token.cancelled() => {
                if let Err(e) = write.send(Message::Close(None)).await {
                    debug!("Close frame not sent: {}", e);
                }
                return PumpExit::Cancelled;
            }

            message = read.next() => message,
        };

        match message {
            Some(Ok(Message::Text(text))) => publish_frame(hub, Snapshot::from_json(text.as_str())),
            Some(Ok(Message::Binary(data))) => publish_frame(hub, Snapshot::from_slice(&data)),
            Some(Ok(Message::Close(frame))) => {
                debug!("Telemetry stream closed by server: {:?}", frame);
                return PumpExit::Closed;
            }
            // Ping/Pong are answered by tungstenite
            Some(Ok(_)) => {}
            Some(Err(e)) => return PumpExit::Failed(TelemetryError::WebSocket(e.to_string())),
            None => return PumpExit::Closed,
        }
    }
}

fn publish_frame(hub: &SnapshotHub, parsed: TelemetryResult<Snapshot>) {
    match parsed {
        Ok(snapshot) => hub.publish(snapshot),
        // Malformed frames never reach the hub and never end the session
        Err(e) => debug!("Dropping malformed telemetry frame: {}", e),
    }
}

fn set_status(status_tx: &watch::Sender<ConnectionStatus>, status: ConnectionStatus) {
    status_tx.send_if_modified(|current| {
        if *current == status {
            return false;
        }
        debug!("Connection status: {} -> {}", current, status);
        *current = status;
        true
    });
}
