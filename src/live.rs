//! Live Channel Broadcaster
//!
//! Keeps the set of open subscriber connections and pushes every change
//! event to all of them. Delivery is at-most-once and best-effort: a failed
//! write drops that subscriber, with no retry and no buffering.
//!
//! The connection set is only touched through [`Broadcaster`]. Publishing
//! snapshots the set under the read lock and writes outside it, so a slow
//! subscriber never holds up registration or removal.

use crate::error::ApiError;
use crate::watch::{ChangeEvent, ChangeKind};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::ErrorKind;
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use tungstenite::{Message, WebSocket};

/// How long a connection's read loop holds the socket before letting a
/// pending publish through.
const READ_SLICE: Duration = Duration::from_millis(20);

/// Wire envelope pushed to subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveMessage {
    #[serde(rename = "type")]
    pub kind: String,
    pub payload: FileChangePayload,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileChangePayload {
    pub event: ChangeKind,
    pub path: String,
}

impl LiveMessage {
    pub fn file_change(event: &ChangeEvent) -> Self {
        Self {
            kind: "fileChange".to_string(),
            payload: FileChangePayload {
                event: event.kind,
                path: event.path.to_string_lossy().to_string(),
            },
        }
    }
}

/// One open subscriber connection.
pub trait Subscriber: Send + Sync {
    /// Write one text frame.
    fn send_text(&self, text: &str) -> Result<(), ApiError>;

    /// Block, discarding client payloads, until the peer disconnects or a
    /// read fails.
    fn drain_until_closed(&self);

    fn close(&self);
}

/// WebSocket subscriber over a plain TCP stream.
pub struct WsConnection {
    socket: Mutex<WebSocket<TcpStream>>,
    peer: String,
}

impl WsConnection {
    /// Perform the server side of the upgrade handshake.
    pub fn accept(stream: TcpStream) -> Result<Self, ApiError> {
        let peer = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string());
        let socket = tungstenite::accept(stream)
            .map_err(|e| ApiError::LiveError(format!("Handshake with {} failed: {}", peer, e)))?;
        socket.get_ref().set_read_timeout(Some(READ_SLICE))?;
        Ok(Self {
            socket: Mutex::new(socket),
            peer,
        })
    }

    pub fn peer(&self) -> &str {
        &self.peer
    }
}

impl Subscriber for WsConnection {
    fn send_text(&self, text: &str) -> Result<(), ApiError> {
        self.socket
            .lock()
            .send(Message::Text(text.to_string()))
            .map_err(|e| ApiError::LiveError(format!("Write to {} failed: {}", self.peer, e)))
    }

    fn drain_until_closed(&self) {
        loop {
            let result = self.socket.lock().read();
            match result {
                Ok(Message::Close(_)) => break,
                Ok(_) => {}
                Err(tungstenite::Error::Io(e))
                    if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) =>
                {
                    // Give publishers a turn at the socket.
                    std::thread::yield_now();
                }
                Err(e) => {
                    debug!(peer = %self.peer, error = %e, "Subscriber read ended");
                    break;
                }
            }
        }
    }

    fn close(&self) {
        let mut socket = self.socket.lock();
        if let Err(e) = socket.close(None) {
            debug!(peer = %self.peer, error = %e, "Close after disconnect");
        }
        // Flush the close frame; errors here mean the peer is already gone.
        let _ = socket.flush();
    }
}

/// Fan-out of change events to every registered subscriber.
#[derive(Default)]
pub struct Broadcaster {
    connections: RwLock<HashMap<u64, Arc<dyn Subscriber>>>,
    next_id: AtomicU64,
}

impl Broadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, connection: Arc<dyn Subscriber>) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.connections.write().insert(id, connection);
        debug!(id, "Subscriber registered");
        id
    }

    pub fn deregister(&self, id: u64) -> Option<Arc<dyn Subscriber>> {
        let removed = self.connections.write().remove(&id);
        if removed.is_some() {
            debug!(id, "Subscriber deregistered");
        }
        removed
    }

    pub fn connection_count(&self) -> usize {
        self.connections.read().len()
    }

    /// Own a connection from registration until disconnect.
    pub fn serve(&self, connection: Arc<dyn Subscriber>) {
        let id = self.register(Arc::clone(&connection));
        connection.drain_until_closed();
        self.deregister(id);
        connection.close();
    }

    /// Upgrade an inbound TCP stream and serve it on the calling thread.
    pub fn accept(&self, stream: TcpStream) -> Result<(), ApiError> {
        let connection = WsConnection::accept(stream)?;
        info!(peer = connection.peer(), "Live subscriber connected");
        self.serve(Arc::new(connection));
        Ok(())
    }

    /// Push one change to every subscriber. Returns how many writes succeeded.
    pub fn publish(&self, event: &ChangeEvent) -> usize {
        let text = match serde_json::to_string(&LiveMessage::file_change(event)) {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "Failed to serialize change event");
                return 0;
            }
        };

        let snapshot: Vec<(u64, Arc<dyn Subscriber>)> = self
            .connections
            .read()
            .iter()
            .map(|(id, connection)| (*id, Arc::clone(connection)))
            .collect();

        let mut delivered = 0;
        let mut failed = Vec::new();
        for (id, connection) in snapshot {
            match connection.send_text(&text) {
                Ok(()) => delivered += 1,
                Err(e) => {
                    debug!(id, error = %e, "Dropping subscriber after failed write");
                    failed.push(id);
                }
            }
        }

        for id in failed {
            if let Some(connection) = self.deregister(id) {
                connection.close();
            }
        }
        delivered
    }
}

/// Accept subscribers from `listener` until it fails, one thread per connection.
pub fn run_listener(broadcaster: Arc<Broadcaster>, listener: TcpListener) -> Result<(), ApiError> {
    if let Ok(addr) = listener.local_addr() {
        info!(addr = %addr, "Live channel listening");
    }
    for stream in listener.incoming() {
        let stream = match stream {
            Ok(stream) => stream,
            Err(e) => {
                warn!(error = %e, "Failed to accept connection");
                continue;
            }
        };
        let broadcaster = Arc::clone(&broadcaster);
        std::thread::Builder::new()
            .name("docforest-live".to_string())
            .spawn(move || {
                if let Err(e) = broadcaster.accept(stream) {
                    warn!(error = %e, "Live subscriber rejected");
                }
            })?;
    }
    Ok(())
}
