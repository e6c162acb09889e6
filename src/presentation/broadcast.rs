// Websocket broadcast - connection registry, upgrade handler, update loop
use crate::application::snapshot_service::SnapshotService;
use crate::domain::snapshot::PushMessage;
use crate::presentation::app_state::AppState;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// Registry of live push connections, keyed by id so removal is a single
/// keyed delete. Each entry holds an unbounded sender feeding that client's
/// socket task; the queue has no bound or drop policy, so a slow consumer
/// can grow it without limit (known production risk, deliberately unbounded).
pub struct BroadcastHub {
    connections: Mutex<HashMap<u64, mpsc::UnboundedSender<String>>>,
    next_id: AtomicU64,
    broadcasts_sent: AtomicU64,
}

impl BroadcastHub {
    pub fn new() -> Self {
        Self {
            connections: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            broadcasts_sent: AtomicU64::new(0),
        }
    }

    /// Add a connection with its `initial` payload already queued. Queueing
    /// happens under the registry lock, so no `update` broadcast can slip in
    /// ahead of the initial message.
    pub fn register(&self, initial: String) -> (u64, mpsc::UnboundedReceiver<String>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();
        let mut connections = self.connections.lock().unwrap_or_else(|e| e.into_inner());
        let _ = tx.send(initial);
        connections.insert(id, tx);
        (id, rx)
    }

    pub fn unregister(&self, id: u64) {
        let mut connections = self.connections.lock().unwrap_or_else(|e| e.into_inner());
        connections.remove(&id);
    }

    /// Fan one payload out to every live connection, in registry order.
    /// Fire-and-forget: a failed send just evicts that connection and the
    /// loop continues. Returns the number of queues reached.
    pub fn broadcast(&self, payload: &str) -> usize {
        let mut connections = self.connections.lock().unwrap_or_else(|e| e.into_inner());
        let mut dead = Vec::new();
        let mut delivered = 0;
        for (id, tx) in connections.iter() {
            if tx.send(payload.to_string()).is_err() {
                dead.push(*id);
            } else {
                delivered += 1;
            }
        }
        for id in dead {
            connections.remove(&id);
        }
        if delivered > 0 {
            self.broadcasts_sent.fetch_add(1, Ordering::Relaxed);
        }
        delivered
    }

    pub fn connection_count(&self) -> usize {
        self.connections.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn broadcasts_sent(&self) -> u64 {
        self.broadcasts_sent.load(Ordering::Relaxed)
    }
}

impl Default for BroadcastHub {
    fn default() -> Self {
        Self::new()
    }
}

/// Waits on the generator's data-ready signal, coalesces bursts, and pushes
/// one `update` snapshot to every live connection. Broadcast only runs after
/// the triggering write has committed, since the signal is sent post-commit.
pub async fn run_update_loop(
    hub: Arc<BroadcastHub>,
    snapshots: SnapshotService,
    mut data_ready: mpsc::Receiver<()>,
) {
    while data_ready.recv().await.is_some() {
        while data_ready.try_recv().is_ok() {}

        if hub.connection_count() == 0 {
            continue;
        }

        let snapshot = match snapshots.snapshot() {
            Ok(s) => s,
            Err(e) => {
                tracing::error!("snapshot for broadcast failed: {e}");
                continue;
            }
        };
        match serde_json::to_string(&PushMessage::update(snapshot)) {
            Ok(payload) => {
                hub.broadcast(&payload);
            }
            Err(e) => tracing::error!("failed to encode update: {e}"),
        }
    }
}

/// Websocket upgrade for the push transport.
pub async fn ws_dashboard(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    // New subscribers get the current state immediately, never waiting for
    // the next tick.
    let snapshot = match state.snapshots.snapshot() {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("snapshot for new connection failed: {e}");
            return;
        }
    };
    let initial = match serde_json::to_string(&PushMessage::initial(snapshot)) {
        Ok(payload) => payload,
        Err(e) => {
            tracing::error!("failed to encode initial message: {e}");
            return;
        }
    };

    let (id, mut rx) = state.hub.register(initial);
    tracing::debug!("push connection {id} opened");

    let (mut sink, mut stream) = socket.split();
    loop {
        tokio::select! {
            queued = rx.recv() => match queued {
                Some(payload) => {
                    if sink.send(Message::Text(payload)).await.is_err() {
                        break;
                    }
                }
                None => break,
            },
            incoming = stream.next() => match incoming {
                // Clients do not speak; anything but a live frame ends the session
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }

    state.hub.unregister(id);
    tracing::debug!("push connection {id} closed");
}
