// Client sync manager - dual-transport supervisor
//
// Owns the push state machine and the poll loop, and guarantees exactly one
// active transport. Push socket and retry timer live as generation-tagged
// tasks: entering a new state aborts the previous state's task and bumps the
// generation, so a straggling completion from an old socket or timer can
// never drive the machine.

pub mod poll;
pub mod push;

use crate::client::poll::{run_poll_loop, SnapshotCallback, SnapshotFetcher};
use crate::client::push::{PushEffect, PushEvent, PushState, PushStateMachine};
use crate::domain::snapshot::{DashboardSnapshot, PushMessage};
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportMode {
    Push,
    Poll,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
    Failed,
}

/// Coarse connection signal exposed to the caller; individual send or fetch
/// failures never surface here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncStatus {
    pub mode: TransportMode,
    pub connection: ConnectionStatus,
}

#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub push_url: String,
    /// Fixed retry delay between reconnection attempts. Deliberately not
    /// exponential: observable timing matches a constant cadence.
    pub reconnect_interval: Duration,
    pub max_reconnect_attempts: u32,
    pub poll_interval: Duration,
}

impl SyncConfig {
    pub fn new(push_url: impl Into<String>) -> Self {
        Self {
            push_url: push_url.into(),
            reconnect_interval: Duration::from_secs(3),
            max_reconnect_attempts: 10,
            poll_interval: Duration::from_secs(5),
        }
    }
}

enum Command {
    Reconnect,
    SetMode(TransportMode),
    Shutdown,
}

struct SocketEvent {
    generation: u64,
    kind: SocketEventKind,
}

enum SocketEventKind {
    Opened,
    Closed,
    Snapshot(DashboardSnapshot),
    RetryTimer,
}

/// Handle to a running sync session. Dropping it shuts the session down.
pub struct SyncHandle {
    cmd_tx: mpsc::UnboundedSender<Command>,
    status_rx: watch::Receiver<SyncStatus>,
    task: Option<JoinHandle<()>>,
}

impl SyncHandle {
    /// Manual retry affordance: resets the attempt budget and returns to the
    /// push transport, stopping the poll loop if it was active.
    pub fn reconnect(&self) {
        let _ = self.cmd_tx.send(Command::Reconnect);
    }

    /// Force-select a transport. Stop-then-start: the deactivated transport
    /// is fully torn down before the other begins.
    pub fn set_mode(&self, mode: TransportMode) {
        let _ = self.cmd_tx.send(Command::SetMode(mode));
    }

    pub fn status(&self) -> SyncStatus {
        *self.status_rx.borrow()
    }

    /// Watch for status transitions (mode changes, reconnecting, failed).
    pub fn status_stream(&self) -> watch::Receiver<SyncStatus> {
        self.status_rx.clone()
    }

    pub async fn shutdown(mut self) {
        let _ = self.cmd_tx.send(Command::Shutdown);
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for SyncHandle {
    fn drop(&mut self) {
        let _ = self.cmd_tx.send(Command::Shutdown);
    }
}

pub struct SyncManager;

impl SyncManager {
    /// Start a sync session on the push transport. Snapshots from whichever
    /// transport is active arrive through `on_snapshot`; status transitions
    /// through the handle's watch channel.
    pub fn start(
        config: SyncConfig,
        fetcher: Arc<dyn SnapshotFetcher>,
        on_snapshot: SnapshotCallback,
    ) -> SyncHandle {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (status_tx, status_rx) = watch::channel(SyncStatus {
            mode: TransportMode::Push,
            connection: ConnectionStatus::Disconnected,
        });

        let supervisor = Supervisor {
            machine: PushStateMachine::new(config.max_reconnect_attempts),
            mode: TransportMode::Push,
            generation: 0,
            socket_task: None,
            timer_task: None,
            poll_task: None,
            event_tx,
            fetcher,
            on_snapshot,
            status_tx,
            config,
        };
        let task = tokio::spawn(supervisor.run(cmd_rx, event_rx));

        SyncHandle {
            cmd_tx,
            status_rx,
            task: Some(task),
        }
    }
}

struct Supervisor {
    config: SyncConfig,
    machine: PushStateMachine,
    mode: TransportMode,
    generation: u64,
    socket_task: Option<JoinHandle<()>>,
    timer_task: Option<JoinHandle<()>>,
    poll_task: Option<JoinHandle<()>>,
    event_tx: mpsc::UnboundedSender<SocketEvent>,
    fetcher: Arc<dyn SnapshotFetcher>,
    on_snapshot: SnapshotCallback,
    status_tx: watch::Sender<SyncStatus>,
}

impl Supervisor {
    async fn run(
        mut self,
        mut cmd_rx: mpsc::UnboundedReceiver<Command>,
        mut event_rx: mpsc::UnboundedReceiver<SocketEvent>,
    ) {
        let effects = self.machine.handle(PushEvent::Start);
        self.apply(effects);
        self.publish_status();

        loop {
            tokio::select! {
                cmd = cmd_rx.recv() => match cmd {
                    Some(Command::Reconnect) => self.handle_reconnect(),
                    Some(Command::SetMode(mode)) => self.switch_mode(mode),
                    Some(Command::Shutdown) | None => break,
                },
                Some(event) = event_rx.recv() => self.handle_event(event),
            }
        }

        // Teardown: nothing may reschedule after this point
        self.cancel_socket();
        self.cancel_timer();
        self.stop_poll();
    }

    fn handle_event(&mut self, event: SocketEvent) {
        if event.generation != self.generation {
            return;
        }
        match event.kind {
            SocketEventKind::Opened => {
                let effects = self.machine.handle(PushEvent::Opened);
                self.apply(effects);
                self.publish_status();
            }
            SocketEventKind::Closed => {
                self.socket_task = None;
                let effects = self
                    .machine
                    .handle(PushEvent::Closed { intentional: false });
                self.apply(effects);
                self.publish_status();
            }
            SocketEventKind::RetryTimer => {
                self.timer_task = None;
                let effects = self.machine.handle(PushEvent::RetryTimer);
                self.apply(effects);
                self.publish_status();
            }
            SocketEventKind::Snapshot(snapshot) => {
                if self.mode == TransportMode::Push {
                    (self.on_snapshot)(snapshot);
                }
            }
        }
    }

    fn handle_reconnect(&mut self) {
        if self.mode == TransportMode::Poll {
            self.stop_poll();
            self.mode = TransportMode::Push;
        }
        let effects = self.machine.reconnect();
        self.apply(effects);
        self.publish_status();
    }

    fn switch_mode(&mut self, target: TransportMode) {
        if target == self.mode {
            return;
        }
        match target {
            TransportMode::Poll => {
                let effects = self.machine.stop();
                self.apply(effects);
                self.mode = TransportMode::Poll;
                self.start_poll();
            }
            TransportMode::Push => {
                self.stop_poll();
                self.mode = TransportMode::Push;
                let effects = self.machine.reconnect();
                self.apply(effects);
            }
        }
        self.publish_status();
    }

    fn apply(&mut self, effects: Vec<PushEffect>) {
        for effect in effects {
            match effect {
                PushEffect::OpenSocket => {
                    self.cancel_timer();
                    self.spawn_socket();
                }
                PushEffect::ScheduleRetry => {
                    self.cancel_timer();
                    self.spawn_retry_timer();
                }
                PushEffect::CancelRetry => self.cancel_timer(),
                PushEffect::CloseSocket => self.cancel_socket(),
                PushEffect::NotifyConnected => {
                    tracing::debug!("push transport connected");
                }
                PushEffect::NotifyFailed => {
                    tracing::warn!("max reconnection attempts reached, falling back to polling");
                    self.mode = TransportMode::Poll;
                    self.start_poll();
                }
            }
        }
    }

    fn spawn_socket(&mut self) {
        self.cancel_socket();
        let generation = self.generation;
        let url = self.config.push_url.clone();
        let events = self.event_tx.clone();
        self.socket_task = Some(tokio::spawn(run_socket(url, generation, events)));
    }

    fn spawn_retry_timer(&mut self) {
        let generation = self.generation;
        let delay = self.config.reconnect_interval;
        let events = self.event_tx.clone();
        self.timer_task = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = events.send(SocketEvent {
                generation,
                kind: SocketEventKind::RetryTimer,
            });
        }));
    }

    fn cancel_socket(&mut self) {
        if let Some(task) = self.socket_task.take() {
            task.abort();
            self.generation += 1;
        }
    }

    fn cancel_timer(&mut self) {
        if let Some(task) = self.timer_task.take() {
            task.abort();
            self.generation += 1;
        }
    }

    fn start_poll(&mut self) {
        if self.poll_task.is_some() {
            return;
        }
        self.poll_task = Some(tokio::spawn(run_poll_loop(
            self.fetcher.clone(),
            self.config.poll_interval,
            self.on_snapshot.clone(),
        )));
    }

    fn stop_poll(&mut self) {
        if let Some(task) = self.poll_task.take() {
            task.abort();
        }
    }

    fn publish_status(&self) {
        let connection = match self.machine.state() {
            PushState::Disconnected => ConnectionStatus::Disconnected,
            PushState::Connecting if self.machine.attempts() > 0 => ConnectionStatus::Reconnecting,
            PushState::Connecting => ConnectionStatus::Connecting,
            PushState::Open => ConnectionStatus::Connected,
            PushState::ReconnectWait => ConnectionStatus::Reconnecting,
            PushState::Failed => ConnectionStatus::Failed,
        };
        let _ = self.status_tx.send(SyncStatus {
            mode: self.mode,
            connection,
        });
    }
}

async fn run_socket(url: String, generation: u64, events: mpsc::UnboundedSender<SocketEvent>) {
    match connect_async(&url).await {
        Ok((mut socket, _response)) => {
            if events
                .send(SocketEvent {
                    generation,
                    kind: SocketEventKind::Opened,
                })
                .is_err()
            {
                return;
            }
            while let Some(message) = socket.next().await {
                match message {
                    Ok(Message::Text(text)) => match serde_json::from_str::<PushMessage>(&text) {
                        Ok(push) => {
                            let _ = events.send(SocketEvent {
                                generation,
                                kind: SocketEventKind::Snapshot(push.data),
                            });
                        }
                        Err(e) => tracing::warn!("malformed push message: {e}"),
                    },
                    Ok(Message::Close(_)) | Err(_) => break,
                    Ok(_) => {}
                }
            }
        }
        Err(e) => {
            tracing::debug!("push connect failed: {e}");
        }
    }
    let _ = events.send(SocketEvent {
        generation,
        kind: SocketEventKind::Closed,
    });
}
