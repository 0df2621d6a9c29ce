use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use castty_core::{ReplayBuffer, ReplayEntry};
use castty_protocol::{BufferInfo, Event, EventKind, OutputEvent, ServerMessage, SessionMetadata};
use tokio::sync::{broadcast, oneshot, Notify};
use tracing::{info, warn};

/// Default bound on the recorder→hub handoff queue. Large enough that a
/// momentarily slow drain task never backs up the recorder's poll loop.
const DEFAULT_QUEUE_CAPACITY: usize = 4096;
/// Per-viewer broadcast lag tolerance before a connection is considered dead.
const VIEWER_LAG_TOLERANCE: usize = 256;

enum HubCommand {
    Publish(Event),
    Attach(oneshot::Sender<AttachResponse>),
}

pub struct AttachResponse {
    pub sync: ServerMessage,
    pub receiver: broadcast::Receiver<ServerMessage>,
}

struct HubState {
    queue: Mutex<VecDeque<HubCommand>>,
    notify: Notify,
    capacity: usize,
    replay: Mutex<ReplayBuffer>,
    tx: broadcast::Sender<ServerMessage>,
    session_metadata: SessionMetadata,
    terminal_size: Mutex<(u16, u16)>,
    last_event_time: Mutex<f64>,
}

/// Handle the recorder holds to push events without ever blocking on
/// viewer delivery. Cloning is cheap; all clones share one queue.
#[derive(Clone)]
pub struct HubHandle {
    state: Arc<HubState>,
}

impl HubHandle {
    /// Enqueue an event for the drain task. Never blocks. When the queue is
    /// full, the oldest `o`/`e` entry is dropped and a `broadcast_dropped`
    /// marker is queued in its place so viewers can observe the gap.
    pub fn publish(&self, event: Event) {
        let mut q = self.state.queue.lock().unwrap();
        if q.len() >= self.state.capacity {
            let dropped = q.iter().position(|cmd| {
                matches!(
                    cmd,
                    HubCommand::Publish(e) if matches!(e.kind, EventKind::Output | EventKind::Error)
                )
            });
            match dropped {
                Some(idx) => {
                    q.remove(idx);
                    warn!(event = "hub.queue_overflow_dropped_event");
                    q.push_back(HubCommand::Publish(Event::new(
                        event.t,
                        EventKind::Marker,
                        "broadcast_dropped".to_string(),
                    )));
                }
                None => {
                    // Nothing droppable (queue is entirely i/r/m); best effort,
                    // push past the nominal bound rather than lose a control event.
                    warn!(event = "hub.queue_overflow_no_droppable_event");
                }
            }
        }
        q.push_back(HubCommand::Publish(event));
        self.state.notify.notify_one();
    }

    pub fn resize(&self, rows: u16, cols: u16) {
        *self.state.terminal_size.lock().unwrap() = (rows, cols);
    }

    /// Register a new viewer. The returned future resolves once the drain
    /// task has atomically taken a replay snapshot and subscribed the
    /// viewer to live events, so the viewer sees every event exactly once.
    pub async fn attach(&self) -> Option<AttachResponse> {
        let (resp_tx, resp_rx) = oneshot::channel();
        {
            let mut q = self.state.queue.lock().unwrap();
            q.push_back(HubCommand::Attach(resp_tx));
            self.state.notify.notify_one();
        }
        resp_rx.await.ok()
    }

    pub fn viewer_count(&self) -> usize {
        self.state.tx.receiver_count()
    }
}

/// Runs the hub's drain task to completion. Spawn this once on a dedicated
/// task; it returns when the handle side (and every clone) is dropped.
async fn run_drain_loop(state: Arc<HubState>) {
    loop {
        let cmd = {
            let mut q = state.queue.lock().unwrap();
            q.pop_front()
        };
        let cmd = match cmd {
            Some(cmd) => cmd,
            None => {
                state.notify.notified().await;
                continue;
            }
        };
        match cmd {
            HubCommand::Publish(event) => handle_publish(&state, event),
            HubCommand::Attach(resp) => handle_attach(&state, resp),
        }
    }
}

fn handle_publish(state: &HubState, event: Event) {
    *state.last_event_time.lock().unwrap() = event.t;

    let msg = match event.kind {
        EventKind::Output | EventKind::Error => {
            let mut replay = state.replay.lock().unwrap();
            replay.push(ReplayEntry {
                wall_time: event.t,
                kind: event.kind,
                payload: event.payload.clone(),
            });
            Some(ServerMessage::TerminalData {
                timestamp: event.t,
                event_type: event.kind.as_char().to_string(),
                data: event.payload,
            })
        }
        // The only marker the push protocol surfaces to viewers; others
        // (e.g. broadcast_dropped) are recorder/playback-internal bookkeeping.
        EventKind::Marker if event.payload == "session_ended" => {
            Some(ServerMessage::SessionEvent { event: event.payload })
        }
        EventKind::Marker | EventKind::Input | EventKind::Resize => None,
    };

    // Err means no viewers are subscribed right now; that's routine.
    if let Some(msg) = msg {
        let _ = state.tx.send(msg);
    }
}

fn handle_attach(state: &HubState, resp: oneshot::Sender<AttachResponse>) {
    let receiver = state.tx.subscribe();
    let sync_time = *state.last_event_time.lock().unwrap();
    let (recent, buffer_info) = {
        let replay = state.replay.lock().unwrap();
        replay.snapshot(sync_time)
    };
    let (rows, cols) = *state.terminal_size.lock().unwrap();
    info!(event = "hub.viewer_attached", showing = buffer_info.showing_recent);
    let sync = ServerMessage::TerminalSync {
        session_metadata: state.session_metadata.clone(),
        terminal_size: castty_protocol::TerminalSize {
            width: cols as u32,
            height: rows as u32,
        },
        recent_output: recent.iter().map(OutputEvent::from).collect(),
        buffer_info,
    };
    let _ = resp.send(AttachResponse { sync, receiver });
}

/// Builds a hub and spawns its drain task on the given Tokio runtime
/// context. Returns a cheaply-clonable handle for the recorder side.
pub fn spawn(
    session_metadata: SessionMetadata,
    terminal_size: (u16, u16),
    replay_capacity: usize,
) -> HubHandle {
    let (tx, _rx) = broadcast::channel(VIEWER_LAG_TOLERANCE);
    let state = Arc::new(HubState {
        queue: Mutex::new(VecDeque::new()),
        notify: Notify::new(),
        capacity: DEFAULT_QUEUE_CAPACITY,
        replay: Mutex::new(ReplayBuffer::new(replay_capacity)),
        tx,
        session_metadata,
        terminal_size: Mutex::new(terminal_size),
        last_event_time: Mutex::new(0.0),
    });
    tokio::spawn(run_drain_loop(state.clone()));
    HubHandle { state }
}

#[cfg(test)]
mod tests {
    use super::*;
    use castty_protocol::SessionId;

    fn metadata() -> SessionMetadata {
        SessionMetadata {
            session_id: SessionId::new("test-session"),
            start_wall_time: 0,
            shell_command: "/bin/sh".into(),
            recording_path: "out.cast".into(),
        }
    }

    #[tokio::test]
    async fn attach_receives_snapshot_then_live_events() {
        let hub = spawn(metadata(), (24, 80), 100);
        hub.publish(Event::new(1.0, EventKind::Output, "before".into()));
        // Give the drain task a turn to process the publish before attaching.
        tokio::task::yield_now().await;
        tokio::task::yield_now().await;

        let attach = hub.attach().await.expect("attach");
        match &attach.sync {
            ServerMessage::TerminalSync { recent_output, .. } => {
                assert_eq!(recent_output.len(), 1);
                assert_eq!(recent_output[0].data, "before");
            }
            _ => panic!("expected terminal_sync"),
        }

        hub.publish(Event::new(2.0, EventKind::Output, "after".into()));
        let mut rx = attach.receiver;
        let msg = rx.recv().await.expect("live event");
        match msg {
            ServerMessage::TerminalData { data, .. } => assert_eq!(data, "after"),
            _ => panic!("expected terminal_data"),
        }
    }

    #[tokio::test]
    async fn viewer_count_reflects_active_subscriptions() {
        let hub = spawn(metadata(), (24, 80), 10);
        assert_eq!(hub.viewer_count(), 0);
        let attach = hub.attach().await.expect("attach");
        assert_eq!(hub.viewer_count(), 1);
        drop(attach.receiver);
    }
}
