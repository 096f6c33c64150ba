//! Runtime for executing dialogue sessions
//!
//! One session = one machine instance, owned by one background task.
//! Sessions are created explicitly through [`spawn_session`]; there is no
//! process-wide instance.

mod console;
mod executor;
pub mod traits;

#[cfg(test)]
pub mod testing;

pub use console::{ConsoleBridge, LineSource};
pub(crate) use executor::DialogueRuntime;
pub use traits::*;

use crate::grammar::Grammar;
use crate::state_machine::{Booking, DialogState, DialogueMachine, Event, SessionContext};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Read-only view of a session after an event was processed
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub session_id: String,
    pub state: DialogState,
    /// Dotted state path, e.g. `Query_day.Ask`
    pub path: String,
    /// Short UI label for the active leaf state
    pub label: &'static str,
    pub context: SessionContext,
    pub at: DateTime<Utc>,
}

impl Snapshot {
    #[must_use]
    pub fn capture(session_id: &str, machine: &DialogueMachine) -> Self {
        let state = *machine.state();
        Self {
            session_id: session_id.to_string(),
            state,
            path: state.path(),
            label: state.label(),
            context: machine.context().clone(),
            at: Utc::now(),
        }
    }
}

/// Events published to session observers
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// State and context after an accepted event
    Snapshot(Snapshot),
    /// A confirmed booking was committed
    BookingCommitted { booking: Booking },
    /// A speech command failed; the dialogue carries on
    Error { message: String },
}

/// The session's runtime task has stopped
#[derive(Debug, Error)]
#[error("dialogue session {0} has stopped")]
pub struct SessionClosed(pub String);

/// Handle to interact with a running session
pub struct SessionHandle {
    pub session_id: String,
    event_tx: mpsc::Sender<Event>,
    broadcast_tx: broadcast::Sender<SessionEvent>,
    snapshot_rx: watch::Receiver<Snapshot>,
    shutdown: CancellationToken,
    task: JoinHandle<()>,
}

impl SessionHandle {
    /// Send the start trigger. Ignored unless the session is waiting to start
    /// or has finished a booking.
    ///
    /// # Errors
    ///
    /// Returns [`SessionClosed`] if the runtime task has already stopped.
    pub async fn start(&self) -> Result<(), SessionClosed> {
        self.send(Event::Start).await
    }

    /// Queue an event for the runtime. Bridge completions arrive through
    /// the executor; callers outside the crate only get [`Self::start`].
    pub(crate) async fn send(&self, event: Event) -> Result<(), SessionClosed> {
        self.event_tx
            .send(event)
            .await
            .map_err(|_| SessionClosed(self.session_id.clone()))
    }

    /// Subscribe to snapshots, commits and errors
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.broadcast_tx.subscribe()
    }

    /// Watch the latest snapshot
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<Snapshot> {
        self.snapshot_rx.clone()
    }

    /// The most recent snapshot
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        self.snapshot_rx.borrow().clone()
    }

    /// Stop the session, discarding its context
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the runtime task to stop
    pub async fn join(self) {
        if let Err(e) = self.task.await {
            tracing::error!(session_id = %self.session_id, error = %e, "Dialogue runtime panicked");
        }
    }
}

/// Create a dialogue session and start its runtime in the background
#[must_use]
pub fn spawn_session<B>(grammar: Arc<Grammar>, bridge: B) -> SessionHandle
where
    B: SpeechBridge + 'static,
{
    let session_id = uuid::Uuid::new_v4().to_string();
    let machine = DialogueMachine::new(grammar);

    let (event_tx, event_rx) = mpsc::channel(32);
    let (broadcast_tx, _) = broadcast::channel(128);
    let (snapshot_tx, snapshot_rx) = watch::channel(Snapshot::capture(&session_id, &machine));
    let shutdown = CancellationToken::new();

    let runtime = DialogueRuntime::new(
        session_id.clone(),
        machine,
        Arc::new(bridge),
        event_rx,
        event_tx.clone(),
        broadcast_tx.clone(),
        snapshot_tx,
        shutdown.clone(),
    );

    let task = tokio::spawn(runtime.run());
    tracing::info!(session_id = %session_id, "Dialogue session spawned");

    SessionHandle {
        session_id,
        event_tx,
        broadcast_tx,
        snapshot_rx,
        shutdown,
        task,
    }
}
