//! Dialogue runtime executor

use super::traits::{BridgeError, ListenOutcome, SpeechBridge};
use super::{SessionEvent, Snapshot};
use crate::state_machine::{DialogueMachine, Effect, Event, Outcome};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, watch};
use tokio_util::sync::CancellationToken;

/// Drives one dialogue machine against a speech bridge.
///
/// Events are processed strictly one at a time. Bridge commands run as
/// background tasks that post their completion events back to the queue.
pub struct DialogueRuntime<B>
where
    B: SpeechBridge + 'static,
{
    session_id: String,
    machine: DialogueMachine,
    bridge: Arc<B>,
    event_rx: mpsc::Receiver<Event>,
    event_tx: mpsc::Sender<Event>,
    broadcast_tx: broadcast::Sender<SessionEvent>,
    snapshot_tx: watch::Sender<Snapshot>,
    shutdown: CancellationToken,
}

impl<B> DialogueRuntime<B>
where
    B: SpeechBridge + 'static,
{
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn new(
        session_id: String,
        machine: DialogueMachine,
        bridge: Arc<B>,
        event_rx: mpsc::Receiver<Event>,
        event_tx: mpsc::Sender<Event>,
        broadcast_tx: broadcast::Sender<SessionEvent>,
        snapshot_tx: watch::Sender<Snapshot>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            session_id,
            machine,
            bridge,
            event_rx,
            event_tx,
            broadcast_tx,
            snapshot_tx,
            shutdown,
        }
    }

    pub async fn run(mut self) {
        tracing::info!(session_id = %self.session_id, "Starting dialogue runtime");

        self.publish_snapshot();
        for effect in self.machine.boot() {
            self.execute_effect(effect);
        }

        loop {
            tokio::select! {
                biased;

                () = self.shutdown.cancelled() => break,

                event = self.event_rx.recv() => match event {
                    Some(event) => self.process_event(event),
                    None => break,
                },
            }
        }

        // Stop any bridge call still in flight
        self.shutdown.cancel();
        tracing::info!(session_id = %self.session_id, "Dialogue runtime stopped");
    }

    fn process_event(&mut self, event: Event) {
        let kind = event.kind();
        match self.machine.send(event) {
            Outcome::Ignored(e) => {
                tracing::debug!(session_id = %self.session_id, reason = %e, "Ignoring event");
            }
            Outcome::Moved { from, effects } => {
                let to = *self.machine.state();
                if from == to {
                    tracing::debug!(
                        session_id = %self.session_id,
                        state = %to,
                        event = %kind,
                        "Context updated"
                    );
                } else {
                    tracing::info!(
                        session_id = %self.session_id,
                        from = %from,
                        to = %to,
                        event = %kind,
                        "State transition"
                    );
                }

                self.publish_snapshot();
                for effect in effects {
                    self.execute_effect(effect);
                }
            }
        }
    }

    fn publish_snapshot(&self) {
        let snapshot = Snapshot::capture(&self.session_id, &self.machine);
        self.snapshot_tx.send_replace(snapshot.clone());
        let _ = self.broadcast_tx.send(SessionEvent::Snapshot(snapshot));
    }

    /// Execute an effect. Bridge commands are spawned; their completion
    /// arrives later as events on the queue.
    fn execute_effect(&self, effect: Effect) {
        match effect {
            Effect::Prepare => {
                let bridge = self.bridge.clone();
                // A failed prepare leaves the machine waiting in Prepare
                self.spawn_command("prepare", vec![], async move {
                    bridge.prepare().await.map(|()| vec![Event::Ready])
                });
            }

            Effect::Speak { utterance } => {
                let bridge = self.bridge.clone();
                self.spawn_command("speak", vec![Event::SpeakComplete], async move {
                    bridge.speak(&utterance).await.map(|()| vec![Event::SpeakComplete])
                });
            }

            Effect::Listen => {
                let bridge = self.bridge.clone();
                // A failed listen turn counts as nothing heard
                let fallback = vec![Event::NoInput, Event::ListenComplete];
                self.spawn_command("listen", fallback, async move {
                    let heard = match bridge.listen().await? {
                        ListenOutcome::Recognised(hypotheses) => Event::Recognised { hypotheses },
                        ListenOutcome::NoInput => Event::NoInput,
                    };
                    Ok(vec![heard, Event::ListenComplete])
                });
            }

            Effect::CommitBooking { booking } => {
                tracing::info!(
                    session_id = %self.session_id,
                    person = %booking.person,
                    day = %booking.day,
                    time = booking.time.as_deref().unwrap_or("whole day"),
                    "Booking committed"
                );
                let _ = self
                    .broadcast_tx
                    .send(SessionEvent::BookingCommitted { booking });
            }
        }
    }

    /// Run a bridge command in the background and queue the events it yields.
    /// On a recoverable failure the error is published and `fallback` is
    /// queued instead.
    fn spawn_command<F>(&self, command: &'static str, fallback: Vec<Event>, call: F)
    where
        F: std::future::Future<Output = Result<Vec<Event>, BridgeError>> + Send + 'static,
    {
        let event_tx = self.event_tx.clone();
        let broadcast_tx = self.broadcast_tx.clone();
        let shutdown = self.shutdown.clone();
        let session_id = self.session_id.clone();

        tokio::spawn(async move {
            let result = tokio::select! {
                biased;

                () = shutdown.cancelled() => return,
                result = call => result,
            };

            let events = match result {
                Ok(events) => events,
                Err(BridgeError::Closed) => {
                    tracing::info!(session_id = %session_id, command, "Speech input closed, ending session");
                    shutdown.cancel();
                    return;
                }
                Err(e) => {
                    tracing::error!(session_id = %session_id, command, error = %e, "Speech command failed");
                    let _ = broadcast_tx.send(SessionEvent::Error {
                        message: format!("{command}: {e}"),
                    });
                    fallback
                }
            };

            for event in events {
                if event_tx.send(event).await.is_err() {
                    return;
                }
            }
        });
    }
}
