//! Mock speech bridge for testing
//!
//! Lets the runtime be driven end to end without audio hardware.

use super::traits::*;
use crate::state_machine::{Hypotheses, Hypothesis};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

// ============================================================================
// Mock Speech Bridge
// ============================================================================

/// Commands the runtime issued to the bridge
#[derive(Debug, Clone, PartialEq)]
pub enum BridgeCommand {
    Prepare,
    Speak(String),
    Listen,
}

/// Speech bridge that answers listen turns from a queue.
///
/// `prepare` and `speak` complete immediately. A listen with nothing queued
/// never completes, so the dialogue parks in its Ask state.
#[derive(Default)]
pub struct MockSpeechBridge {
    heard: Mutex<VecDeque<Result<ListenOutcome, BridgeError>>>,
    /// Record of all commands issued
    pub commands: Mutex<Vec<BridgeCommand>>,
}

impl MockSpeechBridge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a recognised utterance with full confidence
    pub fn queue_utterance(&self, utterance: &str) {
        let hypotheses = Hypotheses::single(Hypothesis::new(utterance, 1.0));
        self.heard
            .lock()
            .unwrap()
            .push_back(Ok(ListenOutcome::Recognised(hypotheses)));
    }

    /// Queue a silent listen turn
    pub fn queue_no_input(&self) {
        self.heard.lock().unwrap().push_back(Ok(ListenOutcome::NoInput));
    }

    /// Queue a failing listen turn
    pub fn queue_error(&self, error: BridgeError) {
        self.heard.lock().unwrap().push_back(Err(error));
    }

    pub fn recorded_commands(&self) -> Vec<BridgeCommand> {
        self.commands.lock().unwrap().clone()
    }

    /// Everything spoken so far, in order
    pub fn spoken(&self) -> Vec<String> {
        self.recorded_commands()
            .into_iter()
            .filter_map(|c| match c {
                BridgeCommand::Speak(text) => Some(text),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl SpeechBridge for MockSpeechBridge {
    async fn prepare(&self) -> Result<(), BridgeError> {
        self.commands.lock().unwrap().push(BridgeCommand::Prepare);
        Ok(())
    }

    async fn speak(&self, utterance: &str) -> Result<(), BridgeError> {
        self.commands
            .lock()
            .unwrap()
            .push(BridgeCommand::Speak(utterance.to_string()));
        Ok(())
    }

    async fn listen(&self) -> Result<ListenOutcome, BridgeError> {
        self.commands.lock().unwrap().push(BridgeCommand::Listen);
        let next = self.heard.lock().unwrap().pop_front();
        match next {
            Some(result) => result,
            None => std::future::pending().await,
        }
    }
}

// ============================================================================
// Runtime tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::Grammar;
    use crate::runtime::{spawn_session, SessionEvent, SessionHandle, Snapshot};
    use crate::state_machine::{Booking, DialogState, Phase, SlotKey, Step};
    use std::sync::Arc;
    use std::time::Duration;

    const WAIT: Duration = Duration::from_secs(5);

    fn ask(step: Step) -> DialogState {
        DialogState::Filling {
            step,
            phase: Phase::Ask,
        }
    }

    fn start_session() -> (SessionHandle, Arc<MockSpeechBridge>) {
        let bridge = Arc::new(MockSpeechBridge::new());
        let handle = spawn_session(Arc::new(Grammar::builtin()), bridge.clone());
        (handle, bridge)
    }

    /// Wait until the session reaches `state`
    async fn wait_for_state(handle: &SessionHandle, state: DialogState) -> Snapshot {
        let mut rx = handle.watch();
        let snapshot = tokio::time::timeout(WAIT, rx.wait_for(|s| s.state == state))
            .await
            .unwrap_or_else(|_| panic!("timed out waiting for {state}, at {}", handle.snapshot().path))
            .expect("session stopped")
            .clone();
        snapshot
    }

    /// Wait until the bridge has spoken something starting with `prefix`
    async fn wait_until_spoken(bridge: &MockSpeechBridge, prefix: &str) {
        tokio::time::timeout(WAIT, async {
            while !bridge.spoken().iter().any(|s| s.starts_with(prefix)) {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap_or_else(|_| panic!("never spoke {prefix:?}, spoke {:?}", bridge.spoken()));
    }

    async fn next_booking(rx: &mut tokio::sync::broadcast::Receiver<SessionEvent>) -> Booking {
        tokio::time::timeout(WAIT, async {
            loop {
                if let SessionEvent::BookingCommitted { booking } = rx.recv().await.unwrap() {
                    return booking;
                }
            }
        })
        .await
        .expect("no booking committed")
    }

    #[tokio::test]
    async fn test_boots_into_wait_to_start() {
        let (handle, bridge) = start_session();
        let snapshot = wait_for_state(&handle, DialogState::WaitToStart).await;

        assert_eq!(snapshot.label, "click to start");
        assert_eq!(snapshot.session_id, handle.session_id);
        assert_eq!(bridge.recorded_commands(), vec![BridgeCommand::Prepare]);
        handle.shutdown();
    }

    #[tokio::test]
    async fn test_full_booking_with_whole_day() {
        let (handle, bridge) = start_session();
        let mut events = handle.subscribe();
        for utterance in ["hi", "bora", "friday", "yes", "yes"] {
            bridge.queue_utterance(utterance);
        }

        wait_for_state(&handle, DialogState::WaitToStart).await;
        handle.start().await.unwrap();

        let booking = next_booking(&mut events).await;
        assert_eq!(booking.person, "Bora Kara");
        assert_eq!(booking.day, "Friday");
        assert!(booking.is_whole_day());

        let done = wait_for_state(&handle, DialogState::Done).await;
        assert_eq!(done.label, "done");
        assert_eq!(done.context.utterance(SlotKey::BookedPerson), Some("bora"));

        wait_until_spoken(&bridge, "Your appointment has been created!").await;
        let spoken = bridge.spoken();
        assert_eq!(spoken.first().map(String::as_str), Some("Let's create an appointment."));
        let confirmation = "Do you want me to create an appointment with bora on friday for the whole day?";
        assert!(spoken.iter().any(|s| s == confirmation), "{spoken:?}");
        handle.shutdown();
    }

    #[tokio::test]
    async fn test_booking_with_time() {
        let (handle, bridge) = start_session();
        let mut events = handle.subscribe();
        for utterance in ["hello", "vlad", "monday", "no", "9", "sure"] {
            bridge.queue_utterance(utterance);
        }

        wait_for_state(&handle, DialogState::WaitToStart).await;
        handle.start().await.unwrap();

        let booking = next_booking(&mut events).await;
        assert_eq!(booking.person, "Vladislav Maraev");
        assert_eq!(booking.day, "Monday");
        assert_eq!(booking.time.as_deref(), Some("09:00"));
        handle.shutdown();
    }

    #[tokio::test]
    async fn test_no_input_reprompts() {
        let (handle, bridge) = start_session();
        bridge.queue_utterance("hi");
        bridge.queue_no_input();

        wait_for_state(&handle, DialogState::WaitToStart).await;
        handle.start().await.unwrap();

        // After the reprompt the dialogue listens again for the same slot
        let snapshot = wait_for_state(&handle, ask(Step::QueryWho)).await;
        assert!(snapshot.context.slot(SlotKey::BookedPerson).is_none());

        wait_until_spoken(&bridge, "I can't hear you!").await;
        handle.shutdown();
    }

    #[tokio::test]
    async fn test_invalid_input_is_echoed() {
        let (handle, bridge) = start_session();
        bridge.queue_utterance("hi");
        bridge.queue_utterance("bora");
        bridge.queue_utterance("someday");

        wait_for_state(&handle, DialogState::WaitToStart).await;
        handle.start().await.unwrap();
        let snapshot = wait_for_state(&handle, ask(Step::QueryDay)).await;

        wait_until_spoken(&bridge, "You just said: someday, but this day is not in the list.").await;
        assert_eq!(snapshot.context.utterance(SlotKey::BookedPerson), Some("bora"));
        handle.shutdown();
    }

    #[tokio::test]
    async fn test_failed_listen_reports_and_recovers() {
        let (handle, bridge) = start_session();
        let mut events = handle.subscribe();
        bridge.queue_error(BridgeError::Failed("microphone unplugged".to_string()));
        bridge.queue_utterance("hi");

        wait_for_state(&handle, DialogState::WaitToStart).await;
        handle.start().await.unwrap();

        let message = tokio::time::timeout(WAIT, async {
            loop {
                if let SessionEvent::Error { message } = events.recv().await.unwrap() {
                    return message;
                }
            }
        })
        .await
        .expect("no error published");
        assert!(message.contains("microphone unplugged"), "{message}");

        // Treated as silence, then the greeting gets through
        wait_for_state(&handle, ask(Step::QueryWho)).await;
        handle.shutdown();
    }

    #[tokio::test]
    async fn test_closed_input_ends_session() {
        let (handle, bridge) = start_session();
        bridge.queue_error(BridgeError::Closed);

        wait_for_state(&handle, DialogState::WaitToStart).await;
        handle.start().await.unwrap();

        tokio::time::timeout(WAIT, handle.join())
            .await
            .expect("session did not stop");
    }

    #[tokio::test]
    async fn test_start_mid_dialogue_is_ignored() {
        let (handle, bridge) = start_session();
        bridge.queue_utterance("hi");

        wait_for_state(&handle, DialogState::WaitToStart).await;
        handle.start().await.unwrap();
        let before = wait_for_state(&handle, ask(Step::QueryWho)).await;

        handle.start().await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(handle.snapshot().state, before.state);
        handle.shutdown();
    }

    #[tokio::test]
    async fn test_shutdown_stops_runtime() {
        let (handle, _bridge) = start_session();
        wait_for_state(&handle, DialogState::WaitToStart).await;

        handle.shutdown();
        let session_id = handle.session_id.clone();
        tokio::time::timeout(WAIT, handle.join())
            .await
            .unwrap_or_else(|_| panic!("session {session_id} did not stop"));
    }
}
