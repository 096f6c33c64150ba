//! Trait abstractions for runtime I/O
//!
//! The speech bridge is the only collaborator the runtime talks to. These
//! traits enable testing the executor with mock implementations.

use crate::state_machine::Hypotheses;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;

/// Result of one listen turn
#[derive(Debug, Clone, PartialEq)]
pub enum ListenOutcome {
    Recognised(Hypotheses),
    /// Nothing was heard within the bridge's window
    NoInput,
}

/// Speech bridge failures
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The input stream ended; the session cannot continue
    #[error("speech input closed")]
    Closed,
    /// A single command failed; the dialogue recovers
    #[error("speech bridge failed: {0}")]
    Failed(String),
}

/// Speech-to-text / text-to-speech subsystem.
///
/// Each command resolves when the corresponding event would be emitted:
/// `prepare` when ready, `speak` when playback completes, `listen` when the
/// listen turn is over.
#[async_trait]
pub trait SpeechBridge: Send + Sync {
    /// Initialise the speech subsystem
    async fn prepare(&self) -> Result<(), BridgeError>;

    /// Synthesise and play text
    async fn speak(&self, utterance: &str) -> Result<(), BridgeError>;

    /// Capture one turn of speech
    async fn listen(&self) -> Result<ListenOutcome, BridgeError>;
}

// ============================================================================
// Arc implementation for shared bridges
// ============================================================================

#[async_trait]
impl<T: SpeechBridge + ?Sized> SpeechBridge for Arc<T> {
    async fn prepare(&self) -> Result<(), BridgeError> {
        (**self).prepare().await
    }

    async fn speak(&self, utterance: &str) -> Result<(), BridgeError> {
        (**self).speak(utterance).await
    }

    async fn listen(&self) -> Result<ListenOutcome, BridgeError> {
        (**self).listen().await
    }
}

// ============================================================================
// Logging wrapper
// ============================================================================

/// Logs every bridge command with its duration
pub struct LoggingBridge<B> {
    inner: B,
}

impl<B: SpeechBridge> LoggingBridge<B> {
    #[must_use]
    pub fn new(inner: B) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<B: SpeechBridge> SpeechBridge for LoggingBridge<B> {
    async fn prepare(&self) -> Result<(), BridgeError> {
        let start = Instant::now();
        let result = self.inner.prepare().await;
        match &result {
            Ok(()) => tracing::info!(duration_ms = %start.elapsed().as_millis(), "Speech bridge ready"),
            Err(e) => tracing::error!(error = %e, "Speech bridge failed to prepare"),
        }
        result
    }

    async fn speak(&self, utterance: &str) -> Result<(), BridgeError> {
        let start = Instant::now();
        let result = self.inner.speak(utterance).await;
        match &result {
            Ok(()) => tracing::debug!(
                utterance = %utterance,
                duration_ms = %start.elapsed().as_millis(),
                "Spoke"
            ),
            Err(e) => tracing::warn!(utterance = %utterance, error = %e, "Speak failed"),
        }
        result
    }

    async fn listen(&self) -> Result<ListenOutcome, BridgeError> {
        let start = Instant::now();
        let result = self.inner.listen().await;
        let duration_ms = start.elapsed().as_millis();
        match &result {
            Ok(ListenOutcome::Recognised(hypotheses)) => tracing::debug!(
                utterance = %hypotheses.utterance(),
                confidence = hypotheses.top().confidence,
                candidates = hypotheses.len(),
                duration_ms = %duration_ms,
                "Recognised speech"
            ),
            Ok(ListenOutcome::NoInput) => {
                tracing::debug!(duration_ms = %duration_ms, "No input heard");
            }
            Err(e) => tracing::warn!(error = %e, "Listen failed"),
        }
        result
    }
}
