//! Console speech bridge
//!
//! Stands in for a speech service: spoken text is printed, and each line
//! typed on the input stream is one recognised utterance.

use super::traits::{BridgeError, ListenOutcome, SpeechBridge};
use crate::config::SpeechSettings;
use crate::state_machine::{Hypotheses, Hypothesis};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::{mpsc, Mutex};

/// Shared source of input lines.
///
/// The bridge and the start prompt both read from it, so it hands out one
/// line at a time to whoever asks first.
pub struct LineSource {
    lines: Mutex<mpsc::Receiver<String>>,
}

impl LineSource {
    /// Read lines from stdin on a background task
    #[must_use]
    pub fn stdin() -> Arc<Self> {
        let (tx, rx) = mpsc::channel(16);
        tokio::spawn(async move {
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        if tx.send(line).await.is_err() {
                            break;
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        tracing::warn!(error = %e, "Failed to read stdin");
                        break;
                    }
                }
            }
        });
        Self::from_receiver(rx)
    }

    #[must_use]
    pub fn from_receiver(rx: mpsc::Receiver<String>) -> Arc<Self> {
        Arc::new(Self {
            lines: Mutex::new(rx),
        })
    }

    /// Next input line, or `None` once the input has ended
    pub async fn next_line(&self) -> Option<String> {
        self.lines.lock().await.recv().await
    }
}

/// Speech bridge backed by the terminal
pub struct ConsoleBridge {
    input: Arc<LineSource>,
    settings: SpeechSettings,
}

impl ConsoleBridge {
    #[must_use]
    pub fn new(input: Arc<LineSource>, settings: SpeechSettings) -> Self {
        Self { input, settings }
    }

    async fn print(&self, text: &str) -> Result<(), BridgeError> {
        let mut stdout = tokio::io::stdout();
        stdout
            .write_all(format!("{text}\n").as_bytes())
            .await
            .map_err(|e| BridgeError::Failed(e.to_string()))?;
        stdout
            .flush()
            .await
            .map_err(|e| BridgeError::Failed(e.to_string()))
    }
}

#[async_trait]
impl SpeechBridge for ConsoleBridge {
    async fn prepare(&self) -> Result<(), BridgeError> {
        self.print(&format!(
            "[speech ready: locale {}, voice {}]",
            self.settings.locale, self.settings.voice
        ))
        .await
    }

    async fn speak(&self, utterance: &str) -> Result<(), BridgeError> {
        self.print(&format!("SYSTEM: {utterance}")).await
    }

    async fn listen(&self) -> Result<ListenOutcome, BridgeError> {
        self.print("YOU:").await?;
        match tokio::time::timeout(self.settings.no_input_timeout, self.input.next_line()).await {
            Err(_) => Ok(ListenOutcome::NoInput),
            Ok(None) => Err(BridgeError::Closed),
            Ok(Some(line)) => Ok(recognise(&line)),
        }
    }
}

/// A typed line is recognised with full confidence; a blank one is silence
fn recognise(line: &str) -> ListenOutcome {
    let text = line.trim();
    if text.is_empty() {
        ListenOutcome::NoInput
    } else {
        ListenOutcome::Recognised(Hypotheses::single(Hypothesis::new(text, 1.0)))
    }
}
