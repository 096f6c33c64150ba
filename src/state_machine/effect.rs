//! Effects produced by state transitions

use super::state::Booking;

/// Commands to be executed after a state transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Initialise the speech subsystem (answered by `Event::Ready`)
    Prepare,

    /// Synthesise and play text (answered by `Event::SpeakComplete`)
    Speak { utterance: String },

    /// Capture speech (answered by `Recognised`/`NoInput`, then `ListenComplete`)
    Listen,

    /// Record a confirmed booking
    CommitBooking { booking: Booking },
}

impl Effect {
    #[must_use]
    pub fn speak(utterance: impl Into<String>) -> Self {
        Effect::Speak {
            utterance: utterance.into(),
        }
    }

    /// Whether this effect is a command to the speech bridge
    #[must_use]
    pub fn is_speech_command(&self) -> bool {
        matches!(self, Effect::Prepare | Effect::Speak { .. } | Effect::Listen)
    }
}
