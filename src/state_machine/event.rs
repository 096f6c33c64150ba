//! Events consumed by the dialogue machine

use super::state::{Hypotheses, Hypothesis};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Events that trigger state transitions
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    // Speech bridge events
    /// Speech subsystem finished preparing
    Ready,
    /// A recognition turn produced ranked hypotheses
    Recognised { hypotheses: Hypotheses },
    /// The bridge heard nothing within its window
    NoInput,
    /// The listen turn is over (after `Recognised` or `NoInput`)
    ListenComplete,
    /// Synthesised speech finished playing
    SpeakComplete,

    // External trigger
    /// Start (or restart) a booking pass
    Start,
}

impl Event {
    /// Convenience for a single-hypothesis recognition
    #[must_use]
    pub fn recognised(utterance: impl Into<String>) -> Self {
        Event::Recognised {
            hypotheses: Hypotheses::single(Hypothesis::new(utterance, 1.0)),
        }
    }

    #[must_use]
    pub fn kind(&self) -> EventKind {
        match self {
            Event::Ready => EventKind::Ready,
            Event::Recognised { .. } => EventKind::Recognised,
            Event::NoInput => EventKind::NoInput,
            Event::ListenComplete => EventKind::ListenComplete,
            Event::SpeakComplete => EventKind::SpeakComplete,
            Event::Start => EventKind::Start,
        }
    }
}

/// Payload-free discriminant of [`Event`], used for per-state allow-lists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Ready,
    Recognised,
    NoInput,
    ListenComplete,
    SpeakComplete,
    Start,
}

impl EventKind {
    pub const ALL: [EventKind; 6] = [
        EventKind::Ready,
        EventKind::Recognised,
        EventKind::NoInput,
        EventKind::ListenComplete,
        EventKind::SpeakComplete,
        EventKind::Start,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::Ready => "ready",
            EventKind::Recognised => "recognised",
            EventKind::NoInput => "no_input",
            EventKind::ListenComplete => "listen_complete",
            EventKind::SpeakComplete => "speak_complete",
            EventKind::Start => "start",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
