//! Dialogue state and session context types

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Recognition results
// ============================================================================

/// One speech-recognition candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hypothesis {
    pub utterance: String,
    pub confidence: f64,
}

impl Hypothesis {
    #[must_use]
    pub fn new(utterance: impl Into<String>, confidence: f64) -> Self {
        Self {
            utterance: utterance.into(),
            confidence,
        }
    }
}

/// Ranked hypotheses from one recognition turn. Never empty: a turn where
/// nothing was heard is represented by the absence of a `Hypotheses`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Hypothesis>", into = "Vec<Hypothesis>")]
pub struct Hypotheses {
    top: Hypothesis,
    rest: Vec<Hypothesis>,
}

impl Hypotheses {
    /// A single-candidate result
    #[must_use]
    pub fn single(top: Hypothesis) -> Self {
        Self { top, rest: vec![] }
    }

    /// Build from a ranked list, best first. `None` if the list is empty.
    #[must_use]
    pub fn from_ranked(ranked: Vec<Hypothesis>) -> Option<Self> {
        let mut iter = ranked.into_iter();
        let top = iter.next()?;
        Some(Self {
            top,
            rest: iter.collect(),
        })
    }

    /// The highest-ranked hypothesis, the only one the dialogue consults
    #[must_use]
    pub fn top(&self) -> &Hypothesis {
        &self.top
    }

    #[must_use]
    pub fn utterance(&self) -> &str {
        &self.top.utterance
    }

    pub fn iter(&self) -> impl Iterator<Item = &Hypothesis> {
        std::iter::once(&self.top).chain(self.rest.iter())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        1 + self.rest.len()
    }
}

impl TryFrom<Vec<Hypothesis>> for Hypotheses {
    type Error = &'static str;

    fn try_from(ranked: Vec<Hypothesis>) -> Result<Self, Self::Error> {
        Self::from_ranked(ranked).ok_or("hypothesis list must not be empty")
    }
}

impl From<Hypotheses> for Vec<Hypothesis> {
    fn from(hypotheses: Hypotheses) -> Self {
        let mut all = Vec::with_capacity(hypotheses.len());
        all.push(hypotheses.top);
        all.extend(hypotheses.rest);
        all
    }
}

// ============================================================================
// Session Context
// ============================================================================

/// Which context field a slot-filling step writes to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotKey {
    LastAnswer,
    BookedPerson,
    BookedDay,
    BookedTime,
}

/// Mutable slot store for one dialogue run.
///
/// Each recognition overwrites its field; a no-input turn clears it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionContext {
    pub last_answer: Option<Hypotheses>,
    pub booked_person: Option<Hypotheses>,
    pub booked_day: Option<Hypotheses>,
    pub booked_time: Option<Hypotheses>,
}

impl SessionContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn slot(&self, key: SlotKey) -> Option<&Hypotheses> {
        match key {
            SlotKey::LastAnswer => self.last_answer.as_ref(),
            SlotKey::BookedPerson => self.booked_person.as_ref(),
            SlotKey::BookedDay => self.booked_day.as_ref(),
            SlotKey::BookedTime => self.booked_time.as_ref(),
        }
    }

    fn slot_mut(&mut self, key: SlotKey) -> &mut Option<Hypotheses> {
        match key {
            SlotKey::LastAnswer => &mut self.last_answer,
            SlotKey::BookedPerson => &mut self.booked_person,
            SlotKey::BookedDay => &mut self.booked_day,
            SlotKey::BookedTime => &mut self.booked_time,
        }
    }

    /// Replace the slot with a new recognition result
    pub fn store(&mut self, key: SlotKey, heard: Hypotheses) {
        *self.slot_mut(key) = Some(heard);
    }

    /// Clear the slot after a no-input turn
    pub fn clear(&mut self, key: SlotKey) {
        *self.slot_mut(key) = None;
    }

    /// Top utterance held in the slot
    #[must_use]
    pub fn utterance(&self, key: SlotKey) -> Option<&str> {
        self.slot(key).map(Hypotheses::utterance)
    }
}

// ============================================================================
// Dialogue State
// ============================================================================

/// Slot-filling steps. Each one is a composite state running the
/// `Prompt`, `Ask`, `NoInput`, `InvalidInput` sub-protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    WaitForHi,
    QueryWho,
    QueryDay,
    QueryWhole,
    QueryTime,
    ConfirmTime,
    ConfirmDay,
}

impl Step {
    pub const ALL: [Step; 7] = [
        Step::WaitForHi,
        Step::QueryWho,
        Step::QueryDay,
        Step::QueryWhole,
        Step::QueryTime,
        Step::ConfirmTime,
        Step::ConfirmDay,
    ];

    /// Context field this step captures into
    #[must_use]
    pub fn slot(self) -> SlotKey {
        match self {
            Step::QueryWho => SlotKey::BookedPerson,
            Step::QueryDay => SlotKey::BookedDay,
            Step::QueryTime => SlotKey::BookedTime,
            Step::WaitForHi | Step::QueryWhole | Step::ConfirmTime | Step::ConfirmDay => {
                SlotKey::LastAnswer
            }
        }
    }

    /// Sub-state entered when the step is entered from outside
    #[must_use]
    pub fn initial_phase(self) -> Phase {
        match self {
            // The greeting step listens straight away
            Step::WaitForHi => Phase::Ask,
            _ => Phase::Prompt,
        }
    }

    /// Children the step can actually be in. The greeting step has no
    /// Prompt child.
    #[must_use]
    pub fn phases(self) -> &'static [Phase] {
        match self {
            Step::WaitForHi => &[Phase::Ask, Phase::NoInput, Phase::InvalidInput],
            _ => &Phase::ALL,
        }
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Step::WaitForHi => "WaitForHi",
            Step::QueryWho => "Query_who",
            Step::QueryDay => "Query_day",
            Step::QueryWhole => "Query_whole",
            Step::QueryTime => "Query_time",
            Step::ConfirmTime => "Confirm_time",
            Step::ConfirmDay => "Confirm_day",
        }
    }
}

/// Child state inside a slot-filling step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Speaking the step's question
    Prompt,
    /// Listening for the answer
    Ask,
    /// Apologising after nothing was heard
    NoInput,
    /// Echoing an utterance that did not fit the step
    InvalidInput,
}

impl Phase {
    pub const ALL: [Phase; 4] = [Phase::Prompt, Phase::Ask, Phase::NoInput, Phase::InvalidInput];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Phase::Prompt => "Prompt",
            Phase::Ask => "Ask",
            Phase::NoInput => "NoInput",
            Phase::InvalidInput => "InvalidInput",
        }
    }
}

/// Top-level dialogue state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DialogState {
    /// Speech subsystem is being initialised
    #[default]
    Prepare,
    /// Ready, waiting for the start trigger
    WaitToStart,
    /// Speaking the opening line
    StartBooking,
    /// Inside a slot-filling step
    Filling { step: Step, phase: Phase },
    /// Booking committed, waiting for a retrigger
    Done,
}

impl DialogState {
    /// Entering `step` from outside lands in its initial child
    #[must_use]
    pub fn enter_step(step: Step) -> Self {
        DialogState::Filling {
            step,
            phase: step.initial_phase(),
        }
    }

    #[must_use]
    pub fn step(&self) -> Option<Step> {
        match self {
            DialogState::Filling { step, .. } => Some(*step),
            _ => None,
        }
    }

    #[must_use]
    pub fn phase(&self) -> Option<Phase> {
        match self {
            DialogState::Filling { phase, .. } => Some(*phase),
            _ => None,
        }
    }

    /// Dotted path such as `Query_day.InvalidInput`
    #[must_use]
    pub fn path(&self) -> String {
        match self {
            DialogState::Prepare => "Prepare".to_string(),
            DialogState::WaitToStart => "WaitToStart".to_string(),
            DialogState::StartBooking => "Start_booking".to_string(),
            DialogState::Filling { step, phase } => format!("{}.{}", step.name(), phase.name()),
            DialogState::Done => "Done".to_string(),
        }
    }

    /// Short UI label for the active leaf state
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            DialogState::Prepare => "preparing",
            DialogState::WaitToStart => "click to start",
            DialogState::Filling {
                phase: Phase::Ask, ..
            } => "listening",
            DialogState::StartBooking | DialogState::Filling { .. } => "speaking",
            DialogState::Done => "done",
        }
    }

    /// Every state the machine can reach
    #[must_use]
    pub fn all() -> Vec<DialogState> {
        let mut states = vec![
            DialogState::Prepare,
            DialogState::WaitToStart,
            DialogState::StartBooking,
            DialogState::Done,
        ];
        for step in Step::ALL {
            for &phase in step.phases() {
                states.push(DialogState::Filling { step, phase });
            }
        }
        states
    }
}

impl fmt::Display for DialogState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

// ============================================================================
// Booking
// ============================================================================

/// A confirmed appointment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    pub person: String,
    pub day: String,
    /// `None` for a whole-day booking
    pub time: Option<String>,
}

impl Booking {
    #[must_use]
    pub fn is_whole_day(&self) -> bool {
        self.time.is_none()
    }
}

impl fmt::Display for Booking {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.time {
            Some(time) => write!(f, "{} on {} at {}", self.person, self.day, time),
            None => write!(f, "{} on {} for the whole day", self.person, self.day),
        }
    }
}
