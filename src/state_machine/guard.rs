//! Guards for the listen-completed transition of a slot-filling step
//!
//! Evaluated in priority order: a valid on-topic value, then a present but
//! invalid value, then nothing heard. Exactly one applies per event.

use super::state::{DialogState, SessionContext, Step};
use crate::grammar::{Answer, Grammar};

/// Outcome of evaluating a step's guards against the context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Slot holds a value the step expects; move to the given state
    Accepted(DialogState),
    /// Slot holds a value, but not one of the expected class
    Invalid,
    /// Slot is empty (no input heard)
    Missing,
}

/// Evaluate `step`'s guards
#[must_use]
pub fn judge(step: Step, context: &SessionContext, grammar: &Grammar) -> Verdict {
    let Some(heard) = context.slot(step.slot()) else {
        return Verdict::Missing;
    };
    match next_state(step, grammar, heard.utterance()) {
        Some(target) => Verdict::Accepted(target),
        None => Verdict::Invalid,
    }
}

/// Where a valid utterance leads from `step`, or `None` if it is off-topic
fn next_state(step: Step, grammar: &Grammar, utterance: &str) -> Option<DialogState> {
    match step {
        Step::WaitForHi => grammar.greeting(utterance).map(|_| DialogState::StartBooking),
        Step::QueryWho => grammar
            .person(utterance)
            .map(|_| DialogState::enter_step(Step::QueryDay)),
        Step::QueryDay => grammar
            .day(utterance)
            .map(|_| DialogState::enter_step(Step::QueryWhole)),
        Step::QueryWhole => grammar.answer(utterance).map(|answer| match answer {
            Answer::Yes => DialogState::enter_step(Step::ConfirmDay),
            Answer::No => DialogState::enter_step(Step::QueryTime),
        }),
        Step::QueryTime => grammar
            .time(utterance)
            .map(|_| DialogState::enter_step(Step::ConfirmTime)),
        // Rejecting a confirmation restarts collection from the person
        Step::ConfirmTime | Step::ConfirmDay => grammar.answer(utterance).map(|answer| match answer {
            Answer::Yes => DialogState::Done,
            Answer::No => DialogState::enter_step(Step::QueryWho),
        }),
    }
}
