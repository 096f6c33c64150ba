//! Pure state transition function
//!
//! Given the same state, context, grammar and event this always produces the
//! same result. Context mutation and speech commands are returned, never
//! performed.

use super::guard::{judge, Verdict};
use super::prompts;
use super::state::{Booking, DialogState, Phase, SessionContext, SlotKey, Step};
use super::{Effect, Event, EventKind};
use crate::grammar::{Grammar, SlotField};
use thiserror::Error;

/// Result of a state transition
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionResult {
    pub new_state: DialogState,
    pub context: SessionContext,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    #[must_use]
    pub fn new(state: DialogState, context: SessionContext) -> Self {
        Self {
            new_state: state,
            context,
            effects: vec![],
        }
    }

    #[must_use]
    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    #[must_use]
    pub fn with_effects(mut self, effects: impl IntoIterator<Item = Effect>) -> Self {
        self.effects.extend(effects);
        self
    }
}

/// Errors that can occur during transition
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    /// The event kind is not on the state's allow-list. Callers drop it.
    #[error("{state} does not accept {event} events")]
    NotAccepted { state: DialogState, event: EventKind },
}

/// Event kinds a state reacts to. Anything else is a no-op.
#[must_use]
pub fn accepted_events(state: &DialogState) -> &'static [EventKind] {
    match state {
        DialogState::Prepare => &[EventKind::Ready],
        DialogState::WaitToStart | DialogState::Done => &[EventKind::Start],
        DialogState::StartBooking => &[EventKind::SpeakComplete],
        DialogState::Filling {
            phase: Phase::Ask, ..
        } => &[
            EventKind::Recognised,
            EventKind::NoInput,
            EventKind::ListenComplete,
        ],
        // Listen-completion belongs to the composite step, whichever child is active
        DialogState::Filling { .. } => &[EventKind::SpeakComplete, EventKind::ListenComplete],
    }
}

/// Entry into the initial state when a machine boots
#[must_use]
pub fn initial(context: &SessionContext) -> TransitionResult {
    enter(DialogState::Prepare, context.clone())
}

/// Pure transition function
///
/// # Errors
///
/// Returns [`TransitionError::NotAccepted`] when `event` is not on the
/// allow-list of `state`. Nothing changes in that case.
pub fn transition(
    state: &DialogState,
    context: &SessionContext,
    grammar: &Grammar,
    event: Event,
) -> Result<TransitionResult, TransitionError> {
    let not_accepted = |event: EventKind| TransitionError::NotAccepted {
        state: *state,
        event,
    };
    if !accepted_events(state).contains(&event.kind()) {
        return Err(not_accepted(event.kind()));
    }

    match (*state, event) {
        // ============================================================
        // Lifecycle
        // ============================================================
        (DialogState::Prepare, Event::Ready) => {
            Ok(enter(DialogState::WaitToStart, context.clone()))
        }

        (DialogState::WaitToStart | DialogState::Done, Event::Start) => Ok(enter(
            DialogState::enter_step(Step::WaitForHi),
            context.clone(),
        )),

        (DialogState::StartBooking, Event::SpeakComplete) => Ok(enter(
            DialogState::enter_step(Step::QueryWho),
            context.clone(),
        )),

        // ============================================================
        // Slot-filling sub-protocol
        // ============================================================

        // Prompt / NoInput / InvalidInput finished speaking -> listen
        (
            DialogState::Filling {
                step,
                phase: Phase::Prompt | Phase::NoInput | Phase::InvalidInput,
            },
            Event::SpeakComplete,
        ) => Ok(enter(
            DialogState::Filling {
                step,
                phase: Phase::Ask,
            },
            context.clone(),
        )),

        // Recognition overwrites the step's slot and stays in Ask without re-entry
        (
            DialogState::Filling {
                step,
                phase: Phase::Ask,
            },
            Event::Recognised { hypotheses },
        ) => {
            let mut context = context.clone();
            context.store(step.slot(), hypotheses);
            Ok(TransitionResult::new(*state, context))
        }

        (
            DialogState::Filling {
                step,
                phase: Phase::Ask,
            },
            Event::NoInput,
        ) => {
            let mut context = context.clone();
            context.clear(step.slot());
            Ok(TransitionResult::new(*state, context))
        }

        // Listen finished: guards decide between next step, InvalidInput and NoInput
        (DialogState::Filling { step, .. }, Event::ListenComplete) => {
            Ok(listen_completed(step, context, grammar))
        }

        (_, event) => Err(not_accepted(event.kind())),
    }
}

fn listen_completed(step: Step, context: &SessionContext, grammar: &Grammar) -> TransitionResult {
    match judge(step, context, grammar) {
        Verdict::Accepted(DialogState::Done) => {
            let booking = booking(step, context, grammar);
            // Transition action runs before the entry action of Done
            TransitionResult::new(DialogState::Done, context.clone())
                .with_effect(Effect::CommitBooking { booking })
                .with_effects(entry_effects(DialogState::Done, context))
        }
        Verdict::Accepted(target) => enter(target, context.clone()),
        Verdict::Invalid => enter(
            DialogState::Filling {
                step,
                phase: Phase::InvalidInput,
            },
            context.clone(),
        ),
        Verdict::Missing => enter(
            DialogState::Filling {
                step,
                phase: Phase::NoInput,
            },
            context.clone(),
        ),
    }
}

/// Move into `target`, running its entry actions
fn enter(target: DialogState, context: SessionContext) -> TransitionResult {
    let effects = entry_effects(target, &context);
    TransitionResult::new(target, context).with_effects(effects)
}

/// Entry actions of a leaf state
fn entry_effects(state: DialogState, context: &SessionContext) -> Vec<Effect> {
    match state {
        DialogState::Prepare => vec![Effect::Prepare],
        DialogState::WaitToStart => vec![],
        DialogState::StartBooking => vec![Effect::speak(prompts::OPENING)],
        DialogState::Filling { step, phase } => match phase {
            Phase::Prompt => vec![Effect::speak(prompts::question(step, context))],
            Phase::Ask => vec![Effect::Listen],
            Phase::NoInput => vec![Effect::speak(prompts::no_input(step, context))],
            Phase::InvalidInput => {
                vec![Effect::speak(prompts::invalid_input(step, context))]
            }
        },
        DialogState::Done => vec![Effect::speak(prompts::COMPLETION)],
    }
}

/// The booking confirmed from `step`; a whole-day confirmation carries no time
fn booking(step: Step, context: &SessionContext, grammar: &Grammar) -> Booking {
    Booking {
        person: resolved(context, grammar, SlotKey::BookedPerson),
        day: resolved(context, grammar, SlotKey::BookedDay),
        time: (step == Step::ConfirmTime).then(|| resolved(context, grammar, SlotKey::BookedTime)),
    }
}

/// Grammar-resolved value held in a booking slot, falling back to the raw
/// utterance when it does not resolve
fn resolved(context: &SessionContext, grammar: &Grammar, key: SlotKey) -> String {
    let Some(utterance) = context.utterance(key) else {
        return "unknown".to_string();
    };
    let field = match key {
        SlotKey::BookedPerson => SlotField::Person,
        SlotKey::BookedDay => SlotField::Day,
        SlotKey::BookedTime => SlotField::Time,
        SlotKey::LastAnswer => SlotField::Answer,
    };
    grammar
        .classify(utterance, field)
        .unwrap_or(utterance)
        .to_string()
}
