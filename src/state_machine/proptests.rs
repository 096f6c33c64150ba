//! Property-based tests for the state machine
//!
//! These tests verify key invariants hold across all possible inputs.

#![allow(clippy::collapsible_if)]

use super::guard::{judge, Verdict};
use super::state::*;
use super::transition::*;
use super::*;
use crate::grammar::Grammar;
use proptest::prelude::*;

// ============================================================================
// Test Helpers
// ============================================================================

/// Grammar keys of every class, plus a few strings the grammar does not know
const UTTERANCES: &[&str] = &[
    "hi", "Hello", "bora", "VLAD", "tom", "monday", "Friday", "8", "13", "16", "yes", "nope",
    "of course", "no way", "xyz", "seven", "", "hello there",
];

fn grammar() -> Grammar {
    Grammar::builtin()
}

/// An utterance that satisfies `step`'s valid guard, and where it leads
fn valid_for(step: Step) -> (&'static str, DialogState) {
    match step {
        Step::WaitForHi => ("hello", DialogState::StartBooking),
        Step::QueryWho => ("bora", DialogState::enter_step(Step::QueryDay)),
        Step::QueryDay => ("friday", DialogState::enter_step(Step::QueryWhole)),
        Step::QueryWhole => ("yes", DialogState::enter_step(Step::ConfirmDay)),
        Step::QueryTime => ("9", DialogState::enter_step(Step::ConfirmTime)),
        Step::ConfirmTime | Step::ConfirmDay => ("sure", DialogState::Done),
    }
}

fn step_accepts(step: Step, utterance: &str) -> bool {
    let mut ctx = SessionContext::new();
    ctx.store(step.slot(), Hypotheses::single(Hypothesis::new(utterance, 1.0)));
    matches!(judge(step, &ctx, &grammar()), Verdict::Accepted(_))
}

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_utterance() -> impl Strategy<Value = String> {
    prop_oneof![
        3 => prop::sample::select(UTTERANCES).prop_map(str::to_string),
        1 => "[a-zA-Z0-9 ]{0,12}",
    ]
}

fn arb_hypothesis() -> impl Strategy<Value = Hypothesis> {
    (arb_utterance(), 0.0f64..=1.0).prop_map(|(utterance, confidence)| Hypothesis {
        utterance,
        confidence,
    })
}

fn arb_hypotheses() -> impl Strategy<Value = Hypotheses> {
    proptest::collection::vec(arb_hypothesis(), 1..4)
        .prop_filter_map("non-empty", Hypotheses::from_ranked)
}

fn arb_context() -> impl Strategy<Value = SessionContext> {
    (
        proptest::option::of(arb_hypotheses()),
        proptest::option::of(arb_hypotheses()),
        proptest::option::of(arb_hypotheses()),
        proptest::option::of(arb_hypotheses()),
    )
        .prop_map(|(last_answer, booked_person, booked_day, booked_time)| SessionContext {
            last_answer,
            booked_person,
            booked_day,
            booked_time,
        })
}

fn arb_step() -> impl Strategy<Value = Step> {
    prop::sample::select(Step::ALL.to_vec())
}

fn arb_state() -> impl Strategy<Value = DialogState> {
    prop::sample::select(DialogState::all())
}

fn arb_event() -> impl Strategy<Value = Event> {
    prop_oneof![
        Just(Event::Ready),
        Just(Event::Start),
        Just(Event::NoInput),
        Just(Event::ListenComplete),
        Just(Event::SpeakComplete),
        arb_hypotheses().prop_map(|hypotheses| Event::Recognised { hypotheses }),
    ]
}

/// A failed turn: silence, or an utterance (replaced if it happens to fit)
#[derive(Debug, Clone)]
enum Failure {
    Silence,
    Say(String),
}

fn arb_failure() -> impl Strategy<Value = Failure> {
    prop_oneof![
        Just(Failure::Silence),
        arb_utterance().prop_map(Failure::Say),
    ]
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    // Exactly one guard applies, and each one agrees with the context
    #[test]
    fn prop_guards_are_mutually_exclusive(step in arb_step(), ctx in arb_context()) {
        let grammar = grammar();
        let heard = ctx.slot(step.slot());
        match judge(step, &ctx, &grammar) {
            Verdict::Missing => prop_assert!(heard.is_none()),
            Verdict::Invalid => {
                prop_assert!(heard.is_some());
                prop_assert!(!step_accepts(step, heard.unwrap().utterance()));
            }
            Verdict::Accepted(target) => {
                let heard = heard.unwrap();
                prop_assert!(grammar.is_known(heard.utterance()));
                prop_assert_ne!(target.step(), Some(step));
            }
        }
    }

    // The allow-list and the transition table describe the same machine
    #[test]
    fn prop_allow_list_matches_transitions(
        state in arb_state(),
        ctx in arb_context(),
        event in arb_event(),
    ) {
        let kind = event.kind();
        let result = transition(&state, &ctx, &grammar(), event);
        prop_assert_eq!(
            result.is_ok(),
            accepted_events(&state).contains(&kind),
            "{} with {}: {:?}", state, kind, result
        );
    }

    // Rejected events leave everything as it was
    #[test]
    fn prop_unexpected_events_are_no_ops(
        state in arb_state(),
        ctx in arb_context(),
        event in arb_event(),
    ) {
        if !accepted_events(&state).contains(&event.kind()) {
            let err = transition(&state, &ctx, &grammar(), event.clone()).unwrap_err();
            prop_assert_eq!(err, TransitionError::NotAccepted { state, event: event.kind() });
        }
    }

    // Two recognitions in a row leave only the second one
    #[test]
    fn prop_recognition_overwrites(
        step in arb_step(),
        ctx in arb_context(),
        first in arb_hypotheses(),
        second in arb_hypotheses(),
    ) {
        let grammar = grammar();
        let ask = DialogState::Filling { step, phase: Phase::Ask };

        let r1 = transition(&ask, &ctx, &grammar, Event::Recognised { hypotheses: first }).unwrap();
        let r2 = transition(&r1.new_state, &r1.context, &grammar, Event::Recognised { hypotheses: second.clone() }).unwrap();

        prop_assert_eq!(r2.new_state, ask);
        prop_assert_eq!(r2.context.slot(step.slot()), Some(&second));
        prop_assert!(r2.effects.is_empty());
    }

    // No input clears only the step's own slot
    #[test]
    fn prop_no_input_clears_own_slot(step in arb_step(), ctx in arb_context()) {
        let ask = DialogState::Filling { step, phase: Phase::Ask };
        let result = transition(&ask, &ctx, &grammar(), Event::NoInput).unwrap();

        prop_assert!(result.context.slot(step.slot()).is_none());
        for key in [SlotKey::LastAnswer, SlotKey::BookedPerson, SlotKey::BookedDay, SlotKey::BookedTime] {
            if key != step.slot() {
                prop_assert_eq!(result.context.slot(key), ctx.slot(key));
            }
        }
    }

    // Only Ask mutates the context
    #[test]
    fn prop_context_only_changes_in_ask(
        state in arb_state(),
        ctx in arb_context(),
        event in arb_event(),
    ) {
        if state.phase() != Some(Phase::Ask) {
            if let Ok(result) = transition(&state, &ctx, &grammar(), event) {
                prop_assert_eq!(result.context, ctx);
            }
        }
    }

    // Each transition issues at most one speech command, and Listen only into Ask
    #[test]
    fn prop_one_speech_command_per_transition(
        state in arb_state(),
        ctx in arb_context(),
        event in arb_event(),
    ) {
        if let Ok(result) = transition(&state, &ctx, &grammar(), event) {
            let commands = result.effects.iter().filter(|e| e.is_speech_command()).count();
            prop_assert!(commands <= 1, "{:?}", result.effects);
            if result.effects.contains(&Effect::Listen) {
                prop_assert_eq!(result.new_state.phase(), Some(Phase::Ask));
            }
        }
    }

    // Bookings are committed only when a confirmation step is accepted
    #[test]
    fn prop_commit_only_on_confirmation(
        state in arb_state(),
        ctx in arb_context(),
        event in arb_event(),
    ) {
        if let Ok(result) = transition(&state, &ctx, &grammar(), event) {
            let commits = result
                .effects
                .iter()
                .any(|e| matches!(e, Effect::CommitBooking { .. }));
            if commits {
                prop_assert_eq!(result.new_state, DialogState::Done);
                prop_assert!(matches!(state.step(), Some(Step::ConfirmTime | Step::ConfirmDay)));
            }
        }
    }

    // However many failed turns come first, a valid answer reaches the next step
    #[test]
    fn prop_valid_input_ends_the_loop(
        step in arb_step(),
        ctx in arb_context(),
        failures in proptest::collection::vec(arb_failure(), 0..8),
    ) {
        let grammar = grammar();
        let (valid, expected) = valid_for(step);

        let mut state = DialogState::enter_step(step);
        let mut ctx = ctx;
        let apply = |state: &mut DialogState, ctx: &mut SessionContext, event: Event| {
            let result = transition(state, ctx, &grammar, event).unwrap();
            *state = result.new_state;
            *ctx = result.context;
        };

        if state.phase() == Some(Phase::Prompt) {
            apply(&mut state, &mut ctx, Event::SpeakComplete);
        }

        for failure in failures {
            prop_assert_eq!(state, DialogState::Filling { step, phase: Phase::Ask });
            let expected_phase = match failure {
                Failure::Silence => {
                    apply(&mut state, &mut ctx, Event::NoInput);
                    Phase::NoInput
                }
                Failure::Say(text) => {
                    let text = if step_accepts(step, &text) { "xyz".to_string() } else { text };
                    apply(&mut state, &mut ctx, Event::recognised(text));
                    Phase::InvalidInput
                }
            };
            apply(&mut state, &mut ctx, Event::ListenComplete);
            prop_assert_eq!(state, DialogState::Filling { step, phase: expected_phase });
            apply(&mut state, &mut ctx, Event::SpeakComplete);
        }

        apply(&mut state, &mut ctx, Event::recognised(valid));
        apply(&mut state, &mut ctx, Event::ListenComplete);
        prop_assert_eq!(state, expected);
    }

    // Every reachable leaf has a label and a dotted path under its parent
    #[test]
    fn prop_paths_name_parent_and_child(state in arb_state()) {
        let path = state.path();
        prop_assert!(!state.label().is_empty());
        if let DialogState::Filling { step, phase } = state {
            let expected = format!("{}.{}", step.name(), phase.name());
            prop_assert_eq!(path, expected);
        } else {
            prop_assert!(!path.contains('.'));
        }
    }
}
