//! Core booking dialogue state machine
//!
//! Implements the Elm Architecture pattern with pure state transitions:
//! `transition` maps (state, context, event) to a new state, a new context
//! and a list of effects, and never performs I/O itself.

mod effect;
pub mod event;
pub mod guard;
mod machine;
pub mod prompts;
pub mod state;
pub mod transition;

#[cfg(test)]
mod proptests;

pub use effect::Effect;
pub use event::{Event, EventKind};
pub use machine::{DialogueMachine, Outcome};
pub use state::{Booking, DialogState, Hypotheses, Hypothesis, Phase, SessionContext, SlotKey, Step};
pub use transition::{transition, TransitionError, TransitionResult};
