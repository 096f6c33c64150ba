//! One dialogue session's state machine instance

use super::state::{DialogState, SessionContext};
use super::transition::{initial, transition, TransitionError};
use super::{Effect, Event};
use crate::grammar::Grammar;
use std::sync::Arc;

/// What happened to an event handed to the machine
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The event was consumed. `from` is the state before it.
    Moved {
        from: DialogState,
        effects: Vec<Effect>,
    },
    /// The current state does not accept this event; nothing changed
    Ignored(TransitionError),
}

impl Outcome {
    #[must_use]
    pub fn effects(&self) -> &[Effect] {
        match self {
            Outcome::Moved { effects, .. } => effects,
            Outcome::Ignored(_) => &[],
        }
    }

    #[must_use]
    pub fn is_ignored(&self) -> bool {
        matches!(self, Outcome::Ignored(_))
    }
}

/// Owns the current state and the session context for one dialogue run.
///
/// Construct one per session; nothing is shared between instances except
/// the read-only grammar.
#[derive(Debug, Clone)]
pub struct DialogueMachine {
    grammar: Arc<Grammar>,
    state: DialogState,
    context: SessionContext,
}

impl DialogueMachine {
    /// A fresh machine in `Prepare` with an empty context
    #[must_use]
    pub fn new(grammar: Arc<Grammar>) -> Self {
        Self {
            grammar,
            state: DialogState::Prepare,
            context: SessionContext::new(),
        }
    }

    /// Entry actions of the initial state. Run once when the session starts.
    #[must_use]
    pub fn boot(&self) -> Vec<Effect> {
        initial(&self.context).effects
    }

    /// Process one event to completion
    pub fn send(&mut self, event: Event) -> Outcome {
        match transition(&self.state, &self.context, &self.grammar, event) {
            Ok(result) => {
                let from = std::mem::replace(&mut self.state, result.new_state);
                self.context = result.context;
                Outcome::Moved {
                    from,
                    effects: result.effects,
                }
            }
            Err(e) => Outcome::Ignored(e),
        }
    }

    #[must_use]
    pub fn state(&self) -> &DialogState {
        &self.state
    }

    #[must_use]
    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    #[must_use]
    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }
}
