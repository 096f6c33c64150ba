//! Voice booking - a spoken dialogue for creating appointments
//!
//! The dialogue is a pure state machine ([`state_machine`]) driven by an
//! async runtime ([`runtime`]) that talks to a speech bridge. Recognised
//! utterances are interpreted through a small lexicon ([`grammar`]).

pub mod config;
pub mod grammar;
pub mod runtime;
pub mod state_machine;
