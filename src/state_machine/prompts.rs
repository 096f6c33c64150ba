//! System utterances spoken by entry actions

use super::state::{SessionContext, SlotKey, Step};

pub const OPENING: &str = "Let's create an appointment.";
pub const COMPLETION: &str = "Your appointment has been created!";
const CANT_HEAR: &str = "I can't hear you!";

/// The question a step asks. Confirmations repeat the top utterance heard
/// for each slot, as the caller said it.
#[must_use]
pub fn question(step: Step, context: &SessionContext) -> String {
    match step {
        // Only spoken as part of the invalid-input reprompt
        Step::WaitForHi => "Please say hi or hello to start!".to_string(),
        Step::QueryWho => "Who are you meeting with?".to_string(),
        Step::QueryDay => "On which day is your meeting?".to_string(),
        Step::QueryWhole => "Will it take the whole day?".to_string(),
        Step::QueryTime => "What time is your meeting?".to_string(),
        Step::ConfirmTime => format!(
            "Do you want me to create an appointment with {} on {} at {}?",
            heard(context, SlotKey::BookedPerson),
            heard(context, SlotKey::BookedDay),
            heard(context, SlotKey::BookedTime),
        ),
        Step::ConfirmDay => format!(
            "Do you want me to create an appointment with {} on {} for the whole day?",
            heard(context, SlotKey::BookedPerson),
            heard(context, SlotKey::BookedDay),
        ),
    }
}

/// Re-prompt after nothing was heard
#[must_use]
pub fn no_input(step: Step, context: &SessionContext) -> String {
    match step {
        Step::WaitForHi => CANT_HEAR.to_string(),
        _ => format!("{CANT_HEAR} {}", question(step, context)),
    }
}

/// Echo the misheard utterance, say what was expected, and re-ask
#[must_use]
pub fn invalid_input(step: Step, context: &SessionContext) -> String {
    let said = context.utterance(step.slot()).unwrap_or_default();
    let complaint = match step {
        Step::WaitForHi => "I am waiting for a greeting.",
        Step::QueryWho => "this name is not in the list.",
        Step::QueryDay => "this day is not in the list.",
        Step::QueryTime => "this time is not in the list.",
        Step::QueryWhole | Step::ConfirmTime | Step::ConfirmDay => "I expect a yes or no.",
    };
    format!("You just said: {said}, but {complaint} {}", question(step, context))
}

fn heard(context: &SessionContext, key: SlotKey) -> &str {
    context.utterance(key).unwrap_or("unknown")
}
