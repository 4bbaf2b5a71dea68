use std::cmp::Reverse;

use tau_messaging_types::Message;

use crate::triggers::TriggerEvaluator;

/// Orders candidates by descending style priority; equal priorities keep catalog order.
pub fn sort_by_priority(candidates: &mut [Message]) {
    candidates.sort_by_key(|message| Reverse(message.priority()));
}

/// Returns the first candidate, in the given order, whose triggers all hold.
pub fn select_next<'m>(
    candidates: &'m [Message],
    triggers: &mut TriggerEvaluator<'_>,
) -> Option<&'m Message> {
    candidates
        .iter()
        .find(|message| triggers.is_eligible(message))
}
