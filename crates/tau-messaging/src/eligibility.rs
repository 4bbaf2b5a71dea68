use tau_messaging_types::Message;

/// Drops expired messages and messages for other surfaces, preserving input order.
pub fn filter_eligible(candidates: Vec<Message>, surface: &str) -> Vec<Message> {
    candidates
        .into_iter()
        .filter(|message| !message.is_expired() && message.surface() == surface)
        .collect()
}
