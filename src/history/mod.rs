//! Conversions between stored chat history and the visible message list.

use crate::models::chat::{ HistoryEntry, Message, Role };
use crate::models::persona::greeting_for;

/// The list shown when a persona has no stored history.
pub fn greeting_messages(persona_name: &str) -> Vec<Message> {
    vec![Message::assistant(greeting_for(persona_name), persona_name)]
}

/// Builds the visible list from stored history, or the greeting if there is none.
pub fn messages_from_history(entries: Vec<HistoryEntry>, persona_name: &str) -> Vec<Message> {
    if entries.is_empty() {
        return greeting_messages(persona_name);
    }
    entries
        .into_iter()
        .map(|entry| match entry.role {
            Role::Assistant => Message::assistant(entry.content, persona_name),
            Role::User => Message::user(entry.content),
        })
        .collect()
}

/// Flat `role: content` transcript sent for analysis.
pub fn format_transcript(messages: &[Message]) -> String {
    messages
        .iter()
        .map(|msg| format!("{}: {}", msg.role, msg.content))
        .collect::<Vec<_>>()
        .join("\n")
}
