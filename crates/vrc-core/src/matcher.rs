//! Keyword responder: first topic whose key or alias is triggered wins, otherwise canned
//! greeting/help/thanks replies, otherwise a generic "didn't catch that".
//!
//! Matching is loose. A trigger matches when the normalized text equals it,
//! starts with it, ends with it, or contains it as a space-delimited word. Short aliases
//! therefore match a lot (`"a"` hits almost any sentence) and the greeting check is plain
//! substring containment (`"hi"` fires on "this").

use crate::knowledge::{KnowledgeStore, TopicRecord, NO_DESCRIPTION};
use std::sync::Arc;

const NO_TOPICS: &str = "any specific topics yet";

/// Produces chat replies from the current knowledge base.
pub struct ResponseMatcher {
    knowledge: Arc<KnowledgeStore>,
}

impl ResponseMatcher {
    pub fn new(knowledge: Arc<KnowledgeStore>) -> Self {
        Self { knowledge }
    }

    /// Reply text for `raw_text` spoken by `speaker`. Always non-empty, never fails.
    pub fn respond(&self, speaker: &str, raw_text: &str) -> String {
        let text = raw_text.trim().to_lowercase();
        let topics = self.knowledge.snapshot();

        let reply = match topics.iter().find(|topic| is_triggered(&text, topic)) {
            Some(topic) => describe(topic),
            None => fallback(speaker, &text, &topics),
        };
        reply.trim().to_string()
    }
}

fn is_triggered(text: &str, topic: &TopicRecord) -> bool {
    let padded = format!(" {text} ");
    topic.triggers().any(|trigger| {
        text == trigger
            || text.starts_with(&trigger)
            || text.ends_with(&trigger)
            || padded.contains(&format!(" {trigger} "))
    })
}

fn describe(topic: &TopicRecord) -> String {
    let description = topic.description.as_deref().unwrap_or(NO_DESCRIPTION);
    let mut reply = format!("Regarding {}:\n{}", topic.key, description);
    if let Some(details) = non_empty(&topic.details) {
        reply.push_str(&format!("\nMore Info: {details}"));
    }
    if let Some(website) = non_empty(&topic.website) {
        reply.push_str(&format!("\nWebsite: {website}"));
    }
    if let Some(contact) = non_empty(&topic.contact) {
        reply.push_str(&format!("\nContact: {contact}"));
    }
    reply
}

fn fallback(speaker: &str, text: &str, topics: &[TopicRecord]) -> String {
    if text.contains("hello") || text.contains("hi") {
        format!("Hello {speaker}! How can I help? Ask me about the businesses or items here.")
    } else if text.contains("help") || text.contains("what can you do") {
        let names = topics.iter().map(|t| t.key.as_str()).collect::<Vec<_>>().join(", ");
        let names = if names.is_empty() { NO_TOPICS.to_string() } else { names };
        format!("I can tell you about: {names}. I also notify owners when certain items are interacted with.")
    } else if text.contains("thank") {
        format!("You're welcome, {speaker}!")
    } else {
        format!("Sorry {speaker}, I didn't quite catch that. You can ask me about the businesses or topics I know.")
    }
}

fn non_empty(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|s| !s.is_empty())
}
