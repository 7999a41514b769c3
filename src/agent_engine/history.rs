use crate::llm::types::ChatMessage;

/// Conversation sent to the planner each turn.
///
/// Append-only for the whole run: there is no way to edit or drop a message.
/// Nothing caps its growth either; a long session will eventually exceed the
/// model's context window.
// TODO: summarise old observations once runs routinely outgrow the context window.
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    messages: Vec<ChatMessage>,
}

impl Conversation {
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self {
            messages: vec![ChatMessage::system(system_prompt)],
        }
    }

    pub fn push(&mut self, message: ChatMessage) {
        tracing::trace!(role = ?message.role, len = message.content.len(), "history append");
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn into_messages(self) -> Vec<ChatMessage> {
        self.messages
    }
}
