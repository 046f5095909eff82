//! Conversation memory for the agent.

use toolchat_core::Message;

/// Every completed (prompt, answer) exchange, oldest first.
///
/// Unbounded and never cleared; it lives as long as the agent that owns it.
#[derive(Debug, Clone, Default)]
pub struct ConversationBuffer {
    messages: Vec<Message>,
}

impl ConversationBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one finished exchange.
    pub fn save_context(&mut self, input: &str, output: &str) {
        self.messages.push(Message::user(input));
        self.messages.push(Message::assistant(output));
    }

    /// The buffered messages, ready to splice into a request.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Number of saved exchanges.
    pub fn exchanges(&self) -> usize {
        self.messages.len() / 2
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use toolchat_core::Role;

    #[test]
    fn starts_empty() {
        let buffer = ConversationBuffer::new();
        assert!(buffer.is_empty());
        assert_eq!(buffer.exchanges(), 0);
    }

    #[test]
    fn saves_pairs_in_order() {
        let mut buffer = ConversationBuffer::new();
        buffer.save_context("Who wrote Dune?", "Frank Herbert.");
        buffer.save_context("When?", "1965.");

        assert_eq!(buffer.exchanges(), 2);
        let msgs = buffer.messages();
        assert_eq!(msgs[0].role, Role::User);
        assert_eq!(msgs[0].content, "Who wrote Dune?");
        assert_eq!(msgs[1].role, Role::Assistant);
        assert_eq!(msgs[1].content, "Frank Herbert.");
        assert_eq!(msgs[3].content, "1965.");
    }
}
