//! Chat message buffering: messages typed while PTT is held are buffered
//! and flushed to the text queue on release rather than interleaved with
//! an active voice transmission.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatInputOutcome {
    Empty,
    Buffered { message: String, pending_count: usize },
    Queued { message: String },
}

#[derive(Default)]
pub struct ChatManager {
    ptt_active: bool,
    pending: Vec<String>,
}

impl ChatManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle one line of chat input. Returns what happened so the UI
    /// layer can render feedback; the caller is responsible for actually
    /// enqueuing `Queued` messages onto the frame manager's text queue.
    pub fn handle_input(&mut self, message: &str) -> ChatInputOutcome {
        let trimmed = message.trim();
        if trimmed.is_empty() {
            return ChatInputOutcome::Empty;
        }
        if self.ptt_active {
            self.pending.push(trimmed.to_string());
            ChatInputOutcome::Buffered {
                message: trimmed.to_string(),
                pending_count: self.pending.len(),
            }
        } else {
            ChatInputOutcome::Queued { message: trimmed.to_string() }
        }
    }

    /// Update PTT state. Returns the buffered messages to flush (in order)
    /// when a press-release transition just happened; empty otherwise.
    pub fn set_ptt_active(&mut self, active: bool) -> Vec<String> {
        let was_active = self.ptt_active;
        self.ptt_active = active;
        if was_active && !active {
            std::mem::take(&mut self.pending)
        } else {
            Vec::new()
        }
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn clear_pending(&mut self) -> usize {
        let n = self.pending.len();
        self.pending.clear();
        n
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_is_ignored() {
        let mut chat = ChatManager::new();
        assert_eq!(chat.handle_input("   "), ChatInputOutcome::Empty);
    }

    #[test]
    fn messages_queue_immediately_without_ptt() {
        let mut chat = ChatManager::new();
        let outcome = chat.handle_input("hello");
        assert_eq!(outcome, ChatInputOutcome::Queued { message: "hello".into() });
    }

    #[test]
    fn messages_buffer_during_ptt_and_flush_on_release() {
        let mut chat = ChatManager::new();
        chat.set_ptt_active(true);
        let outcome = chat.handle_input("one");
        assert_eq!(
            outcome,
            ChatInputOutcome::Buffered { message: "one".into(), pending_count: 1 }
        );
        chat.handle_input("two");
        assert_eq!(chat.pending_count(), 2);

        let flushed = chat.set_ptt_active(false);
        assert_eq!(flushed, vec!["one".to_string(), "two".to_string()]);
        assert_eq!(chat.pending_count(), 0);
    }

    #[test]
    fn clear_pending_discards_buffered_messages() {
        let mut chat = ChatManager::new();
        chat.set_ptt_active(true);
        chat.handle_input("one");
        assert_eq!(chat.clear_pending(), 1);
        assert_eq!(chat.pending_count(), 0);
    }
}
