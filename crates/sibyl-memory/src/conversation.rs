//! Per-session conversation history.

/// One completed question/answer round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub question: String,
    pub answer: String,
}

/// Append-only log of completed turns, replayed into each prompt so
/// follow-up questions resolve against earlier answers. The full history is
/// kept with no eviction; long sessions grow the prompt accordingly.
#[derive(Debug, Clone, Default)]
pub struct ConversationMemory {
    turns: Vec<Turn>,
}

impl ConversationMemory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a completed turn. Failed rounds are never recorded.
    pub fn record(&mut self, question: impl Into<String>, answer: impl Into<String>) {
        self.turns.push(Turn {
            question: question.into(),
            answer: answer.into(),
        });
    }

    /// Idempotent; never touches the persistent index.
    pub fn clear(&mut self) {
        self.turns.clear();
    }

    #[must_use]
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_empty() {
        let memory = ConversationMemory::new();
        assert!(memory.is_empty());
        assert_eq!(memory.len(), 0);
    }

    #[test]
    fn record_appends_in_order() {
        let mut memory = ConversationMemory::new();
        memory.record("q1", "a1");
        memory.record("q2", "a2");

        assert_eq!(memory.len(), 2);
        assert_eq!(memory.turns()[0].question, "q1");
        assert_eq!(memory.turns()[1].answer, "a2");
    }

    #[test]
    fn clear_empty_memory_is_noop() {
        let mut memory = ConversationMemory::new();
        memory.clear();
        assert!(memory.is_empty());
    }

    #[test]
    fn clear_is_idempotent() {
        let mut memory = ConversationMemory::new();
        memory.record("q", "a");
        memory.clear();
        assert!(memory.is_empty());
        memory.clear();
        assert!(memory.is_empty());
    }

    #[test]
    fn record_after_clear_starts_fresh() {
        let mut memory = ConversationMemory::new();
        memory.record("old", "old");
        memory.clear();
        memory.record("new", "new");
        assert_eq!(memory.len(), 1);
        assert_eq!(memory.turns()[0].question, "new");
    }
}
