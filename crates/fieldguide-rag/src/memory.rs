//! Conversation memory for one session.

use crate::error::{RagError, RagResult};
use fieldguide_core::{ConversationTurn, Role};
use tracing::debug;

/// A completed question/answer pair waiting to be committed.
///
/// Carries a snapshot of the memory it was generated against so a stale
/// exchange (memory cleared or extended since) is rejected.
#[derive(Debug, Clone, PartialEq)]
pub struct Exchange {
    pub question: String,
    pub answer: String,
    epoch: u64,
    base_len: usize,
}

/// Append-only question/answer history.
#[derive(Debug, Default)]
pub struct ConversationMemory {
    turns: Vec<ConversationTurn>,
    epoch: u64,
    /// Turns rendered into prompts; 0 renders all of them.
    max_turns: usize,
}

impl ConversationMemory {
    pub fn new(max_turns: usize) -> Self {
        Self {
            max_turns,
            ..Self::default()
        }
    }

    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Incremented by every `clear`.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn clear(&mut self) {
        debug!("Clearing {} turns of conversation memory", self.turns.len());
        self.turns.clear();
        self.epoch += 1;
    }

    /// Start an exchange against the current state of memory.
    pub fn exchange(&self, question: impl Into<String>, answer: impl Into<String>) -> Exchange {
        Exchange {
            question: question.into(),
            answer: answer.into(),
            epoch: self.epoch,
            base_len: self.turns.len(),
        }
    }

    /// Append the user and assistant turns of `exchange` together.
    pub fn commit(&mut self, exchange: Exchange) -> RagResult<()> {
        if exchange.epoch != self.epoch || exchange.base_len != self.turns.len() {
            return Err(RagError::MemoryConsistency(format!(
                "exchange was built against epoch {} with {} turns, memory is at epoch {} with {} turns",
                exchange.epoch,
                exchange.base_len,
                self.epoch,
                self.turns.len()
            )));
        }
        if exchange.answer.trim().is_empty() {
            return Err(RagError::MemoryConsistency(
                "refusing to record an empty answer".to_string(),
            ));
        }

        self.turns.push(ConversationTurn::user(exchange.question));
        self.turns.push(ConversationTurn::assistant(exchange.answer));
        Ok(())
    }

    /// History as prompt text, most recent `max_turns` only.
    pub fn render(&self) -> String {
        let start = match self.max_turns {
            0 => 0,
            n => self.turns.len().saturating_sub(n),
        };

        self.turns[start..]
            .iter()
            .map(|turn| {
                let speaker = match turn.role {
                    Role::User => "Human",
                    Role::Assistant => "Assistant",
                };
                format!("{}: {}", speaker, turn.content)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commit_appends_pair() {
        let mut memory = ConversationMemory::default();
        let exchange = memory.exchange("How often to drain?", "Daily.");
        memory.commit(exchange).unwrap();

        assert_eq!(memory.len(), 2);
        assert_eq!(memory.turns()[0].role, Role::User);
        assert_eq!(memory.turns()[1].content, "Daily.");
    }

    #[test]
    fn test_stale_exchange_rejected() {
        let mut memory = ConversationMemory::default();
        let first = memory.exchange("q1", "a1");
        let second = memory.exchange("q2", "a2");
        memory.commit(first).unwrap();

        assert!(matches!(
            memory.commit(second),
            Err(RagError::MemoryConsistency(_))
        ));
        assert_eq!(memory.len(), 2);
    }

    #[test]
    fn test_exchange_after_clear_rejected() {
        let mut memory = ConversationMemory::default();
        let exchange = memory.exchange("q", "a");
        memory.clear();

        assert!(memory.commit(exchange).is_err());
        assert!(memory.is_empty());
        assert_eq!(memory.epoch(), 1);
    }

    #[test]
    fn test_empty_answer_rejected() {
        let mut memory = ConversationMemory::default();
        let exchange = memory.exchange("q", "  ");
        assert!(memory.commit(exchange).is_err());
        assert!(memory.is_empty());
    }

    #[test]
    fn test_render_window() {
        let mut memory = ConversationMemory::new(2);
        for i in 0..2 {
            let exchange = memory.exchange(format!("q{}", i), format!("a{}", i));
            memory.commit(exchange).unwrap();
        }

        assert_eq!(memory.render(), "Human: q1\nAssistant: a1");
        assert_eq!(memory.len(), 4);
        assert_eq!(ConversationMemory::default().render(), "");
    }
}
