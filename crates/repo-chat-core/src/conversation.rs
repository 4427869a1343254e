//! Per-session conversation history.
//!
//! A [`Conversation`] is an append-only list of [`Turn`]s. Every question
//! adds exactly one user turn followed by one assistant turn, including when
//! the assistant content is an error message. The only way to shrink it is
//! [`Conversation::reset`], which happens when a new repository is indexed.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

#[derive(Debug, Clone, Default)]
pub struct Conversation {
    turns: Vec<Turn>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, role: Role, content: impl Into<String>) {
        self.turns.push(Turn {
            role,
            content: content.into(),
        });
    }

    /// Record one question/answer round-trip, user turn first.
    pub fn record_exchange(&mut self, question: &str, answer: &str) {
        self.append(Role::User, question);
        self.append(Role::Assistant, answer);
    }

    pub fn reset(&mut self) {
        self.turns.clear();
    }

    pub fn history(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}
