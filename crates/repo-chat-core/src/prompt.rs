//! Prompt assembly for retrieval-augmented answers.
//!
//! Retrieved files are rendered as labeled blocks in similarity order:
//!
//! ```text
//! File: src/app.py
//! <file content>
//! ```
//!
//! Blocks are joined by a blank line and followed by the question. File
//! content is bounded by a [`PromptBudget`]: files are admitted in order
//! until the budget runs out, and the file that crosses the limit is cut
//! from the end and marked with [`TRUNCATED_MARKER`]. Files after that are
//! left out.
//!
//! # Example
//!
//! ```rust
//! use repo_chat_core::prompt::{assemble, PromptBudget, RetrievedFile};
//!
//! let files = vec![RetrievedFile::new("a.py", "def foo(): pass")];
//! let prompt = assemble("What does foo do?", &files, &PromptBudget::from_tokens(100));
//! assert!(prompt.contains("File: a.py\ndef foo(): pass\n"));
//! assert!(prompt.ends_with("Question:\nWhat does foo do?"));
//! ```

use crate::generator::ChatMessage;

/// Approximate characters-per-token ratio used to turn token budgets into
/// character budgets.
pub const CHARS_PER_TOKEN: usize = 4;

/// Appended after a file whose content was cut to fit the budget.
pub const TRUNCATED_MARKER: &str = "[truncated]";

/// Context text used when nothing was retrieved.
pub const NO_CONTEXT: &str = "(no matching files)";

/// Default system framing for the answer generator.
pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a helpful assistant for understanding code repositories.";

const PREAMBLE: &str = "Answer the user's question based on the repository contents below.";

/// A retrieved file, flattened for prompt assembly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrievedFile {
    pub path: String,
    pub content: String,
}

impl RetrievedFile {
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }
}

/// Upper bound on the amount of file content placed in a prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromptBudget {
    max_chars: usize,
}

impl PromptBudget {
    pub fn from_tokens(max_tokens: usize) -> Self {
        Self {
            max_chars: max_tokens.saturating_mul(CHARS_PER_TOKEN),
        }
    }

    pub fn from_chars(max_chars: usize) -> Self {
        Self { max_chars }
    }

    /// Budget for file content, in bytes of UTF-8 text.
    pub fn max_chars(&self) -> usize {
        self.max_chars
    }
}

/// Build the user prompt for `question` from the retrieved files.
pub fn assemble(question: &str, retrieved: &[RetrievedFile], budget: &PromptBudget) -> String {
    let context = assemble_context(retrieved, budget);
    format!(
        "{}\n\nContext:\n{}\n\nQuestion:\n{}",
        PREAMBLE, context, question
    )
}

/// Render the `File:` blocks within the budget.
pub fn assemble_context(retrieved: &[RetrievedFile], budget: &PromptBudget) -> String {
    let mut remaining = budget.max_chars();
    let mut blocks = Vec::with_capacity(retrieved.len());

    for file in retrieved {
        if remaining == 0 {
            break;
        }
        if file.content.len() <= remaining {
            remaining -= file.content.len();
            blocks.push(format!("File: {}\n{}\n", file.path, file.content));
        } else {
            let kept = truncate_to_boundary(&file.content, remaining);
            remaining = 0;
            blocks.push(format!(
                "File: {}\n{}\n{}\n",
                file.path, kept, TRUNCATED_MARKER
            ));
        }
    }

    if blocks.is_empty() {
        NO_CONTEXT.to_string()
    } else {
        blocks.join("\n\n")
    }
}

/// The two-message request sent to the answer generator.
pub fn build_messages(system_prompt: &str, prompt: &str) -> Vec<ChatMessage> {
    vec![ChatMessage::system(system_prompt), ChatMessage::user(prompt)]
}

/// Longest prefix of `s` that is at most `max_bytes` long and ends on a
/// char boundary.
pub fn truncate_to_boundary(s: &str, max_bytes: usize) -> &str {
    if max_bytes >= s.len() {
        return s;
    }
    let mut i = max_bytes;
    while i > 0 && !s.is_char_boundary(i) {
        i -= 1;
    }
    &s[..i]
}
