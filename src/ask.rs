//! Answering a question within a session.

use tracing::{debug, error};

use repo_chat_core::prompt::{assemble, PromptBudget};
use repo_chat_core::Result;

use crate::engine::Engine;
use crate::generate::generate;
use crate::retrieve::{retrieve, Retrieval};
use crate::session::Session;

/// Answer given when the session has no active index.
pub const NOT_INDEXED_MESSAGE: &str = "No repository indexed yet. Index one first.";

/// Answer `question` from the session's active index and record the
/// exchange in its conversation.
///
/// Always returns an answer: provider failures are logged and rendered as
/// `"Error: {error}"`, and that text becomes the assistant turn.
pub async fn ask(engine: &Engine, session: &mut Session, question: &str) -> String {
    let answer = match answer(engine, session, question).await {
        Ok(text) => text,
        Err(e) => {
            error!(session = %session.id(), error = %e, "Failed to answer question");
            format!("Error: {}", e)
        }
    };
    session.conversation.record_exchange(question, &answer);
    answer
}

async fn answer(engine: &Engine, session: &Session, question: &str) -> Result<String> {
    let config = engine.config();
    let retrieved = match retrieve(session.index.as_ref(), question, config.retrieval.top_k).await? {
        Retrieval::NotReady => return Ok(NOT_INDEXED_MESSAGE.to_string()),
        Retrieval::Hits(files) => files,
    };

    let budget = PromptBudget::from_tokens(config.retrieval.max_context_tokens);
    let prompt = assemble(question, &retrieved, &budget);
    debug!(
        session = %session.id(),
        model = engine.generator().model_name(),
        files = retrieved.len(),
        prompt_chars = prompt.len(),
        "Assembled prompt"
    );

    generate(engine.generator(), &config.generation.system_prompt, &prompt).await
}
