use thiserror::Error;
use tracing::{info, warn};

use crate::adapters::llm::{ChatRequest, CompletionError, LLMAdapter};
use crate::core::terminal::Prompter;

const RETRY_PROMPT: &str = "\nRetry? (y/n):\n\n> ";

#[derive(Debug, Error)]
pub enum SessionError {
    /// Input ended (EOF) while waiting for the user.
    #[error("input closed")]
    Interrupted,

    /// A request failed and the user chose not to retry it.
    #[error("request to the chat API failed: {0}")]
    RequestAborted(#[source] CompletionError),

    #[error("terminal I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Sends `request` until it succeeds or the user declines to try again.
///
/// Every retry re-sends the identical request; there is no backoff and no
/// upper bound on attempts.
pub async fn request_completions(
    adapter: &dyn LLMAdapter,
    prompter: &mut dyn Prompter,
    request: &ChatRequest,
) -> Result<Vec<String>, SessionError> {
    let mut attempt = 1usize;
    loop {
        match adapter.complete(request).await {
            Ok(candidates) => {
                info!("Received {} candidates on attempt {}", candidates.len(), attempt);
                return Ok(candidates);
            }
            Err(err) => {
                warn!("Completion request failed ({:?}): {}", err.kind(), err);
                prompter.show(&format!("\nFailed to send messages to the chat API: {err}\n"))?;

                let answer = prompter.ask(RETRY_PROMPT)?.ok_or(SessionError::Interrupted)?;
                if !answer.trim().eq_ignore_ascii_case("y") {
                    return Err(SessionError::RequestAborted(err));
                }
                attempt += 1;
            }
        }
    }
}
