//! Typed errors for the qa-core crate.

use thiserror::Error;

/// Rejected transitions of the turn-taking state machine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// Submitted text was empty or whitespace.
    #[error("message is empty")]
    EmptyInput,

    /// A response is still being generated for this session.
    #[error("please wait for the current response to complete before asking another question")]
    AwaitingResponse,

    /// `complete`/`fail` was called while no response was pending.
    #[error("no response is pending")]
    NotPending,

    /// The session was reset after the generation was started.
    #[error("turn ticket {got} is stale (current {current})")]
    StaleTicket { got: u64, current: u64 },
}

#[derive(Debug, Error)]
pub enum QaError {
    /// The question was empty or whitespace.
    #[error("question must not be empty")]
    EmptyQuestion,

    /// Errors from the model client.
    #[error("model error: {0}")]
    Llm(#[from] ai_llm_service::AiLlmError),
}
