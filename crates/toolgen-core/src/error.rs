use thiserror::Error;

use crate::outcome::{FailureKind, GenerationOutcome, TIMEOUT_MESSAGE, UNKNOWN_ERROR_MESSAGE};

/// Why a single request attempt failed
#[derive(Debug, Error)]
pub enum AttemptError {
    /// Only the deadline timer cancels an attempt
    #[error("request cancelled before a response arrived")]
    Cancelled,

    #[error("server timed out: {0}")]
    ServerTimeout(String),

    #[error("{0}")]
    Http(String),

    #[error("Invalid response format from server")]
    Format,

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

impl AttemptError {
    pub fn kind(&self) -> FailureKind {
        match self {
            AttemptError::Cancelled | AttemptError::ServerTimeout(_) => FailureKind::Timeout,
            AttemptError::Transport(e) if e.is_timeout() => FailureKind::Timeout,
            AttemptError::Http(_) => FailureKind::Network,
            AttemptError::Format => FailureKind::Format,
            AttemptError::Transport(_) => FailureKind::Unknown,
        }
    }

    pub fn is_timeout(&self) -> bool {
        self.kind() == FailureKind::Timeout
    }

    /// Terminal outcome for this error once no more attempts are allowed
    pub fn into_outcome(self) -> GenerationOutcome {
        let kind = self.kind();
        let message = match (kind, &self) {
            (FailureKind::Timeout, _) => TIMEOUT_MESSAGE.to_string(),
            (_, AttemptError::Transport(e)) => best_effort_message(e),
            _ => self.to_string(),
        };
        GenerationOutcome::failure(kind, message)
    }
}

/// Prefer the error's own message, then its source, else a generic fallback
fn best_effort_message(err: &reqwest::Error) -> String {
    let message = err.to_string();
    if !message.trim().is_empty() {
        return message;
    }
    std::error::Error::source(err)
        .map(|source| source.to_string())
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| UNKNOWN_ERROR_MESSAGE.to_string())
}

/// Misuse of a generation session
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("No tool loaded")]
    NoToolLoaded,

    #[error("A generation is already in progress")]
    Busy,

    #[error("Inputs are locked while generating")]
    InputsLocked,
}
