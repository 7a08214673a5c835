use serde::{Deserialize, Serialize};

pub const TIMEOUT_MESSAGE: &str = "The request timed out. The AI model is taking longer than expected to respond. Please try again with a simpler prompt or try again later.";
pub const INVALID_FORMAT_MESSAGE: &str = "Invalid response format from server";
pub const UNKNOWN_ERROR_MESSAGE: &str = "An unexpected error occurred during generation";

/// Marker prepended to failure messages shown in the output area
pub const ERROR_MARKER: &str = "Error: ";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureKind {
    Validation,
    Timeout,
    Network,
    Format,
    Unknown,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Validation => "validation",
            FailureKind::Timeout => "timeout",
            FailureKind::Network => "network",
            FailureKind::Format => "format",
            FailureKind::Unknown => "unknown",
        }
    }

    /// Only timeouts are worth another attempt
    pub fn is_retryable(&self) -> bool {
        matches!(self, FailureKind::Timeout)
    }
}

/// Terminal result of one generation cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GenerationOutcome {
    Success { text: String },
    Failure { kind: FailureKind, message: String },
}

impl GenerationOutcome {
    pub fn success(text: impl Into<String>) -> Self {
        GenerationOutcome::Success { text: text.into() }
    }

    pub fn failure(kind: FailureKind, message: impl Into<String>) -> Self {
        GenerationOutcome::Failure {
            kind,
            message: message.into(),
        }
    }

    pub fn missing_inputs(names: &[String]) -> Self {
        Self::failure(
            FailureKind::Validation,
            format!("Missing required inputs: {}", names.join(", ")),
        )
    }

    pub fn is_success(&self) -> bool {
        matches!(self, GenerationOutcome::Success { .. })
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            GenerationOutcome::Success { .. } => None,
            GenerationOutcome::Failure { kind, .. } => Some(*kind),
        }
    }

    /// Text for the output area; failures carry the error marker
    pub fn display_text(&self) -> String {
        match self {
            GenerationOutcome::Success { text } => text.clone(),
            GenerationOutcome::Failure { message, .. } => format!("{}{}", ERROR_MARKER, message),
        }
    }
}
