pub mod client;
pub mod config;
pub mod error;
pub mod inputs;
pub mod orchestrator;
pub mod outcome;
pub mod reveal;
pub mod session;
pub mod template;
pub mod tool;

// Re-export main types for convenience
pub use client::{GenerationClient, GenerationRequest, RenderedPrompt};
pub use config::Config;
pub use error::{AttemptError, SessionError};
pub use inputs::{FocusTarget, InputCollector, InputReader, InputValues};
pub use orchestrator::{OrchestratorSettings, RequestOrchestrator, RetryState};
pub use outcome::{FailureKind, GenerationOutcome};
pub use reveal::{ProgressiveRevealer, RevealCursor, RevealStream};
pub use session::{GenerationSession, Phase};
pub use template::render;
pub use tool::{PromptTemplate, ToolDefinition, ToolInput};
