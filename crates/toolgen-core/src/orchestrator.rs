//! Bounded-latency generation requests with retry on timeouts.
//!
//! Every attempt re-reads the live input values and re-renders the prompts, so
//! an edit made while a timed-out attempt was in flight is picked up by the
//! next attempt. Attempts never overlap.

use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::client::{GenerationClient, GenerationRequest};
use crate::config::Config;
use crate::error::AttemptError;
use crate::inputs::{missing_inputs, InputReader};
use crate::outcome::GenerationOutcome;
use crate::tool::ToolDefinition;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrchestratorSettings {
    pub request_timeout: Duration,
    pub max_retries: u32,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self::from(&Config::new())
    }
}

impl From<&Config> for OrchestratorSettings {
    fn from(config: &Config) -> Self {
        Self {
            request_timeout: config.request_timeout(),
            max_retries: config.max_retries(),
        }
    }
}

/// Retries used so far in the current generation cycle.
///
/// `attempt_count` counts retries, not the initial attempt, and never exceeds
/// `max_attempts`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryState {
    attempt_count: u32,
    max_attempts: u32,
}

impl RetryState {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            attempt_count: 0,
            max_attempts,
        }
    }

    pub fn attempt_count(&self) -> u32 {
        self.attempt_count
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn can_retry(&self) -> bool {
        self.attempt_count < self.max_attempts
    }

    /// Consume one retry. Returns false once the bound is reached.
    fn try_increment(&mut self) -> bool {
        if !self.can_retry() {
            return false;
        }
        self.attempt_count += 1;
        true
    }

    pub fn reset(&mut self) {
        self.attempt_count = 0;
    }
}

pub struct RequestOrchestrator {
    client: GenerationClient,
    settings: OrchestratorSettings,
}

impl RequestOrchestrator {
    pub fn new(client: GenerationClient, settings: OrchestratorSettings) -> Self {
        Self { client, settings }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            GenerationClient::new(&config.endpoint()),
            OrchestratorSettings::from(config),
        )
    }

    pub fn retry_state(&self) -> RetryState {
        RetryState::new(self.settings.max_retries)
    }

    /// Run one generation cycle to a terminal outcome.
    ///
    /// Missing required inputs fail immediately without touching the network.
    /// Timeout-class failures are retried while `retry` allows; everything
    /// else is terminal on first occurrence. `retry` is reset before returning.
    pub async fn generate(
        &self,
        tool: &ToolDefinition,
        inputs: &InputReader,
        retry: &mut RetryState,
    ) -> GenerationOutcome {
        let missing = missing_inputs(&tool.inputs, &inputs.snapshot());
        if !missing.is_empty() {
            debug!(?missing, "validation failed, request not sent");
            retry.reset();
            return GenerationOutcome::missing_inputs(&missing);
        }

        let outcome = loop {
            let request = GenerationRequest::build(tool, inputs.snapshot());

            match self.attempt(&request).await {
                Ok(text) => {
                    info!(tool_id = %tool.id, retries = retry.attempt_count(), "generation succeeded");
                    break GenerationOutcome::success(text);
                }
                Err(e) if e.is_timeout() && retry.try_increment() => {
                    warn!(
                        "Retrying request ({}/{}) after timeout: {}",
                        retry.attempt_count(),
                        retry.max_attempts(),
                        e
                    );
                }
                Err(e) => {
                    warn!(tool_id = %tool.id, error = %e, "generation failed");
                    break e.into_outcome();
                }
            }
        };

        retry.reset();
        outcome
    }

    /// One request raced against the deadline. When the timer fires it cancels
    /// the shared token, which drops the in-flight request.
    async fn attempt(&self, request: &GenerationRequest) -> Result<String, AttemptError> {
        let cancel = CancellationToken::new();
        let deadline = async {
            tokio::time::sleep(self.settings.request_timeout).await;
            debug!(timeout_ms = self.settings.request_timeout.as_millis() as u64, "deadline reached, cancelling request");
            cancel.cancel();
        };

        tokio::select! {
            result = self.client.send(request, &cancel) => result,
            _ = deadline => Err(AttemptError::Cancelled),
        }
    }
}
