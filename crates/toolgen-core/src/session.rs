//! UI-agnostic lifecycle of one tool's generations.
//!
//! `Idle -> Validating -> Generating -> Revealing -> Settled -> Idle`. The
//! current [`Phase`] is published on a watch channel so any front-end (CLI,
//! desktop, web bridge) can render it without knowing how it got there.

use futures_util::StreamExt;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::config::Config;
use crate::error::SessionError;
use crate::inputs::{FocusTarget, InputCollector, InputReader};
use crate::orchestrator::RequestOrchestrator;
use crate::outcome::GenerationOutcome;
use crate::reveal::ProgressiveRevealer;
use crate::tool::ToolDefinition;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Validating,
    Generating,
    /// The full text is already known; `displayed` is the animated prefix
    Revealing { full_text: String, displayed: String },
    Settled(GenerationOutcome),
}

impl Phase {
    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            Phase::Validating | Phase::Generating | Phase::Revealing { .. }
        )
    }

    pub fn inputs_locked(&self) -> bool {
        matches!(self, Phase::Generating | Phase::Revealing { .. })
    }

    /// What the output area shows in this phase
    pub fn display_text(&self) -> Option<String> {
        match self {
            Phase::Idle | Phase::Validating | Phase::Generating => None,
            Phase::Revealing { displayed, .. } => Some(displayed.clone()),
            Phase::Settled(outcome) => Some(outcome.display_text()),
        }
    }
}

pub struct GenerationSession {
    orchestrator: Arc<RequestOrchestrator>,
    revealer: ProgressiveRevealer,
    inputs: InputCollector,
    tool: Option<Arc<ToolDefinition>>,
    phase: Arc<watch::Sender<Phase>>,
    cycle: Option<JoinHandle<()>>,
}

impl GenerationSession {
    pub fn new(orchestrator: RequestOrchestrator, revealer: ProgressiveRevealer) -> Self {
        let (phase, _) = watch::channel(Phase::Idle);
        Self {
            orchestrator: Arc::new(orchestrator),
            revealer,
            inputs: InputCollector::new(),
            tool: None,
            phase: Arc::new(phase),
            cycle: None,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            RequestOrchestrator::from_config(config),
            ProgressiveRevealer::new(config.reveal_tick()),
        )
    }

    /// Switch to a new tool: drops any running cycle and clears entered values
    pub fn load_tool(&mut self, tool: ToolDefinition) {
        debug!(tool_id = %tool.id, "loading tool");
        self.cancel_cycle();
        self.inputs.clear();
        self.tool = Some(Arc::new(tool));
        self.phase.send_replace(Phase::Idle);
    }

    pub fn tool(&self) -> Option<&ToolDefinition> {
        self.tool.as_deref()
    }

    pub fn phase(&self) -> Phase {
        self.phase.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Phase> {
        self.phase.subscribe()
    }

    pub fn display_text(&self) -> Option<String> {
        self.phase.borrow().display_text()
    }

    pub fn set_value(&self, name: &str, value: &str) -> Result<(), SessionError> {
        if self.phase.borrow().inputs_locked() {
            return Err(SessionError::InputsLocked);
        }
        self.inputs.set_value(name, value);
        Ok(())
    }

    pub fn value(&self, name: &str) -> Option<String> {
        self.inputs.value(name)
    }

    /// Where focus goes after the user confirms the input at `index`
    pub fn confirm(&self, index: usize) -> Result<FocusTarget, SessionError> {
        let tool = self.tool.as_ref().ok_or(SessionError::NoToolLoaded)?;
        Ok(self.inputs.confirm(index, &tool.inputs))
    }

    /// Whether the submit action should be enabled
    pub fn submit_ready(&self) -> bool {
        self.tool.is_some() && !self.phase.borrow().is_busy() && !self.inputs.is_empty()
    }

    pub fn submit_label(&self) -> Option<String> {
        let busy = self.phase.borrow().is_busy();
        self.tool.as_ref().map(|tool| tool.submit_label(busy))
    }

    /// Start a generation cycle.
    ///
    /// Validation runs synchronously; missing inputs settle the cycle right
    /// away. Otherwise the request runs in a background task and the phase
    /// moves on its own through `Generating` and `Revealing` to `Settled`.
    pub fn submit(&mut self) -> Result<(), SessionError> {
        let tool = self.tool.clone().ok_or(SessionError::NoToolLoaded)?;
        if self.phase.borrow().is_busy() {
            return Err(SessionError::Busy);
        }

        self.cancel_cycle();
        self.phase.send_replace(Phase::Validating);

        let missing = self.inputs.validate(&tool.inputs);
        if !missing.is_empty() {
            debug!(?missing, "submit blocked by validation");
            self.phase
                .send_replace(Phase::Settled(GenerationOutcome::missing_inputs(&missing)));
            return Ok(());
        }

        self.phase.send_replace(Phase::Generating);
        self.cycle = Some(tokio::spawn(run_cycle(
            Arc::clone(&self.orchestrator),
            tool,
            self.inputs.reader(),
            self.revealer.clone(),
            Arc::clone(&self.phase),
        )));
        Ok(())
    }

    /// Show the full text now instead of waiting for the animation.
    /// Returns false when nothing is being revealed.
    pub fn skip_reveal(&self) -> bool {
        let full_text = match &*self.phase.borrow() {
            Phase::Revealing { full_text, .. } => full_text.clone(),
            _ => return false,
        };
        self.revealer.stop();
        self.phase
            .send_replace(Phase::Settled(GenerationOutcome::success(full_text)));
        true
    }

    /// Back to `Idle`, clearing output but keeping entered values
    pub fn reset(&mut self) -> Result<(), SessionError> {
        if self.phase.borrow().is_busy() {
            return Err(SessionError::Busy);
        }
        self.cancel_cycle();
        self.phase.send_replace(Phase::Idle);
        Ok(())
    }

    /// Wait for the current cycle to settle. `None` if nothing is running.
    pub async fn settled(&self) -> Option<GenerationOutcome> {
        let mut rx = self.phase.subscribe();
        loop {
            let phase = rx.borrow_and_update().clone();
            match phase {
                Phase::Settled(outcome) => return Some(outcome),
                Phase::Idle => return None,
                _ => {}
            }
            if rx.changed().await.is_err() {
                return None;
            }
        }
    }

    fn cancel_cycle(&mut self) {
        self.revealer.stop();
        if let Some(cycle) = self.cycle.take() {
            cycle.abort();
        }
    }
}

impl Drop for GenerationSession {
    fn drop(&mut self) {
        self.cancel_cycle();
    }
}

async fn run_cycle(
    orchestrator: Arc<RequestOrchestrator>,
    tool: Arc<ToolDefinition>,
    inputs: InputReader,
    revealer: ProgressiveRevealer,
    phase: Arc<watch::Sender<Phase>>,
) {
    let mut retry = orchestrator.retry_state();
    let full_text = match orchestrator.generate(&tool, &inputs, &mut retry).await {
        GenerationOutcome::Success { text } => text,
        failure => {
            phase.send_replace(Phase::Settled(failure));
            return;
        }
    };

    // Register the reveal before anyone can see `Revealing` and try to stop it
    let mut prefixes = revealer.start(full_text.clone());
    phase.send_replace(Phase::Revealing {
        full_text: full_text.clone(),
        displayed: String::new(),
    });
    while let Some(prefix) = prefixes.next().await {
        phase.send_if_modified(|current| match current {
            Phase::Revealing { displayed, .. } => {
                *displayed = prefix;
                true
            }
            _ => false,
        });
    }

    // Settle from the source text; the cursor may have been stopped early
    phase.send_if_modified(|current| {
        if matches!(current, Phase::Revealing { .. }) {
            *current = Phase::Settled(GenerationOutcome::success(full_text));
            true
        } else {
            false
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::GenerationClient;
    use crate::orchestrator::OrchestratorSettings;
    use crate::outcome::FailureKind;
    use crate::tool::{PromptTemplate, ToolInput};
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn tool() -> ToolDefinition {
        let mut tool = ToolDefinition::new(
            "tool-1",
            vec![
                ToolInput::new("topic", "", true),
                ToolInput::new("tone", "", false),
            ],
            vec![PromptTemplate::new("Write about {{topic}}")],
        );
        tool.credits_cost = 2;
        tool
    }

    fn session(endpoint: &str, tick: Duration) -> GenerationSession {
        let orchestrator = RequestOrchestrator::new(
            GenerationClient::new(endpoint),
            OrchestratorSettings {
                request_timeout: Duration::from_secs(5),
                max_retries: 2,
            },
        );
        let mut session = GenerationSession::new(orchestrator, ProgressiveRevealer::new(tick));
        session.load_tool(tool());
        session
    }

    async fn settle(session: &GenerationSession) -> GenerationOutcome {
        tokio::time::timeout(Duration::from_secs(10), session.settled())
            .await
            .expect("cycle should settle")
            .expect("cycle should be running")
    }

    async fn mock_output(server: &MockServer, output: &str) {
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"output": output})))
            .mount(server)
            .await;
    }

    #[test]
    fn test_phase_display_text() {
        assert_eq!(Phase::Idle.display_text(), None);
        assert_eq!(Phase::Generating.display_text(), None);
        let revealing = Phase::Revealing {
            full_text: "Hello".into(),
            displayed: "He".into(),
        };
        assert_eq!(revealing.display_text().as_deref(), Some("He"));
        let failed = Phase::Settled(GenerationOutcome::failure(FailureKind::Network, "boom"));
        assert_eq!(failed.display_text().as_deref(), Some("Error: boom"));
    }

    #[tokio::test]
    async fn test_submit_without_tool() {
        let orchestrator = RequestOrchestrator::new(
            GenerationClient::new("http://127.0.0.1:1"),
            OrchestratorSettings::default(),
        );
        let mut session = GenerationSession::new(orchestrator, ProgressiveRevealer::new(Duration::from_millis(1)));
        assert_eq!(session.submit(), Err(SessionError::NoToolLoaded));
        assert_eq!(session.confirm(0), Err(SessionError::NoToolLoaded));
        assert!(!session.submit_ready());
    }

    #[tokio::test]
    async fn test_validation_failure_settles_immediately() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let mut session = session(&server.uri(), Duration::from_millis(1));
        session.set_value("tone", "dry").unwrap();
        session.submit().unwrap();

        assert_eq!(
            session.phase(),
            Phase::Settled(GenerationOutcome::missing_inputs(&["topic".to_string()]))
        );
        assert_eq!(
            session.display_text().as_deref(),
            Some("Error: Missing required inputs: topic")
        );
    }

    #[tokio::test]
    async fn test_success_reveals_then_settles() {
        let server = MockServer::start().await;
        mock_output(&server, "Hello world").await;

        let mut session = session(&server.uri(), Duration::from_millis(1));
        let mut rx = session.subscribe();
        session.set_value("topic", "cats").unwrap();
        session.submit().unwrap();
        assert_eq!(session.phase(), Phase::Generating);
        assert_eq!(session.submit_label().as_deref(), Some("Generating..."));

        let mut seen_revealing = false;
        loop {
            rx.changed().await.unwrap();
            match &*rx.borrow_and_update() {
                Phase::Revealing { full_text, displayed } => {
                    seen_revealing = true;
                    assert_eq!(full_text, "Hello world");
                    assert!(full_text.starts_with(displayed.as_str()));
                }
                Phase::Settled(_) => break,
                _ => {}
            }
        }

        assert!(seen_revealing);
        assert_eq!(session.phase(), Phase::Settled(GenerationOutcome::success("Hello world")));
        assert_eq!(session.display_text().as_deref(), Some("Hello world"));
        assert_eq!(session.submit_label().as_deref(), Some("Generate for 2 Credits"));
    }

    #[tokio::test]
    async fn test_inputs_locked_while_generating() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"output": "ok"}))
                    .set_delay(Duration::from_millis(300)),
            )
            .mount(&server)
            .await;

        let mut session = session(&server.uri(), Duration::from_millis(1));
        session.set_value("topic", "cats").unwrap();
        session.submit().unwrap();

        assert_eq!(session.set_value("topic", "dogs"), Err(SessionError::InputsLocked));
        assert_eq!(session.submit(), Err(SessionError::Busy));
        assert_eq!(session.reset(), Err(SessionError::Busy));
        assert!(!session.submit_ready());

        settle(&session).await;
        assert!(session.set_value("topic", "dogs").is_ok());
    }

    #[tokio::test]
    async fn test_skip_reveal_shows_full_text() {
        let server = MockServer::start().await;
        mock_output(&server, "A fairly long answer that takes a while to reveal").await;

        // Slow cadence so the reveal is still running when we skip
        let mut session = session(&server.uri(), Duration::from_millis(50));
        let mut rx = session.subscribe();
        session.set_value("topic", "cats").unwrap();
        session.submit().unwrap();

        loop {
            rx.changed().await.unwrap();
            if matches!(&*rx.borrow_and_update(), Phase::Revealing { .. }) {
                break;
            }
        }

        assert!(session.skip_reveal());
        assert_eq!(
            session.phase(),
            Phase::Settled(GenerationOutcome::success(
                "A fairly long answer that takes a while to reveal"
            ))
        );
        assert!(!session.skip_reveal());

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(
            session.display_text().as_deref(),
            Some("A fairly long answer that takes a while to reveal")
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_skip_on_first_revealing_stops_ticks() {
        let server = MockServer::start().await;
        mock_output(&server, "Skipped the moment it became visible").await;

        let mut session = session(&server.uri(), Duration::from_millis(5));
        let mut rx = session.subscribe();
        session.set_value("topic", "cats").unwrap();
        session.submit().unwrap();

        loop {
            rx.changed().await.unwrap();
            let revealing = matches!(&*rx.borrow_and_update(), Phase::Revealing { .. });
            if revealing {
                assert!(session.skip_reveal());
                break;
            }
        }

        assert!(!session.revealer.is_running());
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!session.revealer.is_running());
        assert_eq!(
            session.phase(),
            Phase::Settled(GenerationOutcome::success("Skipped the moment it became visible"))
        );
    }

    #[tokio::test]
    async fn test_reset_keeps_values() {
        let server = MockServer::start().await;
        mock_output(&server, "ok").await;

        let mut session = session(&server.uri(), Duration::from_millis(1));
        session.set_value("topic", "cats").unwrap();
        session.submit().unwrap();
        settle(&session).await;

        session.reset().unwrap();
        assert_eq!(session.phase(), Phase::Idle);
        assert_eq!(session.display_text(), None);
        assert_eq!(session.value("topic").as_deref(), Some("cats"));

        // Re-entrant: a second cycle runs from Idle again
        session.submit().unwrap();
        assert_eq!(settle(&session).await, GenerationOutcome::success("ok"));
    }

    #[tokio::test]
    async fn test_load_tool_clears_values_and_cancels_cycle() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"output": "stale"}))
                    .set_delay(Duration::from_millis(200)),
            )
            .mount(&server)
            .await;

        let mut session = session(&server.uri(), Duration::from_millis(1));
        session.set_value("topic", "cats").unwrap();
        session.submit().unwrap();

        session.load_tool(tool());
        assert_eq!(session.phase(), Phase::Idle);
        assert_eq!(session.value("topic"), None);

        // The aborted cycle must not publish its late result
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(session.phase(), Phase::Idle);
    }

    #[tokio::test]
    async fn test_confirm_and_submit_ready() {
        let session = session("http://127.0.0.1:1", Duration::from_millis(1));
        assert!(!session.submit_ready());
        assert_eq!(session.confirm(1), Ok(FocusTarget::Input(0)));

        session.set_value("topic", "cats").unwrap();
        assert!(session.submit_ready());
        assert_eq!(session.confirm(0), Ok(FocusTarget::Submit));
    }
}
