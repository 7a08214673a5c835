use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::AttemptError;
use crate::inputs::InputValues;
use crate::template;
use crate::tool::{PromptTemplate, ToolDefinition};

/// A prompt template rendered against one snapshot of input values
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedPrompt {
    #[serde(flatten)]
    pub template: PromptTemplate,
    pub content: String,
}

/// Body of one generation attempt
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    pub tool_id: String,
    pub inputs: InputValues,
    pub prompts: Vec<RenderedPrompt>,
}

impl GenerationRequest {
    /// Render every prompt of `tool` against `values`, keeping prompt order
    pub fn build(tool: &ToolDefinition, values: InputValues) -> Self {
        let prompts = tool
            .prompts
            .iter()
            .map(|prompt| RenderedPrompt {
                template: prompt.clone(),
                content: template::render(&prompt.raw_text, &values),
            })
            .collect();

        Self {
            tool_id: tool.id.clone(),
            inputs: values,
            prompts,
        }
    }

    pub fn rendered_prompts(&self) -> impl Iterator<Item = &str> {
        self.prompts.iter().map(|p| p.content.as_str())
    }
}

/// Talks to the generation endpoint
#[derive(Clone)]
pub struct GenerationClient {
    client: Client,
    endpoint: String,
}

impl GenerationClient {
    pub fn new(endpoint: &str) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.to_string(),
        }
    }

    /// Send one attempt. Returns early with [`AttemptError::Cancelled`] once
    /// `cancel` fires; the in-flight request is dropped with it.
    pub async fn send(
        &self,
        request: &GenerationRequest,
        cancel: &CancellationToken,
    ) -> Result<String, AttemptError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(AttemptError::Cancelled),
            result = self.send_inner(request) => result,
        }
    }

    async fn send_inner(&self, request: &GenerationRequest) -> Result<String, AttemptError> {
        debug!(endpoint = %self.endpoint, tool_id = %request.tool_id, "dispatching generation request");

        let response = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .header("Accept", "application/json")
            .json(request)
            .send()
            .await?;

        let status = response.status();
        // Unreadable or non-JSON bodies are treated the same as missing fields
        let body: Option<Value> = response.json().await.ok();

        classify(status, body)
    }
}

fn classify(status: StatusCode, body: Option<Value>) -> Result<String, AttemptError> {
    if !status.is_success() {
        let message = error_message(body.as_ref());

        if status == StatusCode::GATEWAY_TIMEOUT
            || message.as_deref().is_some_and(|m| m.contains("timeout"))
        {
            return Err(AttemptError::ServerTimeout(
                message.unwrap_or_else(|| status.to_string()),
            ));
        }

        return Err(AttemptError::Http(message.unwrap_or_else(|| {
            format!(
                "Failed to generate response: {} {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or_default()
            )
            .trim_end()
            .to_string()
        })));
    }

    body.as_ref()
        .and_then(|b| b.get("output"))
        .and_then(Value::as_str)
        .filter(|output| !output.is_empty())
        .map(str::to_string)
        .ok_or(AttemptError::Format)
}

/// `error` may be a plain string or an object carrying `message`
fn error_message(body: Option<&Value>) -> Option<String> {
    let message = match body?.get("error")? {
        Value::String(s) => s.clone(),
        Value::Object(map) => match map.get("message")? {
            Value::String(s) => s.clone(),
            Value::Null => return None,
            other => other.to_string(),
        },
        _ => return None,
    };

    (!message.is_empty()).then_some(message)
}
