//! Tool definitions supplied by the content platform.
//!
//! A tool is an ordered list of inputs the user fills in and an ordered list of
//! prompt templates that get rendered against those inputs before being sent to
//! the generation backend. Both lists are read-only to the rest of the crate.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;

/// A single user-facing input of a tool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolInput {
    #[serde(alias = "input_name")]
    pub name: String,
    #[serde(default, alias = "input_description")]
    pub description: String,
    #[serde(default, alias = "is_required")]
    pub required: bool,
}

impl ToolInput {
    pub fn new(name: &str, description: &str, required: bool) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            required,
        }
    }
}

/// A prompt template with `{{placeholder}}` tokens.
///
/// The text travels as `input_description` (`template` is accepted on input).
/// Any other fields are kept as-is and forwarded to the backend next to the
/// rendered `content`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptTemplate {
    #[serde(rename = "input_description", alias = "template")]
    pub raw_text: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl PromptTemplate {
    pub fn new(raw_text: &str) -> Self {
        Self {
            raw_text: raw_text.to_string(),
            fields: Map::new(),
        }
    }
}

/// Everything needed to run one tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub credits_cost: u32,
    #[serde(default)]
    pub inputs: Vec<ToolInput>,
    #[serde(default)]
    pub prompts: Vec<PromptTemplate>,
}

impl ToolDefinition {
    pub fn new(id: &str, inputs: Vec<ToolInput>, prompts: Vec<PromptTemplate>) -> Self {
        Self {
            id: id.to_string(),
            title: String::new(),
            description: String::new(),
            credits_cost: 0,
            inputs,
            prompts,
        }
    }

    /// Load a tool definition from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read tool definition {:?}", path))?;
        Self::from_json(&content).with_context(|| format!("Invalid tool definition {:?}", path))
    }

    pub fn from_json(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Label for the submit action. Credits are display-only here.
    pub fn submit_label(&self, busy: bool) -> String {
        if busy {
            "Generating...".to_string()
        } else {
            format!("Generate for {} Credits", self.credits_cost)
        }
    }
}
