//! User-entered input values and required-field validation.

use std::collections::BTreeMap;
use tokio::sync::watch;

use crate::tool::ToolInput;

/// Input name -> entered value
pub type InputValues = BTreeMap<String, String>;

/// Where focus should go after the user confirms a field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusTarget {
    /// Index into the tool's input list
    Input(usize),
    /// All required inputs are filled; the submit action is ready
    Submit,
}

/// Holds the current input values for the loaded tool.
///
/// Values live in a watch channel so an in-flight generation can take a fresh
/// snapshot on every attempt while the user keeps editing.
#[derive(Debug)]
pub struct InputCollector {
    values: watch::Sender<InputValues>,
}

/// Read-only view of an [`InputCollector`]'s values
#[derive(Debug, Clone)]
pub struct InputReader {
    values: watch::Receiver<InputValues>,
}

impl InputReader {
    pub fn snapshot(&self) -> InputValues {
        self.values.borrow().clone()
    }
}

impl Default for InputCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl InputCollector {
    pub fn new() -> Self {
        let (values, _) = watch::channel(InputValues::new());
        Self { values }
    }

    /// Overwrite a value. Nothing is validated at write time.
    pub fn set_value(&self, name: &str, value: &str) {
        self.values.send_modify(|values| {
            values.insert(name.to_string(), value.to_string());
        });
    }

    pub fn value(&self, name: &str) -> Option<String> {
        self.values.borrow().get(name).cloned()
    }

    pub fn clear(&self) {
        self.values.send_modify(|values| values.clear());
    }

    pub fn is_empty(&self) -> bool {
        self.values.borrow().is_empty()
    }

    pub fn snapshot(&self) -> InputValues {
        self.values.borrow().clone()
    }

    pub fn reader(&self) -> InputReader {
        InputReader {
            values: self.values.subscribe(),
        }
    }

    /// Names of required inputs that are absent or empty, in input order
    pub fn validate(&self, tool_inputs: &[ToolInput]) -> Vec<String> {
        missing_inputs(tool_inputs, &self.values.borrow())
    }

    /// Focus target after confirming the field at `index`.
    ///
    /// Moves to the next unfilled required input (wrapping around), or to the
    /// submit action once every required input has a value. Never submits.
    pub fn confirm(&self, index: usize, tool_inputs: &[ToolInput]) -> FocusTarget {
        let values = self.values.borrow();
        let len = tool_inputs.len();

        (1..=len)
            .map(|offset| (index + offset) % len)
            .find(|&i| {
                let input = &tool_inputs[i];
                input.required && is_blank(values.get(&input.name))
            })
            .map(FocusTarget::Input)
            .unwrap_or(FocusTarget::Submit)
    }
}

pub(crate) fn missing_inputs(tool_inputs: &[ToolInput], values: &InputValues) -> Vec<String> {
    tool_inputs
        .iter()
        .filter(|input| input.required && is_blank(values.get(&input.name)))
        .map(|input| input.name.clone())
        .collect()
}

fn is_blank(value: Option<&String>) -> bool {
    value.map_or(true, |v| v.is_empty())
}
