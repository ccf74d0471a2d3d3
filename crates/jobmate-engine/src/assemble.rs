use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::errors::EngineError;

/// Immutable template for one kind of task the engine can run.
///
/// `context_fields` names the inputs the template requires and fixes the
/// order in which they are serialized into the prompt, independent of how
/// the values are supplied.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskConfig {
    pub instruction: String,
    pub context_fields: Vec<String>,
    pub temperature: f32,
    pub max_output_tokens: u32,
}

impl TaskConfig {
    pub fn new(instruction: impl Into<String>) -> Self {
        Self {
            instruction: instruction.into(),
            context_fields: Vec::new(),
            temperature: 0.7,
            max_output_tokens: 1024,
        }
    }

    /// Appends one required context field.
    pub fn context_field(mut self, name: impl Into<String>) -> Self {
        self.context_fields.push(name.into());
        self
    }

    /// Replaces the required context fields.
    pub fn context_fields<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.context_fields = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn max_output_tokens(mut self, max_output_tokens: u32) -> Self {
        self.max_output_tokens = max_output_tokens;
        self
    }
}

/// Run-time values for a template's context fields.
///
/// Keys the template does not name are ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContextValues(HashMap<String, String>);

impl ContextValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }
}

/// Assembles the full prompt for a task: the instruction, then one tagged
/// section per context field in template order, separated by blank lines.
///
/// Fails with [`EngineError::MissingContextField`] on the first field that
/// has no value. An empty string is a valid value and yields an empty
/// section body.
pub fn assemble_prompt(task: &TaskConfig, values: &ContextValues) -> Result<String, EngineError> {
    let mut prompt = task.instruction.clone();
    for name in &task.context_fields {
        let value = values
            .get(name)
            .ok_or_else(|| EngineError::missing_context_field(name.clone()))?;
        let tag = name.to_uppercase();
        prompt.push_str(&format!("\n\n<{tag}>\n{value}\n</{tag}>"));
    }
    Ok(prompt)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn letter_task() -> TaskConfig {
        TaskConfig::new("Draft a short cover letter.")
            .context_field("job")
            .context_field("profile")
    }

    #[test]
    fn sections_follow_template_order() {
        let values = ContextValues::new()
            .with("profile", "Rust developer, 6 years.")
            .with("job", "Backend engineer at Acme.");
        let prompt = assemble_prompt(&letter_task(), &values).unwrap();
        assert_eq!(
            prompt,
            "Draft a short cover letter.\n\n\
             <JOB>\nBackend engineer at Acme.\n</JOB>\n\n\
             <PROFILE>\nRust developer, 6 years.\n</PROFILE>"
        );
    }

    #[test]
    fn missing_field_names_the_field() {
        let values = ContextValues::new().with("job", "Backend engineer at Acme.");
        let err = assemble_prompt(&letter_task(), &values).unwrap_err();
        match err {
            EngineError::MissingContextField { field } => assert_eq!(field, "profile"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn empty_value_is_valid() {
        let task = TaskConfig::new("Summarize.").context_field("notes");
        let values = ContextValues::new().with("notes", "");
        let prompt = assemble_prompt(&task, &values).unwrap();
        assert_eq!(prompt, "Summarize.\n\n<NOTES>\n\n</NOTES>");
    }

    #[test]
    fn extra_values_are_ignored() {
        let task = TaskConfig::new("Summarize.").context_field("job");
        let values = ContextValues::new()
            .with("job", "posting")
            .with("unused", "never serialized");
        let prompt = assemble_prompt(&task, &values).unwrap();
        assert!(!prompt.contains("never serialized"));
    }

    #[test]
    fn no_fields_yields_bare_instruction() {
        let task = TaskConfig::new("Say hello.");
        let prompt = assemble_prompt(&task, &ContextValues::new()).unwrap();
        assert_eq!(prompt, "Say hello.");
    }
}
