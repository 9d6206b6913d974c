//! Audit request construction.
//!
//! [`PayloadBuilder`] turns raw input text, a stage's instructions and its
//! response schema into an immutable [`AuditRequest`]. It performs no I/O and
//! is deterministic: identical inputs always yield identical requests.

use serde::Serialize;
use thiserror::Error;

use crate::schema::{SchemaError, SchemaSpec};

/// Placeholder replaced with the task text inside a user template.
pub const INPUT_PLACEHOLDER: &str = "{input}";

/// Errors from request construction.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error("task input is empty")]
    EmptyInput,

    #[error("invalid response schema: {0}")]
    InvalidSchema(#[from] SchemaError),
}

/// Prompt text a stage supplies to the builder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Instructions {
    /// System instruction framing the model's role
    pub system: String,

    /// User query template; `{input}` marks where the task text goes
    pub user_template: String,
}

impl Instructions {
    /// Create instructions from a system prompt and a user template.
    pub fn new(system: impl Into<String>, user_template: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user_template: user_template.into(),
        }
    }

    /// Render the user query for `task_text`.
    ///
    /// Templates without a placeholder get the text appended after a blank line.
    pub fn render_user_query(&self, task_text: &str) -> String {
        if self.user_template.contains(INPUT_PLACEHOLDER) {
            self.user_template.replace(INPUT_PLACEHOLDER, task_text)
        } else {
            format!("{}\n\n{}", self.user_template, task_text)
        }
    }
}

/// A fully-built request for one stage invocation. Never mutated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditRequest {
    task_text: String,
    system_instruction: String,
    user_query: String,
    schema: SchemaSpec,
}

impl AuditRequest {
    /// The raw input the request was built from.
    pub fn task_text(&self) -> &str {
        &self.task_text
    }

    /// System instruction sent alongside the query.
    pub fn system_instruction(&self) -> &str {
        &self.system_instruction
    }

    /// The rendered user query.
    pub fn user_query(&self) -> &str {
        &self.user_query
    }

    /// Schema the response must follow.
    pub fn schema(&self) -> &SchemaSpec {
        &self.schema
    }
}

/// Builds [`AuditRequest`]s.
#[derive(Debug, Default, Clone, Copy)]
pub struct PayloadBuilder;

impl PayloadBuilder {
    /// Create a builder.
    pub fn new() -> Self {
        Self
    }

    /// Build a request from task text, instructions and schema.
    ///
    /// # Errors
    ///
    /// * [`BuildError::EmptyInput`] if `task_text` is blank
    /// * [`BuildError::InvalidSchema`] if `schema` lists undeclared required fields
    pub fn build(
        &self,
        task_text: &str,
        instructions: &Instructions,
        schema: &SchemaSpec,
    ) -> Result<AuditRequest, BuildError> {
        let task_text = task_text.trim();
        if task_text.is_empty() {
            return Err(BuildError::EmptyInput);
        }
        schema.validate()?;

        Ok(AuditRequest {
            task_text: task_text.to_string(),
            system_instruction: instructions.system.clone(),
            user_query: instructions.render_user_query(task_text),
            schema: schema.clone(),
        })
    }
}
