//! Single-placeholder prompt templates.
//!
//! Placeholders are written as `{name}`. Rendering substitutes one named
//! placeholder and leaves any other brace groups as they are.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    #[error("Template has no `{{{0}}}` placeholder")]
    MissingPlaceholder(String),
}

/// A prompt template with `{name}` placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    text: String,
}

impl PromptTemplate {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// Whether the template contains the `{name}` placeholder.
    pub fn has_placeholder(&self, name: &str) -> bool {
        self.text.contains(&placeholder(name))
    }

    /// Substitute every occurrence of `{name}` with `value`.
    pub fn render(&self, name: &str, value: &str) -> Result<String, TemplateError> {
        let key = placeholder(name);
        if !self.text.contains(&key) {
            return Err(TemplateError::MissingPlaceholder(name.to_string()));
        }
        Ok(self.text.replace(&key, value))
    }
}

fn placeholder(name: &str) -> String {
    format!("{{{name}}}")
}
