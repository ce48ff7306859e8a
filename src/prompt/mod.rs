//! Prompt construction.
//!
//! - [`template`]: `{name}` placeholder substitution
//! - [`message`]: messages, prompts and generation options

pub mod message;
pub mod template;

pub use message::{ChatOptions, Message, Prompt, Role};
pub use template::{PromptTemplate, TemplateError};

/// Name of the placeholder the question is substituted into.
pub const QUESTION_PLACEHOLDER: &str = "question";

/// Builds `[system, user]` prompts from a fixed system instruction and a
/// question template.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    system: String,
    template: PromptTemplate,
}

impl PromptBuilder {
    /// Fails if `template` has no `{question}` placeholder.
    pub fn new(
        system: impl Into<String>,
        template: impl Into<String>,
    ) -> Result<Self, TemplateError> {
        let template = PromptTemplate::new(template);
        if !template.has_placeholder(QUESTION_PLACEHOLDER) {
            return Err(TemplateError::MissingPlaceholder(
                QUESTION_PLACEHOLDER.to_string(),
            ));
        }
        Ok(Self {
            system: system.into(),
            template,
        })
    }

    pub fn build(&self, question: &str) -> Result<Prompt, TemplateError> {
        let user = self.template.render(QUESTION_PLACEHOLDER, question)?;
        Ok(Prompt::new(vec![
            Message::system(self.system.clone()),
            Message::user(user),
        ]))
    }
}
