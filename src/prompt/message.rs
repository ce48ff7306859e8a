//! Prompt messages and per-prompt generation options.

use serde::{Deserialize, Serialize};

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Text-generation parameters. `None` fields fall back to whatever the
/// options are merged onto.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatOptions {
    pub model: Option<String>,
    pub decoding_method: Option<String>,
    pub max_new_tokens: Option<u32>,
    pub min_new_tokens: Option<u32>,
    pub temperature: Option<f64>,
    pub top_k: Option<u32>,
    pub top_p: Option<f64>,
    pub repetition_penalty: Option<f64>,
    pub random_seed: Option<u64>,
    pub stop_sequences: Option<Vec<String>>,
}

impl ChatOptions {
    /// Overlay `overrides` on top of `self`, field by field.
    pub fn merge(&self, overrides: &ChatOptions) -> ChatOptions {
        ChatOptions {
            model: overrides.model.clone().or_else(|| self.model.clone()),
            decoding_method: overrides
                .decoding_method
                .clone()
                .or_else(|| self.decoding_method.clone()),
            max_new_tokens: overrides.max_new_tokens.or(self.max_new_tokens),
            min_new_tokens: overrides.min_new_tokens.or(self.min_new_tokens),
            temperature: overrides.temperature.or(self.temperature),
            top_k: overrides.top_k.or(self.top_k),
            top_p: overrides.top_p.or(self.top_p),
            repetition_penalty: overrides.repetition_penalty.or(self.repetition_penalty),
            random_seed: overrides.random_seed.or(self.random_seed),
            stop_sequences: overrides
                .stop_sequences
                .clone()
                .or_else(|| self.stop_sequences.clone()),
        }
    }
}

/// A structured prompt: ordered messages plus optional option overrides.
#[derive(Debug, Clone, PartialEq)]
pub struct Prompt {
    pub messages: Vec<Message>,
    pub options: Option<ChatOptions>,
}

impl Prompt {
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            options: None,
        }
    }

    pub fn with_options(mut self, options: ChatOptions) -> Self {
        self.options = Some(options);
        self
    }

    /// Flatten the messages into the single text input the generation
    /// endpoint takes.
    pub fn to_input(&self) -> String {
        self.messages
            .iter()
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_input_joins_messages() {
        let prompt = Prompt::new(vec![Message::system("Be brief."), Message::user("Hi?")]);
        assert_eq!(prompt.to_input(), "Be brief.\nHi?");
    }

    #[test]
    fn test_merge_prefers_overrides() {
        let defaults = ChatOptions {
            model: Some("google/flan-ul2".to_string()),
            decoding_method: Some("greedy".to_string()),
            max_new_tokens: Some(20),
            temperature: Some(0.7),
            ..Default::default()
        };
        let overrides = ChatOptions {
            decoding_method: Some("sample".to_string()),
            random_seed: Some(1),
            ..Default::default()
        };

        let merged = defaults.merge(&overrides);
        assert_eq!(merged.model.as_deref(), Some("google/flan-ul2"));
        assert_eq!(merged.decoding_method.as_deref(), Some("sample"));
        assert_eq!(merged.max_new_tokens, Some(20));
        assert_eq!(merged.random_seed, Some(1));
        assert_eq!(merged.top_k, None);
    }
}
