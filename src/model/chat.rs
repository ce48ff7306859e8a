//! Chat (text generation) abstraction.

use async_trait::async_trait;
use futures::stream::BoxStream;

use super::ModelError;
use crate::prompt::Prompt;

/// One generated output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generation {
    pub content: String,
    pub finish_reason: Option<String>,
}

impl Generation {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            finish_reason: None,
        }
    }
}

/// A whole response, or one incremental chunk of a streamed one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatResponse {
    pub generations: Vec<Generation>,
}

impl ChatResponse {
    pub fn new(generations: Vec<Generation>) -> Self {
        Self { generations }
    }

    /// Shorthand for a single-generation response.
    pub fn text(content: impl Into<String>) -> Self {
        Self::new(vec![Generation::new(content)])
    }

    pub fn result(&self) -> Option<&Generation> {
        self.generations.first()
    }

    /// Content of the first generation, or `""` if there is none.
    pub fn content(&self) -> &str {
        self.result().map(|g| g.content.as_str()).unwrap_or_default()
    }
}

/// Lazily produced chunks of a streamed response.
pub type ChatStream = BoxStream<'static, Result<ChatResponse, ModelError>>;

#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Send a prompt and wait for the complete response.
    async fn call(&self, prompt: &Prompt) -> Result<ChatResponse, ModelError>;

    /// Send a prompt and get the response as a stream of chunks.
    async fn stream(&self, prompt: &Prompt) -> Result<ChatStream, ModelError>;
}
