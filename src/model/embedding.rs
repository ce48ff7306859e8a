//! Embedding abstraction.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::ModelError;

/// One embedding vector and the position of the input it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Embedding {
    pub output: Vec<f64>,
    pub index: usize,
}

impl Embedding {
    pub fn new(output: Vec<f64>, index: usize) -> Self {
        Self { output, index }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmbeddingResponse {
    pub results: Vec<Embedding>,
}

impl EmbeddingResponse {
    pub fn result(&self) -> Option<&Embedding> {
        self.results.first()
    }
}

#[async_trait]
pub trait EmbeddingModel: Send + Sync {
    /// Embed each input text; result `i` belongs to `inputs[i]`.
    async fn embed_for_response(&self, inputs: &[String]) -> Result<EmbeddingResponse, ModelError>;
}
