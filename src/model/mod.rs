//! Model clients.
//!
//! - [`chat`]: the [`ChatModel`] trait and response types
//! - [`embedding`]: the [`EmbeddingModel`] trait and embedding results
//! - [`watsonx`]: `reqwest`-backed watsonx.ai implementation of both
//! - [`iam`]: IBM Cloud IAM API-key → bearer-token exchange
//! - [`sse`]: incremental server-sent-event frame decoding

pub mod chat;
pub mod embedding;
pub mod iam;
pub mod sse;
pub mod watsonx;

use thiserror::Error;

pub use chat::{ChatModel, ChatResponse, ChatStream, Generation};
pub use embedding::{Embedding, EmbeddingModel, EmbeddingResponse};

/// Anything that can go wrong talking to the model provider.
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Provider returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Malformed provider response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Stream interrupted: {0}")]
    Stream(String),
}
