//! watsonx-facade: a thin HTTP facade over watsonx.ai.
//!
//! Forwards a caller's question to the hosted text-generation and embedding
//! endpoints and relays the answer, either as one JSON object or as a
//! stream of server-sent events / newline-delimited JSON.
//!
//! - [`prompt`]: prompt templates and message types
//! - [`model`]: chat / embedding traits and the watsonx.ai client
//! - [`server`]: routes, DTOs and the streaming relay
//! - [`config`]: CLI arguments and file-based configuration

pub mod config;
pub mod model;
pub mod prompt;
pub mod server;
