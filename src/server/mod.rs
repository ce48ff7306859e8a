//! HTTP server exposing the chat and embedding models.
//!
//! - [`api`]: Request/response types and route handlers
//! - [`streaming`]: relay from model chunk streams to SSE / NDJSON bodies
//! - [`error`]: handler error type and its status mapping

pub mod api;
pub mod error;
pub mod streaming;
