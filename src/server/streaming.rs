//! Streaming relay: model chunks → HTTP response stream.
//!
//! A relay task pulls chunks from the upstream model stream, encodes each one
//! into a transport frame (SSE event or NDJSON line) and pushes it into a
//! single-slot channel whose receiving end is the response body. The response
//! is committed as soon as the receiver is handed to axum, before the first
//! chunk exists.
//!
//! The relay stops at the first failure of any kind. An error item sent down
//! the channel makes hyper abort the chunked response, which is how the
//! client learns the stream did not complete.

use axum::response::sse::Event;
use bytes::Bytes;
use futures::stream::{Stream, StreamExt};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info, warn};

use crate::model::{ChatResponse, ModelError};
use crate::server::api::ChatAnswer;

#[derive(Error, Debug)]
pub enum RelayError {
    #[error("Upstream stream failed: {0}")]
    Upstream(#[from] ModelError),

    #[error("Failed to encode chunk: {0}")]
    Encode(String),
}

/// How a relay run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayOutcome {
    /// Upstream finished normally after `chunks` frames were delivered.
    Completed { chunks: usize },
    /// Upstream yielded an error after `chunks` frames.
    UpstreamFailed { chunks: usize },
    /// A frame could not be encoded or the client went away.
    Aborted { chunks: usize },
}

/// Forward `upstream` into `tx` until it ends or something fails.
///
/// At most one chunk is in flight: the upstream is not polled again until the
/// previous frame has been accepted by the channel.
pub async fn relay<S, F, T>(
    upstream: S,
    mut encode: F,
    tx: mpsc::Sender<Result<T, RelayError>>,
) -> RelayOutcome
where
    S: Stream<Item = Result<ChatResponse, ModelError>>,
    F: FnMut(ChatAnswer) -> Result<T, RelayError>,
{
    let mut upstream = std::pin::pin!(upstream);
    let mut chunks = 0;

    while let Some(item) = upstream.next().await {
        let response = match item {
            Ok(response) => response,
            Err(e) => {
                warn!(chunks, "Upstream stream failed: {e}");
                let _ = tx.send(Err(RelayError::Upstream(e))).await;
                return RelayOutcome::UpstreamFailed { chunks };
            }
        };

        let frame = match encode(ChatAnswer::from(&response)) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(chunks, "Dropping stream: {e}");
                let _ = tx.send(Err(e)).await;
                return RelayOutcome::Aborted { chunks };
            }
        };

        if tx.send(Ok(frame)).await.is_err() {
            // Receiver dropped: the client disconnected.
            debug!(chunks, "Client went away mid-stream");
            return RelayOutcome::Aborted { chunks };
        }
        chunks += 1;
    }

    RelayOutcome::Completed { chunks }
}

/// Run [`relay`] on its own task and return the receiving side as a stream.
pub fn spawn_relay<S, F, T>(
    upstream: S,
    encode: F,
    request_id: String,
) -> impl Stream<Item = Result<T, RelayError>>
where
    S: Stream<Item = Result<ChatResponse, ModelError>> + Send + 'static,
    F: FnMut(ChatAnswer) -> Result<T, RelayError> + Send + 'static,
    T: Send + 'static,
{
    let (tx, rx) = mpsc::channel(1);

    tokio::spawn(async move {
        let outcome = relay(upstream, encode, tx).await;
        info!(request_id, ?outcome, "Stream relay finished");
    });

    ReceiverStream::new(rx)
}

/// Encode an answer as one SSE event carrying the plain text.
pub fn sse_text_event(answer: ChatAnswer) -> Result<Event, RelayError> {
    Ok(Event::default().data(normalize_line_endings(&answer.answer)))
}

/// SSE field values may not contain carriage returns.
fn normalize_line_endings(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n")
}

/// Encode an answer as one newline-terminated JSON line.
pub fn ndjson_line(answer: ChatAnswer) -> Result<Bytes, RelayError> {
    let mut line = serde_json::to_vec(&answer).map_err(|e| RelayError::Encode(e.to_string()))?;
    line.push(b'\n');
    Ok(Bytes::from(line))
}
