//! Incremental server-sent-event decoding.
//!
//! Bytes arrive in arbitrary network-sized pieces; [`SseDecoder`] buffers them
//! and hands back the `data:` payload of each complete event. Events are
//! delimited by a blank line. Multiple `data:` lines in one event are joined
//! with `\n`; events without data (comments, bare `id:`/`event:`) are skipped.

#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append raw bytes. Carriage returns are dropped so CRLF streams split
    /// the same way as LF streams.
    pub fn push(&mut self, bytes: &[u8]) {
        self.buffer.extend(bytes.iter().copied().filter(|&b| b != b'\r'));
    }

    /// Next complete event's data payload, if one is buffered.
    pub fn next_data(&mut self) -> Option<String> {
        while let Some(pos) = self.buffer.windows(2).position(|w| w == b"\n\n") {
            let event: Vec<u8> = self.buffer.drain(..pos + 2).collect();
            if let Some(data) = event_data(&event[..pos]) {
                return Some(data);
            }
        }
        None
    }

    /// Treat whatever is buffered as a final, unterminated event.
    pub fn finish(&mut self) -> Option<String> {
        let rest = std::mem::take(&mut self.buffer);
        event_data(&rest)
    }
}

fn event_data(event: &[u8]) -> Option<String> {
    let mut segments: Vec<&[u8]> = Vec::new();
    for line in event.split(|&b| b == b'\n') {
        if let Some(payload) = line.strip_prefix(b"data:") {
            let payload = payload.strip_prefix(b" ").unwrap_or(payload);
            segments.push(payload);
        }
    }
    if segments.is_empty() {
        return None;
    }
    Some(String::from_utf8_lossy(&segments.join(&b'\n')).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_event() {
        let mut decoder = SseDecoder::new();
        decoder.push(b"id: 1\nevent: message\ndata: {\"a\":1}\n\n");
        assert_eq!(decoder.next_data().as_deref(), Some("{\"a\":1}"));
        assert_eq!(decoder.next_data(), None);
    }

    #[test]
    fn test_event_split_across_pushes() {
        let mut decoder = SseDecoder::new();
        decoder.push(b"data: hel");
        assert_eq!(decoder.next_data(), None);
        decoder.push(b"lo\n");
        assert_eq!(decoder.next_data(), None);
        decoder.push(b"\ndata: world\n\n");
        assert_eq!(decoder.next_data().as_deref(), Some("hello"));
        assert_eq!(decoder.next_data().as_deref(), Some("world"));
    }

    #[test]
    fn test_crlf_and_comments() {
        let mut decoder = SseDecoder::new();
        decoder.push(b": keep-alive\r\n\r\ndata: x\r\ndata: y\r\n\r\n");
        assert_eq!(decoder.next_data().as_deref(), Some("x\ny"));
        assert_eq!(decoder.next_data(), None);
    }

    #[test]
    fn test_finish_flushes_trailing_event() {
        let mut decoder = SseDecoder::new();
        decoder.push(b"data: tail");
        assert_eq!(decoder.next_data(), None);
        assert_eq!(decoder.finish().as_deref(), Some("tail"));
        assert_eq!(decoder.finish(), None);
    }
}
