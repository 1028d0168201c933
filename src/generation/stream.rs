//! Incremental parsing of newline-delimited JSON generation streams.
//!
//! Providers emit one JSON record per line, but the transport hands us byte
//! chunks cut at arbitrary positions: mid-record, and even mid-character.
//! [`DeltaParser`] is the explicit state machine behind every streamed
//! response: it buffers raw bytes, processes each complete line as it
//! becomes available, and holds the trailing fragment until more bytes
//! arrive or the stream ends.
//!
//! Lines that fail to parse are silently discarded; they are expected
//! fragmentation noise, not errors. Parsed deltas are handed back
//! immediately and in order, so callers never accumulate a full response.

use serde_json::Value;

/// Lifecycle of a streamed response.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ParserState {
    /// Accepting transport chunks.
    Buffering,
    /// End of input seen; the carry-over fragment has been flushed.
    Closed,
}

/// Reassembles newline-delimited JSON records from arbitrary byte chunks and
/// extracts their content deltas.
#[derive(Debug)]
pub struct DeltaParser {
    buffer: Vec<u8>,
    state: ParserState,
}

impl DeltaParser {
    /// Create a parser in the buffering state with an empty carry-over.
    pub fn new() -> Self {
        Self {
            buffer: Vec::new(),
            state: ParserState::Buffering,
        }
    }

    /// Feed one transport chunk, returning the deltas of every line completed
    /// by it, in emission order.
    ///
    /// The final (possibly incomplete) fragment stays in the carry-over
    /// buffer. Splitting happens on raw newline bytes: UTF-8 continuation
    /// bytes never equal `\n`, so a multi-byte character cut across chunks
    /// survives intact inside the buffer.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        if self.state == ParserState::Closed {
            return Vec::new();
        }

        self.buffer.extend_from_slice(bytes);

        let mut deltas = Vec::new();
        while let Some(position) = self.buffer.iter().position(|&byte| byte == b'\n') {
            let mut line: Vec<u8> = self.buffer.drain(..=position).collect();
            line.pop();
            if let Some(delta) = extract_delta(&line) {
                deltas.push(delta);
            }
        }
        deltas
    }

    /// Flush at end of input: attempt one final parse of the remaining
    /// fragment, then close. Further pushes are ignored.
    pub fn finish(&mut self) -> Option<String> {
        self.state = ParserState::Closed;
        let fragment = std::mem::take(&mut self.buffer);
        extract_delta(&fragment)
    }
}

impl Default for DeltaParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse one logical line and pull out its content delta, if any.
///
/// Handles both streamed shapes the provider emits: chat records carry
/// `message.content`, generate records carry `response`.
fn extract_delta(line: &[u8]) -> Option<String> {
    if line.iter().all(u8::is_ascii_whitespace) {
        return None;
    }

    let record: Value = serde_json::from_slice(line).ok()?;
    if let Some(content) = record
        .pointer("/message/content")
        .and_then(Value::as_str)
    {
        return Some(content.to_string());
    }
    record
        .get("response")
        .and_then(Value::as_str)
        .map(str::to_string)
}
