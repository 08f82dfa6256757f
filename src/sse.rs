//! Server-Sent Events (SSE) frame splitting and payload decoding.
//!
//! The server answers `POST /chat/stream` with a chunked body in SSE frame
//! format: frames are separated by a blank line, and each frame carries one
//! JSON payload across one or more `data:` lines:
//!
//! ```text
//! data: {"type": "response", "content": "Hello"}
//!
//! data: {"type": "done"}
//! ```
//!
//! Chunk boundaries are arbitrary — a frame, or even a single multi-byte
//! character, may be split across chunks — so splitting is stateful:
//! [`FrameSplitter`] carries undecoded bytes and the trailing incomplete
//! frame between `push` calls.

use itertools::Itertools;
use tracing::{trace, warn};

use crate::model::StreamPayload;

/// Frame delimiter: a blank line between `data:` blocks.
const FRAME_DELIMITER: &str = "\n\n";

/// Incremental splitter turning a chunked byte stream into complete SSE
/// frames.
///
/// # Example
/// ```
/// use chatstream::sse::FrameSplitter;
///
/// let mut splitter = FrameSplitter::new();
/// assert!(splitter.push(b"data: {\"type\":\"respon").is_empty());
/// let frames = splitter.push(b"se\",\"content\":\"hi\"}\n\n");
/// assert_eq!(frames, vec!["data: {\"type\":\"response\",\"content\":\"hi\"}"]);
/// ```
#[derive(Debug, Default)]
pub struct FrameSplitter {
    /// Bytes that did not yet decode to a full UTF-8 code point.
    bytes: Vec<u8>,
    /// Decoded text of the trailing incomplete frame.
    text: String,
}

impl FrameSplitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and return every frame it completed, in order.
    ///
    /// Multi-byte characters split across chunk boundaries are carried over
    /// and decoded once the remaining bytes arrive; invalid sequences decode
    /// to U+FFFD rather than aborting the stream.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.bytes.extend_from_slice(chunk);
        self.decode_carry();

        let mut frames = Vec::new();
        while let Some(pos) = self.text.find(FRAME_DELIMITER) {
            frames.push(self.text[..pos].to_string());
            self.text.drain(..pos + FRAME_DELIMITER.len());
        }
        frames
    }

    /// Flush at end of stream: any non-whitespace carry is one final frame.
    ///
    /// Bytes that never completed a code point are dropped, matching a
    /// streaming text decoder that is simply never flushed.
    pub fn finish(&mut self) -> Option<String> {
        if !self.bytes.is_empty() {
            trace!(len = self.bytes.len(), "dropping undecoded byte tail");
            self.bytes.clear();
        }
        let tail = std::mem::take(&mut self.text);
        if tail.trim().is_empty() {
            None
        } else {
            Some(tail)
        }
    }

    /// Move every decodable byte into the text carry, keeping only an
    /// incomplete trailing code point in the byte carry.
    fn decode_carry(&mut self) {
        loop {
            match std::str::from_utf8(&self.bytes) {
                Ok(s) => {
                    self.text.push_str(s);
                    self.bytes.clear();
                    return;
                }
                Err(e) => {
                    let valid = e.valid_up_to();
                    if let Ok(s) = std::str::from_utf8(&self.bytes[..valid]) {
                        self.text.push_str(s);
                    }
                    match e.error_len() {
                        Some(bad) => {
                            // Genuinely invalid sequence: substitute and move on.
                            self.text.push(char::REPLACEMENT_CHARACTER);
                            self.bytes.drain(..valid + bad);
                        }
                        None => {
                            // Incomplete trailing code point: wait for more bytes.
                            self.bytes.drain(..valid);
                            return;
                        }
                    }
                }
            }
        }
    }
}

/// Decode one frame into a payload.
///
/// Lines starting with `data:` have the marker and exactly one following
/// space stripped; the remainders are joined with `\n` and parsed as JSON.
/// Returns `None` for frames with no `data:` lines, for the `done` marker,
/// and for malformed JSON (logged and dropped — one bad frame must not
/// abort an otherwise healthy stream).
pub fn decode_frame(frame: &str) -> Option<StreamPayload> {
    let mut data_lines = frame.lines().filter_map(parse_data_line).peekable();
    data_lines.peek()?;

    let data = data_lines.join("\n");
    if data.is_empty() {
        return None;
    }

    match serde_json::from_str::<StreamPayload>(&data) {
        Ok(StreamPayload::Done) => {
            trace!("stream signaled done");
            None
        }
        Ok(payload) => Some(payload),
        Err(e) => {
            warn!(error = %e, "dropping malformed SSE frame");
            None
        }
    }
}

/// Extract the data portion of an SSE line.
///
/// Strips the `data:` marker and at most one following space, preserving
/// any further leading whitespace of the JSON fragment.
///
/// # Example
/// ```
/// use chatstream::sse::parse_data_line;
///
/// assert_eq!(parse_data_line("data: {\"a\":1}"), Some("{\"a\":1}"));
/// assert_eq!(parse_data_line("data:x"), Some("x"));
/// assert_eq!(parse_data_line(": comment"), None);
/// ```
pub fn parse_data_line(line: &str) -> Option<&str> {
    let rest = line.strip_prefix("data:")?;
    Some(rest.strip_prefix(' ').unwrap_or(rest))
}
