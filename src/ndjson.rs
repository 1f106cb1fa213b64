//! Reassembly of NDJSON lines split across network chunks.

use futures_util::StreamExt;
use serde_json::Value;
use tracing::debug;

use crate::error::LLMError;
use crate::http::ByteStream;

/// Carry-over buffer turning arbitrary byte chunks into complete lines.
///
/// Bytes are buffered rather than decoded text so a multi-byte UTF-8 sequence split by
/// the network is reassembled before decoding.
///
/// # Examples
///
/// ```
/// use inkstream::ndjson::LineAssembler;
///
/// let mut lines = LineAssembler::default();
/// assert!(lines.push(b"{\"text\":\"a").is_empty());
/// assert_eq!(lines.push(b"b\"}\n{\"te"), vec!["{\"text\":\"ab\"}".to_string()]);
/// assert_eq!(lines.finish(), Some("{\"te".to_string()));
/// ```
#[derive(Debug, Default)]
pub struct LineAssembler {
    leftover: Vec<u8>,
}

impl LineAssembler {
    /// Appends a chunk and returns every line it completed, in order.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.leftover.extend_from_slice(chunk);
        let mut lines = Vec::new();
        while let Some(pos) = self.leftover.iter().position(|b| *b == b'\n') {
            let mut line: Vec<u8> = self.leftover.drain(..=pos).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            lines.push(String::from_utf8_lossy(&line).into_owned());
        }
        lines
    }

    /// Returns the unterminated tail, if any; a final line without `\n` is still output.
    pub fn finish(&mut self) -> Option<String> {
        if self.leftover.is_empty() {
            return None;
        }
        let rest = std::mem::take(&mut self.leftover);
        Some(String::from_utf8_lossy(&rest).into_owned())
    }
}

/// Extracts the `text` field of one NDJSON line.
///
/// Blank lines, malformed JSON and objects without a string `text` yield `None`; the
/// malformed case is logged at debug level and never fails the stream.
pub fn parse_text_line(line: &str) -> Option<String> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }
    match serde_json::from_str::<Value>(trimmed) {
        Ok(value) => value
            .get("text")
            .and_then(Value::as_str)
            .map(str::to_string),
        Err(err) => {
            debug!(error = %err, line = trimmed, "skipping malformed stream line");
            None
        }
    }
}

/// Accumulates the text of every event in arrival order.
#[derive(Debug, Default)]
pub struct TextAccumulator {
    lines: LineAssembler,
    text: String,
}

impl TextAccumulator {
    /// Feeds one chunk; returns `true` when the accumulated text grew.
    pub fn feed(&mut self, chunk: &[u8]) -> bool {
        let mut grew = false;
        for line in self.lines.push(chunk) {
            grew |= self.append(&line);
        }
        grew
    }

    /// Flushes the unterminated tail; returns `true` when the accumulated text grew.
    pub fn finish(&mut self) -> bool {
        match self.lines.finish() {
            Some(rest) => self.append(&rest),
            None => false,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn into_text(self) -> String {
        self.text
    }

    fn append(&mut self, line: &str) -> bool {
        match parse_text_line(line) {
            Some(text) if !text.is_empty() => {
                self.text.push_str(&text);
                true
            }
            _ => false,
        }
    }
}

/// Drains an NDJSON byte stream and returns the concatenated text.
pub async fn collect_text(mut stream: ByteStream) -> Result<String, LLMError> {
    let mut acc = TextAccumulator::default();
    while let Some(chunk) = stream.next().await {
        acc.feed(&chunk?);
    }
    acc.finish();
    Ok(acc.into_text())
}
