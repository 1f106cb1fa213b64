//! 上游 SSE 到 NDJSON 的归一化
//!
//! Provider bodies arrive as `text/event-stream`; every adapter hands its body to
//! [`normalize_sse`] together with a [`ChunkMapper`] that understands its chunk JSON, and
//! gets back the crate's NDJSON byte stream.

use futures_util::{StreamExt, stream};
use tracing::debug;

use crate::http::ByteStream;
use crate::ndjson::LineAssembler;
use crate::types::StreamEvent;

/// Maps one upstream `data:` payload to a normalized event; `Ok(None)` drops the chunk.
pub(crate) type ChunkMapper = fn(&str) -> Result<Option<StreamEvent>, serde_json::Error>;

/// Line-level SSE state for one response body.
///
/// Only `data:` fields matter here. Comments (`: OPENROUTER PROCESSING`), `event:` and
/// `id:` lines are dropped, and a `[DONE]` payload ends the stream.
struct SseNormalizer {
    lines: LineAssembler,
    /// `data:` payload of the event still being read
    data: Option<String>,
    provider: &'static str,
    map_chunk: ChunkMapper,
    done: bool,
}

impl SseNormalizer {
    fn new(provider: &'static str, map_chunk: ChunkMapper) -> Self {
        Self {
            lines: LineAssembler::default(),
            data: None,
            provider,
            map_chunk,
            done: false,
        }
    }

    /// Feeds one network chunk and returns the NDJSON bytes of every event it completed.
    fn push(&mut self, chunk: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        for line in self.lines.push(chunk) {
            if self.done {
                break;
            }
            self.line(&line, &mut out);
        }
        out
    }

    /// Body closed: an unterminated last line and an undispatched event still count.
    fn finish(&mut self) -> Vec<u8> {
        let mut out = Vec::new();
        if let Some(rest) = self.lines.finish() {
            self.line(&rest, &mut out);
        }
        self.dispatch(&mut out);
        out
    }

    fn line(&mut self, line: &str, out: &mut Vec<u8>) {
        if line.is_empty() {
            self.dispatch(out);
            return;
        }
        let Some(value) = line.strip_prefix("data:") else {
            return;
        };
        let value = value.strip_prefix(' ').unwrap_or(value);
        match self.data.as_mut() {
            Some(data) => {
                data.push('\n');
                data.push_str(value);
            }
            None => self.data = Some(value.to_string()),
        }
    }

    fn dispatch(&mut self, out: &mut Vec<u8>) {
        let Some(data) = self.data.take() else {
            return;
        };
        if self.done || data.is_empty() {
            return;
        }
        if data.trim() == "[DONE]" {
            self.done = true;
            return;
        }
        match (self.map_chunk)(&data) {
            Ok(Some(event)) => out.extend_from_slice(&event.to_ndjson_line()),
            Ok(None) => {}
            Err(err) => {
                debug!(provider = self.provider, error = %err, "skipping unparseable stream chunk");
            }
        }
    }
}

/// Re-encodes an SSE body as NDJSON, one line per recognised chunk.
///
/// Output is produced as soon as an event completes; chunks that produce no line are not
/// forwarded. A transport error is passed through and ends the stream.
pub(crate) fn normalize_sse(
    body: ByteStream,
    provider: &'static str,
    map_chunk: ChunkMapper,
) -> ByteStream {
    let state = Some((body, SseNormalizer::new(provider, map_chunk)));
    let normalized = stream::unfold(state, |state| async move {
        let Some((mut body, mut normalizer)) = state else {
            return None;
        };
        loop {
            let (out, open) = match body.next().await {
                Some(Ok(chunk)) => (normalizer.push(&chunk), !normalizer.done),
                Some(Err(err)) => return Some((Err(err), None)),
                None => (normalizer.finish(), false),
            };
            if !open {
                return (!out.is_empty()).then_some((Ok(out), None));
            }
            if !out.is_empty() {
                return Some((Ok(out), Some((body, normalizer))));
            }
        }
    });
    Box::pin(normalized)
}
