use crate::types::{StreamEvent, Usage};

use super::types::{OpenAiStreamChunk, OpenAiUsage};

/// Maps a chat-completions chunk to a normalized event.
///
/// Only the first choice is rendered into the document; role-only and empty deltas are
/// dropped unless the chunk reports usage.
pub(crate) fn map_chunk(data: &str) -> Result<Option<StreamEvent>, serde_json::Error> {
    let chunk: OpenAiStreamChunk = serde_json::from_str(data)?;
    let text: String = chunk
        .choices
        .iter()
        .filter(|choice| choice.index == 0)
        .filter_map(|choice| choice.delta.as_ref())
        .filter_map(|delta| delta.content.as_deref())
        .collect();
    let usage = chunk.usage.map(convert_usage);
    if text.is_empty() && usage.is_none() {
        return Ok(None);
    }
    Ok(Some(StreamEvent { text, usage }))
}

fn convert_usage(usage: OpenAiUsage) -> Usage {
    Usage {
        prompt_tokens: usage.prompt_tokens,
        completion_tokens: usage.completion_tokens,
        total_tokens: usage.total_tokens,
    }
}
