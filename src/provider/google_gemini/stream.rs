use crate::types::{StreamEvent, Usage};

use super::types::{GeminiStreamChunk, GeminiUsageMetadata};

/// 将一个 SSE chunk 映射为归一化事件
///
/// 只取第一个候选，拼接其所有文本 part。
pub(crate) fn map_chunk(data: &str) -> Result<Option<StreamEvent>, serde_json::Error> {
    let chunk: GeminiStreamChunk = serde_json::from_str(data)?;
    let text: String = chunk
        .candidates
        .iter()
        .filter(|candidate| candidate.index.unwrap_or(0) == 0)
        .filter_map(|candidate| candidate.content.as_ref())
        .flat_map(|content| content.parts.iter())
        .filter_map(|part| part.text.as_deref())
        .collect();
    let usage = chunk.usage_metadata.map(convert_usage);
    if text.is_empty() && usage.is_none() {
        return Ok(None);
    }
    Ok(Some(StreamEvent { text, usage }))
}

fn convert_usage(usage: GeminiUsageMetadata) -> Usage {
    Usage {
        prompt_tokens: usage.prompt_token_count,
        completion_tokens: usage.candidates_token_count,
        total_tokens: usage.total_token_count,
    }
}
