//! Shared plumbing for the backends that speak the OpenAI chat-completions dialect.
//!
//! OpenAI, Azure OpenAI, DeepSeek and OpenRouter differ only in URL, auth header and a
//! couple of extra headers; the body, the SSE chunk shape and the error envelope are the
//! same, so the four adapters funnel into [`stream_chat_completions`].

use std::collections::HashMap;

use tracing::debug;

use crate::error::LLMError;
use crate::http::{ByteStream, HttpTransport, post_json_stream_with_headers};
use crate::types::CallParams;

use super::{ensure_success, normalize_sse};

pub(crate) mod error;
pub(crate) mod stream;
pub(crate) mod types;

use types::{ChatCompletionsBody, StreamOptions};

/// One chat-completions request, fully resolved by the calling adapter.
pub(crate) struct CompatRequest<'a> {
    pub(crate) provider: &'static str,
    pub(crate) url: String,
    pub(crate) headers: HashMap<String, String>,
    /// Azure addresses the model through the deployment path and omits it here.
    pub(crate) include_model: bool,
    /// Sends `stream_options.include_usage`; Azure's default api-version rejects it.
    pub(crate) include_usage: bool,
    pub(crate) parse_error: fn(u16, &str) -> LLMError,
    pub(crate) params: &'a CallParams,
}

/// Builds the request body from the uniform call parameters.
pub(crate) fn build_body(
    params: &CallParams,
    include_model: bool,
    include_usage: bool,
) -> ChatCompletionsBody<'_> {
    ChatCompletionsBody {
        model: include_model.then_some(params.model.as_str()),
        messages: &params.messages,
        temperature: params.temperature,
        max_tokens: params.max_tokens,
        stream: true,
        stream_options: include_usage.then_some(StreamOptions {
            include_usage: true,
        }),
    }
}

/// Sends a streaming chat-completions request and returns the normalized NDJSON body.
///
/// # Errors
///
/// Non-2xx answers are drained and mapped through `parse_error`; transport failures and
/// deadlines propagate unchanged.
pub(crate) async fn stream_chat_completions(
    transport: &dyn HttpTransport,
    request: CompatRequest<'_>,
) -> Result<ByteStream, LLMError> {
    let body = build_body(request.params, request.include_model, request.include_usage);
    debug!(
        provider = request.provider,
        model = %request.params.model,
        messages = request.params.messages.len(),
        "sending chat completions request"
    );
    let response = post_json_stream_with_headers(
        transport,
        request.url,
        request.headers,
        &body,
        request.params.timeout,
    )
    .await?;
    let body = ensure_success(response, request.parse_error).await?;
    Ok(normalize_sse(body, request.provider, stream::map_chunk))
}

/// Inserts `Authorization: Bearer <key>` when a key is configured.
pub(crate) fn bearer_headers(api_key: Option<&str>) -> HashMap<String, String> {
    let mut headers = HashMap::new();
    if let Some(key) = api_key {
        headers.insert("Authorization".to_string(), format!("Bearer {key}"));
    }
    headers.insert("Accept".to_string(), "text/event-stream".to_string());
    headers
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ChatMessage;

    fn params() -> CallParams {
        CallParams {
            model: "gpt-4o-mini".to_string(),
            messages: vec![ChatMessage::system("sys"), ChatMessage::user("hi")],
            api_key: None,
            endpoint: None,
            temperature: Some(0.7),
            max_tokens: None,
            timeout: None,
        }
    }

    #[test]
    fn body_carries_stream_flag_and_skips_absent_fields() {
        let params = params();
        let value = serde_json::to_value(build_body(&params, true, true)).expect("json");
        assert_eq!(value["model"], "gpt-4o-mini");
        assert_eq!(value["stream"], true);
        assert_eq!(value["stream_options"]["include_usage"], true);
        assert_eq!(value["messages"][0]["role"], "system");
        assert_eq!(value["messages"][1]["content"], "hi");
        assert!(value.get("max_tokens").is_none());
        assert!((value["temperature"].as_f64().expect("temperature") - 0.7).abs() < 1e-6);
    }

    #[test]
    fn body_can_omit_model_and_usage_request() {
        let params = params();
        let value = serde_json::to_value(build_body(&params, false, false)).expect("json");
        assert!(value.get("model").is_none());
        assert!(value.get("stream_options").is_none());
    }

    #[test]
    fn bearer_only_with_key() {
        assert!(!bearer_headers(None).contains_key("Authorization"));
        assert_eq!(
            bearer_headers(Some("sk")).get("Authorization").map(String::as_str),
            Some("Bearer sk")
        );
    }
}
