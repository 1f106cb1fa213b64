use std::collections::HashMap;

use async_trait::async_trait;
use tracing::debug;

use crate::error::LLMError;
use crate::http::{ByteStream, DynHttpTransport, post_json_stream_with_headers};
use crate::provider::{ProviderAdapter, ensure_success, normalize_sse};
use crate::types::CallParams;

use super::error::parse_gemini_error;
use super::request::build_gemini_body;
use super::stream::map_chunk;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Google Gemini streamGenerateContent adapter.
pub struct GeminiAdapter {
    transport: DynHttpTransport,
}

impl GeminiAdapter {
    pub fn new(transport: DynHttpTransport) -> Self {
        Self { transport }
    }

    /// Builds the streaming endpoint URL (SSE) for GenerateContent.
    pub(crate) fn stream_endpoint(base: Option<&str>, model: &str) -> String {
        let base = base.unwrap_or(DEFAULT_BASE_URL).trim_end_matches('/');
        let model_path = normalize_model(model);
        if base.ends_with("/v1beta") {
            format!("{base}/{model_path}:streamGenerateContent?alt=sse")
        } else {
            format!("{base}/v1beta/{model_path}:streamGenerateContent?alt=sse")
        }
    }

    fn build_headers(api_key: Option<&str>) -> HashMap<String, String> {
        let mut headers = HashMap::new();
        if let Some(key) = api_key {
            headers.insert("x-goog-api-key".to_string(), key.to_string());
        }
        headers.insert("Accept".to_string(), "text/event-stream".to_string());
        headers
    }
}

/// Accepts both `gemini-2.0-flash` and `models/gemini-2.0-flash`.
fn normalize_model(model: &str) -> String {
    if model.starts_with("models/") {
        model.to_string()
    } else {
        format!("models/{model}")
    }
}

#[async_trait]
impl ProviderAdapter for GeminiAdapter {
    async fn call(&self, params: CallParams) -> Result<ByteStream, LLMError> {
        let body = build_gemini_body(&params)?;
        let url = Self::stream_endpoint(params.endpoint.as_deref(), &params.model);
        debug!(provider = self.name(), model = %params.model, "sending streamGenerateContent request");
        let response = post_json_stream_with_headers(
            self.transport.as_ref(),
            url,
            Self::build_headers(params.api_key.as_deref()),
            &body,
            params.timeout,
        )
        .await?;
        let body = ensure_success(response, parse_gemini_error).await?;
        Ok(normalize_sse(body, self.name(), map_chunk))
    }

    fn name(&self) -> &'static str {
        "gemini"
    }
}
