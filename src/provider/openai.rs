use async_trait::async_trait;

use crate::error::LLMError;
use crate::http::{ByteStream, DynHttpTransport};
use crate::types::CallParams;

use super::ProviderAdapter;
use super::openai_compat::error::parse_openai_error;
use super::openai_compat::{CompatRequest, bearer_headers, stream_chat_completions};

const DEFAULT_BASE_URL: &str = "https://api.openai.com";

/// OpenAI Chat Completions 适配器
pub struct OpenAiAdapter {
    transport: DynHttpTransport,
}

impl OpenAiAdapter {
    pub fn new(transport: DynHttpTransport) -> Self {
        Self { transport }
    }

    /// `base` 可带或不带 `/v1` 后缀
    pub(crate) fn endpoint(base: Option<&str>) -> String {
        let base = base.unwrap_or(DEFAULT_BASE_URL).trim_end_matches('/');
        if base.ends_with("/v1") {
            format!("{base}/chat/completions")
        } else {
            format!("{base}/v1/chat/completions")
        }
    }
}

fn parse_error(status: u16, body: &str) -> LLMError {
    parse_openai_error("openai", status, body)
}

#[async_trait]
impl ProviderAdapter for OpenAiAdapter {
    async fn call(&self, params: CallParams) -> Result<ByteStream, LLMError> {
        let request = CompatRequest {
            provider: self.name(),
            url: Self::endpoint(params.endpoint.as_deref()),
            headers: bearer_headers(params.api_key.as_deref()),
            include_model: true,
            include_usage: true,
            parse_error,
            params: &params,
        };
        stream_chat_completions(self.transport.as_ref(), request).await
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}
