use async_trait::async_trait;

use crate::error::LLMError;
use crate::http::{ByteStream, DynHttpTransport};
use crate::types::CallParams;

use super::openai_compat::error::parse_openai_error;
use super::openai_compat::{CompatRequest, bearer_headers, stream_chat_completions};
use super::{ProviderAdapter, join_url};

const DEFAULT_BASE_URL: &str = "https://api.deepseek.com";

/// DeepSeek 适配器，线路格式与 OpenAI 相同
pub struct DeepSeekAdapter {
    transport: DynHttpTransport,
}

impl DeepSeekAdapter {
    pub fn new(transport: DynHttpTransport) -> Self {
        Self { transport }
    }

    pub(crate) fn endpoint(base: Option<&str>) -> String {
        join_url(base.unwrap_or(DEFAULT_BASE_URL), "chat/completions")
    }
}

fn parse_error(status: u16, body: &str) -> LLMError {
    parse_openai_error("deepseek", status, body)
}

#[async_trait]
impl ProviderAdapter for DeepSeekAdapter {
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
        "deepseek"
    }
}
