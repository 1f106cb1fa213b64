use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::LLMError;
use crate::http::{ByteStream, DynHttpTransport};
use crate::types::CallParams;

use super::openai_compat::error::parse_openai_error;
use super::openai_compat::{CompatRequest, bearer_headers, stream_chat_completions};
use super::{ProviderAdapter, join_url};

const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";

/// OpenRouter 适配器
///
/// 可选的 `HTTP-Referer` 与 `X-Title` 用于在 OpenRouter 排行榜上标识调用方。
pub struct OpenRouterAdapter {
    transport: DynHttpTransport,
    referer: Option<String>,
    title: Option<String>,
}

impl OpenRouterAdapter {
    pub fn new(transport: DynHttpTransport) -> Self {
        Self {
            transport,
            referer: None,
            title: None,
        }
    }

    pub fn with_referer(mut self, referer: Option<String>) -> Self {
        self.referer = referer;
        self
    }

    pub fn with_title(mut self, title: Option<String>) -> Self {
        self.title = title;
        self
    }

    pub(crate) fn endpoint(base: Option<&str>) -> String {
        join_url(base.unwrap_or(DEFAULT_BASE_URL), "chat/completions")
    }

    fn build_headers(&self, api_key: Option<&str>) -> HashMap<String, String> {
        let mut headers = bearer_headers(api_key);
        if let Some(referer) = &self.referer {
            headers.insert("HTTP-Referer".to_string(), referer.clone());
        }
        if let Some(title) = &self.title {
            headers.insert("X-Title".to_string(), title.clone());
        }
        headers
    }
}

fn parse_error(status: u16, body: &str) -> LLMError {
    parse_openai_error("openrouter", status, body)
}

#[async_trait]
impl ProviderAdapter for OpenRouterAdapter {
    async fn call(&self, params: CallParams) -> Result<ByteStream, LLMError> {
        let request = CompatRequest {
            provider: self.name(),
            url: Self::endpoint(params.endpoint.as_deref()),
            headers: self.build_headers(params.api_key.as_deref()),
            include_model: true,
            include_usage: true,
            parse_error,
            params: &params,
        };
        stream_chat_completions(self.transport.as_ref(), request).await
    }

    fn name(&self) -> &'static str {
        "openrouter"
    }
}
