use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::LLMError;
use crate::http::{ByteStream, DynHttpTransport};
use crate::types::CallParams;

use super::ProviderAdapter;
use super::openai_compat::error::parse_openai_error;
use super::openai_compat::{CompatRequest, stream_chat_completions};

/// `api-version` query parameter used when none is configured.
pub const DEFAULT_API_VERSION: &str = "2024-02-15-preview";

/// Azure OpenAI 适配器
///
/// 模型名即 deployment 名；endpoint 为资源地址，例如 `https://my-res.openai.azure.com`，
/// 没有默认值。
pub struct AzureOpenAiAdapter {
    transport: DynHttpTransport,
    api_version: String,
}

impl AzureOpenAiAdapter {
    pub fn new(transport: DynHttpTransport) -> Self {
        Self {
            transport,
            api_version: DEFAULT_API_VERSION.to_string(),
        }
    }

    pub fn with_api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = api_version.into();
        self
    }

    pub(crate) fn endpoint(&self, base: Option<&str>, deployment: &str) -> Result<String, LLMError> {
        let base = base.ok_or_else(|| LLMError::InvalidConfig {
            field: "LLM_API_ENDPOINT".to_string(),
            reason: "azure requires the resource endpoint".to_string(),
        })?;
        Ok(format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            base.trim_end_matches('/'),
            deployment,
            self.api_version
        ))
    }

    fn build_headers(api_key: Option<&str>) -> HashMap<String, String> {
        let mut headers = HashMap::new();
        if let Some(key) = api_key {
            headers.insert("api-key".to_string(), key.to_string());
        }
        headers.insert("Accept".to_string(), "text/event-stream".to_string());
        headers
    }
}

fn parse_error(status: u16, body: &str) -> LLMError {
    parse_openai_error("azure", status, body)
}

#[async_trait]
impl ProviderAdapter for AzureOpenAiAdapter {
    async fn call(&self, params: CallParams) -> Result<ByteStream, LLMError> {
        let url = self.endpoint(params.endpoint.as_deref(), &params.model)?;
        let request = CompatRequest {
            provider: self.name(),
            url,
            headers: Self::build_headers(params.api_key.as_deref()),
            include_model: false,
            include_usage: false,
            parse_error,
            params: &params,
        };
        stream_chat_completions(self.transport.as_ref(), request).await
    }

    fn name(&self) -> &'static str {
        "azure"
    }
}
