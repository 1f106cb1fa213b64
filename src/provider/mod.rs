use async_trait::async_trait;

use crate::config::{LLMConfig, ProviderKind, ProviderOptions};
use crate::error::LLMError;
use crate::http::{ByteStream, DynHttpTransport, HttpStreamResponse, collect_body_text};
use crate::types::CallParams;

pub(crate) use crate::stream::normalize_sse;

pub mod azure;
pub mod deepseek;
pub mod google_gemini;
pub mod openai;
pub(crate) mod openai_compat;
pub mod openrouter;

use azure::AzureOpenAiAdapter;
use deepseek::DeepSeekAdapter;
use google_gemini::GeminiAdapter;
use openai::OpenAiAdapter;
use openrouter::OpenRouterAdapter;

/// 统一的 Adapter Trait：把通用调用契约翻译成各供应商的线路格式
///
/// `call` 返回归一化后的 NDJSON 字节流，每行一个 `{"text": ...}` 对象。
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// 发起流式请求，上游一有输出就向下游推送
    async fn call(&self, params: CallParams) -> Result<ByteStream, LLMError>;

    /// 供应商名称
    fn name(&self) -> &'static str;
}

/// Closed set of supported backends, each variant carrying its own adapter.
pub enum Provider {
    OpenAi(OpenAiAdapter),
    Azure(AzureOpenAiAdapter),
    Gemini(GeminiAdapter),
    DeepSeek(DeepSeekAdapter),
    OpenRouter(OpenRouterAdapter),
}

impl Provider {
    /// Builds the adapter selected by the configuration.
    pub fn from_config(
        config: &LLMConfig,
        options: &ProviderOptions,
        transport: DynHttpTransport,
    ) -> Self {
        match config.provider {
            ProviderKind::OpenAi => Provider::OpenAi(OpenAiAdapter::new(transport)),
            ProviderKind::Azure => Provider::Azure(
                AzureOpenAiAdapter::new(transport).with_api_version(options.azure_api_version.clone()),
            ),
            ProviderKind::Gemini => Provider::Gemini(GeminiAdapter::new(transport)),
            ProviderKind::DeepSeek => Provider::DeepSeek(DeepSeekAdapter::new(transport)),
            ProviderKind::OpenRouter => Provider::OpenRouter(
                OpenRouterAdapter::new(transport)
                    .with_referer(options.openrouter_referer.clone())
                    .with_title(options.openrouter_title.clone()),
            ),
        }
    }
}

#[async_trait]
impl ProviderAdapter for Provider {
    async fn call(&self, params: CallParams) -> Result<ByteStream, LLMError> {
        match self {
            Provider::OpenAi(adapter) => adapter.call(params).await,
            Provider::Azure(adapter) => adapter.call(params).await,
            Provider::Gemini(adapter) => adapter.call(params).await,
            Provider::DeepSeek(adapter) => adapter.call(params).await,
            Provider::OpenRouter(adapter) => adapter.call(params).await,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Provider::OpenAi(adapter) => adapter.name(),
            Provider::Azure(adapter) => adapter.name(),
            Provider::Gemini(adapter) => adapter.name(),
            Provider::DeepSeek(adapter) => adapter.name(),
            Provider::OpenRouter(adapter) => adapter.name(),
        }
    }
}

/// Returns the body of a 2xx response, or drains it into the provider's error.
pub(crate) async fn ensure_success(
    response: HttpStreamResponse,
    parse_error: fn(u16, &str) -> LLMError,
) -> Result<ByteStream, LLMError> {
    if response.is_success() {
        return Ok(response.body);
    }
    let text = collect_body_text(response.body).await?;
    Err(parse_error(response.status, &text))
}

/// Joins a base URL and a path without doubling slashes.
pub(crate) fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
