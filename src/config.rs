use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::LLMError;

/// 供应商类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    OpenAi,
    Azure,
    Gemini,
    DeepSeek,
    OpenRouter,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::Azure => "azure",
            ProviderKind::Gemini => "gemini",
            ProviderKind::DeepSeek => "deepseek",
            ProviderKind::OpenRouter => "openrouter",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = LLMError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(ProviderKind::OpenAi),
            "azure" => Ok(ProviderKind::Azure),
            "gemini" => Ok(ProviderKind::Gemini),
            "deepseek" => Ok(ProviderKind::DeepSeek),
            "openrouter" => Ok(ProviderKind::OpenRouter),
            _ => Err(LLMError::UnsupportedProvider {
                provider: value.to_string(),
            }),
        }
    }
}

/// 模型配置 进程启动时构建一次，之后只读
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LLMConfig {
    pub provider: ProviderKind,
    /// 模型名，Azure 下为 deployment 名
    pub model: String,
    pub api_key: Option<String>,
    /// 覆盖默认 base_url
    pub endpoint: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::OpenAi,
            model: "gpt-3.5-turbo".to_string(),
            api_key: None,
            endpoint: None,
            temperature: Some(0.7),
            max_tokens: Some(1000),
        }
    }
}

/// Provider-specific knobs that do not belong to the uniform call contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderOptions {
    pub azure_api_version: String,
    pub openrouter_referer: Option<String>,
    pub openrouter_title: Option<String>,
}

impl Default for ProviderOptions {
    fn default() -> Self {
        Self {
            azure_api_version: crate::provider::azure::DEFAULT_API_VERSION.to_string(),
            openrouter_referer: None,
            openrouter_title: None,
        }
    }
}

/// Fixed-window budget applied before every upstream call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub max_requests: u32,
    pub interval: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 60,
            interval: Duration::from_millis(60_000),
        }
    }
}

/// Everything the relay process reads from its environment.
#[derive(Debug, Clone, PartialEq)]
pub struct RelayConfig {
    pub llm: LLMConfig,
    pub provider_options: ProviderOptions,
    pub rate_limit: RateLimitConfig,
    pub request_timeout: Duration,
    pub proxy: Option<String>,
    pub bind_addr: SocketAddr,
}

impl RelayConfig {
    /// Reads the configuration from the process environment.
    pub fn from_env() -> Result<Self, LLMError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    ///
    /// Blank values count as absent. Numbers and provider names that fail to parse are
    /// reported instead of silently replaced by defaults.
    ///
    /// # Examples
    ///
    /// ```
    /// use inkstream::config::{ProviderKind, RelayConfig};
    ///
    /// let config = RelayConfig::from_lookup(|key| match key {
    ///     "LLM_PROVIDER" => Some("gemini".to_string()),
    ///     "LLM_MODEL" => Some("gemini-2.0-flash".to_string()),
    ///     _ => None,
    /// })
    /// .unwrap();
    /// assert_eq!(config.llm.provider, ProviderKind::Gemini);
    /// assert_eq!(config.llm.max_tokens, Some(1000));
    /// ```
    pub fn from_lookup<F>(lookup: F) -> Result<Self, LLMError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let defaults = LLMConfig::default();

        let provider = match get("LLM_PROVIDER") {
            Some(value) => value.parse()?,
            None => defaults.provider,
        };
        let llm = LLMConfig {
            provider,
            model: get("LLM_MODEL").unwrap_or(defaults.model),
            api_key: get("LLM_API_KEY"),
            endpoint: get("LLM_API_ENDPOINT"),
            temperature: parse_opt("LLM_TEMPERATURE", get("LLM_TEMPERATURE"))?
                .or(defaults.temperature),
            max_tokens: parse_opt("LLM_MAX_TOKENS", get("LLM_MAX_TOKENS"))?.or(defaults.max_tokens),
        };

        let provider_defaults = ProviderOptions::default();
        let provider_options = ProviderOptions {
            azure_api_version: get("AZURE_OPENAI_API_VERSION")
                .unwrap_or(provider_defaults.azure_api_version),
            openrouter_referer: get("OPENROUTER_REFERER"),
            openrouter_title: get("OPENROUTER_TITLE"),
        };

        let limit_defaults = RateLimitConfig::default();
        let max_requests = parse_or(
            "LLM_RATE_LIMIT_MAX_REQUESTS",
            get("LLM_RATE_LIMIT_MAX_REQUESTS"),
            limit_defaults.max_requests,
        )?;
        let interval_ms = parse_or(
            "LLM_RATE_LIMIT_INTERVAL_MS",
            get("LLM_RATE_LIMIT_INTERVAL_MS"),
            limit_defaults.interval.as_millis() as u64,
        )?;
        if interval_ms == 0 {
            return Err(LLMError::InvalidConfig {
                field: "LLM_RATE_LIMIT_INTERVAL_MS".to_string(),
                reason: "interval must be positive".to_string(),
            });
        }
        let timeout_secs = parse_or(
            "LLM_REQUEST_TIMEOUT_SECS",
            get("LLM_REQUEST_TIMEOUT_SECS"),
            120u64,
        )?;

        Ok(Self {
            llm,
            provider_options,
            rate_limit: RateLimitConfig {
                max_requests,
                interval: Duration::from_millis(interval_ms),
            },
            request_timeout: Duration::from_secs(timeout_secs),
            proxy: get("HTTPS_PROXY").or_else(|| get("HTTP_PROXY")),
            bind_addr: parse_or(
                "RELAY_BIND_ADDR",
                get("RELAY_BIND_ADDR"),
                SocketAddr::from(([127, 0, 0, 1], 3000)),
            )?,
        })
    }
}

fn parse_opt<T>(field: &str, raw: Option<String>) -> Result<Option<T>, LLMError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    raw.map(|value| {
        value
            .trim()
            .parse()
            .map_err(|err: T::Err| LLMError::InvalidConfig {
                field: field.to_string(),
                reason: format!("{value:?}: {err}"),
            })
    })
    .transpose()
}

fn parse_or<T>(field: &str, raw: Option<String>, default: T) -> Result<T, LLMError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    Ok(parse_opt(field, raw)?.unwrap_or(default))
}
