//! 面向 AI 写作编辑器的流式 LLM 中继
//!
//! Five backends (OpenAI, Azure OpenAI, Gemini, DeepSeek, OpenRouter) are normalized into
//! one NDJSON stream of `{"text": ...}` lines. [`client::LLMClient`] adds rate limiting,
//! retry and a FIFO queue, [`relay`] exposes the stream over HTTP and
//! [`consumer::StreamConsumer`] reads it back on the client side.

pub mod actions;
pub mod client;
pub mod config;
pub mod consumer;
pub mod error;
pub mod http;
pub mod ndjson;
pub mod provider;
pub mod rate_limit;
pub mod relay;
pub mod stream;
pub mod types;

pub use client::{ClientOptions, LLMClient};
pub use config::{LLMConfig, ProviderKind, RelayConfig};
pub use consumer::{ConsumerState, Phase, StreamConsumer};
pub use error::LLMError;
pub use provider::{Provider, ProviderAdapter};
pub use types::{CallParams, ChatMessage, Prompt, Role, StreamEvent, Usage};
