//! Google Gemini adapter (`streamGenerateContent?alt=sse`).

mod error;
mod provider;
mod request;
mod stream;
mod types;

pub use provider::GeminiAdapter;
