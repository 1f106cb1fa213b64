use serde::Deserialize;
use serde_json::Value;

use crate::error::LLMError;

/// Parses the `{"error": {...}}` envelope shared by OpenAI-compatible APIs.
///
/// The raw body is always kept; the message falls back to it when the envelope is absent.
pub(crate) fn parse_openai_error(provider: &'static str, status: u16, body: &str) -> LLMError {
    #[derive(Deserialize)]
    struct ErrorBody {
        error: Option<InnerError>,
    }
    #[derive(Deserialize)]
    struct InnerError {
        message: Option<String>,
        code: Option<Value>,
    }

    let message = match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody {
            error: Some(error),
        }) => {
            let message = error.message.unwrap_or_else(|| "unknown error".to_string());
            match error.code {
                Some(Value::Null) | None => message,
                Some(code) => format!("{message} ({code})"),
            }
        }
        _ => body.to_string(),
    };

    LLMError::Provider {
        provider,
        status,
        message,
        body: body.to_string(),
    }
}
