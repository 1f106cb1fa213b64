use serde::Deserialize;

use crate::error::LLMError;

/// Parses error responses returned by Google Gemini.
pub(crate) fn parse_gemini_error(status: u16, body: &str) -> LLMError {
    #[derive(Deserialize)]
    struct ErrorBody {
        error: Option<InnerError>,
    }

    #[derive(Deserialize)]
    struct InnerError {
        message: Option<String>,
        status: Option<String>,
    }

    let message = match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody {
            error: Some(error),
        }) => {
            let message = error.message.unwrap_or_else(|| "unknown error".to_string());
            match error.status.as_deref() {
                Some(status_text) if !status_text.is_empty() => {
                    format!("{message} ({status_text})")
                }
                _ => message,
            }
        }
        // Fallback: if the payload cannot be parsed, return the raw body.
        _ => body.to_string(),
    };

    LLMError::Provider {
        provider: "gemini",
        status,
        message,
        body: body.to_string(),
    }
}
