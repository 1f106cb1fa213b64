//! Shared data structures for prompts, chat messages and normalized stream events.
//!
//! These types keep the rest of the crate agnostic of individual provider payloads.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::LLMError;

/// System prompt applied when the caller does not provide one.
pub const DEFAULT_SYSTEM_PROMPT: &str =
    "あなたは熟練したライターです。プロンプトの指示に誠実に従ってください。";

/// Chat role understood by every supported provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// Plain-text chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// System/user instruction pair sent to an LLM.
///
/// A prompt is immutable once built and always carries a non-empty user prompt.
///
/// # Examples
///
/// ```
/// use inkstream::types::{Prompt, DEFAULT_SYSTEM_PROMPT};
///
/// let prompt = Prompt::new("要約してください", None).unwrap();
/// assert_eq!(prompt.system_prompt(), DEFAULT_SYSTEM_PROMPT);
/// assert!(Prompt::new("", None).is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    user_prompt: String,
    system_prompt: Option<String>,
}

impl Prompt {
    /// Builds a prompt, rejecting an empty user prompt.
    pub fn new(
        user_prompt: impl Into<String>,
        system_prompt: Option<String>,
    ) -> Result<Self, LLMError> {
        let user_prompt = user_prompt.into();
        if user_prompt.is_empty() {
            return Err(LLMError::validation("user prompt must not be empty"));
        }
        Ok(Self {
            user_prompt,
            system_prompt: system_prompt.filter(|s| !s.is_empty()),
        })
    }

    pub fn user_prompt(&self) -> &str {
        &self.user_prompt
    }

    /// Returns the explicit system prompt or [`DEFAULT_SYSTEM_PROMPT`].
    pub fn system_prompt(&self) -> &str {
        self.system_prompt.as_deref().unwrap_or(DEFAULT_SYSTEM_PROMPT)
    }

    /// Two-message chat array: system first, then user.
    pub fn to_messages(&self) -> Vec<ChatMessage> {
        vec![
            ChatMessage::system(self.system_prompt()),
            ChatMessage::user(self.user_prompt.clone()),
        ]
    }
}

/// Uniform input handed to every provider adapter.
#[derive(Debug, Clone, PartialEq)]
pub struct CallParams {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub api_key: Option<String>,
    pub endpoint: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    /// Deadline forwarded to the HTTP transport.
    pub timeout: Option<Duration>,
}

/// Token accounting attached to the final event when the upstream reports it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Usage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_tokens: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion_tokens: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_tokens: Option<u64>,
}

/// Normalized unit of the NDJSON stream, one per line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamEvent {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

impl StreamEvent {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            usage: None,
        }
    }

    /// Encodes the event as one NDJSON line, trailing newline included.
    pub fn to_ndjson_line(&self) -> Vec<u8> {
        let mut line = serde_json::to_vec(self).unwrap_or_else(|_| b"{\"text\":\"\"}".to_vec());
        line.push(b'\n');
        line
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_uses_default_system_prompt_when_blank() {
        let prompt = Prompt::new("hello", Some(String::new())).expect("prompt");
        let messages = prompt.to_messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[0].content, DEFAULT_SYSTEM_PROMPT);
        assert_eq!(messages[1], ChatMessage::user("hello"));
    }

    #[test]
    fn prompt_keeps_explicit_system_prompt() {
        let prompt = Prompt::new("hello", Some("be terse".to_string())).expect("prompt");
        assert_eq!(prompt.system_prompt(), "be terse");
    }

    #[test]
    fn stream_event_line_omits_missing_usage() {
        let line = StreamEvent::text("こん").to_ndjson_line();
        assert_eq!(line, "{\"text\":\"こん\"}\n".as_bytes());

        let with_usage = StreamEvent {
            text: String::new(),
            usage: Some(Usage {
                prompt_tokens: Some(3),
                completion_tokens: Some(5),
                total_tokens: Some(8),
            }),
        };
        let value: serde_json::Value =
            serde_json::from_slice(&with_usage.to_ndjson_line()).expect("json");
        assert_eq!(value["usage"]["totalTokens"], 8);
        assert_eq!(value["usage"]["promptTokens"], 3);
    }
}
