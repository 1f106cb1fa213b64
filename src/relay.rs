//! HTTP relay: `POST /api/stream` turns an editor request into a prompt and forwards the
//! client's NDJSON stream byte for byte.

use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use futures_util::TryStreamExt;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{error, info};

use crate::client::LLMClient;
use crate::error::LLMError;
use crate::types::Prompt;

/// Path served by [`router`].
pub const STREAM_PATH: &str = "/api/stream";

/// One prior turn of the editor conversation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HistoryTurn {
    pub role: String,
    #[serde(default)]
    pub content: String,
}

/// JSON body accepted by the relay.
///
/// `text` and `userPrompt` stay untyped so that a non-string value is reported with the
/// same message as a missing one. Unknown fields such as `options` are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayRequest {
    #[serde(default)]
    pub text: Option<Value>,
    #[serde(default)]
    pub history: Option<Vec<HistoryTurn>>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub system_prompt: Option<String>,
    #[serde(default)]
    pub user_prompt: Option<Value>,
}

fn non_empty_string(value: Option<&Value>) -> Option<&str> {
    match value {
        Some(Value::String(text)) if !text.is_empty() => Some(text.as_str()),
        _ => None,
    }
}

/// Renders the conversation so far followed by the new user message.
fn render_conversation(history: &[HistoryTurn], text: &str) -> String {
    let mut conversation = history
        .iter()
        .map(|turn| match turn.role.as_str() {
            "assistant" => format!("アシスタント: {}", turn.content),
            _ => format!("ユーザー: {}", turn.content),
        })
        .collect::<Vec<_>>()
        .join("\n");
    conversation.push_str("\nユーザー: ");
    conversation.push_str(text);
    conversation
}

/// Validates a request and derives the prompt to send upstream.
///
/// # Errors
///
/// Returns [`LLMError::Validation`] with the message the editor displays.
pub fn build_prompt(request: &RelayRequest) -> Result<Prompt, LLMError> {
    let kind = request.kind.as_deref().unwrap_or("full");
    let user_prompt = if kind == "menu" {
        non_empty_string(request.user_prompt.as_ref())
            .ok_or_else(|| LLMError::validation("User prompt is required for menu type"))?
            .to_string()
    } else {
        // text 先于类型校验
        let text = non_empty_string(request.text.as_ref())
            .ok_or_else(|| LLMError::validation("Text is required"))?;
        match kind {
            "full" => match request.history.as_deref() {
                Some(history) if !history.is_empty() => render_conversation(history, text),
                _ => text.to_string(),
            },
            _ => return Err(LLMError::validation("Invalid analysis type")),
        }
    };
    Prompt::new(user_prompt, request.system_prompt.clone())
}

/// Builds the relay router around a shared client.
pub fn router(client: Arc<LLMClient>) -> Router {
    Router::new()
        .route(STREAM_PATH, post(stream))
        .with_state(client)
}

async fn stream(State(client): State<Arc<LLMClient>>, body: Bytes) -> Response {
    let request: RelayRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(err) => return error_response(StatusCode::BAD_REQUEST, err.to_string()),
    };
    let prompt = match build_prompt(&request) {
        Ok(prompt) => prompt,
        Err(LLMError::Validation { message }) => {
            return error_response(StatusCode::BAD_REQUEST, message);
        }
        Err(err) => return error_response(StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
    };

    info!(
        kind = request.kind.as_deref().unwrap_or("full"),
        provider = client.provider_name(),
        "relaying stream"
    );
    match client.generate_stream(&prompt).await {
        Ok(upstream) => {
            let upstream = upstream.inspect_err(|err| error!(error = %err, "stream aborted"));
            (
                [
                    (header::CONTENT_TYPE, "text/event-stream"),
                    (header::CACHE_CONTROL, "no-cache"),
                    (header::CONNECTION, "keep-alive"),
                ],
                Body::from_stream(upstream),
            )
                .into_response()
        }
        Err(err) => {
            error!(error = %err, "stream setup failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
    }
}

fn error_response(status: StatusCode, message: String) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ClientOptions;
    use crate::config::LLMConfig;
    use crate::http::mock::{ScriptedResponse, ScriptedTransport};
    use crate::types::DEFAULT_SYSTEM_PROMPT;

    fn request(body: Value) -> RelayRequest {
        serde_json::from_value(body).expect("request")
    }

    fn client(transport: Arc<ScriptedTransport>) -> Arc<LLMClient> {
        Arc::new(LLMClient::new(
            LLMConfig::default(),
            transport,
            ClientOptions::default(),
        ))
    }

    async fn call(client: Arc<LLMClient>, body: &str) -> (StatusCode, Response) {
        let response = stream(State(client), Bytes::from(body.to_string())).await;
        (response.status(), response)
    }

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        String::from_utf8(bytes.to_vec()).expect("utf-8")
    }

    async fn error_message(response: Response) -> String {
        let value: Value = serde_json::from_str(&body_text(response).await).expect("json");
        value["error"].as_str().expect("error field").to_string()
    }

    #[test]
    fn full_without_history_uses_text_verbatim() {
        let prompt = build_prompt(&request(json!({ "text": "こんにちは" }))).expect("prompt");
        assert_eq!(prompt.user_prompt(), "こんにちは");
        assert_eq!(prompt.system_prompt(), DEFAULT_SYSTEM_PROMPT);

        let prompt = build_prompt(&request(json!({ "text": "hi", "history": [] }))).expect("prompt");
        assert_eq!(prompt.user_prompt(), "hi");
    }

    #[test]
    fn history_is_rendered_as_labelled_turns() {
        let prompt = build_prompt(&request(json!({
            "text": "続けて",
            "history": [
                { "role": "user", "content": "物語を書いて" },
                { "role": "assistant", "content": "昔々" }
            ],
            "systemPrompt": "簡潔に"
        })))
        .expect("prompt");
        assert_eq!(
            prompt.user_prompt(),
            "ユーザー: 物語を書いて\nアシスタント: 昔々\nユーザー: 続けて"
        );
        assert_eq!(prompt.system_prompt(), "簡潔に");
    }

    #[test]
    fn validation_messages() {
        let cases = [
            (json!({}), "Text is required"),
            (json!({ "text": "" }), "Text is required"),
            (json!({ "text": 42 }), "Text is required"),
            (json!({ "type": "menu", "text": "x" }), "User prompt is required for menu type"),
            (json!({ "type": "style" }), "Text is required"),
            (json!({ "type": "style", "text": "" }), "Text is required"),
            (json!({ "type": "style", "text": "x" }), "Invalid analysis type"),
        ];
        for (body, expected) in cases {
            match build_prompt(&request(body)) {
                Err(LLMError::Validation { message }) => assert_eq!(message, expected),
                other => panic!("unexpected result: {other:?}"),
            }
        }
    }

    #[test]
    fn menu_uses_user_prompt_verbatim() {
        let prompt = build_prompt(&request(json!({
            "type": "menu",
            "userPrompt": "以下の文章を要約してください:\n\n\"本文\"",
            "systemPrompt": ""
        })))
        .expect("prompt");
        assert_eq!(prompt.user_prompt(), "以下の文章を要約してください:\n\n\"本文\"");
        assert_eq!(prompt.system_prompt(), DEFAULT_SYSTEM_PROMPT);

        let prompt = build_prompt(&request(json!({
            "type": "menu",
            "userPrompt": "以下の文章を翻訳してください:\n\n\"本文\""
        })))
        .expect("prompt");
        assert_eq!(prompt.user_prompt(), "以下の文章を翻訳してください:\n\n\"本文\"");
        assert_eq!(prompt.system_prompt(), DEFAULT_SYSTEM_PROMPT);
    }

    #[tokio::test]
    async fn streams_upstream_ndjson_with_sse_headers() {
        let transport = Arc::new(ScriptedTransport::new(vec![ScriptedResponse::ok(vec![
            "data: {\"choices\":[{\"index\":0,\"delta\":{\"content\":\"こん\"}}]}\n\n",
            "data: {\"choices\":[{\"index\":0,\"delta\":{\"content\":\"にちは\"}}]}\n\ndata: [DONE]\n\n",
        ])]));
        let (status, response) =
            call(client(transport.clone()), r#"{"text":"こんにちは","type":"full"}"#).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).map(|v| v.as_bytes()),
            Some(&b"text/event-stream"[..])
        );
        assert_eq!(
            response.headers().get(header::CACHE_CONTROL).map(|v| v.as_bytes()),
            Some(&b"no-cache"[..])
        );
        assert_eq!(
            body_text(response).await,
            "{\"text\":\"こん\"}\n{\"text\":\"にちは\"}\n"
        );
        assert_eq!(transport.last_json()["messages"][1]["content"], "こんにちは");
    }

    #[tokio::test]
    async fn missing_fields_answer_400() {
        let transport = Arc::new(ScriptedTransport::default());
        let (status, response) = call(client(transport.clone()), r#"{"type":"menu"}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error_message(response).await, "User prompt is required for menu type");

        let (status, response) = call(client(transport.clone()), "{}").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error_message(response).await, "Text is required");

        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn malformed_json_answers_400() {
        let transport = Arc::new(ScriptedTransport::default());
        let (status, response) = call(client(transport), "{\"text\": ").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(!error_message(response).await.is_empty());
    }

    #[tokio::test]
    async fn upstream_failure_answers_500_with_message() {
        let transport = Arc::new(ScriptedTransport::new(vec![ScriptedResponse::status(
            401,
            r#"{"error":{"message":"Incorrect API key provided"}}"#,
        )]));
        let (status, response) = call(client(transport), r#"{"text":"hi"}"#).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let message = error_message(response).await;
        assert!(message.contains("401"), "message: {message}");
        assert!(message.contains("Incorrect API key provided"), "message: {message}");
    }
}
