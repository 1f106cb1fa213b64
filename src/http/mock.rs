//! Scripted transport used by unit tests in place of the network.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{StreamExt, stream};

use crate::error::LLMError;

use super::{ByteStream, HttpRequest, HttpStreamResponse, HttpTransport};

/// One canned answer.
pub(crate) struct ScriptedResponse {
    pub(crate) status: u16,
    pub(crate) chunks: Vec<Result<Vec<u8>, LLMError>>,
    /// Pause before the response head is returned.
    pub(crate) delay: Duration,
}

impl ScriptedResponse {
    pub(crate) fn ok<I, S>(chunks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Vec<u8>>,
    {
        Self {
            status: 200,
            chunks: chunks.into_iter().map(|c| Ok(c.into())).collect(),
            delay: Duration::ZERO,
        }
    }

    pub(crate) fn status(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            chunks: vec![Ok(body.into())],
            delay: Duration::ZERO,
        }
    }

    pub(crate) fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// Replays responses in order and records every request it receives.
#[derive(Default)]
pub(crate) struct ScriptedTransport {
    responses: Mutex<VecDeque<ScriptedResponse>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub(crate) fn new(responses: Vec<ScriptedResponse>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().expect("requests lock").clone()
    }

    pub(crate) fn last_json(&self) -> serde_json::Value {
        let requests = self.requests();
        let last = requests.last().expect("at least one request");
        serde_json::from_slice(&last.body).expect("request body is JSON")
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn send_stream(&self, request: HttpRequest) -> Result<HttpStreamResponse, LLMError> {
        self.requests.lock().expect("requests lock").push(request);
        let next = self
            .responses
            .lock()
            .expect("responses lock")
            .pop_front()
            .expect("no scripted response left");
        if !next.delay.is_zero() {
            tokio::time::sleep(next.delay).await;
        }
        let body: ByteStream = stream::iter(next.chunks).boxed();
        Ok(HttpStreamResponse {
            status: next.status,
            body,
        })
    }
}
