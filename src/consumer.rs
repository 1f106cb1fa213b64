//! Client-side reader of the relay stream.
//!
//! [`StreamConsumer`] posts a payload, reassembles the NDJSON response across chunk
//! boundaries and publishes the growing text through a `watch` channel. Starting a new
//! run cancels the one in flight.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use futures_util::StreamExt;
use reqwest::StatusCode;
use serde_json::Value;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::LLMError;
use crate::http::{DynHttpTransport, HttpRequest, collect_body_text};
use crate::ndjson::TextAccumulator;

/// 消费者所处阶段
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Phase {
    #[default]
    Idle,
    Streaming,
    Error,
}

/// Snapshot published after every change.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConsumerState {
    pub phase: Phase,
    /// Text accumulated so far by the current run.
    pub result: String,
    /// `true` from the start of a run until its stream is drained or fails.
    pub loading: bool,
    pub error: Option<String>,
}

struct ActiveRun {
    id: u64,
    token: CancellationToken,
}

/// 流式响应的消费端
pub struct StreamConsumer {
    transport: DynHttpTransport,
    state: watch::Sender<ConsumerState>,
    active: Mutex<ActiveRun>,
    next_id: AtomicU64,
}

impl StreamConsumer {
    pub fn new(transport: DynHttpTransport) -> Self {
        let (state, _) = watch::channel(ConsumerState::default());
        Self {
            transport,
            state,
            active: Mutex::new(ActiveRun {
                id: 0,
                token: CancellationToken::new(),
            }),
            next_id: AtomicU64::new(1),
        }
    }

    /// Receives every published [`ConsumerState`].
    pub fn subscribe(&self) -> watch::Receiver<ConsumerState> {
        self.state.subscribe()
    }

    /// Current snapshot.
    pub fn state(&self) -> ConsumerState {
        self.state.borrow().clone()
    }

    /// Stops the run in flight, if any, leaving the published state untouched.
    pub fn cancel(&self) {
        let mut active = self.lock_active();
        active.token.cancel();
        active.id = self.next_id.fetch_add(1, Ordering::Relaxed);
    }

    /// Posts `payload` to `endpoint` and streams the answer into the published state.
    ///
    /// Returns the full text once the stream is drained.
    ///
    /// # Errors
    ///
    /// [`LLMError::Aborted`] when a newer run or [`StreamConsumer::cancel`] supersedes
    /// this one; the published state then belongs to the newer run. Non-2xx answers,
    /// transport failures and serialization errors are returned and also published as
    /// [`Phase::Error`].
    pub async fn start(&self, payload: &Value, endpoint: &str) -> Result<String, LLMError> {
        let (id, token) = self.begin();
        let outcome = tokio::select! {
            _ = token.cancelled() => Err(LLMError::Aborted {
                message: "superseded by a newer request".to_string(),
            }),
            outcome = self.run(id, payload, endpoint) => outcome,
        };

        match &outcome {
            Ok(_) => {
                self.publish(id, |state| {
                    state.phase = Phase::Idle;
                    state.loading = false;
                });
            }
            Err(LLMError::Aborted { .. }) => debug!(run = id, "stream run superseded"),
            Err(err) => {
                warn!(run = id, error = %err, "stream run failed");
                let message = match err {
                    LLMError::Provider { message, .. } => message.clone(),
                    other => other.to_string(),
                };
                self.publish(id, |state| {
                    state.phase = Phase::Error;
                    state.loading = false;
                    state.error = Some(message);
                });
            }
        }
        outcome
    }

    /// Cancels the previous run and resets the state for a new one.
    fn begin(&self) -> (u64, CancellationToken) {
        let mut active = self.lock_active();
        active.token.cancel();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let token = CancellationToken::new();
        *active = ActiveRun {
            id,
            token: token.clone(),
        };
        self.state.send_replace(ConsumerState {
            phase: Phase::Streaming,
            result: String::new(),
            loading: true,
            error: None,
        });
        (id, token)
    }

    async fn run(&self, id: u64, payload: &Value, endpoint: &str) -> Result<String, LLMError> {
        let body = serde_json::to_vec(payload)
            .map_err(|err| LLMError::validation(format!("failed to serialize payload: {err}")))?;
        let response = self
            .transport
            .send_stream(HttpRequest::post_json(endpoint, body))
            .await?;

        if !response.is_success() {
            let status = response.status;
            let text = collect_body_text(response.body).await?;
            let reason = StatusCode::from_u16(status)
                .ok()
                .and_then(|code| code.canonical_reason())
                .unwrap_or_default();
            return Err(LLMError::Provider {
                provider: "relay",
                status,
                message: format!("request failed: {status} {reason}\n{text}"),
                body: text,
            });
        }

        let mut body = response.body;
        let mut acc = TextAccumulator::default();
        while let Some(chunk) = body.next().await {
            if acc.feed(&chunk?) {
                self.publish_result(id, acc.text());
            }
        }
        if acc.finish() {
            self.publish_result(id, acc.text());
        }
        Ok(acc.into_text())
    }

    fn publish_result(&self, id: u64, text: &str) {
        self.publish(id, |state| {
            state.result.clear();
            state.result.push_str(text);
        });
    }

    /// Applies `update` only while `id` is still the active run.
    ///
    /// The check and the update happen under the same lock as [`StreamConsumer::begin`],
    /// so a superseded run can never overwrite the state of its successor.
    fn publish(&self, id: u64, update: impl FnOnce(&mut ConsumerState)) {
        let active = self.lock_active();
        if active.id == id {
            self.state.send_modify(update);
        }
    }

    fn lock_active(&self) -> std::sync::MutexGuard<'_, ActiveRun> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
