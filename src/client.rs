use std::future::Future;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::config::{LLMConfig, ProviderOptions, RateLimitConfig, RelayConfig};
use crate::error::LLMError;
use crate::http::{ByteStream, DynHttpTransport};
use crate::ndjson::collect_text;
use crate::provider::{Provider, ProviderAdapter};
use crate::rate_limit::RateLimiter;
use crate::types::{CallParams, Prompt};

/// 限流失败后的最大重试次数，总尝试次数为其加一
const MAX_RETRIES: u32 = 3;
const BASE_BACKOFF: Duration = Duration::from_millis(1_000);

/// Knobs of the client that are not part of the model configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientOptions {
    pub provider_options: ProviderOptions,
    pub rate_limit: RateLimitConfig,
    pub request_timeout: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            provider_options: ProviderOptions::default(),
            rate_limit: RateLimitConfig::default(),
            request_timeout: Duration::from_secs(120),
        }
    }
}

/// LLM 调用入口 负责限流、重试与排队
///
/// 一个进程构建一次，通过 `Arc` 注入到需要它的地方。
pub struct LLMClient {
    config: LLMConfig,
    provider: Provider,
    limiter: RateLimiter,
    /// `process_text` 的 FIFO 队列；tokio 的 Mutex 按申请顺序唤醒等待者
    queue: Mutex<()>,
    request_timeout: Duration,
}

impl LLMClient {
    pub fn new(config: LLMConfig, transport: DynHttpTransport, options: ClientOptions) -> Self {
        let provider = Provider::from_config(&config, &options.provider_options, transport);
        Self {
            config,
            provider,
            limiter: RateLimiter::new(options.rate_limit),
            queue: Mutex::new(()),
            request_timeout: options.request_timeout,
        }
    }

    /// 从进程配置构建
    pub fn from_relay_config(config: &RelayConfig, transport: DynHttpTransport) -> Self {
        Self::new(
            config.llm.clone(),
            transport,
            ClientOptions {
                provider_options: config.provider_options.clone(),
                rate_limit: config.rate_limit,
                request_timeout: config.request_timeout,
            },
        )
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    /// 发起流式生成，返回 NDJSON 字节流
    ///
    /// 不经过队列：并发的调用并发执行，只共享限流窗口。
    pub async fn generate_stream(&self, prompt: &Prompt) -> Result<ByteStream, LLMError> {
        self.execute_with_retry(move || self.provider.call(self.call_params(prompt)))
            .await
    }

    /// 排队执行一次完整生成并返回拼接后的文本
    ///
    /// 调用严格按提交顺序逐个执行；拿到队列后整个调用受 `request_timeout` 约束。
    ///
    /// # Errors
    ///
    /// 超时返回 [`LLMError::Timeout`]，其余错误同 [`LLMClient::generate_stream`]。
    pub async fn process_text(&self, prompt: &Prompt) -> Result<String, LLMError> {
        let _turn = self.queue.lock().await;
        let work = self.execute_with_retry(move || async move {
            let body = self.provider.call(self.call_params(prompt)).await?;
            collect_text(body).await
        });
        match tokio::time::timeout(self.request_timeout, work).await {
            Ok(result) => result,
            Err(_) => Err(LLMError::Timeout {
                elapsed: self.request_timeout,
            }),
        }
    }

    /// 在限流检查后执行 `op`，只对 [`LLMError::RateLimitExceeded`] 做指数退避重试
    ///
    /// 退避依次为 2s、4s、8s，最多尝试 4 次；其它错误立即返回。
    pub async fn execute_with_retry<T, F, Fut>(&self, mut op: F) -> Result<T, LLMError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, LLMError>>,
    {
        let mut attempt = 0u32;
        loop {
            let result = match self.limiter.check_limit() {
                Ok(()) => op().await,
                Err(err) => Err(err),
            };
            match result {
                Err(err) if err.is_rate_limited() && attempt < MAX_RETRIES => {
                    let delay = BASE_BACKOFF * 2u32.pow(attempt + 1);
                    attempt += 1;
                    warn!(
                        provider = self.provider.name(),
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "rate limited, backing off"
                    );
                    tokio::time::sleep(delay).await;
                }
                other => return other,
            }
        }
    }

    fn call_params(&self, prompt: &Prompt) -> CallParams {
        debug!(
            provider = self.provider.name(),
            model = %self.config.model,
            "dispatching prompt"
        );
        CallParams {
            model: self.config.model.clone(),
            messages: prompt.to_messages(),
            api_key: self.config.api_key.clone(),
            endpoint: self.config.endpoint.clone(),
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
            timeout: Some(self.request_timeout),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProviderKind;
    use crate::http::mock::{ScriptedResponse, ScriptedTransport};
    use crate::http::{HttpRequest, HttpStreamResponse, HttpTransport};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex as StdMutex};
    use tokio::time::Instant;

    fn sse(text: &str) -> String {
        format!(
            "data: {{\"choices\":[{{\"index\":0,\"delta\":{{\"content\":\"{text}\"}}}}]}}\n\ndata: [DONE]\n\n"
        )
    }

    fn client_with(transport: DynHttpTransport, rate_limit: RateLimitConfig) -> LLMClient {
        LLMClient::new(
            LLMConfig {
                api_key: Some("sk-test".to_string()),
                ..LLMConfig::default()
            },
            transport,
            ClientOptions {
                rate_limit,
                ..ClientOptions::default()
            },
        )
    }

    fn generous() -> RateLimitConfig {
        RateLimitConfig {
            max_requests: 100,
            interval: Duration::from_secs(60),
        }
    }

    /// Paused-clock timers fire on millisecond ticks.
    fn assert_near(actual: Duration, expected: Duration) {
        assert!(
            actual >= expected && actual <= expected + Duration::from_millis(2),
            "expected about {expected:?}, got {actual:?}"
        );
    }

    fn prompt(text: &str) -> Prompt {
        Prompt::new(text, None).expect("prompt")
    }

    #[tokio::test(start_paused = true)]
    async fn retries_rate_limit_four_times_with_backoff() {
        let client = client_with(Arc::new(ScriptedTransport::default()), generous());
        let attempts = AtomicU32::new(0);
        let counter = &attempts;
        let started = Instant::now();

        let result: Result<(), LLMError> = client
            .execute_with_retry(|| async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(LLMError::RateLimitExceeded {
                    retry_after: Duration::from_secs(1),
                })
            })
            .await;

        assert!(result.unwrap_err().is_rate_limited());
        assert_eq!(attempts.load(Ordering::SeqCst), 4);
        assert_near(started.elapsed(), Duration::from_secs(14));
    }

    #[tokio::test(start_paused = true)]
    async fn other_errors_are_not_retried() {
        let client = client_with(Arc::new(ScriptedTransport::default()), generous());
        let attempts = AtomicU32::new(0);
        let counter = &attempts;
        let started = Instant::now();

        let result: Result<(), LLMError> = client
            .execute_with_retry(|| async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(LLMError::transport("connection reset"))
            })
            .await;

        assert!(matches!(result, Err(LLMError::Transport { .. })));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn local_limiter_rejection_recovers_once_window_resets() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            ScriptedResponse::ok(vec![sse("first")]),
            ScriptedResponse::ok(vec![sse("second")]),
        ]));
        let client = client_with(
            transport.clone(),
            RateLimitConfig {
                max_requests: 1,
                interval: Duration::from_secs(5),
            },
        );
        let started = Instant::now();

        assert_eq!(client.process_text(&prompt("a")).await.expect("first"), "first");
        // Rejected at t=0 and t=2s, admitted at t=6s.
        assert_eq!(client.process_text(&prompt("b")).await.expect("second"), "second");
        assert_near(started.elapsed(), Duration::from_secs(6));
        assert_eq!(transport.requests().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_budget_surfaces_rate_limit_error() {
        let transport = Arc::new(ScriptedTransport::new(vec![ScriptedResponse::ok(vec![sse(
            "only",
        )])]));
        let client = client_with(
            transport.clone(),
            RateLimitConfig {
                max_requests: 1,
                interval: Duration::from_secs(60),
            },
        );

        client.generate_stream(&prompt("a")).await.expect("first");
        match client.generate_stream(&prompt("b")).await {
            Err(LLMError::RateLimitExceeded { retry_after }) => {
                assert_near(Duration::from_secs(60 - 14), retry_after);
            }
            Err(other) => panic!("unexpected error type: {other:?}"),
            Ok(_) => panic!("expected rate limit"),
        }
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn provider_error_is_not_retried() {
        let transport = Arc::new(ScriptedTransport::new(vec![ScriptedResponse::status(
            401,
            r#"{"error":{"message":"Incorrect API key provided"}}"#,
        )]));
        let client = client_with(transport.clone(), generous());

        match client.process_text(&prompt("a")).await {
            Err(LLMError::Provider { status, .. }) => assert_eq!(status, 401),
            other => panic!("unexpected result: {other:?}"),
        }
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn call_params_follow_configuration() {
        let transport = Arc::new(ScriptedTransport::new(vec![ScriptedResponse::ok(vec![sse(
            "x",
        )])]));
        let client = client_with(transport.clone(), generous());
        assert_eq!(client.provider_name(), ProviderKind::OpenAi.as_str());

        let prompt = Prompt::new("要約して", Some("短く".to_string())).expect("prompt");
        client.process_text(&prompt).await.expect("text");

        let sent = transport.last_json();
        assert_eq!(sent["model"], "gpt-3.5-turbo");
        assert_eq!(sent["max_tokens"], 1000);
        assert_eq!(sent["messages"][0]["content"], "短く");
        assert_eq!(sent["messages"][1]["content"], "要約して");
        assert_eq!(
            transport.requests()[0].timeout,
            Some(Duration::from_secs(120))
        );
    }

    /// Records when each request starts before delegating to a scripted transport.
    struct TimedTransport {
        inner: ScriptedTransport,
        started: StdMutex<Vec<Instant>>,
    }

    #[async_trait]
    impl HttpTransport for TimedTransport {
        async fn send_stream(&self, request: HttpRequest) -> Result<HttpStreamResponse, LLMError> {
            self.started.lock().expect("started lock").push(Instant::now());
            self.inner.send_stream(request).await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn process_text_runs_one_at_a_time_in_submission_order() {
        let transport = Arc::new(TimedTransport {
            inner: ScriptedTransport::new(vec![
                ScriptedResponse::ok(vec![sse("one")]).delayed(Duration::from_millis(300)),
                ScriptedResponse::ok(vec![sse("two")]).delayed(Duration::from_millis(10)),
                ScriptedResponse::ok(vec![sse("three")]).delayed(Duration::from_millis(100)),
            ]),
            started: StdMutex::new(Vec::new()),
        });
        let client = client_with(transport.clone(), generous());
        let (first, second, third) = (prompt("A"), prompt("B"), prompt("C"));
        let origin = Instant::now();

        let (a, b, c) = tokio::join!(
            client.process_text(&first),
            client.process_text(&second),
            client.process_text(&third),
        );
        assert_eq!(a.expect("a"), "one");
        assert_eq!(b.expect("b"), "two");
        assert_eq!(c.expect("c"), "three");

        let users: Vec<String> = transport
            .inner
            .requests()
            .iter()
            .map(|request| {
                let body: serde_json::Value =
                    serde_json::from_slice(&request.body).expect("json body");
                body["messages"][1]["content"]
                    .as_str()
                    .expect("user content")
                    .to_string()
            })
            .collect();
        assert_eq!(users, ["A", "B", "C"]);

        let offsets: Vec<Duration> = transport
            .started
            .lock()
            .expect("started lock")
            .iter()
            .map(|at| at.duration_since(origin))
            .collect();
        assert_eq!(offsets.len(), 3);
        assert_near(offsets[0], Duration::ZERO);
        assert_near(offsets[1], Duration::from_millis(300));
        assert_near(offsets[2], Duration::from_millis(310));
    }

    #[tokio::test(start_paused = true)]
    async fn process_text_times_out() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            ScriptedResponse::ok(vec![sse("late")]).delayed(Duration::from_secs(30)),
        ]));
        let client = LLMClient::new(
            LLMConfig::default(),
            transport,
            ClientOptions {
                request_timeout: Duration::from_secs(5),
                ..ClientOptions::default()
            },
        );

        match client.process_text(&prompt("a")).await {
            Err(LLMError::Timeout { elapsed }) => assert_eq!(elapsed, Duration::from_secs(5)),
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
