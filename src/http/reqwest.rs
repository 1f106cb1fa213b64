use std::sync::Arc;

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::{Client, Proxy};
use tracing::debug;

use crate::error::LLMError;

use super::{ByteStream, DynHttpTransport, HttpRequest, HttpStreamResponse, HttpTransport};

/// 基于 reqwest 的默认 HttpTransport
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// 使用自定义 reqwest::Client
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// 创建默认配置，可选出站代理
    pub fn with_proxy(proxy: Option<&str>) -> Result<Self, LLMError> {
        let mut builder = Client::builder();
        if let Some(url) = proxy {
            debug!(proxy = url, "routing upstream requests through proxy");
            let proxy = Proxy::all(url).map_err(|err| LLMError::InvalidConfig {
                field: "HTTPS_PROXY".to_string(),
                reason: err.to_string(),
            })?;
            builder = builder.proxy(proxy);
        }
        builder
            .build()
            .map(Self::new)
            .map_err(|err| LLMError::transport(format!("failed to create reqwest client: {err}")))
    }

    fn build_request(&self, request: HttpRequest) -> Result<reqwest::RequestBuilder, LLMError> {
        let HttpRequest {
            url,
            headers,
            body,
            timeout,
        } = request;
        let mut builder = self.client.post(&url);

        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        for (name, value) in headers {
            let header_name = reqwest::header::HeaderName::from_bytes(name.as_bytes())
                .map_err(|err| LLMError::transport(format!("invalid header name: {err}")))?;
            let header_value = reqwest::header::HeaderValue::from_str(&value).map_err(|err| {
                LLMError::transport(format!("invalid header value for {header_name}: {err}"))
            })?;
            builder = builder.header(header_name, header_value);
        }

        Ok(builder.body(body))
    }

}

fn map_reqwest_error(err: reqwest::Error, request_timeout: Option<std::time::Duration>) -> LLMError {
    match request_timeout {
        Some(elapsed) if err.is_timeout() => LLMError::Timeout { elapsed },
        _ => LLMError::transport(err.to_string()),
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send_stream(&self, request: HttpRequest) -> Result<HttpStreamResponse, LLMError> {
        let timeout = request.timeout;
        let response = self
            .build_request(request)?
            .send()
            .await
            .map_err(|err| map_reqwest_error(err, timeout))?;

        let status = response.status().as_u16();
        let stream = response.bytes_stream().map(move |chunk| {
            chunk
                .map(|bytes| bytes.to_vec())
                .map_err(|err| map_reqwest_error(err, timeout))
        });
        let body: ByteStream = Box::pin(stream);

        Ok(HttpStreamResponse { status, body })
    }
}

/// 便捷构造线程安全 Transport
pub fn dyn_transport(proxy: Option<&str>) -> Result<DynHttpTransport, LLMError> {
    Ok(Arc::new(ReqwestTransport::with_proxy(proxy)?))
}
