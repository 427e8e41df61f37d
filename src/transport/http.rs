//! HTTP transport to the ProxyPin `/messages` endpoint.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue, USER_AGENT};
use tokio::sync::Semaphore;

use crate::config::{TransportConfig, UpstreamConfig};
use crate::envelope::{MAX_BODY_SNIPPET, ToolCallRequest, truncate_chars};
use crate::error::{ProxyPinError, Result};

use super::retry::RetryPolicy;
use super::{CallKind, Transport};

/// Identifying `User-Agent` sent with every call
pub fn user_agent() -> String {
    format!("ProxyPin-MCP-Server/{}", env!("CARGO_PKG_VERSION"))
}

/// Pooled reqwest client bound to one upstream endpoint.
///
/// Built once at startup and shared by reference. In-flight requests are capped
/// by a semaphore sized to `max_connections`; excess callers wait for a permit.
pub struct HttpTransport {
    client: Client,
    base_url: String,
    messages_url: String,
    policy: RetryPolicy,
    permits: Arc<Semaphore>,
}

impl HttpTransport {
    pub fn new(upstream: &UpstreamConfig, config: &TransportConfig) -> Result<Self> {
        // Environment proxies are ignored: the upstream is itself the system proxy
        let client = Client::builder()
            .timeout(config.timeout())
            .pool_max_idle_per_host(config.pool_size)
            .default_headers(Self::default_headers()?)
            .no_proxy()
            .build()
            .map_err(|e| ProxyPinError::Request(format!("Failed to create HTTP client: {}", e)))?;

        log::info!(
            "Created HTTP transport for {} (timeout {}ms, pool {}, max connections {}, retries {})",
            upstream.base_url(),
            config.timeout_ms,
            config.pool_size,
            config.max_connections,
            config.max_retries
        );

        Ok(Self {
            client,
            base_url: upstream.base_url(),
            messages_url: upstream.messages_url(),
            policy: RetryPolicy::from_config(config),
            permits: Arc::new(Semaphore::new(config.max_connections.max(1))),
        })
    }

    fn default_headers() -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        let agent = HeaderValue::from_str(&user_agent())
            .map_err(|e| ProxyPinError::Config(format!("Invalid user agent: {}", e)))?;
        headers.insert(USER_AGENT, agent);
        Ok(headers)
    }

    pub fn messages_url(&self) -> &str {
        &self.messages_url
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Stop accepting new calls; requests already holding a permit finish normally
    pub fn close(&self) {
        self.permits.close();
    }

    pub fn is_closed(&self) -> bool {
        self.permits.is_closed()
    }

    fn classify(&self, err: reqwest::Error) -> ProxyPinError {
        if err.is_timeout() {
            log::error!("ProxyPin request timed out: {}", err);
            ProxyPinError::Timeout {
                endpoint: self.base_url.clone(),
            }
        } else if err.is_connect() {
            log::error!("ProxyPin connection error: {}", err);
            ProxyPinError::Connection {
                endpoint: self.base_url.clone(),
                reason: err.to_string(),
            }
        } else {
            log::error!("ProxyPin request error: {}", err);
            ProxyPinError::Request(err.to_string())
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &ToolCallRequest, kind: CallKind) -> Result<String> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| ProxyPinError::Request("transport is closed".to_string()))?;

        let mut retries = 0;
        loop {
            match self.client.post(&self.messages_url).json(request).send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return response.text().await.map_err(|e| self.classify(e));
                    }

                    if self.policy.has_budget(retries) && self.policy.should_retry_status(status.as_u16(), kind) {
                        retries += 1;
                        let delay = RetryPolicy::retry_after(response.headers())
                            .unwrap_or_else(|| self.policy.backoff(retries));
                        log::warn!(
                            "Tool {} got HTTP {}, retry {}/{} in {:?}",
                            request.tool_name(),
                            status,
                            retries,
                            self.policy.max_retries,
                            delay
                        );
                        tokio::time::sleep(delay).await;
                        continue;
                    }

                    let body = response.text().await.unwrap_or_default();
                    log::error!(
                        "ProxyPin HTTP error {} for tool {}: {}",
                        status,
                        request.tool_name(),
                        truncate_chars(&body, MAX_BODY_SNIPPET)
                    );
                    let reason = status.canonical_reason().unwrap_or("Unknown Status");
                    let mut message = format!("{} for url {}", reason, self.messages_url);
                    if !body.trim().is_empty() {
                        message.push_str(": ");
                        message.push_str(&truncate_chars(body.trim(), MAX_BODY_SNIPPET));
                    }
                    return Err(ProxyPinError::Http {
                        status: status.as_u16(),
                        message,
                    });
                }
                Err(err) => {
                    let retryable = if err.is_timeout() {
                        self.policy.should_retry_timeout(kind)
                    } else if err.is_connect() {
                        self.policy.should_retry_connect()
                    } else {
                        false
                    };

                    if retryable && self.policy.has_budget(retries) {
                        retries += 1;
                        let delay = self.policy.backoff(retries);
                        log::warn!(
                            "Tool {} transport failure ({}), retry {}/{} in {:?}",
                            request.tool_name(),
                            err,
                            retries,
                            self.policy.max_retries,
                            delay
                        );
                        tokio::time::sleep(delay).await;
                        continue;
                    }

                    return Err(self.classify(err));
                }
            }
        }
    }

    fn endpoint(&self) -> &str {
        &self.base_url
    }
}
