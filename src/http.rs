// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::StatusCode;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};

const CHROME_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

/// Buffered HTTP response
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// HTTP status code
    pub status: u16,
    pub body: Bytes,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// HTTP client abstraction for testability
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn get(&self, url: &str) -> Result<HttpResponse, reqwest::Error>;

    /// POST a JSON body, optionally with a bearer token
    async fn post_json(
        &self,
        url: &str,
        body: &serde_json::Value,
        bearer: Option<&str>,
    ) -> Result<HttpResponse, reqwest::Error>;

    /// GET with a bearer token
    async fn get_authorized(&self, url: &str, bearer: &str)
    -> Result<HttpResponse, reqwest::Error>;
}

/// Retry and identity settings for [`ReqwestClient`]
#[derive(Debug, Clone)]
pub struct TransportOptions {
    /// Retries after the first attempt
    pub retry_count: u32,
    pub min_backoff: Duration,
    pub max_backoff: Duration,
    /// Open a fresh connection for every request
    pub disable_keep_alive: bool,
    pub user_agent: String,
    pub timeout: Duration,
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self {
            retry_count: 4,
            min_backoff: Duration::from_millis(10),
            max_backoff: Duration::from_millis(500),
            disable_keep_alive: true,
            user_agent: CHROME_USER_AGENT.to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

impl TransportOptions {
    /// Delay before retry number `attempt` (1-based): doubles from the
    /// minimum and never exceeds the maximum
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.min_backoff
            .checked_mul(factor)
            .unwrap_or(self.max_backoff)
            .min(self.max_backoff)
    }
}

/// Default HTTP client implementation using reqwest
#[derive(Clone)]
pub struct ReqwestClient {
    client: reqwest::Client,
    options: TransportOptions,
}

impl ReqwestClient {
    /// Create a new ReqwestClient with default settings
    pub fn new() -> Result<Self, reqwest::Error> {
        Self::with_options(TransportOptions::default())
    }

    pub fn with_options(options: TransportOptions) -> Result<Self, reqwest::Error> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/json,image/png,*/*;q=0.8"),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));

        let mut builder = reqwest::Client::builder()
            .user_agent(options.user_agent.clone())
            .default_headers(headers)
            .timeout(options.timeout);
        if options.disable_keep_alive {
            builder = builder.pool_max_idle_per_host(0);
        }

        Ok(Self {
            client: builder.build()?,
            options,
        })
    }

    /// Create a new ReqwestClient with a custom reqwest::Client
    pub fn with_client(client: reqwest::Client, options: TransportOptions) -> Self {
        Self { client, options }
    }

    async fn send<F>(&self, url: &str, request: F) -> Result<HttpResponse, reqwest::Error>
    where
        F: Fn() -> reqwest::RequestBuilder + Send + Sync,
    {
        let mut attempt = 0;

        loop {
            let retry = attempt < self.options.retry_count;

            match request().send().await {
                Ok(response) if retry && is_retryable_status(response.status()) => {
                    tracing::warn!(
                        url,
                        status = response.status().as_u16(),
                        attempt = attempt + 1,
                        "Request failed, retrying"
                    );
                }
                Ok(response) => {
                    let status = response.status().as_u16();
                    let body = response.bytes().await?;
                    if attempt > 0 {
                        tracing::debug!(url, attempts = attempt + 1, "Request succeeded after retry");
                    }
                    return Ok(HttpResponse { status, body });
                }
                Err(e) if retry && (e.is_timeout() || e.is_connect()) => {
                    tracing::warn!(url, error = %e, attempt = attempt + 1, "Request failed, retrying");
                }
                Err(e) => return Err(e),
            }

            attempt += 1;
            tokio::time::sleep(self.options.backoff(attempt)).await;
        }
    }
}

fn is_retryable_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn get(&self, url: &str) -> Result<HttpResponse, reqwest::Error> {
        self.send(url, || self.client.get(url)).await
    }

    async fn post_json(
        &self,
        url: &str,
        body: &serde_json::Value,
        bearer: Option<&str>,
    ) -> Result<HttpResponse, reqwest::Error> {
        let payload = body.to_string();
        self.send(url, || {
            let request = self
                .client
                .post(url)
                .header(CONTENT_TYPE, "application/json")
                .body(payload.clone());
            match bearer {
                Some(token) => request.header(AUTHORIZATION, format!("Bearer {token}")),
                None => request,
            }
        })
        .await
    }

    async fn get_authorized(
        &self,
        url: &str,
        bearer: &str,
    ) -> Result<HttpResponse, reqwest::Error> {
        self.send(url, || {
            self.client
                .get(url)
                .header(AUTHORIZATION, format!("Bearer {bearer}"))
        })
        .await
    }
}
