use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use crate::error::HttexError;
use crate::http::request::{is_tls, method_for};
use crate::http::response::{headers_from, status_line_for};
use crate::request::Request;
use crate::results::ResponseRecord;

/// Wrapper around a pair of reqwest clients (one following redirects, one
/// not) with builder-pattern configuration and connection-pool settings.
pub struct HttpClient {
    follow: reqwest::Client,
    no_redirect: reqwest::Client,
}

/// Builder for [`HttpClient`].
pub struct HttpClientBuilder {
    timeout: Duration,
    pool_max_idle_per_host: usize,
    pool_idle_timeout: Duration,
    user_agent: String,
    danger_accept_invalid_certs: bool,
}

impl Default for HttpClientBuilder {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            pool_max_idle_per_host: 10,
            pool_idle_timeout: Duration::from_secs(90),
            user_agent: format!("httex/{}", env!("CARGO_PKG_VERSION")),
            danger_accept_invalid_certs: false,
        }
    }
}

impl HttpClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn pool_max_idle_per_host(mut self, n: usize) -> Self {
        self.pool_max_idle_per_host = n;
        self
    }

    pub fn pool_idle_timeout(mut self, timeout: Duration) -> Self {
        self.pool_idle_timeout = timeout;
        self
    }

    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = ua.into();
        self
    }

    pub fn danger_accept_invalid_certs(mut self, accept: bool) -> Self {
        self.danger_accept_invalid_certs = accept;
        self
    }

    fn base(&self) -> reqwest::ClientBuilder {
        reqwest::Client::builder()
            .timeout(self.timeout)
            .pool_max_idle_per_host(self.pool_max_idle_per_host)
            .pool_idle_timeout(self.pool_idle_timeout)
            .user_agent(self.user_agent.clone())
            .danger_accept_invalid_certs(self.danger_accept_invalid_certs)
            .gzip(true)
            .brotli(true)
    }

    pub fn build(self) -> Result<HttpClient, HttexError> {
        let follow = self.base().build()?;
        let no_redirect = self.base().redirect(reqwest::redirect::Policy::none()).build()?;
        Ok(HttpClient { follow, no_redirect })
    }
}

impl Default for HttpClient {
    fn default() -> Self {
        HttpClientBuilder::default()
            .build()
            .expect("default HttpClient should always build successfully")
    }
}

impl HttpClient {
    /// Create a new client with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a builder for customising the client.
    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::new()
    }

    /// Sends a single fully-resolved request and returns a [`ResponseRecord`],
    /// never an error for transport-level failures (those are attached to
    /// the record's `error` field instead).
    ///
    /// `body` is the already-materialized body (raw text or decoded
    /// external-file content); `cancel` is observed for the whole round trip.
    pub async fn send(&self, request: &Request, body: Vec<u8>, cancel: &CancellationToken) -> ResponseRecord {
        let method = match method_for(request) {
            Ok(m) => m,
            Err(e) => return ResponseRecord::errored(request.clone(), e.to_string()),
        };

        let client = if request.no_redirect { &self.no_redirect } else { &self.follow };
        let mut builder = client.request(method, &request.raw_url);
        for (name, value) in request.headers.iter() {
            builder = builder.header(name, value);
        }
        if !body.is_empty() {
            builder = builder.body(body);
        }

        let start = Instant::now();
        let response = tokio::select! {
            _ = cancel.cancelled() => {
                return ResponseRecord::errored(request.clone(), "request cancelled");
            }
            result = builder.send() => result,
        };

        let response = match response {
            Ok(r) => r,
            Err(e) => return ResponseRecord::errored(request.clone(), e.to_string()),
        };

        let status_code = response.status().as_u16();
        let status_line = status_line_for(response.status());
        let headers = headers_from(response.headers());
        let is_tls = is_tls(&request.raw_url);

        let body_bytes = match response.bytes().await {
            Ok(b) => b.to_vec(),
            Err(e) => return ResponseRecord::errored(request.clone(), e.to_string()),
        };
        let body_string = String::from_utf8_lossy(&body_bytes).into_owned();
        let size = body_bytes.len() as u64;
        let duration = start.elapsed();

        ResponseRecord {
            status_code,
            status_line,
            headers,
            body_bytes,
            body_string,
            duration,
            size,
            is_tls,
            tls_version: None,
            tls_cipher_suite: None,
            error: None,
            request: request.clone(),
        }
    }
}
