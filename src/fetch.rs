//! HTTP plumbing: request/response values, the transport seam and the
//! retry-with-linear-backoff wrapper every read goes through.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

use crate::config::{parse_base_url, ApiConfig, ConfigError};

pub type TransportFuture<'a> =
    Pin<Box<dyn Future<Output = Result<ApiResponse, TransportError>> + Send + 'a>>;
pub type SleepFuture<'a> = Pin<Box<dyn Future<Output = ()> + Send + 'a>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }

    fn as_reqwest(self) -> reqwest::Method {
        match self {
            Self::Get => reqwest::Method::GET,
            Self::Post => reqwest::Method::POST,
            Self::Put => reqwest::Method::PUT,
            Self::Delete => reqwest::Method::DELETE,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::Post,
            path: path.into(),
            query: Vec::new(),
            body: Some(body),
        }
    }

    pub fn put(path: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::Put,
            path: path.into(),
            query: Vec::new(),
            body: Some(body),
        }
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self {
            method: Method::Delete,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn with_query_pairs(mut self, pairs: impl IntoIterator<Item = (String, String)>) -> Self {
        self.query.extend(pairs);
        self
    }

    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl ApiResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn json(status: u16, body: &Value) -> Self {
        Self::new(status, body.to_string())
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_server_error(&self) -> bool {
        self.status >= 500
    }

    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("transport failure: {message}")]
pub struct TransportError {
    pub message: String,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("server answered {status} after {attempts} attempt(s)")]
    ServerError { status: u16, attempts: u32 },
    #[error("request failed after {attempts} attempt(s): {message}")]
    Transport { attempts: u32, message: String },
}

/// Sends one request and hands back the raw status and body.
pub trait Transport: Send + Sync + 'static {
    fn send<'a>(&'a self, request: &'a ApiRequest) -> TransportFuture<'a>;
}

pub trait Sleeper: Send + Sync + 'static {
    fn sleep(&self, duration: Duration) -> SleepFuture<'_>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
    fn sleep(&self, duration: Duration) -> SleepFuture<'_> {
        Box::pin(tokio::time::sleep(duration))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub retries: u32,
    pub backoff_step_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: 3,
            backoff_step_ms: 1_000,
        }
    }
}

impl RetryPolicy {
    pub fn single_attempt() -> Self {
        Self {
            retries: 1,
            backoff_step_ms: 0,
        }
    }

    /// Delay slept after failed attempt `attempt` (1-based).
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.backoff_step_ms.saturating_mul(u64::from(attempt)))
    }
}

pub async fn fetch_with_retry(
    transport: &dyn Transport,
    sleeper: &dyn Sleeper,
    policy: &RetryPolicy,
    request: &ApiRequest,
) -> Result<ApiResponse, FetchError> {
    let attempts = policy.retries.max(1);
    let mut attempt: u32 = 1;

    loop {
        match transport.send(request).await {
            Ok(response) if !response.is_server_error() => {
                debug!(
                    component = "fetch",
                    event = "http.response",
                    method = request.method.as_str(),
                    path = %request.path,
                    status = response.status,
                    attempt
                );
                return Ok(response);
            }
            Ok(response) => {
                if attempt >= attempts {
                    warn!(
                        component = "fetch",
                        event = "http.retry.exhausted",
                        method = request.method.as_str(),
                        path = %request.path,
                        status = response.status,
                        attempts
                    );
                    return Err(FetchError::ServerError {
                        status: response.status,
                        attempts,
                    });
                }
                warn!(
                    component = "fetch",
                    event = "http.retry",
                    method = request.method.as_str(),
                    path = %request.path,
                    status = response.status,
                    attempt
                );
            }
            Err(err) => {
                if attempt >= attempts {
                    warn!(
                        component = "fetch",
                        event = "http.retry.exhausted",
                        method = request.method.as_str(),
                        path = %request.path,
                        error = %err,
                        attempts
                    );
                    return Err(FetchError::Transport {
                        attempts,
                        message: err.message,
                    });
                }
                warn!(
                    component = "fetch",
                    event = "http.retry",
                    method = request.method.as_str(),
                    path = %request.path,
                    error = %err,
                    attempt
                );
            }
        }

        sleeper.sleep(policy.backoff_for(attempt)).await;
        attempt += 1;
    }
}

#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    base_url: Url,
}

impl ReqwestTransport {
    pub fn new(config: &ApiConfig) -> Result<Self, ConfigError> {
        let base_url = parse_base_url(&config.base_url)?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|err| ConfigError::HttpClientBuild(err.to_string()))?;
        Ok(Self { client, base_url })
    }

    pub fn url_for(&self, request: &ApiRequest) -> Result<Url, TransportError> {
        let mut url = self
            .base_url
            .join(request.path.trim_start_matches('/'))
            .map_err(|err| TransportError::new(format!("invalid path {}: {err}", request.path)))?;

        if !request.query.is_empty() {
            url.query_pairs_mut().extend_pairs(
                request
                    .query
                    .iter()
                    .map(|(key, value)| (key.as_str(), value.as_str())),
            );
        }

        Ok(url)
    }
}

impl Transport for ReqwestTransport {
    fn send<'a>(&'a self, request: &'a ApiRequest) -> TransportFuture<'a> {
        Box::pin(async move {
            let url = self.url_for(request)?;
            let mut builder = self.client.request(request.method.as_reqwest(), url);

            if let Some(body) = &request.body {
                let bytes =
                    serde_json::to_vec(body).map_err(|err| TransportError::new(err.to_string()))?;
                builder = builder
                    .header(reqwest::header::CONTENT_TYPE, "application/json")
                    .body(bytes);
            }

            let response = builder
                .send()
                .await
                .map_err(|err| TransportError::new(err.to_string()))?;
            let status = response.status().as_u16();
            let body = response
                .bytes()
                .await
                .map_err(|err| TransportError::new(err.to_string()))?;

            Ok::<_, TransportError>(ApiResponse {
                status,
                body: body.to_vec(),
            })
        })
    }
}


#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::test_support::{RecordingSleeper, ScriptedTransport};
    use super::*;

    fn run(
        transport: &ScriptedTransport,
        sleeper: &RecordingSleeper,
        policy: RetryPolicy,
    ) -> Result<ApiResponse, FetchError> {
        let rt = tokio::runtime::Builder::new_current_thread()
            .build()
            .expect("runtime should build");
        rt.block_on(fetch_with_retry(
            transport,
            sleeper,
            &policy,
            &ApiRequest::get("/api/empreendimentos"),
        ))
    }

    #[test]
    fn success_returns_immediately_without_backoff() {
        let transport = ScriptedTransport::new().respond(200, json!([]));
        let sleeper = RecordingSleeper::default();

        let response = run(&transport, &sleeper, RetryPolicy::default()).unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(transport.requests().len(), 1);
        assert!(sleeper.slept().is_empty());
    }

    #[test]
    fn client_error_is_returned_without_retry() {
        let transport = ScriptedTransport::new()
            .respond(404, json!({"erro": "Contrato não encontrado"}))
            .respond(200, json!([]));
        let sleeper = RecordingSleeper::default();

        let response = run(&transport, &sleeper, RetryPolicy::default()).unwrap();

        assert_eq!(response.status, 404);
        assert_eq!(transport.requests().len(), 1);
        assert!(sleeper.slept().is_empty());
    }

    #[test]
    fn server_errors_back_off_linearly_then_succeed() {
        let transport = ScriptedTransport::new()
            .respond(503, json!({}))
            .respond(500, json!({}))
            .respond(200, json!({"sucesso": true}));
        let sleeper = RecordingSleeper::default();

        let response = run(&transport, &sleeper, RetryPolicy::default()).unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(transport.requests().len(), 3);
        assert_eq!(
            sleeper.slept(),
            vec![Duration::from_millis(1_000), Duration::from_millis(2_000)]
        );
    }

    #[test]
    fn transport_failures_are_retried_and_surface_after_exhaustion() {
        let transport = ScriptedTransport::new()
            .fail("connection refused")
            .fail("connection refused")
            .fail("connection reset");
        let sleeper = RecordingSleeper::default();

        let err = run(&transport, &sleeper, RetryPolicy::default()).unwrap_err();

        assert_eq!(
            err,
            FetchError::Transport {
                attempts: 3,
                message: "connection reset".to_string()
            }
        );
        assert_eq!(transport.requests().len(), 3);
        assert_eq!(sleeper.slept().len(), 2);
    }

    #[test]
    fn exhausted_server_errors_surface_last_status() {
        let transport = ScriptedTransport::new()
            .respond(502, json!({}))
            .respond(503, json!({}));
        let sleeper = RecordingSleeper::default();
        let policy = RetryPolicy {
            retries: 2,
            backoff_step_ms: 10,
        };

        let err = run(&transport, &sleeper, policy).unwrap_err();

        assert_eq!(
            err,
            FetchError::ServerError {
                status: 503,
                attempts: 2
            }
        );
        assert_eq!(sleeper.slept(), vec![Duration::from_millis(10)]);
    }

    #[test]
    fn zero_retries_still_makes_one_attempt() {
        let transport = ScriptedTransport::new().respond(500, json!({}));
        let sleeper = RecordingSleeper::default();
        let policy = RetryPolicy {
            retries: 0,
            backoff_step_ms: 1_000,
        };

        let err = run(&transport, &sleeper, policy).unwrap_err();

        assert!(matches!(err, FetchError::ServerError { attempts: 1, .. }));
        assert!(sleeper.slept().is_empty());
    }

    #[test]
    fn url_joins_under_base_path_and_encodes_query() {
        let transport = ReqwestTransport::new(&ApiConfig {
            base_url: "https://comissoes.example.com/app".to_string(),
            ..ApiConfig::default()
        })
        .unwrap();
        let request = ApiRequest::get("/api/buscar-por-lote").with_query("lote", "12 A&B");

        let url = transport.url_for(&request).unwrap();

        assert_eq!(
            url.as_str(),
            "https://comissoes.example.com/app/api/buscar-por-lote?lote=12+A%26B"
        );
    }
}
