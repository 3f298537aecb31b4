//! HTTP seam between the stores and the REST API.
//!
//! [`Transport`] performs one round-trip and knows nothing about sessions;
//! [`ApiClient`] wraps it with the session guard and the status mapping.
use std::future::Future;

use api_types::ErrorBody;
use reqwest::{Method, Url};
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::{
    error::{LedgerError, ResultLedger},
    session::Session,
};

pub const IDEMPOTENCY_HEADER: &str = "Idempotency-Key";

#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    /// Path relative to the API base URL, e.g. `categories/42`.
    pub path: String,
    pub query: Vec<(String, String)>,
    pub bearer: Option<String>,
    pub idempotency_key: Option<String>,
    pub body: Option<serde_json::Value>,
}

impl ApiRequest {
    fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            bearer: None,
            idempotency_key: None,
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn post<B: serde::Serialize>(path: impl Into<String>, body: &B) -> ResultLedger<Self> {
        Self::new(Method::POST, path).with_body(body)
    }

    pub fn put<B: serde::Serialize>(path: impl Into<String>, body: &B) -> ResultLedger<Self> {
        Self::new(Method::PUT, path).with_body(body)
    }

    fn with_body<B: serde::Serialize>(mut self, body: &B) -> ResultLedger<Self> {
        let value = serde_json::to_value(body)
            .map_err(|err| LedgerError::server(None, format!("cannot encode request: {err}")))?;
        self.body = Some(value);
        Ok(self)
    }

    pub fn with_query(mut self, key: &str, value: impl Into<String>) -> Self {
        self.query.push((key.to_string(), value.into()));
        self
    }

    pub fn with_idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.idempotency_key = Some(key.into());
        self
    }

    /// Value of a query parameter, if set.
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
    pub body: String,
}

impl ApiResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    fn error_message(&self) -> String {
        serde_json::from_str::<ErrorBody>(&self.body)
            .map(|err| err.message)
            .unwrap_or_else(|_| "unknown error".to_string())
    }

    fn decode<R: DeserializeOwned>(&self) -> ResultLedger<R> {
        serde_json::from_str(&self.body).map_err(|err| {
            LedgerError::server(Some(self.status), format!("invalid response body: {err}"))
        })
    }
}

/// The request never produced an HTTP answer.
#[derive(Debug, Error)]
#[error("server unreachable: {0}")]
pub struct TransportError(pub String);

impl From<reqwest::Error> for TransportError {
    fn from(value: reqwest::Error) -> Self {
        Self(value.to_string())
    }
}

pub trait Transport: Send + Sync {
    fn send(
        &self,
        request: ApiRequest,
    ) -> impl Future<Output = Result<ApiResponse, TransportError>> + Send;
}

/// [`Transport`] over `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    base_url: Url,
    http: reqwest::Client,
}

impl HttpTransport {
    pub fn new(base_url: &str) -> Result<Self, TransportError> {
        // `Url::join` replaces the last segment unless the base ends with '/'.
        let mut normalized = base_url.trim().to_string();
        if !normalized.ends_with('/') {
            normalized.push('/');
        }
        let base_url = Url::parse(&normalized)
            .map_err(|err| TransportError(format!("invalid base_url: {err}")))?;
        Ok(Self {
            base_url,
            http: reqwest::Client::new(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }
}

impl Transport for HttpTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        let endpoint = self
            .base_url
            .join(request.path.trim_start_matches('/'))
            .map_err(|err| TransportError(format!("invalid path {}: {err}", request.path)))?;

        let mut builder = self.http.request(request.method, endpoint);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(token) = &request.bearer {
            builder = builder.bearer_auth(token);
        }
        if let Some(key) = &request.idempotency_key {
            builder = builder.header(IDEMPOTENCY_HEADER, key);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let res = builder.send().await?;
        let status = res.status().as_u16();
        let body = res.text().await?;
        Ok(ApiResponse { status, body })
    }
}

/// Session-guarded API access shared by every store.
#[derive(Debug, Clone)]
pub struct ApiClient<T> {
    transport: T,
    session: Session,
}

impl<T: Transport> ApiClient<T> {
    pub fn new(transport: T, session: Session) -> Self {
        Self { transport, session }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Authenticated round-trip: pre-flight check, bearer header, status
    /// mapping. A 401/403 invalidates the session before returning.
    pub async fn execute(&self, mut request: ApiRequest) -> ResultLedger<ApiResponse> {
        let credential = self.session.authorize()?;
        request.bearer = Some(credential.bearer().to_string());

        let res = self.round_trip(request).await?;
        if res.is_success() {
            return Ok(res);
        }

        let err = match res.status {
            401 | 403 => {
                self.session.reject(&credential, res.status);
                LedgerError::Unauthorized
            }
            404 => LedgerError::NotFound(res.error_message()),
            status => LedgerError::server(Some(status), res.error_message()),
        };
        Err(err)
    }

    /// Unauthenticated round-trip used by login/register. Client errors are
    /// reported as validation failures and never touch the session.
    pub async fn execute_public(&self, request: ApiRequest) -> ResultLedger<ApiResponse> {
        let res = self.round_trip(request).await?;
        if res.is_success() {
            return Ok(res);
        }
        let message = res.error_message();
        Err(match res.status {
            400..=499 => LedgerError::Validation(message),
            status => LedgerError::server(Some(status), message),
        })
    }

    pub async fn fetch<R: DeserializeOwned>(&self, request: ApiRequest) -> ResultLedger<R> {
        self.execute(request).await?.decode()
    }

    pub async fn fetch_public<R: DeserializeOwned>(&self, request: ApiRequest) -> ResultLedger<R> {
        self.execute_public(request).await?.decode()
    }

    async fn round_trip(&self, request: ApiRequest) -> ResultLedger<ApiResponse> {
        tracing::debug!("{} {}", request.method, request.path);
        let res = self.transport.send(request).await.map_err(|err| {
            tracing::warn!("{err}");
            LedgerError::from(err)
        })?;
        if !res.is_success() {
            tracing::debug!("answered {}", res.status);
        }
        Ok(res)
    }
}
