//! HTTP seam between the work item client and the network.
//!
//! The client builds [`ApiRequest`] values and hands them to a [`Transport`].
//! Production code uses [`HttpTransport`] (reqwest); tests use the recording
//! mock in [`mocks`] so they can assert on what would have gone over the wire.

use crate::error::ApiError;
use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use std::fmt;
use tracing::debug;

/// Content type for plain JSON bodies.
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// HTTP methods used by the work item API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Patch,
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HttpMethod::Get => write!(f, "GET"),
            HttpMethod::Post => write!(f, "POST"),
            HttpMethod::Patch => write!(f, "PATCH"),
        }
    }
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Patch => reqwest::Method::PATCH,
        }
    }
}

/// A fully described request, ready to send.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: HttpMethod,
    /// URL without the query string.
    pub url: String,
    pub query: Vec<(String, String)>,
    /// Value of the Authorization header.
    pub authorization: SecretString,
    pub body: Option<serde_json::Value>,
    /// Content type for `body`; defaults to [`JSON_CONTENT_TYPE`].
    pub content_type: Option<&'static str>,
}

impl ApiRequest {
    pub fn new(method: HttpMethod, url: impl Into<String>, authorization: SecretString) -> Self {
        Self {
            method,
            url: url.into(),
            query: Vec::new(),
            authorization,
            body: None,
            content_type: None,
        }
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn json(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn content_type(mut self, content_type: &'static str) -> Self {
        self.content_type = Some(content_type);
        self
    }

    /// Value of a query parameter, if present.
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// What came back: status plus raw body text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends requests. Implementations must not retry.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ApiError>;
}

/// reqwest-backed transport. Uses reqwest's default timeouts.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("ado-mobile/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        debug!(method = %request.method, url = %request.url, "Sending request");

        let mut authorization = HeaderValue::from_str(request.authorization.expose_secret())
            .map_err(|e| ApiError::InvalidRequest {
                message: format!("authorization header: {}", e),
            })?;
        authorization.set_sensitive(true);

        let mut builder = self
            .client
            .request(request.method.into(), &request.url)
            .query(&request.query)
            .header(ACCEPT, JSON_CONTENT_TYPE)
            .header(AUTHORIZATION, authorization);

        if let Some(body) = &request.body {
            let bytes = serde_json::to_vec(body).map_err(|e| ApiError::InvalidRequest {
                message: format!("request body: {}", e),
            })?;
            builder = builder
                .header(
                    CONTENT_TYPE,
                    request.content_type.unwrap_or(JSON_CONTENT_TYPE),
                )
                .body(bytes);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        debug!(status, bytes = body.len(), "Received response");

        Ok(ApiResponse { status, body })
    }
}
