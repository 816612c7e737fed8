//! The HTTP transport seam
//!
//! Adapters speak [`HttpTransport`]; production wires in
//! [`ReqwestTransport`], tests wire in stubs. Keeping the seam this
//! narrow means every adapter method is testable without a network.

use crate::error::RestError;
use async_trait::async_trait;
use serde_json::Value;

/// HTTP methods the adapters use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    /// GET
    Get,
    /// POST
    Post,
    /// PUT
    Put,
    /// DELETE
    Delete,
}

impl HttpMethod {
    /// Method name in wire form
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One outgoing request
#[derive(Debug, Clone)]
pub struct RestRequest {
    /// HTTP method
    pub method: HttpMethod,
    /// Absolute URL
    pub url: String,
    /// Extra headers
    pub headers: Vec<(String, String)>,
    /// Basic-auth credentials
    pub basic_auth: Option<(String, Option<String>)>,
    /// JSON body
    pub body: Option<Value>,
}

impl RestRequest {
    /// Request with no headers, auth, or body
    #[must_use]
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            basic_auth: None,
            body: None,
        }
    }
}

/// One incoming response
#[derive(Debug, Clone)]
pub struct RestResponse {
    /// Status code
    pub status: u16,
    /// Decoded JSON body, when the body was non-empty JSON
    pub body: Option<Value>,
    /// `Location` header, when present
    pub location: Option<String>,
}

impl RestResponse {
    /// Whether the status is 2xx
    #[inline]
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Transport abstraction over the actual HTTP stack
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Perform one HTTP exchange
    async fn send(&self, request: RestRequest) -> Result<RestResponse, RestError>;
}

/// Production transport over `reqwest`
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Transport with a fresh client
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Transport reusing an existing client
    #[inline]
    #[must_use]
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: RestRequest) -> Result<RestResponse, RestError> {
        let method = match request.method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self.client.request(method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if let Some((user, pass)) = &request.basic_auth {
            builder = builder.basic_auth(user, pass.as_deref());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        tracing::debug!(method = %request.method, url = %request.url, "sending request");

        let response = builder
            .send()
            .await
            .map_err(|e| RestError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let location = response
            .headers()
            .get(reqwest::header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let text = response
            .text()
            .await
            .map_err(|e| RestError::Transport(e.to_string()))?;

        // Empty and non-JSON bodies are tolerated; some endpoints
        // answer 204 with nothing at all.
        let body = if text.trim().is_empty() {
            None
        } else {
            serde_json::from_str(&text).ok()
        };

        Ok(RestResponse {
            status,
            body,
            location,
        })
    }
}
