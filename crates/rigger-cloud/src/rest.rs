//! JSON REST client
//!
//! Wraps a transport with a base URL, default headers, credentials,
//! and the location-follow behavior the service adapters rely on:
//! when a mutating call answers with a `Location` header, the client
//! fetches it and returns that representation instead.

use crate::error::RestError;
use crate::transport::{HttpMethod, HttpTransport, RestRequest, RestResponse};
use serde_json::Value;
use std::sync::Arc;

const BODY_SNIPPET_LEN: usize = 200;

/// REST client bound to one service
#[derive(Clone)]
pub struct RestClient {
    transport: Arc<dyn HttpTransport>,
    base_url: String,
    default_headers: Vec<(String, String)>,
    basic_auth: Option<(String, Option<String>)>,
}

impl RestClient {
    /// Client for a service root, e.g. `https://scaler.example.com`
    #[must_use]
    pub fn new(transport: Arc<dyn HttpTransport>, base_url: impl Into<String>) -> Self {
        Self {
            transport,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            default_headers: Vec::new(),
            basic_auth: None,
        }
    }

    /// Add a default header sent with every request
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.push((name.into(), value.into()));
        self
    }

    /// Send basic-auth credentials with every request
    #[must_use]
    pub fn with_basic_auth(mut self, user: impl Into<String>, pass: Option<String>) -> Self {
        self.basic_auth = Some((user.into(), pass));
        self
    }

    /// The service root
    #[inline]
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GET a path
    ///
    /// # Errors
    /// `RestError` on transport failure or non-2xx status.
    pub async fn get(&self, path: &str) -> Result<RestResponse, RestError> {
        self.send(HttpMethod::Get, path, None).await
    }

    /// POST a path with an optional JSON body
    ///
    /// # Errors
    /// `RestError` on transport failure or non-2xx status.
    pub async fn post(&self, path: &str, body: Option<Value>) -> Result<RestResponse, RestError> {
        self.send(HttpMethod::Post, path, body).await
    }

    /// PUT a path with a JSON body
    ///
    /// # Errors
    /// `RestError` on transport failure or non-2xx status.
    pub async fn put(&self, path: &str, body: Value) -> Result<RestResponse, RestError> {
        self.send(HttpMethod::Put, path, Some(body)).await
    }

    /// DELETE a path
    ///
    /// # Errors
    /// `RestError` on transport failure or non-2xx status.
    pub async fn delete(&self, path: &str) -> Result<RestResponse, RestError> {
        self.send(HttpMethod::Delete, path, None).await
    }

    fn url_for(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    fn request(&self, method: HttpMethod, url: String, body: Option<Value>) -> RestRequest {
        RestRequest {
            method,
            url,
            headers: self.default_headers.clone(),
            basic_auth: self.basic_auth.clone(),
            body,
        }
    }

    async fn send(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<Value>,
    ) -> Result<RestResponse, RestError> {
        let url = self.url_for(path);
        let mut response = self
            .transport
            .send(self.request(method, url, body))
            .await?;

        // A Location answer points at the resource the call produced;
        // fetch it so callers see the final representation.
        if let Some(location) = response.location.take() {
            let follow_url = self.url_for(&location);
            response = self
                .transport
                .send(self.request(HttpMethod::Get, follow_url, None))
                .await?;
        }

        if response.is_success() {
            Ok(response)
        } else {
            let body = response
                .body
                .as_ref()
                .map(|b| b.to_string())
                .unwrap_or_default();
            let snippet: String = body.chars().take(BODY_SNIPPET_LEN).collect();
            Err(RestError::Http {
                status: response.status,
                body: snippet,
            })
        }
    }
}

impl std::fmt::Debug for RestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestClient")
            .field("base_url", &self.base_url)
            .field("default_headers", &self.default_headers)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::StubTransport;
    use serde_json::json;

    fn ok(body: Value) -> RestResponse {
        RestResponse {
            status: 200,
            body: Some(body),
            location: None,
        }
    }

    #[tokio::test]
    async fn joins_paths_against_base() {
        let transport = Arc::new(StubTransport::new(ok(json!({}))));
        let client = RestClient::new(transport.clone(), "https://svc.example.com/");
        client.get("/api/arrays").await.unwrap();
        client.get("api/arrays").await.unwrap();

        let requests = transport.requests();
        assert_eq!(requests[0].url, "https://svc.example.com/api/arrays");
        assert_eq!(requests[1].url, "https://svc.example.com/api/arrays");
    }

    #[tokio::test]
    async fn sends_default_headers_and_auth() {
        let transport = Arc::new(StubTransport::new(ok(json!({}))));
        let client = RestClient::new(transport.clone(), "https://svc.example.com")
            .with_header("App-Key", "abc123")
            .with_basic_auth("user", Some("pass".into()));
        client.get("/x").await.unwrap();

        let request = &transport.requests()[0];
        assert!(request
            .headers
            .iter()
            .any(|(k, v)| k == "App-Key" && v == "abc123"));
        assert_eq!(
            request.basic_auth,
            Some(("user".to_string(), Some("pass".to_string())))
        );
    }

    #[tokio::test]
    async fn follows_location() {
        let transport = Arc::new(StubTransport::new(ok(json!({"task": "done"}))));
        transport.push_response(RestResponse {
            status: 201,
            body: None,
            location: Some("/api/tasks/7".into()),
        });
        let client = RestClient::new(transport.clone(), "https://svc.example.com");

        let response = client.post("/api/arrays/1/terminate", None).await.unwrap();
        assert_eq!(response.body.unwrap()["task"], "done");

        let requests = transport.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].method, HttpMethod::Get);
        assert_eq!(requests[1].url, "https://svc.example.com/api/tasks/7");
    }

    #[tokio::test]
    async fn non_2xx_is_error() {
        let transport = Arc::new(StubTransport::new(RestResponse {
            status: 422,
            body: Some(json!({"error": "unprocessable"})),
            location: None,
        }));
        let client = RestClient::new(transport, "https://svc.example.com");

        let err = client.post("/api/arrays/1/launch", None).await.unwrap_err();
        assert_eq!(err.status(), Some(422));
        assert!(!err.is_retryable());
    }
}
