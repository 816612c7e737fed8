//! In-memory transport for tests
//!
//! Records every request and replays queued responses. Dry-run tests
//! use the recording side to assert that no mutating call was made.

use crate::error::RestError;
use crate::transport::{HttpMethod, HttpTransport, RestRequest, RestResponse};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::VecDeque;

/// A 200 response with the given JSON body
#[must_use]
pub fn json_response(status: u16, body: Value) -> RestResponse {
    RestResponse {
        status,
        body: Some(body),
        location: None,
    }
}

/// Scripted transport: pops queued responses, then repeats a default
pub struct StubTransport {
    default: RestResponse,
    queued: Mutex<VecDeque<RestResponse>>,
    requests: Mutex<Vec<RestRequest>>,
}

impl StubTransport {
    /// Transport answering `default` once the queue is empty
    #[must_use]
    pub fn new(default: RestResponse) -> Self {
        Self {
            default,
            queued: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue a response ahead of the default
    pub fn push_response(&self, response: RestResponse) {
        self.queued.lock().push_back(response);
    }

    /// Every request seen so far
    #[must_use]
    pub fn requests(&self) -> Vec<RestRequest> {
        self.requests.lock().clone()
    }

    /// Requests that would mutate remote state
    #[must_use]
    pub fn mutating_requests(&self) -> Vec<RestRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.method != HttpMethod::Get)
            .collect()
    }
}

#[async_trait]
impl HttpTransport for StubTransport {
    async fn send(&self, request: RestRequest) -> Result<RestResponse, RestError> {
        self.requests.lock().push(request);
        let next = self.queued.lock().pop_front();
        Ok(next.unwrap_or_else(|| self.default.clone()))
    }
}
