//! Check-monitoring service adapter
//!
//! Lets actors pause and unpause uptime checks around disruptive
//! operations. Credentials come from the environment: `UPTIME_TOKEN`
//! (required, sent as an app key), `UPTIME_USER`/`UPTIME_PASS`
//! (optional basic auth), `UPTIME_ENDPOINT` (optional).

use crate::error::CloudError;
use crate::rest::RestClient;
use crate::transport::HttpTransport;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

/// Default service root when `UPTIME_ENDPOINT` is unset
pub const DEFAULT_ENDPOINT: &str = "https://uptime.example.com";

/// An uptime check as the service reports it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckRef {
    /// Service-assigned id
    pub id: u64,
    /// Check name
    pub name: String,
    /// Host the check targets
    #[serde(default)]
    pub hostname: String,
    /// Whether the check is currently paused
    #[serde(default)]
    pub paused: bool,
}

/// Client for the check-monitoring service
#[derive(Debug, Clone)]
pub struct UptimeClient {
    rest: RestClient,
}

impl UptimeClient {
    /// Client over an already-configured REST client
    #[inline]
    #[must_use]
    pub fn new(rest: RestClient) -> Self {
        Self { rest }
    }

    /// Client configured from the environment
    ///
    /// # Errors
    /// `MissingCredentials` when `UPTIME_TOKEN` is unset.
    pub fn from_env(transport: Arc<dyn HttpTransport>) -> Result<Self, CloudError> {
        let token = std::env::var("UPTIME_TOKEN")
            .map_err(|_| CloudError::MissingCredentials("UPTIME_TOKEN".to_string()))?;
        let endpoint =
            std::env::var("UPTIME_ENDPOINT").unwrap_or_else(|_| DEFAULT_ENDPOINT.to_string());

        let mut rest = RestClient::new(transport, endpoint).with_header("App-Key", token);
        if let Ok(user) = std::env::var("UPTIME_USER") {
            rest = rest.with_basic_auth(user, std::env::var("UPTIME_PASS").ok());
        }
        Ok(Self::new(rest))
    }

    /// List every check
    ///
    /// # Errors
    /// `Malformed` when the listing lacks a `checks` field.
    pub async fn checks(&self) -> Result<Vec<CheckRef>, CloudError> {
        let response = self.rest.get("/api/checks").await?;
        let body = response.body.unwrap_or(Value::Null);
        let listed = body
            .get("checks")
            .and_then(Value::as_array)
            .ok_or_else(|| CloudError::Malformed("expected \"checks\" list".to_string()))?;
        listed
            .iter()
            .map(|c| {
                serde_json::from_value(c.clone()).map_err(|e| CloudError::Malformed(e.to_string()))
            })
            .collect()
    }

    /// Find a check by exact name
    ///
    /// # Errors
    /// Same failures as [`Self::checks`].
    pub async fn find_check(&self, name: &str) -> Result<Option<CheckRef>, CloudError> {
        let checks = self.checks().await?;
        Ok(checks.into_iter().find(|c| c.name == name))
    }

    /// Pause or unpause a check
    ///
    /// # Errors
    /// REST failures.
    pub async fn set_paused(&self, check: &CheckRef, paused: bool) -> Result<(), CloudError> {
        tracing::debug!(check = %check.name, paused, "updating check");
        self.rest
            .put(&format!("/api/checks/{}", check.id), json!({ "paused": paused }))
            .await?;
        Ok(())
    }
}
