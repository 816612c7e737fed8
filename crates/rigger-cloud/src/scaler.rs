//! Server-array service adapter
//!
//! Conceptual operations the array actors need: find, clone, update,
//! launch, terminate, destroy, run an executable across instances,
//! and wait for server-side tasks. Not a one-to-one mapping of any
//! vendor API.
//!
//! Credentials come from the environment: `SCALER_TOKEN` (required)
//! and `SCALER_ENDPOINT` (optional).

use crate::error::{CloudError, RestError};
use crate::params;
use crate::rest::RestClient;
use crate::transport::HttpTransport;
use futures::future;
use rigger_core::RetryPolicy;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;

/// Default service root when `SCALER_ENDPOINT` is unset
pub const DEFAULT_ENDPOINT: &str = "https://scaler.example.com";

fn default_state() -> String {
    "disabled".to_string()
}

fn default_min_count() -> u32 {
    1
}

/// A server array as the service reports it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrayRef {
    /// Service-assigned id; zero marks a dry-run stub
    pub id: u64,
    /// Array name
    pub name: String,
    /// `enabled` or `disabled`
    #[serde(default = "default_state")]
    pub state: String,
    /// Instances the array scales up to at minimum
    #[serde(default = "default_min_count")]
    pub min_count: u32,
}

impl ArrayRef {
    /// Stand-in array for dry runs when the real one does not exist
    ///
    /// Carries workable elasticity values so downstream steps keep
    /// executing.
    #[must_use]
    pub fn stub(name: &str) -> Self {
        Self {
            id: 0,
            name: name.to_string(),
            state: default_state(),
            min_count: 4,
        }
    }

    /// Whether this is a dry-run stand-in
    #[inline]
    #[must_use]
    pub fn is_stub(&self) -> bool {
        self.id == 0
    }
}

/// An instance inside a server array
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceRef {
    /// Instance name
    pub name: String,
    /// Lifecycle state reported by the service
    pub state: String,
    /// Resource path used for per-instance calls
    pub href: String,
}

/// A server-side task produced by a long-running operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRef {
    /// Resource path polled for completion
    pub href: String,
}

/// Client for the server-array service
#[derive(Debug, Clone)]
pub struct ScalerClient {
    rest: RestClient,
    launch_retry: RetryPolicy,
    poll_retry: RetryPolicy,
    poll_interval: Duration,
}

impl ScalerClient {
    /// Client over an already-configured REST client
    #[must_use]
    pub fn new(rest: RestClient) -> Self {
        Self {
            rest,
            launch_retry: RetryPolicy::new(3),
            poll_retry: RetryPolicy::new(20),
            poll_interval: Duration::from_secs(5),
        }
    }

    /// Client configured from the environment
    ///
    /// # Errors
    /// `MissingCredentials` when `SCALER_TOKEN` is unset.
    pub fn from_env(transport: Arc<dyn HttpTransport>) -> Result<Self, CloudError> {
        let token = std::env::var("SCALER_TOKEN")
            .map_err(|_| CloudError::MissingCredentials("SCALER_TOKEN".to_string()))?;
        let endpoint =
            std::env::var("SCALER_ENDPOINT").unwrap_or_else(|_| DEFAULT_ENDPOINT.to_string());
        let rest = RestClient::new(transport, endpoint)
            .with_header("Authorization", format!("Bearer {token}"));
        Ok(Self::new(rest))
    }

    /// Override the task poll interval (tests shrink it)
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Override the launch retry policy
    #[must_use]
    pub fn with_launch_retry(mut self, policy: RetryPolicy) -> Self {
        self.launch_retry = policy;
        self
    }

    /// Override the poll retry policy
    #[must_use]
    pub fn with_poll_retry(mut self, policy: RetryPolicy) -> Self {
        self.poll_retry = policy;
        self
    }

    /// Find a server array by name
    ///
    /// # Errors
    /// `Malformed` when the listing lacks an `arrays` field.
    pub async fn find_array(
        &self,
        name: &str,
        exact: bool,
    ) -> Result<Option<ArrayRef>, CloudError> {
        tracing::debug!(name, exact, "searching for server array");
        let response = self
            .rest
            .get(&format!("/api/arrays?name={name}&exact={exact}"))
            .await?;
        let body = response.body.unwrap_or(Value::Null);
        let listed = body
            .get("arrays")
            .and_then(Value::as_array)
            .ok_or_else(|| CloudError::Malformed("expected \"arrays\" list".to_string()))?;

        let mut arrays: Vec<ArrayRef> = listed
            .iter()
            .map(|a| serde_json::from_value(a.clone()))
            .collect::<Result<_, _>>()
            .map_err(|e| CloudError::Malformed(e.to_string()))?;
        if exact {
            arrays.retain(|a| a.name == name);
        }

        if arrays.is_empty() {
            tracing::debug!(name, "no matching server array");
        }
        Ok(arrays.into_iter().next())
    }

    /// Clone an existing array; returns the new array
    ///
    /// # Errors
    /// REST or response-shape failures.
    pub async fn clone_array(&self, source: &ArrayRef) -> Result<ArrayRef, CloudError> {
        tracing::debug!(source = %source.name, "cloning server array");
        let response = self
            .rest
            .post(&format!("/api/arrays/{}/clone", source.id), None)
            .await?;
        array_from(response.body)
    }

    /// Patch array fields; returns the updated array
    ///
    /// # Errors
    /// REST or response-shape failures; 422 means the parameters were
    /// rejected.
    pub async fn update_array(
        &self,
        array: &ArrayRef,
        fields: &Map<String, Value>,
    ) -> Result<ArrayRef, CloudError> {
        let body = params::to_body(&params::bracketed("server_array", fields));
        tracing::debug!(array = %array.name, %body, "patching server array");
        let response = self
            .rest
            .put(&format!("/api/arrays/{}", array.id), body)
            .await?;
        array_from(response.body)
    }

    /// Update the array's next-instance inputs
    ///
    /// The service answers 204 with no body, so there is nothing to
    /// verify beyond the status.
    ///
    /// # Errors
    /// REST failures.
    pub async fn update_array_inputs(
        &self,
        array: &ArrayRef,
        inputs: &Map<String, Value>,
    ) -> Result<(), CloudError> {
        let body = params::to_body(&params::bracketed("inputs", inputs));
        tracing::debug!(array = %array.name, %body, "patching next-instance inputs");
        self.rest
            .put(&format!("/api/arrays/{}/inputs", array.id), body)
            .await?;
        Ok(())
    }

    /// Launch one instance of the array
    ///
    /// Concurrent launches against one array are rejected with 422, so
    /// callers click serially and this call retries the rejection.
    ///
    /// # Errors
    /// REST or response-shape failures after the retry budget.
    pub async fn launch_instance(&self, array: &ArrayRef) -> Result<InstanceRef, CloudError> {
        let path = format!("/api/arrays/{}/launch", array.id);
        self.launch_retry
            .run_if(
                "launch instance",
                || async {
                    let response = self.rest.post(&path, None).await?;
                    instance_from(response.body)
                },
                |e: &CloudError| e.is_retryable() || e.status() == Some(422),
            )
            .await
    }

    /// List the array's current instances
    ///
    /// # Errors
    /// REST or response-shape failures.
    pub async fn current_instances(
        &self,
        array: &ArrayRef,
        filter: Option<&str>,
    ) -> Result<Vec<InstanceRef>, CloudError> {
        let filter = filter.unwrap_or("state!=terminated");
        tracing::debug!(array = %array.name, filter, "listing current instances");
        let response = self
            .rest
            .get(&format!("/api/arrays/{}/instances?filter={filter}", array.id))
            .await?;
        let body = response.body.unwrap_or(Value::Null);
        let listed = body
            .get("instances")
            .and_then(Value::as_array)
            .ok_or_else(|| CloudError::Malformed("expected \"instances\" list".to_string()))?;
        listed
            .iter()
            .map(|i| {
                serde_json::from_value(i.clone()).map_err(|e| CloudError::Malformed(e.to_string()))
            })
            .collect()
    }

    /// Terminate every instance in the array and wait for the job
    ///
    /// A 422 answer means there was nothing to terminate. The
    /// termination job routinely reports failure for hosts that are
    /// already gone, so a failed task is logged and tolerated.
    ///
    /// # Errors
    /// Transport-level failures only.
    pub async fn terminate_all_instances(&self, array: &ArrayRef) -> Result<(), CloudError> {
        tracing::debug!(array = %array.name, "terminating all instances");
        let response = match self
            .rest
            .post(&format!("/api/arrays/{}/terminate", array.id), None)
            .await
        {
            Ok(response) => response,
            Err(RestError::Http { status: 422, .. }) => return Ok(()),
            Err(e) => return Err(e.into()),
        };

        if let Ok(task) = task_from(response.body) {
            match self.wait_for_task(&task).await {
                Ok(()) => {}
                Err(CloudError::TaskFailed(summary)) => {
                    tracing::debug!(%summary, "terminate job reported failure, continuing");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    /// Destroy the array
    ///
    /// # Errors
    /// REST failures.
    pub async fn destroy_array(&self, array: &ArrayRef) -> Result<(), CloudError> {
        tracing::debug!(array = %array.name, "destroying server array");
        self.rest.delete(&format!("/api/arrays/{}", array.id)).await?;
        Ok(())
    }

    /// Run an executable on a set of instances, one task per instance
    ///
    /// Names containing `::` address a recipe, anything else a script.
    ///
    /// # Errors
    /// The first per-instance failure aborts the fan-out.
    pub async fn run_executable(
        &self,
        name: &str,
        inputs: &Map<String, Value>,
        instances: &[InstanceRef],
    ) -> Result<Vec<TaskRef>, CloudError> {
        let mut body = Map::new();
        if name.contains("::") {
            body.insert("recipe".to_string(), Value::String(name.to_string()));
        } else {
            body.insert("script".to_string(), Value::String(name.to_string()));
        }
        for (key, value) in params::bracketed("inputs", inputs) {
            body.insert(key, value);
        }

        let calls = instances.iter().map(|instance| {
            let body = Value::Object(body.clone());
            let path = format!("{}/run", instance.href);
            async move {
                tracing::debug!(instance = %instance.name, executable = name, "starting executable");
                let response = self.rest.post(&path, Some(body)).await?;
                task_from(response.body)
            }
        });

        future::try_join_all(calls).await
    }

    /// Poll a task until it finishes
    ///
    /// Success means the summary mentions `success` or `completed`;
    /// `failed` turns into `TaskFailed`. Transient poll errors are
    /// retried.
    ///
    /// # Errors
    /// `TaskFailed` or exhausted poll retries.
    pub async fn wait_for_task(&self, task: &TaskRef) -> Result<(), CloudError> {
        loop {
            let response = self
                .poll_retry
                .run_if(
                    "poll task",
                    || async { self.rest.get(&task.href).await.map_err(CloudError::from) },
                    |e: &CloudError| e.is_retryable(),
                )
                .await?;

            let summary = response
                .body
                .as_ref()
                .and_then(|b| b.get("summary"))
                .and_then(Value::as_str)
                .unwrap_or("")
                .to_ascii_lowercase();

            if summary.contains("success") || summary.contains("completed") {
                return Ok(());
            }
            if summary.contains("failed") {
                return Err(CloudError::TaskFailed(summary));
            }

            tracing::debug!(
                task = %task.href,
                %summary,
                checked_at = %chrono::Utc::now().to_rfc3339(),
                "task still running"
            );
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

fn array_from(body: Option<Value>) -> Result<ArrayRef, CloudError> {
    let value = body
        .and_then(|b| b.get("array").cloned())
        .ok_or_else(|| CloudError::Malformed("expected \"array\" object".to_string()))?;
    serde_json::from_value(value).map_err(|e| CloudError::Malformed(e.to_string()))
}

fn instance_from(body: Option<Value>) -> Result<InstanceRef, CloudError> {
    let value = body
        .and_then(|b| b.get("instance").cloned())
        .ok_or_else(|| CloudError::Malformed("expected \"instance\" object".to_string()))?;
    serde_json::from_value(value).map_err(|e| CloudError::Malformed(e.to_string()))
}

fn task_from(body: Option<Value>) -> Result<TaskRef, CloudError> {
    let value = body
        .and_then(|b| b.get("task").cloned())
        .ok_or_else(|| CloudError::Malformed("expected \"task\" object".to_string()))?;
    serde_json::from_value(value).map_err(|e| CloudError::Malformed(e.to_string()))
}
