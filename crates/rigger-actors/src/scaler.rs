//! Server-array actors
//!
//! Clone, update, launch, destroy, and run executables against server
//! arrays through the scaler adapter. Lookups happen even in dry
//! runs; a missing array during a dry run is replaced by a stub so
//! downstream steps keep executing.

use crate::registry::Registry;
use async_trait::async_trait;
use rigger_cloud::{ArrayRef, ScalerClient};
use rigger_core::{Actor, ActorContext, ActorError, ActorOptions};
use rigger_script::ActorDef;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::time::Duration;

const DEFAULT_WAIT_SLEEP: Duration = Duration::from_secs(60);

fn client_for(registry: &Registry) -> Result<ScalerClient, ActorError> {
    ScalerClient::from_env(registry.transport()).map_err(ActorError::from)
}

/// What a lookup expects of the array's existence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Expect {
    /// Missing array is an error (stub in dry runs when allowed)
    MustExist { allow_stub: bool },
    /// Existing array is an error
    MustNotExist,
}

async fn find_array(
    client: &ScalerClient,
    ctx: &ActorContext,
    name: &str,
    expect: Expect,
) -> Result<Option<ArrayRef>, ActorError> {
    match expect {
        Expect::MustExist { .. } => {
            tracing::info!(array = name, "verifying array exists");
        }
        Expect::MustNotExist => {
            tracing::info!(array = name, "verifying array does not exist");
        }
    }

    let mut found = client.find_array(name, true).await.map_err(ActorError::from)?;

    if let Expect::MustExist { allow_stub } = expect {
        if found.is_none() && ctx.dry() && allow_stub {
            tracing::info!(array = name, "array not found, using a dry-run stub");
            found = Some(ArrayRef::stub(name));
        }
    }

    match (expect, &found) {
        (Expect::MustNotExist, Some(_)) => Err(ActorError::Unrecoverable(format!(
            "array \"{name}\" already exists"
        ))),
        (Expect::MustExist { .. }, None) => Err(ActorError::Unrecoverable(format!(
            "array \"{name}\" not found"
        ))),
        _ => Ok(found),
    }
}

async fn set_array_state(
    client: &ScalerClient,
    array: &ArrayRef,
    state: &str,
) -> Result<ArrayRef, ActorError> {
    let mut fields = Map::new();
    fields.insert("state".to_string(), Value::String(state.to_string()));
    client
        .update_array(array, &fields)
        .await
        .map_err(ActorError::from)
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CloneOpts {
    source: String,
    dest: String,
}

/// Factory for `scaler.Clone`
pub fn clone_factory(
    def: &ActorDef,
    registry: &Registry,
    _depth: usize,
) -> Result<Box<dyn Actor>, ActorError> {
    let opts: CloneOpts = ActorOptions::new(def.options.clone())?.typed()?;
    Ok(Box::new(CloneActor {
        client: client_for(registry)?,
        source: opts.source,
        dest: opts.dest,
    }))
}

struct CloneActor {
    client: ScalerClient,
    source: String,
    dest: String,
}

#[async_trait]
impl Actor for CloneActor {
    fn kind(&self) -> &str {
        "scaler.Clone"
    }

    async fn execute(&self, ctx: &ActorContext) -> Result<(), ActorError> {
        // The source must really exist, dry run or not.
        let source = find_array(
            &self.client,
            ctx,
            &self.source,
            Expect::MustExist { allow_stub: false },
        )
        .await?
        .ok_or_else(|| ActorError::Unrecoverable(format!("array \"{}\" not found", self.source)))?;

        find_array(&self.client, ctx, &self.dest, Expect::MustNotExist).await?;

        if ctx.dry() {
            tracing::info!(source = %source.name, dest = %self.dest, "would clone array");
            return Ok(());
        }

        tracing::info!(source = %source.name, "cloning array");
        let new_array = self
            .client
            .clone_array(&source)
            .await
            .map_err(ActorError::from)?;

        tracing::info!(from = %new_array.name, to = %self.dest, "renaming cloned array");
        let mut fields = Map::new();
        fields.insert("name".to_string(), Value::String(self.dest.clone()));
        self.client
            .update_array(&new_array, &fields)
            .await
            .map_err(ActorError::from)?;

        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct UpdateOpts {
    array: String,
    #[serde(default)]
    params: Option<Map<String, Value>>,
    #[serde(default)]
    inputs: Option<Map<String, Value>>,
}

/// Factory for `scaler.Update`
pub fn update_factory(
    def: &ActorDef,
    registry: &Registry,
    _depth: usize,
) -> Result<Box<dyn Actor>, ActorError> {
    let opts: UpdateOpts = ActorOptions::new(def.options.clone())?.typed()?;
    Ok(Box::new(UpdateActor {
        client: client_for(registry)?,
        array: opts.array,
        params: opts.params,
        inputs: opts.inputs,
    }))
}

struct UpdateActor {
    client: ScalerClient,
    array: String,
    params: Option<Map<String, Value>>,
    inputs: Option<Map<String, Value>>,
}

#[async_trait]
impl Actor for UpdateActor {
    fn kind(&self) -> &str {
        "scaler.Update"
    }

    async fn execute(&self, ctx: &ActorContext) -> Result<(), ActorError> {
        let array = find_array(
            &self.client,
            ctx,
            &self.array,
            Expect::MustExist { allow_stub: true },
        )
        .await?
        .ok_or_else(|| ActorError::Unrecoverable(format!("array \"{}\" not found", self.array)))?;

        if ctx.dry() {
            if let Some(params) = &self.params {
                tracing::info!(array = %array.name, ?params, "would update params");
            }
            if let Some(inputs) = &self.inputs {
                tracing::info!(array = %array.name, ?inputs, "would update inputs");
            }
            tracing::info!("not making any changes");
            return Ok(());
        }

        if let Some(params) = &self.params {
            tracing::info!(array = %array.name, ?params, "updating array params");
            match self.client.update_array(&array, params).await {
                Ok(_) => {}
                Err(e) if e.status() == Some(422) => {
                    return Err(ActorError::Unrecoverable(format!(
                        "invalid parameters supplied to patch array \"{}\"",
                        self.array
                    )));
                }
                Err(e) => return Err(e.into()),
            }
        }

        if let Some(inputs) = &self.inputs {
            tracing::info!(array = %array.name, ?inputs, "updating next-instance inputs");
            self.client
                .update_array_inputs(&array, inputs)
                .await
                .map_err(ActorError::from)?;
        }

        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct LaunchOpts {
    array: String,
    #[serde(default)]
    sleep: Option<f64>,
}

/// Factory for `scaler.Launch`
pub fn launch_factory(
    def: &ActorDef,
    registry: &Registry,
    _depth: usize,
) -> Result<Box<dyn Actor>, ActorError> {
    let opts: LaunchOpts = ActorOptions::new(def.options.clone())?.typed()?;
    let sleep = match opts.sleep {
        Some(secs) if secs.is_finite() && secs >= 0.0 => Duration::from_secs_f64(secs),
        Some(_) => {
            return Err(ActorError::InvalidOptions(
                "sleep must be a non-negative number".to_string(),
            ))
        }
        None => DEFAULT_WAIT_SLEEP,
    };
    Ok(Box::new(LaunchActor {
        client: client_for(registry)?,
        array: opts.array,
        sleep,
    }))
}

struct LaunchActor {
    client: ScalerClient,
    array: String,
    sleep: Duration,
}

impl LaunchActor {
    /// Poll until the operational count reaches the array's minimum
    async fn wait_until_healthy(&self, array: &ArrayRef) -> Result<(), ActorError> {
        loop {
            let instances = self
                .client
                .current_instances(array, Some("state==operational"))
                .await
                .map_err(ActorError::from)?;
            let count = instances.len();
            tracing::info!(array = %array.name, count, min = array.min_count, "operational instances");

            if count as u32 >= array.min_count {
                return Ok(());
            }
            tracing::debug!("sleeping before next health check");
            tokio::time::sleep(self.sleep).await;
        }
    }
}

#[async_trait]
impl Actor for LaunchActor {
    fn kind(&self) -> &str {
        "scaler.Launch"
    }

    async fn execute(&self, ctx: &ActorContext) -> Result<(), ActorError> {
        let array = find_array(
            &self.client,
            ctx,
            &self.array,
            Expect::MustExist { allow_stub: true },
        )
        .await?
        .ok_or_else(|| ActorError::Unrecoverable(format!("array \"{}\" not found", self.array)))?;

        if ctx.dry() {
            tracing::info!(array = %array.name, "would enable and launch array instances");
            return Ok(());
        }

        // Enabling first lets the service's own scaling kick in while
        // we click launch.
        tracing::info!(array = %array.name, "enabling array");
        let array = set_array_state(&self.client, &array, "enabled").await?;

        // Serial clicks: the launch endpoint rejects concurrent calls
        // on one array. A failed instance is the service's problem to
        // relaunch, so results are not collected.
        tracing::info!(array = %array.name, count = array.min_count, "launching instances");
        for _ in 0..array.min_count {
            self.client
                .launch_instance(&array)
                .await
                .map_err(ActorError::from)?;
        }

        self.wait_until_healthy(&array).await
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct DestroyOpts {
    array: String,
    terminate: bool,
    #[serde(default)]
    sleep: Option<f64>,
}

/// Factory for `scaler.Destroy`
pub fn destroy_factory(
    def: &ActorDef,
    registry: &Registry,
    _depth: usize,
) -> Result<Box<dyn Actor>, ActorError> {
    let opts: DestroyOpts = ActorOptions::new(def.options.clone())?.typed()?;
    let sleep = match opts.sleep {
        Some(secs) if secs.is_finite() && secs >= 0.0 => Duration::from_secs_f64(secs),
        Some(_) => {
            return Err(ActorError::InvalidOptions(
                "sleep must be a non-negative number".to_string(),
            ))
        }
        None => DEFAULT_WAIT_SLEEP,
    };
    Ok(Box::new(DestroyActor {
        client: client_for(registry)?,
        array: opts.array,
        terminate: opts.terminate,
        sleep,
    }))
}

struct DestroyActor {
    client: ScalerClient,
    array: String,
    terminate: bool,
    sleep: Duration,
}

impl DestroyActor {
    async fn terminate_all_instances(
        &self,
        ctx: &ActorContext,
        array: &ArrayRef,
    ) -> Result<(), ActorError> {
        if !self.terminate {
            tracing::debug!("not terminating instances");
            return Ok(());
        }
        if ctx.dry() {
            tracing::info!(array = %array.name, "would terminate all instances");
            return Ok(());
        }
        tracing::info!(array = %array.name, "terminating all instances");
        self.client
            .terminate_all_instances(array)
            .await
            .map_err(ActorError::from)
    }

    /// Poll until the array reports no live instances
    async fn wait_until_empty(&self, ctx: &ActorContext, array: &ArrayRef) -> Result<(), ActorError> {
        if ctx.dry() {
            tracing::info!(array = %array.name, "pretending instances are terminated");
            return Ok(());
        }
        loop {
            let instances = self
                .client
                .current_instances(array, None)
                .await
                .map_err(ActorError::from)?;
            let count = instances.len();
            tracing::info!(array = %array.name, count, "instances remaining");
            if count == 0 {
                return Ok(());
            }
            tracing::debug!("sleeping before next emptiness check");
            tokio::time::sleep(self.sleep).await;
        }
    }

    async fn destroy_array(&self, ctx: &ActorContext, array: &ArrayRef) -> Result<(), ActorError> {
        if ctx.dry() {
            tracing::info!(array = %array.name, "would destroy array");
            return Ok(());
        }
        tracing::info!(array = %array.name, "destroying array");
        self.client
            .destroy_array(array)
            .await
            .map_err(ActorError::from)
    }
}

#[async_trait]
impl Actor for DestroyActor {
    fn kind(&self) -> &str {
        "scaler.Destroy"
    }

    async fn execute(&self, ctx: &ActorContext) -> Result<(), ActorError> {
        let array = find_array(
            &self.client,
            ctx,
            &self.array,
            Expect::MustExist { allow_stub: true },
        )
        .await?
        .ok_or_else(|| ActorError::Unrecoverable(format!("array \"{}\" not found", self.array)))?;

        // Disable first so nothing new launches while we tear down.
        if ctx.dry() {
            tracing::info!(array = %array.name, "would disable array");
        } else {
            tracing::info!(array = %array.name, "disabling array");
            set_array_state(&self.client, &array, "disabled").await?;
        }

        self.terminate_all_instances(ctx, &array).await?;
        self.wait_until_empty(ctx, &array).await?;
        self.destroy_array(ctx, &array).await
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ExecuteOpts {
    array: String,
    script: String,
    #[serde(default)]
    inputs: Map<String, Value>,
}

/// Factory for `scaler.Execute`
pub fn execute_factory(
    def: &ActorDef,
    registry: &Registry,
    _depth: usize,
) -> Result<Box<dyn Actor>, ActorError> {
    let opts: ExecuteOpts = ActorOptions::new(def.options.clone())?.typed()?;
    Ok(Box::new(ExecuteActor {
        client: client_for(registry)?,
        array: opts.array,
        script: opts.script,
        inputs: opts.inputs,
    }))
}

struct ExecuteActor {
    client: ScalerClient,
    array: String,
    script: String,
    inputs: Map<String, Value>,
}

#[async_trait]
impl Actor for ExecuteActor {
    fn kind(&self) -> &str {
        "scaler.Execute"
    }

    async fn execute(&self, ctx: &ActorContext) -> Result<(), ActorError> {
        let array = find_array(
            &self.client,
            ctx,
            &self.array,
            Expect::MustExist { allow_stub: true },
        )
        .await?
        .ok_or_else(|| ActorError::Unrecoverable(format!("array \"{}\" not found", self.array)))?;

        let instances = if array.is_stub() {
            Vec::new()
        } else {
            self.client
                .current_instances(&array, None)
                .await
                .map_err(ActorError::from)?
        };

        if ctx.dry() {
            // There is no way to test the real execution, so dry runs
            // stop here.
            tracing::info!(
                array = %array.name,
                script = %self.script,
                instances = instances.len(),
                "would execute script on instances"
            );
            return Ok(());
        }

        tracing::info!(
            array = %array.name,
            script = %self.script,
            instances = instances.len(),
            "executing script on instances"
        );
        let tasks = self
            .client
            .run_executable(&self.script, &self.inputs, &instances)
            .await
            .map_err(ActorError::from)?;

        tracing::info!(tasks = tasks.len(), "waiting for tasks to finish");
        let waits = tasks.iter().map(|task| self.client.wait_for_task(task));
        futures::future::try_join_all(waits)
            .await
            .map_err(ActorError::from)?;

        Ok(())
    }
}
