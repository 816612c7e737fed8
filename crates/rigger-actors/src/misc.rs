//! Miscellaneous actors
//!
//! `misc.Sleep` pauses a pipeline, `misc.Macro` pulls in a nested
//! script, `misc.GenericHTTP` makes one arbitrary REST call.

use crate::registry::{Registry, MAX_NESTING_DEPTH};
use async_trait::async_trait;
use rigger_cloud::{RestClient, RestError};
use rigger_core::{Actor, ActorContext, ActorError, ActorOptions, BoundActor};
use rigger_script::{ActorDef, TokenMap};
use serde::Deserialize;
use serde_json::Value;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SleepOpts {
    seconds: f64,
}

/// Factory for `misc.Sleep`
pub fn sleep_factory(
    def: &ActorDef,
    _registry: &Registry,
    _depth: usize,
) -> Result<Box<dyn Actor>, ActorError> {
    let opts: SleepOpts = ActorOptions::new(def.options.clone())?.typed()?;
    if !opts.seconds.is_finite() || opts.seconds < 0.0 {
        return Err(ActorError::InvalidOptions(
            "seconds must be a non-negative number".to_string(),
        ));
    }
    Ok(Box::new(SleepActor {
        duration: Duration::from_secs_f64(opts.seconds),
    }))
}

struct SleepActor {
    duration: Duration,
}

#[async_trait]
impl Actor for SleepActor {
    fn kind(&self) -> &str {
        "misc.Sleep"
    }

    async fn execute(&self, ctx: &ActorContext) -> Result<(), ActorError> {
        if ctx.dry() {
            tracing::info!(seconds = self.duration.as_secs_f64(), "would sleep");
            return Ok(());
        }
        tracing::info!(seconds = self.duration.as_secs_f64(), "sleeping");
        tokio::time::sleep(self.duration).await;
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct MacroOpts {
    #[serde(rename = "macro")]
    path: String,
    #[serde(default)]
    tokens: TokenMap,
}

/// Factory for `misc.Macro`
///
/// The nested script is loaded and built immediately so a bad macro
/// fails the whole build, not the run.
pub fn macro_factory(
    def: &ActorDef,
    registry: &Registry,
    depth: usize,
) -> Result<Box<dyn Actor>, ActorError> {
    let opts: MacroOpts = ActorOptions::new(def.options.clone())?.typed()?;
    if depth >= MAX_NESTING_DEPTH {
        return Err(ActorError::MacroFailed(format!(
            "macro nesting deeper than {MAX_NESTING_DEPTH} levels"
        )));
    }

    let path = PathBuf::from(&opts.path);
    let script = rigger_script::load(&path, &opts.tokens)
        .map_err(|e| ActorError::MacroFailed(format!("{}: {e}", path.display())))?;
    let child = registry
        .build_at(&script.root, depth + 1)
        .map_err(|e| ActorError::MacroFailed(format!("{}: {e}", path.display())))?;

    Ok(Box::new(MacroActor { path, child }))
}

struct MacroActor {
    path: PathBuf,
    child: BoundActor,
}

#[async_trait]
impl Actor for MacroActor {
    fn kind(&self) -> &str {
        "misc.Macro"
    }

    async fn execute(&self, ctx: &ActorContext) -> Result<(), ActorError> {
        tracing::info!(script = %self.path.display(), "entering macro");
        self.child.run(&ctx.nested()).await
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct GenericHttpOpts {
    url: String,
    #[serde(default)]
    method: Option<String>,
    #[serde(default)]
    body: Option<Value>,
    #[serde(default)]
    expected_codes: Option<Vec<u16>>,
    #[serde(default)]
    user: Option<String>,
    #[serde(default)]
    password: Option<String>,
}

/// Factory for `misc.GenericHTTP`
pub fn generic_http_factory(
    def: &ActorDef,
    registry: &Registry,
    _depth: usize,
) -> Result<Box<dyn Actor>, ActorError> {
    let opts: GenericHttpOpts = ActorOptions::new(def.options.clone())?.typed()?;

    if !opts.url.starts_with("http://") && !opts.url.starts_with("https://") {
        return Err(ActorError::InvalidOptions(format!(
            "url must be absolute, got \"{}\"",
            opts.url
        )));
    }
    let method = opts.method.as_deref().unwrap_or("GET").to_ascii_uppercase();
    if !matches!(method.as_str(), "GET" | "POST" | "PUT" | "DELETE") {
        return Err(ActorError::InvalidOptions(format!(
            "unsupported method \"{method}\""
        )));
    }
    if method == "GET" && opts.body.is_some() {
        return Err(ActorError::InvalidOptions(
            "GET requests cannot carry a body".to_string(),
        ));
    }

    let mut rest = RestClient::new(registry.transport(), "");
    if let Some(user) = &opts.user {
        rest = rest.with_basic_auth(user.clone(), opts.password.clone());
    }

    Ok(Box::new(GenericHttpActor {
        rest,
        url: opts.url,
        method,
        body: opts.body,
        expected_codes: opts.expected_codes,
    }))
}

struct GenericHttpActor {
    rest: RestClient,
    url: String,
    method: String,
    body: Option<Value>,
    expected_codes: Option<Vec<u16>>,
}

impl GenericHttpActor {
    fn accepts(&self, status: u16) -> bool {
        match &self.expected_codes {
            Some(codes) => codes.contains(&status),
            None => false,
        }
    }
}

#[async_trait]
impl Actor for GenericHttpActor {
    fn kind(&self) -> &str {
        "misc.GenericHTTP"
    }

    async fn execute(&self, ctx: &ActorContext) -> Result<(), ActorError> {
        if ctx.dry() {
            tracing::info!(method = %self.method, url = %self.url, "would make HTTP call");
            return Ok(());
        }

        tracing::info!(method = %self.method, url = %self.url, "making HTTP call");
        let result = match self.method.as_str() {
            "GET" => self.rest.get(&self.url).await,
            "POST" => self.rest.post(&self.url, self.body.clone()).await,
            "PUT" => {
                self.rest
                    .put(&self.url, self.body.clone().unwrap_or(Value::Null))
                    .await
            }
            "DELETE" => self.rest.delete(&self.url).await,
            // The factory only admits the four methods above
            other => {
                return Err(ActorError::InvalidOptions(format!(
                    "unsupported method \"{other}\""
                )))
            }
        };

        match result {
            Ok(response) => {
                tracing::debug!(status = response.status, "HTTP call finished");
                Ok(())
            }
            Err(RestError::Http { status, .. }) if self.accepts(status) => {
                tracing::debug!(status, "HTTP status accepted by expected_codes");
                Ok(())
            }
            Err(e) => {
                let cloud: rigger_cloud::CloudError = e.into();
                Err(cloud.into())
            }
        }
    }
}
