//! Group actors
//!
//! `group.Sync` runs its children one after another and aborts at the
//! first failure. `group.Async` runs every child to completion
//! concurrently (optionally bounded by a `concurrency` option) and
//! aggregates whatever failed.

use crate::registry::Registry;
use async_trait::async_trait;
use futures::future;
use rigger_core::{Actor, ActorContext, ActorError, BoundActor, ChildFailure};
use rigger_script::ActorDef;
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::Semaphore;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SyncOpts {
    acts: Vec<ActorDef>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct AsyncOpts {
    acts: Vec<ActorDef>,
    #[serde(default)]
    concurrency: Option<usize>,
}

fn build_children(
    defs: &[ActorDef],
    registry: &Registry,
    depth: usize,
) -> Result<Vec<BoundActor>, ActorError> {
    defs.iter()
        .map(|def| {
            registry
                .build_at(def, depth)
                .map_err(|e| ActorError::InvalidOptions(e.to_string()))
        })
        .collect()
}

/// Factory for `group.Sync`
pub fn sync_factory(
    def: &ActorDef,
    registry: &Registry,
    depth: usize,
) -> Result<Box<dyn Actor>, ActorError> {
    let opts: SyncOpts = rigger_core::ActorOptions::new(def.options.clone())?.typed()?;
    let acts = build_children(&opts.acts, registry, depth)?;
    Ok(Box::new(SyncGroup { acts }))
}

/// Factory for `group.Async`
pub fn async_factory(
    def: &ActorDef,
    registry: &Registry,
    depth: usize,
) -> Result<Box<dyn Actor>, ActorError> {
    let opts: AsyncOpts = rigger_core::ActorOptions::new(def.options.clone())?.typed()?;
    if opts.concurrency == Some(0) {
        return Err(ActorError::InvalidOptions(
            "concurrency must be at least 1".to_string(),
        ));
    }
    let acts = build_children(&opts.acts, registry, depth)?;
    Ok(Box::new(AsyncGroup {
        acts,
        concurrency: opts.concurrency,
    }))
}

struct SyncGroup {
    acts: Vec<BoundActor>,
}

#[async_trait]
impl Actor for SyncGroup {
    fn kind(&self) -> &str {
        "group.Sync"
    }

    async fn execute(&self, ctx: &ActorContext) -> Result<(), ActorError> {
        let total = self.acts.len();
        for (idx, act) in self.acts.iter().enumerate() {
            tracing::debug!(child = idx + 1, total, kind = act.kind(), "running child");
            if let Err(error) = act.run(ctx).await {
                tracing::error!(
                    child = idx + 1,
                    total,
                    kind = act.kind(),
                    "child failed, aborting remaining"
                );
                return Err(ActorError::GroupFailed {
                    total,
                    failures: vec![ChildFailure {
                        kind: act.kind().to_string(),
                        desc: act.desc().to_string(),
                        error,
                    }],
                });
            }
        }
        Ok(())
    }
}

struct AsyncGroup {
    acts: Vec<BoundActor>,
    concurrency: Option<usize>,
}

#[async_trait]
impl Actor for AsyncGroup {
    fn kind(&self) -> &str {
        "group.Async"
    }

    async fn execute(&self, ctx: &ActorContext) -> Result<(), ActorError> {
        let total = self.acts.len();
        let semaphore = self
            .concurrency
            .map(|limit| Arc::new(Semaphore::new(limit)));

        let runs = self.acts.iter().map(|act| {
            let semaphore = semaphore.clone();
            async move {
                let _permit = match &semaphore {
                    Some(sem) => Some(sem.acquire().await.expect("semaphore never closed")),
                    None => None,
                };
                act.run(ctx).await
            }
        });

        let results = future::join_all(runs).await;

        let failures: Vec<ChildFailure> = results
            .into_iter()
            .zip(&self.acts)
            .filter_map(|(result, act)| {
                result.err().map(|error| ChildFailure {
                    kind: act.kind().to_string(),
                    desc: act.desc().to_string(),
                    error,
                })
            })
            .collect();

        if failures.is_empty() {
            Ok(())
        } else {
            Err(ActorError::GroupFailed { total, failures })
        }
    }
}
