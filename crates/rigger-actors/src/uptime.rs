//! Check-monitoring actors
//!
//! Pause a check before disruptive work, unpause it after. The check
//! lookup happens in dry runs too; only the pause flag flip is
//! skipped.

use crate::registry::Registry;
use async_trait::async_trait;
use rigger_cloud::{CheckRef, UptimeClient};
use rigger_core::{Actor, ActorContext, ActorError, ActorOptions};
use rigger_script::ActorDef;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CheckOpts {
    name: String,
}

fn client_for(registry: &Registry) -> Result<UptimeClient, ActorError> {
    UptimeClient::from_env(registry.transport()).map_err(ActorError::from)
}

async fn get_check(client: &UptimeClient, name: &str) -> Result<CheckRef, ActorError> {
    client
        .find_check(name)
        .await
        .map_err(ActorError::from)?
        .ok_or_else(|| ActorError::InvalidOptions(format!("check \"{name}\" was not found")))
}

/// Factory for `uptime.Pause`
pub fn pause_factory(
    def: &ActorDef,
    registry: &Registry,
    _depth: usize,
) -> Result<Box<dyn Actor>, ActorError> {
    let opts: CheckOpts = ActorOptions::new(def.options.clone())?.typed()?;
    Ok(Box::new(PauseActor {
        client: client_for(registry)?,
        name: opts.name,
        pause: true,
    }))
}

/// Factory for `uptime.Unpause`
pub fn unpause_factory(
    def: &ActorDef,
    registry: &Registry,
    _depth: usize,
) -> Result<Box<dyn Actor>, ActorError> {
    let opts: CheckOpts = ActorOptions::new(def.options.clone())?.typed()?;
    Ok(Box::new(PauseActor {
        client: client_for(registry)?,
        name: opts.name,
        pause: false,
    }))
}

struct PauseActor {
    client: UptimeClient,
    name: String,
    pause: bool,
}

#[async_trait]
impl Actor for PauseActor {
    fn kind(&self) -> &str {
        if self.pause {
            "uptime.Pause"
        } else {
            "uptime.Unpause"
        }
    }

    async fn execute(&self, ctx: &ActorContext) -> Result<(), ActorError> {
        let check = get_check(&self.client, &self.name).await?;
        let action = if self.pause { "pause" } else { "unpause" };

        if ctx.dry() {
            tracing::info!(
                check = %check.name,
                hostname = %check.hostname,
                "would {action} check"
            );
            return Ok(());
        }

        tracing::info!(check = %check.name, "{action} check");
        self.client
            .set_paused(&check, self.pause)
            .await
            .map_err(ActorError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rigger_cloud::testing::{json_response, StubTransport};
    use rigger_cloud::RestClient;
    use serde_json::json;
    use std::sync::Arc;

    fn checks_transport() -> Arc<StubTransport> {
        Arc::new(StubTransport::new(json_response(
            200,
            json!({"checks": [
                {"id": 1, "name": "frontend", "hostname": "www.example.com", "paused": false}
            ]}),
        )))
    }

    fn actor(transport: Arc<StubTransport>, name: &str, pause: bool) -> PauseActor {
        PauseActor {
            client: UptimeClient::new(RestClient::new(transport, "https://uptime.test")),
            name: name.to_string(),
            pause,
        }
    }

    #[tokio::test]
    async fn pause_flips_flag() {
        let transport = checks_transport();
        let pause = actor(transport.clone(), "frontend", true);
        pause.execute(&ActorContext::new(false)).await.unwrap();

        let mutating = transport.mutating_requests();
        assert_eq!(mutating.len(), 1);
        assert_eq!(mutating[0].url, "https://uptime.test/api/checks/1");
        assert_eq!(mutating[0].body.as_ref().unwrap()["paused"], json!(true));
    }

    #[tokio::test]
    async fn unpause_sends_false() {
        let transport = checks_transport();
        let unpause = actor(transport.clone(), "frontend", false);
        unpause.execute(&ActorContext::new(false)).await.unwrap();

        let mutating = transport.mutating_requests();
        assert_eq!(mutating[0].body.as_ref().unwrap()["paused"], json!(false));
    }

    #[tokio::test]
    async fn dry_run_looks_up_but_does_not_mutate() {
        let transport = checks_transport();
        let pause = actor(transport.clone(), "frontend", true);
        pause.execute(&ActorContext::new(true)).await.unwrap();

        assert_eq!(transport.requests().len(), 1);
        assert!(transport.mutating_requests().is_empty());
    }

    #[tokio::test]
    async fn unknown_check_is_options_error() {
        let transport = checks_transport();
        let pause = actor(transport, "backend", true);
        let err = pause.execute(&ActorContext::new(false)).await.unwrap_err();
        assert!(matches!(err, ActorError::InvalidOptions(_)));
    }
}
