//! End-to-end orchestration over an in-memory transport
//!
//! Loads real script files, builds the actor tree through the
//! registry, and runs it. Dry runs must never produce a mutating
//! request.

use rigger_actors::{run_script, Registry};
use rigger_cloud::testing::{json_response, StubTransport};
use rigger_core::{Actor, ActorContext, ActorError};
use rigger_script::{ActorDef, TokenMap};
use serde_json::json;
use std::io::Write;
use std::sync::Arc;
use tempfile::NamedTempFile;

fn write_script(suffix: &str, content: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

fn set_credentials() {
    std::env::set_var("SCALER_TOKEN", "test-token");
    std::env::set_var("UPTIME_TOKEN", "test-token");
}

#[tokio::test]
async fn dry_run_of_a_deploy_script_never_mutates() {
    set_credentials();

    let transport = Arc::new(StubTransport::new(json_response(200, json!({}))));
    // scaler.Clone source lookup, then dest lookup
    transport.push_response(json_response(
        200,
        json!({"arrays": [{"id": 7, "name": "web", "state": "enabled", "min_count": 2}]}),
    ));
    transport.push_response(json_response(
        200,
        json!({"arrays": [{"id": 7, "name": "web", "state": "enabled", "min_count": 2}]}),
    ));
    // uptime.Pause check listing
    transport.push_response(json_response(
        200,
        json!({"checks": [{"id": 1, "name": "frontend", "hostname": "www", "paused": false}]}),
    ));

    let registry = Registry::new(transport.clone());

    let file = write_script(
        ".yaml",
        "\
actor: group.Sync
desc: deploy the new release
options:
  acts:
    - actor: scaler.Clone
      desc: copy the template array
      options:
        source: web
        dest: web-%RELEASE%
    - actor: uptime.Pause
      desc: silence monitoring
      options:
        name: frontend
    - actor: misc.Sleep
      desc: settle
      options:
        seconds: 0
",
    );

    let mut tokens = TokenMap::new();
    tokens.insert("RELEASE".to_string(), "v42".to_string());
    let script = rigger_script::load(file.path(), &tokens).unwrap();

    run_script(&registry, &script, true).await.unwrap();

    assert!(transport.mutating_requests().is_empty());
    // Clone looked for web and web-v42, pause listed checks
    let urls: Vec<String> = transport.requests().iter().map(|r| r.url.clone()).collect();
    assert!(urls.iter().any(|u| u.contains("name=web-v42")));
}

#[tokio::test]
async fn unknown_actor_fails_the_build() {
    set_credentials();
    let registry = Registry::new(Arc::new(StubTransport::new(json_response(200, json!({})))));

    let file = write_script(".json", r#"{"actor": "scaler.Obliterate", "options": {}}"#);
    let script = rigger_script::load(file.path(), &TokenMap::new()).unwrap();

    let err = run_script(&registry, &script, true).await.unwrap_err();
    assert!(err.to_string().contains("unknown actor"));
}

struct Recorder;

#[async_trait::async_trait]
impl Actor for Recorder {
    fn kind(&self) -> &str {
        "test.Recorder"
    }

    async fn execute(&self, ctx: &ActorContext) -> Result<(), ActorError> {
        if ctx.dry() {
            return Ok(());
        }
        Err(ActorError::Unrecoverable("recorder ran for real".to_string()))
    }
}

fn recorder_factory(
    _def: &ActorDef,
    _registry: &Registry,
    _depth: usize,
) -> Result<Box<dyn Actor>, ActorError> {
    Ok(Box::new(Recorder))
}

#[tokio::test]
async fn custom_actors_can_be_registered() {
    let registry = Registry::new(Arc::new(StubTransport::new(json_response(200, json!({})))));
    registry.register("test.Recorder", recorder_factory);

    let file = write_script(
        ".json",
        r#"{"actor": "group.Async", "options": {"acts": [
            {"actor": "test.Recorder"},
            {"actor": "test.recorder"}
        ]}}"#,
    );
    let script = rigger_script::load(file.path(), &TokenMap::new()).unwrap();

    // Dry run succeeds; a real run surfaces both failures
    run_script(&registry, &script, true).await.unwrap();
    let err = run_script(&registry, &script, false).await.unwrap_err();
    assert!(err.to_string().contains("2 of 2"));
}

#[tokio::test]
async fn condition_gates_children() {
    set_credentials();
    let transport = Arc::new(StubTransport::new(json_response(200, json!({}))));
    let registry = Registry::new(transport.clone());

    let file = write_script(
        ".json",
        r#"{"actor": "group.Sync", "options": {"acts": [
            {"actor": "misc.GenericHTTP", "condition": false,
             "options": {"url": "https://example.com/skipped", "method": "POST"}},
            {"actor": "misc.Sleep", "options": {"seconds": 0}}
        ]}}"#,
    );
    let script = rigger_script::load(file.path(), &TokenMap::new()).unwrap();

    run_script(&registry, &script, false).await.unwrap();
    assert!(transport.requests().is_empty());
}

#[tokio::test]
async fn macro_scripts_nest() {
    set_credentials();
    let registry = Registry::new(Arc::new(StubTransport::new(json_response(200, json!({})))));

    let inner = write_script(
        ".yaml",
        "actor: misc.Sleep\ndesc: inner wait\noptions:\n  seconds: 0\n",
    );
    let outer = write_script(
        ".json",
        &format!(
            r#"{{"actor": "misc.Macro", "options": {{"macro": "{}"}}}}"#,
            inner.path().display()
        ),
    );
    let script = rigger_script::load(outer.path(), &TokenMap::new()).unwrap();

    run_script(&registry, &script, false).await.unwrap();
}
