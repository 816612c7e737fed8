//! Actor registry
//!
//! Maps registry names (`group.Sync`, `scaler.Clone`) to factories and
//! turns a validated [`ActorDef`] tree into a runnable [`BoundActor`]
//! tree. Names are normalized before lookup so `scaler.clone` and
//! `scaler.Clone` resolve identically. The whole tree is built (and
//! every option block validated) before anything executes.

use crate::{group, misc, scaler, uptime};
use parking_lot::RwLock;
use rigger_cloud::transport::{HttpTransport, ReqwestTransport};
use rigger_core::{strcase, Actor, ActorError, ActorHeader, BoundActor, Condition};
use rigger_script::ActorDef;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Macro nesting deeper than this aborts the build
pub const MAX_NESTING_DEPTH: usize = 8;

/// Builds one actor from its definition
pub type Factory = fn(&ActorDef, &Registry, usize) -> Result<Box<dyn Actor>, ActorError>;

/// Failure while turning definitions into actors
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// No factory under that name
    #[error("unknown actor \"{name}\"{}", suggestion_suffix(.suggestions))]
    UnknownActor {
        /// Name as written in the script
        name: String,
        /// Registered names in the same family
        suggestions: Vec<String>,
    },

    /// Factory rejected the definition
    #[error("actor \"{name}\": {source}")]
    InvalidActor {
        /// Name as written in the script
        name: String,
        /// What the factory objected to
        #[source]
        source: ActorError,
    },
}

fn suggestion_suffix(suggestions: &[String]) -> String {
    if suggestions.is_empty() {
        String::new()
    } else {
        format!(" (did you mean {}?)", suggestions.join(", "))
    }
}

/// Name-to-factory registry plus the transport actors build their
/// clients over
pub struct Registry {
    transport: Arc<dyn HttpTransport>,
    factories: RwLock<HashMap<String, Factory>>,
}

impl Registry {
    /// Registry with the built-in actors over the given transport
    #[must_use]
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        let registry = Self {
            transport,
            factories: RwLock::new(HashMap::new()),
        };
        registry.register_builtins();
        registry
    }

    /// Registry over the production HTTP stack
    #[must_use]
    pub fn with_default_transport() -> Self {
        Self::new(Arc::new(ReqwestTransport::new()))
    }

    fn register_builtins(&self) {
        self.register("group.Sync", group::sync_factory);
        self.register("group.Async", group::async_factory);
        self.register("misc.Sleep", misc::sleep_factory);
        self.register("misc.Macro", misc::macro_factory);
        self.register("misc.GenericHTTP", misc::generic_http_factory);
        self.register("scaler.Clone", scaler::clone_factory);
        self.register("scaler.Update", scaler::update_factory);
        self.register("scaler.Launch", scaler::launch_factory);
        self.register("scaler.Destroy", scaler::destroy_factory);
        self.register("scaler.Execute", scaler::execute_factory);
        self.register("uptime.Pause", uptime::pause_factory);
        self.register("uptime.Unpause", uptime::unpause_factory);
    }

    /// Register (or replace) a factory
    pub fn register(&self, name: &str, factory: Factory) {
        self.factories.write().insert(normalize(name), factory);
    }

    /// The transport actors build clients over
    #[must_use]
    pub fn transport(&self) -> Arc<dyn HttpTransport> {
        self.transport.clone()
    }

    /// Every registered name, sorted
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.factories.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Build the actor tree rooted at `def`
    ///
    /// # Errors
    /// `UnknownActor` or whatever a factory rejects.
    pub fn build(&self, def: &ActorDef) -> Result<BoundActor, BuildError> {
        self.build_at(def, 0)
    }

    /// Build at a given nesting depth (macro actors recurse here)
    ///
    /// # Errors
    /// Same as [`Self::build`], plus depth exhaustion.
    pub fn build_at(&self, def: &ActorDef, depth: usize) -> Result<BoundActor, BuildError> {
        if depth > MAX_NESTING_DEPTH {
            return Err(BuildError::InvalidActor {
                name: def.actor.clone(),
                source: ActorError::MacroFailed(format!(
                    "nesting deeper than {MAX_NESTING_DEPTH} levels"
                )),
            });
        }

        let key = normalize(&def.actor);
        let factory = self.factories.read().get(&key).copied().ok_or_else(|| {
            BuildError::UnknownActor {
                name: def.actor.clone(),
                suggestions: self.same_family(&key),
            }
        })?;

        let inner = factory(def, self, depth).map_err(|source| BuildError::InvalidActor {
            name: def.actor.clone(),
            source,
        })?;

        let mut header = ActorHeader::new(def.desc())
            .with_condition(
                def.condition
                    .clone()
                    .map(Condition::from_value)
                    .unwrap_or_default(),
            )
            .with_warn_on_failure(def.warn_on_failure.unwrap_or(false));
        if let Some(secs) = def.timeout {
            if !secs.is_finite() || secs < 0.0 {
                return Err(BuildError::InvalidActor {
                    name: def.actor.clone(),
                    source: ActorError::InvalidOptions(
                        "timeout must be a non-negative number".to_string(),
                    ),
                });
            }
            header = header.with_timeout(Duration::from_secs_f64(secs));
        }

        Ok(BoundActor::new(header, inner))
    }

    fn same_family(&self, key: &str) -> Vec<String> {
        let family = key.split('.').next().unwrap_or(key);
        let mut names: Vec<String> = self
            .factories
            .read()
            .keys()
            .filter(|name| name.split('.').next() == Some(family))
            .cloned()
            .collect();
        names.sort();
        names
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("actors", &self.names())
            .finish()
    }
}

/// Normalize a registry name: snake-case every segment except the
/// last, canonical camel-case for the last (through snake_case, so
/// `GenericHTTP` and `generic_http` agree)
fn normalize(name: &str) -> String {
    let segments: Vec<&str> = name.split('.').collect();
    match segments.split_last() {
        Some((last, families)) => {
            let mut parts: Vec<String> =
                families.iter().map(|s| strcase::snake_case(s)).collect();
            parts.push(strcase::camel_case(&strcase::snake_case(last)));
            parts.join(".")
        }
        None => name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rigger_cloud::testing::{json_response, StubTransport};
    use serde_json::json;

    fn test_registry() -> Registry {
        Registry::new(Arc::new(StubTransport::new(json_response(200, json!({})))))
    }

    #[test]
    fn normalize_accepts_case_variants() {
        assert_eq!(normalize("scaler.clone"), "scaler.Clone");
        assert_eq!(normalize("scaler.Clone"), "scaler.Clone");
        assert_eq!(normalize("misc.generic_http"), "misc.GenericHttp");
        assert_eq!(normalize("misc.GenericHTTP"), "misc.GenericHttp");
        assert_eq!(normalize("group.sync"), "group.Sync");
    }

    #[test]
    fn builds_builtin_by_lowercase_name() {
        let registry = test_registry();
        let def: ActorDef = serde_json::from_value(json!({
            "actor": "misc.sleep",
            "options": {"seconds": 0.1}
        }))
        .unwrap();
        let bound = registry.build(&def).unwrap();
        assert_eq!(bound.kind(), "misc.Sleep");
    }

    #[test]
    fn unknown_actor_suggests_family() {
        let registry = test_registry();
        let def = ActorDef::new("scaler.Lunch");
        let err = registry.build(&def).unwrap_err();
        let BuildError::UnknownActor { suggestions, .. } = &err else {
            panic!("expected unknown actor");
        };
        assert!(suggestions.iter().any(|s| s == "scaler.Launch"));
        assert!(err.to_string().contains("did you mean"));
    }

    #[test]
    fn envelope_fields_reach_header() {
        let registry = test_registry();
        let def: ActorDef = serde_json::from_value(json!({
            "actor": "misc.Sleep",
            "desc": "short nap",
            "options": {"seconds": 0.1},
            "warn_on_failure": true,
            "timeout": 30
        }))
        .unwrap();
        let bound = registry.build(&def).unwrap();
        assert_eq!(bound.desc(), "short nap");
        assert!(bound.header().warn_on_failure);
        assert_eq!(bound.header().timeout, Duration::from_secs(30));
    }

    #[test]
    fn invalid_options_fail_at_build() {
        let registry = test_registry();
        let def: ActorDef = serde_json::from_value(json!({
            "actor": "misc.Sleep",
            "options": {"seconds": "lots"}
        }))
        .unwrap();
        let err = registry.build(&def).unwrap_err();
        assert!(matches!(err, BuildError::InvalidActor { .. }));
    }

    #[test]
    fn depth_guard_trips() {
        let registry = test_registry();
        let def: ActorDef = serde_json::from_value(json!({
            "actor": "misc.Sleep",
            "options": {"seconds": 0.1}
        }))
        .unwrap();
        assert!(registry.build_at(&def, MAX_NESTING_DEPTH + 1).is_err());
    }

    #[test]
    fn names_lists_builtins() {
        let registry = test_registry();
        let names = registry.names();
        assert!(names.iter().any(|n| n == "group.Async"));
        assert!(names.iter().any(|n| n == "uptime.Pause"));
    }
}
