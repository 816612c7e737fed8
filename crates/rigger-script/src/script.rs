//! The actor-definition tree
//!
//! A script is one root [`ActorDef`]; group actors nest further
//! definitions inside `options.acts`. The envelope fields here mirror
//! the script schema exactly.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;

/// One actor definition from a script
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ActorDef {
    /// Registry name, e.g. `group.Sync`
    pub actor: String,

    /// Human description; defaults to the actor name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desc: Option<String>,

    /// Actor-specific options
    #[serde(default)]
    pub options: Value,

    /// Execution gate (boolean or boolean-ish string)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<Value>,

    /// Downgrade failure to a warning
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warn_on_failure: Option<bool>,

    /// Execution timeout in seconds; zero disables
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<f64>,
}

impl ActorDef {
    /// Minimal definition with empty options
    #[must_use]
    pub fn new(actor: impl Into<String>) -> Self {
        Self {
            actor: actor.into(),
            desc: None,
            options: Value::Null,
            condition: None,
            warn_on_failure: None,
            timeout: None,
        }
    }

    /// Description, falling back to the actor name
    #[inline]
    #[must_use]
    pub fn desc(&self) -> &str {
        self.desc.as_deref().unwrap_or(&self.actor)
    }
}

/// A loaded, validated script
#[derive(Debug, Clone)]
pub struct Script {
    /// Source file
    pub path: PathBuf,
    /// Root of the actor tree
    pub root: ActorDef,
}
