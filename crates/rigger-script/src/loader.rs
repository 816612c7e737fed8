//! Script loading
//!
//! Read a file, substitute tokens, parse (JSON or YAML), validate
//! against the schema, deserialize into the actor tree. YAML goes
//! through `serde_json::Value` so the rest of the pipeline only ever
//! sees one representation.

use crate::error::ScriptError;
use crate::schema;
use crate::script::{ActorDef, Script};
use crate::tokens::{self, TokenMap};
use serde_json::Value;
use std::path::Path;

/// Load and validate a script
///
/// # Errors
/// Any stage can fail: I/O, token resolution, syntax, schema,
/// deserialization.
pub fn load(path: &Path, overrides: &TokenMap) -> Result<Script, ScriptError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ScriptError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    if raw.trim().is_empty() {
        return Err(ScriptError::Empty {
            path: path.to_path_buf(),
        });
    }

    let substituted = tokens::substitute(&raw, overrides)?;
    let value = parse_value(path, &substituted)?;
    schema::validate(&value)?;

    let root: ActorDef = serde_json::from_value(value)
        .map_err(|e| ScriptError::InvalidDefinition(e.to_string()))?;

    tracing::debug!(path = %path.display(), actor = %root.actor, "script loaded");

    Ok(Script {
        path: path.to_path_buf(),
        root,
    })
}

/// Parse by extension, falling back to trying both formats
fn parse_value(path: &Path, content: &str) -> Result<Value, ScriptError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    match ext.as_deref() {
        Some("json") => serde_json::from_str(content).map_err(|e| ScriptError::Syntax(e.to_string())),
        Some("yaml" | "yml") => {
            serde_yaml::from_str(content).map_err(|e| ScriptError::Syntax(e.to_string()))
        }
        _ => serde_json::from_str(content).or_else(|json_err| {
            serde_yaml::from_str(content)
                .map_err(|yaml_err| ScriptError::Syntax(format!("{json_err}; {yaml_err}")))
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_script(suffix: &str, content: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(suffix)
            .tempfile()
            .unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn loads_json_script() {
        let file = write_script(
            ".json",
            r#"{"actor": "misc.Sleep", "desc": "nap", "options": {"seconds": 1}}"#,
        );
        let script = load(file.path(), &TokenMap::new()).unwrap();
        assert_eq!(script.root.actor, "misc.Sleep");
        assert_eq!(script.root.desc(), "nap");
    }

    #[test]
    fn loads_yaml_script() {
        let file = write_script(
            ".yaml",
            "actor: group.Sync\noptions:\n  acts:\n    - actor: misc.Sleep\n      options:\n        seconds: 2\n",
        );
        let script = load(file.path(), &TokenMap::new()).unwrap();
        assert_eq!(script.root.actor, "group.Sync");
    }

    #[test]
    fn substitutes_tokens_before_parse() {
        let file = write_script(
            ".json",
            r#"{"actor": "scaler.Launch", "options": {"array": "%ARRAY%"}}"#,
        );
        let mut tokens = TokenMap::new();
        tokens.insert("ARRAY".to_string(), "web-prod".to_string());
        let script = load(file.path(), &tokens).unwrap();
        assert_eq!(script.root.options["array"], "web-prod");
    }

    #[test]
    fn missing_token_fails() {
        let file = write_script(
            ".json",
            r#"{"actor": "scaler.Launch", "options": {"array": "%RIGGER_LOADER_NOPE%"}}"#,
        );
        let err = load(file.path(), &TokenMap::new()).unwrap_err();
        assert!(matches!(err, ScriptError::UnresolvedTokens { .. }));
    }

    #[test]
    fn empty_script_fails() {
        let file = write_script(".json", "  \n");
        let err = load(file.path(), &TokenMap::new()).unwrap_err();
        assert!(matches!(err, ScriptError::Empty { .. }));
    }

    #[test]
    fn schema_violation_surfaces() {
        let file = write_script(".json", r#"{"desc": "no actor here"}"#);
        let err = load(file.path(), &TokenMap::new()).unwrap_err();
        assert!(matches!(err, ScriptError::SchemaViolations { .. }));
    }

    #[test]
    fn extensionless_falls_back() {
        let file = write_script("", "actor: misc.Sleep\n");
        let script = load(file.path(), &TokenMap::new()).unwrap();
        assert_eq!(script.root.actor, "misc.Sleep");
    }
}
