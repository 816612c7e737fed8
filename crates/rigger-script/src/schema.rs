//! The embedded script schema
//!
//! One actor definition, applied recursively to `options.acts` so a
//! whole group tree is checked in a single pass. Violations are
//! collected exhaustively, each with its JSON pointer.

use crate::error::ScriptError;
use jsonschema::{Draft, JSONSchema};
use once_cell::sync::Lazy;
use serde_json::{json, Value};

static SCRIPT_SCHEMA: Lazy<Value> = Lazy::new(|| {
    json!({
        "$schema": "http://json-schema.org/draft-07/schema#",
        "definitions": {
            "actor": {
                "type": "object",
                "required": ["actor"],
                "additionalProperties": false,
                "properties": {
                    "actor": { "type": "string", "minLength": 1 },
                    "desc": { "type": "string" },
                    "options": {
                        "type": "object",
                        "properties": {
                            "acts": {
                                "type": "array",
                                "items": { "$ref": "#/definitions/actor" }
                            }
                        }
                    },
                    "condition": { "type": ["boolean", "string"] },
                    "warn_on_failure": { "type": "boolean" },
                    "timeout": { "type": "number", "minimum": 0 }
                }
            }
        },
        "allOf": [ { "$ref": "#/definitions/actor" } ]
    })
});

static COMPILED: Lazy<JSONSchema> = Lazy::new(|| {
    JSONSchema::options()
        .with_draft(Draft::Draft7)
        .compile(&SCRIPT_SCHEMA)
        .expect("embedded script schema compiles")
});

/// Validate a parsed script value against the schema
///
/// # Errors
/// Returns `SchemaViolations` listing every violation with its
/// JSON pointer.
pub fn validate(value: &Value) -> Result<(), ScriptError> {
    let result = COMPILED.validate(value);
    match result {
        Ok(()) => Ok(()),
        Err(errors) => {
            let violations: Vec<String> = errors
                .map(|e| {
                    let pointer = e.instance_path.to_string();
                    if pointer.is_empty() {
                        format!("/: {e}")
                    } else {
                        format!("{pointer}: {e}")
                    }
                })
                .collect();
            Err(ScriptError::SchemaViolations { violations })
        }
    }
}
