//! Typed access to an actor's option block
//!
//! Options arrive from the script as an arbitrary JSON object. Actors
//! validate them at construction time, either field-by-field with the
//! getters here or in one shot via [`ActorOptions::typed`] and a
//! `#[serde(deny_unknown_fields)]` struct.

use crate::error::ActorError;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// An actor's option block
#[derive(Debug, Clone, Default)]
pub struct ActorOptions {
    entries: Map<String, Value>,
}

impl ActorOptions {
    /// Wrap a JSON value as options
    ///
    /// # Errors
    /// Returns `InvalidOptions` unless the value is an object or null.
    pub fn new(value: Value) -> Result<Self, ActorError> {
        match value {
            Value::Object(entries) => Ok(Self { entries }),
            Value::Null => Ok(Self::empty()),
            other => Err(ActorError::InvalidOptions(format!(
                "options must be an object, got {}",
                type_name(&other)
            ))),
        }
    }

    /// Empty option block
    #[inline]
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Raw access to a single option
    #[inline]
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Whether an option is present
    #[inline]
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Required string option
    ///
    /// # Errors
    /// Returns `InvalidOptions` if missing or not a string.
    pub fn required_str(&self, key: &str) -> Result<&str, ActorError> {
        match self.entries.get(key) {
            Some(Value::String(s)) => Ok(s),
            Some(other) => Err(ActorError::InvalidOptions(format!(
                "option \"{key}\" must be a string, got {}",
                type_name(other)
            ))),
            None => Err(ActorError::InvalidOptions(format!(
                "missing required option \"{key}\""
            ))),
        }
    }

    /// Required boolean option
    ///
    /// # Errors
    /// Returns `InvalidOptions` if missing or not a boolean.
    pub fn required_bool(&self, key: &str) -> Result<bool, ActorError> {
        match self.entries.get(key) {
            Some(Value::Bool(b)) => Ok(*b),
            Some(other) => Err(ActorError::InvalidOptions(format!(
                "option \"{key}\" must be a boolean, got {}",
                type_name(other)
            ))),
            None => Err(ActorError::InvalidOptions(format!(
                "missing required option \"{key}\""
            ))),
        }
    }

    /// Optional string option
    pub fn opt_str(&self, key: &str) -> Result<Option<&str>, ActorError> {
        match self.entries.get(key) {
            Some(Value::String(s)) => Ok(Some(s)),
            Some(other) => Err(ActorError::InvalidOptions(format!(
                "option \"{key}\" must be a string, got {}",
                type_name(other)
            ))),
            None => Ok(None),
        }
    }

    /// Optional boolean option
    pub fn opt_bool(&self, key: &str) -> Result<Option<bool>, ActorError> {
        match self.entries.get(key) {
            Some(Value::Bool(b)) => Ok(Some(*b)),
            Some(other) => Err(ActorError::InvalidOptions(format!(
                "option \"{key}\" must be a boolean, got {}",
                type_name(other)
            ))),
            None => Ok(None),
        }
    }

    /// Optional non-negative number option, as f64
    pub fn opt_f64(&self, key: &str) -> Result<Option<f64>, ActorError> {
        match self.entries.get(key) {
            Some(Value::Number(n)) => n.as_f64().filter(|v| *v >= 0.0).map(Some).ok_or_else(|| {
                ActorError::InvalidOptions(format!(
                    "option \"{key}\" must be a non-negative number"
                ))
            }),
            Some(other) => Err(ActorError::InvalidOptions(format!(
                "option \"{key}\" must be a number, got {}",
                type_name(other)
            ))),
            None => Ok(None),
        }
    }

    /// Optional unsigned integer option
    pub fn opt_u64(&self, key: &str) -> Result<Option<u64>, ActorError> {
        match self.entries.get(key) {
            Some(Value::Number(n)) => n.as_u64().map(Some).ok_or_else(|| {
                ActorError::InvalidOptions(format!(
                    "option \"{key}\" must be an unsigned integer"
                ))
            }),
            Some(other) => Err(ActorError::InvalidOptions(format!(
                "option \"{key}\" must be an integer, got {}",
                type_name(other)
            ))),
            None => Ok(None),
        }
    }

    /// Optional object option, as a JSON map
    pub fn opt_object(&self, key: &str) -> Result<Option<&Map<String, Value>>, ActorError> {
        match self.entries.get(key) {
            Some(Value::Object(map)) => Ok(Some(map)),
            Some(other) => Err(ActorError::InvalidOptions(format!(
                "option \"{key}\" must be an object, got {}",
                type_name(other)
            ))),
            None => Ok(None),
        }
    }

    /// Deserialize the whole option block into a typed struct
    ///
    /// Pair with `#[serde(deny_unknown_fields)]` to reject stray keys.
    ///
    /// # Errors
    /// Returns `InvalidOptions` carrying serde's message.
    pub fn typed<T: DeserializeOwned>(&self) -> Result<T, ActorError> {
        serde_json::from_value(Value::Object(self.entries.clone()))
            .map_err(|e| ActorError::InvalidOptions(e.to_string()))
    }

    /// The underlying entries
    #[inline]
    #[must_use]
    pub fn entries(&self) -> &Map<String, Value> {
        &self.entries
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[test]
    fn rejects_non_object() {
        assert!(ActorOptions::new(json!([1, 2])).is_err());
        assert!(ActorOptions::new(json!(null)).is_ok());
    }

    #[test]
    fn required_str_present_and_missing() {
        let opts = ActorOptions::new(json!({"name": "web"})).unwrap();
        assert_eq!(opts.required_str("name").unwrap(), "web");

        let err = opts.required_str("missing").unwrap_err();
        assert!(err.to_string().contains("missing required option"));
    }

    #[test]
    fn wrong_type_reports_actual() {
        let opts = ActorOptions::new(json!({"name": 42})).unwrap();
        let err = opts.required_str("name").unwrap_err();
        assert!(err.to_string().contains("got number"));
    }

    #[test]
    fn opt_f64_rejects_negative() {
        let opts = ActorOptions::new(json!({"seconds": -1.5})).unwrap();
        assert!(opts.opt_f64("seconds").is_err());

        let opts = ActorOptions::new(json!({"seconds": 0.25})).unwrap();
        assert_eq!(opts.opt_f64("seconds").unwrap(), Some(0.25));
    }

    #[derive(Debug, Deserialize)]
    #[serde(deny_unknown_fields)]
    struct SleepOpts {
        seconds: f64,
    }

    #[test]
    fn typed_denies_unknown_fields() {
        let opts = ActorOptions::new(json!({"seconds": 1.0, "bogus": true})).unwrap();
        let err = opts.typed::<SleepOpts>().unwrap_err();
        assert!(matches!(err, ActorError::InvalidOptions(_)));

        let opts = ActorOptions::new(json!({"seconds": 1.0})).unwrap();
        assert_eq!(opts.typed::<SleepOpts>().unwrap().seconds, 1.0);
    }
}
