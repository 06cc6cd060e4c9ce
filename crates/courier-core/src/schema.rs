//! Typed configuration schemas for channel adapters.
//!
//! Adapters declare the keys they accept via [`ConfigSchema`]; the config
//! loader collects declared defaults, merges the file and environment
//! layers, and validates the result against the schema before the adapter
//! is ever instantiated.
//!
//! Validation messages name the failing key but never echo the offending
//! value, since config values are routinely secrets.

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use thiserror::Error;

/// The value kinds a schema property can require.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaType {
    String,
    Boolean,
    Integer,
    Number,
    Object,
}

impl SchemaType {
    fn describes(&self, value: &Value) -> bool {
        match self {
            SchemaType::String => value.is_string(),
            SchemaType::Boolean => value.is_boolean(),
            SchemaType::Integer => value.is_i64() || value.is_u64(),
            SchemaType::Number => value.is_number(),
            SchemaType::Object => value.is_object(),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            SchemaType::String => "string",
            SchemaType::Boolean => "boolean",
            SchemaType::Integer => "integer",
            SchemaType::Number => "number",
            SchemaType::Object => "object",
        }
    }
}

/// One declared configuration key.
#[derive(Debug, Clone)]
pub struct PropertySpec {
    pub kind: SchemaType,
    /// Default applied when no layer provides the key.
    pub default: Option<Value>,
    pub description: &'static str,
}

/// A violation raised while validating a merged config against its schema.
///
/// The message intentionally carries the key path and expectation only,
/// never the value found there.
#[derive(Debug, Clone, Error)]
#[error("{message} at '{path}'")]
pub struct SchemaViolation {
    pub path: String,
    pub message: String,
}

/// The capability-declared schema for one adapter's configuration.
#[derive(Debug, Clone, Default)]
pub struct ConfigSchema {
    properties: BTreeMap<&'static str, PropertySpec>,
    required: Vec<&'static str>,
}

impl ConfigSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a required key.
    pub fn required(mut self, name: &'static str, kind: SchemaType, description: &'static str) -> Self {
        self.properties.insert(
            name,
            PropertySpec {
                kind,
                default: None,
                description,
            },
        );
        self.required.push(name);
        self
    }

    /// Declares an optional key without a default.
    pub fn optional(mut self, name: &'static str, kind: SchemaType, description: &'static str) -> Self {
        self.properties.insert(
            name,
            PropertySpec {
                kind,
                default: None,
                description,
            },
        );
        self
    }

    /// Declares an optional key with a default value.
    pub fn optional_with_default(
        mut self,
        name: &'static str,
        kind: SchemaType,
        description: &'static str,
        default: impl Into<Value>,
    ) -> Self {
        self.properties.insert(
            name,
            PropertySpec {
                kind,
                default: Some(default.into()),
                description,
            },
        );
        self
    }

    /// Returns the declared property specs.
    pub fn properties(&self) -> impl Iterator<Item = (&'static str, &PropertySpec)> {
        self.properties.iter().map(|(k, v)| (*k, v))
    }

    /// Collects every declared default into a config map.
    pub fn defaults(&self) -> Map<String, Value> {
        self.properties
            .iter()
            .filter_map(|(name, spec)| spec.default.clone().map(|d| (name.to_string(), d)))
            .collect()
    }

    /// Validates a merged config map against this schema.
    ///
    /// Checks that every required key is present and that every declared
    /// key carries a value of the declared kind. Undeclared keys pass
    /// through untouched; adapters may consume extras at their own risk.
    pub fn validate(&self, config: &Map<String, Value>) -> Result<(), SchemaViolation> {
        for name in &self.required {
            if !config.contains_key(*name) {
                return Err(SchemaViolation {
                    path: (*name).to_string(),
                    message: "required key is missing".to_string(),
                });
            }
        }

        for (name, spec) in &self.properties {
            if let Some(value) = config.get(*name)
                && !spec.kind.describes(value)
            {
                return Err(SchemaViolation {
                    path: (*name).to_string(),
                    message: format!("expected a {} value", spec.kind.name()),
                });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema() -> ConfigSchema {
        ConfigSchema::new()
            .required("client_id", SchemaType::String, "app client id")
            .required("signing_secret", SchemaType::String, "webhook signing secret")
            .optional_with_default("timeout_secs", SchemaType::Integer, "request timeout", 30)
    }

    #[test]
    fn defaults_are_collected() {
        let defaults = schema().defaults();
        assert_eq!(defaults.get("timeout_secs"), Some(&json!(30)));
        assert!(!defaults.contains_key("client_id"));
    }

    #[test]
    fn missing_required_key_is_reported_by_path() {
        let mut config = Map::new();
        config.insert("client_id".into(), json!("C1"));
        let err = schema().validate(&config).unwrap_err();
        assert_eq!(err.path, "signing_secret");
        assert!(err.message.contains("required"));
    }

    #[test]
    fn wrong_type_never_echoes_the_value() {
        let mut config = Map::new();
        config.insert("client_id".into(), json!("C1"));
        config.insert("signing_secret".into(), json!(12345));
        let err = schema().validate(&config).unwrap_err();
        assert_eq!(err.path, "signing_secret");
        assert!(!err.to_string().contains("12345"));
    }

    #[test]
    fn undeclared_keys_pass_through() {
        let mut config = Map::new();
        config.insert("client_id".into(), json!("C1"));
        config.insert("signing_secret".into(), json!("s3"));
        config.insert("extra".into(), json!(["anything"]));
        assert!(schema().validate(&config).is_ok());
    }
}
