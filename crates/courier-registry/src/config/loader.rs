//! Plugin configuration loader.

use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Format, Serialized, Toml, Yaml};
use serde_json::{Map, Value};
use tracing::{debug, info};

use courier_core::{ConfigSchema, PluginConfig};

use super::error::{ConfigError, ConfigResult};

/// File extensions probed for plugin config files, in order.
const FILE_EXTENSIONS: &[&str] = &["yaml", "yml", "toml"];

/// Loads and validates plugin configurations from layered sources.
#[derive(Debug, Clone, Default)]
pub struct ConfigLoader {
    config_dir: Option<PathBuf>,
}

impl ConfigLoader {
    /// Creates a loader without a config-file directory (defaults and
    /// environment only).
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a loader that also probes `config_dir` for per-plugin files.
    pub fn with_config_dir(config_dir: impl Into<PathBuf>) -> Self {
        Self {
            config_dir: Some(config_dir.into()),
        }
    }

    /// Loads, merges, and validates the configuration for one plugin.
    pub fn load_plugin_config(
        &self,
        plugin_name: &str,
        plugin_version: &str,
        schema: &ConfigSchema,
    ) -> ConfigResult<PluginConfig> {
        let mut figment = Figment::from(Serialized::defaults(schema.defaults()));

        if let Some(path) = self.find_config_file(plugin_name) {
            info!(plugin = %plugin_name, path = %path.display(), "Loading plugin config file");
            figment = match path.extension().and_then(|e| e.to_str()) {
                Some("toml") => figment.merge(Toml::file(&path)),
                _ => figment.merge(Yaml::file(&path)),
            };
        }

        let env_layer = load_from_env(plugin_name);
        if !env_layer.is_empty() {
            debug!(
                plugin = %plugin_name,
                count = env_layer.len(),
                "Loaded config values from environment"
            );
            figment = figment.merge(Serialized::defaults(env_layer));
        }

        let mut merged: Map<String, Value> =
            figment.extract().map_err(|e| ConfigError::Merge {
                plugin: plugin_name.to_string(),
                source: Box::new(e),
            })?;

        let enabled = merged.remove("enabled").map(|v| truthy(&v)).unwrap_or(true);

        schema
            .validate(&merged)
            .map_err(|violation| ConfigError::Validation {
                plugin: plugin_name.to_string(),
                violation,
            })?;

        debug!(plugin = %plugin_name, enabled = enabled, "Plugin configuration validated");

        Ok(PluginConfig {
            plugin_name: plugin_name.to_string(),
            plugin_version: plugin_version.to_string(),
            enabled,
            config: merged,
        })
    }

    /// Finds the first config file for a plugin, probing
    /// `.yaml`, `.yml`, `.toml` in that order.
    fn find_config_file(&self, plugin_name: &str) -> Option<PathBuf> {
        let dir = self.config_dir.as_deref().filter(|d: &&Path| d.exists())?;

        for ext in FILE_EXTENSIONS {
            let candidate = dir.join(format!("{plugin_name}.{ext}"));
            if candidate.exists() {
                return Some(candidate);
            }
        }
        None
    }
}

/// Collects `PLUGIN_{NAME}_*` environment variables into a config map.
///
/// Keys are lowercased with the prefix stripped; `__` marks one level of
/// nesting. Values are parsed as JSON first (booleans, numbers, arrays,
/// objects) and fall back to the raw string.
fn load_from_env(plugin_name: &str) -> Map<String, Value> {
    let prefix = format!("PLUGIN_{}_", plugin_name.to_uppercase().replace('-', "_"));
    let mut config = Map::new();

    for (key, raw) in std::env::vars() {
        let Some(stripped) = key.strip_prefix(&prefix) else {
            continue;
        };
        let config_key = stripped.to_lowercase();
        let value = parse_env_value(&raw);

        if config_key.contains("__") {
            set_nested(&mut config, &config_key, value);
        } else {
            config.insert(config_key, value);
        }
    }

    config
}

fn set_nested(config: &mut Map<String, Value>, dotted: &str, value: Value) {
    let mut parts = dotted.split("__").peekable();
    let mut current = config;

    while let Some(part) = parts.next() {
        if parts.peek().is_none() {
            current.insert(part.to_string(), value);
            return;
        }
        let entry = current
            .entry(part.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        // A flat variable may have claimed the key first; the nested form
        // wins.
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        current = entry
            .as_object_mut()
            .expect("entry was just ensured to be an object");
    }
}

fn parse_env_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

/// Truthiness of the special `enabled` key: native booleans pass through,
/// the usual textual forms (`true/1/yes/on`, case-insensitive) are
/// recognised, nonzero numbers are true.
fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::String(s) => matches!(s.to_lowercase().as_str(), "true" | "1" | "yes" | "on"),
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use courier_core::SchemaType;
    use serde_json::json;

    fn schema() -> ConfigSchema {
        ConfigSchema::new()
            .required("client_id", SchemaType::String, "app client id")
            .required("signing_secret", SchemaType::String, "signing secret")
            .optional_with_default("timeout_secs", SchemaType::Integer, "request timeout", 30)
            .optional(
                "oauth",
                SchemaType::Object,
                "nested oauth settings",
            )
    }

    /// Guard: tests touching the process environment use unique plugin
    /// names so parallel tests cannot observe each other's variables.
    fn set_env(key: &str, value: &str) {
        // SAFETY: test-only, keys are unique per test.
        unsafe { std::env::set_var(key, value) };
    }

    fn remove_env(key: &str) {
        // SAFETY: test-only, keys are unique per test.
        unsafe { std::env::remove_var(key) };
    }

    #[test]
    fn defaults_apply_without_overrides() {
        set_env("PLUGIN_DEFA_CLIENT_ID", "C1");
        set_env("PLUGIN_DEFA_SIGNING_SECRET", "sekrit");

        let config = ConfigLoader::new()
            .load_plugin_config("defa", "1.0.0", &schema())
            .unwrap();

        assert!(config.enabled);
        assert_eq!(config.config.get("timeout_secs"), Some(&json!(30)));
        assert_eq!(config.plugin_version, "1.0.0");

        remove_env("PLUGIN_DEFA_CLIENT_ID");
        remove_env("PLUGIN_DEFA_SIGNING_SECRET");
    }

    #[test]
    fn file_layer_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("filed.yaml"),
            "client_id: C-from-file\nsigning_secret: s-from-file\ntimeout_secs: 10\n",
        )
        .unwrap();

        let config = ConfigLoader::with_config_dir(dir.path())
            .load_plugin_config("filed", "1.0.0", &schema())
            .unwrap();

        assert_eq!(config.get_str("client_id"), Some("C-from-file"));
        assert_eq!(config.config.get("timeout_secs"), Some(&json!(10)));
    }

    #[test]
    fn env_layer_beats_file_layer() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("envy.yaml"),
            "client_id: C-from-file\nsigning_secret: s\n",
        )
        .unwrap();

        set_env("PLUGIN_ENVY_CLIENT_ID", "C-from-env");
        set_env("PLUGIN_ENVY_TIMEOUT_SECS", "55");

        let config = ConfigLoader::with_config_dir(dir.path())
            .load_plugin_config("envy", "1.0.0", &schema())
            .unwrap();

        assert_eq!(config.get_str("client_id"), Some("C-from-env"));
        // JSON-first parsing keeps numbers numeric.
        assert_eq!(config.config.get("timeout_secs"), Some(&json!(55)));

        remove_env("PLUGIN_ENVY_CLIENT_ID");
        remove_env("PLUGIN_ENVY_TIMEOUT_SECS");
    }

    #[test]
    fn double_underscore_nests_and_json_values_parse() {
        set_env("PLUGIN_NEST_CLIENT_ID", "C1");
        set_env("PLUGIN_NEST_SIGNING_SECRET", "s");
        set_env("PLUGIN_NEST_OAUTH__SCOPES", r#"["commands","chat:write"]"#);

        let config = ConfigLoader::new()
            .load_plugin_config("nest", "1.0.0", &schema())
            .unwrap();

        let oauth = config.config.get("oauth").unwrap();
        assert_eq!(
            oauth.get("scopes"),
            Some(&json!(["commands", "chat:write"]))
        );

        remove_env("PLUGIN_NEST_CLIENT_ID");
        remove_env("PLUGIN_NEST_SIGNING_SECRET");
        remove_env("PLUGIN_NEST_OAUTH__SCOPES");
    }

    #[test]
    fn enabled_is_popped_and_parsed() {
        for (raw, expected) in [("true", true), ("YES", true), ("on", true), ("0", false), ("off", false)] {
            set_env("PLUGIN_ENAB_CLIENT_ID", "C1");
            set_env("PLUGIN_ENAB_SIGNING_SECRET", "s");
            set_env("PLUGIN_ENAB_ENABLED", raw);

            let config = ConfigLoader::new()
                .load_plugin_config("enab", "1.0.0", &schema())
                .unwrap();

            assert_eq!(config.enabled, expected, "raw {raw:?}");
            assert!(!config.config.contains_key("enabled"));

            remove_env("PLUGIN_ENAB_CLIENT_ID");
            remove_env("PLUGIN_ENAB_SIGNING_SECRET");
            remove_env("PLUGIN_ENAB_ENABLED");
        }
    }

    #[test]
    fn missing_required_key_names_plugin_and_path() {
        let err = ConfigLoader::new()
            .load_plugin_config("bare", "1.0.0", &schema())
            .unwrap_err();

        let message = err.to_string();
        assert!(message.contains("bare"));
        assert!(message.contains("client_id") || message.contains("signing_secret"));
    }

    #[test]
    fn wrong_type_fails_without_echoing_value() {
        set_env("PLUGIN_TYPED_CLIENT_ID", "C1");
        set_env("PLUGIN_TYPED_SIGNING_SECRET", "s");
        set_env("PLUGIN_TYPED_TIMEOUT_SECS", r#""thirty""#);

        let err = ConfigLoader::new()
            .load_plugin_config("typed", "1.0.0", &schema())
            .unwrap_err();

        let message = err.to_string();
        assert!(message.contains("typed"));
        assert!(message.contains("timeout_secs"));
        assert!(!message.contains("thirty"));

        remove_env("PLUGIN_TYPED_CLIENT_ID");
        remove_env("PLUGIN_TYPED_SIGNING_SECRET");
        remove_env("PLUGIN_TYPED_TIMEOUT_SECS");
    }

    #[test]
    fn toml_file_is_accepted() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("tomly.toml"),
            "client_id = \"C-toml\"\nsigning_secret = \"s\"\n",
        )
        .unwrap();

        let config = ConfigLoader::with_config_dir(dir.path())
            .load_plugin_config("tomly", "1.0.0", &schema())
            .unwrap();

        assert_eq!(config.get_str("client_id"), Some("C-toml"));
    }

    #[test]
    fn yaml_wins_over_toml_when_both_exist() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("both.yaml"),
            "client_id: C-yaml\nsigning_secret: s\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("both.toml"),
            "client_id = \"C-toml\"\nsigning_secret = \"s\"\n",
        )
        .unwrap();

        let config = ConfigLoader::with_config_dir(dir.path())
            .load_plugin_config("both", "1.0.0", &schema())
            .unwrap();

        assert_eq!(config.get_str("client_id"), Some("C-yaml"));
    }
}
