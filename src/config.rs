//! Hierarchical configuration with colon separated lookup paths.
//!
//! Values live in a JSON tree and are addressed as `"i18n:defaults:locale"`.
//! An optional environment prefix lets deployments override single nodes:
//! with prefix `APP`, the variable `APP_DEBUGGING_ENABLED` takes precedence
//! over the node `debugging:enabled`.

use std::env;
use std::fmt;
use std::path::Path;

use parking_lot::RwLock;

use crate::ConfigError;

/// Separator between nodes of a lookup path.
pub const PATH_SEPARATOR: char = ':';

/// Configuration tree shared through the [`Registry`](crate::Registry).
///
/// # Examples
///
/// ```rust
/// use ferrous_dispatch::Configuration;
///
/// let config = Configuration::from_json_str(r#"{"debugging":{"enabled":true}}"#).unwrap();
/// assert!(config.get_bool("debugging:enabled").unwrap());
/// assert!(config.get("debugging:level").is_err());
///
/// config.set("i18n:defaults:locale", serde_json::json!("de"));
/// assert_eq!(config.get_string("i18n:defaults:locale").unwrap(), "de");
/// ```
pub struct Configuration {
    root: RwLock<serde_json::Value>,
    env_prefix: Option<String>,
}

impl Configuration {
    /// Empty configuration.
    pub fn new() -> Self {
        Self::from_value(serde_json::Value::Object(serde_json::Map::new()))
    }

    pub fn from_value(root: serde_json::Value) -> Self {
        Self {
            root: RwLock::new(root),
            env_prefix: None,
        }
    }

    pub fn from_json_str(source: &str) -> Result<Self, ConfigError> {
        Ok(Self::from_value(serde_json::from_str(source)?))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// Lets environment variables named `<PREFIX>_<NODE>_<NODE>` override nodes.
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = Some(prefix.into());
        self
    }

    /// Value at `path`, a clone of the whole subtree for inner nodes.
    pub fn get(&self, path: &str) -> Result<serde_json::Value, ConfigError> {
        if let Some(value) = self.env_override(path) {
            return Ok(value);
        }

        let root = self.root.read();
        let mut node = &*root;
        for name in path.split(PATH_SEPARATOR) {
            node = node.get(name).ok_or_else(|| ConfigError::MissingNode {
                path: path.to_string(),
                node: name.to_string(),
            })?;
        }
        Ok(node.clone())
    }

    pub fn contains(&self, path: &str) -> bool {
        self.get(path).is_ok()
    }

    pub fn get_bool(&self, path: &str) -> Result<bool, ConfigError> {
        self.get(path)?.as_bool().ok_or_else(|| ConfigError::TypeMismatch {
            path: path.to_string(),
            expected: "boolean",
        })
    }

    pub fn get_bool_or(&self, path: &str, default: bool) -> bool {
        self.get_bool(path).unwrap_or(default)
    }

    pub fn get_string(&self, path: &str) -> Result<String, ConfigError> {
        match self.get(path)? {
            serde_json::Value::String(s) => Ok(s),
            _ => Err(ConfigError::TypeMismatch {
                path: path.to_string(),
                expected: "string",
            }),
        }
    }

    pub fn get_string_or(&self, path: &str, default: &str) -> String {
        self.get_string(path).unwrap_or_else(|_| default.to_string())
    }

    pub fn get_i64(&self, path: &str) -> Result<i64, ConfigError> {
        self.get(path)?.as_i64().ok_or_else(|| ConfigError::TypeMismatch {
            path: path.to_string(),
            expected: "integer",
        })
    }

    pub fn get_i64_or(&self, path: &str, default: i64) -> i64 {
        self.get_i64(path).unwrap_or(default)
    }

    /// Sets the node at `path`, creating missing parents. A scalar standing in
    /// the way of the path is replaced by an object.
    pub fn set(&self, path: &str, value: serde_json::Value) {
        let mut root = self.root.write();
        let mut node = &mut *root;
        for name in path.split(PATH_SEPARATOR) {
            if !node.is_object() {
                *node = serde_json::Value::Object(serde_json::Map::new());
            }
            node = match node {
                serde_json::Value::Object(map) => {
                    map.entry(name.to_string()).or_insert(serde_json::Value::Null)
                }
                _ => return,
            };
        }
        *node = value;
    }

    /// Snapshot of the whole tree, environment overrides excluded.
    pub fn to_value(&self) -> serde_json::Value {
        self.root.read().clone()
    }

    fn env_override(&self, path: &str) -> Option<serde_json::Value> {
        let prefix = self.env_prefix.as_ref()?;
        let key = format!(
            "{}_{}",
            prefix.to_uppercase(),
            path.replace(PATH_SEPARATOR, "_").to_uppercase()
        );
        let raw = env::var(&key).ok()?;
        Some(serde_json::from_str(&raw).unwrap_or(serde_json::Value::String(raw)))
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Configuration")
            .field("root", &*self.root.read())
            .field("env_prefix", &self.env_prefix)
            .finish()
    }
}
