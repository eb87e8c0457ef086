//! `secrets.yaml` support
//!
//! Keeps portal credentials out of `bridge.yaml`. Only scalar values are
//! accepted; a list or mapping under a secret key is a configuration error.

use crate::error::{ConfigError, ConfigResult};
use serde_yaml::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// File name looked up next to `bridge.yaml`
pub const SECRETS_FILE: &str = "secrets.yaml";

/// Values available to `!secret` tags
#[derive(Clone, Default)]
pub struct Secrets {
    values: BTreeMap<String, String>,
    /// Where the values came from; `None` when no file exists
    source: Option<PathBuf>,
}

impl Secrets {
    /// Read `secrets.yaml` from `config_dir`; a missing file yields no secrets
    pub fn load(config_dir: &Path) -> ConfigResult<Self> {
        let path = config_dir.join(SECRETS_FILE);
        if !path.is_file() {
            debug!(path = %path.display(), "No secrets file");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path).map_err(|source| ConfigError::ReadFile {
            path: path.clone(),
            source,
        })?;
        let mut secrets = Self::parse(&content, &path)?;
        secrets.source = Some(path);
        Ok(secrets)
    }

    /// Parse secrets from YAML text; `path` is only used in errors
    pub fn parse(content: &str, path: &Path) -> ConfigResult<Self> {
        // An empty file parses as null
        let raw: Option<BTreeMap<String, Value>> =
            serde_yaml::from_str(content).map_err(|source| ConfigError::ParseYaml {
                path: path.to_path_buf(),
                source,
            })?;

        let mut values = BTreeMap::new();
        for (key, value) in raw.unwrap_or_default() {
            let Some(text) = scalar_to_string(&value) else {
                return Err(ConfigError::InvalidValue {
                    key,
                    reason: "secrets must be plain values".to_string(),
                });
            };
            values.insert(key, text);
        }

        debug!(count = values.len(), "Loaded secrets");
        Ok(Self {
            values,
            source: None,
        })
    }

    /// Look up `key`
    pub fn get(&self, key: &str) -> ConfigResult<&str> {
        self.values
            .get(key)
            .map(String::as_str)
            .ok_or_else(|| ConfigError::SecretNotFound {
                key: key.to_string(),
            })
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null => Some(String::new()),
        Value::Tagged(tagged) => scalar_to_string(&tagged.value),
        Value::Sequence(_) | Value::Mapping(_) => None,
    }
}

// Secret values never reach the logs
impl std::fmt::Debug for Secrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Secrets")
            .field("keys", &self.values.keys().collect::<Vec<_>>())
            .field("source", &self.source)
            .finish()
    }
}
