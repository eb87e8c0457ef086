//! Bridge configuration
//!
//! Parses `bridge.yaml` into a validated [`BridgeConfig`].

use serde::Deserialize;
use serde_yaml::Value;
use std::fs;
use std::path::Path;
use std::time::Duration;
use t2o_core::Credentials;
use tracing::debug;

use crate::error::{ConfigError, ConfigResult};
use crate::secrets::Secrets;
use crate::tags::resolve_tags;

/// Name of the configuration file inside the configuration directory
pub const CONFIG_FILE: &str = "bridge.yaml";

/// Vendor portal the bridge talks to unless overridden
pub const DEFAULT_BASE_URL: &str = "https://tap2open.com";

/// Platform name used when the configuration does not set one
pub const DEFAULT_NAME: &str = "Tap2Open";

/// Longest accepted session lifetime
pub const MAX_TOKEN_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

const DEFAULT_TOKEN_TTL_SECS: u64 = 60 * 60;
const DEFAULT_OPENING_DELAY_SECS: u64 = 5;
const DEFAULT_OPEN_DELAY_SECS: u64 = 5;

/// Settings as written in the file; every field optional so validation can
/// name exactly what is missing
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawBridgeConfig {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    password: Option<String>,
    /// Seconds
    #[serde(default)]
    reconnect_interval: Option<u64>,
    #[serde(default)]
    base_url: Option<String>,
    /// Seconds
    #[serde(default)]
    token_ttl: Option<u64>,
    /// Seconds
    #[serde(default)]
    opening_delay: Option<u64>,
    /// Seconds
    #[serde(default)]
    open_delay: Option<u64>,
}

/// Validated bridge configuration
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Platform name used in logs
    pub name: String,
    pub credentials: Credentials,
    /// Requested delay between reconnect attempts, before clamping
    pub reconnect_interval: Duration,
    /// Root URL of the vendor portal, without trailing slash
    pub base_url: String,
    /// Lifetime of a session before it is proactively refreshed
    pub token_ttl: Duration,
    /// Modeled travel time from closed to open
    pub opening_delay: Duration,
    /// Time a gate is assumed to stay open before reclosing on its own
    pub open_delay: Duration,
}

impl BridgeConfig {
    /// Load `bridge.yaml` (and `secrets.yaml`, if present) from `config_dir`
    pub fn load(config_dir: impl AsRef<Path>) -> ConfigResult<Self> {
        let config_dir = config_dir.as_ref();
        let path = config_dir.join(CONFIG_FILE);
        let content = fs::read_to_string(&path).map_err(|source| ConfigError::ReadFile {
            path: path.clone(),
            source,
        })?;

        let secrets = Secrets::load(config_dir)?;
        if let Some(source) = secrets.source() {
            debug!(secrets = %source.display(), count = secrets.len(), "Using secrets file");
        }
        Self::parse(&content, &path, &secrets)
    }

    /// Parse `bridge.yaml` text, resolving tags against `secrets`
    pub fn parse(content: &str, source: &Path, secrets: &Secrets) -> ConfigResult<Self> {
        let document: Value =
            serde_yaml::from_str(content).map_err(|e| ConfigError::ParseYaml {
                path: source.to_path_buf(),
                source: e,
            })?;
        let document = resolve_tags(document, secrets)?;
        Self::from_value(document, source)
    }

    fn from_value(value: Value, source: &Path) -> ConfigResult<Self> {
        let raw: RawBridgeConfig = if value.is_null() {
            RawBridgeConfig::default()
        } else {
            serde_yaml::from_value(value).map_err(|e| ConfigError::ParseYaml {
                path: source.to_path_buf(),
                source: e,
            })?
        };

        let config = Self::validate(raw)?;
        debug!(name = %config.name, base_url = %config.base_url, "Loaded bridge configuration");
        Ok(config)
    }

    fn validate(raw: RawBridgeConfig) -> ConfigResult<Self> {
        let username = non_empty(raw.username).ok_or(ConfigError::MissingField { field: "username" })?;
        let password = non_empty(raw.password).ok_or(ConfigError::MissingField { field: "password" })?;
        let reconnect_interval = match raw.reconnect_interval {
            Some(0) | None => {
                return Err(ConfigError::MissingField {
                    field: "reconnect_interval",
                })
            }
            Some(secs) => Duration::from_secs(secs),
        };

        let base_url = non_empty(raw.base_url).unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ConfigError::InvalidValue {
                key: "base_url".to_string(),
                reason: "must start with http:// or https://".to_string(),
            });
        }

        let token_ttl = Duration::from_secs(raw.token_ttl.unwrap_or(DEFAULT_TOKEN_TTL_SECS));
        if token_ttl.is_zero() || token_ttl > MAX_TOKEN_TTL {
            return Err(ConfigError::InvalidValue {
                key: "token_ttl".to_string(),
                reason: format!(
                    "must be between 1 and {} seconds",
                    MAX_TOKEN_TTL.as_secs()
                ),
            });
        }

        Ok(Self {
            name: non_empty(raw.name).unwrap_or_else(|| DEFAULT_NAME.to_string()),
            credentials: Credentials::new(username, password),
            reconnect_interval,
            base_url: base_url.trim_end_matches('/').to_string(),
            token_ttl,
            opening_delay: Duration::from_secs(
                raw.opening_delay.unwrap_or(DEFAULT_OPENING_DELAY_SECS),
            ),
            open_delay: Duration::from_secs(raw.open_delay.unwrap_or(DEFAULT_OPEN_DELAY_SECS)),
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}
