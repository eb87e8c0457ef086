//! Configuration loading for the Tap2Open bridge
//!
//! The bridge reads a flat `bridge.yaml` from a configuration directory.
//! Values may be pulled from elsewhere with two tags:
//!
//! - `!secret key` - value from `secrets.yaml` next to `bridge.yaml`
//! - `!env_var VAR` - value of an environment variable
//!
//! # Example
//!
//! ```ignore
//! use t2o_config::BridgeConfig;
//!
//! let config = BridgeConfig::load("/etc/tap2open")?;
//! println!("reconnecting every {:?}", config.reconnect_interval);
//! ```

mod bridge_config;
mod error;
mod secrets;
mod tags;

pub use bridge_config::{
    BridgeConfig, CONFIG_FILE, DEFAULT_BASE_URL, DEFAULT_NAME, MAX_TOKEN_TTL,
};
pub use error::{ConfigError, ConfigResult};
pub use secrets::{Secrets, SECRETS_FILE};
