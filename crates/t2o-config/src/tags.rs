//! Tagged settings in `bridge.yaml`
//!
//! The file is a flat mapping, so only top-level values are looked at. A
//! tag argument is always a plain name:
//!
//! ```yaml
//! username: !secret t2o_username
//! password: !env_var T2O_PASSWORD
//! ```

use serde_yaml::value::TaggedValue;
use serde_yaml::{Mapping, Value};
use tracing::debug;

use crate::error::{ConfigError, ConfigResult};
use crate::secrets::Secrets;

/// Replace every tagged setting with the value it points at
pub(crate) fn resolve_tags(document: Value, secrets: &Secrets) -> ConfigResult<Value> {
    let Value::Mapping(settings) = document else {
        return Ok(document);
    };

    settings
        .into_iter()
        .map(|(key, value)| match value {
            Value::Tagged(tagged) => {
                let resolved = resolve_setting(&setting_name(&key), *tagged, secrets)?;
                Ok((key, resolved))
            }
            other => Ok((key, other)),
        })
        .collect::<ConfigResult<Mapping>>()
        .map(Value::Mapping)
}

fn resolve_setting(setting: &str, tagged: TaggedValue, secrets: &Secrets) -> ConfigResult<Value> {
    let TaggedValue { tag, value } = tagged;
    let tag = tag.to_string();

    let Value::String(name) = value else {
        return Err(ConfigError::InvalidValue {
            key: setting.to_string(),
            reason: format!("{} expects a name", tag),
        });
    };

    let resolved = match tag.trim_start_matches('!') {
        "secret" => secrets.get(&name)?.to_string(),
        "env_var" => {
            std::env::var(&name).map_err(|_| ConfigError::EnvVarNotFound { var: name.clone() })?
        }
        _ => {
            return Err(ConfigError::InvalidValue {
                key: setting.to_string(),
                reason: format!("unsupported tag {}", tag),
            })
        }
    };

    // The resolved value may be a credential; only the setting is logged
    debug!(setting, tag = %tag, "Resolved tagged setting");
    Ok(Value::String(resolved))
}

fn setting_name(key: &Value) -> String {
    match key {
        Value::String(s) => s.clone(),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim().to_string())
            .unwrap_or_default(),
    }
}
