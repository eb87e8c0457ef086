//! Gate records as returned by the remote catalog

use serde::{Deserialize, Deserializer, Serialize};

/// Identifier the vendor assigns to a physical gate
pub type GateId = u64;

/// Free-form parameters attached to a gate by the vendor
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GateParameters {
    /// Human-readable gate name shown to the user
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
}

/// Treat an explicit `null` like a missing key
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A single physical access point controllable through the remote API
///
/// Gates are read-only snapshots of the remote catalog; they are never
/// mutated locally. `gate_id` is the identity key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gate {
    pub gate_id: GateId,

    #[serde(default, deserialize_with = "null_as_default")]
    pub is_connected: bool,

    #[serde(default, deserialize_with = "null_as_default")]
    pub non_default: bool,

    #[serde(default, deserialize_with = "null_as_default")]
    pub guard_only: bool,

    /// Geofence radius in meters
    #[serde(default, deserialize_with = "null_as_default")]
    pub radius: f64,

    #[serde(default, deserialize_with = "null_as_default")]
    pub latitude: f64,

    #[serde(default, deserialize_with = "null_as_default")]
    pub longitude: f64,

    #[serde(default, deserialize_with = "null_as_default")]
    pub parameters: GateParameters,
}

impl Gate {
    /// Create a gate with the given id and description and default location data
    pub fn new(gate_id: GateId, description: impl Into<String>) -> Self {
        Self {
            gate_id,
            is_connected: true,
            non_default: false,
            guard_only: false,
            radius: 0.0,
            latitude: 0.0,
            longitude: 0.0,
            parameters: GateParameters {
                description: description.into(),
            },
        }
    }

    /// The display name of the gate, falling back to its id
    pub fn description(&self) -> String {
        if self.parameters.description.is_empty() {
            format!("Gate {}", self.gate_id)
        } else {
            self.parameters.description.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserialize_full_record() {
        let gate: Gate = serde_json::from_value(json!({
            "gate_id": 42,
            "is_connected": true,
            "non_default": false,
            "guard_only": true,
            "radius": 150.5,
            "latitude": 45.5,
            "longitude": -73.6,
            "parameters": {"description": "Front gate", "extra": 1},
            "lockout_time": 0
        }))
        .unwrap();

        assert_eq!(gate.gate_id, 42);
        assert!(gate.guard_only);
        assert_eq!(gate.radius, 150.5);
        assert_eq!(gate.description(), "Front gate");
    }

    #[test]
    fn test_missing_description_falls_back_to_id() {
        let gate: Gate = serde_json::from_value(json!({"gate_id": 7})).unwrap();
        assert!(!gate.is_connected);
        assert_eq!(gate.description(), "Gate 7");
    }

    #[test]
    fn test_null_fields_decode_as_defaults() {
        let gate: Gate = serde_json::from_value(json!({
            "gate_id": 1,
            "is_connected": null,
            "latitude": null,
            "radius": null,
            "parameters": {"description": null}
        }))
        .unwrap();
        assert_eq!(gate.latitude, 0.0);
        assert_eq!(gate.description(), "Gate 1");

        let gate: Gate =
            serde_json::from_value(json!({"gate_id": 2, "parameters": null})).unwrap();
        assert_eq!(gate.parameters, GateParameters::default());
        assert_eq!(gate.description(), "Gate 2");
    }

    #[test]
    fn test_gate_id_is_required() {
        let result = serde_json::from_value::<Gate>(json!({"is_connected": true}));
        assert!(result.is_err());
    }
}
