//! Flat numeric parameter table with documented defaults.
//!
//! Configuration is a single JSON object mapping parameter names to numbers
//! or fixed-size numeric arrays, e.g.
//!
//! ```json
//! {
//!     "control/angle/gains/kp": [0.4, 0.4, 0.8],
//!     "du_command/yaw": [-0.1, 0.1],
//!     "command/thrust": 0.5
//! }
//! ```
//!
//! A missing or malformed key is never fatal: the typed accessors log a
//! warning and substitute the caller-supplied default.

use std::collections::BTreeMap;
use std::path::Path;

use nalgebra::{Vector3, Vector4};
use serde_json::Value;
use thiserror::Error;

use crate::actuation::ActuationMapper;
use crate::controller::{ControlLimits, GainSet};

/// Errors loading a parameter file. Only surface at startup; lookups on a
/// loaded table never fail.
#[derive(Debug, Error)]
pub enum ParamError {
    #[error("failed to read parameter file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse parameter file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("parameter file must contain a top-level JSON object")]
    NotAnObject,
}

/// Flat mapping of parameter names to numeric values.
#[derive(Debug, Clone, Default)]
pub struct ParamTable {
    values: BTreeMap<String, Value>,
}

impl ParamTable {
    /// Empty table; every lookup yields its default.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parse a table from JSON text.
    pub fn from_json(text: &str) -> Result<Self, ParamError> {
        let value: Value = serde_json::from_str(text)?;
        match value {
            Value::Object(map) => Ok(Self {
                values: map.into_iter().collect(),
            }),
            _ => Err(ParamError::NotAnObject),
        }
    }

    /// Load a table from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, ParamError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    fn number(value: &Value) -> Option<f64> {
        value.as_f64()
    }

    fn array(value: &Value, len: usize) -> Option<Vec<f64>> {
        let items = value.as_array()?;
        if items.len() != len {
            return None;
        }
        items.iter().map(Self::number).collect()
    }

    /// Scalar parameter, or `default` with a warning when absent/malformed.
    pub fn scalar(&self, key: &str, default: f64) -> f64 {
        match self.values.get(key).and_then(Self::number) {
            Some(v) => v,
            None => {
                log::warn!("parameter {key} not set, using default {default}");
                default
            }
        }
    }

    /// Two-element `[min, max]` parameter.
    pub fn pair(&self, key: &str, default: [f64; 2]) -> [f64; 2] {
        match self.values.get(key).and_then(|v| Self::array(v, 2)) {
            Some(v) => [v[0], v[1]],
            None => {
                log::warn!("parameter {key} not set, using default {default:?}");
                default
            }
        }
    }

    /// Three-element vector parameter.
    pub fn vec3(&self, key: &str, default: Vector3<f64>) -> Vector3<f64> {
        match self.values.get(key).and_then(|v| Self::array(v, 3)) {
            Some(v) => Vector3::new(v[0], v[1], v[2]),
            None => {
                log::warn!("parameter {key} not set, using default {default:?}");
                default
            }
        }
    }

    /// Four-element vector parameter.
    pub fn vec4(&self, key: &str, default: Vector4<f64>) -> Vector4<f64> {
        match self.values.get(key).and_then(|v| Self::array(v, 4)) {
            Some(v) => Vector4::new(v[0], v[1], v[2], v[3]),
            None => {
                log::warn!("parameter {key} not set, using default {default:?}");
                default
            }
        }
    }
}

impl GainSet {
    /// Load gains from `control/angle/gains/{kp,ki,kd}`.
    pub fn from_params(params: &ParamTable) -> Self {
        let defaults = Self::default();
        Self {
            kp: params.vec3("control/angle/gains/kp", defaults.kp),
            ki: params.vec3("control/angle/gains/ki", defaults.ki),
            kd: params.vec3("control/angle/gains/kd", defaults.kd),
        }
    }
}

impl ControlLimits {
    /// Load slew and authority limits from `control/angle/limits/{slew,authority}`.
    pub fn from_params(params: &ParamTable) -> Self {
        let defaults = Self::default();
        Self {
            slew: params.vec3("control/angle/limits/slew", defaults.slew),
            authority: params.vec3("control/angle/limits/authority", defaults.authority),
        }
    }
}

impl ActuationMapper {
    /// Load clamp ranges from `du_command/{roll,pitch,yaw,thrust}` pairs and
    /// offsets from `motors/offset`.
    pub fn from_params(params: &ParamTable) -> Self {
        let roll = params.pair("du_command/roll", [-0.2, 0.2]);
        let pitch = params.pair("du_command/pitch", [-0.2, 0.2]);
        let yaw = params.pair("du_command/yaw", [-0.1, 0.1]);
        let thrust = params.pair("du_command/thrust", [0.0, 2.0]);
        Self {
            min: Vector4::new(roll[0], pitch[0], yaw[0], thrust[0]),
            max: Vector4::new(roll[1], pitch[1], yaw[1], thrust[1]),
            offset: params.vec4("motors/offset", Vector4::zeros()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn absent_key_yields_default() {
        let table = ParamTable::empty();
        assert_eq!(table.scalar("command/thrust", 0.5), 0.5);
        assert_eq!(
            table.vec3("encoders/direction", Vector3::new(1.0, 1.0, 1.0)),
            Vector3::new(1.0, 1.0, 1.0)
        );
    }

    #[test]
    fn present_key_overrides_default() {
        let table = ParamTable::from_json(
            r#"{"command/thrust": 0.8, "control/angle/gains/kp": [1.0, 2.0, 3.0]}"#,
        )
        .unwrap();
        assert_eq!(table.scalar("command/thrust", 0.5), 0.8);
        let gains = GainSet::from_params(&table);
        assert_eq!(gains.kp, Vector3::new(1.0, 2.0, 3.0));
        // ki was absent, so the documented default applies.
        assert_eq!(gains.ki, GainSet::default().ki);
    }

    #[test]
    fn malformed_value_falls_back_to_default() {
        let table =
            ParamTable::from_json(r#"{"control/angle/gains/kp": [1.0, 2.0], "command/thrust": "x"}"#)
                .unwrap();
        // Wrong arity and wrong type both recover via defaults.
        assert_eq!(
            table.vec3("control/angle/gains/kp", GainSet::default().kp),
            GainSet::default().kp
        );
        assert_eq!(table.scalar("command/thrust", 0.5), 0.5);
    }

    #[test]
    fn non_object_top_level_is_rejected() {
        assert!(matches!(
            ParamTable::from_json("[1, 2, 3]"),
            Err(ParamError::NotAnObject)
        ));
    }

    #[test]
    fn mapper_loads_pairs_and_offsets() {
        let table = ParamTable::from_json(
            r#"{"du_command/yaw": [-0.3, 0.3], "motors/offset": [0.01, 0.02, 0.03, 0.04]}"#,
        )
        .unwrap();
        let mapper = ActuationMapper::from_params(&table);
        assert_eq!(mapper.min[2], -0.3);
        assert_eq!(mapper.max[2], 0.3);
        assert_eq!(mapper.offset[3], 0.04);
        // Unspecified channels keep their documented defaults.
        assert_eq!(mapper.min[0], -0.2);
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"command/thrust": 0.6}}"#).unwrap();
        let table = ParamTable::from_file(file.path()).unwrap();
        assert_eq!(table.scalar("command/thrust", 0.5), 0.6);
    }
}
