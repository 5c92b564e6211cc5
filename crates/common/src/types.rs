use serde::{Deserialize, Serialize};
use std::fmt;

/// Orbit geometry consumed by the camera bridge and templated into the shader.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObserverParams {
    /// Camera orbit radius in scene units.
    pub distance: f64,
    /// Orbital inclination in degrees.
    pub orbital_inclination: f64,
}

impl Default for ObserverParams {
    fn default() -> Self {
        Self {
            distance: 11.0,
            orbital_inclination: -10.0,
        }
    }
}

/// Compile-time shader parameters.
///
/// Every field is addressable by a dotted key (see [`ShaderParams::KEYS`]) so
/// a template can reference it as a `{{ key }}` placeholder.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShaderParams {
    /// Raymarch iteration budget per pixel.
    pub n_steps: u32,
    /// Multiplier applied to real elapsed time before it reaches the observer clock.
    pub time_scale: f64,
    pub observer: ObserverParams,
}

impl Default for ShaderParams {
    fn default() -> Self {
        Self {
            n_steps: 100,
            time_scale: 1.0,
            observer: ObserverParams::default(),
        }
    }
}

/// A single parameter value as it appears in generated shader text.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamValue {
    Int(i64),
    Float(f64),
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Int(v) => write!(f, "{v}"),
            // Debug keeps the decimal point ("11.0"), which WGSL needs for an f32 literal.
            ParamValue::Float(v) => write!(f, "{v:?}"),
        }
    }
}

impl ShaderParams {
    /// Every key accepted by [`ShaderParams::lookup`].
    pub const KEYS: [&'static str; 4] = [
        "n_steps",
        "time_scale",
        "observer.distance",
        "observer.orbital_inclination",
    ];

    /// Resolve a dotted parameter key.
    pub fn lookup(&self, key: &str) -> Option<ParamValue> {
        match key {
            "n_steps" => Some(ParamValue::Int(i64::from(self.n_steps))),
            "time_scale" => Some(ParamValue::Float(self.time_scale)),
            "observer.distance" => Some(ParamValue::Float(self.observer.distance)),
            "observer.orbital_inclination" => {
                Some(ParamValue::Float(self.observer.orbital_inclination))
            }
            _ => None,
        }
    }

    /// Whether `key` names a recognized parameter.
    pub fn is_known_key(key: &str) -> bool {
        Self::KEYS.contains(&key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_scene() {
        let p = ShaderParams::default();
        assert_eq!(p.n_steps, 100);
        assert_eq!(p.time_scale, 1.0);
        assert_eq!(p.observer.distance, 11.0);
        assert_eq!(p.observer.orbital_inclination, -10.0);
    }

    #[test]
    fn lookup_resolves_every_key() {
        let p = ShaderParams::default();
        for key in ShaderParams::KEYS {
            assert!(p.lookup(key).is_some(), "missing {key}");
        }
        assert_eq!(p.lookup("observer"), None);
        assert_eq!(p.lookup("n_step"), None);
    }

    #[test]
    fn float_values_render_as_shader_literals() {
        let p = ShaderParams::default();
        assert_eq!(p.lookup("n_steps").unwrap().to_string(), "100");
        assert_eq!(p.lookup("time_scale").unwrap().to_string(), "1.0");
        assert_eq!(p.lookup("observer.distance").unwrap().to_string(), "11.0");
        assert_eq!(
            p.lookup("observer.orbital_inclination").unwrap().to_string(),
            "-10.0"
        );
    }
}
