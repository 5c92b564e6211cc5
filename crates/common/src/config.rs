use crate::types::ShaderParams;
use std::path::Path;

/// Errors from loading or encoding parameter files.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid parameter: {0}")]
    Invalid(String),
}

impl ShaderParams {
    /// Parse parameters from YAML. Missing fields keep their defaults.
    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        let params: Self = serde_yaml::from_str(text)?;
        params.validate()?;
        Ok(params)
    }

    /// Check that every value can be written into shader source and keeps
    /// the observer clock moving forward.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.n_steps == 0 || self.n_steps > i32::MAX as u32 {
            return Err(ConfigError::Invalid(format!(
                "n_steps must be in 1..={}, got {}",
                i32::MAX,
                self.n_steps
            )));
        }
        let floats = [
            ("time_scale", self.time_scale),
            ("observer.distance", self.observer.distance),
            ("observer.orbital_inclination", self.observer.orbital_inclination),
        ];
        for (key, value) in floats {
            if !value.is_finite() {
                return Err(ConfigError::Invalid(format!("{key} must be finite, got {value}")));
            }
        }
        if self.time_scale < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "time_scale must not be negative, got {}",
                self.time_scale
            )));
        }
        if self.observer.distance <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "observer.distance must be positive, got {}",
                self.observer.distance
            )));
        }
        Ok(())
    }

    /// Load a YAML parameter file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }

    /// Save parameters as YAML.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let file = std::fs::File::create(path)?;
        serde_yaml::to_writer(file, self)?;
        Ok(())
    }

    pub fn to_json_pretty(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
