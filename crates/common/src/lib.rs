//! Shared types for the lensing visualizer: the shader parameter record and
//! its on-disk configuration format.

mod config;
mod types;

pub use config::ConfigError;
pub use types::{ObserverParams, ParamValue, ShaderParams};
