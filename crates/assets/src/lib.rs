//! Scene asset loading.
//!
//! The shader template and the four scene textures load concurrently on
//! background threads. A [`LoadBarrier`] joins them so the scene starts only
//! after every load has completed, whatever order they finish in.
//!
//! # Invariants
//! - A barrier opens exactly once, on its final outstanding completion.
//! - Duplicate or unknown completions never open a barrier.
//! - A failed load is reported as an error, never as a silent stall.

mod barrier;
mod loader;
mod textures;

pub use barrier::{BarrierEvent, LoadBarrier};
pub use loader::{LoadSlot, LoadedScene, SceneLoader, TemplateSource, TextureSet};
pub use textures::{ImageData, Interpolation, TextureKind};

#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode image {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: image::ImageError,
    },
    #[error("loader result did not match slot {0}")]
    Mismatched(String),
    #[error("loader threads exited before every asset arrived")]
    Disconnected,
    #[error("scene was already delivered")]
    AlreadyDelivered,
}

/// Package name and version, for diagnostics.
pub fn crate_info() -> &'static str {
    concat!(env!("CARGO_PKG_NAME"), " v", env!("CARGO_PKG_VERSION"))
}
