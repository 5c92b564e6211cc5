use crate::AssetError;
use std::fmt;
use std::path::Path;

/// Sampling filter a texture is created with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Interpolation {
    Nearest,
    Linear,
}

/// The named images the scene shader samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TextureKind {
    Galaxy,
    Spectra,
    Moon,
    Stars,
}

impl TextureKind {
    pub const ALL: [TextureKind; 4] = [
        TextureKind::Galaxy,
        TextureKind::Spectra,
        TextureKind::Moon,
        TextureKind::Stars,
    ];

    pub fn name(self) -> &'static str {
        match self {
            TextureKind::Galaxy => "galaxy",
            TextureKind::Spectra => "spectra",
            TextureKind::Moon => "moon",
            TextureKind::Stars => "stars",
        }
    }

    /// Path relative to the asset root.
    pub fn file_name(self) -> &'static str {
        match self {
            TextureKind::Galaxy => "img/milkyway.jpg",
            TextureKind::Spectra => "img/spectra.png",
            TextureKind::Moon => "img/beach-ball.png",
            TextureKind::Stars => "img/stars.png",
        }
    }

    pub fn interpolation(self) -> Interpolation {
        match self {
            // The galaxy panorama is sampled per texel to keep stars sharp.
            TextureKind::Galaxy => Interpolation::Nearest,
            TextureKind::Spectra | TextureKind::Moon | TextureKind::Stars => Interpolation::Linear,
        }
    }
}

impl fmt::Display for TextureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Decoded RGBA8 pixels.
#[derive(Clone, PartialEq, Eq)]
pub struct ImageData {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl fmt::Debug for ImageData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageData")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.rgba.len())
            .finish()
    }
}

impl ImageData {
    /// Decode an image file into RGBA8.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, AssetError> {
        let path = path.as_ref();
        let img = image::open(path).map_err(|source| AssetError::Decode {
            path: path.display().to_string(),
            source,
        })?;
        let rgba = img.to_rgba8();
        let (width, height) = rgba.dimensions();
        Ok(Self {
            width,
            height,
            rgba: rgba.into_raw(),
        })
    }

    pub fn bytes_per_row(&self) -> u32 {
        4 * self.width
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_matches_scene() {
        assert_eq!(TextureKind::ALL.len(), 4);
        assert_eq!(TextureKind::Galaxy.file_name(), "img/milkyway.jpg");
        assert_eq!(TextureKind::Moon.file_name(), "img/beach-ball.png");
        assert_eq!(TextureKind::Galaxy.interpolation(), Interpolation::Nearest);
        assert_eq!(TextureKind::Stars.interpolation(), Interpolation::Linear);
        assert_eq!(TextureKind::Spectra.to_string(), "spectra");
    }

    #[test]
    fn load_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tex.png");
        image::RgbaImage::from_pixel(3, 2, image::Rgba([10, 20, 30, 255]))
            .save(&path)
            .unwrap();

        let data = ImageData::load(&path).unwrap();
        assert_eq!((data.width, data.height), (3, 2));
        assert_eq!(data.rgba.len(), 3 * 2 * 4);
        assert_eq!(&data.rgba[..4], &[10, 20, 30, 255]);
        assert_eq!(data.bytes_per_row(), 12);
    }

    #[test]
    fn load_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = ImageData::load(dir.path().join("nope.png")).unwrap_err();
        assert!(matches!(err, AssetError::Decode { .. }));
    }
}
