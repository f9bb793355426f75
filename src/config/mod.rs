//! Run configuration for a recoloring batch.
//!
//! [`InversionConfig`] is immutable once constructed; a single instance
//! governs an entire batch. [`SerializedConfig`] is its flat, versioned byte
//! encoding, built once per batch and handed by value into each worker
//! invocation so nothing is shared across the process boundary.

use crate::color::{self, Rgb};
use crate::common::error::{Error, Result};

/// Default lossy encoding quality for re-encoded images.
pub const DEFAULT_IMAGE_QUALITY: u8 = 85;

/// Configuration for one recoloring batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InversionConfig {
    /// Replacement color for the scheme's dark role.
    pub background_color: Rgb,
    /// Replacement color for the scheme's light role.
    pub foreground_color: Rgb,
    /// Whether embedded raster images are remapped at all.
    pub invert_images: bool,
    /// Lossy encoding quality, 1..=100.
    pub image_quality: u8,
}

impl Default for InversionConfig {
    /// White-on-black scheme, image remapping on, quality 85.
    fn default() -> Self {
        Self {
            background_color: Rgb::BLACK,
            foreground_color: Rgb::WHITE,
            invert_images: true,
            image_quality: DEFAULT_IMAGE_QUALITY,
        }
    }
}

impl InversionConfig {
    /// Create a config with the given color pair and default switches.
    pub fn new(background_color: Rgb, foreground_color: Rgb) -> Self {
        Self {
            background_color,
            foreground_color,
            ..Self::default()
        }
    }

    /// Create a config from hex color literals.
    pub fn from_hex(background: &str, foreground: &str) -> Result<Self> {
        Ok(Self::new(
            Rgb::from_hex(background)?,
            Rgb::from_hex(foreground)?,
        ))
    }

    /// Set whether embedded images are remapped.
    pub fn with_invert_images(mut self, invert_images: bool) -> Self {
        self.invert_images = invert_images;
        self
    }

    /// Set the lossy encoding quality.
    pub fn with_image_quality(mut self, image_quality: u8) -> Self {
        self.image_quality = image_quality;
        self
    }

    /// Check the config is usable at all.
    ///
    /// A failure here is fatal to the whole call; the orchestrator rejects
    /// the batch before scheduling anything.
    pub fn validate(&self) -> Result<()> {
        if self.image_quality == 0 || self.image_quality > 100 {
            return Err(Error::Config(format!(
                "image quality {} is outside 1..=100",
                self.image_quality
            )));
        }
        Ok(())
    }

    /// Advisory contrast warnings for the configured pair. Never fails.
    pub fn contrast_warnings(&self) -> Vec<String> {
        color::validate_contrast(self.foreground_color, self.background_color)
    }

    /// The configured color with the higher relative luminance.
    ///
    /// Light content maps toward this endpoint. A luminance tie resolves to
    /// the foreground color, deterministically.
    pub fn light_target(&self) -> Rgb {
        if self.foreground_color.relative_luminance() >= self.background_color.relative_luminance()
        {
            self.foreground_color
        } else {
            self.background_color
        }
    }

    /// The configured color [`Self::light_target`] did not pick.
    pub fn dark_target(&self) -> Rgb {
        if self.light_target() == self.foreground_color {
            self.background_color
        } else {
            self.foreground_color
        }
    }

    /// Encode into the flat worker-boundary form.
    pub fn serialize(&self) -> SerializedConfig {
        SerializedConfig::encode(self)
    }
}

/// Flat, ordered, versioned encoding of [`InversionConfig`].
///
/// Fixed layout, all single-byte fields:
/// `[version, bg.r, bg.g, bg.b, fg.r, fg.g, fg.b, invert_images, quality]`.
/// Round-trips losslessly; decoding validates the version tag, the boolean
/// byte and the quality range so a worker never runs with a config it could
/// not have been handed legitimately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SerializedConfig {
    bytes: [u8; Self::LEN],
}

impl SerializedConfig {
    /// Current layout version.
    pub const VERSION: u8 = 1;
    /// Encoded length in bytes.
    pub const LEN: usize = 9;

    /// Encode a config.
    pub fn encode(config: &InversionConfig) -> Self {
        Self {
            bytes: [
                Self::VERSION,
                config.background_color.r,
                config.background_color.g,
                config.background_color.b,
                config.foreground_color.r,
                config.foreground_color.g,
                config.foreground_color.b,
                config.invert_images as u8,
                config.image_quality,
            ],
        }
    }

    /// The raw encoded bytes.
    #[inline]
    pub fn as_bytes(&self) -> &[u8; Self::LEN] {
        &self.bytes
    }

    /// Reconstruct from raw bytes received over a worker boundary.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let bytes: [u8; Self::LEN] = bytes.try_into().map_err(|_| {
            Error::Config(format!(
                "serialized configuration must be {} bytes, got {}",
                Self::LEN,
                bytes.len()
            ))
        })?;
        if bytes[0] != Self::VERSION {
            return Err(Error::Config(format!(
                "unsupported serialized configuration version {}",
                bytes[0]
            )));
        }
        Ok(Self { bytes })
    }

    /// Decode back into an [`InversionConfig`].
    pub fn decode(&self) -> Result<InversionConfig> {
        let b = &self.bytes;
        let invert_images = match b[7] {
            0 => false,
            1 => true,
            other => {
                return Err(Error::Config(format!(
                    "invalid boolean byte {other} in serialized configuration"
                )));
            },
        };
        let config = InversionConfig {
            background_color: Rgb::new(b[1], b[2], b[3]),
            foreground_color: Rgb::new(b[4], b[5], b[6]),
            invert_images,
            image_quality: b[8],
        };
        config.validate()?;
        Ok(config)
    }
}
