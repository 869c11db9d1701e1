//! Rescale configuration and the front-end presets it is built from.

use crate::error::{RescaleError, Result};

/// Lowest scale percentage offered by the front end.
pub const MIN_SCALE_PERCENT: u8 = 50;
/// Highest scale percentage offered by the front end.
pub const MAX_SCALE_PERCENT: u8 = 100;
pub const DEFAULT_SCALE_PERCENT: u8 = 90;

/// Rasterization resolutions offered by the front end.
pub const DPI_CHOICES: [u32; 5] = [150, 200, 300, 400, 600];
pub const DEFAULT_DPI: u32 = 300;

pub const DEFAULT_JPEG_QUALITY: u8 = 85;

/// How the rendered page raster is stored in the output PDF
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageEncoding {
    /// Lossless DeviceRGB compressed with FlateDecode
    #[default]
    Flate,
    /// Lossy DCTDecode, sized by `RescaleOptions::quality`
    Jpeg,
}

/// Options for PDF rescaling
#[derive(Debug, Clone)]
pub struct RescaleOptions {
    /// Fraction of the page the content is shrunk to, in (0, 1]
    pub scale_factor: f32,
    /// Resolution the content is rasterized at
    pub dpi: u32,
    /// Image stream encoding
    pub encoding: ImageEncoding,
    /// JPEG quality (1-100, only used with `ImageEncoding::Jpeg`)
    pub quality: u8,
    /// Compress PDF streams (reduces file size)
    pub compress_streams: bool,
}

impl Default for RescaleOptions {
    fn default() -> Self {
        Self {
            scale_factor: DEFAULT_SCALE_PERCENT as f32 / 100.0,
            dpi: DEFAULT_DPI,
            encoding: ImageEncoding::Flate,
            quality: DEFAULT_JPEG_QUALITY,
            compress_streams: true,
        }
    }
}

impl RescaleOptions {
    /// Build options from the front-end controls: a percentage slider and a
    /// DPI picked from [`DPI_CHOICES`].
    pub fn from_percent(percent: u8, dpi: u32) -> Result<Self> {
        if !(MIN_SCALE_PERCENT..=MAX_SCALE_PERCENT).contains(&percent) {
            return Err(RescaleError::InvalidScale(percent as f32 / 100.0));
        }
        if !DPI_CHOICES.contains(&dpi) {
            return Err(RescaleError::InvalidDpi(dpi));
        }

        Ok(Self {
            scale_factor: percent as f32 / 100.0,
            dpi,
            ..Self::default()
        })
    }

    pub fn with_encoding(mut self, encoding: ImageEncoding, quality: u8) -> Self {
        self.encoding = encoding;
        self.quality = quality;
        self
    }

    pub fn with_compression(mut self, compress_streams: bool) -> Self {
        self.compress_streams = compress_streams;
        self
    }

    /// Check the invariants every run relies on.
    pub fn validate(&self) -> Result<()> {
        if !self.scale_factor.is_finite() || self.scale_factor <= 0.0 || self.scale_factor > 1.0 {
            return Err(RescaleError::InvalidScale(self.scale_factor));
        }
        if self.dpi == 0 {
            return Err(RescaleError::InvalidDpi(self.dpi));
        }
        if self.quality == 0 || self.quality > 100 {
            return Err(RescaleError::InvalidQuality);
        }
        Ok(())
    }

    /// Scale as a whole percentage, for display.
    pub fn scale_percent(&self) -> u32 {
        (self.scale_factor * 100.0).round() as u32
    }
}
