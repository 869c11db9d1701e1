//! Page rasterization backed by `hayro`.

use crate::error::{RescaleError, Result};
use hayro::{InterpreterSettings, Pdf, RenderSettings};
use image::{ImageFormat, Rgb, RgbImage, RgbaImage};
use log::debug;
use std::sync::Arc;

/// Loaded input document that can rasterize its pages
pub struct PageRenderer {
    pdf: Pdf,
    interpreter_settings: InterpreterSettings,
}

impl PageRenderer {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let pdf = Pdf::new(Arc::new(bytes.to_vec()))
            .map_err(|e| RescaleError::Load(format!("{:?}", e)))?;

        Ok(Self {
            pdf,
            interpreter_settings: InterpreterSettings::default(),
        })
    }

    pub fn page_count(&self) -> usize {
        self.pdf.pages().len()
    }

    /// Visible page size in points (crop box, rotation applied).
    pub fn page_size(&self, index: usize) -> Result<(f32, f32)> {
        let page = self.pdf.pages().iter().nth(index).ok_or_else(|| RescaleError::Render {
            page: index + 1,
            message: "page index out of range".to_string(),
        })?;
        Ok(page.render_dimensions())
    }

    /// Render a page at `zoom` pixels per point onto a white background.
    pub fn render(&self, index: usize, zoom: f32) -> Result<RgbImage> {
        let page = self.pdf.pages().iter().nth(index).ok_or_else(|| RescaleError::Render {
            page: index + 1,
            message: "page index out of range".to_string(),
        })?;

        let render_settings = RenderSettings {
            x_scale: zoom,
            y_scale: zoom,
            ..Default::default()
        };

        let pixmap = hayro::render(page, &self.interpreter_settings, &render_settings);

        // The pixmap is premultiplied RGBA; going through PNG hands the
        // un-premultiplied pixels to the image crate.
        let png = pixmap.take_png();
        let rgba = image::load_from_memory_with_format(&png, ImageFormat::Png)
            .map_err(|e| RescaleError::Render {
                page: index + 1,
                message: format!("Failed to decode rendered pixmap: {}", e),
            })?
            .to_rgba8();
        let rgb = flatten_on_white(&rgba);

        debug!(
            "Rendered page {} at zoom {:.3}: {}x{} px",
            index + 1,
            zoom,
            rgb.width(),
            rgb.height()
        );

        Ok(rgb)
    }
}

/// Composite RGBA over white paper.
fn flatten_on_white(rgba: &RgbaImage) -> RgbImage {
    let (width, height) = rgba.dimensions();
    RgbImage::from_fn(width, height, |x, y| {
        let [r, g, b, a] = rgba.get_pixel(x, y).0;
        let alpha = a as u32;
        let blend = |c: u8| ((c as u32 * alpha + 255 * (255 - alpha) + 127) / 255) as u8;
        Rgb([blend(r), blend(g), blend(b)])
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn transparent_pixels_become_white() {
        let mut rgba = RgbaImage::from_pixel(2, 1, Rgba([0, 0, 0, 0]));
        rgba.put_pixel(1, 0, Rgba([10, 20, 30, 255]));

        let rgb = flatten_on_white(&rgba);
        assert_eq!(rgb.get_pixel(0, 0), &Rgb([255, 255, 255]));
        assert_eq!(rgb.get_pixel(1, 0), &Rgb([10, 20, 30]));
    }

    #[test]
    fn half_transparent_black_is_mid_grey() {
        let rgba = RgbaImage::from_pixel(1, 1, Rgba([0, 0, 0, 128]));
        let rgb = flatten_on_white(&rgba);
        assert_eq!(rgb.get_pixel(0, 0), &Rgb([127, 127, 127]));
    }
}
