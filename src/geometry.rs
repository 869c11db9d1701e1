//! Page geometry: where the shrunk content lands and how finely it is rendered.

/// Points per inch in PDF user space.
pub const POINTS_PER_INCH: f32 = 72.0;

/// Largest raster side, in pixels, the renderer can produce.
pub const MAX_RASTER_SIDE: u32 = u16::MAX as u32;

/// Axis-aligned rectangle in PDF points
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }
}

/// Per-page transform: the centered target rectangle plus render zoom
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageTransform {
    /// Page width in points (identical for input and output)
    pub page_width: f32,
    /// Page height in points
    pub page_height: f32,
    /// Where the raster is placed on the output page
    pub target: Rect,
    /// Rasterizer scale in pixels per point
    pub zoom: f32,
}

impl PageTransform {
    pub fn new(page_width: f32, page_height: f32, scale_factor: f32, dpi: u32) -> Self {
        let scaled_width = page_width * scale_factor;
        let scaled_height = page_height * scale_factor;

        let x_offset = (page_width - scaled_width) / 2.0;
        let y_offset = (page_height - scaled_height) / 2.0;

        Self {
            page_width,
            page_height,
            target: Rect::new(x_offset, y_offset, scaled_width, scaled_height),
            zoom: dpi as f32 * scale_factor / POINTS_PER_INCH,
        }
    }

    /// Pixel size of the raster the renderer produces for this transform.
    ///
    /// Either side may be zero for a tiny page at a low DPI.
    pub fn pixel_size(&self) -> (u32, u32) {
        let width = (self.page_width * self.zoom).floor() as u32;
        let height = (self.page_height * self.zoom).floor() as u32;
        (width, height)
    }

    /// Check the raster fits the renderer: non-empty and at most
    /// [`MAX_RASTER_SIDE`] pixels on either side.
    pub fn check_raster_size(&self) -> Result<(u32, u32), String> {
        let (width, height) = self.pixel_size();
        if width == 0 || height == 0 {
            return Err(format!(
                "{:.1}x{:.1} pt at zoom {:.4} renders to an empty {}x{} px raster; raise the DPI",
                self.page_width, self.page_height, self.zoom, width, height
            ));
        }
        if width > MAX_RASTER_SIDE || height > MAX_RASTER_SIDE {
            return Err(format!(
                "{}x{} px exceeds the {} px raster limit; lower the DPI",
                width, height, MAX_RASTER_SIDE
            ));
        }
        Ok((width, height))
    }
}
