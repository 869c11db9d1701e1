//! PDF Print Rescaler Library
//!
//! Shrinks the visible content of every page of a PDF onto a same-size page,
//! centered, leaving a printable margin. Each page is rasterized at a target
//! DPI and embedded as a single image, so the result prints the same on any
//! printer driver.
//!
//! Shared between the CLI and any other front end; long runs go through
//! [`job::RescaleJob`] to get progress events and cooperative cancellation.

pub mod compose;
pub mod error;
pub mod geometry;
pub mod inspect;
pub mod job;
pub mod naming;
pub mod options;
pub mod render;

pub use error::{RescaleError, Result};
pub use geometry::{PageTransform, Rect};
pub use job::{CancelToken, JobEvent, JobHandle, JobStatus, RescaleJob, RescaleRequest};
pub use options::{ImageEncoding, RescaleOptions};

use compose::OutputDocument;
use log::{debug, info};
use render::PageRenderer;

const BYTES_PER_MEGABYTE: f64 = 1024.0 * 1024.0;

/// Progress through the page loop.
///
/// `page` counts completed pages; a report with `page == 0` is sent once the
/// document is open and the total is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageProgress {
    pub page: usize,
    pub total: usize,
}

impl PageProgress {
    pub fn is_start(&self) -> bool {
        self.page == 0
    }
}

/// Result of a rescale run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RescaleSummary {
    pub pages: usize,
    pub input_bytes: u64,
    pub output_bytes: u64,
}

impl RescaleSummary {
    pub fn input_megabytes(&self) -> f64 {
        self.input_bytes as f64 / BYTES_PER_MEGABYTE
    }

    pub fn output_megabytes(&self) -> f64 {
        self.output_bytes as f64 / BYTES_PER_MEGABYTE
    }

    /// "Input: 1.2MB, Output: 3.4MB"
    pub fn size_report(&self) -> String {
        format!(
            "Input: {:.1}MB, Output: {:.1}MB",
            self.input_megabytes(),
            self.output_megabytes()
        )
    }
}

/// Rescale a PDF held in memory and return the new PDF bytes.
///
/// `cancel` is checked before every page; once set, the run stops with
/// [`RescaleError::Cancelled`] and nothing is produced.
pub fn rescale_pdf_bytes<F>(
    input_bytes: &[u8],
    options: &RescaleOptions,
    cancel: &CancelToken,
    mut on_progress: F,
) -> Result<(Vec<u8>, RescaleSummary)>
where
    F: FnMut(PageProgress),
{
    options.validate()?;

    let renderer = PageRenderer::from_bytes(input_bytes)?;
    let total = renderer.page_count();
    if total == 0 {
        return Err(RescaleError::EmptyDocument);
    }

    info!(
        "Rescaling {} pages to {}% at {} DPI",
        total,
        options.scale_percent(),
        options.dpi
    );
    on_progress(PageProgress { page: 0, total });

    let mut output = OutputDocument::new();

    for index in 0..total {
        if cancel.is_cancelled() {
            info!("Cancelled before page {}/{}", index + 1, total);
            return Err(RescaleError::Cancelled);
        }

        let (width, height) = renderer.page_size(index)?;
        let transform = PageTransform::new(width, height, options.scale_factor, options.dpi);
        transform
            .check_raster_size()
            .map_err(|message| RescaleError::Render {
                page: index + 1,
                message,
            })?;
        let raster = renderer.render(index, transform.zoom)?;

        output.add_page(&transform, &raster, options.encoding, options.quality)?;

        debug!(
            "Processed page {}/{}: {:.1}x{:.1} pt, image at ({:.1}, {:.1}) {:.1}x{:.1} pt",
            index + 1,
            total,
            width,
            height,
            transform.target.x,
            transform.target.y,
            transform.target.width,
            transform.target.height
        );
        on_progress(PageProgress {
            page: index + 1,
            total,
        });
    }

    let output_bytes = output.finish(options.compress_streams)?;
    let summary = RescaleSummary {
        pages: total,
        input_bytes: input_bytes.len() as u64,
        output_bytes: output_bytes.len() as u64,
    };

    Ok((output_bytes, summary))
}

pub mod file_ops {
    use super::*;
    use log::warn;
    use std::fs;
    use std::io::Write;
    use std::path::Path;
    use tempfile::NamedTempFile;

    /// Rescale PDF from file path to file path.
    ///
    /// The output is written to a temporary file beside `output_path` and only
    /// moved into place once complete, so a failed or cancelled run leaves
    /// any existing file untouched and creates no partial one.
    pub fn rescale_pdf_file<F>(
        input_path: &Path,
        output_path: &Path,
        options: &RescaleOptions,
        cancel: &CancelToken,
        on_progress: F,
    ) -> Result<RescaleSummary>
    where
        F: FnMut(PageProgress),
    {
        if !input_path.is_file() {
            return Err(RescaleError::InputNotFound(input_path.to_path_buf()));
        }

        let input_bytes = fs::read(input_path)?;
        let (output_bytes, summary) =
            rescale_pdf_bytes(&input_bytes, options, cancel, on_progress).map_err(|e| match e {
                RescaleError::Load(msg) => RescaleError::Load(format!("{:?}: {}", input_path, msg)),
                other => other,
            })?;

        if cancel.is_cancelled() {
            return Err(RescaleError::Cancelled);
        }

        let output_dir = match output_path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };

        let mut temp = NamedTempFile::new_in(output_dir)?;
        temp.write_all(&output_bytes)?;
        temp.flush()?;
        temp.persist(output_path).map_err(|e| {
            warn!("Could not move finished output into place: {}", e.error);
            RescaleError::Save(format!("{:?}: {}", output_path, e.error))
        })?;

        info!("Saved {:?} ({})", output_path, summary.size_report());
        Ok(summary)
    }
}
