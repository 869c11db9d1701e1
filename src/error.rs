//! Error type shared by the library and the CLI.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result alias for rescale operations.
pub type Result<T> = std::result::Result<T, RescaleError>;

/// Error type for PDF rescaling operations
#[derive(Error, Debug)]
pub enum RescaleError {
    #[error("Scale factor must be in (0, 1], got {0}")]
    InvalidScale(f32),

    #[error("DPI must be a positive value from the supported set, got {0}")]
    InvalidDpi(u32),

    #[error("Quality must be between 1 and 100")]
    InvalidQuality,

    #[error("Input file not found: {0:?}")]
    InputNotFound(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to load PDF: {0}")]
    Load(String),

    #[error("Document has no pages")]
    EmptyDocument,

    #[error("Failed to render page {page}: {message}")]
    Render { page: usize, message: String },

    #[error("Failed to encode image: {0}")]
    Encode(String),

    #[error("Failed to save PDF: {0}")]
    Save(String),

    #[error("Operation cancelled")]
    Cancelled,
}

impl RescaleError {
    /// True when the run stopped because the user asked it to.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, RescaleError::Cancelled)
    }
}
