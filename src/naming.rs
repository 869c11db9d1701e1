//! Output file naming.

use chrono::{Local, NaiveDateTime};
use std::path::{Path, PathBuf};

const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// `<dir>/<stem>_print_<YYYYMMDD_HHMMSS>.pdf`, next to the input.
pub fn default_output_path(input: &Path, timestamp: NaiveDateTime) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "document".to_string());

    input.with_file_name(format!(
        "{}_print_{}.pdf",
        stem,
        timestamp.format(TIMESTAMP_FORMAT)
    ))
}

/// [`default_output_path`] stamped with the local time.
pub fn timestamped_output_path(input: &Path) -> PathBuf {
    default_output_path(input, Local::now().naive_local())
}
