//! Error taxonomy for reprojection runs.
//!
//! Only configuration and geometry problems are errors. Per-pixel outcomes
//! (a ray missing the body, a direction that falls outside the actual image,
//! an interpolation footprint leaving the buffer) are classification results
//! and never surface here.

use thiserror::Error;

/// Errors that abort a reprojection run before any pixel work is done.
#[derive(Error, Debug)]
pub enum NoprojError {
    /// No ideal-instrument specification matches the instrument key.
    #[error("no ideal instrument specification for \"{0}\"")]
    UnknownInstrument(String),

    /// Summing or expansion produced an unusable ideal detector geometry.
    #[error("incompatible ideal geometry: {0}")]
    IncompatibleGeometry(String),

    /// The ideal-instrument specification text could not be parsed.
    #[error("specs parse error at line {line}: {message}")]
    SpecsParse {
        /// 1-based line number in the specs text.
        line: usize,
        /// What went wrong.
        message: String,
    },

    /// An option value is out of its allowed domain.
    #[error("invalid option: {0}")]
    InvalidOption(String),

    /// A point query fell outside the image.
    #[error("pixel ({sample:.3}, {line:.3}) is outside the image")]
    PixelOutOfRange {
        /// Requested sample.
        sample: f64,
        /// Requested line.
        line: f64,
    },
}

pub type Result<T> = std::result::Result<T, NoprojError>;
