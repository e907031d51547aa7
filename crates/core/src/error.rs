//! Error types for tidewatch

use thiserror::Error;

/// Main error type for tidewatch operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid raster dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    #[error("Index out of bounds: ({row}, {col}) in raster of size ({rows}, {cols})")]
    IndexOutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    #[error("Field size mismatch: expected ({er}, {ec}), got ({ar}, {ac})")]
    SizeMismatch { er: usize, ec: usize, ar: usize, ac: usize },

    #[error("Unsupported data type: {0}")]
    UnsupportedDataType(String),

    #[error("Invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },

    /// Not enough usable sensor points to define an interpolated field.
    #[error("Insufficient data: {available} usable points, at least {required} required")]
    InsufficientData { required: usize, available: usize },

    /// The covariance system could not be solved to a trustworthy result.
    #[error("Ill-conditioned system: {0}")]
    IllConditionedSystem(String),

    /// Terrain raster cannot be brought onto the requested grid shape.
    #[error("Grid mismatch: cannot resample {source_rows}x{source_cols} raster to {target_rows}x{target_cols} ({reason})")]
    GridMismatch {
        source_rows: usize,
        source_cols: usize,
        target_rows: usize,
        target_cols: usize,
        reason: String,
    },

    #[error("TIFF error: {0}")]
    Tiff(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether the caller can reasonably retry with different inputs
    /// (e.g. a wider time window) rather than treating this as a fault.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::InsufficientData { .. })
    }

    /// Shorthand for an [`Error::InvalidParameter`] built from any displayable value.
    pub fn invalid_parameter(
        name: &'static str,
        value: impl std::fmt::Display,
        reason: impl Into<String>,
    ) -> Self {
        Error::InvalidParameter {
            name,
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type alias for tidewatch operations
pub type Result<T> = std::result::Result<T, Error>;
