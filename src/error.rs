//! Error types for gridprop.
//!
//! Every failure is raised at the point of detection and propagated with `?`.
//! Masked interpolation results are not errors; they are replaced with the
//! property's fill value.

use thiserror::Error;

/// The main error type for gridprop operations.
#[derive(Error, Debug)]
pub enum GridPropError {
    /// Missing or incompatible grid/data/time/depth at build time
    #[error("Construction error: {message}")]
    Construction { message: String },

    /// Data does not fit the grid, or data length does not fit the time axis
    #[error("Shape mismatch: {message}")]
    ShapeMismatch { message: String },

    /// Query time outside the time axis without extrapolation
    #[error("Time {time} is outside the range {min_time} to {max_time}")]
    OutOfRange {
        time: String,
        min_time: String,
        max_time: String,
    },

    /// No default variable name matched a source
    #[error("Unresolved variable: {message}")]
    UnresolvedVariable { message: String },

    /// Unsupported data rank
    #[error("Dimension error: {message}")]
    Dimension { message: String },

    /// Unknown units or units of different kinds
    #[error("Unit conversion error: {message}")]
    Units { message: String },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// NetCDF file operation errors
    #[cfg(feature = "netcdf")]
    #[error("NetCDF error: {0}")]
    NetCdf(#[from] netcdf::Error),

    /// ndarray shape errors
    #[error("Array shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl GridPropError {
    pub(crate) fn construction(message: impl Into<String>) -> Self {
        Self::Construction {
            message: message.into(),
        }
    }

    pub(crate) fn shape_mismatch(message: impl Into<String>) -> Self {
        Self::ShapeMismatch {
            message: message.into(),
        }
    }

    pub(crate) fn dimension(message: impl Into<String>) -> Self {
        Self::Dimension {
            message: message.into(),
        }
    }
}

/// Convenience type alias for Results with GridPropError
pub type Result<T> = std::result::Result<T, GridPropError>;
