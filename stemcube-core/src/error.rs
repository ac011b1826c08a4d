//! Error types for stemcube-core.

use thiserror::Error;

/// Result type alias for stemcube operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for stemcube operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Element count or 2D shape does not agree with the requested shape.
    #[error("shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    /// Binning factor is not an integer.
    #[error("invalid binning factor: {0} is not an integer")]
    InvalidBinningFactor(f64),

    /// A sum of samples does not fit in the cube's element type.
    #[error("intensity overflow: summed samples exceed the element type's range")]
    IntensityOverflow,

    /// Metadata tree nests deeper than the search is allowed to follow.
    #[error("malformed metadata: nesting depth {depth} exceeds limit of {limit}")]
    MalformedMetadata { depth: usize, limit: usize },

    /// Crop window reaches past the current extent of an axis.
    #[error("crop window {start}..{end} out of bounds for {axis} axis of extent {extent}")]
    CropOutOfBounds {
        axis: ScanAxis,
        start: usize,
        end: usize,
        extent: usize,
    },

    /// Array layout error reported by ndarray.
    #[error("array shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),
}

/// Logical axes of a 4D scan, used for error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanAxis {
    /// Real-space rows (`R_y`).
    RealY,
    /// Real-space columns (`R_x`).
    RealX,
    /// Diffraction-space rows (`Q_y`).
    DiffractionY,
    /// Diffraction-space columns (`Q_x`).
    DiffractionX,
}

impl std::fmt::Display for ScanAxis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ScanAxis::RealY => "R_y",
            ScanAxis::RealX => "R_x",
            ScanAxis::DiffractionY => "Q_y",
            ScanAxis::DiffractionX => "Q_x",
        };
        f.write_str(name)
    }
}
