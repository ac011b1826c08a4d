//! Summation binning over a pair of axes.
#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss
)]

use std::fmt;

use ndarray::{Array4, ArrayView4, Slice};

use crate::error::{Error, Result};
use crate::sample::Sample;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Which pair of axes of a 4D scan an operation applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisPair {
    /// `(R_y, R_x)`, axes 0 and 1.
    Real,
    /// `(Q_y, Q_x)`, axes 2 and 3.
    Diffraction,
}

impl AxisPair {
    /// Array axis indices of the pair.
    #[must_use]
    pub fn indices(self) -> (usize, usize) {
        match self {
            AxisPair::Real => (0, 1),
            AxisPair::Diffraction => (2, 3),
        }
    }
}

/// A validated integer binning factor.
///
/// Factors of 0 and 1 both mean "leave the data alone".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "f64"))]
pub struct BinningFactor(usize);

impl BinningFactor {
    /// The factor that leaves data unchanged.
    pub const IDENTITY: BinningFactor = BinningFactor(1);

    /// Creates a factor; 0 is normalized to 1.
    #[must_use]
    pub fn new(factor: usize) -> Self {
        Self(factor.max(1))
    }

    /// Returns the factor.
    #[must_use]
    pub fn get(self) -> usize {
        self.0
    }

    /// Returns true if binning by this factor is a no-op.
    #[must_use]
    pub fn is_identity(self) -> bool {
        self.0 <= 1
    }
}

impl Default for BinningFactor {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl From<usize> for BinningFactor {
    fn from(factor: usize) -> Self {
        Self::new(factor)
    }
}

impl TryFrom<f64> for BinningFactor {
    type Error = Error;

    /// Values at or below 1 (including negatives) become the identity;
    /// anything else must be a whole number.
    fn try_from(value: f64) -> Result<Self> {
        if value <= 1.0 {
            return Ok(Self::IDENTITY);
        }
        if !value.is_finite() || value.fract() != 0.0 {
            return Err(Error::InvalidBinningFactor(value));
        }
        Ok(Self(value as usize))
    }
}

impl fmt::Display for BinningFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Bins a 4D array along one axis pair by summing `factor x factor` blocks.
///
/// Trailing rows and columns that do not fill a whole bin are dropped. The
/// other axis pair is copied through unchanged.
///
/// # Errors
/// Returns [`Error::IntensityOverflow`] if a bin sum does not fit in `T`.
pub fn bin_axis_pair<T: Sample>(
    data: ArrayView4<'_, T>,
    pair: AxisPair,
    factor: usize,
) -> Result<Array4<T>> {
    if factor <= 1 {
        return Ok(data.to_owned());
    }

    let (ax_y, ax_x) = pair.indices();
    let shape = data.shape();
    let binned_y = shape[ax_y] / factor;
    let binned_x = shape[ax_x] / factor;

    let mut out_shape = [shape[0], shape[1], shape[2], shape[3]];
    out_shape[ax_y] = binned_y;
    out_shape[ax_x] = binned_x;
    let mut out = Array4::<T>::zeros(out_shape);
    if out.is_empty() {
        return Ok(out);
    }

    let end_y = (binned_y * factor) as isize;
    let end_x = (binned_x * factor) as isize;
    let step = factor as isize;

    let mut overflowed = false;
    // Each (dy, dx) offset picks one sample out of every bin.
    for dy in 0..factor {
        for dx in 0..factor {
            let samples = data.slice_each_axis(|desc| {
                let axis = desc.axis.index();
                if axis == ax_y {
                    Slice::new(dy as isize, Some(end_y), step)
                } else if axis == ax_x {
                    Slice::new(dx as isize, Some(end_x), step)
                } else {
                    Slice::from(..)
                }
            });
            out.zip_mut_with(&samples, |acc, &v| match acc.checked_accumulate(v) {
                Some(sum) => *acc = sum,
                None => overflowed = true,
            });
            if overflowed {
                return Err(Error::IntensityOverflow);
            }
        }
    }
    Ok(out)
}
