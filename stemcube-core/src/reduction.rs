//! Cropping and combined crop-then-bin plans.

use std::ops::Range;

use ndarray::{Array4, ArrayView4, Slice};

use crate::binning::{AxisPair, BinningFactor};
use crate::error::{Error, Result, ScanAxis};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A rectangular window over one axis pair.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CropWindow {
    /// Kept rows (`y` axis of the pair).
    pub rows: Range<usize>,
    /// Kept columns (`x` axis of the pair).
    pub cols: Range<usize>,
}

impl CropWindow {
    /// Creates a window.
    #[must_use]
    pub fn new(rows: Range<usize>, cols: Range<usize>) -> Self {
        Self { rows, cols }
    }

    /// Shape of the cropped pair.
    #[must_use]
    pub fn shape(&self) -> (usize, usize) {
        (self.rows.len(), self.cols.len())
    }

    /// Checks the window against the current extents of `pair`.
    ///
    /// # Errors
    /// Returns [`Error::CropOutOfBounds`] if a range is reversed or ends past its axis.
    pub fn validate(&self, pair: AxisPair, extents: (usize, usize)) -> Result<()> {
        let (axis_y, axis_x) = match pair {
            AxisPair::Real => (ScanAxis::RealY, ScanAxis::RealX),
            AxisPair::Diffraction => (ScanAxis::DiffractionY, ScanAxis::DiffractionX),
        };
        check_range(axis_y, &self.rows, extents.0)?;
        check_range(axis_x, &self.cols, extents.1)
    }
}

fn check_range(axis: ScanAxis, range: &Range<usize>, extent: usize) -> Result<()> {
    if range.start > range.end || range.end > extent {
        return Err(Error::CropOutOfBounds {
            axis,
            start: range.start,
            end: range.end,
            extent,
        });
    }
    Ok(())
}

/// Copies the window of one axis pair into a new array.
///
/// The window must already have been validated against `data`.
pub fn crop_axis_pair<T: Clone>(data: ArrayView4<'_, T>, pair: AxisPair, window: &CropWindow) -> Array4<T> {
    let (ax_y, ax_x) = pair.indices();
    data.slice_each_axis(|desc| {
        let axis = desc.axis.index();
        if axis == ax_y {
            Slice::from(window.rows.clone())
        } else if axis == ax_x {
            Slice::from(window.cols.clone())
        } else {
            Slice::from(..)
        }
    })
    .to_owned()
}

/// Crop windows and binning factors applied together by
/// [`crate::DataCube::crop_and_bin`].
///
/// Order of application: real-space crop, diffraction crop, diffraction
/// binning, real-space binning.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ReductionPlan {
    /// Real-space window to keep, if any.
    pub crop_real: Option<CropWindow>,
    /// Diffraction-space window to keep, if any.
    pub crop_diffraction: Option<CropWindow>,
    /// Diffraction-space binning factor.
    pub bin_q: BinningFactor,
    /// Real-space binning factor.
    pub bin_r: BinningFactor,
}

impl ReductionPlan {
    /// Creates a plan that does nothing.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the real-space crop window.
    #[must_use]
    pub fn with_crop_real(mut self, rows: Range<usize>, cols: Range<usize>) -> Self {
        self.crop_real = Some(CropWindow::new(rows, cols));
        self
    }

    /// Sets the diffraction-space crop window.
    #[must_use]
    pub fn with_crop_diffraction(mut self, rows: Range<usize>, cols: Range<usize>) -> Self {
        self.crop_diffraction = Some(CropWindow::new(rows, cols));
        self
    }

    /// Sets the diffraction-space binning factor.
    #[must_use]
    pub fn with_bin_q(mut self, factor: BinningFactor) -> Self {
        self.bin_q = factor;
        self
    }

    /// Sets the real-space binning factor.
    #[must_use]
    pub fn with_bin_r(mut self, factor: BinningFactor) -> Self {
        self.bin_r = factor;
        self
    }

    /// Returns true if applying the plan would not change anything.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.crop_real.is_none()
            && self.crop_diffraction.is_none()
            && self.bin_q.is_identity()
            && self.bin_r.is_identity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate() {
        let window = CropWindow::new(1..3, 0..4);
        assert!(window.validate(AxisPair::Real, (3, 4)).is_ok());
        let err = window.validate(AxisPair::Diffraction, (3, 3)).unwrap_err();
        assert!(matches!(
            err,
            Error::CropOutOfBounds {
                axis: ScanAxis::DiffractionX,
                start: 0,
                end: 4,
                extent: 3
            }
        ));
        #[allow(clippy::reversed_empty_ranges)]
        let reversed = CropWindow::new(2..1, 0..1);
        assert!(reversed.validate(AxisPair::Real, (3, 3)).is_err());
    }

    #[test]
    fn test_crop_axis_pair() {
        let data = Array4::from_shape_fn((4, 4, 2, 2), |(ry, rx, _, _)| ry * 10 + rx);
        let window = CropWindow::new(1..3, 2..4);
        let out = crop_axis_pair(data.view(), AxisPair::Real, &window);
        assert_eq!(out.shape(), &[2, 2, 2, 2]);
        assert_eq!(out[[0, 0, 0, 0]], 12);
        assert_eq!(out[[1, 1, 1, 1]], 23);
        assert!(out.is_standard_layout());
    }

    #[test]
    fn test_plan_builder() {
        let plan = ReductionPlan::new()
            .with_crop_diffraction(0..8, 0..8)
            .with_bin_q(BinningFactor::new(2));
        assert!(!plan.is_noop());
        assert_eq!(plan.crop_diffraction.as_ref().map(CropWindow::shape), Some((8, 8)));
        assert!(ReductionPlan::new().is_noop());
    }
}
