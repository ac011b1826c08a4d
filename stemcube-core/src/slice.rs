//! Two-dimensional images derived from a [`DataCube`].

use ndarray::{Array2, ArrayView2};

use crate::datacube::DataCube;
use crate::error::{Error, Result};
use crate::sample::Sample;

/// An image living in diffraction space, such as a mean pattern or a mask.
///
/// Its shape is checked against the diffraction extents of the cube it was
/// derived from.
#[derive(Debug, Clone, PartialEq)]
pub struct DiffractionSlice<T = f64> {
    data: Array2<T>,
}

impl<T> DiffractionSlice<T> {
    /// Wraps `data`, which must have shape `(Q_y, Q_x)` of `parent`.
    ///
    /// # Errors
    /// Returns [`Error::ShapeMismatch`] if the shapes differ.
    pub fn new<U: Sample>(parent: &DataCube<U>, data: Array2<T>) -> Result<Self> {
        let (qy, qx) = parent.diffraction_shape();
        if data.dim() != (qy, qx) {
            return Err(Error::ShapeMismatch {
                expected: vec![qy, qx],
                actual: data.shape().to_vec(),
            });
        }
        Ok(Self { data })
    }

    /// Diffraction extents `(Q_y, Q_x)`.
    #[must_use]
    pub fn shape(&self) -> (usize, usize) {
        self.data.dim()
    }

    /// The image.
    #[must_use]
    pub fn data(&self) -> ArrayView2<'_, T> {
        self.data.view()
    }

    /// Consumes the slice and returns the image.
    #[must_use]
    pub fn into_data(self) -> Array2<T> {
        self.data
    }
}
