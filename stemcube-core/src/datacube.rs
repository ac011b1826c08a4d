//! The 4D scan container.
//!
//! A [`DataCube`] owns an array indexed `[R_y, R_x, Q_y, Q_x]`: one
//! diffraction pattern of `Q_y x Q_x` pixels for every probe position of an
//! `R_y x R_x` scan. Extents are always read from the array itself, so they
//! cannot disagree with the data.
//!
//! Mutations (reshape, crop, bin) either complete or leave the cube untouched.

use std::ops::Range;
use std::path::{Path, PathBuf};

use ndarray::{s, Array, Array2, Array4, ArrayView2, ArrayView4, Dimension};

use crate::binning::{bin_axis_pair, AxisPair};
use crate::error::{Error, Result};
use crate::metadata::{MetadataRecord, MetadataSchema, OriginalMetadata};
use crate::reduction::{crop_axis_pair, CropWindow, ReductionPlan};
use crate::sample::Sample;

/// A 4D-STEM dataset with its resolved metadata.
#[derive(Debug, Clone)]
pub struct DataCube<T = f64> {
    data: Array4<T>,
    metadata: MetadataRecord,
    filename: Option<PathBuf>,
}

impl<T: Sample> DataCube<T> {
    /// Builds a cube and resolves its metadata with the built-in schema.
    ///
    /// `data` may have any dimensionality as long as it holds exactly
    /// `R_y * R_x * Q_y * Q_x` elements; readers commonly produce
    /// `(R_y * R_x, Q_y, Q_x)`.
    ///
    /// # Errors
    /// Returns [`Error::ShapeMismatch`] if the element count does not match the
    /// declared extents, or [`Error::MalformedMetadata`] if a metadata tree is
    /// nested too deeply.
    pub fn new<D: Dimension>(
        data: Array<T, D>,
        scan_shape: (usize, usize),
        diffraction_shape: (usize, usize),
        original: OriginalMetadata,
    ) -> Result<Self> {
        Self::with_schema(data, scan_shape, diffraction_shape, original, &MetadataSchema::default())
    }

    /// Same as [`DataCube::new`] with a caller-supplied schema.
    ///
    /// # Errors
    /// See [`DataCube::new`].
    pub fn with_schema<D: Dimension>(
        data: Array<T, D>,
        scan_shape: (usize, usize),
        diffraction_shape: (usize, usize),
        original: OriginalMetadata,
        schema: &MetadataSchema,
    ) -> Result<Self> {
        let (ry, rx) = scan_shape;
        let (qy, qx) = diffraction_shape;
        let expected = [ry, rx, qy, qx];
        if !element_count_matches(&expected, data.len()) {
            return Err(Error::ShapeMismatch {
                expected: expected.to_vec(),
                actual: data.shape().to_vec(),
            });
        }

        let data = if data.is_standard_layout() {
            data
        } else {
            data.as_standard_layout().into_owned()
        };
        let data = data.into_shape_with_order((ry, rx, qy, qx))?;
        let metadata = MetadataRecord::resolve(original, schema)?;

        log::debug!("created datacube with shape {:?}", data.shape());
        Ok(Self {
            data,
            metadata,
            filename: None,
        })
    }

    /// Records the path the data was read from.
    #[must_use]
    pub fn with_filename(mut self, path: impl Into<PathBuf>) -> Self {
        self.filename = Some(path.into());
        self
    }

    /// Path the data was read from, if known.
    #[must_use]
    pub fn filename(&self) -> Option<&Path> {
        self.filename.as_deref()
    }

    /// The underlying 4D array.
    #[must_use]
    pub fn data(&self) -> ArrayView4<'_, T> {
        self.data.view()
    }

    /// Consumes the cube and returns its array.
    #[must_use]
    pub fn into_data(self) -> Array4<T> {
        self.data
    }

    /// Real-space extents `(R_y, R_x)`.
    #[must_use]
    pub fn scan_shape(&self) -> (usize, usize) {
        let (ry, rx, _, _) = self.data.dim();
        (ry, rx)
    }

    /// Diffraction-space extents `(Q_y, Q_x)`.
    #[must_use]
    pub fn diffraction_shape(&self) -> (usize, usize) {
        let (_, _, qy, qx) = self.data.dim();
        (qy, qx)
    }

    /// Number of probe positions, `R_y * R_x`.
    #[must_use]
    pub fn total_scan_positions(&self) -> usize {
        let (ry, rx) = self.scan_shape();
        ry * rx
    }

    /// Resolved metadata.
    #[must_use]
    pub fn metadata(&self) -> &MetadataRecord {
        &self.metadata
    }

    /// Resolved metadata, for manual edits.
    pub fn metadata_mut(&mut self) -> &mut MetadataRecord {
        &mut self.metadata
    }

    /// Sum of every sample in the cube, accumulated in `f64`.
    #[must_use]
    pub fn total_intensity(&self) -> f64 {
        self.data.iter().map(|&v| v.to_f64()).sum()
    }

    /// Reinterprets the scan as `(ry, rx)` positions.
    ///
    /// # Errors
    /// Returns [`Error::ShapeMismatch`] if `ry * rx` differs from the current
    /// number of scan positions. The cube is left unchanged.
    pub fn try_set_scan_shape(&mut self, ry: usize, rx: usize) -> Result<()> {
        let (qy, qx) = self.diffraction_shape();
        let target = [ry, rx, qy, qx];
        if !element_count_matches(&target, self.data.len()) {
            return Err(Error::ShapeMismatch {
                expected: target.to_vec(),
                actual: self.data.shape().to_vec(),
            });
        }
        // Validate on a view first so the owned conversion below cannot fail
        // after the array has been moved out.
        self.data.view().into_shape_with_order((ry, rx, qy, qx))?;
        let data = std::mem::replace(&mut self.data, Array4::zeros((0, 0, 0, 0)));
        self.data = data.into_shape_with_order((ry, rx, qy, qx))?;
        Ok(())
    }

    /// Lenient form of [`DataCube::try_set_scan_shape`].
    ///
    /// An incompatible shape is logged and ignored. Returns whether the new
    /// shape was applied.
    pub fn set_scan_shape(&mut self, ry: usize, rx: usize) -> bool {
        match self.try_set_scan_shape(ry, rx) {
            Ok(()) => true,
            Err(err) => {
                log::warn!("ignoring scan shape ({ry}, {rx}): {err}");
                false
            }
        }
    }

    /// The diffraction pattern recorded at scan position `(y, x)`.
    ///
    /// The view is transposed so that rows run along `Q_x` and columns along
    /// `Q_y`, matching [`DataCube::real_space_view_over`]. Returns `None`
    /// for positions outside the scan.
    #[must_use]
    pub fn diffraction_view_at(&self, y: usize, x: usize) -> Option<ArrayView2<'_, T>> {
        let (ry, rx) = self.scan_shape();
        if y >= ry || x >= rx {
            return None;
        }
        Some(self.data.slice(s![y, x, .., ..]).reversed_axes())
    }

    /// Real-space image integrated over a diffraction-space region.
    ///
    /// Ranges are clamped to the diffraction extents; an empty region gives
    /// an all-zero image. Pixels are accumulated in `f64` like
    /// [`DataCube::total_intensity`]. The result is transposed like
    /// [`DataCube::diffraction_view_at`], so it has shape `(R_x, R_y)`.
    #[must_use]
    pub fn real_space_view_over(&self, rows: Range<usize>, cols: Range<usize>) -> Array2<f64> {
        let (qy, qx) = self.diffraction_shape();
        let region = self.data.slice(s![.., .., clamp(rows, qy), clamp(cols, qx)]);
        let image = Array2::from_shape_fn(self.scan_shape(), |(y, x)| {
            region
                .slice(s![y, x, .., ..])
                .iter()
                .map(|&v| v.to_f64())
                .sum::<f64>()
        });
        image.reversed_axes()
    }

    /// Sums `factor x factor` blocks of diffraction pixels.
    ///
    /// Factors of 0 or 1 do nothing. Trailing rows/columns that do not fill a
    /// bin are discarded.
    ///
    /// # Errors
    /// Returns [`Error::IntensityOverflow`] if a bin sum does not fit in `T`.
    /// The cube is left unchanged.
    pub fn bin_diffraction(&mut self, factor: usize) -> Result<()> {
        self.bin(AxisPair::Diffraction, factor)
    }

    /// Sums `factor x factor` blocks of scan positions.
    ///
    /// Factors of 0 or 1 do nothing. Trailing rows/columns that do not fill a
    /// bin are discarded.
    ///
    /// # Errors
    /// Returns [`Error::IntensityOverflow`] if a bin sum does not fit in `T`.
    /// The cube is left unchanged.
    pub fn bin_real(&mut self, factor: usize) -> Result<()> {
        self.bin(AxisPair::Real, factor)
    }

    fn bin(&mut self, pair: AxisPair, factor: usize) -> Result<()> {
        if factor <= 1 {
            return Ok(());
        }
        let before = self.data.dim();
        self.data = bin_axis_pair(self.data.view(), pair, factor)?;
        log::debug!(
            "binned {pair:?} axes by {factor}: {before:?} -> {:?}",
            self.data.dim()
        );
        Ok(())
    }

    /// Keeps only a window of scan positions.
    ///
    /// # Errors
    /// Returns [`Error::CropOutOfBounds`] if the window exceeds the scan.
    pub fn crop_real(&mut self, rows: Range<usize>, cols: Range<usize>) -> Result<()> {
        self.crop(AxisPair::Real, &CropWindow::new(rows, cols))
    }

    /// Keeps only a window of diffraction pixels.
    ///
    /// # Errors
    /// Returns [`Error::CropOutOfBounds`] if the window exceeds the patterns.
    pub fn crop_diffraction(&mut self, rows: Range<usize>, cols: Range<usize>) -> Result<()> {
        self.crop(AxisPair::Diffraction, &CropWindow::new(rows, cols))
    }

    fn crop(&mut self, pair: AxisPair, window: &CropWindow) -> Result<()> {
        window.validate(pair, self.extents(pair))?;
        self.data = crop_axis_pair(self.data.view(), pair, window);
        Ok(())
    }

    /// Applies a [`ReductionPlan`].
    ///
    /// Steps run on a working copy, so the cube is only replaced once every
    /// step has succeeded.
    ///
    /// # Errors
    /// Returns [`Error::CropOutOfBounds`] if either window exceeds its extents,
    /// or [`Error::IntensityOverflow`] if binning overflows `T`.
    pub fn crop_and_bin(&mut self, plan: &ReductionPlan) -> Result<()> {
        if let Some(window) = &plan.crop_real {
            window.validate(AxisPair::Real, self.scan_shape())?;
        }
        if let Some(window) = &plan.crop_diffraction {
            window.validate(AxisPair::Diffraction, self.diffraction_shape())?;
        }

        let mut work: Option<Array4<T>> = None;
        let crops = [
            (AxisPair::Real, plan.crop_real.as_ref()),
            (AxisPair::Diffraction, plan.crop_diffraction.as_ref()),
        ];
        for (pair, window) in crops {
            if let Some(window) = window {
                let next = crop_axis_pair(current(&self.data, work.as_ref()), pair, window);
                work = Some(next);
            }
        }
        for (pair, factor) in [(AxisPair::Diffraction, plan.bin_q), (AxisPair::Real, plan.bin_r)] {
            if !factor.is_identity() {
                let next = bin_axis_pair(current(&self.data, work.as_ref()), pair, factor.get())?;
                work = Some(next);
            }
        }

        if let Some(data) = work {
            log::debug!("reduced {:?} -> {:?}", self.data.dim(), data.dim());
            self.data = data;
        }
        Ok(())
    }

    fn extents(&self, pair: AxisPair) -> (usize, usize) {
        match pair {
            AxisPair::Real => self.scan_shape(),
            AxisPair::Diffraction => self.diffraction_shape(),
        }
    }
}

fn current<'a, T>(data: &'a Array4<T>, work: Option<&'a Array4<T>>) -> ArrayView4<'a, T> {
    work.unwrap_or(data).view()
}

fn element_count_matches(shape: &[usize], len: usize) -> bool {
    shape
        .iter()
        .try_fold(1usize, |acc, &n| acc.checked_mul(n))
        .is_some_and(|total| total == len)
}

fn clamp(range: Range<usize>, extent: usize) -> Range<usize> {
    let start = range.start.min(extent);
    let end = range.end.min(extent).max(start);
    start..end
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binning::BinningFactor;
    use ndarray::Array3;

    fn cube(shape: (usize, usize, usize, usize)) -> DataCube<f64> {
        let n = shape.0 * shape.1 * shape.2 * shape.3;
        #[allow(clippy::cast_precision_loss)]
        let data = Array::range(0.0, n as f64, 1.0);
        DataCube::new(data, (shape.0, shape.1), (shape.2, shape.3), OriginalMetadata::default()).unwrap()
    }

    #[test]
    fn test_construct_from_3d() {
        let data = Array3::<u16>::ones((6, 3, 4));
        let cube = DataCube::new(data, (2, 3), (3, 4), OriginalMetadata::default()).unwrap();
        assert_eq!(cube.scan_shape(), (2, 3));
        assert_eq!(cube.diffraction_shape(), (3, 4));
        assert_eq!(cube.total_scan_positions(), 6);
        assert!((cube.total_intensity() - 72.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_construct_rejects_wrong_count() {
        let data = Array3::<f32>::zeros((5, 3, 4));
        let err = DataCube::new(data, (2, 3), (3, 4), OriginalMetadata::default()).unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch { .. }));
    }

    #[test]
    fn test_construct_from_transposed_input() {
        let data = Array2::from_shape_fn((2, 3), |(i, j)| i * 3 + j).reversed_axes();
        let cube = DataCube::new(data.clone(), (1, 1), (3, 2), OriginalMetadata::default()).unwrap();
        let expected: Vec<usize> = data.iter().copied().collect();
        assert_eq!(cube.data().iter().copied().collect::<Vec<_>>(), expected);
    }

    #[test]
    fn test_set_scan_shape() {
        let mut cube = cube((2, 6, 2, 2));
        assert!(cube.set_scan_shape(3, 4));
        assert_eq!(cube.scan_shape(), (3, 4));
        assert_eq!(cube.total_scan_positions(), 12);
        assert!((cube.data()[[1, 0, 0, 0]] - 16.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_set_scan_shape_mismatch_is_noop() {
        let mut cube = cube((2, 6, 2, 2));
        let before = cube.data().to_owned();
        assert!(!cube.set_scan_shape(5, 5));
        assert_eq!(cube.scan_shape(), (2, 6));
        assert_eq!(cube.data(), before);
        assert!(matches!(cube.try_set_scan_shape(5, 5), Err(Error::ShapeMismatch { .. })));
    }

    #[test]
    fn test_diffraction_view_transposed() {
        let cube = cube((2, 2, 2, 3));
        let view = cube.diffraction_view_at(1, 0).unwrap();
        assert_eq!(view.shape(), &[3, 2]);
        // data[1, 0, qy=1, qx=2] = 12 + 3 + 2
        assert!((view[[2, 1]] - 17.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_diffraction_view_out_of_bounds() {
        let cube = cube((2, 2, 2, 2));
        assert!(cube.diffraction_view_at(2, 0).is_none());
        assert!(cube.diffraction_view_at(0, 2).is_none());
    }

    #[test]
    fn test_real_space_view() {
        let cube = cube((1, 2, 2, 2));
        let image = cube.real_space_view_over(0..2, 0..1);
        assert_eq!(image.shape(), &[2, 1]);
        // position (0,0): 0 + 2; position (0,1): 4 + 6
        assert!((image[[0, 0]] - 2.0).abs() < f64::EPSILON);
        assert!((image[[1, 0]] - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_real_space_view_clamps() {
        let cube = cube((2, 2, 2, 2));
        let full = cube.real_space_view_over(0..100, 0..100);
        assert!((full.sum() - cube.total_intensity()).abs() < f64::EPSILON);
        let empty = cube.real_space_view_over(5..9, 0..2);
        assert_eq!(empty.shape(), &[2, 2]);
        assert!(empty.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_bin_updates_extents() {
        let mut cube = cube((4, 6, 5, 5));
        cube.bin_diffraction(2).unwrap();
        assert_eq!(cube.diffraction_shape(), (2, 2));
        assert_eq!(cube.scan_shape(), (4, 6));
        cube.bin_real(3).unwrap();
        assert_eq!(cube.scan_shape(), (1, 2));
        assert_eq!(cube.diffraction_shape(), (2, 2));
        assert_eq!(cube.data().dim(), (1, 2, 2, 2));
    }

    #[test]
    fn test_crop() {
        let mut cube = cube((4, 4, 4, 4));
        cube.crop_diffraction(1..3, 0..4).unwrap();
        assert_eq!(cube.diffraction_shape(), (2, 4));
        let err = cube.crop_real(0..5, 0..1).unwrap_err();
        assert!(matches!(err, Error::CropOutOfBounds { .. }));
        assert_eq!(cube.scan_shape(), (4, 4));
    }

    #[test]
    fn test_filename() {
        let cube = cube((1, 1, 1, 1)).with_filename("scan.raw");
        assert_eq!(cube.filename(), Some(Path::new("scan.raw")));
    }

    #[test]
    fn test_integer_cube_overflow_leaves_cube_unchanged() {
        let data = Array4::<u8>::from_elem((2, 2, 4, 4), 200);
        let mut cube = DataCube::new(data.clone(), (2, 2), (4, 4), OriginalMetadata::default()).unwrap();
        assert!(matches!(cube.bin_diffraction(2), Err(Error::IntensityOverflow)));
        assert!(matches!(cube.bin_real(2), Err(Error::IntensityOverflow)));
        assert_eq!(cube.data(), data);
        assert!((cube.total_intensity() - 200.0 * 64.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_integer_totals_are_widened() {
        let data = Array4::<u16>::from_elem((2, 2, 4, 4), 60000);
        let cube = DataCube::new(data, (2, 2), (4, 4), OriginalMetadata::default()).unwrap();
        assert!((cube.total_intensity() - 3_840_000.0).abs() < f64::EPSILON);
        let image = cube.real_space_view_over(0..4, 0..4);
        assert!(image.iter().all(|&v| (v - 960_000.0).abs() < f64::EPSILON));
    }

    #[test]
    fn test_crop_and_bin_overflow_is_atomic() {
        let data = Array4::<u8>::from_elem((4, 4, 4, 4), 100);
        let mut cube = DataCube::new(data.clone(), (4, 4), (4, 4), OriginalMetadata::default()).unwrap();
        // Diffraction bins reach 400 and overflow u8 after the crop succeeded.
        let plan = ReductionPlan::new()
            .with_crop_real(0..2, 0..2)
            .with_bin_q(BinningFactor::new(2));
        assert!(matches!(cube.crop_and_bin(&plan), Err(Error::IntensityOverflow)));
        assert_eq!(cube.data(), data);
    }
}
