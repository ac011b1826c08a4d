//! Element types a scan can hold.
#![allow(
    clippy::cast_lossless,
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation
)]

use ndarray::LinalgScalar;

/// A detector sample: an integer count or a floating-point intensity.
///
/// Binning sums samples in the element type itself, so integer types must
/// report overflow instead of wrapping.
pub trait Sample: LinalgScalar + std::fmt::Debug {
    /// `self + rhs`, or `None` if the sum does not fit in `Self`.
    fn checked_accumulate(self, rhs: Self) -> Option<Self>;

    /// The sample widened to `f64`.
    fn to_f64(self) -> f64;
}

macro_rules! integer_sample {
    ($($t:ty),*) => {
        $(
            impl Sample for $t {
                #[inline]
                fn checked_accumulate(self, rhs: Self) -> Option<Self> {
                    self.checked_add(rhs)
                }

                #[inline]
                fn to_f64(self) -> f64 {
                    self as f64
                }
            }
        )*
    };
}

integer_sample!(u8, u16, u32, u64, usize, i8, i16, i32, i64, isize);

impl Sample for f32 {
    #[inline]
    fn checked_accumulate(self, rhs: Self) -> Option<Self> {
        Some(self + rhs)
    }

    #[inline]
    fn to_f64(self) -> f64 {
        self as f64
    }
}

impl Sample for f64 {
    #[inline]
    fn checked_accumulate(self, rhs: Self) -> Option<Self> {
        Some(self + rhs)
    }

    #[inline]
    fn to_f64(self) -> f64 {
        self
    }
}
