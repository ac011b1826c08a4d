//! Memory-mapped reader for headerless raw scans.
//!
//! A raw scan is a flat little-endian dump of `R_y * R_x * Q_y * Q_x` samples
//! in `[R_y, R_x, Q_y, Q_x]` order. The element type must be supplied by the
//! caller since the file carries no header.

use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use memmap2::Mmap;
use ndarray::Array1;
use stemcube_core::{DataCube, OriginalMetadata};

use crate::{Error, Result};

/// Sample type of a raw file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawDtype {
    U8,
    U16,
    U32,
    F32,
    F64,
}

impl RawDtype {
    /// Size of one sample in bytes.
    #[must_use]
    pub fn size(self) -> usize {
        match self {
            RawDtype::U8 => 1,
            RawDtype::U16 => 2,
            RawDtype::U32 | RawDtype::F32 => 4,
            RawDtype::F64 => 8,
        }
    }
}

impl fmt::Display for RawDtype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RawDtype::U8 => "u8",
            RawDtype::U16 => "u16",
            RawDtype::U32 => "u32",
            RawDtype::F32 => "f32",
            RawDtype::F64 => "f64",
        };
        f.write_str(name)
    }
}

impl FromStr for RawDtype {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "u8" | "uint8" => Ok(RawDtype::U8),
            "u16" | "uint16" => Ok(RawDtype::U16),
            "u32" | "uint32" => Ok(RawDtype::U32),
            "f32" | "float32" => Ok(RawDtype::F32),
            "f64" | "float64" => Ok(RawDtype::F64),
            other => Err(Error::InvalidFormat(format!("unknown sample type '{other}'"))),
        }
    }
}

/// A raw scan file with memory-mapped I/O.
pub struct RawCubeReader {
    mmap: Mmap,
    path: PathBuf,
    dtype: RawDtype,
}

impl RawCubeReader {
    /// Opens a raw file for reading.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or memory-mapped, is
    /// empty, or is not a whole number of samples long.
    pub fn open<P: AsRef<Path>>(path: P, dtype: RawDtype) -> Result<Self> {
        let file = File::open(&path)?;
        let len = file.metadata()?.len();
        if len == 0 {
            return Err(Error::InvalidFormat(format!(
                "{} is empty",
                path.as_ref().display()
            )));
        }
        if len % dtype.size() as u64 != 0 {
            return Err(Error::InvalidFormat(format!(
                "{} has {len} bytes, not a multiple of the {dtype} sample size",
                path.as_ref().display()
            )));
        }
        // SAFETY: The file is opened read-only and we assume it is not modified concurrently.
        // This is the standard safety contract for memory mapping.
        #[allow(unsafe_code)]
        let mmap = unsafe { Mmap::map(&file)? };
        Ok(Self {
            mmap,
            path: path.as_ref().to_path_buf(),
            dtype,
        })
    }

    /// Path of the mapped file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sample type the file is read as.
    #[must_use]
    pub fn dtype(&self) -> RawDtype {
        self.dtype
    }

    /// Returns the file size in bytes.
    #[must_use]
    pub fn file_size(&self) -> usize {
        self.mmap.len()
    }

    /// Number of samples in the file.
    #[must_use]
    pub fn sample_count(&self) -> usize {
        self.mmap.len() / self.dtype.size()
    }

    /// Decodes every sample as `f64`.
    #[must_use]
    #[allow(clippy::cast_lossless)]
    pub fn read_samples(&self) -> Vec<f64> {
        let bytes = &self.mmap[..];
        match self.dtype {
            RawDtype::U8 => bytes.iter().map(|&b| b as f64).collect(),
            RawDtype::U16 => bytes
                .chunks_exact(2)
                .map(|c| u16::from_le_bytes([c[0], c[1]]) as f64)
                .collect(),
            RawDtype::U32 => bytes
                .chunks_exact(4)
                .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]) as f64)
                .collect(),
            RawDtype::F32 => bytes
                .chunks_exact(4)
                .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]) as f64)
                .collect(),
            RawDtype::F64 => bytes
                .chunks_exact(8)
                .map(|c| f64::from_le_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]))
                .collect(),
        }
    }

    /// Builds a [`DataCube`] from the file.
    ///
    /// # Errors
    /// Returns a core `ShapeMismatch` error if the sample count disagrees
    /// with the declared extents, or a metadata error from resolution.
    pub fn read_cube(
        &self,
        scan_shape: (usize, usize),
        diffraction_shape: (usize, usize),
        original: OriginalMetadata,
    ) -> Result<DataCube<f64>> {
        let samples = Array1::from_vec(self.read_samples());
        let cube = DataCube::new(samples, scan_shape, diffraction_shape, original)?
            .with_filename(&self.path);
        log::debug!(
            "read {} {} samples from {}",
            self.sample_count(),
            self.dtype,
            self.path.display()
        );
        Ok(cube)
    }
}
