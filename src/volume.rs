//! Volumes, chunk records and time ranges
//!
//! A [`Volume`] is a dense `(t, x, y)` array of `f32` samples. On disk a chunk
//! arrives as a [`ChunkRecord`]: a flat sample list plus its three extents, laid
//! out in C order with time slowest and `y` fastest.

use crate::errors::{OceanVolError, Result};
use ndarray::{Array3, ArrayView3};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Continuous-valued volume indexed `(t, x, y)`
pub type Volume = Array3<f32>;

/// Borrowed volume indexed `(t, x, y)`
pub type VolumeView<'a> = ArrayView3<'a, f32>;

/// Flat chunk record as produced by the interpolation step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkRecord {
    pub data: Vec<f32>,
    #[serde(rename = "xLength")]
    pub x_length: usize,
    #[serde(rename = "yLength")]
    pub y_length: usize,
    /// Number of time slices in the chunk
    #[serde(rename = "zLength")]
    pub z_length: usize,
}

impl ChunkRecord {
    /// Read a record from a JSON file
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Flatten a volume back into a record
    pub fn from_volume(volume: &Volume) -> Self {
        let (t, x, y) = volume.dim();
        Self {
            data: volume.iter().copied().collect(),
            x_length: x,
            y_length: y,
            z_length: t,
        }
    }

    /// Reshape into a `(t, x, y)` volume, checking the flat length first
    pub fn into_volume(self) -> Result<Volume> {
        let expected = self.x_length * self.y_length * self.z_length;
        if self.data.len() != expected {
            return Err(OceanVolError::SizeMismatch {
                expected,
                found: self.data.len(),
            });
        }
        Ok(Array3::from_shape_vec(
            (self.z_length, self.x_length, self.y_length),
            self.data,
        )?)
    }
}

/// Half-open time interval `[start, end)` covered by one chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: usize,
    pub end: usize,
}

impl TimeRange {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True when `other` starts exactly where `self` ends
    pub fn is_followed_by(&self, other: &TimeRange) -> bool {
        self.end == other.start
    }
}

/// Spatial extents `(x, y)` of a volume
pub fn spatial_dim(volume: &VolumeView<'_>) -> (usize, usize) {
    let (_, x, y) = volume.dim();
    (x, y)
}
