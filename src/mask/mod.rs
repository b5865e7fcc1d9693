//! Geographic Mask Clipper
//!
//! A [`LandMask`] is a 2D boolean grid aligned 1:1 with the `(x, y)` axes of a
//! volume, `true` marking land. Clipping forces every land column, across all
//! time slices, to a sentinel value. It must run after boundary correction so
//! the sentinel ring is never spread inward by the corrector.
//!
//! # Organization
//!
//! - [`geography`]: building a mask from boundary polygons and a grid span

pub mod geography;

pub use geography::{load_region, GridSpan, MaskConfig, Projection};

use crate::errors::{OceanVolError, Result};
use crate::volume::Volume;
use ndarray::{Array2, Axis, Zip};
use std::fmt;

/// Land/ocean mask over the spatial grid
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LandMask {
    cells: Array2<bool>,
}

impl LandMask {
    /// Wrap a boolean `(x, y)` grid, `true` = land
    pub fn new(cells: Array2<bool>) -> Self {
        Self { cells }
    }

    /// Mask with no land at all
    pub fn all_ocean(nx: usize, ny: usize) -> Self {
        Self {
            cells: Array2::from_elem((nx, ny), false),
        }
    }

    pub fn dim(&self) -> (usize, usize) {
        self.cells.dim()
    }

    pub fn cells(&self) -> &Array2<bool> {
        &self.cells
    }

    pub fn is_land(&self, x: usize, y: usize) -> bool {
        self.cells.get((x, y)).copied().unwrap_or(false)
    }

    pub fn land_count(&self) -> usize {
        self.cells.iter().filter(|&&land| land).count()
    }

    pub fn ocean_count(&self) -> usize {
        self.cells.len() - self.land_count()
    }

    /// Fail unless the mask covers exactly the spatial extents of `volume`
    pub fn check_matches(&self, volume: &Volume) -> Result<()> {
        let (_, nx, ny) = volume.dim();
        let (mx, my) = self.dim();
        if (mx, my) != (nx, ny) {
            return Err(OceanVolError::shape_mismatch(
                "land mask vs volume spatial extents",
                &[nx, ny],
                &[mx, my],
            ));
        }
        Ok(())
    }
}

impl fmt::Display for LandMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (nx, ny) = self.dim();
        let total = self.cells.len().max(1);
        write!(
            f,
            "{}x{} mask: {} land ({:.1}%), {} ocean",
            nx,
            ny,
            self.land_count(),
            100.0 * self.land_count() as f64 / total as f64,
            self.ocean_count()
        )
    }
}

/// Force every land voxel of `volume` to `sentinel`, in every time slice
///
/// Ocean voxels are copied unchanged. Clipping an already clipped volume with
/// the same mask and sentinel returns it unchanged.
///
/// # Errors
///
/// Returns `ShapeMismatch` if the mask does not match the volume's `(x, y)` extents.
pub fn clip_land(volume: &Volume, mask: &LandMask, sentinel: f32) -> Result<Volume> {
    let mut clipped = volume.clone();
    clip_land_in_place(&mut clipped, mask, sentinel)?;
    Ok(clipped)
}

/// In-place form of [`clip_land`]
pub fn clip_land_in_place(volume: &mut Volume, mask: &LandMask, sentinel: f32) -> Result<()> {
    mask.check_matches(volume)?;
    for mut slice in volume.axis_iter_mut(Axis(0)) {
        Zip::from(&mut slice).and(&mask.cells).for_each(|value, &land| {
            if land {
                *value = sentinel;
            }
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array3};

    fn coastal_mask() -> LandMask {
        LandMask::new(array![[true, true, false], [true, false, false]])
    }

    #[test]
    fn test_clip_sets_land_in_every_slice() {
        let volume = Array3::from_shape_fn((4, 2, 3), |(t, x, y)| (10 * t + 3 * x + y) as f32 + 5.0);
        let clipped = clip_land(&volume, &coastal_mask(), 1.0).unwrap();
        for t in 0..4 {
            assert_eq!(clipped[[t, 0, 0]], 1.0);
            assert_eq!(clipped[[t, 0, 1]], 1.0);
            assert_eq!(clipped[[t, 1, 0]], 1.0);
            assert_eq!(clipped[[t, 0, 2]], volume[[t, 0, 2]]);
            assert_eq!(clipped[[t, 1, 2]], volume[[t, 1, 2]]);
        }
    }

    #[test]
    fn test_clip_is_fixed_point() {
        let volume = Array3::from_shape_fn((3, 2, 3), |(t, x, y)| (t * x + y) as f32);
        let once = clip_land(&volume, &coastal_mask(), 1.0).unwrap();
        let twice = clip_land(&once, &coastal_mask(), 1.0).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_clip_rejects_misaligned_mask() {
        let volume = Array3::zeros((2, 3, 2));
        match clip_land(&volume, &coastal_mask(), 1.0) {
            Err(OceanVolError::ShapeMismatch { expected, found, .. }) => {
                assert_eq!(expected, vec![3, 2]);
                assert_eq!(found, vec![2, 3]);
            }
            other => panic!("Expected ShapeMismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_mask_counts() {
        let mask = coastal_mask();
        assert_eq!(mask.land_count(), 3);
        assert_eq!(mask.ocean_count(), 3);
        assert!(mask.is_land(1, 0));
        assert!(!mask.is_land(5, 5));
        assert!(mask.to_string().contains("3 land"));
    }
}
