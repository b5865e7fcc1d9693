//! Shell rewriting along one axis at a time
//!
//! Both policies here treat the two faces of an axis identically and are applied
//! to the time axis first, then x, then y.

use super::VOLUME_AXES;
use crate::volume::Volume;
use ndarray::Axis;

/// Gradient-zero extension on all six faces
///
/// All `width` layers of a face are replaced by the single layer located
/// exactly `width` voxels inward.
pub fn gradient_zero(volume: &Volume, width: usize) -> Volume {
    let mut out = volume.clone();
    for axis in VOLUME_AXES {
        collapse_shell(&mut out, Axis(axis), width);
    }
    out
}

/// Mirror reflection on all six faces
///
/// The interior beyond the shell is reflected outward across its own edge
/// without repeating the edge layer, so shell layer `i` on the low face takes
/// layer `2 * width - i`. The interior is left untouched.
pub fn mirror(volume: &Volume, width: usize) -> Volume {
    let mut out = volume.clone();
    for axis in VOLUME_AXES {
        reflect_shell(&mut out, Axis(axis), width);
    }
    out
}

fn collapse_shell(volume: &mut Volume, axis: Axis, width: usize) {
    let n = volume.len_of(axis);
    if width == 0 || 2 * width >= n {
        return;
    }
    let low = volume.index_axis(axis, width).to_owned();
    let high = volume.index_axis(axis, n - 1 - width).to_owned();
    for i in 0..width {
        volume.index_axis_mut(axis, i).assign(&low);
        volume.index_axis_mut(axis, n - 1 - i).assign(&high);
    }
}

fn reflect_shell(volume: &mut Volume, axis: Axis, width: usize) {
    let n = volume.len_of(axis);
    if width == 0 || 2 * width >= n {
        return;
    }
    let interior = n - 2 * width;
    for i in 0..width {
        // Offsets relative to the first interior layer
        let low = width + reflect_index(i as isize - width as isize, interior);
        let high = width + reflect_index((n - 1 - i) as isize - width as isize, interior);

        let source = volume.index_axis(axis, low).to_owned();
        volume.index_axis_mut(axis, i).assign(&source);
        let source = volume.index_axis(axis, high).to_owned();
        volume.index_axis_mut(axis, n - 1 - i).assign(&source);
    }
}

/// Fold an index into `[0, len)` by reflection without edge repetition
///
/// `-1` maps to `1`, `len` maps to `len - 2`.
pub fn reflect_index(index: isize, len: usize) -> usize {
    if len <= 1 {
        return 0;
    }
    let period = 2 * (len as isize - 1);
    let folded = index.rem_euclid(period);
    if folded >= len as isize {
        (period - folded) as usize
    } else {
        folded as usize
    }
}
