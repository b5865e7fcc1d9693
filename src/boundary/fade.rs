//! Distance-weighted boundary blends

use super::gaussian::gaussian_blur;
use super::shell::gradient_zero;
use super::VOLUME_AXES;
use crate::volume::Volume;
use ndarray::{Array3, Zip};

/// Distance in layers from index `i` to the nearer face of an axis of length `n`
fn face_distance(i: usize, n: usize) -> usize {
    i.min(n - 1 - i)
}

/// Linear ramp from 0 at the outermost layer to 1 at `width` layers inward
fn ramp(distance: usize, width: usize) -> f64 {
    distance.min(width) as f64 / width as f64
}

/// Per-voxel weight of the original data for the blurred fade
///
/// Faces combine multiplicatively, so edges and corners fade fastest.
pub fn fade_weights(shape: (usize, usize, usize), fade_width: usize) -> Array3<f64> {
    let dims = [shape.0, shape.1, shape.2];
    Array3::from_shape_fn(shape, |(t, x, y)| {
        let index = [t, x, y];
        VOLUME_AXES
            .iter()
            .map(|&axis| ramp(face_distance(index[axis], dims[axis]), fade_width))
            .product()
    })
}

/// Blend towards a gaussian-blurred copy near every face
///
/// `output = original * w + blurred * (1 - w)` with `w` from [`fade_weights`].
pub fn blurred_fade(volume: &Volume, sigma: f64, fade_width: usize) -> Volume {
    let original = volume.mapv(f64::from);
    let blurred = gaussian_blur(&original, sigma);
    let weights = fade_weights(volume.dim(), fade_width);

    let mut out = Volume::zeros(volume.raw_dim());
    Zip::from(&mut out)
        .and(&original)
        .and(&blurred)
        .and(&weights)
        .for_each(|o, &v, &b, &w| *o = (v * w + b * (1.0 - w)) as f32);
    out
}

/// Per-voxel weight of the original data for the selective blend
///
/// Uses the distance to the nearest x or y face and, when `include_time` is
/// set, the nearest time face as well.
pub fn selective_weights(
    shape: (usize, usize, usize),
    width: usize,
    include_time: bool,
) -> Array3<f64> {
    let (nt, nx, ny) = shape;
    Array3::from_shape_fn(shape, |(t, x, y)| {
        let mut distance = face_distance(x, nx).min(face_distance(y, ny));
        if include_time {
            distance = distance.min(face_distance(t, nt));
        }
        ramp(distance, width)
    })
}

/// Blend the gradient-zero correction in by distance to the faces
pub fn selective_blend(volume: &Volume, width: usize, fade_time_axis: bool) -> Volume {
    let processed = gradient_zero(volume, width);
    let weights = selective_weights(volume.dim(), width, fade_time_axis);

    let mut out = Volume::zeros(volume.raw_dim());
    Zip::from(&mut out)
        .and(volume)
        .and(&processed)
        .and(&weights)
        .for_each(|o, &v, &p, &w| *o = (f64::from(v) * w + f64::from(p) * (1.0 - w)) as f32);
    out
}
