//! Separable isotropic gaussian blur
//!
//! The kernel is truncated at four standard deviations and edges are extended by
//! symmetric reflection that repeats the edge sample (`d c b a | a b c d`), so a
//! constant volume blurs to itself.

use ndarray::{Array3, Axis, Zip};

/// Truncation of the kernel in standard deviations
pub const TRUNCATE: f64 = 4.0;

/// Normalized 1D gaussian kernel of odd length
pub fn gaussian_kernel(sigma: f64) -> Vec<f64> {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let radius = (TRUNCATE * sigma + 0.5) as usize;
    let denom = 2.0 * sigma * sigma;
    let mut kernel: Vec<f64> = (0..=2 * radius)
        .map(|i| {
            let d = i as f64 - radius as f64;
            (-d * d / denom).exp()
        })
        .collect();
    let total: f64 = kernel.iter().sum();
    kernel.iter_mut().for_each(|w| *w /= total);
    kernel
}

/// Blur a volume along every axis with the same `sigma`
pub fn gaussian_blur(volume: &Array3<f64>, sigma: f64) -> Array3<f64> {
    let kernel = gaussian_kernel(sigma);
    let mut current = volume.clone();
    for axis in 0..3 {
        current = convolve_axis(&current, Axis(axis), &kernel);
    }
    current
}

fn convolve_axis(input: &Array3<f64>, axis: Axis, kernel: &[f64]) -> Array3<f64> {
    let mut output = Array3::<f64>::zeros(input.raw_dim());
    let radius = (kernel.len() / 2) as isize;

    Zip::from(input.lanes(axis))
        .and(output.lanes_mut(axis))
        .par_for_each(|src, mut dst| {
            let n = src.len();
            for i in 0..n {
                let mut acc = 0.0;
                for (k, weight) in kernel.iter().enumerate() {
                    let j = symmetric_index(i as isize + k as isize - radius, n);
                    acc += weight * src[j];
                }
                dst[i] = acc;
            }
        });
    output
}

/// Fold an index into `[0, len)` by reflection that repeats the edge sample
///
/// `-1` maps to `0`, `len` maps to `len - 1`.
pub fn symmetric_index(index: isize, len: usize) -> usize {
    let period = 2 * len as isize;
    let folded = index.rem_euclid(period);
    if folded >= len as isize {
        (period - 1 - folded) as usize
    } else {
        folded as usize
    }
}
