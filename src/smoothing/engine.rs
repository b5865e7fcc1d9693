//! Summed-area implementation of the windowed mean
//!
//! Each timeline slice is reduced to its spatial box sums with a 2D integral
//! image, the box sums are accumulated along time, and every output voxel is the
//! difference of two accumulated planes divided by the voxel count of its
//! neighbourhood. Accumulation runs in `f64`, so results match the direct mean
//! within floating-point tolerance.

use super::window::{clamped_range, SmoothingConfig, SmoothingInput};
use crate::errors::Result;
use crate::volume::Volume;
use log::{debug, info};
use ndarray::{Array2, Array3, ArrayView2, Axis};
use rayon::prelude::*;
use std::time::Instant;

/// Smooth one chunk with its neighbours
///
/// The output has the shape of `input.current`; each voxel holds the mean of
/// its neighbourhood, reaching into the neighbour chunks along time only.
///
/// # Errors
///
/// Returns an error if the configuration is invalid, a required neighbour is
/// missing, or a neighbour's spatial extents differ from the current chunk's.
pub fn smooth_chunk(input: &SmoothingInput<'_>, config: &SmoothingConfig) -> Result<Volume> {
    config.validate()?;
    let timeline = input.timeline(config.temporal_radius)?;
    let (t_len, nx, ny) = input.current.dim();
    let started = Instant::now();

    debug!(
        "Chunk {}: timeline of {} slices ({} before, {} current)",
        input.position.index,
        timeline.len(),
        timeline.offset,
        timeline.current_len
    );

    let box_sums: Vec<Array2<f64>> = timeline
        .slices
        .par_iter()
        .map(|slice| spatial_box_sums(slice, config.spatial_radius))
        .collect();

    // prefix[e] holds the sum of box_sums[..e]
    let mut prefix = Array3::<f64>::zeros((box_sums.len() + 1, nx, ny));
    for (e, sums) in box_sums.iter().enumerate() {
        let (head, mut tail) = prefix.view_mut().split_at(Axis(0), e + 1);
        let previous = head.index_axis(Axis(0), e);
        let mut plane = tail.index_axis_mut(Axis(0), 0);
        plane.assign(&previous);
        plane += sums;
    }

    let spatial_counts = spatial_counts(nx, ny, config.spatial_radius);

    let slices: Vec<Vec<f32>> = (0..t_len)
        .into_par_iter()
        .map(|t| {
            let (lo, hi) = timeline.temporal_range(t, config.temporal_radius);
            let n_t = (hi - lo) as f64;
            let upper = prefix.index_axis(Axis(0), hi);
            let lower = prefix.index_axis(Axis(0), lo);
            let mut out = Vec::with_capacity(nx * ny);
            for x in 0..nx {
                for y in 0..ny {
                    let sum = upper[[x, y]] - lower[[x, y]];
                    out.push((sum / (n_t * spatial_counts[[x, y]])) as f32);
                }
            }
            out
        })
        .collect();

    let flat: Vec<f32> = slices.into_iter().flatten().collect();
    let smoothed = Array3::from_shape_vec((t_len, nx, ny), flat)?;

    info!(
        "Smoothed chunk {} ({}x{}x{}) in {:.2?}",
        input.position.index,
        t_len,
        nx,
        ny,
        started.elapsed()
    );
    Ok(smoothed)
}

/// Sum of each clamped `(2r+1)^2` spatial box of one slice
fn spatial_box_sums(slice: &ArrayView2<'_, f32>, radius: usize) -> Array2<f64> {
    let (nx, ny) = slice.dim();
    let mut integral = Array2::<f64>::zeros((nx + 1, ny + 1));
    for x in 0..nx {
        let mut row = 0.0_f64;
        for y in 0..ny {
            row += f64::from(slice[[x, y]]);
            integral[[x + 1, y + 1]] = integral[[x, y + 1]] + row;
        }
    }

    Array2::from_shape_fn((nx, ny), |(x, y)| {
        let (x_lo, x_hi) = clamped_range(x, radius, nx);
        let (y_lo, y_hi) = clamped_range(y, radius, ny);
        integral[[x_hi, y_hi]] - integral[[x_lo, y_hi]] - integral[[x_hi, y_lo]]
            + integral[[x_lo, y_lo]]
    })
}

/// Number of voxels in each clamped spatial box
fn spatial_counts(nx: usize, ny: usize, radius: usize) -> Array2<f64> {
    Array2::from_shape_fn((nx, ny), |(x, y)| {
        let (x_lo, x_hi) = clamped_range(x, radius, nx);
        let (y_lo, y_hi) = clamped_range(y, radius, ny);
        ((x_hi - x_lo) * (y_hi - y_lo)) as f64
    })
}
