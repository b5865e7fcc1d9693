//! Neighbourhood definition and neighbour-chunk resolution

use crate::chunk_store::{ChunkPosition, ChunkWindow};
use crate::errors::{NeighborSide, OceanVolError, Result};
use crate::volume::{spatial_dim, Volume, VolumeView};
use log::warn;
use ndarray::{s, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

/// Radii of the smoothing neighbourhood
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmoothingConfig {
    /// Half-width of the window along x and y
    pub spatial_radius: usize,
    /// Half-width of the window along time
    pub temporal_radius: usize,
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            spatial_radius: 2,
            temporal_radius: 24,
        }
    }
}

impl SmoothingConfig {
    pub fn new(spatial_radius: usize, temporal_radius: usize) -> Self {
        Self {
            spatial_radius,
            temporal_radius,
        }
    }

    /// Reject radii of zero
    pub fn validate(&self) -> Result<()> {
        if self.spatial_radius == 0 || self.temporal_radius == 0 {
            return Err(OceanVolError::InvalidConfiguration(format!(
                "smoothing radii must be positive (spatial {}, temporal {})",
                self.spatial_radius, self.temporal_radius
            )));
        }
        Ok(())
    }
}

/// The one to three volumes a single smoothing call reads
#[derive(Debug, Clone, Copy)]
pub struct SmoothingInput<'a> {
    pub position: ChunkPosition,
    pub current: VolumeView<'a>,
    pub prev: Option<VolumeView<'a>>,
    pub next: Option<VolumeView<'a>>,
}

impl<'a> SmoothingInput<'a> {
    /// A chunk with no neighbours on either side
    pub fn single(current: &'a Volume) -> Self {
        Self {
            position: ChunkPosition::single(),
            current: current.view(),
            prev: None,
            next: None,
        }
    }

    pub fn new(
        position: ChunkPosition,
        current: &'a Volume,
        prev: Option<&'a Volume>,
        next: Option<&'a Volume>,
    ) -> Self {
        Self {
            position,
            current: current.view(),
            prev: prev.map(Volume::view),
            next: next.map(Volume::view),
        }
    }

    /// Lay the current chunk and the reachable neighbour slices on one time axis
    ///
    /// Only the `temporal_radius` slices nearest the current chunk are taken
    /// from each neighbour.
    ///
    /// # Errors
    ///
    /// Returns `MissingNeighbor` when the position calls for a neighbour that was
    /// not supplied and `ShapeMismatch` when a neighbour's spatial extents differ.
    pub fn timeline(&self, temporal_radius: usize) -> Result<Timeline<'a>> {
        let prev = self.resolve(self.prev, NeighborSide::Previous)?;
        let next = self.resolve(self.next, NeighborSide::Next)?;

        let mut slices: Vec<ArrayView2<'a, f32>> = Vec::new();
        let mut offset = 0;
        if let Some(prev) = prev {
            let len = prev.len_of(Axis(0));
            let take = temporal_radius.min(len);
            push_slices(&mut slices, prev, len - take..len);
            offset = take;
        }
        push_slices(&mut slices, self.current, 0..self.current.len_of(Axis(0)));
        if let Some(next) = next {
            let take = temporal_radius.min(next.len_of(Axis(0)));
            push_slices(&mut slices, next, 0..take);
        }

        Ok(Timeline {
            slices,
            offset,
            current_len: self.current.len_of(Axis(0)),
        })
    }

    fn resolve(
        &self,
        neighbor: Option<VolumeView<'a>>,
        side: NeighborSide,
    ) -> Result<Option<VolumeView<'a>>> {
        let expected = self.position.expects(side);
        match (expected, neighbor) {
            (true, None) => Err(OceanVolError::MissingNeighbor {
                index: self.position.index,
                side,
            }),
            (false, Some(_)) => {
                warn!(
                    "Ignoring {} neighbour supplied to chunk {} at a sequence edge",
                    side, self.position.index
                );
                Ok(None)
            }
            (false, None) => Ok(None),
            (true, Some(view)) => {
                let current = spatial_dim(&self.current);
                let found = spatial_dim(&view);
                if current != found {
                    return Err(OceanVolError::shape_mismatch(
                        format!("{} neighbour of chunk {}", side, self.position.index),
                        &[current.0, current.1],
                        &[found.0, found.1],
                    ));
                }
                Ok(Some(view))
            }
        }
    }
}

impl<'a> From<&'a ChunkWindow> for SmoothingInput<'a> {
    fn from(window: &'a ChunkWindow) -> Self {
        SmoothingInput::new(
            window.position,
            &window.current,
            window.prev.as_ref(),
            window.next.as_ref(),
        )
    }
}

/// Current chunk plus borrowed neighbour slices on a single time axis
#[derive(Debug, Clone)]
pub struct Timeline<'a> {
    pub slices: Vec<ArrayView2<'a, f32>>,
    /// Timeline index of the current chunk's first slice
    pub offset: usize,
    pub current_len: usize,
}

impl Timeline<'_> {
    pub fn len(&self) -> usize {
        self.slices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slices.is_empty()
    }

    /// Half-open timeline range averaged for local time index `t`
    pub fn temporal_range(&self, t: usize, radius: usize) -> (usize, usize) {
        let center = self.offset + t;
        let lo = center.saturating_sub(radius);
        let hi = (center + radius + 1).min(self.slices.len());
        (lo, hi)
    }
}

fn push_slices<'a>(
    slices: &mut Vec<ArrayView2<'a, f32>>,
    volume: VolumeView<'a>,
    range: std::ops::Range<usize>,
) {
    slices.extend(range.map(|t| volume.index_axis_move(Axis(0), t)));
}

/// Half-open range of a closed window of `radius` around `center`, clamped to `[0, len)`
pub(crate) fn clamped_range(center: usize, radius: usize, len: usize) -> (usize, usize) {
    (center.saturating_sub(radius), (center + radius + 1).min(len))
}

/// Direct mean of one voxel's neighbourhood
///
/// Sums every contributing voxel explicitly. This is the reference that the
/// summed-area engine must agree with.
pub fn neighborhood_mean(
    input: &SmoothingInput<'_>,
    config: &SmoothingConfig,
    t: usize,
    x: usize,
    y: usize,
) -> Result<f64> {
    let timeline = input.timeline(config.temporal_radius)?;
    let (_, nx, ny) = input.current.dim();
    let (t_lo, t_hi) = timeline.temporal_range(t, config.temporal_radius);
    let (x_lo, x_hi) = clamped_range(x, config.spatial_radius, nx);
    let (y_lo, y_hi) = clamped_range(y, config.spatial_radius, ny);

    let mut sum = 0.0_f64;
    let mut count = 0_usize;
    for slice in &timeline.slices[t_lo..t_hi] {
        for value in slice.slice(s![x_lo..x_hi, y_lo..y_hi]).iter() {
            sum += f64::from(*value);
            count += 1;
        }
    }
    Ok(sum / count as f64)
}
