//! Windowed Smoothing Engine
//!
//! Replaces every voxel with the unweighted mean of its spatio-temporal
//! neighbourhood. The temporal part of the neighbourhood may reach into the
//! previous and next chunks; the spatial part never leaves the current chunk.
//!
//! # Organization
//!
//! - [`window`]: configuration, neighbour resolution and the direct reference mean
//! - [`engine`]: the summed-area implementation used by the pipeline

pub mod engine;
pub mod window;

pub use engine::smooth_chunk;
pub use window::{neighborhood_mean, SmoothingConfig, SmoothingInput, Timeline};
