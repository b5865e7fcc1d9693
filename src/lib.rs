//! oceanvol: chunked ocean volume smoothing, boundary correction and quantization
//!
//! Ocean-property snapshots are produced in fixed-length, independently stored
//! time chunks. This library turns such a sequence into 8-bit volumes ready for
//! rendering:
//!
//! 1. a spatio-temporal moving average whose time window reaches into the
//!    neighbouring chunks,
//! 2. correction of the low-value halo a fixed window leaves on the six faces,
//! 3. clipping of land cells from a geographic boundary polygon,
//! 4. quantization to 8-bit codes with reserved void and land values.
//!
//! ## Module Organization
//!
//! - [`chunk_store`]: chunk discovery, ordering and neighbour loading
//! - [`smoothing`]: the windowed mean across chunk boundaries
//! - [`boundary`]: boundary correction policies
//! - [`mask`]: land mask construction and clipping
//! - [`quantize`]: value-to-code mapping
//! - [`raw_io`]: raw volume and `.ini` descriptor files
//! - [`pipeline`]: per-chunk processing and batch runs
//! - [`diagnostics`]: inspection of quantized volumes
//! - [`config`]: JSON pipeline configuration
//! - [`parallel`]: Rayon thread pool configuration
//! - [`errors`]: centralized error handling
//!
//! ## Usage
//!
//! ```rust,no_run
//! use oceanvol::prelude::*;
//! use std::path::Path;
//!
//! let store = JsonChunkStore::discover(Path::new("chunks/")).unwrap();
//! let config = PipelineConfig::default();
//! let report = run_batch(&store, None, &config, Path::new("out/")).unwrap();
//! println!("{}", report);
//! ```

pub mod boundary;
pub mod chunk_store;
pub mod cli;
pub mod config;
pub mod diagnostics;
pub mod errors;
pub mod mask;
pub mod parallel;
pub mod pipeline;
pub mod quantize;
pub mod raw_io;
pub mod smoothing;
pub mod volume;

// Direct re-exports for the public API
pub use boundary::{correct_boundary, BoundaryPolicy, BoundarySpec};
pub use chunk_store::{ChunkStore, ChunkWindow, JsonChunkStore, MemoryChunkStore};
pub use config::PipelineConfig;
pub use diagnostics::{code_census, diagnose_boundary};
pub use errors::*;
pub use mask::{clip_land, LandMask, MaskConfig};
pub use parallel::*;
pub use pipeline::{prepare_mask, process_chunk, run_batch, validate_chunk_shapes, BatchReport, SkippedChunk};
pub use quantize::{quantize, QuantizedVolume, QuantizerConfig};
pub use raw_io::{write_quantized, RawVolume, VolumeDescriptor};
pub use smoothing::{smooth_chunk, SmoothingConfig, SmoothingInput};
pub use volume::{ChunkRecord, Volume};

// High-level convenience API
pub mod prelude {
    //! Commonly used imports for convenience
    pub use crate::boundary::{correct_boundary, BoundaryPolicy};
    pub use crate::chunk_store::{ChunkPosition, ChunkStore, ChunkWindow, JsonChunkStore, MemoryChunkStore};
    pub use crate::config::PipelineConfig;
    pub use crate::errors::{OceanVolError, Result};
    pub use crate::mask::{clip_land, LandMask};
    pub use crate::parallel::ParallelConfig;
    pub use crate::pipeline::{process_chunk, run_batch, BatchReport};
    pub use crate::quantize::{quantize, QuantizerConfig};
    pub use crate::smoothing::{smooth_chunk, SmoothingConfig, SmoothingInput};
    pub use crate::volume::Volume;
}
