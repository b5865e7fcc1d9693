//! Batch pipeline
//!
//! Each chunk goes through smoothing, boundary correction, land clipping and
//! quantization, always in that order, and is written as a raw volume with its
//! descriptor. A chunk that cannot be processed is reported and skipped; a
//! configuration problem stops the whole batch.

use crate::boundary::correct_boundary;
use crate::chunk_store::{ChunkStore, ChunkWindow};
use crate::config::PipelineConfig;
use crate::errors::Result;
use crate::mask::{clip_land_in_place, LandMask};
use crate::quantize::{quantize, QuantizedVolume};
use crate::raw_io::write_quantized;
use crate::smoothing::{smooth_chunk, SmoothingConfig, SmoothingInput};
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Run one chunk through smoothing, correction, clipping and quantization
///
/// Clipping is skipped when `mask` is `None`.
///
/// # Errors
///
/// Fails on missing neighbours, shape mismatches, or a boundary width that does
/// not fit the chunk.
pub fn process_chunk(
    window: &ChunkWindow,
    mask: Option<&LandMask>,
    config: &PipelineConfig,
) -> Result<QuantizedVolume> {
    let mut volume = smooth_chunk(&SmoothingInput::from(window), &config.smoothing)?;
    if let Some(policy) = config.boundary_policy()? {
        volume = correct_boundary(&volume, &policy)?;
    }
    if let Some(mask) = mask {
        clip_land_in_place(&mut volume, mask, config.clip_sentinel)?;
    }
    quantize(&volume, &config.quantizer)
}

/// Output file name for a chunk: `<name>_smooth_s_<rs>_t_<rt>.raw`
pub fn output_file_name(chunk_name: &str, smoothing: &SmoothingConfig) -> String {
    format!(
        "{}_smooth_s_{}_t_{}.raw",
        chunk_name, smoothing.spatial_radius, smoothing.temporal_radius
    )
}

/// Build the configured land mask, sized from the first loadable chunk
///
/// Returns `None` when no mask is configured or the store is empty.
pub fn prepare_mask<S: ChunkStore + ?Sized>(
    store: &S,
    config: &PipelineConfig,
) -> Result<Option<LandMask>> {
    let Some(mask_config) = &config.mask else {
        return Ok(None);
    };
    for index in 0..store.len() {
        match store.load(index) {
            Ok(volume) => {
                let (_, nx, ny) = volume.dim();
                return mask_config.build(nx, ny).map(Some);
            }
            Err(e) => debug!("Chunk {} unusable for sizing the mask: {}", index, e),
        }
    }
    Ok(None)
}

/// A chunk that was written
#[derive(Debug, Clone)]
pub struct ChunkOutput {
    pub index: usize,
    pub name: String,
    pub raw_path: PathBuf,
    pub descriptor_path: PathBuf,
    pub elapsed: Duration,
}

/// A chunk that was skipped, and why
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedChunk {
    pub index: usize,
    pub name: String,
    pub reason: String,
}

/// Outcome of a batch run
#[derive(Debug, Clone)]
pub struct BatchReport {
    pub started: DateTime<Utc>,
    pub finished: DateTime<Utc>,
    pub written: Vec<ChunkOutput>,
    pub skipped: Vec<SkippedChunk>,
}

impl BatchReport {
    fn new() -> Self {
        let now = Utc::now();
        Self {
            started: now,
            finished: now,
            written: Vec::new(),
            skipped: Vec::new(),
        }
    }

    pub fn total(&self) -> usize {
        self.written.len() + self.skipped.len()
    }

    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty()
    }

    pub fn processing_time(&self) -> Duration {
        self.written.iter().map(|o| o.elapsed).sum()
    }
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Batch Summary")?;
        writeln!(f, "=============")?;
        writeln!(f, "   Started:  {}", self.started.to_rfc3339())?;
        writeln!(f, "   Finished: {}", self.finished.to_rfc3339())?;
        writeln!(
            f,
            "   Chunks: {} written, {} skipped, {} total",
            self.written.len(),
            self.skipped.len(),
            self.total()
        )?;
        writeln!(f, "   Processing time: {:.2?}", self.processing_time())?;
        for output in &self.written {
            writeln!(
                f,
                "   ✅ [{}] {} -> {} ({:.2?})",
                output.index,
                output.name,
                output.raw_path.display(),
                output.elapsed
            )?;
        }
        for skipped in &self.skipped {
            writeln!(f, "   ⚠️  [{}] {} skipped: {}", skipped.index, skipped.name, skipped.reason)?;
        }
        Ok(())
    }
}

/// Process every chunk of `store` in time order, writing into `output_dir`
///
/// Per-chunk failures are logged and recorded in the report.
///
/// # Errors
///
/// Configuration errors, including a boundary width that does not fit some
/// chunk, are returned before any chunk is processed. Also fails when
/// `output_dir` cannot be created.
pub fn run_batch<S: ChunkStore + ?Sized>(
    store: &S,
    mask: Option<&LandMask>,
    config: &PipelineConfig,
    output_dir: &Path,
) -> Result<BatchReport> {
    validate_chunk_shapes(store, config)?;
    fs::create_dir_all(output_dir)?;

    let mut report = BatchReport::new();
    info!(
        "Processing {} chunks into {} (spatial radius {}, temporal radius {})",
        store.len(),
        output_dir.display(),
        config.smoothing.spatial_radius,
        config.smoothing.temporal_radius
    );

    for index in 0..store.len() {
        let name = store
            .descriptor(index)
            .map_or_else(|_| format!("chunk_{}", index), |d| d.name.clone());
        let start = Instant::now();

        match write_chunk(store, index, &name, mask, config, output_dir) {
            Ok((raw_path, descriptor_path)) => {
                let elapsed = start.elapsed();
                info!("Chunk {} ({}) written in {:.2?}", index, name, elapsed);
                report.written.push(ChunkOutput {
                    index,
                    name,
                    raw_path,
                    descriptor_path,
                    elapsed,
                });
            }
            Err(e) if e.is_configuration() => return Err(e),
            Err(e) => {
                warn!("Skipping chunk {} ({}): {}", index, name, e);
                report.skipped.push(SkippedChunk {
                    index,
                    name,
                    reason: e.to_string(),
                });
            }
        }
    }

    report.finished = Utc::now();
    info!(
        "Batch finished: {} written, {} skipped",
        report.written.len(),
        report.skipped.len()
    );
    Ok(report)
}

/// Check the configuration against the shape of every chunk in `store`
///
/// Time extents come from the chunk descriptors and spatial extents from the
/// first chunk that loads. When no chunk loads only the shape-independent
/// checks run; the chunks are then skipped one by one.
///
/// # Errors
///
/// Returns `InvalidConfiguration` if the boundary width does not fit some chunk.
pub fn validate_chunk_shapes<S: ChunkStore + ?Sized>(
    store: &S,
    config: &PipelineConfig,
) -> Result<()> {
    config.validate()?;
    let Some((nx, ny)) = (0..store.len()).find_map(|index| {
        store.load(index).ok().map(|volume| {
            let (_, nx, ny) = volume.dim();
            (nx, ny)
        })
    }) else {
        return Ok(());
    };

    for index in 0..store.len() {
        let descriptor = store.descriptor(index)?;
        config.validate_for_shape(&[descriptor.range.len(), nx, ny])?;
    }
    debug!("Configuration fits all {} chunks ({}x{} grid)", store.len(), nx, ny);
    Ok(())
}

fn write_chunk<S: ChunkStore + ?Sized>(
    store: &S,
    index: usize,
    name: &str,
    mask: Option<&LandMask>,
    config: &PipelineConfig,
    output_dir: &Path,
) -> Result<(PathBuf, PathBuf)> {
    let window = ChunkWindow::load(store, index)?;
    let codes = process_chunk(&window, mask, config)?;
    let raw_path = output_dir.join(output_file_name(name, &config.smoothing));
    let descriptor_path = write_quantized(&raw_path, &codes)?;
    Ok((raw_path, descriptor_path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boundary::BoundaryPolicy;
    use crate::chunk_store::MemoryChunkStore;
    use crate::volume::Volume;
    use tempfile::tempdir;

    fn uniform_store(chunks: usize, value: f32) -> MemoryChunkStore {
        let mut store = MemoryChunkStore::new();
        for i in 0..chunks {
            store.push(format!("chunk_{}", i), Volume::from_elem((8, 9, 9), value));
        }
        store
    }

    #[test]
    fn test_output_file_name() {
        let name = output_file_name("volume_timeWidth_0_552", &SmoothingConfig::new(2, 24));
        assert_eq!(name, "volume_timeWidth_0_552_smooth_s_2_t_24.raw");
    }

    #[test]
    fn test_uniform_chunk_quantizes_to_single_code() {
        let store = uniform_store(3, 250.0);
        let window = ChunkWindow::load(&store, 1).unwrap();
        let config = PipelineConfig {
            smoothing: SmoothingConfig::new(2, 4),
            ..PipelineConfig::default()
        };
        let codes = process_chunk(&window, None, &config).unwrap();
        assert!(codes.iter().all(|&c| c == 129));
    }

    #[test]
    fn test_mask_applied_after_correction() {
        let store = uniform_store(1, 250.0);
        let window = ChunkWindow::load(&store, 0).unwrap();
        let mut cells = ndarray::Array2::from_elem((9, 9), false);
        cells[[0, 0]] = true;
        cells[[4, 4]] = true;
        let mask = LandMask::new(cells);
        let config = PipelineConfig {
            smoothing: SmoothingConfig::new(1, 2),
            ..PipelineConfig::default()
        };
        let codes = process_chunk(&window, Some(&mask), &config).unwrap();
        for t in 0..8 {
            assert_eq!(codes[[t, 0, 0]], 1);
            assert_eq!(codes[[t, 4, 4]], 1);
            assert_eq!(codes[[t, 0, 1]], 129);
        }
    }

    #[test]
    fn test_run_batch_writes_every_chunk() {
        let dir = tempdir().unwrap();
        let store = uniform_store(3, 100.0);
        let config = PipelineConfig {
            smoothing: SmoothingConfig::new(1, 3),
            ..PipelineConfig::default()
        };
        let report = run_batch(&store, None, &config, dir.path()).unwrap();
        assert!(report.is_complete());
        assert_eq!(report.written.len(), 3);
        for output in &report.written {
            assert!(output.raw_path.exists());
            assert!(output.descriptor_path.exists());
            assert_eq!(fs::metadata(&output.raw_path).unwrap().len(), 8 * 9 * 9);
        }
        assert!(report.finished >= report.started);
        assert!(report.to_string().contains("3 written"));
    }

    #[test]
    fn test_run_batch_skips_mismatched_chunk() {
        let dir = tempdir().unwrap();
        let mut store = uniform_store(2, 100.0);
        store.push("odd_one", Volume::from_elem((8, 7, 9), 100.0));
        let config = PipelineConfig {
            smoothing: SmoothingConfig::new(1, 3),
            ..PipelineConfig::default()
        };
        let report = run_batch(&store, None, &config, dir.path()).unwrap();
        // chunk_1 needs the mismatched chunk as its next neighbour
        let skipped: Vec<_> = report.skipped.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(skipped, vec!["chunk_1", "odd_one"]);
        assert_eq!(report.written.len(), 1);
    }

    #[test]
    fn test_run_batch_aborts_on_oversized_width() {
        let dir = tempdir().unwrap();
        let store = uniform_store(2, 100.0);
        let mut config = PipelineConfig {
            smoothing: SmoothingConfig::new(1, 3),
            ..PipelineConfig::default()
        };
        config.set_boundary_policy(Some(BoundaryPolicy::GradientZero { width: 4 }));
        let err = run_batch(&store, None, &config, dir.path()).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_short_trailing_chunk_fails_before_any_output() {
        let dir = tempdir().unwrap();
        let mut store = MemoryChunkStore::new();
        store.push("a", Volume::from_elem((10, 9, 9), 100.0));
        store.push("b", Volume::from_elem((10, 9, 9), 100.0));
        store.push("c", Volume::from_elem((5, 9, 9), 100.0));
        let config = PipelineConfig {
            smoothing: SmoothingConfig::new(1, 2),
            ..PipelineConfig::default()
        };

        let err = run_batch(&store, None, &config, dir.path()).unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("[5, 9, 9]"));
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_shape_check_without_loadable_chunks() {
        let store = MemoryChunkStore::new();
        assert!(validate_chunk_shapes(&store, &PipelineConfig::default()).is_ok());
    }
}
