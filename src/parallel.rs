//! Parallel processing configuration and management
//!
//! Smoothing, blurring and mask rasterization run on Rayon's global pool. The
//! pool size only changes how fast a chunk is processed, never its result.

use crate::errors::{OceanVolError, Result};
use log::info;
use rayon::ThreadPoolBuilder;
use std::fmt;

/// Configuration for parallel processing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ParallelConfig {
    /// `None` keeps Rayon's default sizing
    pub num_threads: Option<usize>,
}

impl ParallelConfig {
    pub fn new(num_threads: Option<usize>) -> Self {
        Self { num_threads }
    }

    /// Set up the global Rayon thread pool with the specified configuration
    ///
    /// # Errors
    ///
    /// Returns `ThreadPool` if the thread count is zero or the global pool was
    /// already initialized.
    pub fn setup_global_pool(&self) -> Result<()> {
        if let Some(num_threads) = self.num_threads {
            if num_threads == 0 {
                return Err(OceanVolError::ThreadPool(
                    "thread count must be at least 1".to_string(),
                ));
            }
            ThreadPoolBuilder::new()
                .num_threads(num_threads)
                .build_global()
                .map_err(|e| {
                    OceanVolError::ThreadPool(format!(
                        "Failed to initialize thread pool with {} threads: {}",
                        num_threads, e
                    ))
                })?;

            info!("Configured parallel processing with {} threads", num_threads);
        } else {
            info!("Using default thread pool configuration");
        }

        Ok(())
    }

    /// Get the current number of threads being used
    pub fn current_threads(&self) -> usize {
        rayon::current_num_threads()
    }

    /// Create a configuration that uses all available CPU cores
    pub fn all_cores() -> Self {
        Self {
            num_threads: Some(num_cpus::get()),
        }
    }

    pub fn with_threads(num_threads: usize) -> Self {
        Self {
            num_threads: Some(num_threads),
        }
    }
}

/// Get information about the current parallel configuration
pub fn get_parallel_info() -> ParallelInfo {
    ParallelInfo {
        current_threads: rayon::current_num_threads(),
        available_cores: num_cpus::get(),
        available_parallelism: std::thread::available_parallelism()
            .map(|p| p.get())
            .unwrap_or(1),
    }
}

/// Information about the parallel processing environment
#[derive(Debug, Clone, Copy)]
pub struct ParallelInfo {
    pub current_threads: usize,
    pub available_cores: usize,
    pub available_parallelism: usize,
}

impl fmt::Display for ParallelInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "📊 Parallel Processing Information:")?;
        writeln!(f, "   Current threads: {}", self.current_threads)?;
        writeln!(f, "   Available CPU cores: {}", self.available_cores)?;
        write!(f, "   Available parallelism: {}", self.available_parallelism)
    }
}
