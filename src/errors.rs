//! Centralized error handling for oceanvol
//!
//! Every stage of the pipeline reports failures through [`OceanVolError`] so that
//! callers can tell configuration problems apart from data-integrity problems
//! (shape mismatches, gaps in the chunk sequence) and plain I/O failures.

use thiserror::Error;

/// Which neighbour of a chunk is being talked about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NeighborSide {
    /// The chunk immediately before in time
    Previous,
    /// The chunk immediately after in time
    Next,
}

impl std::fmt::Display for NeighborSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NeighborSide::Previous => write!(f, "previous"),
            NeighborSide::Next => write!(f, "next"),
        }
    }
}

/// Main error type for oceanvol operations
#[derive(Debug, Error)]
pub enum OceanVolError {
    /// Configuration rejected before any chunk was processed
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Boundary policy name outside the supported set
    #[error("Unknown boundary policy '{0}' (expected gradient_zero, blurred_fade, mirror or selective)")]
    UnknownPolicy(String),

    /// Two arrays that must share extents do not
    #[error("Shape mismatch in {context}: expected {expected:?}, found {found:?}")]
    ShapeMismatch {
        context: String,
        expected: Vec<usize>,
        found: Vec<usize>,
    },

    /// A chunk in the middle of the sequence is missing one of its neighbours
    #[error("Chunk {index} is not at a sequence edge but its {side} neighbour is missing")]
    MissingNeighbor { index: usize, side: NeighborSide },

    /// The discovered chunk files do not tile the time axis contiguously
    #[error("Gap or overlap in chunk sequence: previous chunk ends at {previous_end}, next starts at {next_start}")]
    ChunkGap { previous_end: usize, next_start: usize },

    /// Chunk index outside the store
    #[error("Chunk index {index} out of range for store with {len} chunks")]
    ChunkIndexOutOfRange { index: usize, len: usize },

    /// Malformed volume descriptor
    #[error("Invalid volume descriptor: {0}")]
    Descriptor(String),

    /// Flat sample count disagrees with the declared dimensions
    #[error("Sample count mismatch: expected {expected}, found {found}")]
    SizeMismatch { expected: usize, found: usize },

    /// Boundary polygon could not be interpreted
    #[error("Geometry error: {0}")]
    Geometry(String),

    /// Thread pool configuration error
    #[error("Thread pool error: {0}")]
    ThreadPool(String),

    /// I/O operation errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON decoding errors (chunk records, GeoJSON, configuration)
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Array shape or dimension error
    #[error("Array error: {0}")]
    Array(#[from] ndarray::ShapeError),
}

impl OceanVolError {
    /// Shorthand for building a [`OceanVolError::ShapeMismatch`]
    pub fn shape_mismatch(context: impl Into<String>, expected: &[usize], found: &[usize]) -> Self {
        OceanVolError::ShapeMismatch {
            context: context.into(),
            expected: expected.to_vec(),
            found: found.to_vec(),
        }
    }

    /// True for errors that must stop a batch before it starts
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            OceanVolError::InvalidConfiguration(_) | OceanVolError::UnknownPolicy(_)
        )
    }
}

/// Result type alias for oceanvol operations
pub type Result<T> = std::result::Result<T, OceanVolError>;
