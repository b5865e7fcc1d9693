//! Chunk Store Adapter
//!
//! Exposes one fixed-shape volume per time chunk together with the chunk's
//! immediate neighbours. Chunks are addressed by their position in time order;
//! whether a neighbour is *expected* is decided by that position alone, so a gap
//! in the middle of a sequence is never mistaken for a legitimate sequence edge.

use crate::errors::{NeighborSide, OceanVolError, Result};
use crate::volume::{ChunkRecord, TimeRange, Volume};
use log::{debug, info};
use std::fs;
use std::path::{Path, PathBuf};

/// Token that precedes the `<start>_<end>` range in chunk file names
pub const TIME_RANGE_TOKEN: &str = "timeWidth_";

/// Name and time coverage of one stored chunk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkDescriptor {
    pub name: String,
    pub range: TimeRange,
    pub path: Option<PathBuf>,
}

/// Position of a chunk within its sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkPosition {
    pub index: usize,
    pub count: usize,
}

impl ChunkPosition {
    pub fn new(index: usize, count: usize) -> Self {
        Self { index, count }
    }

    /// A lone chunk, with no neighbour on either side
    pub fn single() -> Self {
        Self { index: 0, count: 1 }
    }

    pub fn is_first(&self) -> bool {
        self.index == 0
    }

    pub fn is_last(&self) -> bool {
        self.index + 1 >= self.count
    }

    /// Whether the sequence has a chunk on `side` of this one
    pub fn expects(&self, side: NeighborSide) -> bool {
        match side {
            NeighborSide::Previous => !self.is_first(),
            NeighborSide::Next => !self.is_last(),
        }
    }
}

/// Source of time-ordered chunk volumes
pub trait ChunkStore {
    /// Number of chunks in the sequence
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Descriptor of the chunk at `index`
    fn descriptor(&self, index: usize) -> Result<&ChunkDescriptor>;

    /// Load the chunk at `index` as a `(t, x, y)` volume
    fn load(&self, index: usize) -> Result<Volume>;
}

fn check_index(index: usize, len: usize) -> Result<()> {
    if index >= len {
        return Err(OceanVolError::ChunkIndexOutOfRange { index, len });
    }
    Ok(())
}

/// Chunk store backed by a directory of JSON chunk records
#[derive(Debug, Clone)]
pub struct JsonChunkStore {
    chunks: Vec<ChunkDescriptor>,
}

impl JsonChunkStore {
    /// Discover chunk files in `dir`, ordered by their time range
    ///
    /// Only `*.json` files whose name carries a `timeWidth_<start>_<end>` range
    /// take part. The ranges must tile the time axis without gaps or overlaps.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be read or the ranges are not
    /// contiguous.
    pub fn discover(dir: &Path) -> Result<Self> {
        let mut paths = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
                paths.push(path);
            }
        }
        let store = Self::from_paths(paths)?;
        info!(
            "Discovered {} chunk(s) in {}",
            store.chunks.len(),
            dir.display()
        );
        Ok(store)
    }

    /// Build a store from explicit file paths
    pub fn from_paths<I>(paths: I) -> Result<Self>
    where
        I: IntoIterator<Item = PathBuf>,
    {
        let mut chunks = Vec::new();
        for path in paths {
            let Some(name) = path.file_stem().and_then(|s| s.to_str()).map(str::to_string) else {
                continue;
            };
            match parse_time_range(&name) {
                Some(range) => chunks.push(ChunkDescriptor {
                    name,
                    range,
                    path: Some(path),
                }),
                None => debug!("Ignoring {} (no {} range)", path.display(), TIME_RANGE_TOKEN),
            }
        }

        chunks.sort_by_key(|c| c.range);
        validate_contiguous(&chunks)?;
        Ok(Self { chunks })
    }

    pub fn descriptors(&self) -> &[ChunkDescriptor] {
        &self.chunks
    }
}

impl ChunkStore for JsonChunkStore {
    fn len(&self) -> usize {
        self.chunks.len()
    }

    fn descriptor(&self, index: usize) -> Result<&ChunkDescriptor> {
        check_index(index, self.chunks.len())?;
        Ok(&self.chunks[index])
    }

    fn load(&self, index: usize) -> Result<Volume> {
        let descriptor = self.descriptor(index)?;
        let path = descriptor
            .path
            .as_deref()
            .ok_or_else(|| OceanVolError::Descriptor(format!("chunk '{}' has no path", descriptor.name)))?;
        debug!("Loading chunk {} from {}", index, path.display());
        let volume = ChunkRecord::from_json_file(path)?.into_volume()?;

        let t_len = volume.dim().0;
        if t_len != descriptor.range.len() {
            return Err(OceanVolError::shape_mismatch(
                format!("time extent of chunk '{}'", descriptor.name),
                &[descriptor.range.len()],
                &[t_len],
            ));
        }
        Ok(volume)
    }
}

/// Chunk store holding volumes in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryChunkStore {
    chunks: Vec<(ChunkDescriptor, Volume)>,
}

impl MemoryChunkStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a volume; its time range continues from the previous chunk
    pub fn push(&mut self, name: impl Into<String>, volume: Volume) {
        let start = self.chunks.last().map_or(0, |(d, _)| d.range.end);
        let range = TimeRange::new(start, start + volume.dim().0);
        self.chunks.push((
            ChunkDescriptor {
                name: name.into(),
                range,
                path: None,
            },
            volume,
        ));
    }
}

impl ChunkStore for MemoryChunkStore {
    fn len(&self) -> usize {
        self.chunks.len()
    }

    fn descriptor(&self, index: usize) -> Result<&ChunkDescriptor> {
        check_index(index, self.chunks.len())?;
        Ok(&self.chunks[index].0)
    }

    fn load(&self, index: usize) -> Result<Volume> {
        check_index(index, self.chunks.len())?;
        Ok(self.chunks[index].1.clone())
    }
}

/// A chunk together with the neighbours its position calls for
#[derive(Debug, Clone)]
pub struct ChunkWindow {
    pub position: ChunkPosition,
    pub current: Volume,
    pub prev: Option<Volume>,
    pub next: Option<Volume>,
}

impl ChunkWindow {
    /// Load chunk `index` and each neighbour its position requires
    ///
    /// # Errors
    ///
    /// Fails if the chunk or a required neighbour cannot be loaded.
    pub fn load<S: ChunkStore + ?Sized>(store: &S, index: usize) -> Result<Self> {
        let position = ChunkPosition::new(index, store.len());
        check_index(index, position.count)?;

        let current = store.load(index)?;
        let prev = if position.expects(NeighborSide::Previous) {
            Some(store.load(index - 1)?)
        } else {
            None
        };
        let next = if position.expects(NeighborSide::Next) {
            Some(store.load(index + 1)?)
        } else {
            None
        };

        Ok(Self {
            position,
            current,
            prev,
            next,
        })
    }
}

/// Extract `<start>_<end>` following the `timeWidth_` token of a file stem
pub fn parse_time_range(name: &str) -> Option<TimeRange> {
    let rest = &name[name.find(TIME_RANGE_TOKEN)? + TIME_RANGE_TOKEN.len()..];
    let mut parts = rest.splitn(3, '_');
    let start = parts.next()?.parse::<usize>().ok()?;
    let end_part = parts.next()?;
    let digits: String = end_part.chars().take_while(char::is_ascii_digit).collect();
    let end = digits.parse::<usize>().ok()?;
    (end > start).then(|| TimeRange::new(start, end))
}

fn validate_contiguous(chunks: &[ChunkDescriptor]) -> Result<()> {
    for pair in chunks.windows(2) {
        if !pair[0].range.is_followed_by(&pair[1].range) {
            return Err(OceanVolError::ChunkGap {
                previous_end: pair[0].range.end,
                next_start: pair[1].range.start,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    #[test]
    fn test_parse_time_range() {
        let name = "volume_linear_timeWidth_552_1104_definition_175_175_expand_ratio_2";
        assert_eq!(parse_time_range(name), Some(TimeRange::new(552, 1104)));
        assert_eq!(parse_time_range("chunk_timeWidth_0_10"), Some(TimeRange::new(0, 10)));
        assert_eq!(parse_time_range("no_range_here"), None);
        assert_eq!(parse_time_range("timeWidth_10_10"), None);
    }

    #[test]
    fn test_position_edges() {
        let first = ChunkPosition::new(0, 3);
        assert!(!first.expects(NeighborSide::Previous));
        assert!(first.expects(NeighborSide::Next));

        let last = ChunkPosition::new(2, 3);
        assert!(last.expects(NeighborSide::Previous));
        assert!(!last.expects(NeighborSide::Next));

        let only = ChunkPosition::single();
        assert!(only.is_first() && only.is_last());
    }

    #[test]
    fn test_contiguity_rejects_gap() {
        let paths = vec![
            PathBuf::from("a_timeWidth_0_10.json"),
            PathBuf::from("a_timeWidth_20_30.json"),
        ];
        match JsonChunkStore::from_paths(paths) {
            Err(OceanVolError::ChunkGap {
                previous_end,
                next_start,
            }) => {
                assert_eq!(previous_end, 10);
                assert_eq!(next_start, 20);
            }
            other => panic!("Expected ChunkGap, got {:?}", other),
        }
    }

    #[test]
    fn test_from_paths_orders_by_time() {
        let paths = vec![
            PathBuf::from("a_timeWidth_10_20.json"),
            PathBuf::from("notes.json"),
            PathBuf::from("a_timeWidth_0_10.json"),
        ];
        let store = JsonChunkStore::from_paths(paths).unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.descriptor(0).unwrap().range, TimeRange::new(0, 10));
        assert_eq!(store.descriptor(1).unwrap().name, "a_timeWidth_10_20");
    }

    #[test]
    fn test_window_loads_only_expected_neighbours() {
        let mut store = MemoryChunkStore::new();
        for v in [1.0, 2.0, 3.0] {
            store.push(format!("c{v}"), Array3::from_elem((2, 2, 2), v));
        }

        let first = ChunkWindow::load(&store, 0).unwrap();
        assert!(first.prev.is_none());
        assert_eq!(first.next.as_ref().unwrap()[[0, 0, 0]], 2.0);

        let middle = ChunkWindow::load(&store, 1).unwrap();
        assert!(middle.prev.is_some() && middle.next.is_some());

        assert!(matches!(
            ChunkWindow::load(&store, 3),
            Err(OceanVolError::ChunkIndexOutOfRange { index: 3, len: 3 })
        ));
    }
}
