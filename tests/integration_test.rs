use ndarray::Array3;
use oceanvol::chunk_store::{ChunkStore, JsonChunkStore};
use oceanvol::config::PipelineConfig;
use oceanvol::mask::{GridSpan, MaskConfig, Projection};
use oceanvol::pipeline::{prepare_mask, run_batch};
use oceanvol::raw_io::{RawVolume, VolumeDescriptor};
use oceanvol::smoothing::SmoothingConfig;
use oceanvol::volume::ChunkRecord;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

const SLICES: usize = 10;
const GRID: usize = 12;

fn write_chunk(dir: &Path, start: usize, value: f32) {
    let volume = Array3::from_elem((SLICES, GRID, GRID), value);
    let record = ChunkRecord::from_volume(&volume);
    let path = dir.join(format!("salinity_timeWidth_{}_{}.json", start, start + SLICES));
    fs::write(path, serde_json::to_string(&record).unwrap()).expect("Failed to write chunk");
}

fn three_chunk_dir(dir: &Path) {
    write_chunk(dir, 0, 10.0);
    write_chunk(dir, 10, 20.0);
    write_chunk(dir, 20, 30.0);
}

fn smoothing_only(spatial: usize, temporal: usize) -> PipelineConfig {
    let mut config = PipelineConfig {
        smoothing: SmoothingConfig::new(spatial, temporal),
        ..PipelineConfig::default()
    };
    config.set_boundary_policy(None);
    config
}

#[test]
fn test_three_chunk_series_end_to_end() {
    let input = tempdir().expect("Failed to create temp dir");
    let output = tempdir().expect("Failed to create temp dir");
    three_chunk_dir(input.path());

    let store = JsonChunkStore::discover(input.path()).expect("Failed to discover chunks");
    assert_eq!(store.len(), 3);

    let config = smoothing_only(1, 4);
    let report = run_batch(&store, None, &config, output.path()).expect("Batch failed");
    assert!(report.is_complete());
    assert_eq!(report.written.len(), 3);

    let read = |name: &str| {
        let descriptor = output.path().join(format!("{}_smooth_s_1_t_4.raw.ini", name));
        RawVolume::read(&descriptor)
            .expect("Failed to read output")
            .to_quantized()
            .unwrap()
    };
    let first = read("salinity_timeWidth_0_10");
    let middle = read("salinity_timeWidth_10_20");
    let last = read("salinity_timeWidth_20_30");

    // First slice of the first chunk only sees tens: mean 10
    assert_eq!(first[[0, 5, 5]], 9);
    // Last slice of the first chunk: five tens and four twenties
    assert_eq!(first[[9, 5, 5]], 12);
    // First slice of the middle chunk: four tens and five twenties, mean 140 / 9
    assert_eq!(middle[[0, 5, 5]], 12);
    // Away from both edges only twenties remain
    assert_eq!(middle[[5, 5, 5]], 14);
    assert_eq!(last[[9, 5, 5]], 19);
}

#[test]
fn test_output_descriptor_matches_chunk() {
    let input = tempdir().expect("Failed to create temp dir");
    let output = tempdir().expect("Failed to create temp dir");
    three_chunk_dir(input.path());

    let store = JsonChunkStore::discover(input.path()).unwrap();
    let report = run_batch(&store, None, &PipelineConfig::default(), output.path()).unwrap();

    let written = &report.written[1];
    assert_eq!(
        written.raw_path.file_name().unwrap().to_str().unwrap(),
        "salinity_timeWidth_10_20_smooth_s_2_t_24.raw"
    );
    let text = fs::read_to_string(&written.descriptor_path).unwrap();
    assert_eq!(text, "dimx:12 \ndimy:12 \ndimz:10 \nskip:0 \nformat:uint8");
    assert_eq!(
        VolumeDescriptor::parse(&text).unwrap().byte_len() as u64,
        fs::metadata(&written.raw_path).unwrap().len()
    );
}

#[test]
fn test_land_mask_clips_after_correction() {
    let input = tempdir().expect("Failed to create temp dir");
    let output = tempdir().expect("Failed to create temp dir");
    three_chunk_dir(input.path());

    let boundary = input.path().join("land.geojson");
    fs::write(
        &boundary,
        r#"{"type": "Feature", "properties": {}, "geometry": {"type": "Polygon",
            "coordinates": [[[-0.5, -0.5], [3.5, -0.5], [3.5, 3.5], [-0.5, 3.5], [-0.5, -0.5]]]}}"#,
    )
    .unwrap();

    let mut mask_config = MaskConfig::new(&boundary);
    mask_config.projection = Projection::None;
    mask_config.grid_span = Some(GridSpan::new(0.0, 0.0, (GRID - 1) as f64, (GRID - 1) as f64));

    let config = PipelineConfig {
        smoothing: SmoothingConfig::new(1, 4),
        mask: Some(mask_config),
        ..PipelineConfig::default()
    };

    let store = JsonChunkStore::discover(input.path()).unwrap();
    let mask = prepare_mask(&store, &config).unwrap().expect("Mask should be configured");
    assert_eq!(mask.land_count(), 16);

    let report = run_batch(&store, Some(&mask), &config, output.path()).unwrap();
    assert!(report.is_complete());

    let codes = RawVolume::read(&report.written[1].descriptor_path)
        .unwrap()
        .to_quantized()
        .unwrap();
    for t in 0..SLICES {
        for x in 0..GRID {
            for y in 0..GRID {
                if x < 4 && y < 4 {
                    assert_eq!(codes[[t, x, y]], 1, "land at ({}, {}, {})", t, x, y);
                } else {
                    assert!(codes[[t, x, y]] >= 5, "ocean at ({}, {}, {})", t, x, y);
                }
            }
        }
    }
}

#[test]
fn test_corrupt_chunk_is_skipped_and_reported() {
    let input = tempdir().expect("Failed to create temp dir");
    let output = tempdir().expect("Failed to create temp dir");
    three_chunk_dir(input.path());

    // Fourth chunk declares more samples than it holds
    let broken = input.path().join("salinity_timeWidth_30_40.json");
    fs::write(
        &broken,
        r#"{"data": [1.0, 2.0, 3.0], "xLength": 12, "yLength": 12, "zLength": 10}"#,
    )
    .unwrap();

    let store = JsonChunkStore::discover(input.path()).unwrap();
    assert_eq!(store.len(), 4);

    let report = run_batch(&store, None, &smoothing_only(1, 4), output.path()).unwrap();
    assert_eq!(report.written.len(), 2);

    // The third chunk needs the broken one as its next neighbour
    let skipped: Vec<usize> = report.skipped.iter().map(|s| s.index).collect();
    assert_eq!(skipped, vec![2, 3]);
    assert!(report.skipped[1].reason.contains("mismatch"));
    assert!(report.to_string().contains("2 skipped"));
}

#[test]
fn test_gap_in_sequence_is_rejected_at_discovery() {
    let input = tempdir().expect("Failed to create temp dir");
    write_chunk(input.path(), 0, 10.0);
    write_chunk(input.path(), 20, 30.0);

    let err = JsonChunkStore::discover(input.path()).unwrap_err();
    assert!(err.to_string().contains("Gap"));
}

#[test]
fn test_short_trailing_chunk_aborts_before_writing() {
    let input = tempdir().expect("Failed to create temp dir");
    let output = tempdir().expect("Failed to create temp dir");
    write_chunk(input.path(), 0, 10.0);
    write_chunk(input.path(), 10, 20.0);

    // Five slices cannot hold a width-3 shell on both sides
    let short = Array3::from_elem((5, GRID, GRID), 30.0);
    fs::write(
        input.path().join("salinity_timeWidth_20_25.json"),
        serde_json::to_string(&ChunkRecord::from_volume(&short)).unwrap(),
    )
    .unwrap();

    let store = JsonChunkStore::discover(input.path()).unwrap();
    assert_eq!(store.len(), 3);

    let volumes = output.path().join("volumes");
    let err = run_batch(&store, None, &PipelineConfig::default(), &volumes).unwrap_err();
    assert!(err.is_configuration());
    assert!(!volumes.exists());
}
