//! Creates a small synthetic chunk series for trying out oceanvol.
//!
//! Writes three chunk files of 24 time slices on a 40 x 40 grid into
//! `test_chunks/`, named with the `timeWidth_<start>_<end>` scheme the chunk
//! store discovers. Values drift smoothly in time and space, with a block of
//! zeros in one corner standing in for land. Run the pipeline on them with:
//!
//! ```text
//! cargo run -- -i test_chunks -o test_output --temporal-radius 6
//! ```

use ndarray::Array3;
use oceanvol::ChunkRecord;
use std::fs;
use std::path::Path;

const CHUNKS: usize = 3;
const SLICES: usize = 24;
const GRID: usize = 40;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let output_dir = Path::new("test_chunks");

    println!("🔨 Creating test chunks in: {}", output_dir.display());

    // Start from an empty directory
    if output_dir.exists() {
        fs::remove_dir_all(output_dir)?;
    }
    fs::create_dir_all(output_dir)?;

    for chunk in 0..CHUNKS {
        let start = chunk * SLICES;
        let end = start + SLICES;

        let volume = Array3::from_shape_fn((SLICES, GRID, GRID), |(t, x, y)| {
            if x < 8 && y < 8 {
                return 0.0;
            }
            let time = (start + t) as f32 / (CHUNKS * SLICES) as f32;
            let phase = x as f32 * 0.2 + y as f32 * 0.15;
            250.0 + 200.0 * (phase + time * std::f32::consts::TAU).sin()
        });

        let path = output_dir.join(format!("salinity_timeWidth_{}_{}.json", start, end));
        fs::write(&path, serde_json::to_string(&ChunkRecord::from_volume(&volume))?)?;
        println!("   ✅ {} ({} x {} x {})", path.display(), SLICES, GRID, GRID);
    }

    println!("\n📊 Wrote {} chunks covering time 0..{}", CHUNKS, CHUNKS * SLICES);
    Ok(())
}
