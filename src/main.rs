//! Entry point for the oceanvol application.
//! Handles CLI parsing, chunk discovery, and dispatches either a batch run or a volume inspection.

use clap::Parser;
use log::{error, LevelFilter};
use oceanvol::cli::Args;
use oceanvol::prelude::*;
use oceanvol::{code_census, diagnose_boundary, get_parallel_info, prepare_mask, RawVolume};
use std::path::Path;
use std::process::ExitCode;

fn main() -> ExitCode {
    // Parse command-line arguments
    let args = Args::parse();

    env_logger::Builder::new()
        .filter_level(if args.verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        })
        .parse_default_env()
        .init();

    println!(
        r#"
------------------------------------------------------------------
                          o c e a n v o l
           chunked ocean volume smoothing and quantization
------------------------------------------------------------------
"#
    );

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<()> {
    if let Some(descriptor) = &args.inspect {
        return inspect(descriptor, args.inspect_layers);
    }

    // Resolve the configuration before touching any chunk
    let config = args.pipeline_config()?;

    let parallel = match args.threads {
        Some(n) => ParallelConfig::with_threads(n),
        None => ParallelConfig::all_cores(),
    };
    parallel.setup_global_pool()?;
    if args.verbose {
        println!("{}", get_parallel_info());
    }

    let (Some(input_dir), Some(output_dir)) = (&args.input_dir, &args.output_dir) else {
        return Err(OceanVolError::InvalidConfiguration(
            "both --input-dir and --output-dir are required".to_string(),
        ));
    };

    let store = JsonChunkStore::discover(input_dir)?;

    let mask = prepare_mask(&store, &config)?;
    let report = run_batch(&store, mask.as_ref(), &config, output_dir)?;
    println!("{}", report);

    if report.is_complete() {
        println!("✅ Saved {} volumes to {}", report.written.len(), output_dir.display());
    } else {
        println!(
            "⚠️  {} of {} chunks were skipped",
            report.skipped.len(),
            report.total()
        );
    }
    Ok(())
}

fn inspect(descriptor: &Path, layers: usize) -> Result<()> {
    let raw = RawVolume::read(descriptor)?;
    let volume = raw.to_quantized()?;
    println!("Successfully opened volume: {}", raw.path.display());
    println!(
        "   Dimensions (t, x, y): {} x {} x {}",
        raw.descriptor.dimz, raw.descriptor.dimx, raw.descriptor.dimy
    );
    print!("{}", code_census(&volume));
    print!("{}", diagnose_boundary(&volume, layers));
    Ok(())
}
