//! Defines command-line interface options using `clap` for the oceanvol application.

use crate::boundary::BoundaryPolicy;
use crate::config::PipelineConfig;
use crate::errors::{OceanVolError, Result};
use crate::mask::MaskConfig;
use clap::Parser;
use std::path::PathBuf;

/// Smooth, boundary-correct, land-clip and quantize chunked ocean volumes
#[derive(Parser, Debug)]
#[command(
    name = "oceanvol",
    version,
    about = "Prepares chunked ocean time series as 8-bit volumes for rendering"
)]
pub struct Args {
    /// Directory holding `*timeWidth_<start>_<end>*.json` chunk files
    #[arg(short, long, required_unless_present = "inspect")]
    pub input_dir: Option<PathBuf>,

    /// Directory the `.raw` volumes and `.ini` descriptors are written to
    #[arg(short, long, required_unless_present = "inspect")]
    pub output_dir: Option<PathBuf>,

    /// JSON pipeline configuration; flags below override its fields
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Half-width of the smoothing window along x and y
    #[arg(long)]
    pub spatial_radius: Option<usize>,

    /// Half-width of the smoothing window along time
    #[arg(long)]
    pub temporal_radius: Option<usize>,

    /// Boundary policy: gradient_zero, blurred_fade, mirror, selective or none
    #[arg(long)]
    pub boundary_policy: Option<String>,

    /// Shell or fade width of the boundary policy, in voxels
    #[arg(long)]
    pub boundary_width: Option<usize>,

    /// Value written into land cells before quantization
    #[arg(long)]
    pub clip_sentinel: Option<f32>,

    /// GeoJSON boundary polygons used to build the land mask
    #[arg(long)]
    pub mask_boundary: Option<PathBuf>,

    /// GeoJSON whose bounds define the grid span of the mask
    #[arg(long, requires = "mask_boundary")]
    pub mask_grid_bounds: Option<PathBuf>,

    /// Treat cells outside the boundary polygons as land
    #[arg(long, default_value_t = false, requires = "mask_boundary")]
    pub mask_invert: bool,

    /// Number of threads to use for parallel processing. Defaults to number of CPU cores.
    #[arg(short = 't', long)]
    pub threads: Option<usize>,

    /// Print statistics of an existing volume given its `.ini` descriptor, then exit
    #[arg(long)]
    pub inspect: Option<PathBuf>,

    /// Number of outer layers examined by `--inspect`
    #[arg(long, default_value_t = 3)]
    pub inspect_layers: usize,

    /// Enable verbose output.
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl Args {
    /// Load the configuration file, if any, and apply flag overrides
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read, a policy name is unknown, or the
    /// resulting configuration does not validate.
    pub fn pipeline_config(&self) -> Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::from_json_file(path)?,
            None => PipelineConfig::default(),
        };

        if let Some(r) = self.spatial_radius {
            config.smoothing.spatial_radius = r;
        }
        if let Some(r) = self.temporal_radius {
            config.smoothing.temporal_radius = r;
        }

        if let Some(name) = &self.boundary_policy {
            let policy = if name.eq_ignore_ascii_case("none") {
                None
            } else {
                Some(name.parse::<BoundaryPolicy>()?)
            };
            config.set_boundary_policy(policy);
        }
        if let Some(width) = self.boundary_width {
            let policy = config.boundary_policy()?.ok_or_else(|| {
                OceanVolError::InvalidConfiguration(
                    "--boundary-width given but boundary correction is disabled".to_string(),
                )
            })?;
            config.set_boundary_policy(Some(policy.with_width(width)));
        }

        if let Some(sentinel) = self.clip_sentinel {
            config.clip_sentinel = sentinel;
            config.quantizer.masked_value = Some(sentinel);
        }

        if let Some(boundary) = &self.mask_boundary {
            let mut mask = MaskConfig::new(boundary);
            mask.grid_bounds = self.mask_grid_bounds.clone();
            mask.invert = self.mask_invert;
            config.mask = Some(mask);
        }

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("oceanvol").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_overrides() {
        let args = parse(&[
            "-i",
            "in",
            "-o",
            "out",
            "--temporal-radius",
            "6",
            "--boundary-policy",
            "mirror",
            "--boundary-width",
            "2",
            "--clip-sentinel",
            "2.5",
        ]);
        let config = args.pipeline_config().unwrap();
        assert_eq!(config.smoothing.temporal_radius, 6);
        assert_eq!(config.smoothing.spatial_radius, 2);
        assert_eq!(
            config.boundary_policy().unwrap(),
            Some(BoundaryPolicy::Mirror { width: 2 })
        );
        assert_eq!(config.clip_sentinel, 2.5);
        assert_eq!(config.quantizer.masked_value, Some(2.5));
    }

    #[test]
    fn test_policy_none_and_unknown() {
        let config = parse(&["-i", "in", "-o", "out", "--boundary-policy", "none"])
            .pipeline_config()
            .unwrap();
        assert_eq!(config.boundary_policy().unwrap(), None);

        let err = parse(&["-i", "in", "-o", "out", "--boundary-policy", "blur"])
            .pipeline_config()
            .unwrap_err();
        assert!(matches!(err, OceanVolError::UnknownPolicy(_)));
    }

    #[test]
    fn test_inspect_needs_no_directories() {
        let args = parse(&["--inspect", "volume.raw.ini"]);
        assert!(args.input_dir.is_none());
        assert!(Args::try_parse_from(["oceanvol"]).is_err());
    }
}
