//! Pipeline configuration
//!
//! One JSON document carries every tunable of a run. All fields default, so an
//! empty object `{}` is a valid configuration:
//!
//! ```json
//! {
//!   "smoothing": { "spatial_radius": 2, "temporal_radius": 24 },
//!   "boundary": { "policy": "gradient_zero", "width": 3 },
//!   "clip_sentinel": 1.0,
//!   "quantizer": { "min_value": 1.0, "max_value": 500.0 },
//!   "mask": { "boundary": "region.geojson", "invert": false }
//! }
//! ```
//!
//! `"boundary": null` disables boundary correction.

use crate::boundary::{BoundaryPolicy, BoundarySpec};
use crate::errors::{OceanVolError, Result};
use crate::mask::MaskConfig;
use crate::quantize::QuantizerConfig;
use crate::smoothing::SmoothingConfig;
use log::debug;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Everything a batch run needs besides its input and output locations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub smoothing: SmoothingConfig,
    pub boundary: Option<BoundarySpec>,
    /// Value written into land cells by the clipper
    pub clip_sentinel: f32,
    pub quantizer: QuantizerConfig,
    pub mask: Option<MaskConfig>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            smoothing: SmoothingConfig::default(),
            boundary: Some(BoundaryPolicy::GradientZero { width: 3 }.into()),
            clip_sentinel: 1.0,
            quantizer: QuantizerConfig::default(),
            mask: None,
        }
    }
}

impl PipelineConfig {
    /// Read a JSON configuration file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid JSON, or the
    /// resulting configuration fails [`PipelineConfig::validate`].
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Write the configuration as pretty-printed JSON
    pub fn to_json_file(&self, path: &Path) -> Result<()> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Resolved boundary policy, `None` when correction is disabled
    pub fn boundary_policy(&self) -> Result<Option<BoundaryPolicy>> {
        self.boundary.as_ref().map(BoundarySpec::to_policy).transpose()
    }

    /// Replace the boundary policy; `None` disables correction
    pub fn set_boundary_policy(&mut self, policy: Option<BoundaryPolicy>) {
        self.boundary = policy.map(BoundarySpec::from);
    }

    /// Check every parameter that does not depend on chunk shape
    ///
    /// # Errors
    ///
    /// `UnknownPolicy` for an unrecognised boundary policy name and
    /// `InvalidConfiguration` for anything else out of range.
    pub fn validate(&self) -> Result<()> {
        self.smoothing.validate()?;
        self.boundary_policy()?;
        self.quantizer.validate()?;
        if !self.clip_sentinel.is_finite() {
            return Err(OceanVolError::InvalidConfiguration(format!(
                "clip sentinel must be finite, got {}",
                self.clip_sentinel
            )));
        }
        Ok(())
    }

    /// Check the boundary width against a chunk of `shape`
    pub fn validate_for_shape(&self, shape: &[usize]) -> Result<()> {
        self.validate()?;
        if let Some(policy) = self.boundary_policy()? {
            policy.validate_for_shape(shape)?;
        }
        Ok(())
    }
}
