//! Quantizer
//!
//! Maps a smoothed, corrected and clipped volume onto 8-bit codes. The affine
//! range lands on `offset..=offset + scale` (5..=254 with the defaults), leaving
//! the low codes for voids and masked cells and 255 as headroom.

use crate::errors::{OceanVolError, Result};
use crate::volume::Volume;
use ndarray::Array3;
use serde::{Deserialize, Serialize};

/// Quantized volume indexed `(t, x, y)`
pub type QuantizedVolume = Array3<u8>;

/// Code reserved for true data voids
pub const VOID_CODE: u8 = 0;

/// Parameters of the value-to-code mapping
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuantizerConfig {
    /// Value mapped to `offset`
    pub min_value: f32,
    /// Value mapped to `offset + scale`
    pub max_value: f32,
    pub scale: f32,
    pub offset: f32,
    /// Code for samples exactly equal to zero
    pub zero_code: u8,
    /// Sentinel written by the land clipper, if any
    pub masked_value: Option<f32>,
    /// Code for samples equal to `masked_value`
    pub masked_code: u8,
}

impl Default for QuantizerConfig {
    fn default() -> Self {
        Self {
            min_value: 1.0,
            max_value: 500.0,
            scale: 249.0,
            offset: 5.0,
            zero_code: 1,
            masked_value: Some(1.0),
            masked_code: 1,
        }
    }
}

impl QuantizerConfig {
    pub fn with_range(min_value: f32, max_value: f32) -> Self {
        Self {
            min_value,
            max_value,
            ..Self::default()
        }
    }

    /// Reject degenerate or out-of-range mappings
    pub fn validate(&self) -> Result<()> {
        if !self.min_value.is_finite() || !self.max_value.is_finite() || self.max_value <= self.min_value {
            return Err(OceanVolError::InvalidConfiguration(format!(
                "quantizer range must satisfy min < max, got [{}, {}]",
                self.min_value, self.max_value
            )));
        }
        if !(self.scale > 0.0 && self.offset >= 0.0 && self.offset + self.scale <= 255.0) {
            return Err(OceanVolError::InvalidConfiguration(format!(
                "quantizer codes offset {} + scale {} must fit in 0..=255",
                self.offset, self.scale
            )));
        }
        Ok(())
    }

    /// Code for a single sample
    ///
    /// Finite values outside `[min_value, max_value]` saturate at `offset` and
    /// `offset + scale`, so they never land on a reserved code. Ties round to
    /// the even code.
    pub fn code(&self, value: f32) -> u8 {
        if self.masked_value == Some(value) {
            return self.masked_code;
        }
        if value == 0.0 {
            return self.zero_code;
        }
        if value.is_nan() {
            return VOID_CODE;
        }
        let normalized = f64::from(value - self.min_value) / f64::from(self.max_value - self.min_value);
        let mapped = (normalized * f64::from(self.scale) + f64::from(self.offset)).round_ties_even();
        mapped.clamp(f64::from(self.offset), f64::from(self.offset + self.scale)) as u8
    }
}

/// Quantize a whole volume
///
/// # Errors
///
/// Returns `InvalidConfiguration` if the mapping is degenerate.
pub fn quantize(volume: &Volume, config: &QuantizerConfig) -> Result<QuantizedVolume> {
    config.validate()?;
    Ok(volume.mapv(|value| config.code(value)))
}
