//! Boundary Corrector
//!
//! A fixed-window mean averages fewer real voxels near the six faces of a volume
//! and, once land is clipped, a ring of low values appears along the outer shell.
//! The corrector rewrites that shell with one of a closed set of policies before
//! any land clipping happens.
//!
//! # Organization
//!
//! - [`shell`]: gradient-zero collapse and mirror reflection, one axis at a time
//! - [`fade`]: blurred fade-out and the selective edge blend
//! - [`gaussian`]: separable 3D gaussian blur

pub mod fade;
pub mod gaussian;
pub mod shell;

use crate::errors::{OceanVolError, Result};
use crate::volume::Volume;
use log::debug;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Axes of a `(t, x, y)` volume in the order faces are corrected
pub const VOLUME_AXES: [usize; 3] = [0, 1, 2];

/// Boundary correction policy and its parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BoundaryPolicy {
    /// Every shell layer takes the value of the layer `width` voxels inward
    GradientZero { width: usize },
    /// Blend towards a gaussian-blurred copy within `fade_width` of each face
    BlurredFade { sigma: f64, fade_width: usize },
    /// Shell layers are the mirror image of the interior across the shell's inner edge
    Mirror { width: usize },
    /// Gradient-zero result blended in by distance to the nearest face
    Selective { width: usize, fade_time_axis: bool },
}

impl BoundaryPolicy {
    pub const GRADIENT_ZERO: &'static str = "gradient_zero";
    pub const BLURRED_FADE: &'static str = "blurred_fade";
    pub const MIRROR: &'static str = "mirror";
    pub const SELECTIVE: &'static str = "selective";

    /// Canonical policy name
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::GradientZero { .. } => Self::GRADIENT_ZERO,
            Self::BlurredFade { .. } => Self::BLURRED_FADE,
            Self::Mirror { .. } => Self::MIRROR,
            Self::Selective { .. } => Self::SELECTIVE,
        }
    }

    /// Shell or fade width in voxels
    #[must_use]
    pub const fn width(&self) -> usize {
        match *self {
            Self::GradientZero { width } | Self::Mirror { width } | Self::Selective { width, .. } => width,
            Self::BlurredFade { fade_width, .. } => fade_width,
        }
    }

    /// Same policy with a different shell or fade width
    #[must_use]
    pub fn with_width(self, width: usize) -> Self {
        match self {
            Self::GradientZero { .. } => Self::GradientZero { width },
            Self::Mirror { .. } => Self::Mirror { width },
            Self::BlurredFade { sigma, .. } => Self::BlurredFade {
                sigma,
                fade_width: width,
            },
            Self::Selective { fade_time_axis, .. } => Self::Selective {
                width,
                fade_time_axis,
            },
        }
    }

    /// Check parameters that do not depend on the volume
    pub fn validate(&self) -> Result<()> {
        if self.width() == 0 {
            return Err(OceanVolError::InvalidConfiguration(format!(
                "{} width must be at least 1",
                self.name()
            )));
        }
        if let Self::BlurredFade { sigma, .. } = self {
            if !sigma.is_finite() || *sigma <= 0.0 {
                return Err(OceanVolError::InvalidConfiguration(format!(
                    "blurred_fade sigma must be positive, got {sigma}"
                )));
            }
        }
        Ok(())
    }

    /// Check that the width fits a volume of `shape`
    ///
    /// The width must be smaller than half of every axis extent.
    pub fn validate_for_shape(&self, shape: &[usize]) -> Result<()> {
        self.validate()?;
        let width = self.width();
        if let Some(&smallest) = shape.iter().min() {
            if 2 * width >= smallest {
                return Err(OceanVolError::InvalidConfiguration(format!(
                    "{} width {} must be less than half of the smallest axis extent {} (shape {:?})",
                    self.name(),
                    width,
                    smallest,
                    shape
                )));
            }
        }
        Ok(())
    }
}

impl FromStr for BoundaryPolicy {
    type Err = OceanVolError;

    /// Parse a policy name into the policy with its default parameters
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gradient_zero" | "gradient-zero" | "neumann" => Ok(Self::GradientZero { width: 3 }),
            "blurred_fade" | "blurred-fade" | "gaussian" => Ok(Self::BlurredFade {
                sigma: 1.5,
                fade_width: 5,
            }),
            "mirror" | "reflect" => Ok(Self::Mirror { width: 3 }),
            "selective" => Ok(Self::Selective {
                width: 3,
                fade_time_axis: false,
            }),
            _ => Err(OceanVolError::UnknownPolicy(s.to_string())),
        }
    }
}

impl fmt::Display for BoundaryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GradientZero { width } | Self::Mirror { width } => {
                write!(f, "{} (width {})", self.name(), width)
            }
            Self::BlurredFade { sigma, fade_width } => {
                write!(f, "{} (sigma {}, fade width {})", self.name(), sigma, fade_width)
            }
            Self::Selective {
                width,
                fade_time_axis,
            } => write!(
                f,
                "{} (width {}, time axis {})",
                self.name(),
                width,
                if *fade_time_axis { "faded" } else { "untouched" }
            ),
        }
    }
}

/// Serialized form of a boundary policy
///
/// Kept loose so that an unrecognised `policy` name surfaces as
/// [`OceanVolError::UnknownPolicy`] rather than as a JSON error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundarySpec {
    pub policy: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sigma: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fade_width: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fade_time_axis: Option<bool>,
}

impl BoundarySpec {
    /// Resolve into a policy, filling unspecified parameters with defaults
    pub fn to_policy(&self) -> Result<BoundaryPolicy> {
        let policy = match self.policy.parse::<BoundaryPolicy>()? {
            BoundaryPolicy::GradientZero { width } => BoundaryPolicy::GradientZero {
                width: self.width.unwrap_or(width),
            },
            BoundaryPolicy::Mirror { width } => BoundaryPolicy::Mirror {
                width: self.width.unwrap_or(width),
            },
            BoundaryPolicy::BlurredFade { sigma, fade_width } => BoundaryPolicy::BlurredFade {
                sigma: self.sigma.unwrap_or(sigma),
                fade_width: self.fade_width.or(self.width).unwrap_or(fade_width),
            },
            BoundaryPolicy::Selective {
                width,
                fade_time_axis,
            } => BoundaryPolicy::Selective {
                width: self.width.unwrap_or(width),
                fade_time_axis: self.fade_time_axis.unwrap_or(fade_time_axis),
            },
        };
        policy.validate()?;
        Ok(policy)
    }
}

impl From<BoundaryPolicy> for BoundarySpec {
    fn from(policy: BoundaryPolicy) -> Self {
        let mut spec = BoundarySpec {
            policy: policy.name().to_string(),
            width: None,
            sigma: None,
            fade_width: None,
            fade_time_axis: None,
        };
        match policy {
            BoundaryPolicy::GradientZero { width } | BoundaryPolicy::Mirror { width } => {
                spec.width = Some(width);
            }
            BoundaryPolicy::BlurredFade { sigma, fade_width } => {
                spec.sigma = Some(sigma);
                spec.fade_width = Some(fade_width);
            }
            BoundaryPolicy::Selective {
                width,
                fade_time_axis,
            } => {
                spec.width = Some(width);
                spec.fade_time_axis = Some(fade_time_axis);
            }
        }
        spec
    }
}

/// Apply a boundary policy, returning a corrected copy of the same shape
///
/// # Errors
///
/// Returns `InvalidConfiguration` if the policy's width does not fit the volume.
pub fn correct_boundary(volume: &Volume, policy: &BoundaryPolicy) -> Result<Volume> {
    policy.validate_for_shape(volume.shape())?;
    debug!("Correcting boundary of {:?} volume with {}", volume.dim(), policy);

    let corrected = match *policy {
        BoundaryPolicy::GradientZero { width } => shell::gradient_zero(volume, width),
        BoundaryPolicy::Mirror { width } => shell::mirror(volume, width),
        BoundaryPolicy::BlurredFade { sigma, fade_width } => {
            fade::blurred_fade(volume, sigma, fade_width)
        }
        BoundaryPolicy::Selective {
            width,
            fade_time_axis,
        } => fade::selective_blend(volume, width, fade_time_axis),
    };
    Ok(corrected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    #[test]
    fn test_parse_policy_names() {
        assert_eq!(
            "gradient_zero".parse::<BoundaryPolicy>().unwrap(),
            BoundaryPolicy::GradientZero { width: 3 }
        );
        assert_eq!("reflect".parse::<BoundaryPolicy>().unwrap().name(), "mirror");
        assert_eq!("Gaussian".parse::<BoundaryPolicy>().unwrap().name(), "blurred_fade");
        match "bilinear".parse::<BoundaryPolicy>() {
            Err(OceanVolError::UnknownPolicy(name)) => assert_eq!(name, "bilinear"),
            other => panic!("Expected UnknownPolicy, got {:?}", other),
        }
    }

    #[test]
    fn test_width_must_fit_volume() {
        let policy = BoundaryPolicy::GradientZero { width: 2 };
        assert!(policy.validate_for_shape(&[5, 5, 5]).is_ok());
        assert!(policy.validate_for_shape(&[10, 4, 9]).is_err());
        assert!(BoundaryPolicy::Mirror { width: 0 }.validate().is_err());
        assert!(BoundaryPolicy::BlurredFade {
            sigma: 0.0,
            fade_width: 2
        }
        .validate()
        .is_err());
    }

    #[test]
    fn test_spec_round_trip_and_unknown_policy() {
        let spec: BoundarySpec =
            serde_json::from_str(r#"{"policy": "blurred_fade", "sigma": 2.0}"#).unwrap();
        assert_eq!(
            spec.to_policy().unwrap(),
            BoundaryPolicy::BlurredFade {
                sigma: 2.0,
                fade_width: 5
            }
        );

        let back = BoundarySpec::from(BoundaryPolicy::Mirror { width: 2 });
        assert_eq!(back.to_policy().unwrap(), BoundaryPolicy::Mirror { width: 2 });

        let unknown = BoundarySpec {
            policy: "wrap".to_string(),
            width: Some(2),
            sigma: None,
            fade_width: None,
            fade_time_axis: None,
        };
        assert!(matches!(unknown.to_policy(), Err(OceanVolError::UnknownPolicy(_))));
    }

    #[test]
    fn test_every_policy_keeps_constant_volume() {
        let volume = Array3::from_elem((8, 9, 10), 42.0_f32);
        let policies = [
            BoundaryPolicy::GradientZero { width: 3 },
            BoundaryPolicy::BlurredFade {
                sigma: 1.5,
                fade_width: 3,
            },
            BoundaryPolicy::Mirror { width: 3 },
            BoundaryPolicy::Selective {
                width: 3,
                fade_time_axis: true,
            },
        ];
        for policy in policies {
            let corrected = correct_boundary(&volume, &policy).unwrap();
            assert_eq!(corrected.dim(), volume.dim());
            for value in corrected.iter() {
                assert!((value - 42.0).abs() < 1e-4, "{} changed a constant volume", policy);
            }
        }
    }

    #[test]
    fn test_correct_rejects_oversized_shell() {
        let volume = Array3::from_elem((4, 20, 20), 1.0_f32);
        let err = correct_boundary(&volume, &BoundaryPolicy::Mirror { width: 2 }).unwrap_err();
        assert!(matches!(err, OceanVolError::InvalidConfiguration(_)));
    }
}
