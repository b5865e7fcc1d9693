//! Inspection of quantized volumes
//!
//! Used to check a written volume for the low-value halo along its faces that
//! boundary correction is meant to remove, and to summarize how the 8-bit code
//! space is used.

use crate::quantize::{QuantizedVolume, VOID_CODE};
use ndarray::{s, ArrayView3, Axis};
use std::fmt;

/// A face whose mean is below this fraction of the interior mean is flagged
pub const HALO_RATIO: f64 = 0.8;

/// One of the six faces of a `(t, x, y)` volume
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Face {
    TimeStart,
    TimeEnd,
    XStart,
    XEnd,
    YStart,
    YEnd,
}

impl Face {
    pub const ALL: [Face; 6] = [
        Face::TimeStart,
        Face::TimeEnd,
        Face::XStart,
        Face::XEnd,
        Face::YStart,
        Face::YEnd,
    ];

    pub fn axis(self) -> usize {
        match self {
            Face::TimeStart | Face::TimeEnd => 0,
            Face::XStart | Face::XEnd => 1,
            Face::YStart | Face::YEnd => 2,
        }
    }

    fn is_start(self) -> bool {
        matches!(self, Face::TimeStart | Face::XStart | Face::YStart)
    }

    pub fn label(self) -> &'static str {
        match self {
            Face::TimeStart => "t-start",
            Face::TimeEnd => "t-end",
            Face::XStart => "x-start",
            Face::XEnd => "x-end",
            Face::YStart => "y-start",
            Face::YEnd => "y-end",
        }
    }
}

/// Summary of the codes in one region of a volume
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegionStats {
    pub min: u8,
    pub max: u8,
    pub mean: f64,
    /// Fraction of voxels holding the void code
    pub zero_fraction: f64,
    pub count: usize,
}

impl RegionStats {
    fn of(region: ArrayView3<'_, u8>) -> Option<Self> {
        let count = region.len();
        if count == 0 {
            return None;
        }
        let mut min = u8::MAX;
        let mut max = u8::MIN;
        let mut sum = 0u64;
        let mut zeros = 0usize;
        for &code in region.iter() {
            min = min.min(code);
            max = max.max(code);
            sum += u64::from(code);
            if code == VOID_CODE {
                zeros += 1;
            }
        }
        Some(Self {
            min,
            max,
            mean: sum as f64 / count as f64,
            zero_fraction: zeros as f64 / count as f64,
            count,
        })
    }
}

impl fmt::Display for RegionStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "min {:>3}  max {:>3}  mean {:>7.2}  zero {:>5.1}%",
            self.min,
            self.max,
            self.mean,
            100.0 * self.zero_fraction
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceReport {
    pub face: Face,
    pub stats: RegionStats,
    /// Mean markedly below the interior
    pub low_halo: bool,
}

/// Per-face statistics of a quantized volume against its interior
#[derive(Debug, Clone, PartialEq)]
pub struct BoundaryDiagnosis {
    pub layers: usize,
    pub faces: Vec<FaceReport>,
    /// `None` when the volume is too small to have an interior beyond `2 * layers`
    pub interior: Option<RegionStats>,
}

impl BoundaryDiagnosis {
    pub fn has_halo(&self) -> bool {
        self.faces.iter().any(|f| f.low_halo)
    }
}

impl fmt::Display for BoundaryDiagnosis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "\n Boundary Diagnosis ({} layers)", self.layers)?;
        writeln!(f, "==================================")?;
        for report in &self.faces {
            writeln!(
                f,
                "   {:<8} {}{}",
                report.face.label(),
                report.stats,
                if report.low_halo { "  ⚠️  low halo" } else { "" }
            )?;
        }
        match &self.interior {
            Some(interior) => writeln!(f, "   {:<8} {}", "interior", interior),
            None => writeln!(f, "   interior (volume too small)"),
        }
    }
}

/// Compare the outer `layers` of every face with the interior
///
/// The interior is everything at least `2 * layers` from every face. Faces
/// are clamped to the volume, so a band wider than an axis covers the axis.
pub fn diagnose_boundary(volume: &QuantizedVolume, layers: usize) -> BoundaryDiagnosis {
    let layers = layers.max(1);
    let dims = volume.shape();

    let faces = Face::ALL
        .iter()
        .filter_map(|&face| {
            let n = dims[face.axis()];
            let band = layers.min(n);
            let range = if face.is_start() { 0..band } else { n - band..n };
            let region = volume.slice_axis(Axis(face.axis()), range.into());
            RegionStats::of(region).map(|stats| FaceReport {
                face,
                stats,
                low_halo: false,
            })
        })
        .collect::<Vec<_>>();

    let inner = 2 * layers;
    let interior = if dims.iter().all(|&n| n > 2 * inner) {
        RegionStats::of(volume.slice(s![
            inner..dims[0] - inner,
            inner..dims[1] - inner,
            inner..dims[2] - inner
        ]))
    } else {
        None
    };

    let faces = faces
        .into_iter()
        .map(|mut report| {
            report.low_halo = interior
                .map_or(false, |interior| report.stats.mean < HALO_RATIO * interior.mean);
            report
        })
        .collect();

    BoundaryDiagnosis {
        layers,
        faces,
        interior,
    }
}

/// How the 8-bit code space of a volume is used
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CodeCensus {
    /// Code 0
    pub void: usize,
    /// Code 1, land and exact zeros
    pub masked: usize,
    /// Codes 2..=4
    pub reserved: usize,
    /// Codes 5..=254
    pub data: usize,
    /// Code 255
    pub saturated: usize,
}

impl CodeCensus {
    pub fn total(&self) -> usize {
        self.void + self.masked + self.reserved + self.data + self.saturated
    }
}

impl fmt::Display for CodeCensus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let total = self.total().max(1) as f64;
        let row = |f: &mut fmt::Formatter<'_>, label: &str, n: usize| {
            writeln!(f, "   {:<16} {:>12} ({:>5.1}%)", label, n, 100.0 * n as f64 / total)
        };
        writeln!(f, "\n Code Census")?;
        writeln!(f, "=============")?;
        row(f, "void (0)", self.void)?;
        row(f, "masked/zero (1)", self.masked)?;
        row(f, "reserved (2-4)", self.reserved)?;
        row(f, "data (5-254)", self.data)?;
        row(f, "saturated (255)", self.saturated)
    }
}

/// Count voxels per code class
pub fn code_census(volume: &QuantizedVolume) -> CodeCensus {
    volume.iter().fold(CodeCensus::default(), |mut census, &code| {
        match code {
            0 => census.void += 1,
            1 => census.masked += 1,
            2..=4 => census.reserved += 1,
            5..=254 => census.data += 1,
            255 => census.saturated += 1,
        }
        census
    })
}
