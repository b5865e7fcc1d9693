//! Persisted volume format: raw sample bytes plus an `.ini` descriptor
//!
//! The descriptor is plain text with one `key:value` per line:
//!
//! ```text
//! dimx:175
//! dimy:175
//! dimz:552
//! skip:0
//! format:uint8
//! ```
//!
//! `dimz` is the time extent. Samples are stored `(t, x, y)` in C order. Reading a
//! written volume back with its descriptor reproduces the identical bytes.

use crate::errors::{OceanVolError, Result};
use crate::quantize::QuantizedVolume;
use log::debug;
use ndarray::Array3;
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Extension appended to the raw file name to name its descriptor
pub const DESCRIPTOR_EXTENSION: &str = "ini";

/// Numeric type of the stored samples
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleFormat {
    Uint8,
    Uint16,
    Float32,
}

impl SampleFormat {
    /// Bytes per sample
    pub const fn size(self) -> usize {
        match self {
            SampleFormat::Uint8 => 1,
            SampleFormat::Uint16 => 2,
            SampleFormat::Float32 => 4,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            SampleFormat::Uint8 => "uint8",
            SampleFormat::Uint16 => "uint16",
            SampleFormat::Float32 => "float32",
        }
    }
}

impl FromStr for SampleFormat {
    type Err = OceanVolError;

    fn from_str(s: &str) -> Result<Self> {
        let lower = s.trim().to_ascii_lowercase();
        if lower.contains("uint8") {
            Ok(SampleFormat::Uint8)
        } else if lower.contains("uint16") {
            Ok(SampleFormat::Uint16)
        } else if lower.contains("float") {
            Ok(SampleFormat::Float32)
        } else {
            Err(OceanVolError::Descriptor(format!("unsupported sample format '{}'", s)))
        }
    }
}

impl fmt::Display for SampleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sidecar description of a raw volume file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VolumeDescriptor {
    pub dimx: usize,
    pub dimy: usize,
    /// Time extent
    pub dimz: usize,
    /// Leading bytes to ignore
    pub skip: usize,
    pub format: SampleFormat,
}

impl VolumeDescriptor {
    /// Descriptor for an 8-bit `(t, x, y)` volume
    pub fn for_quantized(volume: &QuantizedVolume) -> Self {
        let (t, x, y) = volume.dim();
        Self {
            dimx: x,
            dimy: y,
            dimz: t,
            skip: 0,
            format: SampleFormat::Uint8,
        }
    }

    pub fn sample_count(&self) -> usize {
        self.dimx * self.dimy * self.dimz
    }

    /// Payload size after `skip`
    pub fn byte_len(&self) -> usize {
        self.sample_count() * self.format.size()
    }

    /// Render the descriptor text
    pub fn to_ini(&self) -> String {
        format!(
            "dimx:{} \ndimy:{} \ndimz:{} \nskip:{} \nformat:{}",
            self.dimx, self.dimy, self.dimz, self.skip, self.format
        )
    }

    /// Parse descriptor text
    ///
    /// Accepts `key:value` and `key=value` lines, ignores blank lines and lines
    /// starting with `#`. `skip` defaults to 0 and `format` to `uint8`.
    pub fn parse(text: &str) -> Result<Self> {
        let mut fields = HashMap::new();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once(':').or_else(|| line.split_once('=')) else {
                return Err(OceanVolError::Descriptor(format!("unparseable line '{}'", line)));
            };
            fields.insert(key.trim().to_ascii_lowercase(), value.trim().to_string());
        }

        let number = |key: &str, default: Option<usize>| -> Result<usize> {
            match (fields.get(key), default) {
                (Some(v), _) => v
                    .parse::<usize>()
                    .map_err(|_| OceanVolError::Descriptor(format!("{} is not a number: '{}'", key, v))),
                (None, Some(d)) => Ok(d),
                (None, None) => Err(OceanVolError::Descriptor(format!("missing field '{}'", key))),
            }
        };

        Ok(Self {
            dimx: number("dimx", None)?,
            dimy: number("dimy", None)?,
            dimz: number("dimz", None)?,
            skip: number("skip", Some(0))?,
            format: fields
                .get("format")
                .map_or(Ok(SampleFormat::Uint8), |f| f.parse())?,
        })
    }

    /// Read a descriptor file
    pub fn read(path: &Path) -> Result<Self> {
        Self::parse(&fs::read_to_string(path)?)
    }
}

/// Descriptor path for a raw file: `<raw name>.ini`
pub fn descriptor_path(raw_path: &Path) -> PathBuf {
    let mut name = raw_path.as_os_str().to_os_string();
    name.push(".");
    name.push(DESCRIPTOR_EXTENSION);
    PathBuf::from(name)
}

/// Raw file belonging to a descriptor
///
/// Tries the descriptor path without `.ini` first, then that stem with `.raw`
/// appended.
pub fn raw_path_for(descriptor: &Path) -> Result<PathBuf> {
    let stem = descriptor.with_extension("");
    if stem.is_file() {
        return Ok(stem);
    }
    let mut with_raw = stem.into_os_string();
    with_raw.push(".raw");
    let with_raw = PathBuf::from(with_raw);
    if with_raw.is_file() {
        return Ok(with_raw);
    }
    Err(OceanVolError::Descriptor(format!(
        "no raw file found for {}",
        descriptor.display()
    )))
}

/// Write bytes to `path` through a temporary sibling, renaming on success
fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let mut tmp = path.as_os_str().to_os_string();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    fs::write(&tmp, contents)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

/// Write an 8-bit volume and its descriptor; returns the descriptor path
///
/// # Errors
///
/// Returns an error if either file cannot be written.
pub fn write_quantized(raw_path: &Path, volume: &QuantizedVolume) -> Result<PathBuf> {
    let descriptor = VolumeDescriptor::for_quantized(volume);
    let bytes: Vec<u8> = volume.iter().copied().collect();
    write_atomic(raw_path, &bytes)?;

    let ini = descriptor_path(raw_path);
    write_atomic(&ini, descriptor.to_ini().as_bytes())?;
    debug!(
        "Wrote {} bytes to {} ({})",
        bytes.len(),
        raw_path.display(),
        ini.display()
    );
    Ok(ini)
}

/// A raw volume read back through its descriptor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawVolume {
    pub descriptor: VolumeDescriptor,
    pub path: PathBuf,
    /// Payload bytes, after `skip`
    pub bytes: Vec<u8>,
}

impl RawVolume {
    /// Read the raw file described by `descriptor_path`
    ///
    /// # Errors
    ///
    /// Returns `SizeMismatch` if the payload length disagrees with the
    /// descriptor's dimensions.
    pub fn read(descriptor_path: &Path) -> Result<Self> {
        let descriptor = VolumeDescriptor::read(descriptor_path)?;
        let path = raw_path_for(descriptor_path)?;
        let contents = fs::read(&path)?;

        let payload = contents.get(descriptor.skip..).unwrap_or(&[]);
        if payload.len() != descriptor.byte_len() {
            return Err(OceanVolError::SizeMismatch {
                expected: descriptor.byte_len(),
                found: payload.len(),
            });
        }
        Ok(Self {
            descriptor,
            path,
            bytes: payload.to_vec(),
        })
    }

    /// View an 8-bit payload as a `(t, x, y)` volume
    pub fn to_quantized(&self) -> Result<QuantizedVolume> {
        if self.descriptor.format != SampleFormat::Uint8 {
            return Err(OceanVolError::Descriptor(format!(
                "expected uint8 samples, found {}",
                self.descriptor.format
            )));
        }
        let d = &self.descriptor;
        Ok(Array3::from_shape_vec((d.dimz, d.dimx, d.dimy), self.bytes.clone())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_descriptor_text_layout() {
        let descriptor = VolumeDescriptor {
            dimx: 175,
            dimy: 175,
            dimz: 552,
            skip: 0,
            format: SampleFormat::Uint8,
        };
        assert_eq!(
            descriptor.to_ini(),
            "dimx:175 \ndimy:175 \ndimz:552 \nskip:0 \nformat:uint8"
        );
        assert_eq!(VolumeDescriptor::parse(&descriptor.to_ini()).unwrap(), descriptor);
    }

    #[test]
    fn test_descriptor_parse_variants() {
        let text = "# exported volume\nDIMX = 4\ndimy:3\n\ndimz: 2\nformat = float32\n";
        let descriptor = VolumeDescriptor::parse(text).unwrap();
        assert_eq!(descriptor.dimx, 4);
        assert_eq!(descriptor.skip, 0);
        assert_eq!(descriptor.format, SampleFormat::Float32);
        assert_eq!(descriptor.byte_len(), 4 * 3 * 2 * 4);

        assert!(matches!(
            VolumeDescriptor::parse("dimx:1\ndimy:1"),
            Err(OceanVolError::Descriptor(_))
        ));
        assert!(VolumeDescriptor::parse("dimx:1\ndimy:1\ndimz:1\nformat:int64").is_err());
    }

    #[test]
    fn test_write_then_read_reproduces_bytes() {
        let dir = tempdir().unwrap();
        let raw = dir.path().join("chunk_smooth.raw");
        let volume = Array3::from_shape_fn((3, 4, 5), |(t, x, y)| (t * 20 + x * 5 + y) as u8);

        let ini = write_quantized(&raw, &volume).unwrap();
        assert_eq!(ini, dir.path().join("chunk_smooth.raw.ini"));
        assert!(!dir.path().join("chunk_smooth.raw.tmp").exists());

        let back = RawVolume::read(&ini).unwrap();
        assert_eq!(back.path, raw);
        assert_eq!(back.bytes, fs::read(&raw).unwrap());
        assert_eq!(back.to_quantized().unwrap(), volume);
    }

    #[test]
    fn test_read_honours_skip_and_checks_size() {
        let dir = tempdir().unwrap();
        let raw = dir.path().join("volume.raw");
        fs::write(&raw, [9u8, 9, 1, 2, 3, 4]).unwrap();
        let ini = dir.path().join("volume.ini");
        fs::write(&ini, "dimx:2\ndimy:2\ndimz:1\nskip:2\nformat:uint8").unwrap();

        let volume = RawVolume::read(&ini).unwrap();
        assert_eq!(volume.bytes, vec![1, 2, 3, 4]);

        fs::write(&ini, "dimx:2\ndimy:2\ndimz:2\nskip:2\nformat:uint8").unwrap();
        assert!(matches!(
            RawVolume::read(&ini),
            Err(OceanVolError::SizeMismatch { expected: 8, found: 4 })
        ));
    }
}
