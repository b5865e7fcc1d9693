//! Land mask construction from geographic boundary polygons
//!
//! Boundary polygons are read from GeoJSON in lon/lat, optionally projected to
//! Web Mercator, and combined into one region. Grid-cell centres are spread
//! evenly over a [`GridSpan`]; a cell is land when its centre falls inside the
//! region (or outside it, for boundary files that outline the water body).

use super::LandMask;
use crate::errors::{OceanVolError, Result};
use geo::{Contains, Coord, LineString, MapCoords, MultiPolygon, Point, Polygon};
use log::{debug, info};
use ndarray::Array2;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::f64::consts::PI;
use std::fs;
use std::path::{Path, PathBuf};

/// WGS84 equatorial radius used by Web Mercator, in meters
pub const EARTH_RADIUS_M: f64 = 6_378_137.0;

/// Latitude limit of the Web Mercator square
pub const MAX_MERCATOR_LAT: f64 = 85.051_128_78;

/// Planar coordinate system the grid is laid out in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Projection {
    /// Lon/lat degrees projected to EPSG:3857 meters
    #[default]
    WebMercator,
    /// Coordinates used as given
    None,
}

impl Projection {
    /// Project a lon/lat coordinate
    pub fn project(self, coord: Coord<f64>) -> Coord<f64> {
        match self {
            Projection::WebMercator => {
                let lat = coord.y.clamp(-MAX_MERCATOR_LAT, MAX_MERCATOR_LAT);
                Coord {
                    x: EARTH_RADIUS_M * coord.x.to_radians(),
                    y: EARTH_RADIUS_M * (PI / 4.0 + lat.to_radians() / 2.0).tan().ln(),
                }
            }
            Projection::None => coord,
        }
    }
}

/// Rectangular extent of the grid, in source (unprojected) coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridSpan {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl GridSpan {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Total bounds of a set of polygons
    pub fn from_polygons(polygons: &MultiPolygon<f64>) -> Result<Self> {
        let mut coords = polygons
            .0
            .iter()
            .flat_map(|p| p.exterior().0.iter().chain(p.interiors().iter().flat_map(|r| r.0.iter())));
        let first = coords
            .next()
            .ok_or_else(|| OceanVolError::Geometry("cannot take bounds of an empty region".to_string()))?;
        let mut span = Self::new(first.x, first.y, first.x, first.y);
        for c in coords {
            span.min_x = span.min_x.min(c.x);
            span.min_y = span.min_y.min(c.y);
            span.max_x = span.max_x.max(c.x);
            span.max_y = span.max_y.max(c.y);
        }
        Ok(span)
    }

    /// Project the two corners
    pub fn project(&self, projection: Projection) -> Self {
        let lo = projection.project(Coord {
            x: self.min_x,
            y: self.min_y,
        });
        let hi = projection.project(Coord {
            x: self.max_x,
            y: self.max_y,
        });
        Self::new(lo.x, lo.y, hi.x, hi.y)
    }

    /// Cell-centre coordinates along x for `n` cells
    pub fn x_centres(&self, n: usize) -> Vec<f64> {
        linspace(self.min_x, self.max_x, n)
    }

    /// Cell-centre coordinates along y for `n` cells
    pub fn y_centres(&self, n: usize) -> Vec<f64> {
        linspace(self.min_y, self.max_y, n)
    }
}

fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (n - 1) as f64;
            (0..n).map(|i| start + step * i as f64).collect()
        }
    }
}

/// Where the land mask comes from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaskConfig {
    /// GeoJSON file with the region polygon(s)
    pub boundary: PathBuf,
    /// GeoJSON file whose total bounds define the grid span
    #[serde(default)]
    pub grid_bounds: Option<PathBuf>,
    /// Explicit grid span, used when `grid_bounds` is absent
    #[serde(default)]
    pub grid_span: Option<GridSpan>,
    /// Treat cells outside the region as land
    #[serde(default)]
    pub invert: bool,
    #[serde(default)]
    pub projection: Projection,
}

impl MaskConfig {
    pub fn new(boundary: impl Into<PathBuf>) -> Self {
        Self {
            boundary: boundary.into(),
            grid_bounds: None,
            grid_span: None,
            invert: false,
            projection: Projection::default(),
        }
    }

    /// Build the mask for an `nx` by `ny` grid
    ///
    /// The grid span comes from `grid_bounds`, then `grid_span`, and falls back
    /// to the bounds of the region itself.
    ///
    /// # Errors
    ///
    /// Returns an error if a GeoJSON file cannot be read or holds no polygons.
    pub fn build(&self, nx: usize, ny: usize) -> Result<LandMask> {
        let region = load_region(&self.boundary)?;
        let span = match (&self.grid_bounds, &self.grid_span) {
            (Some(path), _) => GridSpan::from_polygons(&load_region(path)?)?,
            (None, Some(span)) => *span,
            (None, None) => GridSpan::from_polygons(&region)?,
        };
        debug!("Grid span before projection: {:?}", span);

        let projected = project_region(&region, self.projection);
        let mask = LandMask::from_region(&projected, &span.project(self.projection), nx, ny, self.invert)?;
        info!("Built land mask from {}: {}", self.boundary.display(), mask);
        Ok(mask)
    }
}

impl LandMask {
    /// Rasterize cell centres of an `nx` by `ny` grid against `region`
    ///
    /// `region` and `span` must already be in the same planar coordinates.
    pub fn from_region(
        region: &MultiPolygon<f64>,
        span: &GridSpan,
        nx: usize,
        ny: usize,
        invert: bool,
    ) -> Result<Self> {
        let xs = span.x_centres(nx);
        let ys = span.y_centres(ny);

        let rows: Vec<Vec<bool>> = xs
            .par_iter()
            .map(|&x| {
                ys.iter()
                    .map(|&y| region.contains(&Point::new(x, y)) != invert)
                    .collect()
            })
            .collect();

        let flat: Vec<bool> = rows.into_iter().flatten().collect();
        Ok(LandMask::new(Array2::from_shape_vec((nx, ny), flat)?))
    }
}

/// Project every polygon of a region
pub fn project_region(region: &MultiPolygon<f64>, projection: Projection) -> MultiPolygon<f64> {
    match projection {
        Projection::None => region.clone(),
        _ => region.map_coords(|c| projection.project(c)),
    }
}

/// Read every polygon of a GeoJSON file into one region
///
/// Accepts `FeatureCollection`, `Feature`, `GeometryCollection`, `Polygon` and
/// `MultiPolygon`; other geometry types are skipped.
pub fn load_region(path: &Path) -> Result<MultiPolygon<f64>> {
    let text = fs::read_to_string(path)?;
    let value: Value = serde_json::from_str(&text)?;
    let polygons = parse_geojson(&value)?;
    if polygons.is_empty() {
        return Err(OceanVolError::Geometry(format!(
            "no polygons found in {}",
            path.display()
        )));
    }
    debug!("Loaded {} polygon(s) from {}", polygons.len(), path.display());
    Ok(MultiPolygon(polygons))
}

/// Collect the polygons of a GeoJSON value
pub fn parse_geojson(value: &Value) -> Result<Vec<Polygon<f64>>> {
    let kind = value
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| OceanVolError::Geometry("GeoJSON object without 'type'".to_string()))?;

    let mut polygons = Vec::new();
    match kind {
        "FeatureCollection" => {
            for feature in array_field(value, "features")? {
                polygons.extend(parse_geojson(feature)?);
            }
        }
        "Feature" => {
            if let Some(geometry) = value.get("geometry").filter(|g| !g.is_null()) {
                polygons.extend(parse_geojson(geometry)?);
            }
        }
        "GeometryCollection" => {
            for geometry in array_field(value, "geometries")? {
                polygons.extend(parse_geojson(geometry)?);
            }
        }
        "Polygon" => polygons.push(parse_polygon(value.get("coordinates"))?),
        "MultiPolygon" => {
            for rings in array_field(value, "coordinates")? {
                polygons.push(parse_polygon(Some(rings))?);
            }
        }
        other => debug!("Skipping GeoJSON geometry of type {}", other),
    }
    Ok(polygons)
}

fn array_field<'a>(value: &'a Value, field: &str) -> Result<&'a Vec<Value>> {
    value
        .get(field)
        .and_then(Value::as_array)
        .ok_or_else(|| OceanVolError::Geometry(format!("GeoJSON '{}' must be an array", field)))
}

fn parse_polygon(coordinates: Option<&Value>) -> Result<Polygon<f64>> {
    let rings = coordinates
        .and_then(Value::as_array)
        .ok_or_else(|| OceanVolError::Geometry("polygon coordinates must be an array of rings".to_string()))?;
    let mut rings = rings.iter().map(parse_ring);
    let exterior = rings
        .next()
        .ok_or_else(|| OceanVolError::Geometry("polygon without an exterior ring".to_string()))??;
    let interiors = rings.collect::<Result<Vec<_>>>()?;
    Ok(Polygon::new(exterior, interiors))
}

fn parse_ring(ring: &Value) -> Result<LineString<f64>> {
    let points = ring
        .as_array()
        .ok_or_else(|| OceanVolError::Geometry("ring must be an array of positions".to_string()))?;
    let coords = points
        .iter()
        .map(|p| {
            let x = p.get(0).and_then(Value::as_f64);
            let y = p.get(1).and_then(Value::as_f64);
            match (x, y) {
                (Some(x), Some(y)) => Ok(Coord { x, y }),
                _ => Err(OceanVolError::Geometry(format!("invalid position {}", p))),
            }
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(LineString::from(coords))
}
