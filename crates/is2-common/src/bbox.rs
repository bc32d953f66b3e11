//! Geographic bounding boxes used as the spatial extent of a query.

use serde::{Deserialize, Serialize};

use crate::error::{Is2Error, Is2Result};

/// A geographic bounding box in decimal degrees (EPSG:4326).
///
/// Longitudes may wrap across the antimeridian (`min_lon > max_lon`);
/// latitudes may not.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl BoundingBox {
    /// Create a validated bounding box from its lower-left and upper-right corners.
    pub fn new(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Is2Result<Self> {
        let bbox = Self {
            min_lon,
            min_lat,
            max_lon,
            max_lat,
        };
        bbox.validate()?;
        Ok(bbox)
    }

    /// Build from a `[lon_min, lat_min, lon_max, lat_max]` list.
    pub fn from_slice(values: &[f64]) -> Is2Result<Self> {
        match values {
            [a, b, c, d] => Self::new(*a, *b, *c, *d),
            _ => Err(Is2Error::InvalidBbox(format!(
                "expected 4 values [lon_min, lat_min, lon_max, lat_max], got {}",
                values.len()
            ))),
        }
    }

    /// Parse a comma-separated string: "lon_min,lat_min,lon_max,lat_max"
    pub fn parse(s: &str) -> Is2Result<Self> {
        let values = s
            .split(',')
            .map(|part| {
                part.trim()
                    .parse::<f64>()
                    .map_err(|_| Is2Error::InvalidBbox(format!("invalid number '{}'", part)))
            })
            .collect::<Is2Result<Vec<_>>>()?;
        Self::from_slice(&values)
    }

    fn validate(&self) -> Is2Result<()> {
        for lon in [self.min_lon, self.max_lon] {
            if !(-180.0..=180.0).contains(&lon) {
                return Err(Is2Error::InvalidBbox(format!(
                    "longitude {} is outside [-180, 180]",
                    lon
                )));
            }
        }
        for lat in [self.min_lat, self.max_lat] {
            if !(-90.0..=90.0).contains(&lat) {
                return Err(Is2Error::InvalidBbox(format!(
                    "latitude {} is outside [-90, 90]",
                    lat
                )));
            }
        }
        if self.min_lat > self.max_lat {
            return Err(Is2Error::InvalidBbox(format!(
                "lower-left latitude {} is north of upper-right latitude {}",
                self.min_lat, self.max_lat
            )));
        }
        Ok(())
    }

    /// Whether the box crosses the antimeridian.
    pub fn crosses_antimeridian(&self) -> bool {
        self.min_lon > self.max_lon
    }

    /// Width in degrees of longitude.
    pub fn width(&self) -> f64 {
        if self.crosses_antimeridian() {
            360.0 - (self.min_lon - self.max_lon)
        } else {
            self.max_lon - self.min_lon
        }
    }

    /// Height in degrees of latitude.
    pub fn height(&self) -> f64 {
        self.max_lat - self.min_lat
    }

    /// Check if a point is contained within this bbox.
    pub fn contains_point(&self, lon: f64, lat: f64) -> bool {
        let lon_ok = if self.crosses_antimeridian() {
            lon >= self.min_lon || lon <= self.max_lon
        } else {
            lon >= self.min_lon && lon <= self.max_lon
        };
        lon_ok && lat >= self.min_lat && lat <= self.max_lat
    }

    /// Format for the CMR `bounding_box` and EGI `bbox` parameters.
    pub fn to_param_string(&self) -> String {
        format!(
            "{},{},{},{}",
            self.min_lon, self.min_lat, self.max_lon, self.max_lat
        )
    }
}

impl std::fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_param_string())
    }
}
