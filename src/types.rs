use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::core::burst_id::BurstId;

/// Polarization channels of a Sentinel-1 product
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Polarization {
    VV,
    VH,
    HV,
    HH,
}

impl std::fmt::Display for Polarization {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Polarization::VV => write!(f, "VV"),
            Polarization::VH => write!(f, "VH"),
            Polarization::HV => write!(f, "HV"),
            Polarization::HH => write!(f, "HH"),
        }
    }
}

impl std::str::FromStr for Polarization {
    type Err = BurstError;

    fn from_str(s: &str) -> BurstResult<Self> {
        match s.to_uppercase().as_str() {
            "VV" => Ok(Polarization::VV),
            "VH" => Ok(Polarization::VH),
            "HV" => Ok(Polarization::HV),
            "HH" => Ok(Polarization::HH),
            _ => Err(BurstError::InvalidInput(format!("Invalid polarization: {}", s))),
        }
    }
}

/// Orbit pass direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PassDirection {
    Ascending,
    Descending,
}

impl std::fmt::Display for PassDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PassDirection::Ascending => write!(f, "Ascending"),
            PassDirection::Descending => write!(f, "Descending"),
        }
    }
}

impl std::str::FromStr for PassDirection {
    type Err = BurstError;

    fn from_str(s: &str) -> BurstResult<Self> {
        match s.trim().to_lowercase().as_str() {
            "ascending" => Ok(PassDirection::Ascending),
            "descending" => Ok(PassDirection::Descending),
            _ => Err(BurstError::InvalidInput(format!("Invalid pass direction: {}", s))),
        }
    }
}

/// One entry of the annotation burst list
#[derive(Debug, Clone, PartialEq)]
pub struct BurstRecord {
    pub azimuth_time: DateTime<Utc>,
}

/// Timing, orbit and geometry metadata of one sub-swath of a package
#[derive(Debug, Clone, PartialEq)]
pub struct AcquisitionMetadata {
    pub ascending_node_time: DateTime<Utc>,
    pub pass_direction: PassDirection,
    pub absolute_orbit: u32,
    pub lines_per_burst: u32,
    pub bursts: Vec<BurstRecord>,
}

impl AcquisitionMetadata {
    /// First and one-past-last image line of burst `index`
    pub fn line_span(&self, index: usize) -> (u64, u64) {
        let lines = self.lines_per_burst as u64;
        (index as u64 * lines, (index as u64 + 1) * lines)
    }
}

/// Image line/sample to ground longitude/latitude correspondence
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroundControlPoint {
    pub line: u64,
    pub pixel: f64,
    pub longitude: f64,
    pub latitude: f64,
}

/// Ground-control points of one measurement raster, in image-line order
#[derive(Debug, Clone, PartialEq)]
pub struct GroundControlTable {
    /// In-package path of the raster the points belong to
    pub raster_path: String,
    pub points: Vec<GroundControlPoint>,
}

impl GroundControlTable {
    /// Points lying on image line `line`, in stored order
    pub fn points_on_line(&self, line: u64) -> impl Iterator<Item = &GroundControlPoint> {
        self.points.iter().filter(move |p| p.line == line)
    }
}

/// Closed ground footprint of a burst
#[derive(Debug, Clone, PartialEq)]
pub struct BurstFootprint {
    /// Ring vertices as (longitude, latitude); the closing vertex is implicit
    pub ring: Vec<(f64, f64)>,
    pub centroid: (f64, f64),
}

/// Row of the footprint catalog, one per unique burst identifier
#[derive(Debug, Clone, PartialEq)]
pub struct BurstCatalogEntry {
    pub burst_id: BurstId,
    pub pass_direction: PassDirection,
    pub footprint: BurstFootprint,
}

impl BurstCatalogEntry {
    pub fn longitude(&self) -> f64 {
        self.footprint.centroid.0
    }

    pub fn latitude(&self) -> f64 {
        self.footprint.centroid.1
    }
}

/// Row of the observation log, one per burst occurrence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservationRecord {
    pub burst_id: BurstId,
    pub date: NaiveDate,
    pub url: String,
    pub measurement: String,
    pub annotation: String,
    pub start: u64,
    pub end: u64,
}

/// Error types for burst cataloguing
#[derive(Debug, thiserror::Error)]
pub enum BurstError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ZIP archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Malformed metadata: {0}")]
    MalformedMetadata(String),

    #[error("Insufficient control points for burst {burst}: no points on line {line}")]
    InsufficientControlPoints { burst: usize, line: u64 },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[cfg(feature = "gdal")]
    #[error("GDAL error: {0}")]
    Gdal(#[from] gdal::errors::GdalError),

    #[error("{package} (swath {swath}{})", burst_suffix(.burst))]
    Package {
        package: String,
        swath: u8,
        burst: Option<usize>,
        #[source]
        source: Box<BurstError>,
    },
}

impl BurstError {
    /// Attach package context to an error raised while processing it
    pub fn in_package(self, package: &str, swath: u8, burst: Option<usize>) -> Self {
        BurstError::Package {
            package: package.to_string(),
            swath,
            burst,
            source: Box::new(self),
        }
    }

    /// The innermost error, with any package context peeled off
    pub fn root_cause(&self) -> &BurstError {
        match self {
            BurstError::Package { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

fn burst_suffix(burst: &Option<usize>) -> String {
    match burst {
        Some(index) => format!(", burst {}", index),
        None => String::new(),
    }
}

/// Result type for burst cataloguing operations
pub type BurstResult<T> = Result<T, BurstError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_package_context_is_not_repeated_in_chain() {
        let err = BurstError::NotFound("no annotation".to_string()).in_package("S1A_X.zip", 2, Some(4));

        assert_eq!(err.to_string(), "S1A_X.zip (swath 2, burst 4)");
        let source = err.source().unwrap();
        assert_eq!(source.to_string(), "Not found: no annotation");
        assert!(matches!(err.root_cause(), BurstError::NotFound(_)));

        let chain = format!("{:#}", anyhow::Error::new(err));
        assert_eq!(chain.matches("no annotation").count(), 1);
    }
}
