//! Deterministic burst identifiers
//!
//! A burst is identified by the relative track it was acquired on, the IW
//! sub-swath, and the index of the burst-repeat cycle it falls into since the
//! ascending-node crossing. Repeat passes over the same ground therefore map
//! onto the same identifier.

use crate::types::{BurstError, BurstResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Burst repeat cycle of the IW acquisition, in seconds
pub const BURST_REPEAT_INTERVAL_SECS: f64 = 2.758277;

/// The same interval in whole microseconds, the resolution of annotation times
pub const BURST_REPEAT_INTERVAL_MICROS: i64 = 2_758_277;

/// Number of relative orbits in the Sentinel-1 repeat cycle
pub const TRACKS_PER_CYCLE: i64 = 175;

/// Platform designator taken from the package name (`S1A`, `S1B`, ...)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PlatformDesignator(String);

impl PlatformDesignator {
    /// Designator of a package, from the first three characters of its name
    pub fn from_package_name(name: &str) -> BurstResult<Self> {
        let designator: String = name.chars().take(3).collect();
        if designator.chars().count() < 3 {
            return Err(BurstError::InvalidInput(format!(
                "Package name too short for a platform designator: '{}'",
                name
            )));
        }
        Ok(Self(designator.to_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the designator names the Sentinel-1A unit
    pub fn is_a_instance(&self) -> bool {
        self.0 == "S1A"
    }
}

impl std::fmt::Display for PlatformDesignator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Relative track number for an absolute orbit
///
/// The offsets place each unit's orbit count on the common track numbering
/// and must only change together with the mission documentation.
pub fn relative_track(platform: &PlatformDesignator, absolute_orbit: u32) -> u32 {
    let offset = if platform.is_a_instance() { 73 } else { 27 };
    ((absolute_orbit as i64 - offset).rem_euclid(TRACKS_PER_CYCLE) + 1) as u32
}

/// Index of the burst-repeat cycle containing `azimuth_time`
pub fn time_bucket(azimuth_time: DateTime<Utc>, ascending_node_time: DateTime<Utc>) -> i64 {
    let elapsed = azimuth_time - ascending_node_time;
    // Integer division truncates toward zero
    match elapsed.num_microseconds() {
        Some(us) => us / BURST_REPEAT_INTERVAL_MICROS,
        None => {
            let us = elapsed.num_milliseconds() as i128 * 1000;
            (us / BURST_REPEAT_INTERVAL_MICROS as i128) as i64
        }
    }
}

/// Structured burst identifier, formatted as `t{track}s{swath}b{bucket}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BurstId {
    pub track: u32,
    pub swath: u8,
    pub bucket: i64,
}

impl BurstId {
    pub fn new(track: u32, swath: u8, bucket: i64) -> Self {
        Self { track, swath, bucket }
    }

    /// Derive the identifier of a burst from orbit and timing annotation
    pub fn derive(
        platform: &PlatformDesignator,
        absolute_orbit: u32,
        swath: u8,
        azimuth_time: DateTime<Utc>,
        ascending_node_time: DateTime<Utc>,
    ) -> Self {
        Self {
            track: relative_track(platform, absolute_orbit),
            swath,
            bucket: time_bucket(azimuth_time, ascending_node_time),
        }
    }
}

impl std::fmt::Display for BurstId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "t{}s{}b{}", self.track, self.swath, self.bucket)
    }
}

impl std::str::FromStr for BurstId {
    type Err = BurstError;

    fn from_str(s: &str) -> BurstResult<Self> {
        let invalid = || BurstError::InvalidInput(format!("Invalid burst identifier: '{}'", s));

        let rest = s.strip_prefix('t').ok_or_else(invalid)?;
        let (track, rest) = rest.split_once('s').ok_or_else(invalid)?;
        let (swath, bucket) = rest.split_once('b').ok_or_else(invalid)?;

        Ok(Self {
            track: track.parse().map_err(|_| invalid())?,
            swath: swath.parse().map_err(|_| invalid())?,
            bucket: bucket.parse().map_err(|_| invalid())?,
        })
    }
}
