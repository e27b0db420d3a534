//! Sentinel-1 burst identifiers
//!
//! Assigns every IW burst of a Sentinel-1 SLC acquisition a deterministic
//! identifier derived from its relative track, sub-swath and timing within
//! the orbit, and maintains a catalog of unique burst footprints together
//! with a log of every acquisition each burst was observed in.

pub mod types;
pub mod io;
pub mod core;

// Re-export main types and functions for easier access
pub use types::{
    AcquisitionMetadata, BurstCatalogEntry, BurstError, BurstFootprint, BurstRecord, BurstResult,
    GroundControlPoint, GroundControlTable, ObservationRecord, PassDirection, Polarization,
};

pub use crate::core::{BurstCatalog, BurstId, CatalogConfig, CatalogRun};
pub use io::{AcquisitionPackage, PackageLocator, PackageProvider};
