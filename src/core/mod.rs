//! Burst identification, footprints and the catalog

pub mod burst_id;
pub mod geometry;
pub mod catalog;
pub mod export;

// Re-export main types
pub use burst_id::{BurstId, PlatformDesignator, BURST_REPEAT_INTERVAL_MICROS, BURST_REPEAT_INTERVAL_SECS};
pub use geometry::{build_footprint, polygon_centroid};
pub use catalog::{BurstCatalog, CatalogConfig, CatalogRun, PackageSummary};
pub use export::{export_paths, FootprintRow, ObservationRow};
