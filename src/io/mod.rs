//! I/O modules for reading acquisition packages and their collaborators

pub mod package;
pub mod annotation;
pub mod gcp;
pub mod provider;

pub use package::{AcquisitionPackage, SwathSelector};
pub use annotation::{AnnotationExtract, AnnotationParser};
pub use gcp::{AnnotationGridGcps, GroundControlSource};
#[cfg(feature = "gdal")]
pub use gcp::RasterGcps;
pub use provider::{
    DirectoryScan, Downloader, ExportUploader, LocalBucketUploader, PackageLocator,
    PackageProvider, QueryResults,
};
