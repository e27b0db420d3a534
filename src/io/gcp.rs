//! Ground-control point sources
//!
//! The measurement raster of a SAFE sub-swath carries a GCP table relating
//! image lines/samples to ground longitude/latitude. The same point set is
//! published in the annotation geolocation grid, so two sources are offered:
//! one reading the raster through GDAL (feature `gdal`) and one reading the
//! annotation. Both resolve the raster member first, so the raster sub-path
//! is always known and a missing or ambiguous raster is always reported.

use crate::io::annotation::{AnnotationExtract, AnnotationParser};
use crate::io::package::{AcquisitionPackage, SwathSelector};
use crate::types::{BurstError, BurstResult, GroundControlPoint, GroundControlTable};

/// Reader of the GCP table of one sub-swath
pub trait GroundControlSource: Send + Sync {
    fn read_ground_control(
        &self,
        package: &mut AcquisitionPackage,
        selector: &SwathSelector,
        annotation: &AnnotationExtract,
    ) -> BurstResult<GroundControlTable>;
}

/// Sort points into image-line order and reject an unusable table
pub fn finalize_table(
    raster_path: String,
    mut points: Vec<GroundControlPoint>,
) -> BurstResult<GroundControlTable> {
    if points.is_empty() {
        return Err(BurstError::MalformedMetadata(format!(
            "No ground-control points found for {}",
            raster_path
        )));
    }

    if let Some(bad) = points
        .iter()
        .position(|p| !p.longitude.is_finite() || !p.latitude.is_finite())
    {
        return Err(BurstError::MalformedMetadata(format!(
            "Ground-control point {} of {} has no valid coordinates",
            bad, raster_path
        )));
    }

    // Stable, so points keep their sample order within a line
    points.sort_by_key(|p| p.line);

    Ok(GroundControlTable {
        raster_path,
        points,
    })
}

/// GCPs taken from the annotation geolocation grid
#[derive(Debug, Default, Clone, Copy)]
pub struct AnnotationGridGcps;

impl GroundControlSource for AnnotationGridGcps {
    fn read_ground_control(
        &self,
        package: &mut AcquisitionPackage,
        selector: &SwathSelector,
        annotation: &AnnotationExtract,
    ) -> BurstResult<GroundControlTable> {
        let raster_path = package.find_unique(&selector.measurement_pattern()?)?;
        let points = AnnotationParser::extract_geolocation_grid(&annotation.xml)?;
        log::debug!(
            "Read {} geolocation grid points for {} from {}",
            points.len(),
            raster_path,
            annotation.annotation_path
        );
        finalize_table(raster_path, points)
    }
}

/// GCPs read from the measurement raster itself through GDAL
#[cfg(feature = "gdal")]
#[derive(Debug, Default, Clone, Copy)]
pub struct RasterGcps;

#[cfg(feature = "gdal")]
impl GroundControlSource for RasterGcps {
    fn read_ground_control(
        &self,
        package: &mut AcquisitionPackage,
        selector: &SwathSelector,
        _annotation: &AnnotationExtract,
    ) -> BurstResult<GroundControlTable> {
        let raster_path = package.find_unique(&selector.measurement_pattern()?)?;

        let start_time = std::time::Instant::now();
        let vsi_path = format!("/vsizip/{}/{}", package.path().display(), raster_path);
        let dataset = gdal::Dataset::open(&vsi_path)?;

        let mut points = Vec::new();
        unsafe {
            let c_dataset = dataset.c_dataset();
            let count = gdal_sys::GDALGetGCPCount(c_dataset);
            let gcps = gdal_sys::GDALGetGCPs(c_dataset);
            if count > 0 && !gcps.is_null() {
                for gcp in std::slice::from_raw_parts(gcps, count as usize) {
                    let line = crate::io::annotation::line_index(gcp.dfGCPLine).ok_or_else(|| {
                        BurstError::MalformedMetadata(format!(
                            "Ground-control point of {} has invalid line {}",
                            raster_path, gcp.dfGCPLine
                        ))
                    })?;
                    points.push(GroundControlPoint {
                        line,
                        pixel: gcp.dfGCPPixel,
                        longitude: gcp.dfGCPX,
                        latitude: gcp.dfGCPY,
                    });
                }
            }
        }

        log::debug!(
            "Read {} GCPs from {} in {:?}",
            points.len(),
            vsi_path,
            start_time.elapsed()
        );
        finalize_table(raster_path, points)
    }
}

/// The GCP source used when none is chosen explicitly
pub fn default_source() -> std::sync::Arc<dyn GroundControlSource> {
    #[cfg(feature = "gdal")]
    {
        std::sync::Arc::new(RasterGcps)
    }
    #[cfg(not(feature = "gdal"))]
    {
        std::sync::Arc::new(AnnotationGridGcps)
    }
}
