use crate::io::package::{AcquisitionPackage, SwathSelector};
use crate::types::{
    AcquisitionMetadata, BurstError, BurstRecord, BurstResult, GroundControlPoint, PassDirection,
};
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use quick_xml::de::from_str;
use serde::Deserialize;

/// Sentinel-1 product annotation, root `<product>` element
///
/// Every field is optional so that a missing element is reported by name
/// rather than as a generic deserialization failure.
#[derive(Debug, Deserialize)]
pub struct AnnotationRoot {
    #[serde(rename = "adsHeader")]
    pub ads_header: Option<AdsHeader>,
    #[serde(rename = "generalAnnotation")]
    pub general_annotation: Option<GeneralAnnotation>,
    #[serde(rename = "imageAnnotation")]
    pub image_annotation: Option<ImageAnnotation>,
    #[serde(rename = "swathTiming")]
    pub swath_timing: Option<SwathTiming>,
    #[serde(rename = "geolocationGrid")]
    pub geolocation_grid: Option<GeolocationGrid>,
}

#[derive(Debug, Deserialize)]
pub struct AdsHeader {
    #[serde(rename = "absoluteOrbitNumber")]
    pub absolute_orbit_number: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct GeneralAnnotation {
    #[serde(rename = "productInformation")]
    pub product_information: Option<ProductInformation>,
}

#[derive(Debug, Deserialize)]
pub struct ProductInformation {
    #[serde(rename = "pass")]
    pub pass: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ImageAnnotation {
    #[serde(rename = "imageInformation")]
    pub image_information: Option<ImageInformation>,
}

#[derive(Debug, Deserialize)]
pub struct ImageInformation {
    #[serde(rename = "ascendingNodeTime")]
    pub ascending_node_time: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SwathTiming {
    #[serde(rename = "linesPerBurst")]
    pub lines_per_burst: Option<String>,
    #[serde(rename = "burstList")]
    pub burst_list: Option<BurstList>,
}

#[derive(Debug, Deserialize)]
pub struct BurstList {
    #[serde(rename = "@count")]
    pub count: Option<String>,
    #[serde(rename = "burst", default)]
    pub bursts: Vec<Burst>,
}

#[derive(Debug, Deserialize)]
pub struct Burst {
    #[serde(rename = "azimuthTime")]
    pub azimuth_time: Option<String>,
}

/// Geolocation grid for geographic coordinate extraction
#[derive(Debug, Deserialize)]
pub struct GeolocationGrid {
    #[serde(rename = "geolocationGridPointList")]
    pub geolocation_grid_point_list: Option<GeolocationGridPointList>,
}

#[derive(Debug, Deserialize)]
pub struct GeolocationGridPointList {
    #[serde(rename = "geolocationGridPoint", default)]
    pub geolocation_grid_points: Vec<GeolocationGridPoint>,
}

#[derive(Debug, Deserialize)]
pub struct GeolocationGridPoint {
    #[serde(rename = "line")]
    pub line: Option<String>,
    #[serde(rename = "pixel")]
    pub pixel: Option<String>,
    #[serde(rename = "latitude")]
    pub latitude: Option<String>,
    #[serde(rename = "longitude")]
    pub longitude: Option<String>,
}

/// Parsed annotation of one sub-swath, together with where it was found
#[derive(Debug, Clone)]
pub struct AnnotationExtract {
    pub annotation_path: String,
    pub metadata: AcquisitionMetadata,
    /// Raw annotation text, kept for sources that read the geolocation grid
    pub xml: String,
}

/// Parser for Sentinel-1 annotation XML files
pub struct AnnotationParser;

impl AnnotationParser {
    /// Locate, read and parse the annotation of one sub-swath of a package
    pub fn extract(
        package: &mut AcquisitionPackage,
        selector: &SwathSelector,
    ) -> BurstResult<AnnotationExtract> {
        let pattern = selector.annotation_pattern()?;
        let annotation_path = package.find_unique(&pattern)?;
        log::debug!("Reading {} annotation {}", selector, annotation_path);

        let xml = package.read_to_string(&annotation_path)?;
        let metadata = Self::parse_metadata(&xml)?;
        log::debug!(
            "Orbit {} ({}), {} bursts of {} lines",
            metadata.absolute_orbit,
            metadata.pass_direction,
            metadata.bursts.len(),
            metadata.lines_per_burst
        );

        Ok(AnnotationExtract {
            annotation_path,
            metadata,
            xml,
        })
    }

    /// Parse complete annotation XML
    pub fn parse_annotation(xml_content: &str) -> BurstResult<AnnotationRoot> {
        from_str::<AnnotationRoot>(xml_content).map_err(|e| {
            BurstError::MalformedMetadata(format!("Failed to parse annotation XML: {}", e))
        })
    }

    /// Parse and validate the timing, orbit and burst fields of an annotation
    pub fn parse_metadata(xml_content: &str) -> BurstResult<AcquisitionMetadata> {
        let annotation = Self::parse_annotation(xml_content)?;

        let orbit_text = annotation
            .ads_header
            .as_ref()
            .and_then(|h| h.absolute_orbit_number.as_deref());
        let absolute_orbit: u32 = parse_field(orbit_text, "adsHeader/absoluteOrbitNumber")?;

        let pass_text = required(
            annotation
                .general_annotation
                .as_ref()
                .and_then(|g| g.product_information.as_ref())
                .and_then(|p| p.pass.as_deref()),
            "generalAnnotation/productInformation/pass",
        )?;
        let pass_direction: PassDirection = pass_text.parse().map_err(|_| {
            BurstError::MalformedMetadata(format!(
                "generalAnnotation/productInformation/pass: unknown pass '{}'",
                pass_text
            ))
        })?;

        let anx_text = required(
            annotation
                .image_annotation
                .as_ref()
                .and_then(|i| i.image_information.as_ref())
                .and_then(|i| i.ascending_node_time.as_deref()),
            "imageAnnotation/imageInformation/ascendingNodeTime",
        )?;
        let ascending_node_time =
            parse_time(anx_text, "imageAnnotation/imageInformation/ascendingNodeTime")?;

        let swath_timing = annotation
            .swath_timing
            .as_ref()
            .ok_or_else(|| missing("swathTiming"))?;

        let lines_per_burst: u32 =
            parse_field(swath_timing.lines_per_burst.as_deref(), "swathTiming/linesPerBurst")?;
        if lines_per_burst == 0 {
            return Err(BurstError::MalformedMetadata(
                "swathTiming/linesPerBurst: must be positive".to_string(),
            ));
        }

        let burst_list = swath_timing
            .burst_list
            .as_ref()
            .ok_or_else(|| missing("swathTiming/burstList"))?;
        let count: usize = parse_field(burst_list.count.as_deref(), "swathTiming/burstList@count")?;
        if count != burst_list.bursts.len() {
            return Err(BurstError::MalformedMetadata(format!(
                "swathTiming/burstList@count is {} but {} bursts are listed",
                count,
                burst_list.bursts.len()
            )));
        }

        let bursts = burst_list
            .bursts
            .iter()
            .enumerate()
            .map(|(i, burst)| {
                let field = format!("swathTiming/burstList/burst[{}]/azimuthTime", i);
                let text = required(burst.azimuth_time.as_deref(), &field)?;
                Ok(BurstRecord {
                    azimuth_time: parse_time(text, &field)?,
                })
            })
            .collect::<BurstResult<Vec<_>>>()?;

        Ok(AcquisitionMetadata {
            ascending_node_time,
            pass_direction,
            absolute_orbit,
            lines_per_burst,
            bursts,
        })
    }

    /// Extract the geolocation grid as ground-control points, in document order
    pub fn extract_geolocation_grid(xml_content: &str) -> BurstResult<Vec<GroundControlPoint>> {
        let annotation = Self::parse_annotation(xml_content)?;

        let grid_points = annotation
            .geolocation_grid
            .and_then(|g| g.geolocation_grid_point_list)
            .map(|l| l.geolocation_grid_points)
            .unwrap_or_default();

        grid_points
            .iter()
            .enumerate()
            .map(|(i, point)| {
                let field = |name: &str| format!("geolocationGrid/geolocationGridPoint[{}]/{}", i, name);
                let line: f64 = parse_field(point.line.as_deref(), &field("line"))?;
                Ok(GroundControlPoint {
                    line: line_index(line).ok_or_else(|| {
                        BurstError::MalformedMetadata(format!("{}: not a line index", field("line")))
                    })?,
                    pixel: parse_field(point.pixel.as_deref(), &field("pixel"))?,
                    longitude: parse_field(point.longitude.as_deref(), &field("longitude"))?,
                    latitude: parse_field(point.latitude.as_deref(), &field("latitude"))?,
                })
            })
            .collect()
    }
}

/// Integral, non-negative image line of a GCP
pub(crate) fn line_index(line: f64) -> Option<u64> {
    if line.is_finite() && line >= 0.0 && (line - line.round()).abs() < 1e-6 {
        Some(line.round() as u64)
    } else {
        None
    }
}

/// Parse an annotation timestamp, e.g. `2020-01-03T17:08:16.618328`
pub fn parse_annotation_time(text: &str) -> Option<DateTime<Utc>> {
    let trimmed = text.trim().trim_end_matches('Z');
    NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| Utc.from_utc_datetime(&naive))
}

fn missing(field: &str) -> BurstError {
    BurstError::MalformedMetadata(format!("{}: missing", field))
}

fn required<'a>(value: Option<&'a str>, field: &str) -> BurstResult<&'a str> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(missing(field)),
    }
}

fn parse_field<T: std::str::FromStr>(value: Option<&str>, field: &str) -> BurstResult<T> {
    let text = required(value, field)?;
    text.parse::<T>().map_err(|_| {
        BurstError::MalformedMetadata(format!("{}: cannot parse '{}'", field, text))
    })
}

fn parse_time(text: &str, field: &str) -> BurstResult<DateTime<Utc>> {
    parse_annotation_time(text).ok_or_else(|| {
        BurstError::MalformedMetadata(format!("{}: invalid timestamp '{}'", field, text))
    })
}
