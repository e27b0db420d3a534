use crate::core::burst_id::BurstId;
use crate::core::catalog::{BurstCatalog, CatalogConfig};
use crate::core::geometry::{from_wkt, to_wkt};
use crate::types::{BurstCatalogEntry, BurstError, BurstResult, ObservationRecord};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Footprint catalog row as exported
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FootprintRow {
    #[serde(rename = "burst_ID")]
    pub burst_id: String,
    pub pass_direction: String,
    pub longitude: f64,
    pub latitude: f64,
    pub geometry: String,
}

impl From<&BurstCatalogEntry> for FootprintRow {
    fn from(entry: &BurstCatalogEntry) -> Self {
        Self {
            burst_id: entry.burst_id.to_string(),
            pass_direction: entry.pass_direction.to_string(),
            longitude: entry.longitude(),
            latitude: entry.latitude(),
            geometry: to_wkt(&entry.footprint),
        }
    }
}

impl TryFrom<FootprintRow> for BurstCatalogEntry {
    type Error = BurstError;

    fn try_from(row: FootprintRow) -> BurstResult<Self> {
        let mut footprint = from_wkt(&row.geometry)?;
        // Keep the exported centroid rather than the recomputed one
        footprint.centroid = (row.longitude, row.latitude);
        Ok(Self {
            burst_id: row.burst_id.parse()?,
            pass_direction: row.pass_direction.parse()?,
            footprint,
        })
    }
}

/// Observation log row as exported
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservationRow {
    #[serde(rename = "burst_ID")]
    pub burst_id: String,
    pub date: String,
    pub url: String,
    pub measurement: String,
    pub annotation: String,
    pub start: u64,
    pub end: u64,
}

impl From<&ObservationRecord> for ObservationRow {
    fn from(record: &ObservationRecord) -> Self {
        Self {
            burst_id: record.burst_id.to_string(),
            date: record.date.format(DATE_FORMAT).to_string(),
            url: record.url.clone(),
            measurement: record.measurement.clone(),
            annotation: record.annotation.clone(),
            start: record.start,
            end: record.end,
        }
    }
}

impl TryFrom<ObservationRow> for ObservationRecord {
    type Error = BurstError;

    fn try_from(row: ObservationRow) -> BurstResult<Self> {
        let date = NaiveDate::parse_from_str(&row.date, DATE_FORMAT)
            .map_err(|e| BurstError::InvalidInput(format!("Invalid date '{}': {}", row.date, e)))?;
        Ok(Self {
            burst_id: row.burst_id.parse::<BurstId>()?,
            date,
            url: row.url,
            measurement: row.measurement,
            annotation: row.annotation,
            start: row.start,
            end: row.end,
        })
    }
}

/// Write the footprint catalog as CSV
pub fn write_footprints<W: Write>(writer: W, entries: &[BurstCatalogEntry]) -> BurstResult<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for entry in entries {
        csv_writer.serialize(FootprintRow::from(entry))?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Write the observation log as CSV
pub fn write_observations<W: Write>(writer: W, records: &[ObservationRecord]) -> BurstResult<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for record in records {
        csv_writer.serialize(ObservationRow::from(record))?;
    }
    csv_writer.flush()?;
    Ok(())
}

pub fn read_footprints<R: Read>(reader: R) -> BurstResult<Vec<BurstCatalogEntry>> {
    csv::Reader::from_reader(reader)
        .deserialize::<FootprintRow>()
        .map(|row| BurstCatalogEntry::try_from(row?))
        .collect()
}

pub fn read_observations<R: Read>(reader: R) -> BurstResult<Vec<ObservationRecord>> {
    csv::Reader::from_reader(reader)
        .deserialize::<ObservationRow>()
        .map(|row| ObservationRecord::try_from(row?))
        .collect()
}

/// Export file names for an output name: `{name}.csv` and `{name}-stack.csv`
pub fn export_paths<P: AsRef<Path>>(output_name: P) -> (PathBuf, PathBuf) {
    let name = output_name.as_ref().display().to_string();
    (
        PathBuf::from(format!("{}.csv", name)),
        PathBuf::from(format!("{}-stack.csv", name)),
    )
}

impl BurstCatalog {
    /// Export both tables
    ///
    /// Rows keep insertion order, so an unchanged catalog re-exports identically.
    pub fn write_csv<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        footprints_path: P,
        observations_path: Q,
    ) -> BurstResult<()> {
        let entries = self.entries();
        let observations = self.observations();

        write_footprints(std::fs::File::create(footprints_path.as_ref())?, &entries)?;
        write_observations(std::fs::File::create(observations_path.as_ref())?, &observations)?;

        log::info!(
            "Wrote {} burst IDs to {} and {} observations to {}",
            entries.len(),
            footprints_path.as_ref().display(),
            observations.len(),
            observations_path.as_ref().display()
        );
        Ok(())
    }

    /// Rebuild a catalog from its exports
    pub fn from_csv<P: AsRef<Path>, Q: AsRef<Path>>(
        config: CatalogConfig,
        footprints_path: P,
        observations_path: Q,
    ) -> BurstResult<Self> {
        let entries = read_footprints(std::fs::File::open(footprints_path.as_ref())?)?;
        let observations = read_observations(std::fs::File::open(observations_path.as_ref())?)?;
        log::info!(
            "Restored {} burst IDs and {} observations",
            entries.len(),
            observations.len()
        );
        Ok(Self::restore(config, entries, observations))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BurstFootprint, PassDirection};

    fn sample_entry() -> BurstCatalogEntry {
        BurstCatalogEntry {
            burst_id: BurstId::new(64, 1, 2421),
            pass_direction: PassDirection::Descending,
            footprint: BurstFootprint {
                ring: vec![(-121.5, 38.2), (-120.6, 38.3), (-120.5, 38.1), (-121.4, 38.0)],
                centroid: (-121.0, 38.15),
            },
        }
    }

    #[test]
    fn test_footprint_header_and_row() {
        let mut buffer = Vec::new();
        write_footprints(&mut buffer, &[sample_entry()]).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let mut lines = text.lines();

        assert_eq!(
            lines.next().unwrap(),
            "burst_ID,pass_direction,longitude,latitude,geometry"
        );
        let row = lines.next().unwrap();
        assert!(row.starts_with("t64s1b2421,Descending,-121.0,38.15,"));
        assert!(row.contains("POLYGON ((-121.5 38.2, -120.6 38.3, -120.5 38.1, -121.4 38, -121.5 38.2))"));
    }

    #[test]
    fn test_observation_header_and_row() {
        let record = ObservationRecord {
            burst_id: BurstId::new(64, 1, 2421),
            date: NaiveDate::from_ymd_opt(2020, 1, 3).unwrap(),
            url: "https://example.invalid/S1A.zip".to_string(),
            measurement: "S1A.SAFE/measurement/s1a-iw1-slc-vv-x.tiff".to_string(),
            annotation: "S1A.SAFE/annotation/s1a-iw1-slc-vv-x.xml".to_string(),
            start: 1508,
            end: 3016,
        };

        let mut buffer = Vec::new();
        write_observations(&mut buffer, &[record.clone()]).unwrap();
        let text = String::from_utf8(buffer).unwrap();

        assert!(text.starts_with("burst_ID,date,url,measurement,annotation,start,end\n"));
        assert!(text.contains("t64s1b2421,2020-01-03,https://example.invalid/S1A.zip,"));
        assert!(text.trim_end().ends_with(",1508,3016"));

        let parsed = read_observations(text.as_bytes()).unwrap();
        assert_eq!(parsed, vec![record]);
    }

    #[test]
    fn test_rejects_bad_identifier_on_import() {
        let text = "burst_ID,pass_direction,longitude,latitude,geometry\nX1,Ascending,0,0,\"POLYGON ((0 0, 1 0, 1 1, 0 0))\"\n";
        assert!(read_footprints(text.as_bytes()).is_err());
    }

    #[test]
    fn test_export_paths() {
        let (ids, stack) = export_paths("out/burstID");
        assert_eq!(ids, PathBuf::from("out/burstID.csv"));
        assert_eq!(stack, PathBuf::from("out/burstID-stack.csv"));
    }
}
