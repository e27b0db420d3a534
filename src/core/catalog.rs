//! Burst catalog
//!
//! Two tables are maintained: the footprint catalog, holding one entry per
//! burst identifier (first writer wins), and the observation log, which gets
//! one record for every burst of every processed package.
//!
//! Reading a package (annotation, GCPs, footprints) never touches the tables.
//! The result is committed afterwards, one burst at a time, under a single
//! lock; this is the only place the tables change.

use crate::core::burst_id::BurstId;
use crate::core::geometry::build_footprint;
use crate::io::annotation::AnnotationParser;
use crate::io::gcp::{default_source, GroundControlSource};
use crate::io::package::{AcquisitionPackage, SwathSelector};
use crate::io::provider::PackageLocator;
use crate::types::{BurstCatalogEntry, BurstError, BurstResult, ObservationRecord, Polarization};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// Catalog processing parameters
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogConfig {
    /// IW sub-swaths read from every package
    pub swaths: Vec<u8>,
    /// Restrict member lookup to one polarization channel
    pub polarization: Option<Polarization>,
    /// Read packages concurrently (needs the `parallel` feature)
    pub parallel: bool,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            swaths: vec![1, 2, 3],
            polarization: None,
            parallel: true,
        }
    }
}

/// Outcome of committing one package sub-swath
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PackageSummary {
    /// Bursts recorded in the observation log
    pub bursts: usize,
    /// Bursts that created a new footprint entry
    pub new_entries: usize,
}

/// Outcome of a batch of packages
#[derive(Debug, Default)]
pub struct CatalogRun {
    /// Package sub-swaths attempted
    pub packages: usize,
    pub bursts: usize,
    pub new_entries: usize,
    /// One error per package sub-swath that could not be fully processed
    pub failures: Vec<BurstError>,
}

#[derive(Debug, Default)]
struct CatalogTables {
    entries: Vec<BurstCatalogEntry>,
    index: HashMap<BurstId, usize>,
    observations: Vec<ObservationRecord>,
}

#[derive(Debug)]
struct PreparedBurst {
    entry: BurstCatalogEntry,
    observation: ObservationRecord,
}

/// Bursts read from one package sub-swath, plus the error that stopped reading
#[derive(Debug)]
struct PreparedPackage {
    bursts: Vec<PreparedBurst>,
    failure: Option<BurstError>,
}

/// Deduplicated burst footprints and the log of their observations
pub struct BurstCatalog {
    config: CatalogConfig,
    tables: Mutex<CatalogTables>,
    gcp_source: Arc<dyn GroundControlSource>,
}

impl Default for BurstCatalog {
    fn default() -> Self {
        Self::new(CatalogConfig::default())
    }
}

impl BurstCatalog {
    /// Create an empty catalog using the default GCP source
    pub fn new(config: CatalogConfig) -> Self {
        Self::with_gcp_source(config, default_source())
    }

    pub fn with_gcp_source(config: CatalogConfig, gcp_source: Arc<dyn GroundControlSource>) -> Self {
        Self {
            config,
            tables: Mutex::new(CatalogTables::default()),
            gcp_source,
        }
    }

    /// Replace the GCP source, e.g. after restoring from exports
    pub fn set_gcp_source(mut self, gcp_source: Arc<dyn GroundControlSource>) -> Self {
        self.gcp_source = gcp_source;
        self
    }

    /// Create a catalog seeded with previously exported rows
    ///
    /// Footprint rows repeating an identifier are dropped, first one kept.
    pub fn restore(
        config: CatalogConfig,
        entries: Vec<BurstCatalogEntry>,
        observations: Vec<ObservationRecord>,
    ) -> Self {
        let catalog = Self::new(config);
        {
            let mut tables = catalog.lock();
            for entry in entries {
                if !tables.index.contains_key(&entry.burst_id) {
                    let position = tables.entries.len();
                    tables.index.insert(entry.burst_id, position);
                    tables.entries.push(entry);
                }
            }
            tables.observations = observations;
        }
        catalog
    }

    fn lock(&self) -> MutexGuard<'_, CatalogTables> {
        // The tables are consistent after every statement, so a panic in
        // another holder leaves nothing half-written
        self.tables.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Record one burst occurrence
    ///
    /// The footprint entry is inserted only if its identifier is new; the
    /// observation is always appended. Returns whether an entry was inserted.
    pub fn record_burst(&self, entry: BurstCatalogEntry, observation: ObservationRecord) -> bool {
        let mut tables = self.lock();

        let inserted = if tables.index.contains_key(&entry.burst_id) {
            log::debug!("The unique ID {} already exists", entry.burst_id);
            false
        } else {
            log::info!("adding {} to the catalog", entry.burst_id);
            let position = tables.entries.len();
            tables.index.insert(entry.burst_id, position);
            tables.entries.push(entry);
            true
        };

        tables.observations.push(observation);
        inserted
    }

    /// Process one sub-swath of a package and update both tables
    ///
    /// Bursts read before a failure stay committed; the error carries the
    /// package, sub-swath and (where known) burst index.
    pub fn process_package(&self, locator: &PackageLocator, swath: u8) -> BurstResult<PackageSummary> {
        let prepared = self.prepare(locator, swath);
        let (summary, failure) = self.commit(prepared);
        match failure {
            Some(error) => Err(error),
            None => Ok(summary),
        }
    }

    /// Process every configured sub-swath of every package
    ///
    /// Failures are collected in the returned run and do not stop the batch.
    /// Tables are updated in input order whether or not packages are read
    /// concurrently, so identical input yields identical exports.
    pub fn process_packages(&self, locators: &[PackageLocator]) -> CatalogRun {
        let jobs: Vec<(&PackageLocator, u8)> = locators
            .iter()
            .flat_map(|locator| self.config.swaths.iter().map(move |&swath| (locator, swath)))
            .collect();
        log::info!(
            "Processing {} packages ({} sub-swath jobs)",
            locators.len(),
            jobs.len()
        );

        let mut run = CatalogRun::default();
        for prepared in self.prepare_all(&jobs) {
            let (summary, failure) = self.commit(prepared);
            run.packages += 1;
            run.bursts += summary.bursts;
            run.new_entries += summary.new_entries;
            if let Some(error) = failure {
                run.failures.push(error);
            }
        }

        log::info!(
            "Catalog run complete: {} bursts observed, {} new identifiers, {} failures",
            run.bursts,
            run.new_entries,
            run.failures.len()
        );
        run
    }

    #[cfg(feature = "parallel")]
    fn prepare_all(&self, jobs: &[(&PackageLocator, u8)]) -> Vec<PreparedPackage> {
        use rayon::prelude::*;

        if self.config.parallel {
            jobs.par_iter()
                .map(|(locator, swath)| self.prepare(locator, *swath))
                .collect()
        } else {
            jobs.iter()
                .map(|(locator, swath)| self.prepare(locator, *swath))
                .collect()
        }
    }

    #[cfg(not(feature = "parallel"))]
    fn prepare_all(&self, jobs: &[(&PackageLocator, u8)]) -> Vec<PreparedPackage> {
        jobs.iter()
            .map(|(locator, swath)| self.prepare(locator, *swath))
            .collect()
    }

    fn prepare(&self, locator: &PackageLocator, swath: u8) -> PreparedPackage {
        let mut bursts = Vec::new();
        let failure = self.read_bursts(locator, swath, &mut bursts).err();
        PreparedPackage { bursts, failure }
    }

    fn read_bursts(
        &self,
        locator: &PackageLocator,
        swath: u8,
        bursts: &mut Vec<PreparedBurst>,
    ) -> BurstResult<()> {
        let context = |e: BurstError, burst: Option<usize>| e.in_package(&locator.url, swath, burst);

        let selector = SwathSelector::new(swath, self.config.polarization).map_err(|e| context(e, None))?;
        let mut package = AcquisitionPackage::open(&locator.path).map_err(|e| context(e, None))?;
        let platform = package.platform().map_err(|e| context(e, None))?;

        log::info!("Update catalog using {} ({})", package.file_name(), selector);
        let start_time = std::time::Instant::now();

        let annotation =
            AnnotationParser::extract(&mut package, &selector).map_err(|e| context(e, None))?;
        let gcps = self
            .gcp_source
            .read_ground_control(&mut package, &selector, &annotation)
            .map_err(|e| context(e, None))?;
        log::debug!("Package metadata read in {:?}", start_time.elapsed());

        let metadata = &annotation.metadata;
        for (index, burst) in metadata.bursts.iter().enumerate() {
            let burst_id = BurstId::derive(
                &platform,
                metadata.absolute_orbit,
                swath,
                burst.azimuth_time,
                metadata.ascending_node_time,
            );
            let footprint = build_footprint(&gcps, metadata.lines_per_burst, index)
                .map_err(|e| context(e, Some(index)))?;
            let (start, end) = metadata.line_span(index);

            bursts.push(PreparedBurst {
                entry: BurstCatalogEntry {
                    burst_id,
                    pass_direction: metadata.pass_direction,
                    footprint,
                },
                observation: ObservationRecord {
                    burst_id,
                    date: burst.azimuth_time.date_naive(),
                    url: locator.url.clone(),
                    measurement: gcps.raster_path.clone(),
                    annotation: annotation.annotation_path.clone(),
                    start,
                    end,
                },
            });
        }

        Ok(())
    }

    fn commit(&self, prepared: PreparedPackage) -> (PackageSummary, Option<BurstError>) {
        let mut summary = PackageSummary::default();
        for burst in prepared.bursts {
            if self.record_burst(burst.entry, burst.observation) {
                summary.new_entries += 1;
            }
            summary.bursts += 1;
        }

        if let Some(ref error) = prepared.failure {
            log::error!(
                "Failed to process {}: {} ({} bursts kept)",
                error,
                error.root_cause(),
                summary.bursts
            );
        }
        (summary, prepared.failure)
    }

    /// Snapshot of the footprint catalog, in insertion order
    pub fn entries(&self) -> Vec<BurstCatalogEntry> {
        self.lock().entries.clone()
    }

    /// Snapshot of the observation log, in insertion order
    pub fn observations(&self) -> Vec<ObservationRecord> {
        self.lock().observations.clone()
    }

    pub fn entry(&self, burst_id: &BurstId) -> Option<BurstCatalogEntry> {
        let tables = self.lock();
        tables.index.get(burst_id).map(|&i| tables.entries[i].clone())
    }

    pub fn contains(&self, burst_id: &BurstId) -> bool {
        self.lock().index.contains_key(burst_id)
    }

    /// Number of unique burst identifiers
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    pub fn observation_count(&self) -> usize {
        self.lock().observations.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BurstFootprint, PassDirection};
    use chrono::NaiveDate;

    fn entry(id: BurstId, lon: f64) -> BurstCatalogEntry {
        BurstCatalogEntry {
            burst_id: id,
            pass_direction: PassDirection::Ascending,
            footprint: BurstFootprint {
                ring: vec![(lon, 0.0), (lon + 1.0, 0.0), (lon + 1.0, 1.0), (lon, 1.0)],
                centroid: (lon + 0.5, 0.5),
            },
        }
    }

    fn observation(id: BurstId, url: &str) -> ObservationRecord {
        ObservationRecord {
            burst_id: id,
            date: NaiveDate::from_ymd_opt(2020, 1, 3).unwrap(),
            url: url.to_string(),
            measurement: "m.tiff".to_string(),
            annotation: "a.xml".to_string(),
            start: 0,
            end: 1508,
        }
    }

    #[test]
    fn test_first_writer_wins() {
        let catalog = BurstCatalog::default();
        let id = BurstId::new(12, 1, 2417);

        assert!(catalog.record_burst(entry(id, 10.0), observation(id, "first.zip")));
        assert!(!catalog.record_burst(entry(id, 10.001), observation(id, "second.zip")));

        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.observation_count(), 2);
        assert_eq!(catalog.entry(&id).unwrap().footprint.ring[0], (10.0, 0.0));
    }

    #[test]
    fn test_concurrent_recording_inserts_once() {
        let catalog = Arc::new(BurstCatalog::default());
        let id = BurstId::new(3, 2, 100);

        let handles: Vec<_> = (0..8)
            .map(|worker| {
                let catalog = Arc::clone(&catalog);
                std::thread::spawn(move || {
                    catalog.record_burst(entry(id, worker as f64), observation(id, "pkg.zip"))
                })
            })
            .collect();
        let inserted = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|&inserted| inserted)
            .count();

        assert_eq!(inserted, 1);
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.observation_count(), 8);
    }

    #[test]
    fn test_restore_keeps_first_duplicate() {
        let id = BurstId::new(1, 1, 1);
        let catalog = BurstCatalog::restore(
            CatalogConfig::default(),
            vec![entry(id, 5.0), entry(id, 6.0), entry(BurstId::new(1, 1, 2), 7.0)],
            vec![observation(id, "a.zip")],
        );

        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.entry(&id).unwrap().footprint.centroid.0, 5.5);
        assert_eq!(catalog.observation_count(), 1);
    }

    #[test]
    fn test_invalid_swath_is_reported_with_context() {
        let catalog = BurstCatalog::default();
        let locator = PackageLocator::local("/nonexistent/S1A_IW_SLC__1SDV_X.zip");

        let err = catalog.process_package(&locator, 4).unwrap_err();
        assert!(matches!(err, BurstError::Package { swath: 4, burst: None, .. }));
        assert!(matches!(err.root_cause(), BurstError::InvalidInput(_)));
        assert!(catalog.is_empty());
    }
}
