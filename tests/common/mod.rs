//! Synthetic SAFE packages for integration tests
#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use zip::write::FileOptions;
use zip::ZipWriter;

pub const LINES_PER_BURST: u64 = 1500;
pub const PIXELS: [u64; 3] = [0, 10000, 20000];

pub fn anx_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2020, 1, 3, 16, 15, 8).unwrap() + Duration::microseconds(497_474)
}

/// Azimuth time in the middle of burst cycle `bucket`
pub fn azimuth_time(anx: DateTime<Utc>, bucket: i64) -> DateTime<Utc> {
    anx + Duration::microseconds(((bucket as f64 + 0.5) * 2_758_277.0) as i64)
}

fn format_time(time: DateTime<Utc>) -> String {
    time.format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
}

/// Description of one synthetic package
#[derive(Debug, Clone)]
pub struct SyntheticPackage {
    pub name: String,
    pub orbit: u32,
    pub pass: String,
    pub anx: DateTime<Utc>,
    pub first_bucket: i64,
    pub bursts: usize,
    pub polarizations: Vec<&'static str>,
    /// Burst boundary line left without grid points, if any
    pub drop_line: Option<u64>,
    /// Shift applied to every longitude, to mimic acquisition noise
    pub lon_jitter: f64,
    pub include_annotation: bool,
}

impl SyntheticPackage {
    pub fn s1a(first_bucket: i64) -> Self {
        Self {
            name: "S1A_IW_SLC__1SDV_20200103T170815_20200103T170842_030639_0382D5_DADE".to_string(),
            orbit: 30639,
            pass: "Descending".to_string(),
            anx: anx_time(),
            first_bucket,
            bursts: 3,
            polarizations: vec!["vv"],
            drop_line: None,
            lon_jitter: 0.0,
            include_annotation: true,
        }
    }

    pub fn s1b(first_bucket: i64) -> Self {
        Self {
            name: "S1B_IW_SLC__1SDV_20200109T170730_20200109T170757_019734_0254C5_0E2F".to_string(),
            orbit: 19734,
            ..Self::s1a(first_bucket)
        }
    }

    fn member_stem(&self, swath: u8, pol: &str) -> String {
        format!(
            "{}-iw{}-slc-{}-20200103t170816-20200103t170841-030639-0382d5-00{}",
            &self.name[..3].to_lowercase(),
            swath,
            pol,
            swath
        )
    }

    /// In-package path of the annotation of `swath`/`pol`
    pub fn annotation_path(&self, swath: u8, pol: &str) -> String {
        format!("{}.SAFE/annotation/{}.xml", self.name, self.member_stem(swath, pol))
    }

    /// In-package path of the measurement raster of `swath`/`pol`
    pub fn measurement_path(&self, swath: u8, pol: &str) -> String {
        format!("{}.SAFE/measurement/{}.tiff", self.name, self.member_stem(swath, pol))
    }

    /// Ground position of a grid point
    pub fn ground(&self, swath: u8, line: u64, pixel: u64) -> (f64, f64) {
        let lon = -121.0 + 0.8 * (swath as f64 - 1.0) + pixel as f64 * 4.0e-5 + self.lon_jitter;
        let lat = 20.0 + 0.02 * (self.first_bucket as f64 + line as f64 / LINES_PER_BURST as f64);
        (lon, lat)
    }

    pub fn annotation_xml(&self, swath: u8) -> String {
        let mut bursts = String::new();
        for i in 0..self.bursts {
            let time = azimuth_time(self.anx, self.first_bucket + i as i64);
            bursts.push_str(&format!(
                "      <burst>\n        <azimuthTime>{}</azimuthTime>\n        <byteOffset>{}</byteOffset>\n      </burst>\n",
                format_time(time),
                i * 1000
            ));
        }

        let mut grid = String::new();
        let mut count = 0;
        for k in 0..=self.bursts as u64 {
            let line = k * LINES_PER_BURST;
            if self.drop_line == Some(line) {
                continue;
            }
            for &pixel in PIXELS.iter() {
                let (lon, lat) = self.ground(swath, line, pixel);
                grid.push_str(&format!(
                    "      <geolocationGridPoint>\n        <azimuthTime>{}</azimuthTime>\n        <line>{}</line>\n        <pixel>{}</pixel>\n        <latitude>{}</latitude>\n        <longitude>{}</longitude>\n        <height>0</height>\n      </geolocationGridPoint>\n",
                    format_time(self.anx),
                    line,
                    pixel,
                    lat,
                    lon
                ));
                count += 1;
            }
        }

        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<product>
  <adsHeader>
    <missionId>{mission}</missionId>
    <productType>SLC</productType>
    <polarisation>VV</polarisation>
    <mode>IW</mode>
    <swath>IW{swath}</swath>
    <absoluteOrbitNumber>{orbit}</absoluteOrbitNumber>
  </adsHeader>
  <qualityInformation>
    <productQualityIndex>0.0</productQualityIndex>
  </qualityInformation>
  <generalAnnotation>
    <productInformation>
      <pass>{pass}</pass>
      <timelinessCategory>Fast-24h</timelinessCategory>
    </productInformation>
  </generalAnnotation>
  <imageAnnotation>
    <imageInformation>
      <productFirstLineUtcTime>{anx}</productFirstLineUtcTime>
      <ascendingNodeTime>{anx}</ascendingNodeTime>
      <numberOfLines>{lines}</numberOfLines>
    </imageInformation>
  </imageAnnotation>
  <swathTiming>
    <linesPerBurst>{lpb}</linesPerBurst>
    <samplesPerBurst>20001</samplesPerBurst>
    <burstList count="{burst_count}">
{bursts}    </burstList>
  </swathTiming>
  <geolocationGrid>
    <geolocationGridPointList count="{grid_count}">
{grid}    </geolocationGridPointList>
  </geolocationGrid>
</product>
"#,
            mission = &self.name[..3],
            swath = swath,
            orbit = self.orbit,
            pass = self.pass,
            anx = format_time(self.anx),
            lines = LINES_PER_BURST * self.bursts as u64,
            lpb = LINES_PER_BURST,
            burst_count = self.bursts,
            bursts = bursts,
            grid_count = count,
            grid = grid,
        )
    }

    /// Write the package as `{dir}/{name}.zip`
    pub fn write(&self, dir: &Path) -> PathBuf {
        let path = dir.join(format!("{}.zip", self.name));
        let mut zip = ZipWriter::new(File::create(&path).unwrap());
        let options = FileOptions::default();

        zip.start_file(format!("{}.SAFE/manifest.safe", self.name), options).unwrap();
        zip.write_all(b"<xfdu:XFDU/>").unwrap();

        for swath in 1..=3u8 {
            for pol in &self.polarizations {
                if self.include_annotation {
                    zip.start_file(self.annotation_path(swath, pol), options).unwrap();
                    zip.write_all(self.annotation_xml(swath).as_bytes()).unwrap();
                }

                zip.start_file(
                    format!(
                        "{}.SAFE/annotation/calibration/calibration-{}.xml",
                        self.name,
                        self.member_stem(swath, pol)
                    ),
                    options,
                )
                .unwrap();
                zip.write_all(b"<calibration/>").unwrap();

                zip.start_file(self.measurement_path(swath, pol), options).unwrap();
                zip.write_all(b"II*\0").unwrap();
            }
        }

        zip.finish().unwrap();
        path
    }
}
