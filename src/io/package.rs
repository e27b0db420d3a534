use crate::core::burst_id::PlatformDesignator;
use crate::types::{BurstError, BurstResult, Polarization};
use regex::Regex;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use zip::ZipArchive;

/// Selects one IW sub-swath (and optionally one polarization) of a package
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwathSelector {
    pub swath: u8,
    pub polarization: Option<Polarization>,
}

impl SwathSelector {
    pub fn new(swath: u8, polarization: Option<Polarization>) -> BurstResult<Self> {
        if !(1..=3).contains(&swath) {
            return Err(BurstError::InvalidInput(format!(
                "Sub-swath must be 1, 2 or 3, got {}",
                swath
            )));
        }
        Ok(Self { swath, polarization })
    }

    fn member_pattern(&self, folder: &str, extension: &str) -> BurstResult<Regex> {
        let pol = match self.polarization {
            Some(pol) => format!("{}-", pol.to_string().to_lowercase()),
            None => String::new(),
        };
        let pattern = format!(
            r"^.*SAFE/{}/s1[ab]-iw{}-slc-{}[^/]*\.{}$",
            folder, self.swath, pol, extension
        );
        Regex::new(&pattern)
            .map_err(|e| BurstError::InvalidInput(format!("Bad member pattern {}: {}", pattern, e)))
    }

    /// Pattern of the product annotation document of this sub-swath
    pub fn annotation_pattern(&self) -> BurstResult<Regex> {
        self.member_pattern("annotation", "xml")
    }

    /// Pattern of the measurement raster of this sub-swath
    pub fn measurement_pattern(&self) -> BurstResult<Regex> {
        self.member_pattern("measurement", "tiff")
    }
}

impl std::fmt::Display for SwathSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.polarization {
            Some(pol) => write!(f, "IW{} {}", self.swath, pol),
            None => write!(f, "IW{}", self.swath),
        }
    }
}

/// Zipped Sentinel-1 SAFE acquisition package
pub struct AcquisitionPackage {
    zip_path: PathBuf,
    archive: Option<ZipArchive<File>>,
}

impl AcquisitionPackage {
    /// Open a package; the archive itself is read on first access
    pub fn open<P: AsRef<Path>>(zip_path: P) -> BurstResult<Self> {
        let zip_path = zip_path.as_ref().to_path_buf();

        if !zip_path.exists() {
            return Err(BurstError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("File not found: {}", zip_path.display()),
            )));
        }

        Ok(Self {
            zip_path,
            archive: None,
        })
    }

    pub fn path(&self) -> &Path {
        &self.zip_path
    }

    /// File name of the package, e.g. `S1A_IW_SLC__1SDV_..._DADE.zip`
    pub fn file_name(&self) -> String {
        self.zip_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Platform designator encoded in the package name
    pub fn platform(&self) -> BurstResult<PlatformDesignator> {
        PlatformDesignator::from_package_name(&self.file_name())
    }

    fn open_archive(&mut self) -> BurstResult<&mut ZipArchive<File>> {
        let archive = match self.archive.take() {
            Some(archive) => archive,
            None => {
                let file = File::open(&self.zip_path)?;
                ZipArchive::new(file)?
            }
        };
        Ok(self.archive.insert(archive))
    }

    /// List all members of the archive
    pub fn list_files(&mut self) -> BurstResult<Vec<String>> {
        let archive = self.open_archive()?;
        Ok(archive.file_names().map(str::to_string).collect())
    }

    /// The single member whose path matches `pattern`
    ///
    /// No match and several matches are both reported as `NotFound`.
    pub fn find_unique(&mut self, pattern: &Regex) -> BurstResult<String> {
        let mut matches: Vec<String> = self
            .list_files()?
            .into_iter()
            .filter(|name| pattern.is_match(name))
            .collect();

        match matches.len() {
            1 => Ok(matches.remove(0)),
            0 => Err(BurstError::NotFound(format!(
                "No member of {} matches {}",
                self.zip_path.display(),
                pattern.as_str()
            ))),
            n => {
                matches.sort();
                Err(BurstError::NotFound(format!(
                    "{} members of {} match {} (ambiguous): {}",
                    n,
                    self.zip_path.display(),
                    pattern.as_str(),
                    matches.join(", ")
                )))
            }
        }
    }

    /// Read a member as UTF-8 text
    pub fn read_to_string(&mut self, member: &str) -> BurstResult<String> {
        let archive = self.open_archive()?;
        let mut file = archive.by_name(member)?;
        let mut content = String::new();
        file.read_to_string(&mut content)?;
        Ok(content)
    }
}
