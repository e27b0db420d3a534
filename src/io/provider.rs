//! Collaborators at the edge of the catalog: where packages come from and
//! where finished exports go.

use crate::types::{BurstError, BurstResult};
use regex::Regex;
use reqwest::blocking::Client;
use serde::Deserialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::NamedTempFile;

/// A package to catalogue: where it lives locally and how it is referenced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageLocator {
    pub path: PathBuf,
    /// Reference written to the observation log (download URL or local path)
    pub url: String,
}

impl PackageLocator {
    /// Locator of a local file, referenced by its own path
    pub fn local<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let url = path.display().to_string();
        Self { path, url }
    }
}

/// Source of acquisition packages
pub trait PackageProvider {
    fn packages(&self) -> BurstResult<Vec<PackageLocator>>;
}

/// Scan a directory for zipped IW SLC packages (`S1*IW*SLC*.zip`)
pub struct DirectoryScan {
    dir: PathBuf,
    pattern: Regex,
}

impl DirectoryScan {
    pub fn new<P: AsRef<Path>>(dir: P) -> BurstResult<Self> {
        let pattern = Regex::new(r"^S1.*IW.*SLC.*\.zip$")
            .map_err(|e| BurstError::InvalidInput(format!("Bad package pattern: {}", e)))?;
        Ok(Self {
            dir: dir.as_ref().to_path_buf(),
            pattern,
        })
    }
}

impl PackageProvider for DirectoryScan {
    fn packages(&self) -> BurstResult<Vec<PackageLocator>> {
        let mut paths = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if entry.file_type()?.is_file() && self.pattern.is_match(&name) {
                paths.push(entry.path());
            }
        }
        paths.sort();

        log::info!("Found {} packages in {}", paths.len(), self.dir.display());
        Ok(paths.into_iter().map(PackageLocator::local).collect())
    }
}

#[derive(Debug, Deserialize)]
struct QueryResult {
    #[serde(rename = "downloadUrl")]
    download_url: String,
}

/// Package URLs from a saved archive search (ASF JSON output)
pub struct QueryResults {
    urls: Vec<String>,
}

impl QueryResults {
    /// Parse the search output, a list holding one list of result records
    pub fn from_json(json: &str) -> BurstResult<Self> {
        let pages: Vec<Vec<QueryResult>> = serde_json::from_str(json)?;
        let urls = pages
            .into_iter()
            .flatten()
            .map(|r| r.download_url)
            .collect::<Vec<_>>();
        log::info!("Query lists {} packages", urls.len());
        Ok(Self { urls })
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> BurstResult<Self> {
        Self::from_json(&fs::read_to_string(path)?)
    }

    pub fn urls(&self) -> &[String] {
        &self.urls
    }
}

/// Fetches package URLs into a local directory, reusing files already there
///
/// A URL that still fails after all attempts is logged and skipped, so one
/// unreachable package never costs the rest of the batch.
pub struct Downloader {
    urls: Vec<String>,
    target_dir: PathBuf,
    max_retries: u32,
    retry_delay: Duration,
    timeout: Duration,
}

impl Downloader {
    pub fn new<P: AsRef<Path>>(urls: Vec<String>, target_dir: P) -> Self {
        Self {
            urls,
            target_dir: target_dir.as_ref().to_path_buf(),
            max_retries: 3,
            retry_delay: Duration::from_secs(2),
            timeout: Duration::from_secs(300),
        }
    }

    /// Attempts per URL (at least one) and the wait between them
    pub fn with_retries(mut self, max_retries: u32, retry_delay: Duration) -> Self {
        self.max_retries = max_retries.max(1);
        self.retry_delay = retry_delay;
        self
    }

    /// Per-request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Per-user cache directory for downloaded packages
    pub fn default_dir() -> PathBuf {
        dirs::cache_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("s1-burst-id")
            .join("packages")
    }

    /// Local path a URL is stored under
    pub fn local_path(&self, url: &str) -> BurstResult<PathBuf> {
        let name = url
            .split(['?', '#'])
            .next()
            .and_then(|u| u.rsplit('/').next())
            .filter(|n| !n.is_empty())
            .ok_or_else(|| BurstError::InvalidInput(format!("No file name in URL: {}", url)))?;
        Ok(self.target_dir.join(name))
    }

    fn client(&self) -> BurstResult<Client> {
        Ok(Client::builder()
            .timeout(self.timeout)
            .user_agent(concat!("s1-burst-id/", env!("CARGO_PKG_VERSION")))
            .build()?)
    }

    /// Download with retries; the last error is returned if every attempt fails
    fn download_with_retries(&self, client: &Client, url: &str, path: &Path) -> BurstResult<()> {
        let mut last_error = None;

        for attempt in 1..=self.max_retries {
            log::debug!("Download attempt {} of {} for {}", attempt, self.max_retries, url);

            match self.try_download_once(client, url, path) {
                Ok(()) => return Ok(()),
                Err(e) => {
                    last_error = Some(e);
                    if attempt < self.max_retries {
                        log::warn!("Download attempt {} failed, retrying...", attempt);
                        std::thread::sleep(self.retry_delay);
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            BurstError::NotFound(format!("Download of {} failed after all retries", url))
        }))
    }

    fn try_download_once(&self, client: &Client, url: &str, path: &Path) -> BurstResult<()> {
        log::info!("Downloading {}", url);
        let start_time = std::time::Instant::now();

        let mut response = client.get(url).send()?.error_for_status()?;
        let mut temp_file = NamedTempFile::new_in(&self.target_dir)?;
        let bytes = response.copy_to(&mut temp_file)?;
        temp_file.flush()?;
        temp_file
            .persist(path)
            .map_err(|e| BurstError::Io(e.error))?;

        log::info!(
            "Downloaded {} ({:.1} MB) in {:?}",
            path.display(),
            bytes as f64 / (1024.0 * 1024.0),
            start_time.elapsed()
        );
        Ok(())
    }
}

impl PackageProvider for Downloader {
    fn packages(&self) -> BurstResult<Vec<PackageLocator>> {
        fs::create_dir_all(&self.target_dir)?;
        let client = self.client()?;

        let mut locators = Vec::with_capacity(self.urls.len());
        for url in &self.urls {
            let path = match self.local_path(url) {
                Ok(path) => path,
                Err(e) => {
                    log::warn!("Skipping {}: {}", url, e);
                    continue;
                }
            };

            if path.exists() {
                log::info!("{} already exists", path.display());
            } else if let Err(e) = self.download_with_retries(&client, url, &path) {
                log::warn!("Skipping {}: {}", url, e);
                continue;
            }

            locators.push(PackageLocator {
                path,
                url: url.clone(),
            });
        }

        if locators.len() < self.urls.len() {
            log::warn!(
                "{} of {} packages could not be fetched",
                self.urls.len() - locators.len(),
                self.urls.len()
            );
        }
        Ok(locators)
    }
}

/// Hand-off of a finished export file to a storage bucket
pub trait ExportUploader {
    fn upload(&self, file: &Path, bucket: &str) -> BurstResult<()>;
}

/// Uploader that treats `{root}/{bucket}` directories as buckets
pub struct LocalBucketUploader {
    root: PathBuf,
}

impl LocalBucketUploader {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }
}

impl ExportUploader for LocalBucketUploader {
    fn upload(&self, file: &Path, bucket: &str) -> BurstResult<()> {
        let name = file
            .file_name()
            .ok_or_else(|| BurstError::InvalidInput(format!("Not a file: {}", file.display())))?;
        let bucket_dir = self.root.join(bucket);
        fs::create_dir_all(&bucket_dir)?;
        fs::copy(file, bucket_dir.join(name))?;
        log::info!("Uploaded {} to {}", file.display(), bucket_dir.display());
        Ok(())
    }
}
