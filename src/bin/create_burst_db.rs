//! Build the burst ID database from Sentinel-1 IW SLC packages.
//!
//! Usage:
//!     create_burst_db --frame-dir /data/s1 --output-name burstID
//!     create_burst_db --query-results query_asf.json --download-dir /scratch/s1
//!     create_burst_db --frame-dir /data/s1 --resume --upload-dir /mnt/buckets --bucket burst-db

use anyhow::{bail, Context, Result};
use clap::Parser;
use s1_burst_id::core::export::export_paths;
use s1_burst_id::io::{
    DirectoryScan, Downloader, ExportUploader, LocalBucketUploader, PackageProvider, QueryResults,
};
use s1_burst_id::{BurstCatalog, CatalogConfig, Polarization};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(about = "Create a database of unique Sentinel-1 burst IDs")]
struct Args {
    /// Directory with existing Sentinel-1 SLC zip files (S1*IW*SLC*zip)
    #[arg(short = 'd', long)]
    frame_dir: Option<PathBuf>,

    /// Saved archive search results (JSON) listing packages to download
    #[arg(short = 'q', long, conflicts_with = "frame_dir")]
    query_results: Option<PathBuf>,

    /// Where downloaded packages are kept (defaults to the user cache)
    #[arg(long)]
    download_dir: Option<PathBuf>,

    /// Output name; writes NAME.csv (burst IDs) and NAME-stack.csv (observations)
    #[arg(short = 'o', long, default_value = "burstID")]
    output_name: PathBuf,

    /// Sub-swaths to process
    #[arg(short = 's', long, value_delimiter = ',', default_values_t = [1u8, 2, 3])]
    swaths: Vec<u8>,

    /// Polarization channel used to pick annotation and measurement files
    #[arg(short = 'p', long, default_value = "vv")]
    polarization: String,

    /// Start from the existing exports of NAME instead of an empty catalog
    #[arg(long)]
    resume: bool,

    /// Read packages one at a time
    #[arg(long)]
    sequential: bool,

    /// Root directory of the local bucket store to hand exports to
    #[arg(long, requires = "bucket")]
    upload_dir: Option<PathBuf>,

    /// Bucket the exports are uploaded to
    #[arg(long, requires = "upload_dir")]
    bucket: Option<String>,
}

fn provider(args: &Args) -> Result<Box<dyn PackageProvider>> {
    if let Some(dir) = &args.frame_dir {
        return Ok(Box::new(DirectoryScan::new(dir)?));
    }
    if let Some(query) = &args.query_results {
        let results = QueryResults::from_file(query)
            .with_context(|| format!("reading query results {}", query.display()))?;
        let target = args.download_dir.clone().unwrap_or_else(Downloader::default_dir);
        return Ok(Box::new(Downloader::new(results.urls().to_vec(), target)));
    }
    bail!("either --frame-dir or --query-results is required")
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let config = CatalogConfig {
        swaths: args.swaths.clone(),
        polarization: Some(args.polarization.parse::<Polarization>()?),
        parallel: !args.sequential,
    };
    let (ids_path, stack_path) = export_paths(&args.output_name);

    let catalog = if args.resume && ids_path.exists() && stack_path.exists() {
        BurstCatalog::from_csv(config, &ids_path, &stack_path)
            .with_context(|| format!("restoring catalog from {}", ids_path.display()))?
    } else {
        BurstCatalog::new(config)
    };

    let locators = provider(&args)?.packages()?;
    log::info!("Number of packages found: {}", locators.len());

    let run = catalog.process_packages(&locators);
    for failure in &run.failures {
        log::warn!("Skipped {}: {}", failure, failure.root_cause());
    }

    catalog
        .write_csv(&ids_path, &stack_path)
        .context("writing catalog exports")?;

    if let (Some(root), Some(bucket)) = (&args.upload_dir, &args.bucket) {
        let uploader = LocalBucketUploader::new(root);
        uploader.upload(&ids_path, bucket)?;
        uploader.upload(&stack_path, bucket)?;
    }

    println!(
        "{} unique burst IDs, {} observations ({} new IDs this run, {} failed package sub-swaths)",
        catalog.len(),
        catalog.observation_count(),
        run.new_entries,
        run.failures.len()
    );
    Ok(())
}
