//! Top-level orchestration: asset-list loading, matching, and suite runs.
//!
//! The [`Harness`] owns the directory layout and the loaded asset lists; the
//! encoder registry is constructed by the caller and passed in by reference,
//! which keeps fakes injectable in tests. Configuration-level failures (no
//! asset lists, no matching encoders, no scorer binary) abort a run before
//! any job is scheduled.

use crate::asset::{discover_asset_lists, Asset, AssetError, AssetList};
use crate::download::{download_asset_list, DownloadError};
use crate::encoder::EncoderRegistry;
use crate::engine::BatchReport;
use crate::suite::{SuiteError, SuiteParams, TestSuite};
use crate::vmaf;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Error type for harness operations
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error(transparent)]
    Asset(#[from] AssetError),

    #[error(transparent)]
    Download(#[from] DownloadError),

    #[error(transparent)]
    Suite(#[from] SuiteError),

    /// No VMAF binary on PATH or in the resources directory
    #[error("No VMAF binary found")]
    NoVmaf,

    /// No encoders matched the requested names
    #[error("No encoders to test")]
    NoEncoders,

    /// Asset filtering left nothing to test
    #[error("No defined assets to test")]
    NoAssets,

    /// Requested names that match nothing
    #[error("No {kind} found for: {names}")]
    Unmatched { kind: &'static str, names: String },
}

/// Options for one `run` invocation
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Worker count (already resolved; see [`default_jobs`])
    pub jobs: usize,
    /// Per-encode and per-score timeout
    pub timeout: Duration,
    /// Only these asset lists (all when None)
    pub asset_lists: Option<Vec<String>>,
    /// Only these assets, by name
    pub assets: Option<Vec<String>>,
    /// Skip these assets, by name
    pub skip_assets: Option<Vec<String>>,
    /// Only these encoders (all when None)
    pub encoders: Option<Vec<String>>,
    pub fail_fast: bool,
    pub quiet: bool,
    pub keep_files: bool,
    pub verbose: bool,
    /// Explicit scorer path, bypassing discovery
    pub vmaf_binary: Option<PathBuf>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            jobs: default_jobs(),
            timeout: Duration::from_secs(350),
            asset_lists: None,
            assets: None,
            skip_assets: None,
            encoders: None,
            fail_fast: false,
            quiet: false,
            keep_files: false,
            verbose: false,
            vmaf_binary: None,
        }
    }
}

/// Default worker count for test runs: one per logical core
pub fn default_jobs() -> usize {
    num_cpus::get()
}

/// Default worker count for downloads: two per logical core
pub fn default_download_jobs() -> usize {
    2 * num_cpus::get()
}

/// Case-insensitive selection of items by name.
///
/// With no request, everything is selected. Requested names that match no
/// item make the whole selection fail, listing the strays.
fn match_named<'a, T>(
    requested: Option<&[String]>,
    items: &'a [T],
    name_of: impl Fn(&T) -> &str,
    kind: &'static str,
) -> Result<Vec<&'a T>, HarnessError> {
    let Some(requested) = requested else {
        return Ok(items.iter().collect());
    };

    let wanted: Vec<String> = requested.iter().map(|n| n.to_lowercase()).collect();
    let unmatched: Vec<&String> = wanted
        .iter()
        .filter(|name| !items.iter().any(|i| name_of(i).to_lowercase() == **name))
        .collect();
    if !unmatched.is_empty() {
        return Err(HarnessError::Unmatched {
            kind,
            names: unmatched
                .iter()
                .map(|s| s.as_str())
                .collect::<Vec<_>>()
                .join(", "),
        });
    }

    Ok(items
        .iter()
        .filter(|i| wanted.contains(&name_of(i).to_lowercase()))
        .collect())
}

/// Main harness state for one process invocation
pub struct Harness {
    assets_dirs: Vec<PathBuf>,
    resources_dir: PathBuf,
    output_dir: PathBuf,
    asset_lists: Option<Vec<AssetList>>,
}

impl Harness {
    pub fn new(assets_dirs: Vec<PathBuf>, resources_dir: PathBuf, output_dir: PathBuf) -> Self {
        Self {
            assets_dirs,
            resources_dir,
            output_dir,
            asset_lists: None,
        }
    }

    /// Load asset lists once; later calls reuse the loaded set.
    fn load_asset_lists(&mut self) -> Result<&[AssetList], HarnessError> {
        if self.asset_lists.is_none() {
            self.asset_lists = Some(discover_asset_lists(&self.assets_dirs)?);
        }
        Ok(self.asset_lists.as_deref().unwrap_or_default())
    }

    /// Run the matched asset lists against every matched encoder.
    ///
    /// One suite is built for the whole asset selection and run once per
    /// encoder; unavailable encoders are skipped and produce no report.
    pub async fn run(
        &mut self,
        registry: &EncoderRegistry,
        opts: RunOptions,
    ) -> Result<Vec<BatchReport>, HarnessError> {
        let vmaf_binary = match &opts.vmaf_binary {
            Some(path) => path.clone(),
            None => vmaf::find_vmaf(&self.resources_dir).ok_or(HarnessError::NoVmaf)?,
        };

        let encoders: Vec<_> = match_named(
            opts.encoders.as_deref(),
            registry.all(),
            |e| e.name(),
            "encoders",
        )?
        .into_iter()
        .cloned()
        .collect();
        if encoders.is_empty() {
            return Err(HarnessError::NoEncoders);
        }

        let resources_dir = self.resources_dir.clone();
        let output_dir = self.output_dir.clone();
        let lists = self.load_asset_lists()?;
        let lists = match_named(opts.asset_lists.as_deref(), lists, |l| l.name(), "asset lists")?;

        let mut assets: Vec<(String, Asset)> = lists
            .iter()
            .flat_map(|list| {
                list.assets()
                    .iter()
                    .map(|asset| (list.name().to_string(), asset.clone()))
            })
            .collect();
        if let Some(names) = &opts.assets {
            assets.retain(|(_, asset)| names.contains(&asset.name));
        }
        if let Some(skip) = &opts.skip_assets {
            assets.retain(|(_, asset)| !skip.contains(&asset.name));
        }
        if assets.is_empty() {
            return Err(HarnessError::NoAssets);
        }

        let suite_name = lists
            .iter()
            .map(|l| l.name())
            .collect::<Vec<_>>()
            .join("-");

        let suite = TestSuite::new(SuiteParams {
            name: suite_name,
            jobs: opts.jobs.max(1),
            assets,
            timeout: opts.timeout,
            fail_fast: opts.fail_fast,
            quiet: opts.quiet,
            keep_files: opts.keep_files,
            verbose: opts.verbose,
            vmaf_binary,
            resources_dir,
            output_dir,
        });

        let mut reports = Vec::new();
        for encoder in encoders {
            if let Some(report) = suite.run(encoder).await? {
                reports.push(report);
            }
        }
        Ok(reports)
    }

    /// Download the matched asset lists into the resources directory.
    pub async fn download_assets(
        &mut self,
        names: Option<&[String]>,
        jobs: usize,
        retries: u32,
    ) -> Result<(), HarnessError> {
        let resources_dir = self.resources_dir.clone();
        let lists = self.load_asset_lists()?;
        let selected = match_named(names, lists, |l| l.name(), "asset lists")?;
        for list in selected {
            download_asset_list(list, &resources_dir, jobs, retries).await?;
        }
        Ok(())
    }

    /// Print the available asset lists, optionally with their assets.
    pub fn list_asset_lists(
        &mut self,
        show_assets: bool,
        filter: Option<&[String]>,
    ) -> Result<(), HarnessError> {
        let lists = self.load_asset_lists()?;
        let selected = match_named(filter, lists, |l| l.name(), "asset lists")?;

        println!("\nList of available asset lists:");
        for list in selected {
            println!("\t{}", list);
            if show_assets {
                for asset in list.assets() {
                    println!("\t\t{}", asset);
                }
            }
        }
        Ok(())
    }

    /// Print the available encoders, optionally checking each one.
    pub async fn list_encoders(&self, registry: &EncoderRegistry, check: bool, verbose: bool) {
        println!("\nList of available encoders:");
        for encoder in registry.iter() {
            let mut line = format!("{}: {}", encoder.name(), encoder.description());
            if check {
                line.push_str(if encoder.check_available(verbose).await {
                    " … ✓"
                } else {
                    " … ✗"
                });
            }
            println!("\t{}", line);
        }
    }
}
