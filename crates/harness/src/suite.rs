//! Suite controller: one encoder's full run against a fixed asset set.
//!
//! A test suite binds an asset set to the run parameters; each `run` call
//! executes every asset against one encoder. The suite owns its output
//! directory for the duration of the run and resets it up front so stale
//! files from a previous run never leak into result interpretation.

use crate::asset::Asset;
use crate::encoder::Encoder;
use crate::engine::{BatchReport, EngineParams, ExecutionEngine};
use crate::job::{Job, JobParams};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Error type for suite operations
#[derive(Debug, Error)]
pub enum SuiteError {
    /// Failed to reset or create the suite output directory
    #[error("Failed to prepare output directory {dir}: {source}")]
    OutputDir {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Parameters for a test suite
#[derive(Clone)]
pub struct SuiteParams {
    /// Suite name; also the name of its output subdirectory
    pub name: String,
    /// Worker count for the execution engine
    pub jobs: usize,
    /// The (asset-list-name, asset) pairs to test
    pub assets: Vec<(String, Asset)>,
    pub timeout: Duration,
    pub fail_fast: bool,
    pub quiet: bool,
    pub keep_files: bool,
    pub verbose: bool,
    pub vmaf_binary: PathBuf,
    pub resources_dir: PathBuf,
    pub output_dir: PathBuf,
}

/// A test suite: one encoder encoding multiple assets
pub struct TestSuite {
    params: SuiteParams,
}

impl TestSuite {
    pub fn new(params: SuiteParams) -> Self {
        Self { params }
    }

    fn generate_jobs(&self, encoder: &Arc<dyn Encoder>, suite_dir: &Path) -> Vec<Job> {
        self.params
            .assets
            .iter()
            .map(|(list_name, asset)| {
                Job::new(JobParams {
                    encoder: encoder.clone(),
                    asset_list: list_name.clone(),
                    asset: asset.clone(),
                    vmaf_binary: self.params.vmaf_binary.clone(),
                    resources_dir: self.params.resources_dir.clone(),
                    output_dir: suite_dir.to_path_buf(),
                    timeout: self.params.timeout,
                    keep_files: self.params.keep_files,
                    verbose: self.params.verbose,
                })
            })
            .collect()
    }

    /// Run the suite for one encoder.
    ///
    /// Returns `Ok(None)` when the encoder is unavailable: a skip, not a
    /// failure, with the output directory left untouched. Otherwise the raw
    /// results are returned for the caller to aggregate; the suite itself
    /// computes no pass/fail counts.
    pub async fn run(&self, encoder: Arc<dyn Encoder>) -> Result<Option<BatchReport>, SuiteError> {
        if !encoder.check_available(self.params.verbose).await {
            println!(
                "Skipping encoder {} because it cannot run",
                encoder.name()
            );
            return Ok(None);
        }

        let suite_dir = self.params.output_dir.join(&self.params.name);
        if suite_dir.exists() {
            std::fs::remove_dir_all(&suite_dir).map_err(|source| SuiteError::OutputDir {
                dir: suite_dir.clone(),
                source,
            })?;
        }
        std::fs::create_dir_all(&suite_dir).map_err(|source| SuiteError::OutputDir {
            dir: suite_dir.clone(),
            source,
        })?;

        let jobs = self.generate_jobs(&encoder, &suite_dir);
        println!(
            "Running {} [{} tests] for encoder {}",
            self.params.name,
            jobs.len(),
            encoder.name()
        );

        let engine = ExecutionEngine::new(EngineParams {
            workers: self.params.jobs,
            fail_fast: self.params.fail_fast,
            quiet: self.params.quiet,
        });
        let report = engine.run(jobs).await;

        println!(
            "Ran {} tests in {:.3} secs\n",
            report.num_results(),
            report.elapsed.as_secs_f64()
        );

        Ok(Some(report))
    }
}
