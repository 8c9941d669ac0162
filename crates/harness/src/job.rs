//! One encode-then-score job and its result.
//!
//! A job owns the full sequence for one (encoder, asset) pair: resolve paths,
//! run the encode under a timeout, score the output against the reference,
//! clean up. Failures never unwind out of [`Job::run`]; every exit path
//! returns a completed [`JobResult`] carrying whatever was recorded up to the
//! point of failure.

use crate::asset::Asset;
use crate::encoder::{EncodeError, Encoder};
use crate::vmaf;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Outcome of one step of a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Outcome {
    /// The step was never reached
    #[default]
    NotRun,
    Success,
    /// The step ran but its result is unusable (soft failure)
    Fail,
    Timeout,
    Error,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Outcome::NotRun => "Not Run",
            Outcome::Success => "Success",
            Outcome::Fail => "Fail",
            Outcome::Timeout => "Timeout",
            Outcome::Error => "Error",
        };
        write!(f, "{}", name)
    }
}

/// Parameters binding one encoder to one asset, built fresh per job.
#[derive(Clone)]
pub struct JobParams {
    pub encoder: Arc<dyn Encoder>,
    /// Name of the asset list the asset belongs to
    pub asset_list: String,
    pub asset: Asset,
    pub vmaf_binary: PathBuf,
    pub resources_dir: PathBuf,
    /// Suite output directory; the job writes one uniquely-named file into it
    pub output_dir: PathBuf,
    pub timeout: Duration,
    pub keep_files: bool,
    pub verbose: bool,
}

/// Result of one job.
///
/// Encoder name and asset filename are recorded before the encode starts so
/// a partial result is still identifiable. The score fields are only
/// meaningful when the encode outcome is [`Outcome::Success`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobResult {
    pub asset_fname: String,
    pub encoder_name: String,
    pub encode_time: Duration,
    pub encode_outcome: Outcome,
    pub vmaf_outcome: Outcome,
    pub vmaf_score: f64,
    pub vmaf_time: Duration,
}

impl JobResult {
    /// Both steps completed successfully
    pub fn is_success(&self) -> bool {
        self.encode_outcome == Outcome::Success && self.vmaf_outcome == Outcome::Success
    }

    /// Combined encode + score time
    pub fn total_time(&self) -> Duration {
        self.encode_time + self.vmaf_time
    }
}

impl fmt::Display for JobResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} — {}", self.encoder_name, self.asset_fname)?;
        if self.encode_outcome != Outcome::Success {
            return write!(f, " → Encode {}", self.encode_outcome);
        }
        if self.vmaf_outcome != Outcome::Success {
            return write!(f, " → VMAF {}", self.vmaf_outcome);
        }
        write!(
            f,
            " [{:.3}s] → {:.5}",
            self.total_time().as_secs_f64(),
            self.vmaf_score
        )
    }
}

/// One (encoder, asset) test unit
pub struct Job {
    params: JobParams,
}

impl Job {
    pub fn new(params: JobParams) -> Self {
        Self { params }
    }

    /// Absolute reference path: `<resources>/<list-name>/<filename>`
    pub fn input_path(&self) -> PathBuf {
        self.params
            .resources_dir
            .join(&self.params.asset_list)
            .join(&self.params.asset.filename)
    }

    /// Absolute output path, unique per asset name within the suite directory
    pub fn output_path(&self) -> PathBuf {
        self.params
            .output_dir
            .join(format!("{}.y4m", self.params.asset.name))
    }

    /// Run the encode-then-score sequence.
    ///
    /// Timeout and error outcomes of the encode step are terminal: the score
    /// step is only attempted after a successful encode. Unless `keep_files`
    /// is set, the output file is reclaimed on every exit path.
    pub async fn run(&self) -> JobResult {
        let mut result = JobResult {
            asset_fname: self.params.asset.filename.clone(),
            encoder_name: self.params.encoder.name().to_string(),
            ..JobResult::default()
        };

        let input = self.input_path();
        let output = self.output_path();

        let start = Instant::now();
        match self
            .params
            .encoder
            .encode(&input, &output, self.params.timeout, self.params.verbose)
            .await
        {
            Ok(()) => {
                result.encode_time = start.elapsed();
                result.encode_outcome = Outcome::Success;
            }
            Err(EncodeError::TimedOut { .. }) => {
                result.encode_outcome = Outcome::Timeout;
            }
            Err(err) => {
                log::debug!("Encode of {} failed: {}", self.params.asset.name, err);
                result.encode_outcome = Outcome::Error;
            }
        }

        if result.encode_outcome == Outcome::Success {
            let start = Instant::now();
            match vmaf::compute_score(
                &self.params.vmaf_binary,
                &input,
                &output,
                self.params.timeout,
                self.params.verbose,
            )
            .await
            {
                Ok(text) => {
                    result.vmaf_time = start.elapsed();
                    match vmaf::parse_score(&text) {
                        Some(score) => {
                            result.vmaf_score = score;
                            result.vmaf_outcome = Outcome::Success;
                        }
                        None => {
                            result.vmaf_outcome = Outcome::Fail;
                        }
                    }
                }
                Err(err) => {
                    log::debug!("VMAF on {} failed: {}", self.params.asset.name, err);
                    result.vmaf_outcome = Outcome::Error;
                }
            }
        }

        if !self.params.keep_files && output.is_file() {
            let _ = tokio::fs::remove_file(&output).await;
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::Codec;
    use crate::encoders::DummyEncoder;
    use async_trait::async_trait;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    /// Test encoder with scripted behavior
    struct FakeEncoder {
        behavior: FakeBehavior,
    }

    enum FakeBehavior {
        TimeOut,
        Fail,
    }

    #[async_trait]
    impl Encoder for FakeEncoder {
        fn name(&self) -> &str {
            "Fake"
        }
        fn description(&self) -> &str {
            "scripted test encoder"
        }
        fn codec(&self) -> Codec {
            Codec::Dummy
        }
        async fn check_available(&self, _verbose: bool) -> bool {
            true
        }
        async fn encode(
            &self,
            _input: &Path,
            _output: &Path,
            timeout: Duration,
            _verbose: bool,
        ) -> Result<(), EncodeError> {
            match self.behavior {
                FakeBehavior::TimeOut => Err(EncodeError::TimedOut {
                    secs: timeout.as_secs(),
                }),
                FakeBehavior::Fail => Err(EncodeError::Failed("exit code: 1".to_string())),
            }
        }
    }

    #[cfg(unix)]
    fn fake_scorer(dir: &Path, line: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.join("fake-vmaf");
        fs::write(&path, format!("#!/bin/sh\necho \"{}\"\n", line)).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    fn fixture(dir: &Path) -> (JobParams, PathBuf) {
        let resources = dir.join("resources");
        let output = dir.join("output");
        fs::create_dir_all(resources.join("basic")).unwrap();
        fs::create_dir_all(&output).unwrap();
        let input = resources.join("basic").join("clip.y4m");
        fs::write(&input, b"YUV4MPEG2 data").unwrap();

        let params = JobParams {
            encoder: Arc::new(DummyEncoder::new()),
            asset_list: "basic".to_string(),
            asset: Asset {
                name: "clip".to_string(),
                source: "https://example.com/clip.y4m".to_string(),
                checksum: "__skip__".to_string(),
                filename: "clip.y4m".to_string(),
            },
            vmaf_binary: PathBuf::from("/nonexistent/vmaf"),
            resources_dir: resources,
            output_dir: output,
            timeout: Duration::from_secs(5),
            keep_files: false,
            verbose: false,
        };
        (params, input)
    }

    #[test]
    fn test_outcome_display() {
        assert_eq!(Outcome::NotRun.to_string(), "Not Run");
        assert_eq!(Outcome::Success.to_string(), "Success");
        assert_eq!(Outcome::Fail.to_string(), "Fail");
        assert_eq!(Outcome::Timeout.to_string(), "Timeout");
        assert_eq!(Outcome::Error.to_string(), "Error");
    }

    #[test]
    fn test_result_display_success() {
        let result = JobResult {
            asset_fname: "clip.y4m".to_string(),
            encoder_name: "Dummy".to_string(),
            encode_time: Duration::from_millis(1250),
            encode_outcome: Outcome::Success,
            vmaf_outcome: Outcome::Success,
            vmaf_score: 87.65432,
            vmaf_time: Duration::from_millis(250),
        };
        assert_eq!(result.to_string(), "Dummy — clip.y4m [1.500s] → 87.65432");
    }

    #[test]
    fn test_result_display_encode_failure() {
        let result = JobResult {
            asset_fname: "clip.y4m".to_string(),
            encoder_name: "Dummy".to_string(),
            encode_outcome: Outcome::Timeout,
            ..JobResult::default()
        };
        assert_eq!(result.to_string(), "Dummy — clip.y4m → Encode Timeout");
    }

    #[test]
    fn test_result_display_vmaf_failure() {
        let result = JobResult {
            asset_fname: "clip.y4m".to_string(),
            encoder_name: "Dummy".to_string(),
            encode_outcome: Outcome::Success,
            vmaf_outcome: Outcome::Fail,
            ..JobResult::default()
        };
        assert_eq!(result.to_string(), "Dummy — clip.y4m → VMAF Fail");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_job_success_path() {
        let dir = TempDir::new().unwrap();
        let (mut params, _input) = fixture(dir.path());
        params.vmaf_binary = fake_scorer(dir.path(), "vmaf:90.0");

        let job = Job::new(params);
        let output = job.output_path();
        let result = job.run().await;

        assert_eq!(result.encode_outcome, Outcome::Success);
        assert_eq!(result.vmaf_outcome, Outcome::Success);
        assert!((result.vmaf_score - 90.0).abs() < 1e-9);
        assert_eq!(result.asset_fname, "clip.y4m");
        assert_eq!(result.encoder_name, "Dummy");
        // keep_files = false: the output is reclaimed
        assert!(!output.exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_job_keep_files() {
        let dir = TempDir::new().unwrap();
        let (mut params, _input) = fixture(dir.path());
        params.vmaf_binary = fake_scorer(dir.path(), "vmaf:90.0");
        params.keep_files = true;

        let job = Job::new(params);
        let output = job.output_path();
        let result = job.run().await;

        assert!(result.is_success());
        assert!(output.is_file());

        // A second run with keep_files = false reclaims it again
        let dir2 = TempDir::new().unwrap();
        let (mut params2, _) = fixture(dir2.path());
        params2.vmaf_binary = fake_scorer(dir2.path(), "vmaf:90.0");
        let job2 = Job::new(params2);
        let output2 = job2.output_path();
        job2.run().await;
        assert!(!output2.exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_job_unparseable_score_is_soft_failure() {
        let dir = TempDir::new().unwrap();
        let (mut params, _input) = fixture(dir.path());
        params.vmaf_binary = fake_scorer(dir.path(), "garbage");

        let result = Job::new(params).run().await;

        assert_eq!(result.encode_outcome, Outcome::Success);
        assert_eq!(result.vmaf_outcome, Outcome::Fail);
        assert_eq!(result.vmaf_score, 0.0);
    }

    #[tokio::test]
    async fn test_job_missing_scorer_is_error() {
        let dir = TempDir::new().unwrap();
        let (params, _input) = fixture(dir.path());

        let result = Job::new(params).run().await;

        assert_eq!(result.encode_outcome, Outcome::Success);
        assert_eq!(result.vmaf_outcome, Outcome::Error);
    }

    #[tokio::test]
    async fn test_job_encode_timeout_skips_score() {
        let dir = TempDir::new().unwrap();
        let (mut params, _input) = fixture(dir.path());
        params.encoder = Arc::new(FakeEncoder {
            behavior: FakeBehavior::TimeOut,
        });

        let job = Job::new(params);
        let output = job.output_path();
        let result = job.run().await;

        assert_eq!(result.encode_outcome, Outcome::Timeout);
        assert_eq!(result.vmaf_outcome, Outcome::NotRun);
        assert!(!output.exists());
        // Partial result is still identifiable
        assert_eq!(result.encoder_name, "Fake");
        assert_eq!(result.asset_fname, "clip.y4m");
    }

    #[tokio::test]
    async fn test_job_encode_error_skips_score() {
        let dir = TempDir::new().unwrap();
        let (mut params, _input) = fixture(dir.path());
        params.encoder = Arc::new(FakeEncoder {
            behavior: FakeBehavior::Fail,
        });

        let result = Job::new(params).run().await;

        assert_eq!(result.encode_outcome, Outcome::Error);
        assert_eq!(result.vmaf_outcome, Outcome::NotRun);
    }
}
