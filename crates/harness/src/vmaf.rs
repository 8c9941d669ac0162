//! VMAF scorer discovery, invocation, and output parsing.
//!
//! The scorer is an external `vmaf` executable located on PATH or in the
//! resources directory, invoked once per job with the reference and the
//! distorted file. Its textual output carries the score as `label:value`.

use crate::command::{run_command_capture, CommandError};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Locate the VMAF binary: PATH first, then the resources directory.
pub fn find_vmaf(resources_dir: &Path) -> Option<PathBuf> {
    if let Ok(path) = which::which("vmaf") {
        return Some(path);
    }
    which::which_in("vmaf", Some(resources_dir), resources_dir).ok()
}

/// Parse a `label:value` line into a score.
///
/// Returns `None` when the separator is missing or the value is not a float.
pub fn parse_score(output: &str) -> Option<f64> {
    output.split(':').nth(1)?.trim().parse().ok()
}

/// Run the scorer against a reference/distorted pair, returning its output.
pub async fn compute_score(
    binary: &Path,
    reference: &Path,
    distorted: &Path,
    timeout: Duration,
    verbose: bool,
) -> Result<String, CommandError> {
    let args = vec![
        "--quiet".to_string(),
        "--reference".to_string(),
        reference.display().to_string(),
        "--distorted".to_string(),
        distorted.display().to_string(),
    ];
    run_command_capture(&binary.display().to_string(), &args, Some(timeout), verbose).await
}
