//! Checksum-verified asset downloads with retry and backoff.
//!
//! Downloads the resources of an asset list into
//! `<resources-dir>/<list-name>/`, skipping files whose on-disk checksum
//! already matches. Each asset is fetched on its own task; a semaphore bounds
//! the number of downloads in flight.

use crate::asset::{Asset, AssetList};
use sha2::{Digest, Sha256};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Semaphore;

/// Checksum sentinel that disables verification for an asset
pub const CHECKSUM_SKIP: &str = "__skip__";

/// Error type for download operations
#[derive(Debug, Error)]
pub enum DownloadError {
    /// HTTP request failed after all retries
    #[error("Unable to download {url}: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Failed to store the downloaded file
    #[error("Unable to store {url} to {dest}: {source}")]
    Io {
        url: String,
        dest: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Downloaded content did not match the declared checksum
    #[error("Checksum error for asset '{asset}': '{actual}' instead of '{expected}'")]
    ChecksumMismatch {
        asset: String,
        expected: String,
        actual: String,
    },

    /// One or more asset downloads failed
    #[error("Some downloads failed")]
    Failed,
}

/// Compute the SHA-256 checksum of a file, reading 64K chunks.
pub fn file_checksum(path: &Path) -> std::io::Result<String> {
    let mut file = std::fs::File::open(path)?;
    let mut hasher = Sha256::new();
    let mut chunk = [0u8; 65536];
    loop {
        let n = file.read(&mut chunk)?;
        if n == 0 {
            break;
        }
        hasher.update(&chunk[..n]);
    }
    let digest = hasher.finalize();
    Ok(digest.iter().map(|b| format!("{:02x}", b)).collect())
}

/// Destination path for an asset: the last segment of its source URL.
fn dest_path(dest_dir: &Path, asset: &Asset) -> PathBuf {
    let basename = asset
        .source
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty())
        .unwrap_or(&asset.filename);
    dest_dir.join(basename)
}

async fn download_asset(
    client: &reqwest::Client,
    asset: &Asset,
    dest_dir: &Path,
    retries: u32,
) -> Result<(), DownloadError> {
    let dest = dest_path(dest_dir, asset);

    // Already present with the right content: nothing to do.
    if asset.checksum != CHECKSUM_SKIP && dest.is_file() {
        if let Ok(checksum) = file_checksum(&dest) {
            if checksum == asset.checksum {
                return Ok(());
            }
        }
    }

    println!(
        "\tDownloading asset {} to {}",
        asset.name,
        dest_dir.display()
    );

    let attempts = retries.max(1);
    let mut last_err = None;
    for attempt in 0..attempts {
        if attempt > 0 {
            // Exponential backoff, capped
            let wait = Duration::from_secs((1u64 << attempt.min(5)).min(32));
            tokio::time::sleep(wait).await;
        }

        let response = match client.get(&asset.source).send().await {
            Ok(resp) => resp.error_for_status(),
            Err(err) => Err(err),
        };
        let bytes = match response {
            Ok(resp) => match resp.bytes().await {
                Ok(bytes) => bytes,
                Err(err) => {
                    last_err = Some(err);
                    continue;
                }
            },
            Err(err) => {
                last_err = Some(err);
                continue;
            }
        };

        tokio::fs::write(&dest, &bytes)
            .await
            .map_err(|source| DownloadError::Io {
                url: asset.source.clone(),
                dest: dest.clone(),
                source,
            })?;
        last_err = None;
        break;
    }

    if let Some(source) = last_err {
        return Err(DownloadError::Http {
            url: asset.source.clone(),
            source,
        });
    }

    if asset.checksum != CHECKSUM_SKIP {
        let actual = file_checksum(&dest).map_err(|source| DownloadError::Io {
            url: asset.source.clone(),
            dest: dest.clone(),
            source,
        })?;
        if actual != asset.checksum {
            return Err(DownloadError::ChecksumMismatch {
                asset: asset.name.clone(),
                expected: asset.checksum.clone(),
                actual,
            });
        }
    }

    Ok(())
}

/// Download every asset of a list with at most `jobs` downloads in flight.
///
/// Individual failures are reported as they happen; the call returns
/// [`DownloadError::Failed`] when any asset could not be fetched or verified.
pub async fn download_asset_list(
    list: &AssetList,
    resources_dir: &Path,
    jobs: usize,
    retries: u32,
) -> Result<(), DownloadError> {
    let dest_dir = resources_dir.join(list.name());
    tokio::fs::create_dir_all(&dest_dir)
        .await
        .map_err(|source| DownloadError::Io {
            url: String::new(),
            dest: dest_dir.clone(),
            source,
        })?;

    let jobs = jobs.max(1);
    println!(
        "Downloading asset list {} using {} parallel jobs",
        list.name(),
        jobs
    );

    let client = reqwest::Client::new();
    let semaphore = Arc::new(Semaphore::new(jobs));
    let mut handles = Vec::new();

    for asset in list.assets() {
        let asset = asset.clone();
        let dest_dir = dest_dir.clone();
        let client = client.clone();
        let semaphore = semaphore.clone();
        handles.push(tokio::spawn(async move {
            let _permit = semaphore
                .acquire_owned()
                .await
                .expect("semaphore should not be closed");
            download_asset(&client, &asset, &dest_dir, retries).await
        }));
    }

    let mut failures = 0usize;
    for handle in handles {
        match handle.await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                eprintln!("Error downloading: {}", err);
                failures += 1;
            }
            Err(err) => {
                eprintln!("Download task failed: {}", err);
                failures += 1;
            }
        }
    }

    if failures > 0 {
        return Err(DownloadError::Failed);
    }

    println!("All downloads finished");
    Ok(())
}
