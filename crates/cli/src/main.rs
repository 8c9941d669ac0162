//! CLI entry point for the encoder quality harness.
//!
//! Parses command line arguments, resolves them against the optional TOML
//! configuration, and turns the aggregate of job results into a process exit
//! code: 1 for configuration/fatal errors, 2 when fewer tests succeed than
//! the requested threshold, 3 when the run exceeds the time threshold.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use vq_harness::{
    default_download_jobs, default_jobs, Config, EncoderRegistry, Harness, RunOptions,
};

/// Quality-regression test harness for video encoders
#[derive(Parser, Debug)]
#[command(name = "vq-harness")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory where asset lists are read from (repeatable)
    #[arg(short, long)]
    assets_dir: Vec<PathBuf>,

    /// Directory where resources are taken from
    #[arg(short, long)]
    resources_dir: Option<PathBuf>,

    /// Directory where encoder outputs are stored
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the available asset lists and encoders
    #[command(alias = "l")]
    List {
        /// Show only the given asset lists
        #[arg(long, num_args(1..))]
        asset_lists: Option<Vec<String>>,

        /// Show the assets of each asset list
        #[arg(short, long)]
        assets: bool,

        /// Show only the list of available encoders
        #[arg(short, long)]
        encoders: bool,

        /// Check which encoders can run successfully
        #[arg(short, long)]
        check: bool,

        /// Show stdout and stderr of executed commands
        #[arg(short, long)]
        verbose: bool,
    },

    /// Run tests for encoders
    #[command(alias = "r")]
    Run {
        /// Number of parallel jobs; 0 means all logical cores
        #[arg(short, long)]
        jobs: Option<usize>,

        /// Timeout in secs for each encoding
        #[arg(short, long)]
        timeout: Option<u64>,

        /// Stop after the first failure
        #[arg(long)]
        fail_fast: bool,

        /// Don't show every test run
        #[arg(short, long)]
        quiet: bool,

        /// Run only the given asset lists
        #[arg(long, num_args(1..))]
        asset_lists: Option<Vec<String>>,

        /// Run only the given assets
        #[arg(long, num_args(1..))]
        assets: Option<Vec<String>>,

        /// Skip the given assets
        #[arg(long, num_args(1..))]
        skip_assets: Option<Vec<String>>,

        /// Run only the given encoders
        #[arg(short, long, num_args(1..))]
        encoders: Option<Vec<String>>,

        /// Keep output files generated during tests
        #[arg(short, long)]
        keep: bool,

        /// Exit with code 2 when fewer tests succeed than this
        #[arg(long)]
        threshold: Option<usize>,

        /// Exit with code 3 when the run takes longer than this many seconds
        #[arg(long)]
        time_threshold: Option<f64>,

        /// Show stdout and stderr of executed commands
        #[arg(short, long)]
        verbose: bool,
    },

    /// Download asset resources
    #[command(alias = "d")]
    Download {
        /// Number of parallel download jobs; 0 means 2x logical cores
        #[arg(short, long)]
        jobs: Option<usize>,

        /// Number of retries before failing a download
        #[arg(short = 'R', long, default_value_t = 1)]
        retries: u32,

        /// Download only the given asset lists
        #[arg(long, num_args(1..))]
        asset_lists: Option<Vec<String>>,
    },
}

fn resolve_jobs(flag: Option<usize>, config_jobs: u32, fallback: usize) -> usize {
    match flag {
        Some(0) | None => {
            if flag.is_none() && config_jobs > 0 {
                config_jobs as usize
            } else {
                fallback
            }
        }
        Some(n) => n,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_default_env()
        .format_timestamp_secs()
        .init();

    let args = Args::parse();

    let config = match Config::load_optional(args.config.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Failed to load configuration: {}", err);
            return ExitCode::FAILURE;
        }
    };

    let assets_dirs = if args.assets_dir.is_empty() {
        config.dirs.assets_dirs.clone()
    } else {
        args.assets_dir.clone()
    };
    let resources_dir = args
        .resources_dir
        .clone()
        .unwrap_or_else(|| config.dirs.resources_dir.clone());
    let output_dir = args
        .output_dir
        .clone()
        .unwrap_or_else(|| config.dirs.output_dir.clone());

    let registry = EncoderRegistry::with_defaults();
    let mut harness = Harness::new(assets_dirs, resources_dir, output_dir);

    match args.command {
        Command::List {
            asset_lists,
            assets,
            encoders,
            check,
            verbose,
        } => {
            if !encoders {
                if let Err(err) = harness.list_asset_lists(assets, asset_lists.as_deref()) {
                    eprintln!("{}", err);
                    return ExitCode::FAILURE;
                }
            }
            harness.list_encoders(&registry, check, verbose).await;
            ExitCode::SUCCESS
        }

        Command::Run {
            jobs,
            timeout,
            fail_fast,
            quiet,
            asset_lists,
            assets,
            skip_assets,
            encoders,
            keep,
            threshold,
            time_threshold,
            verbose,
        } => {
            let opts = RunOptions {
                jobs: resolve_jobs(jobs, config.run.jobs, default_jobs()),
                timeout: Duration::from_secs(timeout.unwrap_or(config.run.timeout_secs)),
                asset_lists,
                assets,
                skip_assets,
                encoders,
                fail_fast: fail_fast || config.run.fail_fast,
                quiet,
                keep_files: keep || config.run.keep_files,
                verbose,
                vmaf_binary: config.scorer.vmaf_binary.clone(),
            };

            let reports = match harness.run(&registry, opts).await {
                Ok(reports) => reports,
                Err(err) => {
                    eprintln!("{}", err);
                    return ExitCode::FAILURE;
                }
            };

            let successes: usize = reports.iter().map(|r| r.num_success()).sum();
            let total_secs: f64 = reports.iter().map(|r| r.elapsed.as_secs_f64()).sum();

            if let Some(required) = threshold {
                if successes < required {
                    eprintln!(
                        "Threshold not met: {} successful tests, {} required",
                        successes, required
                    );
                    return ExitCode::from(2);
                }
            }
            if let Some(limit) = time_threshold {
                if total_secs > limit {
                    eprintln!(
                        "Time threshold exceeded: {:.3} secs, limit {:.3} secs",
                        total_secs, limit
                    );
                    return ExitCode::from(3);
                }
            }
            ExitCode::SUCCESS
        }

        Command::Download {
            jobs,
            retries,
            asset_lists,
        } => {
            let jobs = resolve_jobs(jobs, 0, default_download_jobs());
            match harness
                .download_assets(asset_lists.as_deref(), jobs, retries)
                .await
            {
                Ok(()) => ExitCode::SUCCESS,
                Err(err) => {
                    eprintln!("{}", err);
                    ExitCode::FAILURE
                }
            }
        }
    }
}
