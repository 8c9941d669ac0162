//! Encoder quality-regression harness
//!
//! Runs a matrix of (encoder × asset) encode jobs on a bounded worker pool,
//! scores each output against its source with VMAF, and reports one result
//! per combination.

pub mod asset;
pub mod command;
pub mod download;
pub mod encoder;
pub mod encoders;
pub mod engine;
pub mod harness;
pub mod job;
pub mod suite;
pub mod vmaf;

pub use vq_harness_config as config;
pub use vq_harness_config::Config;

pub use asset::{discover_asset_lists, Asset, AssetError, AssetList};
pub use command::{run_command, run_command_capture, CommandError};
pub use download::{download_asset_list, file_checksum, DownloadError};
pub use encoder::{Codec, EncodeError, Encoder, EncoderRegistry};
pub use engine::{BatchReport, EngineParams, ExecutionEngine};
pub use harness::{default_download_jobs, default_jobs, Harness, HarnessError, RunOptions};
pub use job::{Job, JobParams, JobResult, Outcome};
pub use suite::{SuiteError, SuiteParams, TestSuite};
