//! Core configuration structures and loading logic

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Error type for configuration operations
#[derive(Debug)]
pub enum ConfigError {
    /// IO error reading config file
    Io(std::io::Error),
    /// TOML parsing error
    Parse(toml::de::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "Failed to read config file: {}", e),
            ConfigError::Parse(e) => write!(f, "Failed to parse config: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(e: toml::de::Error) -> Self {
        ConfigError::Parse(e)
    }
}

/// Directory layout configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DirsConfig {
    /// Directories scanned for asset-list JSON files
    #[serde(default = "default_assets_dirs")]
    pub assets_dirs: Vec<PathBuf>,
    /// Directory where downloaded asset resources live
    #[serde(default = "default_resources_dir")]
    pub resources_dir: PathBuf,
    /// Directory where encoder outputs are written
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

fn default_assets_dirs() -> Vec<PathBuf> {
    vec![PathBuf::from("assets")]
}

fn default_resources_dir() -> PathBuf {
    PathBuf::from("resources")
}

fn default_output_dir() -> PathBuf {
    env::temp_dir().join("vq-harness-output")
}

impl Default for DirsConfig {
    fn default() -> Self {
        Self {
            assets_dirs: default_assets_dirs(),
            resources_dir: default_resources_dir(),
            output_dir: default_output_dir(),
        }
    }
}

/// Test-run configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunConfig {
    /// Parallel jobs (0 = auto-detect logical cores)
    #[serde(default)]
    pub jobs: u32,
    /// Timeout in seconds for each encode and each score invocation
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Stop scheduling new jobs after the first failure
    #[serde(default)]
    pub fail_fast: bool,
    /// Keep output files generated during tests
    #[serde(default)]
    pub keep_files: bool,
}

fn default_timeout_secs() -> u64 {
    350
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            jobs: 0,
            timeout_secs: default_timeout_secs(),
            fail_fast: false,
            keep_files: false,
        }
    }
}

/// Quality-scorer configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ScorerConfig {
    /// Explicit path to the VMAF binary (searched on PATH and in the
    /// resources directory when unset)
    #[serde(default)]
    pub vmaf_binary: Option<PathBuf>,
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub dirs: DirsConfig,
    #[serde(default)]
    pub run: RunConfig,
    #[serde(default)]
    pub scorer: ScorerConfig,
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Parses the config file and handles missing optional fields with defaults.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::parse_toml(&content)
    }

    /// Parse configuration from a TOML string
    pub fn parse_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }

    /// Apply environment variable overrides to the configuration
    ///
    /// Overrides the following values if environment variables are set:
    /// - VQ_ASSETS_DIR -> dirs.assets_dirs (PATH-separated list)
    /// - VQ_RESOURCES_DIR -> dirs.resources_dir
    /// - VQ_OUTPUT_DIR -> dirs.output_dir
    /// - VQ_JOBS -> run.jobs
    /// - VQ_TIMEOUT_SECS -> run.timeout_secs
    /// - VQ_FAIL_FAST -> run.fail_fast
    /// - VQ_KEEP_FILES -> run.keep_files
    /// - VQ_VMAF_BINARY -> scorer.vmaf_binary
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = env::var("VQ_ASSETS_DIR") {
            let dirs: Vec<PathBuf> = env::split_paths(&val).collect();
            if !dirs.is_empty() {
                self.dirs.assets_dirs = dirs;
            }
        }

        if let Ok(val) = env::var("VQ_RESOURCES_DIR") {
            if !val.is_empty() {
                self.dirs.resources_dir = PathBuf::from(val);
            }
        }

        if let Ok(val) = env::var("VQ_OUTPUT_DIR") {
            if !val.is_empty() {
                self.dirs.output_dir = PathBuf::from(val);
            }
        }

        if let Ok(val) = env::var("VQ_JOBS") {
            if let Ok(jobs) = val.parse::<u32>() {
                self.run.jobs = jobs;
            }
        }

        if let Ok(val) = env::var("VQ_TIMEOUT_SECS") {
            if let Ok(secs) = val.parse::<u64>() {
                self.run.timeout_secs = secs;
            }
        }

        if let Ok(val) = env::var("VQ_FAIL_FAST") {
            if let Some(flag) = parse_bool(&val) {
                self.run.fail_fast = flag;
            }
        }

        if let Ok(val) = env::var("VQ_KEEP_FILES") {
            if let Some(flag) = parse_bool(&val) {
                self.run.keep_files = flag;
            }
        }

        if let Ok(val) = env::var("VQ_VMAF_BINARY") {
            if !val.is_empty() {
                self.scorer.vmaf_binary = Some(PathBuf::from(val));
            }
        }
    }

    /// Load configuration from file and apply environment overrides
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let mut config = Self::load_from_file(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration from an optional file path
    ///
    /// Returns defaults (plus environment overrides) when the path is None
    /// or the file does not exist.
    pub fn load_optional(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(p) if p.exists() => Self::load_from_file(p)?,
            _ => Self::default(),
        };
        config.apply_env_overrides();
        Ok(config)
    }
}

/// Accept "true", "1", "yes" as true; "false", "0", "no" as false
fn parse_bool(val: &str) -> Option<bool> {
    match val.to_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::sync::Mutex;

    // Mutex to ensure env var tests don't interfere with each other
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    /// Helper to clear all config-related env vars
    fn clear_env_vars() {
        env::remove_var("VQ_ASSETS_DIR");
        env::remove_var("VQ_RESOURCES_DIR");
        env::remove_var("VQ_OUTPUT_DIR");
        env::remove_var("VQ_JOBS");
        env::remove_var("VQ_TIMEOUT_SECS");
        env::remove_var("VQ_FAIL_FAST");
        env::remove_var("VQ_KEEP_FILES");
        env::remove_var("VQ_VMAF_BINARY");
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.dirs.assets_dirs, vec![PathBuf::from("assets")]);
        assert_eq!(config.dirs.resources_dir, PathBuf::from("resources"));
        assert_eq!(config.run.jobs, 0);
        assert_eq!(config.run.timeout_secs, 350);
        assert!(!config.run.fail_fast);
        assert!(!config.run.keep_files);
        assert_eq!(config.scorer.vmaf_binary, None);
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config = Config::parse_toml("").expect("empty TOML should parse");
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_optional_missing_file() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env_vars();

        let config = Config::load_optional(Some(Path::new("/nonexistent/config.toml")))
            .expect("missing file should fall back to defaults");
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
[dirs]
resources_dir = "/srv/resources"

[run]
jobs = 4
fail_fast = true
"#,
        )
        .unwrap();

        let config = Config::load_from_file(&path).unwrap();
        assert_eq!(config.dirs.resources_dir, PathBuf::from("/srv/resources"));
        assert_eq!(config.run.jobs, 4);
        assert!(config.run.fail_fast);
        // Unset sections keep defaults
        assert_eq!(config.run.timeout_secs, 350);
    }

    #[test]
    fn test_env_overrides() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env_vars();

        env::set_var("VQ_JOBS", "12");
        env::set_var("VQ_TIMEOUT_SECS", "60");
        env::set_var("VQ_FAIL_FAST", "yes");
        env::set_var("VQ_KEEP_FILES", "0");
        env::set_var("VQ_VMAF_BINARY", "/opt/vmaf/vmaf");

        let mut config = Config::default();
        config.apply_env_overrides();

        assert_eq!(config.run.jobs, 12);
        assert_eq!(config.run.timeout_secs, 60);
        assert!(config.run.fail_fast);
        assert!(!config.run.keep_files);
        assert_eq!(config.scorer.vmaf_binary, Some(PathBuf::from("/opt/vmaf/vmaf")));

        clear_env_vars();
    }

    #[test]
    fn test_env_override_invalid_values_ignored() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env_vars();

        env::set_var("VQ_JOBS", "not-a-number");
        env::set_var("VQ_FAIL_FAST", "maybe");

        let mut config = Config::default();
        config.apply_env_overrides();

        assert_eq!(config.run.jobs, 0);
        assert!(!config.run.fail_fast);

        clear_env_vars();
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn prop_config_parses_all_sections(
            jobs in 0u32..64,
            timeout_secs in 1u64..10_000,
            fail_fast in proptest::bool::ANY,
            keep_files in proptest::bool::ANY,
        ) {
            let toml_str = format!(
                r#"
[dirs]
assets_dirs = ["assets"]
resources_dir = "resources"
output_dir = "/tmp/vq-out"

[run]
jobs = {}
timeout_secs = {}
fail_fast = {}
keep_files = {}
"#,
                jobs, timeout_secs, fail_fast, keep_files
            );

            let config = Config::parse_toml(&toml_str).expect("Valid TOML should parse");

            prop_assert_eq!(config.run.jobs, jobs);
            prop_assert_eq!(config.run.timeout_secs, timeout_secs);
            prop_assert_eq!(config.run.fail_fast, fail_fast);
            prop_assert_eq!(config.run.keep_files, keep_files);
            prop_assert_eq!(config.dirs.output_dir, PathBuf::from("/tmp/vq-out"));
        }

        #[test]
        fn prop_parse_bool_accepts_known_forms(flag in proptest::bool::ANY) {
            let truthy = if flag { "true" } else { "false" };
            prop_assert_eq!(parse_bool(truthy), Some(flag));
            let numeric = if flag { "1" } else { "0" };
            prop_assert_eq!(parse_bool(numeric), Some(flag));
        }
    }
}
