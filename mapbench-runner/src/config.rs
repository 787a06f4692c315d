//! Configuration loading from mapbench.toml
//!
//! Configuration can be specified in a `mapbench.toml` file in the project
//! root. The file is discovered by walking up from the current directory.
//! Values layer as built-in defaults, then the file, then CLI flags; the
//! result is validated once into [`RunSettings`].

use mapbench_core::{IterationBudget, ModeSelection};
use mapbench_report::{OutputFormat, TimeUnit};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Name of the discovered configuration file
pub const CONFIG_FILE_NAME: &str = "mapbench.toml";

/// Configuration rejected while loading or validating
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read
    #[error("failed to read {path}: {source}")]
    Io {
        /// File path
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// The file is not valid TOML for this schema
    #[error("failed to parse {path}: {source}")]
    Parse {
        /// File path
        path: PathBuf,
        /// Underlying error
        source: toml::de::Error,
    },

    /// A value is outside its allowed range
    #[error("invalid value for `{key}`: {reason}")]
    Invalid {
        /// Configuration key
        key: &'static str,
        /// What is wrong
        reason: String,
    },
}

impl ConfigError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Mapbench configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct BenchConfig {
    /// Runner configuration
    #[serde(default)]
    pub runner: RunnerConfig,
    /// Workload sizing
    #[serde(default)]
    pub workload: WorkloadConfig,
    /// Output configuration
    #[serde(default)]
    pub output: OutputConfig,
}

/// Runner configuration for benchmark execution
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunnerConfig {
    /// Trials per (benchmark, mode), each with fresh fixtures
    #[serde(default = "default_forks")]
    pub forks: u32,
    /// Discarded iterations per trial
    #[serde(default = "default_warmup_iterations")]
    pub warmup_iterations: u32,
    /// Recorded iterations per trial
    #[serde(default = "default_measurement_iterations")]
    pub measurement_iterations: u32,
    /// `all`, `thrpt`, `avgt`, `sample` or `ss`
    #[serde(default = "default_mode")]
    pub mode: String,
    /// Wall-clock iteration length for duration-bounded modes (e.g. "1s")
    #[serde(default = "default_iteration_time")]
    pub iteration_time: String,
    /// Invocations per `AverageTime` iteration
    #[serde(default = "default_invocations")]
    pub invocations_per_iteration: u64,
    /// Concurrent execution lanes per trial
    #[serde(default = "default_threads")]
    pub threads: usize,
    /// Seed for every fixture random stream
    #[serde(default = "default_seed")]
    pub random_seed: i64,
    /// Requested heap size (e.g. "2G"); recorded in the report only
    #[serde(default = "default_heap_size_hint")]
    pub heap_size_hint: String,
    /// Wall-clock ceiling for one trial (e.g. "10m")
    #[serde(default = "default_trial_timeout")]
    pub trial_timeout: String,
    /// Stop the run at the first failed trial
    #[serde(default)]
    pub fail_fast: bool,
    /// Pin each execution lane to a CPU
    #[serde(default)]
    pub pin_lanes: bool,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            forks: default_forks(),
            warmup_iterations: default_warmup_iterations(),
            measurement_iterations: default_measurement_iterations(),
            mode: default_mode(),
            iteration_time: default_iteration_time(),
            invocations_per_iteration: default_invocations(),
            threads: default_threads(),
            random_seed: default_seed(),
            heap_size_hint: default_heap_size_hint(),
            trial_timeout: default_trial_timeout(),
            fail_fast: false,
            pin_lanes: false,
        }
    }
}

fn default_forks() -> u32 {
    1
}
fn default_warmup_iterations() -> u32 {
    1
}
fn default_measurement_iterations() -> u32 {
    3
}
fn default_mode() -> String {
    "all".to_string()
}
fn default_iteration_time() -> String {
    "1s".to_string()
}
fn default_invocations() -> u64 {
    1
}
fn default_threads() -> usize {
    1
}
fn default_seed() -> i64 {
    42
}
fn default_heap_size_hint() -> String {
    "2G".to_string()
}
fn default_trial_timeout() -> String {
    "10m".to_string()
}

/// Workload sizing
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorkloadConfig {
    /// Entries per workload map
    #[serde(default = "default_entries")]
    pub entries: usize,
    /// Scan keeps keys whose value is strictly greater than this
    #[serde(default = "default_scan_threshold")]
    pub scan_threshold: i64,
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        Self {
            entries: default_entries(),
            scan_threshold: default_scan_threshold(),
        }
    }
}

fn default_entries() -> usize {
    10_000
}
fn default_scan_threshold() -> i64 {
    10_000
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OutputConfig {
    /// Default output format: "human" or "json"
    #[serde(default = "default_format")]
    pub format: String,
    /// Unit for reported statistics: "ns", "us", "ms" or "s"
    #[serde(default = "default_time_unit")]
    pub time_unit: String,
    /// Output directory for reports
    #[serde(default = "default_output_dir")]
    pub directory: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: default_format(),
            time_unit: default_time_unit(),
            directory: default_output_dir(),
        }
    }
}

fn default_format() -> String {
    "human".to_string()
}
fn default_time_unit() -> String {
    "ms".to_string()
}
fn default_output_dir() -> String {
    "target/mapbench".to_string()
}

/// Validated, parsed settings for one run
#[derive(Debug, Clone, PartialEq)]
pub struct RunSettings {
    /// Trials per (benchmark, mode)
    pub forks: u32,
    /// Discarded iterations per trial
    pub warmup_iterations: u32,
    /// Recorded iterations per trial
    pub measurement_iterations: u32,
    /// Selected modes
    pub mode: ModeSelection,
    /// Iteration size
    pub budget: IterationBudget,
    /// Concurrent lanes per trial
    pub threads: usize,
    /// Fixture seed
    pub random_seed: i64,
    /// Requested heap size in bytes
    pub heap_size_hint: u64,
    /// Wall-clock ceiling per trial
    pub trial_timeout: Duration,
    /// Stop at the first failure
    pub fail_fast: bool,
    /// Pin lanes to CPUs
    pub pin_lanes: bool,
    /// Workload sizing
    pub workload: WorkloadConfig,
    /// Output format
    pub format: OutputFormat,
    /// Reported unit
    pub time_unit: TimeUnit,
    /// Report directory
    pub directory: PathBuf,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            forks: default_forks(),
            warmup_iterations: default_warmup_iterations(),
            measurement_iterations: default_measurement_iterations(),
            mode: ModeSelection::All,
            budget: IterationBudget::default(),
            threads: default_threads(),
            random_seed: default_seed(),
            heap_size_hint: 2 << 30,
            trial_timeout: Duration::from_secs(600),
            fail_fast: false,
            pin_lanes: false,
            workload: WorkloadConfig::default(),
            format: OutputFormat::Human,
            time_unit: TimeUnit::Ms,
            directory: PathBuf::from(default_output_dir()),
        }
    }
}

impl BenchConfig {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Locate `mapbench.toml` by walking up from the current directory
    pub fn discover_path() -> Option<PathBuf> {
        let mut dir = std::env::current_dir().ok()?;
        loop {
            let config_path = dir.join(CONFIG_FILE_NAME);
            if config_path.exists() {
                return Some(config_path);
            }
            if !dir.pop() {
                break;
            }
        }
        None
    }

    /// Discover and load configuration; `Ok(None)` when no file exists
    pub fn discover() -> Result<Option<Self>, ConfigError> {
        Self::discover_path().map(Self::load).transpose()
    }

    /// Validate and parse every value
    pub fn resolve(&self) -> Result<RunSettings, ConfigError> {
        let runner = &self.runner;
        if runner.forks < 1 {
            return Err(ConfigError::invalid("runner.forks", "must be at least 1"));
        }
        if runner.measurement_iterations < 1 {
            return Err(ConfigError::invalid(
                "runner.measurement_iterations",
                "must be at least 1",
            ));
        }
        if runner.threads < 1 {
            return Err(ConfigError::invalid("runner.threads", "must be at least 1"));
        }
        if runner.invocations_per_iteration < 1 {
            return Err(ConfigError::invalid(
                "runner.invocations_per_iteration",
                "must be at least 1",
            ));
        }

        let mode = runner
            .mode
            .parse::<ModeSelection>()
            .map_err(|e| ConfigError::invalid("runner.mode", e))?;
        let iteration_time = parse_duration(&runner.iteration_time)
            .map_err(|e| ConfigError::invalid("runner.iteration_time", e))?;
        if iteration_time.is_zero() {
            return Err(ConfigError::invalid(
                "runner.iteration_time",
                "must be non-zero",
            ));
        }
        let trial_timeout = parse_duration(&runner.trial_timeout)
            .map_err(|e| ConfigError::invalid("runner.trial_timeout", e))?;
        if trial_timeout.is_zero() {
            return Err(ConfigError::invalid(
                "runner.trial_timeout",
                "must be non-zero",
            ));
        }
        let heap_size_hint = parse_bytes(&runner.heap_size_hint)
            .map_err(|e| ConfigError::invalid("runner.heap_size_hint", e))?;

        if self.workload.entries == 0 {
            return Err(ConfigError::invalid("workload.entries", "must be at least 1"));
        }

        let format = self
            .output
            .format
            .parse::<OutputFormat>()
            .map_err(|e| ConfigError::invalid("output.format", e))?;
        let time_unit = self
            .output
            .time_unit
            .parse::<TimeUnit>()
            .map_err(|e| ConfigError::invalid("output.time_unit", e))?;

        Ok(RunSettings {
            forks: runner.forks,
            warmup_iterations: runner.warmup_iterations,
            measurement_iterations: runner.measurement_iterations,
            mode,
            budget: IterationBudget {
                iteration_time,
                invocations: runner.invocations_per_iteration,
            },
            threads: runner.threads,
            random_seed: runner.random_seed,
            heap_size_hint,
            trial_timeout,
            fail_fast: runner.fail_fast,
            pin_lanes: runner.pin_lanes,
            workload: self.workload,
            format,
            time_unit,
            directory: PathBuf::from(&self.output.directory),
        })
    }

    /// Generate a default configuration as TOML string
    pub fn default_toml() -> String {
        r#"# Mapbench Configuration

[runner]
# Trials per benchmark and mode, each with fresh fixtures
forks = 1
# Discarded iterations per trial
warmup_iterations = 1
# Recorded iterations per trial
measurement_iterations = 3
# Timing mode: all, thrpt, avgt, sample, ss
mode = "all"
# Iteration length for throughput and sample-time modes
iteration_time = "1s"
# Invocations per average-time iteration
invocations_per_iteration = 1
# Concurrent execution lanes per trial
threads = 1
# Seed for fixture random streams
random_seed = 42
# Requested heap size (recorded in the report)
heap_size_hint = "2G"
# Wall-clock ceiling for one trial
trial_timeout = "10m"
# Stop at the first failed trial
fail_fast = false
# Pin execution lanes to CPUs
pin_lanes = false

[workload]
# Entries per workload map
entries = 10000
# Scan keeps keys whose value is strictly greater than this
scan_threshold = 10000

[output]
# Output format: human, json
format = "human"
# Unit for reported statistics: ns, us, ms, s
time_unit = "ms"
# Output directory for reports
directory = "target/mapbench"
"#
        .to_string()
    }
}

/// Split off the trailing unit suffix, so exponents stay with the number
fn split_unit(s: &str) -> (&str, &str) {
    let num_len = s.trim_end_matches(char::is_alphabetic).len();
    s.split_at(num_len)
}

/// Parse duration string (e.g., "3s", "500ms", "2m", "1e3ms"); a bare number is seconds
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("Empty duration string".to_string());
    }

    let (num_part, unit_part) = split_unit(s);

    let value: f64 = num_part
        .trim()
        .parse()
        .map_err(|_| format!("Invalid duration number: {}", num_part))?;
    if !value.is_finite() || value < 0.0 {
        return Err(format!("Invalid duration number: {}", num_part));
    }

    let multiplier: f64 = match unit_part.trim().to_lowercase().as_str() {
        "ns" => 1.0,
        "us" | "µs" => 1e3,
        "ms" => 1e6,
        "s" | "" => 1e9,
        "m" | "min" => 60e9,
        "h" => 3600e9,
        _ => return Err(format!("Unknown duration unit: {}", unit_part)),
    };

    Ok(Duration::from_nanos((value * multiplier) as u64))
}

/// Parse a byte size (e.g., "2G", "512M", "64k", "1024"); binary multiples
pub fn parse_bytes(s: &str) -> Result<u64, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("Empty size string".to_string());
    }

    let (num_part, unit_part) = split_unit(s);

    let value: u64 = num_part
        .trim()
        .parse()
        .map_err(|_| format!("Invalid size number: {}", num_part))?;

    let shift = match unit_part.trim().to_lowercase().as_str() {
        "" | "b" => 0,
        "k" | "kb" | "kib" => 10,
        "m" | "mb" | "mib" => 20,
        "g" | "gb" | "gib" => 30,
        "t" | "tb" | "tib" => 40,
        _ => return Err(format!("Unknown size unit: {}", unit_part)),
    };

    value
        .checked_mul(1u64 << shift)
        .ok_or_else(|| format!("Size out of range: {}", s))
}
