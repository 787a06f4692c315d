#![warn(missing_docs)]
//! Mapbench Report - Result Reporting
//!
//! Holds the final report of a run, keyed by (benchmark, mode), and renders
//! it as JSON. Human-readable terminal output lives in the runner.

mod json;
mod report;
mod unit;

pub use json::{SCHEMA_VERSION, generate_json_report};
pub use report::{
    BenchmarkModeResult, FailureInfo, ModeMetrics, Report, ReportConfig, ReportMeta, ReportSummary,
    SystemInfo,
};
pub use unit::TimeUnit;

/// Output format selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// JSON with full schema
    Json,
    /// Human-readable terminal output
    #[default]
    Human,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "human" | "text" => Ok(OutputFormat::Human),
            other => Err(format!("Unknown output format: {}", other)),
        }
    }
}
