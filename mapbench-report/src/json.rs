//! JSON Output

use crate::report::Report;

/// Version of the JSON layout written by [`generate_json_report`]
pub const SCHEMA_VERSION: u32 = 1;

/// Generate a prettified JSON report.
///
/// Non-finite statistics are already `None` in the report and serialize as
/// `null`.
pub fn generate_json_report(report: &Report) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(report)
}
