//! Output Formatting
//!
//! Human-readable terminal output: results grouped in plan order, one line
//! of statistics per (benchmark, mode), then every failure and the totals.

use mapbench_report::{BenchmarkModeResult, Report};

fn fmt_value(value: Option<f64>) -> String {
    match value {
        None => "-".to_string(),
        Some(v) if v != 0.0 && (v.abs() >= 1_000_000.0 || v.abs() < 0.001) => format!("{:.3e}", v),
        Some(v) if v.abs() >= 1000.0 => format!("{:.0}", v),
        Some(v) => format!("{:.3}", v),
    }
}

fn push_result(output: &mut String, result: &BenchmarkModeResult) {
    let m = &result.metrics;
    let icon = if m.samples == 0 { "✗" } else { "✓" };
    output.push_str(&format!(
        "  {} {} [{}]  ({} samples, {} unit)\n",
        icon, result.benchmark, result.mode, m.samples, result.unit
    ));
    if m.samples == 0 {
        output.push_str("      no data\n");
        return;
    }
    output.push_str(&format!(
        "      mean: {}  stddev: {}  min: {}  max: {}\n",
        fmt_value(m.mean),
        fmt_value(m.std_dev),
        fmt_value(m.min),
        fmt_value(m.max)
    ));
    if let Some(cv) = m.cv_percent {
        output.push_str(&format!("      cv: {:.1}%\n", cv));
    }
    output.push_str(&format!(
        "      p50: {}  p90: {}  p99: {}\n",
        fmt_value(m.p50),
        fmt_value(m.p90),
        fmt_value(m.p99)
    ));
    if result.forks_failed > 0 {
        output.push_str(&format!(
            "      forks: {} completed, {} failed\n",
            result.forks_completed, result.forks_failed
        ));
    }
}

/// Format a report for human-readable terminal display
pub fn format_human_output(report: &Report) -> String {
    let mut output = String::new();

    output.push('\n');
    output.push_str("Mapbench Results\n");
    output.push_str(&"=".repeat(60));
    output.push_str("\n\n");

    let mut current_group: Option<&str> = None;
    for result in &report.results {
        if current_group != Some(result.group.as_str()) {
            if current_group.is_some() {
                output.push('\n');
            }
            output.push_str(&format!("Group: {}\n", result.group));
            output.push_str(&"-".repeat(60));
            output.push('\n');
            current_group = Some(&result.group);
        }
        push_result(&mut output, result);
    }

    if !report.failures.is_empty() {
        output.push_str("\nFailures\n");
        output.push_str(&"-".repeat(60));
        output.push('\n');
        for failure in &report.failures {
            let fork = failure
                .fork
                .map(|f| format!(" fork {}", f))
                .unwrap_or_default();
            output.push_str(&format!(
                "  ✗ {} [{}]{} {}: {}\n",
                failure.benchmark, failure.mode, fork, failure.kind, failure.message
            ));
        }
    }

    let s = &report.summary;
    output.push_str("\nSummary\n");
    output.push_str(&"-".repeat(60));
    output.push('\n');
    output.push_str(&format!(
        "  Entries: {}  Trials: {}  Failed: {}  Without data: {}\n",
        s.plan_entries, s.trials_run, s.trials_failed, s.results_without_data
    ));
    output.push_str(&format!("  Duration: {:.2} ms\n", s.total_duration_ms));

    output
}
