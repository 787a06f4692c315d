//! Benchmark Planner
//!
//! Builds the execution plan by filtering registered benchmarks and crossing
//! them with the selected timing modes.
//!
//! Filtering options:
//! - Regex pattern matching on benchmark name
//! - Group filtering
//!
//! Ordering is never sorted: benchmarks keep registration order and modes
//! keep their declared order, so identical configurations produce
//! identically ordered reports. Forks are expanded by the executor in
//! increasing index.

use mapbench_core::{BenchmarkDef, ModeSelection, Registry, TimingMode};

/// One (benchmark, mode) pair to run
#[derive(Debug, Clone)]
pub struct PlanEntry {
    /// Benchmark definition
    pub def: BenchmarkDef,
    /// Timing mode
    pub mode: TimingMode,
}

/// Execution plan for benchmarks
#[derive(Debug, Clone, Default)]
pub struct ExecutionPlan {
    /// Entries in execution order
    pub entries: Vec<PlanEntry>,
}

impl ExecutionPlan {
    /// Number of (benchmark, mode) pairs
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing matched
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Distinct benchmarks in plan order
    pub fn benchmarks(&self) -> Vec<&BenchmarkDef> {
        let mut seen: Vec<&BenchmarkDef> = Vec::new();
        for entry in &self.entries {
            if seen.last().is_none_or(|last| last.name() != entry.def.name()) {
                seen.push(&entry.def);
            }
        }
        seen
    }
}

/// Build execution plan from registered benchmarks
pub fn build_plan(
    registry: &Registry,
    modes: ModeSelection,
    filter: Option<&regex::Regex>,
    group: Option<&str>,
) -> ExecutionPlan {
    let modes = modes.modes();
    let entries = registry
        .iter()
        .filter(|b| filter.is_none_or(|re| re.is_match(b.name())))
        .filter(|b| group.is_none_or(|g| b.group() == g))
        .flat_map(|def| {
            modes.iter().map(move |&mode| PlanEntry {
                def: def.clone(),
                mode,
            })
        })
        .collect();

    ExecutionPlan { entries }
}
