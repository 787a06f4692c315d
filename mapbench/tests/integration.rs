//! Integration tests for Mapbench
//!
//! These tests drive whole trials and whole runs through the public API.

use mapbench::{
    BenchmarkDef, Blackhole, Fixture, FixtureSeed, HookContext, HookError, HookLevels,
    ModeSelection, OperationError, Registry, RunSettings, Scope, Selection, TimingMode,
    TrialControl, TrialError, TrialSpec, TrialState, WorkloadConfig, aggregate, execute_run,
    generate_json_report, standard_registry, workload_params,
};
use mapbench_core::{IterationBudget, Phase};
use mapbench_maps::{MapUnderTest, PutFixture, ScanFixture, StdBTreeMap};
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn trial_spec(mode: TimingMode, warmup: u32, measurement: u32, invocations: u64) -> TrialSpec {
    TrialSpec {
        fork: 0,
        mode,
        warmup_iterations: warmup,
        measurement_iterations: measurement,
        budget: IterationBudget {
            iteration_time: Duration::from_millis(5),
            invocations,
        },
        lanes: 1,
        seed: 42,
        pin_lanes: false,
    }
}

fn quick_settings(mode: TimingMode) -> RunSettings {
    RunSettings {
        mode: ModeSelection::Single(mode),
        warmup_iterations: 0,
        measurement_iterations: 2,
        budget: IterationBudget {
            iteration_time: Duration::from_millis(2),
            invocations: 2,
        },
        workload: WorkloadConfig {
            entries: 100,
            scan_threshold: 0,
        },
        ..RunSettings::default()
    }
}

struct Empty;

impl Fixture for Empty {}

struct IterationCounter {
    hooks: Arc<AtomicU32>,
}

impl Fixture for IterationCounter {
    const HOOKS: HookLevels = HookLevels::ITERATION;

    fn setup_iteration(&mut self, _ctx: &HookContext) -> Result<(), HookError> {
        self.hooks.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Warmup iterations fire hooks but never produce samples
#[test]
fn test_warmup_fires_hooks_but_records_nothing() {
    let hooks = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&hooks);
    let def = BenchmarkDef::new(
        "hooked",
        Scope::PerWorker,
        move |_: FixtureSeed| IterationCounter {
            hooks: Arc::clone(&counter),
        },
        |_: &IterationCounter, _: &mut Blackhole| -> Result<u64, OperationError> { Ok(1) },
    );

    let set = def
        .run_trial(&trial_spec(TimingMode::SingleShotTime, 2, 3, 1), &TrialControl::new())
        .unwrap();

    assert_eq!(hooks.load(Ordering::SeqCst), 5);
    assert_eq!(set.len(), 3);
    assert!(set.samples().iter().all(|s| s.invocations == 1));
}

struct SeedRecorder {
    seen: Arc<Mutex<Vec<u64>>>,
    value: u64,
}

impl Fixture for SeedRecorder {
    const HOOKS: HookLevels = HookLevels::TRIAL;

    fn setup_trial(&mut self, _ctx: &HookContext) -> Result<(), HookError> {
        self.seen
            .lock()
            .map_err(|_| HookError::new("poisoned"))?
            .push(self.value);
        Ok(())
    }
}

/// Identical seed and fork give identical fixtures; lanes never share a stream
#[test]
fn test_same_seed_same_fixtures() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let def = BenchmarkDef::new(
        "seeded",
        Scope::PerWorker,
        move |seed: FixtureSeed| SeedRecorder {
            seen: Arc::clone(&sink),
            value: seed.value(),
        },
        |_: &SeedRecorder, _: &mut Blackhole| -> Result<(), OperationError> { Ok(()) },
    );

    let mut spec = trial_spec(TimingMode::SingleShotTime, 0, 1, 1);
    def.run_trial(&spec, &TrialControl::new()).unwrap();
    def.run_trial(&spec, &TrialControl::new()).unwrap();
    spec.lanes = 2;
    def.run_trial(&spec, &TrialControl::new()).unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 4);
    assert_eq!(seen[0], seen[1]);
    assert_eq!(seen[2], seen[0]);
    assert_ne!(seen[3], seen[2]);
}

type Snapshots = Arc<Mutex<Vec<(Option<Phase>, u32, Vec<i32>)>>>;

struct Snapshotting<F> {
    inner: F,
    contents: fn(&F) -> Vec<i32>,
    sink: Snapshots,
}

impl<F: Fixture> Fixture for Snapshotting<F> {
    const HOOKS: HookLevels = HookLevels::ITERATION;

    fn setup_iteration(&mut self, ctx: &HookContext) -> Result<(), HookError> {
        self.inner.setup_iteration(ctx)?;
        let contents = (self.contents)(&self.inner);
        self.sink.lock().unwrap().push((ctx.phase, ctx.iteration, contents));
        Ok(())
    }
}

fn snapshotting_def<F: Fixture>(
    make: fn(FixtureSeed) -> F,
    contents: fn(&F) -> Vec<i32>,
    sink: &Snapshots,
) -> BenchmarkDef {
    let sink = Arc::clone(sink);
    BenchmarkDef::new(
        "snapshotting",
        Scope::PerWorker,
        move |seed: FixtureSeed| Snapshotting {
            inner: make(seed),
            contents,
            sink: Arc::clone(&sink),
        },
        |_: &Snapshotting<F>, _: &mut Blackhole| -> Result<(), OperationError> { Ok(()) },
    )
}

fn replay_twice(def: &BenchmarkDef, sink: &Snapshots) -> (Vec<Vec<i32>>, Vec<Vec<i32>>) {
    let spec = trial_spec(TimingMode::SingleShotTime, 1, 3, 1);
    let mut runs: Vec<Vec<Vec<i32>>> = Vec::new();
    for _ in 0..2 {
        def.run_trial(&spec, &TrialControl::new()).unwrap();
        let taken = std::mem::take(&mut *sink.lock().unwrap());
        let phases: Vec<(Option<Phase>, u32)> = taken.iter().map(|(p, i, _)| (*p, *i)).collect();
        assert_eq!(
            phases,
            vec![
                (Some(Phase::Warmup), 0),
                (Some(Phase::Measurement), 0),
                (Some(Phase::Measurement), 1),
                (Some(Phase::Measurement), 2),
            ]
        );
        runs.push(taken.into_iter().map(|(_, _, contents)| contents).collect());
    }
    let second = runs.pop().unwrap();
    let first = runs.pop().unwrap();
    (first, second)
}

fn assert_replayed(first: &[Vec<i32>], second: &[Vec<i32>]) {
    assert_eq!(first.len(), second.len());
    for (index, (a, b)) in first.iter().zip(second).enumerate() {
        assert!(!a.is_empty());
        assert_eq!(a, b, "iteration {index} differs between runs");
    }
    for pair in first.windows(2) {
        assert_ne!(pair[0], pair[1]);
    }
}

/// Two same-seed runs draw identical put keys at every iteration index
#[test]
fn test_put_inputs_replay_per_iteration() {
    let sink = Snapshots::default();
    let def = snapshotting_def::<PutFixture>(
        |seed| PutFixture::new(64, seed),
        |f: &PutFixture| f.keys().to_vec(),
        &sink,
    );

    let (first, second) = replay_twice(&def, &sink);
    assert_eq!(first[0].len(), 64);
    assert_replayed(&first, &second);
}

/// Two same-seed runs build identical scan maps at every iteration index
#[test]
fn test_scan_inputs_replay_per_iteration() {
    let sink = Snapshots::default();
    let def = snapshotting_def::<ScanFixture<StdBTreeMap<i32, i32>>>(
        |seed| ScanFixture::<StdBTreeMap<i32, i32>>::new(64, seed),
        |f: &ScanFixture<StdBTreeMap<i32, i32>>| f.map().scan(|_, _| true),
        &sink,
    );

    let (first, second) = replay_twice(&def, &sink);
    assert_replayed(&first, &second);
}

/// A throughput sample converts back to the invocation count it covered
#[test]
fn test_throughput_times_duration_is_invocation_count() {
    let def = BenchmarkDef::new(
        "spin",
        Scope::PerWorker,
        |_: FixtureSeed| Empty,
        |_: &Empty, _: &mut Blackhole| -> Result<u64, OperationError> {
            Ok((0..100u64).sum())
        },
    );

    let set = def
        .run_trial(&trial_spec(TimingMode::Throughput, 1, 3, 1), &TrialControl::new())
        .unwrap();

    assert_eq!(set.len(), 3);
    for sample in set.samples() {
        assert!(sample.invocations >= 1);
        let ops = sample.metric(TimingMode::Throughput) * sample.duration_ns as f64 / 1e9;
        assert!((ops - sample.invocations as f64).abs() < 1e-6 * sample.invocations as f64);
    }
}

/// {1, 2, 3, 4, 5} aggregates to mean 3, std 1.414, median 3
#[test]
fn test_aggregate_known_values() {
    let stats = aggregate(&[1.0, 2.0, 3.0, 4.0, 5.0]);
    assert!((stats.mean - 3.0).abs() < 1e-12);
    assert!((stats.std_dev - 2f64.sqrt()).abs() < 1e-9);
    assert_eq!(stats.p50, 3.0);
    assert_eq!(stats.min, 1.0);
    assert_eq!(stats.max, 5.0);
    assert_eq!(stats.sample_count, 5);
}

/// No samples yields the no-data sentinel instead of an error
#[test]
fn test_empty_aggregate_is_sentinel() {
    let stats = aggregate(&[]);
    assert!(stats.is_no_data());
    assert_eq!(stats.sample_count, 0);
    assert!(stats.mean.is_nan());
}

struct FailAfter {
    calls: AtomicU64,
}

impl Fixture for FailAfter {}

fn failing_def() -> BenchmarkDef {
    BenchmarkDef::new(
        "fails_after_three",
        Scope::PerWorker,
        |_: FixtureSeed| FailAfter {
            calls: AtomicU64::new(0),
        },
        |f: &FailAfter, _: &mut Blackhole| -> Result<(), OperationError> {
            if f.calls.fetch_add(1, Ordering::SeqCst) >= 3 {
                Err("exhausted".into())
            } else {
                Ok(())
            }
        },
    )
}

/// A raising operation fails the trial with its position and no samples
#[test]
fn test_failing_operation_fails_trial() {
    let control = TrialControl::new();
    let err = failing_def()
        .run_trial(&trial_spec(TimingMode::AverageTime, 0, 1, 10), &control)
        .unwrap_err();

    assert_eq!(control.state(), TrialState::Failed);
    match err {
        TrialError::BenchmarkFailure {
            phase,
            iteration,
            invocation,
            cause,
            ..
        } => {
            assert_eq!(phase, Phase::Measurement);
            assert_eq!(iteration, 0);
            assert_eq!(invocation, 3);
            assert_eq!(cause, "exhausted");
        }
        other => panic!("unexpected error: {other}"),
    }
}

/// The failure shows up in the report while sibling benchmarks still run
#[test]
fn test_failure_is_reported_and_run_continues() {
    let mut registry = Registry::new();
    registry.register(failing_def()).unwrap();
    registry
        .register(BenchmarkDef::new(
            "healthy",
            Scope::PerWorker,
            |_: FixtureSeed| Empty,
            |_: &Empty, _: &mut Blackhole| -> Result<(), OperationError> { Ok(()) },
        ))
        .unwrap();

    let mut settings = quick_settings(TimingMode::AverageTime);
    settings.budget.invocations = 10;
    settings.measurement_iterations = 1;
    let (report, aborted) = execute_run(&registry, &settings, &Selection::default(), false);

    assert!(!aborted);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].benchmark, "fails_after_three");
    assert_eq!(report.failures[0].kind, "benchmark_failure");

    let failed = report.result("fails_after_three", "avgt").unwrap();
    assert_eq!(failed.metrics.samples, 0);
    assert!(failed.metrics.mean.is_none());

    let healthy = report.result("healthy", "avgt").unwrap();
    assert_eq!(healthy.metrics.samples, 1);
    assert_eq!(report.summary.trials_failed, 1);
    assert_eq!(report.summary.results_without_data, 1);
}

struct SharedCounter {
    racy: AtomicU64,
    exact: Arc<AtomicU64>,
    racy_out: Arc<AtomicU64>,
}

impl Fixture for SharedCounter {
    fn teardown(&mut self) {
        self.racy_out
            .store(self.racy.load(Ordering::SeqCst), Ordering::SeqCst);
    }
}

/// Lanes of a shared fixture really share it: an unsynchronized counter
/// never exceeds the true invocation total
#[test]
fn test_shared_fixture_across_lanes() {
    let exact = Arc::new(AtomicU64::new(0));
    let racy = Arc::new(AtomicU64::new(0));
    let (exact_in, racy_in) = (Arc::clone(&exact), Arc::clone(&racy));
    let def = BenchmarkDef::new(
        "shared_counter",
        Scope::Shared,
        move |_: FixtureSeed| SharedCounter {
            racy: AtomicU64::new(0),
            exact: Arc::clone(&exact_in),
            racy_out: Arc::clone(&racy_in),
        },
        |f: &SharedCounter, _: &mut Blackhole| -> Result<(), OperationError> {
            // Read-modify-write without atomicity; lanes may lose updates
            let seen = f.racy.load(Ordering::Relaxed);
            f.racy.store(seen + 1, Ordering::Relaxed);
            f.exact.fetch_add(1, Ordering::SeqCst);
            Ok(())
        },
    );

    let mut spec = trial_spec(TimingMode::AverageTime, 0, 2, 1_000);
    spec.lanes = 2;
    let set = def.run_trial(&spec, &TrialControl::new()).unwrap();

    assert_eq!(set.len(), 4);
    assert_eq!(set.total_invocations(), 4_000);
    assert_eq!(exact.load(Ordering::SeqCst), 4_000);
    let racy = racy.load(Ordering::SeqCst);
    assert!(racy > 0);
    assert!(racy <= 4_000);
}

/// Identical configuration gives identically ordered results
#[test]
fn test_deterministic_report_order() {
    let settings = quick_settings(TimingMode::SingleShotTime);
    let registry = standard_registry(workload_params(&settings.workload)).unwrap();

    let order = |report: &mapbench::Report| -> Vec<(String, String)> {
        report
            .results
            .iter()
            .map(|r| (r.benchmark.clone(), r.mode.clone()))
            .collect()
    };
    let (first, _) = execute_run(&registry, &settings, &Selection::default(), false);
    let (second, _) = execute_run(&registry, &settings, &Selection::default(), false);

    assert_eq!(order(&first), order(&second));
    assert_eq!(first.results[0].benchmark, "put/std-hashmap");
    assert_eq!(first.results.len(), 15);
}

/// Full run over the standard registry rendered as JSON
#[test]
fn test_json_report_end_to_end() {
    let mut settings = quick_settings(TimingMode::AverageTime);
    settings.forks = 2;
    let registry = standard_registry(workload_params(&settings.workload)).unwrap();
    let selection = Selection {
        filter: Some(regex::Regex::new("^scan/").unwrap()),
        group: None,
    };

    let (report, aborted) = execute_run(&registry, &settings, &selection, false);
    assert!(!aborted);
    assert!(!report.has_failures());

    let json = generate_json_report(&report).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();

    assert_eq!(value["meta"]["schema_version"], 1);
    assert_eq!(value["meta"]["config"]["forks"], 2);
    assert_eq!(value["meta"]["config"]["random_seed"], 42);

    let results = value["results"].as_array().unwrap();
    assert_eq!(results.len(), 5);
    for result in results {
        assert!(result["benchmark"].as_str().unwrap().starts_with("scan/"));
        assert_eq!(result["group"], "scan");
        assert_eq!(result["unit"], "ms/op");
        assert_eq!(result["forks_completed"], 2);
        assert_eq!(result["metrics"]["samples"], 4);
        assert!(result["metrics"]["mean"].as_f64().unwrap() > 0.0);
    }
    assert_eq!(value["summary"]["trials_run"], 10);
}
