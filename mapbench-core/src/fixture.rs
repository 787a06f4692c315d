//! Fixture Lifecycle
//!
//! A fixture is the mutable state a benchmark operation runs against. The
//! lifecycle manager ([`FixtureSet`]) owns every fixture instance of one
//! trial:
//!
//! ```text
//! new_trial ──► setup_trial (once per fixture)
//!     │
//!     ├──► setup_iteration ──► [setup_invocation ──► op]*   (per iteration)
//!     │
//!     └──► teardown (on drop, every exit path)
//! ```
//!
//! `Shared` scope gives one instance to every lane; `PerWorker` scope builds
//! one instance per lane and never hands it to another lane.

use crate::error::{HookError, SetupError};
use crate::sample::Phase;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How fixture instances are shared between concurrent execution lanes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Scope {
    /// One instance reused by all lanes of a trial
    Shared,
    /// One instance per lane
    #[default]
    PerWorker,
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Shared => f.write_str("shared"),
            Scope::PerWorker => f.write_str("per-worker"),
        }
    }
}

/// Point in the lifecycle at which a setup hook fires
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookLevel {
    /// Once per fresh trial
    Trial,
    /// Before every iteration, warmup included
    Iteration,
    /// Before every single invocation
    Invocation,
}

impl fmt::Display for HookLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HookLevel::Trial => f.write_str("per-trial"),
            HookLevel::Iteration => f.write_str("per-iteration"),
            HookLevel::Invocation => f.write_str("per-invocation"),
        }
    }
}

/// Set of hook levels a fixture declares
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HookLevels {
    trial: bool,
    iteration: bool,
    invocation: bool,
}

impl HookLevels {
    /// No hooks
    pub const NONE: Self = Self {
        trial: false,
        iteration: false,
        invocation: false,
    };
    /// Per-trial hook only
    pub const TRIAL: Self = Self {
        trial: true,
        ..Self::NONE
    };
    /// Per-iteration hook only
    pub const ITERATION: Self = Self {
        iteration: true,
        ..Self::NONE
    };
    /// Per-invocation hook only
    pub const INVOCATION: Self = Self {
        invocation: true,
        ..Self::NONE
    };

    /// Union of two sets
    pub const fn with(self, other: Self) -> Self {
        Self {
            trial: self.trial || other.trial,
            iteration: self.iteration || other.iteration,
            invocation: self.invocation || other.invocation,
        }
    }

    /// Whether `level` is declared
    pub const fn contains(self, level: HookLevel) -> bool {
        match level {
            HookLevel::Trial => self.trial,
            HookLevel::Iteration => self.iteration,
            HookLevel::Invocation => self.invocation,
        }
    }
}

/// Deterministic seed material for one fixture instance.
///
/// Derived from the run's configured seed, the fork index and the lane
/// index, so lanes never share a random stream and reruns replay the same
/// inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixtureSeed {
    /// Seed configured for the whole run
    pub run_seed: u64,
    /// Fork (trial) index
    pub fork: u32,
    /// Execution lane index
    pub lane: usize,
}

impl FixtureSeed {
    /// Mixed 64-bit seed for this fixture
    pub fn value(&self) -> u64 {
        let mut z = self
            .run_seed
            .wrapping_add(0x9E37_79B9_7F4A_7C15_u64.wrapping_mul(self.fork as u64 + 1))
            .wrapping_add((self.lane as u64) << 32);
        // splitmix64 finalizer
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }

    /// Fresh generator owned by the fixture
    pub fn rng(&self) -> StdRng {
        StdRng::seed_from_u64(self.value())
    }
}

/// Where in the trial a hook is firing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HookContext {
    /// Fork index
    pub fork: u32,
    /// Lane owning the fixture (0 for shared fixtures)
    pub lane: usize,
    /// Phase of the upcoming iteration; `None` for per-trial hooks
    pub phase: Option<Phase>,
    /// Iteration index within its phase
    pub iteration: u32,
    /// Invocation index within the iteration (per-invocation hooks only)
    pub invocation: u64,
}

/// Mutable benchmark state with lifecycle hooks.
///
/// Only hooks named in [`Fixture::HOOKS`] are fired. A per-iteration hook
/// must fully reset whatever the previous iteration accumulated, so every
/// iteration measures an equivalent (same size, same distribution) but
/// freshly drawn workload.
pub trait Fixture: Send + Sync + 'static {
    /// Hook levels this fixture wants fired
    const HOOKS: HookLevels = HookLevels::NONE;

    /// Runs once after construction
    fn setup_trial(&mut self, _ctx: &HookContext) -> Result<(), HookError> {
        Ok(())
    }

    /// Runs before every iteration
    fn setup_iteration(&mut self, _ctx: &HookContext) -> Result<(), HookError> {
        Ok(())
    }

    /// Runs before every invocation, outside the timed region
    fn setup_invocation(&mut self, _ctx: &HookContext) -> Result<(), HookError> {
        Ok(())
    }

    /// Runs when the trial releases the fixture, on success and failure alike
    fn teardown(&mut self) {}
}

/// Fire `level` on one fixture if it declares that level.
pub(crate) fn fire_hook<F: Fixture>(
    fixture: &mut F,
    level: HookLevel,
    ctx: &HookContext,
) -> Result<(), SetupError> {
    if !F::HOOKS.contains(level) {
        return Ok(());
    }
    let result = match level {
        HookLevel::Trial => fixture.setup_trial(ctx),
        HookLevel::Iteration => fixture.setup_iteration(ctx),
        HookLevel::Invocation => fixture.setup_invocation(ctx),
    };
    result.map_err(|source| SetupError::Hook {
        level,
        lane: ctx.lane,
        source,
    })
}

/// Owner of every fixture instance of one trial.
///
/// Dropping the set tears every fixture down, whichever way the trial ends.
pub struct FixtureSet<F: Fixture> {
    scope: Scope,
    lanes: usize,
    fork: u32,
    fixtures: Vec<F>,
}

impl<F: Fixture> FixtureSet<F> {
    /// Allocate fresh fixtures for a trial and fire their per-trial hooks.
    pub fn new_trial<M>(
        make: &M,
        scope: Scope,
        lanes: usize,
        run_seed: u64,
        fork: u32,
    ) -> Result<Self, SetupError>
    where
        M: Fn(FixtureSeed) -> F,
    {
        let lanes = lanes.max(1);
        if scope == Scope::Shared && lanes > 1 && F::HOOKS.contains(HookLevel::Invocation) {
            return Err(SetupError::SharedInvocationHook { lanes });
        }

        let instances = match scope {
            Scope::Shared => 1,
            Scope::PerWorker => lanes,
        };

        // Fixtures land in the set before any hook runs so a failing hook
        // still gets every instance torn down.
        let mut set = Self {
            scope,
            lanes,
            fork,
            fixtures: Vec::with_capacity(instances),
        };
        for lane in 0..instances {
            set.fixtures.push(make(FixtureSeed {
                run_seed,
                fork,
                lane,
            }));
        }

        for (lane, fixture) in set.fixtures.iter_mut().enumerate() {
            let ctx = HookContext {
                fork,
                lane,
                phase: None,
                iteration: 0,
                invocation: 0,
            };
            fire_hook(fixture, HookLevel::Trial, &ctx)?;
        }

        tracing::debug!(%scope, lanes, instances, fork, "fixtures ready");
        Ok(set)
    }

    /// Fire per-iteration hooks on every instance.
    pub fn prepare_iteration(&mut self, phase: Phase, iteration: u32) -> Result<(), SetupError> {
        let fork = self.fork;
        for (lane, fixture) in self.fixtures.iter_mut().enumerate() {
            fire_hook(
                fixture,
                HookLevel::Iteration,
                &HookContext {
                    fork,
                    lane,
                    phase: Some(phase),
                    iteration,
                    invocation: 0,
                },
            )?;
        }
        Ok(())
    }

    /// Declared scope
    pub fn scope(&self) -> Scope {
        self.scope
    }

    /// Number of concurrent lanes the set serves
    pub fn lanes(&self) -> usize {
        self.lanes
    }

    /// Fork index the fixtures were built for
    pub fn fork(&self) -> u32 {
        self.fork
    }

    /// Number of live fixture instances
    pub fn instances(&self) -> usize {
        self.fixtures.len()
    }

    /// The single shared instance, if the scope is `Shared`
    pub fn shared(&self) -> Option<&F> {
        match self.scope {
            Scope::Shared => self.fixtures.first(),
            Scope::PerWorker => None,
        }
    }

    /// Exclusive access to the instance at `index`
    pub fn get_mut(&mut self, index: usize) -> Option<&mut F> {
        self.fixtures.get_mut(index)
    }

    /// Exclusive access to every instance (one per lane for `PerWorker`)
    pub fn instances_mut(&mut self) -> &mut [F] {
        &mut self.fixtures
    }
}

impl<F: Fixture> Drop for FixtureSet<F> {
    fn drop(&mut self) {
        for fixture in &mut self.fixtures {
            fixture.teardown();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Default)]
    struct Counters {
        trial: AtomicU32,
        iteration: AtomicU32,
        teardown: AtomicU32,
    }

    struct Probe {
        counters: Arc<Counters>,
        fail_trial_on_lane: Option<usize>,
    }

    impl Fixture for Probe {
        const HOOKS: HookLevels = HookLevels::TRIAL.with(HookLevels::ITERATION);

        fn setup_trial(&mut self, ctx: &HookContext) -> Result<(), HookError> {
            self.counters.trial.fetch_add(1, Ordering::SeqCst);
            if self.fail_trial_on_lane == Some(ctx.lane) {
                return Err(HookError::new("refused"));
            }
            Ok(())
        }

        fn setup_iteration(&mut self, _ctx: &HookContext) -> Result<(), HookError> {
            self.counters.iteration.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn teardown(&mut self) {
            self.counters.teardown.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn probe_factory(
        counters: &Arc<Counters>,
        fail_trial_on_lane: Option<usize>,
    ) -> impl Fn(FixtureSeed) -> Probe {
        let counters = Arc::clone(counters);
        move |_| Probe {
            counters: Arc::clone(&counters),
            fail_trial_on_lane,
        }
    }

    #[test]
    fn test_per_worker_builds_one_instance_per_lane() {
        let counters = Arc::new(Counters::default());
        let make = probe_factory(&counters, None);
        let mut set = FixtureSet::new_trial(&make, Scope::PerWorker, 3, 7, 0).unwrap();

        assert_eq!(set.instances(), 3);
        assert!(set.shared().is_none());
        assert_eq!(counters.trial.load(Ordering::SeqCst), 3);

        set.prepare_iteration(Phase::Warmup, 0).unwrap();
        assert_eq!(counters.iteration.load(Ordering::SeqCst), 3);

        drop(set);
        assert_eq!(counters.teardown.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_shared_builds_single_instance() {
        let counters = Arc::new(Counters::default());
        let make = probe_factory(&counters, None);
        let set = FixtureSet::new_trial(&make, Scope::Shared, 4, 7, 0).unwrap();

        assert_eq!(set.instances(), 1);
        assert!(set.shared().is_some());
        assert_eq!(set.lanes(), 4);
    }

    #[test]
    fn test_failed_trial_hook_still_tears_down() {
        let counters = Arc::new(Counters::default());
        let make = probe_factory(&counters, Some(1));
        let err = FixtureSet::new_trial(&make, Scope::PerWorker, 2, 7, 0)
            .err()
            .unwrap();

        assert!(matches!(
            err,
            SetupError::Hook {
                level: HookLevel::Trial,
                lane: 1,
                ..
            }
        ));
        assert_eq!(counters.teardown.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_shared_invocation_hook_rejected_for_many_lanes() {
        struct PerCall;
        impl Fixture for PerCall {
            const HOOKS: HookLevels = HookLevels::INVOCATION;
        }

        let make = |_: FixtureSeed| PerCall;
        let err = FixtureSet::new_trial(&make, Scope::Shared, 2, 0, 0)
            .err()
            .unwrap();
        assert!(matches!(err, SetupError::SharedInvocationHook { lanes: 2 }));

        // A single lane has exclusive access, so it is allowed
        assert!(FixtureSet::new_trial(&make, Scope::Shared, 1, 0, 0).is_ok());
    }

    #[test]
    fn test_undeclared_hooks_do_not_fire() {
        struct Silent {
            fired: bool,
        }
        impl Fixture for Silent {
            fn setup_iteration(&mut self, _ctx: &HookContext) -> Result<(), HookError> {
                self.fired = true;
                Ok(())
            }
        }

        let make = |_: FixtureSeed| Silent { fired: false };
        let mut set = FixtureSet::new_trial(&make, Scope::PerWorker, 1, 0, 0).unwrap();
        set.prepare_iteration(Phase::Measurement, 0).unwrap();
        assert!(!set.get_mut(0).unwrap().fired);
    }

    #[test]
    fn test_seed_differs_by_lane_and_fork() {
        let base = FixtureSeed {
            run_seed: 42,
            fork: 0,
            lane: 0,
        };
        let other_lane = FixtureSeed { lane: 1, ..base };
        let other_fork = FixtureSeed { fork: 1, ..base };

        assert_eq!(base.value(), base.value());
        assert_ne!(base.value(), other_lane.value());
        assert_ne!(base.value(), other_fork.value());
    }
}
