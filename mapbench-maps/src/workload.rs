//! Workloads
//!
//! Three workloads exercise every adapter: building a map by repeated `put`,
//! random `get` against a dense key range, and a predicate `scan`. Each
//! fixture redraws its inputs before every iteration from its own seeded
//! stream, so iterations see equally sized but never identical inputs.

use crate::adapter::MapUnderTest;
use mapbench_core::{
    BenchmarkDef, Blackhole, Fixture, FixtureSeed, HookContext, HookError, HookLevels,
    OperationError, Registry, RegistryError, Scope,
};
use rand::rngs::StdRng;
use rand::{Rng, RngCore};
use std::fmt;

/// Workload sizing shared by every benchmark of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkloadParams {
    /// Entries per map (and lookups per random-access invocation)
    pub entries: usize,
    /// Scan keeps values strictly greater than this
    pub scan_threshold: i64,
}

impl Default for WorkloadParams {
    fn default() -> Self {
        Self {
            entries: 10_000,
            scan_threshold: 10_000,
        }
    }
}

/// Operation measured against each adapter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Workload {
    /// Build a map from empty
    Put,
    /// Random lookups in a dense map
    RandomAccess,
    /// Predicate scan over random entries
    Scan,
}

impl Workload {
    /// Every workload, in registration order
    pub const ALL: [Workload; 3] = [Workload::Put, Workload::RandomAccess, Workload::Scan];

    /// Group name and benchmark name prefix
    pub fn as_str(self) -> &'static str {
        match self {
            Workload::Put => "put",
            Workload::RandomAccess => "random_access",
            Workload::Scan => "scan",
        }
    }
}

impl fmt::Display for Workload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn key_range(entries: usize) -> Result<i32, HookError> {
    i32::try_from(entries)
        .map_err(|_| HookError::new(format!("{entries} entries exceed the i32 key range")))
}

fn random_keys(rng: &mut StdRng, entries: usize) -> Vec<i32> {
    (0..entries).map(|_| rng.next_u32() as i32).collect()
}

fn map_of<M, I>(keys: I) -> M
where
    M: MapUnderTest<i32, i32>,
    I: IntoIterator<Item = i32>,
{
    keys.into_iter().fold(M::empty(), |map, k| map.put(k, k))
}

/// Fresh random keys to insert
pub struct PutFixture {
    entries: usize,
    rng: StdRng,
    keys: Vec<i32>,
}

impl PutFixture {
    /// Fixture drawing `entries` keys per iteration
    pub fn new(entries: usize, seed: FixtureSeed) -> Self {
        Self {
            entries,
            rng: seed.rng(),
            keys: Vec::with_capacity(entries),
        }
    }

    /// Keys of the current iteration
    pub fn keys(&self) -> &[i32] {
        &self.keys
    }
}

impl Fixture for PutFixture {
    const HOOKS: HookLevels = HookLevels::ITERATION;

    fn setup_iteration(&mut self, _ctx: &HookContext) -> Result<(), HookError> {
        self.keys = random_keys(&mut self.rng, self.entries);
        Ok(())
    }
}

/// Dense map `0..entries` plus random lookup keys
pub struct LookupFixture<M> {
    entries: usize,
    rng: StdRng,
    map: M,
    lookups: Vec<i32>,
}

impl<M: MapUnderTest<i32, i32>> LookupFixture<M> {
    /// Fixture sized to `entries`
    pub fn new(entries: usize, seed: FixtureSeed) -> Self {
        Self {
            entries,
            rng: seed.rng(),
            map: M::empty(),
            lookups: Vec::with_capacity(entries),
        }
    }

    /// Map of the current iteration
    pub fn map(&self) -> &M {
        &self.map
    }

    /// Lookup keys of the current iteration
    pub fn lookups(&self) -> &[i32] {
        &self.lookups
    }
}

impl<M: MapUnderTest<i32, i32>> Fixture for LookupFixture<M> {
    const HOOKS: HookLevels = HookLevels::ITERATION;

    fn setup_iteration(&mut self, _ctx: &HookContext) -> Result<(), HookError> {
        let n = key_range(self.entries)?;
        self.map = map_of(0..n);
        let rng = &mut self.rng;
        self.lookups = (0..self.entries).map(|_| rng.gen_range(0..n)).collect();
        Ok(())
    }
}

/// Map of random entries to scan
pub struct ScanFixture<M> {
    entries: usize,
    rng: StdRng,
    map: M,
}

impl<M: MapUnderTest<i32, i32>> ScanFixture<M> {
    /// Fixture sized to `entries`
    pub fn new(entries: usize, seed: FixtureSeed) -> Self {
        Self {
            entries,
            rng: seed.rng(),
            map: M::empty(),
        }
    }

    /// Map of the current iteration
    pub fn map(&self) -> &M {
        &self.map
    }
}

impl<M: MapUnderTest<i32, i32>> Fixture for ScanFixture<M> {
    const HOOKS: HookLevels = HookLevels::ITERATION;

    fn setup_iteration(&mut self, _ctx: &HookContext) -> Result<(), HookError> {
        self.map = map_of(random_keys(&mut self.rng, self.entries));
        Ok(())
    }
}

/// Put every key (mapped to itself) into an empty map and return it.
pub fn put_all<M: MapUnderTest<i32, i32>>(
    fixture: &PutFixture,
    _bh: &mut Blackhole,
) -> Result<M, OperationError> {
    Ok(map_of(fixture.keys.iter().copied()))
}

/// Look up every key, feeding each result to the blackhole.
pub fn lookup_all<M: MapUnderTest<i32, i32>>(
    fixture: &LookupFixture<M>,
    bh: &mut Blackhole,
) -> Result<(), OperationError> {
    for key in &fixture.lookups {
        bh.consume(fixture.map.get(key));
    }
    Ok(())
}

/// Keys whose value is strictly greater than `threshold`.
pub fn scan_above<M: MapUnderTest<i32, i32>>(map: &M, threshold: i64) -> Vec<i32> {
    map.scan(|_, v| i64::from(*v) > threshold)
}

/// Register one workload against map type `M` as `<workload>/<map_name>`.
pub fn register_workload<M: MapUnderTest<i32, i32>>(
    registry: &mut Registry,
    workload: Workload,
    map_name: &str,
    params: WorkloadParams,
) -> Result<(), RegistryError> {
    let name = format!("{workload}/{map_name}");
    let entries = params.entries;
    let def = match workload {
        Workload::Put => BenchmarkDef::new(
            name,
            Scope::PerWorker,
            move |seed: FixtureSeed| PutFixture::new(entries, seed),
            put_all::<M>,
        ),
        Workload::RandomAccess => BenchmarkDef::new(
            name,
            Scope::PerWorker,
            move |seed: FixtureSeed| LookupFixture::<M>::new(entries, seed),
            lookup_all::<M>,
        ),
        Workload::Scan => {
            let threshold = params.scan_threshold;
            BenchmarkDef::new(
                name,
                Scope::PerWorker,
                move |seed: FixtureSeed| ScanFixture::<M>::new(entries, seed),
                move |f: &ScanFixture<M>, _: &mut Blackhole| -> Result<Vec<i32>, OperationError> {
                    Ok(scan_above(&f.map, threshold))
                },
            )
        }
    };
    registry.register(def.with_group(workload.as_str()))
}
