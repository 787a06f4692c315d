#![warn(missing_docs)]
//! Mapbench Maps - Implementations Under Test
//!
//! Maps are plugged in through the [`MapUnderTest`] capability trait and
//! measured by three generic workloads. Adding an implementation means
//! writing one adapter and registering it:
//!
//! ```ignore
//! let mut registry = Registry::new();
//! mapbench_maps::register_map::<MyMap>(&mut registry, "my-map", WorkloadParams::default())?;
//! ```

mod adapter;
mod workload;

pub use adapter::{
    CowBTreeMap, CowHashMap, FxMap, HashKey, MapUnderTest, MapValue, OrdKey, StdBTreeMap,
    StdHashMap,
};
pub use workload::{
    LookupFixture, PutFixture, ScanFixture, Workload, WorkloadParams, lookup_all, put_all,
    register_workload, scan_above,
};

use mapbench_core::{Registry, RegistryError};

/// Register every workload for map type `M` under `<workload>/<name>`.
pub fn register_map<M: MapUnderTest<i32, i32>>(
    registry: &mut Registry,
    name: &str,
    params: WorkloadParams,
) -> Result<(), RegistryError> {
    for workload in Workload::ALL {
        register_workload::<M>(registry, workload, name, params)?;
    }
    Ok(())
}

/// Names of the bundled adapters, in registration order
pub const STANDARD_MAPS: [&str; 5] = [
    "std-hashmap",
    "std-btreemap",
    "fx-hashmap",
    "cow-hashmap",
    "cow-btreemap",
];

/// Registry of every workload against every bundled adapter.
///
/// Benchmarks are ordered workload first, then adapter, so each group
/// reads as one comparison.
pub fn standard_registry(params: WorkloadParams) -> Result<Registry, RegistryError> {
    let mut registry = Registry::new();
    for workload in Workload::ALL {
        let [std_hash, std_btree, fx_hash, cow_hash, cow_btree] = STANDARD_MAPS;
        register_workload::<StdHashMap<i32, i32>>(&mut registry, workload, std_hash, params)?;
        register_workload::<StdBTreeMap<i32, i32>>(&mut registry, workload, std_btree, params)?;
        register_workload::<FxMap<i32, i32>>(&mut registry, workload, fx_hash, params)?;
        register_workload::<CowHashMap<i32, i32>>(&mut registry, workload, cow_hash, params)?;
        register_workload::<CowBTreeMap<i32, i32>>(&mut registry, workload, cow_btree, params)?;
    }
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mapbench_core::{IterationBudget, TimingMode, TrialControl, TrialSpec};
    use std::time::Duration;

    fn small() -> WorkloadParams {
        WorkloadParams {
            entries: 200,
            scan_threshold: 0,
        }
    }

    #[test]
    fn test_standard_registry_order() {
        let registry = standard_registry(small()).unwrap();
        assert_eq!(registry.len(), 15);

        let names: Vec<&str> = registry.iter().map(|d| d.name().as_ref()).collect();
        assert_eq!(names[0], "put/std-hashmap");
        assert_eq!(names[4], "put/cow-btreemap");
        assert_eq!(names[5], "random_access/std-hashmap");
        assert_eq!(names[14], "scan/cow-btreemap");
    }

    #[test]
    fn test_register_map_adds_all_workloads() {
        let mut registry = Registry::new();
        register_map::<FxMap<i32, i32>>(&mut registry, "fx", small()).unwrap();
        let groups: Vec<&str> = registry.iter().map(|d| d.group()).collect();
        assert_eq!(groups, vec!["put", "random_access", "scan"]);
    }

    #[test]
    fn test_every_standard_benchmark_runs() {
        let registry = standard_registry(small()).unwrap();
        let spec = TrialSpec {
            fork: 0,
            mode: TimingMode::SingleShotTime,
            warmup_iterations: 1,
            measurement_iterations: 2,
            budget: IterationBudget {
                iteration_time: Duration::from_millis(1),
                invocations: 1,
            },
            lanes: 1,
            seed: 42,
            pin_lanes: false,
        };

        for def in registry.iter() {
            let set = def.run_trial(&spec, &TrialControl::new()).unwrap();
            assert_eq!(set.len(), 2, "{}", def.name());
        }
    }
}
