//! Benchmark Registry
//!
//! Definitions are registered explicitly and kept in registration order,
//! which is also the order the planner emits them in.

use crate::blackhole::Blackhole;
use crate::error::{OperationError, RegistryError, TrialError};
use crate::fixture::{Fixture, FixtureSeed, HookLevels, Scope};
use crate::sample::ResultSet;
use crate::trial::{TrialControl, TrialSpec, run_trial};
use fxhash::FxHashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// Type-erased trial entry point of one benchmark
pub trait TrialTarget: Send + Sync {
    /// Fixture sharing between lanes
    fn scope(&self) -> Scope;

    /// Hook levels the fixture declares
    fn hooks(&self) -> HookLevels;

    /// Run one full trial
    fn run(
        &self,
        name: &Arc<str>,
        spec: &TrialSpec,
        control: &TrialControl,
    ) -> Result<ResultSet, TrialError>;
}

struct FnTarget<F, R, M, O> {
    scope: Scope,
    make: M,
    op: O,
    _marker: PhantomData<fn() -> (F, R)>,
}

impl<F, R, M, O> TrialTarget for FnTarget<F, R, M, O>
where
    F: Fixture,
    R: 'static,
    M: Fn(FixtureSeed) -> F + Send + Sync + 'static,
    O: Fn(&F, &mut Blackhole) -> Result<R, OperationError> + Send + Sync + 'static,
{
    fn scope(&self) -> Scope {
        self.scope
    }

    fn hooks(&self) -> HookLevels {
        F::HOOKS
    }

    fn run(
        &self,
        name: &Arc<str>,
        spec: &TrialSpec,
        control: &TrialControl,
    ) -> Result<ResultSet, TrialError> {
        run_trial(name, self.scope, spec, &self.make, &self.op, control)
    }
}

/// A registered benchmark: fixture factory plus operation under test.
#[derive(Clone)]
pub struct BenchmarkDef {
    name: Arc<str>,
    group: String,
    target: Arc<dyn TrialTarget>,
}

impl BenchmarkDef {
    /// Define a benchmark.
    ///
    /// `make` builds a fresh fixture per trial (and per lane for
    /// `PerWorker` scope); `op` is the operation under test.
    pub fn new<F, R, M, O>(name: impl Into<String>, scope: Scope, make: M, op: O) -> Self
    where
        F: Fixture,
        R: 'static,
        M: Fn(FixtureSeed) -> F + Send + Sync + 'static,
        O: Fn(&F, &mut Blackhole) -> Result<R, OperationError> + Send + Sync + 'static,
    {
        let name: String = name.into();
        Self {
            name: Arc::from(name.as_str()),
            group: String::from("default"),
            target: Arc::new(FnTarget {
                scope,
                make,
                op,
                _marker: PhantomData,
            }),
        }
    }

    /// Place the benchmark in a group
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = group.into();
        self
    }

    /// Unique name
    pub fn name(&self) -> &Arc<str> {
        &self.name
    }

    /// Group name
    pub fn group(&self) -> &str {
        &self.group
    }

    /// Fixture scope
    pub fn scope(&self) -> Scope {
        self.target.scope()
    }

    /// Declared hook levels
    pub fn hooks(&self) -> HookLevels {
        self.target.hooks()
    }

    /// Run one trial of this benchmark
    pub fn run_trial(
        &self,
        spec: &TrialSpec,
        control: &TrialControl,
    ) -> Result<ResultSet, TrialError> {
        self.target.run(&self.name, spec, control)
    }
}

impl fmt::Debug for BenchmarkDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BenchmarkDef")
            .field("name", &self.name)
            .field("group", &self.group)
            .field("scope", &self.scope())
            .finish()
    }
}

/// Ordered set of benchmark definitions with unique names
#[derive(Debug, Default, Clone)]
pub struct Registry {
    defs: Vec<BenchmarkDef>,
    index: FxHashMap<Arc<str>, usize>,
}

impl Registry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a definition; names must be unique and non-empty
    pub fn register(&mut self, def: BenchmarkDef) -> Result<(), RegistryError> {
        if def.name.is_empty() {
            return Err(RegistryError::EmptyName);
        }
        if self.index.contains_key(&def.name) {
            return Err(RegistryError::Duplicate(def.name.to_string()));
        }
        self.index.insert(Arc::clone(&def.name), self.defs.len());
        tracing::trace!(benchmark = %def.name, group = %def.group, "registered");
        self.defs.push(def);
        Ok(())
    }

    /// Look a definition up by name
    pub fn get(&self, name: &str) -> Option<&BenchmarkDef> {
        self.index.get(name).map(|&i| &self.defs[i])
    }

    /// Definitions in registration order
    pub fn iter(&self) -> impl Iterator<Item = &BenchmarkDef> {
        self.defs.iter()
    }

    /// Number of definitions
    pub fn len(&self) -> usize {
        self.defs.len()
    }

    /// Whether nothing is registered
    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }
}
