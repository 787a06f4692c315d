//! Map Adapters
//!
//! Every implementation under test is driven through [`MapUnderTest`]. The
//! in-place adapters own their storage outright; the copy-on-write adapters
//! share it behind an `Arc` and copy only when a shared handle is written,
//! so a handle kept from before a `put` never observes it.

use fxhash::FxHashMap;
use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;
use std::sync::Arc;

/// Capability set a map must provide to be benchmarked
pub trait MapUnderTest<K, V>: Sized + Send + Sync + 'static {
    /// A map with no entries
    fn empty() -> Self;

    /// The map with `key` bound to `value`
    fn put(self, key: K, value: V) -> Self;

    /// Value bound to `key`
    fn get(&self, key: &K) -> Option<V>;

    /// Keys whose entry satisfies `predicate`, in the map's iteration order
    fn scan<P>(&self, predicate: P) -> Vec<K>
    where
        P: FnMut(&K, &V) -> bool;
}

/// Key bounds for hashed adapters
pub trait HashKey: Eq + Hash + Clone + Send + Sync + 'static {}
impl<T: Eq + Hash + Clone + Send + Sync + 'static> HashKey for T {}

/// Key bounds for ordered adapters
pub trait OrdKey: Ord + Clone + Send + Sync + 'static {}
impl<T: Ord + Clone + Send + Sync + 'static> OrdKey for T {}

/// Value bounds shared by every adapter
pub trait MapValue: Clone + Send + Sync + 'static {}
impl<T: Clone + Send + Sync + 'static> MapValue for T {}

fn scan_entries<'a, K, V, I, P>(entries: I, mut predicate: P) -> Vec<K>
where
    K: Clone + 'a,
    V: 'a,
    I: Iterator<Item = (&'a K, &'a V)>,
    P: FnMut(&K, &V) -> bool,
{
    entries
        .filter(|(k, v)| predicate(*k, *v))
        .map(|(k, _)| k.clone())
        .collect()
}

/// `std::collections::HashMap`, mutated in place
#[derive(Debug, Clone, Default)]
pub struct StdHashMap<K, V>(HashMap<K, V>);

impl<K: HashKey, V: MapValue> MapUnderTest<K, V> for StdHashMap<K, V> {
    fn empty() -> Self {
        Self(HashMap::new())
    }

    fn put(mut self, key: K, value: V) -> Self {
        self.0.insert(key, value);
        self
    }

    fn get(&self, key: &K) -> Option<V> {
        self.0.get(key).cloned()
    }

    fn scan<P>(&self, predicate: P) -> Vec<K>
    where
        P: FnMut(&K, &V) -> bool,
    {
        scan_entries(self.0.iter(), predicate)
    }
}

/// `std::collections::BTreeMap`, mutated in place
#[derive(Debug, Clone, Default)]
pub struct StdBTreeMap<K, V>(BTreeMap<K, V>);

impl<K: OrdKey, V: MapValue> MapUnderTest<K, V> for StdBTreeMap<K, V> {
    fn empty() -> Self {
        Self(BTreeMap::new())
    }

    fn put(mut self, key: K, value: V) -> Self {
        self.0.insert(key, value);
        self
    }

    fn get(&self, key: &K) -> Option<V> {
        self.0.get(key).cloned()
    }

    fn scan<P>(&self, predicate: P) -> Vec<K>
    where
        P: FnMut(&K, &V) -> bool,
    {
        scan_entries(self.0.iter(), predicate)
    }
}

/// `FxHashMap`, mutated in place
#[derive(Debug, Clone, Default)]
pub struct FxMap<K, V>(FxHashMap<K, V>);

impl<K: HashKey, V: MapValue> MapUnderTest<K, V> for FxMap<K, V> {
    fn empty() -> Self {
        Self(FxHashMap::default())
    }

    fn put(mut self, key: K, value: V) -> Self {
        self.0.insert(key, value);
        self
    }

    fn get(&self, key: &K) -> Option<V> {
        self.0.get(key).cloned()
    }

    fn scan<P>(&self, predicate: P) -> Vec<K>
    where
        P: FnMut(&K, &V) -> bool,
    {
        scan_entries(self.0.iter(), predicate)
    }
}

/// Persistent `HashMap`: clones share storage until one of them is written
#[derive(Debug, Clone, Default)]
pub struct CowHashMap<K, V>(Arc<HashMap<K, V>>);

impl<K: HashKey, V: MapValue> MapUnderTest<K, V> for CowHashMap<K, V> {
    fn empty() -> Self {
        Self(Arc::new(HashMap::new()))
    }

    fn put(mut self, key: K, value: V) -> Self {
        Arc::make_mut(&mut self.0).insert(key, value);
        self
    }

    fn get(&self, key: &K) -> Option<V> {
        self.0.get(key).cloned()
    }

    fn scan<P>(&self, predicate: P) -> Vec<K>
    where
        P: FnMut(&K, &V) -> bool,
    {
        scan_entries(self.0.iter(), predicate)
    }
}

/// Persistent `BTreeMap`: clones share storage until one of them is written
#[derive(Debug, Clone, Default)]
pub struct CowBTreeMap<K, V>(Arc<BTreeMap<K, V>>);

impl<K: OrdKey, V: MapValue> MapUnderTest<K, V> for CowBTreeMap<K, V> {
    fn empty() -> Self {
        Self(Arc::new(BTreeMap::new()))
    }

    fn put(mut self, key: K, value: V) -> Self {
        Arc::make_mut(&mut self.0).insert(key, value);
        self
    }

    fn get(&self, key: &K) -> Option<V> {
        self.0.get(key).cloned()
    }

    fn scan<P>(&self, predicate: P) -> Vec<K>
    where
        P: FnMut(&K, &V) -> bool,
    {
        scan_entries(self.0.iter(), predicate)
    }
}
