//! Blackhole
//!
//! Consumes values produced by the operation under test so the optimizer
//! cannot prove them dead. Each execution lane owns its own `Blackhole`, so
//! consumption never contends; the per-lane tally is published to a
//! process-wide counter once, when the blackhole is dropped.

use std::sync::atomic::{AtomicU64, Ordering};

static CONSUMED: AtomicU64 = AtomicU64::new(0);

/// Total number of values consumed by all blackholes dropped so far.
pub fn total_consumed() -> u64 {
    CONSUMED.load(Ordering::Relaxed)
}

/// Per-lane sink for benchmark results.
#[derive(Debug, Default)]
pub struct Blackhole {
    consumed: u64,
}

impl Blackhole {
    /// Create an empty blackhole
    pub fn new() -> Self {
        Self { consumed: 0 }
    }

    /// Consume a value.
    ///
    /// The value is routed through `std::hint::black_box`, which the
    /// optimizer must treat as an arbitrary read. Cost is one opaque call and
    /// one increment regardless of `T`.
    #[inline(always)]
    pub fn consume<T>(&mut self, value: T) {
        let _ = std::hint::black_box(value);
        self.consumed = std::hint::black_box(self.consumed.wrapping_add(1));
    }

    /// Values consumed through this blackhole
    pub fn consumed(&self) -> u64 {
        self.consumed
    }
}

impl Drop for Blackhole {
    fn drop(&mut self) {
        CONSUMED.fetch_add(self.consumed, Ordering::Relaxed);
    }
}
