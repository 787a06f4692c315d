//! Monotonic Timing
//!
//! Thin wrappers over `std::time::Instant` used to bracket invocations, plus
//! optional CPU pinning for execution lanes.

use std::time::Duration;

/// Timer bracketing one measured region
#[derive(Debug, Clone, Copy)]
pub struct Timer {
    start: std::time::Instant,
}

impl Timer {
    /// Start a new timer
    #[inline(always)]
    pub fn start() -> Self {
        Self {
            start: std::time::Instant::now(),
        }
    }

    /// Elapsed nanoseconds since `start`
    #[inline(always)]
    pub fn stop(&self) -> u64 {
        self.start.elapsed().as_nanos() as u64
    }

    /// Elapsed time since `start`
    #[inline(always)]
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

/// Pin the current thread to a specific core.
///
/// Keeps a lane on one core for the length of an iteration.
#[cfg(target_os = "linux")]
pub fn pin_to_cpu(cpu: usize) -> Result<(), std::io::Error> {
    use std::mem::MaybeUninit;

    // SAFETY: cpu_set_t is plain data; it is zeroed before use and only
    // handed to sched_setaffinity for the calling thread (pid 0).
    unsafe {
        let mut set = MaybeUninit::<libc::cpu_set_t>::zeroed();
        let set_ref = set.assume_init_mut();

        libc::CPU_ZERO(set_ref);
        libc::CPU_SET(cpu, set_ref);

        let result = libc::sched_setaffinity(0, std::mem::size_of::<libc::cpu_set_t>(), set_ref);

        if result == 0 {
            Ok(())
        } else {
            Err(std::io::Error::last_os_error())
        }
    }
}

/// CPU pinning is only wired up on Linux.
#[cfg(not(target_os = "linux"))]
pub fn pin_to_cpu(_cpu: usize) -> Result<(), std::io::Error> {
    Ok(())
}

/// Pin lane `lane` to a core, spreading lanes over the available cores.
pub(crate) fn pin_lane(lane: usize) {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    if let Err(e) = pin_to_cpu(lane % cores) {
        tracing::debug!(lane, error = %e, "could not pin lane to cpu");
    }
}
