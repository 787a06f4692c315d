//! Invocation Executor
//!
//! Runs the operation under test exactly once. The timer brackets the
//! operation call and the blackhole hand-off only; hooks run before the timer
//! starts and the returned value is dropped after it stops.

use crate::blackhole::Blackhole;
use crate::error::OperationError;
use crate::measure::Timer;

/// Run `op` once against `fixture`, timing it.
///
/// Returns the elapsed nanoseconds and the operation's result. The result
/// has already been observed by `blackhole` inside the timed region; the
/// caller owns it afterwards, so dropping it is never measured.
#[inline]
pub fn invoke<F, R, O>(
    op: &O,
    fixture: &F,
    blackhole: &mut Blackhole,
) -> Result<(u64, R), OperationError>
where
    O: Fn(&F, &mut Blackhole) -> Result<R, OperationError>,
{
    let timer = Timer::start();
    let result = op(fixture, blackhole);
    if let Ok(value) = &result {
        blackhole.consume(value);
    }
    let elapsed = timer.stop();
    result.map(|value| (elapsed, value))
}

/// Run `op` once without its own timer, for loops timed as a whole.
#[inline(always)]
pub fn invoke_untimed<F, R, O>(
    op: &O,
    fixture: &F,
    blackhole: &mut Blackhole,
) -> Result<R, OperationError>
where
    O: Fn(&F, &mut Blackhole) -> Result<R, OperationError>,
{
    let value = op(fixture, blackhole)?;
    blackhole.consume(&value);
    Ok(value)
}
