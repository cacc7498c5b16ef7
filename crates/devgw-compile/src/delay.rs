//! Delay conversion to device ticks.

use devgw_ir::{Duration, TimeUnit};

use crate::error::{CompileError, CompileResult};

/// Relative slack when a duration lands almost exactly on a tick boundary.
const TICK_TOLERANCE: f64 = 1e-9;

/// Convert `duration` to a whole number of ticks of `tick_ns` nanoseconds,
/// rounding up.
///
/// Durations already expressed in `dt` are taken as ticks.
pub fn delay_to_ticks(duration: &Duration, tick_ns: f64) -> CompileResult<u64> {
    if !(tick_ns.is_finite() && tick_ns > 0.0) {
        return Err(CompileError::InvalidDuration(format!(
            "tick length {tick_ns} ns is not positive"
        )));
    }

    let ticks = match duration.as_nanoseconds() {
        Some(ns) => ns / tick_ns,
        None => {
            debug_assert_eq!(duration.unit, TimeUnit::Dt);
            duration.value
        }
    };
    if !ticks.is_finite() || ticks < 0.0 || ticks > u64::MAX as f64 {
        return Err(CompileError::InvalidDuration(duration.to_string()));
    }

    let nearest = ticks.round();
    let ticks = if (ticks - nearest).abs() <= TICK_TOLERANCE * nearest.max(1.0) {
        nearest
    } else {
        ticks.ceil()
    };
    Ok(ticks as u64)
}
