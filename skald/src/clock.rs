//! The default clock: nanoseconds since process start, paired with the wall
//! clock at capture time so readers can translate.

use crate::entries::ClockSync;
use lazy_static::lazy_static;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

lazy_static! {
    static ref PROCESS_START: Instant = Instant::now();
}

/// Monotonic counter value for event timestamps.
pub fn clock_now() -> u64 {
    PROCESS_START.elapsed().as_nanos() as u64
}

/// Capture a [`ClockSync`] describing [`clock_now`] against the system clock.
pub fn system_clock_sync() -> ClockSync {
    let ns_since_epoch = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as i64)
        .unwrap_or(0);
    ClockSync {
        clock_value: clock_now(),
        clock_frequency: 1_000_000_000,
        ns_since_epoch,
        tz_offset: 0,
        tz_name: "UTC".to_string(),
    }
}
