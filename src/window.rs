use std::time::SystemTime;

use crate::{since_epoch, STEP};

const STEP_NANOS: u128 = STEP as u128 * 1_000_000_000;

/// Give the ttl (in whole seconds) of the code current at `instant`, in `1..=30`.
///
/// A boundary instant has the full step ahead of it, so it yields 30, never 0.
pub fn remaining_seconds(instant: SystemTime) -> u64 {
    STEP - since_epoch(instant).as_secs() % STEP
}

/// Fraction of the current step already elapsed, in `[0, 1)`, at nanosecond precision.
pub fn progress(instant: SystemTime) -> f64 {
    let elapsed = since_epoch(instant).as_nanos() % STEP_NANOS;
    elapsed as f64 / STEP_NANOS as f64
}

/// Where an instant sits inside its step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowState {
    pub remaining_seconds: u64,
    pub progress: f64,
}

impl WindowState {
    pub fn at(instant: SystemTime) -> Self {
        WindowState {
            remaining_seconds: remaining_seconds(instant),
            progress: progress(instant),
        }
    }
}
