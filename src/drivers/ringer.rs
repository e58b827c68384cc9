//! Bell ringer driver.
//!
//! A pure cycle engine steps through the configured cadence (even entries
//! drive the bell, odd entries pause it, wrapping) and a worker thread
//! translates the steps into the physical output line. Start/stop is one
//! shared flag: the worker checks it at every step boundary, so ringing
//! ceases within one pattern step worst case and the line always ends up
//! de-energised.
//!
//! States: Idle ⇄ Cycling.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use log::warn;

use crate::app::ports::{RingerControl, RingerOutput, SleepPort};

/// Fallback cadence when the configured pattern is empty.
const DEFAULT_PATTERN_MS: [u64; 2] = [400, 2000];

/// Pure pattern stepper. Even indices energise the bell.
pub struct RingerCycle {
    pattern: Vec<Duration>,
    index: usize,
}

impl RingerCycle {
    pub fn new(pattern: Vec<Duration>) -> Self {
        let pattern = if pattern.is_empty() {
            warn!("empty ringer pattern, using default cadence");
            DEFAULT_PATTERN_MS
                .iter()
                .map(|&ms| Duration::from_millis(ms))
                .collect()
        } else {
            pattern
        };
        Self { pattern, index: 0 }
    }

    /// Next step of the cadence: whether the bell is driven and for how
    /// long.
    pub fn next_step(&mut self) -> (bool, Duration) {
        let on = self.index % 2 == 0;
        let hold = self.pattern[self.index];
        self.index = (self.index + 1) % self.pattern.len();
        (on, hold)
    }

    /// Restart from the beginning of the cadence.
    pub fn reset(&mut self) {
        self.index = 0;
    }
}

/// Cheap start/stop handle shared between the trackers and the worker.
#[derive(Clone)]
pub struct RingerHandle {
    ringing: Arc<AtomicBool>,
}

impl RingerHandle {
    pub fn new() -> Self {
        Self {
            ringing: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn flag(&self) -> Arc<AtomicBool> {
        self.ringing.clone()
    }
}

impl Default for RingerHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl RingerControl for RingerHandle {
    fn start(&mut self) {
        self.ringing.store(true, Ordering::Release);
    }

    fn stop(&mut self) {
        self.ringing.store(false, Ordering::Release);
    }

    fn is_ringing(&self) -> bool {
        self.ringing.load(Ordering::Acquire)
    }
}

/// Worker loop driving the physical bell line. `idle_poll` is how often
/// the stopped worker re-checks the start flag.
pub fn run_ringer(
    mut cycle: RingerCycle,
    ringing: Arc<AtomicBool>,
    finish: Arc<AtomicBool>,
    idle_poll: Duration,
    output: &mut impl RingerOutput,
    sleep: &mut impl SleepPort,
) {
    let mut cycling = false;

    while !finish.load(Ordering::Acquire) {
        if ringing.load(Ordering::Acquire) {
            cycling = true;
            let (on, hold) = cycle.next_step();
            output.set(on);
            sleep.sleep(hold);
        } else {
            if cycling {
                // Stop observed at a step boundary: silence and rewind.
                output.set(false);
                cycle.reset();
                cycling = false;
            }
            sleep.sleep(idle_poll);
        }
    }
    output.set(false);
}
