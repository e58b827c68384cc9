//! Wall-clock sleep adapter.

use std::time::Duration;

use crate::app::ports::SleepPort;

/// Blocking sleep on the real clock.
#[derive(Clone, Copy, Default)]
pub struct StdSleep;

impl SleepPort for StdSleep {
    fn sleep(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }
}
