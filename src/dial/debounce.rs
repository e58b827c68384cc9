//! Level-sampling debouncer for mechanical contacts.
//!
//! The rotary dial, hook switch and panel buttons are all bouncy mechanical
//! contacts polled at the sampling rate. A transition is reported only after
//! the raw line has held its new level for the full stabilisation window, so
//! a burst of chatter collapses into one logical edge.
//!
//! | Input          | Window  |
//! |----------------|---------|
//! | Dial pulses    | ~90 ms  |
//! | Hook switch    | ~1 s    |
//! | Panel buttons  | ~2 s    |
//!
//! Windows come from configuration; the table above shows the defaults.

/// A debounced logical transition of the input line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    /// The line settled at the active (high) level.
    Activated,
    /// The line settled at the inactive (low) level.
    Released,
}

/// Tracks one input line. Feed raw samples through [`Debouncer::sample`]
/// at the polling rate.
pub struct Debouncer {
    window_ms: u64,
    stable: bool,
    /// Pending opposite level and the time it was first observed.
    candidate_since_ms: Option<u64>,
}

impl Debouncer {
    /// `window_ms` is the stabilisation window; `initial` the level the
    /// line is assumed to hold at startup.
    pub fn new(window_ms: u64, initial: bool) -> Self {
        Self {
            window_ms,
            stable: initial,
            candidate_since_ms: None,
        }
    }

    /// Current debounced level.
    pub fn level(&self) -> bool {
        self.stable
    }

    /// Feed one raw sample taken at monotonic time `now_ms`. Returns the
    /// logical edge once the new level has held for the full window.
    pub fn sample(&mut self, level: bool, now_ms: u64) -> Option<Edge> {
        if level == self.stable {
            // Chatter back to the stable level restarts the window.
            self.candidate_since_ms = None;
            return None;
        }

        match self.candidate_since_ms {
            None => {
                self.candidate_since_ms = Some(now_ms);
                None
            }
            Some(since_ms) => {
                if now_ms.wrapping_sub(since_ms) >= self.window_ms {
                    self.stable = level;
                    self.candidate_since_ms = None;
                    Some(if level { Edge::Activated } else { Edge::Released })
                } else {
                    None
                }
            }
        }
    }
}
