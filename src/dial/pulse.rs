//! Rotary pulse decoder.
//!
//! The dial generates one debounced pulse per unit as it returns to rest;
//! the pulse train for a digit is a short burst followed by silence. The
//! edge worker records pulses into an atomic counter and a slower
//! quiescence worker checks it periodically: when the count stops moving
//! and is non-zero, the digit is complete.
//!
//! | Pulses | Digit        |
//! |--------|--------------|
//! | 1–9    | 1–9          |
//! | 10     | 0            |
//! | >10    | fault, reset |
//!
//! Recording must be cheap and callable from the edge-sampling worker, so
//! the counter is the only shared state and the decoder consumes it with a
//! compare-exchange — a pulse racing in between read and reset keeps the
//! count instead of being lost.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use crossbeam_channel::{Sender, TrySendError};
use log::{debug, warn};

use super::DialDigit;

/// Producer half: hand one of these to the edge worker.
#[derive(Clone)]
pub struct PulseSource {
    count: Arc<AtomicU32>,
}

impl PulseSource {
    pub fn record_pulse(&self) {
        self.count.fetch_add(1, Ordering::AcqRel);
    }
}

/// Consumer half: periodically ticked by the quiescence worker.
pub struct PulseDecoder {
    count: Arc<AtomicU32>,
    /// Count observed on the previous tick; equality means the dial has
    /// been quiescent for one full check period.
    last_seen: u32,
}

impl PulseDecoder {
    pub fn new() -> (PulseSource, Self) {
        let count = Arc::new(AtomicU32::new(0));
        (
            PulseSource {
                count: count.clone(),
            },
            Self { count, last_seen: 0 },
        )
    }

    /// Run one quiescence check. Returns the completed digit, if any.
    pub fn tick(&mut self) -> Option<DialDigit> {
        let n = self.count.load(Ordering::Acquire);
        if n == 0 {
            self.last_seen = 0;
            return None;
        }
        if n != self.last_seen {
            // Dial still turning; check again next period.
            self.last_seen = n;
            return None;
        }

        // Stable. Consume the burst, unless a pulse raced in after the load.
        if self
            .count
            .compare_exchange(n, 0, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return None;
        }
        self.last_seen = 0;

        match n {
            10 => Some(0),
            1..=9 => Some(n as DialDigit),
            _ => {
                warn!("pulse burst of {n} exceeds dial range, discarding");
                None
            }
        }
    }
}

/// Quiescence worker loop: ticks the decoder every `period` until `finish`
/// is raised, pushing completed digits into the bounded digit channel in
/// arrival order.
pub fn run_quiescence_loop(
    mut decoder: PulseDecoder,
    digits: Sender<DialDigit>,
    finish: Arc<std::sync::atomic::AtomicBool>,
    period: std::time::Duration,
) {
    while !finish.load(Ordering::Acquire) {
        std::thread::sleep(period);
        if let Some(digit) = decoder.tick() {
            debug!("digit decoded: {digit}");
            match digits.try_send(digit) {
                Ok(()) => {}
                Err(TrySendError::Full(d)) => {
                    warn!("digit queue full, dropping {d}");
                }
                Err(TrySendError::Disconnected(_)) => return,
            }
        }
    }
}
