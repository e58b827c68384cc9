//! Dialing decision logic.
//!
//! Accumulates completed digits while the receiver is off-hook and decides,
//! on each inter-digit timeout, what the accumulated string means:
//!
//! | Pending         | Decision                                   |
//! |-----------------|--------------------------------------------|
//! | empty           | nothing                                    |
//! | ≥ 2 digits      | dial the full number                       |
//! | single digit 9  | host shutdown sequence                     |
//! | single digit n  | phonebook shortcut `n`, if configured      |
//! | single, no slot | discard silently                           |
//!
//! The pure core ([`DialingController`]) is deterministic and host-testable;
//! [`run_dial_loop`] wraps it in the worker that races digit arrival against
//! the timeout and talks to the orchestrator.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use crossbeam_channel::{Receiver, RecvTimeoutError};
use log::{debug, info, warn};

use super::DialDigit;
use crate::app::events::PhoneEvent;
use crate::app::ports::{AudioCue, AudioPort, EventSink, PowerPort, SleepPort, TelephonyPort};
use crate::app::service::PhoneService;
use crate::config::{PhoneConfig, PhonebookEntry};

/// Outcome of an inter-digit timeout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialDecision {
    /// Nothing pending.
    Idle,
    /// A full number was dialed digit by digit.
    DialNumber(String),
    /// A single digit resolved to a phonebook slot.
    Shortcut { slot: u8, number: String },
    /// A single digit with no phonebook slot behind it.
    OutOfRange(u8),
    /// The shutdown shortcut (single 9).
    Shutdown,
}

/// Pure digit-accumulation core.
#[derive(Default)]
pub struct DialingController {
    pending: String,
}

impl DialingController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Append a completed digit. The looping dial tone keeps playing under
    /// a first digit (it may be a shortcut); a second digit means a full
    /// number is coming and the tone stops.
    pub fn on_digit(&mut self, digit: DialDigit, audio: &mut impl AudioPort) {
        self.pending.push(char::from(b'0' + digit.min(9)));
        debug!("pending digits: {}", self.pending);
        if self.pending.len() == 2 {
            audio.stop();
        }
    }

    /// The inter-digit timeout elapsed: classify and clear the pending
    /// string.
    pub fn on_wait_timeout(&mut self, phonebook: &[PhonebookEntry]) -> DialDecision {
        if self.pending.is_empty() {
            return DialDecision::Idle;
        }
        let pending = std::mem::take(&mut self.pending);

        if pending.len() >= 2 {
            return DialDecision::DialNumber(pending);
        }

        // Single digit: shutdown shortcut first, then the phonebook.
        let digit = pending.as_bytes()[0] - b'0';
        if digit == 9 {
            return DialDecision::Shutdown;
        }
        match phonebook.iter().find(|e| e.index == digit) {
            Some(entry) => DialDecision::Shortcut {
                slot: digit,
                number: entry.number.clone(),
            },
            None => DialDecision::OutOfRange(digit),
        }
    }

    /// Drop whatever was accumulated (receiver went on-hook).
    pub fn clear(&mut self) {
        if !self.pending.is_empty() {
            debug!("discarding pending digits: {}", self.pending);
            self.pending.clear();
        }
    }
}

/// Worker loop racing digit arrival against the inter-digit timeout.
///
/// Digits decoded while the receiver is on-hook are line noise from
/// handling the handset and are discarded. The shutdown shortcut plays its
/// cue, waits out the drain period so the audio finishes, raises `finish`
/// for the other workers and then asks the host to power off.
pub fn run_dial_loop(
    mut controller: DialingController,
    digits: &Receiver<DialDigit>,
    service: &Mutex<PhoneService>,
    config: &PhoneConfig,
    off_hook: &AtomicBool,
    finish: &AtomicBool,
    telephony: &mut impl TelephonyPort,
    audio: &mut impl AudioPort,
    power: &mut impl PowerPort,
    sleep: &mut impl SleepPort,
    sink: &mut impl EventSink,
) {
    let timeout = config.digit_timeout();

    while !finish.load(Ordering::Acquire) {
        // A disconnected queue means the decoder is gone: settle whatever
        // is pending as if the timeout had fired, then stop.
        let (digit, disconnected) = match digits.recv_timeout(timeout) {
            Ok(digit) => (Some(digit), false),
            Err(RecvTimeoutError::Timeout) => (None, false),
            Err(RecvTimeoutError::Disconnected) => (None, true),
        };

        if !off_hook.load(Ordering::Acquire) {
            controller.clear();
            if disconnected {
                break;
            }
            continue;
        }

        if let Some(digit) = digit {
            sink.emit(&PhoneEvent::DigitDecoded(digit));
            controller.on_digit(digit, audio);
        } else {
            match controller.on_wait_timeout(&config.phonebook) {
                DialDecision::Idle => {}
                DialDecision::DialNumber(number) => {
                    audio.stop();
                    lock(service).dial(&number, telephony, audio, sink);
                }
                DialDecision::Shortcut { slot, number } => {
                    info!("shortcut {slot} -> {number}");
                    audio.stop();
                    sink.emit(&PhoneEvent::ShortcutDialed { slot });
                    sleep.sleep(config.predial_delay());
                    lock(service).dial(&number, telephony, audio, sink);
                }
                DialDecision::OutOfRange(digit) => {
                    debug!("no phonebook slot {digit}, discarding");
                }
                DialDecision::Shutdown => {
                    warn!("shutdown shortcut dialed");
                    sink.emit(&PhoneEvent::ShutdownRequested);
                    audio.stop();
                    audio.play(AudioCue::Shutdown, false);
                    sleep.sleep(config.shutdown_drain());
                    finish.store(true, Ordering::Release);
                    power.shutdown();
                }
            }
        }

        if disconnected {
            break;
        }
    }
}

fn lock<'a>(service: &'a Mutex<PhoneService>) -> std::sync::MutexGuard<'a, PhoneService> {
    service.lock().unwrap_or_else(PoisonError::into_inner)
}
