//! Call session tracker.
//!
//! Owns the single active call path: at most one call handle is tracked at
//! a time. Transitions are driven by call-added/removed notifications from
//! the telephony service and by local answer/hangup/dial commands.
//!
//! ```text
//! Idle ──dial──▶ Dialing ──confirmed──▶ Active
//!   │                │                     │
//!   │inbound         │removed              │removed
//!   ▼                ▼                     ▼
//! Ringing ──answer──▶ Active            Idle
//!   │removed (missed / caller hung up)
//!   ▼
//! Idle
//! ```
//!
//! Invariant violations (answer with no remembered handle) no-op and log;
//! the surrounding decision loop must keep running across every transient
//! failure.

use std::time::Duration;

use log::{info, warn};

use crate::app::events::PhoneEvent;
use crate::app::ports::{
    AudioCue, AudioPort, CallDirection, CallId, EventSink, RingerControl, SleepPort,
    TelephonyPort,
};
use crate::connection::ConnectionState;
use crate::error::DialError;

/// Lifecycle state of the single tracked call path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallState {
    Idle,
    Dialing,
    Ringing,
    Active,
}

pub struct CallSession {
    state: CallState,
    /// Handle of the remembered inbound call. Outbound calls are not
    /// tracked by handle: hangup addresses all calls on the device.
    handle: Option<CallId>,
    /// The service needs a moment after signalling an inbound call before
    /// it accepts the answer command. Callers must not retry-storm this.
    answer_grace: Duration,
    hide_caller_id: bool,
}

impl CallSession {
    pub fn new(answer_grace: Duration) -> Self {
        Self {
            state: CallState::Idle,
            handle: None,
            answer_grace,
            hide_caller_id: false,
        }
    }

    pub fn state(&self) -> CallState {
        self.state
    }

    /// Whether any call is live (dialing, ringing or active).
    pub fn in_progress(&self) -> bool {
        self.state != CallState::Idle
    }

    /// A call appeared on the service. Inbound calls remember the handle
    /// and start the bell; outbound calls only mark the session as dialing.
    pub fn on_call_added(
        &mut self,
        handle: CallId,
        direction: CallDirection,
        ringer: &mut impl RingerControl,
        sink: &mut impl EventSink,
    ) {
        match direction {
            CallDirection::Incoming => {
                info!("inbound call on {}", handle.0);
                self.handle = Some(handle);
                self.transition(CallState::Ringing, sink);
                ringer.start();
            }
            CallDirection::Outgoing => {
                info!("outbound call originating");
                self.handle = None;
                self.transition(CallState::Dialing, sink);
            }
        }
    }

    /// The tracked call disappeared (answered elsewhere, missed, ended).
    pub fn on_call_removed(&mut self, ringer: &mut impl RingerControl, sink: &mut impl EventSink) {
        info!("call ended");
        self.handle = None;
        self.transition(CallState::Idle, sink);
        if ringer.is_ringing() {
            ringer.stop();
        }
    }

    /// The service confirmed a state change on the live call ("active"
    /// promotes Dialing/Ringing into Active).
    pub fn on_call_state_changed(&mut self, state_name: &str, sink: &mut impl EventSink) {
        if state_name.eq_ignore_ascii_case("active")
            && matches!(self.state, CallState::Dialing | CallState::Ringing)
        {
            self.transition(CallState::Active, sink);
        }
    }

    /// Answer the ringing call: stop the bell, wait out the service grace
    /// period, then issue the answer command for the remembered handle.
    pub fn answer(
        &mut self,
        telephony: &mut impl TelephonyPort,
        ringer: &mut impl RingerControl,
        sleep: &mut impl SleepPort,
        sink: &mut impl EventSink,
    ) {
        if self.state != CallState::Ringing {
            warn!("answer requested in {:?}, ignoring", self.state);
            return;
        }
        let Some(handle) = self.handle.clone() else {
            warn!("answer requested with no remembered call handle, ignoring");
            return;
        };

        ringer.stop();
        sleep.sleep(self.answer_grace);
        match telephony.answer(&handle) {
            Ok(()) => {
                info!("call {} answered", handle.0);
                self.transition(CallState::Active, sink);
            }
            Err(e) => warn!("answer failed: {e}"),
        }
    }

    /// Hang up the live call path (hangs up every call on the device).
    pub fn end(&mut self, telephony: &mut impl TelephonyPort, sink: &mut impl EventSink) {
        if !self.in_progress() {
            warn!("hangup requested with no call in progress, ignoring");
            return;
        }
        if let Err(e) = telephony.hangup_all() {
            warn!("hangup failed: {e}");
        }
        self.handle = None;
        self.transition(CallState::Idle, sink);
    }

    /// Place an outbound call. Only valid while the companion device is
    /// online; each failure class maps to its own audio cue.
    pub fn dial(
        &mut self,
        number: &str,
        connection: ConnectionState,
        telephony: &mut impl TelephonyPort,
        audio: &mut impl AudioPort,
        sink: &mut impl EventSink,
    ) {
        if connection != ConnectionState::Online {
            warn!("dial requested while {connection:?}, playing not-connected cue");
            sink.emit(&PhoneEvent::DialFailed(DialError::NotRunning));
            audio.play(AudioCue::NotConnected, false);
            return;
        }

        match telephony.dial(number, self.hide_caller_id) {
            Ok(()) => {
                info!("dialing {number}");
                sink.emit(&PhoneEvent::Dialing {
                    number: number.to_owned(),
                });
                self.transition(CallState::Dialing, sink);
            }
            Err(DialError::InvalidFormat) => {
                warn!("number rejected as malformed: {number}");
                sink.emit(&PhoneEvent::DialFailed(DialError::InvalidFormat));
                audio.play(AudioCue::FormatIncorrect, false);
            }
            Err(e) => {
                warn!("dial failed: {e}");
                sink.emit(&PhoneEvent::DialFailed(e));
                audio.play(AudioCue::NotConnected, false);
            }
        }
    }

    fn transition(&mut self, next: CallState, sink: &mut impl EventSink) {
        if next != self.state {
            info!("call: {:?} -> {:?}", self.state, next);
            sink.emit(&PhoneEvent::CallStateChanged {
                from: self.state,
                to: next,
            });
            self.state = next;
        }
    }
}
