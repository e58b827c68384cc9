//! Recording mock services for integration tests.
//!
//! Every port call is recorded so tests can assert on the full command
//! history without a bus connection or real hardware.

use std::time::Duration;

use rotaryphone::app::events::PhoneEvent;
use rotaryphone::app::ports::{
    AudioCue, AudioPort, AudioRoutePort, CallId, CallVolume, DeviceId, DeviceInfo, EventSink,
    PairingPort, PowerPort, RingerControl, SleepPort, TelephonyPort, VolumeChannel,
};
use rotaryphone::error::{DialError, ServiceError};

// ── Telephony ─────────────────────────────────────────────────

pub struct MockTelephony {
    pub devices: Vec<DeviceInfo>,
    pub unreachable: bool,
    pub dial_result: Option<DialError>,
    pub dials: Vec<(String, bool)>,
    pub answers: Vec<String>,
    pub hangups: usize,
    pub volume: CallVolume,
    pub volume_sets: Vec<(VolumeChannel, u8)>,
}

impl Default for MockTelephony {
    fn default() -> Self {
        Self {
            devices: Vec::new(),
            unreachable: false,
            dial_result: None,
            dials: Vec::new(),
            answers: Vec::new(),
            hangups: 0,
            volume: CallVolume {
                speaker: 50,
                microphone: 50,
                muted: false,
            },
            volume_sets: Vec::new(),
        }
    }
}

#[allow(dead_code)]
impl MockTelephony {
    pub fn with_online_device(id: &str) -> Self {
        Self {
            devices: vec![DeviceInfo {
                id: DeviceId(id.into()),
                name: format!("phone-{id}"),
                online: true,
            }],
            ..Self::default()
        }
    }
}

impl TelephonyPort for MockTelephony {
    fn list_devices(&mut self) -> Result<Vec<DeviceInfo>, ServiceError> {
        if self.unreachable {
            Err(ServiceError::Unavailable)
        } else {
            Ok(self.devices.clone())
        }
    }

    fn dial(&mut self, number: &str, hide_id: bool) -> Result<(), DialError> {
        match self.dial_result {
            Some(e) => Err(e),
            None => {
                self.dials.push((number.to_owned(), hide_id));
                Ok(())
            }
        }
    }

    fn answer(&mut self, call: &CallId) -> Result<(), ServiceError> {
        self.answers.push(call.0.clone());
        Ok(())
    }

    fn hangup_all(&mut self) -> Result<(), ServiceError> {
        self.hangups += 1;
        Ok(())
    }

    fn call_volume(&mut self) -> Result<CallVolume, ServiceError> {
        Ok(self.volume)
    }

    fn set_call_volume(&mut self, channel: VolumeChannel, value: u8) -> Result<(), ServiceError> {
        self.volume_sets.push((channel, value));
        Ok(())
    }
}

// ── Pairing ───────────────────────────────────────────────────

#[derive(Default)]
pub struct MockPairing {
    pub discoverable: bool,
    pub agent_registrations: usize,
    pub trusted: Vec<String>,
}

impl PairingPort for MockPairing {
    fn is_discoverable(&mut self) -> Result<bool, ServiceError> {
        Ok(self.discoverable)
    }

    fn set_discoverable(&mut self, on: bool, _: u32) -> Result<(), ServiceError> {
        self.discoverable = on;
        Ok(())
    }

    fn set_pairable(&mut self, _: bool, _: u32) -> Result<(), ServiceError> {
        Ok(())
    }

    fn register_auto_accept_agent(&mut self) -> Result<(), ServiceError> {
        self.agent_registrations += 1;
        Ok(())
    }

    fn trust(&mut self, device: &DeviceId) -> Result<(), ServiceError> {
        self.trusted.push(device.0.clone());
        Ok(())
    }
}

// ── Audio ─────────────────────────────────────────────────────

#[derive(Default)]
pub struct MockAudio {
    pub plays: Vec<(AudioCue, bool)>,
    pub stops: usize,
    pub playing: bool,
}

impl AudioPort for MockAudio {
    fn play(&mut self, cue: AudioCue, looped: bool) {
        self.plays.push((cue, looped));
        self.playing = true;
    }

    fn stop(&mut self) {
        self.stops += 1;
        self.playing = false;
    }

    fn is_playing(&self) -> bool {
        self.playing
    }
}

#[derive(Default)]
pub struct MockRoute {
    pub refreshes: usize,
}

impl AudioRoutePort for MockRoute {
    fn refresh_output_cards(&mut self) {
        self.refreshes += 1;
    }
}

// ── Ringer / power / timing ───────────────────────────────────

#[derive(Default)]
pub struct MockRinger {
    pub ringing: bool,
    pub starts: usize,
    pub stops: usize,
}

impl RingerControl for MockRinger {
    fn start(&mut self) {
        self.ringing = true;
        self.starts += 1;
    }

    fn stop(&mut self) {
        self.ringing = false;
        self.stops += 1;
    }

    fn is_ringing(&self) -> bool {
        self.ringing
    }
}

#[derive(Default)]
pub struct MockPower {
    pub shutdowns: usize,
}

impl PowerPort for MockPower {
    fn shutdown(&mut self) {
        self.shutdowns += 1;
    }
}

/// Records requested delays without actually waiting.
#[derive(Default)]
pub struct InstantSleep {
    pub slept: Vec<Duration>,
}

impl SleepPort for InstantSleep {
    fn sleep(&mut self, duration: Duration) {
        self.slept.push(duration);
    }
}

// ── Event recorder ────────────────────────────────────────────

#[derive(Default)]
pub struct Recorder {
    pub events: Vec<PhoneEvent>,
}

impl EventSink for Recorder {
    fn emit(&mut self, event: &PhoneEvent) {
        self.events.push(event.clone());
    }
}
