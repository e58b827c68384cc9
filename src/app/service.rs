//! Phone service orchestrator.
//!
//! Owns the two trackers and arbitrates between them: receiver edges,
//! bus notifications and panel commands all land here, get routed to the
//! right tracker, and the connection gate decides whether call
//! notifications are surfaced at all.
//!
//! All cross-thread access goes through one `Mutex<PhoneService>`; the
//! methods take their ports as arguments so each worker passes its own
//! adapter clones and the service itself stays transport-free.

use log::{debug, info, warn};

use super::commands::AppCommand;
use super::events::PhoneEvent;
use super::ports::{
    AudioCue, AudioPort, AudioRoutePort, CallDirection, CallId, CallVolume, DeviceId, EventSink,
    PairingPort, RingerControl, SleepPort, TelephonyPort, VolumeChannel,
};
use crate::call::{CallSession, CallState};
use crate::config::PhoneConfig;
use crate::connection::{ConnectionState, ConnectionTracker};

pub struct PhoneService {
    connection: ConnectionTracker,
    call: CallSession,
    /// Last volume snapshot; queried lazily on the first adjustment.
    volume: Option<CallVolume>,
    volume_increment: u8,
}

impl PhoneService {
    pub fn new(config: &PhoneConfig) -> Self {
        Self {
            connection: ConnectionTracker::new(
                config.auto_accept_pairing,
                config.pairing_window_secs,
            ),
            call: CallSession::new(config.answer_grace()),
            volume: None,
            volume_increment: config.volume_increment,
        }
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.connection.state()
    }

    pub fn call_state(&self) -> CallState {
        self.call.state()
    }

    /// Debounced receiver transition. Lifting the receiver answers a
    /// ringing call, otherwise starts the looping dial tone; cradling it
    /// ends whatever is live and silences feedback.
    pub fn on_receiver_edge(
        &mut self,
        off_hook: bool,
        telephony: &mut impl TelephonyPort,
        ringer: &mut impl RingerControl,
        audio: &mut impl AudioPort,
        sleep: &mut impl SleepPort,
        sink: &mut impl EventSink,
    ) {
        info!("receiver {}", if off_hook { "lifted" } else { "cradled" });
        sink.emit(&PhoneEvent::ReceiverChanged { off_hook });

        if off_hook {
            if self.call.state() == CallState::Ringing {
                self.call.answer(telephony, ringer, sleep, sink);
            } else {
                audio.play(AudioCue::DialTone, true);
            }
        } else {
            if self.call.in_progress() {
                self.call.end(telephony, sink);
            }
            audio.stop();
        }
    }

    /// Place an outbound call, honouring the current connection state.
    pub fn dial(
        &mut self,
        number: &str,
        telephony: &mut impl TelephonyPort,
        audio: &mut impl AudioPort,
        sink: &mut impl EventSink,
    ) {
        self.call
            .dial(number, self.connection.state(), telephony, audio, sink);
    }

    /// Call notification from the bus. Suppressed unless the connection
    /// gate is open: before the device reports online, call objects on the
    /// bus are stale leftovers and must not ring the bell.
    pub fn on_call_added(
        &mut self,
        handle: CallId,
        direction: CallDirection,
        ringer: &mut impl RingerControl,
        sink: &mut impl EventSink,
    ) {
        if self.connection.state() != ConnectionState::Online {
            warn!(
                "call notification while {:?}, suppressing",
                self.connection.state()
            );
            return;
        }
        self.call.on_call_added(handle, direction, ringer, sink);
    }

    pub fn on_call_removed(&mut self, ringer: &mut impl RingerControl, sink: &mut impl EventSink) {
        self.call.on_call_removed(ringer, sink);
    }

    pub fn on_call_state_changed(&mut self, state_name: &str, sink: &mut impl EventSink) {
        self.call.on_call_state_changed(state_name, sink);
    }

    pub fn on_modem_property_changed(
        &mut self,
        name: &str,
        value: bool,
        route: &mut impl AudioRoutePort,
        sink: &mut impl EventSink,
    ) {
        self.connection.on_property_changed(name, value, route, sink);
    }

    pub fn on_device_added(
        &mut self,
        id: &DeviceId,
        telephony: &mut impl TelephonyPort,
        pairing: &mut impl PairingPort,
        route: &mut impl AudioRoutePort,
        sink: &mut impl EventSink,
    ) {
        self.connection
            .on_device_added(id, telephony, pairing, route, sink);
    }

    /// Startup and periodic re-sync of the connection state.
    pub fn refresh_connection(
        &mut self,
        telephony: &mut impl TelephonyPort,
        route: &mut impl AudioRoutePort,
        sink: &mut impl EventSink,
    ) {
        self.connection.refresh(telephony, route, sink);
    }

    /// Panel button commands.
    pub fn handle_command(
        &mut self,
        command: AppCommand,
        telephony: &mut impl TelephonyPort,
        pairing: &mut impl PairingPort,
        sink: &mut impl EventSink,
    ) {
        match command {
            AppCommand::VolumeUp => self.adjust_volume(true, telephony, sink),
            AppCommand::VolumeDown => self.adjust_volume(false, telephony, sink),
            AppCommand::MuteToggle => {
                // The telephony service never implemented the mute setter;
                // kept as a button so the handset layout stays complete.
                warn!("mute requested; unsupported by the telephony service");
            }
            AppCommand::OpenPairingWindow => {
                self.connection.open_pairing_window(pairing, sink);
            }
        }
    }

    /// Move speaker and microphone together by the configured increment.
    fn adjust_volume(
        &mut self,
        up: bool,
        telephony: &mut impl TelephonyPort,
        sink: &mut impl EventSink,
    ) {
        let current = match self.volume {
            Some(v) => v,
            None => match telephony.call_volume() {
                Ok(v) => v,
                Err(e) => {
                    warn!("volume unavailable: {e}");
                    return;
                }
            },
        };

        let step = self.volume_increment;
        let move_channel = |v: u8| {
            if up {
                v.saturating_add(step).min(100)
            } else {
                v.saturating_sub(step)
            }
        };
        let next = CallVolume {
            speaker: move_channel(current.speaker),
            microphone: move_channel(current.microphone),
            muted: current.muted,
        };

        if let Err(e) = telephony.set_call_volume(VolumeChannel::Speaker, next.speaker) {
            warn!("could not set speaker volume: {e}");
            return;
        }
        if let Err(e) = telephony.set_call_volume(VolumeChannel::Microphone, next.microphone) {
            warn!("could not set microphone volume: {e}");
            return;
        }

        debug!(
            "volume {} -> speaker {} mic {}",
            if up { "up" } else { "down" },
            next.speaker,
            next.microphone
        );
        self.volume = Some(next);
        sink.emit(&PhoneEvent::VolumeChanged {
            speaker: next.speaker,
            microphone: next.microphone,
        });
    }
}
