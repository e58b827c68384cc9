//! Connection state tracker.
//!
//! Owns the single current companion-device record and the pairing-window
//! policy. Transitions are driven only by asynchronous notifications from
//! the pairing/telephony services (device added, online property changed)
//! and by explicit refreshes; no other component mutates the state.
//!
//! Transport failures degrade to `NoDevice` — the tracker never throws a
//! service outage back into its caller.

use log::{debug, info, warn};

use crate::app::events::PhoneEvent;
use crate::app::ports::{
    AudioRoutePort, DeviceId, DeviceInfo, EventSink, PairingPort, TelephonyPort,
};

/// Pairing/connection status of the companion device.
///
/// Invariant: `Online` implies `Paired` implies a resolvable device record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No device has ever paired, or the service is unreachable.
    NoDevice,
    /// A device is paired but not currently connected.
    Paired,
    /// The device is connected and its telephony capability is usable.
    Online,
}

pub struct ConnectionTracker {
    state: ConnectionState,
    device: Option<DeviceInfo>,
    /// The auto-accept agent registers at most once per process.
    agent_registered: bool,
    auto_accept: bool,
    pairing_window_secs: u32,
}

impl ConnectionTracker {
    pub fn new(auto_accept: bool, pairing_window_secs: u32) -> Self {
        Self {
            state: ConnectionState::NoDevice,
            device: None,
            agent_registered: false,
            auto_accept,
            pairing_window_secs,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Identifier of the selected device, if any.
    pub fn device_id(&self) -> Option<&DeviceId> {
        self.device.as_ref().map(|d| &d.id)
    }

    /// Re-query the provider device list and update the connection state.
    ///
    /// Selects the first device reporting Online (tie-break: provider
    /// order). A transition into `Online` triggers the audio-routing
    /// refresh so the new hardware path becomes visible to the audio stack.
    pub fn refresh(
        &mut self,
        telephony: &mut impl TelephonyPort,
        route: &mut impl AudioRoutePort,
        sink: &mut impl EventSink,
    ) {
        let devices = match telephony.list_devices() {
            Ok(devices) => devices,
            Err(e) => {
                warn!("device list unavailable ({e}), treating as no device");
                Vec::new()
            }
        };

        let was_online = self.state == ConnectionState::Online;
        let (next, selected) = match devices.iter().find(|d| d.online) {
            Some(online) => (ConnectionState::Online, Some(online.clone())),
            None if devices.is_empty() => (ConnectionState::NoDevice, None),
            None => (ConnectionState::Paired, devices.into_iter().next()),
        };

        self.device = selected;
        self.transition(next, sink);

        if !was_online && self.state == ConnectionState::Online {
            if let Some(device) = &self.device {
                info!("companion device online: {} ({})", device.name, device.id.0);
            }
            route.refresh_output_cards();
        }
    }

    /// A new device appeared: trust it for future automatic connection and
    /// re-run the refresh. The audio routing is refreshed in any case so
    /// the new device shows up in the audio stack.
    pub fn on_device_added(
        &mut self,
        id: &DeviceId,
        telephony: &mut impl TelephonyPort,
        pairing: &mut impl PairingPort,
        route: &mut impl AudioRoutePort,
        sink: &mut impl EventSink,
    ) {
        info!("device added: {}", id.0);
        if let Err(e) = pairing.trust(id) {
            warn!("could not trust {}: {e}", id.0);
        }

        let was_online = self.state == ConnectionState::Online;
        self.refresh(telephony, route, sink);

        // refresh() already ran the routing workaround if it just went
        // online; cover the remaining cases exactly once.
        if was_online || self.state != ConnectionState::Online {
            route.refresh_output_cards();
        }
    }

    /// Handle a property-change notification from the active device.
    ///
    /// The `online → true` flip is the only event that opens the call-ready
    /// gate. `online → false` demotes to `Paired`; downstream must not
    /// surface call notifications again until the next Online transition.
    pub fn on_property_changed(
        &mut self,
        name: &str,
        value: bool,
        route: &mut impl AudioRoutePort,
        sink: &mut impl EventSink,
    ) {
        if !name.eq_ignore_ascii_case("online") {
            debug!("ignoring property change: {name}={value}");
            return;
        }

        if value {
            if self.device.is_none() {
                warn!("online notification without a known device record");
            }
            if self.state != ConnectionState::Online {
                if let Some(device) = &mut self.device {
                    device.online = true;
                }
                self.transition(ConnectionState::Online, sink);
                route.refresh_output_cards();
                sink.emit(&PhoneEvent::CallReady);
            }
        } else if self.state == ConnectionState::Online {
            info!("companion device went offline");
            if let Some(device) = &mut self.device {
                device.online = false;
            }
            self.transition(ConnectionState::Paired, sink);
        }
    }

    /// Make the adapter discoverable and pairable for the configured
    /// window. Idempotent while a window is already open.
    pub fn open_pairing_window(
        &mut self,
        pairing: &mut impl PairingPort,
        sink: &mut impl EventSink,
    ) {
        match pairing.is_discoverable() {
            Ok(true) => {
                debug!("pairing window already open");
                return;
            }
            Ok(false) => {}
            Err(e) => {
                warn!("cannot query discoverable state: {e}");
                return;
            }
        }

        if self.auto_accept && !self.agent_registered {
            match pairing.register_auto_accept_agent() {
                Ok(()) => {
                    self.agent_registered = true;
                    warn!(
                        "auto-accept pairing agent registered: any device may \
                         pair without authentication while the window is open"
                    );
                }
                Err(e) => warn!("could not register pairing agent: {e}"),
            }
        }

        let secs = self.pairing_window_secs;
        if let Err(e) = pairing.set_discoverable(true, secs) {
            warn!("could not enter discoverable mode: {e}");
            return;
        }
        if let Err(e) = pairing.set_pairable(true, secs) {
            warn!("could not enter pairable mode: {e}");
        }
        info!("pairing window open for {secs}s");
        sink.emit(&PhoneEvent::PairingWindowOpened { seconds: secs });
    }

    fn transition(&mut self, next: ConnectionState, sink: &mut impl EventSink) {
        if next != self.state {
            info!("connection: {:?} -> {:?}", self.state, next);
            sink.emit(&PhoneEvent::ConnectionChanged {
                from: self.state,
                to: next,
            });
            self.state = next;
        }
    }
}
