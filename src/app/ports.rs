//! Port traits — the boundary between the control core and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ trackers / controllers (domain)
//! ```
//!
//! The telephony and pairing services, audio playback, the bell drive and
//! host power are all external collaborators. The trackers consume them via
//! generics at the call sites, so the core never touches a bus connection or
//! a GPIO register directly and every component can be exercised with
//! recording mocks.

use std::time::Duration;

use crate::error::{DialError, ServiceError};

// ───────────────────────────────────────────────────────────────
// Identifiers
// ───────────────────────────────────────────────────────────────

/// Opaque identifier of a paired companion device (service object path).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeviceId(pub String);

/// Opaque identifier of a voice call tracked by the telephony service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallId(pub String);

/// One entry of the provider-returned device list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub id: DeviceId,
    pub name: String,
    pub online: bool,
}

/// Direction of a call reported by the telephony service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallDirection {
    Incoming,
    Outgoing,
}

/// Volume channel selector for `set_call_volume`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeChannel {
    Speaker,
    Microphone,
}

/// Snapshot of the call volume properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallVolume {
    pub speaker: u8,
    pub microphone: u8,
    pub muted: bool,
}

/// Audio cues the core can request. The adapter maps them to files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioCue {
    /// Looping readiness tone played while waiting for digits.
    DialTone,
    /// Played when dialing fails because no device is connected.
    NotConnected,
    /// Played when the service rejects a number as malformed.
    FormatIncorrect,
    /// Played before the host shutdown sequence.
    Shutdown,
}

// ───────────────────────────────────────────────────────────────
// Telephony service port
// ───────────────────────────────────────────────────────────────

/// Commands and queries against the external telephony service.
///
/// A "device" here is a previously paired companion handset's telephony
/// capability; it may be present but offline. Transport failures surface as
/// errors so callers can degrade — they must never panic the decision loop.
pub trait TelephonyPort {
    /// Current device list in provider order.
    fn list_devices(&mut self) -> Result<Vec<DeviceInfo>, ServiceError>;

    /// Place an outbound call. `hide_id` asks the network to withhold the
    /// caller id.
    fn dial(&mut self, number: &str, hide_id: bool) -> Result<(), DialError>;

    /// Answer the given call.
    fn answer(&mut self, call: &CallId) -> Result<(), ServiceError>;

    /// Hang up every call on the active device.
    fn hangup_all(&mut self) -> Result<(), ServiceError>;

    /// Current call volume properties.
    fn call_volume(&mut self) -> Result<CallVolume, ServiceError>;

    /// Set one volume channel (0–100).
    fn set_call_volume(&mut self, channel: VolumeChannel, value: u8)
        -> Result<(), ServiceError>;
}

// ───────────────────────────────────────────────────────────────
// Pairing service port
// ───────────────────────────────────────────────────────────────

/// Adapter-level pairing operations on the local radio.
pub trait PairingPort {
    /// Whether the adapter is currently discoverable.
    fn is_discoverable(&mut self) -> Result<bool, ServiceError>;

    /// Make the adapter (in)visible to unpaired devices for `timeout_secs`.
    fn set_discoverable(&mut self, on: bool, timeout_secs: u32) -> Result<(), ServiceError>;

    /// Allow or forbid new pairings for `timeout_secs`.
    fn set_pairable(&mut self, on: bool, timeout_secs: u32) -> Result<(), ServiceError>;

    /// Register an agent that accepts any pairing attempt without user
    /// interaction. Headless-operation tradeoff: this is an
    /// unauthenticated-pairing mode and must only be invoked when the
    /// configured trust policy allows it.
    fn register_auto_accept_agent(&mut self) -> Result<(), ServiceError>;

    /// Mark a device as trusted for future automatic connection.
    fn trust(&mut self, device: &DeviceId) -> Result<(), ServiceError>;
}

// ───────────────────────────────────────────────────────────────
// Audio ports
// ───────────────────────────────────────────────────────────────

/// Single-stream cue playback. Starting a cue replaces whatever is playing.
pub trait AudioPort {
    fn play(&mut self, cue: AudioCue, looped: bool);

    /// Request playback stop; observed within one polling granularity of
    /// the playback worker, not mid-instruction.
    fn stop(&mut self);

    fn is_playing(&self) -> bool;
}

/// Coarse, fire-and-forget refresh of the audio routing layer. The audio
/// stack does not auto-discover newly connected device paths, so this runs
/// after every transition into Online and after every device-added event.
pub trait AudioRoutePort {
    fn refresh_output_cards(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Ringer ports
// ───────────────────────────────────────────────────────────────

/// Start/stop control over the bell cycle worker.
pub trait RingerControl {
    fn start(&mut self);

    /// Takes effect at the next pattern-step boundary; the physical output
    /// ends up off.
    fn stop(&mut self);

    fn is_ringing(&self) -> bool;
}

/// Physical bell drive line.
pub trait RingerOutput {
    fn set(&mut self, on: bool);
}

// ───────────────────────────────────────────────────────────────
// Host / timing ports
// ───────────────────────────────────────────────────────────────

/// Host power control (graceful shutdown from the dial shortcut).
pub trait PowerPort {
    fn shutdown(&mut self);
}

/// Injected blocking delay, so tests run without wall-clock waits.
pub trait SleepPort {
    fn sleep(&mut self, duration: Duration);
}

// ───────────────────────────────────────────────────────────────
// Event sink port
// ───────────────────────────────────────────────────────────────

/// The core emits structured [`PhoneEvent`](super::events::PhoneEvent)s
/// through this port. Adapters decide where they go (log, test recorder).
pub trait EventSink {
    fn emit(&mut self, event: &super::events::PhoneEvent);
}
