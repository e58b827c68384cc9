//! Inbound commands to the phone service.
//!
//! These represent actions requested by the panel buttons (debounced edge
//! sources) that the [`PhoneService`](super::service::PhoneService)
//! interprets and acts upon.

/// Commands the outer wiring can send into the control core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppCommand {
    /// Raise speaker and microphone volume by the configured increment.
    VolumeUp,

    /// Lower speaker and microphone volume by the configured increment.
    VolumeDown,

    /// Toggle the mute property. Currently a documented no-op: the
    /// upstream telephony service never implemented the mute setter.
    MuteToggle,

    /// Open the pairing window so an unpaired device can connect.
    OpenPairingWindow,
}
