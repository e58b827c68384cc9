//! Outbound application events.
//!
//! The trackers and controllers emit these through the
//! [`EventSink`](super::ports::EventSink) port. Adapters on the other side
//! decide what to do with them — log them, or record them in tests.

use crate::call::CallState;
use crate::connection::ConnectionState;
use crate::error::DialError;

/// Structured events emitted by the control core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhoneEvent {
    /// The bridge finished wiring and entered its decision loop.
    Started,

    /// The debounced receiver switch changed state.
    ReceiverChanged { off_hook: bool },

    /// The pulse decoder completed a digit.
    DigitDecoded(u8),

    /// An outbound dial command was issued.
    Dialing { number: String },

    /// A dial command failed with a user-audible failure class.
    DialFailed(DialError),

    /// A single-digit shortcut resolved against the phonebook.
    ShortcutDialed { slot: u8 },

    /// The call session moved between states.
    CallStateChanged { from: CallState, to: CallState },

    /// The companion-device connection moved between states.
    ConnectionChanged {
        from: ConnectionState,
        to: ConnectionState,
    },

    /// The call-ready gate opened: calls can now be listened for.
    CallReady,

    /// The adapter was made discoverable and pairable.
    PairingWindowOpened { seconds: u32 },

    /// Speaker/microphone volume was adjusted from the handset.
    VolumeChanged { speaker: u8, microphone: u8 },

    /// The shutdown shortcut was dialed.
    ShutdownRequested,
}
