//! Concrete adapters behind the port traits.
//!
//! All of them are thin: the telephony and pairing services are driven
//! through `busctl`, bus signals arrive through a `dbus-monitor` child, cue
//! playback shells out to the configured player. Everything here is
//! cheaply cloneable (shared state behind `Arc`) so each worker thread can
//! carry its own handle.

pub mod audio;
pub mod bluez;
pub mod log_sink;
pub mod monitor;
pub mod ofono;
pub mod power;
pub mod time;
