//! Rotary dial input path: debounced edges, pulse decoding, and the
//! decision loop that turns completed digits into dial commands.

pub mod controller;
pub mod debounce;
pub mod pulse;

/// A completed rotary digit, 0–9 (10 pulses encode 0).
pub type DialDigit = u8;
