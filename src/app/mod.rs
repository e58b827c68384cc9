//! Application layer: port traits, events, commands and the orchestrating
//! service that owns the connection and call trackers.

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
