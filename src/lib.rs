//! Rotaryphone library.
//!
//! Exposes the pure-logic modules for integration testing and external
//! inspection. Everything that touches real hardware or external services
//! lives behind the port traits in [`app::ports`]; the adapters in
//! [`adapters`] are thin shells over GPIO lines and system utilities.

#![deny(unused_must_use)]

pub mod app;
pub mod call;
pub mod config;
pub mod connection;
pub mod dial;
pub mod error;

pub mod adapters;
pub mod drivers;
