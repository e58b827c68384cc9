//! Hardware-facing workers: bell drive and GPIO line sampling.

pub mod gpio_poll;
pub mod ringer;
