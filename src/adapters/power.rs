//! Host power adapter.

use std::process::Command;

use log::{error, warn};

use crate::app::ports::PowerPort;

/// Asks the host to power off. Runs under a user account, so the shutdown
/// binary goes through sudo; deployment installs the matching sudoers rule.
#[derive(Clone, Copy, Default)]
pub struct SystemPower;

impl PowerPort for SystemPower {
    fn shutdown(&mut self) {
        warn!("requesting host shutdown");
        match Command::new("sudo").args(["shutdown", "-h", "now"]).status() {
            Ok(status) if status.success() => {}
            Ok(status) => error!("shutdown command exited with {status}"),
            Err(e) => error!("cannot run shutdown: {e}"),
        }
    }
}
