//! Pairing adapter driving the local radio through `busctl`.
//!
//! Discoverable/pairable windows are plain property writes on the adapter
//! object. The auto-accept agent is a long-lived `bt-agent` child with the
//! NoInputNoOutput capability — anything that asks to pair while the
//! window is open gets in, which is why registration is gated behind the
//! trust policy upstream.

use std::process::{Child, Command, Output, Stdio};
use std::sync::{Arc, Mutex, PoisonError};

use log::{debug, warn};

use crate::app::ports::{DeviceId, PairingPort};
use crate::error::ServiceError;

const SERVICE: &str = "org.bluez";
const ADAPTER_PATH: &str = "/org/bluez/hci0";
const ADAPTER_IFACE: &str = "org.bluez.Adapter1";
const PROPERTIES_IFACE: &str = "org.freedesktop.DBus.Properties";

#[derive(Clone, Default)]
pub struct BusctlPairing {
    agent: Arc<Mutex<Option<Child>>>,
}

impl BusctlPairing {
    pub fn new() -> Self {
        Self::default()
    }

    fn set_adapter_bool(&self, property: &str, value: bool) -> Result<(), ServiceError> {
        let value = if value { "true" } else { "false" };
        expect_success(busctl(&[
            "call",
            SERVICE,
            ADAPTER_PATH,
            PROPERTIES_IFACE,
            "Set",
            "ssv",
            ADAPTER_IFACE,
            property,
            "b",
            value,
        ])?)
    }

    fn set_adapter_timeout(&self, property: &str, secs: u32) -> Result<(), ServiceError> {
        expect_success(busctl(&[
            "call",
            SERVICE,
            ADAPTER_PATH,
            PROPERTIES_IFACE,
            "Set",
            "ssv",
            ADAPTER_IFACE,
            property,
            "u",
            &secs.to_string(),
        ])?)
    }
}

impl PairingPort for BusctlPairing {
    fn is_discoverable(&mut self) -> Result<bool, ServiceError> {
        let output = busctl(&[
            "get-property",
            SERVICE,
            ADAPTER_PATH,
            ADAPTER_IFACE,
            "Discoverable",
        ])?;
        expect_success_ref(&output)?;
        Ok(String::from_utf8_lossy(&output.stdout).contains("true"))
    }

    fn set_discoverable(&mut self, on: bool, timeout_secs: u32) -> Result<(), ServiceError> {
        if on {
            self.set_adapter_timeout("DiscoverableTimeout", timeout_secs)?;
        }
        self.set_adapter_bool("Discoverable", on)
    }

    fn set_pairable(&mut self, on: bool, timeout_secs: u32) -> Result<(), ServiceError> {
        if on {
            self.set_adapter_timeout("PairableTimeout", timeout_secs)?;
        }
        self.set_adapter_bool("Pairable", on)
    }

    fn register_auto_accept_agent(&mut self) -> Result<(), ServiceError> {
        let mut agent = self.agent.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(child) = agent.as_mut() {
            // Still running means still registered.
            if matches!(child.try_wait(), Ok(None)) {
                return Ok(());
            }
        }

        let child = Command::new("bt-agent")
            .args(["--capability", "NoInputNoOutput"])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| {
                warn!("cannot start bt-agent: {e}");
                ServiceError::Unavailable
            })?;
        *agent = Some(child);
        Ok(())
    }

    fn trust(&mut self, device: &DeviceId) -> Result<(), ServiceError> {
        let path = device_path(device);
        debug!("trusting {path}");
        expect_success(busctl(&[
            "call",
            SERVICE,
            &path,
            PROPERTIES_IFACE,
            "Set",
            "ssv",
            "org.bluez.Device1",
            "Trusted",
            "b",
            "true",
        ])?)
    }
}

/// Device ids arrive as telephony modem paths (`/hfp` prefixed); the radio
/// service knows the same object without the prefix.
fn device_path(device: &DeviceId) -> String {
    device
        .0
        .strip_prefix("/hfp")
        .unwrap_or(&device.0)
        .to_owned()
}

fn busctl(args: &[&str]) -> Result<Output, ServiceError> {
    Command::new("busctl")
        .arg("--system")
        .args(args)
        .output()
        .map_err(|e| {
            warn!("cannot run busctl: {e}");
            ServiceError::Unavailable
        })
}

fn expect_success(output: Output) -> Result<(), ServiceError> {
    expect_success_ref(&output)
}

fn expect_success_ref(output: &Output) -> Result<(), ServiceError> {
    if output.status.success() {
        Ok(())
    } else {
        Err(ServiceError::Rejected(
            String::from_utf8_lossy(&output.stderr).trim().to_owned(),
        ))
    }
}
