//! Telephony adapter driving the hands-free service through `busctl`.
//!
//! Every operation is one `busctl call --system` invocation against
//! `org.ofono`; the replies are parsed with a small quote-aware tokenizer.
//! The adapter remembers the active modem path (first one reporting
//! Online) so dial/answer/hangup land on the right object.

use std::process::{Command, Output};
use std::sync::{Arc, Mutex, PoisonError};

use log::{debug, warn};

use crate::app::ports::{CallId, CallVolume, DeviceId, DeviceInfo, TelephonyPort, VolumeChannel};
use crate::error::{DialError, ServiceError};

const SERVICE: &str = "org.ofono";

#[derive(Clone, Default)]
pub struct BusctlTelephony {
    /// Modem object path commands are issued against.
    modem: Arc<Mutex<Option<String>>>,
}

impl BusctlTelephony {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pin commands to the given modem path (used by the signal loop when
    /// a modem announces itself).
    pub fn set_active_modem(&self, path: &str) {
        debug!("active modem: {path}");
        *self.lock() = Some(path.to_owned());
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<String>> {
        self.modem.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn active_modem(&self) -> Result<String, ServiceError> {
        self.lock().clone().ok_or(ServiceError::Unavailable)
    }
}

impl TelephonyPort for BusctlTelephony {
    fn list_devices(&mut self) -> Result<Vec<DeviceInfo>, ServiceError> {
        let output = busctl(&["call", SERVICE, "/", "org.ofono.Manager", "GetModems"])?;
        let devices = parse_modem_list(&String::from_utf8_lossy(&output.stdout));

        // Keep the command target in step with the selection policy.
        let preferred = devices
            .iter()
            .find(|d| d.online)
            .or_else(|| devices.first());
        *self.lock() = preferred.map(|d| d.id.0.clone());

        Ok(devices)
    }

    fn dial(&mut self, number: &str, hide_id: bool) -> Result<(), DialError> {
        let modem = self.active_modem().map_err(|_| DialError::NotRunning)?;
        let hide = if hide_id { "enabled" } else { "default" };
        let output = busctl(&[
            "call",
            SERVICE,
            &modem,
            "org.ofono.VoiceCallManager",
            "Dial",
            "ss",
            number,
            hide,
        ])
        .map_err(|_| DialError::NotRunning)?;

        if output.status.success() {
            return Ok(());
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        warn!("dial rejected: {}", stderr.trim());
        if stderr.contains("InvalidFormat") || stderr.contains("InvalidArguments") {
            Err(DialError::InvalidFormat)
        } else if stderr.contains("ServiceUnknown") {
            Err(DialError::NotRunning)
        } else {
            Err(DialError::Unavailable)
        }
    }

    fn answer(&mut self, call: &CallId) -> Result<(), ServiceError> {
        expect_success(busctl(&[
            "call",
            SERVICE,
            &call.0,
            "org.ofono.VoiceCall",
            "Answer",
        ])?)
    }

    fn hangup_all(&mut self) -> Result<(), ServiceError> {
        let modem = self.active_modem()?;
        expect_success(busctl(&[
            "call",
            SERVICE,
            &modem,
            "org.ofono.VoiceCallManager",
            "HangupAll",
        ])?)
    }

    fn call_volume(&mut self) -> Result<CallVolume, ServiceError> {
        let modem = self.active_modem()?;
        let output = busctl(&[
            "call",
            SERVICE,
            &modem,
            "org.ofono.CallVolume",
            "GetProperties",
        ])?;
        expect_success_ref(&output)?;
        parse_call_volume(&String::from_utf8_lossy(&output.stdout))
            .ok_or_else(|| ServiceError::Rejected("unparseable volume properties".into()))
    }

    fn set_call_volume(&mut self, channel: VolumeChannel, value: u8) -> Result<(), ServiceError> {
        let modem = self.active_modem()?;
        let property = match channel {
            VolumeChannel::Speaker => "SpeakerVolume",
            VolumeChannel::Microphone => "MicrophoneVolume",
        };
        expect_success(busctl(&[
            "call",
            SERVICE,
            &modem,
            "org.ofono.CallVolume",
            "SetProperty",
            "sv",
            property,
            "y",
            &value.to_string(),
        ])?)
    }
}

fn busctl(args: &[&str]) -> Result<Output, ServiceError> {
    let output = Command::new("busctl")
        .arg("--system")
        .args(args)
        .output()
        .map_err(|e| {
            warn!("cannot run busctl: {e}");
            ServiceError::Unavailable
        })?;
    Ok(output)
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

// ---------------------------------------------------------------------------
// Reply parsing
// ---------------------------------------------------------------------------

/// One reply token: quoted strings keep their content, everything else is
/// taken verbatim.
#[derive(Debug, PartialEq, Eq)]
struct Token {
    text: String,
    quoted: bool,
}

fn tokenize(reply: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut chars = reply.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' => {
                let mut text = String::new();
                for c in chars.by_ref() {
                    if c == '"' {
                        break;
                    }
                    text.push(c);
                }
                tokens.push(Token { text, quoted: true });
            }
            c if c.is_whitespace() => {}
            c => {
                let mut text = String::from(c);
                while let Some(&next) = chars.peek() {
                    if next.is_whitespace() || next == '"' {
                        break;
                    }
                    text.push(next);
                    chars.next();
                }
                tokens.push(Token {
                    text,
                    quoted: false,
                });
            }
        }
    }
    tokens
}

/// Parse a `GetModems` reply (`a(oa{sv})`): each quoted object path opens a
/// device record, the following key/type/value triples fill it in.
fn parse_modem_list(reply: &str) -> Vec<DeviceInfo> {
    let tokens = tokenize(reply);
    let mut devices: Vec<DeviceInfo> = Vec::new();

    let mut i = 0;
    while i < tokens.len() {
        let t = &tokens[i];
        if t.quoted && t.text.starts_with('/') {
            devices.push(DeviceInfo {
                id: DeviceId(t.text.clone()),
                name: t.text.rsplit('/').next().unwrap_or_default().to_owned(),
                online: false,
            });
        } else if t.quoted {
            if let Some(device) = devices.last_mut() {
                // key, type code, value
                let type_code = tokens.get(i + 1);
                let value = tokens.get(i + 2);
                match (t.text.as_str(), type_code, value) {
                    ("Online", Some(code), Some(v)) if code.text == "b" => {
                        device.online = v.text == "true";
                        i += 2;
                    }
                    ("Name", Some(code), Some(v)) if code.text == "s" => {
                        device.name = v.text.clone();
                        i += 2;
                    }
                    _ => {}
                }
            }
        }
        i += 1;
    }
    devices
}

/// Parse a `CallVolume.GetProperties` reply (`a{sv}`).
fn parse_call_volume(reply: &str) -> Option<CallVolume> {
    let tokens = tokenize(reply);
    let mut speaker = None;
    let mut microphone = None;
    let mut muted = false;

    let mut i = 0;
    while i + 2 < tokens.len() {
        if tokens[i].quoted {
            let value = &tokens[i + 2].text;
            match tokens[i].text.as_str() {
                "SpeakerVolume" => speaker = value.parse().ok(),
                "MicrophoneVolume" => microphone = value.parse().ok(),
                "Muted" => muted = value == "true",
                _ => {}
            }
        }
        i += 1;
    }
    Some(CallVolume {
        speaker: speaker?,
        microphone: microphone?,
        muted,
    })
}
