//! Bus signal listener.
//!
//! Call and modem notifications arrive as signals on the system bus; a
//! long-lived `dbus-monitor` child prints them line by line and
//! [`MonitorParser`] reassembles the few shapes the bridge cares about:
//!
//! | Interface                  | Member          | Parsed as              |
//! |----------------------------|-----------------|------------------------|
//! | org.ofono.Manager          | ModemAdded      | `ModemAdded`           |
//! | org.ofono.Modem            | PropertyChanged | `ModemOnlineChanged`   |
//! | org.ofono.VoiceCallManager | CallAdded       | `CallAdded`            |
//! | org.ofono.VoiceCallManager | CallRemoved     | `CallRemoved`          |
//! | org.ofono.VoiceCall        | PropertyChanged | `CallStateChanged`     |
//!
//! Everything else on the bus is ignored.

use std::io::{BufRead, BufReader};
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{debug, warn};

use crate::app::ports::CallDirection;
use crate::error::Error;

/// A bus signal relevant to the bridge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusSignal {
    ModemAdded { path: String },
    ModemOnlineChanged { online: bool },
    CallAdded { path: String, direction: CallDirection },
    CallRemoved,
    CallStateChanged { state: String },
}

/// Multi-line signal being assembled.
enum Pending {
    None,
    ModemAdded,
    ModemProperty { name: Option<String> },
    CallAdded { call_path: Option<String> },
    CallProperty { name: Option<String> },
}

/// Line-oriented reassembler for `dbus-monitor --system` output.
pub struct MonitorParser {
    pending: Pending,
}

impl MonitorParser {
    pub fn new() -> Self {
        Self {
            pending: Pending::None,
        }
    }

    /// Feed one output line; returns a signal once fully assembled.
    pub fn feed(&mut self, line: &str) -> Option<BusSignal> {
        if line.starts_with("signal ") {
            return self.start_signal(line);
        }

        match &mut self.pending {
            Pending::None => None,

            Pending::ModemAdded => {
                let path = object_path(line)?;
                self.pending = Pending::None;
                Some(BusSignal::ModemAdded { path })
            }

            Pending::ModemProperty { name } => {
                if name.is_none() {
                    *name = quoted(line);
                    return None;
                }
                let value = boolean(line)?;
                let online_property = name.as_deref() == Some("Online");
                self.pending = Pending::None;
                online_property.then_some(BusSignal::ModemOnlineChanged { online: value })
            }

            Pending::CallAdded { call_path } => {
                if call_path.is_none() {
                    *call_path = object_path(line);
                    return None;
                }
                let direction = match quoted(line)?.as_str() {
                    "incoming" | "waiting" => CallDirection::Incoming,
                    "dialing" | "alerting" => CallDirection::Outgoing,
                    _ => return None, // some other string property
                };
                let path = call_path.take()?;
                self.pending = Pending::None;
                Some(BusSignal::CallAdded { path, direction })
            }

            Pending::CallProperty { name } => {
                let text = quoted(line)?;
                if name.is_none() {
                    *name = Some(text);
                    return None;
                }
                let state_property = name.as_deref() == Some("State");
                self.pending = Pending::None;
                state_property.then_some(BusSignal::CallStateChanged { state: text })
            }
        }
    }

    fn start_signal(&mut self, header: &str) -> Option<BusSignal> {
        let interface = header_field(header, "interface=").unwrap_or_default();
        let member = header_field(header, "member=").unwrap_or_default();

        self.pending = match (interface.as_str(), member.as_str()) {
            ("org.ofono.Manager", "ModemAdded") => Pending::ModemAdded,
            ("org.ofono.Modem", "PropertyChanged") => Pending::ModemProperty { name: None },
            ("org.ofono.VoiceCallManager", "CallAdded") => Pending::CallAdded { call_path: None },
            ("org.ofono.VoiceCallManager", "CallRemoved") => {
                self.pending = Pending::None;
                return Some(BusSignal::CallRemoved);
            }
            ("org.ofono.VoiceCall", "PropertyChanged") => Pending::CallProperty { name: None },
            _ => Pending::None,
        };
        None
    }
}

impl Default for MonitorParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Text between the first pair of double quotes.
fn quoted(line: &str) -> Option<String> {
    let start = line.find('"')? + 1;
    let end = line[start..].find('"')? + start;
    Some(line[start..end].to_owned())
}

fn object_path(line: &str) -> Option<String> {
    if line.trim_start().starts_with("object path") {
        quoted(line)
    } else {
        None
    }
}

fn boolean(line: &str) -> Option<bool> {
    let trimmed = line.trim_start();
    if !trimmed.contains("boolean") {
        return None;
    }
    Some(trimmed.trim_end().ends_with("true"))
}

fn header_field(header: &str, key: &str) -> Option<String> {
    let start = header.find(key)? + key.len();
    let rest = &header[start..];
    let end = rest
        .find(|c: char| c == ';' || c.is_whitespace())
        .unwrap_or(rest.len());
    Some(rest[..end].to_owned())
}

/// Spawn `dbus-monitor` and feed its signal stream to `on_signal` until
/// the stream ends or `finish` is raised.
pub fn run_monitor(
    finish: Arc<AtomicBool>,
    mut on_signal: impl FnMut(BusSignal),
) -> crate::error::Result<()> {
    let mut child = Command::new("dbus-monitor")
        .args(["--system", "type='signal',sender='org.ofono'"])
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| {
            warn!("cannot start dbus-monitor: {e}");
            Error::Init("cannot start bus monitor")
        })?;

    let stdout = child
        .stdout
        .take()
        .ok_or(Error::Init("bus monitor has no stdout"))?;

    let mut parser = MonitorParser::new();
    for line in BufReader::new(stdout).lines() {
        if finish.load(Ordering::Acquire) {
            break;
        }
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                warn!("bus monitor read failed: {e}");
                break;
            }
        };
        if let Some(signal) = parser.feed(&line) {
            debug!("bus signal: {signal:?}");
            on_signal(signal);
        }
    }

    let _ = child.kill();
    let _ = child.wait();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed_all(lines: &[&str]) -> Vec<BusSignal> {
        let mut parser = MonitorParser::new();
        lines.iter().filter_map(|l| parser.feed(l)).collect()
    }

    #[test]
    fn incoming_call_added_is_parsed() {
        let signals = feed_all(&[
            "signal time=1688.12 sender=:1.4 -> destination=(null destination) serial=35 path=/hfp/org/bluez/hci0/dev_AA; interface=org.ofono.VoiceCallManager; member=CallAdded",
            r#"   object path "/hfp/org/bluez/hci0/dev_AA/voicecall01""#,
            "   array [",
            "      dict entry(",
            r#"         string "State""#,
            r#"         variant             string "incoming""#,
        ]);
        assert_eq!(
            signals,
            vec![BusSignal::CallAdded {
                path: "/hfp/org/bluez/hci0/dev_AA/voicecall01".into(),
                direction: CallDirection::Incoming,
            }]
        );
    }

    #[test]
    fn dialing_state_means_outgoing() {
        let signals = feed_all(&[
            "signal time=1.0 sender=:1.4 -> destination=(null destination) serial=2 path=/hfp/org/bluez/hci0/dev_AA; interface=org.ofono.VoiceCallManager; member=CallAdded",
            r#"   object path "/hfp/org/bluez/hci0/dev_AA/voicecall02""#,
            r#"         string "State""#,
            r#"         variant             string "dialing""#,
        ]);
        assert!(matches!(
            signals.as_slice(),
            [BusSignal::CallAdded {
                direction: CallDirection::Outgoing,
                ..
            }]
        ));
    }

    #[test]
    fn call_removed_emits_on_the_header() {
        let signals = feed_all(&[
            "signal time=1.0 sender=:1.4 -> destination=(null destination) serial=3 path=/hfp/org/bluez/hci0/dev_AA; interface=org.ofono.VoiceCallManager; member=CallRemoved",
            r#"   object path "/hfp/org/bluez/hci0/dev_AA/voicecall01""#,
        ]);
        assert_eq!(signals, vec![BusSignal::CallRemoved]);
    }

    #[test]
    fn online_property_flip_is_parsed() {
        let signals = feed_all(&[
            "signal time=1.0 sender=:1.4 -> destination=(null destination) serial=4 path=/hfp/org/bluez/hci0/dev_AA; interface=org.ofono.Modem; member=PropertyChanged",
            r#"   string "Online""#,
            "   variant       boolean true",
        ]);
        assert_eq!(signals, vec![BusSignal::ModemOnlineChanged { online: true }]);
    }

    #[test]
    fn other_modem_properties_are_ignored() {
        let signals = feed_all(&[
            "signal time=1.0 sender=:1.4 -> destination=(null destination) serial=5 path=/hfp/org/bluez/hci0/dev_AA; interface=org.ofono.Modem; member=PropertyChanged",
            r#"   string "Powered""#,
            "   variant       boolean true",
        ]);
        assert!(signals.is_empty());
    }

    #[test]
    fn call_state_change_to_active_is_parsed() {
        let signals = feed_all(&[
            "signal time=1.0 sender=:1.4 -> destination=(null destination) serial=6 path=/hfp/org/bluez/hci0/dev_AA/voicecall01; interface=org.ofono.VoiceCall; member=PropertyChanged",
            r#"   string "State""#,
            r#"   variant       string "active""#,
        ]);
        assert_eq!(
            signals,
            vec![BusSignal::CallStateChanged {
                state: "active".into()
            }]
        );
    }

    #[test]
    fn modem_added_captures_the_path() {
        let signals = feed_all(&[
            "signal time=1.0 sender=:1.4 -> destination=(null destination) serial=7 path=/; interface=org.ofono.Manager; member=ModemAdded",
            r#"   object path "/hfp/org/bluez/hci0/dev_NEW""#,
        ]);
        assert_eq!(
            signals,
            vec![BusSignal::ModemAdded {
                path: "/hfp/org/bluez/hci0/dev_NEW".into()
            }]
        );
    }

    #[test]
    fn unrelated_chatter_is_ignored() {
        let signals = feed_all(&[
            "signal time=1.0 sender=:1.9 -> destination=(null destination) serial=8 path=/other; interface=org.example.Foo; member=Bar",
            r#"   string "whatever""#,
            "method call time=2.0 sender=:1.2 serial=9",
        ]);
        assert!(signals.is_empty());
    }
}
