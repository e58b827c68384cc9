//! Event sink that renders application events into the log.

use log::info;

use crate::app::events::PhoneEvent;
use crate::app::ports::EventSink;

#[derive(Clone, Copy, Default)]
pub struct LogEventSink;

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &PhoneEvent) {
        match event {
            PhoneEvent::Started => info!("bridge started"),
            PhoneEvent::ReceiverChanged { off_hook } => {
                info!("receiver {}", if *off_hook { "off-hook" } else { "on-hook" });
            }
            PhoneEvent::DigitDecoded(d) => info!("digit {d}"),
            PhoneEvent::Dialing { number } => info!("dialing {number}"),
            PhoneEvent::DialFailed(e) => info!("dial failed: {e}"),
            PhoneEvent::ShortcutDialed { slot } => info!("shortcut {slot}"),
            PhoneEvent::CallStateChanged { from, to } => info!("call {from:?} -> {to:?}"),
            PhoneEvent::ConnectionChanged { from, to } => {
                info!("connection {from:?} -> {to:?}");
            }
            PhoneEvent::CallReady => info!("call-ready gate open"),
            PhoneEvent::PairingWindowOpened { seconds } => {
                info!("pairing window open for {seconds}s");
            }
            PhoneEvent::VolumeChanged { speaker, microphone } => {
                info!("volume: speaker {speaker} mic {microphone}");
            }
            PhoneEvent::ShutdownRequested => info!("shutdown requested from the dial"),
        }
    }
}
