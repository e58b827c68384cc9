//! Connection lifecycle and call gating through the orchestrator.

use rotaryphone::app::commands::AppCommand;
use rotaryphone::app::events::PhoneEvent;
use rotaryphone::app::ports::{CallDirection, CallId, DeviceId};
use rotaryphone::app::service::PhoneService;
use rotaryphone::call::CallState;
use rotaryphone::config::PhoneConfig;
use rotaryphone::connection::ConnectionState;

use crate::mock_services::{
    InstantSleep, MockAudio, MockPairing, MockRinger, MockRoute, MockTelephony, Recorder,
};

fn service() -> PhoneService {
    PhoneService::new(&PhoneConfig::default())
}

#[test]
fn startup_refresh_finds_the_online_device() {
    let mut s = service();
    let mut tel = MockTelephony::with_online_device("/hfp/dev_AA");
    let (mut route, mut sink) = (MockRoute::default(), Recorder::default());

    s.refresh_connection(&mut tel, &mut route, &mut sink);

    assert_eq!(s.connection_state(), ConnectionState::Online);
    assert_eq!(route.refreshes, 1);
    assert!(sink.events.contains(&PhoneEvent::ConnectionChanged {
        from: ConnectionState::NoDevice,
        to: ConnectionState::Online,
    }));
}

#[test]
fn startup_with_unreachable_service_degrades_quietly() {
    let mut s = service();
    let mut tel = MockTelephony {
        unreachable: true,
        ..MockTelephony::default()
    };
    let (mut route, mut sink) = (MockRoute::default(), Recorder::default());

    s.refresh_connection(&mut tel, &mut route, &mut sink);
    assert_eq!(s.connection_state(), ConnectionState::NoDevice);
}

#[test]
fn incoming_call_rings_until_the_receiver_is_lifted() {
    let mut s = service();
    let mut tel = MockTelephony::with_online_device("/hfp/dev_AA");
    let (mut ringer, mut audio, mut route, mut sleep, mut sink) = (
        MockRinger::default(),
        MockAudio::default(),
        MockRoute::default(),
        InstantSleep::default(),
        Recorder::default(),
    );
    s.refresh_connection(&mut tel, &mut route, &mut sink);

    s.on_call_added(
        CallId("/hfp/dev_AA/voicecall01".into()),
        CallDirection::Incoming,
        &mut ringer,
        &mut sink,
    );
    assert_eq!(s.call_state(), CallState::Ringing);
    assert!(ringer.ringing);

    s.on_receiver_edge(true, &mut tel, &mut ringer, &mut audio, &mut sleep, &mut sink);

    assert_eq!(tel.answers, vec!["/hfp/dev_AA/voicecall01".to_string()]);
    assert_eq!(s.call_state(), CallState::Active);
    assert!(!ringer.ringing);
    // Answer path never starts the dial tone.
    assert!(audio.plays.is_empty());
}

#[test]
fn missed_call_stops_the_bell() {
    let mut s = service();
    let mut tel = MockTelephony::with_online_device("/hfp/dev_AA");
    let (mut ringer, mut route, mut sink) = (
        MockRinger::default(),
        MockRoute::default(),
        Recorder::default(),
    );
    s.refresh_connection(&mut tel, &mut route, &mut sink);

    s.on_call_added(
        CallId("/call0".into()),
        CallDirection::Incoming,
        &mut ringer,
        &mut sink,
    );
    s.on_call_removed(&mut ringer, &mut sink);

    assert_eq!(s.call_state(), CallState::Idle);
    assert!(!ringer.ringing);
    assert_eq!(ringer.stops, 1);
}

#[test]
fn call_notifications_gate_on_the_online_flip() {
    let mut s = service();
    let (mut ringer, mut route, mut sink) = (
        MockRinger::default(),
        MockRoute::default(),
        Recorder::default(),
    );

    // Before the gate opens: stale call objects are ignored.
    s.on_call_added(
        CallId("/stale".into()),
        CallDirection::Incoming,
        &mut ringer,
        &mut sink,
    );
    assert_eq!(s.call_state(), CallState::Idle);

    s.on_modem_property_changed("Online", true, &mut route, &mut sink);
    assert_eq!(s.connection_state(), ConnectionState::Online);
    assert!(sink.events.contains(&PhoneEvent::CallReady));

    s.on_call_added(
        CallId("/call0".into()),
        CallDirection::Incoming,
        &mut ringer,
        &mut sink,
    );
    assert_eq!(s.call_state(), CallState::Ringing);

    // Device drops off: demoted, and the gate closes again.
    s.on_call_removed(&mut ringer, &mut sink);
    s.on_modem_property_changed("Online", false, &mut route, &mut sink);
    s.on_call_added(
        CallId("/late".into()),
        CallDirection::Incoming,
        &mut ringer,
        &mut sink,
    );
    assert_eq!(s.call_state(), CallState::Idle);
}

#[test]
fn repeated_online_notifications_refresh_routing_once() {
    let mut s = service();
    let (mut route, mut sink) = (MockRoute::default(), Recorder::default());

    s.on_modem_property_changed("Online", true, &mut route, &mut sink);
    s.on_modem_property_changed("Online", true, &mut route, &mut sink);

    assert_eq!(route.refreshes, 1);
    let ready = sink
        .events
        .iter()
        .filter(|e| matches!(e, PhoneEvent::CallReady))
        .count();
    assert_eq!(ready, 1);
}

#[test]
fn new_device_is_trusted_and_brought_online() {
    let mut s = service();
    let mut tel = MockTelephony::with_online_device("/hfp/dev_NEW");
    let (mut pairing, mut route, mut sink) = (
        MockPairing::default(),
        MockRoute::default(),
        Recorder::default(),
    );

    let id = DeviceId("/hfp/dev_NEW".into());
    s.on_device_added(&id, &mut tel, &mut pairing, &mut route, &mut sink);

    assert_eq!(pairing.trusted, vec!["/hfp/dev_NEW".to_string()]);
    assert_eq!(s.connection_state(), ConnectionState::Online);
    assert!(route.refreshes >= 1);
}

#[test]
fn pairing_button_opens_the_window() {
    let mut s = service();
    let mut tel = MockTelephony::default();
    let (mut pairing, mut sink) = (MockPairing::default(), Recorder::default());

    s.handle_command(
        AppCommand::OpenPairingWindow,
        &mut tel,
        &mut pairing,
        &mut sink,
    );
    // Second press while the window is open is a no-op.
    pairing.discoverable = true;
    s.handle_command(
        AppCommand::OpenPairingWindow,
        &mut tel,
        &mut pairing,
        &mut sink,
    );

    assert_eq!(pairing.agent_registrations, 1);
    assert!(pairing.discoverable);
}
