//! End-to-end dialing flows through the decision loop.
//!
//! The digit channel is pre-loaded and then closed, which makes the loop
//! settle the pending digits and return without wall-clock waits.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use crossbeam_channel::bounded;

use rotaryphone::app::events::PhoneEvent;
use rotaryphone::app::ports::AudioCue;
use rotaryphone::app::service::PhoneService;
use rotaryphone::config::{PhoneConfig, PhonebookEntry};
use rotaryphone::dial::controller::{run_dial_loop, DialingController};
use rotaryphone::dial::debounce::Debouncer;
use rotaryphone::dial::pulse::PulseDecoder;

use crate::mock_services::{InstantSleep, MockAudio, MockPower, MockRoute, MockTelephony, Recorder};

fn test_config() -> PhoneConfig {
    let config = PhoneConfig {
        digit_timeout_secs: 1,
        phonebook: vec![
            PhonebookEntry {
                index: 1,
                number: "555-0101".into(),
            },
            PhonebookEntry {
                index: 3,
                number: "555-0303".into(),
            },
        ],
        ..PhoneConfig::default()
    };
    config.validate().expect("test config must be valid");
    config
}

/// Service with the connection gate already open.
fn online_service(config: &PhoneConfig) -> Mutex<PhoneService> {
    let mut service = PhoneService::new(config);
    let mut tel = MockTelephony::with_online_device("/hfp/dev_AA");
    service.refresh_connection(&mut tel, &mut MockRoute::default(), &mut Recorder::default());
    Mutex::new(service)
}

struct LoopRig {
    tel: MockTelephony,
    audio: MockAudio,
    power: MockPower,
    sleep: InstantSleep,
    sink: Recorder,
}

impl Default for LoopRig {
    fn default() -> Self {
        Self {
            tel: MockTelephony::default(),
            audio: MockAudio::default(),
            power: MockPower::default(),
            sleep: InstantSleep::default(),
            sink: Recorder::default(),
        }
    }
}

/// Run the decision loop over the given digits until the queue drains.
fn run_digits(
    digits: &[u8],
    off_hook_now: bool,
    config: &PhoneConfig,
    service: &Mutex<PhoneService>,
    rig: &mut LoopRig,
) -> bool {
    let (tx, rx) = bounded(16);
    for &d in digits {
        tx.send(d).expect("queue big enough for the test");
    }
    drop(tx);

    let off_hook = AtomicBool::new(off_hook_now);
    let finish = AtomicBool::new(false);
    run_dial_loop(
        DialingController::new(),
        &rx,
        service,
        config,
        &off_hook,
        &finish,
        &mut rig.tel,
        &mut rig.audio,
        &mut rig.power,
        &mut rig.sleep,
        &mut rig.sink,
    );
    finish.load(Ordering::Acquire)
}

#[test]
fn digits_accumulate_into_one_dial_command() {
    let config = test_config();
    let service = online_service(&config);
    let mut rig = LoopRig::default();

    run_digits(&[4, 1, 5], true, &config, &service, &mut rig);

    assert_eq!(rig.tel.dials, vec![("415".to_string(), false)]);
    assert!(rig.sink.events.contains(&PhoneEvent::Dialing {
        number: "415".into()
    }));
}

#[test]
fn single_digit_shortcut_dials_after_predial_delay() {
    let config = test_config();
    let service = online_service(&config);
    let mut rig = LoopRig::default();

    run_digits(&[3], true, &config, &service, &mut rig);

    assert_eq!(rig.tel.dials, vec![("555-0303".to_string(), false)]);
    assert!(rig
        .sink
        .events
        .contains(&PhoneEvent::ShortcutDialed { slot: 3 }));
    assert!(rig.sleep.slept.contains(&config.predial_delay()));
}

#[test]
fn shutdown_shortcut_powers_off_and_never_dials() {
    let config = test_config();
    let service = online_service(&config);
    let mut rig = LoopRig::default();

    let finished = run_digits(&[9], true, &config, &service, &mut rig);

    assert!(finished);
    assert_eq!(rig.power.shutdowns, 1);
    assert!(rig.tel.dials.is_empty());
    assert!(rig.audio.plays.contains(&(AudioCue::Shutdown, false)));
    assert!(rig.sink.events.contains(&PhoneEvent::ShutdownRequested));
    assert!(rig.sleep.slept.contains(&config.shutdown_drain()));
}

#[test]
fn unassigned_shortcut_is_discarded_silently() {
    let config = test_config();
    let service = online_service(&config);
    let mut rig = LoopRig::default();

    run_digits(&[7], true, &config, &service, &mut rig);

    assert!(rig.tel.dials.is_empty());
    assert!(rig.audio.plays.is_empty());
}

#[test]
fn on_hook_digits_are_noise() {
    let config = test_config();
    let service = online_service(&config);
    let mut rig = LoopRig::default();

    run_digits(&[4, 1, 5], false, &config, &service, &mut rig);

    assert!(rig.tel.dials.is_empty());
    assert!(!rig
        .sink
        .events
        .iter()
        .any(|e| matches!(e, PhoneEvent::DigitDecoded(_))));
}

#[test]
fn dialing_offline_plays_the_not_connected_cue() {
    let config = test_config();
    // Gate never opened: no device.
    let service = Mutex::new(PhoneService::new(&config));
    let mut rig = LoopRig::default();

    run_digits(&[4, 1, 5], true, &config, &service, &mut rig);

    assert!(rig.tel.dials.is_empty());
    assert!(rig.audio.plays.contains(&(AudioCue::NotConnected, false)));
}

/// Full input pipeline without the workers: raw bounce on the pulse line
/// becomes debounced edges, edges become pulses, quiescence completes the
/// digit.
#[test]
fn pulse_train_decodes_through_the_whole_input_path() {
    let mut debouncer = Debouncer::new(30, false);
    let (source, mut decoder) = PulseDecoder::new();

    // Three pulses, 10 ms sampling, with chatter on the first rise.
    let samples: &[(bool, u64)] = &[
        (true, 0),
        (false, 10), // bounce
        (true, 20),
        (true, 40),
        (true, 50), // settles: pulse 1
        (false, 80),
        (false, 110), // released
        (true, 140),
        (true, 170), // pulse 2
        (false, 200),
        (false, 230),
        (true, 260),
        (true, 290), // pulse 3
        (false, 320),
        (false, 350),
    ];
    for &(level, at) in samples {
        if let Some(edge) = debouncer.sample(level, at) {
            if edge == rotaryphone::dial::debounce::Edge::Activated {
                source.record_pulse();
            }
        }
    }

    assert_eq!(decoder.tick(), None); // records the count
    assert_eq!(decoder.tick(), Some(3));
}
