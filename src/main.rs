//! Rotary telephone bridge — entry point.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     Adapters (outer ring)                    │
//! │                                                              │
//! │  BusctlTelephony  BusctlPairing  CuePlayer  PulseAudioRouter │
//! │  (TelephonyPort)  (PairingPort)  (AudioPort) (AudioRoutePort)│
//! │  SysfsInput/Output  SystemPower  LogEventSink  StdSleep      │
//! │                                                              │
//! │  ─────────────── Port Trait Boundary ───────────────────     │
//! │                                                              │
//! │  ┌────────────────────────────────────────────────────┐      │
//! │  │            PhoneService (pure logic)               │      │
//! │  │  ConnectionTracker · CallSession · DialController  │      │
//! │  └────────────────────────────────────────────────────┘      │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! One worker thread per concern: a sampler per GPIO line, the pulse
//! quiescence check, the bell cycle, the playback pump and the bus signal
//! listener. The main thread runs the dialing decision loop and owns the
//! graceful-shutdown flag.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use log::{info, warn};

use rotaryphone::adapters::audio::{CuePlayer, PulseAudioRouter};
use rotaryphone::adapters::bluez::BusctlPairing;
use rotaryphone::adapters::log_sink::LogEventSink;
use rotaryphone::adapters::monitor::{run_monitor, BusSignal};
use rotaryphone::adapters::ofono::BusctlTelephony;
use rotaryphone::adapters::power::SystemPower;
use rotaryphone::adapters::time::StdSleep;
use rotaryphone::app::commands::AppCommand;
use rotaryphone::app::events::PhoneEvent;
use rotaryphone::app::ports::{CallId, DeviceId, EventSink};
use rotaryphone::app::service::PhoneService;
use rotaryphone::config::PhoneConfig;
use rotaryphone::dial::controller::{run_dial_loop, DialingController};
use rotaryphone::dial::debounce::{Debouncer, Edge};
use rotaryphone::dial::pulse::{run_quiescence_loop, PulseDecoder};
use rotaryphone::drivers::gpio_poll::{run_line_sampler, SysfsInput, SysfsOutput};
use rotaryphone::drivers::ringer::{run_ringer, RingerCycle, RingerHandle};

const DEFAULT_CONFIG_PATH: &str = "/etc/rotaryphone.json";

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    info!("rotaryphone v{}", env!("CARGO_PKG_VERSION"));

    // ── 1. Configuration ──────────────────────────────────────
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_owned());
    let config = PhoneConfig::load(Path::new(&config_path))
        .with_context(|| format!("loading {config_path}"))?;
    info!(
        "config loaded: {} phonebook entries, dial pin {}, receiver pin {}",
        config.phonebook.len(),
        config.dial_pulse_pin,
        config.receiver_pin
    );

    // ── 2. Shared state ───────────────────────────────────────
    let finish = Arc::new(AtomicBool::new(false));
    let off_hook = Arc::new(AtomicBool::new(false));
    let service = Arc::new(Mutex::new(PhoneService::new(&config)));

    // ── 3. Adapters ───────────────────────────────────────────
    let telephony = BusctlTelephony::new();
    let pairing = BusctlPairing::new();
    let audio = CuePlayer::new(config.audio.clone());
    let ringer = RingerHandle::new();

    // ── 4. GPIO lines ─────────────────────────────────────────
    let dial_line = SysfsInput::open(config.dial_pulse_pin).context("dial pulse pin")?;
    let receiver_line = SysfsInput::open(config.receiver_pin).context("receiver pin")?;
    let mut bell_out = SysfsOutput::open(config.ringer_pin).context("ringer pin")?;

    // ── 5. Startup sync ───────────────────────────────────────
    {
        let mut tel = telephony.clone();
        lock(&service).refresh_connection(&mut tel, &mut PulseAudioRouter, &mut LogEventSink);
    }
    LogEventSink.emit(&PhoneEvent::Started);

    let mut workers = Vec::new();

    // ── 6. Bell cycle worker ──────────────────────────────────
    {
        let cycle = RingerCycle::new(config.ringer_pattern());
        let flag = ringer.flag();
        let finish = finish.clone();
        let idle_poll = config.sample_period();
        workers.push(
            thread::Builder::new()
                .name("ringer".into())
                .spawn(move || {
                    run_ringer(cycle, flag, finish, idle_poll, &mut bell_out, &mut StdSleep);
                })
                .context("spawning ringer worker")?,
        );
    }

    // ── 7. Pulse decoding ─────────────────────────────────────
    let (pulse_source, decoder) = PulseDecoder::new();
    let (digit_tx, digit_rx) = crossbeam_channel::bounded(32);
    {
        let finish = finish.clone();
        let period = config.pulse_quiescence();
        workers.push(
            thread::Builder::new()
                .name("pulse-check".into())
                .spawn(move || run_quiescence_loop(decoder, digit_tx, finish, period))
                .context("spawning pulse worker")?,
        );
    }
    {
        let finish = finish.clone();
        let period = config.sample_period();
        let debouncer = Debouncer::new(config.dial_bounce_ms, false);
        workers.push(
            thread::Builder::new()
                .name("dial-sampler".into())
                .spawn(move || {
                    run_line_sampler(
                        dial_line,
                        debouncer,
                        period,
                        finish,
                        |edge| {
                            if edge == Edge::Activated {
                                pulse_source.record_pulse();
                            }
                        },
                        &mut StdSleep,
                    );
                })
                .context("spawning dial sampler")?,
        );
    }

    // ── 8. Receiver sampler ───────────────────────────────────
    {
        let finish = finish.clone();
        let off_hook = off_hook.clone();
        let service = service.clone();
        let mut tel = telephony.clone();
        let mut ringer = ringer.clone();
        let mut audio = audio.clone();
        let period = config.sample_period();
        let debouncer = Debouncer::new(config.receiver_bounce_ms, false);
        workers.push(
            thread::Builder::new()
                .name("receiver-sampler".into())
                .spawn(move || {
                    run_line_sampler(
                        receiver_line,
                        debouncer,
                        period,
                        finish,
                        |edge| {
                            let lifted = edge == Edge::Activated;
                            off_hook.store(lifted, Ordering::Release);
                            lock(&service).on_receiver_edge(
                                lifted,
                                &mut tel,
                                &mut ringer,
                                &mut audio,
                                &mut StdSleep,
                                &mut LogEventSink,
                            );
                        },
                        &mut StdSleep,
                    );
                })
                .context("spawning receiver sampler")?,
        );
    }

    // ── 9. Panel buttons (optional hardware) ──────────────────
    if let Some(pin) = config.pairing_button_pin {
        spawn_button(
            "pairing-button",
            pin,
            AppCommand::OpenPairingWindow,
            &config,
            &finish,
            &service,
            &telephony,
            &pairing,
            &mut workers,
        )?;
    }
    if let Some(pins) = config.volume_pins {
        spawn_button(
            "volume-up",
            pins.up,
            AppCommand::VolumeUp,
            &config,
            &finish,
            &service,
            &telephony,
            &pairing,
            &mut workers,
        )?;
        spawn_button(
            "volume-down",
            pins.down,
            AppCommand::VolumeDown,
            &config,
            &finish,
            &service,
            &telephony,
            &pairing,
            &mut workers,
        )?;
        spawn_button(
            "mute",
            pins.mute,
            AppCommand::MuteToggle,
            &config,
            &finish,
            &service,
            &telephony,
            &pairing,
            &mut workers,
        )?;
    }

    // ── 10. Playback pump ─────────────────────────────────────
    {
        let audio = audio.clone();
        let finish = finish.clone();
        workers.push(
            thread::Builder::new()
                .name("audio-pump".into())
                .spawn(move || audio.run_pump(finish, Duration::from_millis(200)))
                .context("spawning audio pump")?,
        );
    }

    // ── 11. Bus signal listener ───────────────────────────────
    {
        let finish = finish.clone();
        let service = service.clone();
        let mut tel = telephony.clone();
        let tel_handle = telephony.clone();
        let mut pairing = pairing.clone();
        let mut ringer = ringer.clone();
        // Not joined: the listener may sit in a blocking read until the
        // process exits.
        thread::Builder::new()
            .name("bus-monitor".into())
            .spawn(move || {
                let result = run_monitor(finish, |signal| match signal {
                    BusSignal::ModemAdded { path } => {
                        tel_handle.set_active_modem(&path);
                        lock(&service).on_device_added(
                            &DeviceId(path),
                            &mut tel,
                            &mut pairing,
                            &mut PulseAudioRouter,
                            &mut LogEventSink,
                        );
                    }
                    BusSignal::ModemOnlineChanged { online } => {
                        lock(&service).on_modem_property_changed(
                            "online",
                            online,
                            &mut PulseAudioRouter,
                            &mut LogEventSink,
                        );
                    }
                    BusSignal::CallAdded { path, direction } => {
                        lock(&service).on_call_added(
                            CallId(path),
                            direction,
                            &mut ringer,
                            &mut LogEventSink,
                        );
                    }
                    BusSignal::CallRemoved => {
                        lock(&service).on_call_removed(&mut ringer, &mut LogEventSink);
                    }
                    BusSignal::CallStateChanged { state } => {
                        lock(&service).on_call_state_changed(&state, &mut LogEventSink);
                    }
                });
                if let Err(e) = result {
                    warn!("bus monitor unavailable: {e}");
                }
            })
            .context("spawning bus monitor")?;
    }

    // ── 12. Dialing decision loop (main thread) ───────────────
    info!("bridge ready, entering decision loop");
    {
        let mut tel = telephony.clone();
        let mut audio = audio.clone();
        run_dial_loop(
            DialingController::new(),
            &digit_rx,
            &service,
            &config,
            &off_hook,
            &finish,
            &mut tel,
            &mut audio,
            &mut SystemPower,
            &mut StdSleep,
            &mut LogEventSink,
        );
    }

    // ── 13. Drain ─────────────────────────────────────────────
    finish.store(true, Ordering::Release);
    for worker in workers {
        if worker.join().is_err() {
            warn!("a worker panicked during shutdown");
        }
    }
    info!("bridge stopped");
    Ok(())
}

fn spawn_button(
    name: &str,
    pin: u8,
    command: AppCommand,
    config: &PhoneConfig,
    finish: &Arc<AtomicBool>,
    service: &Arc<Mutex<PhoneService>>,
    telephony: &BusctlTelephony,
    pairing: &BusctlPairing,
    workers: &mut Vec<thread::JoinHandle<()>>,
) -> Result<()> {
    let line = SysfsInput::open(pin).with_context(|| format!("{name} pin"))?;
    let debouncer = Debouncer::new(config.button_bounce_ms, false);
    let period = config.sample_period();
    let finish = finish.clone();
    let service = service.clone();
    let mut tel = telephony.clone();
    let mut pairing = pairing.clone();

    workers.push(
        thread::Builder::new()
            .name(name.into())
            .spawn(move || {
                run_line_sampler(
                    line,
                    debouncer,
                    period,
                    finish,
                    |edge| {
                        if edge == Edge::Activated {
                            lock(&service).handle_command(
                                command,
                                &mut tel,
                                &mut pairing,
                                &mut LogEventSink,
                            );
                        }
                    },
                    &mut StdSleep,
                );
            })
            .with_context(|| format!("spawning {name} sampler"))?,
    );
    Ok(())
}

fn lock(service: &Mutex<PhoneService>) -> std::sync::MutexGuard<'_, PhoneService> {
    service.lock().unwrap_or_else(PoisonError::into_inner)
}
