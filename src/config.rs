//! Static configuration for the telephone bridge.
//!
//! Pin assignments, debounce windows, decoder timing, ringer pattern, audio
//! cue files and the phonebook. Loaded once from a JSON file before the
//! workers start and treated as immutable for the process lifetime.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Core bridge configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PhoneConfig {
    // --- GPIO pins (BCM numbering) ---
    /// Rotary dial pulse input.
    pub dial_pulse_pin: u8,
    /// Receiver (hook switch) input. High = receiver lifted.
    pub receiver_pin: u8,
    /// Bell drive output.
    pub ringer_pin: u8,
    /// Button opening the pairing window, if fitted.
    pub pairing_button_pin: Option<u8>,
    /// Volume buttons, if the handset model has them.
    pub volume_pins: Option<VolumePins>,

    // --- Debounce windows ---
    /// Stabilisation window for the dial pulse line (milliseconds).
    pub dial_bounce_ms: u64,
    /// Stabilisation window for the receiver switch (milliseconds).
    pub receiver_bounce_ms: u64,
    /// Stabilisation window for the panel buttons (milliseconds).
    pub button_bounce_ms: u64,

    // --- Decoder / dialing timing ---
    /// Quiescence period of the pulse decoder: a digit completes once the
    /// pulse count has been stable for this long.
    pub pulse_quiescence_ms: u64,
    /// Inter-digit timeout of the dialing decision loop (seconds).
    pub digit_timeout_secs: u64,
    /// Delay before a shortcut number is dialed, so the cue can finish.
    pub predial_delay_secs: u64,
    /// Grace period before issuing the answer command to the service.
    pub answer_grace_ms: u64,
    /// Drain period between the shutdown cue and the host shutdown request.
    pub shutdown_drain_secs: u64,
    /// GPIO sampling period for the edge workers (milliseconds).
    pub sample_period_ms: u64,

    // --- Ringer ---
    /// Alternating on/off hold durations of the bell pattern (milliseconds).
    /// Even indices drive the bell, odd indices pause it.
    pub ringer_pattern_ms: Vec<u64>,

    // --- Pairing / volume policy ---
    /// Register an agent that accepts any pairing attempt without user
    /// interaction. Required for headless operation, but effectively an
    /// unauthenticated-pairing mode; disable when the bridge is reachable
    /// by untrusted devices.
    pub auto_accept_pairing: bool,
    /// How long the pairing window stays open (seconds).
    pub pairing_window_secs: u32,
    /// Step applied to speaker and microphone volume per button press.
    pub volume_increment: u8,

    // --- Phonebook ---
    /// Single-digit shortcut table. Index 9 is reserved for shutdown.
    pub phonebook: Vec<PhonebookEntry>,

    // --- Audio cues ---
    pub audio: AudioFiles,
}

/// PABX-style volume button pins (present on some handset models).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct VolumePins {
    pub up: u8,
    pub down: u8,
    pub mute: u8,
}

/// One speed-dial slot: a 1-based shortcut index and the number it dials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhonebookEntry {
    pub index: u8,
    pub number: String,
}

/// Audio cue files and the player used to render them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioFiles {
    /// Player binary; receives the file path as its last argument.
    pub player: String,
    pub dial_tone: PathBuf,
    pub not_connected: PathBuf,
    pub format_incorrect: PathBuf,
    pub shutdown: PathBuf,
}

impl Default for PhoneConfig {
    fn default() -> Self {
        Self {
            dial_pulse_pin: 19,
            receiver_pin: 13,
            ringer_pin: 26,
            pairing_button_pin: Some(20),
            volume_pins: Some(VolumePins {
                up: 23,
                down: 24,
                mute: 25,
            }),

            dial_bounce_ms: 90,
            receiver_bounce_ms: 1000,
            button_bounce_ms: 2000,

            pulse_quiescence_ms: 200,
            digit_timeout_secs: 5,
            predial_delay_secs: 4,
            answer_grace_ms: 2000,
            shutdown_drain_secs: 6,
            sample_period_ms: 10,

            // Double-ring cadence: ring, pause, ring, long pause.
            ringer_pattern_ms: vec![400, 200, 400, 2000],

            auto_accept_pairing: true,
            pairing_window_secs: 30,
            volume_increment: 5,

            phonebook: Vec::new(),
            audio: AudioFiles::default(),
        }
    }
}

impl Default for AudioFiles {
    fn default() -> Self {
        Self {
            player: "aplay".into(),
            dial_tone: "/usr/share/rotaryphone/dial_tone.wav".into(),
            not_connected: "/usr/share/rotaryphone/not_connected.wav".into(),
            format_incorrect: "/usr/share/rotaryphone/format_incorrect.wav".into(),
            shutdown: "/usr/share/rotaryphone/turnoff.wav".into(),
        }
    }
}

impl PhoneConfig {
    /// Load configuration from a JSON file. Missing fields fall back to
    /// their defaults; a missing file is an error so a misplaced path does
    /// not silently run with an empty phonebook.
    pub fn load(path: &Path) -> crate::error::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {e}", path.display())))?;
        let config: Self = serde_json::from_str(&raw)
            .map_err(|e| Error::Config(format!("cannot parse {}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the workers cannot run with.
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.pulse_quiescence_ms == 0 {
            return Err(Error::Config("pulse_quiescence_ms must be non-zero".into()));
        }
        if self.digit_timeout_secs == 0 {
            return Err(Error::Config("digit_timeout_secs must be non-zero".into()));
        }
        if self.sample_period_ms == 0 {
            return Err(Error::Config("sample_period_ms must be non-zero".into()));
        }
        if self.ringer_pattern_ms.iter().any(|&ms| ms == 0) {
            return Err(Error::Config("ringer pattern entries must be non-zero".into()));
        }
        for entry in &self.phonebook {
            if entry.index == 0 || entry.index == 9 {
                return Err(Error::Config(format!(
                    "phonebook index {} is reserved",
                    entry.index
                )));
            }
        }
        Ok(())
    }

    pub fn pulse_quiescence(&self) -> Duration {
        Duration::from_millis(self.pulse_quiescence_ms)
    }

    pub fn digit_timeout(&self) -> Duration {
        Duration::from_secs(self.digit_timeout_secs)
    }

    pub fn predial_delay(&self) -> Duration {
        Duration::from_secs(self.predial_delay_secs)
    }

    pub fn answer_grace(&self) -> Duration {
        Duration::from_millis(self.answer_grace_ms)
    }

    pub fn shutdown_drain(&self) -> Duration {
        Duration::from_secs(self.shutdown_drain_secs)
    }

    pub fn sample_period(&self) -> Duration {
        Duration::from_millis(self.sample_period_ms)
    }

    /// Ringer pattern as durations, in on/off alternation order.
    pub fn ringer_pattern(&self) -> Vec<Duration> {
        self.ringer_pattern_ms
            .iter()
            .map(|&ms| Duration::from_millis(ms))
            .collect()
    }
}
