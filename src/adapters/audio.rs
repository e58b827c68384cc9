//! Process-based cue playback and the audio-routing workaround.
//!
//! One cue plays at a time: starting a new one kills the previous player
//! process. Looped cues (the dial tone) are respawned by a small pump
//! worker whenever the player exits and the loop is still wanted — the
//! player binary itself knows nothing about looping.

use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use log::{debug, warn};

use crate::app::ports::{AudioCue, AudioPort, AudioRoutePort};
use crate::config::AudioFiles;

struct PlayerInner {
    files: AudioFiles,
    child: Option<Child>,
    /// Cue to respawn when the player exits.
    looping: Option<AudioCue>,
}

/// [`AudioPort`] adapter shelling out to the configured player.
#[derive(Clone)]
pub struct CuePlayer {
    inner: Arc<Mutex<PlayerInner>>,
}

impl CuePlayer {
    pub fn new(files: AudioFiles) -> Self {
        Self {
            inner: Arc::new(Mutex::new(PlayerInner {
                files,
                child: None,
                looping: None,
            })),
        }
    }

    /// Respawn loop for looped cues. Runs until `finish`; `period` bounds
    /// how stale an exited player can get before the respawn.
    pub fn run_pump(&self, finish: Arc<AtomicBool>, period: Duration) {
        while !finish.load(Ordering::Acquire) {
            std::thread::sleep(period);
            let mut inner = self.lock();
            let exited = match inner.child.as_mut() {
                Some(child) => matches!(child.try_wait(), Ok(Some(_))),
                None => false,
            };
            if exited {
                inner.child = None;
                if let Some(cue) = inner.looping {
                    spawn_cue(&mut inner, cue);
                }
            }
        }
        // Leave no player behind.
        let mut inner = self.lock();
        inner.looping = None;
        kill_current(&mut inner);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, PlayerInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl AudioPort for CuePlayer {
    fn play(&mut self, cue: AudioCue, looped: bool) {
        let mut inner = self.lock();
        kill_current(&mut inner);
        inner.looping = if looped { Some(cue) } else { None };
        spawn_cue(&mut inner, cue);
    }

    fn stop(&mut self) {
        let mut inner = self.lock();
        inner.looping = None;
        kill_current(&mut inner);
    }

    fn is_playing(&self) -> bool {
        let mut inner = self.lock();
        match inner.child.as_mut() {
            Some(child) => matches!(child.try_wait(), Ok(None)),
            None => false,
        }
    }
}

fn spawn_cue(inner: &mut PlayerInner, cue: AudioCue) {
    let file = match cue {
        AudioCue::DialTone => &inner.files.dial_tone,
        AudioCue::NotConnected => &inner.files.not_connected,
        AudioCue::FormatIncorrect => &inner.files.format_incorrect,
        AudioCue::Shutdown => &inner.files.shutdown,
    };
    debug!("playing {cue:?} ({})", file.display());
    match Command::new(&inner.files.player)
        .arg(file)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
    {
        Ok(child) => inner.child = Some(child),
        Err(e) => {
            warn!("cannot start player {}: {e}", inner.files.player);
            inner.child = None;
        }
    }
}

fn kill_current(inner: &mut PlayerInner) {
    if let Some(mut child) = inner.child.take() {
        if let Err(e) = child.kill() {
            debug!("player already gone: {e}");
        }
        // Reap; the process was just killed or has already exited.
        let _ = child.wait();
    }
}

/// [`AudioRoutePort`] adapter. The sound server does not pick up a freshly
/// connected device path on its own; bouncing the suspend state forces a
/// card re-probe.
#[derive(Clone, Copy, Default)]
pub struct PulseAudioRouter;

impl AudioRoutePort for PulseAudioRouter {
    fn refresh_output_cards(&mut self) {
        debug!("refreshing audio card routing");
        for arg in ["1", "0"] {
            match Command::new("pacmd")
                .args(["suspend", arg])
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status()
            {
                Ok(status) if status.success() => {}
                Ok(status) => warn!("pacmd suspend {arg} exited with {status}"),
                Err(e) => {
                    warn!("cannot run pacmd: {e}");
                    return;
                }
            }
        }
    }
}
