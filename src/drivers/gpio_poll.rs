//! Sysfs GPIO access and the per-line sampling worker.
//!
//! Each input line (dial pulses, hook switch, panel buttons) gets its own
//! sampling worker: read the raw level, feed it through the line's
//! debouncer, hand settled edges to a callback. Time advances logically by
//! one sample period per iteration, so the debounce windows are exact
//! multiples of the polling rate and the worker is deterministic under a
//! scripted sleep.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use log::warn;

use crate::app::ports::{RingerOutput, SleepPort};
use crate::dial::debounce::{Debouncer, Edge};
use crate::error::Error;

const GPIO_ROOT: &str = "/sys/class/gpio";

/// Raw level source for one input line.
pub trait LineInput {
    fn read_level(&mut self) -> std::io::Result<bool>;
}

/// Sysfs-backed input line.
pub struct SysfsInput {
    value: File,
}

impl SysfsInput {
    /// Export the pin and configure it as an input.
    pub fn open(pin: u8) -> crate::error::Result<Self> {
        export(pin)?;
        write_attr(pin, "direction", "in")?;
        let value = File::open(value_path(pin))
            .map_err(|_| Error::Init("cannot open gpio value file"))?;
        Ok(Self { value })
    }
}

impl LineInput for SysfsInput {
    fn read_level(&mut self) -> std::io::Result<bool> {
        self.value.seek(SeekFrom::Start(0))?;
        let mut buf = [0u8; 1];
        self.value.read_exact(&mut buf)?;
        Ok(buf[0] == b'1')
    }
}

/// Sysfs-backed output line (bell drive).
pub struct SysfsOutput {
    value: File,
}

impl SysfsOutput {
    pub fn open(pin: u8) -> crate::error::Result<Self> {
        export(pin)?;
        write_attr(pin, "direction", "out")?;
        let value = OpenOptions::new()
            .write(true)
            .open(value_path(pin))
            .map_err(|_| Error::Init("cannot open gpio value file"))?;
        Ok(Self { value })
    }
}

impl RingerOutput for SysfsOutput {
    fn set(&mut self, on: bool) {
        let level: &[u8] = if on { b"1" } else { b"0" };
        if let Err(e) = self.value.write_all(level) {
            warn!("gpio write failed: {e}");
        }
    }
}

fn value_path(pin: u8) -> PathBuf {
    PathBuf::from(format!("{GPIO_ROOT}/gpio{pin}/value"))
}

/// Export via the sysfs control file. An already-exported pin reports
/// EBUSY and is fine.
fn export(pin: u8) -> crate::error::Result<()> {
    match std::fs::write(format!("{GPIO_ROOT}/export"), pin.to_string()) {
        Ok(()) => Ok(()),
        Err(e) if e.raw_os_error() == Some(16) => Ok(()), // EBUSY
        Err(_) => Err(Error::Init("cannot export gpio pin")),
    }
}

fn write_attr(pin: u8, attr: &str, value: &str) -> crate::error::Result<()> {
    std::fs::write(format!("{GPIO_ROOT}/gpio{pin}/{attr}"), value)
        .map_err(|_| Error::Init("cannot configure gpio pin"))
}

/// Sampling worker for one line. Read failures are logged and skipped so a
/// transient sysfs hiccup never kills the worker.
pub fn run_line_sampler(
    mut input: impl LineInput,
    mut debouncer: Debouncer,
    period: Duration,
    finish: Arc<AtomicBool>,
    mut on_edge: impl FnMut(Edge),
    sleep: &mut impl SleepPort,
) {
    let period_ms = period.as_millis() as u64;
    let mut now_ms = 0u64;

    while !finish.load(Ordering::Acquire) {
        match input.read_level() {
            Ok(level) => {
                if let Some(edge) = debouncer.sample(level, now_ms) {
                    on_edge(edge);
                }
            }
            Err(e) => warn!("gpio read failed: {e}"),
        }
        now_ms = now_ms.wrapping_add(period_ms);
        sleep.sleep(period);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Replays a fixed level script, raising `finish` when exhausted.
    struct ScriptedLine {
        script: Vec<bool>,
        pos: usize,
        finish: Arc<AtomicBool>,
    }

    impl LineInput for ScriptedLine {
        fn read_level(&mut self) -> std::io::Result<bool> {
            let level = *self.script.get(self.pos).unwrap_or(&false);
            self.pos += 1;
            if self.pos >= self.script.len() {
                self.finish.store(true, Ordering::Release);
            }
            Ok(level)
        }
    }

    struct NoSleep;
    impl SleepPort for NoSleep {
        fn sleep(&mut self, _: Duration) {}
    }

    fn sample_script(script: Vec<bool>, window_ms: u64) -> Vec<Edge> {
        let finish = Arc::new(AtomicBool::new(false));
        let line = ScriptedLine {
            script,
            pos: 0,
            finish: finish.clone(),
        };
        let mut edges = Vec::new();
        run_line_sampler(
            line,
            Debouncer::new(window_ms, false),
            Duration::from_millis(10),
            finish,
            |e| edges.push(e),
            &mut NoSleep,
        );
        edges
    }

    #[test]
    fn held_level_produces_one_edge_pair() {
        // 10 ms samples, 30 ms window: hold high, then low again.
        let script = vec![
            false, true, true, true, true, true, false, false, false, false, false,
        ];
        assert_eq!(sample_script(script, 30), vec![Edge::Activated, Edge::Released]);
    }

    #[test]
    fn chatter_shorter_than_window_is_ignored() {
        let script = vec![false, true, false, true, false, true, false, false];
        assert_eq!(sample_script(script, 30), Vec::new());
    }

    #[test]
    fn read_failures_do_not_stop_the_worker() {
        struct FlakyLine {
            calls: usize,
            finish: Arc<AtomicBool>,
        }
        impl LineInput for FlakyLine {
            fn read_level(&mut self) -> std::io::Result<bool> {
                self.calls += 1;
                if self.calls >= 6 {
                    self.finish.store(true, Ordering::Release);
                }
                if self.calls % 2 == 0 {
                    Err(std::io::Error::other("transient"))
                } else {
                    Ok(true)
                }
            }
        }

        let finish = Arc::new(AtomicBool::new(false));
        let line = FlakyLine {
            calls: 0,
            finish: finish.clone(),
        };
        let mut edges = Vec::new();
        run_line_sampler(
            line,
            Debouncer::new(20, false),
            Duration::from_millis(10),
            finish,
            |e| edges.push(e),
            &mut NoSleep,
        );
        // Good reads at logical 0/20/40 ms: the level still settles.
        assert_eq!(edges, vec![Edge::Activated]);
    }
}
