//! Timing scopes for `--perf` and the event trail behind `--debug-log`.
//!
//! Both are off by default. Timed scopes go to stderr and to `tracing` at
//! debug level; events are appended to the trail file while one is open.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

static TIMINGS: AtomicBool = AtomicBool::new(false);
static TRAIL: Mutex<Option<Trail>> = Mutex::new(None);

/// An open debug log; timestamps are relative to when it was opened.
struct Trail {
    opened: Instant,
    out: BufWriter<File>,
}

impl Trail {
    fn open(path: &Path) -> io::Result<Self> {
        let mut out = BufWriter::new(File::create(path)?);
        writeln!(out, "ldconsole debug log start")?;
        out.flush()?;
        Ok(Self {
            opened: Instant::now(),
            out,
        })
    }

    fn record(&mut self, name: &str, detail: &str) -> io::Result<()> {
        let at = millis(self.opened.elapsed());
        writeln!(self.out, "[{at:>10.3} ms] {name}: {detail}")?;
        self.out.flush()
    }
}

fn trail() -> MutexGuard<'static, Option<Trail>> {
    TRAIL.lock().unwrap_or_else(PoisonError::into_inner)
}

fn millis(elapsed: Duration) -> f64 {
    elapsed.as_secs_f64() * 1000.0
}

/// Times the enclosing block; reports on drop when timings are on.
#[derive(Debug)]
#[must_use = "the block is timed until the scope is dropped"]
pub struct Scope {
    name: &'static str,
    start: Instant,
}

impl Drop for Scope {
    fn drop(&mut self) {
        if !is_enabled() {
            return;
        }
        let ms = millis(self.start.elapsed());
        tracing::debug!(scope = self.name, ms, "timed");
        eprintln!("[perf] {}: {ms:.2} ms", self.name);
    }
}

pub fn scope(name: &'static str) -> Scope {
    Scope {
        name,
        start: Instant::now(),
    }
}

/// Turn `[perf]` scope timings on or off.
pub fn set_enabled(enabled: bool) {
    TIMINGS.store(enabled, Ordering::Relaxed);
}

pub fn is_enabled() -> bool {
    TIMINGS.load(Ordering::Relaxed)
}

/// Open a fresh trail at `path`, or close the current one with `None`.
///
/// # Errors
/// Returns an error if the file cannot be created or written; the previous
/// trail stays open in that case.
pub fn set_debug_log_path(path: Option<&Path>) -> io::Result<()> {
    let next = path.map(Trail::open).transpose()?;
    *trail() = next;
    Ok(())
}

pub fn is_debug_log_enabled() -> bool {
    trail().is_some()
}

/// Append one event to the trail, if one is open.
pub fn log_event(name: &str, detail: impl AsRef<str>) {
    if let Some(open) = trail().as_mut()
        && let Err(err) = open.record(name, detail.as_ref())
    {
        tracing::debug!(%err, "debug log write failed");
    }
}
